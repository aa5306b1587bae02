//! Derived statistics. Everything here is pure arithmetic over values that
//! have already been coalesced (nulls are zero by the time they get here).

use chrono::NaiveDate;

use crate::report::{AdTypeBreakdown, AdTypeShare};

/// Days in the month used for the revenue projection.
pub const PROJECTION_DAYS: f64 = 30.0;

/// Round to cents.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Round to one decimal place (percentages).
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Revenue per thousand views. Zero when there are no views.
pub fn rpm(revenue: f64, views: u64) -> f64 {
    if views > 0 {
        (revenue / views as f64) * 1000.0
    } else {
        0.0
    }
}

/// Percentage change from `previous` to `current`. Zero unless `previous > 0`.
pub fn pct_change(current: f64, previous: f64) -> f64 {
    if previous > 0.0 {
        ((current - previous) / previous) * 100.0
    } else {
        0.0
    }
}

/// Average daily revenue scaled to a 30-day month, rounded to cents.
pub fn projected_monthly(total_revenue: f64, days_in_period: i64) -> f64 {
    if total_revenue > 0.0 && days_in_period > 0 {
        let avg_daily = total_revenue / days_in_period as f64;
        round2(avg_daily * PROJECTION_DAYS)
    } else {
        0.0
    }
}

/// Short chart label, e.g. `Oct 01`.
pub fn chart_label(day: NaiveDate) -> String {
    day.format("%b %d").to_string()
}

/// Human label for a raw category id: underscores become spaces, then each
/// run of letters is capitalised and the rest of the run lower-cased.
///
/// `auction_display` -> `Auction Display`, `reservedInstream` -> `Reservedinstream`
pub fn category_label(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut in_word = false;

    for ch in raw.replace('_', " ").chars() {
        if ch.is_alphabetic() {
            if in_word {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(ch);
            in_word = false;
        }
    }
    out
}

/// Two-pass category reduction: fold the grand total first, then map each
/// category to its share of that total. A zero total yields an empty
/// breakdown. Later rows that format to an already-seen label replace it.
pub fn ad_type_breakdown(rows: &[(String, f64)]) -> AdTypeBreakdown {
    let total: f64 = rows.iter().fold(0.0, |acc, (_, revenue)| acc + revenue);

    let mut breakdown = AdTypeBreakdown::default();
    if total <= 0.0 {
        return breakdown;
    }

    for (raw, revenue) in rows {
        breakdown.insert(
            category_label(raw),
            AdTypeShare {
                percentage: round1((revenue / total) * 100.0),
                revenue: round2(*revenue),
            },
        );
    }
    breakdown
}
