use std::{env, net::SocketAddr};

use axum::{
    extract::Query,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{Datelike, Duration, NaiveDate};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::TcpListener;

/// Share of channel revenue per ad type, highest first.
const AD_TYPES: &[(&str, f64)] = &[
    ("auction_instream", 0.55),
    ("auction_display", 0.20),
    ("reserved_instream", 0.15),
    ("auction_bumper_instream", 0.10),
];

/// (video id, title, share of channel revenue). `None` titles are unknown to
/// the catalog endpoint.
const VIDEOS: &[(&str, Option<&str>, f64)] = &[
    ("hm3Qk1aZx0E", Some("Field Day Recap and Antenna Builds"), 0.24),
    ("Zr8uT0b1pQw", Some("Getting Your First License"), 0.19),
    ("p4Lw2sYy7Cc", None, 0.14),
    ("Q9dNf6vH2kA", Some("HF Propagation Explained"), 0.12),
    ("c1XbV5mR8tU", Some("Listener Questions #12"), 0.10),
    ("Lk7eJ3wG0sZ", Some("Portable Ops on a Budget"), 0.08),
    ("t2YpH9nC4xM", Some("Contest Weekend Highlights"), 0.07),
];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReportParams {
    start_date: NaiveDate,
    end_date: NaiveDate,
    metrics: String,
    #[serde(default)]
    dimensions: Option<String>,
    #[serde(default)]
    max_results: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct VideoParams {
    #[serde(default)]
    id: String,
}

/// Channel totals for a set of days.
#[derive(Debug, Default, Clone, Copy)]
struct Totals {
    revenue: f64,
    views: f64,
}

/// Deterministic per-day figures, keyed off the calendar so adjacent
/// windows differ.
fn day_totals(day: NaiveDate) -> Totals {
    let n = day.num_days_from_ce();
    Totals {
        revenue: 3.0 + (n % 7) as f64 * 0.75,
        views: 1500.0 + (n % 5) as f64 * 200.0,
    }
}

fn window_totals(start: NaiveDate, end: NaiveDate) -> Totals {
    days(start, end).fold(Totals::default(), |acc, day| {
        let t = day_totals(day);
        Totals {
            revenue: acc.revenue + t.revenue,
            views: acc.views + t.views,
        }
    })
}

fn days(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    let count = (end - start).num_days().max(-1) + 1;
    (0..count).map(move |i| start + Duration::days(i))
}

/// Value of one metric for a slice of the channel's traffic.
fn metric_value(metric: &str, t: Totals) -> Option<Value> {
    let playbacks = (t.views * 0.4).round();
    let impressions = (t.views * 0.55).round();
    let value = match metric {
        "estimatedRevenue" => json!((t.revenue * 10_000.0).round() / 10_000.0),
        "views" => json!(t.views.round() as u64),
        "monetizedPlaybacks" => json!(playbacks as u64),
        "adImpressions" => json!(impressions as u64),
        "cpm" => {
            if impressions > 0.0 {
                json!(((t.revenue / impressions) * 1000.0 * 1.8 * 1000.0).round() / 1000.0)
            } else {
                Value::Null
            }
        }
        _ => return None,
    };
    Some(value)
}

fn error(status: StatusCode, message: String) -> Response {
    let body = json!({ "error": { "code": status.as_u16(), "message": message } });
    (status, Json(body)).into_response()
}

fn build_rows(params: &ReportParams) -> Result<Vec<Vec<Value>>, String> {
    if params.end_date < params.start_date {
        return Err("endDate must not be before startDate".to_string());
    }

    let metrics: Vec<&str> = params.metrics.split(',').map(str::trim).collect();
    let metric_cells = |t: Totals| -> Result<Vec<Value>, String> {
        metrics
            .iter()
            .map(|m| {
                metric_value(m, t)
                    .ok_or_else(|| format!("Unknown identifier ({m}) given in field metrics."))
            })
            .collect()
    };

    let totals = window_totals(params.start_date, params.end_date);
    let scaled = |share: f64| Totals {
        revenue: totals.revenue * share,
        views: totals.views * share,
    };

    let mut rows = Vec::new();
    match params.dimensions.as_deref() {
        None | Some("") => rows.push(metric_cells(totals)?),
        Some("day") => {
            for day in days(params.start_date, params.end_date) {
                let mut row = vec![json!(day.format("%Y-%m-%d").to_string())];
                row.extend(metric_cells(day_totals(day))?);
                rows.push(row);
            }
        }
        Some("adType") => {
            for (ad_type, share) in AD_TYPES {
                let mut row = vec![json!(ad_type)];
                row.extend(metric_cells(scaled(*share))?);
                rows.push(row);
            }
        }
        Some("video") => {
            let limit = params.max_results.unwrap_or(VIDEOS.len());
            for (id, _, share) in VIDEOS.iter().take(limit) {
                let mut row = vec![json!(id)];
                row.extend(metric_cells(scaled(*share))?);
                rows.push(row);
            }
        }
        Some(other) => {
            return Err(format!(
                "Unknown identifier ({other}) given in field dimensions."
            ))
        }
    }
    Ok(rows)
}

async fn handle_reports(Query(params): Query<ReportParams>) -> Response {
    println!(
        "reports {}..{} metrics={} dimensions={}",
        params.start_date,
        params.end_date,
        params.metrics,
        params.dimensions.as_deref().unwrap_or("-")
    );

    match build_rows(&params) {
        // Empty windows omit `rows` entirely, like the real API.
        Ok(rows) if rows.is_empty() => {
            Json(json!({ "kind": "youtubeAnalytics#resultTable" })).into_response()
        }
        Ok(rows) => {
            Json(json!({ "kind": "youtubeAnalytics#resultTable", "rows": rows })).into_response()
        }
        Err(message) => error(StatusCode::BAD_REQUEST, message),
    }
}

fn video_items(ids: &str) -> Vec<Value> {
    ids.split(',')
        .map(str::trim)
        .filter_map(|id| {
            VIDEOS
                .iter()
                .find(|(vid, _, _)| *vid == id)
                .and_then(|(vid, title, _)| {
                    title.map(|t| json!({ "id": vid, "snippet": { "title": t } }))
                })
        })
        .collect()
}

async fn handle_videos(Query(params): Query<VideoParams>) -> Json<Value> {
    println!("videos id={}", params.id);
    Json(json!({ "kind": "youtube#videoListResponse", "items": video_items(&params.id) }))
}

/// Local stand-in for the analytics and data APIs.
///
/// Point the fetcher at it with:
///   YT_ANALYTICS_ENDPOINT=http://127.0.0.1:3000/v2
///   YT_DATA_ENDPOINT=http://127.0.0.1:3000/youtube/v3
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let app = Router::new()
        .route("/v2/reports", get(handle_reports))
        .route("/youtube/v3/videos", get(handle_videos));

    let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port = env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    println!("fake_analytics listening on http://{}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
