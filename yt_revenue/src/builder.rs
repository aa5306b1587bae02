use std::collections::{HashMap, HashSet};

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{info, warn};

use crate::analytics::{
    cell_f64, cell_str, cell_u64, AnalyticsSource, Fetched, ReportQuery, TitleCatalog,
};
use crate::metrics::{
    ad_type_breakdown, chart_label, pct_change, projected_monthly, round1, round2, rpm,
};
use crate::period::ReportPeriod;
use crate::report::{AdTypeBreakdown, Report, RevenueChart, TopVideo};

/// Maximum number of entries in `top_earning_videos`.
pub const TOP_VIDEO_LIMIT: u32 = 5;

// Column order matters: rows come back in exactly this order.
const CORE_METRICS: &[&str] = &["estimatedRevenue", "cpm", "monetizedPlaybacks", "adImpressions"];
const PREVIOUS_METRICS: &[&str] = &["estimatedRevenue", "cpm", "monetizedPlaybacks", "views"];
const VIEW_METRICS: &[&str] = &["views"];
const REVENUE_METRICS: &[&str] = &["estimatedRevenue"];
const VIDEO_METRICS: &[&str] = &["estimatedRevenue", "views"];

#[derive(Debug, Default, Clone, Copy, PartialEq)]
struct CoreMetrics {
    revenue: f64,
    cpm: f64,
    monetized_playbacks: u64,
    ad_impressions: u64,
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
struct Deltas {
    revenue: f64,
    rpm: f64,
    cpm: f64,
    playbacks: f64,
}

/// Sequential fetch-and-reduce pipeline producing one [`Report`].
///
/// Every slice is fetched once. A failed or empty slice falls back to zeros
/// or an empty collection; nothing a single fetch does can abort the run.
pub struct ReportBuilder<'a> {
    analytics: &'a dyn AnalyticsSource,
    catalog: &'a dyn TitleCatalog,
    currency: String,
}

impl<'a> ReportBuilder<'a> {
    pub fn new(
        analytics: &'a dyn AnalyticsSource,
        catalog: &'a dyn TitleCatalog,
        currency: impl Into<String>,
    ) -> Self {
        ReportBuilder {
            analytics,
            catalog,
            currency: currency.into(),
        }
    }

    pub async fn build_report(
        &self,
        reference_date: NaiveDate,
        generated_at: DateTime<Utc>,
    ) -> Report {
        let period = ReportPeriod::trailing(reference_date);
        info!("Fetching data from {} to {}", period.start, period.end);

        info!("Fetching core revenue metrics...");
        let core = self.core_metrics(&period).await;

        info!("Fetching total views...");
        let total_views = self.total_views(&period).await;
        let current_rpm = round2(rpm(core.revenue, total_views));

        info!("Fetching previous period metrics...");
        let deltas = self.deltas(&period, &core, current_rpm).await;

        info!("Fetching daily revenue data...");
        let revenue_chart = self.revenue_chart(&period).await;

        info!("Fetching revenue by ad type...");
        let ad_type_breakdown = self.ad_type_breakdown(&period).await;

        info!("Fetching top earning videos...");
        let top_earning_videos = self.top_videos(&period).await;

        Report {
            last_updated: generated_at,
            period_start: period.start,
            period_end: period.end,
            total_revenue: core.revenue,
            cpm: core.cpm,
            monetized_playbacks: core.monetized_playbacks,
            ad_impressions: core.ad_impressions,
            total_views,
            rpm: current_rpm,
            revenue_change: deltas.revenue,
            rpm_change: deltas.rpm,
            cpm_change: deltas.cpm,
            playbacks_change: deltas.playbacks,
            revenue_chart,
            ad_type_breakdown,
            top_earning_videos,
            projected_monthly_revenue: projected_monthly(core.revenue, period.days()),
        }
    }

    /// One best-effort query. Errors are logged and become `Absent`.
    async fn fetch(&self, slice: &str, query: ReportQuery) -> Fetched {
        match self.analytics.query(&query).await {
            Ok(response) => {
                let fetched = Fetched::from_response(response);
                if fetched == Fetched::Absent {
                    info!(slice = slice, "no rows returned");
                }
                fetched
            }
            Err(err) => {
                warn!(slice = slice, error = %err, "fetch failed, using empty result");
                Fetched::Absent
            }
        }
    }

    async fn core_metrics(&self, period: &ReportPeriod) -> CoreMetrics {
        let query = ReportQuery::new(CORE_METRICS, period.start, period.end)
            .currency(self.currency.as_str());

        match self.fetch("core", query).await.first_row() {
            Some(row) => CoreMetrics {
                revenue: round2(cell_f64(row, 0)),
                cpm: round2(cell_f64(row, 1)),
                monetized_playbacks: cell_u64(row, 2),
                ad_impressions: cell_u64(row, 3),
            },
            None => {
                warn!("No revenue data available");
                CoreMetrics::default()
            }
        }
    }

    async fn total_views(&self, period: &ReportPeriod) -> u64 {
        let query = ReportQuery::new(VIEW_METRICS, period.start, period.end);

        self.fetch("views", query)
            .await
            .first_row()
            .map(|row| cell_u64(row, 0))
            .unwrap_or(0)
    }

    /// Deltas against the preceding window. The comparison query carries views
    /// in the fourth column where the core query has ad impressions.
    async fn deltas(&self, period: &ReportPeriod, core: &CoreMetrics, current_rpm: f64) -> Deltas {
        let previous = period.previous();
        let query = ReportQuery::new(PREVIOUS_METRICS, previous.start, previous.end)
            .currency(self.currency.as_str());

        let fetched = self.fetch("previous_period", query).await;
        let Some(row) = fetched.first_row() else {
            return Deltas::default();
        };

        let prev_revenue = cell_f64(row, 0);
        let prev_cpm = cell_f64(row, 1);
        let prev_playbacks = cell_f64(row, 2);
        let prev_rpm = rpm(prev_revenue, cell_u64(row, 3));

        Deltas {
            revenue: round1(pct_change(core.revenue, prev_revenue)),
            rpm: round1(pct_change(current_rpm, prev_rpm)),
            cpm: round1(pct_change(core.cpm, prev_cpm)),
            playbacks: round1(pct_change(core.monetized_playbacks as f64, prev_playbacks)),
        }
    }

    async fn revenue_chart(&self, period: &ReportPeriod) -> RevenueChart {
        let query = ReportQuery::new(REVENUE_METRICS, period.start, period.end)
            .dimensions("day")
            .sort("day")
            .currency(self.currency.as_str());

        let fetched = self.fetch("daily", query).await;
        let mut chart = RevenueChart::default();

        for row in fetched.rows() {
            let raw = cell_str(row, 0).unwrap_or_default();
            match NaiveDate::parse_from_str(&raw, "%Y-%m-%d") {
                Ok(day) => chart.push(chart_label(day), round2(cell_f64(row, 1))),
                Err(err) => warn!(day = %raw, error = %err, "skipping daily row with bad date"),
            }
        }
        if chart.is_empty() {
            info!("No daily revenue in window");
        }
        chart
    }

    async fn ad_type_breakdown(&self, period: &ReportPeriod) -> AdTypeBreakdown {
        let query = ReportQuery::new(REVENUE_METRICS, period.start, period.end)
            .dimensions("adType")
            .sort("-estimatedRevenue")
            .currency(self.currency.as_str());

        let fetched = self.fetch("ad_type", query).await;
        let rows: Vec<(String, f64)> = fetched
            .rows()
            .iter()
            .filter_map(|row| cell_str(row, 0).map(|label| (label, cell_f64(row, 1))))
            .collect();

        ad_type_breakdown(&rows)
    }

    async fn top_videos(&self, period: &ReportPeriod) -> Vec<TopVideo> {
        let query = ReportQuery::new(VIDEO_METRICS, period.start, period.end)
            .dimensions("video")
            .sort("-estimatedRevenue")
            .limit(TOP_VIDEO_LIMIT)
            .currency(self.currency.as_str());

        let fetched = self.fetch("top_videos", query).await;

        let mut rows: Vec<(String, f64, u64)> = fetched
            .rows()
            .iter()
            .filter_map(|row| {
                let id = cell_str(row, 0)?;
                Some((id, cell_f64(row, 1), cell_u64(row, 2)))
            })
            .collect();
        // Stable, so equal revenues keep provider order.
        rows.sort_by(|a, b| b.1.total_cmp(&a.1));
        rows.truncate(TOP_VIDEO_LIMIT as usize);

        let titles = self.resolve_titles(&rows).await;

        rows.into_iter()
            .map(|(video_id, revenue, views)| TopVideo {
                title: titles
                    .get(&video_id)
                    .filter(|t| !t.trim().is_empty())
                    .cloned()
                    .unwrap_or_else(|| format!("Video {video_id}")),
                revenue: round2(revenue),
                views,
                video_id,
            })
            .collect()
    }

    /// One batched lookup for the distinct ids, in first-seen order.
    async fn resolve_titles(&self, rows: &[(String, f64, u64)]) -> HashMap<String, String> {
        let mut seen = HashSet::new();
        let ids: Vec<String> = rows
            .iter()
            .filter(|(id, _, _)| seen.insert(id.as_str()))
            .map(|(id, _, _)| id.clone())
            .collect();

        if ids.is_empty() {
            return HashMap::new();
        }

        match self.catalog.lookup_titles(&ids).await {
            Ok(titles) => titles,
            Err(err) => {
                warn!(error = %err, "title lookup failed, using placeholder titles");
                HashMap::new()
            }
        }
    }
}
