//! Query model shared by the report builder and the analytics backends.
//!
//! A backend answers a [`ReportQuery`] with a [`QueryResponse`]: an ordered list
//! of rows whose cells follow the requested `dimensions` then `metrics` order.
//! The builder never sees transport errors directly; it goes through
//! [`Fetched`], which collapses failures and missing row sets into `Absent`.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// One row of a tabular analytics response.
pub type Row = Vec<Value>;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("upstream returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// A single analytics report request.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportQuery {
    pub metrics: Vec<&'static str>,
    pub dimensions: Option<&'static str>,
    pub sort: Option<&'static str>,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub currency: Option<String>,
    pub limit: Option<u32>,
}

impl ReportQuery {
    pub fn new(metrics: &[&'static str], start: NaiveDate, end: NaiveDate) -> Self {
        ReportQuery {
            metrics: metrics.to_vec(),
            dimensions: None,
            sort: None,
            start,
            end,
            currency: None,
            limit: None,
        }
    }

    pub fn dimensions(mut self, dimensions: &'static str) -> Self {
        self.dimensions = Some(dimensions);
        self
    }

    pub fn sort(mut self, sort: &'static str) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = Some(currency.into());
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn metrics_param(&self) -> String {
        self.metrics.join(",")
    }
}

/// Raw analytics response body. `rows` is missing entirely when the
/// provider has nothing for the window.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryResponse {
    #[serde(default)]
    pub rows: Option<Vec<Row>>,
}

/// Outcome of one best-effort fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum Fetched {
    Rows(Vec<Row>),
    Absent,
}

impl Fetched {
    pub fn from_response(response: QueryResponse) -> Self {
        match response.rows {
            Some(rows) => Fetched::Rows(rows),
            None => Fetched::Absent,
        }
    }

    /// All rows, or none when absent.
    pub fn rows(&self) -> &[Row] {
        match self {
            Fetched::Rows(rows) => rows,
            Fetched::Absent => &[],
        }
    }

    /// The first row of a totals query, if the provider returned one.
    pub fn first_row(&self) -> Option<&Row> {
        self.rows().first()
    }
}

/// Analytics query capability.
#[async_trait]
pub trait AnalyticsSource: Send + Sync {
    async fn query(&self, query: &ReportQuery) -> Result<QueryResponse, QueryError>;
}

/// Catalog capability resolving content ids to display titles. Unknown ids
/// are simply missing from the returned map.
#[async_trait]
pub trait TitleCatalog: Send + Sync {
    async fn lookup_titles(&self, ids: &[String]) -> Result<HashMap<String, String>, QueryError>;
}

/// Numeric cell, null, non-numeric or non-finite coalesced to zero.
pub fn cell_f64(row: &Row, idx: usize) -> f64 {
    let value = match row.get(idx) {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    value.filter(|f| f.is_finite()).unwrap_or(0.0)
}

/// Integer count cell, null or non-numeric coalesced to zero.
pub fn cell_u64(row: &Row, idx: usize) -> u64 {
    match row.get(idx) {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| {
                n.as_f64()
                    .filter(|f| f.is_finite() && *f > 0.0)
                    .map(|f| f.round() as u64)
            })
            .unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

/// Text cell (dimension value). Numbers are rendered as text.
pub fn cell_str(row: &Row, idx: usize) -> Option<String> {
    match row.get(idx) {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}
