use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;

use crate::analytics::{AnalyticsSource, QueryError, QueryResponse, ReportQuery, TitleCatalog};
use crate::auth::Credentials;

/// Google-style error envelope: `{"error": {"code": 403, "message": "..."}}`
#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

#[derive(Deserialize)]
struct VideoListResponse {
    #[serde(default)]
    items: Vec<VideoItem>,
}

#[derive(Deserialize)]
struct VideoItem {
    id: String,
    snippet: Option<VideoSnippet>,
}

#[derive(Deserialize)]
struct VideoSnippet {
    title: String,
}

/// Turn a non-2xx response into a [`QueryError::Status`], keeping the
/// provider's message when it sent one.
async fn check_status(resp: Response) -> Result<Response, QueryError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let body = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorEnvelope>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body);

    Err(QueryError::Status {
        status: status.as_u16(),
        message,
    })
}

/// Analytics `reports` endpoint client.
pub struct YouTubeAnalytics {
    client: Client,
    base_url: String,
    channel_ids: String,
    credentials: Credentials,
}

impl YouTubeAnalytics {
    pub fn new(
        client: Client,
        base_url: &str,
        channel_ids: &str,
        credentials: Credentials,
    ) -> Self {
        YouTubeAnalytics {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            channel_ids: channel_ids.to_string(),
            credentials,
        }
    }

    fn query_params(&self, query: &ReportQuery) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("ids", self.channel_ids.clone()),
            ("startDate", query.start.format("%Y-%m-%d").to_string()),
            ("endDate", query.end.format("%Y-%m-%d").to_string()),
            ("metrics", query.metrics_param()),
        ];
        if let Some(dimensions) = query.dimensions {
            params.push(("dimensions", dimensions.to_string()));
        }
        if let Some(sort) = query.sort {
            params.push(("sort", sort.to_string()));
        }
        if let Some(limit) = query.limit {
            params.push(("maxResults", limit.to_string()));
        }
        if let Some(currency) = &query.currency {
            params.push(("currency", currency.clone()));
        }
        params
    }
}

#[async_trait]
impl AnalyticsSource for YouTubeAnalytics {
    async fn query(&self, query: &ReportQuery) -> Result<QueryResponse, QueryError> {
        let resp = self
            .client
            .get(format!("{}/reports", self.base_url))
            .bearer_auth(self.credentials.access_token())
            .query(&self.query_params(query))
            .send()
            .await?;

        let resp = check_status(resp).await?;
        let body = resp.text().await?;

        serde_json::from_str(&body).map_err(|e| QueryError::Malformed(e.to_string()))
    }
}

/// Data API `videos` endpoint client, used only for title lookups.
pub struct YouTubeData {
    client: Client,
    base_url: String,
    credentials: Credentials,
}

impl YouTubeData {
    pub fn new(client: Client, base_url: &str, credentials: Credentials) -> Self {
        YouTubeData {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
        }
    }
}

#[async_trait]
impl TitleCatalog for YouTubeData {
    async fn lookup_titles(&self, ids: &[String]) -> Result<HashMap<String, String>, QueryError> {
        let resp = self
            .client
            .get(format!("{}/videos", self.base_url))
            .bearer_auth(self.credentials.access_token())
            .query(&[("part", "snippet".to_string()), ("id", ids.join(","))])
            .send()
            .await?;

        let resp = check_status(resp).await?;
        let body = resp.text().await?;
        let list: VideoListResponse =
            serde_json::from_str(&body).map_err(|e| QueryError::Malformed(e.to_string()))?;

        Ok(titles_from_items(list.items))
    }
}

fn titles_from_items(items: Vec<VideoItem>) -> HashMap<String, String> {
    items
        .into_iter()
        .filter_map(|item| item.snippet.map(|s| (item.id, s.title)))
        .collect()
}
