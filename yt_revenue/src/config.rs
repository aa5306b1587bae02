use std::env;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;

pub const DEFAULT_ANALYTICS_ENDPOINT: &str = "https://youtubeanalytics.googleapis.com/v2";
pub const DEFAULT_DATA_ENDPOINT: &str = "https://www.googleapis.com/youtube/v3";

/// Where the finished report goes.
#[derive(Debug, Clone, PartialEq)]
pub enum Destination {
    LocalFile(String),
    S3 {
        bucket: String,
        prefix: String,
        file_name: String,
    },
}

/// Runtime configuration, read once from the environment.
///
/// Environment variables:
/// - YT_TOKEN_FILE: credential file (default: token.json)
/// - YT_ANALYTICS_ENDPOINT: analytics API base URL
/// - YT_DATA_ENDPOINT: data API base URL used for title lookups
/// - YT_CHANNEL_IDS: channel selector (default: channel==MINE)
/// - YT_CURRENCY: reporting currency (default: USD)
/// - OUTPUT_DESTINATION: "local" or "s3" (default: local)
/// - OUTPUT_FILE: report path, or object name for s3 (default: youtube_monetization.json)
/// - S3_BUCKET: bucket name (required for s3)
/// - S3_PREFIX: key prefix (optional)
/// - REFERENCE_DATE: YYYY-MM-DD to use instead of today
#[derive(Debug, Clone)]
pub struct Config {
    pub token_file: String,
    pub analytics_endpoint: String,
    pub data_endpoint: String,
    pub channel_ids: String,
    pub currency: String,
    pub destination: Destination,
    pub reference_date: Option<NaiveDate>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup so tests don't have to
    /// mutate the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let output_file = var("OUTPUT_FILE", "youtube_monetization.json");

        let destination = match var("OUTPUT_DESTINATION", "local").as_str() {
            "local" => Destination::LocalFile(output_file),
            "s3" => {
                let bucket = lookup("S3_BUCKET")
                    .filter(|v| !v.trim().is_empty())
                    .context("S3_BUCKET environment variable required when OUTPUT_DESTINATION=s3")?;
                Destination::S3 {
                    bucket,
                    prefix: lookup("S3_PREFIX").unwrap_or_default(),
                    file_name: output_file,
                }
            }
            other => bail!("unknown OUTPUT_DESTINATION '{other}', expected one of: local|s3"),
        };

        let reference_date = match lookup("REFERENCE_DATE").filter(|v| !v.trim().is_empty()) {
            Some(raw) => Some(
                NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").with_context(|| {
                    format!("invalid REFERENCE_DATE '{raw}', expected YYYY-MM-DD")
                })?,
            ),
            None => None,
        };

        Ok(Config {
            token_file: var("YT_TOKEN_FILE", "token.json"),
            analytics_endpoint: var("YT_ANALYTICS_ENDPOINT", DEFAULT_ANALYTICS_ENDPOINT),
            data_endpoint: var("YT_DATA_ENDPOINT", DEFAULT_DATA_ENDPOINT),
            channel_ids: var("YT_CHANNEL_IDS", "channel==MINE"),
            currency: var("YT_CURRENCY", "USD"),
            destination,
            reference_date,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();

        assert_eq!(config.token_file, "token.json");
        assert_eq!(config.analytics_endpoint, DEFAULT_ANALYTICS_ENDPOINT);
        assert_eq!(config.data_endpoint, DEFAULT_DATA_ENDPOINT);
        assert_eq!(config.channel_ids, "channel==MINE");
        assert_eq!(config.currency, "USD");
        assert_eq!(
            config.destination,
            Destination::LocalFile("youtube_monetization.json".to_string())
        );
        assert!(config.reference_date.is_none());
    }

    #[test]
    fn test_s3_destination() {
        let config = config_from(&[
            ("OUTPUT_DESTINATION", "s3"),
            ("S3_BUCKET", "dashboards"),
            ("S3_PREFIX", "podcast/"),
        ])
        .unwrap();

        assert_eq!(
            config.destination,
            Destination::S3 {
                bucket: "dashboards".to_string(),
                prefix: "podcast/".to_string(),
                file_name: "youtube_monetization.json".to_string(),
            }
        );
    }

    #[test]
    fn test_s3_requires_bucket() {
        let err = config_from(&[("OUTPUT_DESTINATION", "s3")]).unwrap_err();
        assert!(err.to_string().contains("S3_BUCKET"));
    }

    #[test]
    fn test_unknown_destination_rejected() {
        assert!(config_from(&[("OUTPUT_DESTINATION", "ftp")]).is_err());
    }

    #[test]
    fn test_reference_date_override() {
        let config = config_from(&[("REFERENCE_DATE", "2024-03-15")]).unwrap();
        assert_eq!(
            config.reference_date,
            NaiveDate::from_ymd_opt(2024, 3, 15)
        );

        assert!(config_from(&[("REFERENCE_DATE", "15/03/2024")]).is_err());
    }
}
