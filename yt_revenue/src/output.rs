use std::fs;

use anyhow::{Context, Result};
use aws_sdk_s3::Client as S3Client;
use tracing::info;

use crate::config::Destination;
use crate::report::Report;

/// Where the serialized report is written. Each write replaces the previous
/// artifact wholesale.
pub enum ReportSink {
    LocalFile(String),
    S3 {
        client: S3Client,
        bucket: String,
        key: String,
    },
}

impl ReportSink {
    pub async fn from_destination(destination: &Destination) -> Result<Self> {
        match destination {
            Destination::LocalFile(path) => {
                info!("Using local file output: {}", path);
                Ok(ReportSink::LocalFile(path.clone()))
            }
            Destination::S3 {
                bucket,
                prefix,
                file_name,
            } => {
                info!("Initializing S3 client...");
                let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
                    .load()
                    .await;
                let client = S3Client::new(&config);

                let key = object_key(prefix, file_name);
                info!("Using S3 output: s3://{}/{}", bucket, key);

                Ok(ReportSink::S3 {
                    client,
                    bucket: bucket.clone(),
                    key,
                })
            }
        }
    }

    /// Human-readable location for log lines.
    pub fn location(&self) -> String {
        match self {
            ReportSink::LocalFile(path) => path.clone(),
            ReportSink::S3 { bucket, key, .. } => format!("s3://{}/{}", bucket, key),
        }
    }

    pub async fn write(&self, report: &Report) -> Result<()> {
        let content = render(report)?;

        match self {
            ReportSink::LocalFile(path) => {
                fs::write(path, content)
                    .with_context(|| format!("Failed to write report file: {}", path))?;
                Ok(())
            }
            ReportSink::S3 {
                client,
                bucket,
                key,
            } => {
                client
                    .put_object()
                    .bucket(bucket.as_str())
                    .key(key.as_str())
                    .body(content.into_bytes().into())
                    .content_type("application/json")
                    .send()
                    .await
                    .with_context(|| format!("Failed to write to S3: s3://{}/{}", bucket, key))?;
                Ok(())
            }
        }
    }
}

/// Pretty JSON, 2-space indent, trailing newline.
pub fn render(report: &Report) -> Result<String> {
    let mut json =
        serde_json::to_string_pretty(report).context("Failed to serialize report to JSON")?;
    json.push('\n');
    Ok(json)
}

fn object_key(prefix: &str, file_name: &str) -> String {
    if prefix.is_empty() {
        file_name.to_string()
    } else {
        format!("{}/{}", prefix.trim_end_matches('/'), file_name)
    }
}
