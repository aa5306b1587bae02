mod analytics;
mod auth;
mod builder;
mod config;
mod metrics;
mod output;
mod period;
mod report;
mod youtube;

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{SubsecRound, Utc};
use reqwest::Client;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::auth::load_credentials;
use crate::builder::ReportBuilder;
use crate::config::Config;
use crate::output::ReportSink;
use crate::report::Report;
use crate::youtube::{YouTubeAnalytics, YouTubeData};

/// Fetches 30-day monetization analytics for one channel and writes the
/// dashboard JSON. Takes no arguments; see [`Config`] for the environment.
///
/// Exits non-zero only when configuration or credentials are unusable, or the
/// finished report cannot be written. Individual fetch failures are logged
/// and show up as zeros in the report.
#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = Config::from_env()?;
    info!("Starting YouTube monetization data fetch...");

    let now = Utc::now();
    let credentials = load_credentials(Path::new(&config.token_file), now)
        .context("Invalid or missing credentials, regenerate the token file")?;
    info!("Authentication successful");

    let sink = ReportSink::from_destination(&config.destination).await?;

    let http = Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")?;
    let analytics = YouTubeAnalytics::new(
        http.clone(),
        &config.analytics_endpoint,
        &config.channel_ids,
        credentials.clone(),
    );
    let catalog = YouTubeData::new(http, &config.data_endpoint, credentials);

    let reference_date = config.reference_date.unwrap_or_else(|| now.date_naive());
    let report = ReportBuilder::new(&analytics, &catalog, config.currency.clone())
        .build_report(reference_date, now.trunc_subsecs(0))
        .await;

    sink.write(&report).await?;
    info!("Data successfully saved to {}", sink.location());

    print_summary(&report);
    Ok(())
}

fn print_summary(report: &Report) {
    println!();
    println!("Total Revenue: ${:.2}", report.total_revenue);
    println!("RPM: ${:.2}", report.rpm);
    println!("CPM: ${:.2}", report.cpm);
    println!("Monetized Playbacks: {}", with_thousands(report.monetized_playbacks));
    println!("Ad Impressions: {}", with_thousands(report.ad_impressions));
    println!(
        "Top Earning Video: {}",
        report
            .top_earning_videos
            .first()
            .map(|v| v.title.as_str())
            .unwrap_or("N/A")
    );
}

/// `1234567` -> `1,234,567`
fn with_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
