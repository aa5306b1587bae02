use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{
    de::{MapAccess, Visitor},
    ser::SerializeMap,
    Deserialize, Deserializer, Serialize, Serializer,
};

/// Dashboard payload. Rebuilt from scratch on every run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    #[serde(with = "timestamp_format")]
    pub last_updated: DateTime<Utc>,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,

    pub total_revenue: f64,
    pub cpm: f64,
    pub monetized_playbacks: u64,
    pub ad_impressions: u64,
    pub total_views: u64,
    pub rpm: f64,

    pub revenue_change: f64,
    pub rpm_change: f64,
    pub cpm_change: f64,
    pub playbacks_change: f64,

    pub revenue_chart: RevenueChart,
    pub ad_type_breakdown: AdTypeBreakdown,
    pub top_earning_videos: Vec<TopVideo>,

    pub projected_monthly_revenue: f64,
}

/// Daily revenue series, `labels[i]` pairs with `values[i]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RevenueChart {
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

impl RevenueChart {
    pub fn push(&mut self, label: String, value: f64) {
        self.labels.push(label);
        self.values.push(value);
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdTypeShare {
    pub percentage: f64,
    pub revenue: f64,
}

/// Ad type label -> share, kept in insertion order (descending revenue as
/// returned by the provider). Serialized as a JSON object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdTypeBreakdown(Vec<(String, AdTypeShare)>);

impl AdTypeBreakdown {
    /// Insert a share. An existing label keeps its position and takes the new value.
    pub fn insert(&mut self, label: String, share: AdTypeShare) {
        match self.0.iter_mut().find(|(l, _)| *l == label) {
            Some(entry) => entry.1 = share,
            None => self.0.push((label, share)),
        }
    }

    pub fn get(&self, label: &str) -> Option<&AdTypeShare> {
        self.0.iter().find(|(l, _)| l == label).map(|(_, s)| s)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, AdTypeShare)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for AdTypeBreakdown {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (label, share) in &self.0 {
            map.serialize_entry(label, share)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for AdTypeBreakdown {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct BreakdownVisitor;

        impl<'de> Visitor<'de> for BreakdownVisitor {
            type Value = AdTypeBreakdown;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of ad type label to share")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut breakdown = AdTypeBreakdown::default();
                while let Some((label, share)) = access.next_entry::<String, AdTypeShare>()? {
                    breakdown.insert(label, share);
                }
                Ok(breakdown)
            }
        }

        deserializer.deserialize_map(BreakdownVisitor)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopVideo {
    pub title: String,
    pub revenue: f64,
    pub views: u64,
    pub video_id: String,
}

/// `2024-10-01 06:00:00 UTC`, second precision.
mod timestamp_format {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

    pub fn serialize<S: Serializer>(
        date: &DateTime<Utc>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&date.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error> {
        let s = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&s, FORMAT)
            .map(|naive| naive.and_utc())
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::{json, Value};

    fn sample_report() -> Report {
        let mut revenue_chart = RevenueChart::default();
        revenue_chart.push("Sep 30".to_string(), 4.12);
        revenue_chart.push("Oct 01".to_string(), 5.5);

        let mut ad_type_breakdown = AdTypeBreakdown::default();
        ad_type_breakdown.insert(
            "Auction Instream".to_string(),
            AdTypeShare {
                percentage: 70.5,
                revenue: 70.5,
            },
        );
        ad_type_breakdown.insert(
            "Auction Display".to_string(),
            AdTypeShare {
                percentage: 29.5,
                revenue: 29.5,
            },
        );

        Report {
            last_updated: Utc.with_ymd_and_hms(2024, 10, 2, 6, 30, 15).unwrap(),
            period_start: NaiveDate::from_ymd_opt(2024, 9, 2).unwrap(),
            period_end: NaiveDate::from_ymd_opt(2024, 10, 1).unwrap(),
            total_revenue: 100.0,
            cpm: 4.25,
            monetized_playbacks: 12_000,
            ad_impressions: 15_500,
            total_views: 40_000,
            rpm: 2.5,
            revenue_change: 12.3,
            rpm_change: -4.1,
            cpm_change: 0.0,
            playbacks_change: 8.8,
            revenue_chart,
            ad_type_breakdown,
            top_earning_videos: vec![TopVideo {
                title: "Episode 42".to_string(),
                revenue: 31.07,
                views: 9_001,
                video_id: "dQw4w9WgXcQ".to_string(),
            }],
            projected_monthly_revenue: 100.0,
        }
    }

    #[test]
    fn test_round_trip() {
        let report = sample_report();

        let text = serde_json::to_string_pretty(&report).unwrap();
        let parsed: Report = serde_json::from_str(&text).unwrap();

        assert_eq!(parsed, report);
    }

    #[test]
    fn test_field_contract() {
        let value = serde_json::to_value(sample_report()).unwrap();

        assert_eq!(value["last_updated"], json!("2024-10-02 06:30:15 UTC"));
        assert_eq!(value["period_start"], json!("2024-09-02"));
        assert_eq!(value["period_end"], json!("2024-10-01"));
        assert_eq!(value["monetized_playbacks"], json!(12_000));
        assert_eq!(value["revenue_chart"]["labels"], json!(["Sep 30", "Oct 01"]));
        assert_eq!(value["revenue_chart"]["values"], json!([4.12, 5.5]));
        assert_eq!(
            value["ad_type_breakdown"]["Auction Display"],
            json!({"percentage": 29.5, "revenue": 29.5})
        );
        assert_eq!(value["top_earning_videos"][0]["video_id"], json!("dQw4w9WgXcQ"));

        let keys: Vec<&str> = match &value {
            Value::Object(map) => map.keys().map(String::as_str).collect(),
            _ => panic!("report must serialize as an object"),
        };
        for key in [
            "last_updated",
            "total_revenue",
            "cpm",
            "ad_impressions",
            "total_views",
            "rpm",
            "revenue_change",
            "rpm_change",
            "cpm_change",
            "playbacks_change",
            "projected_monthly_revenue",
        ] {
            assert!(keys.contains(&key), "missing {key}");
        }
    }

    #[test]
    fn test_breakdown_serializes_in_insertion_order() {
        let text = serde_json::to_string(&sample_report().ad_type_breakdown).unwrap();

        let instream = text.find("Auction Instream").unwrap();
        let display = text.find("Auction Display").unwrap();
        assert!(instream < display);
    }

    #[test]
    fn test_bad_timestamp_rejected() {
        let mut value = serde_json::to_value(sample_report()).unwrap();
        value["last_updated"] = json!("yesterday");

        assert!(serde_json::from_value::<Report>(value).is_err());
    }
}
