use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a usage report on the commerce platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Draft,
    Ready,
    Uploading,
    Processing,
    Accepted,
    Rejected,
    Invalid,
    Deleted,
    #[serde(untagged)]
    Unknown(String),
}

impl ReportStatus {
    pub fn from_wire(value: &str) -> Self {
        match value {
            "draft" => Self::Draft,
            "ready" => Self::Ready,
            "uploading" => Self::Uploading,
            "processing" => Self::Processing,
            "accepted" => Self::Accepted,
            "rejected" => Self::Rejected,
            "invalid" => Self::Invalid,
            "deleted" => Self::Deleted,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Draft => "draft",
            Self::Ready => "ready",
            Self::Uploading => "uploading",
            Self::Processing => "processing",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Invalid => "invalid",
            Self::Deleted => "deleted",
            Self::Unknown(other) => other,
        }
    }

    /// The platform is still working on the report; no new report may be
    /// opened for the subscription until it settles.
    pub fn is_in_progress(&self) -> bool {
        matches!(
            self,
            Self::Processing | Self::Draft | Self::Uploading | Self::Ready
        )
    }

    /// The report needs manual clearing before reporting can continue.
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Invalid | Self::Rejected)
    }
}

/// Summary of a usage report already known to the platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageReport {
    pub name: String,
    pub description: String,
    pub status: ReportStatus,
    pub uploaded_at: DateTime<Utc>,
}

/// A one-hour reporting bucket aligned to whole hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportingWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl ReportingWindow {
    /// Builds the window starting at `start` truncated down to the hour.
    pub fn from_start(start: DateTime<Utc>) -> Self {
        let start = truncate_to_hour(start);
        Self {
            start,
            end: start + chrono::Duration::hours(1),
        }
    }

    /// Builds the window ending at `end` truncated down to the hour.
    pub fn ending_at(end: DateTime<Utc>) -> Self {
        let end = truncate_to_hour(end);
        Self {
            start: end - chrono::Duration::hours(1),
            end,
        }
    }
}

/// One consumption value submitted to the platform for a resource type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub usage_record_id: String,
    pub item_search_criteria: String,
    pub item_search_value: String,
    pub amount: f64,
    pub quantity: f64,
    pub start_time_utc: String,
    pub end_time_utc: String,
    pub asset_search_criteria: String,
    pub asset_search_value: String,
}

pub fn truncate_to_hour(value: DateTime<Utc>) -> DateTime<Utc> {
    value
        .with_minute(0)
        .and_then(|dt| dt.with_second(0))
        .and_then(|dt| dt.with_nanosecond(0))
        .unwrap_or(value)
}

/// Report name as the platform expects it: `{subscription}_{YYYY-MM-DD_HHh}`.
pub fn report_name(subscription_id: &str, start: DateTime<Utc>) -> String {
    format!("{}_{}", subscription_id, start.format("%Y-%m-%d_%Hh"))
}

/// Report description: `Report for {subscription} {YYYY-MM-DD HH:MM:SS}`.
pub fn report_description(subscription_id: &str, start: DateTime<Utc>) -> String {
    format!(
        "Report for {} {}",
        subscription_id,
        start.format("%Y-%m-%d %H:%M:%S")
    )
}

/// Idempotency key for a usage record:
/// `{subscription}-{end isoformat}-{resource}`.
pub fn usage_record_id(subscription_id: &str, end: DateTime<Utc>, resource_id: &str) -> String {
    format!(
        "{}-{}-{}",
        subscription_id,
        end.format("%Y-%m-%dT%H:%M:%S"),
        resource_id
    )
}

pub fn format_record_time(value: DateTime<Utc>) -> String {
    value.format("%Y-%m-%d %H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn status_round_trips_wire_strings() {
        for wire in [
            "draft",
            "ready",
            "uploading",
            "processing",
            "accepted",
            "rejected",
            "invalid",
            "deleted",
        ] {
            assert_eq!(ReportStatus::from_wire(wire).as_str(), wire);
        }
        let status = ReportStatus::from_wire("archived");
        assert_eq!(status, ReportStatus::Unknown("archived".to_string()));
        assert_eq!(status.as_str(), "archived");
    }

    #[test]
    fn window_from_start_truncates_and_spans_one_hour() {
        let window = ReportingWindow::from_start(ts(2025, 3, 10, 14, 37, 12));
        assert_eq!(window.start, ts(2025, 3, 10, 14, 0, 0));
        assert_eq!(window.end, ts(2025, 3, 10, 15, 0, 0));
    }

    #[test]
    fn window_ending_at_uses_preceding_hour() {
        let window = ReportingWindow::ending_at(ts(2025, 3, 10, 9, 47, 3));
        assert_eq!(window.start, ts(2025, 3, 10, 8, 0, 0));
        assert_eq!(window.end, ts(2025, 3, 10, 9, 0, 0));
    }

    #[test]
    fn naming_matches_platform_conventions() {
        let start = ts(2025, 3, 10, 8, 0, 0);
        assert_eq!(report_name("AS-123", start), "AS-123_2025-03-10_08h");
        assert_eq!(
            report_description("AS-123", start),
            "Report for AS-123 2025-03-10 08:00:00"
        );
        assert_eq!(
            usage_record_id("AS-123", ts(2025, 3, 10, 9, 0, 0), "cpu"),
            "AS-123-2025-03-10T09:00:00-cpu"
        );
    }
}
