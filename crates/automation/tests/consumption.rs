use std::collections::HashMap;

use automation::{
    Consumption, ConsumptionError, ProcessedLog, UsageAutomation, UsageOutcome, UsageRequest,
    ZeroUsage, collect_usage_records,
};
use chrono::{DateTime, TimeZone, Utc};
use connector_core::{ReportStatus, ReportingWindow, UsageReport};

struct FixedUsage(f64);

impl Consumption for FixedUsage {
    fn collect(
        &self,
        _subscription_id: &str,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> Result<f64, ConsumptionError> {
        Ok(self.0)
    }
}

struct BrokenUsage;

impl Consumption for BrokenUsage {
    fn collect(
        &self,
        _subscription_id: &str,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> Result<f64, ConsumptionError> {
        Err(ConsumptionError::new("cpu", "backend unreachable"))
    }
}

fn ts(h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 10, h, 0, 0).unwrap()
}

fn window() -> ReportingWindow {
    ReportingWindow::from_start(ts(10))
}

#[test]
fn unknown_resources_are_silently_skipped() {
    let mut sources: HashMap<String, Box<dyn Consumption>> = HashMap::new();
    sources.insert("cpu".to_string(), Box::new(FixedUsage(4.0)));
    let items = vec!["cpu".to_string(), "gpu".to_string()];
    let records = collect_usage_records(&sources, &items, "AS-1", window()).expect("records");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].item_search_value, "cpu");
    assert_eq!(records[0].amount, 4.0);
    assert_eq!(records[0].quantity, 4.0);
    assert_eq!(records[0].usage_record_id, "AS-1-2025-03-10T11:00:00-cpu");
    assert_eq!(records[0].start_time_utc, "2025-03-10 10:00:00");
    assert_eq!(records[0].end_time_utc, "2025-03-10 11:00:00");
}

#[test]
fn zero_usage_source_reports_zero() {
    let mut sources: HashMap<String, Box<dyn Consumption>> = HashMap::new();
    sources.insert("ip-address".to_string(), Box::new(ZeroUsage));
    let items = vec!["ip-address".to_string()];
    let records = collect_usage_records(&sources, &items, "AS-1", window()).expect("records");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].amount, 0.0);
}

#[test]
fn failing_source_aborts_collection() {
    let mut sources: HashMap<String, Box<dyn Consumption>> = HashMap::new();
    sources.insert("ram".to_string(), Box::new(FixedUsage(2.0)));
    sources.insert("cpu".to_string(), Box::new(BrokenUsage));
    let items = vec!["ram".to_string(), "cpu".to_string()];
    let result = collect_usage_records(&sources, &items, "AS-1", window());
    assert!(result.is_err());
}

#[test]
fn process_emits_submission_with_records() {
    let mut automation = UsageAutomation::new();
    automation.register_source("cpu", Box::new(FixedUsage(8.0)));
    automation.register_zero_usage(["ip-address"]);

    let request = UsageRequest {
        subscription_id: "AS-1".to_string(),
        prior_reports: vec![UsageReport {
            name: "AS-1_2025-03-10_09h".to_string(),
            description: "Report for AS-1 2025-03-10 09:00:00".to_string(),
            status: ReportStatus::Accepted,
            uploaded_at: ts(10),
        }],
        resume_marker: None,
        suspend_override_allowed: false,
        items: vec!["cpu".to_string(), "ip-address".to_string(), "gpu".to_string()],
    };

    let mut log = ProcessedLog::default();
    let outcome = automation
        .process(&request, ts(12), &mut log)
        .expect("outcome");
    match outcome {
        UsageOutcome::Submit { file, records } => {
            assert_eq!(file.name, "AS-1_2025-03-10_10h");
            assert_eq!(file.description, "Report for AS-1 2025-03-10 10:00:00");
            assert_eq!(file.window.start, ts(10));
            assert_eq!(file.window.end, ts(11));
            assert_eq!(records.len(), 2);
        }
        other => panic!("expected Submit, got {:?}", other),
    }
    assert_eq!(log.entries(), ["AS-1"]);
}

#[test]
fn process_records_subscription_even_when_skipping() {
    let automation = UsageAutomation::new();
    let request = UsageRequest {
        subscription_id: "AS-2".to_string(),
        prior_reports: vec![UsageReport {
            name: "AS-2_2025-03-10_09h".to_string(),
            description: "Report for AS-2 2025-03-10 09:00:00".to_string(),
            status: ReportStatus::Ready,
            uploaded_at: ts(10),
        }],
        resume_marker: None,
        suspend_override_allowed: false,
        items: vec![],
    };
    let mut log = ProcessedLog::default();
    let outcome = automation
        .process(&request, ts(12), &mut log)
        .expect("outcome");
    assert!(matches!(outcome, UsageOutcome::NoAction(_)));
    assert_eq!(log.entries(), ["AS-2"]);
}
