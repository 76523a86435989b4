use std::collections::HashMap;
use std::sync::OnceLock;

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use regex::Regex;
use tracing::{error, info, warn};

use connector_core::{
    ReportStatus, ReportingWindow, UsageRecord, UsageReport, report_description, report_name,
    truncate_to_hour,
};

use crate::consumption::{Consumption, collect_usage_records};

/// Outcome of reconciling a subscription's report history against the clock.
///
/// The platform-facing dispatch layer interprets the tag to choose an action;
/// none of these are failures.
#[derive(Debug, Clone, PartialEq)]
pub enum WindowDecision {
    /// A new report should be emitted for `window`.
    Emit {
        window: ReportingWindow,
        name: String,
        description: String,
    },
    /// A report is still being processed by the platform.
    WaitInProgress { report_name: String },
    /// An invalid or rejected report must be cleared manually first.
    Blocked { report_name: String },
    /// Nothing to do this cycle.
    Skip { reason: SkipReason },
    /// The latest report carries a status this code does not recognize.
    UnknownStatus {
        report_name: String,
        status: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The candidate window has not elapsed yet.
    PeriodNotEnded,
    /// A report with the candidate name was already accepted.
    AlreadyReported,
}

#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("report `{name}` has an unparsable description `{description}`")]
    BadReportDescription { name: String, description: String },
}

/// Computes the next hourly reporting window for a subscription.
///
/// `prior_reports` is the platform's view of past reports for the
/// subscription; `resume_marker` is set when the subscription was resumed
/// after a suspension and `suspend_override_allowed` permits jumping the
/// window forward to it.
pub fn compute_next_window(
    prior_reports: &[UsageReport],
    now: DateTime<Utc>,
    resume_marker: Option<DateTime<Utc>>,
    suspend_override_allowed: bool,
) -> Result<WindowDecision, ReconcileError> {
    compute_next_window_for("", prior_reports, now, resume_marker, suspend_override_allowed)
}

/// Same as [`compute_next_window`] but names the report after
/// `subscription_id`.
pub fn compute_next_window_for(
    subscription_id: &str,
    prior_reports: &[UsageReport],
    now: DateTime<Utc>,
    resume_marker: Option<DateTime<Utc>>,
    suspend_override_allowed: bool,
) -> Result<WindowDecision, ReconcileError> {
    // Deleted reports are invisible to reconciliation.
    let latest = prior_reports
        .iter()
        .filter(|report| report.status != ReportStatus::Deleted)
        .max_by_key(|report| report.uploaded_at);

    let mut accepted_name = None;
    let window = match latest {
        Some(report) if report.status == ReportStatus::Accepted => {
            accepted_name = Some(report.name.as_str());
            let reported = accepted_report_time(report)?;
            let mut window = ReportingWindow::from_start(reported + Duration::hours(1));
            if suspend_override_allowed
                && let Some(marker) = resume_marker
                && marker > window.start
            {
                info!(
                    resume_marker = %marker,
                    window_start = %window.start,
                    "subscription was resumed after suspend, reporting restarts from the marker"
                );
                window = ReportingWindow::from_start(marker);
                if now < window.end {
                    error!(%subscription_id, "skipped: current report period is not ended");
                    return Ok(WindowDecision::Skip {
                        reason: SkipReason::PeriodNotEnded,
                    });
                }
            }
            window
        }
        Some(report) if report.status.is_in_progress() => {
            info!(%subscription_id, report = %report.name, "usage report is being processed");
            return Ok(WindowDecision::WaitInProgress {
                report_name: report.name.clone(),
            });
        }
        Some(report) if report.status.is_failed() => {
            // Reporting stays blocked until an operator removes the report.
            error!(%subscription_id, report = %report.name, "failed usage report found");
            return Ok(WindowDecision::Blocked {
                report_name: report.name.clone(),
            });
        }
        Some(report) => {
            error!(
                %subscription_id,
                report = %report.name,
                status = report.status.as_str(),
                "usage report has an unknown status"
            );
            return Ok(WindowDecision::UnknownStatus {
                report_name: report.name.clone(),
                status: report.status.as_str().to_string(),
            });
        }
        None => ReportingWindow::ending_at(now),
    };

    if window.end > now {
        error!(%subscription_id, "skipped: current report period is not ended");
        return Ok(WindowDecision::Skip {
            reason: SkipReason::PeriodNotEnded,
        });
    }

    let name = report_name(subscription_id, window.start);
    if accepted_name == Some(name.as_str()) {
        info!(%subscription_id, report = %name, "report for the current period already provided");
        return Ok(WindowDecision::Skip {
            reason: SkipReason::AlreadyReported,
        });
    }

    Ok(WindowDecision::Emit {
        window,
        description: report_description(subscription_id, window.start),
        name,
    })
}

/// Pulls the reporting timestamp out of an accepted report's description.
///
/// Descriptions end with `YYYY-MM-DD HH:MM:SS`; the result is truncated to
/// the hour the report covered.
fn accepted_report_time(report: &UsageReport) -> Result<DateTime<Utc>, ReconcileError> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| {
        Regex::new(r"(\d{4}-\d{1,2}-\d{1,2} \d{2}:\d{2}:\d{2})\s*$").expect("valid pattern")
    });
    let captured = pattern
        .captures(&report.description)
        .and_then(|captures| captures.get(1))
        .ok_or_else(|| ReconcileError::BadReportDescription {
            name: report.name.clone(),
            description: report.description.clone(),
        })?;
    let parsed = NaiveDateTime::parse_from_str(captured.as_str(), "%Y-%m-%d %H:%M:%S").map_err(
        |_| ReconcileError::BadReportDescription {
            name: report.name.clone(),
            description: report.description.clone(),
        },
    )?;
    Ok(truncate_to_hour(parsed.and_utc()))
}

/// Caller-owned record of the subscriptions a run touched.
#[derive(Debug, Default, Clone)]
pub struct ProcessedLog {
    entries: Vec<String>,
}

impl ProcessedLog {
    pub fn record(&mut self, subscription_id: &str) {
        self.entries.push(subscription_id.to_string());
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }
}

/// Inputs for one reconciliation pass over a subscription.
#[derive(Debug, Clone)]
pub struct UsageRequest {
    pub subscription_id: String,
    pub prior_reports: Vec<UsageReport>,
    pub resume_marker: Option<DateTime<Utc>>,
    pub suspend_override_allowed: bool,
    /// Resource ids (mpn) attached to the subscription.
    pub items: Vec<String>,
}

/// The usage-file artifact a caller should create when a window is emitted.
#[derive(Debug, Clone, PartialEq)]
pub struct UsageFileDraft {
    pub name: String,
    pub description: String,
    pub window: ReportingWindow,
}

/// Result of a full reconciliation pass.
#[derive(Debug)]
pub enum UsageOutcome {
    /// Hand `file` and `records` to the platform submission call.
    Submit {
        file: UsageFileDraft,
        records: Vec<UsageRecord>,
    },
    /// No submission this cycle; the decision says why.
    NoAction(WindowDecision),
}

#[derive(Debug, thiserror::Error)]
pub enum UsageError {
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
    #[error(transparent)]
    Consumption(#[from] crate::consumption::ConsumptionError),
}

/// Drives reconciliation and consumption collection for subscriptions.
///
/// Holds the registered consumption sources; the processed log belongs to the
/// caller and is threaded through `process`.
#[derive(Default)]
pub struct UsageAutomation {
    sources: HashMap<String, Box<dyn Consumption>>,
}

impl UsageAutomation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_source(&mut self, resource_id: &str, source: Box<dyn Consumption>) {
        self.sources.insert(resource_id.to_string(), source);
    }

    /// Attaches an always-zero source for each listed resource, as configured
    /// by `report_zero_usage`.
    pub fn register_zero_usage<'a>(&mut self, resource_ids: impl IntoIterator<Item = &'a str>) {
        for resource_id in resource_ids {
            self.register_source(resource_id, Box::new(crate::consumption::ZeroUsage));
        }
    }

    pub fn process(
        &self,
        request: &UsageRequest,
        now: DateTime<Utc>,
        log: &mut ProcessedLog,
    ) -> Result<UsageOutcome, UsageError> {
        log.record(&request.subscription_id);

        let decision = compute_next_window_for(
            &request.subscription_id,
            &request.prior_reports,
            now,
            request.resume_marker,
            request.suspend_override_allowed,
        )?;
        let (window, name, description) = match decision {
            WindowDecision::Emit {
                window,
                name,
                description,
            } => (window, name, description),
            other => return Ok(UsageOutcome::NoAction(other)),
        };

        info!(
            subscription = %request.subscription_id,
            start = %window.start,
            end = %window.end,
            "creating usage report"
        );
        let records = collect_usage_records(
            &self.sources,
            &request.items,
            &request.subscription_id,
            window,
        )?;
        if records.is_empty() {
            warn!(
                subscription = %request.subscription_id,
                "no known resources produced records for the window"
            );
        }
        Ok(UsageOutcome::Submit {
            file: UsageFileDraft {
                name,
                description,
                window,
            },
            records,
        })
    }
}
