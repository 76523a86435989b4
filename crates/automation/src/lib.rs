mod consumption;
mod fulfillment;
mod usage;
mod usage_file;

pub use consumption::{Consumption, ConsumptionError, ZeroUsage, collect_usage_records};
pub use fulfillment::{
    FulfillmentDecision, FulfillmentRequest, MarketplaceFilter, screen_fulfillment,
};
pub use usage::{
    ProcessedLog, ReconcileError, SkipReason, UsageAutomation, UsageError, UsageFileDraft,
    UsageOutcome, UsageRequest, WindowDecision, compute_next_window, compute_next_window_for,
};
pub use usage_file::{FileAction, dispatch_usage_file};
