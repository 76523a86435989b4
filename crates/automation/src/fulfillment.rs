use tracing::info;

/// The parts of a fulfillment request this screening step looks at.
#[derive(Debug, Clone)]
pub struct FulfillmentRequest {
    pub id: String,
    pub marketplace_id: String,
    /// Migration of the asset is handled by an external service; such
    /// requests must not be fulfilled here.
    pub needs_migration: bool,
}

/// Restricts processing to an allowlist of marketplaces, used to point a
/// test deployment at a test marketplace without touching production
/// requests.
#[derive(Debug, Clone, Default)]
pub struct MarketplaceFilter {
    allowed: Option<Vec<String>>,
}

impl MarketplaceFilter {
    pub fn allow_any() -> Self {
        Self { allowed: None }
    }

    pub fn allow_only(marketplaces: impl IntoIterator<Item = String>) -> Self {
        Self {
            allowed: Some(marketplaces.into_iter().collect()),
        }
    }

    pub fn rejects(&self, marketplace_id: &str) -> bool {
        match &self.allowed {
            Some(allowed) => !allowed.iter().any(|id| id == marketplace_id),
            None => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FulfillmentDecision {
    Process,
    Skip { reason: String },
}

/// Screens a fulfillment request before any backend work happens.
pub fn screen_fulfillment(
    request: &FulfillmentRequest,
    filter: &MarketplaceFilter,
) -> FulfillmentDecision {
    if request.needs_migration {
        info!(request = %request.id, "skipping request because it needs migration");
        return FulfillmentDecision::Skip {
            reason: "needs migration".to_string(),
        };
    }
    if filter.rejects(&request.marketplace_id) {
        info!(
            request = %request.id,
            marketplace = %request.marketplace_id,
            "skipping request from filtered marketplace"
        );
        return FulfillmentDecision::Skip {
            reason: format!("marketplace {} is filtered out", request.marketplace_id),
        };
    }
    FulfillmentDecision::Process
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(needs_migration: bool, marketplace: &str) -> FulfillmentRequest {
        FulfillmentRequest {
            id: "PR-001".to_string(),
            marketplace_id: marketplace.to_string(),
            needs_migration,
        }
    }

    #[test]
    fn migration_requests_are_skipped() {
        let decision = screen_fulfillment(&request(true, "MP-1"), &MarketplaceFilter::allow_any());
        assert!(matches!(decision, FulfillmentDecision::Skip { .. }));
    }

    #[test]
    fn filtered_marketplaces_are_skipped() {
        let filter = MarketplaceFilter::allow_only(["MP-test".to_string()]);
        let decision = screen_fulfillment(&request(false, "MP-prod"), &filter);
        assert!(matches!(decision, FulfillmentDecision::Skip { .. }));
        let decision = screen_fulfillment(&request(false, "MP-test"), &filter);
        assert_eq!(decision, FulfillmentDecision::Process);
    }

    #[test]
    fn unfiltered_requests_are_processed() {
        let decision = screen_fulfillment(&request(false, "MP-1"), &MarketplaceFilter::allow_any());
        assert_eq!(decision, FulfillmentDecision::Process);
    }
}
