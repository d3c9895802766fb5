//! Blocking-reason derivation for estimates.
//!
//! Unlike the safety rails, estimation does not short-circuit: every reason
//! that holds is reported so the caller can display all blocking causes at
//! once. The predicates run in a fixed order: plan ineligible, zero matching
//! assets, daily limit exhausted, next suggestion over remaining capacity.
//!
//! The token cap compares the cost of a single suggestion against the
//! remaining daily budget. A scope whose total cost exceeds the budget is not
//! blocked up front: such a run proceeds quota-bounded and ends with a
//! partial result.

use engineo_core::{AiDailyLimit, BlockingReason};
use std::collections::BTreeSet;

/// Inputs to blocking-reason derivation, gathered by the estimate resolver.
#[derive(Debug, Clone)]
pub struct EligibilityInputs<'a> {
    /// Plan tier identifier, as reported by the entitlements collaborator.
    pub plan: &'a str,
    /// Whether the plan tier is eligible for bulk automation.
    pub plan_eligible: bool,
    /// Number of assets matching the playbook's gap condition within scope.
    pub matching_assets: u64,
    /// Token cost of a single suggestion for this playbook.
    pub tokens_per_asset: u64,
    /// Daily AI usage counters at derivation time.
    pub daily: AiDailyLimit,
}

/// Derive all blocking reasons that hold for the given inputs.
pub fn derive_reasons(inputs: &EligibilityInputs<'_>) -> BTreeSet<BlockingReason> {
    let mut reasons = BTreeSet::new();

    if !inputs.plan_eligible {
        reasons.insert(BlockingReason::PlanNotEligible);
    }

    if inputs.matching_assets == 0 {
        reasons.insert(BlockingReason::NoAffectedProducts);
    }

    if inputs.daily.exhausted() {
        reasons.insert(BlockingReason::AiDailyLimitReached);
    }

    if inputs.tokens_per_asset > inputs.daily.remaining {
        reasons.insert(BlockingReason::TokenCapWouldBeExceeded);
    }

    if !reasons.is_empty() {
        tracing::debug!(
            plan = inputs.plan,
            matching = inputs.matching_assets,
            reasons = %reasons.iter().map(|r| r.to_string()).collect::<Vec<_>>().join(","),
            "estimate blocked"
        );
    }

    reasons
}
