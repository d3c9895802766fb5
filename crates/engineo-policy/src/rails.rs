//! The safety-rail check chain.
//!
//! Evaluated immediately before the apply executor, over inputs freshly read
//! by the runtime - never over the (possibly stale) estimate. Unlike
//! estimation, the chain short-circuits: execution is imminent and must not
//! proceed on any single failure, so only the first failing check is
//! surfaced. Priority order: entitlement, scope boundary, draft validity,
//! daily limit.

use chrono::{DateTime, Utc};
use engineo_core::{AiDailyLimit, AssetId, PlaybookId, RailBlockReason, SafetyRailResult, TargetField};
use sha2::{Digest, Sha256};

/// Compute the signature of a resolved scope: playbook, target field and the
/// sorted asset ids. Two reads of the same logical scope produce the same
/// signature; any membership or condition change produces a different one.
pub fn scope_signature<'a>(
    playbook: PlaybookId,
    field: TargetField,
    asset_ids: impl IntoIterator<Item = &'a AssetId>,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(playbook.as_str().as_bytes());
    hasher.update(b"\x1f");
    hasher.update(field.to_string().as_bytes());
    for id in asset_ids {
        hasher.update(b"\x1f");
        hasher.update(id.as_str().as_bytes());
    }
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Fresh inputs to the guard chain, gathered by the runtime immediately
/// before evaluation.
#[derive(Debug, Clone)]
pub struct RailInputs<'a> {
    /// Plan tier identifier from a fresh entitlements read.
    pub plan: &'a str,
    /// Whether that plan still permits bulk automation.
    pub plan_eligible: bool,
    /// Signature of the freshly re-resolved scope.
    pub fresh_signature: &'a str,
    /// Signature recorded in the estimate snapshot this run is based on.
    pub estimate_signature: &'a str,
    /// Expiry of the newest draft backing the run's scope; `None` when no
    /// drafts exist at all (nothing backing the apply, so nothing expired).
    pub newest_draft_expiry: Option<DateTime<Utc>>,
    /// Evaluation instant.
    pub now: DateTime<Utc>,
    /// Daily usage counters from a fresh entitlements read.
    pub daily: AiDailyLimit,
}

/// Run the guard chain. First failing check wins.
pub fn evaluate_rails(inputs: &RailInputs<'_>) -> SafetyRailResult {
    if !inputs.plan_eligible {
        return SafetyRailResult::block(
            RailBlockReason::EntitlementDenied,
            format!(
                "Plan '{}' no longer permits bulk automation; upgrade to continue",
                inputs.plan
            ),
        );
    }

    if inputs.fresh_signature != inputs.estimate_signature {
        return SafetyRailResult::block(
            RailBlockReason::ScopeChanged,
            "The affected asset set changed since the estimate; regenerate the preview and estimate",
        );
    }

    if let Some(expiry) = inputs.newest_draft_expiry {
        if expiry <= inputs.now {
            return SafetyRailResult::block(
                RailBlockReason::DraftExpired,
                "The cached drafts backing this run have expired; regenerate them before applying",
            );
        }
    }

    if inputs.daily.exhausted() {
        return SafetyRailResult::block(
            RailBlockReason::DailyLimitReached,
            "The daily AI usage limit was reached since the estimate; retry tomorrow or upgrade",
        );
    }

    SafetyRailResult::clear()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn base_inputs<'a>(sig: &'a str) -> RailInputs<'a> {
        RailInputs {
            plan: "pro",
            plan_eligible: true,
            fresh_signature: sig,
            estimate_signature: sig,
            newest_draft_expiry: Some(Utc::now() + Duration::minutes(30)),
            now: Utc::now(),
            daily: AiDailyLimit::new(100, 10),
        }
    }

    #[test]
    fn all_checks_pass() {
        let result = evaluate_rails(&base_inputs("sig"));
        assert!(!result.blocked);
        assert_eq!(result.block_reason, RailBlockReason::None);
    }

    #[test]
    fn entitlement_check_wins_over_everything() {
        let mut inputs = base_inputs("sig");
        inputs.plan = "free";
        inputs.plan_eligible = false;
        inputs.estimate_signature = "other";
        inputs.daily = AiDailyLimit::new(10, 10);
        let result = evaluate_rails(&inputs);
        assert_eq!(result.block_reason, RailBlockReason::EntitlementDenied);
    }

    #[test]
    fn scope_change_detected_before_draft_expiry() {
        let mut inputs = base_inputs("sig");
        inputs.estimate_signature = "stale";
        inputs.newest_draft_expiry = Some(Utc::now() - Duration::minutes(1));
        let result = evaluate_rails(&inputs);
        assert_eq!(result.block_reason, RailBlockReason::ScopeChanged);
    }

    #[test]
    fn expired_drafts_block() {
        let mut inputs = base_inputs("sig");
        inputs.newest_draft_expiry = Some(inputs.now - Duration::seconds(1));
        let result = evaluate_rails(&inputs);
        assert_eq!(result.block_reason, RailBlockReason::DraftExpired);
    }

    #[test]
    fn missing_drafts_are_not_an_expiry_failure() {
        let mut inputs = base_inputs("sig");
        inputs.newest_draft_expiry = None;
        assert!(!evaluate_rails(&inputs).blocked);
    }

    #[test]
    fn concurrent_exhaustion_blocks_last() {
        let mut inputs = base_inputs("sig");
        inputs.daily = AiDailyLimit::new(100, 100);
        let result = evaluate_rails(&inputs);
        assert_eq!(result.block_reason, RailBlockReason::DailyLimitReached);
    }

    #[test]
    fn signature_is_order_insensitive_over_sorted_sets() {
        let a = AssetId::new("p1");
        let b = AssetId::new("p2");
        let sig1 = scope_signature(PlaybookId::MissingSeoTitle, TargetField::SeoTitle, [&a, &b]);
        let sig2 = scope_signature(PlaybookId::MissingSeoTitle, TargetField::SeoTitle, [&a, &b]);
        assert_eq!(sig1, sig2);

        let sig3 = scope_signature(PlaybookId::MissingSeoTitle, TargetField::SeoTitle, [&a]);
        assert_ne!(sig1, sig3);

        let sig4 = scope_signature(
            PlaybookId::MissingSeoDescription,
            TargetField::SeoDescription,
            [&a, &b],
        );
        assert_ne!(sig1, sig4);
    }
}
