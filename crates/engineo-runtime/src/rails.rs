//! Safety rail evaluation.
//!
//! Runs immediately before the apply executor, over fresh collaborator reads
//! rather than the (possibly stale) estimate. A blocked result means the
//! executor must not start and zero assets are mutated; every block is
//! written to the audit trail.

use crate::adapter::Collaborators;
use crate::error::RuntimeError;
use engineo_audit::AuditLogger;
use engineo_core::{
    PlaybookDefinition, PlaybookEstimate, PlansConfig, ProjectId, RunId, SafetyRailResult,
    ScopeSelection,
};
use engineo_policy::{evaluate_rails, resolve_scope, scope_signature, RailInputs};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Evaluates the pre-execution guard chain with fresh reads.
pub struct SafetyRailEvaluator {
    collaborators: Collaborators,
    plans: PlansConfig,
    audit: Arc<AuditLogger>,
}

impl SafetyRailEvaluator {
    pub fn new(collaborators: Collaborators, plans: PlansConfig, audit: Arc<AuditLogger>) -> Self {
        Self {
            collaborators,
            plans,
            audit,
        }
    }

    /// Re-run the checks the estimate was based on, in priority order:
    /// entitlement, scope boundary, draft validity, daily limit. The first
    /// failing check wins.
    pub async fn evaluate(
        &self,
        project: &ProjectId,
        run_id: RunId,
        playbook: &PlaybookDefinition,
        scope: &ScopeSelection,
        estimate: &PlaybookEstimate,
    ) -> Result<SafetyRailResult, RuntimeError> {
        let field = playbook.target_field;

        let snapshot = self.collaborators.entitlements.snapshot(project).await?;
        let plan_eligible = self.plans.is_eligible(&snapshot.plan);

        // Re-resolve the scope against the current matching set; any
        // membership change since the estimate shows up in the signature.
        let matching: BTreeSet<_> = self
            .collaborators
            .assets
            .list_matching(project, field)
            .await?
            .into_iter()
            .map(|a| a.id)
            .collect();
        let fresh = resolve_scope(scope.option, &scope.asset_ids, &matching)?;
        let fresh_signature = scope_signature(playbook.id, field, &fresh.asset_ids);

        let mut newest_draft_expiry = None;
        for asset_id in scope.asset_ids.iter() {
            if let Some(draft) = self.collaborators.drafts.get(project, asset_id, field).await? {
                newest_draft_expiry = match newest_draft_expiry {
                    Some(current) if current >= draft.expires_at => Some(current),
                    _ => Some(draft.expires_at),
                };
            }
        }

        let result = evaluate_rails(&RailInputs {
            plan: &snapshot.plan,
            plan_eligible,
            fresh_signature: &fresh_signature,
            estimate_signature: &estimate.scope_signature,
            newest_draft_expiry,
            now: chrono::Utc::now(),
            daily: snapshot.daily(),
        });

        if result.blocked {
            tracing::warn!(
                project = %project,
                playbook = %playbook.id,
                reason = %result.block_reason,
                "safety rail blocked the run"
            );
            self.audit
                .log_rail_blocked(
                    project.as_str(),
                    &run_id.to_string(),
                    playbook.id.as_str(),
                    &result.block_reason.to_string(),
                )
                .await?;
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{
        MemoryAssetStore, MemoryDraftCache, MeteredEntitlements, RuleSuggestionProvider,
        StaticAuthorizer,
    };
    use engineo_core::{
        AiDailyLimit, AssetId, BlockingReason, Capabilities, Draft, PlaybookCatalog, PlaybookId,
        RailBlockReason, ScopeOption,
    };

    fn collaborators(store: MemoryAssetStore, entitlements: MeteredEntitlements) -> Collaborators {
        Collaborators {
            assets: Arc::new(store),
            suggestions: Arc::new(RuleSuggestionProvider::new()),
            entitlements: Arc::new(entitlements),
            authorizer: Arc::new(StaticAuthorizer::new(Capabilities {
                can_view: true,
                can_apply: true,
            })),
            drafts: Arc::new(MemoryDraftCache::new()),
        }
    }

    fn evaluator(collaborators: Collaborators) -> SafetyRailEvaluator {
        SafetyRailEvaluator::new(
            collaborators,
            PlansConfig::default(),
            Arc::new(AuditLogger::disabled()),
        )
    }

    fn title_playbook() -> PlaybookDefinition {
        PlaybookCatalog::builtin()
            .get(PlaybookId::MissingSeoTitle)
            .unwrap()
            .clone()
    }

    fn scope_of(ids: &[&str]) -> ScopeSelection {
        ScopeSelection {
            option: ScopeOption::AllExisting,
            asset_ids: ids.iter().map(|s| AssetId::new(*s)).collect(),
        }
    }

    fn estimate_for(scope: &ScopeSelection) -> PlaybookEstimate {
        PlaybookEstimate {
            total_affected_assets: scope.len() as u64,
            estimated_tokens: scope.len() as u64 * 60,
            plan_id: "pro".to_string(),
            eligible: true,
            can_proceed: true,
            reasons: std::collections::BTreeSet::<BlockingReason>::new(),
            ai_daily_limit: AiDailyLimit::new(1000, 0),
            scope_signature: scope_signature(
                PlaybookId::MissingSeoTitle,
                engineo_core::TargetField::SeoTitle,
                &scope.asset_ids,
            ),
        }
    }

    #[tokio::test]
    async fn unchanged_scope_passes() {
        let store = MemoryAssetStore::new();
        store.insert_asset("p1", "Red Mug", None, None);
        let scope = scope_of(&["p1"]);
        let estimate = estimate_for(&scope);
        let evaluator = evaluator(collaborators(store, MeteredEntitlements::new("pro", 1000)));

        let result = evaluator
            .evaluate(
                &ProjectId::new("proj_1"),
                RunId::new(),
                &title_playbook(),
                &scope,
                &estimate,
            )
            .await
            .unwrap();
        assert!(!result.blocked);
    }

    #[tokio::test]
    async fn plan_downgrade_blocks_with_entitlement_denied() {
        let store = MemoryAssetStore::new();
        store.insert_asset("p1", "Red Mug", None, None);
        let scope = scope_of(&["p1"]);
        let estimate = estimate_for(&scope);
        let entitlements = MeteredEntitlements::new("pro", 1000);
        entitlements.set_plan("free");
        let evaluator = evaluator(collaborators(store, entitlements));

        let result = evaluator
            .evaluate(
                &ProjectId::new("proj_1"),
                RunId::new(),
                &title_playbook(),
                &scope,
                &estimate,
            )
            .await
            .unwrap();
        assert!(result.blocked);
        assert_eq!(result.block_reason, RailBlockReason::EntitlementDenied);
    }

    #[tokio::test]
    async fn asset_leaving_the_matching_set_blocks_with_scope_changed() {
        let store = MemoryAssetStore::new();
        store.insert_asset("p1", "Red Mug", None, None);
        store.insert_asset("p2", "Blue Mug", None, None);
        let scope = scope_of(&["p1", "p2"]);
        let estimate = estimate_for(&scope);

        // p2 gains a title between estimate and apply.
        store.set_field("p2", engineo_core::TargetField::SeoTitle, "Blue Mug | Shop");
        let evaluator = evaluator(collaborators(store, MeteredEntitlements::new("pro", 1000)));

        let result = evaluator
            .evaluate(
                &ProjectId::new("proj_1"),
                RunId::new(),
                &title_playbook(),
                &scope,
                &estimate,
            )
            .await
            .unwrap();
        assert!(result.blocked);
        assert_eq!(result.block_reason, RailBlockReason::ScopeChanged);
    }

    #[tokio::test]
    async fn expired_drafts_block() {
        let store = MemoryAssetStore::new();
        store.insert_asset("p1", "Red Mug", None, None);
        let scope = scope_of(&["p1"]);
        let estimate = estimate_for(&scope);
        let collaborators = collaborators(store, MeteredEntitlements::new("pro", 1000));

        collaborators
            .drafts
            .put(
                &ProjectId::new("proj_1"),
                &AssetId::new("p1"),
                engineo_core::TargetField::SeoTitle,
                Draft::new("Red Mug | Shop", chrono::Duration::minutes(-1)),
            )
            .await
            .unwrap();
        let evaluator = evaluator(collaborators);

        let result = evaluator
            .evaluate(
                &ProjectId::new("proj_1"),
                RunId::new(),
                &title_playbook(),
                &scope,
                &estimate,
            )
            .await
            .unwrap();
        assert!(result.blocked);
        assert_eq!(result.block_reason, RailBlockReason::DraftExpired);
    }

    #[tokio::test]
    async fn concurrent_quota_exhaustion_blocks() {
        let store = MemoryAssetStore::new();
        store.insert_asset("p1", "Red Mug", None, None);
        let scope = scope_of(&["p1"]);
        let estimate = estimate_for(&scope);
        let entitlements = MeteredEntitlements::new("pro", 5);
        let collaborators = collaborators(store, entitlements);
        collaborators
            .entitlements
            .try_consume(&ProjectId::new("proj_1"), 5)
            .await
            .unwrap();
        let evaluator = evaluator(collaborators);

        let result = evaluator
            .evaluate(
                &ProjectId::new("proj_1"),
                RunId::new(),
                &title_playbook(),
                &scope,
                &estimate,
            )
            .await
            .unwrap();
        assert!(result.blocked);
        assert_eq!(result.block_reason, RailBlockReason::DailyLimitReached);
    }
}
