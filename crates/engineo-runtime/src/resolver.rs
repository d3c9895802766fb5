//! Eligibility and estimate resolution.
//!
//! An estimate is a derived, disposable snapshot: it answers "can this
//! playbook run right now, and what would it cost" from fresh collaborator
//! reads. It is never persisted and is recomputed after any apply.

use crate::adapter::Collaborators;
use crate::error::RuntimeError;
use engineo_audit::AuditLogger;
use engineo_core::{
    PlaybookCatalog, PlaybookEstimate, PlaybookId, PlansConfig, ProjectId, RunId, ScopeSelection,
};
use engineo_policy::{derive_reasons, scope_signature, EligibilityInputs};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Derives [`PlaybookEstimate`]s. Read-only: on any collaborator failure the
/// whole call fails rather than returning a partial estimate.
pub struct EstimateResolver {
    collaborators: Collaborators,
    catalog: PlaybookCatalog,
    plans: PlansConfig,
    audit: Arc<AuditLogger>,
}

impl EstimateResolver {
    pub fn new(
        collaborators: Collaborators,
        catalog: PlaybookCatalog,
        plans: PlansConfig,
        audit: Arc<AuditLogger>,
    ) -> Self {
        Self {
            collaborators,
            catalog,
            plans,
            audit,
        }
    }

    /// Compute the estimate for one playbook over a resolved scope.
    ///
    /// The matching count is a fresh read through the asset store: assets
    /// that left the matching set since scope resolution are not counted.
    pub async fn estimate(
        &self,
        project: &ProjectId,
        run_id: RunId,
        playbook: PlaybookId,
        scope: &ScopeSelection,
    ) -> Result<PlaybookEstimate, RuntimeError> {
        let def = self
            .catalog
            .get(playbook)
            .ok_or_else(|| RuntimeError::Estimate(format!("playbook '{}' not in catalog", playbook)))?;

        let matching: BTreeSet<_> = self
            .collaborators
            .assets
            .list_matching(project, def.target_field)
            .await
            .map_err(|e| RuntimeError::Estimate(format!("asset store read failed: {}", e)))?
            .into_iter()
            .map(|a| a.id)
            .collect();

        let affected = scope
            .asset_ids
            .iter()
            .filter(|id| matching.contains(id))
            .count() as u64;
        let estimated_tokens = affected * def.tokens_per_asset;

        let snapshot = self
            .collaborators
            .entitlements
            .snapshot(project)
            .await
            .map_err(|e| RuntimeError::Estimate(format!("entitlements read failed: {}", e)))?;
        let daily = snapshot.daily();
        let plan_eligible = self.plans.is_eligible(&snapshot.plan);

        let reasons = derive_reasons(&EligibilityInputs {
            plan: &snapshot.plan,
            plan_eligible,
            matching_assets: affected,
            tokens_per_asset: def.tokens_per_asset,
            daily,
        });

        let estimate = PlaybookEstimate {
            total_affected_assets: affected,
            estimated_tokens,
            plan_id: snapshot.plan.clone(),
            eligible: plan_eligible,
            can_proceed: reasons.is_empty(),
            reasons,
            ai_daily_limit: daily,
            scope_signature: scope_signature(playbook, def.target_field, &scope.asset_ids),
        };

        tracing::debug!(
            project = %project,
            playbook = %playbook,
            affected,
            tokens = estimated_tokens,
            can_proceed = estimate.can_proceed,
            "estimate computed"
        );

        self.audit
            .log_estimate_computed(
                project.as_str(),
                &run_id.to_string(),
                playbook.as_str(),
                &scope.option.to_string(),
                affected,
            )
            .await?;

        Ok(estimate)
    }
}
