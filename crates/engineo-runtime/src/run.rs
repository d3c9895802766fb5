//! The playbook run state machine.
//!
//! One run context per project and playbook. The three steps move forward
//! only through explicit `continue` calls whose gate is satisfied, move
//! backward freely, and reset entirely when a different playbook is
//! selected. The sequencing guarantees - estimate before confirmation,
//! rails before executor - live here, not in locks: the run owns its state
//! exclusively.

use crate::adapter::Collaborators;
use crate::drafts::{DraftService, DraftsOutcome};
use crate::error::{PreviewError, RuntimeError};
use crate::executor::ApplyExecutor;
use crate::preview::PreviewGenerator;
use crate::rails::SafetyRailEvaluator;
use crate::resolver::EstimateResolver;
use engineo_audit::AuditLogger;
use engineo_core::{
    ApplyResult, AssetId, EngineoConfig, PlaybookCatalog, PlaybookDefinition, PlaybookEstimate,
    PlaybookId, PlansConfig, PreviewSample, ProjectId, RunId, ScopeOption, ScopeSelection,
};
use engineo_policy::{resolve_scope, ConfirmationGate};
use std::collections::BTreeSet;
use std::sync::Arc;

/// The three workflow steps, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStep {
    Preview,
    Estimate,
    Apply,
}

/// What a preview pass produced, including the partial case where the daily
/// limit stopped generation early.
#[derive(Debug, Clone)]
pub struct PreviewOutcome {
    pub samples: Vec<PreviewSample>,
    pub limit_reached: bool,
}

/// One playbook run: exclusive owner of scope, preview, estimate,
/// confirmation and result state for a project+playbook pair.
pub struct PlaybookRun {
    collaborators: Collaborators,
    audit: Arc<AuditLogger>,
    catalog: PlaybookCatalog,
    plans: PlansConfig,
    sample_size: usize,
    draft_ttl: chrono::Duration,

    project: ProjectId,
    principal: String,
    run_id: RunId,
    playbook: PlaybookId,

    step: RunStep,
    scope: Option<ScopeSelection>,
    preview: Option<PreviewOutcome>,
    estimate: Option<PlaybookEstimate>,
    gate: ConfirmationGate,
    result: Option<ApplyResult>,
}

impl PlaybookRun {
    pub fn new(
        collaborators: Collaborators,
        audit: Arc<AuditLogger>,
        config: &EngineoConfig,
        project: ProjectId,
        principal: impl Into<String>,
        playbook: PlaybookId,
    ) -> Self {
        Self {
            collaborators,
            audit,
            catalog: PlaybookCatalog::from_config(&config.automation),
            plans: config.plans.clone(),
            sample_size: config.automation.preview.sample_size,
            draft_ttl: config.automation.drafts.ttl(),
            project,
            principal: principal.into(),
            run_id: RunId::new(),
            playbook,
            step: RunStep::Preview,
            scope: None,
            preview: None,
            estimate: None,
            gate: ConfirmationGate::new(),
            result: None,
        }
    }

    pub fn step(&self) -> RunStep {
        self.step
    }

    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    pub fn playbook(&self) -> PlaybookId {
        self.playbook
    }

    pub fn scope(&self) -> Option<&ScopeSelection> {
        self.scope.as_ref()
    }

    pub fn preview(&self) -> Option<&PreviewOutcome> {
        self.preview.as_ref()
    }

    pub fn estimate(&self) -> Option<&PlaybookEstimate> {
        self.estimate.as_ref()
    }

    pub fn result(&self) -> Option<&ApplyResult> {
        self.result.as_ref()
    }

    fn definition(&self) -> Result<PlaybookDefinition, RuntimeError> {
        self.catalog
            .get(self.playbook)
            .cloned()
            .ok_or_else(|| RuntimeError::Estimate(format!("playbook '{}' not in catalog", self.playbook)))
    }

    /// Switch to a different playbook. Resets to the preview step and
    /// discards scope, preview, estimate, confirmation and result state.
    /// Selecting the current playbook again is a no-op.
    pub fn select_playbook(&mut self, playbook: PlaybookId) {
        if playbook == self.playbook {
            return;
        }
        tracing::debug!(
            project = %self.project,
            from = %self.playbook,
            to = %playbook,
            "playbook switched, run state reset"
        );
        self.playbook = playbook;
        self.step = RunStep::Preview;
        self.scope = None;
        self.preview = None;
        self.estimate = None;
        self.gate = ConfirmationGate::new();
        self.result = None;
    }

    /// Resolve the run's scope from a scope option and an explicit selection.
    /// Only allowed at the preview step; changing scope later would bypass
    /// the estimate.
    pub async fn resolve_scope(
        &mut self,
        option: ScopeOption,
        explicit_ids: &BTreeSet<AssetId>,
    ) -> Result<&ScopeSelection, RuntimeError> {
        if self.step != RunStep::Preview {
            return Err(RuntimeError::InvalidTransition(
                "scope can only be selected at the preview step".to_string(),
            ));
        }
        let def = self.definition()?;
        let matching: BTreeSet<_> = self
            .collaborators
            .assets
            .list_matching(&self.project, def.target_field)
            .await?
            .into_iter()
            .map(|a| a.id)
            .collect();

        let scope = resolve_scope(option, explicit_ids, &matching)?;
        self.preview = None;
        self.estimate = None;
        Ok(self.scope.insert(scope))
    }

    /// Generate the bounded before/after preview for the resolved scope.
    ///
    /// A quota stop mid-generation is reported through
    /// [`PreviewOutcome::limit_reached`] with the partial samples kept.
    pub async fn generate_preview(&mut self) -> Result<&PreviewOutcome, RuntimeError> {
        if self.step != RunStep::Preview {
            return Err(RuntimeError::InvalidTransition(
                "preview can only be generated at the preview step".to_string(),
            ));
        }
        let scope = self.scope.clone().ok_or_else(|| {
            RuntimeError::InvalidTransition("resolve a scope before previewing".to_string())
        })?;
        let def = self.definition()?;

        let generator = PreviewGenerator::new(
            self.collaborators.clone(),
            self.draft_ttl,
            self.audit.clone(),
        );
        let outcome = match generator
            .preview(&self.project, self.run_id, &def, &scope, self.sample_size)
            .await
        {
            Ok(samples) => PreviewOutcome {
                samples,
                limit_reached: false,
            },
            Err(PreviewError::AiDailyLimitReached { samples }) => PreviewOutcome {
                samples,
                limit_reached: true,
            },
            Err(PreviewError::Failed(msg)) => {
                return Err(RuntimeError::Other(anyhow::anyhow!("preview failed: {}", msg)));
            }
            Err(PreviewError::Other(e)) => return Err(RuntimeError::Other(e)),
        };

        Ok(self.preview.insert(outcome))
    }

    /// Fill the draft cache for the resolved scope. Available from the
    /// preview step onward.
    pub async fn generate_drafts(&mut self) -> Result<DraftsOutcome, RuntimeError> {
        let scope = self.scope.clone().ok_or_else(|| {
            RuntimeError::InvalidTransition("resolve a scope before generating drafts".to_string())
        })?;
        let def = self.definition()?;

        let service = DraftService::new(
            self.collaborators.clone(),
            self.draft_ttl,
            self.audit.clone(),
        );
        service
            .generate(&self.project, self.run_id, &def, &scope)
            .await
    }

    /// Continue from preview to estimate, or refresh the estimate in place.
    ///
    /// Looking at a preview first is recommended, not required: the only
    /// prerequisite is a resolved scope.
    pub async fn continue_to_estimate(&mut self) -> Result<&PlaybookEstimate, RuntimeError> {
        match self.step {
            RunStep::Preview => {}
            RunStep::Estimate => {} // refresh in place
            RunStep::Apply => {
                return Err(RuntimeError::InvalidTransition(
                    "go back to the estimate step to recompute".to_string(),
                ));
            }
        }
        let scope = self.scope.clone().ok_or_else(|| {
            RuntimeError::InvalidTransition("resolve a scope before estimating".to_string())
        })?;

        let resolver = EstimateResolver::new(
            self.collaborators.clone(),
            self.catalog.clone(),
            self.plans.clone(),
            self.audit.clone(),
        );
        let estimate = resolver
            .estimate(&self.project, self.run_id, self.playbook, &scope)
            .await?;

        self.step = RunStep::Estimate;
        Ok(self.estimate.insert(estimate))
    }

    /// Continue from estimate to apply. Requires a `can_proceed` estimate
    /// and the apply capability; opens the confirmation gate.
    pub async fn continue_to_apply(&mut self) -> Result<(), RuntimeError> {
        if self.step != RunStep::Estimate {
            return Err(RuntimeError::InvalidTransition(
                "apply is reached from the estimate step".to_string(),
            ));
        }
        let estimate = self.estimate.as_ref().ok_or_else(|| {
            RuntimeError::InvalidTransition("compute an estimate before applying".to_string())
        })?;
        if !estimate.can_proceed {
            return Err(RuntimeError::InvalidTransition(format!(
                "the estimate cannot proceed: {}",
                estimate
                    .reasons
                    .iter()
                    .map(|r| r.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            )));
        }

        let capabilities = self
            .collaborators
            .authorizer
            .capabilities(&self.project, &self.principal)
            .await?;
        if !capabilities.can_apply {
            return Err(RuntimeError::NotPermitted(format!(
                "principal '{}' may not apply playbooks on this project",
                self.principal
            )));
        }

        self.step = RunStep::Apply;
        self.gate.open();
        Ok(())
    }

    /// Step backward. Apply returns to estimate (discarding confirmation
    /// state), estimate returns to preview. Backward movement is always
    /// allowed.
    pub fn back(&mut self) {
        match self.step {
            RunStep::Apply => {
                self.gate.cancel();
                self.step = RunStep::Estimate;
            }
            RunStep::Estimate => self.step = RunStep::Preview,
            RunStep::Preview => {}
        }
    }

    /// Record the responsibility acknowledgement on the confirmation gate.
    pub fn acknowledge(&mut self, value: bool) {
        self.gate.set_acknowledged(value);
    }

    /// Record the typed confirmation phrase.
    pub fn type_phrase(&mut self, phrase: &str) {
        self.gate.set_phrase(phrase);
    }

    /// Whether both confirmation factors currently pass.
    pub fn is_confirmable(&self) -> bool {
        self.gate.is_confirmable()
    }

    /// Cancel the confirmation and return to the estimate step. Guaranteed
    /// side-effect free: no writes have happened yet.
    pub fn cancel_confirmation(&mut self) {
        self.gate.cancel();
        if self.step == RunStep::Apply {
            self.step = RunStep::Estimate;
        }
    }

    /// Confirm and execute.
    ///
    /// The gate must pass (this closes it, so a second call without
    /// reopening fails), then the safety rails run over fresh reads. A rail
    /// block returns [`RuntimeError::RailBlocked`] with zero assets mutated
    /// and sends the run back to the estimate step with the stale estimate
    /// discarded. On success the estimate is likewise discarded: it must be
    /// recomputed after any apply.
    pub async fn confirm_and_apply(&mut self) -> Result<ApplyResult, RuntimeError> {
        if self.step != RunStep::Apply {
            return Err(RuntimeError::InvalidTransition(
                "confirmation happens at the apply step".to_string(),
            ));
        }
        let scope = self.scope.clone().ok_or_else(|| {
            RuntimeError::InvalidTransition("no resolved scope for this run".to_string())
        })?;
        let estimate = self.estimate.clone().ok_or_else(|| {
            RuntimeError::InvalidTransition("no estimate backing this run".to_string())
        })?;
        let def = self.definition()?;

        let _confirmation = self.gate.confirm()?;

        let rails = SafetyRailEvaluator::new(
            self.collaborators.clone(),
            self.plans.clone(),
            self.audit.clone(),
        );
        let rail_result = rails
            .evaluate(&self.project, self.run_id, &def, &scope, &estimate)
            .await?;
        if rail_result.blocked {
            self.estimate = None;
            self.step = RunStep::Estimate;
            return Err(RuntimeError::RailBlocked(rail_result));
        }

        let executor = ApplyExecutor::new(self.collaborators.clone(), self.audit.clone());
        let result = executor
            .apply(&self.project, self.run_id, &def, &scope)
            .await?;

        self.estimate = None;
        self.result = Some(result);
        Ok(result)
    }
}
