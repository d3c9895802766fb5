//! Bulk draft generation.
//!
//! The bulk counterpart of the preview's per-sample caching: fill the draft
//! cache for a whole scope so the later apply is a pure cache-to-store copy.
//! Like preview, this is quota-consuming and stops cleanly on the first
//! rejection; a partially filled cache is a normal outcome, not an error.

use crate::adapter::{Collaborators, QuotaError, SuggestError};
use crate::error::RuntimeError;
use engineo_audit::AuditLogger;
use engineo_core::{Draft, PlaybookDefinition, ProjectId, RunId, ScopeSelection};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Outcome of one bulk draft-generation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DraftsOutcome {
    /// Drafts freshly generated in this pass.
    pub generated: u64,
    /// Assets whose cached draft was still valid and left untouched.
    pub already_valid: u64,
    /// Whether the daily limit stopped the pass before the scope was covered.
    pub limit_reached: bool,
}

/// Fills the draft cache for a scope, one suggestion call per missing draft.
pub struct DraftService {
    collaborators: Collaborators,
    draft_ttl: chrono::Duration,
    audit: Arc<AuditLogger>,
}

impl DraftService {
    pub fn new(
        collaborators: Collaborators,
        draft_ttl: chrono::Duration,
        audit: Arc<AuditLogger>,
    ) -> Self {
        Self {
            collaborators,
            draft_ttl,
            audit,
        }
    }

    /// Generate drafts for every asset in scope that lacks a valid one.
    ///
    /// Each generation consumes the playbook's per-asset token cost first;
    /// on exhaustion the pass stops and the outcome reports `limit_reached`.
    pub async fn generate(
        &self,
        project: &ProjectId,
        run_id: RunId,
        playbook: &PlaybookDefinition,
        scope: &ScopeSelection,
    ) -> Result<DraftsOutcome, RuntimeError> {
        let field = playbook.target_field;
        let by_id: BTreeMap<_, _> = self
            .collaborators
            .assets
            .list_matching(project, field)
            .await?
            .into_iter()
            .map(|a| (a.id.clone(), a))
            .collect();

        let mut outcome = DraftsOutcome::default();
        let now = chrono::Utc::now();

        for asset_id in scope.asset_ids.iter() {
            let Some(asset) = by_id.get(asset_id) else {
                continue;
            };

            if let Some(draft) = self.collaborators.drafts.get(project, asset_id, field).await? {
                if draft.is_valid_at(now) {
                    outcome.already_valid += 1;
                    continue;
                }
            }

            match self
                .collaborators
                .entitlements
                .try_consume(project, playbook.tokens_per_asset)
                .await
            {
                Ok(()) => {}
                Err(QuotaError::Exhausted) => {
                    outcome.limit_reached = true;
                    break;
                }
                Err(QuotaError::Other(e)) => return Err(RuntimeError::Other(e)),
            }

            let suggestion = match self
                .collaborators
                .suggestions
                .suggest(project, asset, field)
                .await
            {
                Ok(s) => s,
                Err(SuggestError::DailyLimitReached) => {
                    outcome.limit_reached = true;
                    break;
                }
                Err(SuggestError::Failed(msg)) => {
                    return Err(RuntimeError::Other(anyhow::anyhow!(
                        "draft generation failed: {}",
                        msg
                    )));
                }
            };

            self.collaborators
                .drafts
                .put(
                    project,
                    asset_id,
                    field,
                    Draft::new(suggestion.value, self.draft_ttl),
                )
                .await?;
            outcome.generated += 1;
        }

        tracing::debug!(
            project = %project,
            playbook = %playbook.id,
            generated = outcome.generated,
            already_valid = outcome.already_valid,
            limit_reached = outcome.limit_reached,
            "drafts generated"
        );

        self.audit
            .log_drafts_generated(
                project.as_str(),
                &run_id.to_string(),
                playbook.id.as_str(),
                outcome.generated,
                outcome.limit_reached,
            )
            .await?;

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{
        MemoryAssetStore, MemoryDraftCache, MeteredEntitlements, RuleSuggestionProvider,
        StaticAuthorizer,
    };
    use engineo_core::{AssetId, Capabilities, PlaybookCatalog, PlaybookId, ScopeOption};

    fn collaborators(store: MemoryAssetStore, limit: u64) -> Collaborators {
        Collaborators {
            assets: Arc::new(store),
            suggestions: Arc::new(RuleSuggestionProvider::new()),
            entitlements: Arc::new(MeteredEntitlements::new("pro", limit)),
            authorizer: Arc::new(StaticAuthorizer::new(Capabilities {
                can_view: true,
                can_apply: true,
            })),
            drafts: Arc::new(MemoryDraftCache::new()),
        }
    }

    fn service(collaborators: Collaborators) -> DraftService {
        DraftService::new(
            collaborators,
            chrono::Duration::minutes(60),
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

    #[tokio::test]
    async fn generates_a_draft_per_asset() {
        let store = MemoryAssetStore::new();
        store.insert_asset("p1", "Red Mug", None, None);
        store.insert_asset("p2", "Blue Mug", None, None);
        let service = service(collaborators(store, 1000));

        let outcome = service
            .generate(
                &ProjectId::new("proj_1"),
                RunId::new(),
                &title_playbook(),
                &scope_of(&["p1", "p2"]),
            )
            .await
            .unwrap();

        assert_eq!(outcome.generated, 2);
        assert_eq!(outcome.already_valid, 0);
        assert!(!outcome.limit_reached);
    }

    #[tokio::test]
    async fn valid_drafts_are_not_regenerated() {
        let store = MemoryAssetStore::new();
        store.insert_asset("p1", "Red Mug", None, None);
        let collaborators = collaborators(store, 1000);
        let service = service(collaborators.clone());

        let project = ProjectId::new("proj_1");
        let scope = scope_of(&["p1"]);
        service
            .generate(&project, RunId::new(), &title_playbook(), &scope)
            .await
            .unwrap();

        // Second pass finds the draft still valid and spends no tokens.
        let outcome = service
            .generate(&project, RunId::new(), &title_playbook(), &scope)
            .await
            .unwrap();
        assert_eq!(outcome.generated, 0);
        assert_eq!(outcome.already_valid, 1);

        let snapshot = collaborators.entitlements.snapshot(&project).await.unwrap();
        assert_eq!(snapshot.used, 60);
    }

    #[tokio::test]
    async fn quota_exhaustion_stops_the_pass() {
        let store = MemoryAssetStore::new();
        for i in 0..5 {
            store.insert_asset(&format!("p{}", i), &format!("Product {}", i), None, None);
        }
        // 180 tokens covers three 60-token title suggestions.
        let service = service(collaborators(store, 180));

        let outcome = service
            .generate(
                &ProjectId::new("proj_1"),
                RunId::new(),
                &title_playbook(),
                &scope_of(&["p0", "p1", "p2", "p3", "p4"]),
            )
            .await
            .unwrap();

        assert_eq!(outcome.generated, 3);
        assert!(outcome.limit_reached);
    }
}
