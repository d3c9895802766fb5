//! The apply executor.
//!
//! Walks the scope in order and copies cached draft values into the asset
//! store. Applying never invokes the suggestion collaborator: every write is
//! backed by a draft generated earlier (preview or bulk generation), and each
//! write consumes the playbook's per-asset token cost via a fresh check. There
//! is no rollback; completed writes stand, and a quota-bounded run is a
//! normal outcome reported through the result counts.

use crate::adapter::{Collaborators, QuotaError};
use crate::error::RuntimeError;
use engineo_audit::AuditLogger;
use engineo_core::{ApplyResult, PlaybookDefinition, ProjectId, RunId, ScopeSelection};
use std::sync::Arc;

/// Executes confirmed playbook runs.
pub struct ApplyExecutor {
    collaborators: Collaborators,
    audit: Arc<AuditLogger>,
}

impl ApplyExecutor {
    pub fn new(collaborators: Collaborators, audit: Arc<AuditLogger>) -> Self {
        Self {
            collaborators,
            audit,
        }
    }

    /// Apply the playbook over the scope.
    ///
    /// Per asset: an asset without a valid cached draft is skipped and never
    /// retried. An asset with one costs the per-asset tokens before the write;
    /// on exhaustion the run stops, counts the remainder as skipped, and
    /// reports `limit_reached`. An unexpected store or meter failure aborts
    /// the remaining batch with the counts accumulated so far preserved in
    /// the audit trail.
    pub async fn apply(
        &self,
        project: &ProjectId,
        run_id: RunId,
        playbook: &PlaybookDefinition,
        scope: &ScopeSelection,
    ) -> Result<ApplyResult, RuntimeError> {
        let field = playbook.target_field;
        let mut result = ApplyResult::default();
        let ids: Vec<_> = scope.asset_ids.iter().cloned().collect();

        for (index, asset_id) in ids.iter().enumerate() {
            let draft = match self.collaborators.drafts.get(project, asset_id, field).await {
                Ok(d) => d,
                Err(e) => return self.fail(project, run_id, playbook, result, e).await,
            };

            let now = chrono::Utc::now();
            let Some(draft) = draft.filter(|d| d.is_valid_at(now)) else {
                result.attempted += 1;
                result.skipped += 1;
                continue;
            };

            match self
                .collaborators
                .entitlements
                .try_consume(project, playbook.tokens_per_asset)
                .await
            {
                Ok(()) => {}
                Err(QuotaError::Exhausted) => {
                    // This asset and everything after it goes unprocessed.
                    let remainder = (ids.len() - index) as u64;
                    result.attempted += remainder;
                    result.skipped += remainder;
                    result.limit_reached = true;
                    break;
                }
                Err(QuotaError::Other(e)) => {
                    return self.fail(project, run_id, playbook, result, e).await;
                }
            }

            result.attempted += 1;
            match self
                .collaborators
                .assets
                .write_field(project, asset_id, field, &draft.value)
                .await
            {
                Ok(()) => result.updated += 1,
                Err(e) => {
                    // The tokens are spent; the write failure aborts the batch.
                    result.skipped += 1;
                    return self.fail(project, run_id, playbook, result, e).await;
                }
            }
        }

        tracing::info!(
            project = %project,
            playbook = %playbook.id,
            attempted = result.attempted,
            updated = result.updated,
            skipped = result.skipped,
            limit_reached = result.limit_reached,
            "apply completed"
        );

        debug_assert_eq!(result.updated + result.skipped, result.attempted);

        self.audit
            .log_apply_completed(
                project.as_str(),
                &run_id.to_string(),
                playbook.id.as_str(),
                &result,
            )
            .await?;

        Ok(result)
    }

    async fn fail(
        &self,
        project: &ProjectId,
        run_id: RunId,
        playbook: &PlaybookDefinition,
        partial: ApplyResult,
        error: anyhow::Error,
    ) -> Result<ApplyResult, RuntimeError> {
        tracing::error!(
            project = %project,
            playbook = %playbook.id,
            updated = partial.updated,
            error = %error,
            "apply aborted"
        );
        self.audit
            .log_apply_failed(
                project.as_str(),
                &run_id.to_string(),
                playbook.id.as_str(),
                &partial,
                &error.to_string(),
            )
            .await?;
        Err(RuntimeError::Other(error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::DraftCache;
    use crate::memory::{
        MemoryAssetStore, MemoryDraftCache, MeteredEntitlements, RuleSuggestionProvider,
        StaticAuthorizer,
    };
    use engineo_core::{AssetId, Capabilities, Draft, PlaybookCatalog, PlaybookId, ScopeOption, TargetField};

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

    fn title_playbook() -> PlaybookDefinition {
        PlaybookCatalog::builtin()
            .get(PlaybookId::MissingSeoTitle)
            .unwrap()
            .clone()
    }

    fn scope_of(ids: &[String]) -> ScopeSelection {
        ScopeSelection {
            option: ScopeOption::AllExisting,
            asset_ids: ids.iter().map(|s| AssetId::new(s.clone())).collect(),
        }
    }

    async fn seed_drafts(drafts: &dyn DraftCache, project: &ProjectId, ids: &[String]) {
        for id in ids {
            drafts
                .put(
                    project,
                    &AssetId::new(id),
                    TargetField::SeoTitle,
                    Draft::new(format!("Draft for {}", id), chrono::Duration::minutes(60)),
                )
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn quota_bounded_run_counts_add_up() {
        // 30 matching assets, tokens remaining for exactly 10 writes.
        let store = MemoryAssetStore::new();
        let ids: Vec<String> = (0..30).map(|i| format!("p{:02}", i)).collect();
        for id in &ids {
            store.insert_asset(id, &format!("Product {}", id), None, None);
        }
        let collaborators = collaborators(store, 600);
        let project = ProjectId::new("proj_1");
        seed_drafts(collaborators.drafts.as_ref(), &project, &ids).await;

        let executor = ApplyExecutor::new(collaborators, Arc::new(AuditLogger::disabled()));
        let result = executor
            .apply(&project, RunId::new(), &title_playbook(), &scope_of(&ids))
            .await
            .unwrap();

        assert_eq!(result.attempted, 30);
        assert_eq!(result.updated, 10);
        assert_eq!(result.skipped, 20);
        assert!(result.limit_reached);
        assert_eq!(result.updated + result.skipped, result.attempted);
    }

    #[tokio::test]
    async fn assets_without_valid_drafts_are_skipped_without_quota_cost() {
        let store = MemoryAssetStore::new();
        let ids: Vec<String> = vec!["p1".into(), "p2".into(), "p3".into()];
        for id in &ids {
            store.insert_asset(id, id, None, None);
        }
        let collaborators = collaborators(store, 100);
        let project = ProjectId::new("proj_1");
        // Only p2 gets a draft.
        seed_drafts(collaborators.drafts.as_ref(), &project, &["p2".to_string()]).await;

        let entitlements = collaborators.entitlements.clone();
        let executor = ApplyExecutor::new(collaborators, Arc::new(AuditLogger::disabled()));
        let result = executor
            .apply(&project, RunId::new(), &title_playbook(), &scope_of(&ids))
            .await
            .unwrap();

        assert_eq!(result.attempted, 3);
        assert_eq!(result.updated, 1);
        assert_eq!(result.skipped, 2);
        assert!(!result.limit_reached);

        let snapshot = entitlements.snapshot(&project).await.unwrap();
        assert_eq!(snapshot.used, 60);
    }

    #[tokio::test]
    async fn expired_drafts_count_as_skipped() {
        let store = MemoryAssetStore::new();
        store.insert_asset("p1", "Red Mug", None, None);
        let collaborators = collaborators(store, 100);
        let project = ProjectId::new("proj_1");
        collaborators
            .drafts
            .put(
                &project,
                &AssetId::new("p1"),
                TargetField::SeoTitle,
                Draft::new("stale", chrono::Duration::minutes(-5)),
            )
            .await
            .unwrap();

        let executor = ApplyExecutor::new(collaborators, Arc::new(AuditLogger::disabled()));
        let result = executor
            .apply(
                &project,
                RunId::new(),
                &title_playbook(),
                &scope_of(&["p1".to_string()]),
            )
            .await
            .unwrap();

        assert_eq!(result.updated, 0);
        assert_eq!(result.skipped, 1);
    }

    #[tokio::test]
    async fn writes_land_in_the_asset_store() {
        let store = MemoryAssetStore::new();
        store.insert_asset("p1", "Red Mug", None, None);
        let store = Arc::new(store);
        let collaborators = Collaborators {
            assets: store.clone(),
            suggestions: Arc::new(RuleSuggestionProvider::new()),
            entitlements: Arc::new(MeteredEntitlements::new("pro", 100)),
            authorizer: Arc::new(StaticAuthorizer::new(Capabilities {
                can_view: true,
                can_apply: true,
            })),
            drafts: Arc::new(MemoryDraftCache::new()),
        };
        let project = ProjectId::new("proj_1");
        seed_drafts(collaborators.drafts.as_ref(), &project, &["p1".to_string()]).await;

        let executor = ApplyExecutor::new(collaborators, Arc::new(AuditLogger::disabled()));
        executor
            .apply(
                &project,
                RunId::new(),
                &title_playbook(),
                &scope_of(&["p1".to_string()]),
            )
            .await
            .unwrap();

        assert_eq!(store.write_count(), 1);
        assert_eq!(
            store.field_value("p1", TargetField::SeoTitle),
            Some("Draft for p1".to_string())
        );
    }
}
