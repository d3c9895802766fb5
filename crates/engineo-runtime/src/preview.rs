//! Preview generation.
//!
//! Produces a small, deterministic before/after sample so the user can judge
//! output quality before committing the whole scope. Selection follows the
//! scope's stable iteration order; the same scope always previews the same
//! assets. Each successful sample is cached as a draft so the later apply
//! does not pay for the suggestion twice.

use crate::adapter::{Collaborators, SuggestError};
use crate::error::PreviewError;
use engineo_audit::AuditLogger;
use engineo_core::{Draft, PlaybookDefinition, PreviewSample, ProjectId, RunId, ScopeSelection};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Generates bounded preview samples and fills the draft cache as it goes.
pub struct PreviewGenerator {
    collaborators: Collaborators,
    draft_ttl: chrono::Duration,
    audit: Arc<AuditLogger>,
}

impl PreviewGenerator {
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

    /// Generate up to `sample_size` before/after samples for the scope.
    ///
    /// One suggestion call per sample, each preceded by a fresh consume of
    /// the playbook's per-asset token cost. When the limit is hit
    /// mid-generation, the samples produced
    /// so far are returned inside [`PreviewError::AiDailyLimitReached`] so
    /// the caller can still show a partial preview. Nothing is written to
    /// the asset store.
    pub async fn preview(
        &self,
        project: &ProjectId,
        run_id: RunId,
        playbook: &PlaybookDefinition,
        scope: &ScopeSelection,
        sample_size: usize,
    ) -> Result<Vec<PreviewSample>, PreviewError> {
        let field = playbook.target_field;
        let by_id: BTreeMap<_, _> = self
            .collaborators
            .assets
            .list_matching(project, field)
            .await?
            .into_iter()
            .map(|a| (a.id.clone(), a))
            .collect();

        let mut samples = Vec::new();
        for asset_id in scope.asset_ids.iter() {
            if samples.len() >= sample_size {
                break;
            }
            // Scope entries that no longer match are silently passed over;
            // the safety rails handle staleness at apply time.
            let Some(asset) = by_id.get(asset_id) else {
                continue;
            };

            if let Err(err) = self
                .collaborators
                .entitlements
                .try_consume(project, playbook.tokens_per_asset)
                .await
            {
                match err {
                    crate::adapter::QuotaError::Exhausted => {
                        return self.limit_reached(project, run_id, playbook, samples).await;
                    }
                    crate::adapter::QuotaError::Other(e) => return Err(PreviewError::Other(e)),
                }
            }

            let suggestion = match self
                .collaborators
                .suggestions
                .suggest(project, asset, field)
                .await
            {
                Ok(s) => s,
                Err(SuggestError::DailyLimitReached) => {
                    return self.limit_reached(project, run_id, playbook, samples).await;
                }
                Err(SuggestError::Failed(msg)) => return Err(PreviewError::Failed(msg)),
            };

            self.collaborators
                .drafts
                .put(
                    project,
                    asset_id,
                    field,
                    Draft::new(suggestion.value.clone(), self.draft_ttl),
                )
                .await?;

            samples.push(PreviewSample {
                asset_id: asset_id.clone(),
                asset_title: asset.title.clone(),
                field,
                current_value: asset.current_value.clone(),
                proposed_value: suggestion.value,
                warnings: suggestion.warnings,
            });
        }

        tracing::debug!(
            project = %project,
            playbook = %playbook.id,
            samples = samples.len(),
            "preview generated"
        );

        self.audit
            .log_preview_generated(
                project.as_str(),
                &run_id.to_string(),
                playbook.id.as_str(),
                samples.len() as u64,
                false,
            )
            .await
            .map_err(anyhow::Error::from)?;

        Ok(samples)
    }

    async fn limit_reached(
        &self,
        project: &ProjectId,
        run_id: RunId,
        playbook: &PlaybookDefinition,
        samples: Vec<PreviewSample>,
    ) -> Result<Vec<PreviewSample>, PreviewError> {
        tracing::warn!(
            project = %project,
            playbook = %playbook.id,
            samples = samples.len(),
            "preview stopped by daily limit"
        );
        self.audit
            .log_preview_generated(
                project.as_str(),
                &run_id.to_string(),
                playbook.id.as_str(),
                samples.len() as u64,
                true,
            )
            .await
            .map_err(anyhow::Error::from)?;
        Err(PreviewError::AiDailyLimitReached { samples })
    }
}
