//! Local project files.
//!
//! The CLI works against a YAML project file instead of a live storefront:
//! the file holds the asset table, the plan tier, and today's usage counter.
//! Commands load it into the in-memory collaborators, run the workflow, and
//! write the mutated state back.

use anyhow::Context;
use engineo_core::{Capabilities, EngineoConfig, ProjectId, TargetField};
use engineo_runtime::{
    Collaborators, EntitlementsProvider, MemoryAssetStore, MemoryDraftCache, MeteredEntitlements,
    RuleSuggestionProvider, StaticAuthorizer,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// One asset row in the project file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetEntry {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seo_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seo_description: Option<String>,
}

/// The on-disk project state the CLI operates on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectFile {
    /// Project identifier.
    pub project: String,

    /// Plan tier ("free", "starter", "pro", ...).
    #[serde(default = "default_plan")]
    pub plan: String,

    /// Daily AI token budget. Falls back to the configured default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily_limit: Option<u64>,

    /// Tokens already consumed today.
    #[serde(default)]
    pub used_today: u64,

    /// The asset table.
    #[serde(default)]
    pub assets: Vec<AssetEntry>,
}

fn default_plan() -> String {
    "free".to_string()
}

/// A loaded project: the parsed file plus live collaborator handles.
pub struct LoadedProject {
    pub file: ProjectFile,
    pub project_id: ProjectId,
    pub collaborators: Collaborators,
    pub store: Arc<MemoryAssetStore>,
    pub entitlements: Arc<MeteredEntitlements>,
}

impl ProjectFile {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read project file '{}'", path.display()))?;
        serde_yaml::from_str(&contents)
            .with_context(|| format!("failed to parse project file '{}'", path.display()))
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let contents = serde_yaml::to_string(self)?;
        std::fs::write(path, contents)
            .with_context(|| format!("failed to write project file '{}'", path.display()))
    }

    /// Build the in-memory collaborators from this file.
    pub fn open(self, config: &EngineoConfig) -> LoadedProject {
        let store = Arc::new(MemoryAssetStore::new());
        for asset in &self.assets {
            store.insert_asset(
                &asset.id,
                &asset.title,
                asset.seo_title.as_deref(),
                asset.seo_description.as_deref(),
            );
        }

        let limit = self.daily_limit.unwrap_or(config.plans.default_daily_limit);
        let entitlements = Arc::new(MeteredEntitlements::with_used(
            &self.plan,
            limit,
            self.used_today,
        ));

        let collaborators = Collaborators {
            assets: store.clone(),
            suggestions: Arc::new(RuleSuggestionProvider::new()),
            entitlements: entitlements.clone(),
            authorizer: Arc::new(StaticAuthorizer::new(Capabilities {
                can_view: true,
                can_apply: true,
            })),
            drafts: Arc::new(MemoryDraftCache::new()),
        };

        let project_id = ProjectId::new(self.project.clone());
        LoadedProject {
            file: self,
            project_id,
            collaborators,
            store,
            entitlements,
        }
    }
}

impl LoadedProject {
    /// Fold the live store and meter state back into the file form.
    pub async fn into_file(mut self) -> anyhow::Result<ProjectFile> {
        for asset in &mut self.file.assets {
            asset.seo_title = self.store.field_value(&asset.id, TargetField::SeoTitle);
            asset.seo_description = self
                .store
                .field_value(&asset.id, TargetField::SeoDescription);
        }
        let snapshot = self.entitlements.snapshot(&self.project_id).await?;
        self.file.used_today = snapshot.used;
        Ok(self.file)
    }
}
