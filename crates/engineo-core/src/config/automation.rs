//! Automation workflow settings: preview sampling, draft validity, and
//! per-playbook catalog overrides.

use crate::PlaybookId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Settings for the playbook workflow itself.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AutomationConfig {
    /// Preview sampling settings.
    #[serde(default)]
    pub preview: PreviewConfig,

    /// Draft cache settings.
    #[serde(default)]
    pub drafts: DraftsConfig,

    /// Per-playbook overrides of the built-in catalog.
    #[serde(default)]
    pub playbooks: BTreeMap<PlaybookId, PlaybookOverride>,
}

/// Preview sampling settings. The sample is deliberately small because each
/// suggestion call consumes daily AI quota.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewConfig {
    /// Maximum number of before/after samples per preview call.
    #[serde(default = "default_sample_size")]
    pub sample_size: usize,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            sample_size: default_sample_size(),
        }
    }
}

/// Draft validity settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftsConfig {
    /// How long a cached draft stays valid, in minutes.
    #[serde(default = "default_ttl_minutes")]
    pub ttl_minutes: i64,
}

impl DraftsConfig {
    pub fn ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.ttl_minutes)
    }
}

impl Default for DraftsConfig {
    fn default() -> Self {
        Self {
            ttl_minutes: default_ttl_minutes(),
        }
    }
}

/// Overridable fields of a built-in playbook definition.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlaybookOverride {
    /// Override the display name.
    #[serde(default)]
    pub name: Option<String>,

    /// Override the deterministic token cost per asset.
    #[serde(default)]
    pub tokens_per_asset: Option<u64>,
}

fn default_sample_size() -> usize {
    3
}

fn default_ttl_minutes() -> i64 {
    60
}
