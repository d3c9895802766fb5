//! Configuration types for the EngineO playbook engine.
//!
//! Configuration is loaded from a single YAML file (`engineo.yaml`) and
//! combined into one `EngineoConfig` structure shared by all crates. Every
//! section has serde defaults so a minimal file (or none at all) yields a
//! working development configuration.

pub mod audit;
pub mod automation;
pub mod plans;

use serde::{Deserialize, Serialize};
use std::path::Path;

pub use audit::{AuditConfig, StorageBackend, StorageConfig};
pub use automation::{AutomationConfig, DraftsConfig, PlaybookOverride, PreviewConfig};
pub use plans::PlansConfig;

/// Complete EngineO configuration loaded from `engineo.yaml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineoConfig {
    /// Project name.
    #[serde(default)]
    pub project: Option<String>,

    /// Configuration version.
    #[serde(default)]
    pub version: Option<String>,

    /// Plan tier eligibility and default quota settings.
    #[serde(default)]
    pub plans: PlansConfig,

    /// Automation settings (preview sampling, draft TTL, playbook overrides).
    #[serde(default)]
    pub automation: AutomationConfig,

    /// Audit logging configuration.
    #[serde(default)]
    pub audit: AuditConfig,
}

impl EngineoConfig {
    /// Load configuration from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Read(path.display().to_string(), e))?;
        Self::from_yaml(&contents)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(contents)?)
    }
}

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file '{0}': {1}")]
    Read(String, #[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_yaml_yields_defaults() {
        let config = EngineoConfig::from_yaml("{}").unwrap();
        assert!(config.plans.is_eligible("pro"));
        assert!(!config.plans.is_eligible("free"));
        assert_eq!(config.automation.preview.sample_size, 3);
        assert!(config.audit.enabled);
    }

    #[test]
    fn sections_parse_from_yaml() {
        let yaml = r#"
project: demo-store
plans:
  bulk_ineligible: ["free", "trial"]
  default_daily_limit: 5000
automation:
  preview:
    sample_size: 5
  drafts:
    ttl_minutes: 30
  playbooks:
    missing_seo_title:
      tokens_per_asset: 80
audit:
  enabled: true
  storage:
    backend: file
    file_path: logs/audit.log
"#;
        let config = EngineoConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.project.as_deref(), Some("demo-store"));
        assert!(!config.plans.is_eligible("trial"));
        assert_eq!(config.plans.default_daily_limit, 5000);
        assert_eq!(config.automation.preview.sample_size, 5);
        assert_eq!(config.automation.drafts.ttl_minutes, 30);
        let over = config
            .automation
            .playbooks
            .get(&crate::PlaybookId::MissingSeoTitle)
            .unwrap();
        assert_eq!(over.tokens_per_asset, Some(80));
        assert_eq!(config.audit.storage.backend, StorageBackend::File);
    }
}
