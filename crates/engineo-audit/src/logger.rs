//! Audit logger implementation.
//!
//! Provides the main `AuditLogger` type with helper methods for logging each
//! step of a playbook run: estimates, previews, draft generation, safety-rail
//! blocks, and apply outcomes.

use engineo_core::{ApplyResult, AuditConfig};
use std::sync::Arc;

use crate::error::AuditError;
use crate::event::{AuditEvent, AuditEventType};
use crate::storage::{create_storage, AuditStorage, ConsoleStorage, NullStorage};

/// The main audit logger.
///
/// Provides convenient methods for logging the workflow events, all keyed
/// by the [project - run - playbook] triple.
pub struct AuditLogger {
    config: AuditConfig,
    storage: Arc<dyn AuditStorage>,
}

impl AuditLogger {
    /// Create a new audit logger with the given configuration.
    pub fn new(config: AuditConfig) -> Result<Self, AuditError> {
        let storage: Arc<dyn AuditStorage> = if !config.enabled {
            Arc::new(NullStorage::new())
        } else {
            Arc::from(create_storage(&config)?)
        };

        Ok(Self { config, storage })
    }

    /// Create a logger with a custom storage backend.
    pub fn with_storage(config: AuditConfig, storage: Arc<dyn AuditStorage>) -> Self {
        Self { config, storage }
    }

    /// Create a disabled (no-op) logger.
    pub fn disabled() -> Self {
        Self {
            config: AuditConfig {
                enabled: false,
                ..Default::default()
            },
            storage: Arc::new(NullStorage::new()),
        }
    }

    /// Create a console-only logger (useful for development).
    pub fn console_only() -> Self {
        Self {
            config: AuditConfig {
                enabled: true,
                stdout: true,
                ..Default::default()
            },
            storage: Arc::new(ConsoleStorage::new()),
        }
    }

    /// Check if logging is enabled.
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Log an audit event.
    pub async fn log(&self, event: AuditEvent) -> Result<(), AuditError> {
        if !self.config.enabled {
            return Ok(());
        }

        // Also log to tracing for structured logging integration
        tracing::debug!(
            event_id = %event.event_id,
            event_type = %event.event_type,
            project = %event.project_id,
            run = %event.run_id,
            playbook = %event.playbook,
            "Audit event"
        );

        self.storage.store(event).await
    }

    /// Log an estimate computation.
    pub async fn log_estimate_computed(
        &self,
        project_id: &str,
        run_id: &str,
        playbook: &str,
        scope_option: &str,
        asset_count: u64,
    ) -> Result<(), AuditError> {
        let event =
            AuditEvent::builder(AuditEventType::EstimateComputed, project_id, run_id, playbook)
                .scope_option(scope_option)
                .asset_count(asset_count)
                .build();

        self.log(event).await
    }

    /// Log a preview generation.
    ///
    /// `asset_count` is the number of samples actually produced, which may
    /// be below the configured sample size when the quota ran out.
    pub async fn log_preview_generated(
        &self,
        project_id: &str,
        run_id: &str,
        playbook: &str,
        asset_count: u64,
        limit_reached: bool,
    ) -> Result<(), AuditError> {
        let mut builder =
            AuditEvent::builder(AuditEventType::PreviewGenerated, project_id, run_id, playbook)
                .asset_count(asset_count);

        if limit_reached {
            builder = builder.limit_reached(true);
        }

        self.log(builder.build()).await
    }

    /// Log a bulk draft-generation pass.
    pub async fn log_drafts_generated(
        &self,
        project_id: &str,
        run_id: &str,
        playbook: &str,
        asset_count: u64,
        limit_reached: bool,
    ) -> Result<(), AuditError> {
        let mut builder =
            AuditEvent::builder(AuditEventType::DraftsGenerated, project_id, run_id, playbook)
                .asset_count(asset_count);

        if limit_reached {
            builder = builder.limit_reached(true);
        }

        self.log(builder.build()).await
    }

    /// Log a safety-rail block.
    pub async fn log_rail_blocked(
        &self,
        project_id: &str,
        run_id: &str,
        playbook: &str,
        block_reason: &str,
    ) -> Result<(), AuditError> {
        let event = AuditEvent::builder(AuditEventType::RailBlocked, project_id, run_id, playbook)
            .block_reason(block_reason)
            .build();

        self.log(event).await
    }

    /// Log a completed apply run.
    pub async fn log_apply_completed(
        &self,
        project_id: &str,
        run_id: &str,
        playbook: &str,
        result: &ApplyResult,
    ) -> Result<(), AuditError> {
        let mut builder =
            AuditEvent::builder(AuditEventType::ApplyCompleted, project_id, run_id, playbook)
                .apply_counts(result.attempted, result.updated, result.skipped);

        if result.limit_reached {
            builder = builder.limit_reached(true);
        }

        self.log(builder.build()).await
    }

    /// Log an apply run that aborted on an unexpected error.
    ///
    /// `result` carries the counts accumulated before the failure.
    pub async fn log_apply_failed(
        &self,
        project_id: &str,
        run_id: &str,
        playbook: &str,
        result: &ApplyResult,
        error: &str,
    ) -> Result<(), AuditError> {
        let event = AuditEvent::builder(AuditEventType::ApplyFailed, project_id, run_id, playbook)
            .apply_counts(result.attempted, result.updated, result.skipped)
            .error(error)
            .build();

        self.log(event).await
    }

    /// Query audit events with filters.
    pub async fn query(&self, filter: AuditFilter) -> Result<Vec<AuditEvent>, AuditError> {
        self.storage.query(filter).await
    }

    /// Count audit events matching a filter (ignores limit/offset).
    pub async fn count(&self, filter: AuditFilter) -> Result<usize, AuditError> {
        self.storage.count(filter).await
    }

    /// Get an audit event by ID.
    pub async fn get(&self, event_id: uuid::Uuid) -> Result<Option<AuditEvent>, AuditError> {
        self.storage.get(event_id).await
    }

    /// Get recent events for a project.
    pub async fn recent_for_project(
        &self,
        project_id: &str,
        limit: usize,
    ) -> Result<Vec<AuditEvent>, AuditError> {
        self.query(AuditFilter {
            project_id: Some(project_id.to_string()),
            limit: Some(limit),
            ..Default::default()
        })
        .await
    }

    /// Get every event recorded for a single run.
    pub async fn events_for_run(&self, run_id: &str) -> Result<Vec<AuditEvent>, AuditError> {
        self.query(AuditFilter {
            run_id: Some(run_id.to_string()),
            sort_desc: Some(false),
            ..Default::default()
        })
        .await
    }
}

/// Filter for querying audit events.
#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    /// Filter by project ID.
    pub project_id: Option<String>,
    /// Filter by run ID.
    pub run_id: Option<String>,
    /// Filter by playbook identifier.
    pub playbook: Option<String>,
    /// Filter by event type.
    pub event_type: Option<AuditEventType>,
    /// Filter by start time.
    pub start_time: Option<chrono::DateTime<chrono::Utc>>,
    /// Filter by end time.
    pub end_time: Option<chrono::DateTime<chrono::Utc>>,
    /// Maximum number of results.
    pub limit: Option<usize>,
    /// Offset for pagination.
    pub offset: Option<usize>,
    /// Sort descending by time (default: true for newest first).
    pub sort_desc: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use engineo_core::config::audit::{StorageBackend, StorageConfig};

    #[tokio::test]
    async fn test_file_backend_config_builds_a_durable_trail() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.log");
        let config = AuditConfig {
            enabled: true,
            stdout: false,
            storage: StorageConfig {
                backend: StorageBackend::File,
                file_path: Some(path.to_str().unwrap().to_string()),
            },
        };

        let logger = AuditLogger::new(config).unwrap();
        logger
            .log_rail_blocked("proj_1", "run_1", "missing_seo_title", "draft_expired")
            .await
            .unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let event: AuditEvent = serde_json::from_str(contents.lines().next().unwrap()).unwrap();
        assert_eq!(event.event_type, AuditEventType::RailBlocked);
        assert_eq!(event.block_reason.as_deref(), Some("draft_expired"));
    }

    #[tokio::test]
    async fn test_disabled_logger() {
        let logger = AuditLogger::disabled();
        assert!(!logger.is_enabled());

        // Should not error even when logging
        logger
            .log_estimate_computed("proj_1", "run_1", "missing_seo_title", "ALL_EXISTING", 12)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_console_only_logger() {
        let logger = AuditLogger::console_only();
        assert!(logger.is_enabled());

        logger
            .log_rail_blocked("proj_1", "run_1", "missing_seo_title", "scope_changed")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_apply_events_carry_counts() {
        let storage = Arc::new(MemoryStorage::new());
        let logger = AuditLogger::with_storage(AuditConfig::default(), storage);

        let result = ApplyResult {
            attempted: 30,
            updated: 10,
            skipped: 20,
            limit_reached: true,
        };
        logger
            .log_apply_completed("proj_1", "run_1", "missing_seo_title", &result)
            .await
            .unwrap();

        let events = logger.events_for_run("run_1").await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, AuditEventType::ApplyCompleted);
        assert_eq!(events[0].attempted, Some(30));
        assert_eq!(events[0].updated, Some(10));
        assert_eq!(events[0].skipped, Some(20));
        assert_eq!(events[0].limit_reached, Some(true));
    }

    #[tokio::test]
    async fn test_apply_failed_preserves_partial_counts() {
        let storage = Arc::new(MemoryStorage::new());
        let logger = AuditLogger::with_storage(AuditConfig::default(), storage);

        let partial = ApplyResult {
            attempted: 4,
            updated: 3,
            skipped: 1,
            limit_reached: false,
        };
        logger
            .log_apply_failed(
                "proj_1",
                "run_7",
                "missing_seo_description",
                &partial,
                "store write rejected",
            )
            .await
            .unwrap();

        let events = logger.events_for_run("run_7").await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, AuditEventType::ApplyFailed);
        assert_eq!(events[0].updated, Some(3));
        assert_eq!(events[0].error.as_deref(), Some("store write rejected"));
    }

    #[tokio::test]
    async fn test_run_trail_is_chronological() {
        let storage = Arc::new(MemoryStorage::new());
        let logger = AuditLogger::with_storage(AuditConfig::default(), storage);

        logger
            .log_estimate_computed("proj_1", "run_2", "missing_seo_title", "ONLY_SELECTED", 3)
            .await
            .unwrap();
        logger
            .log_preview_generated("proj_1", "run_2", "missing_seo_title", 3, false)
            .await
            .unwrap();

        let events = logger.events_for_run("run_2").await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, AuditEventType::EstimateComputed);
        assert_eq!(events[1].event_type, AuditEventType::PreviewGenerated);
    }
}
