//! Audit event types.
//!
//! Structured audit events for playbook runs. Events are keyed by
//! [project - run - playbook] so one run's whole trail can be recovered, and
//! carry the outcome fields the workflow reports: blocking reasons from the
//! safety rails and updated/skipped counts from the apply executor.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Type of audit event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    // ===== Read-only workflow steps =====
    /// An eligibility estimate was derived.
    EstimateComputed,
    /// A bounded before/after preview sample was produced.
    PreviewGenerated,
    /// The draft cache was filled (or topped up) for a scope.
    DraftsGenerated,

    // ===== Execution boundary =====
    /// The safety rails blocked the run before any write.
    RailBlocked,
    /// An apply run finished, possibly limit-bounded.
    ApplyCompleted,
    /// An apply run aborted on an unexpected error.
    ApplyFailed,
}

impl std::fmt::Display for AuditEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EstimateComputed => write!(f, "ESTIMATE_COMPUTED"),
            Self::PreviewGenerated => write!(f, "PREVIEW_GENERATED"),
            Self::DraftsGenerated => write!(f, "DRAFTS_GENERATED"),
            Self::RailBlocked => write!(f, "RAIL_BLOCKED"),
            Self::ApplyCompleted => write!(f, "APPLY_COMPLETED"),
            Self::ApplyFailed => write!(f, "APPLY_FAILED"),
        }
    }
}

/// An audit event.
///
/// Core fields follow the format: [project - run - playbook] with
/// step-specific outcome fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique event ID.
    pub event_id: Uuid,

    /// When the event occurred.
    pub occurred_at: DateTime<Utc>,

    /// Event type.
    pub event_type: AuditEventType,

    // ===== Core fields: [project - run - playbook] =====
    /// Project the run belongs to (required for multi-tenant isolation).
    pub project_id: String,

    /// Run context the event belongs to.
    pub run_id: String,

    /// Playbook identifier (e.g. "missing_seo_title").
    pub playbook: String,

    // ===== Scope details =====
    /// Scope option used by the run, if applicable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope_option: Option<String>,

    /// Number of assets in the resolved scope.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_count: Option<u64>,

    // ===== Safety rail fields =====
    /// The blocking reason, for RailBlocked events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_reason: Option<String>,

    // ===== Apply outcome fields =====
    /// Assets the run attempted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempted: Option<u64>,

    /// Assets updated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated: Option<u64>,

    /// Assets skipped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<u64>,

    /// Whether the daily limit stopped the run early.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit_reached: Option<bool>,

    // ===== Execution details =====
    /// Duration in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,

    /// Error message (if event_type indicates failure).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Additional metadata.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub meta: serde_json::Value,
}

impl AuditEvent {
    /// Create a new audit event with the given type and core fields.
    pub fn new(
        event_type: AuditEventType,
        project_id: impl Into<String>,
        run_id: impl Into<String>,
        playbook: impl Into<String>,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            event_type,
            project_id: project_id.into(),
            run_id: run_id.into(),
            playbook: playbook.into(),
            scope_option: None,
            asset_count: None,
            block_reason: None,
            attempted: None,
            updated: None,
            skipped: None,
            limit_reached: None,
            duration_ms: None,
            error: None,
            meta: serde_json::Value::Null,
        }
    }

    /// Create a builder for an audit event.
    pub fn builder(
        event_type: AuditEventType,
        project_id: impl Into<String>,
        run_id: impl Into<String>,
        playbook: impl Into<String>,
    ) -> AuditEventBuilder {
        AuditEventBuilder::new(event_type, project_id, run_id, playbook)
    }

    /// Format the event as a human-readable log line.
    ///
    /// Format: `[timestamp] EVENT_TYPE project=... run=... playbook=... [...]`
    pub fn to_log_line(&self) -> String {
        let mut line = format!(
            "[{}] {} project={} run={} playbook={}",
            self.occurred_at.format("%Y-%m-%dT%H:%M:%S%.3fZ"),
            self.event_type,
            self.project_id,
            self.run_id,
            self.playbook,
        );

        if let Some(ref option) = self.scope_option {
            line.push_str(&format!(" scope={}", option));
        }

        if let Some(count) = self.asset_count {
            line.push_str(&format!(" assets={}", count));
        }

        if let Some(ref reason) = self.block_reason {
            line.push_str(&format!(" block_reason={}", reason));
        }

        if let Some(attempted) = self.attempted {
            line.push_str(&format!(" attempted={}", attempted));
        }

        if let Some(updated) = self.updated {
            line.push_str(&format!(" updated={}", updated));
        }

        if let Some(skipped) = self.skipped {
            line.push_str(&format!(" skipped={}", skipped));
        }

        if self.limit_reached == Some(true) {
            line.push_str(" limit_reached=true");
        }

        if let Some(duration) = self.duration_ms {
            line.push_str(&format!(" duration_ms={}", duration));
        }

        if let Some(ref error) = self.error {
            line.push_str(&format!(" error=\"{}\"", error.replace('"', "'")));
        }

        line
    }
}

/// Builder for creating audit events.
#[derive(Debug)]
pub struct AuditEventBuilder {
    event: AuditEvent,
}

impl AuditEventBuilder {
    /// Create a new builder with required fields.
    pub fn new(
        event_type: AuditEventType,
        project_id: impl Into<String>,
        run_id: impl Into<String>,
        playbook: impl Into<String>,
    ) -> Self {
        Self {
            event: AuditEvent::new(event_type, project_id, run_id, playbook),
        }
    }

    /// Set the scope option.
    pub fn scope_option(mut self, option: impl Into<String>) -> Self {
        self.event.scope_option = Some(option.into());
        self
    }

    /// Set the resolved asset count.
    pub fn asset_count(mut self, count: u64) -> Self {
        self.event.asset_count = Some(count);
        self
    }

    /// Set the safety-rail blocking reason.
    pub fn block_reason(mut self, reason: impl Into<String>) -> Self {
        self.event.block_reason = Some(reason.into());
        self
    }

    /// Set the apply outcome counts.
    pub fn apply_counts(mut self, attempted: u64, updated: u64, skipped: u64) -> Self {
        self.event.attempted = Some(attempted);
        self.event.updated = Some(updated);
        self.event.skipped = Some(skipped);
        self
    }

    /// Set the limit-reached flag.
    pub fn limit_reached(mut self, value: bool) -> Self {
        self.event.limit_reached = Some(value);
        self
    }

    /// Set the duration in milliseconds.
    pub fn duration_ms(mut self, duration: u64) -> Self {
        self.event.duration_ms = Some(duration);
        self
    }

    /// Set the error message.
    pub fn error(mut self, error: impl Into<String>) -> Self {
        self.event.error = Some(error.into());
        self
    }

    /// Set additional metadata.
    pub fn meta(mut self, meta: serde_json::Value) -> Self {
        self.event.meta = meta;
        self
    }

    /// Build the audit event.
    pub fn build(self) -> AuditEvent {
        self.event
    }
}
