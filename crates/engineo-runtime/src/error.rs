//! Runtime error taxonomy.
//!
//! A partially completed apply is not an error: quota-bounded runs return an
//! [`engineo_core::ApplyResult`] with `limit_reached` set. Errors here cover
//! the cases where an operation could not produce a result at all.

use engineo_audit::AuditError;
use engineo_core::{PreviewSample, SafetyRailResult};
use engineo_policy::PolicyError;
use thiserror::Error;

/// Errors surfaced by the runtime services and the run state machine.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Estimation could not complete; the caller never sees a partially
    /// populated estimate.
    #[error("estimate failed: {0}")]
    Estimate(String),

    /// The calling principal lacks the capability for the requested action.
    #[error("not permitted: {0}")]
    NotPermitted(String),

    /// The run is not in a step that allows the requested transition.
    #[error("invalid run transition: {0}")]
    InvalidTransition(String),

    /// The safety rails blocked the run immediately before execution.
    /// Zero assets were mutated.
    #[error("blocked by safety rail: {}", .0.message)]
    RailBlocked(SafetyRailResult),

    /// A policy decision rejected the request (scope, gate).
    #[error(transparent)]
    Policy(#[from] PolicyError),

    /// The audit trail could not be written.
    #[error(transparent)]
    Audit(#[from] AuditError),

    /// Unexpected collaborator failure.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Errors from preview generation.
///
/// The quota case carries the samples already produced so the caller can
/// still show a partial preview alongside the limit notice.
#[derive(Debug, Error)]
pub enum PreviewError {
    /// The daily AI usage limit was reached mid-generation.
    #[error("AI daily usage limit reached after {} samples", samples.len())]
    AiDailyLimitReached { samples: Vec<PreviewSample> },

    /// The suggestion provider failed for a non-quota reason.
    #[error("preview failed: {0}")]
    Failed(String),

    /// Unexpected collaborator failure.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
