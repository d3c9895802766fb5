//! # engineo-audit
//!
//! Append-only audit logging for EngineO playbook runs.
//!
//! This crate provides functionality for:
//! - Recording every quota-relevant workflow step keyed by
//!   [project - run - playbook]
//! - Tracking safety-rail blocks and apply outcomes
//! - Storing audit events in files (JSON Lines) and console (human-readable)
//! - Querying audit history with filters
//!
//! ## Event Types
//!
//! | Event Type | Description |
//! |------------|-------------|
//! | `EstimateComputed` | An eligibility estimate was derived |
//! | `PreviewGenerated` | A bounded before/after sample was produced |
//! | `DraftsGenerated` | The draft cache was filled for a scope |
//! | `RailBlocked` | The safety rails blocked a run before any write |
//! | `ApplyCompleted` | An apply run finished (possibly limit-bounded) |
//! | `ApplyFailed` | An apply run aborted on an unexpected error |
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use engineo_audit::AuditLogger;
//! use engineo_core::{ApplyResult, AuditConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let logger = AuditLogger::new(AuditConfig::default())?;
//!
//! let result = ApplyResult { attempted: 30, updated: 10, skipped: 20, limit_reached: true };
//! logger
//!     .log_apply_completed("proj_1", "run_1", "missing_seo_title", &result)
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod event;
pub mod logger;
pub mod storage;

pub use error::AuditError;
pub use event::{AuditEvent, AuditEventBuilder, AuditEventType};
pub use logger::{AuditFilter, AuditLogger};
pub use storage::{AuditStorage, ConsoleStorage, DualStorage, FileStorage, MemoryStorage, NullStorage};
