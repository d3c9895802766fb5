//! Collaborator trait boundary.
//!
//! The runtime never talks to a storefront, an AI provider, or a billing
//! system directly. Everything external is reached through these traits, and
//! the in-memory implementations in [`crate::memory`] are enough to exercise
//! the whole workflow locally.

use async_trait::async_trait;
use engineo_core::{AssetId, Capabilities, Draft, EntitlementSnapshot, ProjectId, TargetField};
use std::sync::Arc;

/// Minimal view of one content asset as the workflow needs it: identity,
/// a human-readable title, and the current value of the target field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRef {
    pub id: AssetId,
    pub title: String,
    pub current_value: Option<String>,
}

/// One AI-generated suggestion for an asset/field pair.
#[derive(Debug, Clone)]
pub struct Suggestion {
    pub value: String,
    pub warnings: Vec<String>,
}

/// Errors from the suggestion collaborator. The quota kind is distinguished
/// because callers stop cleanly on it instead of failing the whole operation.
#[derive(Debug, thiserror::Error)]
pub enum SuggestError {
    /// The daily AI usage limit was reached; no suggestion was produced.
    #[error("AI daily usage limit reached")]
    DailyLimitReached,

    /// The provider failed for a non-quota reason.
    #[error("suggestion failed: {0}")]
    Failed(String),
}

/// Errors from consuming the daily usage meter.
#[derive(Debug, thiserror::Error)]
pub enum QuotaError {
    /// The meter has no remaining capacity for the requested units.
    #[error("daily AI usage quota exhausted")]
    Exhausted,

    /// The entitlements collaborator failed.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Read and write access to the connected storefront's assets.
///
/// `write_field` is the only mutating boundary in the entire workflow.
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// List the assets whose target field is currently missing or empty.
    async fn list_matching(
        &self,
        project: &ProjectId,
        field: TargetField,
    ) -> anyhow::Result<Vec<AssetRef>>;

    /// Write a value into the target field of one asset.
    async fn write_field(
        &self,
        project: &ProjectId,
        asset: &AssetId,
        field: TargetField,
        value: &str,
    ) -> anyhow::Result<()>;
}

/// The AI suggestion collaborator. One call per asset/field pair.
#[async_trait]
pub trait SuggestionProvider: Send + Sync {
    async fn suggest(
        &self,
        project: &ProjectId,
        asset: &AssetRef,
        field: TargetField,
    ) -> Result<Suggestion, SuggestError>;
}

/// Plan tier and daily usage metering.
///
/// Snapshot values are advisory-stale the moment they are read; consumers
/// must go through `try_consume` before every quota-consuming action.
#[async_trait]
pub trait EntitlementsProvider: Send + Sync {
    /// Current plan tier and usage counters.
    async fn snapshot(&self, project: &ProjectId) -> anyhow::Result<EntitlementSnapshot>;

    /// Atomically consume `units` from today's usage meter.
    async fn try_consume(&self, project: &ProjectId, units: u64) -> Result<(), QuotaError>;
}

/// Capability lookup for the calling principal on one project. Gates the
/// apply affordance; the safety rails re-check entitlements independently.
#[async_trait]
pub trait Authorizer: Send + Sync {
    async fn capabilities(
        &self,
        project: &ProjectId,
        principal: &str,
    ) -> anyhow::Result<Capabilities>;
}

/// Cache of unapplied drafts keyed by (project, asset, field).
#[async_trait]
pub trait DraftCache: Send + Sync {
    async fn get(
        &self,
        project: &ProjectId,
        asset: &AssetId,
        field: TargetField,
    ) -> anyhow::Result<Option<Draft>>;

    async fn put(
        &self,
        project: &ProjectId,
        asset: &AssetId,
        field: TargetField,
        draft: Draft,
    ) -> anyhow::Result<()>;
}

/// The full collaborator bundle a run needs, cheap to clone.
#[derive(Clone)]
pub struct Collaborators {
    pub assets: Arc<dyn AssetStore>,
    pub suggestions: Arc<dyn SuggestionProvider>,
    pub entitlements: Arc<dyn EntitlementsProvider>,
    pub authorizer: Arc<dyn Authorizer>,
    pub drafts: Arc<dyn DraftCache>,
}
