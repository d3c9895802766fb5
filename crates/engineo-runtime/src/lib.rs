//! # engineo-runtime
//!
//! Async orchestration of the playbook workflow: preview, estimate,
//! confirmation, safety rails, apply. External systems (the storefront's
//! asset store, the AI suggestion provider, billing entitlements) sit behind
//! the trait boundary in [`adapter`]; the decision logic itself lives in
//! `engineo-policy` and is pure and synchronous.
//!
//! The entry point is [`PlaybookRun`], which owns all per-run state and
//! enforces the step sequencing: a preview before the estimate, a
//! `can_proceed` estimate before the confirmation gate, and the safety rails
//! between confirmation and the executor.

pub mod adapter;
pub mod drafts;
pub mod error;
pub mod executor;
pub mod memory;
pub mod preview;
pub mod rails;
pub mod resolver;
pub mod run;

pub use adapter::{
    AssetRef, AssetStore, Authorizer, Collaborators, DraftCache, EntitlementsProvider, QuotaError,
    SuggestError, Suggestion, SuggestionProvider,
};
pub use drafts::{DraftService, DraftsOutcome};
pub use error::{PreviewError, RuntimeError};
pub use executor::ApplyExecutor;
pub use memory::{
    MemoryAssetStore, MemoryDraftCache, MeteredEntitlements, RuleSuggestionProvider,
    StaticAuthorizer,
};
pub use preview::PreviewGenerator;
pub use rails::SafetyRailEvaluator;
pub use resolver::EstimateResolver;
pub use run::{PlaybookRun, PreviewOutcome, RunStep};
