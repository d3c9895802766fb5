//! EngineO decision logic.
//!
//! This crate holds the pure, synchronous decisions of the playbook
//! workflow, separated from the async runtime that gathers their inputs:
//!
//! 1. **Eligibility** - blocking-reason aggregation behind an estimate
//! 2. **Scope** - resolving the concrete target set for a run
//! 3. **Confirmation** - the mandatory two-factor intent gate
//! 4. **Safety rails** - the short-circuiting pre-execution guard chain
//!
//! Everything here is deterministic given its inputs; the runtime crate is
//! responsible for reading those inputs freshly before asking for a decision.

pub mod confirmation;
pub mod eligibility;
pub mod error;
pub mod rails;
pub mod scope;

pub use confirmation::{CONFIRM_PHRASE, Confirmation, ConfirmationGate};
pub use eligibility::{EligibilityInputs, derive_reasons};
pub use error::{PolicyError, PolicyErrorKind};
pub use rails::{RailInputs, evaluate_rails, scope_signature};
pub use scope::resolve_scope;
