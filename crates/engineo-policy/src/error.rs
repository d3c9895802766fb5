//! Error types for policy decisions.
//!
//! These errors cover caller mistakes (resolving a reserved scope, confirming
//! a closed gate), not blocked outcomes: a failing estimate or safety rail is
//! a normal, typed result, never an error.

use engineo_core::ScopeOption;
use std::fmt;

/// Error type for policy decision failures.
#[derive(Debug, Clone)]
pub struct PolicyError {
    /// The kind of policy error.
    pub kind: PolicyErrorKind,
    /// Human-readable error message.
    pub message: String,
}

impl PolicyError {
    /// Create a new policy error.
    pub fn new(kind: PolicyErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// A reserved scope option was used for an executable run.
    pub fn reserved_scope_option(option: ScopeOption) -> Self {
        Self::new(
            PolicyErrorKind::ReservedScopeOption,
            format!(
                "Scope option '{}' is reserved and not executable in this version",
                option
            ),
        )
    }

    /// ONLY_SELECTED was requested without any explicit selection.
    pub fn empty_selection() -> Self {
        Self::new(
            PolicyErrorKind::EmptySelection,
            "ONLY_SELECTED requires a non-empty explicit asset selection",
        )
    }

    /// The confirmation gate was used while closed.
    pub fn gate_not_open() -> Self {
        Self::new(
            PolicyErrorKind::GateNotOpen,
            "The confirmation gate is not open",
        )
    }

    /// Confirm was requested without both confirmation factors passing.
    pub fn gate_not_confirmable(acknowledged: bool, phrase_matches: bool) -> Self {
        Self::new(
            PolicyErrorKind::GateNotConfirmable,
            format!(
                "Confirmation requires both factors: acknowledged={}, phrase_matches={}",
                acknowledged, phrase_matches
            ),
        )
    }
}

impl fmt::Display for PolicyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for PolicyError {}

/// Categories of policy errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyErrorKind {
    /// NEW_ONLY / EXISTING_AND_NEW used where an executable scope is needed.
    ReservedScopeOption,
    /// ONLY_SELECTED with no explicit asset ids.
    EmptySelection,
    /// Gate interaction while the gate is closed.
    GateNotOpen,
    /// Confirm without both confirmation factors.
    GateNotConfirmable,
}
