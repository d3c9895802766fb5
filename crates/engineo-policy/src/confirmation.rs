//! The intent confirmation gate.
//!
//! A mandatory two-factor confirmation that sits between estimate and apply:
//! the caller must acknowledge responsibility AND type the confirmation
//! phrase. Both factors are independent; either alone is insufficient. The
//! gate - not the caller's button - is the source of truth for whether apply
//! may fire: confirming is the only path that yields a [`Confirmation`]
//! token, and a second open request while the gate is already open is a
//! no-op.
//!
//! States: `Closed -> Open(unconfirmed) -> Open(confirmed) -> Closed`.
//! Cancel closes from any open state and discards all confirmation state.
//! There is no timeout-based auto-close and no auto-confirm.

use crate::error::PolicyError;

/// The literal phrase the caller must type, compared ASCII
/// case-insensitively.
pub const CONFIRM_PHRASE: &str = "apply";

#[derive(Debug, Clone, PartialEq, Eq)]
enum GateState {
    Closed,
    Open {
        acknowledged: bool,
        typed_phrase: String,
    },
}

/// Proof that the confirmation gate passed for one apply invocation.
///
/// Cannot be constructed outside this module; holding one means
/// [`ConfirmationGate::confirm`] succeeded.
#[derive(Debug)]
pub struct Confirmation(());

/// The confirmation gate state machine. One gate per run context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationGate {
    state: GateState,
}

impl ConfirmationGate {
    pub fn new() -> Self {
        Self {
            state: GateState::Closed,
        }
    }

    /// Open the gate with empty confirmation state. No-op when already open,
    /// so a repeated apply request cannot reset a half-filled confirmation.
    pub fn open(&mut self) {
        if matches!(self.state, GateState::Closed) {
            self.state = GateState::Open {
                acknowledged: false,
                typed_phrase: String::new(),
            };
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, GateState::Open { .. })
    }

    /// Close the gate and discard all confirmation state. Safe to call at any
    /// time; guarantees no side effects.
    pub fn cancel(&mut self) {
        self.state = GateState::Closed;
    }

    /// Record the responsibility acknowledgement. Ignored while closed.
    pub fn set_acknowledged(&mut self, value: bool) {
        if let GateState::Open { acknowledged, .. } = &mut self.state {
            *acknowledged = value;
        }
    }

    /// Record the typed phrase. Ignored while closed.
    pub fn set_phrase(&mut self, phrase: &str) {
        if let GateState::Open { typed_phrase, .. } = &mut self.state {
            *typed_phrase = phrase.to_string();
        }
    }

    /// Whether both confirmation factors currently pass.
    pub fn is_confirmable(&self) -> bool {
        match &self.state {
            GateState::Open {
                acknowledged,
                typed_phrase,
            } => *acknowledged && typed_phrase.eq_ignore_ascii_case(CONFIRM_PHRASE),
            GateState::Closed => false,
        }
    }

    /// Confirm and close the gate. This is the only way to obtain a
    /// [`Confirmation`], and therefore the only path to the apply executor.
    pub fn confirm(&mut self) -> Result<Confirmation, PolicyError> {
        match &self.state {
            GateState::Closed => Err(PolicyError::gate_not_open()),
            GateState::Open {
                acknowledged,
                typed_phrase,
            } => {
                let phrase_matches = typed_phrase.eq_ignore_ascii_case(CONFIRM_PHRASE);
                if *acknowledged && phrase_matches {
                    self.state = GateState::Closed;
                    Ok(Confirmation(()))
                } else {
                    Err(PolicyError::gate_not_confirmable(
                        *acknowledged,
                        phrase_matches,
                    ))
                }
            }
        }
    }
}

impl Default for ConfirmationGate {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PolicyErrorKind;

    #[test]
    fn phrase_matrix() {
        let mut gate = ConfirmationGate::new();
        gate.open();
        gate.set_acknowledged(true);

        for phrase in ["CONFIRM", "yes", "", "appl", "apply now"] {
            gate.set_phrase(phrase);
            assert!(!gate.is_confirmable(), "'{}' must not confirm", phrase);
        }
        for phrase in ["apply", "Apply", "APPLY", "aPpLy"] {
            gate.set_phrase(phrase);
            assert!(gate.is_confirmable(), "'{}' must confirm", phrase);
        }
    }

    #[test]
    fn either_factor_alone_is_insufficient() {
        let mut gate = ConfirmationGate::new();
        gate.open();

        gate.set_phrase("apply");
        assert!(!gate.is_confirmable());

        gate.set_phrase("");
        gate.set_acknowledged(true);
        assert!(!gate.is_confirmable());

        gate.set_phrase("apply");
        assert!(gate.is_confirmable());

        // Unchecking the box re-disables confirm even with a valid phrase.
        gate.set_acknowledged(false);
        assert!(!gate.is_confirmable());
    }

    #[test]
    fn confirm_closes_the_gate() {
        let mut gate = ConfirmationGate::new();
        gate.open();
        gate.set_acknowledged(true);
        gate.set_phrase("APPLY");

        gate.confirm().unwrap();
        assert!(!gate.is_open());

        // A second confirm without reopening fails.
        let err = gate.confirm().unwrap_err();
        assert_eq!(err.kind, PolicyErrorKind::GateNotOpen);
    }

    #[test]
    fn confirm_while_unconfirmable_fails() {
        let mut gate = ConfirmationGate::new();
        gate.open();
        gate.set_phrase("apply");
        let err = gate.confirm().unwrap_err();
        assert_eq!(err.kind, PolicyErrorKind::GateNotConfirmable);
        assert!(gate.is_open());
    }

    #[test]
    fn cancel_discards_state() {
        let mut gate = ConfirmationGate::new();
        gate.open();
        gate.set_acknowledged(true);
        gate.set_phrase("apply");
        gate.cancel();
        assert!(!gate.is_open());

        // Reopening starts from empty confirmation state.
        gate.open();
        assert!(!gate.is_confirmable());
    }

    #[test]
    fn reopen_while_open_is_a_noop() {
        let mut gate = ConfirmationGate::new();
        gate.open();
        gate.set_acknowledged(true);
        gate.set_phrase("apply");

        // Second apply click: must not reset the half-completed confirmation.
        gate.open();
        assert!(gate.is_confirmable());
    }
}
