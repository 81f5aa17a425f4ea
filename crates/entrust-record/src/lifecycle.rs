//! Sign-off lifecycle state machine
//!
//! `Draft → Submitted → SignedOff`, plus the in-person `Draft → SignedOff`
//! shortcut for the author. No transition moves backward and `SignedOff` is
//! terminal.
//!
//! Field mutability is a pure function of (status, role): [`Permissions::of`]
//! is the single mutability matrix every mutator consults.

use crate::error::RecordError;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Lifecycle status of a form (ordered by progress)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FormStatus {
    Draft,
    Submitted,
    SignedOff,
}

impl FormStatus {
    /// Every status, in lifecycle order
    pub const ALL: [FormStatus; 3] = [FormStatus::Draft, FormStatus::Submitted, FormStatus::SignedOff];

    /// Terminal status
    #[inline]
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, FormStatus::SignedOff)
    }
}

impl Display for FormStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let label = match self {
            FormStatus::Draft => "draft",
            FormStatus::Submitted => "submitted",
            FormStatus::SignedOff => "signed off",
        };
        f.write_str(label)
    }
}

/// Acting role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Trainee who owns the form
    Author,
    /// Counter-signing assessor
    Approver,
}

impl Role {
    /// Every role
    pub const ALL: [Role; 2] = [Role::Author, Role::Approver];
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let label = match self {
            Role::Author => "author",
            Role::Approver => "approver",
        };
        f.write_str(label)
    }
}

/// Mutating actions gated by the mutability matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Grade,
    Comment,
    Link,
    Narrative,
    Entrustment,
    Assessor,
    Countersign,
    Scope,
}

impl Action {
    const fn bit(self) -> u8 {
        match self {
            Action::Grade => 1,
            Action::Comment => 1 << 1,
            Action::Link => 1 << 2,
            Action::Narrative => 1 << 3,
            Action::Entrustment => 1 << 4,
            Action::Assessor => 1 << 5,
            Action::Countersign => 1 << 6,
            Action::Scope => 1 << 7,
        }
    }
}

impl Display for Action {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let label = match self {
            Action::Grade => "grade criteria",
            Action::Comment => "comment on criteria",
            Action::Link => "link evidence",
            Action::Narrative => "edit the narrative",
            Action::Entrustment => "set the entrustment judgment",
            Action::Assessor => "set the assessor",
            Action::Countersign => "countersign",
            Action::Scope => "change level or specialty",
        };
        f.write_str(label)
    }
}

/// Set of actions a role may perform in a status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Permissions {
    bits: u8,
}

impl Permissions {
    /// Nothing writable
    pub const NONE: Permissions = Permissions { bits: 0 };

    const fn from_actions(actions: &[Action]) -> Self {
        let mut bits = 0;
        let mut i = 0;
        while i < actions.len() {
            bits |= actions[i].bit();
            i += 1;
        }
        Self { bits }
    }

    /// Mutability matrix
    ///
    /// | status    | author                     | approver                                   |
    /// |-----------|----------------------------|--------------------------------------------|
    /// | Draft     | everything but countersign | nothing                                    |
    /// | Submitted | nothing                    | grade, comment, entrustment, countersign   |
    /// | SignedOff | nothing                    | nothing                                    |
    #[must_use]
    pub const fn of(status: FormStatus, role: Role) -> Self {
        match (status, role) {
            (FormStatus::Draft, Role::Author) => Self::from_actions(&[
                Action::Grade,
                Action::Comment,
                Action::Link,
                Action::Narrative,
                Action::Entrustment,
                Action::Assessor,
                Action::Scope,
            ]),
            (FormStatus::Submitted, Role::Approver) => Self::from_actions(&[
                Action::Grade,
                Action::Comment,
                Action::Entrustment,
                Action::Countersign,
            ]),
            _ => Self::NONE,
        }
    }

    /// Check a single action
    #[inline]
    #[must_use]
    pub const fn allows(self, action: Action) -> bool {
        self.bits & action.bit() != 0
    }

    /// Whether any field is writable
    #[inline]
    #[must_use]
    pub const fn can_write(self) -> bool {
        self.bits != 0
    }

    /// Guard an action, producing the rejection error
    ///
    /// # Errors
    /// Returns [`RecordError::Rejected`] when the action is not permitted
    pub fn require(
        self,
        action: Action,
        status: FormStatus,
        role: Role,
    ) -> Result<(), RecordError> {
        if self.allows(action) {
            Ok(())
        } else {
            Err(RecordError::Rejected {
                action,
                status,
                role,
            })
        }
    }
}

/// Kind of a permitted status change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransitionKind {
    /// Draft → Submitted, dispatches a notification to the approver
    Submit,
    /// Submitted → SignedOff by the approver
    SignOff,
    /// Draft → SignedOff by the author with the approver present
    InPersonSignOff,
}

impl TransitionKind {
    /// Whether the transition dispatches to the notification collaborator
    #[inline]
    #[must_use]
    pub fn dispatches(self) -> bool {
        matches!(self, TransitionKind::Submit)
    }

    /// Whether the transition needs a countersignature
    #[inline]
    #[must_use]
    pub fn needs_countersignature(self) -> bool {
        matches!(self, TransitionKind::SignOff | TransitionKind::InPersonSignOff)
    }
}

/// Targets reachable from `from` by `role`
#[must_use]
pub fn allowed_transitions(from: FormStatus, role: Role) -> Vec<FormStatus> {
    use FormStatus::*;
    match (from, role) {
        (Draft, Role::Author) => vec![Submitted, SignedOff],
        (Submitted, Role::Approver) => vec![SignedOff],
        _ => vec![],
    }
}

/// Validates a status change for a role
///
/// # Errors
/// Returns [`RecordError::IllegalTransition`] when `to` is not reachable
/// from `from` by `role`
pub fn validate_transition(
    from: FormStatus,
    to: FormStatus,
    role: Role,
) -> Result<TransitionKind, RecordError> {
    use FormStatus::*;
    let kind = match (from, to, role) {
        (Draft, Submitted, Role::Author) => TransitionKind::Submit,
        (Draft, SignedOff, Role::Author) => TransitionKind::InPersonSignOff,
        (Submitted, SignedOff, Role::Approver) => TransitionKind::SignOff,
        _ => return Err(RecordError::IllegalTransition { from, to, role }),
    };
    debug_assert!(allowed_transitions(from, role).contains(&to));
    Ok(kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn draft_author_transitions() {
        assert_eq!(
            validate_transition(FormStatus::Draft, FormStatus::Submitted, Role::Author).unwrap(),
            TransitionKind::Submit
        );
        assert_eq!(
            validate_transition(FormStatus::Draft, FormStatus::SignedOff, Role::Author).unwrap(),
            TransitionKind::InPersonSignOff
        );
    }

    #[test]
    fn approver_cannot_submit_or_shortcut() {
        assert!(validate_transition(FormStatus::Draft, FormStatus::Submitted, Role::Approver).is_err());
        assert!(validate_transition(FormStatus::Draft, FormStatus::SignedOff, Role::Approver).is_err());
    }

    #[test]
    fn only_approver_signs_submitted() {
        assert!(validate_transition(FormStatus::Submitted, FormStatus::SignedOff, Role::Approver).is_ok());
        assert!(matches!(
            validate_transition(FormStatus::Submitted, FormStatus::SignedOff, Role::Author),
            Err(RecordError::IllegalTransition { .. })
        ));
    }

    #[test]
    fn signed_off_is_terminal() {
        for role in Role::ALL {
            assert!(allowed_transitions(FormStatus::SignedOff, role).is_empty());
            for to in FormStatus::ALL {
                assert!(validate_transition(FormStatus::SignedOff, to, role).is_err());
            }
        }
    }

    #[test]
    fn matrix_draft() {
        let author = Permissions::of(FormStatus::Draft, Role::Author);
        assert!(author.allows(Action::Grade));
        assert!(author.allows(Action::Link));
        assert!(author.allows(Action::Scope));
        assert!(!author.allows(Action::Countersign));
        assert!(!Permissions::of(FormStatus::Draft, Role::Approver).can_write());
    }

    #[test]
    fn matrix_submitted() {
        let approver = Permissions::of(FormStatus::Submitted, Role::Approver);
        assert!(approver.allows(Action::Grade));
        assert!(approver.allows(Action::Comment));
        assert!(approver.allows(Action::Entrustment));
        assert!(approver.allows(Action::Countersign));
        assert!(!approver.allows(Action::Link));
        assert!(!approver.allows(Action::Narrative));
        assert!(!Permissions::of(FormStatus::Submitted, Role::Author).can_write());
    }

    #[test]
    fn matrix_signed_off_is_read_only() {
        for role in Role::ALL {
            assert_eq!(Permissions::of(FormStatus::SignedOff, role), Permissions::NONE);
        }
    }

    #[test]
    fn require_reports_rejection() {
        let err = Permissions::of(FormStatus::SignedOff, Role::Author)
            .require(Action::Grade, FormStatus::SignedOff, Role::Author)
            .unwrap_err();
        assert!(err.to_string().contains("grade criteria"));
    }

    fn status() -> impl Strategy<Value = FormStatus> {
        prop_oneof![
            Just(FormStatus::Draft),
            Just(FormStatus::Submitted),
            Just(FormStatus::SignedOff),
        ]
    }

    fn role() -> impl Strategy<Value = Role> {
        prop_oneof![Just(Role::Author), Just(Role::Approver)]
    }

    proptest! {
        #[test]
        fn prop_transitions_match_allowed_set(from in status(), to in status(), role in role()) {
            let res = validate_transition(from, to, role);
            let allowed = allowed_transitions(from, role);
            prop_assert_eq!(res.is_ok(), allowed.contains(&to));
        }

        #[test]
        fn prop_transitions_never_move_backward(from in status(), to in status(), role in role()) {
            if validate_transition(from, to, role).is_ok() {
                prop_assert!(to > from);
            }
        }
    }
}
