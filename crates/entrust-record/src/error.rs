//! Error types for form records
//!
//! Every error leaves the record untouched: mutators check before they write.

use crate::lifecycle::{Action, FormStatus, Role};
use entrust_catalog::{FormType, Grade, GradeScale, Level, RequirementKey, Specialty};

/// Errors raised by form record operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    /// Mutability matrix forbids the write
    #[error("{role} may not {action} while the form is {status}")]
    Rejected {
        action: Action,
        status: FormStatus,
        role: Role,
    },

    /// Target status not reachable by this role
    #[error("illegal transition {from} -> {to} for {role}")]
    IllegalTransition {
        from: FormStatus,
        to: FormStatus,
        role: Role,
    },

    /// Required field missing at a lifecycle transition
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationFailure),

    /// Key does not belong to the record's current scope
    #[error("key {key} is outside the form's current scope")]
    OutOfScope { key: RequirementKey },

    /// Key does not address a criterion of the resolved requirements
    #[error("no criterion at {key}")]
    UnknownCriterion { key: RequirementKey },

    /// Grade from the other form type's scale
    #[error("grade {grade} is not on the {scale:?} scale")]
    WrongScale { grade: Grade, scale: GradeScale },

    /// Specialty not selectable at the record's level
    #[error("specialty '{specialty}' is not available for {form_type} at {level}")]
    InvalidSpecialty {
        form_type: FormType,
        level: Level,
        specialty: Specialty,
    },

    /// Catalog has no entries for the requested level
    #[error("no requirements for {form_type} at {level}")]
    NoRequirements { form_type: FormType, level: Level },

    /// Requirements passed in were resolved for a different scope
    #[error("requirements for {level} '{specialty}' do not match the form")]
    MismatchedRequirements { level: Level, specialty: Specialty },

    /// Transition plan was made for another record or an older status
    #[error("stale transition plan for form {form_id}")]
    StalePlan { form_id: String },
}

impl RecordError {
    /// Permission or reachability failure
    #[inline]
    #[must_use]
    pub fn is_illegal(&self) -> bool {
        matches!(
            self,
            RecordError::Rejected { .. } | RecordError::IllegalTransition { .. }
        )
    }
}

/// Guard that blocked a lifecycle transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationFailure {
    #[error("an entrustment judgment must be selected")]
    MissingEntrustment,

    #[error("the narrative must not be empty")]
    MissingNarrative,

    #[error("approver name and email are required")]
    MissingApprover,

    #[error("a countersignature with name, registration id and signature is required")]
    MissingCountersignature,
}
