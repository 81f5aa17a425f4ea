//! Entrust Form Records
//!
//! Grading, evidence linking and the sign-off lifecycle of one assessment
//! form.
//!
//! # Core Concepts
//!
//! - [`FormRecord`]: Aggregate root holding scope, grades, links, narrative and status
//! - [`GradingStore`]: Per-criterion grade and comment with completeness rules
//! - [`EvidenceLinks`]: Many-to-many registry of requirement keys to evidence refs
//! - [`Permissions`]: Mutability matrix keyed by ([`FormStatus`], [`Role`])
//! - [`TransitionPlan`]: Validated status change, applied only after side-effects succeed
//!
//! # Example
//!
//! ```rust,ignore
//! use entrust_catalog::{Catalog, FormType, Grade, Level, Section, Specialty};
//! use entrust_record::{FormRecord, FormStatus, Role, TransitionPayload};
//!
//! let catalog = Catalog::builtin()?;
//! let mut record = FormRecord::open(FormType::Epa, Level::new(3)?, &Specialty::named("Glaucoma"), catalog)?;
//!
//! let requirements = record.requirements(catalog).unwrap();
//! let key = record.scope().criterion(Section::new('B').unwrap(), 0);
//! record.set_grade(Role::Author, key.clone(), Grade::Yes, requirements)?;
//! record.link(Role::Author, key, "ev1".into())?;
//!
//! let plan = record.plan_transition(FormStatus::Submitted, Role::Author, &TransitionPayload::new())?;
//! record = record.with_plan(&plan)?;
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
mod error;
mod evidence;
mod grading;
mod lifecycle;
mod linking;
mod record;

// Re-exports
pub use error::{RecordError, ValidationFailure};
pub use evidence::{AttachedFile, EvidenceKind, EvidenceLookup, EvidenceRef, EvidenceSummary};
pub use grading::{CriterionGrading, GradingStore};
pub use lifecycle::{
    allowed_transitions, validate_transition, Action, FormStatus, Permissions, Role,
    TransitionKind,
};
pub use linking::EvidenceLinks;
pub use record::{
    Assessor, CompletionSummary, Countersignature, FormId, FormRecord, SectionCompletion,
    TransitionPayload, TransitionPlan,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod integration_tests {
    use super::*;
    use entrust_catalog::{Catalog, EntrustmentJudgment, FormType, Grade, Level, Section, Specialty};

    #[test]
    fn draft_to_signed_off_via_approver() {
        let catalog = Catalog::builtin().unwrap();
        let mut record = FormRecord::open(
            FormType::Epa,
            Level::new(4).unwrap(),
            &Specialty::named("Medical Retina"),
            catalog,
        )
        .unwrap();

        let req = record.requirements(catalog).unwrap();
        let b = Section::new('B').unwrap();
        record.mark_all_yes(Role::Author, b, req).unwrap();
        record
            .set_entrustment(Role::Author, Some(EntrustmentJudgment::CompetentToThisLevel))
            .unwrap();
        record.set_narrative(Role::Author, "Independent injection clinic").unwrap();

        let payload = TransitionPayload::new()
            .with_assessor(Assessor::new("Dr Haddad", "haddad@example.org"));
        let plan = record
            .plan_transition(FormStatus::Submitted, Role::Author, &payload)
            .unwrap();
        record = record.with_plan(&plan).unwrap();

        let key = record.scope().criterion(b, 0);
        record.set_grade(Role::Approver, key.clone(), Grade::Reservation, req).unwrap();
        record.set_comment(Role::Approver, key, "Needs more volume", req).unwrap();

        let payload = TransitionPayload::new()
            .with_countersignature(Countersignature::new("Dr Haddad", "GMC7654321", "sig"));
        let plan = record
            .plan_transition(FormStatus::SignedOff, Role::Approver, &payload)
            .unwrap();
        record = record.with_plan(&plan).unwrap();

        assert_eq!(record.status(), FormStatus::SignedOff);
        assert!(!record.permissions(Role::Author).can_write());
        assert!(!record.permissions(Role::Approver).can_write());
    }
}
