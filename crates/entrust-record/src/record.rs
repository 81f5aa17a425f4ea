//! Form record aggregate
//!
//! A [`FormRecord`] is one assessable unit (one EPA, one GSAT). It owns its
//! grading store and linked evidence, and every mutator consults the
//! mutability matrix for the acting [`Role`] before writing anything.
//!
//! Status changes are two-phase: [`FormRecord::plan_transition`] runs every
//! guard without touching the record, and [`FormRecord::with_plan`] produces
//! the transitioned copy. Callers that dispatch side-effects do so between
//! the two phases so a failed effect leaves the record unchanged.

use crate::error::{RecordError, ValidationFailure};
use crate::evidence::{EvidenceLookup, EvidenceRef, EvidenceSummary};
use crate::grading::{CriterionGrading, GradingStore};
use crate::lifecycle::{validate_transition, Action, FormStatus, Permissions, Role, TransitionKind};
use crate::linking::EvidenceLinks;
use chrono::{DateTime, Utc};
use entrust_catalog::{
    Catalog, EntrustmentJudgment, FormType, Grade, Level, RequirementKey, RequirementScope,
    RequirementsCatalog, Section, Specialty, SpecialtyRequirements,
};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;
use ulid::Ulid;

/// Unique form identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormId(Ulid);

impl FormId {
    /// Generate new random id
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }

    #[inline]
    #[must_use]
    pub fn as_ulid(&self) -> Ulid {
        self.0
    }
}

impl Default for FormId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for FormId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for FormId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ulid::from_string(s).map(Self)
    }
}

impl From<FormId> for EvidenceRef {
    fn from(value: FormId) -> Self {
        EvidenceRef::new(value.to_string())
    }
}

/// Approver identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assessor {
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration_id: Option<String>,
}

impl Assessor {
    /// Create new assessor
    #[must_use]
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            registration_id: None,
        }
    }

    /// Set professional registration id
    #[inline]
    #[must_use]
    pub fn with_registration_id(mut self, id: impl Into<String>) -> Self {
        self.registration_id = Some(id.into());
        self
    }

    /// Name and contact both present
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.name.trim().is_empty() && !self.email.trim().is_empty()
    }
}

/// Countersignature artifact captured at sign-off
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Countersignature {
    pub name: String,
    pub registration_id: String,
    /// Rendered signature, opaque to the engine
    pub signature: String,
}

impl Countersignature {
    /// Create new countersignature
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        registration_id: impl Into<String>,
        signature: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            registration_id: registration_id.into(),
            signature: signature.into(),
        }
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        [&self.name, &self.registration_id, &self.signature]
            .iter()
            .all(|s| !s.trim().is_empty())
    }
}

/// Extra data supplied with a transition request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionPayload {
    /// Overrides the stored assessor when present
    #[serde(default)]
    pub assessor: Option<Assessor>,
    /// Overrides the stored countersignature when present
    #[serde(default)]
    pub countersignature: Option<Countersignature>,
}

impl TransitionPayload {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn with_assessor(mut self, assessor: Assessor) -> Self {
        self.assessor = Some(assessor);
        self
    }

    #[inline]
    #[must_use]
    pub fn with_countersignature(mut self, countersignature: Countersignature) -> Self {
        self.countersignature = Some(countersignature);
        self
    }
}

/// A validated status change, ready to apply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionPlan {
    form_id: FormId,
    from: FormStatus,
    to: FormStatus,
    role: Role,
    kind: TransitionKind,
    assessor: Assessor,
    countersignature: Option<Countersignature>,
}

impl TransitionPlan {
    #[inline]
    #[must_use]
    pub fn form_id(&self) -> FormId {
        self.form_id
    }

    #[inline]
    #[must_use]
    pub fn from(&self) -> FormStatus {
        self.from
    }

    #[inline]
    #[must_use]
    pub fn to(&self) -> FormStatus {
        self.to
    }

    #[inline]
    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> TransitionKind {
        self.kind
    }

    /// Approver the transition is addressed to
    #[inline]
    #[must_use]
    pub fn assessor(&self) -> &Assessor {
        &self.assessor
    }
}

/// Completion of one visible section
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionCompletion {
    pub section: Section,
    pub title: String,
    pub complete: usize,
    pub total: usize,
}

impl SectionCompletion {
    #[inline]
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.complete == self.total
    }
}

/// Criterion completion rolled up per section
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CompletionSummary {
    pub sections: Vec<SectionCompletion>,
}

impl CompletionSummary {
    #[must_use]
    pub fn complete(&self) -> usize {
        self.sections.iter().map(|s| s.complete).sum()
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.sections.iter().map(|s| s.total).sum()
    }

    /// Every visible criterion complete
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.sections.iter().all(SectionCompletion::is_complete)
    }

    /// Fraction of complete criteria, 1.0 when nothing is gradable
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn ratio(&self) -> f64 {
        match self.total() {
            0 => 1.0,
            total => self.complete() as f64 / total as f64,
        }
    }
}

/// One assessable form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormRecord {
    id: FormId,
    form_type: FormType,
    level: Level,
    specialty: Specialty,
    #[serde(default)]
    grading: GradingStore,
    #[serde(default)]
    links: EvidenceLinks,
    #[serde(default)]
    narrative: String,
    #[serde(default)]
    entrustment: Option<EntrustmentJudgment>,
    #[serde(default)]
    assessor: Option<Assessor>,
    #[serde(default)]
    countersignature: Option<Countersignature>,
    status: FormStatus,
    created_at: DateTime<Utc>,
    last_modified: DateTime<Utc>,
    #[serde(default)]
    submitted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    signed_off_at: Option<DateTime<Utc>>,
}

impl FormRecord {
    /// Create new draft record without consulting a catalog
    ///
    /// Levels that share the generic entry always carry the generic specialty.
    #[must_use]
    pub fn new(form_type: FormType, level: Level, specialty: Specialty) -> Self {
        let specialty = if level.uses_generic_entry() {
            Specialty::Generic
        } else {
            specialty
        };
        let now = Utc::now();
        Self {
            id: FormId::new(),
            form_type,
            level,
            specialty,
            grading: GradingStore::new(),
            links: EvidenceLinks::new(),
            narrative: String::new(),
            entrustment: None,
            assessor: None,
            countersignature: None,
            status: FormStatus::Draft,
            created_at: now,
            last_modified: now,
            submitted_at: None,
            signed_off_at: None,
        }
    }

    /// Create new draft record on the catalog entry `specialty` resolves to
    ///
    /// # Errors
    /// Returns [`RecordError::NoRequirements`] when the catalog has nothing
    /// for the form type at `level`
    pub fn open(
        form_type: FormType,
        level: Level,
        specialty: &Specialty,
        catalog: &Catalog,
    ) -> Result<Self, RecordError> {
        let resolved = catalog
            .domain(form_type)
            .and_then(|d| d.resolve(level, specialty))
            .ok_or(RecordError::NoRequirements { form_type, level })?;
        Ok(Self::new(form_type, level, resolved.specialty.clone()))
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> FormId {
        self.id
    }

    #[inline]
    #[must_use]
    pub fn form_type(&self) -> FormType {
        self.form_type
    }

    #[inline]
    #[must_use]
    pub fn level(&self) -> Level {
        self.level
    }

    #[inline]
    #[must_use]
    pub fn specialty(&self) -> &Specialty {
        &self.specialty
    }

    #[inline]
    #[must_use]
    pub fn status(&self) -> FormStatus {
        self.status
    }

    #[inline]
    #[must_use]
    pub fn grading(&self) -> &GradingStore {
        &self.grading
    }

    #[inline]
    #[must_use]
    pub fn links(&self) -> &EvidenceLinks {
        &self.links
    }

    #[inline]
    #[must_use]
    pub fn narrative(&self) -> &str {
        &self.narrative
    }

    #[inline]
    #[must_use]
    pub fn entrustment(&self) -> Option<EntrustmentJudgment> {
        self.entrustment
    }

    #[inline]
    #[must_use]
    pub fn assessor(&self) -> Option<&Assessor> {
        self.assessor.as_ref()
    }

    #[inline]
    #[must_use]
    pub fn countersignature(&self) -> Option<&Countersignature> {
        self.countersignature.as_ref()
    }

    #[inline]
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[inline]
    #[must_use]
    pub fn last_modified(&self) -> DateTime<Utc> {
        self.last_modified
    }

    #[inline]
    #[must_use]
    pub fn submitted_at(&self) -> Option<DateTime<Utc>> {
        self.submitted_at
    }

    #[inline]
    #[must_use]
    pub fn signed_off_at(&self) -> Option<DateTime<Utc>> {
        self.signed_off_at
    }

    /// Current (form type, level, specialty) triple
    #[must_use]
    pub fn scope(&self) -> RequirementScope {
        RequirementScope::new(self.form_type, self.level, self.specialty.clone())
    }

    /// Narrative key of the current scope
    #[must_use]
    pub fn narrative_key(&self) -> RequirementKey {
        self.scope().narrative()
    }

    /// Writable actions for `role` in the current status
    #[inline]
    #[must_use]
    pub fn permissions(&self, role: Role) -> Permissions {
        Permissions::of(self.status, role)
    }

    /// Requirements the current scope resolves to
    #[must_use]
    pub fn requirements<'c>(&self, catalog: &'c Catalog) -> Option<&'c SpecialtyRequirements> {
        catalog.resolve(&self.scope())
    }

    fn guard(&self, role: Role, action: Action) -> Result<(), RecordError> {
        self.permissions(role).require(action, self.status, role)
    }

    // keys index the grading and link maps, so scope equality is exact
    fn check_key(&self, key: &RequirementKey) -> Result<(), RecordError> {
        if key.in_scope(&self.scope()) {
            Ok(())
        } else {
            Err(RecordError::OutOfScope { key: key.clone() })
        }
    }

    fn check_criterion_key(
        &self,
        key: &RequirementKey,
        requirements: &SpecialtyRequirements,
    ) -> Result<(), RecordError> {
        self.check_key(key)?;
        self.check_requirements(requirements)?;
        if requirements.criterion_for(key).is_none() {
            return Err(RecordError::UnknownCriterion { key: key.clone() });
        }
        Ok(())
    }

    fn check_requirements(&self, requirements: &SpecialtyRequirements) -> Result<(), RecordError> {
        if requirements.level == self.level && requirements.specialty.matches(&self.specialty) {
            Ok(())
        } else {
            Err(RecordError::MismatchedRequirements {
                level: requirements.level,
                specialty: requirements.specialty.clone(),
            })
        }
    }

    fn touch(&mut self) {
        self.last_modified = Utc::now();
    }

    /// Grade a criterion of `requirements`
    ///
    /// # Errors
    /// Rejected by the mutability matrix, key outside the current scope, no
    /// such criterion in a visible section, or a grade from the other scale
    pub fn set_grade(
        &mut self,
        role: Role,
        key: RequirementKey,
        grade: Grade,
        requirements: &SpecialtyRequirements,
    ) -> Result<(), RecordError> {
        self.guard(role, Action::Grade)?;
        self.check_criterion_key(&key, requirements)?;
        let scale = self.form_type.grade_scale();
        if !scale.contains(grade) {
            return Err(RecordError::WrongScale { grade, scale });
        }
        self.grading.set_grade(key, grade);
        self.touch();
        Ok(())
    }

    /// Replace a criterion comment
    ///
    /// # Errors
    /// Rejected by the mutability matrix, key outside the current scope, or
    /// no such criterion in a visible section
    pub fn set_comment(
        &mut self,
        role: Role,
        key: RequirementKey,
        text: impl Into<String>,
        requirements: &SpecialtyRequirements,
    ) -> Result<(), RecordError> {
        self.guard(role, Action::Comment)?;
        self.check_criterion_key(&key, requirements)?;
        self.grading.set_comment(key, text);
        self.touch();
        Ok(())
    }

    /// Grade every criterion of one section "fully meets"
    ///
    /// Returns the number of criteria graded; an absent or empty section
    /// grades nothing.
    ///
    /// # Errors
    /// Rejected by the mutability matrix, or `requirements` resolved for a
    /// different scope
    pub fn mark_all_yes(
        &mut self,
        role: Role,
        section: Section,
        requirements: &SpecialtyRequirements,
    ) -> Result<usize, RecordError> {
        self.guard(role, Action::Grade)?;
        self.check_requirements(requirements)?;
        let grade = self.form_type.grade_scale().fully_meets();
        let keys = requirements.section_keys(&self.scope(), section);
        let count = keys.len();
        for key in keys {
            self.grading.set_grade(key, grade);
        }
        if count > 0 {
            self.touch();
        }
        Ok(count)
    }

    /// Captured grade and comment of a criterion
    #[must_use]
    pub fn criterion(&self, key: &RequirementKey) -> Option<&CriterionGrading> {
        self.grading.get(key)
    }

    /// Completeness of one criterion under `requirements`
    #[must_use]
    pub fn is_complete(&self, key: &RequirementKey, requirements: &SpecialtyRequirements) -> bool {
        self.grading
            .is_complete(key, requirements.comment_forced(key))
    }

    /// Roll criterion completeness up per visible section
    #[must_use]
    pub fn completion(&self, requirements: &SpecialtyRequirements) -> CompletionSummary {
        let scope = self.scope();
        let sections = requirements
            .sections()
            .map(|s| {
                let keys = requirements.section_keys(&scope, s.section);
                SectionCompletion {
                    section: s.section,
                    title: s.title.clone(),
                    complete: keys
                        .iter()
                        .filter(|k| self.is_complete(k, requirements))
                        .count(),
                    total: keys.len(),
                }
            })
            .collect();
        CompletionSummary { sections }
    }

    /// Link evidence to a criterion or the narrative block
    ///
    /// Returns `false` when already linked.
    ///
    /// # Errors
    /// Rejected by the mutability matrix or key outside the current scope
    pub fn link(
        &mut self,
        role: Role,
        key: RequirementKey,
        evidence: EvidenceRef,
    ) -> Result<bool, RecordError> {
        self.guard(role, Action::Link)?;
        self.check_key(&key)?;
        let added = self.links.link(key, evidence);
        if added {
            self.touch();
        }
        Ok(added)
    }

    /// Unlink evidence; unlinking a non-member is a no-op
    ///
    /// # Errors
    /// Rejected by the mutability matrix
    pub fn unlink(
        &mut self,
        role: Role,
        key: &RequirementKey,
        evidence: &EvidenceRef,
    ) -> Result<bool, RecordError> {
        self.guard(role, Action::Link)?;
        let removed = self.links.unlink(key, evidence);
        if removed {
            self.touch();
        }
        Ok(removed)
    }

    /// Refs linked to a key, in link order
    #[must_use]
    pub fn list_linked(&self, key: &RequirementKey) -> Vec<&EvidenceRef> {
        self.links.linked(key).collect()
    }

    /// Metadata of a key's linked evidence, dangling refs skipped
    pub fn linked_evidence<L>(&self, key: &RequirementKey, lookup: &L) -> Vec<EvidenceSummary>
    where
        L: EvidenceLookup + ?Sized,
    {
        self.links.resolve(key, lookup)
    }

    /// # Errors
    /// Rejected by the mutability matrix
    pub fn set_narrative(&mut self, role: Role, text: impl Into<String>) -> Result<(), RecordError> {
        self.guard(role, Action::Narrative)?;
        self.narrative = text.into();
        self.touch();
        Ok(())
    }

    /// # Errors
    /// Rejected by the mutability matrix
    pub fn set_entrustment(
        &mut self,
        role: Role,
        judgment: Option<EntrustmentJudgment>,
    ) -> Result<(), RecordError> {
        self.guard(role, Action::Entrustment)?;
        self.entrustment = judgment;
        self.touch();
        Ok(())
    }

    /// # Errors
    /// Rejected by the mutability matrix
    pub fn set_assessor(&mut self, role: Role, assessor: Assessor) -> Result<(), RecordError> {
        self.guard(role, Action::Assessor)?;
        self.assessor = Some(assessor);
        self.touch();
        Ok(())
    }

    /// Store a countersignature ahead of sign-off
    ///
    /// # Errors
    /// Rejected by the mutability matrix
    pub fn countersign(
        &mut self,
        role: Role,
        countersignature: Countersignature,
    ) -> Result<(), RecordError> {
        self.guard(role, Action::Countersign)?;
        self.countersignature = Some(countersignature);
        self.touch();
        Ok(())
    }

    fn domain<'c>(&self, catalog: &'c Catalog) -> Result<&'c RequirementsCatalog, RecordError> {
        catalog
            .domain(self.form_type)
            .ok_or(RecordError::NoRequirements {
                form_type: self.form_type,
                level: self.level,
            })
    }

    /// Change level, resetting the specialty when it is not selectable there
    ///
    /// Stored grades and links are kept; they are keyed by scope and simply
    /// stop matching.
    ///
    /// # Errors
    /// Rejected by the mutability matrix, or no catalog entries at `level`
    pub fn set_level(
        &mut self,
        role: Role,
        level: Level,
        catalog: &Catalog,
    ) -> Result<&Specialty, RecordError> {
        self.guard(role, Action::Scope)?;
        let domain = self.domain(catalog)?;
        let selectable = domain.specialties(level);

        let specialty = match selectable.iter().find(|s| s.matches(&self.specialty)) {
            Some(kept) => (*kept).clone(),
            None => {
                let reset = selectable
                    .first()
                    .map(|s| (*s).clone())
                    .ok_or(RecordError::NoRequirements {
                        form_type: self.form_type,
                        level,
                    })?;
                tracing::debug!(
                    form_id = %self.id,
                    from = %self.specialty,
                    to = %reset,
                    %level,
                    "specialty not selectable at new level, reset"
                );
                reset
            }
        };

        self.level = level;
        self.specialty = specialty;
        self.touch();
        Ok(&self.specialty)
    }

    /// Select a specialty available at the current level
    ///
    /// # Errors
    /// Rejected by the mutability matrix, or `specialty` not selectable
    pub fn set_specialty(
        &mut self,
        role: Role,
        specialty: &Specialty,
        catalog: &Catalog,
    ) -> Result<(), RecordError> {
        self.guard(role, Action::Scope)?;
        let domain = self.domain(catalog)?;
        let canonical = domain
            .specialties(self.level)
            .into_iter()
            .find(|s| s.matches(specialty))
            .cloned()
            .ok_or_else(|| RecordError::InvalidSpecialty {
                form_type: self.form_type,
                level: self.level,
                specialty: specialty.clone(),
            })?;
        self.specialty = canonical;
        self.touch();
        Ok(())
    }

    fn check_submission(&self, assessor: Option<&Assessor>) -> Result<(), ValidationFailure> {
        if self.form_type.requires_entrustment() && self.entrustment.is_none() {
            return Err(ValidationFailure::MissingEntrustment);
        }
        if self.form_type.narrative_mandatory() && self.narrative.trim().is_empty() {
            return Err(ValidationFailure::MissingNarrative);
        }
        if !assessor.is_some_and(Assessor::is_valid) {
            return Err(ValidationFailure::MissingApprover);
        }
        Ok(())
    }

    fn check_sign_off(
        assessor: Option<&Assessor>,
        countersignature: Option<&Countersignature>,
    ) -> Result<(), ValidationFailure> {
        if !assessor.is_some_and(|a| !a.name.trim().is_empty()) {
            return Err(ValidationFailure::MissingApprover);
        }
        if !countersignature.is_some_and(Countersignature::is_valid) {
            return Err(ValidationFailure::MissingCountersignature);
        }
        Ok(())
    }

    /// Validate a status change without applying it
    ///
    /// # Errors
    /// [`RecordError::IllegalTransition`] when `to` is unreachable for
    /// `role`, [`RecordError::Validation`] when a guard fails
    pub fn plan_transition(
        &self,
        to: FormStatus,
        role: Role,
        payload: &TransitionPayload,
    ) -> Result<TransitionPlan, RecordError> {
        let kind = validate_transition(self.status, to, role)?;

        let assessor = payload.assessor.as_ref().or(self.assessor.as_ref());
        let countersignature = payload
            .countersignature
            .as_ref()
            .or(self.countersignature.as_ref());

        match kind {
            TransitionKind::Submit => self.check_submission(assessor)?,
            TransitionKind::SignOff => Self::check_sign_off(assessor, countersignature)?,
            TransitionKind::InPersonSignOff => {
                self.check_submission(assessor)?;
                Self::check_sign_off(assessor, countersignature)?;
            }
        }

        let assessor = assessor
            .cloned()
            .ok_or(ValidationFailure::MissingApprover)?;

        Ok(TransitionPlan {
            form_id: self.id,
            from: self.status,
            to,
            role,
            kind,
            assessor,
            countersignature: if kind.needs_countersignature() {
                countersignature.cloned()
            } else {
                None
            },
        })
    }

    /// Copy of this record with a plan applied
    ///
    /// # Errors
    /// [`RecordError::StalePlan`] when the plan was made for another record
    /// or the status moved since planning
    pub fn with_plan(&self, plan: &TransitionPlan) -> Result<FormRecord, RecordError> {
        if plan.form_id != self.id || plan.from != self.status {
            return Err(RecordError::StalePlan {
                form_id: plan.form_id.to_string(),
            });
        }

        let mut next = self.clone();
        let now = Utc::now();
        next.status = plan.to;
        next.assessor = Some(plan.assessor.clone());
        if let Some(countersignature) = &plan.countersignature {
            next.countersignature = Some(countersignature.clone());
        }
        match plan.to {
            FormStatus::Submitted => next.submitted_at = Some(now),
            FormStatus::SignedOff => next.signed_off_at = Some(now),
            FormStatus::Draft => {}
        }
        next.last_modified = now;
        Ok(next)
    }

    /// Summary of this form as an evidence item
    #[must_use]
    pub fn summary(&self) -> EvidenceSummary {
        EvidenceSummary::new(
            self.id,
            format!("{} {} {}", self.form_type, self.level, self.specialty),
            self.form_type.into(),
        )
        .with_specialty(self.specialty.label())
        .with_level(self.level.value())
        .with_status(self.status)
        .with_date(self.last_modified)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn catalog() -> &'static Catalog {
        Catalog::builtin().unwrap()
    }

    fn level(n: u8) -> Level {
        Level::new(n).unwrap()
    }

    fn section(c: char) -> Section {
        Section::new(c).unwrap()
    }

    fn requirements(record: &FormRecord) -> &'static SpecialtyRequirements {
        record.requirements(catalog()).unwrap()
    }

    fn oculoplastics() -> FormRecord {
        FormRecord::open(FormType::Epa, level(3), &Specialty::named("Oculoplastics"), catalog()).unwrap()
    }

    fn ready_to_submit() -> FormRecord {
        let mut record = oculoplastics();
        record
            .set_entrustment(Role::Author, Some(EntrustmentJudgment::CompetentToThisLevel))
            .unwrap();
        record.set_narrative(Role::Author, "Managed the list independently").unwrap();
        record
            .set_assessor(Role::Author, Assessor::new("Dr Okafor", "okafor@example.org"))
            .unwrap();
        record
    }

    fn signature() -> Countersignature {
        Countersignature::new("Dr Okafor", "GMC1234567", "data:image/png;base64,AAAA")
    }

    fn apply(record: &mut FormRecord, to: FormStatus, role: Role, payload: &TransitionPayload) -> Result<(), RecordError> {
        let plan = record.plan_transition(to, role, payload)?;
        *record = record.with_plan(&plan)?;
        Ok(())
    }

    #[test]
    fn new_record_is_draft() {
        let record = oculoplastics();
        assert_eq!(record.status(), FormStatus::Draft);
        assert_eq!(record.specialty(), &Specialty::named("Oculoplastics"));
    }

    #[test]
    fn low_levels_use_generic_specialty() {
        let record = FormRecord::new(FormType::Epa, level(1), Specialty::named("Glaucoma"));
        assert!(record.specialty().is_generic());
    }

    #[test]
    fn open_falls_back_to_first_entry() {
        let record = FormRecord::open(FormType::Epa, level(3), &Specialty::named("Astrology"), catalog()).unwrap();
        let first = catalog().domain(FormType::Epa).unwrap().default_specialty(level(3)).unwrap();
        assert_eq!(record.specialty(), &first);
    }

    #[test]
    fn grade_and_comment_drive_completion() {
        let mut record = oculoplastics();
        let req = record.requirements(catalog()).unwrap();
        let key = record.scope().criterion(section('B'), 0);

        record.set_grade(Role::Author, key.clone(), Grade::No, req).unwrap();
        assert!(!record.is_complete(&key, req));

        record.set_comment(Role::Author, key.clone(), "Not yet observed", req).unwrap();
        assert!(record.is_complete(&key, req));
    }

    #[test]
    fn wrong_scale_rejected() {
        let mut record = oculoplastics();
        let req = requirements(&record);
        let key = record.scope().criterion(section('B'), 0);
        let err = record.set_grade(Role::Author, key, Grade::MeetsExpectations, req).unwrap_err();
        assert!(matches!(err, RecordError::WrongScale { .. }));
    }

    #[test]
    fn out_of_scope_key_rejected() {
        let mut record = oculoplastics();
        let req = requirements(&record);
        let other = RequirementKey::criterion(FormType::Epa, level(3), Specialty::named("Glaucoma"), section('B'), 0);
        assert!(matches!(
            record.set_grade(Role::Author, other, Grade::Yes, req),
            Err(RecordError::OutOfScope { .. })
        ));
    }

    #[test]
    fn differently_cased_specialty_key_rejected() {
        let mut record = oculoplastics();
        let req = requirements(&record);
        let lower = RequirementKey::criterion(FormType::Epa, level(3), Specialty::named("oculoplastics"), section('B'), 0);

        assert!(matches!(
            record.set_grade(Role::Author, lower.clone(), Grade::Yes, req),
            Err(RecordError::OutOfScope { .. })
        ));
        assert!(matches!(
            record.link(Role::Author, lower, "ev1".into()),
            Err(RecordError::OutOfScope { .. })
        ));
        assert!(record.grading().is_empty());
        assert!(record.links().is_empty());
    }

    #[test]
    fn narrative_key_cannot_be_graded() {
        let mut record = oculoplastics();
        let req = requirements(&record);
        let key = record.narrative_key();
        assert!(matches!(
            record.set_grade(Role::Author, key.clone(), Grade::Yes, req),
            Err(RecordError::UnknownCriterion { .. })
        ));
        assert!(record.link(Role::Author, key, "ev1".into()).unwrap());
    }

    #[test]
    fn missing_criterion_cannot_be_graded() {
        let mut record = oculoplastics();
        let req = requirements(&record);
        let beyond = record.scope().criterion(section('B'), 99);
        assert!(matches!(
            record.set_grade(Role::Author, beyond.clone(), Grade::Yes, req),
            Err(RecordError::UnknownCriterion { .. })
        ));
        assert!(matches!(
            record.set_comment(Role::Author, beyond, "nothing here", req),
            Err(RecordError::UnknownCriterion { .. })
        ));
        assert!(record.grading().is_empty());
    }

    #[test]
    fn empty_section_cannot_be_graded() {
        let mut record = FormRecord::open(
            FormType::Epa,
            level(3),
            &Specialty::from("Operating List - Oculoplastics"),
            catalog(),
        )
        .unwrap();
        let req = requirements(&record);
        assert!(req.section(section('C')).is_none());

        let key = record.scope().criterion(section('C'), 0);
        assert!(matches!(
            record.set_grade(Role::Author, key, Grade::Yes, req),
            Err(RecordError::UnknownCriterion { .. })
        ));
        assert!(record.grading().is_empty());
    }

    #[test]
    fn mark_all_yes_grades_only_active_section() {
        let mut record = oculoplastics();
        let req = record.requirements(catalog()).unwrap();
        let count = record.mark_all_yes(Role::Author, section('C'), req).unwrap();
        assert_eq!(count, 3);

        let scope = record.scope();
        assert_eq!(record.grading().grade(&scope.criterion(section('C'), 2)), Some(Grade::Yes));
        assert_eq!(record.grading().grade(&scope.criterion(section('B'), 0)), None);
    }

    #[test]
    fn mark_all_yes_rejects_foreign_requirements() {
        let mut record = oculoplastics();
        let glaucoma = catalog()
            .domain(FormType::Epa)
            .unwrap()
            .resolve(level(3), &Specialty::named("Glaucoma"))
            .unwrap();
        assert!(matches!(
            record.mark_all_yes(Role::Author, section('B'), glaucoma),
            Err(RecordError::MismatchedRequirements { .. })
        ));
    }

    #[test]
    fn completion_counts_visible_sections() {
        let mut record = oculoplastics();
        let req = record.requirements(catalog()).unwrap();
        let before = record.completion(req);
        assert_eq!(before.complete(), 0);
        assert!(!before.is_complete());

        let letters: Vec<_> = req.sections().map(|s| s.section).collect();
        for letter in letters {
            record.mark_all_yes(Role::Author, letter, req).unwrap();
        }
        let after = record.completion(req);
        // section D carries an always-comment criterion
        assert_eq!(after.complete() + 1, after.total());

        let forced = req
            .keys(&record.scope())
            .into_iter()
            .find(|k| req.comment_forced(k))
            .unwrap();
        record.set_comment(Role::Author, forced, "Discussed at review", req).unwrap();
        assert!(record.completion(req).is_complete());
        assert!((record.completion(req).ratio() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn level_change_resets_generic_specialty() {
        let mut record = FormRecord::open(FormType::Epa, level(1), &Specialty::Generic, catalog()).unwrap();
        assert!(record.specialty().is_generic());

        let specialty = record.set_level(Role::Author, level(3), catalog()).unwrap().clone();
        assert!(!specialty.is_generic());
        assert!(catalog()
            .domain(FormType::Epa)
            .unwrap()
            .is_valid_specialty(level(3), &specialty));
    }

    #[test]
    fn level_change_keeps_selectable_specialty() {
        let mut record = oculoplastics();
        record.set_level(Role::Author, level(4), catalog()).unwrap();
        assert_eq!(record.specialty(), &Specialty::named("Oculoplastics"));
    }

    #[test]
    fn set_specialty_validates_and_canonicalizes() {
        let mut record = oculoplastics();
        record
            .set_specialty(Role::Author, &Specialty::named("glaucoma"), catalog())
            .unwrap();
        assert_eq!(record.specialty(), &Specialty::named("Glaucoma"));
        assert!(matches!(
            record.set_specialty(Role::Author, &Specialty::named("Astrology"), catalog()),
            Err(RecordError::InvalidSpecialty { .. })
        ));
    }

    #[test]
    fn links_survive_across_keys() {
        let mut record = oculoplastics();
        let scope = record.scope();
        let b0 = scope.criterion(section('B'), 0);
        let c2 = scope.criterion(section('C'), 2);
        assert_eq!(b0.to_string(), "EPA-L3-Oculoplastics-B-0");

        record.link(Role::Author, b0.clone(), "ev1".into()).unwrap();
        record.link(Role::Author, c2.clone(), "ev1".into()).unwrap();
        record.unlink(Role::Author, &b0, &"ev1".into()).unwrap();

        assert!(record.list_linked(&b0).is_empty());
        assert_eq!(record.list_linked(&c2), vec![&EvidenceRef::from("ev1")]);
    }

    #[test]
    fn submit_requires_approver_contact() {
        let mut record = ready_to_submit();
        let payload = TransitionPayload::new().with_assessor(Assessor::new("Dr Okafor", ""));
        let err = record
            .plan_transition(FormStatus::Submitted, Role::Author, &payload)
            .unwrap_err();
        assert_eq!(err, RecordError::Validation(ValidationFailure::MissingApprover));

        record.assessor = None;
        assert!(record
            .plan_transition(FormStatus::Submitted, Role::Author, &TransitionPayload::new())
            .is_err());
        assert_eq!(record.status(), FormStatus::Draft);
    }

    #[test]
    fn submit_requires_entrustment_and_narrative() {
        let mut record = oculoplastics();
        let payload = TransitionPayload::new().with_assessor(Assessor::new("Dr Okafor", "okafor@example.org"));
        assert_eq!(
            record.plan_transition(FormStatus::Submitted, Role::Author, &payload),
            Err(RecordError::Validation(ValidationFailure::MissingEntrustment))
        );
        record
            .set_entrustment(Role::Author, Some(EntrustmentJudgment::ProgressingTowardsLevel))
            .unwrap();
        assert_eq!(
            record.plan_transition(FormStatus::Submitted, Role::Author, &payload),
            Err(RecordError::Validation(ValidationFailure::MissingNarrative))
        );
    }

    #[test]
    fn gsat_submits_without_entrustment() {
        let mut record = FormRecord::open(FormType::Gsat, level(2), &Specialty::Generic, catalog()).unwrap();
        record.set_narrative(Role::Author, "Led the audit").unwrap();
        let payload = TransitionPayload::new().with_assessor(Assessor::new("Dr Lin", "lin@example.org"));
        let plan = record
            .plan_transition(FormStatus::Submitted, Role::Author, &payload)
            .unwrap();
        assert_eq!(plan.kind(), TransitionKind::Submit);
        assert!(plan.kind().dispatches());
    }

    #[test]
    fn full_lifecycle() {
        let mut record = ready_to_submit();
        apply(&mut record, FormStatus::Submitted, Role::Author, &TransitionPayload::new()).unwrap();
        assert_eq!(record.status(), FormStatus::Submitted);
        assert!(record.submitted_at().is_some());

        // author is locked out, approver may regrade
        let req = requirements(&record);
        let key = record.scope().criterion(section('B'), 0);
        assert!(record.set_grade(Role::Author, key.clone(), Grade::Yes, req).unwrap_err().is_illegal());
        record.set_grade(Role::Approver, key.clone(), Grade::Yes, req).unwrap();
        assert!(record.link(Role::Approver, key, "ev1".into()).unwrap_err().is_illegal());

        let no_sig = record.plan_transition(FormStatus::SignedOff, Role::Approver, &TransitionPayload::new());
        assert_eq!(no_sig, Err(ValidationFailure::MissingCountersignature.into()));

        record.countersign(Role::Approver, signature()).unwrap();
        apply(&mut record, FormStatus::SignedOff, Role::Approver, &TransitionPayload::new()).unwrap();
        assert_eq!(record.status(), FormStatus::SignedOff);
        assert!(record.signed_off_at().is_some());
    }

    #[test]
    fn in_person_sign_off_skips_submission() {
        let mut record = ready_to_submit();
        let payload = TransitionPayload::new().with_countersignature(signature());
        let plan = record
            .plan_transition(FormStatus::SignedOff, Role::Author, &payload)
            .unwrap();
        assert_eq!(plan.kind(), TransitionKind::InPersonSignOff);
        assert!(!plan.kind().dispatches());
        record = record.with_plan(&plan).unwrap();
        assert_eq!(record.status(), FormStatus::SignedOff);
        assert_eq!(record.countersignature(), Some(&signature()));
    }

    #[test]
    fn signed_off_rejects_every_mutation() {
        let mut record = ready_to_submit();
        apply(
            &mut record,
            FormStatus::SignedOff,
            Role::Author,
            &TransitionPayload::new().with_countersignature(signature()),
        )
        .unwrap();
        let snapshot = record.clone();
        let req = requirements(&record);
        let key = record.scope().criterion(section('B'), 0);

        for role in Role::ALL {
            assert!(record.set_grade(role, key.clone(), Grade::Yes, req).unwrap_err().is_illegal());
            assert!(record.set_comment(role, key.clone(), "late", req).unwrap_err().is_illegal());
            assert!(record.link(role, key.clone(), "ev1".into()).unwrap_err().is_illegal());
            assert!(record.unlink(role, &key, &"ev1".into()).unwrap_err().is_illegal());
            assert!(record.set_narrative(role, "edit").unwrap_err().is_illegal());
            for to in FormStatus::ALL {
                assert!(record
                    .plan_transition(to, role, &TransitionPayload::new())
                    .unwrap_err()
                    .is_illegal());
            }
        }
        assert_eq!(record, snapshot);
    }

    #[test]
    fn stale_plan_rejected() {
        let mut record = ready_to_submit();
        let plan = record
            .plan_transition(FormStatus::Submitted, Role::Author, &TransitionPayload::new())
            .unwrap();
        record = record.with_plan(&plan).unwrap();
        assert!(matches!(record.with_plan(&plan), Err(RecordError::StalePlan { .. })));
    }

    #[test]
    fn summary_reflects_record() {
        let record = oculoplastics();
        let summary = record.summary();
        assert_eq!(summary.id, EvidenceRef::from(record.id()));
        assert_eq!(summary.specialty, "Oculoplastics");
        assert_eq!(summary.level, Some(3));
        assert_eq!(summary.status, FormStatus::Draft);
    }

    #[test]
    fn json_round_trip_preserves_state() {
        let mut record = ready_to_submit();
        let req = requirements(&record);
        let key = record.scope().criterion(section('B'), 1);
        record.set_grade(Role::Author, key.clone(), Grade::Reservation, req).unwrap();
        record.link(Role::Author, key, "ev7".into()).unwrap();

        let json = serde_json::to_string(&record).unwrap();
        let back: FormRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn form_id_parses() {
        let id = FormId::new();
        assert_eq!(id.to_string().parse::<FormId>().unwrap(), id);
    }
}
