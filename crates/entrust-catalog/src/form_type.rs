//! Form types, grade scales and entrustment judgments
//!
//! A [`FormType`] names the requirement domain a form represents and decides
//! which [`GradeScale`] its criteria use and which narrative fields are
//! mandatory at submission.

use crate::error::KeyError;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Requirement domain of a form
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FormType {
    /// Entrustable professional activity
    #[serde(rename = "EPA")]
    Epa,
    /// Generic skills assessment tool
    #[serde(rename = "GSAT")]
    Gsat,
}

impl FormType {
    /// Every form type
    pub const ALL: [FormType; 2] = [FormType::Epa, FormType::Gsat];

    /// Short tag used in requirement keys and notifications
    #[inline]
    #[must_use]
    pub fn tag(self) -> &'static str {
        match self {
            FormType::Epa => "EPA",
            FormType::Gsat => "GSAT",
        }
    }

    /// Grade scale used by this form's criteria
    #[inline]
    #[must_use]
    pub fn grade_scale(self) -> GradeScale {
        match self {
            FormType::Epa => GradeScale::Entrustment,
            FormType::Gsat => GradeScale::Generic,
        }
    }

    /// Whether an entrustment judgment must be selected before submission
    #[inline]
    #[must_use]
    pub fn requires_entrustment(self) -> bool {
        matches!(self, FormType::Epa)
    }

    /// Whether the narrative block must be filled before submission
    #[inline]
    #[must_use]
    pub fn narrative_mandatory(self) -> bool {
        true
    }

    /// Cross-domain forms are not split by specialty
    #[inline]
    #[must_use]
    pub fn is_cross_domain(self) -> bool {
        matches!(self, FormType::Gsat)
    }
}

impl Display for FormType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for FormType {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FormType::ALL
            .into_iter()
            .find(|ft| ft.tag().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| KeyError::UnknownFormType(s.to_string()))
    }
}

/// Closed grading scale for a form's criteria
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GradeScale {
    /// Binary entrustment: Yes / Reservation / No / No evidence
    Entrustment,
    /// Generic concern scale: Major / Minor / Meets expectations
    Generic,
}

impl GradeScale {
    /// Grades belonging to this scale, most favourable last
    #[must_use]
    pub fn grades(self) -> &'static [Grade] {
        match self {
            GradeScale::Entrustment => &[Grade::NoEvidence, Grade::No, Grade::Reservation, Grade::Yes],
            GradeScale::Generic => &[
                Grade::MajorConcern,
                Grade::MinorConcern,
                Grade::MeetsExpectations,
            ],
        }
    }

    /// The "fully meets" grade applied by the bulk reviewer shortcut
    #[inline]
    #[must_use]
    pub fn fully_meets(self) -> Grade {
        match self {
            GradeScale::Entrustment => Grade::Yes,
            GradeScale::Generic => Grade::MeetsExpectations,
        }
    }

    /// Check grade belongs to this scale
    #[inline]
    #[must_use]
    pub fn contains(self, grade: Grade) -> bool {
        grade.scale() == self
    }
}

/// Per-criterion grade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Grade {
    /// Criterion met
    Yes,
    /// Met with reservation
    Reservation,
    /// Not met
    No,
    /// No evidence seen
    NoEvidence,
    /// Major concern (generic scale)
    MajorConcern,
    /// Minor concern (generic scale)
    MinorConcern,
    /// Meets expectations (generic scale)
    MeetsExpectations,
}

impl Grade {
    /// Scale this grade belongs to
    #[inline]
    #[must_use]
    pub fn scale(self) -> GradeScale {
        match self {
            Grade::Yes | Grade::Reservation | Grade::No | Grade::NoEvidence => {
                GradeScale::Entrustment
            }
            Grade::MajorConcern | Grade::MinorConcern | Grade::MeetsExpectations => {
                GradeScale::Generic
            }
        }
    }

    /// A comment is mandatory for this grade
    #[inline]
    #[must_use]
    pub fn requires_comment(self) -> bool {
        matches!(self, Grade::Reservation | Grade::No | Grade::NoEvidence)
    }
}

impl Display for Grade {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let label = match self {
            Grade::Yes => "Yes",
            Grade::Reservation => "Reservation",
            Grade::No => "No",
            Grade::NoEvidence => "No evidence",
            Grade::MajorConcern => "Major concern",
            Grade::MinorConcern => "Minor concern",
            Grade::MeetsExpectations => "Meets expectations",
        };
        f.write_str(label)
    }
}

/// Holistic outcome attached to a whole form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntrustmentJudgment {
    /// Competent to this level
    CompetentToThisLevel,
    /// Progressing, not yet at this level
    ProgressingTowardsLevel,
    /// Not yet competent
    NotYetCompetent,
}

impl Display for EntrustmentJudgment {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let label = match self {
            EntrustmentJudgment::CompetentToThisLevel => "Competent to this level",
            EntrustmentJudgment::ProgressingTowardsLevel => "Progressing towards this level",
            EntrustmentJudgment::NotYetCompetent => "Not yet competent",
        };
        f.write_str(label)
    }
}
