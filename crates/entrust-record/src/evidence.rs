//! Evidence references and summaries
//!
//! Evidence lives in an external store. The engine only holds [`EvidenceRef`]
//! identifiers and reads [`EvidenceSummary`] metadata; attached file bytes are
//! never interpreted.

use crate::lifecycle::FormStatus;
use chrono::{DateTime, Utc};
use entrust_catalog::FormType;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::{self, Display, Formatter};

/// Foreign identifier into the evidence store
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EvidenceRef(String);

impl EvidenceRef {
    /// Create new reference
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for EvidenceRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EvidenceRef {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for EvidenceRef {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Type tag of an evidence item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EvidenceKind {
    /// Entrustable professional activity form
    Epa,
    /// Generic skills assessment form
    Gsat,
    /// Multi-source feedback
    Msf,
    /// Case-based discussion
    CaseBasedDiscussion,
    /// Reflective practice note
    Reflection,
    /// Uploaded document
    Document,
    /// Bulk catch-up attestation of a (specialty, level) cell
    CurriculumCatchUp,
    /// Verified practice-log attestation of a (specialty, level) cell
    PracticeLogAttestation,
}

impl EvidenceKind {
    /// Form type for assessment kinds
    #[must_use]
    pub fn form_type(self) -> Option<FormType> {
        match self {
            EvidenceKind::Epa => Some(FormType::Epa),
            EvidenceKind::Gsat => Some(FormType::Gsat),
            _ => None,
        }
    }

    /// Attestation artifacts force their cell to signed off
    #[inline]
    #[must_use]
    pub fn is_attestation(self) -> bool {
        matches!(
            self,
            EvidenceKind::CurriculumCatchUp | EvidenceKind::PracticeLogAttestation
        )
    }
}

impl From<FormType> for EvidenceKind {
    fn from(value: FormType) -> Self {
        match value {
            FormType::Epa => EvidenceKind::Epa,
            FormType::Gsat => EvidenceKind::Gsat,
        }
    }
}

/// Opaque descriptor of an attached binary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachedFile {
    /// Identifier returned by the upload collaborator
    pub blob_id: String,
    pub name: String,
    pub media_type: String,
    pub size_bytes: u64,
}

/// Display and aggregation metadata of one evidence item
///
/// `specialty` and `level` are kept as stored upstream: labels may drift and
/// levels may be missing, so consumers normalize rather than trust them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceSummary {
    pub id: EvidenceRef,
    pub title: String,
    pub kind: EvidenceKind,
    #[serde(default)]
    pub specialty: String,
    #[serde(default)]
    pub level: Option<u8>,
    pub date: DateTime<Utc>,
    pub status: FormStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<AttachedFile>,
}

impl EvidenceSummary {
    /// Create new summary dated now, in draft
    #[must_use]
    pub fn new(id: impl Into<EvidenceRef>, title: impl Into<String>, kind: EvidenceKind) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            kind,
            specialty: String::new(),
            level: None,
            date: Utc::now(),
            status: FormStatus::Draft,
            file: None,
        }
    }

    /// Set specialty label
    #[inline]
    #[must_use]
    pub fn with_specialty(mut self, specialty: impl Into<String>) -> Self {
        self.specialty = specialty.into();
        self
    }

    /// Set training level
    #[inline]
    #[must_use]
    pub fn with_level(mut self, level: u8) -> Self {
        self.level = Some(level);
        self
    }

    /// Set status
    #[inline]
    #[must_use]
    pub fn with_status(mut self, status: FormStatus) -> Self {
        self.status = status;
        self
    }

    /// Set date
    #[inline]
    #[must_use]
    pub fn with_date(mut self, date: DateTime<Utc>) -> Self {
        self.date = date;
        self
    }

    /// Attach file descriptor
    #[inline]
    #[must_use]
    pub fn with_file(mut self, file: AttachedFile) -> Self {
        self.file = Some(file);
        self
    }
}

/// Synchronous metadata lookup used when resolving linked evidence
pub trait EvidenceLookup {
    /// Summary for an id, `None` when the item no longer exists
    fn find(&self, id: &EvidenceRef) -> Option<EvidenceSummary>;
}

impl EvidenceLookup for HashMap<EvidenceRef, EvidenceSummary> {
    fn find(&self, id: &EvidenceRef) -> Option<EvidenceSummary> {
        self.get(id).cloned()
    }
}

impl EvidenceLookup for [EvidenceSummary] {
    fn find(&self, id: &EvidenceRef) -> Option<EvidenceSummary> {
        self.iter().find(|e| &e.id == id).cloned()
    }
}

impl EvidenceLookup for Vec<EvidenceSummary> {
    fn find(&self, id: &EvidenceRef) -> Option<EvidenceSummary> {
        self.as_slice().find(id)
    }
}
