//! Criterion grading store
//!
//! Per-form map from [`RequirementKey`] to a grade and free-text comment.
//! Permission checks live on [`crate::FormRecord`]; the store itself is plain
//! state.

use entrust_catalog::{Grade, RequirementKey};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Grade and comment captured for one criterion
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriterionGrading {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grade: Option<Grade>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub comment: String,
}

impl CriterionGrading {
    /// Whether a non-blank comment is present
    #[inline]
    #[must_use]
    pub fn has_comment(&self) -> bool {
        !self.comment.trim().is_empty()
    }

    /// Graded, and commented whenever a comment is mandatory
    ///
    /// `comment_forced` is the criterion's "always show comment" flag.
    #[must_use]
    pub fn is_complete(&self, comment_forced: bool) -> bool {
        match self.grade {
            None => false,
            Some(grade) => {
                self.has_comment() || (!grade.requires_comment() && !comment_forced)
            }
        }
    }
}

/// Grades and comments of one form
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GradingStore {
    entries: HashMap<RequirementKey, CriterionGrading>,
}

impl GradingStore {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the grade of a criterion
    pub fn set_grade(&mut self, key: RequirementKey, grade: Grade) {
        self.entries.entry(key).or_default().grade = Some(grade);
    }

    /// Replace the comment of a criterion
    pub fn set_comment(&mut self, key: RequirementKey, text: impl Into<String>) {
        self.entries.entry(key).or_default().comment = text.into();
    }

    /// Captured state of a criterion
    #[inline]
    #[must_use]
    pub fn get(&self, key: &RequirementKey) -> Option<&CriterionGrading> {
        self.entries.get(key)
    }

    #[inline]
    #[must_use]
    pub fn grade(&self, key: &RequirementKey) -> Option<Grade> {
        self.entries.get(key).and_then(|g| g.grade)
    }

    #[inline]
    #[must_use]
    pub fn comment(&self, key: &RequirementKey) -> Option<&str> {
        self.entries.get(key).map(|g| g.comment.as_str())
    }

    /// Completeness of one criterion (see [`CriterionGrading::is_complete`])
    #[must_use]
    pub fn is_complete(&self, key: &RequirementKey, comment_forced: bool) -> bool {
        self.entries
            .get(key)
            .is_some_and(|g| g.is_complete(comment_forced))
    }

    /// Number of criteria with any captured state
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate captured criteria
    pub fn iter(&self) -> impl Iterator<Item = (&RequirementKey, &CriterionGrading)> {
        self.entries.iter()
    }
}
