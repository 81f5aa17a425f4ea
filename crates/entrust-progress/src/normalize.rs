//! Specialty-name normalization
//!
//! Evidence carries specialty labels as typed upstream, which drift from the
//! catalog ("Cornea & Ocular Surface" vs "Cornea & Ocular Surface Disease").
//! Labels are matched case-insensitively; a configured set of multi-word
//! columns also match when one side's significant words contain the other's.

use crate::aggregate::ProgressColumn;
use crate::error::ProgressError;
use entrust_catalog::Specialty;
use regex::Regex;
use std::collections::{BTreeSet, HashMap};

/// Words ignored when comparing labels
const STOPWORDS: &[&str] = &["and", "of", "the", "for"];

/// Fewest significant words a label needs before fuzzy matching applies
const MIN_SIGNIFICANT_WORDS: usize = 2;

#[derive(Debug, Clone)]
struct FuzzyColumn {
    column: ProgressColumn,
    words: BTreeSet<String>,
}

/// Maps raw specialty labels onto progress columns
#[derive(Debug, Clone)]
pub struct SpecialtyMatcher {
    word: Regex,
    exact: HashMap<String, ProgressColumn>,
    fuzzy: Vec<FuzzyColumn>,
}

impl SpecialtyMatcher {
    /// Create matcher over named specialty columns
    ///
    /// `fuzzy` lists the column labels that accept significant-word matches;
    /// labels naming no column are ignored.
    ///
    /// # Errors
    /// Returns [`ProgressError::Pattern`] if the word pattern fails to compile
    pub fn new<'a>(
        columns: impl IntoIterator<Item = &'a Specialty>,
        fuzzy: &[String],
    ) -> Result<Self, ProgressError> {
        let word = Regex::new(r"[[:alnum:]]+")?;
        let mut matcher = Self {
            word,
            exact: HashMap::new(),
            fuzzy: Vec::new(),
        };

        for specialty in columns {
            let base = specialty.base();
            if base.is_generic() {
                continue;
            }
            matcher
                .exact
                .entry(base.normalized())
                .or_insert(ProgressColumn::Specialty(base));
        }

        for label in fuzzy {
            let key = Specialty::named(label.as_str()).normalized();
            match matcher.exact.get(&key) {
                Some(column) => {
                    let words = matcher.significant_words(label);
                    matcher.fuzzy.push(FuzzyColumn {
                        column: column.clone(),
                        words,
                    });
                }
                None => tracing::debug!(%label, "fuzzy specialty names no column, ignored"),
            }
        }

        Ok(matcher)
    }

    /// Lower-cased alphanumeric words minus stopwords
    #[must_use]
    pub fn significant_words(&self, label: &str) -> BTreeSet<String> {
        let lower = label.to_lowercase();
        self.word
            .find_iter(&lower)
            .map(|m| m.as_str())
            .filter(|w| !STOPWORDS.contains(w))
            .map(str::to_string)
            .collect()
    }

    /// Column a raw label belongs to
    ///
    /// Generic labels (including empty) map to [`ProgressColumn::CrossDomain`];
    /// operating-list labels map to their base specialty. `None` when nothing
    /// matches.
    #[must_use]
    pub fn column_for(&self, label: &str) -> Option<ProgressColumn> {
        let base = Specialty::from(label.to_string()).base();
        if base.is_generic() {
            return Some(ProgressColumn::CrossDomain);
        }

        let normalized = base.normalized();
        if let Some(column) = self.exact.get(&normalized) {
            return Some(column.clone());
        }

        let words = self.significant_words(&normalized);
        if words.len() < MIN_SIGNIFICANT_WORDS {
            return None;
        }
        let found = self
            .fuzzy
            .iter()
            .find(|f| f.words.is_subset(&words) || words.is_subset(&f.words))
            .map(|f| f.column.clone());
        if let Some(column) = &found {
            tracing::debug!(%label, %column, "specialty matched on significant words");
        }
        found
    }

    /// Named columns known to the matcher
    pub fn columns(&self) -> impl Iterator<Item = &ProgressColumn> {
        self.exact.values()
    }
}
