//! Progress aggregation
//!
//! Rolls forms and evidence up into (column, level) cells. A cell's status is
//! the best status among its contributing items, with precedence
//! `SignedOff > Submitted > Draft > NotStarted`. Attestation artifacts
//! (curriculum catch-up, verified practice log) force their cell to
//! `SignedOff`; they are ordinary evidence items, so deleting one downgrades
//! the cell on the next computation.

use crate::error::ProgressError;
use crate::normalize::SpecialtyMatcher;
use entrust_catalog::{Catalog, FormType, Level, Specialty};
use entrust_record::{EvidenceKind, EvidenceRef, EvidenceSummary, FormRecord, FormStatus};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fmt::{self, Display, Formatter};

/// Column of the progress matrix
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ProgressColumn {
    /// Named specialty (operating lists roll up into their base)
    Specialty(Specialty),
    /// Generic and cross-specialty items (GSAT, no-specialty forms)
    CrossDomain,
}

impl Display for ProgressColumn {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ProgressColumn::Specialty(specialty) => write!(f, "{specialty}"),
            ProgressColumn::CrossDomain => f.write_str("Cross-domain"),
        }
    }
}

/// Derived status of one cell, ordered by precedence
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CellStatus {
    #[default]
    NotStarted,
    Draft,
    Submitted,
    SignedOff,
}

impl From<FormStatus> for CellStatus {
    fn from(value: FormStatus) -> Self {
        match value {
            FormStatus::Draft => CellStatus::Draft,
            FormStatus::Submitted => CellStatus::Submitted,
            FormStatus::SignedOff => CellStatus::SignedOff,
        }
    }
}

/// What decided a cell's status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellSource {
    /// Nothing contributed
    #[default]
    None,
    /// Best status among contributing items
    Evidence,
    /// Forced by an attestation artifact
    Attestation(EvidenceKind),
}

/// One (column, level) cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressCell {
    pub column: ProgressColumn,
    pub level: Level,
    pub status: CellStatus,
    pub source: CellSource,
    /// Ids of every item that landed in this cell, in input order
    pub contributors: Vec<EvidenceRef>,
}

impl ProgressCell {
    fn empty(column: ProgressColumn, level: Level) -> Self {
        Self {
            column,
            level,
            status: CellStatus::NotStarted,
            source: CellSource::None,
            contributors: Vec::new(),
        }
    }

    fn absorb(&mut self, item: &ProgressItem) {
        self.contributors.push(item.id.clone());

        if item.kind.is_attestation() {
            self.status = CellStatus::SignedOff;
            self.source = CellSource::Attestation(item.kind);
            return;
        }
        if matches!(self.source, CellSource::Attestation(_)) {
            return;
        }
        self.status = self.status.max(item.status.into());
        self.source = CellSource::Evidence;
    }
}

/// Input to aggregation, built from a form or an evidence summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressItem {
    pub id: EvidenceRef,
    pub kind: EvidenceKind,
    pub specialty: String,
    pub level: Option<u8>,
    pub status: FormStatus,
}

impl From<&EvidenceSummary> for ProgressItem {
    fn from(value: &EvidenceSummary) -> Self {
        Self {
            id: value.id.clone(),
            kind: value.kind,
            specialty: value.specialty.clone(),
            level: value.level,
            status: value.status,
        }
    }
}

impl From<&FormRecord> for ProgressItem {
    fn from(value: &FormRecord) -> Self {
        Self {
            id: value.id().into(),
            kind: value.form_type().into(),
            specialty: value.specialty().label(),
            level: Some(value.level().value()),
            status: value.status(),
        }
    }
}

/// Columns and cells derived from the catalog, plus label matching
#[derive(Debug, Clone)]
pub struct ProgressAggregator {
    columns: Vec<ProgressColumn>,
    cells: BTreeSet<(ProgressColumn, Level)>,
    matcher: SpecialtyMatcher,
}

impl ProgressAggregator {
    /// Build the matrix layout from the catalog
    ///
    /// EPA entries give one column per base specialty; generic entries and
    /// every GSAT entry land in the cross-domain column.
    ///
    /// # Errors
    /// Returns [`ProgressError`] if the specialty matcher cannot be built
    pub fn from_catalog(catalog: &Catalog, fuzzy: &[String]) -> Result<Self, ProgressError> {
        let mut columns = Vec::new();
        let mut seen = HashSet::new();
        let mut cells = BTreeSet::new();

        for domain in catalog.domains() {
            for entry in domain.entries() {
                let column = if domain.form_type().is_cross_domain() {
                    ProgressColumn::CrossDomain
                } else {
                    match entry.specialty.base() {
                        base if base.is_generic() => ProgressColumn::CrossDomain,
                        base => ProgressColumn::Specialty(base),
                    }
                };
                if let ProgressColumn::Specialty(s) = &column {
                    if seen.insert(s.normalized()) {
                        columns.push(column.clone());
                    }
                }
                cells.insert((column, entry.level));
            }
        }
        if cells.iter().any(|(c, _)| c == &ProgressColumn::CrossDomain) {
            columns.push(ProgressColumn::CrossDomain);
        }

        let named = columns.iter().filter_map(|c| match c {
            ProgressColumn::Specialty(s) => Some(s),
            ProgressColumn::CrossDomain => None,
        });
        let matcher = SpecialtyMatcher::new(named, fuzzy)?;

        Ok(Self {
            columns,
            cells,
            matcher,
        })
    }

    /// Columns in catalog order, cross-domain last
    #[inline]
    #[must_use]
    pub fn columns(&self) -> &[ProgressColumn] {
        &self.columns
    }

    #[inline]
    #[must_use]
    pub fn matcher(&self) -> &SpecialtyMatcher {
        &self.matcher
    }

    fn locate(&self, item: &ProgressItem) -> Option<(ProgressColumn, Level)> {
        let level = item.level.and_then(|l| Level::new(l).ok())?;
        let column = if item.kind.form_type().is_some_and(FormType::is_cross_domain) {
            ProgressColumn::CrossDomain
        } else {
            self.matcher.column_for(&item.specialty)?
        };
        self.cells
            .contains(&(column.clone(), level))
            .then_some((column, level))
    }

    /// Compute every cell from a collection of items
    ///
    /// Items are deduplicated by id, first occurrence wins. Items whose
    /// level or specialty match no cell are skipped.
    pub fn compute<I>(&self, items: I) -> ProgressMatrix
    where
        I: IntoIterator<Item = ProgressItem>,
    {
        let mut cells: Vec<ProgressCell> = self
            .columns
            .iter()
            .flat_map(|column| {
                self.cells
                    .iter()
                    .filter(move |(c, _)| c == column)
                    .map(|(c, l)| ProgressCell::empty(c.clone(), *l))
            })
            .collect();

        let mut seen = HashSet::new();
        let mut skipped = 0usize;
        for item in items {
            if !seen.insert(item.id.clone()) {
                continue;
            }
            let Some((column, level)) = self.locate(&item) else {
                tracing::debug!(
                    id = %item.id,
                    specialty = %item.specialty,
                    level = ?item.level,
                    "evidence matches no progress cell"
                );
                skipped += 1;
                continue;
            };
            if let Some(cell) = cells
                .iter_mut()
                .find(|c| c.column == column && c.level == level)
            {
                cell.absorb(&item);
            }
        }

        let matrix = ProgressMatrix {
            columns: self.columns.clone(),
            cells,
        };
        tracing::debug!(
            items = seen.len(),
            skipped,
            signed_off = matrix.signed_off_count(),
            "progress computed"
        );
        matrix
    }
}

/// Computes progress over forms and an evidence collection
///
/// Forms come first so an open form's in-memory state wins over its
/// persisted summary.
pub fn compute_progress<'a>(
    aggregator: &ProgressAggregator,
    records: impl IntoIterator<Item = &'a FormRecord>,
    evidence: impl IntoIterator<Item = &'a EvidenceSummary>,
) -> ProgressMatrix {
    let items = records
        .into_iter()
        .map(ProgressItem::from)
        .chain(evidence.into_iter().map(ProgressItem::from));
    aggregator.compute(items)
}

/// Result of a progress computation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressMatrix {
    columns: Vec<ProgressColumn>,
    cells: Vec<ProgressCell>,
}

impl ProgressMatrix {
    #[inline]
    #[must_use]
    pub fn columns(&self) -> &[ProgressColumn] {
        &self.columns
    }

    /// Every cell, grouped by column then ascending level
    #[inline]
    #[must_use]
    pub fn cells(&self) -> &[ProgressCell] {
        &self.cells
    }

    #[must_use]
    pub fn cell(&self, column: &ProgressColumn, level: Level) -> Option<&ProgressCell> {
        self.cells
            .iter()
            .find(|c| &c.column == column && c.level == level)
    }

    /// Status of a cell, `NotStarted` for cells outside the layout
    #[must_use]
    pub fn status(&self, column: &ProgressColumn, level: Level) -> CellStatus {
        self.cell(column, level)
            .map_or(CellStatus::NotStarted, |c| c.status)
    }

    /// Cells of one column in level order
    pub fn column<'a>(&'a self, column: &'a ProgressColumn) -> impl Iterator<Item = &'a ProgressCell> {
        self.cells.iter().filter(move |c| &c.column == column)
    }

    #[must_use]
    pub fn highest_signed_off_level(&self, column: &ProgressColumn) -> Option<Level> {
        self.column(column)
            .filter(|c| c.status == CellStatus::SignedOff)
            .map(|c| c.level)
            .max()
    }

    fn signed_off_count(&self) -> usize {
        self.cells
            .iter()
            .filter(|c| c.status == CellStatus::SignedOff)
            .count()
    }

    /// Fraction of cells signed off
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn signed_off_ratio(&self) -> f64 {
        if self.cells.is_empty() {
            return 0.0;
        }
        self.signed_off_count() as f64 / self.cells.len() as f64
    }
}
