//! Requirements catalog
//!
//! Static lookup `(form type, level, specialty) → SpecialtyRequirements`.
//! The catalog is read-only at runtime; it is built once from a TOML
//! document (the embedded default or a file named in configuration).
//!
//! # Resolution rules
//! - Levels 1 and 2 use the shared generic entry regardless of specialty.
//! - Levels 3 and 4 need a case-normalized specialty match, falling back to
//!   the first entry declared for that level.
//! - Sections with zero criteria are absent: they are never yielded by
//!   [`SpecialtyRequirements::sections`] and never produce keys.

use crate::error::CatalogError;
use crate::form_type::FormType;
use crate::key::{RequirementKey, RequirementScope};
use crate::level::{Level, Section};
use crate::specialty::Specialty;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

const BUILTIN_CATALOG: &str = include_str!("../data/catalog.toml");

static BUILTIN: Lazy<Result<Catalog, String>> =
    Lazy::new(|| Catalog::from_toml_str(BUILTIN_CATALOG).map_err(|e| e.to_string()));

/// One gradable requirement line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Criterion {
    /// Requirement text shown on the card
    pub label: String,
    /// Comment box is always open (and a comment always required)
    #[serde(default)]
    pub always_show_comment: bool,
}

/// Criteria grouped under one section letter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionRequirements {
    pub section: Section,
    pub title: String,
    pub criteria: Vec<Criterion>,
    /// Show explanatory text before the list
    pub has_blurb: bool,
    /// Force the comment box open for every criterion in the section
    pub always_show_comment: bool,
}

impl SectionRequirements {
    /// Sections without criteria are treated as absent
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }

    /// Whether the comment for criterion `index` is always required
    #[must_use]
    pub fn comment_forced(&self, index: usize) -> bool {
        self.always_show_comment
            || self
                .criteria
                .get(index)
                .is_some_and(|c| c.always_show_comment)
    }
}

/// Requirements that apply to one (level, specialty) cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialtyRequirements {
    pub level: Level,
    pub specialty: Specialty,
    pub learning_outcomes: Vec<String>,
    sections: Vec<SectionRequirements>,
}

impl SpecialtyRequirements {
    /// Create requirements, ordering sections by letter
    #[must_use]
    pub fn new(
        level: Level,
        specialty: Specialty,
        learning_outcomes: Vec<String>,
        mut sections: Vec<SectionRequirements>,
    ) -> Self {
        sections.sort_by_key(|s| s.section);
        Self {
            level,
            specialty,
            learning_outcomes,
            sections,
        }
    }

    /// Visible (non-empty) sections in letter order
    pub fn sections(&self) -> impl Iterator<Item = &SectionRequirements> {
        self.sections.iter().filter(|s| !s.is_empty())
    }

    /// Visible section by letter
    #[must_use]
    pub fn section(&self, section: Section) -> Option<&SectionRequirements> {
        self.sections().find(|s| s.section == section)
    }

    /// Criterion by section and index
    #[must_use]
    pub fn criterion(&self, section: Section, index: usize) -> Option<&Criterion> {
        self.section(section).and_then(|s| s.criteria.get(index))
    }

    /// Criterion addressed by a key (narrative keys have none)
    #[must_use]
    pub fn criterion_for(&self, key: &RequirementKey) -> Option<&Criterion> {
        key.criterion_index()
            .and_then(|index| self.criterion(key.section, index))
    }

    /// Whether a comment is required for the keyed criterion regardless of grade
    #[must_use]
    pub fn comment_forced(&self, key: &RequirementKey) -> bool {
        match key.criterion_index() {
            Some(index) => self
                .section(key.section)
                .is_some_and(|s| s.comment_forced(index)),
            None => false,
        }
    }

    /// Criterion keys of one visible section
    #[must_use]
    pub fn section_keys(&self, scope: &RequirementScope, section: Section) -> Vec<RequirementKey> {
        self.section(section)
            .map(|s| {
                (0..s.criteria.len())
                    .map(|i| scope.criterion(section, i))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Criterion keys of every visible section
    #[must_use]
    pub fn keys(&self, scope: &RequirementScope) -> Vec<RequirementKey> {
        self.sections()
            .flat_map(|s| (0..s.criteria.len()).map(move |i| scope.criterion(s.section, i)))
            .collect()
    }

    /// Total criteria across visible sections
    #[must_use]
    pub fn criterion_count(&self) -> usize {
        self.sections().map(|s| s.criteria.len()).sum()
    }
}

/// All entries of one form type, grouped by level
#[derive(Debug, Clone, Serialize)]
pub struct RequirementsCatalog {
    form_type: FormType,
    entries: BTreeMap<Level, Vec<SpecialtyRequirements>>,
}

impl RequirementsCatalog {
    /// Create empty catalog for a form type
    #[inline]
    #[must_use]
    pub fn new(form_type: FormType) -> Self {
        Self {
            form_type,
            entries: BTreeMap::new(),
        }
    }

    /// Form type this catalog describes
    #[inline]
    #[must_use]
    pub fn form_type(&self) -> FormType {
        self.form_type
    }

    /// Add an entry (declaration order is preserved per level)
    pub fn insert(&mut self, requirements: SpecialtyRequirements) {
        self.entries
            .entry(requirements.level)
            .or_default()
            .push(requirements);
    }

    /// Resolve the requirements for a (level, specialty) pair
    ///
    /// Returns `None` only when the level has no entries at all.
    #[must_use]
    pub fn resolve(&self, level: Level, specialty: &Specialty) -> Option<&SpecialtyRequirements> {
        let entries = self.entries.get(&level)?;

        if level.uses_generic_entry() {
            return entries
                .iter()
                .find(|e| e.specialty.is_generic())
                .or_else(|| entries.first());
        }

        entries
            .iter()
            .find(|e| e.specialty.matches(specialty))
            .or_else(|| entries.first())
    }

    /// Selectable specialty keys for a level, in declaration order
    #[must_use]
    pub fn specialties(&self, level: Level) -> Vec<&Specialty> {
        self.entries
            .get(&level)
            .map(|entries| entries.iter().map(|e| &e.specialty).collect())
            .unwrap_or_default()
    }

    /// Whether `specialty` is an exact (case-normalized) key at `level`
    #[must_use]
    pub fn is_valid_specialty(&self, level: Level, specialty: &Specialty) -> bool {
        self.specialties(level).into_iter().any(|s| s.matches(specialty))
    }

    /// First valid specialty key for a level
    #[must_use]
    pub fn default_specialty(&self, level: Level) -> Option<Specialty> {
        self.specialties(level).first().map(|s| (*s).clone())
    }

    /// Number of entries across all levels
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    /// Iterate entries in level order
    pub fn entries(&self) -> impl Iterator<Item = &SpecialtyRequirements> {
        self.entries.values().flatten()
    }
}

/// Requirements catalogs for every form type
#[derive(Debug, Clone, Default, Serialize)]
pub struct Catalog {
    domains: BTreeMap<FormType, RequirementsCatalog>,
}

impl Catalog {
    /// Create empty catalog
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog embedded in the crate
    ///
    /// # Errors
    /// Returns [`CatalogError::Builtin`] if the embedded document is invalid
    pub fn builtin() -> Result<&'static Catalog, CatalogError> {
        BUILTIN
            .as_ref()
            .map_err(|msg| CatalogError::Builtin(msg.clone()))
    }

    /// Load catalog from a TOML file
    ///
    /// # Errors
    /// - `CatalogError::Io` if the file cannot be read
    /// - any error of [`Catalog::from_toml_str`]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| CatalogError::io_error(path, e))?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate a catalog document
    ///
    /// # Errors
    /// - `CatalogError::Parse` for malformed TOML
    /// - `CatalogError::UnknownFormType`, `InvalidLevel`, `InvalidSection`,
    ///   `DuplicateSection`, `EmptyDomain` for schema violations
    pub fn from_toml_str(content: &str) -> Result<Self, CatalogError> {
        let raw: RawCatalog = toml::from_str(content)?;
        let mut catalog = Self::new();

        for domain in raw.domains {
            let form_type: FormType = domain
                .form_type
                .parse()
                .map_err(|_| CatalogError::UnknownFormType(domain.form_type.clone()))?;

            if domain.entries.is_empty() {
                return Err(CatalogError::EmptyDomain(domain.form_type));
            }

            let requirements = catalog
                .domains
                .entry(form_type)
                .or_insert_with(|| RequirementsCatalog::new(form_type));

            for entry in domain.entries {
                requirements.insert(entry.into_requirements(form_type)?);
            }
        }

        Ok(catalog)
    }

    /// Requirements catalog for a form type
    #[inline]
    #[must_use]
    pub fn domain(&self, form_type: FormType) -> Option<&RequirementsCatalog> {
        self.domains.get(&form_type)
    }

    /// Resolve requirements for a scope
    #[must_use]
    pub fn resolve(&self, scope: &RequirementScope) -> Option<&SpecialtyRequirements> {
        self.domain(scope.form_type)?
            .resolve(scope.level, &scope.specialty)
    }

    /// Iterate over all domains
    pub fn domains(&self) -> impl Iterator<Item = &RequirementsCatalog> {
        self.domains.values()
    }
}

#[derive(Debug, Deserialize)]
struct RawCatalog {
    #[serde(rename = "domain", default)]
    domains: Vec<RawDomain>,
}

#[derive(Debug, Deserialize)]
struct RawDomain {
    form_type: String,
    #[serde(rename = "entry", default)]
    entries: Vec<RawEntry>,
}

#[derive(Debug, Deserialize)]
struct RawEntry {
    level: u8,
    #[serde(default)]
    specialty: String,
    #[serde(default)]
    learning_outcomes: Vec<String>,
    #[serde(rename = "section", default)]
    sections: Vec<RawSection>,
}

#[derive(Debug, Deserialize)]
struct RawSection {
    letter: char,
    #[serde(default)]
    title: String,
    #[serde(default)]
    has_blurb: bool,
    #[serde(default)]
    always_show_comment: bool,
    #[serde(default)]
    criteria: Vec<RawCriterion>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawCriterion {
    Label(String),
    Detailed(Criterion),
}

impl From<RawCriterion> for Criterion {
    fn from(raw: RawCriterion) -> Self {
        match raw {
            RawCriterion::Label(label) => Criterion {
                label,
                always_show_comment: false,
            },
            RawCriterion::Detailed(criterion) => criterion,
        }
    }
}

impl RawEntry {
    fn into_requirements(self, form_type: FormType) -> Result<SpecialtyRequirements, CatalogError> {
        let level = Level::new(self.level)?;
        let specialty = Specialty::from(self.specialty);

        let mut seen = HashSet::new();
        let mut sections = Vec::with_capacity(self.sections.len());
        for raw in self.sections {
            let section =
                Section::new(raw.letter).ok_or(CatalogError::InvalidSection(raw.letter))?;
            if !seen.insert(section) {
                return Err(CatalogError::DuplicateSection {
                    form_type: form_type.tag().to_string(),
                    level: level.value(),
                    specialty: specialty.label(),
                    section: raw.letter,
                });
            }
            sections.push(SectionRequirements {
                section,
                title: raw.title,
                criteria: raw.criteria.into_iter().map(Criterion::from).collect(),
                has_blurb: raw.has_blurb,
                always_show_comment: raw.always_show_comment,
            });
        }

        Ok(SpecialtyRequirements::new(
            level,
            specialty,
            self.learning_outcomes,
            sections,
        ))
    }
}
