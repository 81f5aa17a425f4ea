//! Error types for the requirements catalog
//!
//! Covers:
//! - Catalog document parsing and validation
//! - Requirement key parsing
//! - Out-of-range levels and unknown form tags

use std::path::PathBuf;

/// Errors raised while loading or validating a catalog
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// Catalog file could not be read
    #[error("io error reading catalog {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Catalog document is not valid TOML for the catalog schema
    #[error("catalog parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// Entry references a level outside 1-4
    #[error("invalid level: {0}")]
    InvalidLevel(#[from] LevelError),

    /// Unknown form type tag in the document
    #[error("unknown form type: {0}")]
    UnknownFormType(String),

    /// Same section letter declared twice in one entry
    #[error("duplicate section {section} in {form_type} level {level} '{specialty}'")]
    DuplicateSection {
        form_type: String,
        level: u8,
        specialty: String,
        section: char,
    },

    /// Section letter is not alphabetic
    #[error("invalid section letter '{0}'")]
    InvalidSection(char),

    /// A domain declared without any entries
    #[error("domain {0} has no entries")]
    EmptyDomain(String),

    /// Embedded catalog failed to load
    #[error("built-in catalog is invalid: {0}")]
    Builtin(String),
}

impl CatalogError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Level outside the supported training range
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("training level must be between 1 and 4, got {0}")]
pub struct LevelError(pub u8);

/// Errors parsing a [`crate::RequirementKey`] from its string form
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyError {
    /// Not enough `-` separated segments
    #[error("malformed requirement key: '{0}'")]
    Malformed(String),

    /// Leading segment is not a known form tag
    #[error("unknown form type in key: '{0}'")]
    UnknownFormType(String),

    /// Level segment is not `L1`..`L4`
    #[error("invalid level segment in key: '{0}'")]
    InvalidLevel(String),

    /// Section segment is not a single letter
    #[error("invalid section segment in key: '{0}'")]
    InvalidSection(String),

    /// Trailing segment is neither an index nor `NARRATIVE`
    #[error("invalid item segment in key: '{0}'")]
    InvalidItem(String),
}
