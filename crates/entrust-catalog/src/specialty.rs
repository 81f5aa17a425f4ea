//! Specialty (special interest area) selection
//!
//! The second axis of the requirements matrix. Two reserved sentinels exist
//! alongside ordinary named specialties:
//! - [`Specialty::Generic`] for levels with no subdomain split
//! - [`Specialty::OperatingList`] variants carrying their own reduced section set

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Label of the generic sentinel
pub const GENERIC_LABEL: &str = "No Specialty SIA";

/// Label prefix of operating-list variants
pub const OPERATING_LIST_PREFIX: &str = "Operating List";

/// Specialty selected on a form
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Specialty {
    /// Generic / no-specialty sentinel
    #[default]
    Generic,
    /// Operating-list variant of a base specialty
    OperatingList(String),
    /// Ordinary named specialty
    Named(String),
}

impl Specialty {
    /// Named specialty from a label
    #[inline]
    #[must_use]
    pub fn named(label: impl Into<String>) -> Self {
        Self::from(label.into())
    }

    /// Operating-list variant for a base specialty
    #[inline]
    #[must_use]
    pub fn operating_list(base: impl Into<String>) -> Self {
        Self::OperatingList(base.into())
    }

    /// Display label (as stored in the catalog and in requirement keys)
    #[must_use]
    pub fn label(&self) -> String {
        self.to_string()
    }

    /// Case-normalized label used for catalog matching
    #[must_use]
    pub fn normalized(&self) -> String {
        self.label().trim().to_lowercase()
    }

    /// Case-insensitive equality of labels
    #[inline]
    #[must_use]
    pub fn matches(&self, other: &Specialty) -> bool {
        self.normalized() == other.normalized()
    }

    /// Check for the generic sentinel
    #[inline]
    #[must_use]
    pub fn is_generic(&self) -> bool {
        matches!(self, Self::Generic)
    }

    /// Check for an operating-list variant
    #[inline]
    #[must_use]
    pub fn is_operating_list(&self) -> bool {
        matches!(self, Self::OperatingList(_))
    }

    /// Base specialty an operating-list variant rolls up into
    #[must_use]
    pub fn base(&self) -> Specialty {
        match self {
            Self::OperatingList(base) => Self::Named(base.clone()),
            other => other.clone(),
        }
    }
}

impl From<String> for Specialty {
    fn from(value: String) -> Self {
        let trimmed = value.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(GENERIC_LABEL) {
            return Self::Generic;
        }

        let prefix_len = OPERATING_LIST_PREFIX.len();
        if trimmed.len() > prefix_len
            && trimmed.is_char_boundary(prefix_len)
            && trimmed[..prefix_len].eq_ignore_ascii_case(OPERATING_LIST_PREFIX)
        {
            let base = trimmed[prefix_len..].trim_start_matches([' ', '-', ':']).trim();
            if !base.is_empty() {
                return Self::OperatingList(base.to_string());
            }
        }

        Self::Named(trimmed.to_string())
    }
}

impl From<&str> for Specialty {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<Specialty> for String {
    fn from(value: Specialty) -> Self {
        value.to_string()
    }
}

impl Display for Specialty {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Generic => write!(f, "{GENERIC_LABEL}"),
            Self::OperatingList(base) => write!(f, "{OPERATING_LIST_PREFIX} - {base}"),
            Self::Named(label) => write!(f, "{label}"),
        }
    }
}
