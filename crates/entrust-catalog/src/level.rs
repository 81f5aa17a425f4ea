//! Training levels and section letters
//!
//! Provides [`Level`] (the ordinal axis of the requirements matrix) and
//! [`Section`] (the lettered grouping of criteria within one entry).

use crate::error::LevelError;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Ordinal training stage, 1 through 4
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Level(u8);

impl Level {
    /// Lowest training level
    pub const MIN: Level = Level(1);
    /// Highest training level
    pub const MAX: Level = Level(4);

    /// Create level, rejecting values outside 1-4
    ///
    /// # Errors
    /// Returns [`LevelError`] when `value` is not in `1..=4`
    #[inline]
    pub fn new(value: u8) -> Result<Self, LevelError> {
        if (Self::MIN.0..=Self::MAX.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(LevelError(value))
        }
    }

    /// Numeric value
    #[inline]
    #[must_use]
    pub fn value(self) -> u8 {
        self.0
    }

    /// Levels 1 and 2 share a single generic entry regardless of specialty
    #[inline]
    #[must_use]
    pub fn uses_generic_entry(self) -> bool {
        self.0 <= 2
    }

    /// All levels in ascending order
    pub fn all() -> impl Iterator<Item = Level> {
        (Self::MIN.0..=Self::MAX.0).map(Level)
    }
}

impl TryFrom<u8> for Level {
    type Error = LevelError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Level> for u8 {
    fn from(level: Level) -> Self {
        level.0
    }
}

impl Display for Level {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

/// Section letter within a specialty entry (`A`, `B`, ...)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Section(char);

impl Section {
    /// Section that owns the narrative block
    pub const NARRATIVE: Section = Section('A');

    /// Create section from a letter (normalized to upper case)
    #[inline]
    #[must_use]
    pub fn new(letter: char) -> Option<Self> {
        letter
            .is_ascii_alphabetic()
            .then(|| Self(letter.to_ascii_uppercase()))
    }

    /// Section letter
    #[inline]
    #[must_use]
    pub fn letter(self) -> char {
        self.0
    }
}

impl Display for Section {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_bounds() {
        assert!(Level::new(0).is_err());
        assert!(Level::new(1).is_ok());
        assert!(Level::new(4).is_ok());
        assert_eq!(Level::new(5), Err(LevelError(5)));
    }

    #[test]
    fn level_generic_entry() {
        assert!(Level::new(1).unwrap().uses_generic_entry());
        assert!(Level::new(2).unwrap().uses_generic_entry());
        assert!(!Level::new(3).unwrap().uses_generic_entry());
    }

    #[test]
    fn level_display_and_order() {
        let levels: Vec<_> = Level::all().collect();
        assert_eq!(levels.len(), 4);
        assert!(levels.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(Level::MAX.to_string(), "L4");
    }

    #[test]
    fn level_serde_rejects_out_of_range() {
        assert!(serde_json::from_str::<Level>("3").is_ok());
        assert!(serde_json::from_str::<Level>("9").is_err());
    }

    #[test]
    fn section_normalizes_case() {
        assert_eq!(Section::new('b').unwrap().letter(), 'B');
        assert!(Section::new('1').is_none());
    }
}
