//! Requirement keys for addressing assessable units within a form
//!
//! Provides [`RequirementKey`], a structural composite of form type, level,
//! specialty, section and item. Equality and hashing are structural; the
//! `EPA-L3-Oculoplastics-B-0` string form exists only at the serialization
//! boundary.

use crate::error::KeyError;
use crate::form_type::FormType;
use crate::level::{Level, Section};
use crate::specialty::Specialty;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Trailing segment marking the narrative block
const NARRATIVE_SEGMENT: &str = "NARRATIVE";

/// The (form type, level, specialty) triple a form's requirements resolve from
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RequirementScope {
    pub form_type: FormType,
    pub level: Level,
    pub specialty: Specialty,
}

impl RequirementScope {
    /// Create new scope
    #[inline]
    #[must_use]
    pub fn new(form_type: FormType, level: Level, specialty: Specialty) -> Self {
        Self {
            form_type,
            level,
            specialty,
        }
    }

    /// Key of one criterion in this scope
    #[inline]
    #[must_use]
    pub fn criterion(&self, section: Section, index: usize) -> RequirementKey {
        RequirementKey {
            scope: self.clone(),
            section,
            item: KeyItem::Criterion(index),
        }
    }

    /// Key of the narrative block in this scope
    #[inline]
    #[must_use]
    pub fn narrative(&self) -> RequirementKey {
        RequirementKey {
            scope: self.clone(),
            section: Section::NARRATIVE,
            item: KeyItem::Narrative,
        }
    }
}

/// What a key points at inside its section
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum KeyItem {
    /// Zero-based criterion index
    Criterion(usize),
    /// Narrative block
    Narrative,
}

impl Display for KeyItem {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            KeyItem::Criterion(index) => write!(f, "{index}"),
            KeyItem::Narrative => f.write_str(NARRATIVE_SEGMENT),
        }
    }
}

/// Identity of one assessable unit within a form
///
/// Specialty is part of the key so criteria for different specialties never
/// share graded state or linked evidence.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RequirementKey {
    pub scope: RequirementScope,
    pub section: Section,
    pub item: KeyItem,
}

impl RequirementKey {
    /// Criterion key
    #[inline]
    #[must_use]
    pub fn criterion(
        form_type: FormType,
        level: Level,
        specialty: Specialty,
        section: Section,
        index: usize,
    ) -> Self {
        RequirementScope::new(form_type, level, specialty).criterion(section, index)
    }

    /// Narrative key
    #[inline]
    #[must_use]
    pub fn narrative(form_type: FormType, level: Level, specialty: Specialty) -> Self {
        RequirementScope::new(form_type, level, specialty).narrative()
    }

    /// Criterion index, if this key addresses a criterion
    #[inline]
    #[must_use]
    pub fn criterion_index(&self) -> Option<usize> {
        match self.item {
            KeyItem::Criterion(index) => Some(index),
            KeyItem::Narrative => None,
        }
    }

    /// Check for the narrative variant
    #[inline]
    #[must_use]
    pub fn is_narrative(&self) -> bool {
        matches!(self.item, KeyItem::Narrative)
    }

    /// Check this key lives in the given scope
    #[inline]
    #[must_use]
    pub fn in_scope(&self, scope: &RequirementScope) -> bool {
        &self.scope == scope
    }
}

impl Display for RequirementKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{}-{}-{}",
            self.scope.form_type, self.scope.level, self.scope.specialty, self.section, self.item
        )
    }
}

impl FromStr for RequirementKey {
    type Err = KeyError;

    /// Parse `FORM-Ln-Specialty-S-item`
    ///
    /// Form and level are taken from the left and section and item from the
    /// right, so specialty labels may themselves contain `-`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || KeyError::Malformed(s.to_string());

        let mut tail = s.rsplitn(3, '-');
        let item = tail.next().ok_or_else(malformed)?;
        let section = tail.next().ok_or_else(malformed)?;
        let head = tail.next().ok_or_else(malformed)?;

        let mut head = head.splitn(3, '-');
        let form = head.next().ok_or_else(malformed)?;
        let level = head.next().ok_or_else(malformed)?;
        let specialty = head.next().ok_or_else(malformed)?;
        if specialty.trim().is_empty() {
            return Err(malformed());
        }

        let form_type = form.parse::<FormType>()?;

        let level = level
            .strip_prefix('L')
            .and_then(|n| n.parse::<u8>().ok())
            .and_then(|n| Level::new(n).ok())
            .ok_or_else(|| KeyError::InvalidLevel(level.to_string()))?;

        let mut letters = section.chars();
        let section = match (letters.next(), letters.next()) {
            (Some(letter), None) => Section::new(letter),
            _ => None,
        }
        .ok_or_else(|| KeyError::InvalidSection(section.to_string()))?;

        let item = if item == NARRATIVE_SEGMENT {
            KeyItem::Narrative
        } else {
            item.parse::<usize>()
                .map(KeyItem::Criterion)
                .map_err(|_| KeyError::InvalidItem(item.to_string()))?
        };

        Ok(Self {
            scope: RequirementScope::new(form_type, level, Specialty::from(specialty)),
            section,
            item,
        })
    }
}

impl TryFrom<String> for RequirementKey {
    type Error = KeyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RequirementKey> for String {
    fn from(value: RequirementKey) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn level(n: u8) -> Level {
        Level::new(n).unwrap()
    }

    fn section(c: char) -> Section {
        Section::new(c).unwrap()
    }

    #[test]
    fn formats_criterion_key() {
        let key = RequirementKey::criterion(
            FormType::Epa,
            level(3),
            Specialty::named("Oculoplastics"),
            section('B'),
            0,
        );
        assert_eq!(key.to_string(), "EPA-L3-Oculoplastics-B-0");
    }

    #[test]
    fn formats_narrative_key() {
        let key = RequirementKey::narrative(FormType::Epa, level(3), Specialty::named("Oculoplastics"));
        assert_eq!(key.to_string(), "EPA-L3-Oculoplastics-A-NARRATIVE");
        assert!(key.is_narrative());
        assert_eq!(key.criterion_index(), None);
    }

    #[test]
    fn parses_hyphenated_specialty() {
        let key: RequirementKey = "EPA-L4-Operating List - Cataract-C-2".parse().unwrap();
        assert_eq!(key.scope.specialty, Specialty::operating_list("Cataract"));
        assert_eq!(key.section.letter(), 'C');
        assert_eq!(key.criterion_index(), Some(2));
    }

    #[test]
    fn parses_generic_key() {
        let key: RequirementKey = "GSAT-L1-No Specialty SIA-A-3".parse().unwrap();
        assert_eq!(key.scope.form_type, FormType::Gsat);
        assert!(key.scope.specialty.is_generic());
    }

    #[test]
    fn rejects_malformed_keys() {
        assert!(matches!("EPA-L3".parse::<RequirementKey>(), Err(KeyError::Malformed(_))));
        assert!(matches!(
            "XYZ-L3-Glaucoma-A-0".parse::<RequirementKey>(),
            Err(KeyError::UnknownFormType(_))
        ));
        assert!(matches!(
            "EPA-L9-Glaucoma-A-0".parse::<RequirementKey>(),
            Err(KeyError::InvalidLevel(_))
        ));
        assert!(matches!(
            "EPA-L3-Glaucoma-AB-0".parse::<RequirementKey>(),
            Err(KeyError::InvalidSection(_))
        ));
        assert!(matches!(
            "EPA-L3-Glaucoma-A-x".parse::<RequirementKey>(),
            Err(KeyError::InvalidItem(_))
        ));
    }

    #[test]
    fn specialty_separates_keys() {
        let a = RequirementKey::criterion(FormType::Epa, level(3), Specialty::named("Glaucoma"), section('B'), 0);
        let b = RequirementKey::criterion(FormType::Epa, level(3), Specialty::named("Cataract"), section('B'), 0);
        assert_ne!(a, b);

        let mut map = HashMap::new();
        map.insert(a.clone(), 1);
        map.insert(b, 2);
        assert_eq!(map[&a], 1);
    }

    #[test]
    fn serde_uses_string_form_as_map_key() {
        let key = RequirementKey::criterion(FormType::Epa, level(3), Specialty::named("Glaucoma"), section('B'), 1);
        let mut map = HashMap::new();
        map.insert(key.clone(), true);
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"EPA-L3-Glaucoma-B-1":true}"#);
        let back: HashMap<RequirementKey, bool> = serde_json::from_str(&json).unwrap();
        assert!(back[&key]);
    }

    proptest::proptest! {
        #[test]
        fn display_parse_round_trip(
            form in proptest::sample::select(FormType::ALL.to_vec()),
            lvl in 1u8..=4,
            specialty in "[A-Za-z][A-Za-z &-]{0,24}[A-Za-z]",
            letter in proptest::char::range('A', 'H'),
            index in proptest::option::of(0usize..40),
        ) {
            let scope = RequirementScope::new(form, level(lvl), Specialty::from(specialty));
            let key = match index {
                Some(i) => scope.criterion(section(letter), i),
                None => scope.narrative(),
            };
            let parsed: RequirementKey = key.to_string().parse().unwrap();
            proptest::prop_assert_eq!(parsed, key);
        }
    }
}
