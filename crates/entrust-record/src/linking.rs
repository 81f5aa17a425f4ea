//! Evidence linking registry
//!
//! Many-to-many relation between requirement keys and evidence refs. Each
//! key holds an insertion-ordered set, so linking is idempotent and the same
//! ref may back any number of keys.

use crate::evidence::{EvidenceLookup, EvidenceRef, EvidenceSummary};
use entrust_catalog::RequirementKey;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Linked evidence of one form
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EvidenceLinks {
    links: HashMap<RequirementKey, IndexSet<EvidenceRef>>,
}

impl EvidenceLinks {
    /// Create empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Link a ref to a key
    ///
    /// Returns `false` when the ref was already linked.
    pub fn link(&mut self, key: RequirementKey, evidence: EvidenceRef) -> bool {
        self.links.entry(key).or_default().insert(evidence)
    }

    /// Unlink a ref from a key; removing a non-member is a no-op
    ///
    /// Returns `true` when something was removed.
    pub fn unlink(&mut self, key: &RequirementKey, evidence: &EvidenceRef) -> bool {
        let Some(set) = self.links.get_mut(key) else {
            return false;
        };
        let removed = set.shift_remove(evidence);
        if set.is_empty() {
            self.links.remove(key);
        }
        removed
    }

    /// Refs linked to a key, in link order
    pub fn linked(&self, key: &RequirementKey) -> impl Iterator<Item = &EvidenceRef> {
        self.links.get(key).into_iter().flatten()
    }

    #[inline]
    #[must_use]
    pub fn is_linked(&self, key: &RequirementKey, evidence: &EvidenceRef) -> bool {
        self.links.get(key).is_some_and(|set| set.contains(evidence))
    }

    /// Display metadata of a key's refs
    ///
    /// Dangling refs are skipped, not reported as errors.
    pub fn resolve<L>(&self, key: &RequirementKey, lookup: &L) -> Vec<EvidenceSummary>
    where
        L: EvidenceLookup + ?Sized,
    {
        self.linked(key)
            .filter_map(|evidence| {
                let found = lookup.find(evidence);
                if found.is_none() {
                    tracing::warn!(%key, %evidence, "linked evidence not found, skipping");
                }
                found
            })
            .collect()
    }

    /// Number of keys with at least one link
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.links.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evidence::EvidenceKind;
    use entrust_catalog::{FormType, Level, Section, Specialty};
    use proptest::prelude::*;

    fn key(section: char, index: usize) -> RequirementKey {
        RequirementKey::criterion(
            FormType::Epa,
            Level::new(3).unwrap(),
            Specialty::named("Oculoplastics"),
            Section::new(section).unwrap(),
            index,
        )
    }

    fn ev(id: &str) -> EvidenceRef {
        EvidenceRef::from(id)
    }

    #[test]
    fn link_is_idempotent() {
        let mut links = EvidenceLinks::new();
        assert!(links.link(key('B', 0), ev("ev1")));
        assert!(!links.link(key('B', 0), ev("ev1")));
        assert_eq!(links.linked(&key('B', 0)).count(), 1);
    }

    #[test]
    fn unlink_non_member_is_noop() {
        let mut links = EvidenceLinks::new();
        assert!(!links.unlink(&key('B', 0), &ev("missing")));
        links.link(key('B', 0), ev("ev1"));
        assert!(!links.unlink(&key('B', 0), &ev("missing")));
        assert_eq!(links.linked(&key('B', 0)).count(), 1);
    }

    #[test]
    fn same_ref_backs_several_keys() {
        let mut links = EvidenceLinks::new();
        links.link(key('B', 0), ev("ev1"));
        links.link(key('C', 2), ev("ev1"));

        assert!(links.is_linked(&key('B', 0), &ev("ev1")));
        assert!(links.is_linked(&key('C', 2), &ev("ev1")));
        assert_eq!(links.len(), 2);

        links.unlink(&key('B', 0), &ev("ev1"));
        assert!(!links.is_linked(&key('B', 0), &ev("ev1")));
        assert!(links.is_linked(&key('C', 2), &ev("ev1")));
    }

    #[test]
    fn preserves_link_order() {
        let mut links = EvidenceLinks::new();
        for id in ["c", "a", "b"] {
            links.link(key('B', 1), ev(id));
        }
        links.unlink(&key('B', 1), &ev("a"));
        let order: Vec<_> = links.linked(&key('B', 1)).map(EvidenceRef::as_str).collect();
        assert_eq!(order, ["c", "b"]);
    }

    #[test]
    fn resolve_skips_dangling_refs() {
        let mut links = EvidenceLinks::new();
        links.link(key('B', 0), ev("ev1"));
        links.link(key('B', 0), ev("deleted"));

        let store = vec![EvidenceSummary::new("ev1", "Ptosis repair", EvidenceKind::Epa)];
        let resolved = links.resolve(&key('B', 0), &store);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].title, "Ptosis repair");
    }

    fn arb_key() -> impl Strategy<Value = RequirementKey> {
        (proptest::char::range('B', 'E'), 0usize..4).prop_map(|(s, i)| key(s, i))
    }

    fn arb_ops() -> impl Strategy<Value = Vec<(RequirementKey, String)>> {
        proptest::collection::vec((arb_key(), "[a-e]"), 0..12)
    }

    proptest! {
        #[test]
        fn prop_link_unlink_round_trip(seed in arb_ops(), k in arb_key(), r in "[f-z]{2}") {
            let mut links = EvidenceLinks::new();
            for (key, id) in seed {
                links.link(key, ev(&id));
            }
            let before: Vec<_> = links.linked(&k).cloned().collect();

            links.link(k.clone(), ev(&r));
            links.unlink(&k, &ev(&r));

            let after: Vec<_> = links.linked(&k).cloned().collect();
            prop_assert_eq!(before, after);
        }

        #[test]
        fn prop_link_twice_equals_once(seed in arb_ops(), k in arb_key(), r in "[a-z]{2}") {
            let mut once = EvidenceLinks::new();
            for (key, id) in &seed {
                once.link(key.clone(), ev(id));
            }
            let mut twice = once.clone();

            once.link(k.clone(), ev(&r));
            twice.link(k.clone(), ev(&r));
            twice.link(k.clone(), ev(&r));
            prop_assert_eq!(once, twice);
        }
    }
}
