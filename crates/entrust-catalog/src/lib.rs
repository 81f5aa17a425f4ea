//! Entrust Requirements Catalog
//!
//! Static, level/specialty keyed requirements for structured assessments.
//!
//! # Core Concepts
//!
//! - [`Catalog`]: Requirements for every [`FormType`], loaded from TOML
//! - [`RequirementsCatalog`]: Entries of one form type, resolved by level and specialty
//! - [`SpecialtyRequirements`]: Learning outcomes plus lettered sections of criteria
//! - [`RequirementKey`]: Structural identity of one criterion or narrative block
//! - [`Grade`] / [`GradeScale`]: Closed per-criterion grading enumerations
//!
//! # Example
//!
//! ```rust,ignore
//! use entrust_catalog::{Catalog, FormType, Level, Specialty};
//!
//! let catalog = Catalog::builtin()?;
//! let epa = catalog.domain(FormType::Epa).unwrap();
//! let req = epa.resolve(Level::new(3)?, &Specialty::named("Oculoplastics")).unwrap();
//!
//! for section in req.sections() {
//!     println!("{}: {} criteria", section.section, section.criteria.len());
//! }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
mod catalog;
mod error;
mod form_type;
mod key;
mod level;
mod specialty;

// Re-exports
pub use catalog::{
    Catalog, Criterion, RequirementsCatalog, SectionRequirements, SpecialtyRequirements,
};
pub use error::{CatalogError, KeyError, LevelError};
pub use form_type::{EntrustmentJudgment, FormType, Grade, GradeScale};
pub use key::{KeyItem, RequirementKey, RequirementScope};
pub use level::{Level, Section};
pub use specialty::{Specialty, GENERIC_LABEL, OPERATING_LIST_PREFIX};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod integration_tests {
    use super::*;

    #[test]
    fn oculoplastics_level_three_keys() {
        let catalog = Catalog::builtin().unwrap();
        let scope = RequirementScope::new(
            FormType::Epa,
            Level::new(3).unwrap(),
            Specialty::named("Oculoplastics"),
        );
        let req = catalog.resolve(&scope).unwrap();
        assert_eq!(req.specialty, Specialty::named("Oculoplastics"));

        let c = Section::new('C').unwrap();
        let key = scope.criterion(c, 2);
        assert_eq!(key.to_string(), "EPA-L3-Oculoplastics-C-2");
        assert!(req.criterion_for(&key).is_some());
    }

    #[test]
    fn operating_list_has_reduced_sections() {
        let catalog = Catalog::builtin().unwrap();
        let epa = catalog.domain(FormType::Epa).unwrap();
        let level = Level::new(3).unwrap();

        let full = epa.resolve(level, &Specialty::named("Cataract")).unwrap();
        let list = epa
            .resolve(level, &Specialty::operating_list("Cataract"))
            .unwrap();
        assert!(list.specialty.is_operating_list());
        assert!(list.sections().count() < full.sections().count());
    }

    #[test]
    fn gsat_is_generic_at_every_level() {
        let catalog = Catalog::builtin().unwrap();
        let gsat = catalog.domain(FormType::Gsat).unwrap();
        for level in Level::all() {
            let req = gsat.resolve(level, &Specialty::named("Glaucoma")).unwrap();
            assert!(req.specialty.is_generic());
        }
    }
}
