//! Entrust Progress
//!
//! Derives the (specialty-or-domain, level) progress matrix from forms and
//! evidence. Nothing here is stored; every matrix is recomputed from its
//! inputs.
//!
//! # Core Concepts
//!
//! - [`ProgressAggregator`]: Matrix layout taken from the catalog plus label matching
//! - [`SpecialtyMatcher`]: Case-insensitive and significant-word specialty matching
//! - [`ProgressMatrix`]: Computed cells with status precedence and attestation overlay
//!
//! # Example
//!
//! ```rust,ignore
//! use entrust_catalog::Catalog;
//! use entrust_progress::{compute_progress, ProgressAggregator};
//!
//! let aggregator = ProgressAggregator::from_catalog(Catalog::builtin()?, &[])?;
//! let matrix = compute_progress(&aggregator, &records, &evidence);
//! println!("{:.0}% signed off", matrix.signed_off_ratio() * 100.0);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod aggregate;
mod error;
mod normalize;

pub use aggregate::{
    compute_progress, CellSource, CellStatus, ProgressAggregator, ProgressCell, ProgressColumn,
    ProgressItem, ProgressMatrix,
};
pub use error::ProgressError;
pub use normalize::SpecialtyMatcher;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
