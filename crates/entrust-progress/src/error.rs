//! Error types for progress aggregation

/// Errors building a progress aggregator
#[derive(Debug, thiserror::Error)]
pub enum ProgressError {
    /// Word pattern failed to compile
    #[error("specialty pattern error: {0}")]
    Pattern(#[from] regex::Error),
}
