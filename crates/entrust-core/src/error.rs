//! Error types for the Entrust engine
//!
//! Provides the umbrella [`EngineError`] and its [`ErrorKind`] taxonomy:
//! - Validation failures at lifecycle transitions
//! - Dispatch failures from notification and persistence collaborators
//! - Lookup misses for unknown forms or catalog cells
//! - Illegal transitions and rejected writes

use entrust_catalog::CatalogError;
use entrust_progress::ProgressError;
use entrust_record::{FormId, RecordError};
use std::path::PathBuf;

/// Main engine error type
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Form record operation failed
    #[error(transparent)]
    Record(#[from] RecordError),

    /// Catalog could not be loaded
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Progress aggregator could not be built
    #[error("progress error: {0}")]
    Progress(#[from] ProgressError),

    /// External collaborator call failed
    #[error("{operation} failed: {source}")]
    Dispatch {
        operation: &'static str,
        #[source]
        source: CollaboratorError,
    },

    /// No persisted form with this id
    #[error("form {0} not found")]
    FormNotFound(FormId),

    /// Invalid configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// Local file could not be read
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Stored value has the wrong shape
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Error taxonomy surfaced to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Required field missing or input malformed; nothing changed
    Validation,
    /// Collaborator failed; retryable, nothing changed
    Dispatch,
    /// Requested form or catalog cell does not exist
    LookupMiss,
    /// Role lacks permission or target status unreachable
    IllegalTransition,
    /// Configuration could not be loaded
    Configuration,
    /// Local storage or decoding failure
    Storage,
}

impl EngineError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create dispatch error for a collaborator operation
    pub fn dispatch(operation: &'static str, source: CollaboratorError) -> Self {
        Self::Dispatch { operation, source }
    }

    /// Taxonomy bucket of this error
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Record(err) => match err {
                RecordError::Rejected { .. }
                | RecordError::IllegalTransition { .. }
                | RecordError::StalePlan { .. } => ErrorKind::IllegalTransition,
                RecordError::NoRequirements { .. } => ErrorKind::LookupMiss,
                RecordError::Validation(_)
                | RecordError::OutOfScope { .. }
                | RecordError::UnknownCriterion { .. }
                | RecordError::WrongScale { .. }
                | RecordError::InvalidSpecialty { .. }
                | RecordError::MismatchedRequirements { .. } => ErrorKind::Validation,
            },
            Self::Dispatch { .. } => ErrorKind::Dispatch,
            Self::FormNotFound(_) => ErrorKind::LookupMiss,
            Self::Catalog(_) | Self::Progress(_) | Self::Config(_) => ErrorKind::Configuration,
            Self::Io { .. } | Self::Serialization(_) => ErrorKind::Storage,
        }
    }

    /// Check if error is retryable
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Dispatch
    }
}

/// Failure reported by an external collaborator
#[derive(Debug, thiserror::Error)]
pub enum CollaboratorError {
    /// Collaborator reported failure
    #[error("{0}")]
    Failed(String),

    /// Underlying IO failed
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Value could not be encoded or decoded
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CollaboratorError {
    /// Create failure with a reason
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed(reason.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use entrust_record::{Action, FormStatus, Role, ValidationFailure};

    #[test]
    fn only_dispatch_is_retryable() {
        let err = EngineError::dispatch("notification", CollaboratorError::failed("smtp down"));
        assert_eq!(err.kind(), ErrorKind::Dispatch);
        assert!(err.is_retryable());
        assert_eq!(err.to_string(), "notification failed: smtp down");

        let err = EngineError::from(RecordError::from(ValidationFailure::MissingApprover));
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(!err.is_retryable());
    }

    #[test]
    fn rejection_maps_to_illegal_transition() {
        let err = EngineError::from(RecordError::Rejected {
            action: Action::Grade,
            status: FormStatus::SignedOff,
            role: Role::Approver,
        });
        assert_eq!(err.kind(), ErrorKind::IllegalTransition);
    }

    #[test]
    fn missing_form_is_lookup_miss() {
        let err = EngineError::FormNotFound(FormId::new());
        assert_eq!(err.kind(), ErrorKind::LookupMiss);
    }
}
