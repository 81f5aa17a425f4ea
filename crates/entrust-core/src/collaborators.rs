//! External collaborator ports
//!
//! The engine consumes three capabilities it does not implement: the
//! evidence store, notification dispatch and a key/value persistence blob.
//! Every call may fail; the engine never assumes success.

use crate::error::CollaboratorError;
use entrust_catalog::FormType;
use entrust_record::{EvidenceRef, EvidenceSummary};
use serde::{Deserialize, Serialize};

/// Result type for collaborator calls
pub type CollaboratorResult<T> = Result<T, CollaboratorError>;

/// External evidence store
#[async_trait::async_trait]
pub trait EvidenceStore: Send + Sync {
    /// Summary for an id, `None` when absent
    async fn find(&self, id: &EvidenceRef) -> CollaboratorResult<Option<EvidenceSummary>>;

    /// Create or replace an item, returning its id
    async fn upsert(&self, summary: EvidenceSummary) -> CollaboratorResult<EvidenceRef>;

    /// Delete an item; `false` when it did not exist
    async fn delete(&self, id: &EvidenceRef) -> CollaboratorResult<bool>;

    /// Every stored item
    async fn list(&self) -> CollaboratorResult<Vec<EvidenceSummary>>;
}

/// Message sent to the approver when a form is submitted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub evidence_id: EvidenceRef,
    pub recipient: String,
    pub form_type: FormType,
}

/// Fire-and-report notification delivery
#[async_trait::async_trait]
pub trait NotificationDispatch: Send + Sync {
    /// Deliver a notification; `Err` carries the failure reason
    async fn send(&self, notification: &Notification) -> CollaboratorResult<()>;
}

/// Opaque key to JSON value store
#[async_trait::async_trait]
pub trait Persistence: Send + Sync {
    async fn get(&self, key: &str) -> CollaboratorResult<Option<serde_json::Value>>;

    async fn set(&self, key: &str, value: serde_json::Value) -> CollaboratorResult<()>;
}
