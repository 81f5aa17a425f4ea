//! Collaborator adapters
//!
//! In-process implementations of the collaborator ports:
//! - [`MemoryPersistence`] and [`JsonFilePersistence`] for form snapshots
//! - [`MemoryEvidenceStore`] for evidence summaries
//! - [`TracingNotifier`] which logs notifications instead of sending them

use crate::collaborators::{
    CollaboratorResult, EvidenceStore, Notification, NotificationDispatch, Persistence,
};
use dashmap::DashMap;
use entrust_record::{EvidenceRef, EvidenceSummary};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;

/// Persistence held in memory
#[derive(Debug, Default)]
pub struct MemoryPersistence {
    values: DashMap<String, Value>,
    writes: AtomicUsize,
}

impl MemoryPersistence {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `set` calls served
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Stored keys, sorted
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<_> = self.values.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        keys
    }
}

#[async_trait::async_trait]
impl Persistence for MemoryPersistence {
    async fn get(&self, key: &str) -> CollaboratorResult<Option<Value>> {
        Ok(self.values.get(key).map(|v| v.value().clone()))
    }

    async fn set(&self, key: &str, value: Value) -> CollaboratorResult<()> {
        self.values.insert(key.to_string(), value);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Persistence in a single JSON object file
///
/// Every `set` rewrites the whole file through a temporary sibling and a
/// rename. Writes are serialized, so the last write wins.
#[derive(Debug)]
pub struct JsonFilePersistence {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFilePersistence {
    /// Create store backed by `path`; the file is created on first write
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> CollaboratorResult<Map<String, Value>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) if content.trim().is_empty() => Ok(Map::new()),
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Map::new()),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait::async_trait]
impl Persistence for JsonFilePersistence {
    async fn get(&self, key: &str) -> CollaboratorResult<Option<Value>> {
        let _guard = self.lock.lock().await;
        Ok(self.read_all().await?.remove(key))
    }

    async fn set(&self, key: &str, value: Value) -> CollaboratorResult<()> {
        let _guard = self.lock.lock().await;
        let mut all = self.read_all().await?;
        all.insert(key.to_string(), value);

        let content = serde_json::to_string_pretty(&all)?;
        let tmp = self.path.with_extension("tmp");
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(&tmp, content).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        tracing::debug!("Wrote {} to {}", key, self.path.display());
        Ok(())
    }
}

/// Evidence store held in memory
#[derive(Debug, Default)]
pub struct MemoryEvidenceStore {
    items: DashMap<EvidenceRef, EvidenceSummary>,
}

impl MemoryEvidenceStore {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create store seeded with items
    #[must_use]
    pub fn with_items(items: impl IntoIterator<Item = EvidenceSummary>) -> Self {
        let store = Self::new();
        for item in items {
            store.items.insert(item.id.clone(), item);
        }
        store
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[async_trait::async_trait]
impl EvidenceStore for MemoryEvidenceStore {
    async fn find(&self, id: &EvidenceRef) -> CollaboratorResult<Option<EvidenceSummary>> {
        Ok(self.items.get(id).map(|e| e.value().clone()))
    }

    async fn upsert(&self, summary: EvidenceSummary) -> CollaboratorResult<EvidenceRef> {
        let id = summary.id.clone();
        self.items.insert(id.clone(), summary);
        Ok(id)
    }

    async fn delete(&self, id: &EvidenceRef) -> CollaboratorResult<bool> {
        Ok(self.items.remove(id).is_some())
    }

    async fn list(&self) -> CollaboratorResult<Vec<EvidenceSummary>> {
        let mut items: Vec<_> = self.items.iter().map(|e| e.value().clone()).collect();
        items.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)));
        Ok(items)
    }
}

/// Notifier that only logs
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

#[async_trait::async_trait]
impl NotificationDispatch for TracingNotifier {
    async fn send(&self, notification: &Notification) -> CollaboratorResult<()> {
        tracing::info!(
            "Notify {} of {} {}",
            notification.recipient,
            notification.form_type,
            notification.evidence_id
        );
        Ok(())
    }
}
