//! Testing utilities for the Entrust workspace
//!
//! Shared fixtures and collaborator doubles.

#![allow(missing_docs)]

use entrust_catalog::{Catalog, EntrustmentJudgment, FormType, Level, Section, Specialty};
use entrust_core::{
    CollaboratorError, CollaboratorResult, EngineConfig, FormEngine, MemoryEvidenceStore,
    MemoryPersistence, Notification, NotificationDispatch, Persistence,
};
use entrust_record::{
    Assessor, Countersignature, EvidenceKind, EvidenceSummary, FormRecord, FormStatus, Role,
    TransitionPayload,
};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub fn catalog() -> &'static Catalog {
    Catalog::builtin().unwrap()
}

pub fn level(n: u8) -> Level {
    Level::new(n).unwrap()
}

pub fn section(letter: char) -> Section {
    Section::new(letter).unwrap()
}

pub fn assessor() -> Assessor {
    Assessor::new("Dr Amara Okafor", "a.okafor@example.org").with_registration_id("GMC1234567")
}

pub fn countersignature() -> Countersignature {
    Countersignature::new("Dr Amara Okafor", "GMC1234567", "data:image/png;base64,AAAA")
}

pub fn submit_payload() -> TransitionPayload {
    TransitionPayload::new().with_assessor(assessor())
}

pub fn sign_off_payload() -> TransitionPayload {
    TransitionPayload::new().with_countersignature(countersignature())
}

/// Level 3 oculoplastics EPA in draft
pub fn oculoplastics_record() -> FormRecord {
    FormRecord::open(
        FormType::Epa,
        level(3),
        &Specialty::named("Oculoplastics"),
        catalog(),
    )
    .unwrap()
}

/// Draft with entrustment and narrative filled in
pub fn ready_to_submit(mut record: FormRecord) -> FormRecord {
    record
        .set_entrustment(Role::Author, Some(EntrustmentJudgment::CompetentToThisLevel))
        .unwrap();
    record
        .set_narrative(Role::Author, "Lid lesion clinic and two biopsies")
        .unwrap();
    record
}

pub fn evidence(id: &str, kind: EvidenceKind, specialty: &str, level: u8) -> EvidenceSummary {
    EvidenceSummary::new(id, format!("{kind:?} {id}"), kind)
        .with_specialty(specialty)
        .with_level(level)
}

pub fn signed_off_evidence(id: &str, specialty: &str, level: u8) -> EvidenceSummary {
    evidence(id, EvidenceKind::Epa, specialty, level).with_status(FormStatus::SignedOff)
}

/// Notifier recording every notification it accepts
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().clone()
    }
}

#[async_trait::async_trait]
impl NotificationDispatch for RecordingNotifier {
    async fn send(&self, notification: &Notification) -> CollaboratorResult<()> {
        self.sent.lock().push(notification.clone());
        Ok(())
    }
}

/// Notifier that always fails
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingNotifier;

#[async_trait::async_trait]
impl NotificationDispatch for FailingNotifier {
    async fn send(&self, _notification: &Notification) -> CollaboratorResult<()> {
        Err(CollaboratorError::failed("mail relay unavailable"))
    }
}

/// Persistence whose writes can be switched off or slowed down
#[derive(Debug, Default)]
pub struct FlakyPersistence {
    inner: MemoryPersistence,
    failing: AtomicBool,
    delays: Mutex<VecDeque<Duration>>,
}

impl FlakyPersistence {
    pub fn failing() -> Self {
        let store = Self::default();
        store.set_failing(true);
        store
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Queue `delay` before the next write lands
    pub fn delay_next_write(&self, delay: Duration) {
        self.delays.lock().push_back(delay);
    }

    pub fn write_count(&self) -> usize {
        self.inner.write_count()
    }
}

#[async_trait::async_trait]
impl Persistence for FlakyPersistence {
    async fn get(&self, key: &str) -> CollaboratorResult<Option<serde_json::Value>> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: serde_json::Value) -> CollaboratorResult<()> {
        let delay = self.delays.lock().pop_front();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(CollaboratorError::failed("disk full"));
        }
        self.inner.set(key, value).await
    }
}

/// Engine plus handles on its collaborators
pub struct TestEngine<N = RecordingNotifier, P = MemoryPersistence> {
    pub engine: Arc<FormEngine>,
    pub evidence: Arc<MemoryEvidenceStore>,
    pub notifier: Arc<N>,
    pub persistence: Arc<P>,
}

pub fn engine_with<N, P>(config: EngineConfig, notifier: N, persistence: P) -> TestEngine<N, P>
where
    N: NotificationDispatch + 'static,
    P: Persistence + 'static,
{
    let evidence = Arc::new(MemoryEvidenceStore::new());
    let notifier = Arc::new(notifier);
    let persistence = Arc::new(persistence);
    let engine = FormEngine::with_catalog(
        config,
        Arc::new(catalog().clone()),
        evidence.clone(),
        notifier.clone(),
        persistence.clone(),
    )
    .unwrap();
    TestEngine {
        engine: Arc::new(engine),
        evidence,
        notifier,
        persistence,
    }
}

/// Engine with a recording notifier, memory persistence and no autosave
pub fn test_engine() -> TestEngine {
    engine_with(
        EngineConfig::new().with_autosave_period_secs(0),
        RecordingNotifier::new(),
        MemoryPersistence::new(),
    )
}
