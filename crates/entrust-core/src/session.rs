//! Form sessions
//!
//! A [`FormSession`] is the explicit handle for one open form acted on by
//! one role. Every successful mutation publishes a snapshot for the
//! autosaver; once the role can no longer write, autosave stops.

use crate::autosave::Autosaver;
use crate::engine::FormEngine;
use crate::error::EngineError;
use entrust_catalog::{
    EntrustmentJudgment, Grade, Level, RequirementKey, Section, Specialty, SpecialtyRequirements,
};
use entrust_record::{
    Action, Assessor, CompletionSummary, Countersignature, EvidenceRef, EvidenceSummary,
    FormRecord, FormStatus, RecordError, Role, TransitionKind, TransitionPayload,
};
use std::sync::Arc;
use tokio::sync::watch;

/// One open form
#[derive(Debug)]
pub struct FormSession {
    engine: Arc<FormEngine>,
    record: FormRecord,
    role: Role,
    snapshots: watch::Sender<FormRecord>,
    autosaver: Option<Autosaver>,
}

impl FormSession {
    /// Open a session, starting autosave when enabled and writable
    ///
    /// Autosave needs a tokio runtime; outside one the session still works
    /// but never autosaves.
    #[must_use]
    pub fn open(engine: Arc<FormEngine>, record: FormRecord, role: Role) -> Self {
        let (snapshots, _) = watch::channel(record.clone());
        let mut session = Self {
            engine,
            record,
            role,
            snapshots,
            autosaver: None,
        };
        session.start_autosave(false);
        tracing::info!(
            "Opened form {} as {} ({}, autosave {})",
            session.record.id(),
            role,
            session.record.status(),
            if session.autosaver.is_some() { "on" } else { "off" }
        );
        session
    }

    /// Start the timer if enabled, writable and not already running
    ///
    /// With `pending`, the current snapshot counts as unsaved.
    fn start_autosave(&mut self, pending: bool) {
        if self.autosaver.is_some() || !self.record.permissions(self.role).can_write() {
            return;
        }
        let Some(period) = self.engine.config().autosave_period() else {
            return;
        };
        if tokio::runtime::Handle::try_current().is_err() {
            return;
        }
        let mut receiver = self.snapshots.subscribe();
        if pending {
            receiver.mark_changed();
        }
        self.autosaver = Some(Autosaver::spawn(Arc::clone(&self.engine), receiver, period));
    }

    #[inline]
    #[must_use]
    pub fn record(&self) -> &FormRecord {
        &self.record
    }

    #[inline]
    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    /// Whether the autosave timer is running
    #[must_use]
    pub fn autosave_active(&self) -> bool {
        self.autosaver.as_ref().is_some_and(|a| !a.is_finished())
    }

    /// New receiver of published snapshots
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<FormRecord> {
        self.snapshots.subscribe()
    }

    /// Requirements of the form's current scope
    #[must_use]
    pub fn requirements(&self) -> Option<&SpecialtyRequirements> {
        self.record.requirements(self.engine.catalog())
    }

    #[must_use]
    pub fn completion(&self) -> CompletionSummary {
        self.requirements()
            .map(|req| self.record.completion(req))
            .unwrap_or_default()
    }

    fn publish(&self) {
        self.snapshots.send_replace(self.record.clone());
    }

    fn require(&self, action: Action) -> Result<(), EngineError> {
        self.record
            .permissions(self.role)
            .require(action, self.record.status(), self.role)?;
        Ok(())
    }

    fn apply<T>(
        &mut self,
        op: impl FnOnce(&mut FormRecord, Role) -> Result<T, RecordError>,
    ) -> Result<T, EngineError> {
        let out = op(&mut self.record, self.role)?;
        self.publish();
        Ok(out)
    }

    /// # Errors
    /// As [`FormRecord::set_grade`]; a catalog miss has no criteria
    pub fn set_grade(&mut self, key: RequirementKey, grade: Grade) -> Result<(), EngineError> {
        self.require(Action::Grade)?;
        let engine = Arc::clone(&self.engine);
        let Some(requirements) = self.record.requirements(engine.catalog()) else {
            return Err(RecordError::UnknownCriterion { key }.into());
        };
        self.apply(|r, role| r.set_grade(role, key, grade, requirements))
    }

    /// # Errors
    /// As [`FormRecord::set_comment`]; a catalog miss has no criteria
    pub fn set_comment(
        &mut self,
        key: RequirementKey,
        text: impl Into<String>,
    ) -> Result<(), EngineError> {
        self.require(Action::Comment)?;
        let engine = Arc::clone(&self.engine);
        let Some(requirements) = self.record.requirements(engine.catalog()) else {
            return Err(RecordError::UnknownCriterion { key }.into());
        };
        self.apply(|r, role| r.set_comment(role, key, text, requirements))
    }

    /// Grade the active section "fully meets"
    ///
    /// # Errors
    /// As [`FormRecord::mark_all_yes`]; a catalog miss grades nothing
    pub fn mark_all_yes(&mut self, section: Section) -> Result<usize, EngineError> {
        self.require(Action::Grade)?;
        let engine = Arc::clone(&self.engine);
        let Some(requirements) = self.record.requirements(engine.catalog()) else {
            return Ok(0);
        };
        self.apply(|r, role| r.mark_all_yes(role, section, requirements))
    }

    /// # Errors
    /// As [`FormRecord::link`]
    pub fn link(&mut self, key: RequirementKey, evidence: EvidenceRef) -> Result<bool, EngineError> {
        self.apply(|r, role| r.link(role, key, evidence))
    }

    /// # Errors
    /// As [`FormRecord::unlink`]
    pub fn unlink(&mut self, key: &RequirementKey, evidence: &EvidenceRef) -> Result<bool, EngineError> {
        self.apply(|r, role| r.unlink(role, key, evidence))
    }

    #[must_use]
    pub fn list_linked(&self, key: &RequirementKey) -> Vec<&EvidenceRef> {
        self.record.list_linked(key)
    }

    /// Metadata of a key's linked evidence
    ///
    /// # Errors
    /// As [`FormEngine::linked_evidence`]
    pub async fn linked_evidence(&self, key: &RequirementKey) -> Result<Vec<EvidenceSummary>, EngineError> {
        self.engine.linked_evidence(&self.record, key).await
    }

    /// # Errors
    /// As [`FormRecord::set_narrative`]
    pub fn set_narrative(&mut self, text: impl Into<String>) -> Result<(), EngineError> {
        self.apply(|r, role| r.set_narrative(role, text))
    }

    /// # Errors
    /// As [`FormRecord::set_entrustment`]
    pub fn set_entrustment(&mut self, judgment: Option<EntrustmentJudgment>) -> Result<(), EngineError> {
        self.apply(|r, role| r.set_entrustment(role, judgment))
    }

    /// # Errors
    /// As [`FormRecord::set_assessor`]
    pub fn set_assessor(&mut self, assessor: Assessor) -> Result<(), EngineError> {
        self.apply(|r, role| r.set_assessor(role, assessor))
    }

    /// # Errors
    /// As [`FormRecord::countersign`]
    pub fn countersign(&mut self, countersignature: Countersignature) -> Result<(), EngineError> {
        self.apply(|r, role| r.countersign(role, countersignature))
    }

    /// Change level, returning the (possibly reset) specialty
    ///
    /// # Errors
    /// As [`FormRecord::set_level`]
    pub fn set_level(&mut self, level: Level) -> Result<Specialty, EngineError> {
        let engine = Arc::clone(&self.engine);
        self.apply(|r, role| r.set_level(role, level, engine.catalog()).cloned())
    }

    /// # Errors
    /// As [`FormRecord::set_specialty`]
    pub fn set_specialty(&mut self, specialty: &Specialty) -> Result<(), EngineError> {
        let engine = Arc::clone(&self.engine);
        self.apply(|r, role| r.set_specialty(role, specialty, engine.catalog()))
    }

    /// Save now
    ///
    /// Autosaves still in flight are aborted first, so none lands after
    /// this write; the timer keeps running.
    ///
    /// # Errors
    /// As [`FormEngine::store`]
    pub async fn save(&self) -> Result<(), EngineError> {
        if let Some(autosaver) = &self.autosaver {
            autosaver.settle().await;
        }
        self.engine.store(&self.record).await
    }

    /// Transition the form as this session's role
    ///
    /// Autosave is halted for the duration, in-flight saves included. It
    /// resumes afterwards only while the role can still write.
    ///
    /// # Errors
    /// As [`FormEngine::transition`]
    pub async fn transition(
        &mut self,
        to: FormStatus,
        payload: &TransitionPayload,
    ) -> Result<TransitionKind, EngineError> {
        // an older snapshot landing after the transition's write would undo it
        if let Some(autosaver) = self.autosaver.take() {
            autosaver.halt().await;
        }
        let result = self
            .engine
            .transition(&mut self.record, to, self.role, payload)
            .await;
        if result.is_ok() {
            self.publish();
        }
        self.start_autosave(true);
        if !self.record.permissions(self.role).can_write() {
            tracing::debug!("Form {} read-only for {}, autosave off", self.record.id(), self.role);
        }
        result
    }

    /// Stop autosave and hand back the record
    ///
    /// In-flight saves are not awaited.
    #[must_use]
    pub fn close(mut self) -> FormRecord {
        if let Some(autosaver) = self.autosaver.take() {
            autosaver.stop();
        }
        tracing::info!("Closed form {}", self.record.id());
        self.record
    }
}
