//! Form engine
//!
//! The produced surface of the core: requirement resolution, form creation
//! and loading, lifecycle transitions with notification dispatch, evidence
//! resolution and progress computation.
//!
//! Transitions run in a fixed order: guards, then dispatch, then
//! persistence, then the in-memory commit. Any failure leaves the caller's
//! record at its prior status.

use crate::collaborators::{EvidenceStore, Notification, NotificationDispatch, Persistence};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::session::FormSession;
use crate::store::{MemoryEvidenceStore, MemoryPersistence, TracingNotifier};
use entrust_catalog::{Catalog, FormType, Level, RequirementKey, Specialty, SpecialtyRequirements};
use entrust_progress::{compute_progress, ProgressAggregator, ProgressMatrix};
use entrust_record::{
    EvidenceRef, EvidenceSummary, FormId, FormRecord, FormStatus, Role, TransitionKind,
    TransitionPayload,
};
use std::sync::Arc;

/// Requirements & evidence engine
pub struct FormEngine {
    config: EngineConfig,
    catalog: Arc<Catalog>,
    aggregator: ProgressAggregator,
    evidence: Arc<dyn EvidenceStore>,
    notifier: Arc<dyn NotificationDispatch>,
    persistence: Arc<dyn Persistence>,
}

impl std::fmt::Debug for FormEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormEngine")
            .field("config", &self.config)
            .field("columns", &self.aggregator.columns().len())
            .finish_non_exhaustive()
    }
}

impl FormEngine {
    /// Create engine with the catalog named by `config`
    ///
    /// # Errors
    /// Returns [`EngineError`] if the catalog or aggregator cannot be built
    pub fn new(
        config: EngineConfig,
        evidence: Arc<dyn EvidenceStore>,
        notifier: Arc<dyn NotificationDispatch>,
        persistence: Arc<dyn Persistence>,
    ) -> Result<Self, EngineError> {
        let catalog = config.load_catalog()?;
        Self::with_catalog(config, catalog, evidence, notifier, persistence)
    }

    /// Create engine over an explicit catalog
    ///
    /// # Errors
    /// Returns [`EngineError::Progress`] if the aggregator cannot be built
    pub fn with_catalog(
        config: EngineConfig,
        catalog: Arc<Catalog>,
        evidence: Arc<dyn EvidenceStore>,
        notifier: Arc<dyn NotificationDispatch>,
        persistence: Arc<dyn Persistence>,
    ) -> Result<Self, EngineError> {
        let aggregator = ProgressAggregator::from_catalog(&catalog, &config.fuzzy_specialties)?;
        tracing::info!(
            "Engine ready: {} progress columns, autosave {:?}",
            aggregator.columns().len(),
            config.autosave_period()
        );
        Ok(Self {
            config,
            catalog,
            aggregator,
            evidence,
            notifier,
            persistence,
        })
    }

    /// Engine over in-memory adapters and a logging notifier
    ///
    /// # Errors
    /// Returns [`EngineError`] if the catalog cannot be loaded
    pub fn in_memory(config: EngineConfig) -> Result<Self, EngineError> {
        Self::new(
            config,
            Arc::new(MemoryEvidenceStore::new()),
            Arc::new(TracingNotifier),
            Arc::new(MemoryPersistence::new()),
        )
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[inline]
    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    #[inline]
    #[must_use]
    pub fn aggregator(&self) -> &ProgressAggregator {
        &self.aggregator
    }

    /// Requirements for a (level, specialty) pair, `None` on a catalog miss
    #[must_use]
    pub fn resolve_requirements(
        &self,
        form_type: FormType,
        level: Level,
        specialty: &Specialty,
    ) -> Option<&SpecialtyRequirements> {
        let found = self
            .catalog
            .domain(form_type)
            .and_then(|d| d.resolve(level, specialty));
        if found.is_none() {
            tracing::debug!("No requirements for {} {} '{}'", form_type, level, specialty);
        }
        found
    }

    /// Create a new draft form
    ///
    /// # Errors
    /// Returns [`EngineError::Record`] when the catalog has no entries at
    /// `level`
    pub fn create_form(
        &self,
        form_type: FormType,
        level: Level,
        specialty: &Specialty,
    ) -> Result<FormRecord, EngineError> {
        let record = FormRecord::open(form_type, level, specialty, &self.catalog)?;
        tracing::info!(
            "Created {} form {} at {} '{}'",
            form_type,
            record.id(),
            level,
            record.specialty()
        );
        Ok(record)
    }

    /// Persistence key of a form
    #[must_use]
    pub fn form_key(&self, id: FormId) -> String {
        format!("{}/form/{}", self.config.persistence_namespace, id)
    }

    /// Load a persisted form
    ///
    /// # Errors
    /// [`EngineError::FormNotFound`] when nothing is stored under the id,
    /// [`EngineError::Dispatch`] when persistence fails
    pub async fn load_form(&self, id: FormId) -> Result<FormRecord, EngineError> {
        let key = self.form_key(id);
        let value = self
            .persistence
            .get(&key)
            .await
            .map_err(|e| EngineError::dispatch("persistence read", e))?
            .ok_or(EngineError::FormNotFound(id))?;
        Ok(serde_json::from_value(value)?)
    }

    /// Write a form snapshot to persistence only
    ///
    /// # Errors
    /// Returns [`EngineError::Dispatch`] when persistence fails
    pub async fn persist(&self, record: &FormRecord) -> Result<(), EngineError> {
        let value = serde_json::to_value(record)?;
        self.persistence
            .set(&self.form_key(record.id()), value)
            .await
            .map_err(|e| EngineError::dispatch("persistence write", e))
    }

    /// Write a form snapshot and publish its evidence summary
    ///
    /// # Errors
    /// Returns [`EngineError::Dispatch`] when either collaborator fails
    pub async fn store(&self, record: &FormRecord) -> Result<(), EngineError> {
        self.persist(record).await?;
        self.evidence
            .upsert(record.summary())
            .await
            .map_err(|e| EngineError::dispatch("evidence upsert", e))?;
        Ok(())
    }

    /// Move a form to `to` as `role`
    ///
    /// Submission dispatches a notification to the approver first; the
    /// record only changes once dispatch and persistence both succeed.
    ///
    /// # Errors
    /// Validation and illegal-transition errors from the record, or
    /// [`EngineError::Dispatch`] when a collaborator fails
    pub async fn transition(
        &self,
        record: &mut FormRecord,
        to: FormStatus,
        role: Role,
        payload: &TransitionPayload,
    ) -> Result<TransitionKind, EngineError> {
        let plan = match record.plan_transition(to, role, payload) {
            Ok(plan) => plan,
            Err(e) => {
                tracing::info!("Transition of {} to {} refused: {}", record.id(), to, e);
                return Err(e.into());
            }
        };

        if plan.kind().dispatches() {
            let notification = Notification {
                evidence_id: record.id().into(),
                recipient: plan.assessor().email.clone(),
                form_type: record.form_type(),
            };
            if let Err(e) = self.notifier.send(&notification).await {
                tracing::warn!("Notification for {} failed: {}", record.id(), e);
                return Err(EngineError::dispatch("notification", e));
            }
        }

        let next = record.with_plan(&plan)?;
        if let Err(e) = self.store(&next).await {
            tracing::warn!("Persisting transition of {} failed: {}", record.id(), e);
            return Err(e);
        }
        *record = next;

        tracing::info!(
            "Form {} moved {} -> {} by {} ({:?})",
            record.id(),
            plan.from(),
            plan.to(),
            role,
            plan.kind()
        );
        Ok(plan.kind())
    }

    /// Load, transition and return a persisted form
    ///
    /// # Errors
    /// As [`FormEngine::load_form`] and [`FormEngine::transition`]
    pub async fn transition_form(
        &self,
        id: FormId,
        to: FormStatus,
        role: Role,
        payload: &TransitionPayload,
    ) -> Result<FormRecord, EngineError> {
        let mut record = self.load_form(id).await?;
        self.transition(&mut record, to, role, payload).await?;
        Ok(record)
    }

    /// Metadata of a key's linked evidence; dangling refs are skipped
    ///
    /// # Errors
    /// Returns [`EngineError::Dispatch`] when the evidence store fails
    pub async fn linked_evidence(
        &self,
        record: &FormRecord,
        key: &RequirementKey,
    ) -> Result<Vec<EvidenceSummary>, EngineError> {
        let mut found = Vec::new();
        for id in record.list_linked(key) {
            match self
                .evidence
                .find(id)
                .await
                .map_err(|e| EngineError::dispatch("evidence lookup", e))?
            {
                Some(summary) => found.push(summary),
                None => tracing::warn!("Linked evidence {} on {} no longer exists", id, key),
            }
        }
        Ok(found)
    }

    /// Add or replace an evidence item
    ///
    /// # Errors
    /// Returns [`EngineError::Dispatch`] when the evidence store fails
    pub async fn upsert_evidence(&self, summary: EvidenceSummary) -> Result<EvidenceRef, EngineError> {
        self.evidence
            .upsert(summary)
            .await
            .map_err(|e| EngineError::dispatch("evidence upsert", e))
    }

    /// Delete an evidence item; links to it become dangling
    ///
    /// # Errors
    /// Returns [`EngineError::Dispatch`] when the evidence store fails
    pub async fn delete_evidence(&self, id: &EvidenceRef) -> Result<bool, EngineError> {
        self.evidence
            .delete(id)
            .await
            .map_err(|e| EngineError::dispatch("evidence delete", e))
    }

    /// Progress over explicit collections
    #[must_use]
    pub fn compute_progress(
        &self,
        records: &[FormRecord],
        evidence: &[EvidenceSummary],
    ) -> ProgressMatrix {
        compute_progress(&self.aggregator, records, evidence)
    }

    /// Progress over the evidence store, with open forms taking precedence
    ///
    /// # Errors
    /// Returns [`EngineError::Dispatch`] when the evidence store fails
    pub async fn progress(&self, open: &[FormRecord]) -> Result<ProgressMatrix, EngineError> {
        let evidence = self
            .evidence
            .list()
            .await
            .map_err(|e| EngineError::dispatch("evidence list", e))?;
        Ok(self.compute_progress(open, &evidence))
    }

    /// Open an editing session on a record
    #[must_use]
    pub fn open_session(self: &Arc<Self>, record: FormRecord, role: Role) -> FormSession {
        FormSession::open(Arc::clone(self), record, role)
    }

    /// Load a persisted form into a session
    ///
    /// # Errors
    /// As [`FormEngine::load_form`]
    pub async fn resume_session(
        self: &Arc<Self>,
        id: FormId,
        role: Role,
    ) -> Result<FormSession, EngineError> {
        let record = self.load_form(id).await?;
        Ok(self.open_session(record, role))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use entrust_catalog::Section;

    fn engine() -> FormEngine {
        FormEngine::in_memory(EngineConfig::default()).unwrap()
    }

    fn level(n: u8) -> Level {
        Level::new(n).unwrap()
    }

    #[test]
    fn resolves_generic_at_level_one() {
        let engine = engine();
        let req = engine
            .resolve_requirements(FormType::Epa, level(1), &Specialty::named("Glaucoma"))
            .unwrap();
        assert!(req.specialty.is_generic());
    }

    #[test]
    fn form_keys_are_namespaced() {
        let engine = FormEngine::in_memory(EngineConfig::new().with_persistence_namespace("t1")).unwrap();
        let id = FormId::new();
        assert_eq!(engine.form_key(id), format!("t1/form/{id}"));
    }

    #[tokio::test]
    async fn persisted_form_reloads() {
        let engine = engine();
        let mut record = engine
            .create_form(FormType::Epa, level(3), &Specialty::named("Cataract"))
            .unwrap();
        let key = record.scope().criterion(Section::new('B').unwrap(), 0);
        record.link(Role::Author, key.clone(), "ev1".into()).unwrap();
        engine.persist(&record).await.unwrap();

        let loaded = engine.load_form(record.id()).await.unwrap();
        assert_eq!(loaded, record);
        assert!(matches!(
            engine.load_form(FormId::new()).await,
            Err(EngineError::FormNotFound(_))
        ));
    }
}
