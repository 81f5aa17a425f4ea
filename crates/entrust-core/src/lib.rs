//! Entrust Engine
//!
//! Ties the requirements catalog, form records and progress aggregation to
//! the external collaborators: evidence store, notification dispatch and
//! persistence.
//!
//! # Core Concepts
//!
//! - [`FormEngine`]: Resolves requirements, creates and loads forms, runs transitions
//! - [`FormSession`]: Explicit handle on one open form and one role, with autosave
//! - [`Autosaver`]: Periodic coalescing snapshot saves that never land after a later write
//! - [`EvidenceStore`], [`NotificationDispatch`], [`Persistence`]: Collaborator ports
//! - [`EngineConfig`]: TOML configuration with `ENTRUST_CONFIG` override
//!
//! # Example
//!
//! ```rust,ignore
//! use entrust_core::prelude::*;
//! use std::sync::Arc;
//!
//! let engine = Arc::new(FormEngine::in_memory(EngineConfig::from_env()?)?);
//! let record = engine.create_form(FormType::Epa, Level::new(3)?, &Specialty::named("Oculoplastics"))?;
//!
//! let mut session = engine.open_session(record, Role::Author);
//! session.mark_all_yes(Section::new('A').unwrap())?;
//! session.set_entrustment(Some(EntrustmentJudgment::CompetentToThisLevel))?;
//! session.set_narrative("Ptosis clinic, two lid procedures")?;
//!
//! let payload = TransitionPayload::new().with_assessor(Assessor::new("Dr Okafor", "okafor@example.org"));
//! session.transition(FormStatus::Submitted, &payload).await?;
//! let matrix = engine.progress(&[session.close()]).await?;
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
mod autosave;
mod collaborators;
mod config;
mod engine;
mod error;
mod session;
mod store;
mod telemetry;

// Re-exports
pub use autosave::Autosaver;
pub use collaborators::{
    CollaboratorResult, EvidenceStore, Notification, NotificationDispatch, Persistence,
};
pub use config::{EngineConfig, LoggingConfig, CONFIG_ENV, DEFAULT_AUTOSAVE_SECS};
pub use engine::FormEngine;
pub use error::{CollaboratorError, EngineError, ErrorKind};
pub use session::FormSession;
pub use store::{JsonFilePersistence, MemoryEvidenceStore, MemoryPersistence, TracingNotifier};
pub use telemetry::init_tracing;

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        EngineConfig, EngineError, EvidenceStore, FormEngine, FormSession,
        NotificationDispatch, Persistence,
    };
    pub use entrust_catalog::{
        Catalog, EntrustmentJudgment, FormType, Grade, Level, RequirementKey, Section, Specialty,
    };
    pub use entrust_progress::{CellStatus, ProgressColumn, ProgressMatrix};
    pub use entrust_record::{
        Assessor, Countersignature, EvidenceKind, EvidenceRef, EvidenceSummary, FormId,
        FormRecord, FormStatus, Role, TransitionPayload,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod integration_tests {
    use super::prelude::*;
    use std::sync::Arc;

    fn level(n: u8) -> Level {
        Level::new(n).unwrap()
    }

    #[tokio::test]
    async fn submitted_form_shows_in_progress() {
        let engine = Arc::new(
            FormEngine::in_memory(EngineConfig::new().with_autosave_period_secs(0)).unwrap(),
        );
        let record = engine
            .create_form(FormType::Epa, level(3), &Specialty::named("Glaucoma"))
            .unwrap();

        let mut session = engine.open_session(record, Role::Author);
        assert!(!session.autosave_active());
        session
            .set_entrustment(Some(EntrustmentJudgment::ProgressingTowardsLevel))
            .unwrap();
        session.set_narrative("Trabeculectomy review clinic").unwrap();

        let payload = TransitionPayload::new()
            .with_assessor(Assessor::new("Dr Lin", "lin@example.org"));
        session
            .transition(FormStatus::Submitted, &payload)
            .await
            .unwrap();
        let record = session.close();

        let matrix = engine.progress(&[]).await.unwrap();
        let column = ProgressColumn::Specialty(Specialty::named("Glaucoma"));
        assert_eq!(matrix.status(&column, level(3)), CellStatus::Submitted);
        assert_eq!(record.status(), FormStatus::Submitted);
    }
}
