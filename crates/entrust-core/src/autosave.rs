//! Periodic autosave
//!
//! An [`Autosaver`] watches a session's snapshot channel and, on every tick,
//! saves the latest snapshot if one arrived since the previous save. Each
//! save runs on its own task in a [`JoinSet`] owned by the timer, so a slow
//! write never holds up ticks. [`Autosaver::settle`] and
//! [`Autosaver::halt`] abort and reap those tasks before returning; after
//! either, no older snapshot can land on top of a later write.

use crate::engine::FormEngine;
use entrust_record::FormRecord;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;

#[derive(Debug)]
enum Command {
    Settle(oneshot::Sender<()>),
    Halt,
}

/// Handle to a running autosave timer; dropping it stops the timer
#[derive(Debug)]
pub struct Autosaver {
    handle: JoinHandle<()>,
    commands: mpsc::UnboundedSender<Command>,
}

impl Autosaver {
    /// Start ticking every `period`
    ///
    /// Must be called within a tokio runtime.
    #[must_use]
    pub fn spawn(
        engine: Arc<FormEngine>,
        mut snapshots: watch::Receiver<FormRecord>,
        period: Duration,
    ) -> Self {
        let (commands, mut inbox) = mpsc::unbounded_channel();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // first tick completes immediately
            ticker.tick().await;

            let mut saves = JoinSet::new();
            loop {
                tokio::select! {
                    command = inbox.recv() => match command {
                        Some(Command::Settle(done)) => {
                            saves.shutdown().await;
                            let _ = done.send(());
                        }
                        Some(Command::Halt) | None => break,
                    },
                    Some(joined) = saves.join_next(), if !saves.is_empty() => {
                        if let Err(e) = joined {
                            if e.is_panic() {
                                tracing::warn!("Autosave task panicked: {}", e);
                            }
                        }
                    }
                    _ = ticker.tick() => {
                        match snapshots.has_changed() {
                            Ok(true) => {}
                            Ok(false) => continue,
                            Err(_) => break,
                        }
                        let snapshot = snapshots.borrow_and_update().clone();
                        let engine = Arc::clone(&engine);
                        saves.spawn(async move {
                            match engine.persist(&snapshot).await {
                                Ok(()) => tracing::debug!("Autosaved form {}", snapshot.id()),
                                Err(e) => tracing::warn!("Autosave of form {} failed: {}", snapshot.id(), e),
                            }
                        });
                    }
                }
            }
            saves.shutdown().await;
            tracing::debug!("Autosave stopped");
        });
        Self { handle, commands }
    }

    /// Abort and reap in-flight saves; the timer keeps running
    pub async fn settle(&self) {
        let (done, settled) = oneshot::channel();
        if self.commands.send(Command::Settle(done)).is_ok() {
            let _ = settled.await;
        }
    }

    /// Stop the timer once in-flight saves are aborted and reaped
    pub async fn halt(mut self) {
        let _ = self.commands.send(Command::Halt);
        if let Err(e) = (&mut self.handle).await {
            if e.is_panic() {
                tracing::warn!("Autosave timer panicked: {}", e);
            }
        }
    }

    /// Stop the timer at once; in-flight saves are aborted, not awaited
    pub fn stop(self) {
        drop(self);
    }

    /// Whether the timer task has ended
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for Autosaver {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
