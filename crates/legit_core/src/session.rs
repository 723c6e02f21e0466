//! Editor session: the async shell around the checkout state machine.
//!
//! `EditorSession` owns a branch-bound store handle, a [`SyncPoller`] and a
//! [`CheckoutController`]. It runs the store round-trips the controller asks
//! for and feeds the results back in, one publish per completed unit of work.
//!
//! - Controller state sits behind a single `tokio::sync::Mutex` that is never
//!   held across store I/O.
//! - Every store await races the session's `CancellationToken`; work that
//!   loses the race returns without touching state.
//! - History loads are numbered. A load that completes after a newer one has
//!   been published is dropped.
//! - After a save the new head is adopted only once a poll observes it.
//!
//! # Usage
//!
//! ```ignore
//! use legit_core::{config::LegitConfig, session::EditorSession, store::MemoryStore};
//!
//! let config = LegitConfig::default();
//! let store = Arc::new(MemoryStore::new(config.paths()));
//! let session = Arc::new(
//!     EditorSession::new(store, &config).with_handler(|event| println!("{event:?}")),
//! );
//!
//! tokio::spawn({
//!     let session = Arc::clone(&session);
//!     async move { session.run().await }
//! });
//!
//! session.append("!!").await;
//! session.save().await?;
//! session.cancel();
//! ```

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::checkout::{CheckoutAction, CheckoutController, CheckoutEvent};
use crate::config::LegitConfig;
use crate::error::{LegitError, Result};
use crate::events::{IgnoreEvents, SessionEvent, SessionEventHandler};
use crate::history::{HistoryLoad, HistoryLoader};
use crate::poller::{HeadChanged, SyncPoller};
use crate::store::{BranchStore, VersionStore};
use crate::types::{EnrichedCommit, Oid, Selection};

/// Result of [`EditorSession::save`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The draft was written to the branch tip.
    Saved,
    /// The selection is not the head (or a save is already in flight); no
    /// write was issued.
    Rejected,
}

/// Point-in-time copy of the session state for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    /// Published history, newest first.
    pub history: Vec<EnrichedCommit>,
    /// `history[0]`, if any.
    pub head: Option<Oid>,
    /// Current selection.
    pub selection: Selection,
    /// Whether the draft accepts edits.
    pub editable: bool,
    /// Current draft text.
    pub draft: String,
    /// Whether the draft has unsaved changes.
    pub dirty: bool,
    /// Whether a save is waiting on the store.
    pub save_in_flight: bool,
}

struct SessionState {
    controller: CheckoutController,
    /// Sequence number of the last history load that was applied.
    published_seq: u64,
}

/// A single-document editor bound to one branch of a version store.
pub struct EditorSession<S: VersionStore> {
    branch: BranchStore<S>,
    state: Mutex<SessionState>,
    poller: Mutex<SyncPoller>,
    load_seq: AtomicU64,
    handler: Arc<dyn SessionEventHandler>,
    cancel: CancellationToken,
    poll_interval: Duration,
}

impl<S: VersionStore> EditorSession<S> {
    /// Create a session over `store` using the branch, file, cadence and
    /// policies from `config`.
    pub fn new(store: Arc<S>, config: &LegitConfig) -> Self {
        Self {
            branch: BranchStore::new(store, config.paths()),
            state: Mutex::new(SessionState {
                controller: CheckoutController::new(config.on_head_advance, config.draft_refresh),
                published_seq: 0,
            }),
            poller: Mutex::new(SyncPoller::new()),
            load_seq: AtomicU64::new(0),
            handler: Arc::new(IgnoreEvents),
            cancel: CancellationToken::new(),
            poll_interval: config.poll_interval(),
        }
    }

    /// Route session events to `handler` (builder pattern).
    pub fn with_handler(mut self, handler: impl SessionEventHandler + 'static) -> Self {
        self.handler = Arc::new(handler);
        self
    }

    /// The branch-bound store handle.
    pub fn branch(&self) -> &BranchStore<S> {
        &self.branch
    }

    /// Token that tears the session down when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Stop the poll loop and discard any in-flight results.
    pub fn cancel(&self) {
        log::debug!("[EditorSession] Cancelling");
        self.cancel.cancel();
    }

    /// Poll the head on the configured cadence until cancelled.
    ///
    /// The first poll runs immediately.
    pub async fn run(&self) {
        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        log::info!(
            "[EditorSession] Polling {} every {:?}",
            self.branch.paths().head().display(),
            self.poll_interval
        );

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = interval.tick() => {
                    self.poll_once().await;
                }
            }
        }
        log::info!("[EditorSession] Poll loop exited");
    }

    /// Run one poller tick; on a head change, load and publish the history.
    ///
    /// Returns the observed change, if any, including reloads of a head whose
    /// last load failed. Read failures are logged and treated as "no change".
    pub async fn poll_once(&self) -> Option<HeadChanged> {
        let change = {
            let mut poller = self.poller.lock().await;
            self.cancellable(poller.tick(&self.branch)).await.ok()??
        };
        if !change.is_reload() {
            self.emit(SessionEvent::HeadChanged {
                previous: change.previous.clone(),
                head: change.head.clone(),
            });
        }
        self.refresh(&change.head).await;
        Some(change)
    }

    /// Select a published commit.
    pub async fn checkout(&self, oid: &Oid) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(LegitError::Cancelled);
        }
        let actions = {
            let mut state = self.state.lock().await;
            if state.controller.find(oid).is_none() {
                return Err(LegitError::UnknownCommit(oid.clone()));
            }
            state.controller.apply(CheckoutEvent::Select(oid.clone()))
        };
        self.dispatch(actions);
        Ok(())
    }

    /// Replace the draft. Returns `false` when the selection is read-only.
    pub async fn edit(&self, text: &str) -> bool {
        self.mutate(CheckoutEvent::Edit(text.to_string())).await
    }

    /// Append to the draft. Returns `false` when the selection is read-only.
    pub async fn append(&self, text: &str) -> bool {
        self.mutate(CheckoutEvent::Append(text.to_string())).await
    }

    /// Write the draft to the branch tip.
    ///
    /// Off-head saves are rejected without touching the store. A store
    /// failure is returned as an error and the draft is kept.
    pub async fn save(&self) -> Result<SaveOutcome> {
        if self.cancel.is_cancelled() {
            return Err(LegitError::Cancelled);
        }
        let actions = self.state.lock().await.controller.apply(CheckoutEvent::SaveRequested);
        let Some(text) = self.dispatch(actions) else {
            return Ok(SaveOutcome::Rejected);
        };

        let written = self.cancellable(self.branch.write_tip(&text)).await?;
        let (event, result) = match written {
            Ok(()) => {
                log::info!("[EditorSession] Saved {} bytes", text.len());
                (CheckoutEvent::SaveCompleted, Ok(SaveOutcome::Saved))
            }
            Err(e) => {
                log::error!("[EditorSession] Save failed: {}", e);
                (CheckoutEvent::SaveFailed(e.to_string()), Err(e))
            }
        };
        let actions = self.state.lock().await.controller.apply(event);
        self.dispatch(actions);

        if result.is_ok() {
            self.poll_once().await;
        }
        result
    }

    /// Copy of the current state.
    pub async fn snapshot(&self) -> SessionSnapshot {
        let state = self.state.lock().await;
        let controller = &state.controller;
        SessionSnapshot {
            history: controller.history().to_vec(),
            head: controller.head().cloned(),
            selection: controller.selection().clone(),
            editable: controller.can_edit(),
            draft: controller.editor().text().to_string(),
            dirty: controller.editor().is_dirty(),
            save_in_flight: controller.save_in_flight(),
        }
    }

    async fn mutate(&self, event: CheckoutEvent) -> bool {
        let mut state = self.state.lock().await;
        let accepted = state.controller.can_edit();
        let actions = state.controller.apply(event);
        drop(state);
        self.dispatch(actions);
        accepted
    }

    /// Load the history for `observed` and publish it if it is still current.
    async fn refresh(&self, observed: &Oid) {
        let seq = self.load_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let Ok(load) = self.cancellable(HistoryLoader::new(&self.branch).load()).await else {
            return;
        };

        let event = match load {
            HistoryLoad::Loaded(entries) => {
                let loaded = entries.first().map(|entry| entry.oid().clone());
                if loaded.as_ref() != Some(observed) && !self.reconcile(observed, loaded).await {
                    return;
                }
                CheckoutEvent::HistoryLoaded(entries)
            }
            HistoryLoad::Unavailable(reason) => {
                self.poller.lock().await.retry(observed);
                self.emit(SessionEvent::HistoryUnavailable { reason });
                CheckoutEvent::HistoryCleared
            }
            HistoryLoad::Corrupt(reason) => {
                self.poller.lock().await.retry(observed);
                self.emit(SessionEvent::HistoryCorrupt { reason });
                CheckoutEvent::HistoryCleared
            }
        };

        let actions = {
            let mut state = self.state.lock().await;
            if self.cancel.is_cancelled() {
                return;
            }
            if seq < state.published_seq {
                log::debug!(
                    "[EditorSession] Dropping stale history load #{} (published #{})",
                    seq,
                    state.published_seq
                );
                return;
            }
            state.published_seq = seq;
            state.controller.apply(event)
        };
        self.dispatch(actions);
    }

    /// The loaded history does not start at the observed head. Re-read the
    /// head once: if it now matches the history, record it as observed and
    /// publish; otherwise drop the load and retry on the next tick.
    async fn reconcile(&self, observed: &Oid, loaded: Option<Oid>) -> bool {
        let current = match self.cancellable(self.branch.read_head()).await {
            Ok(Ok(head)) => head,
            Ok(Err(e)) => {
                log::debug!("[EditorSession] Head re-read failed: {}", e);
                self.poller.lock().await.retry(observed);
                return false;
            }
            Err(_) => return false,
        };

        if loaded.as_ref() != Some(&current) {
            log::warn!(
                "[EditorSession] History head {} does not match head {}, retrying",
                loaded.as_ref().map(Oid::short).unwrap_or("(empty)"),
                current.short()
            );
            self.poller.lock().await.retry(observed);
            return false;
        }

        let change = self.poller.lock().await.observe(current);
        if let Some(change) = change.filter(|change| !change.is_reload()) {
            self.emit(SessionEvent::HeadChanged {
                previous: change.previous,
                head: change.head,
            });
        }
        true
    }

    /// Forward emitted events to the handler. Returns the text of a
    /// `WriteTip` action, if there was one.
    fn dispatch(&self, actions: Vec<CheckoutAction>) -> Option<String> {
        let mut write = None;
        for action in actions {
            match action {
                CheckoutAction::Emit(event) => self.emit(event),
                CheckoutAction::WriteTip(text) => write = Some(text),
            }
        }
        write
    }

    fn emit(&self, event: SessionEvent) {
        self.handler.on_event(event);
    }

    async fn cancellable<T>(&self, fut: impl Future<Output = T>) -> Result<T> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(LegitError::Cancelled),
            out = fut => Ok(out),
        }
    }
}

impl<S: VersionStore> std::fmt::Debug for EditorSession<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorSession")
            .field("paths", self.branch.paths())
            .field("poll_interval", &self.poll_interval)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}
