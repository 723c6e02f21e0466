//! Head change detection by polling.
//!
//! There is no push channel from the store, so the session samples the head
//! pointer on a fixed cadence. `SyncPoller` holds the last observed head and
//! turns each sample into at most one notification: repeated samples of the
//! same OID are suppressed, and a failed read is a silent no-op that leaves
//! the observed value alone. A head whose follow-up work failed can be marked
//! for [`SyncPoller::retry`]; the next sample re-delivers it as a reload
//! rather than a fresh change.

use crate::store::{BranchStore, VersionStore};
use crate::types::Oid;

/// Notification that the branch head moved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadChanged {
    /// Head observed before this sample. Equal to `head` for a reload.
    pub previous: Option<Oid>,
    /// Newly observed head.
    pub head: Oid,
}

impl HeadChanged {
    /// Whether this re-delivers an already reported head for another load.
    pub fn is_reload(&self) -> bool {
        self.previous.as_ref() == Some(&self.head)
    }
}

/// Compare-and-skip observer of the branch head pointer.
#[derive(Debug, Default)]
pub struct SyncPoller {
    last_head: Option<Oid>,
    reload: bool,
}

impl SyncPoller {
    /// A poller that has not observed anything yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Last head this poller reported.
    pub fn last_head(&self) -> Option<&Oid> {
        self.last_head.as_ref()
    }

    /// Record a sampled head. Returns a notification only if it differs from
    /// the last observed one, or if that head is waiting on a retry.
    pub fn observe(&mut self, head: Oid) -> Option<HeadChanged> {
        if self.last_head.as_ref() == Some(&head) {
            if !std::mem::take(&mut self.reload) {
                return None;
            }
            return Some(HeadChanged {
                previous: Some(head.clone()),
                head,
            });
        }
        self.reload = false;
        let previous = self.last_head.replace(head.clone());
        Some(HeadChanged { previous, head })
    }

    /// Sample the head once.
    ///
    /// The observed value is only updated after the read completes, so
    /// dropping this future mid-read leaves the poller untouched.
    pub async fn tick<S: VersionStore>(&mut self, branch: &BranchStore<S>) -> Option<HeadChanged> {
        match branch.read_head().await {
            Ok(head) => {
                let change = self.observe(head);
                match &change {
                    Some(c) if c.is_reload() => {
                        log::debug!("[SyncPoller] Retrying head {}", c.head.short())
                    }
                    Some(c) => log::info!(
                        "[SyncPoller] Head moved {} -> {}",
                        c.previous.as_ref().map(Oid::short).unwrap_or("(none)"),
                        c.head.short()
                    ),
                    None => log::trace!("[SyncPoller] Head unchanged"),
                }
                change
            }
            Err(e) => {
                log::debug!("[SyncPoller] Head read failed, skipping tick: {}", e);
                None
            }
        }
    }

    /// Ask for `head` to be delivered again on the next sample.
    ///
    /// Used when the work triggered by a notification could not be completed.
    /// Ignored if the poller has since moved on to another head.
    pub fn retry(&mut self, head: &Oid) {
        if self.last_head.as_ref() == Some(head) {
            self.reload = true;
        }
    }
}
