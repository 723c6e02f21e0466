//! Events emitted by an editor session to its front end.

use crate::types::{Oid, Selection};

/// Something the front end may want to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The poller observed a new head.
    HeadChanged {
        /// Head observed before this change, if any.
        previous: Option<Oid>,
        /// The new head.
        head: Oid,
    },
    /// A new history list was published.
    HistoryUpdated {
        /// `history[0]`, if the list is non-empty.
        head: Option<Oid>,
        /// Number of entries.
        len: usize,
    },
    /// The history could not be read; the list was cleared.
    HistoryUnavailable {
        /// Why the read failed.
        reason: String,
    },
    /// The history payload failed validation; the list was cleared.
    HistoryCorrupt {
        /// What was wrong with it.
        reason: String,
    },
    /// The selection or the edit gate changed.
    SelectionChanged {
        /// New selection.
        selection: Selection,
        /// Whether the draft is editable.
        editable: bool,
    },
    /// The draft was replaced with snapshot content.
    DraftReset {
        /// The new draft text.
        content: String,
    },
    /// The draft was written to the branch tip.
    Saved,
    /// The store rejected a save; the draft was kept.
    SaveFailed {
        /// Error reported by the store.
        message: String,
    },
}

/// Receives session events.
///
/// Implementors translate `SessionEvent`s into front-end actions
/// (CLI prints, UI refreshes).
pub trait SessionEventHandler: Send + Sync {
    /// Called for every event, in emission order.
    fn on_event(&self, event: SessionEvent);
}

impl<F> SessionEventHandler for F
where
    F: Fn(SessionEvent) + Send + Sync,
{
    fn on_event(&self, event: SessionEvent) {
        self(event)
    }
}

/// Handler that drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct IgnoreEvents;

impl SessionEventHandler for IgnoreEvents {
    fn on_event(&self, _event: SessionEvent) {}
}
