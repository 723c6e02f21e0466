//! Checkout state machine.
//!
//! `CheckoutController` owns the published history, the selection and the
//! draft buffer, and changes them only through [`CheckoutController::apply`].
//! Store I/O stays outside: `apply` returns [`CheckoutAction`]s for the
//! session to execute, and the session feeds completions back in as events.
//!
//! ```text
//!   HistoryLoaded ──┐
//!   HistoryCleared ─┤
//!   Select(oid) ────┤                         ┌─► WriteTip(text)
//!   Edit / Append ──┼─► CheckoutController ───┤
//!   SaveRequested ──┤     apply(event)        └─► Emit(SessionEvent)
//!   SaveCompleted ──┤
//!   SaveFailed ─────┘
//! ```
//!
//! Editing is a derived predicate, not a state: the draft is editable exactly
//! when the selection equals `history[0]`. `apply` re-derives the flag at the
//! end of every transition.

use crate::config::{DraftRefreshPolicy, HeadAdvancePolicy};
use crate::editor::EditorState;
use crate::events::SessionEvent;
use crate::types::{EnrichedCommit, Oid, Selection};

/// Inputs to the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutEvent {
    /// A fully enriched history list is ready to publish.
    HistoryLoaded(Vec<EnrichedCommit>),
    /// The history could not be loaded; publish an empty list.
    HistoryCleared,
    /// The user picked a commit.
    Select(Oid),
    /// The user replaced the draft text.
    Edit(String),
    /// The user appended to the draft.
    Append(String),
    /// The user asked to save the draft.
    SaveRequested,
    /// The store accepted the write issued for the last save.
    SaveCompleted,
    /// The store rejected the write issued for the last save.
    SaveFailed(String),
}

/// Work for the session to carry out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutAction {
    /// Write this text to the branch tip, then report back with
    /// `SaveCompleted` or `SaveFailed`.
    WriteTip(String),
    /// Forward to the session's event handler.
    Emit(SessionEvent),
}

/// Selection, history and draft, updated by one transition function.
#[derive(Debug, Default)]
pub struct CheckoutController {
    on_head_advance: HeadAdvancePolicy,
    draft_refresh: DraftRefreshPolicy,
    history: Vec<EnrichedCommit>,
    /// Head of the last non-empty history, kept across a cleared history so
    /// a selection that tracked it is still recognised on the next load.
    followed_head: Option<Oid>,
    selection: Selection,
    editor: EditorState,
    pending_save: Option<PendingSave>,
}

/// A tip write that has been issued and not yet acknowledged.
#[derive(Debug)]
struct PendingSave {
    text: String,
    /// Head the draft was written on top of.
    base: Oid,
}

impl CheckoutController {
    /// Empty controller with the given policies.
    pub fn new(on_head_advance: HeadAdvancePolicy, draft_refresh: DraftRefreshPolicy) -> Self {
        Self {
            on_head_advance,
            draft_refresh,
            ..Self::default()
        }
    }

    /// `history[0]`, if any history is published.
    pub fn head(&self) -> Option<&Oid> {
        self.history.first().map(EnrichedCommit::oid)
    }

    /// Current selection.
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Published history, newest first.
    pub fn history(&self) -> &[EnrichedCommit] {
        &self.history
    }

    /// Whether the selection is the published head.
    pub fn can_edit(&self) -> bool {
        self.head().is_some_and(|head| self.selection.is(head))
    }

    /// The draft buffer.
    pub fn editor(&self) -> &EditorState {
        &self.editor
    }

    /// Look up a published commit.
    pub fn find(&self, oid: &Oid) -> Option<&EnrichedCommit> {
        self.history.iter().find(|entry| entry.oid() == oid)
    }

    /// Whether a write has been issued and not yet reported back.
    pub fn save_in_flight(&self) -> bool {
        self.pending_save.is_some()
    }

    /// Apply one event and return the resulting actions.
    pub fn apply(&mut self, event: CheckoutEvent) -> Vec<CheckoutAction> {
        let before = (self.selection.clone(), self.can_edit());

        let mut actions = match event {
            CheckoutEvent::HistoryLoaded(entries) => self.handle_history_loaded(entries),
            CheckoutEvent::HistoryCleared => self.handle_history_cleared(),
            CheckoutEvent::Select(oid) => self.handle_select(oid),
            CheckoutEvent::Edit(text) => {
                self.handle_mutation(|editor| editor.edit(&text));
                Vec::new()
            }
            CheckoutEvent::Append(text) => {
                self.handle_mutation(|editor| editor.push_str(&text));
                Vec::new()
            }
            CheckoutEvent::SaveRequested => self.handle_save_requested(),
            CheckoutEvent::SaveCompleted => self.handle_save_completed(),
            CheckoutEvent::SaveFailed(message) => self.handle_save_failed(message),
        };

        let editable = self.can_edit();
        self.editor.set_editable(editable);
        if before != (self.selection.clone(), editable) {
            actions.push(CheckoutAction::Emit(SessionEvent::SelectionChanged {
                selection: self.selection.clone(),
                editable,
            }));
        }
        actions
    }

    fn handle_history_loaded(&mut self, entries: Vec<EnrichedCommit>) -> Vec<CheckoutAction> {
        let previous_head = self.followed_head.clone();
        self.history = entries;
        let mut actions = vec![CheckoutAction::Emit(SessionEvent::HistoryUpdated {
            head: self.head().cloned(),
            len: self.history.len(),
        })];

        let Some(head) = self.history.first() else {
            return actions;
        };
        let head_oid = head.oid().clone();
        let head_content = head.new_content.clone();
        self.followed_head = Some(head_oid.clone());

        match self.selection.clone() {
            Selection::Unset => {
                log::debug!("[Checkout] Selecting head {}", head_oid.short());
                self.selection = Selection::Commit(head_oid);
                actions.extend(self.refresh_draft(&head_content));
            }
            Selection::Commit(selected) if selected == head_oid => {}
            Selection::Commit(selected) if previous_head.as_ref() == Some(&selected) => {
                log::debug!(
                    "[Checkout] Following head {} -> {}",
                    selected.short(),
                    head_oid.short()
                );
                self.selection = Selection::Commit(head_oid);
                actions.extend(self.refresh_draft(&head_content));
            }
            Selection::Commit(selected) => {
                let pinned = self.on_head_advance == HeadAdvancePolicy::Pin
                    && self.find(&selected).is_some();
                if !pinned {
                    log::debug!(
                        "[Checkout] Moving selection {} to head {}",
                        selected.short(),
                        head_oid.short()
                    );
                    self.selection = Selection::Commit(head_oid);
                    self.editor.load(&head_content, false);
                    actions.push(CheckoutAction::Emit(SessionEvent::DraftReset {
                        content: head_content,
                    }));
                }
            }
        }
        actions
    }

    fn handle_history_cleared(&mut self) -> Vec<CheckoutAction> {
        if self.history.is_empty() {
            return Vec::new();
        }
        log::debug!("[Checkout] Clearing {} history entries", self.history.len());
        self.history.clear();
        vec![CheckoutAction::Emit(SessionEvent::HistoryUpdated {
            head: None,
            len: 0,
        })]
    }

    fn handle_select(&mut self, oid: Oid) -> Vec<CheckoutAction> {
        let Some(entry) = self.find(&oid) else {
            log::debug!("[Checkout] Ignoring checkout of unknown commit {}", oid.short());
            return Vec::new();
        };
        let content = entry.new_content.clone();
        log::debug!("[Checkout] Checking out {}", oid.short());
        self.selection = Selection::Commit(oid);
        self.editor.load(&content, false);
        vec![CheckoutAction::Emit(SessionEvent::DraftReset { content })]
    }

    fn handle_mutation(&mut self, mutate: impl FnOnce(&mut EditorState) -> bool) {
        if !mutate(&mut self.editor) {
            log::debug!(
                "[Checkout] Ignoring edit, selection {} is read-only",
                self.selection
            );
        }
    }

    fn handle_save_requested(&mut self) -> Vec<CheckoutAction> {
        if !self.can_edit() {
            log::debug!(
                "[Checkout] Rejecting save, selection {} is not the head",
                self.selection
            );
            return Vec::new();
        }
        if self.pending_save.is_some() {
            log::debug!("[Checkout] Rejecting save, a write is already in flight");
            return Vec::new();
        }
        let Some(base) = self.head().cloned() else {
            return Vec::new();
        };
        let text = self.editor.text().to_string();
        self.pending_save = Some(PendingSave {
            text: text.clone(),
            base,
        });
        vec![CheckoutAction::WriteTip(text)]
    }

    fn handle_save_completed(&mut self) -> Vec<CheckoutAction> {
        let Some(pending) = self.pending_save.take() else {
            return Vec::new();
        };
        if self.head() == Some(&pending.base) {
            // The new head is adopted once a load observes it.
            self.editor.rebase(&pending.text);
            self.selection = Selection::Unset;
        } else {
            log::debug!(
                "[Checkout] Head already moved past {}, keeping selection {}",
                pending.base.short(),
                self.selection
            );
        }
        vec![CheckoutAction::Emit(SessionEvent::Saved)]
    }

    fn handle_save_failed(&mut self, message: String) -> Vec<CheckoutAction> {
        if self.pending_save.take().is_none() {
            return Vec::new();
        }
        vec![CheckoutAction::Emit(SessionEvent::SaveFailed { message })]
    }

    /// Bring the draft in line with new head content, per the refresh policy.
    fn refresh_draft(&mut self, content: &str) -> Vec<CheckoutAction> {
        let keep = self.draft_refresh == DraftRefreshPolicy::KeepUnsaved && self.editor.is_dirty();
        if keep {
            log::debug!("[Checkout] Keeping unsaved draft over new head content");
            self.editor.rebase(content);
            return Vec::new();
        }
        self.editor.load(content, true);
        vec![CheckoutAction::Emit(SessionEvent::DraftReset {
            content: content.to_string(),
        })]
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::types::{CommitRecord, Signature};

    fn signature() -> Signature {
        Signature {
            name: "Test".to_string(),
            email: "test@example.com".to_string(),
            timestamp: 1_700_000_000,
            timezone_offset: None,
        }
    }

    fn entry(oid: &str, parent: Option<&str>, old: &str, new: &str) -> EnrichedCommit {
        EnrichedCommit {
            record: CommitRecord {
                oid: Oid::new(oid),
                message: format!("commit {oid}"),
                parent_oids: parent.map(Oid::new).into_iter().collect(),
                tree: None,
                author: signature(),
                committer: signature(),
            },
            old_content: old.to_string(),
            new_content: new.to_string(),
        }
    }

    /// root "Hello World"
    fn one() -> Vec<EnrichedCommit> {
        vec![entry("aaa0001", None, "", "Hello World")]
    }

    /// root "Hello World" <- second "Hello World!!"
    fn two() -> Vec<EnrichedCommit> {
        vec![
            entry("bbb0002", Some("aaa0001"), "Hello World", "Hello World!!"),
            entry("aaa0001", None, "", "Hello World"),
        ]
    }

    /// ... <- third "Bye"
    fn three() -> Vec<EnrichedCommit> {
        let mut entries = two();
        entries.insert(0, entry("ccc0003", Some("bbb0002"), "Hello World!!", "Bye"));
        entries
    }

    fn loaded(entries: Vec<EnrichedCommit>) -> CheckoutController {
        let mut controller = CheckoutController::default();
        controller.apply(CheckoutEvent::HistoryLoaded(entries));
        controller
    }

    fn emitted(actions: &[CheckoutAction]) -> Vec<&SessionEvent> {
        actions
            .iter()
            .filter_map(|action| match action {
                CheckoutAction::Emit(event) => Some(event),
                CheckoutAction::WriteTip(_) => None,
            })
            .collect()
    }

    #[test]
    fn test_first_load_selects_head() {
        let mut controller = CheckoutController::default();
        assert!(!controller.can_edit());

        let actions = controller.apply(CheckoutEvent::HistoryLoaded(one()));
        assert_eq!(controller.selection(), &Selection::Commit(Oid::new("aaa0001")));
        assert!(controller.can_edit());
        assert!(controller.editor().is_editable());
        assert_eq!(controller.editor().text(), "Hello World");
        assert!(emitted(&actions).contains(&&SessionEvent::SelectionChanged {
            selection: Selection::Commit(Oid::new("aaa0001")),
            editable: true,
        }));
    }

    #[test]
    fn test_empty_history_stays_uninitialized() {
        let controller = loaded(Vec::new());
        assert_eq!(controller.selection(), &Selection::Unset);
        assert!(controller.head().is_none());
        assert!(!controller.can_edit());
    }

    #[test]
    fn test_reloading_same_history_is_quiet() {
        let mut controller = loaded(two());
        controller.apply(CheckoutEvent::Edit("draft".to_string()));

        let actions = controller.apply(CheckoutEvent::HistoryLoaded(two()));
        assert_eq!(
            emitted(&actions),
            vec![&SessionEvent::HistoryUpdated {
                head: Some(Oid::new("bbb0002")),
                len: 2
            }]
        );
        assert_eq!(controller.editor().text(), "draft");
    }

    #[test]
    fn test_select_historical_is_read_only() {
        let mut controller = loaded(two());
        controller.apply(CheckoutEvent::Select(Oid::new("aaa0001")));

        assert_eq!(controller.editor().text(), "Hello World");
        assert!(!controller.can_edit());

        controller.apply(CheckoutEvent::Edit("nope".to_string()));
        controller.apply(CheckoutEvent::Append("nope".to_string()));
        assert_eq!(controller.editor().text(), "Hello World");
    }

    #[test]
    fn test_select_unknown_commit_is_ignored() {
        let mut controller = loaded(two());
        let actions = controller.apply(CheckoutEvent::Select(Oid::new("fff9999")));
        assert!(actions.is_empty());
        assert_eq!(controller.selection(), &Selection::Commit(Oid::new("bbb0002")));
    }

    #[test]
    fn test_following_head_resets_draft() {
        let mut controller = loaded(two());
        controller.apply(CheckoutEvent::Append(" unsaved".to_string()));

        let actions = controller.apply(CheckoutEvent::HistoryLoaded(three()));
        assert_eq!(controller.selection(), &Selection::Commit(Oid::new("ccc0003")));
        assert_eq!(controller.editor().text(), "Bye");
        assert!(controller.can_edit());
        assert!(emitted(&actions).contains(&&SessionEvent::DraftReset {
            content: "Bye".to_string()
        }));
    }

    #[test]
    fn test_keep_unsaved_rebases_dirty_draft() {
        let mut controller =
            CheckoutController::new(HeadAdvancePolicy::Pin, DraftRefreshPolicy::KeepUnsaved);
        controller.apply(CheckoutEvent::HistoryLoaded(two()));
        controller.apply(CheckoutEvent::Edit("mine".to_string()));

        controller.apply(CheckoutEvent::HistoryLoaded(three()));
        assert_eq!(controller.selection(), &Selection::Commit(Oid::new("ccc0003")));
        assert_eq!(controller.editor().text(), "mine");
        assert_eq!(controller.editor().base(), "Bye");
        assert!(controller.editor().is_dirty());
    }

    #[test]
    fn test_keep_unsaved_refreshes_clean_draft() {
        let mut controller =
            CheckoutController::new(HeadAdvancePolicy::Pin, DraftRefreshPolicy::KeepUnsaved);
        controller.apply(CheckoutEvent::HistoryLoaded(two()));
        controller.apply(CheckoutEvent::HistoryLoaded(three()));
        assert_eq!(controller.editor().text(), "Bye");
    }

    #[test]
    fn test_pin_keeps_historical_selection() {
        let mut controller = loaded(two());
        controller.apply(CheckoutEvent::Select(Oid::new("aaa0001")));

        controller.apply(CheckoutEvent::HistoryLoaded(three()));
        assert_eq!(controller.selection(), &Selection::Commit(Oid::new("aaa0001")));
        assert_eq!(controller.editor().text(), "Hello World");
        assert!(!controller.can_edit());
    }

    #[test]
    fn test_follow_redirects_historical_selection() {
        let mut controller =
            CheckoutController::new(HeadAdvancePolicy::Follow, DraftRefreshPolicy::Reset);
        controller.apply(CheckoutEvent::HistoryLoaded(two()));
        controller.apply(CheckoutEvent::Select(Oid::new("aaa0001")));

        controller.apply(CheckoutEvent::HistoryLoaded(three()));
        assert_eq!(controller.selection(), &Selection::Commit(Oid::new("ccc0003")));
        assert_eq!(controller.editor().text(), "Bye");
        assert!(controller.can_edit());
    }

    #[test]
    fn test_save_flow_releases_selection() {
        let mut controller = loaded(one());
        controller.apply(CheckoutEvent::Edit("Hello World!!".to_string()));

        let actions = controller.apply(CheckoutEvent::SaveRequested);
        assert_eq!(
            actions,
            vec![CheckoutAction::WriteTip("Hello World!!".to_string())]
        );
        assert!(controller.save_in_flight());
        assert!(controller.apply(CheckoutEvent::SaveRequested).is_empty());

        controller.apply(CheckoutEvent::SaveCompleted);
        assert!(!controller.save_in_flight());
        assert_eq!(controller.selection(), &Selection::Unset);
        assert!(!controller.can_edit());
        assert_eq!(controller.editor().text(), "Hello World!!");

        let mut next = two();
        next[0].new_content = "Hello World!!".to_string();
        controller.apply(CheckoutEvent::HistoryLoaded(next));
        assert_eq!(controller.selection(), &Selection::Commit(Oid::new("bbb0002")));
        assert!(controller.can_edit());
        assert!(!controller.editor().is_dirty());
    }

    #[test]
    fn test_save_acknowledged_after_new_head_loaded() {
        let mut controller = loaded(one());
        controller.apply(CheckoutEvent::Edit("Hello World!!".to_string()));
        controller.apply(CheckoutEvent::SaveRequested);

        let mut next = two();
        next[0].new_content = "Hello World!!".to_string();
        controller.apply(CheckoutEvent::HistoryLoaded(next));
        assert_eq!(controller.selection(), &Selection::Commit(Oid::new("bbb0002")));

        let actions = controller.apply(CheckoutEvent::SaveCompleted);
        assert_eq!(emitted(&actions), vec![&SessionEvent::Saved]);
        assert_eq!(controller.selection(), &Selection::Commit(Oid::new("bbb0002")));
        assert!(controller.can_edit());
        assert_eq!(controller.editor().text(), "Hello World!!");
        assert!(!controller.editor().is_dirty());
    }

    #[test]
    fn test_save_rejected_off_head() {
        let mut controller = loaded(two());
        controller.apply(CheckoutEvent::Select(Oid::new("aaa0001")));

        assert!(controller.apply(CheckoutEvent::SaveRequested).is_empty());
        assert!(!controller.save_in_flight());
        assert_eq!(controller.selection(), &Selection::Commit(Oid::new("aaa0001")));
    }

    #[test]
    fn test_save_failure_keeps_draft() {
        let mut controller = loaded(one());
        controller.apply(CheckoutEvent::Append("!!".to_string()));
        controller.apply(CheckoutEvent::SaveRequested);

        let actions = controller.apply(CheckoutEvent::SaveFailed("disk full".to_string()));
        assert_eq!(
            emitted(&actions),
            vec![&SessionEvent::SaveFailed {
                message: "disk full".to_string()
            }]
        );
        assert_eq!(controller.editor().text(), "Hello World!!");
        assert!(controller.editor().is_dirty());
        assert!(controller.can_edit());
    }

    #[test]
    fn test_cleared_history_disables_editing_until_reload() {
        let mut controller = loaded(two());
        controller.apply(CheckoutEvent::HistoryCleared);
        assert!(controller.history().is_empty());
        assert!(!controller.can_edit());

        controller.apply(CheckoutEvent::HistoryLoaded(three()));
        assert_eq!(controller.selection(), &Selection::Commit(Oid::new("ccc0003")));
        assert!(controller.can_edit());
    }

    fn arb_event() -> impl Strategy<Value = CheckoutEvent> {
        prop_oneof![
            Just(CheckoutEvent::HistoryLoaded(Vec::new())),
            Just(CheckoutEvent::HistoryLoaded(one())),
            Just(CheckoutEvent::HistoryLoaded(two())),
            Just(CheckoutEvent::HistoryLoaded(three())),
            Just(CheckoutEvent::HistoryCleared),
            prop_oneof![Just("aaa0001"), Just("bbb0002"), Just("ccc0003"), Just("zzz")]
                .prop_map(|oid| CheckoutEvent::Select(Oid::new(oid))),
            "[a-z]{0,4}".prop_map(CheckoutEvent::Edit),
            "[a-z]{0,4}".prop_map(CheckoutEvent::Append),
            Just(CheckoutEvent::SaveRequested),
            Just(CheckoutEvent::SaveCompleted),
            Just(CheckoutEvent::SaveFailed("boom".to_string())),
        ]
    }

    fn arb_policies() -> impl Strategy<Value = (HeadAdvancePolicy, DraftRefreshPolicy)> {
        (
            prop_oneof![Just(HeadAdvancePolicy::Pin), Just(HeadAdvancePolicy::Follow)],
            prop_oneof![
                Just(DraftRefreshPolicy::Reset),
                Just(DraftRefreshPolicy::KeepUnsaved)
            ],
        )
    }

    proptest! {
        #[test]
        fn prop_edit_gate_matches_head(
            (advance, refresh) in arb_policies(),
            events in prop::collection::vec(arb_event(), 0..40),
        ) {
            let mut controller = CheckoutController::new(advance, refresh);
            for event in events {
                let actions = controller.apply(event);
                let at_head = controller
                    .history()
                    .first()
                    .is_some_and(|head| controller.selection().is(head.oid()));
                prop_assert_eq!(controller.can_edit(), at_head);
                prop_assert_eq!(controller.editor().is_editable(), at_head);
                for action in actions {
                    if let CheckoutAction::WriteTip(_) = action {
                        prop_assert!(at_head);
                    }
                }
            }
        }
    }
}
