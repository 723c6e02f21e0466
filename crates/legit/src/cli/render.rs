//! Plain-text rendering of session state.

use legit_core::SessionSnapshot;
use legit_core::diff::{DiffSegment, DiffStats, SegmentKind};
use legit_core::events::SessionEvent;
use legit_core::types::{EnrichedCommit, Selection};

/// One line per commit, newest first. The selected commit is starred.
pub fn history_lines(snapshot: &SessionSnapshot) -> Vec<String> {
    snapshot
        .history
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            let marker = if snapshot.selection.is(entry.oid()) { '*' } else { ' ' };
            let head = if index == 0 { " (head)" } else { "" };
            format!(
                "{} {} {} {:<12} {}{}",
                marker,
                entry.oid().short(),
                commit_time(entry),
                entry.record.author.name,
                entry.record.summary(),
                head
            )
        })
        .collect()
}

fn commit_time(entry: &EnrichedCommit) -> String {
    entry
        .record
        .author
        .datetime()
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "????-??-?? ??:??".to_string())
}

/// Inline diff: deletions as `[-text-]`, insertions as `{+text+}`.
pub fn diff_text(segments: &[DiffSegment]) -> String {
    let mut out = String::new();
    for segment in segments {
        match segment.kind {
            SegmentKind::Equal => out.push_str(&segment.text),
            SegmentKind::Delete => {
                out.push_str("[-");
                out.push_str(&segment.text);
                out.push_str("-]");
            }
            SegmentKind::Insert => {
                out.push_str("{+");
                out.push_str(&segment.text);
                out.push_str("+}");
            }
        }
    }
    out
}

/// Character counts, e.g. `+2 -0 =11`.
pub fn stats_line(segments: &[DiffSegment]) -> String {
    let stats = DiffStats::from_segments(segments);
    format!("+{} -{} ={}", stats.inserted, stats.deleted, stats.unchanged)
}

/// Selection, edit gate and draft state in one line.
pub fn status_line(snapshot: &SessionSnapshot) -> String {
    let gate = if snapshot.editable { "editable" } else { "read-only" };
    let mut line = format!(
        "selection {} ({}), {} commits, draft {} chars",
        snapshot.selection,
        gate,
        snapshot.history.len(),
        snapshot.draft.chars().count()
    );
    if snapshot.dirty {
        line.push_str(", unsaved");
    }
    if snapshot.save_in_flight {
        line.push_str(", saving");
    }
    line
}

/// Notification text for an event, or `None` for events not worth printing.
pub fn event_line(event: &SessionEvent) -> Option<String> {
    match event {
        SessionEvent::HeadChanged { previous: None, head } => Some(format!("head is {}", head.short())),
        SessionEvent::HeadChanged {
            previous: Some(previous),
            head,
        } => Some(format!("head moved {} -> {}", previous.short(), head.short())),
        SessionEvent::HistoryUpdated { .. } => None,
        SessionEvent::HistoryUnavailable { reason } => Some(format!("history unavailable: {}", reason)),
        SessionEvent::HistoryCorrupt { reason } => Some(format!("history rejected: {}", reason)),
        SessionEvent::SelectionChanged {
            selection: Selection::Unset,
            ..
        } => Some("selection released, waiting for new head".to_string()),
        SessionEvent::SelectionChanged {
            selection,
            editable,
        } => Some(format!(
            "checked out {}{}",
            selection,
            if *editable { "" } else { " (read-only)" }
        )),
        SessionEvent::DraftReset { .. } => None,
        SessionEvent::Saved => Some("saved".to_string()),
        SessionEvent::SaveFailed { message } => Some(format!("save failed: {}", message)),
    }
}

#[cfg(test)]
mod tests {
    use legit_core::types::Oid;

    use super::*;

    #[test]
    fn test_diff_text_marks_changes() {
        let segments = vec![
            DiffSegment::equal("The "),
            DiffSegment::delete("cat"),
            DiffSegment::insert("dog"),
            DiffSegment::equal(" sat"),
        ];
        assert_eq!(diff_text(&segments), "The [-cat-]{+dog+} sat");
        assert_eq!(stats_line(&segments), "+3 -3 =8");
    }

    #[test]
    fn test_event_lines() {
        let head = Oid::new("0123456789abcdef");
        assert_eq!(
            event_line(&SessionEvent::HeadChanged {
                previous: None,
                head: head.clone()
            }),
            Some("head is 0123456".to_string())
        );
        assert_eq!(
            event_line(&SessionEvent::SelectionChanged {
                selection: Selection::Commit(head),
                editable: false
            }),
            Some("checked out 0123456 (read-only)".to_string())
        );
        assert_eq!(
            event_line(&SessionEvent::HistoryUpdated { head: None, len: 0 }),
            None
        );
    }

    #[test]
    fn test_status_line_for_empty_session() {
        let snapshot = SessionSnapshot {
            history: Vec::new(),
            head: None,
            selection: Selection::Unset,
            editable: false,
            draft: String::new(),
            dirty: false,
            save_in_flight: false,
        };
        assert_eq!(
            status_line(&snapshot),
            "selection (unset) (read-only), 0 commits, draft 0 chars"
        );
        assert!(history_lines(&snapshot).is_empty());
    }
}
