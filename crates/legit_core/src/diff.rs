//! Semantic text diff between two snapshots.
//!
//! The raw character diff comes from `similar` (Myers, no deadline, so the
//! output is deterministic). It is then normalized and cleaned up so that
//! short equalities stranded between edits are folded into the edits
//! around them. Scattered single-character edits come out as one coherent
//! delete/insert pair.

use serde::Serialize;
use similar::{Algorithm, ChangeTag, TextDiff};

/// Kind of a diff segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentKind {
    /// Text present in both snapshots.
    Equal,
    /// Text only in the new snapshot.
    Insert,
    /// Text only in the old snapshot.
    Delete,
}

/// A run of text with a single diff kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffSegment {
    /// What happened to this text.
    pub kind: SegmentKind,
    /// The text itself.
    pub text: String,
}

impl DiffSegment {
    /// An unchanged run.
    pub fn equal(text: impl Into<String>) -> Self {
        Self {
            kind: SegmentKind::Equal,
            text: text.into(),
        }
    }

    /// An inserted run.
    pub fn insert(text: impl Into<String>) -> Self {
        Self {
            kind: SegmentKind::Insert,
            text: text.into(),
        }
    }

    /// A deleted run.
    pub fn delete(text: impl Into<String>) -> Self {
        Self {
            kind: SegmentKind::Delete,
            text: text.into(),
        }
    }

    /// Whether this segment is an insert or a delete.
    pub fn is_change(&self) -> bool {
        self.kind != SegmentKind::Equal
    }
}

/// Character counts over a diff.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffStats {
    /// Characters inserted.
    pub inserted: usize,
    /// Characters deleted.
    pub deleted: usize,
    /// Characters left untouched.
    pub unchanged: usize,
}

impl DiffStats {
    /// Tally the segments.
    pub fn from_segments(segments: &[DiffSegment]) -> Self {
        segments.iter().fold(Self::default(), |mut stats, seg| {
            let len = seg.text.chars().count();
            match seg.kind {
                SegmentKind::Equal => stats.unchanged += len,
                SegmentKind::Insert => stats.inserted += len,
                SegmentKind::Delete => stats.deleted += len,
            }
            stats
        })
    }
}

/// Diff `old` against `new` and apply semantic cleanup.
pub fn diff(old: &str, new: &str) -> Vec<DiffSegment> {
    let text_diff = TextDiff::configure()
        .algorithm(Algorithm::Myers)
        .diff_chars(old, new);

    let mut raw: Vec<DiffSegment> = Vec::new();
    for change in text_diff.iter_all_changes() {
        let kind = match change.tag() {
            ChangeTag::Equal => SegmentKind::Equal,
            ChangeTag::Insert => SegmentKind::Insert,
            ChangeTag::Delete => SegmentKind::Delete,
        };
        match raw.last_mut() {
            Some(last) if last.kind == kind => last.text.push_str(change.value()),
            _ => raw.push(DiffSegment {
                kind,
                text: change.value().to_string(),
            }),
        }
    }

    cleanup_semantic(raw)
}

/// Fold equalities that are no longer than the edits on both sides of them
/// into those edits, until none remain.
///
/// Output is normalized: no empty segments, no two adjacent equalities, and
/// each run of edits is at most one delete followed by one insert.
pub fn cleanup_semantic(segments: Vec<DiffSegment>) -> Vec<DiffSegment> {
    let mut segments = normalize(segments);
    while let Some(index) = find_weak_equality(&segments) {
        let text = std::mem::take(&mut segments[index].text);
        segments[index] = DiffSegment::delete(text.clone());
        segments.insert(index + 1, DiffSegment::insert(text));
        segments = normalize(segments);
    }
    segments
}

/// Reassemble the old snapshot from a diff.
pub fn old_text(segments: &[DiffSegment]) -> String {
    segments
        .iter()
        .filter(|s| s.kind != SegmentKind::Insert)
        .map(|s| s.text.as_str())
        .collect()
}

/// Reassemble the new snapshot from a diff.
pub fn new_text(segments: &[DiffSegment]) -> String {
    segments
        .iter()
        .filter(|s| s.kind != SegmentKind::Delete)
        .map(|s| s.text.as_str())
        .collect()
}

fn normalize(segments: Vec<DiffSegment>) -> Vec<DiffSegment> {
    let mut out: Vec<DiffSegment> = Vec::with_capacity(segments.len());
    let mut deleted = String::new();
    let mut inserted = String::new();

    for seg in segments {
        if seg.text.is_empty() {
            continue;
        }
        match seg.kind {
            SegmentKind::Delete => deleted.push_str(&seg.text),
            SegmentKind::Insert => inserted.push_str(&seg.text),
            SegmentKind::Equal => {
                flush_edits(&mut out, &mut deleted, &mut inserted);
                match out.last_mut() {
                    Some(last) if last.kind == SegmentKind::Equal => last.text.push_str(&seg.text),
                    _ => out.push(seg),
                }
            }
        }
    }
    flush_edits(&mut out, &mut deleted, &mut inserted);
    out
}

fn flush_edits(out: &mut Vec<DiffSegment>, deleted: &mut String, inserted: &mut String) {
    if !deleted.is_empty() {
        out.push(DiffSegment::delete(std::mem::take(deleted)));
    }
    if !inserted.is_empty() {
        out.push(DiffSegment::insert(std::mem::take(inserted)));
    }
}

/// (deleted, inserted) character counts of the edits `run` yields before the
/// first equality.
fn edit_run<'a>(run: impl Iterator<Item = &'a DiffSegment>) -> (usize, usize) {
    let mut deleted = 0;
    let mut inserted = 0;
    for seg in run {
        match seg.kind {
            SegmentKind::Equal => break,
            SegmentKind::Delete => deleted += seg.text.chars().count(),
            SegmentKind::Insert => inserted += seg.text.chars().count(),
        }
    }
    (deleted, inserted)
}

fn find_weak_equality(segments: &[DiffSegment]) -> Option<usize> {
    (1..segments.len().saturating_sub(1)).find(|&i| {
        let seg = &segments[i];
        if seg.kind != SegmentKind::Equal {
            return false;
        }
        let len = seg.text.chars().count();
        let (del_before, ins_before) = edit_run(segments[..i].iter().rev());
        let (del_after, ins_after) = edit_run(segments[i + 1..].iter());
        len <= del_before.max(ins_before) && len <= del_after.max(ins_after)
    })
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_identical_texts_have_no_changes() {
        let segments = diff("Hello World", "Hello World");
        assert_eq!(segments, vec![DiffSegment::equal("Hello World")]);
        assert!(!segments.iter().any(DiffSegment::is_change));
    }

    #[test]
    fn test_empty_inputs() {
        assert!(diff("", "").is_empty());
        assert_eq!(diff("", "abc"), vec![DiffSegment::insert("abc")]);
        assert_eq!(diff("abc", ""), vec![DiffSegment::delete("abc")]);
    }

    #[test]
    fn test_tail_insert() {
        assert_eq!(
            diff("Hello World", "Hello World!!"),
            vec![DiffSegment::equal("Hello World"), DiffSegment::insert("!!")]
        );
    }

    #[test]
    fn test_noisy_edit_becomes_one_replacement() {
        let segments = diff("mouse", "sofas");
        assert!(segments.iter().all(DiffSegment::is_change));
        assert_eq!(old_text(&segments), "mouse");
        assert_eq!(new_text(&segments), "sofas");
    }

    #[test]
    fn test_cleanup_keeps_long_equalities() {
        let segments = cleanup_semantic(vec![
            DiffSegment::delete("a"),
            DiffSegment::equal("long shared text"),
            DiffSegment::insert("b"),
        ]);
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[1], DiffSegment::equal("long shared text"));
    }

    #[test]
    fn test_cleanup_folds_short_equality() {
        let segments = cleanup_semantic(vec![
            DiffSegment::delete("a"),
            DiffSegment::insert("x"),
            DiffSegment::equal("b"),
            DiffSegment::delete("c"),
            DiffSegment::insert("z"),
        ]);
        assert_eq!(
            segments,
            vec![DiffSegment::delete("abc"), DiffSegment::insert("xbz")]
        );
    }

    #[test]
    fn test_stats() {
        let stats = DiffStats::from_segments(&diff("Hello World", "Hello World!!"));
        assert_eq!(
            stats,
            DiffStats {
                inserted: 2,
                deleted: 0,
                unchanged: 11
            }
        );
    }

    proptest! {
        #[test]
        fn prop_diff_reconstructs_both_sides(old in "[a-d \n]{0,24}", new in "[a-d \n]{0,24}") {
            let segments = diff(&old, &new);
            prop_assert_eq!(old_text(&segments), old);
            prop_assert_eq!(new_text(&segments), new);
        }

        #[test]
        fn prop_diff_is_deterministic(old in "[a-dé]{0,16}", new in "[a-dé]{0,16}") {
            prop_assert_eq!(diff(&old, &new), diff(&old, &new));
        }

        #[test]
        fn prop_identical_is_all_equal(text in ".{0,32}") {
            prop_assert!(!diff(&text, &text).iter().any(DiffSegment::is_change));
        }
    }
}
