//! History loading and enrichment.
//!
//! The store serves the branch history as a JSON array of commit records,
//! newest first. `HistoryLoader` validates that payload, then resolves the
//! tracked file's content at every commit and at every first parent in one
//! concurrent fan-out. The enriched list is only returned once every lookup
//! has resolved, so callers never see a partially enriched history.

use std::collections::{HashMap, HashSet};

use futures::future::join_all;

use crate::error::{LegitError, Result};
use crate::store::{BranchStore, VersionStore};
use crate::types::{CommitRecord, EnrichedCommit, Oid};

/// Outcome of a history load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryLoad {
    /// History read, validated and enriched. May be empty.
    Loaded(Vec<EnrichedCommit>),
    /// The history path could not be read (not yet populated, I/O error).
    Unavailable(String),
    /// The payload was read but failed validation.
    Corrupt(String),
}

impl HistoryLoad {
    /// The enriched entries, or an empty list on any failure.
    pub fn into_entries(self) -> Vec<EnrichedCommit> {
        match self {
            HistoryLoad::Loaded(entries) => entries,
            HistoryLoad::Unavailable(_) | HistoryLoad::Corrupt(_) => Vec::new(),
        }
    }

    /// Whether the load succeeded.
    pub fn is_loaded(&self) -> bool {
        matches!(self, HistoryLoad::Loaded(_))
    }
}

/// Decode and validate a serialized history payload.
///
/// Rejects records with an empty OID or parent OID, a commit listed as its
/// own parent, and duplicate OIDs.
pub fn parse_history(raw: &str) -> Result<Vec<CommitRecord>> {
    let records: Vec<CommitRecord> =
        serde_json::from_str(raw).map_err(|e| LegitError::CorruptHistory(e.to_string()))?;

    let mut seen = HashSet::with_capacity(records.len());
    for (index, record) in records.iter().enumerate() {
        if record.oid.as_str().trim().is_empty() {
            return Err(LegitError::CorruptHistory(format!(
                "record {index} has an empty oid"
            )));
        }
        if record.parent_oids.iter().any(|p| p.as_str().trim().is_empty()) {
            return Err(LegitError::CorruptHistory(format!(
                "commit {} has an empty parent oid",
                record.oid
            )));
        }
        if record.parent_oids.contains(&record.oid) {
            return Err(LegitError::CorruptHistory(format!(
                "commit {} lists itself as a parent",
                record.oid
            )));
        }
        if !seen.insert(&record.oid) {
            return Err(LegitError::CorruptHistory(format!(
                "commit {} appears more than once",
                record.oid
            )));
        }
    }

    Ok(records)
}

/// Reads and enriches the history of one branch.
pub struct HistoryLoader<'a, S> {
    branch: &'a BranchStore<S>,
}

impl<'a, S: VersionStore> HistoryLoader<'a, S> {
    /// Create a loader reading through `branch`.
    pub fn new(branch: &'a BranchStore<S>) -> Self {
        Self { branch }
    }

    /// Read, validate and enrich the history. Never fails the caller.
    pub async fn load(&self) -> HistoryLoad {
        let raw = match self.branch.read_history_raw().await {
            Ok(raw) => raw,
            Err(e) => {
                log::debug!("[HistoryLoader] History unavailable: {}", e);
                return HistoryLoad::Unavailable(e.to_string());
            }
        };

        if raw.trim().is_empty() {
            log::debug!("[HistoryLoader] History payload is empty");
            return HistoryLoad::Unavailable("empty history payload".to_string());
        }

        match parse_history(&raw) {
            Ok(records) => HistoryLoad::Loaded(self.enrich(records).await),
            Err(e) => {
                log::warn!("[HistoryLoader] {}", e);
                HistoryLoad::Corrupt(e.to_string())
            }
        }
    }

    /// Attach before/after content to each record.
    ///
    /// One lookup runs per distinct OID, so a parent's `new_content` and its
    /// child's `old_content` always come from the same read. A failed lookup
    /// degrades to an empty string.
    pub async fn enrich(&self, records: Vec<CommitRecord>) -> Vec<EnrichedCommit> {
        let mut wanted: Vec<&Oid> = Vec::new();
        let mut seen = HashSet::new();
        for record in &records {
            for oid in std::iter::once(&record.oid).chain(record.first_parent()) {
                if seen.insert(oid) {
                    wanted.push(oid);
                }
            }
        }

        let contents = join_all(wanted.iter().map(|oid| self.lookup(oid))).await;
        let by_oid: HashMap<&Oid, String> = wanted.into_iter().zip(contents).collect();

        let content_of = |oid: &Oid| by_oid.get(oid).cloned().unwrap_or_default();
        let enriched: Vec<EnrichedCommit> = records
            .iter()
            .map(|record| EnrichedCommit {
                old_content: record.first_parent().map(content_of).unwrap_or_default(),
                new_content: content_of(&record.oid),
                record: record.clone(),
            })
            .collect();

        log::debug!(
            "[HistoryLoader] Enriched {} commits ({} lookups)",
            enriched.len(),
            by_oid.len()
        );
        enriched
    }

    async fn lookup(&self, oid: &Oid) -> String {
        match self.branch.read_at(oid).await {
            Ok(content) => content,
            Err(e) => {
                log::debug!("[HistoryLoader] Content at {} unavailable: {}", oid.short(), e);
                String::new()
            }
        }
    }
}
