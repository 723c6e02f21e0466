//! Commit and checkout data model.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::diff::{self, DiffSegment};
use crate::error::{LegitError, Result};

/// Opaque content hash identifying a commit.
///
/// OIDs are compared by value only; nothing in the client interprets them
/// beyond splitting them into a sharded commit path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Oid(String);

impl Oid {
    /// Wrap a raw OID string.
    pub fn new(oid: impl Into<String>) -> Self {
        Self(oid.into())
    }

    /// The raw OID text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Abbreviated form for display (first 7 characters).
    pub fn short(&self) -> &str {
        match self.0.char_indices().nth(7) {
            Some((idx, _)) => &self.0[..idx],
            None => &self.0,
        }
    }

    /// Split into the two-character shard prefix and the remainder.
    pub fn shard(&self) -> Result<(&str, &str)> {
        if self.0.len() < 3 || !self.0.is_ascii() || self.0.contains('/') {
            return Err(LegitError::InvalidOid(self.0.clone()));
        }
        Ok(self.0.split_at(2))
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Oid {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Oid {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Author or committer of a commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Signature {
    /// Display name.
    pub name: String,
    /// Email address.
    pub email: String,
    /// Seconds since the Unix epoch.
    pub timestamp: i64,
    /// Offset from UTC in minutes, as recorded by the store.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone_offset: Option<i32>,
}

impl Signature {
    /// Timestamp as a UTC datetime, if it is in range.
    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.timestamp, 0)
    }
}

/// Immutable metadata describing one commit, as serialized by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    /// Commit identity.
    pub oid: Oid,
    /// Full commit message.
    pub message: String,
    /// Parent OIDs in order; empty for the root commit.
    #[serde(rename = "parent", alias = "parentOids", default)]
    pub parent_oids: Vec<Oid>,
    /// Tree OID, when the store reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tree: Option<String>,
    /// Who wrote the change.
    pub author: Signature,
    /// Who recorded the commit.
    pub committer: Signature,
}

impl CommitRecord {
    /// The first parent, if any.
    pub fn first_parent(&self) -> Option<&Oid> {
        self.parent_oids.first()
    }

    /// First line of the commit message.
    pub fn summary(&self) -> &str {
        self.message.lines().next().unwrap_or_default()
    }
}

/// A commit record with the tracked file's content before and after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichedCommit {
    /// The commit metadata.
    pub record: CommitRecord,
    /// Content at the first parent, or empty for a root commit.
    pub old_content: String,
    /// Content at this commit.
    pub new_content: String,
}

impl EnrichedCommit {
    /// Identity of the underlying commit.
    pub fn oid(&self) -> &Oid {
        &self.record.oid
    }

    /// Semantic diff between the parent snapshot and this one.
    pub fn diff(&self) -> Vec<DiffSegment> {
        diff::diff(&self.old_content, &self.new_content)
    }
}

/// Which commit the editor is showing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Selection {
    /// Nothing selected yet, or selection released after a save.
    #[default]
    Unset,
    /// A specific commit.
    Commit(Oid),
}

impl Selection {
    /// The selected OID, if any.
    pub fn oid(&self) -> Option<&Oid> {
        match self {
            Selection::Unset => None,
            Selection::Commit(oid) => Some(oid),
        }
    }

    /// Whether this selection points at `oid`.
    pub fn is(&self, oid: &Oid) -> bool {
        self.oid() == Some(oid)
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selection::Unset => f.write_str("(unset)"),
            Selection::Commit(oid) => write!(f, "{}", oid.short()),
        }
    }
}
