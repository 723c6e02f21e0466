//! Virtual path layout of the version store.
//!
//! ```text
//! /.<ns>/branches/<branch>/.<ns>/head       current head OID
//! /.<ns>/branches/<branch>/.<ns>/history    serialized commit list, newest first
//! /.<ns>/branches/<branch>/<file>           tip content (write = new commit)
//! /.<ns>/commits/<oid[0:2]>/<oid[2:]>/<file> content at a commit
//! ```

use std::path::PathBuf;

use crate::error::Result;
use crate::types::Oid;

/// Builds the store paths for one tracked file on one branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorePaths {
    namespace: String,
    branch: String,
    file: String,
}

impl StorePaths {
    /// Create a path builder for `file` on `branch` under namespace `namespace`.
    pub fn new(
        namespace: impl Into<String>,
        branch: impl Into<String>,
        file: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            branch: branch.into(),
            file: file.into(),
        }
    }

    /// Namespace name (without the leading dot).
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Tracked branch.
    pub fn branch(&self) -> &str {
        &self.branch
    }

    /// Tracked file, relative to the branch root.
    pub fn file(&self) -> &str {
        &self.file
    }

    fn root(&self) -> String {
        format!("/.{}", self.namespace)
    }

    fn branch_root(&self) -> String {
        format!("{}/branches/{}", self.root(), self.branch)
    }

    /// Path of the head pointer.
    pub fn head(&self) -> PathBuf {
        PathBuf::from(format!("{}/.{}/head", self.branch_root(), self.namespace))
    }

    /// Path of the serialized history.
    pub fn history(&self) -> PathBuf {
        PathBuf::from(format!("{}/.{}/history", self.branch_root(), self.namespace))
    }

    /// Path of the tracked file at the branch tip.
    pub fn tip(&self) -> PathBuf {
        PathBuf::from(format!("{}/{}", self.branch_root(), self.file))
    }

    /// Path of the tracked file as stored in commit `oid`.
    pub fn commit_file(&self, oid: &Oid) -> Result<PathBuf> {
        let (prefix, rest) = oid.shard()?;
        Ok(PathBuf::from(format!(
            "{}/commits/{}/{}/{}",
            self.root(),
            prefix,
            rest,
            self.file
        )))
    }
}

impl Default for StorePaths {
    fn default() -> Self {
        Self::new("legit", "main", "document.txt")
    }
}
