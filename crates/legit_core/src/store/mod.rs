//! Version store abstraction.
//!
//! The store owns all persistence: it turns writes into immutable commits,
//! advances branch heads, and exposes everything through a virtual path
//! namespace (see [`crate::paths`]). This module provides the
//! `VersionStore` trait the rest of the crate is written against, and
//! `BranchStore`, which speaks the path layout for one branch and file.
//!
//! Every operation is asynchronous and independently failable. Nothing is
//! atomic across paths: reading the head and then the history are two
//! round-trips that may observe different points in time.

mod memory;

use std::future::Future;
use std::io;
use std::path::Path;
use std::sync::Arc;

pub use memory::MemoryStore;

use crate::error::{LegitError, Result};
use crate::paths::StorePaths;
use crate::types::Oid;

/// Async access to a version store's virtual path namespace.
///
/// # Example
///
/// ```ignore
/// use legit_core::store::VersionStore;
///
/// async fn example<S: VersionStore>(store: &S) {
///     let head = store.read_to_string(Path::new("/.legit/branches/main/.legit/head")).await;
///     store.write_file(Path::new("/.legit/branches/main/document.txt"), "Hello").await.ok();
/// }
/// ```
pub trait VersionStore: Send + Sync {
    /// Reads the content at a virtual path as text.
    fn read_to_string(&self, path: &Path) -> impl Future<Output = io::Result<String>> + Send;

    /// Writes text to a virtual path.
    ///
    /// Writing to a branch tip creates a new commit and advances the head.
    fn write_file(&self, path: &Path, content: &str) -> impl Future<Output = io::Result<()>> + Send;
}

impl<S: VersionStore> VersionStore for Arc<S> {
    fn read_to_string(&self, path: &Path) -> impl Future<Output = io::Result<String>> + Send {
        (**self).read_to_string(path)
    }

    fn write_file(&self, path: &Path, content: &str) -> impl Future<Output = io::Result<()>> + Send {
        (**self).write_file(path, content)
    }
}

/// A store handle bound to one branch and tracked file.
#[derive(Debug)]
pub struct BranchStore<S> {
    store: Arc<S>,
    paths: StorePaths,
}

impl<S> Clone for BranchStore<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            paths: self.paths.clone(),
        }
    }
}

impl<S: VersionStore> BranchStore<S> {
    /// Bind `store` to the branch and file described by `paths`.
    pub fn new(store: Arc<S>, paths: StorePaths) -> Self {
        Self { store, paths }
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// The path layout in use.
    pub fn paths(&self) -> &StorePaths {
        &self.paths
    }

    /// Read the current head OID.
    pub async fn read_head(&self) -> Result<Oid> {
        let path = self.paths.head();
        let raw = self
            .store
            .read_to_string(&path)
            .await
            .map_err(|e| LegitError::store(&path, e))?;
        let oid = raw.trim();
        if oid.is_empty() {
            return Err(LegitError::EmptyHead);
        }
        Ok(Oid::new(oid))
    }

    /// Read the raw serialized history payload.
    pub async fn read_history_raw(&self) -> Result<String> {
        let path = self.paths.history();
        self.store
            .read_to_string(&path)
            .await
            .map_err(|e| LegitError::store(&path, e))
    }

    /// Read the tracked file at the branch tip.
    pub async fn read_tip(&self) -> Result<String> {
        let path = self.paths.tip();
        self.store
            .read_to_string(&path)
            .await
            .map_err(|e| LegitError::store(&path, e))
    }

    /// Write the tracked file at the branch tip, creating a new commit.
    pub async fn write_tip(&self, content: &str) -> Result<()> {
        let path = self.paths.tip();
        self.store
            .write_file(&path, content)
            .await
            .map_err(|e| LegitError::store(&path, e))
    }

    /// Read the tracked file as stored in commit `oid`.
    pub async fn read_at(&self, oid: &Oid) -> Result<String> {
        let path = self.paths.commit_file(oid)?;
        self.store
            .read_to_string(&path)
            .await
            .map_err(|e| LegitError::store(&path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn branch(store: &Arc<MemoryStore>) -> BranchStore<MemoryStore> {
        BranchStore::new(Arc::clone(store), StorePaths::default())
    }

    #[tokio::test]
    async fn test_write_then_read_at_new_head() {
        let store = Arc::new(MemoryStore::new(StorePaths::default()));
        store.seed("main", "Initial commit", "Hello World");
        let branch = branch(&store);

        branch.write_tip("Hello World!!").await.unwrap();
        let head = branch.read_head().await.unwrap();

        assert_eq!(branch.read_at(&head).await.unwrap(), "Hello World!!");
        assert_eq!(branch.read_tip().await.unwrap(), "Hello World!!");
    }

    #[tokio::test]
    async fn test_read_head_missing_is_store_error() {
        let store = Arc::new(MemoryStore::new(StorePaths::default()));
        let err = branch(&store).read_head().await.unwrap_err();
        assert!(matches!(err, LegitError::Store { .. }));
    }

    #[tokio::test]
    async fn test_read_at_rejects_unshardable_oid() {
        let store = Arc::new(MemoryStore::new(StorePaths::default()));
        let err = branch(&store).read_at(&Oid::new("x")).await.unwrap_err();
        assert!(matches!(err, LegitError::InvalidOid(_)));
    }
}
