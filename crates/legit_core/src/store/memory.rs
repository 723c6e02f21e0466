//! In-memory version store.
//!
//! `MemoryStore` plays the part of the external commit engine in tests and
//! in the CLI. It keeps commits and branch heads in a shared map and serves
//! the virtual path namespace described in [`crate::paths`]. Clones share
//! the same underlying repository.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use sha2::{Digest, Sha256};

use super::VersionStore;
use crate::paths::StorePaths;
use crate::types::{CommitRecord, Oid, Signature};

#[derive(Debug)]
struct StoredCommit {
    record: CommitRecord,
    files: BTreeMap<String, String>,
}

#[derive(Debug)]
struct Repo {
    commits: HashMap<Oid, StoredCommit>,
    branches: HashMap<String, Oid>,
    author_name: String,
    author_email: String,
    counter: u64,
    writes: usize,
    latency: Option<Duration>,
    write_ack_delay: Option<Duration>,
    late_reads: HashMap<PathBuf, Duration>,
    failing: HashSet<PathBuf>,
    reject_writes: bool,
    history_override: Option<String>,
}

/// Where a virtual path points inside the repository.
#[derive(Debug, PartialEq, Eq)]
enum Target<'a> {
    Head(&'a str),
    History(&'a str),
    Tip { branch: &'a str, file: &'a str },
    AtCommit { oid: String, file: &'a str },
}

/// A shared, in-memory commit engine exposing the store path namespace.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    namespace: String,
    repo: Arc<Mutex<Repo>>,
}

impl MemoryStore {
    /// Create an empty store serving the namespace used by `paths`.
    pub fn new(paths: StorePaths) -> Self {
        Self {
            namespace: paths.namespace().to_string(),
            repo: Arc::new(Mutex::new(Repo {
                commits: HashMap::new(),
                branches: HashMap::new(),
                author_name: "Test".to_string(),
                author_email: "test@example.com".to_string(),
                counter: 0,
                writes: 0,
                latency: None,
                write_ack_delay: None,
                late_reads: HashMap::new(),
                failing: HashSet::new(),
                reject_writes: false,
                history_override: None,
            })),
        }
    }

    /// Set the signature used for new commits (builder pattern).
    pub fn with_author(self, name: &str, email: &str) -> Self {
        {
            let mut repo = self.lock();
            repo.author_name = name.to_string();
            repo.author_email = email.to_string();
        }
        self
    }

    fn lock(&self) -> MutexGuard<'_, Repo> {
        self.repo.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create a root commit on `branch` whose snapshot answers every file
    /// name with `content`. Replaces any existing head for that branch.
    pub fn seed(&self, branch: &str, message: &str, content: &str) -> Oid {
        let mut repo = self.lock();
        repo.branches.remove(branch);
        repo.commit(branch, message, None, content)
    }

    /// Commit `content` on `branch` directly, as another writer would.
    pub fn commit(&self, branch: &str, message: &str, content: &str) -> Oid {
        self.lock().commit(branch, message, None, content)
    }

    /// Current head of `branch`.
    pub fn head(&self, branch: &str) -> Option<Oid> {
        self.lock().branches.get(branch).cloned()
    }

    /// Delay every read and write by `latency`.
    pub fn set_latency(&self, latency: Option<Duration>) {
        self.lock().latency = latency;
    }

    /// Hold back the acknowledgement of every tip write by `delay`. The
    /// commit lands immediately; only the reply to the writer is late.
    pub fn delay_write_ack(&self, delay: Option<Duration>) {
        self.lock().write_ack_delay = delay;
    }

    /// Answer the next read of `path` with the content it has now, but
    /// deliver it `delay` later.
    pub fn delay_next_read(&self, path: impl Into<PathBuf>, delay: Duration) {
        self.lock().late_reads.insert(path.into(), delay);
    }

    /// Make reads of `path` fail until [`MemoryStore::clear_failures`].
    pub fn fail_reads(&self, path: impl Into<PathBuf>) {
        self.lock().failing.insert(path.into());
    }

    /// Undo every [`MemoryStore::fail_reads`].
    pub fn clear_failures(&self) {
        self.lock().failing.clear();
    }

    /// Make every write fail while `reject` is set.
    pub fn reject_writes(&self, reject: bool) {
        self.lock().reject_writes = reject;
    }

    /// Serve `payload` verbatim from every history path.
    pub fn set_history_override(&self, payload: Option<String>) {
        self.lock().history_override = payload;
    }

    /// Number of successful tip writes received.
    pub fn write_count(&self) -> usize {
        self.lock().writes
    }

    fn latency(&self) -> Option<Duration> {
        self.lock().latency
    }

    fn take_late_read(&self, path: &Path) -> Option<Duration> {
        self.lock().late_reads.remove(path)
    }

    fn write_ack_delay(&self) -> Option<Duration> {
        self.lock().write_ack_delay
    }

    fn parse<'a>(&self, path: &'a Path) -> io::Result<Target<'a>> {
        let not_found = || {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("No such path: {}", path.display()),
            )
        };
        let text = path.to_str().ok_or_else(not_found)?;
        let meta_dir = format!("/.{}/", self.namespace);
        let rest = text.strip_prefix(meta_dir.as_str()).ok_or_else(not_found)?;

        if let Some(rest) = rest.strip_prefix("branches/") {
            if let Some((branch, meta)) = rest.split_once(meta_dir.as_str()) {
                return match meta {
                    "head" => Ok(Target::Head(branch)),
                    "history" => Ok(Target::History(branch)),
                    _ => Err(not_found()),
                };
            }
            let (branch, file) = rest.split_once('/').ok_or_else(not_found)?;
            if branch.is_empty() || file.is_empty() {
                return Err(not_found());
            }
            return Ok(Target::Tip { branch, file });
        }

        if let Some(rest) = rest.strip_prefix("commits/") {
            let mut parts = rest.splitn(3, '/');
            let (Some(prefix), Some(remainder), Some(file)) =
                (parts.next(), parts.next(), parts.next())
            else {
                return Err(not_found());
            };
            if prefix.len() != 2 || remainder.is_empty() || file.is_empty() {
                return Err(not_found());
            }
            return Ok(Target::AtCommit {
                oid: format!("{prefix}{remainder}"),
                file,
            });
        }

        Err(not_found())
    }

    fn read_now(&self, path: &Path) -> io::Result<String> {
        let target = self.parse(path)?;
        let repo = self.lock();
        if repo.failing.contains(path) {
            return Err(io::Error::other(format!(
                "Injected read failure: {}",
                path.display()
            )));
        }

        match target {
            Target::Head(branch) => repo
                .branches
                .get(branch)
                .map(|oid| oid.to_string())
                .ok_or_else(|| missing(path)),
            Target::History(branch) => {
                if let Some(payload) = &repo.history_override {
                    return Ok(payload.clone());
                }
                let head = repo.branches.get(branch).ok_or_else(|| missing(path))?;
                let records = repo.first_parent_chain(head);
                serde_json::to_string(&records).map_err(io::Error::other)
            }
            Target::Tip { branch, file } => {
                let head = repo.branches.get(branch).ok_or_else(|| missing(path))?;
                repo.file_at(head, file).ok_or_else(|| missing(path))
            }
            Target::AtCommit { oid, file } => repo
                .file_at(&Oid::new(oid), file)
                .ok_or_else(|| missing(path)),
        }
    }

    fn write_now(&self, path: &Path, content: &str) -> io::Result<()> {
        match self.parse(path)? {
            Target::Tip { branch, file } => {
                let mut repo = self.lock();
                if repo.reject_writes {
                    return Err(io::Error::other(format!(
                        "Injected write failure: {}",
                        path.display()
                    )));
                }
                let message = format!("Update {file}");
                let oid = repo.commit(branch, &message, Some(file), content);
                repo.writes += 1;
                log::debug!("[MemoryStore] {} advanced to {}", branch, oid.short());
                Ok(())
            }
            _ => Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("Read-only path: {}", path.display()),
            )),
        }
    }
}

fn missing(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("Not yet available: {}", path.display()),
    )
}

impl Repo {
    /// Record a commit on `branch`. With `file == None` the content becomes the
    /// snapshot's default file, which every file name resolves to.
    fn commit(&mut self, branch: &str, message: &str, file: Option<&str>, content: &str) -> Oid {
        self.counter += 1;
        let parent = self.branches.get(branch).cloned();

        let mut files = parent
            .as_ref()
            .and_then(|p| self.commits.get(p))
            .map(|c| c.files.clone())
            .unwrap_or_default();
        match file {
            Some(name) => {
                files.insert(name.to_string(), content.to_string());
            }
            None => {
                files.clear();
                files.insert(String::new(), content.to_string());
            }
        }

        let mut hasher = Sha256::new();
        hasher.update(self.counter.to_be_bytes());
        if let Some(p) = &parent {
            hasher.update(p.as_str().as_bytes());
        }
        hasher.update(message.as_bytes());
        for (name, body) in &files {
            hasher.update(name.as_bytes());
            hasher.update([0u8]);
            hasher.update(body.as_bytes());
        }
        let digest = format!("{:x}", hasher.finalize());
        let oid = Oid::new(&digest[..40]);

        let signature = Signature {
            name: self.author_name.clone(),
            email: self.author_email.clone(),
            timestamp: chrono::Utc::now().timestamp(),
            timezone_offset: Some(0),
        };
        let record = CommitRecord {
            oid: oid.clone(),
            message: message.to_string(),
            parent_oids: parent.into_iter().collect(),
            tree: None,
            author: signature.clone(),
            committer: signature,
        };

        self.commits
            .insert(oid.clone(), StoredCommit { record, files });
        self.branches.insert(branch.to_string(), oid.clone());
        oid
    }

    fn file_at(&self, oid: &Oid, file: &str) -> Option<String> {
        let commit = self.commits.get(oid)?;
        commit
            .files
            .get(file)
            .or_else(|| commit.files.get(""))
            .cloned()
    }

    fn first_parent_chain(&self, head: &Oid) -> Vec<CommitRecord> {
        let mut records = Vec::new();
        let mut cursor = Some(head.clone());
        while let Some(oid) = cursor {
            let Some(commit) = self.commits.get(&oid) else {
                break;
            };
            cursor = commit.record.first_parent().cloned();
            records.push(commit.record.clone());
        }
        records
    }
}

impl VersionStore for MemoryStore {
    fn read_to_string(&self, path: &Path) -> impl Future<Output = io::Result<String>> + Send {
        let latency = self.latency();
        async move {
            if let Some(delay) = latency {
                tokio::time::sleep(delay).await;
            }
            let result = self.read_now(path);
            if let Some(delay) = self.take_late_read(path) {
                log::debug!("[MemoryStore] Delivering {} after {:?}", path.display(), delay);
                tokio::time::sleep(delay).await;
            }
            result
        }
    }

    fn write_file(&self, path: &Path, content: &str) -> impl Future<Output = io::Result<()>> + Send {
        let latency = self.latency();
        async move {
            if let Some(delay) = latency {
                tokio::time::sleep(delay).await;
            }
            let result = self.write_now(path, content);
            if let Some(delay) = self.write_ack_delay() {
                tokio::time::sleep(delay).await;
            }
            result
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> MemoryStore {
        MemoryStore::new(StorePaths::default())
    }

    #[test]
    fn test_parse_targets() {
        let s = store();
        let paths = StorePaths::default();
        assert_eq!(s.parse(&paths.head()).unwrap(), Target::Head("main"));
        assert_eq!(s.parse(&paths.history()).unwrap(), Target::History("main"));
        assert_eq!(
            s.parse(&paths.tip()).unwrap(),
            Target::Tip {
                branch: "main",
                file: "document.txt"
            }
        );
        assert_eq!(
            s.parse(&paths.commit_file(&Oid::new("abcdef")).unwrap())
                .unwrap(),
            Target::AtCommit {
                oid: "abcdef".to_string(),
                file: "document.txt"
            }
        );
        assert!(s.parse(Path::new("/elsewhere/file")).is_err());
    }

    #[test]
    fn test_history_is_newest_first() {
        let s = store();
        let root = s.seed("main", "Initial commit", "Hello World");
        let second = s.commit("main", "Second", "Hello");

        let raw = s.read_now(&StorePaths::default().history()).unwrap();
        let records: Vec<CommitRecord> = serde_json::from_str(&raw).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].oid, second);
        assert_eq!(records[0].parent_oids, vec![root.clone()]);
        assert_eq!(records[1].oid, root);
        assert!(records[1].parent_oids.is_empty());
    }

    #[test]
    fn test_tip_write_advances_head() {
        let s = store();
        let root = s.seed("main", "Initial commit", "Hello World");
        let paths = StorePaths::default();

        s.write_now(&paths.tip(), "Changed").unwrap();
        let head = s.head("main").unwrap();

        assert_ne!(head, root);
        assert_eq!(s.write_count(), 1);
        assert_eq!(s.read_now(&paths.commit_file(&head).unwrap()).unwrap(), "Changed");
        assert_eq!(
            s.read_now(&paths.commit_file(&root).unwrap()).unwrap(),
            "Hello World"
        );
    }

    #[test]
    fn test_metadata_paths_are_read_only() {
        let s = store();
        s.seed("main", "Initial commit", "Hello World");
        let err = s
            .write_now(&StorePaths::default().head(), "deadbeef")
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
    }

    #[test]
    fn test_injected_failures() {
        let s = store();
        s.seed("main", "Initial commit", "Hello World");
        let head_path = StorePaths::default().head();

        s.fail_reads(head_path.clone());
        assert!(s.read_now(&head_path).is_err());
        s.clear_failures();
        assert!(s.read_now(&head_path).is_ok());

        s.reject_writes(true);
        assert!(s.write_now(&StorePaths::default().tip(), "x").is_err());
        assert_eq!(s.write_count(), 0);
    }

    #[test]
    fn test_commits_carry_configured_author() {
        let s = store().with_author("Ada", "ada@example.com");
        s.seed("main", "Initial commit", "Hello World");

        let raw = s.read_now(&StorePaths::default().history()).unwrap();
        let records: Vec<CommitRecord> = serde_json::from_str(&raw).unwrap();
        assert_eq!(records[0].author.name, "Ada");
        assert_eq!(records[0].committer.email, "ada@example.com");
        assert_eq!(records[0].message, "Initial commit");
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_read_answers_with_earlier_content() {
        let s = store();
        let root = s.seed("main", "Initial commit", "Hello World");
        let head_path = StorePaths::default().head();
        s.delay_next_read(head_path.clone(), Duration::from_secs(2));

        let read = tokio::spawn({
            let s = s.clone();
            let head_path = head_path.clone();
            async move { s.read_to_string(&head_path).await }
        });
        tokio::time::sleep(Duration::from_secs(1)).await;
        let next = s.commit("main", "Second", "Hello");

        assert_eq!(read.await.unwrap().unwrap(), root.to_string());
        assert_eq!(s.read_to_string(&head_path).await.unwrap(), next.to_string());
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_lands_before_its_ack() {
        let s = store();
        let root = s.seed("main", "Initial commit", "Hello World");
        s.delay_write_ack(Some(Duration::from_secs(1)));

        let write = tokio::spawn({
            let s = s.clone();
            async move { s.write_file(&StorePaths::default().tip(), "Changed").await }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_ne!(s.head("main"), Some(root));
        assert!(!write.is_finished());

        assert!(write.await.unwrap().is_ok());
        assert_eq!(s.write_count(), 1);
    }

    #[test]
    fn test_unpopulated_branch_is_not_found() {
        let s = store();
        let err = s.read_now(&StorePaths::default().history()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
