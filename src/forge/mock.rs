//! forge::mock
//!
//! In-memory object store for deterministic testing.
//!
//! # Design
//!
//! The mock keeps a content-addressed object database per repository:
//! blobs, trees and commits are hashed with SHA-256 over a git-like
//! encoding, so identical content always yields the same [`Oid`]. Refs are
//! a map from full ref name to commit. `update_ref` enforces both
//! compare-and-swap against `expected` and fast-forward ancestry.
//!
//! Beyond plain storage the mock can inject failures ([`FailOn`]), stall an
//! operation forever, cancel a token when an operation starts, move a branch
//! just before the next ref update (to simulate a concurrent writer) and
//! truncate recursive listings.
//!
//! # Example
//!
//! ```
//! use forgetree::core::types::{BranchName, RepoId};
//! use forgetree::forge::mock::MockForge;
//! use forgetree::forge::ObjectStore;
//!
//! # tokio_test::block_on(async {
//! let forge = MockForge::new();
//! let repo = RepoId::parse("octocat/hello-world").unwrap();
//! let main = BranchName::new("main").unwrap();
//!
//! let head = forge
//!     .commit_files(&repo, &main, &[("README.md", "hello\n")], "Initial commit")
//!     .unwrap();
//!
//! assert_eq!(forge.resolve_ref(&repo, &main).await.unwrap(), head);
//! # });
//! ```

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use tokio_util::sync::CancellationToken;

use super::traits::{
    CommitInfo, EntryKind, FileContent, FileMode, ForgeError, NewCommit, NewTreeEntry,
    ObjectStore, RepoMetadata, TreeEntry, TreeListing,
};
use crate::core::request::{decode_base64, BlobEncoding};
use crate::core::types::{BranchName, Oid, RefName, RepoId, RepoPath};

/// Mock object store for testing.
///
/// Thread-safe via internal `Arc<Mutex<...>>` wrapping; clones share state.
#[derive(Debug, Clone)]
pub struct MockForge {
    inner: Arc<Mutex<MockForgeInner>>,
}

#[derive(Debug, Default)]
struct MockForgeInner {
    repos: HashMap<RepoId, MockRepo>,
    fail_on: Option<FailOn>,
    operations: Vec<MockOperation>,
    stall_on: Option<&'static str>,
    cancel_on: Option<(&'static str, CancellationToken)>,
    advance_before_update: Option<PendingAdvance>,
    listing_limit: Option<usize>,
    blobs_in_flight: usize,
    max_blobs_in_flight: usize,
}

/// A commit applied out-of-band right before the next `update_ref`.
#[derive(Debug)]
struct PendingAdvance {
    repo: RepoId,
    branch: BranchName,
    path: RepoPath,
    content: Vec<u8>,
}

/// Configuration for which operation should fail.
#[derive(Debug, Clone)]
pub enum FailOn {
    ResolveRef(ForgeError),
    GetCommit(ForgeError),
    /// Fail every create_blob call.
    CreateBlob(ForgeError),
    /// Fail only the n-th create_blob call (0-based).
    CreateBlobAt(usize, ForgeError),
    CreateTree(ForgeError),
    CreateCommit(ForgeError),
    UpdateRef(ForgeError),
    CreateRef(ForgeError),
    ReadTree(ForgeError),
    ReadFile(ForgeError),
    RepoMetadata(ForgeError),
}

/// Recorded operation for test verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOperation {
    ResolveRef { branch: BranchName },
    GetCommit { sha: Oid },
    CreateBlob { encoding: BlobEncoding, len: usize },
    CreateTree { base_tree: Option<Oid>, paths: Vec<RepoPath> },
    CreateCommit { tree: Oid, parents: Vec<Oid> },
    UpdateRef { branch: BranchName, sha: Oid },
    CreateRef { name: RefName, sha: Oid },
    ReadTree { sha: Oid, recursive: bool },
    ReadFile { path: RepoPath, branch: BranchName },
    RepoMetadata,
}

impl MockOperation {
    /// Name of the store method this operation records.
    pub fn name(&self) -> &'static str {
        match self {
            MockOperation::ResolveRef { .. } => "resolve_ref",
            MockOperation::GetCommit { .. } => "get_commit",
            MockOperation::CreateBlob { .. } => "create_blob",
            MockOperation::CreateTree { .. } => "create_tree",
            MockOperation::CreateCommit { .. } => "create_commit",
            MockOperation::UpdateRef { .. } => "update_ref",
            MockOperation::CreateRef { .. } => "create_ref",
            MockOperation::ReadTree { .. } => "read_tree",
            MockOperation::ReadFile { .. } => "read_file",
            MockOperation::RepoMetadata => "repo_metadata",
        }
    }

    /// Whether this operation writes to the store.
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            MockOperation::CreateBlob { .. }
                | MockOperation::CreateTree { .. }
                | MockOperation::CreateCommit { .. }
                | MockOperation::UpdateRef { .. }
                | MockOperation::CreateRef { .. }
        )
    }
}

impl MockForge {
    /// Create a new empty mock store.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockForgeInner::default())),
        }
    }

    /// Configure the mock to fail on a specific operation.
    ///
    /// # Example
    ///
    /// ```
    /// use forgetree::forge::mock::{MockForge, FailOn};
    /// use forgetree::forge::ForgeError;
    ///
    /// let forge = MockForge::new().fail_on(FailOn::CreateTree(ForgeError::Unavailable {
    ///     status: Some(502),
    ///     message: "bad gateway".into(),
    ///     detail: None,
    /// }));
    /// ```
    pub fn fail_on(self, fail_on: FailOn) -> Self {
        self.lock().fail_on = Some(fail_on);
        self
    }

    /// Clear the failure configuration.
    pub fn clear_fail_on(&self) {
        self.lock().fail_on = None;
    }

    /// Make the named operation hang forever once called.
    pub fn stall_on(self, op: &'static str) -> Self {
        self.lock().stall_on = Some(op);
        self
    }

    /// Cancel `token` when the named operation is called. The operation
    /// itself still completes.
    pub fn cancel_on(self, op: &'static str, token: CancellationToken) -> Self {
        self.lock().cancel_on = Some((op, token));
        self
    }

    /// Before the next `update_ref`, commit `path = content` onto `branch`
    /// as if another writer got there first.
    ///
    /// # Errors
    ///
    /// Returns `ForgeError::InvalidRequest` if `path` is not a valid path.
    pub fn advance_before_update(
        self,
        repo: &RepoId,
        branch: &BranchName,
        path: &str,
        content: &str,
    ) -> Result<Self, ForgeError> {
        let path = RepoPath::literal(path).map_err(|e| ForgeError::InvalidRequest(e.to_string()))?;
        self.lock().advance_before_update = Some(PendingAdvance {
            repo: repo.clone(),
            branch: branch.clone(),
            path,
            content: content.as_bytes().to_vec(),
        });
        Ok(self)
    }

    /// Truncate recursive listings after `max` entries.
    pub fn limit_listings(self, max: usize) -> Self {
        self.lock().listing_limit = Some(max);
        self
    }

    /// Get all recorded operations.
    pub fn operations(&self) -> Vec<MockOperation> {
        self.lock().operations.clone()
    }

    /// Clear recorded operations.
    pub fn clear_operations(&self) {
        self.lock().operations.clear();
    }

    /// Highest number of blob uploads observed in flight at once.
    pub fn max_blobs_in_flight(&self) -> usize {
        self.lock().max_blobs_in_flight
    }

    /// Commit text files onto `branch` directly, creating the repository and
    /// branch if needed. The first branch of a repository becomes its
    /// default branch.
    ///
    /// # Errors
    ///
    /// Returns `ForgeError::InvalidRequest` for an invalid path.
    pub fn commit_files(
        &self,
        repo: &RepoId,
        branch: &BranchName,
        files: &[(&str, &str)],
        message: &str,
    ) -> Result<Oid, ForgeError> {
        let files = files
            .iter()
            .map(|(path, content)| {
                RepoPath::literal(path)
                    .map(|p| (p, content.as_bytes().to_vec()))
                    .map_err(|e| ForgeError::InvalidRequest(e.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut inner = self.lock();
        inner
            .repos
            .entry(repo.clone())
            .or_default()
            .commit_files(branch, &files, message)
    }

    /// Current head of a branch (for test verification).
    pub fn branch_head(&self, repo: &RepoId, branch: &BranchName) -> Option<Oid> {
        let inner = self.lock();
        inner.repos.get(repo)?.head(branch).ok()
    }

    /// File bytes at the head of a branch (for test verification).
    pub fn file_bytes(&self, repo: &RepoId, branch: &BranchName, path: &str) -> Option<Vec<u8>> {
        let path = RepoPath::literal(path).ok()?;
        let inner = self.lock();
        let store = inner.repos.get(repo)?;
        let head = store.head(branch).ok()?;
        let slot = store.lookup(&store.commit(&head).ok()?.tree, &path).ok()?;
        match store.objects.get(&slot.sha)? {
            Object::Blob(bytes) => Some(bytes.clone()),
            _ => None,
        }
    }

    /// Read a commit (for test verification).
    pub fn commit_info(&self, repo: &RepoId, sha: &Oid) -> Option<CommitInfo> {
        let inner = self.lock();
        let commit = inner.repos.get(repo)?.commit(sha).ok()?;
        Some(commit.info(sha))
    }

    /// Number of stored objects in a repository.
    pub fn object_count(&self, repo: &RepoId) -> usize {
        self.lock()
            .repos
            .get(repo)
            .map_or(0, |r| r.objects.len())
    }

    fn lock(&self) -> MutexGuard<'_, MockForgeInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record an operation and apply hooks. Stalls forever if configured.
    async fn enter(&self, op: MockOperation) -> Result<(), ForgeError> {
        let name = op.name();
        let stall = {
            let mut inner = self.lock();
            inner.operations.push(op);
            if let Some((target, token)) = &inner.cancel_on {
                if *target == name {
                    token.cancel();
                }
            }
            if let Some(err) = inner.check_fail(name) {
                return Err(err);
            }
            inner.stall_on == Some(name)
        };

        if stall {
            std::future::pending::<()>().await;
        }
        Ok(())
    }
}

impl Default for MockForge {
    fn default() -> Self {
        Self::new()
    }
}

impl MockForgeInner {
    /// Check if we should fail and return the error if so.
    fn check_fail(&self, name: &str) -> Option<ForgeError> {
        let fail_on = self.fail_on.as_ref()?;
        let error = match (fail_on, name) {
            (FailOn::ResolveRef(e), "resolve_ref")
            | (FailOn::GetCommit(e), "get_commit")
            | (FailOn::CreateBlob(e), "create_blob")
            | (FailOn::CreateTree(e), "create_tree")
            | (FailOn::CreateCommit(e), "create_commit")
            | (FailOn::UpdateRef(e), "update_ref")
            | (FailOn::CreateRef(e), "create_ref")
            | (FailOn::ReadTree(e), "read_tree")
            | (FailOn::ReadFile(e), "read_file")
            | (FailOn::RepoMetadata(e), "repo_metadata") => e,
            (FailOn::CreateBlobAt(n, e), "create_blob") => {
                let calls = self
                    .operations
                    .iter()
                    .filter(|op| op.name() == "create_blob")
                    .count();
                if calls != *n + 1 {
                    return None;
                }
                e
            }
            _ => return None,
        };
        Some(error.clone())
    }

    fn repo(&self, repo: &RepoId) -> Result<&MockRepo, ForgeError> {
        self.repos
            .get(repo)
            .ok_or_else(|| ForgeError::not_found(format!("repository {} not found", repo)))
    }

    fn repo_mut(&mut self, repo: &RepoId) -> Result<&mut MockRepo, ForgeError> {
        self.repos
            .get_mut(repo)
            .ok_or_else(|| ForgeError::not_found(format!("repository {} not found", repo)))
    }
}

// --------------------------------------------------------------------------
// Object database
// --------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum Object {
    Blob(Vec<u8>),
    Tree(BTreeMap<String, TreeSlot>),
    Commit(StoredCommit),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct TreeSlot {
    mode: FileMode,
    kind: EntryKind,
    sha: Oid,
}

#[derive(Debug, Clone)]
struct StoredCommit {
    tree: Oid,
    parents: Vec<Oid>,
    message: String,
}

impl StoredCommit {
    fn info(&self, sha: &Oid) -> CommitInfo {
        CommitInfo {
            sha: sha.clone(),
            tree: self.tree.clone(),
            parents: self.parents.clone(),
            message: self.message.clone(),
        }
    }
}

fn hash_object(kind: &str, body: &[u8]) -> Oid {
    let mut hasher = Sha256::new();
    hasher.update(format!("{} {}\0", kind, body.len()).as_bytes());
    hasher.update(body);
    Oid::from_sha256(hasher.finalize().into())
}

/// Storage for one repository.
#[derive(Debug, Default)]
struct MockRepo {
    objects: HashMap<Oid, Object>,
    /// Full ref name to target
    refs: BTreeMap<String, Oid>,
    default_branch: Option<BranchName>,
    /// Time of the last ref write
    pushed_at: Option<DateTime<Utc>>,
}

impl MockRepo {
    fn set_ref(&mut self, name: &RefName, sha: Oid) {
        self.refs.insert(name.as_str().to_string(), sha);
        self.pushed_at = Some(Utc::now());
    }

    fn put(&mut self, object: Object) -> Oid {
        let oid = match &object {
            Object::Blob(bytes) => hash_object("blob", bytes),
            Object::Tree(entries) => {
                let mut body = Vec::new();
                for (name, slot) in entries {
                    body.extend_from_slice(
                        format!("{} {}\0{}", slot.mode.as_str(), name, slot.sha).as_bytes(),
                    );
                }
                hash_object("tree", &body)
            }
            Object::Commit(commit) => {
                let mut body = format!("tree {}\n", commit.tree);
                for parent in &commit.parents {
                    body.push_str(&format!("parent {}\n", parent));
                }
                body.push('\n');
                body.push_str(&commit.message);
                hash_object("commit", body.as_bytes())
            }
        };
        self.objects.entry(oid.clone()).or_insert(object);
        oid
    }

    fn head(&self, branch: &BranchName) -> Result<Oid, ForgeError> {
        self.refs
            .get(RefName::for_branch(branch).as_str())
            .cloned()
            .ok_or_else(|| ForgeError::not_found(format!("branch '{}' not found", branch)))
    }

    fn commit(&self, sha: &Oid) -> Result<&StoredCommit, ForgeError> {
        match self.objects.get(sha) {
            Some(Object::Commit(commit)) => Ok(commit),
            _ => Err(ForgeError::not_found(format!("commit {} not found", sha))),
        }
    }

    fn tree(&self, sha: &Oid) -> Result<&BTreeMap<String, TreeSlot>, ForgeError> {
        match self.objects.get(sha) {
            Some(Object::Tree(entries)) => Ok(entries),
            _ => Err(ForgeError::not_found(format!("tree {} not found", sha))),
        }
    }

    /// Resolve a tree or commit id to a tree id.
    fn tree_ish(&self, sha: &Oid) -> Result<Oid, ForgeError> {
        match self.objects.get(sha) {
            Some(Object::Tree(_)) => Ok(sha.clone()),
            Some(Object::Commit(commit)) => Ok(commit.tree.clone()),
            _ => Err(ForgeError::not_found(format!("tree {} not found", sha))),
        }
    }

    /// Find the entry at `path` below `tree`.
    fn lookup(&self, tree: &Oid, path: &RepoPath) -> Result<TreeSlot, ForgeError> {
        let missing = || ForgeError::not_found(format!("path '{}' not found", path));
        let mut current = tree.clone();
        let mut segments = path.as_str().split('/').peekable();
        while let Some(name) = segments.next() {
            let slot = self.tree(&current)?.get(name).ok_or_else(missing)?;
            if segments.peek().is_none() {
                return Ok(slot.clone());
            }
            if slot.kind != EntryKind::Tree {
                return Err(missing());
            }
            current = slot.sha.clone();
        }
        Err(missing())
    }

    fn write_tree(
        &mut self,
        base: Option<&Oid>,
        entries: &[NewTreeEntry],
    ) -> Result<Oid, ForgeError> {
        let mut root = match base {
            Some(sha) => self
                .tree(sha)
                .map_err(|_| ForgeError::rejected(422, format!("base_tree {} is not a tree", sha)))?
                .clone(),
            None => BTreeMap::new(),
        };

        for entry in entries {
            let valid = match (self.objects.get(&entry.sha), entry.kind) {
                (Some(Object::Blob(_)), EntryKind::Blob) => true,
                (Some(Object::Tree(_)), EntryKind::Tree) => true,
                (_, EntryKind::Commit) => true,
                _ => false,
            };
            if !valid {
                return Err(ForgeError::rejected(
                    422,
                    format!("tree.sha {} is not a valid {:?}", entry.sha, entry.kind),
                ));
            }

            let segments: Vec<&str> = entry.path.as_str().split('/').collect();
            let slot = TreeSlot {
                mode: entry.mode,
                kind: entry.kind,
                sha: entry.sha.clone(),
            };
            root = self.insert(root, &segments, slot)?;
        }

        Ok(self.put(Object::Tree(root)))
    }

    fn insert(
        &mut self,
        mut tree: BTreeMap<String, TreeSlot>,
        segments: &[&str],
        slot: TreeSlot,
    ) -> Result<BTreeMap<String, TreeSlot>, ForgeError> {
        match segments {
            [] => {}
            [name] => {
                tree.insert((*name).to_string(), slot);
            }
            [dir, rest @ ..] => {
                let child = match tree.get(*dir) {
                    Some(existing) if existing.kind == EntryKind::Tree => {
                        self.tree(&existing.sha)?.clone()
                    }
                    Some(_) => {
                        return Err(ForgeError::rejected(
                            422,
                            format!("'{}' is not a directory", dir),
                        ))
                    }
                    None => BTreeMap::new(),
                };
                let child = self.insert(child, rest, slot)?;
                let sha = self.put(Object::Tree(child));
                tree.insert(
                    (*dir).to_string(),
                    TreeSlot {
                        mode: FileMode::Directory,
                        kind: EntryKind::Tree,
                        sha,
                    },
                );
            }
        }
        Ok(tree)
    }

    fn list(
        &self,
        tree: &Oid,
        prefix: &str,
        recursive: bool,
        out: &mut Vec<TreeEntry>,
    ) -> Result<(), ForgeError> {
        for (name, slot) in self.tree(tree)? {
            let path = format!("{}{}", prefix, name);
            let size = match self.objects.get(&slot.sha) {
                Some(Object::Blob(bytes)) => Some(bytes.len() as u64),
                _ => None,
            };
            out.push(TreeEntry {
                path: path.clone(),
                mode: slot.mode,
                kind: slot.kind,
                sha: slot.sha.clone(),
                size,
            });
            if recursive && slot.kind == EntryKind::Tree {
                self.list(&slot.sha, &format!("{}/", path), true, out)?;
            }
        }
        Ok(())
    }

    fn is_ancestor(&self, ancestor: &Oid, descendant: &Oid) -> bool {
        let mut queue = VecDeque::from([descendant.clone()]);
        let mut seen = HashSet::new();
        while let Some(sha) = queue.pop_front() {
            if &sha == ancestor {
                return true;
            }
            if !seen.insert(sha.clone()) {
                continue;
            }
            if let Ok(commit) = self.commit(&sha) {
                queue.extend(commit.parents.iter().cloned());
            }
        }
        false
    }

    fn commit_files(
        &mut self,
        branch: &BranchName,
        files: &[(RepoPath, Vec<u8>)],
        message: &str,
    ) -> Result<Oid, ForgeError> {
        let parent = self.head(branch).ok();
        let base_tree = match &parent {
            Some(sha) => Some(self.commit(sha)?.tree.clone()),
            None => None,
        };

        let entries: Vec<NewTreeEntry> = files
            .iter()
            .map(|(path, bytes)| {
                let sha = self.put(Object::Blob(bytes.clone()));
                NewTreeEntry::blob(path.clone(), sha)
            })
            .collect();
        let tree = self.write_tree(base_tree.as_ref(), &entries)?;

        let commit = self.put(Object::Commit(StoredCommit {
            tree,
            parents: parent.into_iter().collect(),
            message: message.to_string(),
        }));
        self.set_ref(&RefName::for_branch(branch), commit.clone());
        if self.default_branch.is_none() {
            self.default_branch = Some(branch.clone());
        }
        Ok(commit)
    }
}

#[async_trait]
impl ObjectStore for MockForge {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn resolve_ref(&self, repo: &RepoId, branch: &BranchName) -> Result<Oid, ForgeError> {
        self.enter(MockOperation::ResolveRef {
            branch: branch.clone(),
        })
        .await?;

        self.lock().repo(repo)?.head(branch)
    }

    async fn get_commit(&self, repo: &RepoId, sha: &Oid) -> Result<CommitInfo, ForgeError> {
        self.enter(MockOperation::GetCommit { sha: sha.clone() })
            .await?;

        let inner = self.lock();
        Ok(inner.repo(repo)?.commit(sha)?.info(sha))
    }

    async fn create_blob(
        &self,
        repo: &RepoId,
        content: &str,
        encoding: BlobEncoding,
    ) -> Result<Oid, ForgeError> {
        self.enter(MockOperation::CreateBlob {
            encoding,
            len: content.len(),
        })
        .await?;

        {
            let mut inner = self.lock();
            inner.blobs_in_flight += 1;
            inner.max_blobs_in_flight = inner.max_blobs_in_flight.max(inner.blobs_in_flight);
        }
        // Let other uploads start so concurrency is observable
        tokio::task::yield_now().await;

        let mut inner = self.lock();
        inner.blobs_in_flight -= 1;

        let bytes = match encoding {
            BlobEncoding::Utf8 => content.as_bytes().to_vec(),
            BlobEncoding::Base64 => decode_base64(content)
                .map_err(|e| ForgeError::rejected(422, format!("invalid base64 content: {}", e)))?,
        };
        Ok(inner.repo_mut(repo)?.put(Object::Blob(bytes)))
    }

    async fn create_tree(
        &self,
        repo: &RepoId,
        base_tree: Option<&Oid>,
        entries: &[NewTreeEntry],
    ) -> Result<Oid, ForgeError> {
        self.enter(MockOperation::CreateTree {
            base_tree: base_tree.cloned(),
            paths: entries.iter().map(|e| e.path.clone()).collect(),
        })
        .await?;

        self.lock().repo_mut(repo)?.write_tree(base_tree, entries)
    }

    async fn create_commit(&self, repo: &RepoId, commit: &NewCommit) -> Result<Oid, ForgeError> {
        self.enter(MockOperation::CreateCommit {
            tree: commit.tree.clone(),
            parents: commit.parents.clone(),
        })
        .await?;

        let mut inner = self.lock();
        let store = inner.repo_mut(repo)?;
        if store.tree(&commit.tree).is_err() {
            return Err(ForgeError::rejected(
                422,
                format!("tree {} does not exist", commit.tree),
            ));
        }
        if let Some(missing) = commit.parents.iter().find(|p| store.commit(p).is_err()) {
            return Err(ForgeError::rejected(
                422,
                format!("parent {} does not exist", missing),
            ));
        }

        Ok(store.put(Object::Commit(StoredCommit {
            tree: commit.tree.clone(),
            parents: commit.parents.clone(),
            message: commit.message.clone(),
        })))
    }

    async fn update_ref(
        &self,
        repo: &RepoId,
        branch: &BranchName,
        new: &Oid,
        expected: &Oid,
    ) -> Result<(), ForgeError> {
        self.enter(MockOperation::UpdateRef {
            branch: branch.clone(),
            sha: new.clone(),
        })
        .await?;

        let mut inner = self.lock();
        if let Some(advance) = inner.advance_before_update.take() {
            inner.repos.entry(advance.repo).or_default().commit_files(
                &advance.branch,
                &[(advance.path, advance.content)],
                "Concurrent update",
            )?;
        }

        let store = inner.repo_mut(repo)?;
        let current = store.head(branch)?;
        if store.commit(new).is_err() {
            return Err(ForgeError::rejected(422, "Object does not exist"));
        }
        if current != *expected || !store.is_ancestor(&current, new) {
            return Err(ForgeError::conflict("Update is not a fast forward"));
        }

        store.set_ref(&RefName::for_branch(branch), new.clone());
        Ok(())
    }

    async fn create_ref(&self, repo: &RepoId, name: &RefName, sha: &Oid) -> Result<(), ForgeError> {
        self.enter(MockOperation::CreateRef {
            name: name.clone(),
            sha: sha.clone(),
        })
        .await?;

        let mut inner = self.lock();
        let store = inner.repo_mut(repo)?;
        if !store.objects.contains_key(sha) {
            return Err(ForgeError::rejected(422, "Object does not exist"));
        }
        if store.refs.contains_key(name.as_str()) {
            return Err(ForgeError::conflict("Reference already exists"));
        }
        store.set_ref(name, sha.clone());
        Ok(())
    }

    async fn read_tree(
        &self,
        repo: &RepoId,
        sha: &Oid,
        recursive: bool,
    ) -> Result<TreeListing, ForgeError> {
        self.enter(MockOperation::ReadTree {
            sha: sha.clone(),
            recursive,
        })
        .await?;

        let inner = self.lock();
        let store = inner.repo(repo)?;
        let tree = store.tree_ish(sha)?;
        let mut entries = Vec::new();
        store.list(&tree, "", recursive, &mut entries)?;

        let mut truncated = false;
        if let Some(limit) = inner.listing_limit.filter(|_| recursive) {
            if entries.len() > limit {
                entries.truncate(limit);
                truncated = true;
            }
        }

        Ok(TreeListing {
            sha: tree,
            entries,
            truncated,
        })
    }

    async fn read_file(
        &self,
        repo: &RepoId,
        path: &RepoPath,
        branch: &BranchName,
    ) -> Result<FileContent, ForgeError> {
        self.enter(MockOperation::ReadFile {
            path: path.clone(),
            branch: branch.clone(),
        })
        .await?;

        let inner = self.lock();
        let store = inner.repo(repo)?;
        let head = store.head(branch)?;
        let slot = store.lookup(&store.commit(&head)?.tree, path)?;
        match store.objects.get(&slot.sha) {
            Some(Object::Blob(bytes)) => Ok(FileContent {
                path: path.clone(),
                sha: slot.sha.clone(),
                size: bytes.len() as u64,
                encoding: BlobEncoding::Base64.as_str().to_string(),
                content: base64::engine::general_purpose::STANDARD.encode(bytes),
            }),
            _ => Err(ForgeError::not_found(format!("'{}' is a directory", path))),
        }
    }

    async fn repo_metadata(&self, repo: &RepoId) -> Result<RepoMetadata, ForgeError> {
        self.enter(MockOperation::RepoMetadata).await?;

        let inner = self.lock();
        let store = inner.repo(repo)?;
        Ok(RepoMetadata {
            full_name: repo.to_string(),
            default_branch: store
                .default_branch
                .as_ref()
                .map_or_else(|| "main".to_string(), |b| b.to_string()),
            private: false,
            html_url: format!("https://github.com/{}", repo),
            description: None,
            pushed_at: store.pushed_at,
        })
    }
}
