//! engine::tree_reader
//!
//! Read-only views of a branch: its tree, single files, and repository
//! metadata.
//!
//! A recursive listing that the remote truncates is completed by walking
//! sub-trees one level at a time, so callers always get every entry with
//! its full path.

use tracing::{debug, warn};

use crate::core::types::{BranchName, Oid, RepoId, RepoPath};
use crate::forge::{
    EntryKind, FileContent, ForgeError, ObjectStore, RepoMetadata, TreeEntry, TreeListing,
};

/// List the tree at the head of `branch`.
///
/// With `recursive`, entries of every depth are returned with full paths,
/// including the sub-tree entries themselves.
pub async fn list_tree(
    store: &dyn ObjectStore,
    repo: &RepoId,
    branch: &BranchName,
    recursive: bool,
) -> Result<TreeListing, ForgeError> {
    let head = store.resolve_ref(repo, branch).await?;
    let commit = store.get_commit(repo, &head).await?;
    debug!(%repo, %branch, tree = %commit.tree.short(7), recursive, "listing tree");

    let listing = store.read_tree(repo, &commit.tree, recursive).await?;
    if !(recursive && listing.truncated) {
        return Ok(listing);
    }

    warn!(%repo, %branch, "recursive listing truncated, walking sub-trees");
    let entries = walk(store, repo, &commit.tree).await?;
    Ok(TreeListing {
        sha: listing.sha,
        entries,
        truncated: false,
    })
}

/// List a tree by reading each sub-tree non-recursively.
async fn walk(
    store: &dyn ObjectStore,
    repo: &RepoId,
    root: &Oid,
) -> Result<Vec<TreeEntry>, ForgeError> {
    let mut entries = Vec::new();
    let mut pending = vec![(root.clone(), String::new())];

    while let Some((sha, prefix)) = pending.pop() {
        let level = store.read_tree(repo, &sha, false).await?;
        if level.truncated {
            warn!(%repo, tree = %sha.short(7), "sub-tree listing truncated");
        }
        for mut entry in level.entries {
            entry.path = format!("{}{}", prefix, entry.path);
            if entry.kind == EntryKind::Tree {
                pending.push((entry.sha.clone(), format!("{}/", entry.path)));
            }
            entries.push(entry);
        }
    }

    entries.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(entries)
}

/// Read one file at the head of `branch`.
pub async fn read_file(
    store: &dyn ObjectStore,
    repo: &RepoId,
    path: &RepoPath,
    branch: &BranchName,
) -> Result<FileContent, ForgeError> {
    store.read_file(repo, path, branch).await
}

/// Read repository metadata.
pub async fn repo_metadata(
    store: &dyn ObjectStore,
    repo: &RepoId,
) -> Result<RepoMetadata, ForgeError> {
    store.repo_metadata(repo).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forge::mock::MockForge;
    use crate::forge::ErrorKind;

    fn repo() -> RepoId {
        RepoId::parse("octocat/hello-world").unwrap()
    }

    fn main() -> BranchName {
        BranchName::new("main").unwrap()
    }

    fn seeded() -> MockForge {
        let forge = MockForge::new();
        forge
            .commit_files(
                &repo(),
                &main(),
                &[
                    ("README.md", "readme"),
                    ("src/lib.rs", "lib"),
                    ("src/engine/mod.rs", "mod"),
                    ("src/engine/deep/x.rs", "x"),
                ],
                "Initial commit",
            )
            .unwrap();
        forge
    }

    fn blob_paths(listing: &TreeListing) -> Vec<String> {
        let mut paths: Vec<String> = listing.blobs().map(|e| e.path.clone()).collect();
        paths.sort();
        paths
    }

    #[tokio::test]
    async fn recursive_lists_full_paths() {
        let forge = seeded();
        let listing = list_tree(&forge, &repo(), &main(), true).await.unwrap();
        assert_eq!(
            blob_paths(&listing),
            vec![
                "README.md",
                "src/engine/deep/x.rs",
                "src/engine/mod.rs",
                "src/lib.rs"
            ]
        );
        assert!(!listing.truncated);
    }

    #[tokio::test]
    async fn non_recursive_lists_top_level() {
        let forge = seeded();
        let listing = list_tree(&forge, &repo(), &main(), false).await.unwrap();
        let names: Vec<_> = listing.entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(names, vec!["README.md", "src"]);
    }

    #[tokio::test]
    async fn truncated_listing_is_completed() {
        let forge = seeded();
        let full = list_tree(&forge, &repo(), &main(), true).await.unwrap();

        let limited = forge.clone().limit_listings(2);
        let walked = list_tree(&limited, &repo(), &main(), true).await.unwrap();

        assert!(!walked.truncated);
        assert_eq!(blob_paths(&walked), blob_paths(&full));
        assert_eq!(walked.entries.len(), full.entries.len());
    }

    #[tokio::test]
    async fn missing_branch_not_found() {
        let forge = seeded();
        let err = list_tree(&forge, &repo(), &BranchName::new("gone").unwrap(), true)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn reads_file_and_metadata() {
        let forge = seeded();
        let file = read_file(&forge, &repo(), &RepoPath::new("src/lib.rs").unwrap(), &main())
            .await
            .unwrap();
        assert_eq!(file.decoded().unwrap(), b"lib");

        let meta = repo_metadata(&forge, &repo()).await.unwrap();
        assert_eq!(meta.full_name, "octocat/hello-world");
    }
}
