//! forge::github
//!
//! GitHub implementation of [`ObjectStore`] over the REST git data API.
//!
//! # Design
//!
//! One [`GitHubClient`] serves any number of repositories; the repository is
//! passed to every call. Each trait method maps to one request:
//!
//! | method          | request                                   |
//! |-----------------|-------------------------------------------|
//! | `resolve_ref`   | `GET git/ref/heads/{branch}`              |
//! | `get_commit`    | `GET git/commits/{sha}`                   |
//! | `create_blob`   | `POST git/blobs`                          |
//! | `create_tree`   | `POST git/trees`                          |
//! | `create_commit` | `POST git/commits`                        |
//! | `update_ref`    | `PATCH git/refs/heads/{branch}`           |
//! | `create_ref`    | `POST git/refs`                           |
//! | `read_tree`     | `GET git/trees/{sha}[?recursive=1]`       |
//! | `read_file`     | `GET contents/{path}?ref={branch}`        |
//! | `repo_metadata` | `GET /repos/{owner}/{repo}`               |
//!
//! The contents API withholds the body of files over 1 MB (`encoding:
//! "none"`); `read_file` then makes a second request, `GET git/blobs/{sha}`.
//!
//! `update_ref` is always sent with `force: false`, so GitHub refuses any
//! update that is not a fast-forward. GitHub has no compare-and-swap on refs;
//! callers get CAS semantics by making `expected` the only parent of `new`.
//!
//! # Status Mapping
//!
//! - 404, and 422 reporting "Reference does not exist", is `NotFound`
//! - 409, and 422 reporting a non-fast-forward or an existing ref, is
//!   `Conflict`
//! - any other 4xx is `Rejected`
//! - 5xx, transport failures and unreadable success bodies are `Unavailable`
//!
//! # Rate Limiting
//!
//! A 403/429 from rate limiting surfaces as `Rejected` with the remote
//! message. Nothing here retries.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::traits::{
    CommitInfo, EntryKind, FileContent, FileMode, ForgeError, NewCommit, NewTreeEntry,
    ObjectStore, RepoMetadata, TreeEntry, TreeListing,
};
use crate::core::config::DEFAULT_API_BASE;
use crate::core::request::BlobEncoding;
use crate::core::types::{BranchName, Oid, RefName, RepoId, RepoPath};

/// User-Agent header value for API requests.
const USER_AGENT_VALUE: &str = "forgetree";

/// GitHub REST API version pinned in every request.
const API_VERSION: &str = "2022-11-28";

/// GitHub object store.
pub struct GitHubClient {
    /// HTTP client for making requests
    client: Client,
    /// Access token, sent as a bearer token
    token: String,
    /// API base URL (configurable for GitHub Enterprise)
    api_base: String,
}

// Custom Debug to avoid exposing the token
impl std::fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubClient")
            .field("has_token", &!self.token.is_empty())
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl GitHubClient {
    /// Create a client for github.com.
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_api_base(token, DEFAULT_API_BASE)
    }

    /// Create a client against a custom API base (GitHub Enterprise, tests).
    pub fn with_api_base(token: impl Into<String>, api_base: impl Into<String>) -> Self {
        let api_base: String = api_base.into();
        Self {
            client: Client::new(),
            token: token.into(),
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }

    /// The API base URL in use.
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Build common headers for API requests.
    fn headers(&self) -> Result<HeaderMap, ForgeError> {
        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("Bearer {}", self.token)).map_err(|_| {
            ForgeError::InvalidRequest("access token contains invalid characters".into())
        })?;
        headers.insert(AUTHORIZATION, auth);
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        headers.insert("X-GitHub-Api-Version", HeaderValue::from_static(API_VERSION));
        Ok(headers)
    }

    /// Build URL for a repository endpoint.
    fn repo_url(&self, repo: &RepoId, path: &str) -> String {
        let base = format!(
            "{}/repos/{}/{}",
            self.api_base,
            urlencoding::encode(repo.owner()),
            urlencoding::encode(repo.name())
        );
        if path.is_empty() {
            base
        } else {
            format!("{}/{}", base, path)
        }
    }

    /// Send a request and decode the JSON response.
    async fn send<T: for<'de> Deserialize<'de>>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, ForgeError> {
        let response = request
            .headers(self.headers()?)
            .send()
            .await
            .map_err(|e| ForgeError::unavailable(None, e.to_string()))?;
        self.handle_response(response).await
    }

    /// Handle API response, mapping errors appropriately.
    async fn handle_response<T: for<'de> Deserialize<'de>>(
        &self,
        response: Response,
    ) -> Result<T, ForgeError> {
        let status = response.status();

        if status.is_success() {
            response.json().await.map_err(|e| {
                ForgeError::unavailable(
                    Some(status.as_u16()),
                    format!("failed to parse response: {}", e),
                )
            })
        } else {
            // Body is best effort; a failed read still yields the status
            let body = response.bytes().await.ok();
            let detail = body.and_then(|b| serde_json::from_slice::<serde_json::Value>(&b).ok());
            Err(classify_error(status, detail))
        }
    }
}

/// Map a failed response to a [`ForgeError`].
fn classify_error(status: StatusCode, detail: Option<serde_json::Value>) -> ForgeError {
    let message = detail
        .as_ref()
        .and_then(|d| d.get("message"))
        .and_then(|m| m.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_string()
        });

    match status {
        StatusCode::NOT_FOUND => ForgeError::NotFound { message, detail },
        StatusCode::CONFLICT => ForgeError::Conflict { message, detail },
        StatusCode::UNPROCESSABLE_ENTITY if is_conflict_message(&message) => {
            ForgeError::Conflict { message, detail }
        }
        StatusCode::UNPROCESSABLE_ENTITY if is_missing_ref_message(&message) => {
            ForgeError::NotFound { message, detail }
        }
        _ if status.is_server_error() => ForgeError::Unavailable {
            status: Some(status.as_u16()),
            message: format!("GitHub server error: {}", message),
            detail,
        },
        _ => ForgeError::Rejected {
            status: status.as_u16(),
            message,
            detail,
        },
    }
}

/// GitHub reports ref races as 422 with one of these messages.
fn is_conflict_message(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("fast forward") || lower.contains("already exists")
}

/// PATCH on a ref that was deleted comes back as 422, not 404.
fn is_missing_ref_message(message: &str) -> bool {
    message
        .to_ascii_lowercase()
        .contains("reference does not exist")
}

/// URL path of a branch ref below `git/ref/` or `git/refs/`.
fn branch_ref_path(branch: &BranchName) -> String {
    encode_segments(RefName::for_branch(branch).short())
}

/// Percent-encode each segment of a slash-separated name, keeping the slashes.
fn encode_segments(name: &str) -> String {
    name.split('/')
        .map(|s| urlencoding::encode(s).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

fn parse_oid(sha: String) -> Result<Oid, ForgeError> {
    Oid::new(sha).map_err(|e| {
        ForgeError::unavailable(None, format!("malformed object id in response: {}", e))
    })
}

#[async_trait]
impl ObjectStore for GitHubClient {
    fn name(&self) -> &'static str {
        "github"
    }

    async fn resolve_ref(&self, repo: &RepoId, branch: &BranchName) -> Result<Oid, ForgeError> {
        let url = self.repo_url(repo, &format!("git/ref/{}", branch_ref_path(branch)));
        debug!(%repo, %branch, "resolving ref");

        let reference: GitHubRef = self.send(self.client.get(&url)).await?;
        parse_oid(reference.object.sha)
    }

    async fn get_commit(&self, repo: &RepoId, sha: &Oid) -> Result<CommitInfo, ForgeError> {
        let url = self.repo_url(repo, &format!("git/commits/{}", sha));
        debug!(%repo, commit = %sha.short(7), "reading commit");

        let commit: GitHubCommit = self.send(self.client.get(&url)).await?;
        commit.try_into()
    }

    async fn create_blob(
        &self,
        repo: &RepoId,
        content: &str,
        encoding: BlobEncoding,
    ) -> Result<Oid, ForgeError> {
        let url = self.repo_url(repo, "git/blobs");
        debug!(%repo, %encoding, len = content.len(), "creating blob");

        let body = CreateBlobBody {
            content,
            encoding: encoding.as_str(),
        };
        let created: GitHubSha = self.send(self.client.post(&url).json(&body)).await?;
        parse_oid(created.sha)
    }

    async fn create_tree(
        &self,
        repo: &RepoId,
        base_tree: Option<&Oid>,
        entries: &[NewTreeEntry],
    ) -> Result<Oid, ForgeError> {
        let url = self.repo_url(repo, "git/trees");
        debug!(%repo, entries = entries.len(), "creating tree");

        let body = CreateTreeBody {
            base_tree: base_tree.map(Oid::as_str),
            tree: entries
                .iter()
                .map(|e| TreeEntryBody {
                    path: e.path.as_str(),
                    mode: e.mode,
                    kind: e.kind,
                    sha: e.sha.as_str(),
                })
                .collect(),
        };
        let created: GitHubSha = self.send(self.client.post(&url).json(&body)).await?;
        parse_oid(created.sha)
    }

    async fn create_commit(&self, repo: &RepoId, commit: &NewCommit) -> Result<Oid, ForgeError> {
        let url = self.repo_url(repo, "git/commits");
        debug!(%repo, tree = %commit.tree.short(7), "creating commit");

        let body = CreateCommitBody {
            message: &commit.message,
            tree: commit.tree.as_str(),
            parents: commit.parents.iter().map(Oid::as_str).collect(),
        };
        let created: GitHubSha = self.send(self.client.post(&url).json(&body)).await?;
        parse_oid(created.sha)
    }

    async fn update_ref(
        &self,
        repo: &RepoId,
        branch: &BranchName,
        new: &Oid,
        expected: &Oid,
    ) -> Result<(), ForgeError> {
        let url = self.repo_url(repo, &format!("git/refs/{}", branch_ref_path(branch)));
        debug!(%repo, %branch, from = %expected.short(7), to = %new.short(7), "updating ref");

        let body = UpdateRefBody {
            sha: new.as_str(),
            force: false,
        };
        let _: GitHubRef = self.send(self.client.patch(&url).json(&body)).await?;
        Ok(())
    }

    async fn create_ref(&self, repo: &RepoId, name: &RefName, sha: &Oid) -> Result<(), ForgeError> {
        let url = self.repo_url(repo, "git/refs");
        debug!(%repo, refname = %name, at = %sha.short(7), "creating ref");

        let body = CreateRefBody {
            reference: name.as_str(),
            sha: sha.as_str(),
        };
        let _: GitHubRef = self.send(self.client.post(&url).json(&body)).await?;
        Ok(())
    }

    async fn read_tree(
        &self,
        repo: &RepoId,
        sha: &Oid,
        recursive: bool,
    ) -> Result<TreeListing, ForgeError> {
        let url = self.repo_url(repo, &format!("git/trees/{}", sha));
        debug!(%repo, tree = %sha.short(7), recursive, "reading tree");

        let mut request = self.client.get(&url);
        if recursive {
            request = request.query(&[("recursive", "1")]);
        }
        let tree: GitHubTree = self.send(request).await?;
        tree.try_into()
    }

    async fn read_file(
        &self,
        repo: &RepoId,
        path: &RepoPath,
        branch: &BranchName,
    ) -> Result<FileContent, ForgeError> {
        let url = self.repo_url(repo, &format!("contents/{}", path.encoded()));
        debug!(%repo, %path, %branch, "reading file");

        let contents: GitHubContents = self
            .send(self.client.get(&url).query(&[("ref", branch.as_str())]))
            .await?;

        match contents {
            GitHubContents::Directory(_) => {
                Err(ForgeError::not_found(format!("'{}' is a directory", path)))
            }
            GitHubContents::Entry(entry) => {
                let content = entry.content.ok_or_else(|| {
                    ForgeError::not_found(format!("'{}' is a {}, not a file", path, entry.kind))
                })?;
                let sha = parse_oid(entry.sha)?;
                let (encoding, content) = match entry.encoding {
                    Some(encoding) if encoding == "none" => {
                        debug!(%repo, %path, size = entry.size, "content withheld, reading blob");
                        let url = self.repo_url(repo, &format!("git/blobs/{}", sha));
                        let blob: GitHubBlob = self.send(self.client.get(&url)).await?;
                        (blob.encoding, blob.content)
                    }
                    encoding => (encoding.unwrap_or_else(|| "base64".to_string()), content),
                };
                Ok(FileContent {
                    path: path.clone(),
                    sha,
                    size: entry.size,
                    encoding,
                    content,
                })
            }
        }
    }

    async fn repo_metadata(&self, repo: &RepoId) -> Result<RepoMetadata, ForgeError> {
        let url = self.repo_url(repo, "");
        debug!(%repo, "reading repository metadata");

        let info: GitHubRepo = self.send(self.client.get(&url)).await?;
        Ok(info.into())
    }
}

// --------------------------------------------------------------------------
// API Request/Response Types
// --------------------------------------------------------------------------

/// Request body for creating a blob.
#[derive(Serialize)]
struct CreateBlobBody<'a> {
    content: &'a str,
    encoding: &'a str,
}

/// Request body for creating a tree.
#[derive(Serialize)]
struct CreateTreeBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    base_tree: Option<&'a str>,
    tree: Vec<TreeEntryBody<'a>>,
}

/// One entry in a create-tree request.
#[derive(Serialize)]
struct TreeEntryBody<'a> {
    path: &'a str,
    mode: FileMode,
    #[serde(rename = "type")]
    kind: EntryKind,
    sha: &'a str,
}

/// Request body for creating a commit.
#[derive(Serialize)]
struct CreateCommitBody<'a> {
    message: &'a str,
    tree: &'a str,
    parents: Vec<&'a str>,
}

/// Request body for moving a ref.
#[derive(Serialize)]
struct UpdateRefBody<'a> {
    sha: &'a str,
    force: bool,
}

/// Request body for creating a ref.
#[derive(Serialize)]
struct CreateRefBody<'a> {
    #[serde(rename = "ref")]
    reference: &'a str,
    sha: &'a str,
}

/// Any response that carries just a `sha` we care about.
#[derive(Deserialize)]
struct GitHubSha {
    sha: String,
}

/// GitHub ref response format.
#[derive(Deserialize)]
struct GitHubRef {
    object: GitHubSha,
}

/// GitHub commit response format.
#[derive(Deserialize)]
struct GitHubCommit {
    sha: String,
    tree: GitHubSha,
    parents: Vec<GitHubSha>,
    message: String,
}

impl TryFrom<GitHubCommit> for CommitInfo {
    type Error = ForgeError;

    fn try_from(commit: GitHubCommit) -> Result<Self, Self::Error> {
        Ok(CommitInfo {
            sha: parse_oid(commit.sha)?,
            tree: parse_oid(commit.tree.sha)?,
            parents: commit
                .parents
                .into_iter()
                .map(|p| parse_oid(p.sha))
                .collect::<Result<_, _>>()?,
            message: commit.message,
        })
    }
}

/// GitHub tree response format.
#[derive(Deserialize)]
struct GitHubTree {
    sha: String,
    tree: Vec<GitHubTreeEntry>,
    #[serde(default)]
    truncated: bool,
}

#[derive(Deserialize)]
struct GitHubTreeEntry {
    path: String,
    mode: FileMode,
    #[serde(rename = "type")]
    kind: EntryKind,
    sha: String,
    size: Option<u64>,
}

impl TryFrom<GitHubTree> for TreeListing {
    type Error = ForgeError;

    fn try_from(tree: GitHubTree) -> Result<Self, Self::Error> {
        let entries = tree
            .tree
            .into_iter()
            .map(|e| {
                Ok(TreeEntry {
                    path: e.path,
                    mode: e.mode,
                    kind: e.kind,
                    sha: parse_oid(e.sha)?,
                    size: e.size,
                })
            })
            .collect::<Result<_, ForgeError>>()?;
        Ok(TreeListing {
            sha: parse_oid(tree.sha)?,
            entries,
            truncated: tree.truncated,
        })
    }
}

/// Contents API response: one entry, or a listing for directories.
#[derive(Deserialize)]
#[serde(untagged)]
enum GitHubContents {
    Directory(Vec<serde_json::Value>),
    Entry(GitHubContentEntry),
}

#[derive(Deserialize)]
struct GitHubContentEntry {
    #[serde(rename = "type")]
    kind: String,
    sha: String,
    #[serde(default)]
    size: u64,
    encoding: Option<String>,
    content: Option<String>,
}

/// GitHub blob response format.
#[derive(Deserialize)]
struct GitHubBlob {
    content: String,
    encoding: String,
}

/// GitHub repository response format.
#[derive(Deserialize)]
struct GitHubRepo {
    full_name: String,
    default_branch: String,
    #[serde(default)]
    private: bool,
    html_url: String,
    description: Option<String>,
    pushed_at: Option<DateTime<Utc>>,
}

impl From<GitHubRepo> for RepoMetadata {
    fn from(repo: GitHubRepo) -> Self {
        RepoMetadata {
            full_name: repo.full_name,
            default_branch: repo.default_branch,
            private: repo.private,
            html_url: repo.html_url,
            description: repo.description,
            pushed_at: repo.pushed_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forge::ErrorKind;
    use serde_json::json;

    mod classify {
        use super::*;

        #[test]
        fn not_found() {
            let err = classify_error(StatusCode::NOT_FOUND, Some(json!({"message": "Not Found"})));
            assert_eq!(err.kind(), ErrorKind::NotFound);
            assert_eq!(err.to_string(), "not found: Not Found");
        }

        #[test]
        fn non_fast_forward_is_conflict() {
            let err = classify_error(
                StatusCode::UNPROCESSABLE_ENTITY,
                Some(json!({"message": "Update is not a fast forward"})),
            );
            assert_eq!(err.kind(), ErrorKind::Conflict);
        }

        #[test]
        fn existing_ref_is_conflict() {
            let err = classify_error(
                StatusCode::UNPROCESSABLE_ENTITY,
                Some(json!({"message": "Reference already exists"})),
            );
            assert_eq!(err.kind(), ErrorKind::Conflict);
        }

        #[test]
        fn other_validation_failure_is_rejected_with_detail() {
            let detail = json!({
                "message": "Invalid request.",
                "errors": ["tree.path contains a malformed path component"]
            });
            let err = classify_error(StatusCode::UNPROCESSABLE_ENTITY, Some(detail.clone()));
            assert_eq!(err.kind(), ErrorKind::RemoteRejected);
            assert_eq!(err.detail(), Some(&detail));
        }

        #[test]
        fn deleted_ref_is_not_found() {
            let detail = json!({"message": "Reference does not exist"});
            let err = classify_error(StatusCode::UNPROCESSABLE_ENTITY, Some(detail.clone()));
            assert_eq!(err.kind(), ErrorKind::NotFound);
            assert_eq!(err.detail(), Some(&detail));
        }

        #[test]
        fn http_409_is_conflict() {
            let err = classify_error(
                StatusCode::CONFLICT,
                Some(json!({"message": "Git Repository is empty."})),
            );
            assert_eq!(err.kind(), ErrorKind::Conflict);
        }

        #[test]
        fn server_error_is_unavailable() {
            let err = classify_error(StatusCode::BAD_GATEWAY, None);
            assert_eq!(err.kind(), ErrorKind::RemoteUnavailable);
            assert!(err.to_string().contains("Bad Gateway"));
            assert_eq!(err.detail(), None);
        }

        #[test]
        fn server_error_keeps_detail() {
            let detail = json!({"message": "busy", "retry": 5});
            let err = classify_error(StatusCode::SERVICE_UNAVAILABLE, Some(detail.clone()));
            assert!(matches!(err, ForgeError::Unavailable { status: Some(503), .. }));
            assert_eq!(err.detail(), Some(&detail));
        }

        #[test]
        fn forbidden_is_rejected() {
            let err = classify_error(
                StatusCode::FORBIDDEN,
                Some(json!({"message": "Resource not accessible by integration"})),
            );
            assert!(matches!(err, ForgeError::Rejected { status: 403, .. }));
        }
    }

    mod github_client {
        use super::*;

        fn repo() -> RepoId {
            RepoId::parse("octocat/hello-world").unwrap()
        }

        #[test]
        fn new_uses_public_api() {
            let client = GitHubClient::new("token");
            assert_eq!(client.name(), "github");
            assert_eq!(client.api_base(), "https://api.github.com");
        }

        #[test]
        fn api_base_trailing_slash_trimmed() {
            let client = GitHubClient::with_api_base("token", "https://ghe.example.com/api/v3/");
            assert_eq!(client.api_base(), "https://ghe.example.com/api/v3");
        }

        #[test]
        fn repo_url_format() {
            let client = GitHubClient::new("token");
            assert_eq!(
                client.repo_url(&repo(), "git/blobs"),
                "https://api.github.com/repos/octocat/hello-world/git/blobs"
            );
            assert_eq!(
                client.repo_url(&repo(), ""),
                "https://api.github.com/repos/octocat/hello-world"
            );
        }

        #[test]
        fn ref_segments_encoded_individually() {
            assert_eq!(encode_segments("feature/my branch"), "feature/my%20branch");
            assert_eq!(encode_segments("main"), "main");
        }

        #[test]
        fn branch_ref_path_is_relative_to_refs() {
            let branch = BranchName::new("feature/my branch").unwrap();
            assert_eq!(branch_ref_path(&branch), "heads/feature/my%20branch");
        }

        #[test]
        fn debug_redacts_token() {
            let client = GitHubClient::new("secret_token_abc123");
            let debug_output = format!("{:?}", client);
            assert!(!debug_output.contains("secret_token_abc123"));
            assert!(debug_output.contains("has_token"));
        }

        #[test]
        fn invalid_token_characters_rejected() {
            let client = GitHubClient::new("bad\ntoken");
            assert!(matches!(
                client.headers(),
                Err(ForgeError::InvalidRequest(_))
            ));
        }
    }

    mod response_types {
        use super::*;

        #[test]
        fn tree_response_parses() {
            let body = json!({
                "sha": "a".repeat(40),
                "truncated": false,
                "tree": [
                    {"path": "src", "mode": "040000", "type": "tree", "sha": "b".repeat(40)},
                    {"path": "src/lib.rs", "mode": "100644", "type": "blob", "sha": "c".repeat(40), "size": 12}
                ]
            });
            let tree: GitHubTree = serde_json::from_value(body).unwrap();
            let listing = TreeListing::try_from(tree).unwrap();
            assert_eq!(listing.entries.len(), 2);
            assert_eq!(listing.entries[1].size, Some(12));
            assert_eq!(listing.blobs().count(), 1);
        }

        #[test]
        fn directory_contents_detected() {
            let body = json!([{"type": "file", "name": "a.txt"}]);
            let contents: GitHubContents = serde_json::from_value(body).unwrap();
            assert!(matches!(contents, GitHubContents::Directory(_)));
        }

        #[test]
        fn malformed_sha_is_unavailable() {
            let commit = GitHubCommit {
                sha: "nope".into(),
                tree: GitHubSha { sha: "a".repeat(40) },
                parents: vec![],
                message: "m".into(),
            };
            let err = CommitInfo::try_from(commit).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::RemoteUnavailable);
        }
    }
}
