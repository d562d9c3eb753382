//! Integration tests for the GitHub object store.
//!
//! Every test runs the real client against a local wiremock server and
//! checks the request it sends as well as how the response is mapped.
//! Live GitHub API tests are behind the `live_github_tests` feature flag.

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use forgetree::core::request::{BlobEncoding, FileChange};
use forgetree::core::types::{BranchName, Oid, RefName, RepoId, RepoPath};
use forgetree::forge::github::GitHubClient;
use forgetree::forge::{
    EntryKind, ErrorKind, FileMode, ForgeError, NewCommit, NewTreeEntry, ObjectStore,
};

const HEAD: &str = "1111111111111111111111111111111111111111";
const TREE: &str = "2222222222222222222222222222222222222222";
const BLOB: &str = "3333333333333333333333333333333333333333";
const NEW: &str = "4444444444444444444444444444444444444444";

fn oid(s: &str) -> Oid {
    Oid::new(s).unwrap()
}

fn repo() -> RepoId {
    RepoId::parse("octocat/hello-world").unwrap()
}

fn branch(name: &str) -> BranchName {
    BranchName::new(name).unwrap()
}

async fn setup() -> (MockServer, GitHubClient) {
    let server = MockServer::start().await;
    let client = GitHubClient::with_api_base("test-token", server.uri());
    (server, client)
}

// =============================================================================
// Requests
// =============================================================================

mod requests {
    use super::*;

    #[tokio::test]
    async fn sends_bearer_token_and_api_headers() {
        let (server, client) = setup().await;
        Mock::given(method("GET"))
            .and(path("/repos/octocat/hello-world/git/ref/heads/main"))
            .and(header("authorization", "Bearer test-token"))
            .and(header("accept", "application/vnd.github+json"))
            .and(header("x-github-api-version", "2022-11-28"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ref": "refs/heads/main",
                "object": { "sha": HEAD, "type": "commit" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let head = client.resolve_ref(&repo(), &branch("main")).await.unwrap();
        assert_eq!(head, oid(HEAD));
    }

    #[tokio::test]
    async fn nested_branch_keeps_slashes() {
        let (server, client) = setup().await;
        Mock::given(method("GET"))
            .and(path("/repos/octocat/hello-world/git/ref/heads/feature/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "object": { "sha": HEAD }
            })))
            .expect(1)
            .mount(&server)
            .await;

        client
            .resolve_ref(&repo(), &branch("feature/login"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn get_commit_maps_tree_and_parents() {
        let (server, client) = setup().await;
        Mock::given(method("GET"))
            .and(path(format!("/repos/octocat/hello-world/git/commits/{}", HEAD)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "sha": HEAD,
                "tree": { "sha": TREE, "url": "ignored" },
                "parents": [{ "sha": BLOB }],
                "message": "Initial commit",
                "author": { "name": "Octocat" }
            })))
            .mount(&server)
            .await;

        let commit = client.get_commit(&repo(), &oid(HEAD)).await.unwrap();
        assert_eq!(commit.sha, oid(HEAD));
        assert_eq!(commit.tree, oid(TREE));
        assert_eq!(commit.parents, vec![oid(BLOB)]);
        assert_eq!(commit.message, "Initial commit");
    }

    #[tokio::test]
    async fn create_blob_sends_content_and_encoding() {
        let (server, client) = setup().await;
        Mock::given(method("POST"))
            .and(path("/repos/octocat/hello-world/git/blobs"))
            .and(body_json(json!({ "content": "aGk=", "encoding": "base64" })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "sha": BLOB })))
            .expect(1)
            .mount(&server)
            .await;

        let sha = client
            .create_blob(&repo(), "aGk=", BlobEncoding::Base64)
            .await
            .unwrap();
        assert_eq!(sha, oid(BLOB));
    }

    #[tokio::test]
    async fn create_tree_layers_on_base() {
        let (server, client) = setup().await;
        Mock::given(method("POST"))
            .and(path("/repos/octocat/hello-world/git/trees"))
            .and(body_json(json!({
                "base_tree": TREE,
                "tree": [{ "path": "docs/a.md", "mode": "100644", "type": "blob", "sha": BLOB }]
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "sha": NEW, "tree": [] })))
            .expect(1)
            .mount(&server)
            .await;

        let entries = [NewTreeEntry::blob(RepoPath::new("docs/a.md").unwrap(), oid(BLOB))];
        let sha = client
            .create_tree(&repo(), Some(&oid(TREE)), &entries)
            .await
            .unwrap();
        assert_eq!(sha, oid(NEW));
    }

    #[tokio::test]
    async fn create_tree_without_base_omits_field() {
        let (server, client) = setup().await;
        Mock::given(method("POST"))
            .and(path("/repos/octocat/hello-world/git/trees"))
            .and(body_json(json!({
                "tree": [{ "path": "a.txt", "mode": "100644", "type": "blob", "sha": BLOB }]
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "sha": NEW })))
            .expect(1)
            .mount(&server)
            .await;

        let entries = [NewTreeEntry::blob(RepoPath::new("a.txt").unwrap(), oid(BLOB))];
        client.create_tree(&repo(), None, &entries).await.unwrap();
    }

    #[tokio::test]
    async fn create_tree_sends_change_path_verbatim() {
        let (server, client) = setup().await;
        Mock::given(method("POST"))
            .and(path("/repos/octocat/hello-world/git/trees"))
            .and(body_json(json!({
                "tree": [{
                    "path": "reports/q1%20final.md",
                    "mode": "100644",
                    "type": "blob",
                    "sha": BLOB
                }]
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "sha": NEW })))
            .expect(1)
            .mount(&server)
            .await;

        let change = FileChange::text("reports/q1%20final.md", "totals").unwrap();
        let entries = [NewTreeEntry::blob(change.path, oid(BLOB))];
        client.create_tree(&repo(), None, &entries).await.unwrap();
    }

    #[tokio::test]
    async fn create_commit_sends_parents() {
        let (server, client) = setup().await;
        Mock::given(method("POST"))
            .and(path("/repos/octocat/hello-world/git/commits"))
            .and(body_json(json!({ "message": "Update", "tree": TREE, "parents": [HEAD] })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "sha": NEW })))
            .expect(1)
            .mount(&server)
            .await;

        let commit = NewCommit {
            message: "Update".to_string(),
            tree: oid(TREE),
            parents: vec![oid(HEAD)],
        };
        assert_eq!(client.create_commit(&repo(), &commit).await.unwrap(), oid(NEW));
    }

    #[tokio::test]
    async fn update_ref_never_forces() {
        let (server, client) = setup().await;
        Mock::given(method("PATCH"))
            .and(path("/repos/octocat/hello-world/git/refs/heads/main"))
            .and(body_json(json!({ "sha": NEW, "force": false })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ref": "refs/heads/main",
                "object": { "sha": NEW }
            })))
            .expect(1)
            .mount(&server)
            .await;

        client
            .update_ref(&repo(), &branch("main"), &oid(NEW), &oid(HEAD))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn create_ref_sends_full_refname() {
        let (server, client) = setup().await;
        Mock::given(method("POST"))
            .and(path("/repos/octocat/hello-world/git/refs"))
            .and(body_json(json!({ "ref": "refs/heads/feature", "sha": HEAD })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "ref": "refs/heads/feature",
                "object": { "sha": HEAD }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let name = RefName::for_branch(&branch("feature"));
        client.create_ref(&repo(), &name, &oid(HEAD)).await.unwrap();
    }

    #[tokio::test]
    async fn read_tree_recursive_query() {
        let (server, client) = setup().await;
        Mock::given(method("GET"))
            .and(path(format!("/repos/octocat/hello-world/git/trees/{}", TREE)))
            .and(query_param("recursive", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "sha": TREE,
                "truncated": false,
                "tree": [
                    { "path": "docs", "mode": "040000", "type": "tree", "sha": NEW },
                    { "path": "docs/a.md", "mode": "100644", "type": "blob", "sha": BLOB, "size": 12 },
                    { "path": "run.sh", "mode": "100755", "type": "blob", "sha": BLOB, "size": 3 }
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let listing = client.read_tree(&repo(), &oid(TREE), true).await.unwrap();
        assert!(!listing.truncated);
        assert_eq!(listing.entries.len(), 3);
        assert_eq!(listing.entries[0].kind, EntryKind::Tree);
        assert_eq!(listing.entries[0].mode, FileMode::Directory);
        assert_eq!(listing.entries[1].size, Some(12));
        assert_eq!(listing.entries[2].mode, FileMode::Executable);
        assert_eq!(listing.blobs().count(), 2);
    }

    #[tokio::test]
    async fn read_file_encodes_path_and_decodes_content() {
        let (server, client) = setup().await;
        Mock::given(method("GET"))
            .and(path("/repos/octocat/hello-world/contents/docs/my%20file.txt"))
            .and(query_param("ref", "dev"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "type": "file",
                "path": "docs/my file.txt",
                "sha": BLOB,
                "size": 5,
                "encoding": "base64",
                "content": "aGVs\nbG8=\n"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let file = client
            .read_file(&repo(), &RepoPath::new("docs/my file.txt").unwrap(), &branch("dev"))
            .await
            .unwrap();
        assert_eq!(file.sha, oid(BLOB));
        assert_eq!(file.size, 5);
        assert_eq!(file.decoded().unwrap(), b"hello");
    }

    #[tokio::test]
    async fn large_file_is_read_through_blob() {
        let (server, client) = setup().await;
        Mock::given(method("GET"))
            .and(path("/repos/octocat/hello-world/contents/data/big.csv"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "type": "file",
                "sha": BLOB,
                "size": 12,
                "encoding": "none",
                "content": ""
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("/repos/octocat/hello-world/git/blobs/{}", BLOB)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "sha": BLOB,
                "size": 12,
                "encoding": "base64",
                "content": "YSxiCjEsMgozLDQK"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let file = client
            .read_file(&repo(), &RepoPath::new("data/big.csv").unwrap(), &branch("main"))
            .await
            .unwrap();
        assert_eq!(file.encoding, "base64");
        assert_eq!(file.decoded().unwrap(), b"a,b\n1,2\n3,4\n");
    }

    #[tokio::test]
    async fn repo_metadata_fields() {
        let (server, client) = setup().await;
        Mock::given(method("GET"))
            .and(path("/repos/octocat/hello-world"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "full_name": "octocat/hello-world",
                "default_branch": "trunk",
                "private": true,
                "html_url": "https://github.com/octocat/hello-world",
                "description": null,
                "pushed_at": "2024-01-01T00:00:00Z"
            })))
            .mount(&server)
            .await;

        let meta = client.repo_metadata(&repo()).await.unwrap();
        assert_eq!(meta.full_name, "octocat/hello-world");
        assert_eq!(meta.default_branch, "trunk");
        assert!(meta.private);
        assert_eq!(meta.description, None);
        assert_eq!(
            meta.pushed_at.unwrap().to_rfc3339(),
            "2024-01-01T00:00:00+00:00"
        );
    }
}

// =============================================================================
// Error Mapping
// =============================================================================

mod errors {
    use super::*;

    async fn resolve_with(status: u16, body: serde_json::Value) -> ForgeError {
        let (server, client) = setup().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .mount(&server)
            .await;
        client
            .resolve_ref(&repo(), &branch("main"))
            .await
            .unwrap_err()
    }

    #[tokio::test]
    async fn not_found_keeps_detail() {
        let err = resolve_with(404, json!({ "message": "Not Found", "status": "404" })).await;
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.detail().unwrap()["status"], "404");
    }

    #[tokio::test]
    async fn conflict_statuses() {
        let err = resolve_with(409, json!({ "message": "Git Repository is empty." })).await;
        assert_eq!(err.kind(), ErrorKind::Conflict);

        let err = resolve_with(422, json!({ "message": "Update is not a fast forward" })).await;
        assert_eq!(err.kind(), ErrorKind::Conflict);

        let err = resolve_with(422, json!({ "message": "Reference already exists" })).await;
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn other_client_errors_are_rejected() {
        let err = resolve_with(422, json!({ "message": "Invalid request." })).await;
        assert_eq!(err.kind(), ErrorKind::RemoteRejected);
        assert!(matches!(err, ForgeError::Rejected { status: 422, .. }));

        let err = resolve_with(401, json!({ "message": "Bad credentials" })).await;
        assert_eq!(err.kind(), ErrorKind::RemoteRejected);
        assert!(err.to_string().contains("Bad credentials"));
    }

    #[tokio::test]
    async fn server_errors_are_unavailable() {
        let err = resolve_with(502, json!({ "message": "Bad Gateway" })).await;
        assert_eq!(err.kind(), ErrorKind::RemoteUnavailable);
        assert!(matches!(err, ForgeError::Unavailable { status: Some(502), .. }));

        let err = resolve_with(503, json!({ "message": "busy", "retry": 5 })).await;
        assert_eq!(err.kind(), ErrorKind::RemoteUnavailable);
        assert_eq!(err.detail().unwrap()["retry"], 5);
    }

    #[tokio::test]
    async fn unreadable_success_body_is_unavailable() {
        let (server, client) = setup().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let err = client
            .resolve_ref(&repo(), &branch("main"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RemoteUnavailable);
    }

    #[tokio::test]
    async fn connection_refused_is_unavailable() {
        let client = GitHubClient::with_api_base("t", "http://127.0.0.1:1");
        let err = client
            .resolve_ref(&repo(), &branch("main"))
            .await
            .unwrap_err();
        assert!(matches!(err, ForgeError::Unavailable { status: None, .. }));
    }

    #[tokio::test]
    async fn directory_contents_are_not_found() {
        let (server, client) = setup().await;
        Mock::given(method("GET"))
            .and(path("/repos/octocat/hello-world/contents/docs"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "type": "file", "name": "a.md", "sha": BLOB }
            ])))
            .mount(&server)
            .await;

        let err = client
            .read_file(&repo(), &RepoPath::new("docs").unwrap(), &branch("main"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn non_fast_forward_update_is_conflict() {
        let (server, client) = setup().await;
        Mock::given(method("PATCH"))
            .respond_with(
                ResponseTemplate::new(422)
                    .set_body_json(json!({ "message": "Update is not a fast forward" })),
            )
            .mount(&server)
            .await;

        let err = client
            .update_ref(&repo(), &branch("main"), &oid(NEW), &oid(HEAD))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn update_of_deleted_branch_is_not_found() {
        let (server, client) = setup().await;
        Mock::given(method("PATCH"))
            .and(path("/repos/octocat/hello-world/git/refs/heads/gone"))
            .respond_with(
                ResponseTemplate::new(422).set_body_json(json!({
                    "message": "Reference does not exist",
                    "documentation_url": "https://docs.github.com/rest/git/refs#update-a-reference"
                })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let err = client
            .update_ref(&repo(), &branch("gone"), &oid(NEW), &oid(HEAD))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.detail().unwrap()["message"], "Reference does not exist");
    }
}

// =============================================================================
// Live Tests
// =============================================================================

#[cfg(feature = "live_github_tests")]
mod live_tests {
    use super::*;

    fn live_client() -> Option<(GitHubClient, RepoId)> {
        let token = std::env::var("GITHUB_TOKEN").ok()?;
        let owner = std::env::var("FORGETREE_TEST_OWNER").ok()?;
        let name = std::env::var("FORGETREE_TEST_REPO").ok()?;
        Some((GitHubClient::new(token), RepoId::new(owner, name).ok()?))
    }

    #[tokio::test]
    async fn live_missing_branch_is_not_found() {
        let Some((client, repo)) = live_client() else {
            eprintln!("Skipping: GITHUB_TOKEN/FORGETREE_TEST_OWNER/FORGETREE_TEST_REPO not set");
            return;
        };

        let err = client
            .resolve_ref(&repo, &branch("forgetree-definitely-missing"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn live_default_branch_resolves() {
        let Some((client, repo)) = live_client() else {
            eprintln!("Skipping: GITHUB_TOKEN/FORGETREE_TEST_OWNER/FORGETREE_TEST_REPO not set");
            return;
        };

        let meta = client.repo_metadata(&repo).await.unwrap();
        let head = client
            .resolve_ref(&repo, &branch(&meta.default_branch))
            .await
            .unwrap();
        let commit = client.get_commit(&repo, &head).await.unwrap();
        assert_eq!(commit.sha, head);
    }
}
