//! Integration tests for working-copy acquisition against real local
//! Git repositories.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use bindery::core::config::{PublishConfig, Repository};
use bindery::core::diagnostics::DiagnosticsCollector;
use bindery::core::retry::RetryPolicy;
use bindery::core::types::ContentSource;
use bindery::source::{GitCli, RepositorySourcer};

fn test_git() -> GitCli {
    GitCli::new(RetryPolicy::none(), CancellationToken::new())
}

/// Initialize an origin repository with one commit on `main`.
async fn init_origin(root: &Path, name: &str, files: &[(&str, &str)]) -> PathBuf {
    let dir = root.join(name);
    tokio::fs::create_dir_all(&dir).await.unwrap();
    let git = test_git();

    git.run(Some(&dir), &["init"]).await.unwrap();
    // Pin the unborn branch name regardless of init.defaultBranch
    git.run(Some(&dir), &["symbolic-ref", "HEAD", "refs/heads/main"])
        .await
        .unwrap();
    commit_files(&dir, files, "initial").await;
    dir
}

async fn commit_files(dir: &Path, files: &[(&str, &str)], message: &str) {
    let git = test_git();
    for (relative, content) in files {
        let path = dir.join(relative);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.unwrap();
        }
        tokio::fs::write(&path, content).await.unwrap();
    }
    git.run(Some(dir), &["add", "."]).await.unwrap();
    git.run(
        Some(dir),
        &[
            "-c",
            "user.name=bindery-tests",
            "-c",
            "user.email=tests@bindery.invalid",
            "commit",
            "-m",
            message,
        ],
    )
    .await
    .unwrap();
}

fn full_repository(name: &str, origin: &Path) -> Repository {
    let config = PublishConfig::from_toml(&format!(
        "organization = \"acme\"\n[repositories.{}]\norigin = \"{}\"",
        name,
        origin.display()
    ))
    .unwrap();
    config.repository(name).unwrap().clone()
}

fn partial_repository(name: &str, origin: &Path) -> Repository {
    let config = PublishConfig::from_toml(&format!(
        "organization = \"acme\"\n[repositories.{}]\norigin = \"{}\"\ncheckout_strategy = \"partial\"",
        name,
        origin.display()
    ))
    .unwrap();
    config.repository(name).unwrap().clone()
}

#[tokio::test]
async fn full_checkout_resolves_head_commit() {
    let workspace = TempDir::new().unwrap();
    let origin = init_origin(
        workspace.path(),
        "origin-kibana",
        &[("docs/index.md", "# Kibana")],
    )
    .await;

    let checkouts_root = workspace.path().join("checkouts");
    let sourcer = RepositorySourcer::new(&checkouts_root, "docs").with_concurrency(2);
    let diagnostics = DiagnosticsCollector::new();

    let checkouts = sourcer
        .acquire_all(
            &[full_repository("kibana", &origin)],
            ContentSource::Current,
            &CancellationToken::new(),
            &diagnostics,
        )
        .await;

    assert!(diagnostics.is_empty(), "{}", diagnostics.report());
    assert_eq!(checkouts.len(), 1);
    let checkout = &checkouts[0];
    assert!(checkout.directory.join("docs/index.md").is_file());

    // The recorded head matches the origin's tip
    let origin_head = test_git().head_commit(&origin).await.unwrap();
    assert_eq!(checkout.head, origin_head);
}

#[tokio::test]
async fn existing_working_copy_is_updated_in_place() {
    let workspace = TempDir::new().unwrap();
    let origin = init_origin(
        workspace.path(),
        "origin-kibana",
        &[("docs/index.md", "v1")],
    )
    .await;

    let checkouts_root = workspace.path().join("checkouts");
    let sourcer = RepositorySourcer::new(&checkouts_root, "docs");
    let diagnostics = DiagnosticsCollector::new();
    let repository = full_repository("kibana", &origin);

    let first = sourcer
        .acquire_all(
            std::slice::from_ref(&repository),
            ContentSource::Current,
            &CancellationToken::new(),
            &diagnostics,
        )
        .await;
    assert_eq!(first.len(), 1);

    // Advance the origin, then re-acquire the same working copy
    commit_files(&origin, &[("docs/index.md", "v2")], "update").await;
    let second = sourcer
        .acquire_all(
            std::slice::from_ref(&repository),
            ContentSource::Current,
            &CancellationToken::new(),
            &diagnostics,
        )
        .await;

    assert!(diagnostics.is_empty(), "{}", diagnostics.report());
    assert_eq!(second.len(), 1);
    assert_ne!(first[0].head, second[0].head);
    let content = tokio::fs::read_to_string(second[0].directory.join("docs/index.md"))
        .await
        .unwrap();
    assert_eq!(content, "v2");
}

#[tokio::test]
async fn broken_working_copy_falls_back_to_fresh_checkout() {
    let workspace = TempDir::new().unwrap();
    let origin = init_origin(
        workspace.path(),
        "origin-kibana",
        &[("docs/index.md", "content")],
    )
    .await;

    let checkouts_root = workspace.path().join("checkouts");
    let sourcer = RepositorySourcer::new(&checkouts_root, "docs");
    let diagnostics = DiagnosticsCollector::new();
    let repository = full_repository("kibana", &origin);

    let first = sourcer
        .acquire_all(
            std::slice::from_ref(&repository),
            ContentSource::Current,
            &CancellationToken::new(),
            &diagnostics,
        )
        .await;
    assert_eq!(first.len(), 1);

    // Break the working copy: no .git means every update command fails
    tokio::fs::remove_dir_all(first[0].directory.join(".git"))
        .await
        .unwrap();

    let second = sourcer
        .acquire_all(
            std::slice::from_ref(&repository),
            ContentSource::Current,
            &CancellationToken::new(),
            &diagnostics,
        )
        .await;

    assert!(diagnostics.is_empty(), "{}", diagnostics.report());
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].head, first[0].head);
    assert!(second[0].directory.join("docs/index.md").is_file());
}

#[tokio::test]
async fn partial_checkout_narrows_to_docs() {
    let workspace = TempDir::new().unwrap();
    let origin = init_origin(
        workspace.path(),
        "origin-kibana",
        &[
            ("docs/index.md", "# Docs"),
            ("src/main.c", "int main(void) { return 0; }"),
        ],
    )
    .await;

    let checkouts_root = workspace.path().join("checkouts");
    let sourcer = RepositorySourcer::new(&checkouts_root, "docs");
    let diagnostics = DiagnosticsCollector::new();

    let checkouts = sourcer
        .acquire_all(
            &[partial_repository("kibana", &origin)],
            ContentSource::Current,
            &CancellationToken::new(),
            &diagnostics,
        )
        .await;

    assert!(diagnostics.is_empty(), "{}", diagnostics.report());
    assert_eq!(checkouts.len(), 1);
    assert!(checkouts[0].directory.join("docs/index.md").is_file());
    // The cone excludes source directories
    assert!(!checkouts[0].directory.join("src/main.c").exists());
}

#[tokio::test]
async fn one_failing_repository_does_not_abort_siblings() {
    let workspace = TempDir::new().unwrap();
    let origin = init_origin(
        workspace.path(),
        "origin-good",
        &[("docs/index.md", "good")],
    )
    .await;

    let checkouts_root = workspace.path().join("checkouts");
    let sourcer = RepositorySourcer::new(&checkouts_root, "docs")
        .with_retry(RetryPolicy::none())
        .with_concurrency(2);
    let diagnostics = DiagnosticsCollector::new();

    let missing_origin = workspace.path().join("no-such-origin");
    let repositories = vec![
        full_repository("good", &origin),
        full_repository("broken", &missing_origin),
    ];

    let checkouts = sourcer
        .acquire_all(
            &repositories,
            ContentSource::Current,
            &CancellationToken::new(),
            &diagnostics,
        )
        .await;

    assert_eq!(checkouts.len(), 1);
    assert_eq!(checkouts[0].repository.name.as_str(), "good");
    assert_eq!(diagnostics.len(), 1);
    assert!(diagnostics.report().contains("broken"));
}

#[tokio::test]
async fn different_content_sources_select_different_branches() {
    let workspace = TempDir::new().unwrap();
    let origin = init_origin(
        workspace.path(),
        "origin-kibana",
        &[("docs/index.md", "main line")],
    )
    .await;

    // Cut a release branch with different content, then return to main
    let git = test_git();
    git.run(Some(&origin), &["checkout", "-b", "8.19"])
        .await
        .unwrap();
    commit_files(&origin, &[("docs/index.md", "release line")], "release").await;
    git.run(Some(&origin), &["checkout", "main"]).await.unwrap();

    let config = PublishConfig::from_toml(&format!(
        r#"
        organization = "acme"
        [repositories.kibana]
        origin = "{}"
        current_branch = "8.19"
        next_branch = "main"
        "#,
        origin.display()
    ))
    .unwrap();
    let repository = config.repository("kibana").unwrap().clone();

    let diagnostics = DiagnosticsCollector::new();
    let current_root = workspace.path().join("current");
    let current = RepositorySourcer::new(&current_root, "docs")
        .acquire_all(
            std::slice::from_ref(&repository),
            ContentSource::Current,
            &CancellationToken::new(),
            &diagnostics,
        )
        .await;

    let next_root = workspace.path().join("next");
    let next = RepositorySourcer::new(&next_root, "docs")
        .acquire_all(
            std::slice::from_ref(&repository),
            ContentSource::Next,
            &CancellationToken::new(),
            &diagnostics,
        )
        .await;

    assert!(diagnostics.is_empty(), "{}", diagnostics.report());
    let current_content = tokio::fs::read_to_string(current[0].directory.join("docs/index.md"))
        .await
        .unwrap();
    let next_content = tokio::fs::read_to_string(next[0].directory.join("docs/index.md"))
        .await
        .unwrap();
    assert_eq!(current_content, "release line");
    assert_eq!(next_content, "main line");
}
