use super::*;
use std::path::Path;

#[test]
fn is_remote_branch_deleted_matches_substring() {
    let err = GitAdapterError::PullFailed("remote branch deleted".into());
    assert!(err.is_remote_branch_deleted());
    let other = GitAdapterError::PullFailed("network unreachable".into());
    assert!(!other.is_remote_branch_deleted());
}

#[test]
fn is_remote_branch_deleted_false_for_other_variants() {
    let err = GitAdapterError::CommitFailed("remote branch deleted".into());
    assert!(!err.is_remote_branch_deleted());
}

#[tokio::test]
async fn create_then_move_then_rename_worktree() {
    let git = FakeGitAdapter::new();
    git.create_worktree(Path::new("/base/pool-1"), "pool-ready-1", "origin/main")
        .await
        .unwrap();
    git.move_worktree(Path::new("/base/pool-1"), Path::new("/base/j1"))
        .await
        .unwrap();
    git.rename_branch(Path::new("/base/j1"), "pool-ready-1", "feat/x")
        .await
        .unwrap();
    assert_eq!(
        git.worktree_branch(Path::new("/base/j1")),
        Some("feat/x".to_string())
    );
}

#[tokio::test]
async fn pr_lifecycle() {
    let git = FakeGitAdapter::new();
    assert!(!git.has_existing_pr("feat/x").await.unwrap());
    let pr = git
        .create_pull_request("feat/x", "main", "Title", "Body")
        .await
        .unwrap();
    assert!(git.has_existing_pr("feat/x").await.unwrap());
    git.update_pr_title(&pr.id, "New title").await.unwrap();
    let fetched = git.get_pr_by_id(&pr.id).await.unwrap();
    assert_eq!(fetched.title, "New title");
}

#[tokio::test]
async fn pull_error_can_be_scripted() {
    let git = FakeGitAdapter::new();
    git.set_pull_error(GitAdapterError::PullFailed("remote branch deleted".into()));
    let err = git.pull_latest(None).await.unwrap_err();
    assert!(err.is_remote_branch_deleted());
}

#[tokio::test]
async fn rev_parse_tracks_advancing_origin_head() {
    let git = FakeGitAdapter::new();
    let before = git.rev_parse("origin/main").await.unwrap();
    git.advance_origin_head("sha-1");
    let after = git.rev_parse("origin/main").await.unwrap();
    assert_ne!(before, after);
}

#[tokio::test]
async fn extract_pr_id_from_url_takes_trailing_segment() {
    let git = FakeGitAdapter::new();
    assert_eq!(
        git.extract_pr_id_from_url("https://example.invalid/org/repo/pull/42"),
        Some("42".to_string())
    );
}
