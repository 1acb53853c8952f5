//! Git adapter: every repository operation the runtime needs, named in
//! SPEC_FULL §6. Every operation has an "in worktree" variant taking an
//! explicit directory, used when the caller is scoped to a job's isolated
//! checkout rather than the main working copy.

#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeGitAdapter, GitCall};

mod shell;
pub use shell::ShellGitAdapter;

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

/// Substring recognized in [`GitAdapterError::PullFailed`] to detect that a
/// job's remote branch was merged/removed (SPEC_FULL §7).
pub const REMOTE_BRANCH_DELETED: &str = "remote branch deleted";

/// Errors from git operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GitAdapterError {
    #[error("reset failed: {0}")]
    ResetFailed(String),
    #[error("fetch failed: {0}")]
    FetchFailed(String),
    #[error("pull failed: {0}")]
    PullFailed(String),
    #[error("checkout failed: {0}")]
    CheckoutFailed(String),
    #[error("commit failed: {0}")]
    CommitFailed(String),
    #[error("push failed: {0}")]
    PushFailed(String),
    #[error("worktree operation failed: {0}")]
    WorktreeFailed(String),
    #[error("pull request operation failed: {0}")]
    PullRequestFailed(String),
}

impl GitAdapterError {
    /// Whether this error is the sentinel "remote branch deleted" condition.
    pub fn is_remote_branch_deleted(&self) -> bool {
        matches!(self, GitAdapterError::PullFailed(msg) if msg.contains(REMOTE_BRANCH_DELETED))
    }
}

/// State of a pull request as reported by the forge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullRequestState {
    Open,
    Merged,
    Closed,
    Unknown,
}

/// A pull request's current title/description/state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestInfo {
    pub id: String,
    pub url: String,
    pub title: String,
    pub description: String,
    pub state: PullRequestState,
}

/// Adapter wrapping every Git/forge operation the runtime drives.
#[async_trait]
pub trait GitAdapter: Send + Sync + 'static {
    async fn get_default_branch(&self) -> Result<String, GitAdapterError>;
    async fn fetch_origin(&self) -> Result<(), GitAdapterError>;
    async fn reset_hard(&self, dir: Option<&Path>) -> Result<(), GitAdapterError>;
    async fn clean_untracked(&self, dir: Option<&Path>) -> Result<(), GitAdapterError>;
    async fn checkout_branch(&self, branch: &str, dir: Option<&Path>) -> Result<(), GitAdapterError>;
    async fn checkout_remote_branch(
        &self,
        branch: &str,
        dir: Option<&Path>,
    ) -> Result<(), GitAdapterError>;
    async fn pull_latest(&self, dir: Option<&Path>) -> Result<(), GitAdapterError>;

    async fn create_branch(&self, branch: &str, dir: Option<&Path>) -> Result<(), GitAdapterError>;

    /// Create a worktree at `path` tracking `from_ref`, on a new `branch`.
    async fn create_worktree(
        &self,
        path: &Path,
        branch: &str,
        from_ref: &str,
    ) -> Result<(), GitAdapterError>;
    /// Move a worktree using the git-native move so internal refs update.
    async fn move_worktree(&self, from: &Path, to: &Path) -> Result<(), GitAdapterError>;
    /// Rename a worktree's current branch.
    async fn rename_branch(
        &self,
        path: &Path,
        old_branch: &str,
        new_branch: &str,
    ) -> Result<(), GitAdapterError>;
    async fn remove_worktree(&self, path: &Path) -> Result<(), GitAdapterError>;
    async fn delete_branch(&self, branch: &str) -> Result<(), GitAdapterError>;
    async fn prune_worktrees(&self) -> Result<(), GitAdapterError>;
    /// Whether `path` is a currently-registered, valid worktree.
    async fn worktree_is_valid(&self, path: &Path) -> bool;
    /// The branch currently checked out at `path`.
    async fn current_branch(&self, path: &Path) -> Result<String, GitAdapterError>;
    /// Whether `branch` still exists locally or on the remote.
    async fn branch_exists(&self, branch: &str) -> bool;
    /// The commit hash of `reference` (e.g. `origin/main`).
    async fn rev_parse(&self, reference: &str) -> Result<String, GitAdapterError>;

    async fn has_uncommitted_changes(&self, dir: Option<&Path>) -> Result<bool, GitAdapterError>;
    async fn add_all(&self, dir: Option<&Path>) -> Result<(), GitAdapterError>;
    async fn commit(&self, message: &str, dir: Option<&Path>) -> Result<String, GitAdapterError>;
    async fn push_branch(&self, branch: &str, dir: Option<&Path>) -> Result<(), GitAdapterError>;
    async fn repo_url(&self) -> Result<String, GitAdapterError>;

    async fn has_existing_pr(&self, branch: &str) -> Result<bool, GitAdapterError>;
    async fn create_pull_request(
        &self,
        branch: &str,
        base: &str,
        title: &str,
        body: &str,
    ) -> Result<PullRequestInfo, GitAdapterError>;
    async fn get_pr_by_branch(&self, branch: &str) -> Result<PullRequestInfo, GitAdapterError>;
    async fn get_pr_by_id(&self, id: &str) -> Result<PullRequestInfo, GitAdapterError>;
    async fn update_pr_title(&self, id: &str, title: &str) -> Result<(), GitAdapterError>;
    async fn update_pr_description(&self, id: &str, description: &str) -> Result<(), GitAdapterError>;
    /// Find a repository-level PR template, if one exists.
    async fn find_pr_template(&self) -> Option<String>;
    fn extract_pr_id_from_url(&self, url: &str) -> Option<String>;
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
