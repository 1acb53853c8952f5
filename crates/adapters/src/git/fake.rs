//! In-memory fake git/forge adapter for deterministic testing.

use super::{GitAdapterError, GitAdapter, PullRequestInfo, PullRequestState};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Recorded call to [`FakeGitAdapter`], for assertions on call order/args.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitCall {
    FetchOrigin,
    ResetHard,
    CreateWorktree { path: PathBuf, branch: String, from_ref: String },
    MoveWorktree { from: PathBuf, to: PathBuf },
    RenameBranch { path: PathBuf, old: String, new: String },
    RemoveWorktree { path: PathBuf },
    PullLatest { dir: Option<PathBuf> },
    Commit { message: String },
    PushBranch { branch: String },
    CreatePullRequest { branch: String },
}

struct FakeGitState {
    default_branch: String,
    origin_head: String,
    branches: HashSet<String>,
    worktrees: HashMap<PathBuf, String>,
    prs: HashMap<String, PullRequestInfo>,
    next_pr_id: u64,
    uncommitted_changes: bool,
    pull_error: Option<GitAdapterError>,
    calls: Vec<GitCall>,
    pr_template: Option<String>,
}

/// In-memory fake satisfying [`GitAdapter`] end to end: worktrees, branches,
/// and a tiny forge (PRs keyed by branch).
#[derive(Clone)]
pub struct FakeGitAdapter {
    inner: Arc<Mutex<FakeGitState>>,
}

impl Default for FakeGitAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeGitAdapter {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeGitState {
                default_branch: "main".into(),
                origin_head: "sha-0".into(),
                branches: HashSet::from(["main".to_string()]),
                worktrees: HashMap::new(),
                prs: HashMap::new(),
                next_pr_id: 1,
                uncommitted_changes: false,
                pull_error: None,
                calls: Vec::new(),
                pr_template: None,
            })),
        }
    }

    pub fn calls(&self) -> Vec<GitCall> {
        self.inner.lock().calls.clone()
    }

    /// Advance the simulated `origin/<default>` head, e.g. to make pooled
    /// worktrees stale.
    pub fn advance_origin_head(&self, new_head: impl Into<String>) {
        self.inner.lock().origin_head = new_head.into();
    }

    pub fn set_uncommitted_changes(&self, value: bool) {
        self.inner.lock().uncommitted_changes = value;
    }

    pub fn set_pull_error(&self, err: GitAdapterError) {
        self.inner.lock().pull_error = Some(err);
    }

    /// Force the state of the PR currently recorded for `branch`, for tests
    /// exercising merged/closed idle-check decisions.
    pub fn set_pr_state(&self, branch: &str, state: PullRequestState) {
        if let Some(pr) = self.inner.lock().prs.get_mut(branch) {
            pr.state = state;
        }
    }

    pub fn clear_pull_error(&self) {
        self.inner.lock().pull_error = None;
    }

    pub fn worktree_count(&self) -> usize {
        self.inner.lock().worktrees.len()
    }

    pub fn worktree_branch(&self, path: &Path) -> Option<String> {
        self.inner.lock().worktrees.get(path).cloned()
    }
}

#[async_trait]
impl GitAdapter for FakeGitAdapter {
    async fn get_default_branch(&self) -> Result<String, GitAdapterError> {
        Ok(self.inner.lock().default_branch.clone())
    }

    async fn fetch_origin(&self) -> Result<(), GitAdapterError> {
        self.inner.lock().calls.push(GitCall::FetchOrigin);
        Ok(())
    }

    async fn reset_hard(&self, _dir: Option<&Path>) -> Result<(), GitAdapterError> {
        self.inner.lock().calls.push(GitCall::ResetHard);
        Ok(())
    }

    async fn clean_untracked(&self, _dir: Option<&Path>) -> Result<(), GitAdapterError> {
        Ok(())
    }

    async fn checkout_branch(&self, _branch: &str, _dir: Option<&Path>) -> Result<(), GitAdapterError> {
        Ok(())
    }

    async fn checkout_remote_branch(
        &self,
        _branch: &str,
        _dir: Option<&Path>,
    ) -> Result<(), GitAdapterError> {
        Ok(())
    }

    async fn pull_latest(&self, dir: Option<&Path>) -> Result<(), GitAdapterError> {
        let mut inner = self.inner.lock();
        inner.calls.push(GitCall::PullLatest {
            dir: dir.map(Path::to_path_buf),
        });
        if let Some(err) = inner.pull_error.clone() {
            return Err(err);
        }
        Ok(())
    }

    async fn create_branch(&self, branch: &str, _dir: Option<&Path>) -> Result<(), GitAdapterError> {
        self.inner.lock().branches.insert(branch.to_string());
        Ok(())
    }

    async fn create_worktree(
        &self,
        path: &Path,
        branch: &str,
        from_ref: &str,
    ) -> Result<(), GitAdapterError> {
        let mut inner = self.inner.lock();
        inner.calls.push(GitCall::CreateWorktree {
            path: path.to_path_buf(),
            branch: branch.to_string(),
            from_ref: from_ref.to_string(),
        });
        inner.branches.insert(branch.to_string());
        inner.worktrees.insert(path.to_path_buf(), branch.to_string());
        Ok(())
    }

    async fn move_worktree(&self, from: &Path, to: &Path) -> Result<(), GitAdapterError> {
        let mut inner = self.inner.lock();
        inner.calls.push(GitCall::MoveWorktree {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
        });
        let branch = inner
            .worktrees
            .remove(from)
            .ok_or_else(|| GitAdapterError::WorktreeFailed(format!("no worktree at {from:?}")))?;
        inner.worktrees.insert(to.to_path_buf(), branch);
        Ok(())
    }

    async fn rename_branch(
        &self,
        path: &Path,
        old_branch: &str,
        new_branch: &str,
    ) -> Result<(), GitAdapterError> {
        let mut inner = self.inner.lock();
        inner.calls.push(GitCall::RenameBranch {
            path: path.to_path_buf(),
            old: old_branch.to_string(),
            new: new_branch.to_string(),
        });
        inner.branches.remove(old_branch);
        inner.branches.insert(new_branch.to_string());
        inner.worktrees.insert(path.to_path_buf(), new_branch.to_string());
        Ok(())
    }

    async fn remove_worktree(&self, path: &Path) -> Result<(), GitAdapterError> {
        let mut inner = self.inner.lock();
        inner.calls.push(GitCall::RemoveWorktree {
            path: path.to_path_buf(),
        });
        inner.worktrees.remove(path);
        Ok(())
    }

    async fn delete_branch(&self, branch: &str) -> Result<(), GitAdapterError> {
        self.inner.lock().branches.remove(branch);
        Ok(())
    }

    async fn prune_worktrees(&self) -> Result<(), GitAdapterError> {
        Ok(())
    }

    async fn worktree_is_valid(&self, path: &Path) -> bool {
        self.inner.lock().worktrees.contains_key(path)
    }

    async fn current_branch(&self, path: &Path) -> Result<String, GitAdapterError> {
        self.inner
            .lock()
            .worktrees
            .get(path)
            .cloned()
            .ok_or_else(|| GitAdapterError::WorktreeFailed(format!("no worktree at {path:?}")))
    }

    async fn branch_exists(&self, branch: &str) -> bool {
        self.inner.lock().branches.contains(branch)
    }

    async fn rev_parse(&self, reference: &str) -> Result<String, GitAdapterError> {
        let inner = self.inner.lock();
        if reference.ends_with(&inner.default_branch) {
            Ok(inner.origin_head.clone())
        } else {
            Ok(format!("sha-{reference}"))
        }
    }

    async fn has_uncommitted_changes(&self, _dir: Option<&Path>) -> Result<bool, GitAdapterError> {
        Ok(self.inner.lock().uncommitted_changes)
    }

    async fn add_all(&self, _dir: Option<&Path>) -> Result<(), GitAdapterError> {
        Ok(())
    }

    async fn commit(&self, message: &str, _dir: Option<&Path>) -> Result<String, GitAdapterError> {
        let mut inner = self.inner.lock();
        inner.calls.push(GitCall::Commit {
            message: message.to_string(),
        });
        inner.uncommitted_changes = false;
        Ok(format!("commit-{}", inner.calls.len()))
    }

    async fn push_branch(&self, branch: &str, _dir: Option<&Path>) -> Result<(), GitAdapterError> {
        self.inner.lock().calls.push(GitCall::PushBranch {
            branch: branch.to_string(),
        });
        Ok(())
    }

    async fn repo_url(&self) -> Result<String, GitAdapterError> {
        Ok("https://example.invalid/org/repo".into())
    }

    async fn has_existing_pr(&self, branch: &str) -> Result<bool, GitAdapterError> {
        Ok(self.inner.lock().prs.contains_key(branch))
    }

    async fn create_pull_request(
        &self,
        branch: &str,
        _base: &str,
        title: &str,
        body: &str,
    ) -> Result<PullRequestInfo, GitAdapterError> {
        let mut inner = self.inner.lock();
        inner.calls.push(GitCall::CreatePullRequest {
            branch: branch.to_string(),
        });
        let id = inner.next_pr_id.to_string();
        inner.next_pr_id += 1;
        let info = PullRequestInfo {
            id: id.clone(),
            url: format!("https://example.invalid/org/repo/pull/{id}"),
            title: title.to_string(),
            description: body.to_string(),
            state: PullRequestState::Open,
        };
        inner.prs.insert(branch.to_string(), info.clone());
        Ok(info)
    }

    async fn get_pr_by_branch(&self, branch: &str) -> Result<PullRequestInfo, GitAdapterError> {
        self.inner
            .lock()
            .prs
            .get(branch)
            .cloned()
            .ok_or_else(|| GitAdapterError::PullRequestFailed(format!("no PR for {branch}")))
    }

    async fn get_pr_by_id(&self, id: &str) -> Result<PullRequestInfo, GitAdapterError> {
        self.inner
            .lock()
            .prs
            .values()
            .find(|pr| pr.id == id)
            .cloned()
            .ok_or_else(|| GitAdapterError::PullRequestFailed(format!("no PR with id {id}")))
    }

    async fn update_pr_title(&self, id: &str, title: &str) -> Result<(), GitAdapterError> {
        let mut inner = self.inner.lock();
        if let Some(pr) = inner.prs.values_mut().find(|pr| pr.id == id) {
            pr.title = title.to_string();
            Ok(())
        } else {
            Err(GitAdapterError::PullRequestFailed(format!("no PR with id {id}")))
        }
    }

    async fn update_pr_description(&self, id: &str, description: &str) -> Result<(), GitAdapterError> {
        let mut inner = self.inner.lock();
        if let Some(pr) = inner.prs.values_mut().find(|pr| pr.id == id) {
            pr.description = description.to_string();
            Ok(())
        } else {
            Err(GitAdapterError::PullRequestFailed(format!("no PR with id {id}")))
        }
    }

    async fn find_pr_template(&self) -> Option<String> {
        self.inner.lock().pr_template.clone()
    }

    fn extract_pr_id_from_url(&self, url: &str) -> Option<String> {
        url.rsplit('/').next().map(str::to_string)
    }
}
