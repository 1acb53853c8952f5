//! Real `GitAdapter`: shells out to the `git` CLI for repository/worktree
//! operations and to the `gh` CLI for pull-request operations against
//! GitHub.

use super::{GitAdapter, GitAdapterError, PullRequestInfo, PullRequestState};
use crate::subprocess::{run_with_timeout, stderr_string, stdout_string};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tokio::process::Command;

const GIT_TIMEOUT: Duration = Duration::from_secs(60);
const GH_TIMEOUT: Duration = Duration::from_secs(30);

/// Shells out to `git` and `gh`, scoped to a single repository checkout.
pub struct ShellGitAdapter {
    repo_path: std::path::PathBuf,
}

impl ShellGitAdapter {
    pub fn new(repo_path: impl Into<std::path::PathBuf>) -> Self {
        Self {
            repo_path: repo_path.into(),
        }
    }

    fn git(&self, dir: Option<&Path>) -> Command {
        let mut cmd = Command::new("git");
        cmd.current_dir(dir.unwrap_or(&self.repo_path));
        cmd
    }

    fn gh(&self) -> Command {
        let mut cmd = Command::new("gh");
        cmd.current_dir(&self.repo_path);
        cmd
    }

    async fn run_git(&self, args: &[&str], dir: Option<&Path>, description: &str) -> Result<String, String> {
        let mut cmd = self.git(dir);
        cmd.args(args);
        let output = run_with_timeout(cmd, GIT_TIMEOUT, description).await?;
        if !output.status.success() {
            return Err(stderr_string(&output));
        }
        Ok(stdout_string(&output))
    }

    async fn run_gh(&self, args: &[&str], description: &str) -> Result<String, String> {
        let mut cmd = self.gh();
        cmd.args(args);
        let output = run_with_timeout(cmd, GH_TIMEOUT, description).await?;
        if !output.status.success() {
            return Err(stderr_string(&output));
        }
        Ok(stdout_string(&output))
    }
}

#[derive(Debug, Deserialize)]
struct GhPrView {
    number: u64,
    url: String,
    title: String,
    body: Option<String>,
    state: String,
}

impl GhPrView {
    fn into_info(self) -> PullRequestInfo {
        PullRequestInfo {
            id: self.number.to_string(),
            url: self.url,
            title: self.title,
            description: self.body.unwrap_or_default(),
            state: match self.state.as_str() {
                "OPEN" => PullRequestState::Open,
                "MERGED" => PullRequestState::Merged,
                "CLOSED" => PullRequestState::Closed,
                _ => PullRequestState::Unknown,
            },
        }
    }
}

const PR_VIEW_FIELDS: &str = "number,url,title,body,state";

#[async_trait]
impl GitAdapter for ShellGitAdapter {
    async fn get_default_branch(&self) -> Result<String, GitAdapterError> {
        let out = self
            .run_git(
                &["symbolic-ref", "--short", "refs/remotes/origin/HEAD"],
                None,
                "git default branch",
            )
            .await
            .map_err(GitAdapterError::FetchFailed)?;
        Ok(out.trim_start_matches("origin/").to_string())
    }

    async fn fetch_origin(&self) -> Result<(), GitAdapterError> {
        self.run_git(&["fetch", "origin"], None, "git fetch")
            .await
            .map(|_| ())
            .map_err(GitAdapterError::FetchFailed)
    }

    async fn reset_hard(&self, dir: Option<&Path>) -> Result<(), GitAdapterError> {
        self.run_git(&["reset", "--hard"], dir, "git reset")
            .await
            .map(|_| ())
            .map_err(GitAdapterError::ResetFailed)
    }

    async fn clean_untracked(&self, dir: Option<&Path>) -> Result<(), GitAdapterError> {
        self.run_git(&["clean", "-fd"], dir, "git clean")
            .await
            .map(|_| ())
            .map_err(GitAdapterError::ResetFailed)
    }

    async fn checkout_branch(&self, branch: &str, dir: Option<&Path>) -> Result<(), GitAdapterError> {
        self.run_git(&["checkout", branch], dir, "git checkout")
            .await
            .map(|_| ())
            .map_err(GitAdapterError::CheckoutFailed)
    }

    async fn checkout_remote_branch(
        &self,
        branch: &str,
        dir: Option<&Path>,
    ) -> Result<(), GitAdapterError> {
        self.run_git(
            &["checkout", "-b", branch, &format!("origin/{branch}")],
            dir,
            "git checkout remote",
        )
        .await
        .map(|_| ())
        .map_err(GitAdapterError::CheckoutFailed)
    }

    async fn pull_latest(&self, dir: Option<&Path>) -> Result<(), GitAdapterError> {
        self.run_git(&["pull", "--ff-only"], dir, "git pull")
            .await
            .map(|_| ())
            .map_err(|msg| {
                if msg.contains("couldn't find remote ref") || msg.contains("unknown revision") {
                    GitAdapterError::PullFailed(format!("{} ({})", super::REMOTE_BRANCH_DELETED, msg))
                } else {
                    GitAdapterError::PullFailed(msg)
                }
            })
    }

    async fn create_branch(&self, branch: &str, dir: Option<&Path>) -> Result<(), GitAdapterError> {
        self.run_git(&["branch", branch], dir, "git branch")
            .await
            .map(|_| ())
            .map_err(GitAdapterError::CheckoutFailed)
    }

    async fn create_worktree(
        &self,
        path: &Path,
        branch: &str,
        from_ref: &str,
    ) -> Result<(), GitAdapterError> {
        self.run_git(
            &[
                "worktree",
                "add",
                "-b",
                branch,
                &path.to_string_lossy(),
                from_ref,
            ],
            None,
            "git worktree add",
        )
        .await
        .map(|_| ())
        .map_err(GitAdapterError::WorktreeFailed)
    }

    async fn move_worktree(&self, from: &Path, to: &Path) -> Result<(), GitAdapterError> {
        self.run_git(
            &[
                "worktree",
                "move",
                &from.to_string_lossy(),
                &to.to_string_lossy(),
            ],
            None,
            "git worktree move",
        )
        .await
        .map(|_| ())
        .map_err(GitAdapterError::WorktreeFailed)
    }

    async fn rename_branch(
        &self,
        path: &Path,
        old_branch: &str,
        new_branch: &str,
    ) -> Result<(), GitAdapterError> {
        let _ = old_branch;
        self.run_git(
            &["branch", "-m", new_branch],
            Some(path),
            "git branch rename",
        )
        .await
        .map(|_| ())
        .map_err(GitAdapterError::WorktreeFailed)
    }

    async fn remove_worktree(&self, path: &Path) -> Result<(), GitAdapterError> {
        self.run_git(
            &["worktree", "remove", "--force", &path.to_string_lossy()],
            None,
            "git worktree remove",
        )
        .await
        .map(|_| ())
        .map_err(GitAdapterError::WorktreeFailed)
    }

    async fn delete_branch(&self, branch: &str) -> Result<(), GitAdapterError> {
        self.run_git(&["branch", "-D", branch], None, "git branch delete")
            .await
            .map(|_| ())
            .map_err(GitAdapterError::WorktreeFailed)
    }

    async fn prune_worktrees(&self) -> Result<(), GitAdapterError> {
        self.run_git(&["worktree", "prune"], None, "git worktree prune")
            .await
            .map(|_| ())
            .map_err(GitAdapterError::WorktreeFailed)
    }

    async fn worktree_is_valid(&self, path: &Path) -> bool {
        self.run_git(&["rev-parse", "--is-inside-work-tree"], Some(path), "git rev-parse")
            .await
            .map(|out| out.trim() == "true")
            .unwrap_or(false)
    }

    async fn current_branch(&self, path: &Path) -> Result<String, GitAdapterError> {
        self.run_git(
            &["rev-parse", "--abbrev-ref", "HEAD"],
            Some(path),
            "git current branch",
        )
        .await
        .map_err(GitAdapterError::WorktreeFailed)
    }

    async fn branch_exists(&self, branch: &str) -> bool {
        self.run_git(
            &["show-ref", "--verify", "--quiet", &format!("refs/heads/{branch}")],
            None,
            "git show-ref local",
        )
        .await
        .is_ok()
            || self
                .run_git(
                    &[
                        "show-ref",
                        "--verify",
                        "--quiet",
                        &format!("refs/remotes/origin/{branch}"),
                    ],
                    None,
                    "git show-ref remote",
                )
                .await
                .is_ok()
    }

    async fn rev_parse(&self, reference: &str) -> Result<String, GitAdapterError> {
        self.run_git(&["rev-parse", reference], None, "git rev-parse")
            .await
            .map_err(GitAdapterError::WorktreeFailed)
    }

    async fn has_uncommitted_changes(&self, dir: Option<&Path>) -> Result<bool, GitAdapterError> {
        let out = self
            .run_git(&["status", "--porcelain"], dir, "git status")
            .await
            .map_err(GitAdapterError::CommitFailed)?;
        Ok(!out.is_empty())
    }

    async fn add_all(&self, dir: Option<&Path>) -> Result<(), GitAdapterError> {
        self.run_git(&["add", "-A"], dir, "git add")
            .await
            .map(|_| ())
            .map_err(GitAdapterError::CommitFailed)
    }

    async fn commit(&self, message: &str, dir: Option<&Path>) -> Result<String, GitAdapterError> {
        self.run_git(&["commit", "-m", message], dir, "git commit")
            .await
            .map_err(GitAdapterError::CommitFailed)?;
        self.run_git(&["rev-parse", "HEAD"], dir, "git rev-parse HEAD")
            .await
            .map_err(GitAdapterError::CommitFailed)
    }

    async fn push_branch(&self, branch: &str, dir: Option<&Path>) -> Result<(), GitAdapterError> {
        self.run_git(
            &["push", "--set-upstream", "origin", branch],
            dir,
            "git push",
        )
        .await
        .map(|_| ())
        .map_err(GitAdapterError::PushFailed)
    }

    async fn repo_url(&self) -> Result<String, GitAdapterError> {
        self.run_git(&["remote", "get-url", "origin"], None, "git remote url")
            .await
            .map_err(GitAdapterError::FetchFailed)
    }

    async fn has_existing_pr(&self, branch: &str) -> Result<bool, GitAdapterError> {
        match self.get_pr_by_branch(branch).await {
            Ok(_) => Ok(true),
            Err(GitAdapterError::PullRequestFailed(msg)) if msg.contains("no pull requests found") => {
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }

    async fn create_pull_request(
        &self,
        branch: &str,
        base: &str,
        title: &str,
        body: &str,
    ) -> Result<PullRequestInfo, GitAdapterError> {
        self.run_gh(
            &[
                "pr", "create", "--head", branch, "--base", base, "--title", title, "--body", body,
            ],
            "gh pr create",
        )
        .await
        .map_err(GitAdapterError::PullRequestFailed)?;
        self.get_pr_by_branch(branch).await
    }

    async fn get_pr_by_branch(&self, branch: &str) -> Result<PullRequestInfo, GitAdapterError> {
        let out = self
            .run_gh(
                &["pr", "view", branch, "--json", PR_VIEW_FIELDS],
                "gh pr view",
            )
            .await
            .map_err(GitAdapterError::PullRequestFailed)?;
        serde_json::from_str::<GhPrView>(&out)
            .map(GhPrView::into_info)
            .map_err(|err| GitAdapterError::PullRequestFailed(format!("undecodable gh output: {err}")))
    }

    async fn get_pr_by_id(&self, id: &str) -> Result<PullRequestInfo, GitAdapterError> {
        let out = self
            .run_gh(&["pr", "view", id, "--json", PR_VIEW_FIELDS], "gh pr view")
            .await
            .map_err(GitAdapterError::PullRequestFailed)?;
        serde_json::from_str::<GhPrView>(&out)
            .map(GhPrView::into_info)
            .map_err(|err| GitAdapterError::PullRequestFailed(format!("undecodable gh output: {err}")))
    }

    async fn update_pr_title(&self, id: &str, title: &str) -> Result<(), GitAdapterError> {
        self.run_gh(&["pr", "edit", id, "--title", title], "gh pr edit title")
            .await
            .map(|_| ())
            .map_err(GitAdapterError::PullRequestFailed)
    }

    async fn update_pr_description(&self, id: &str, description: &str) -> Result<(), GitAdapterError> {
        self.run_gh(&["pr", "edit", id, "--body", description], "gh pr edit body")
            .await
            .map(|_| ())
            .map_err(GitAdapterError::PullRequestFailed)
    }

    async fn find_pr_template(&self) -> Option<String> {
        for candidate in [
            ".github/pull_request_template.md",
            ".github/PULL_REQUEST_TEMPLATE.md",
            "docs/pull_request_template.md",
        ] {
            let path = self.repo_path.join(candidate);
            if let Ok(contents) = tokio::fs::read_to_string(&path).await {
                return Some(contents);
            }
        }
        None
    }

    fn extract_pr_id_from_url(&self, url: &str) -> Option<String> {
        url.rsplit('/').next().filter(|s| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())).map(String::from)
    }
}

#[cfg(test)]
#[path = "shell_tests.rs"]
mod tests;
