//! Working-Tree Pool: a background-filled pool of ready-to-use isolated
//! checkouts (SPEC_FULL §4.5).

use crate::error::EngineError;
use convoy_adapters::GitAdapter;
use convoy_core::{PooledWorktree, POOL_BRANCH_PREFIX};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use uuid::Uuid;

/// Interval at which the replenisher refreshes pooled entries whose base
/// commit has drifted from the current origin head.
const REFRESH_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Pool of ready worktrees, each checked out on a sentinel branch
/// (`pool-ready-<uuid>`) tracking `origin/<default-branch>`.
pub struct WorktreePool {
    git: Arc<dyn GitAdapter>,
    base_dir: PathBuf,
    target_size: usize,
    ready: Mutex<Vec<PooledWorktree>>,
    replenish_signal: Arc<Notify>,
    stop: Arc<Notify>,
}

impl WorktreePool {
    pub fn new(git: Arc<dyn GitAdapter>, base_dir: PathBuf, target_size: usize) -> Arc<Self> {
        Arc::new(Self {
            git,
            base_dir,
            target_size,
            ready: Mutex::new(Vec::new()),
            replenish_signal: Arc::new(Notify::new()),
            stop: Arc::new(Notify::new()),
        })
    }

    /// Spawn the replenisher background task.
    pub fn spawn_replenisher(self: &Arc<Self>) {
        let pool = self.clone();
        tokio::spawn(async move { pool.replenisher_loop().await });
    }

    pub fn stop(&self) {
        self.stop.notify_waiters();
    }

    async fn replenisher_loop(self: Arc<Self>) {
        self.fill_to_target().await;

        loop {
            tokio::select! {
                _ = self.replenish_signal.notified() => {
                    self.fill_to_target().await;
                }
                _ = tokio::time::sleep(REFRESH_INTERVAL) => {
                    self.refresh_stale_entries().await;
                }
                _ = self.stop.notified() => {
                    return;
                }
            }
        }
    }

    async fn fill_to_target(&self) {
        while self.ready.lock().len() < self.target_size {
            match self.create_entry().await {
                Ok(entry) => self.ready.lock().push(entry),
                Err(err) => {
                    tracing::warn!(%err, "worktree pool: entry creation failed, backing off");
                    return;
                }
            }
        }
    }

    async fn refresh_stale_entries(&self) {
        let Ok(current_head) = self.git.rev_parse("origin/HEAD").await else {
            return;
        };
        let stale: Vec<PooledWorktree> = self
            .ready
            .lock()
            .iter()
            .filter(|entry| entry.is_stale(&current_head))
            .cloned()
            .collect();

        for entry in stale {
            if let Err(err) = self.git.remove_worktree(&entry.path).await {
                tracing::warn!(%err, path = %entry.path.display(), "worktree pool: refresh cleanup failed");
                continue;
            }
            let _ = self.git.delete_branch(&entry.branch_name).await;
            self.ready.lock().retain(|e| e.path != entry.path);
            if let Ok(fresh) = self.create_entry().await {
                self.ready.lock().push(fresh);
            }
        }
    }

    async fn create_entry(&self) -> Result<PooledWorktree, EngineError> {
        let default_branch = self.git.get_default_branch().await?;
        self.git.reset_hard(None).await?;
        self.git.checkout_branch(&default_branch, None).await?;
        self.git.fetch_origin().await?;
        let base_commit = self
            .git
            .rev_parse(&format!("origin/{default_branch}"))
            .await?;

        let id = Uuid::new_v4();
        let branch_name = format!("{POOL_BRANCH_PREFIX}{id}");
        let path = self.base_dir.join(format!("pool-{id}"));
        self.git
            .create_worktree(&path, &branch_name, &format!("origin/{default_branch}"))
            .await?;

        Ok(PooledWorktree::new(path, branch_name, base_commit, now_ms()))
    }

    /// Acquire a ready worktree and rename it into job-scoped position.
    /// Returns [`EngineError::PoolEmpty`] when no entry is ready; callers
    /// fall back to synchronous creation.
    pub async fn acquire(
        self: &Arc<Self>,
        job_id: &str,
        target_branch_name: &str,
    ) -> Result<PooledWorktree, EngineError> {
        let entry = {
            let mut ready = self.ready.lock();
            if ready.is_empty() {
                return Err(EngineError::PoolEmpty);
            }
            ready.remove(0)
        };
        self.replenish_signal.notify_one();

        if let Ok(current_head) = self.git.rev_parse("origin/HEAD").await {
            if entry.is_stale(&current_head) {
                let _ = self.git.fetch_origin().await;
            }
        }

        let job_path = self.base_dir.join(job_id);
        if let Err(err) = self.git.move_worktree(&entry.path, &job_path).await {
            tracing::warn!(%err, "worktree pool: move failed, attempting cleanup");
            let _ = self.git.remove_worktree(&entry.path).await;
            return Err(err.into());
        }
        if let Err(err) = self
            .git
            .rename_branch(&job_path, &entry.branch_name, target_branch_name)
            .await
        {
            tracing::warn!(%err, "worktree pool: rename failed, attempting cleanup");
            let _ = self.git.remove_worktree(&job_path).await;
            return Err(err.into());
        }

        Ok(PooledWorktree::new(
            job_path,
            target_branch_name.to_string(),
            entry.base_commit,
            entry.created_at_ms,
        ))
    }

    /// Remove every pooled worktree and delete its branch.
    pub async fn cleanup_pool(&self) {
        let entries: Vec<PooledWorktree> = self.ready.lock().drain(..).collect();
        for entry in entries {
            let _ = self.git.remove_worktree(&entry.path).await;
            let _ = self.git.delete_branch(&entry.branch_name).await;
        }
    }

    /// Scan `<base>/pool-*` on startup: valid sentinel worktrees are kept
    /// (up to `target_size`), the rest removed.
    pub async fn reclaim_orphaned_pool_worktrees(&self, candidates: Vec<PathBuf>) {
        let mut kept = 0;
        for path in candidates {
            if kept >= self.target_size {
                let _ = self.git.remove_worktree(&path).await;
                continue;
            }
            if !self.git.worktree_is_valid(&path).await {
                continue;
            }
            let Ok(branch) = self.git.current_branch(&path).await else {
                let _ = self.git.remove_worktree(&path).await;
                continue;
            };
            if !branch.starts_with(convoy_core::POOL_BRANCH_PREFIX) {
                let _ = self.git.remove_worktree(&path).await;
                continue;
            }
            let base_commit = self
                .git
                .rev_parse(&branch)
                .await
                .unwrap_or_default();
            self.ready.lock().push(PooledWorktree::new(
                path,
                branch,
                base_commit,
                now_ms(),
            ));
            kept += 1;
        }
    }

    #[cfg(any(test, feature = "test-support"))]
    pub fn ready_len(&self) -> usize {
        self.ready.lock().len()
    }
}

fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
#[path = "pool_tests.rs"]
mod tests;
