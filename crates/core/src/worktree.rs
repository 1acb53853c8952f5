//! Pooled worktree records (SPEC_FULL §3, §4.5).

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Prefix every pool-owned branch carries until `WorktreePool::acquire`
/// renames it to the job's target branch.
pub const POOL_BRANCH_PREFIX: &str = "pool-ready-";

/// A ready-to-use, isolated checkout waiting in the pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PooledWorktree {
    pub path: PathBuf,
    pub branch_name: String,
    pub base_commit: String,
    pub created_at_ms: u64,
}

impl PooledWorktree {
    pub fn new(path: PathBuf, branch_name: String, base_commit: String, created_at_ms: u64) -> Self {
        Self {
            path,
            branch_name,
            base_commit,
            created_at_ms,
        }
    }

    /// Whether this entry's branch still carries the pool sentinel prefix.
    pub fn is_sentinel(&self) -> bool {
        self.branch_name.starts_with(POOL_BRANCH_PREFIX)
    }

    /// Whether the entry is stale relative to the current origin head.
    pub fn is_stale(&self, current_origin_head: &str) -> bool {
        self.base_commit != current_origin_head
    }
}

#[cfg(test)]
#[path = "worktree_tests.rs"]
mod tests;
