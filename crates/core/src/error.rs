//! Shared domain error used where components need to signal an expected,
//! typed condition rather than a generic failure (e.g. pool-empty, SPEC_FULL
//! §4.5).

use thiserror::Error;

/// Errors that are expected outcomes of normal operation, not bugs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("no ready worktree in the pool")]
    PoolEmpty,
    #[error("job not found: {0}")]
    JobNotFound(String),
    #[error("job has no CLI session yet: {0}")]
    NoSession(String),
    #[error("remote branch deleted")]
    RemoteBranchDeleted,
}
