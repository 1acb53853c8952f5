use thiserror::Error;

/// Errors surfaced by engine components.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The Working-Tree Pool had no ready entry (SPEC_FULL §4.5 step 1).
    /// Expected and handled by falling back to synchronous creation.
    #[error("worktree pool is empty")]
    PoolEmpty,
    #[error("git operation failed: {0}")]
    Git(#[from] convoy_adapters::GitAdapterError),
    #[error("agent invocation failed: {0}")]
    Agent(#[from] convoy_adapters::AgentAdapterError),
    #[error("persistence failed: {0}")]
    Store(#[from] convoy_store::StoreError),
    #[error("job {0} not found")]
    JobNotFound(String),
    #[error("job {0} has no CLI session")]
    NoSession(String),
}
