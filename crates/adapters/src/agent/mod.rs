//! CLI-agent adapter: wraps a locally installed coding-CLI process
//! (SPEC_FULL §6). The core only ever talks to this trait — it never
//! shells out or owns CLI credentials directly.

#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{AgentCall, FakeAgentAdapter};

mod cli;
pub use cli::{CliAgentAdapter, CliAgentConfig};

use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Hard wall-clock timeout enforced around every CLI-agent call (SPEC_FULL
/// §5).
pub const AGENT_CALL_TIMEOUT: Duration = Duration::from_secs(60 * 60);

/// Errors from CLI-agent operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AgentAdapterError {
    #[error("agent invocation failed: {0}")]
    InvocationFailed(String),
    #[error("agent invocation timed out after {0:?}")]
    TimedOut(Duration),
    #[error("token refresh failed: {0}")]
    TokenRefreshFailed(String),
}

/// Result of a conversation turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationResult {
    /// The agent's textual reply for this turn.
    pub output: String,
    /// Session id the agent assigned (or re-confirmed) for this conversation.
    pub session_id: String,
}

/// Adapter for a CLI coding agent (e.g. an interactive code assistant).
#[async_trait]
pub trait AgentAdapter: Send + Sync + 'static {
    /// A short name identifying this agent, used in logs and PR footers.
    fn agent_name(&self) -> &str;

    /// Start a brand-new conversation. `dir` scopes the invocation to a
    /// specific working directory (a job's worktree), when given.
    async fn start_new_conversation(
        &self,
        prompt: &str,
        system_prompt: &str,
        dir: Option<&Path>,
    ) -> Result<ConversationResult, AgentAdapterError>;

    /// Continue an existing conversation identified by `session_id`.
    async fn continue_conversation(
        &self,
        session_id: &str,
        prompt: &str,
        dir: Option<&Path>,
    ) -> Result<ConversationResult, AgentAdapterError>;

    /// Reload credentials/tokens before a turn (SPEC_FULL §4.6 step 3).
    async fn fetch_and_refresh_tokens(&self) -> Result<(), AgentAdapterError>;
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
