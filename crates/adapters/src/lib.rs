// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Adapters for external I/O: the CLI agent, git/forge, and the
//! conversation-platform transport.

pub mod agent;
pub mod git;
pub mod transport;

pub use agent::{AgentAdapter, AgentAdapterError, CliAgentAdapter, CliAgentConfig, ConversationResult, AGENT_CALL_TIMEOUT};
pub use git::{GitAdapter, GitAdapterError, PullRequestInfo, PullRequestState, ShellGitAdapter, REMOTE_BRANCH_DELETED};
pub use transport::{ConnectionSignal, Transport, TransportError, WebSocketTransport};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use agent::{AgentCall, FakeAgentAdapter};
#[cfg(any(test, feature = "test-support"))]
pub use git::{FakeGitAdapter, GitCall};
#[cfg(any(test, feature = "test-support"))]
pub use transport::{FakeTransport, TransportCall};
