//! Fake CLI-agent adapter for deterministic testing.

use super::{AgentAdapterError, AgentAdapter, ConversationResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Recorded call to [`FakeAgentAdapter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentCall {
    StartNewConversation {
        prompt: String,
        dir: Option<PathBuf>,
    },
    ContinueConversation {
        session_id: String,
        prompt: String,
        dir: Option<PathBuf>,
    },
    FetchAndRefreshTokens,
}

struct FakeAgentState {
    calls: Vec<AgentCall>,
    next_session_id: u64,
    scripted_output: String,
    start_error: Option<AgentAdapterError>,
    continue_error: Option<AgentAdapterError>,
    refresh_error: Option<AgentAdapterError>,
}

/// Scripted, in-memory agent adapter. Records every call and returns a
/// deterministic session id / output unless an error has been scripted.
#[derive(Clone)]
pub struct FakeAgentAdapter {
    name: String,
    inner: Arc<Mutex<FakeAgentState>>,
}

impl Default for FakeAgentAdapter {
    fn default() -> Self {
        Self::new("fake-agent")
    }
}

impl FakeAgentAdapter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inner: Arc::new(Mutex::new(FakeAgentState {
                calls: Vec::new(),
                next_session_id: 1,
                scripted_output: "ok".into(),
                start_error: None,
                continue_error: None,
                refresh_error: None,
            })),
        }
    }

    pub fn calls(&self) -> Vec<AgentCall> {
        self.inner.lock().calls.clone()
    }

    pub fn set_output(&self, output: impl Into<String>) {
        self.inner.lock().scripted_output = output.into();
    }

    pub fn set_start_error(&self, err: AgentAdapterError) {
        self.inner.lock().start_error = Some(err);
    }

    pub fn set_continue_error(&self, err: AgentAdapterError) {
        self.inner.lock().continue_error = Some(err);
    }

    pub fn set_refresh_error(&self, err: AgentAdapterError) {
        self.inner.lock().refresh_error = Some(err);
    }
}

#[async_trait]
impl AgentAdapter for FakeAgentAdapter {
    fn agent_name(&self) -> &str {
        &self.name
    }

    async fn start_new_conversation(
        &self,
        prompt: &str,
        _system_prompt: &str,
        dir: Option<&Path>,
    ) -> Result<ConversationResult, AgentAdapterError> {
        let mut inner = self.inner.lock();
        inner.calls.push(AgentCall::StartNewConversation {
            prompt: prompt.to_string(),
            dir: dir.map(Path::to_path_buf),
        });
        if let Some(err) = inner.start_error.clone() {
            return Err(err);
        }
        let session_id = format!("fake-session-{}", inner.next_session_id);
        inner.next_session_id += 1;
        Ok(ConversationResult {
            output: inner.scripted_output.clone(),
            session_id,
        })
    }

    async fn continue_conversation(
        &self,
        session_id: &str,
        prompt: &str,
        dir: Option<&Path>,
    ) -> Result<ConversationResult, AgentAdapterError> {
        let mut inner = self.inner.lock();
        inner.calls.push(AgentCall::ContinueConversation {
            session_id: session_id.to_string(),
            prompt: prompt.to_string(),
            dir: dir.map(Path::to_path_buf),
        });
        if let Some(err) = inner.continue_error.clone() {
            return Err(err);
        }
        Ok(ConversationResult {
            output: inner.scripted_output.clone(),
            session_id: session_id.to_string(),
        })
    }

    async fn fetch_and_refresh_tokens(&self) -> Result<(), AgentAdapterError> {
        let mut inner = self.inner.lock();
        inner.calls.push(AgentCall::FetchAndRefreshTokens);
        if let Some(err) = inner.refresh_error.clone() {
            return Err(err);
        }
        Ok(())
    }
}
