//! Real `AgentAdapter`: invokes a locally installed, headless coding-CLI
//! process per turn (one subprocess call per `start_new_conversation`/
//! `continue_conversation`, no persistent session).

use super::{AgentAdapter, AgentAdapterError, AGENT_CALL_TIMEOUT};
use crate::subprocess::{run_with_timeout, stderr_string, stdout_string};
use async_trait::async_trait;
use convoy_core::{IdGen, UuidIdGen};
use serde::Deserialize;
use std::path::Path;
use tokio::process::Command;

/// Parsed from the CLI's `--output-format json` reply.
#[derive(Debug, Deserialize)]
struct CliTurnOutput {
    result: String,
    #[serde(default)]
    session_id: String,
}

/// Configuration resolved once from `Config` at daemon startup.
#[derive(Debug, Clone)]
pub struct CliAgentConfig {
    /// Executable name or path, e.g. `claude`.
    pub cli_command: String,
    pub model: Option<String>,
    pub permission_mode: String,
}

/// Shells out to a headless coding CLI for every turn.
pub struct CliAgentAdapter {
    config: CliAgentConfig,
    id_gen: UuidIdGen,
}

impl CliAgentAdapter {
    pub fn new(config: CliAgentConfig) -> Self {
        Self {
            config,
            id_gen: UuidIdGen,
        }
    }

    fn base_command(&self, dir: Option<&Path>) -> Command {
        let mut cmd = Command::new(&self.config.cli_command);
        cmd.args(["--print", "--output-format", "json"]);
        cmd.args(["--permission-mode", &self.config.permission_mode]);
        if let Some(model) = &self.config.model {
            cmd.args(["--model", model]);
        }
        if let Some(dir) = dir {
            cmd.current_dir(dir);
        }
        cmd
    }

    async fn invoke(&self, cmd: Command, prompt: &str) -> Result<ConversationResultInner, AgentAdapterError> {
        let mut cmd = cmd;
        cmd.arg(prompt);
        let output = run_with_timeout(cmd, AGENT_CALL_TIMEOUT, "cli agent invocation")
            .await
            .map_err(AgentAdapterError::InvocationFailed)?;

        if !output.status.success() {
            return Err(AgentAdapterError::InvocationFailed(stderr_string(&output)));
        }

        let stdout = stdout_string(&output);
        serde_json::from_str::<CliTurnOutput>(&stdout)
            .map(|parsed| ConversationResultInner {
                output: parsed.result,
                session_id: parsed.session_id,
            })
            .map_err(|_| AgentAdapterError::InvocationFailed(format!("undecodable cli output: {stdout}")))
    }
}

struct ConversationResultInner {
    output: String,
    session_id: String,
}

#[async_trait]
impl AgentAdapter for CliAgentAdapter {
    fn agent_name(&self) -> &str {
        &self.config.cli_command
    }

    async fn start_new_conversation(
        &self,
        prompt: &str,
        system_prompt: &str,
        dir: Option<&Path>,
    ) -> Result<super::ConversationResult, AgentAdapterError> {
        let session_id = self.id_gen.next();
        let mut cmd = self.base_command(dir);
        cmd.args(["--session-id", &session_id]);
        if !system_prompt.is_empty() {
            cmd.args(["--append-system-prompt", system_prompt]);
        }

        let mut result = self.invoke(cmd, prompt).await?;
        if result.session_id.is_empty() {
            result.session_id = session_id;
        }
        Ok(super::ConversationResult {
            output: result.output,
            session_id: result.session_id,
        })
    }

    async fn continue_conversation(
        &self,
        session_id: &str,
        prompt: &str,
        dir: Option<&Path>,
    ) -> Result<super::ConversationResult, AgentAdapterError> {
        let mut cmd = self.base_command(dir);
        cmd.args(["--resume", session_id]);

        let result = self.invoke(cmd, prompt).await?;
        Ok(super::ConversationResult {
            output: result.output,
            session_id: if result.session_id.is_empty() {
                session_id.to_string()
            } else {
                result.session_id
            },
        })
    }

    async fn fetch_and_refresh_tokens(&self) -> Result<(), AgentAdapterError> {
        let mut cmd = Command::new(&self.config.cli_command);
        cmd.arg("--print-token-status");
        match run_with_timeout(cmd, AGENT_CALL_TIMEOUT, "cli token refresh").await {
            Ok(output) if output.status.success() => Ok(()),
            Ok(output) => Err(AgentAdapterError::TokenRefreshFailed(stderr_string(&output))),
            Err(err) => Err(AgentAdapterError::TokenRefreshFailed(err)),
        }
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
