//! Daemon configuration: `clap`-derived flags layered over environment
//! variables, resolved once at startup (SPEC_FULL §3).

use std::path::PathBuf;

use clap::Parser;
use thiserror::Error;
use url::Url;

/// Errors that make the resolved configuration unusable.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("max_concurrency must be at least 1")]
    ZeroConcurrency,
    #[error("pool_target_size must be at least 1")]
    ZeroPoolSize,
    #[error("invalid transport url: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Runtime configuration for `convoyd`, resolved once at startup.
#[derive(Debug, Clone, Parser)]
#[command(name = "convoyd", about = "Bridges a conversation platform to local CLI-agent jobs over git")]
pub struct Config {
    /// Path to the repository the runtime operates on.
    #[arg(long, env = "CONVOY_REPO_PATH")]
    pub repo_path: PathBuf,

    /// Identifier for this agent, used in pull-request footers and dedup.
    #[arg(long, env = "CONVOY_AGENT_ID")]
    pub agent_id: String,

    /// WebSocket URL of the conversation platform transport.
    #[arg(long, env = "CONVOY_TRANSPORT_URL")]
    transport_url_raw: String,

    /// Directory holding the persisted state file and attachment cache.
    #[arg(long, env = "CONVOY_CONFIG_DIR")]
    pub config_dir: PathBuf,

    /// Concurrency-mode threshold (SPEC_FULL §4.6): > 1 uses per-job
    /// worktrees, 1 means single-job mode against the main working copy.
    #[arg(long, env = "CONVOY_MAX_CONCURRENCY", default_value_t = 4)]
    pub max_concurrency: usize,

    /// Target number of pre-warmed worktrees kept ready by the pool.
    #[arg(long, env = "CONVOY_POOL_TARGET_SIZE", default_value_t = 2)]
    pub pool_target_size: usize,

    /// Executable name or path for the headless coding CLI.
    #[arg(long, env = "CONVOY_CLI_COMMAND", default_value = "claude")]
    pub cli_command: String,

    /// Model override passed to the CLI agent, if any.
    #[arg(long, env = "CONVOY_MODEL")]
    pub model: Option<String>,

    /// Permission mode passed to the CLI agent.
    #[arg(long, env = "CONVOY_PERMISSION_MODE", default_value = "default")]
    pub permission_mode: String,

    /// Directory to write rolling log files to. Logs go to stderr only when
    /// unset.
    #[arg(long, env = "CONVOY_LOG_DIR")]
    pub log_dir: Option<PathBuf>,
}

impl Config {
    /// Parse from `std::env::args()` plus environment variables, then
    /// validate. Fatal on an invalid combination.
    pub fn load() -> Result<Self, ConfigError> {
        let config = Self::parse();
        config.validate()?;
        Ok(config)
    }

    pub fn transport_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.transport_url_raw).map_err(ConfigError::InvalidUrl)
    }

    pub fn state_path(&self) -> PathBuf {
        self.config_dir.join("state.json")
    }

    pub fn worktree_base(&self) -> PathBuf {
        self.config_dir.join("worktrees")
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        if self.pool_target_size == 0 {
            return Err(ConfigError::ZeroPoolSize);
        }
        self.transport_url()?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
