//! Wires the adapters, store, and engine together and drives the daemon's
//! top-level event loop: inbound messages to the dispatcher, connection
//! signals to Connection State, and graceful shutdown on SIGTERM/SIGINT.

use std::sync::Arc;

use convoy_adapters::{CliAgentAdapter, CliAgentConfig, ShellGitAdapter, WebSocketTransport};
use convoy_adapters::{GitAdapter, Transport};
use convoy_core::SystemClock;
use convoy_engine::{ConnectionState, Dispatcher, HandlerConfig, MessageHandler, OutboundPipeline, WorktreePool};
use convoy_store::Store;
use thiserror::Error;
use tokio::signal::unix::{signal, SignalKind};

use crate::config::{Config, ConfigError};

/// Fatal startup or shutdown errors.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Store(#[from] convoy_store::StoreError),
    #[error("signal handler setup failed: {0}")]
    Signal(#[from] std::io::Error),
    #[error("transport channels already taken")]
    TransportChannelsTaken,
}

const SYSTEM_PROMPT: &str = "You are an autonomous coding agent collaborating over a pull request.";

/// Start every background task and block until a shutdown signal arrives.
pub async fn run(config: Config) -> Result<(), DaemonError> {
    let transport_url = config.transport_url()?;
    std::fs::create_dir_all(&config.config_dir)?;
    std::fs::create_dir_all(config.worktree_base())?;

    let store = Arc::new(Store::load(config.state_path(), &config.agent_id)?);
    let clock: Arc<dyn convoy_core::Clock> = Arc::new(SystemClock);

    let git: Arc<dyn GitAdapter> = Arc::new(ShellGitAdapter::new(config.repo_path.clone()));
    let agent = Arc::new(CliAgentAdapter::new(CliAgentConfig {
        cli_command: config.cli_command.clone(),
        model: config.model.clone(),
        permission_mode: config.permission_mode.clone(),
    }));

    let pool = WorktreePool::new(git.clone(), config.worktree_base(), config.pool_target_size);
    pool.spawn_replenisher();

    let connection = ConnectionState::new();
    let transport: Arc<dyn Transport> = Arc::new(WebSocketTransport::connect(transport_url).await);
    let outbound = OutboundPipeline::spawn(transport.clone(), connection.clone());

    let handler = Arc::new(MessageHandler::new(
        store.clone(),
        agent,
        git.clone(),
        pool,
        outbound,
        clock.clone(),
        HandlerConfig {
            worktree_base: config.worktree_base(),
            max_concurrency: config.max_concurrency,
            system_prompt: SYSTEM_PROMPT.to_string(),
        },
    ));
    let dispatcher = Dispatcher::new(handler, store.clone(), clock.clone());

    convoy_engine::run_recovery(&store, &dispatcher, &git, &clock).await;

    let mut inbound_rx = transport
        .take_inbound()
        .ok_or(DaemonError::TransportChannelsTaken)?;
    let mut signal_rx = transport
        .take_signals()
        .ok_or(DaemonError::TransportChannelsTaken)?;

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    tracing::info!("convoyd started");

    loop {
        tokio::select! {
            Some(message) = inbound_rx.recv() => {
                dispatcher.dispatch(message);
            }
            Some(sig) = signal_rx.recv() => {
                match sig {
                    convoy_adapters::ConnectionSignal::Connected => connection.set_connected(true),
                    convoy_adapters::ConnectionSignal::Disconnected => connection.set_connected(false),
                }
            }
            _ = sigterm.recv() => {
                tracing::info!("received SIGTERM, shutting down");
                break;
            }
            _ = sigint.recv() => {
                tracing::info!("received SIGINT, shutting down");
                break;
            }
            else => {
                tracing::warn!("transport channels closed, shutting down");
                break;
            }
        }
    }

    Ok(())
}
