//! `convoyd`: bridges a conversation platform to local CLI-agent jobs over
//! git. See `convoy_daemon::run` for the wiring.

use convoy_daemon::{setup_logging, Config};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let _log_guard = setup_logging(config.log_dir.as_deref())?;

    tracing::info!(repo = %config.repo_path.display(), "loaded configuration");

    convoy_daemon::run(config).await?;
    Ok(())
}
