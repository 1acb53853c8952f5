#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! convoy-daemon: the process entrypoint wiring adapters, the store, and the
//! engine into a running job execution runtime (`convoyd`).

mod config;
mod logging;
mod run;

pub use config::{Config, ConfigError};
pub use logging::setup_logging;
pub use run::{run, DaemonError};
