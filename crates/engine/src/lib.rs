// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! convoy-engine: the job execution runtime — connection state, the
//! outbound pipeline, the job dispatcher, the working-tree pool, the
//! message handler, and startup recovery.

pub mod connection;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod outbound;
pub mod pool;
pub mod recovery;

pub use connection::ConnectionState;
pub use dispatcher::Dispatcher;
pub use error::EngineError;
pub use handler::{HandlerConfig, MessageHandler};
pub use outbound::OutboundPipeline;
pub use pool::WorktreePool;
pub use recovery::run_recovery;
