// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! convoy-core: data model for the job execution runtime.

pub mod clock;
pub mod error;
pub mod id;
pub mod job;
pub mod message;
pub mod queued_message;
pub mod state;
pub mod worktree;

pub use clock::{Clock, FakeClock, SystemClock};
pub use error::DomainError;
pub use id::{IdGen, SequentialIdGen, ShortId, UuidIdGen};
pub use job::{JobId, JobMode, JobRecord, JobStatus, JOB_STALENESS_THRESHOLD_MS};
pub use message::{ConversationPayload, EmptyPayload, InboundMessage, OutboundMessage};
pub use queued_message::{QueuedMessage, QueuedMessageType};
pub use state::PersistedState;
pub use worktree::{PooledWorktree, POOL_BRANCH_PREFIX};
