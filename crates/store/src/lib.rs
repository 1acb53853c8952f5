// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Persistent State Store: the durable mapping of job records and queued
//! messages, written atomically to a single state file.

mod error;
mod store;

pub use error::StoreError;
pub use store::Store;
