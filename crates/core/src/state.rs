//! The persisted document shape written atomically by the store (SPEC_FULL
//! §3, §4.3, §6).

use crate::job::JobRecord;
use crate::queued_message::QueuedMessage;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Tuple `(agent_id, jobs, queued_messages)` serialized as the state file.
///
/// Jobs and queued messages are keyed by plain `String` (the job id / the
/// processed message id) rather than by the newtype id types, since
/// `serde_json` map keys must serialize directly to strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PersistedState {
    pub agent_id: String,
    #[serde(default)]
    pub jobs: HashMap<String, JobRecord>,
    #[serde(default)]
    pub queued_messages: HashMap<String, QueuedMessage>,
}

impl PersistedState {
    pub fn fresh(agent_id: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            jobs: HashMap::new(),
            queued_messages: HashMap::new(),
        }
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
