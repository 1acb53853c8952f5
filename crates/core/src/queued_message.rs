//! Queued messages: inserted before processing begins so a crash between
//! arrival and completion can be recovered by re-injection (SPEC_FULL §3,
//! §4.7).

use crate::job::JobId;
use serde::{Deserialize, Serialize};

/// What kind of turn a queued message should synthesize on recovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueuedMessageType {
    StartConversation,
    UserMessage,
}

/// A message recorded durably before the Handler commits to processing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedMessage {
    pub processed_message_id: String,
    pub job_id: JobId,
    pub message_type: QueuedMessageType,
    pub message: String,
    #[serde(default)]
    pub message_link: String,
    pub queued_at_ms: u64,
}

impl QueuedMessage {
    pub fn is_stale(&self, now_ms: u64, threshold_ms: u64) -> bool {
        now_ms.saturating_sub(self.queued_at_ms) > threshold_ms
    }
}

#[cfg(test)]
#[path = "queued_message_tests.rs"]
mod tests;
