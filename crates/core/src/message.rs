//! Wire envelopes exchanged with the transport (SPEC_FULL §6).

use crate::job::JobId;
use serde::{Deserialize, Serialize};

/// Payload carried by a `start_conversation_v1` / `user_message_v1` message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationPayload {
    pub job_id: JobId,
    pub message: String,
    #[serde(default)]
    pub processed_message_id: String,
    #[serde(default)]
    pub message_link: String,
    /// Prior thread history to prepend, oldest first (start-conversation only).
    #[serde(default)]
    pub thread_history: Vec<String>,
    /// Attachment references to append to the prompt.
    #[serde(default)]
    pub attachments: Vec<String>,
}

/// `check_idle_jobs_v1` and `refresh_token_internal_v1` carry no payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct EmptyPayload {}

/// An inbound message as consumed from the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum InboundMessage {
    #[serde(rename = "start_conversation_v1")]
    StartConversation {
        id: String,
        payload: ConversationPayload,
    },
    #[serde(rename = "user_message_v1")]
    UserMessage {
        id: String,
        payload: ConversationPayload,
    },
    #[serde(rename = "check_idle_jobs_v1")]
    CheckIdleJobs {
        id: String,
        #[serde(default)]
        payload: EmptyPayload,
    },
    #[serde(rename = "refresh_token_internal_v1")]
    RefreshTokenInternal {
        id: String,
        #[serde(default)]
        payload: EmptyPayload,
    },
}

impl InboundMessage {
    pub fn id(&self) -> &str {
        match self {
            InboundMessage::StartConversation { id, .. }
            | InboundMessage::UserMessage { id, .. }
            | InboundMessage::CheckIdleJobs { id, .. }
            | InboundMessage::RefreshTokenInternal { id, .. } => id,
        }
    }

    /// The `processed_message_id` used for dispatcher deduplication, empty
    /// for message types that don't carry one.
    pub fn processed_message_id(&self) -> &str {
        match self {
            InboundMessage::StartConversation { payload, .. }
            | InboundMessage::UserMessage { payload, .. } => &payload.processed_message_id,
            InboundMessage::CheckIdleJobs { .. } | InboundMessage::RefreshTokenInternal { .. } => "",
        }
    }

    /// The `job_id` used for per-job dispatcher routing, `None` for
    /// jobless message types (§4.4 step 2).
    pub fn job_id(&self) -> Option<&JobId> {
        match self {
            InboundMessage::StartConversation { payload, .. }
            | InboundMessage::UserMessage { payload, .. } => Some(&payload.job_id),
            InboundMessage::CheckIdleJobs { .. } | InboundMessage::RefreshTokenInternal { .. } => None,
        }
    }
}

/// An outbound message produced to the transport on channel `cc_message`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OutboundMessage {
    #[serde(rename = "assistant_message_v1")]
    AssistantMessage {
        job_id: JobId,
        message: String,
        processed_message_id: String,
    },
    #[serde(rename = "system_message_v1")]
    SystemMessage {
        job_id: JobId,
        processed_message_id: String,
        message: String,
    },
    #[serde(rename = "processing_message_v1")]
    ProcessingMessage {
        job_id: JobId,
        processed_message_id: String,
    },
    #[serde(rename = "job_complete_v1")]
    JobComplete { job_id: JobId, reason: String },
}

impl OutboundMessage {
    pub fn job_id(&self) -> &JobId {
        match self {
            OutboundMessage::AssistantMessage { job_id, .. }
            | OutboundMessage::SystemMessage { job_id, .. }
            | OutboundMessage::ProcessingMessage { job_id, .. }
            | OutboundMessage::JobComplete { job_id, .. } => job_id,
        }
    }
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
