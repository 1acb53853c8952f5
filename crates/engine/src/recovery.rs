//! Recovery Procedure: re-drives in-progress jobs and queued messages onto
//! the dispatcher after a restart, skipping stale or invalid items
//! (SPEC_FULL §4.7).

use crate::dispatcher::Dispatcher;
use convoy_adapters::GitAdapter;
use convoy_core::{
    Clock, ConversationPayload, InboundMessage, JobRecord, JobStatus, JOB_STALENESS_THRESHOLD_MS,
    QueuedMessage, QueuedMessageType,
};
use convoy_store::Store;
use std::path::Path;
use std::sync::Arc;

/// Runs both recovery phases and logs how many items were re-injected vs.
/// dropped. Must be called once at startup, after the connection is
/// established and before the transport read loop starts dispatching live
/// traffic.
pub async fn run_recovery(store: &Store, dispatcher: &Arc<Dispatcher>, git: &Arc<dyn GitAdapter>, clock: &Arc<dyn Clock>) {
    let now = clock.now_ms();
    let snapshot = store.snapshot();

    let (resubmitted, dropped) = recover_jobs(store, dispatcher, git, &snapshot.jobs, now).await;
    tracing::info!(resubmitted, dropped, "recovery: phase 1 (in-progress jobs) complete");

    let (resubmitted, dropped) = recover_queued_messages(store, dispatcher, &snapshot, now).await;
    tracing::info!(resubmitted, dropped, "recovery: phase 2 (queued messages) complete");
}

async fn recover_jobs(
    store: &Store,
    dispatcher: &Arc<Dispatcher>,
    git: &Arc<dyn GitAdapter>,
    jobs: &std::collections::HashMap<String, JobRecord>,
    now: u64,
) -> (usize, usize) {
    let mut resubmitted = 0;
    let mut dropped = 0;

    for job in jobs.values() {
        if !matches!(job.status, JobStatus::InProgress) {
            continue;
        }

        if job.is_stale(now, JOB_STALENESS_THRESHOLD_MS) {
            tracing::info!(job_id = %job.job_id, "recovery: dropping stale in-progress job");
            abandon(store, git, job).await;
            dropped += 1;
            continue;
        }

        if job.has_worktree() && !git.worktree_is_valid(Path::new(&job.worktree_path)).await {
            tracing::warn!(job_id = %job.job_id, "recovery: worktree missing, dropping job");
            let _ = store.remove_job(job.job_id.as_str());
            dropped += 1;
            continue;
        }

        if !job.branch_name.is_empty() && !git.branch_exists(&job.branch_name).await {
            tracing::warn!(job_id = %job.job_id, "recovery: branch gone, dropping job");
            abandon(store, git, job).await;
            dropped += 1;
            continue;
        }

        dispatcher.dispatch(synthesize(job));
        resubmitted += 1;
    }

    (resubmitted, dropped)
}

async fn recover_queued_messages(
    store: &Store,
    dispatcher: &Arc<Dispatcher>,
    snapshot: &convoy_core::PersistedState,
    now: u64,
) -> (usize, usize) {
    let mut resubmitted = 0;
    let mut dropped = 0;

    let mut queued: Vec<&QueuedMessage> = snapshot.queued_messages.values().collect();
    queued.sort_by_key(|m| m.queued_at_ms);

    for message in queued {
        let already_in_flight = snapshot
            .jobs
            .get(message.job_id.as_str())
            .is_some_and(|job| job.processed_message_id == message.processed_message_id);
        if already_in_flight {
            let _ = store.remove_queued_message(&message.processed_message_id);
            dropped += 1;
            continue;
        }

        if message.is_stale(now, JOB_STALENESS_THRESHOLD_MS) {
            tracing::info!(id = %message.processed_message_id, "recovery: dropping stale queued message");
            let _ = store.remove_queued_message(&message.processed_message_id);
            dropped += 1;
            continue;
        }

        dispatcher.dispatch(synthesize_from_queued(message));
        resubmitted += 1;
    }

    (resubmitted, dropped)
}

async fn abandon(store: &Store, git: &Arc<dyn GitAdapter>, job: &JobRecord) {
    if job.has_worktree() {
        let _ = git.remove_worktree(Path::new(&job.worktree_path)).await;
    }
    let _ = store.remove_job(job.job_id.as_str());
}

fn synthesize(job: &JobRecord) -> InboundMessage {
    let payload = ConversationPayload {
        job_id: job.job_id.clone(),
        message: job.last_message.clone(),
        processed_message_id: job.processed_message_id.clone(),
        message_link: job.message_link.clone(),
        thread_history: Vec::new(),
        attachments: Vec::new(),
    };
    let id = format!("recovery-job-{}", job.job_id);
    if job.has_session() {
        InboundMessage::UserMessage { id, payload }
    } else {
        InboundMessage::StartConversation { id, payload }
    }
}

fn synthesize_from_queued(message: &QueuedMessage) -> InboundMessage {
    let payload = ConversationPayload {
        job_id: message.job_id.clone(),
        message: message.message.clone(),
        processed_message_id: message.processed_message_id.clone(),
        message_link: message.message_link.clone(),
        thread_history: Vec::new(),
        attachments: Vec::new(),
    };
    let id = format!("recovery-queued-{}", message.processed_message_id);
    match message.message_type {
        QueuedMessageType::StartConversation => InboundMessage::StartConversation { id, payload },
        QueuedMessageType::UserMessage => InboundMessage::UserMessage { id, payload },
    }
}

#[cfg(test)]
#[path = "recovery_tests.rs"]
mod tests;
