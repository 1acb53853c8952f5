//! Message Handler: the per-message state machine driving Git prep, the
//! CLI-agent call, auto-commit, PR-footer validation, and outbound replies
//! (SPEC_FULL §4.6).

use crate::error::EngineError;
use crate::outbound::OutboundPipeline;
use crate::pool::WorktreePool;
use convoy_adapters::{AgentAdapter, GitAdapter, GitAdapterError, PullRequestState};
use convoy_core::{Clock, ConversationPayload, InboundMessage, JobId, JobMode, JobRecord, JobStatus, OutboundMessage};
use convoy_store::Store;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Ordering delay observed between enqueuing the assistant reply and the
/// git-activity system message (SPEC_FULL §9 — kept, not removed).
const GIT_ACTIVITY_DELAY: Duration = Duration::from_millis(200);

const PR_FOOTER_PREFIX: &str = "\n\n---\n_Conversation:_ ";

/// Static configuration the Handler needs at runtime, resolved once from
/// `Config` at daemon startup.
#[derive(Clone)]
pub struct HandlerConfig {
    pub worktree_base: PathBuf,
    /// Concurrency-mode threshold (SPEC_FULL §4.6): values > 1 use per-job
    /// worktrees; 1 means single-job mode against the main working copy.
    pub max_concurrency: usize,
    pub system_prompt: String,
}

/// Implements the per-message state machine described in SPEC_FULL §4.6.
pub struct MessageHandler {
    store: Arc<Store>,
    agent: Arc<dyn AgentAdapter>,
    git: Arc<dyn GitAdapter>,
    pool: Arc<WorktreePool>,
    outbound: OutboundPipeline,
    clock: Arc<dyn Clock>,
    config: HandlerConfig,
}

impl MessageHandler {
    pub fn new(
        store: Arc<Store>,
        agent: Arc<dyn AgentAdapter>,
        git: Arc<dyn GitAdapter>,
        pool: Arc<WorktreePool>,
        outbound: OutboundPipeline,
        clock: Arc<dyn Clock>,
        config: HandlerConfig,
    ) -> Self {
        Self {
            store,
            agent,
            git,
            pool,
            outbound,
            clock,
            config,
        }
    }

    pub async fn handle_message(&self, msg: InboundMessage) {
        match msg {
            InboundMessage::StartConversation { payload, .. } => {
                self.start_conversation(payload).await
            }
            InboundMessage::UserMessage { payload, .. } => self.continue_conversation(payload).await,
            InboundMessage::CheckIdleJobs { .. } => self.idle_check().await,
            InboundMessage::RefreshTokenInternal { .. } => {
                if let Err(err) = self.agent.fetch_and_refresh_tokens().await {
                    tracing::warn!(%err, "handler: token refresh failed");
                }
            }
        }
    }

    fn concurrency_mode(&self) -> bool {
        self.config.max_concurrency > 1
    }

    async fn emit_processing(&self, job_id: &JobId, processed_message_id: &str) {
        self.outbound
            .enqueue(OutboundMessage::ProcessingMessage {
                job_id: job_id.clone(),
                processed_message_id: processed_message_id.to_string(),
            })
            .await;
    }

    async fn emit_system(&self, job_id: &JobId, processed_message_id: &str, text: impl Into<String>) {
        self.outbound
            .enqueue(OutboundMessage::SystemMessage {
                job_id: job_id.clone(),
                processed_message_id: processed_message_id.to_string(),
                message: text.into(),
            })
            .await;
    }

    async fn start_conversation(&self, payload: ConversationPayload) {
        let job_id = payload.job_id.clone();
        self.emit_processing(&job_id, &payload.processed_message_id).await;

        // Duplicate delivery: a worktree already exists for this job — clean
        // it up before preparing a fresh one.
        if let Some(existing) = self.store.get_job(job_id.as_str()) {
            if existing.has_worktree() {
                let _ = self.git.remove_worktree(Path::new(&existing.worktree_path)).await;
            }
        }

        let prepared = match self.prepare_git_for_new_job(&job_id).await {
            Ok(prepared) => prepared,
            Err(err) => {
                tracing::error!(%err, job_id = %job_id, "handler: git prep failed");
                self.emit_system(&job_id, &payload.processed_message_id, format!("git setup failed: {err}"))
                    .await;
                return;
            }
        };

        if let Err(err) = self.agent.fetch_and_refresh_tokens().await {
            tracing::warn!(%err, "handler: token refresh failed before turn");
        }

        let now = self.clock.now_ms();
        let mut job = JobRecord::new(job_id.clone(), JobMode::Execute, now);
        job.branch_name = prepared.branch_name.clone();
        job.worktree_path = prepared.worktree_dir.as_ref().map(path_to_string).unwrap_or_default();
        job.last_message = payload.message.clone();
        job.processed_message_id = payload.processed_message_id.clone();
        job.message_link = payload.message_link.clone();
        if let Err(err) = self.store.update_job(job.clone()) {
            tracing::error!(%err, "handler: failed to persist job start");
            return;
        }
        let _ = self.store.remove_queued_message(&payload.processed_message_id);

        let prompt = compose_prompt(&payload.thread_history, &payload.message, &payload.attachments);

        let result = self
            .agent
            .start_new_conversation(&prompt, &self.config.system_prompt, prepared.worktree_dir.as_deref())
            .await;

        let conversation = match result {
            Ok(result) => result,
            Err(err) => {
                tracing::error!(%err, job_id = %job_id, "handler: start_new_conversation failed");
                job.status = JobStatus::Failed;
                let _ = self.store.update_job(job);
                self.emit_system(&job_id, &payload.processed_message_id, format!("agent error: {err}"))
                    .await;
                return;
            }
        };

        job.cli_session_id = conversation.session_id.clone();

        if matches!(job.mode, JobMode::Execute) {
            if let Err(err) = self
                .auto_commit(&mut job, prepared.worktree_dir.as_deref(), &payload.message_link)
                .await
            {
                tracing::warn!(%err, job_id = %job_id, "handler: auto-commit failed");
            }
        }

        self.outbound
            .enqueue(OutboundMessage::AssistantMessage {
                job_id: job_id.clone(),
                message: conversation.output,
                processed_message_id: payload.processed_message_id.clone(),
            })
            .await;

        job.status = JobStatus::Completed;
        job.updated_at_ms = self.clock.now_ms();
        let _ = self.store.update_job(job.clone());

        tokio::time::sleep(GIT_ACTIVITY_DELAY).await;
        self.emit_system(
            &job_id,
            &payload.processed_message_id,
            describe_git_activity(&job),
        )
        .await;
        self.validate_pr_footer(&job, &payload.message_link).await;
    }

    async fn continue_conversation(&self, payload: ConversationPayload) {
        let job_id = payload.job_id.clone();
        self.emit_processing(&job_id, &payload.processed_message_id).await;

        let Some(mut job) = self.store.get_job(job_id.as_str()) else {
            tracing::warn!(job_id = %job_id, "handler: continue on unknown job");
            self.emit_system(&job_id, &payload.processed_message_id, "job not found").await;
            return;
        };
        if !job.has_session() {
            self.emit_system(&job_id, &payload.processed_message_id, "job has no active session")
                .await;
            return;
        }

        let worktree_dir = job.has_worktree().then(|| PathBuf::from(&job.worktree_path));
        if let Err(err) = self.pull_latest_for_continuation(&job, worktree_dir.as_deref()).await {
            if err.is_remote_branch_deleted() {
                self.abandon_job(&job).await;
                self.emit_system(
                    &job_id,
                    &payload.processed_message_id,
                    "this job's branch was merged or removed upstream",
                )
                .await;
                return;
            }
            tracing::warn!(%err, job_id = %job_id, "handler: pull before continuation failed");
        }

        if let Err(err) = self.agent.fetch_and_refresh_tokens().await {
            tracing::warn!(%err, "handler: token refresh failed before turn");
        }

        job.last_message = payload.message.clone();
        job.processed_message_id = payload.processed_message_id.clone();
        job.status = JobStatus::InProgress;
        job.updated_at_ms = self.clock.now_ms();
        if let Err(err) = self.store.update_job(job.clone()) {
            tracing::error!(%err, "handler: failed to persist continuation");
            return;
        }
        let _ = self.store.remove_queued_message(&payload.processed_message_id);

        let prompt = compose_prompt(&[], &payload.message, &payload.attachments);
        let result = self
            .agent
            .continue_conversation(&job.cli_session_id, &prompt, worktree_dir.as_deref())
            .await;

        let conversation = match result {
            Ok(result) => result,
            Err(err) => {
                tracing::error!(%err, job_id = %job_id, "handler: continue_conversation failed");
                job.status = JobStatus::Failed;
                let _ = self.store.update_job(job);
                self.emit_system(&job_id, &payload.processed_message_id, format!("agent error: {err}"))
                    .await;
                return;
            }
        };

        if matches!(job.mode, JobMode::Execute) {
            if let Err(err) = self
                .auto_commit(&mut job, worktree_dir.as_deref(), &payload.message_link)
                .await
            {
                tracing::warn!(%err, job_id = %job_id, "handler: auto-commit failed");
            }
        }

        self.outbound
            .enqueue(OutboundMessage::AssistantMessage {
                job_id: job_id.clone(),
                message: conversation.output,
                processed_message_id: payload.processed_message_id.clone(),
            })
            .await;

        job.status = JobStatus::Completed;
        job.updated_at_ms = self.clock.now_ms();
        let _ = self.store.update_job(job.clone());

        tokio::time::sleep(GIT_ACTIVITY_DELAY).await;
        self.emit_system(&job_id, &payload.processed_message_id, describe_git_activity(&job))
            .await;
        self.validate_pr_footer(&job, &payload.message_link).await;
    }

    async fn pull_latest_for_continuation(
        &self,
        job: &JobRecord,
        worktree_dir: Option<&Path>,
    ) -> Result<(), GitAdapterError> {
        if let Some(dir) = worktree_dir {
            self.git.pull_latest(Some(dir)).await
        } else {
            self.git.checkout_branch(&job.branch_name, None).await?;
            self.git.pull_latest(None).await
        }
    }

    async fn abandon_job(&self, job: &JobRecord) {
        if job.has_worktree() {
            let _ = self.git.remove_worktree(Path::new(&job.worktree_path)).await;
        }
        let _ = self.store.remove_job(job.job_id.as_str());
    }

    async fn prepare_git_for_new_job(&self, job_id: &JobId) -> Result<PreparedGit, EngineError> {
        let target_branch = format!("job-{job_id}");

        if self.concurrency_mode() {
            match self.pool.acquire(job_id.as_str(), &target_branch).await {
                Ok(entry) => {
                    return Ok(PreparedGit {
                        branch_name: entry.branch_name,
                        worktree_dir: Some(entry.path),
                    });
                }
                Err(EngineError::PoolEmpty) => {
                    tracing::info!(job_id = %job_id, "worktree pool empty, falling back to synchronous creation");
                }
                Err(err) => return Err(err),
            }

            let default_branch = self.git.get_default_branch().await?;
            self.git.reset_hard(None).await?;
            self.git.checkout_branch(&default_branch, None).await?;
            self.git.fetch_origin().await?;
            let dir = self.config.worktree_base.join(job_id.as_str());
            self.git
                .create_worktree(&dir, &target_branch, &format!("origin/{default_branch}"))
                .await?;
            Ok(PreparedGit {
                branch_name: target_branch,
                worktree_dir: Some(dir),
            })
        } else {
            let default_branch = self.git.get_default_branch().await?;
            self.git.reset_hard(None).await?;
            self.git.clean_untracked(None).await?;
            self.git.checkout_branch(&default_branch, None).await?;
            self.git.pull_latest(None).await?;
            self.git.create_branch(&target_branch, None).await?;
            self.git.checkout_branch(&target_branch, None).await?;
            Ok(PreparedGit {
                branch_name: target_branch,
                worktree_dir: None,
            })
        }
    }

    /// Stage, commit, push, and sync the PR if there are uncommitted
    /// changes. No-ops (leaving branch/PR fields untouched) otherwise.
    async fn auto_commit(
        &self,
        job: &mut JobRecord,
        worktree_dir: Option<&Path>,
        message_link: &str,
    ) -> Result<(), EngineError> {
        if !self.git.has_uncommitted_changes(worktree_dir).await? {
            return Ok(());
        }

        let draft_prompt = format!(
            "Write a short, conventional commit message for the changes on branch `{}`.",
            job.branch_name
        );
        let commit_message = self
            .agent
            .continue_conversation(&job.cli_session_id, &draft_prompt, worktree_dir)
            .await
            .map(|r| r.output)
            .unwrap_or_else(|_| format!("Update {}", job.branch_name));

        self.git.add_all(worktree_dir).await?;
        self.git.commit(&commit_message, worktree_dir).await?;
        self.git.push_branch(&job.branch_name, worktree_dir).await?;

        let footer = render_footer(message_link);

        if self.git.has_existing_pr(&job.branch_name).await? {
            let pr = self.git.get_pr_by_branch(&job.branch_name).await?;
            job.pull_request_id = pr.id.clone();
            let title_prompt = format!("Write a short PR title for branch `{}`.", job.branch_name);
            let body_prompt = format!("Write a short PR description for branch `{}`.", job.branch_name);
            let (title, body) = tokio::join!(
                self.agent.continue_conversation(&job.cli_session_id, &title_prompt, worktree_dir),
                self.agent.continue_conversation(&job.cli_session_id, &body_prompt, worktree_dir),
            );
            if let Ok(title) = title {
                if title.output != pr.title {
                    let _ = self.git.update_pr_title(&pr.id, &title.output).await;
                }
            }
            if let Ok(body) = body {
                let new_body = format!("{}{}", strip_footer(&body.output), footer);
                if new_body != pr.description {
                    let _ = self.git.update_pr_description(&pr.id, &new_body).await;
                }
            }
        } else {
            let default_branch = self.git.get_default_branch().await?;
            let title_prompt = format!("Write a short PR title for branch `{}`.", job.branch_name);
            let template = self.git.find_pr_template().await;
            let body_prompt = match &template {
                Some(template) => format!(
                    "Write a short PR description for branch `{}`, following this template:\n{}",
                    job.branch_name, template
                ),
                None => format!("Write a short PR description for branch `{}`.", job.branch_name),
            };
            let (title, body) = tokio::join!(
                self.agent.continue_conversation(&job.cli_session_id, &title_prompt, worktree_dir),
                self.agent.continue_conversation(&job.cli_session_id, &body_prompt, worktree_dir),
            );
            let title = title.map(|r| r.output).unwrap_or_else(|_| job.branch_name.clone());
            let body = body.map(|r| r.output).unwrap_or_default();
            let pr = self
                .git
                .create_pull_request(&job.branch_name, &default_branch, &title, &format!("{}{}", body, footer))
                .await?;
            job.pull_request_id = pr.id;
        }

        Ok(())
    }

    /// After each turn: ensure the PR description carries exactly one,
    /// current footer.
    async fn validate_pr_footer(&self, job: &JobRecord, message_link: &str) {
        if !job.has_pull_request() {
            return;
        }
        let Ok(pr) = self.git.get_pr_by_id(&job.pull_request_id).await else {
            return;
        };
        let canonical_footer = render_footer(message_link);
        if pr.description.ends_with(&canonical_footer) {
            return;
        }
        let stripped = strip_footer(&pr.description);
        let new_description = format!("{stripped}{canonical_footer}");
        let _ = self.git.update_pr_description(&job.pull_request_id, &new_description).await;
    }

    async fn idle_check(&self) {
        let snapshot = self.store.snapshot();
        let now = self.clock.now_ms();
        let threshold_ms = convoy_core::JOB_STALENESS_THRESHOLD_MS;

        for (job_key, job) in snapshot.jobs.iter() {
            let (reason, should_complete) = if job.is_stale(now, threshold_ms) {
                (Some("Thread is inactive"), true)
            } else if job.has_pull_request() {
                match self.lookup_pr_state(job).await {
                    Some(PullRequestState::Merged) => (Some("Pull request was merged"), true),
                    Some(PullRequestState::Closed) => (Some("Pull request was closed"), true),
                    _ => (None, false),
                }
            } else {
                (None, false)
            };

            if should_complete {
                let reason = reason.unwrap_or("job completed");
                self.outbound
                    .enqueue(OutboundMessage::JobComplete {
                        job_id: job.job_id.clone(),
                        reason: reason.to_string(),
                    })
                    .await;
                let _ = self.store.remove_job(job_key);
            }
        }
    }

    async fn lookup_pr_state(&self, job: &JobRecord) -> Option<PullRequestState> {
        if !job.pull_request_id.is_empty() {
            self.git.get_pr_by_id(&job.pull_request_id).await.ok().map(|pr| pr.state)
        } else if !job.branch_name.is_empty() {
            self.git.get_pr_by_branch(&job.branch_name).await.ok().map(|pr| pr.state)
        } else {
            None
        }
    }
}

struct PreparedGit {
    branch_name: String,
    worktree_dir: Option<PathBuf>,
}

fn path_to_string(path: &PathBuf) -> String {
    path.to_string_lossy().into_owned()
}

fn compose_prompt(thread_history: &[String], message: &str, attachments: &[String]) -> String {
    let mut prompt = String::new();
    for entry in thread_history {
        prompt.push_str(entry);
        prompt.push('\n');
    }
    prompt.push_str(message);
    for attachment in attachments {
        prompt.push_str("\n\nAttachment: ");
        prompt.push_str(attachment);
    }
    prompt
}

fn describe_git_activity(job: &JobRecord) -> String {
    if job.branch_name.is_empty() {
        "No git activity for this turn.".to_string()
    } else if job.has_pull_request() {
        format!("Pushed to `{}` (PR #{})", job.branch_name, job.pull_request_id)
    } else {
        format!("Pushed to `{}`", job.branch_name)
    }
}

fn infer_platform(message_link: &str) -> &'static str {
    if message_link.contains("slack.com") {
        "Slack"
    } else if message_link.contains("discord.com") {
        "Discord"
    } else if message_link.contains("linear.app") {
        "Linear"
    } else {
        "the conversation platform"
    }
}

fn render_footer(message_link: &str) -> String {
    if message_link.is_empty() {
        String::new()
    } else {
        format!("{PR_FOOTER_PREFIX}[{}]({message_link})", infer_platform(message_link))
    }
}

fn strip_footer(description: &str) -> String {
    match description.find(PR_FOOTER_PREFIX.trim_end()) {
        Some(index) => description[..index].trim_end_matches('\n').to_string(),
        None => description.trim_end_matches('\n').to_string(),
    }
}

#[cfg(test)]
#[path = "handler_tests.rs"]
mod tests;
