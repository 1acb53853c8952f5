use super::*;
use convoy_adapters::{FakeAgentAdapter, FakeGitAdapter, FakeTransport};
use convoy_core::{FakeClock, JobId, JobMode, JobStatus};
use tempfile::tempdir;
use yare::parameterized;

fn make_handler(
    max_concurrency: usize,
) -> (
    MessageHandler,
    Arc<Store>,
    Arc<FakeGitAdapter>,
    Arc<FakeAgentAdapter>,
    Arc<FakeTransport>,
    Arc<FakeClock>,
) {
    let dir = tempdir().unwrap();
    let store = Arc::new(Store::load(dir.path().join("state.json"), "agent-1").unwrap());
    let git = Arc::new(FakeGitAdapter::new());
    let agent = Arc::new(FakeAgentAdapter::new("claude"));
    let transport = Arc::new(FakeTransport::new());
    let clock = Arc::new(FakeClock::new(1_000));
    let connection = crate::connection::ConnectionState::new();
    connection.set_connected(true);
    let outbound = OutboundPipeline::spawn(transport.clone(), connection);
    let pool = WorktreePool::new(git.clone(), dir.path().join("pool"), 0);

    let handler = MessageHandler::new(
        store.clone(),
        agent.clone(),
        git.clone(),
        pool,
        outbound,
        clock.clone(),
        HandlerConfig {
            worktree_base: dir.path().join("worktrees"),
            max_concurrency,
            system_prompt: "system".into(),
        },
    );
    (handler, store, git, agent, transport, clock)
}

fn sample_payload(job_id: &str) -> ConversationPayload {
    ConversationPayload {
        job_id: JobId::new(job_id),
        message: "do the thing".into(),
        processed_message_id: "pm-1".into(),
        message_link: "https://slack.com/archives/C1/p1".into(),
        thread_history: vec![],
        attachments: vec![],
    }
}

#[tokio::test]
async fn start_conversation_persists_completed_job_with_session() {
    let (handler, store, _git, _agent, _transport, _clock) = make_handler(1);
    handler.start_conversation(sample_payload("job-1")).await;

    let job = store.get_job("job-1").unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert!(job.has_session());
    assert!(!job.branch_name.is_empty());
}

#[tokio::test]
async fn start_conversation_in_single_job_mode_uses_main_repo() {
    let (handler, _store, git, _agent, _transport, _clock) = make_handler(1);
    handler.start_conversation(sample_payload("job-1")).await;
    assert_eq!(git.worktree_count(), 0);
}

#[tokio::test]
async fn start_conversation_in_concurrency_mode_creates_worktree() {
    let (handler, store, git, _agent, _transport, _clock) = make_handler(4);
    handler.start_conversation(sample_payload("job-1")).await;
    let job = store.get_job("job-1").unwrap();
    assert!(job.has_worktree());
    assert_eq!(git.worktree_count(), 1);
}

#[tokio::test]
async fn start_conversation_marks_job_failed_on_agent_error() {
    let (handler, store, _git, agent, _transport, _clock) = make_handler(1);
    agent.set_start_error(convoy_adapters::AgentAdapterError::InvocationFailed("boom".into()));
    handler.start_conversation(sample_payload("job-1")).await;

    let job = store.get_job("job-1").unwrap();
    assert_eq!(job.status, JobStatus::Failed);
}

#[tokio::test]
async fn auto_commit_noop_when_no_uncommitted_changes() {
    let (handler, _store, git, _agent, _transport, _clock) = make_handler(1);
    git.set_uncommitted_changes(false);
    let mut job = JobRecord::new(JobId::new("job-1"), JobMode::Execute, 0);
    job.branch_name = "job-branch".into();
    job.cli_session_id = "sess-1".into();

    handler.auto_commit(&mut job, None, "https://slack.com/x").await.unwrap();
    assert!(job.pull_request_id.is_empty());
    assert!(git.calls().is_empty());
}

#[tokio::test]
async fn auto_commit_creates_pr_when_none_exists() {
    let (handler, _store, git, _agent, _transport, _clock) = make_handler(1);
    git.set_uncommitted_changes(true);
    let mut job = JobRecord::new(JobId::new("job-1"), JobMode::Execute, 0);
    job.branch_name = "job-branch".into();
    job.cli_session_id = "sess-1".into();

    handler.auto_commit(&mut job, None, "https://slack.com/x").await.unwrap();
    assert!(!job.pull_request_id.is_empty());
    assert!(git.has_existing_pr("job-branch").await.unwrap());
}

#[tokio::test]
async fn continue_conversation_on_unknown_job_sends_system_message() {
    let (handler, _store, _git, _agent, transport, _clock) = make_handler(1);
    handler.continue_conversation(sample_payload("missing-job")).await;

    let calls = transport.calls();
    assert!(calls.iter().any(|c| matches!(
        c,
        convoy_adapters::TransportCall::Send(OutboundMessage::SystemMessage { .. })
    )));
}

#[tokio::test]
async fn continue_conversation_abandons_job_on_remote_branch_deleted() {
    let (handler, store, git, _agent, _transport, clock) = make_handler(1);
    let mut job = JobRecord::new(JobId::new("job-1"), JobMode::Execute, clock.now_ms());
    job.branch_name = "job-branch".into();
    job.cli_session_id = "sess-1".into();
    store.update_job(job).unwrap();

    git.set_pull_error(convoy_adapters::GitAdapterError::PullFailed(
        "remote branch deleted".into(),
    ));

    handler.continue_conversation(sample_payload("job-1")).await;
    assert!(store.get_job("job-1").is_none());
}

#[parameterized(
    stale = { true, None, "Thread is inactive" },
    merged = { false, Some(PullRequestState::Merged), "Pull request was merged" },
    closed = { false, Some(PullRequestState::Closed), "Pull request was closed" },
)]
fn idle_check_decision_table(stale: bool, pr_state: Option<PullRequestState>, expected_reason: &str) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    runtime.block_on(async move {
        let (handler, store, git, _agent, transport, clock) = make_handler(1);
        let created_at = if stale { 0 } else { 1_000 };
        clock.set(if stale {
            convoy_core::JOB_STALENESS_THRESHOLD_MS + 10
        } else {
            1_000
        });

        let mut job = JobRecord::new(JobId::new("job-1"), JobMode::Execute, created_at);
        job.branch_name = "job-branch".into();
        if let Some(state) = pr_state {
            let pr = git
                .create_pull_request("job-branch", "main", "Title", "Body")
                .await
                .unwrap();
            job.pull_request_id = pr.id;
            git.set_pr_state("job-branch", state);
        }
        store.update_job(job).unwrap();

        handler.idle_check().await;

        assert!(store.get_job("job-1").is_none());
        let calls = transport.calls();
        assert!(calls.iter().any(|c| matches!(
            c,
            convoy_adapters::TransportCall::Send(OutboundMessage::JobComplete { reason, .. }) if reason == expected_reason
        )));
    });
}

#[tokio::test]
async fn idle_check_keeps_active_job_within_window() {
    let (handler, store, _git, _agent, _transport, clock) = make_handler(1);
    clock.set(1_000);
    let mut job = JobRecord::new(JobId::new("job-1"), JobMode::Execute, 500);
    job.branch_name = "job-branch".into();
    store.update_job(job).unwrap();

    handler.idle_check().await;
    assert!(store.get_job("job-1").is_some());
}
