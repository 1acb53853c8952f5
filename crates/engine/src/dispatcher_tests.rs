use super::*;
use crate::connection::ConnectionState;
use crate::handler::HandlerConfig;
use crate::outbound::OutboundPipeline;
use crate::pool::WorktreePool;
use async_trait::async_trait;
use convoy_adapters::{AgentAdapter, AgentAdapterError, ConversationResult, FakeAgentAdapter, FakeGitAdapter, FakeTransport};
use convoy_core::{ConversationPayload, FakeClock, JobId, JobMode, JobRecord, JobStatus};
use std::path::Path;
use std::time::Duration;
use tempfile::tempdir;

fn make_fixture(
    max_concurrency: usize,
) -> (Arc<Dispatcher>, Arc<Store>, Arc<FakeGitAdapter>, Arc<FakeAgentAdapter>, Arc<FakeClock>) {
    let dir = tempdir().unwrap();
    let store = Arc::new(Store::load(dir.path().join("state.json"), "agent-1").unwrap());
    let git = Arc::new(FakeGitAdapter::new());
    let agent = Arc::new(FakeAgentAdapter::new("claude"));
    let transport = Arc::new(FakeTransport::new());
    let clock = Arc::new(FakeClock::new(1_000));
    let connection = ConnectionState::new();
    connection.set_connected(true);
    let outbound = OutboundPipeline::spawn(transport, connection);
    let pool = WorktreePool::new(git.clone(), dir.path().join("pool"), 0);

    let handler = Arc::new(MessageHandler::new(
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
    ));
    let dispatcher = Dispatcher::new(handler, store.clone(), clock.clone());
    (dispatcher, store, git, agent, clock)
}

fn seed_job(store: &Store, job_id: &str) {
    let mut job = JobRecord::new(JobId::new(job_id), JobMode::Execute, 0);
    job.branch_name = "job-branch".into();
    job.cli_session_id = "sess-1".into();
    store.update_job(job).unwrap();
}

fn start_conversation(job_id: &str, processed_message_id: &str) -> InboundMessage {
    InboundMessage::StartConversation {
        id: format!("env-{processed_message_id}"),
        payload: ConversationPayload {
            job_id: JobId::new(job_id),
            message: "do the thing".into(),
            processed_message_id: processed_message_id.into(),
            message_link: "https://slack.com/archives/C1/p1".into(),
            thread_history: vec![],
            attachments: vec![],
        },
    }
}

fn user_message(job_id: &str, processed_message_id: &str) -> InboundMessage {
    InboundMessage::UserMessage {
        id: format!("env-{processed_message_id}"),
        payload: ConversationPayload {
            job_id: JobId::new(job_id),
            message: processed_message_id.into(),
            processed_message_id: processed_message_id.into(),
            message_link: "https://slack.com/archives/C1/p1".into(),
            thread_history: vec![],
            attachments: vec![],
        },
    }
}

/// S1 (spec.md §8): dispatching the same `processed_message_id` twice in a
/// row results in exactly one `HandleMessage` call and one dedup entry.
#[tokio::test]
async fn s1_duplicate_processed_message_id_is_handled_once() {
    let (dispatcher, _store, _git, agent, _clock) = make_fixture(1);

    dispatcher.dispatch(start_conversation("j1", "p1"));
    dispatcher.dispatch(start_conversation("j1", "p1"));
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(agent.calls().len(), 1);
    assert_eq!(dispatcher.seen_message_count(), 1);
}

/// S2 (spec.md §8): three `user_message_v1` for the same job are handled by
/// the processor in the order they were dispatched.
#[tokio::test]
async fn s2_same_job_messages_are_handled_in_order() {
    let (dispatcher, store, _git, agent, _clock) = make_fixture(1);
    seed_job(&store, "j2");

    dispatcher.dispatch(user_message("j2", "p2"));
    dispatcher.dispatch(user_message("j2", "p3"));
    dispatcher.dispatch(user_message("j2", "p4"));
    tokio::time::sleep(Duration::from_millis(150)).await;

    let prompts: Vec<String> = agent
        .calls()
        .into_iter()
        .map(|call| match call {
            convoy_adapters::AgentCall::ContinueConversation { prompt, .. } => prompt,
            other => panic!("unexpected call: {other:?}"),
        })
        .collect();
    assert_eq!(prompts, vec!["p2", "p3", "p4"]);
}

/// S3 (spec.md §8): two different jobs' processors run concurrently rather
/// than being serialized behind one lock. A two-party barrier inside the
/// agent only releases once both processors have started their call, so a
/// serialized dispatcher would deadlock and the surrounding timeout would
/// fire.
struct BarrierAgent {
    barrier: Arc<tokio::sync::Barrier>,
}

#[async_trait]
impl AgentAdapter for BarrierAgent {
    fn agent_name(&self) -> &str {
        "barrier-agent"
    }

    async fn start_new_conversation(
        &self,
        _prompt: &str,
        _system_prompt: &str,
        _dir: Option<&Path>,
    ) -> Result<ConversationResult, AgentAdapterError> {
        self.barrier.wait().await;
        Ok(ConversationResult {
            output: "ok".into(),
            session_id: "sess".into(),
        })
    }

    async fn continue_conversation(
        &self,
        session_id: &str,
        _prompt: &str,
        _dir: Option<&Path>,
    ) -> Result<ConversationResult, AgentAdapterError> {
        self.barrier.wait().await;
        Ok(ConversationResult {
            output: "ok".into(),
            session_id: session_id.to_string(),
        })
    }

    async fn fetch_and_refresh_tokens(&self) -> Result<(), AgentAdapterError> {
        Ok(())
    }
}

#[tokio::test]
async fn s3_different_jobs_are_processed_in_parallel() {
    let dir = tempdir().unwrap();
    let store = Arc::new(Store::load(dir.path().join("state.json"), "agent-1").unwrap());
    let git = Arc::new(FakeGitAdapter::new());
    let agent = Arc::new(BarrierAgent {
        barrier: Arc::new(tokio::sync::Barrier::new(2)),
    });
    let transport = Arc::new(FakeTransport::new());
    let clock = Arc::new(FakeClock::new(1_000));
    let connection = ConnectionState::new();
    connection.set_connected(true);
    let outbound = OutboundPipeline::spawn(transport, connection);
    let pool = WorktreePool::new(git.clone(), dir.path().join("pool"), 0);
    let handler = Arc::new(MessageHandler::new(
        store.clone(),
        agent,
        git,
        pool,
        outbound,
        clock.clone(),
        HandlerConfig {
            worktree_base: dir.path().join("worktrees"),
            max_concurrency: 4,
            system_prompt: "system".into(),
        },
    ));
    let dispatcher = Dispatcher::new(handler, store.clone(), clock);
    seed_job(&store, "j3");
    seed_job(&store, "j4");

    dispatcher.dispatch(user_message("j3", "p-j3"));
    dispatcher.dispatch(user_message("j4", "p-j4"));

    tokio::time::timeout(Duration::from_millis(500), async {
        loop {
            if dispatcher.active_job_count() == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("both jobs' processors should reach the barrier concurrently, not serially");
}

/// S4 (spec.md §8): once a job's status reaches a terminal state and its
/// channel is empty, the processor exits instead of lingering.
#[tokio::test]
async fn s4_processor_exits_after_status_is_terminal_and_channel_empty() {
    let (dispatcher, store, _git, _agent, _clock) = make_fixture(1);
    seed_job(&store, "j5");

    dispatcher.dispatch(user_message("j5", "p5-a"));
    dispatcher.dispatch(user_message("j5", "p5-b"));
    tokio::time::sleep(Duration::from_millis(150)).await;

    assert_eq!(dispatcher.active_job_count(), 0);
    let job = store.get_job("j5").unwrap();
    assert_eq!(job.status, JobStatus::Completed);
}

/// §4.4: `evict_job` removes the map entry before anything else can observe
/// it, so a dispatch for the same job right after eviction always creates a
/// fresh channel/processor rather than reusing a stale one.
#[tokio::test]
async fn evict_job_clears_the_map_so_the_next_dispatch_starts_fresh() {
    let (dispatcher, store, _git, agent, _clock) = make_fixture(1);
    seed_job(&store, "j-evict");

    dispatcher.dispatch(user_message("j-evict", "p-1"));
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(dispatcher.active_job_count(), 0, "processor exits once its job completes");

    dispatcher.evict_job("j-evict");
    assert_eq!(dispatcher.active_job_count(), 0);

    dispatcher.dispatch(user_message("j-evict", "p-2"));
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(agent.calls().len(), 2, "second dispatch spawned a fresh processor");
}
