//! Job Dispatcher: routes inbound messages to per-job FIFO channels,
//! deduplicates by message id, and owns the per-job processor task
//! lifecycle (SPEC_FULL §4.4).

use crate::handler::MessageHandler;
use convoy_core::{Clock, InboundMessage};
use convoy_store::Store;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Per-job channel capacity.
const JOB_CHANNEL_CAPACITY: usize = 100;
/// Dedup cache entries older than this are evicted opportunistically.
const DEDUP_TTL_MS: u64 = 5 * 60 * 1000;
/// Minimum interval between dedup-cache cleanup sweeps.
const CLEANUP_INTERVAL_MS: u64 = 5 * 60 * 1000;
/// Bounds concurrently-running jobless/recovery tasks submitted directly to
/// the worker pool.
const JOBLESS_TASK_PERMITS: usize = 64;

struct DispatcherState {
    active_jobs: HashMap<String, mpsc::Sender<InboundMessage>>,
    seen_messages: HashMap<String, u64>,
    last_cleanup_ms: u64,
}

/// Routes inbound messages to per-job processors, one worker per active job.
pub struct Dispatcher {
    state: Mutex<DispatcherState>,
    handler: Arc<MessageHandler>,
    store: Arc<Store>,
    clock: Arc<dyn Clock>,
    worker_semaphore: Arc<tokio::sync::Semaphore>,
}

impl Dispatcher {
    pub fn new(handler: Arc<MessageHandler>, store: Arc<Store>, clock: Arc<dyn Clock>) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(DispatcherState {
                active_jobs: HashMap::new(),
                seen_messages: HashMap::new(),
                last_cleanup_ms: 0,
            }),
            handler,
            store,
            clock,
            worker_semaphore: Arc::new(tokio::sync::Semaphore::new(JOBLESS_TASK_PERMITS)),
        })
    }

    /// Dispatch an inbound message per SPEC_FULL §4.4.
    pub fn dispatch(self: &Arc<Self>, msg: InboundMessage) {
        let processed_id = msg.processed_message_id().to_string();
        if !processed_id.is_empty() {
            let mut state = self.state.lock();
            let now = self.clock.now_ms();
            if now.saturating_sub(state.last_cleanup_ms) >= CLEANUP_INTERVAL_MS {
                state
                    .seen_messages
                    .retain(|_, seen_at| now.saturating_sub(*seen_at) < DEDUP_TTL_MS);
                state.last_cleanup_ms = now;
            }
            if state.seen_messages.contains_key(&processed_id) {
                tracing::debug!(id = %processed_id, "dispatcher: dropping duplicate message");
                return;
            }
            state.seen_messages.insert(processed_id, now);
        }

        let Some(job_id) = msg.job_id().map(|id| id.to_string()) else {
            self.submit_jobless(msg);
            return;
        };

        let sender = {
            let mut state = self.state.lock();
            if let Some(sender) = state.active_jobs.get(&job_id) {
                sender.clone()
            } else {
                let (tx, rx) = mpsc::channel(JOB_CHANNEL_CAPACITY);
                state.active_jobs.insert(job_id.clone(), tx.clone());
                self.spawn_processor(job_id.clone(), rx);
                tx
            }
        };

        if sender.try_send(msg).is_err() {
            tracing::warn!(job_id = %job_id, "dispatcher: job channel full or closed, dropping message");
        }
    }

    fn submit_jobless(self: &Arc<Self>, msg: InboundMessage) {
        let handler = self.handler.clone();
        let semaphore = self.worker_semaphore.clone();
        tokio::spawn(async move {
            let Ok(_permit) = semaphore.acquire_owned().await else {
                return;
            };
            handler.handle_message(msg).await;
        });
    }

    fn spawn_processor(self: &Arc<Self>, job_id: String, mut rx: mpsc::Receiver<InboundMessage>) {
        let dispatcher = self.clone();
        tokio::spawn(async move {
            while let Some(msg) = rx.recv().await {
                dispatcher.handler.handle_message(msg).await;

                let job = dispatcher.store.get_job(&job_id);
                let should_exit = match job {
                    None => true,
                    Some(job) => job.status.is_terminal() && rx.is_empty(),
                };
                if should_exit {
                    break;
                }
            }
            dispatcher.evict_job(&job_id);
        });
    }

    /// Remove and close a job's channel. Order matters: remove from the map
    /// first, then close, so a concurrent `dispatch` never observes a closed
    /// channel still present in the map.
    pub fn evict_job(&self, job_id: &str) {
        let sender = self.state.lock().active_jobs.remove(job_id);
        drop(sender);
    }

    #[cfg(any(test, feature = "test-support"))]
    pub fn active_job_count(&self) -> usize {
        self.state.lock().active_jobs.len()
    }

    #[cfg(any(test, feature = "test-support"))]
    pub fn seen_message_count(&self) -> usize {
        self.state.lock().seen_messages.len()
    }
}

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;
