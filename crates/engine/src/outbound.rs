//! Outbound Pipeline: single-consumer queue draining to the transport, with
//! exponential-backoff retry on emit failure (SPEC_FULL §4.2).

use crate::connection::ConnectionState;
use convoy_adapters::Transport;
use convoy_core::OutboundMessage;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const BACKOFF_MULTIPLIER: u32 = 2;
const MAX_BACKOFF: Duration = Duration::from_secs(4);
const RETRY_BUDGET: Duration = Duration::from_secs(10);

/// Default outbound queue capacity: 1, so `enqueue` backpressures the
/// producer until the prior reply has been consumed by the sender.
pub const OUTBOUND_QUEUE_CAPACITY: usize = 1;

/// Producer handle for the Outbound Pipeline. Cloning shares the same
/// underlying queue.
#[derive(Clone)]
pub struct OutboundPipeline {
    tx: mpsc::Sender<OutboundMessage>,
}

impl OutboundPipeline {
    /// Spawn the single consumer task and return the producer handle.
    pub fn spawn(transport: Arc<dyn Transport>, connection: ConnectionState) -> Self {
        let (tx, rx) = mpsc::channel(OUTBOUND_QUEUE_CAPACITY);
        tokio::spawn(run_consumer(rx, transport, connection));
        Self { tx }
    }

    /// Enqueue a message for delivery, blocking the caller (backpressure)
    /// until the queue has room.
    pub async fn enqueue(&self, message: OutboundMessage) {
        if self.tx.send(message).await.is_err() {
            tracing::warn!("outbound pipeline consumer gone, dropping message");
        }
    }
}

async fn run_consumer(
    mut rx: mpsc::Receiver<OutboundMessage>,
    transport: Arc<dyn Transport>,
    connection: ConnectionState,
) {
    while let Some(message) = rx.recv().await {
        connection.wait_for_connection().await;
        send_with_backoff(&*transport, &message).await;
    }
}

async fn send_with_backoff(transport: &dyn Transport, message: &OutboundMessage) {
    let mut delay = INITIAL_BACKOFF;
    let mut elapsed = Duration::ZERO;

    loop {
        match transport.send(message).await {
            Ok(()) => return,
            Err(err) => {
                if elapsed >= RETRY_BUDGET {
                    tracing::error!(%err, job_id = %message.job_id(), "outbound send exhausted retry budget, dropping");
                    return;
                }
                tracing::warn!(%err, ?delay, "outbound send failed, retrying");
                tokio::time::sleep(delay).await;
                elapsed += delay;
                delay = (delay * BACKOFF_MULTIPLIER).min(MAX_BACKOFF);
            }
        }
    }
}

#[cfg(test)]
#[path = "outbound_tests.rs"]
mod tests;
