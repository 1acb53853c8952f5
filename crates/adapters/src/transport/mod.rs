//! Transport adapter: a bidirectional WebSocket connection to the
//! conversation platform (SPEC_FULL §6). The engine only ever sees
//! this trait — connect/disconnect signals and inbound/outbound
//! envelopes — never the socket itself.

#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeTransport, TransportCall};

mod websocket;
pub use websocket::WebSocketTransport;

use async_trait::async_trait;
use convoy_core::{InboundMessage, OutboundMessage};
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors raised by a [`Transport`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("transport is disconnected")]
    Disconnected,
    #[error("send failed: {0}")]
    SendFailed(String),
    #[error("encode failed: {0}")]
    EncodeFailed(String),
}

/// Signal raised by a transport's background connection-management task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionSignal {
    Connected,
    Disconnected,
}

/// A bidirectional message channel to the conversation platform.
///
/// Implementations own reconnection policy entirely; the only thing they
/// surface to callers is the current up/down state via `signal_rx` and
/// whatever inbound envelopes arrive on `inbound_rx`.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Send a single outbound envelope. Returns
    /// [`TransportError::Disconnected`] if the socket is currently down;
    /// callers (the Outbound Pipeline) are responsible for retry/backoff.
    async fn send(&self, message: &OutboundMessage) -> Result<(), TransportError>;

    /// Take the channel of decoded inbound envelopes fed by the transport's
    /// background read loop. `None` if already taken — there is exactly one
    /// consumer (the Dispatcher) per transport instance.
    fn take_inbound(&self) -> Option<mpsc::Receiver<InboundMessage>>;

    /// Take the channel of connect/disconnect signals driving Connection
    /// State. `None` if already taken.
    fn take_signals(&self) -> Option<mpsc::Receiver<ConnectionSignal>>;
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
