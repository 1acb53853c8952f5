//! In-memory fake transport for deterministic testing.

use super::{ConnectionSignal, Transport, TransportError};
use async_trait::async_trait;
use convoy_core::{InboundMessage, OutboundMessage};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Recorded call to [`FakeTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCall {
    Send(OutboundMessage),
}

struct FakeTransportState {
    calls: Vec<TransportCall>,
    connected: bool,
    send_error: Option<TransportError>,
}

/// Scripted, in-memory transport. Tests push inbound envelopes and
/// connect/disconnect signals directly via [`FakeTransport::push_inbound`]
/// and [`FakeTransport::push_signal`]; sent envelopes are recorded for
/// assertions.
#[derive(Clone)]
pub struct FakeTransport {
    inner: Arc<Mutex<FakeTransportState>>,
    inbound_tx: mpsc::Sender<InboundMessage>,
    inbound_rx: Arc<Mutex<Option<mpsc::Receiver<InboundMessage>>>>,
    signal_tx: mpsc::Sender<ConnectionSignal>,
    signal_rx: Arc<Mutex<Option<mpsc::Receiver<ConnectionSignal>>>>,
}

impl Default for FakeTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeTransport {
    pub fn new() -> Self {
        let (inbound_tx, inbound_rx) = mpsc::channel(64);
        let (signal_tx, signal_rx) = mpsc::channel(16);
        Self {
            inner: Arc::new(Mutex::new(FakeTransportState {
                calls: Vec::new(),
                connected: true,
                send_error: None,
            })),
            inbound_tx,
            inbound_rx: Arc::new(Mutex::new(Some(inbound_rx))),
            signal_tx,
            signal_rx: Arc::new(Mutex::new(Some(signal_rx))),
        }
    }

    pub fn calls(&self) -> Vec<TransportCall> {
        self.inner.lock().calls.clone()
    }

    pub fn set_connected(&self, connected: bool) {
        self.inner.lock().connected = connected;
    }

    pub fn set_send_error(&self, err: TransportError) {
        self.inner.lock().send_error = Some(err);
    }

    pub async fn push_inbound(&self, message: InboundMessage) {
        let _ = self.inbound_tx.send(message).await;
    }

    pub async fn push_signal(&self, signal: ConnectionSignal) {
        let _ = self.signal_tx.send(signal).await;
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send(&self, message: &OutboundMessage) -> Result<(), TransportError> {
        let mut inner = self.inner.lock();
        inner.calls.push(TransportCall::Send(message.clone()));
        if let Some(err) = inner.send_error.clone() {
            return Err(err);
        }
        if !inner.connected {
            return Err(TransportError::Disconnected);
        }
        Ok(())
    }

    fn take_inbound(&self) -> Option<mpsc::Receiver<InboundMessage>> {
        self.inbound_rx.lock().take()
    }

    fn take_signals(&self) -> Option<mpsc::Receiver<ConnectionSignal>> {
        self.signal_rx.lock().take()
    }
}
