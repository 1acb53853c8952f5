//! WebSocket-backed `Transport`: connects to the conversation platform,
//! translates frames to/from `InboundMessage`/`OutboundMessage`, and
//! reconnects on its own schedule, raising [`ConnectionSignal`]s as it does.

use super::{ConnectionSignal, Transport, TransportError};
use async_trait::async_trait;
use convoy_core::{InboundMessage, OutboundMessage};
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use url::Url;

const RECONNECT_DELAY: Duration = Duration::from_secs(2);

struct WriteHalf {
    sink: Option<
        futures_util::stream::SplitSink<
            tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>,
            Message,
        >,
    >,
}

/// Transport backed by a real WebSocket connection to `url`.
pub struct WebSocketTransport {
    write: Arc<Mutex<WriteHalf>>,
    inbound_rx: Mutex<Option<mpsc::Receiver<InboundMessage>>>,
    signal_rx: Mutex<Option<mpsc::Receiver<ConnectionSignal>>>,
}

impl WebSocketTransport {
    /// Connect to `url` and spawn the background reconnect-and-read loop.
    pub async fn connect(url: Url) -> Self {
        let (inbound_tx, inbound_rx) = mpsc::channel(64);
        let (signal_tx, signal_rx) = mpsc::channel(16);
        let write = Arc::new(Mutex::new(WriteHalf { sink: None }));

        tokio::spawn(connection_loop(url, write.clone(), inbound_tx, signal_tx));

        Self {
            write,
            inbound_rx: Mutex::new(Some(inbound_rx)),
            signal_rx: Mutex::new(Some(signal_rx)),
        }
    }
}

async fn connection_loop(
    url: Url,
    write: Arc<Mutex<WriteHalf>>,
    inbound_tx: mpsc::Sender<InboundMessage>,
    signal_tx: mpsc::Sender<ConnectionSignal>,
) {
    loop {
        match tokio_tungstenite::connect_async(url.as_str()).await {
            Ok((stream, _)) => {
                tracing::info!(%url, "transport connected");
                let _ = signal_tx.send(ConnectionSignal::Connected).await;
                let (sink, mut read) = stream.split();
                write.lock().sink = Some(sink);

                loop {
                    match read.next().await {
                        Some(Ok(Message::Text(text))) => {
                            match serde_json::from_str::<InboundMessage>(&text) {
                                Ok(msg) => {
                                    if inbound_tx.send(msg).await.is_err() {
                                        return;
                                    }
                                }
                                Err(err) => {
                                    tracing::warn!(%err, "transport: undecodable inbound frame");
                                }
                            }
                        }
                        Some(Ok(Message::Close(_))) | None => {
                            tracing::info!(%url, "transport: connection closed");
                            break;
                        }
                        Some(Err(err)) => {
                            tracing::warn!(%err, "transport: read error");
                            break;
                        }
                        _ => {}
                    }
                }
            }
            Err(err) => {
                tracing::warn!(%url, %err, "transport: connect failed");
            }
        }

        write.lock().sink = None;
        let _ = signal_tx.send(ConnectionSignal::Disconnected).await;
        tokio::time::sleep(RECONNECT_DELAY).await;
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn send(&self, message: &OutboundMessage) -> Result<(), TransportError> {
        let text = serde_json::to_string(message)
            .map_err(|err| TransportError::EncodeFailed(err.to_string()))?;

        let sink = {
            let mut guard = self.write.lock();
            guard.sink.take()
        };
        let Some(mut sink) = sink else {
            return Err(TransportError::Disconnected);
        };

        let result = sink.send(Message::Text(text.into())).await;
        self.write.lock().sink = Some(sink);
        result.map_err(|err| TransportError::SendFailed(err.to_string()))
    }

    fn take_inbound(&self) -> Option<mpsc::Receiver<InboundMessage>> {
        self.inbound_rx.lock().take()
    }

    fn take_signals(&self) -> Option<mpsc::Receiver<ConnectionSignal>> {
        self.signal_rx.lock().take()
    }
}
