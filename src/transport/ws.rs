//! WebSocket relay transport (broadcast shape).
//!
//! DESIGN
//! ======
//! A background task owns the socket and runs a `select!` loop: queued
//! outbound frames → relay, relay frames → [`TransportEvent`]s. The task is
//! owned by [`WsRelayTransport`].
//!
//! Every frame on the socket is a JSON envelope tagged by `type`:
//!
//! | Direction | Envelope |
//! |-----------|----------|
//! | out | `{"type":"join","peer":…}` once per connection |
//! | out | `{"type":"publish","topic":…,"payload":…}` |
//! | in  | `{"type":"message","from":…,"topic":…,"payload":…}` |
//! | in  | `{"type":"peer_joined","peer":…}` / `{"type":"peer_removed","peer":…}` |
//!
//! The relay excludes the sender from its own fan-out.
//!
//! LIFECYCLE
//! =========
//! [`Transport::shutdown`] (or dropping the transport) closes the outbound
//! queue. The task then sends whatever is still queued, closes the socket
//! with a handshake, and exits. Abort is only the fallback when that takes
//! longer than [`SHUTDOWN_GRACE`].
//!
//! ERROR HANDLING
//! ==============
//! Sends never block the caller: the outbound queue is bounded and a full
//! queue is reported as a send error, which the session drops like any lost
//! pointer frame. A lost connection is reported once as
//! [`TransportEvent::Reset`], then the task reconnects with jittered
//! exponential back-off. Peers that stayed on the relay reappear with their
//! next frame.

use std::collections::HashSet;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use super::{Capabilities, Transport, TransportError, TransportEvent};
use crate::config::RelayConfig;

#[cfg(test)]
#[path = "ws_test.rs"]
mod ws_test;

/// How long shutdown waits for queued frames to flush before aborting.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

type WsStream = tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// JSON envelope exchanged with the relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RelayFrame {
    Join { peer: String },
    Publish { topic: String, payload: String },
    Message { from: String, topic: String, payload: String },
    PeerJoined { peer: String },
    PeerRemoved { peer: String },
}

/// Broadcast transport over a WebSocket relay.
pub struct WsRelayTransport {
    outbound: Mutex<Option<mpsc::Sender<RelayFrame>>>,
    closed_topics: Mutex<HashSet<String>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl WsRelayTransport {
    /// Spawn the connection task. Returns the transport and its inbound event queue.
    #[must_use]
    pub fn connect(config: RelayConfig) -> (Self, mpsc::Receiver<TransportEvent>) {
        let (outbound_tx, outbound_rx) = mpsc::channel(config.queue_capacity);
        let (events_tx, events_rx) = mpsc::channel(config.queue_capacity);
        let task = tokio::spawn(run_relay(config, outbound_rx, events_tx));
        let transport = Self {
            outbound: Mutex::new(Some(outbound_tx)),
            closed_topics: Mutex::new(HashSet::new()),
            task: Mutex::new(Some(task)),
        };
        (transport, events_rx)
    }
}

impl Drop for WsRelayTransport {
    fn drop(&mut self) {
        // The outbound sender drops with `self`, which starts the flush.
        let Some(task) = self.task.get_mut().take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(finish(task));
            }
            Err(_) => task.abort(),
        }
    }
}

/// Wait for the relay task to flush and exit, aborting it after the grace period.
async fn finish(mut task: JoinHandle<()>) {
    match tokio::time::timeout(SHUTDOWN_GRACE, &mut task).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => debug!(error = %e, "relay: task ended abnormally"),
        Err(_) => {
            warn!("relay: flush timed out; aborting");
            task.abort();
        }
    }
}

#[async_trait::async_trait]
impl Transport for WsRelayTransport {
    fn capabilities(&self) -> Capabilities {
        Capabilities::broadcast()
    }

    async fn send_to_all(&self, topic: &str, payload: Vec<u8>) -> Result<(), TransportError> {
        if self.closed_topics.lock().await.contains(topic) {
            return Err(TransportError::Closed);
        }
        let payload = String::from_utf8(payload).map_err(|e| TransportError::Send(e.to_string()))?;
        let frame = RelayFrame::Publish { topic: topic.to_owned(), payload };
        let outbound = self.outbound.lock().await;
        let Some(outbound) = outbound.as_ref() else {
            return Err(TransportError::Closed);
        };
        outbound.try_send(frame).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => TransportError::Send("outbound queue full".into()),
            mpsc::error::TrySendError::Closed(_) => TransportError::Closed,
        })
    }

    async fn close_topic(&self, topic: &str) -> Result<(), TransportError> {
        if self.outbound.lock().await.as_ref().is_none_or(mpsc::Sender::is_closed) {
            return Err(TransportError::Closed);
        }
        self.closed_topics.lock().await.insert(topic.to_owned());
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), TransportError> {
        if self.outbound.lock().await.take().is_none() {
            return Err(TransportError::Closed);
        }
        if let Some(task) = self.task.lock().await.take() {
            finish(task).await;
        }
        info!("relay: shut down");
        Ok(())
    }
}

// =============================================================================
// CONNECTION LOOP
// =============================================================================

enum SessionEnd {
    Shutdown,
    Disconnected(String),
}

async fn run_relay(
    config: RelayConfig,
    mut outbound_rx: mpsc::Receiver<RelayFrame>,
    events_tx: mpsc::Sender<TransportEvent>,
) {
    let mut backoff_ms = config.reconnect_base_ms;
    let mut reconnecting = false;

    loop {
        info!(url = %config.url, peer = %config.peer_id, "relay: connecting");

        match connect_async(config.url.as_str()).await {
            Ok((ws, _)) => {
                backoff_ms = config.reconnect_base_ms;
                // Frames queued while offline are stale by now.
                if reconnecting && !outbound_rx.is_closed() {
                    while outbound_rx.try_recv().is_ok() {}
                }

                match relay_session(ws, &config, &mut outbound_rx, &events_tx).await {
                    SessionEnd::Shutdown => {
                        info!("relay: closed");
                        return;
                    }
                    SessionEnd::Disconnected(reason) => {
                        warn!(%reason, "relay: connection lost");
                        if events_tx.send(TransportEvent::Reset).await.is_err() {
                            return;
                        }
                    }
                }
            }
            Err(e) => warn!(error = %e, "relay: connect failed"),
        }

        if events_tx.is_closed() || outbound_rx.is_closed() {
            return;
        }
        reconnecting = true;
        let delay_ms = jittered(backoff_ms);
        debug!(delay_ms, "relay: reconnecting after delay");
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        backoff_ms = backoff_ms.saturating_mul(2).min(config.reconnect_max_ms);
    }
}

async fn relay_session(
    ws: WsStream,
    config: &RelayConfig,
    outbound_rx: &mut mpsc::Receiver<RelayFrame>,
    events_tx: &mpsc::Sender<TransportEvent>,
) -> SessionEnd {
    let (mut sink, mut stream) = ws.split();

    let join = RelayFrame::Join { peer: config.peer_id.clone() };
    if let Err(reason) = send_frame(&mut sink, &join).await {
        return SessionEnd::Disconnected(reason);
    }
    info!(peer = %config.peer_id, "relay: joined");

    loop {
        tokio::select! {
            frame = outbound_rx.recv() => {
                let Some(frame) = frame else {
                    if let Err(e) = sink.close().await {
                        debug!(error = %e, "relay: close failed");
                    }
                    return SessionEnd::Shutdown;
                };
                if let Err(reason) = send_frame(&mut sink, &frame).await {
                    return SessionEnd::Disconnected(reason);
                }
            }
            msg = stream.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let Some(event) = inbound_event(&text, &config.peer_id) else {
                            continue;
                        };
                        if events_tx.send(event).await.is_err() {
                            return SessionEnd::Shutdown;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => return SessionEnd::Disconnected("closed by relay".into()),
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return SessionEnd::Disconnected(e.to_string()),
                }
            }
        }
    }
}

async fn send_frame<S>(sink: &mut S, frame: &RelayFrame) -> Result<(), String>
where
    S: futures_util::Sink<Message> + Unpin,
    S::Error: std::fmt::Display,
{
    let json = serde_json::to_string(frame).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json.into())).await.map_err(|e| e.to_string())
}

/// Translate one relay envelope into a transport event.
fn inbound_event(text: &str, own_peer: &str) -> Option<TransportEvent> {
    let frame: RelayFrame = match serde_json::from_str(text) {
        Ok(frame) => frame,
        Err(e) => {
            debug!(error = %e, "relay: dropping malformed envelope");
            return None;
        }
    };
    match frame {
        RelayFrame::Message { from, .. } if from == own_peer => None,
        RelayFrame::Message { from, topic, payload } => {
            Some(TransportEvent::Message { peer: from, topic, payload: payload.into_bytes() })
        }
        RelayFrame::PeerJoined { peer } if peer == own_peer => None,
        RelayFrame::PeerJoined { peer } => Some(TransportEvent::PeerJoined { peer }),
        RelayFrame::PeerRemoved { peer } => Some(TransportEvent::PeerRemoved { peer }),
        RelayFrame::Join { .. } | RelayFrame::Publish { .. } => {
            debug!("relay: ignoring client-side envelope");
            None
        }
    }
}

/// Back-off delay plus up to 50% random jitter.
fn jittered(base_ms: u64) -> u64 {
    base_ms.saturating_add(rand::rng().random_range(0..=base_ms / 2))
}
