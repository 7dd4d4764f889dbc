//! In-memory mesh for tests and the CLI's offline mode.
//!
//! DESIGN
//! ======
//! Every joined peer owns a bounded event queue. The mesh fans messages out
//! with `try_send` while holding its lock, so a slow consumer loses frames
//! (pointer traffic is best-effort) instead of stalling everyone else.
//!
//! The mesh emulates either shape. With per-peer channels, joining opens one
//! channel per pointer topic in both directions and `close_topic` surfaces as
//! `ChannelClosed` on the other side. With a broadcast, only join/remove and
//! messages are reported.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info};

use super::{Capabilities, POINTER_TOPICS, Transport, TransportError, TransportEvent, TransportShape};

#[cfg(test)]
#[path = "loopback_test.rs"]
mod loopback_test;

const DEFAULT_MESH_CAPACITY: usize = 256;

/// Shared in-memory mesh. Clones refer to the same mesh.
#[derive(Clone)]
pub struct LoopbackMesh {
    state: Arc<Mutex<MeshState>>,
    capabilities: Capabilities,
    capacity: usize,
}

#[derive(Default)]
struct MeshState {
    peers: BTreeMap<String, PeerSlot>,
}

struct PeerSlot {
    events: mpsc::Sender<TransportEvent>,
    closed_topics: HashSet<String>,
}

impl MeshState {
    /// Best-effort delivery to every peer except `from`.
    fn fan_out(&self, from: &str, mut make: impl FnMut() -> TransportEvent) {
        for (peer, slot) in self.peers.iter().filter(|(peer, _)| peer.as_str() != from) {
            if let Err(e) = slot.events.try_send(make()) {
                debug!(%peer, error = %e, "loopback: dropped event");
            }
        }
    }
}

impl LoopbackMesh {
    #[must_use]
    pub fn new(capabilities: Capabilities) -> Self {
        Self::with_capacity(capabilities, DEFAULT_MESH_CAPACITY)
    }

    #[must_use]
    pub fn with_capacity(capabilities: Capabilities, capacity: usize) -> Self {
        Self { state: Arc::new(Mutex::new(MeshState::default())), capabilities, capacity: capacity.max(1) }
    }

    /// Join the mesh as `peer`. Returns the outbound handle and the inbound event queue.
    pub async fn join(&self, peer: &str) -> (LoopbackTransport, mpsc::Receiver<TransportEvent>) {
        let (tx, rx) = mpsc::channel(self.capacity);
        let per_peer = self.capabilities.shape == TransportShape::PerPeerChannels;

        let mut state = self.state.lock().await;
        for (other, slot) in state.peers.iter().filter(|(other, _)| other.as_str() != peer) {
            let mut greet = vec![TransportEvent::PeerJoined { peer: peer.to_owned() }];
            let mut welcome = vec![TransportEvent::PeerJoined { peer: other.clone() }];
            if per_peer {
                for topic in POINTER_TOPICS {
                    greet.push(TransportEvent::ChannelOpened { peer: peer.to_owned(), topic: topic.to_owned() });
                    welcome.push(TransportEvent::ChannelOpened { peer: other.clone(), topic: topic.to_owned() });
                }
            }
            for event in greet {
                if let Err(e) = slot.events.try_send(event) {
                    debug!(peer = %other, error = %e, "loopback: dropped join notice");
                }
            }
            for event in welcome {
                if let Err(e) = tx.try_send(event) {
                    debug!(%peer, error = %e, "loopback: dropped join notice");
                }
            }
        }
        state.peers.insert(peer.to_owned(), PeerSlot { events: tx, closed_topics: HashSet::new() });
        drop(state);

        info!(%peer, "loopback: peer joined");
        (LoopbackTransport { mesh: self.clone(), peer: peer.to_owned() }, rx)
    }

    /// Remove `peer` and notify everyone else.
    pub async fn remove(&self, peer: &str) {
        let mut state = self.state.lock().await;
        if state.peers.remove(peer).is_none() {
            return;
        }
        state.fan_out(peer, || TransportEvent::PeerRemoved { peer: peer.to_owned() });
        info!(%peer, "loopback: peer removed");
    }

    /// Report a failure of `peer`'s `topic` channel to everyone else.
    pub async fn fail_channel(&self, peer: &str, topic: &str, error: &str) {
        let state = self.state.lock().await;
        state.fan_out(peer, || TransportEvent::ChannelError {
            peer: peer.to_owned(),
            topic: topic.to_owned(),
            error: error.to_owned(),
        });
    }

    /// Ids of joined peers, in order.
    pub async fn peers(&self) -> Vec<String> {
        self.state.lock().await.peers.keys().cloned().collect()
    }

    async fn send_from(&self, from: &str, topic: &str, payload: Vec<u8>) -> Result<(), TransportError> {
        let state = self.state.lock().await;
        let Some(slot) = state.peers.get(from) else {
            return Err(TransportError::Closed);
        };
        if slot.closed_topics.contains(topic) {
            return Err(TransportError::Closed);
        }
        state.fan_out(from, || TransportEvent::Message {
            peer: from.to_owned(),
            topic: topic.to_owned(),
            payload: payload.clone(),
        });
        Ok(())
    }

    async fn close_from(&self, from: &str, topic: &str) -> Result<(), TransportError> {
        let mut state = self.state.lock().await;
        let Some(slot) = state.peers.get_mut(from) else {
            return Err(TransportError::Closed);
        };
        if !slot.closed_topics.insert(topic.to_owned()) {
            return Ok(());
        }
        if self.capabilities.shape == TransportShape::PerPeerChannels {
            state.fan_out(from, || TransportEvent::ChannelClosed { peer: from.to_owned(), topic: topic.to_owned() });
        }
        Ok(())
    }
}

/// One peer's handle on a [`LoopbackMesh`].
pub struct LoopbackTransport {
    mesh: LoopbackMesh,
    peer: String,
}

impl LoopbackTransport {
    #[must_use]
    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// Leave the mesh; other peers observe `PeerRemoved`.
    pub async fn leave(&self) {
        self.mesh.remove(&self.peer).await;
    }
}

#[async_trait::async_trait]
impl Transport for LoopbackTransport {
    fn capabilities(&self) -> Capabilities {
        self.mesh.capabilities
    }

    async fn send_to_all(&self, topic: &str, payload: Vec<u8>) -> Result<(), TransportError> {
        self.mesh.send_from(&self.peer, topic, payload).await
    }

    async fn close_topic(&self, topic: &str) -> Result<(), TransportError> {
        self.mesh.close_from(&self.peer, topic).await
    }

    async fn shutdown(&self) -> Result<(), TransportError> {
        self.leave().await;
        Ok(())
    }
}
