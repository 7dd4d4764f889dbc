//! Transport adapter: what the pointer session needs from the real-time mesh.
//!
//! ARCHITECTURE
//! ============
//! Two mesh shapes exist in the wild:
//!
//! - per-peer channels, one per topic, which multiplex by topic and can carry
//!   keyed records (text, or bytes only on some stacks);
//! - a shared broadcast with sender exclusion, where every frame is one
//!   untagged payload and pipe frames keep the bytes down.
//!
//! A [`Transport`] reports its shape once through [`Capabilities`]; the
//! session derives a [`WireFormat`] from it and never asks again. Outbound
//! traffic goes through the trait; inbound notifications arrive as
//! [`TransportEvent`]s on a tokio channel handed out when the transport is
//! created.

pub mod loopback;
pub mod registry;
pub mod ws;

use frames::{TOPIC_CLICK, TOPIC_IDENTITY, TOPIC_POINTER, WireFormat};
use overlay::pointers::PeerId;

pub use loopback::{LoopbackMesh, LoopbackTransport};
pub use registry::ChannelRegistry;
pub use ws::WsRelayTransport;


/// Every topic the pointer overlay uses. Per-peer meshes open one channel per topic.
pub const POINTER_TOPICS: [&str; 3] = [TOPIC_POINTER, TOPIC_CLICK, TOPIC_IDENTITY];

/// How a transport fans messages out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportShape {
    /// One channel per peer and topic, with open/close/error lifecycle.
    PerPeerChannels,
    /// One shared broadcast; the sender is excluded from its own fan-out.
    Broadcast,
}

/// Capabilities a transport reports once, at session start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub shape: TransportShape,
    /// Channels accept raw bytes only, not text.
    pub binary_only: bool,
}

impl Capabilities {
    #[must_use]
    pub fn per_peer(binary_only: bool) -> Self {
        Self { shape: TransportShape::PerPeerChannels, binary_only }
    }

    #[must_use]
    pub fn broadcast() -> Self {
        Self { shape: TransportShape::Broadcast, binary_only: false }
    }

    /// Wire format negotiated from these capabilities.
    #[must_use]
    pub fn wire_format(&self) -> WireFormat {
        match (self.shape, self.binary_only) {
            (TransportShape::PerPeerChannels, false) => WireFormat::Keyed,
            (TransportShape::PerPeerChannels, true) => WireFormat::KeyedBinary,
            (TransportShape::Broadcast, _) => WireFormat::Pipe,
        }
    }
}

/// Inbound notification from the mesh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A peer joined the mesh.
    PeerJoined { peer: PeerId },
    /// A per-peer channel for `topic` opened.
    ChannelOpened { peer: PeerId, topic: String },
    /// A payload arrived from `peer`.
    Message { peer: PeerId, topic: String, payload: Vec<u8> },
    /// A per-peer channel closed.
    ChannelClosed { peer: PeerId, topic: String },
    /// A per-peer channel failed; handled like a close.
    ChannelError { peer: PeerId, topic: String, error: String },
    /// The peer left the mesh.
    PeerRemoved { peer: PeerId },
    /// The connection to the mesh was lost and re-established; remote state
    /// from before is stale, but no peer is known to have left.
    Reset,
}

impl TransportEvent {
    /// The remote peer this event concerns, if any.
    #[must_use]
    pub fn peer(&self) -> Option<&str> {
        match self {
            Self::PeerJoined { peer }
            | Self::ChannelOpened { peer, .. }
            | Self::Message { peer, .. }
            | Self::ChannelClosed { peer, .. }
            | Self::ChannelError { peer, .. }
            | Self::PeerRemoved { peer } => Some(peer),
            Self::Reset => None,
        }
    }
}

/// Errors produced by transports.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The transport (or the topic) has been closed.
    #[error("transport closed")]
    Closed,
    /// A send could not be completed.
    #[error("send failed: {0}")]
    Send(String),
}

/// Outbound side of the mesh.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Shape and payload constraints, fixed for the transport's lifetime.
    fn capabilities(&self) -> Capabilities;

    /// Send `payload` on `topic` to every other peer. Best-effort.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Closed`] once the transport or topic is
    /// closed, or another variant if the send itself fails.
    async fn send_to_all(&self, topic: &str, payload: Vec<u8>) -> Result<(), TransportError>;

    /// Close the local end of `topic`. Peers observe a channel close.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Closed`] if the transport is already gone.
    async fn close_topic(&self, topic: &str) -> Result<(), TransportError>;

    /// Flush queued frames and release the connection. Later sends fail with
    /// [`TransportError::Closed`].
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Closed`] if the transport was already shut down.
    async fn shutdown(&self) -> Result<(), TransportError> {
        Ok(())
    }
}
