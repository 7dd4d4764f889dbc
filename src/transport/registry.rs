//! Channel registry: which remote channels are still live.
//!
//! Messages can arrive after the peer that sent them has been removed (the
//! close notification and a last in-flight frame race). The session consults
//! the registry before applying anything, so a late frame never resurrects a
//! pointer that was just cleaned up.
//!
//! Per-peer transports admit a message only on an open `(peer, topic)`
//! channel. Broadcast transports have no channels; there the registry keeps
//! tombstones for removed peers until they join again or the connection
//! resets.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use super::TransportShape;

#[cfg(test)]
#[path = "registry_test.rs"]
mod registry_test;

#[derive(Debug, Clone)]
pub struct ChannelRegistry {
    shape: TransportShape,
    open: BTreeMap<String, BTreeSet<String>>,
    removed: HashSet<String>,
}

impl ChannelRegistry {
    #[must_use]
    pub fn new(shape: TransportShape) -> Self {
        Self { shape, open: BTreeMap::new(), removed: HashSet::new() }
    }

    pub fn peer_joined(&mut self, peer: &str) {
        self.removed.remove(peer);
    }

    pub fn channel_opened(&mut self, peer: &str, topic: &str) {
        self.removed.remove(peer);
        self.open.entry(peer.to_owned()).or_default().insert(topic.to_owned());
    }

    /// Mark one channel closed. Returns whether it was open.
    pub fn channel_closed(&mut self, peer: &str, topic: &str) -> bool {
        let Some(topics) = self.open.get_mut(peer) else {
            return false;
        };
        let was_open = topics.remove(topic);
        if topics.is_empty() {
            self.open.remove(peer);
        }
        was_open
    }

    /// Forget every channel of the peer; on a broadcast, tombstone it.
    pub fn peer_removed(&mut self, peer: &str) {
        self.open.remove(peer);
        if self.shape == TransportShape::Broadcast {
            self.removed.insert(peer.to_owned());
        }
    }

    /// Forget everything after the transport reconnected.
    pub fn reset(&mut self) {
        self.open.clear();
        self.removed.clear();
    }

    /// Number of tombstoned peers.
    #[must_use]
    pub fn tombstones(&self) -> usize {
        self.removed.len()
    }

    /// Whether a message from `peer` on `topic` may still be applied.
    #[must_use]
    pub fn accepts(&self, peer: &str, topic: &str) -> bool {
        match self.shape {
            TransportShape::PerPeerChannels => self.open.get(peer).is_some_and(|topics| topics.contains(topic)),
            TransportShape::Broadcast => !self.removed.contains(peer),
        }
    }

    /// Peers with at least one open channel, in id order.
    #[must_use]
    pub fn peers(&self) -> Vec<&str> {
        self.open.keys().map(String::as_str).collect()
    }
}
