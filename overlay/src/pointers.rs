//! Peer pointer store: latest pointer state per remote peer.
//!
//! Inbound frames are sparse (`l`/`t` on most, `n` only periodically), so the
//! store applies them as merge-patches via [`PointerStore::upsert`] and never
//! replaces an entry wholesale. Each entry also caches its rendered pixel
//! position under the current geometry; [`PointerStore::reproject`] refreshes
//! every cache after a resize.
//!
//! Entries are owned by their peer's lifecycle. The host removes them on an
//! explicit hide frame, a channel close or error, and peer removal.

#[cfg(test)]
#[path = "pointers_test.rs"]
mod pointers_test;

use std::collections::BTreeMap;

use frames::PointerSample;
use serde::Serialize;

use crate::transform::{DisplayGeometry, PercentPoint, Point};

/// Identifier of a remote peer as reported by the transport.
pub type PeerId = String;

/// A sparse update for one peer's pointer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointerPatch {
    pub left: Option<f64>,
    pub top: Option<f64>,
    pub nickname: Option<String>,
    pub timestamp: Option<u64>,
}

impl PointerPatch {
    /// A patch that only renames the peer.
    #[must_use]
    pub fn nickname(name: impl Into<String>) -> Self {
        Self { nickname: Some(name.into()), ..Self::default() }
    }
}

impl From<&PointerSample> for PointerPatch {
    fn from(sample: &PointerSample) -> Self {
        Self {
            left: Some(sample.left),
            top: Some(sample.top),
            nickname: sample.nickname.clone(),
            timestamp: sample.timestamp,
        }
    }
}

/// Merged pointer state of one remote peer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RemotePointerState {
    pub peer_id: PeerId,
    pub left: Option<f64>,
    pub top: Option<f64>,
    pub nickname: Option<String>,
    pub timestamp: Option<u64>,
    /// Rendered position under the current geometry, if it could be projected.
    pub position: Option<Point>,
}

impl RemotePointerState {
    fn new(peer_id: PeerId) -> Self {
        Self { peer_id, left: None, top: None, nickname: None, timestamp: None, position: None }
    }

    /// Wire position, once both axes are known.
    #[must_use]
    pub fn percent(&self) -> Option<PercentPoint> {
        Some(PercentPoint::new(self.left?, self.top?))
    }

    fn project(&mut self, geometry: Option<&DisplayGeometry>) {
        self.position = match (self.percent(), geometry) {
            (Some(percent), Some(geometry)) => match geometry.to_local(percent) {
                Ok(point) => Some(point),
                Err(_) => None,
            },
            _ => None,
        };
    }
}

/// All remote pointers, ordered by peer id.
#[derive(Debug, Clone, Default)]
pub struct PointerStore {
    entries: BTreeMap<PeerId, RemotePointerState>,
    revision: u64,
}

impl PointerStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a patch into the peer's entry, creating it if absent.
    ///
    /// When both the stored state and the patch carry a timestamp and the
    /// patch is older, its position fields are skipped; the nickname still
    /// applies. Returns whether the stored position moved.
    pub fn upsert(&mut self, peer_id: &str, patch: &PointerPatch, geometry: Option<&DisplayGeometry>) -> bool {
        let entry = self
            .entries
            .entry(peer_id.to_owned())
            .or_insert_with(|| RemotePointerState::new(peer_id.to_owned()));

        let stale = matches!((entry.timestamp, patch.timestamp), (Some(held), Some(incoming)) if incoming < held);
        let mut moved = false;

        if !stale {
            if let Some(left) = patch.left {
                moved |= entry.left != Some(left);
                entry.left = Some(left);
            }
            if let Some(top) = patch.top {
                moved |= entry.top != Some(top);
                entry.top = Some(top);
            }
            if patch.timestamp.is_some() {
                entry.timestamp = patch.timestamp;
            }
        }
        if let Some(ref nickname) = patch.nickname {
            entry.nickname = Some(nickname.clone());
        }

        entry.project(geometry);
        self.revision += 1;
        moved
    }

    /// Remove a peer's entry. Idempotent; returns whether an entry existed.
    pub fn remove(&mut self, peer_id: &str) -> bool {
        let removed = self.entries.remove(peer_id).is_some();
        if removed {
            self.revision += 1;
        }
        removed
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        if !self.entries.is_empty() {
            self.entries.clear();
            self.revision += 1;
        }
    }

    /// Recompute every rendered position under new geometry.
    pub fn reproject(&mut self, geometry: Option<&DisplayGeometry>) {
        for entry in self.entries.values_mut() {
            entry.project(geometry);
        }
        self.revision += 1;
    }

    /// Current entries in peer-id order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<&RemotePointerState> {
        self.entries.values().collect()
    }

    #[must_use]
    pub fn get(&self, peer_id: &str) -> Option<&RemotePointerState> {
        self.entries.get(peer_id)
    }

    #[must_use]
    pub fn contains(&self, peer_id: &str) -> bool {
        self.entries.contains_key(peer_id)
    }

    /// Monotonic counter bumped by every mutation.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
