//! Click pulses: transient markers that expire after a fixed TTL.
//!
//! The registry is clock-free. Callers pass `now_ms` into every operation and
//! own the real timer: [`PulseRegistry::add`] and [`PulseRegistry::on_tick`]
//! return the deadline of the next prune tick when one must be armed.
//!
//! At most one tick is pending at a time, and the tick stops re-arming as soon
//! as pruning leaves the registry empty. An empty registry therefore never has
//! a pending tick.

#[cfg(test)]
#[path = "pulses_test.rs"]
mod pulses_test;

use serde::Serialize;

use crate::consts::{PULSE_TICK_MS, PULSE_TTL_MS};
use crate::transform::{DisplayGeometry, PercentPoint, Point};

/// A transient click marker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClickPulse {
    /// Wire position, kept so the pulse can be reprojected on resize.
    pub percent: PercentPoint,
    /// Rendered position under the current geometry.
    pub position: Option<Point>,
    /// Sender timestamp, capped at receive time (receive time when the sender sent none).
    pub timestamp_ms: u64,
    pub expires_at_ms: u64,
}

/// Result of adding a pulse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// Stored. `tick` is the deadline of a newly armed prune tick, if one was armed.
    Added { tick: Option<u64> },
    /// Already past its TTL on arrival; discarded.
    Expired,
}

/// Live click pulses plus the state of the prune tick.
#[derive(Debug, Clone)]
pub struct PulseRegistry {
    pulses: Vec<ClickPulse>,
    ttl_ms: u64,
    tick_ms: u64,
    next_tick: Option<u64>,
}

impl Default for PulseRegistry {
    fn default() -> Self {
        Self::new(PULSE_TTL_MS, PULSE_TICK_MS)
    }
}

impl PulseRegistry {
    #[must_use]
    pub fn new(ttl_ms: u64, tick_ms: u64) -> Self {
        Self { pulses: Vec::new(), ttl_ms, tick_ms: tick_ms.max(1), next_tick: None }
    }

    /// Add a pulse received at `now_ms`.
    pub fn add(
        &mut self,
        percent: PercentPoint,
        geometry: Option<&DisplayGeometry>,
        timestamp_ms: Option<u64>,
        now_ms: u64,
    ) -> AddOutcome {
        // A sender clock ahead of ours must not stretch the lifetime.
        let timestamp_ms = timestamp_ms.map_or(now_ms, |ts| ts.min(now_ms));
        if self.is_expired(timestamp_ms, now_ms) {
            return AddOutcome::Expired;
        }

        let percent = percent.clamped();
        self.pulses.push(ClickPulse {
            percent,
            position: project(percent, geometry),
            timestamp_ms,
            expires_at_ms: timestamp_ms.saturating_add(self.ttl_ms),
        });

        // Check before schedule: never a second tick loop.
        if self.next_tick.is_some() {
            return AddOutcome::Added { tick: None };
        }
        let deadline = now_ms.saturating_add(self.tick_ms);
        self.next_tick = Some(deadline);
        AddOutcome::Added { tick: Some(deadline) }
    }

    /// Run the prune tick. Returns the next deadline while pulses remain.
    pub fn on_tick(&mut self, now_ms: u64) -> Option<u64> {
        self.next_tick?;
        self.prune(now_ms);
        self.next_tick = if self.pulses.is_empty() { None } else { Some(now_ms.saturating_add(self.tick_ms)) };
        self.next_tick
    }

    /// Drop pulses whose TTL has elapsed. Returns how many were removed.
    pub fn prune(&mut self, now_ms: u64) -> usize {
        let before = self.pulses.len();
        let ttl_ms = self.ttl_ms;
        self.pulses.retain(|p| now_ms.saturating_sub(p.timestamp_ms) < ttl_ms);
        before - self.pulses.len()
    }

    /// Recompute rendered positions under new geometry.
    pub fn reproject(&mut self, geometry: Option<&DisplayGeometry>) {
        for pulse in &mut self.pulses {
            pulse.position = project(pulse.percent, geometry);
        }
    }

    /// Drop every pulse and cancel the pending tick.
    pub fn clear(&mut self) {
        self.pulses.clear();
        self.next_tick = None;
    }

    #[must_use]
    pub fn pulses(&self) -> &[ClickPulse] {
        &self.pulses
    }

    /// Deadline of the pending prune tick, if any.
    #[must_use]
    pub fn next_tick(&self) -> Option<u64> {
        self.next_tick
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pulses.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pulses.is_empty()
    }

    fn is_expired(&self, timestamp_ms: u64, now_ms: u64) -> bool {
        now_ms.saturating_sub(timestamp_ms) >= self.ttl_ms
    }
}

fn project(percent: PercentPoint, geometry: Option<&DisplayGeometry>) -> Option<Point> {
    match geometry?.to_local(percent) {
        Ok(point) => Some(point),
        Err(_) => None,
    }
}
