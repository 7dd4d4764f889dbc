//! Local pointer sampler: turns the viewer's own pointer events into wire messages.
//!
//! The sampler is armed by `enter` and disarmed by `leave`. While armed, every
//! move is converted to wire percentages through the current geometry. Clicks
//! are always forwarded and carry a timestamp so receivers can discard them
//! once stale.
//!
//! To save bandwidth the nickname is attached only to every Nth outbound
//! position or click frame; receivers keep the last nickname they saw.

#[cfg(test)]
#[path = "input_test.rs"]
mod input_test;

use frames::{PointerSample, WireMessage};
use serde::{Deserialize, Serialize};

use crate::consts::NICKNAME_EVERY;
use crate::transform::{DisplayGeometry, Point};

/// A pointer event from the local viewer, in element-relative CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum LocalPointer {
    Enter,
    Move { x: f64, y: f64 },
    Click { x: f64, y: f64 },
    Leave,
}

/// Outbound sampling state.
#[derive(Debug, Clone)]
pub struct PointerSampler {
    armed: bool,
    counter: u64,
    nickname_every: u64,
}

impl Default for PointerSampler {
    fn default() -> Self {
        Self::new(NICKNAME_EVERY)
    }
}

impl PointerSampler {
    #[must_use]
    pub fn new(nickname_every: u64) -> Self {
        Self { armed: false, counter: 0, nickname_every: nickname_every.max(1) }
    }

    /// The pointer entered the video element.
    pub fn enter(&mut self) {
        self.armed = true;
    }

    /// The pointer moved. Produces nothing while disarmed or without usable geometry.
    pub fn move_to(&mut self, geometry: Option<&DisplayGeometry>, local: Point, nickname: &str) -> Option<WireMessage> {
        if !self.armed {
            return None;
        }
        let sample = self.sample(geometry, local, nickname)?;
        Some(WireMessage::Move(sample))
    }

    /// The pointer clicked at `local`.
    pub fn click(
        &mut self,
        geometry: Option<&DisplayGeometry>,
        local: Point,
        nickname: &str,
        now_ms: u64,
    ) -> Option<WireMessage> {
        let sample = self.sample(geometry, local, nickname)?.with_timestamp(now_ms);
        Some(WireMessage::Click(sample))
    }

    /// The pointer left the video element. Produces a hide frame once.
    pub fn leave(&mut self) -> Option<WireMessage> {
        if !self.armed {
            return None;
        }
        self.armed = false;
        Some(WireMessage::Hide)
    }

    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Outbound position/click frames produced so far.
    #[must_use]
    pub fn frames_sent(&self) -> u64 {
        self.counter
    }

    fn sample(&mut self, geometry: Option<&DisplayGeometry>, local: Point, nickname: &str) -> Option<PointerSample> {
        let percent = match geometry?.to_percent(local) {
            Ok(percent) => percent,
            Err(_) => return None,
        };
        self.counter += 1;
        let sample = PointerSample::new(percent.left, percent.top);
        if self.counter % self.nickname_every == 0 && !nickname.is_empty() {
            Some(sample.with_nickname(nickname))
        } else {
            Some(sample)
        }
    }
}
