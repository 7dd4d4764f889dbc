use frames::WireMessage;
use serde::Serialize;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

use crate::consts::{LAYOUT_HYSTERESIS, NICKNAME_EVERY, PULSE_TICK_MS, PULSE_TTL_MS};
use crate::geometry::{GeometryObserver, GeometryUpdate, LayoutAxis};
use crate::input::{LocalPointer, PointerSampler};
use crate::pointers::{PointerPatch, PointerStore};
use crate::pulses::{AddOutcome, PulseRegistry};
use crate::render;
use crate::transform::{DisplayGeometry, FitPolicy, PercentPoint, Point, Size};

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

/// Actions returned from handlers for the host to carry out.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Broadcast a message to every peer.
    Send(WireMessage),
    /// Call [`EngineCore::on_tick`] at `at_ms`.
    ScheduleTick { at_ms: u64 },
    /// The render state changed.
    RenderNeeded,
}

/// Tunables for the engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    pub nickname_every: u64,
    pub pulse_ttl_ms: u64,
    pub pulse_tick_ms: u64,
    pub hysteresis: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            nickname_every: NICKNAME_EVERY,
            pulse_ttl_ms: PULSE_TTL_MS,
            pulse_tick_ms: PULSE_TICK_MS,
            hysteresis: LAYOUT_HYSTERESIS,
        }
    }
}

/// A remote pointer as drawn on screen.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedPointer {
    pub peer_id: String,
    pub left_px: f64,
    pub top_px: f64,
    pub nickname: Option<String>,
}

/// A click pulse as drawn on screen.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RenderedPulse {
    pub left_px: f64,
    pub top_px: f64,
}

/// Everything the overlay needs to draw one frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RenderState {
    pub pointers: Vec<RenderedPointer>,
    pub pulses: Vec<RenderedPulse>,
}

/// Core engine state: all logic that doesn't depend on the canvas element.
///
/// Separated from `Engine` so it can be tested without WASM/browser dependencies.
pub struct EngineCore {
    pub observer: GeometryObserver,
    pub pointers: PointerStore,
    pub pulses: PulseRegistry,
    pub sampler: PointerSampler,
    nickname: String,
}

impl Default for EngineCore {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl EngineCore {
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self {
            observer: GeometryObserver::new(config.hysteresis),
            pointers: PointerStore::new(),
            pulses: PulseRegistry::new(config.pulse_ttl_ms, config.pulse_tick_ms),
            sampler: PointerSampler::new(config.nickname_every),
            nickname: String::new(),
        }
    }

    // --- Remote inputs ---

    /// Apply a decoded message from `peer_id`, received at `now_ms`.
    pub fn apply_message(&mut self, peer_id: &str, message: WireMessage, now_ms: u64) -> Vec<Action> {
        let geometry = self.observer.geometry().copied();
        match message {
            WireMessage::Move(sample) => {
                self.pointers.upsert(peer_id, &PointerPatch::from(&sample), geometry.as_ref());
                vec![Action::RenderNeeded]
            }
            WireMessage::Click(sample) => {
                if let Some(nickname) = sample.nickname.as_deref() {
                    self.pointers.upsert(peer_id, &PointerPatch::nickname(nickname), geometry.as_ref());
                }
                let percent = PercentPoint::new(sample.left, sample.top);
                match self.pulses.add(percent, geometry.as_ref(), sample.timestamp, now_ms) {
                    AddOutcome::Expired => Vec::new(),
                    AddOutcome::Added { tick } => {
                        let mut actions: Vec<Action> = tick.map(|at_ms| Action::ScheduleTick { at_ms }).into_iter().collect();
                        actions.push(Action::RenderNeeded);
                        actions
                    }
                }
            }
            WireMessage::Hide => self.remove_peer(peer_id),
            WireMessage::Nickname(name) => {
                self.pointers.upsert(peer_id, &PointerPatch::nickname(name), geometry.as_ref());
                vec![Action::RenderNeeded]
            }
        }
    }

    /// Forget a peer's pointer (leave, channel close or error, peer removal).
    pub fn remove_peer(&mut self, peer_id: &str) -> Vec<Action> {
        if self.pointers.remove(peer_id) { vec![Action::RenderNeeded] } else { Vec::new() }
    }

    /// Drop all remote state, e.g. when the local viewer leaves the session.
    pub fn clear(&mut self) -> Vec<Action> {
        self.pointers.clear();
        self.pulses.clear();
        vec![Action::RenderNeeded]
    }

    // --- Geometry ---

    pub fn on_container_resize(&mut self, size: Size) -> Vec<Action> {
        let update = self.observer.set_container(size);
        self.after_geometry(update)
    }

    pub fn on_element_resize(&mut self, size: Size) -> Vec<Action> {
        let update = self.observer.set_element(size);
        self.after_geometry(update)
    }

    pub fn on_video_resize(&mut self, size: Size) -> Vec<Action> {
        let update = self.observer.set_video(size);
        self.after_geometry(update)
    }

    pub fn set_fit_policy(&mut self, fit: FitPolicy) -> Vec<Action> {
        let update = self.observer.set_fit_policy(fit);
        self.after_geometry(update)
    }

    fn after_geometry(&mut self, update: GeometryUpdate) -> Vec<Action> {
        match update {
            GeometryUpdate::Changed(geometry) => {
                self.pointers.reproject(Some(&geometry));
                self.pulses.reproject(Some(&geometry));
                vec![Action::RenderNeeded]
            }
            GeometryUpdate::Unchanged | GeometryUpdate::Degenerate => Vec::new(),
        }
    }

    // --- Local input ---

    /// Route a local pointer event.
    pub fn on_local_pointer(&mut self, event: LocalPointer, now_ms: u64) -> Vec<Action> {
        let geometry = self.observer.geometry().copied();
        let outbound = match event {
            LocalPointer::Enter => {
                self.sampler.enter();
                None
            }
            LocalPointer::Move { x, y } => self.sampler.move_to(geometry.as_ref(), Point::new(x, y), &self.nickname),
            LocalPointer::Click { x, y } => {
                self.sampler.click(geometry.as_ref(), Point::new(x, y), &self.nickname, now_ms)
            }
            LocalPointer::Leave => self.sampler.leave(),
        };
        outbound.map(Action::Send).into_iter().collect()
    }

    /// Change the local nickname and announce it.
    pub fn set_nickname(&mut self, nickname: &str) -> Vec<Action> {
        if self.nickname == nickname {
            return Vec::new();
        }
        nickname.clone_into(&mut self.nickname);
        self.announce()
    }

    /// Identity frame for the local nickname, e.g. for a newly joined peer.
    #[must_use]
    pub fn announce(&self) -> Vec<Action> {
        if self.nickname.is_empty() {
            return Vec::new();
        }
        vec![Action::Send(WireMessage::Nickname(self.nickname.clone()))]
    }

    // --- Timer ---

    /// The prune tick armed by a previous [`Action::ScheduleTick`] fired.
    pub fn on_tick(&mut self, now_ms: u64) -> Vec<Action> {
        let before = self.pulses.len();
        let next = self.pulses.on_tick(now_ms);
        let mut actions: Vec<Action> = next.map(|at_ms| Action::ScheduleTick { at_ms }).into_iter().collect();
        if self.pulses.len() != before {
            actions.push(Action::RenderNeeded);
        }
        actions
    }

    // --- Queries ---

    #[must_use]
    pub fn nickname(&self) -> &str {
        &self.nickname
    }

    #[must_use]
    pub fn geometry(&self) -> Option<&DisplayGeometry> {
        self.observer.geometry()
    }

    #[must_use]
    pub fn layout(&self) -> LayoutAxis {
        self.observer.layout()
    }

    /// Build the drawable state from the pointer store and pulse registry.
    #[must_use]
    pub fn render_state(&self) -> RenderState {
        let pointers = self
            .pointers
            .snapshot()
            .into_iter()
            .filter_map(|entry| {
                let position = entry.position?;
                Some(RenderedPointer {
                    peer_id: entry.peer_id.clone(),
                    left_px: position.x,
                    top_px: position.y,
                    nickname: entry.nickname.clone(),
                })
            })
            .collect();
        let pulses = self
            .pulses
            .pulses()
            .iter()
            .filter_map(|pulse| pulse.position)
            .map(|p| RenderedPulse { left_px: p.x, top_px: p.y })
            .collect();
        RenderState { pointers, pulses }
    }
}

/// The full overlay engine. Wraps `EngineCore` and owns the browser canvas element.
pub struct Engine {
    canvas: HtmlCanvasElement,
    pub core: EngineCore,
    dpr: f64,
}

impl Engine {
    /// Create a new engine bound to the given canvas element.
    #[must_use]
    pub fn new(canvas: HtmlCanvasElement, config: EngineConfig) -> Self {
        Self { canvas, core: EngineCore::new(config), dpr: 1.0 }
    }

    // --- Delegated inputs, stamped with the browser clock ---

    pub fn apply_message(&mut self, peer_id: &str, message: WireMessage) -> Vec<Action> {
        self.core.apply_message(peer_id, message, now_ms())
    }

    pub fn remove_peer(&mut self, peer_id: &str) -> Vec<Action> {
        self.core.remove_peer(peer_id)
    }

    pub fn on_local_pointer(&mut self, event: LocalPointer) -> Vec<Action> {
        self.core.on_local_pointer(event, now_ms())
    }

    pub fn on_tick(&mut self) -> Vec<Action> {
        self.core.on_tick(now_ms())
    }

    pub fn set_nickname(&mut self, nickname: &str) -> Vec<Action> {
        self.core.set_nickname(nickname)
    }

    // --- Viewport ---

    /// Resize the backing store of the canvas to the element box and record the
    /// device pixel ratio, then treat the new box as the video element size.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn set_viewport(&mut self, width_css: f64, height_css: f64, dpr: f64) -> Vec<Action> {
        self.dpr = if dpr.is_finite() && dpr > 0.0 { dpr } else { 1.0 };
        self.canvas.set_width((width_css * self.dpr).round().max(0.0) as u32);
        self.canvas.set_height((height_css * self.dpr).round().max(0.0) as u32);
        self.core.on_element_resize(Size::new(width_css, height_css))
    }

    pub fn on_video_resize(&mut self, size: Size) -> Vec<Action> {
        self.core.on_video_resize(size)
    }

    pub fn set_fit_policy(&mut self, fit: FitPolicy) -> Vec<Action> {
        self.core.set_fit_policy(fit)
    }

    // --- Render ---

    /// Draw the current state to the canvas.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the 2D context is unavailable or a draw call fails.
    pub fn render(&self) -> Result<(), JsValue> {
        let Some(ctx) = self.canvas.get_context("2d")? else {
            return Err(JsValue::from_str("2d context unavailable"));
        };
        let ctx: CanvasRenderingContext2d = ctx.dyn_into()?;
        let Some(geometry) = self.core.geometry() else {
            return Ok(());
        };
        render::draw(
            &ctx,
            &self.core.render_state(),
            geometry.element_width,
            geometry.element_height,
            self.dpr,
        )
    }

    /// Render state as JSON for hosts that draw the overlay themselves.
    ///
    /// # Errors
    ///
    /// Returns any serialization error from `serde_json`.
    pub fn render_state_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.core.render_state())
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn now_ms() -> u64 {
    js_sys::Date::now().max(0.0) as u64
}
