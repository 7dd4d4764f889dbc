//! Rendering: draws remote pointers and click pulses to a 2D context.
//!
//! This module is the only place that touches [`web_sys::CanvasRenderingContext2d`].
//! It receives a read-only [`RenderState`] and produces pixels; it does not
//! mutate any application state.
//!
//! All fallible `Canvas2D` calls propagate errors via `Result<(), JsValue>`.
//! The top-level caller ([`crate::engine::Engine::render`]) handles the result.

#[cfg(test)]
#[path = "render_test.rs"]
mod render_test;

use std::f64::consts::TAU;

use wasm_bindgen::JsValue;
use web_sys::CanvasRenderingContext2d;

use crate::consts::{LABEL_FONT, LABEL_OFFSET_PX, POINTER_RADIUS_PX, PULSE_RADIUS_PX, PULSE_STROKE_PX};
use crate::engine::{RenderState, RenderedPointer, RenderedPulse};

/// Pointer colours, picked per peer so a peer keeps its colour across frames.
const PALETTE: [&str; 8] = ["#e6194b", "#3cb44b", "#4363d8", "#f58231", "#911eb4", "#42d4f4", "#f032e6", "#bfef45"];

const PULSE_COLOR: &str = "rgba(255, 215, 0, 0.85)";
const LABEL_COLOR: &str = "#ffffff";
const LABEL_SHADOW: &str = "rgba(0, 0, 0, 0.6)";

/// Draw one overlay frame.
///
/// `viewport_w` and `viewport_h` are in CSS pixels. `dpr` is the device pixel ratio.
///
/// # Errors
///
/// Returns `Err` if any `Canvas2D` call fails (e.g. invalid context state).
pub fn draw(
    ctx: &CanvasRenderingContext2d,
    state: &RenderState,
    viewport_w: f64,
    viewport_h: f64,
    dpr: f64,
) -> Result<(), JsValue> {
    ctx.set_transform(dpr, 0.0, 0.0, dpr, 0.0, 0.0)?;
    ctx.clear_rect(0.0, 0.0, viewport_w, viewport_h);

    // Pulses under pointers.
    for pulse in &state.pulses {
        draw_pulse(ctx, pulse)?;
    }
    for pointer in &state.pointers {
        draw_pointer(ctx, pointer)?;
    }
    Ok(())
}

fn draw_pulse(ctx: &CanvasRenderingContext2d, pulse: &RenderedPulse) -> Result<(), JsValue> {
    ctx.begin_path();
    ctx.arc(pulse.left_px, pulse.top_px, PULSE_RADIUS_PX, 0.0, TAU)?;
    ctx.set_stroke_style_str(PULSE_COLOR);
    ctx.set_line_width(PULSE_STROKE_PX);
    ctx.stroke();
    Ok(())
}

fn draw_pointer(ctx: &CanvasRenderingContext2d, pointer: &RenderedPointer) -> Result<(), JsValue> {
    ctx.begin_path();
    ctx.arc(pointer.left_px, pointer.top_px, POINTER_RADIUS_PX, 0.0, TAU)?;
    ctx.set_fill_style_str(peer_color(&pointer.peer_id));
    ctx.fill();

    if let Some(label) = label_text(pointer) {
        ctx.set_font(LABEL_FONT);
        let x = pointer.left_px + LABEL_OFFSET_PX;
        let y = pointer.top_px + LABEL_OFFSET_PX;
        ctx.set_fill_style_str(LABEL_SHADOW);
        ctx.fill_text(label, x + 1.0, y + 1.0)?;
        ctx.set_fill_style_str(LABEL_COLOR);
        ctx.fill_text(label, x, y)?;
    }
    Ok(())
}

/// Stable colour for a peer id.
#[must_use]
pub fn peer_color(peer_id: &str) -> &'static str {
    // FNV-1a over the id bytes.
    let hash = peer_id.bytes().fold(0x811c_9dc5_u32, |h, b| (h ^ u32::from(b)).wrapping_mul(0x0100_0193));
    PALETTE[hash as usize % PALETTE.len()]
}

/// Label drawn next to a pointer, if the peer has a non-blank nickname.
#[must_use]
pub fn label_text(pointer: &RenderedPointer) -> Option<&str> {
    pointer.nickname.as_deref().map(str::trim).filter(|n| !n.is_empty())
}
