//! Shared pointer overlay for a live video stream.
//!
//! This crate turns local pointer input into resolution-independent wire
//! events and turns remote wire events back into pixel positions for the
//! viewer's own video element. It is pure state plus geometry: the host owns
//! timers and the transport, feeds events into [`engine::EngineCore`], and
//! carries out the [`engine::Action`]s it returns. In the browser,
//! [`engine::Engine`] additionally draws the overlay to a canvas.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`engine`] | Top-level engine and testable [`engine::EngineCore`] |
//! | [`transform`] | Local pixels ⇄ wire percentages under a fit policy |
//! | [`geometry`] | Resize tracking, degenerate-geometry guard, layout axis |
//! | [`pointers`] | Per-peer pointer store with merge-patch semantics |
//! | [`pulses`] | Self-expiring click pulses and the prune tick |
//! | [`input`] | Local pointer sampler and nickname throttling |
//! | [`render`] | Canvas drawing of pointers and pulses |
//! | [`consts`] | Shared numeric constants (TTLs, bands, marker sizes) |

pub mod consts;
pub mod engine;
pub mod geometry;
pub mod input;
pub mod pointers;
pub mod pulses;
pub mod render;
pub mod transform;
