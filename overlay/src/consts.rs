//! Shared numeric constants for the overlay crate.

// ── Geometry ────────────────────────────────────────────────────

/// Upper bound of a wire percentage.
pub const PERCENT_MAX: f64 = 100.0;

/// Hysteresis band applied to aspect-ratio comparisons when choosing a layout axis.
pub const LAYOUT_HYSTERESIS: f64 = 0.02;

/// Largest element/video aspect-ratio difference accepted under `Contain`.
pub const ASPECT_TOLERANCE: f64 = 0.02;

// ── Timing ──────────────────────────────────────────────────────

/// Lifetime of a click pulse, measured from its own timestamp.
pub const PULSE_TTL_MS: u64 = 3000;

/// Interval of the pulse prune tick.
pub const PULSE_TICK_MS: u64 = 1000;

// ── Wire ────────────────────────────────────────────────────────

/// The local nickname rides along on every Nth outbound pointer frame.
pub const NICKNAME_EVERY: u64 = 10;

// ── Rendering ───────────────────────────────────────────────────

/// Radius of a remote pointer dot, in CSS pixels.
pub const POINTER_RADIUS_PX: f64 = 6.0;

/// Radius of a click pulse ring, in CSS pixels.
pub const PULSE_RADIUS_PX: f64 = 18.0;

/// Stroke width of a click pulse ring, in CSS pixels.
pub const PULSE_STROKE_PX: f64 = 3.0;

/// Gap between a pointer dot and its nickname label.
pub const LABEL_OFFSET_PX: f64 = 10.0;

/// Font used for nickname labels.
pub const LABEL_FONT: &str = "12px sans-serif";
