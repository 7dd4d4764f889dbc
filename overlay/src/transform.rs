//! Coordinate transform between local CSS pixels and wire percentages.
//!
//! Every viewer renders the shared video at its own element size, native
//! resolution and fit policy. Pointer positions therefore travel as
//! percentages of the *native video frame*, and each side converts with its
//! own [`DisplayGeometry`] snapshot.
//!
//! Both directions are pure. Under [`FitPolicy::Cover`] the overflowing video
//! dimension is cropped symmetrically, so the forward transform adds the crop
//! offset and the reverse transform subtracts it and clamps to the element
//! box. Under [`FitPolicy::Contain`] the element is expected to share the
//! video's aspect ratio, so a single scale factor serves both axes.

#[cfg(test)]
#[path = "transform_test.rs"]
mod transform_test;

use serde::{Deserialize, Serialize};

use crate::consts::{ASPECT_TOLERANCE, PERCENT_MAX};

/// A point in local CSS pixels, relative to the video element's top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A resolution-independent position in percent of the native video frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PercentPoint {
    pub left: f64,
    pub top: f64,
}

impl PercentPoint {
    #[must_use]
    pub fn new(left: f64, top: f64) -> Self {
        Self { left, top }
    }

    /// Clamp both axes into `[0, 100]`.
    #[must_use]
    pub fn clamped(self) -> Self {
        Self { left: self.left.clamp(0.0, PERCENT_MAX), top: self.top.clamp(0.0, PERCENT_MAX) }
    }
}

/// A width/height pair in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Zero, negative or non-finite dimensions cannot be projected onto.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        !(self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0)
    }

    /// Width over height rounded to two decimals, or `0.0` when degenerate.
    #[must_use]
    pub fn aspect_ratio(&self) -> f64 {
        if self.is_degenerate() { 0.0 } else { round2(self.width / self.height) }
    }
}

/// How the video frame is mapped onto its element box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FitPolicy {
    /// Scale to fill the box and crop the overflowing dimension.
    #[default]
    Cover,
    /// Scale uniformly so the whole frame fits.
    Contain,
}

/// Errors produced when a conversion cannot be performed.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransformError {
    /// Element or video dimensions are zero or not finite.
    #[error("degenerate display geometry")]
    Degenerate,
    /// Under `Contain` the element does not share the video's aspect ratio.
    #[error("element aspect ratio {element} does not match video aspect ratio {video}")]
    AspectMismatch { element: f64, video: f64 },
}

/// A consistent snapshot of the element box, native video size and fit policy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplayGeometry {
    pub element_width: f64,
    pub element_height: f64,
    pub element_aspect_ratio: f64,
    pub video_width: f64,
    pub video_height: f64,
    pub video_aspect_ratio: f64,
    pub fit: FitPolicy,
}

impl DisplayGeometry {
    /// Build a snapshot, rounding both aspect ratios to two decimals.
    #[must_use]
    pub fn new(element: Size, video: Size, fit: FitPolicy) -> Self {
        Self {
            element_width: element.width,
            element_height: element.height,
            element_aspect_ratio: element.aspect_ratio(),
            video_width: video.width,
            video_height: video.height,
            video_aspect_ratio: video.aspect_ratio(),
            fit,
        }
    }

    #[must_use]
    pub fn element(&self) -> Size {
        Size::new(self.element_width, self.element_height)
    }

    #[must_use]
    pub fn video(&self) -> Size {
        Size::new(self.video_width, self.video_height)
    }

    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.element().is_degenerate() || self.video().is_degenerate()
    }

    /// Convert a local pixel position into wire percentages.
    ///
    /// # Errors
    ///
    /// Returns [`TransformError::Degenerate`] for unusable dimensions and
    /// [`TransformError::AspectMismatch`] under `Contain` when the element and
    /// video aspect ratios differ by more than the tolerance.
    pub fn to_percent(&self, local: Point) -> Result<PercentPoint, TransformError> {
        self.check()?;
        let (video_left, video_top) = match self.fit {
            FitPolicy::Cover => {
                if self.fills_height() {
                    let factor = self.video_height / self.element_height;
                    let offset = (self.video_width / factor - self.element_width) / 2.0;
                    ((local.x + offset) * factor, local.y * factor)
                } else {
                    let factor = self.video_width / self.element_width;
                    let offset = (self.video_height / factor - self.element_height) / 2.0;
                    (local.x * factor, (local.y + offset) * factor)
                }
            }
            FitPolicy::Contain => {
                let factor = self.video_width / self.element_width;
                (local.x * factor, local.y * factor)
            }
        };
        Ok(PercentPoint {
            left: round2(video_left * PERCENT_MAX / self.video_width),
            top: round2(video_top * PERCENT_MAX / self.video_height),
        })
    }

    /// Convert wire percentages into a local pixel position.
    ///
    /// The input is clamped to `[0, 100]` first. Under `Cover` the result is
    /// clamped to the element box, since the cropped margin is not visible.
    ///
    /// # Errors
    ///
    /// Same conditions as [`DisplayGeometry::to_percent`].
    pub fn to_local(&self, percent: PercentPoint) -> Result<Point, TransformError> {
        self.check()?;
        let percent = percent.clamped();
        let video_left = percent.left * self.video_width / PERCENT_MAX;
        let video_top = percent.top * self.video_height / PERCENT_MAX;

        match self.fit {
            FitPolicy::Cover => {
                let (x, y) = if self.fills_height() {
                    let factor = self.video_height / self.element_height;
                    let offset = (self.video_width / factor - self.element_width) / 2.0;
                    (video_left / factor - offset, video_top / factor)
                } else {
                    let factor = self.video_width / self.element_width;
                    let offset = (self.video_height / factor - self.element_height) / 2.0;
                    (video_left / factor, video_top / factor - offset)
                };
                Ok(Point { x: x.clamp(0.0, self.element_width), y: y.clamp(0.0, self.element_height) })
            }
            FitPolicy::Contain => {
                let factor = self.video_width / self.element_width;
                Ok(Point { x: video_left / factor, y: video_top / factor })
            }
        }
    }

    /// Under `Cover`, whether the video spans the element height (and is
    /// cropped horizontally) rather than its width.
    fn fills_height(&self) -> bool {
        self.element_aspect_ratio <= self.video_aspect_ratio
    }

    fn check(&self) -> Result<(), TransformError> {
        if self.is_degenerate() {
            return Err(TransformError::Degenerate);
        }
        if self.fit == FitPolicy::Contain
            && (self.element_aspect_ratio - self.video_aspect_ratio).abs() > ASPECT_TOLERANCE + f64::EPSILON
        {
            return Err(TransformError::AspectMismatch {
                element: self.element_aspect_ratio,
                video: self.video_aspect_ratio,
            });
        }
        Ok(())
    }
}

/// Round to two decimals, nudging by epsilon so `1.005` rounds up.
#[must_use]
pub fn round2(value: f64) -> f64 {
    ((value + f64::EPSILON) * 100.0).round() / 100.0
}
