//! Geometry observer: folds resize and fit-policy triggers into a [`DisplayGeometry`].
//!
//! The host reports three boxes as they change: the container the video lives
//! in, the video element itself, and the native video frame size (known once
//! metadata has loaded). Each trigger recomputes the snapshot and reports
//! whether anything downstream needs to be reprojected.
//!
//! Degenerate inputs (a hidden element, a video without metadata yet) never
//! overwrite the last good snapshot; the next valid trigger recovers.
//!
//! When the policy is not `Cover`, the observer also decides a [`LayoutAxis`]
//! for the video element. The decision uses a hysteresis band so a container
//! whose aspect ratio hovers around the video's does not flip-flop between
//! row and column layouts on every resize.

#[cfg(test)]
#[path = "geometry_test.rs"]
mod geometry_test;

use serde::{Deserialize, Serialize};

use crate::consts::LAYOUT_HYSTERESIS;
use crate::transform::{DisplayGeometry, FitPolicy, Size};

/// How the video element is sized inside its container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutAxis {
    /// Container is wider than the video: span the full height.
    Row,
    /// Container is taller than the video: span the full width.
    #[default]
    Column,
}

/// Outcome of a geometry trigger.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GeometryUpdate {
    /// Geometry or layout changed; reproject everything.
    Changed(DisplayGeometry),
    /// Inputs produced the same geometry and layout as before.
    Unchanged,
    /// Inputs are unusable; the last good geometry (if any) is retained.
    Degenerate,
}

/// Tracks the inputs of [`DisplayGeometry`] and the derived layout axis.
#[derive(Debug, Clone)]
pub struct GeometryObserver {
    container: Option<Size>,
    element: Option<Size>,
    video: Option<Size>,
    fit: FitPolicy,
    hysteresis: f64,
    layout: LayoutAxis,
    current: Option<DisplayGeometry>,
}

impl Default for GeometryObserver {
    fn default() -> Self {
        Self::new(LAYOUT_HYSTERESIS)
    }
}

impl GeometryObserver {
    #[must_use]
    pub fn new(hysteresis: f64) -> Self {
        Self {
            container: None,
            element: None,
            video: None,
            fit: FitPolicy::default(),
            hysteresis,
            layout: LayoutAxis::default(),
            current: None,
        }
    }

    // --- Triggers ---

    /// The container box was resized.
    pub fn set_container(&mut self, size: Size) -> GeometryUpdate {
        self.container = Some(size);
        self.recompute()
    }

    /// The video element box was resized.
    pub fn set_element(&mut self, size: Size) -> GeometryUpdate {
        self.element = Some(size);
        self.recompute()
    }

    /// The native video frame size changed (metadata load or stream resize).
    pub fn set_video(&mut self, size: Size) -> GeometryUpdate {
        self.video = Some(size);
        self.recompute()
    }

    /// The fit policy was toggled.
    pub fn set_fit_policy(&mut self, fit: FitPolicy) -> GeometryUpdate {
        self.fit = fit;
        self.recompute()
    }

    // --- Queries ---

    /// Last good geometry snapshot.
    #[must_use]
    pub fn geometry(&self) -> Option<&DisplayGeometry> {
        self.current.as_ref()
    }

    #[must_use]
    pub fn layout(&self) -> LayoutAxis {
        self.layout
    }

    #[must_use]
    pub fn fit_policy(&self) -> FitPolicy {
        self.fit
    }

    fn recompute(&mut self) -> GeometryUpdate {
        // Without an explicit element box the video fills its container.
        let Some(element) = self.element.or(self.container) else {
            return GeometryUpdate::Degenerate;
        };
        let Some(video) = self.video else {
            return GeometryUpdate::Degenerate;
        };

        let next = DisplayGeometry::new(element, video, self.fit);
        if next.is_degenerate() {
            return GeometryUpdate::Degenerate;
        }

        let layout = self.decide_layout(next.video_aspect_ratio);
        let unchanged = self.current == Some(next) && self.layout == layout;
        self.current = Some(next);
        self.layout = layout;

        if unchanged { GeometryUpdate::Unchanged } else { GeometryUpdate::Changed(next) }
    }

    fn decide_layout(&self, video_aspect_ratio: f64) -> LayoutAxis {
        if self.fit == FitPolicy::Cover {
            return self.layout;
        }
        let Some(container) = self.container.filter(|c| !c.is_degenerate()) else {
            return self.layout;
        };
        let container_aspect_ratio = container.aspect_ratio();
        if container_aspect_ratio > video_aspect_ratio + self.hysteresis {
            LayoutAxis::Row
        } else if container_aspect_ratio < video_aspect_ratio - self.hysteresis {
            LayoutAxis::Column
        } else {
            self.layout
        }
    }
}
