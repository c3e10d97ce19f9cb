//! Orbit camera, pointer drag handling and screen-space picking.
//!
//! The camera is three scalars: pitch (`rotation_x`), yaw (`rotation_y`) and a zoom
//! multiplier folded into the field of view. Each scene supplies a
//! [`CameraLimits`] with its pitch range, zoom range and drag sensitivity;
//! every mutation goes through the limits so out-of-range input is clamped.
//!
//! # Pointer model
//!
//! [`DragTracker`] turns raw pointer events into camera deltas. A press followed by
//! a release that travelled less than [`CLICK_THRESHOLD`] pixels is reported as a
//! click, which the scene resolves with [`pick_nearest`].

use crate::math::Vec3;
use crate::projector::{Viewport, project};

/// Pointer travel (pixels) under which a press/release pair counts as a click.
pub const CLICK_THRESHOLD: f32 = 10.0;

/// Zoom change applied per wheel notch or keyboard press.
pub const ZOOM_STEP: f32 = 0.1;

/// Camera orientation shared by the input handler and the renderer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    /// Pitch in radians.
    pub rotation_x: f32,
    /// Yaw in radians.
    pub rotation_y: f32,
    /// Positive zoom multiplier.
    pub zoom: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            rotation_x: 0.4,
            rotation_y: -0.4,
            zoom: 1.0,
        }
    }
}

/// Per-scene bounds for camera control.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraLimits {
    /// Lowest allowed pitch.
    pub pitch_min: f32,
    /// Highest allowed pitch.
    pub pitch_max: f32,
    /// Smallest zoom multiplier.
    pub zoom_min: f32,
    /// Largest zoom multiplier.
    pub zoom_max: f32,
    /// Radians of rotation per pixel of drag.
    pub sensitivity: f32,
}

impl Default for CameraLimits {
    fn default() -> Self {
        Self {
            pitch_min: -std::f32::consts::FRAC_PI_2,
            pitch_max: std::f32::consts::FRAC_PI_2,
            zoom_min: 0.2,
            zoom_max: 3.0,
            sensitivity: 0.005,
        }
    }
}

impl CameraLimits {
    /// Limits for scenes that keep a horizon in view.
    pub fn horizon(pitch_min: f32) -> Self {
        Self {
            pitch_min,
            ..Self::default()
        }
    }

    pub fn with_zoom(mut self, min: f32, max: f32) -> Self {
        self.zoom_min = min;
        self.zoom_max = max;
        self
    }

    pub fn with_sensitivity(mut self, sensitivity: f32) -> Self {
        self.sensitivity = sensitivity;
        self
    }
}

impl Camera {
    pub fn new(rotation_x: f32, rotation_y: f32, zoom: f32) -> Self {
        Self {
            rotation_x,
            rotation_y,
            zoom,
        }
    }

    /// Applies a drag delta in pixels.
    ///
    /// Horizontal motion turns yaw, vertical motion turns pitch. Pitch is clamped to
    /// the scene limits; yaw wraps freely.
    pub fn rotate_by(&mut self, dx: f32, dy: f32, limits: &CameraLimits) {
        self.rotation_y += dx * limits.sensitivity;
        self.rotation_x =
            (self.rotation_x + dy * limits.sensitivity).clamp(limits.pitch_min, limits.pitch_max);
    }

    /// Adds `delta` to the zoom and clamps it into range.
    pub fn zoom_by(&mut self, delta: f32, limits: &CameraLimits) {
        self.set_zoom(self.zoom + delta, limits);
    }

    /// Sets the zoom, clamping instead of rejecting out-of-range values.
    pub fn set_zoom(&mut self, zoom: f32, limits: &CameraLimits) {
        let zoom = if zoom.is_finite() { zoom } else { limits.zoom_min };
        self.zoom = zoom.clamp(limits.zoom_min, limits.zoom_max);
    }

    /// Re-applies the limits to every field.
    pub fn clamp_to(&mut self, limits: &CameraLimits) {
        self.rotation_x = self.rotation_x.clamp(limits.pitch_min, limits.pitch_max);
        self.set_zoom(self.zoom, limits);
    }

    /// Effective field of view for a scene whose unzoomed value is `base_fov`.
    pub fn fov(&self, base_fov: f32) -> f32 {
        base_fov * self.zoom
    }
}

/// What a pointer release turned out to be.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerRelease {
    /// Short press: pick at this screen position.
    Click { x: f32, y: f32 },
    /// The press rotated the camera.
    DragEnd,
    /// Release without a matching press.
    Ignored,
}

/// Tracks an in-progress pointer drag.
#[derive(Debug, Default, Clone)]
pub struct DragTracker {
    /// Position of the press that started the drag.
    origin: Option<(f32, f32)>,
    /// Last position seen while dragging.
    last: (f32, f32),
    /// Largest distance from the origin seen during this press.
    travel: f32,
}

impl DragTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_dragging(&self) -> bool {
        self.origin.is_some()
    }

    /// Starts a drag at the given pointer position.
    pub fn press(&mut self, x: f32, y: f32) {
        self.origin = Some((x, y));
        self.last = (x, y);
        self.travel = 0.0;
    }

    /// Feeds a pointer move. Returns the pixel delta to rotate by while dragging.
    pub fn motion(&mut self, x: f32, y: f32) -> Option<(f32, f32)> {
        let (ox, oy) = self.origin?;
        let delta = (x - self.last.0, y - self.last.1);
        self.last = (x, y);
        self.travel = self.travel.max(((x - ox).powi(2) + (y - oy).powi(2)).sqrt());
        Some(delta)
    }

    /// Ends the drag and classifies it.
    pub fn release(&mut self, x: f32, y: f32) -> PointerRelease {
        let Some((ox, oy)) = self.origin.take() else {
            return PointerRelease::Ignored;
        };
        let travel = self
            .travel
            .max(((x - ox).powi(2) + (y - oy).powi(2)).sqrt());
        if travel < CLICK_THRESHOLD {
            PointerRelease::Click { x, y }
        } else {
            PointerRelease::DragEnd
        }
    }

    /// Drops any in-progress drag, e.g. when the pointer leaves the window.
    pub fn cancel(&mut self) {
        self.origin = None;
    }
}

/// A candidate for picking.
#[derive(Debug, Clone, Copy)]
pub struct PickTarget<Id> {
    /// Identifier reported back on a hit.
    pub id: Id,
    /// Scene-space position.
    pub position: Vec3,
    /// Maximum screen distance (pixels) that still counts as a hit.
    pub hit_radius: f32,
}

/// Selects the candidate whose projection is closest to the pointer.
///
/// Candidates outside their own hit radius, or behind the eye plane, are ignored.
/// Returns `None` when nothing qualifies, which callers treat as clearing the
/// selection.
pub fn pick_nearest<Id, I>(
    candidates: I,
    camera: &Camera,
    viewport: Viewport,
    fov: f32,
    pointer: (f32, f32),
) -> Option<Id>
where
    I: IntoIterator<Item = PickTarget<Id>>,
{
    let mut best: Option<(Id, f32)> = None;

    for candidate in candidates {
        let proj = project(candidate.position, camera, viewport, fov);
        if !proj.is_visible(fov) {
            continue;
        }
        let distance = proj.screen_distance(pointer.0, pointer.1);
        if distance >= candidate.hit_radius {
            continue;
        }
        match &best {
            Some((_, best_distance)) if *best_distance <= distance => {}
            _ => best = Some((candidate.id, distance)),
        }
    }

    best.map(|(id, _)| id)
}
