//! Perspective projection from scene space to the 2D drawing surface.
//!
//! Every scene renders through [`project`]. The camera orientation is applied as a
//! yaw (rotation about the vertical axis) followed by a pitch (rotation about the
//! horizontal axis), then a simple perspective divide:
//!
//! ```text
//! scale  = fov / max(1, fov + depth)
//! screen = viewport_center + (rotated_x, rotated_y) * scale
//! ```
//!
//! The floor of 1 on the denominator keeps `scale` positive and finite for points
//! at or behind the eye plane. [`project_lensed`] additionally bends points that sit
//! in front of the lens threshold away from the optical axis with a Gaussian
//! falloff, which the spacetime scene uses for its background starfield.

use crate::camera::Camera;
use crate::math::{Vec3, sign_nonzero};

/// Depth beyond which the lensing warp is applied.
const LENS_DEPTH_THRESHOLD: f32 = -50.0;
/// Gaussian width (squared screen-space radius) of the lensing falloff.
const LENS_FALLOFF: f32 = 15000.0;
/// Peak vertical displacement at the optical axis, before depth weighting.
const LENS_WARP_STRENGTH: f32 = 140.0;
/// Horizontal stretch factor at the optical axis.
const LENS_STRETCH: f32 = 0.35;

/// Size of the drawing surface in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Width in pixels.
    pub width: f32,
    /// Height in pixels.
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Center of the surface, where the camera axis lands.
    pub fn center(&self) -> (f32, f32) {
        (self.width / 2.0, self.height / 2.0)
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(800.0, 600.0)
    }
}

/// Result of projecting a single point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    /// Screen-space X in pixels.
    pub x: f32,
    /// Screen-space Y in pixels.
    pub y: f32,
    /// Perspective scale factor; always positive.
    pub scale: f32,
    /// Depth after rotation; negative values are towards the viewer.
    pub depth: f32,
}

impl Projection {
    /// Whether the point sits far enough in front of the eye to be drawn.
    pub fn is_visible(&self, fov: f32) -> bool {
        self.scale > 0.0 && self.depth > -fov + 1.0
    }

    /// Euclidean screen distance to a pointer position.
    pub fn screen_distance(&self, x: f32, y: f32) -> f32 {
        ((self.x - x).powi(2) + (self.y - y).powi(2)).sqrt()
    }
}

/// Camera, surface and field of view bundled for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct View {
    pub camera: Camera,
    pub viewport: Viewport,
    /// Effective field of view, zoom already applied.
    pub fov: f32,
}

impl View {
    pub fn new(camera: Camera, viewport: Viewport, base_fov: f32) -> Self {
        Self {
            camera,
            viewport,
            fov: camera.fov(base_fov),
        }
    }

    pub fn project(&self, point: Vec3) -> Projection {
        project(point, &self.camera, self.viewport, self.fov)
    }

    pub fn project_lensed(&self, point: Vec3) -> Projection {
        project_lensed(point, &self.camera, self.viewport, self.fov)
    }

    /// Scene-space offset that moves `anchor` by `(dx, dy)` on screen without
    /// changing its depth.
    pub fn screen_offset(&self, anchor: Vec3, dx: f32, dy: f32) -> Vec3 {
        let scale = self.project(anchor).scale.max(f32::EPSILON);
        unrotate(dx / scale, dy / scale, 0.0, &self.camera)
    }
}

/// Uniform fit of the nominal drawing surface into a window, centered.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    pub scale: f32,
    pub offset_x: f32,
    pub offset_y: f32,
}

impl Letterbox {
    /// Largest uniform scale that fits `nominal` inside `window`.
    pub fn fit(nominal: Viewport, window: Viewport) -> Self {
        let scale = (window.width / nominal.width.max(1.0))
            .min(window.height / nominal.height.max(1.0))
            .max(f32::EPSILON);
        Self {
            scale,
            offset_x: (window.width - nominal.width * scale) / 2.0,
            offset_y: (window.height - nominal.height * scale) / 2.0,
        }
    }

    /// Window pixels to nominal coordinates.
    pub fn to_nominal(&self, x: f32, y: f32) -> (f32, f32) {
        ((x - self.offset_x) / self.scale, (y - self.offset_y) / self.scale)
    }

    /// Nominal coordinates to window pixels.
    pub fn to_window(&self, x: f32, y: f32) -> (f32, f32) {
        (x * self.scale + self.offset_x, y * self.scale + self.offset_y)
    }
}

/// Rotates a point by the camera yaw then pitch and returns `(x, y, depth)`.
fn rotate(point: Vec3, camera: &Camera) -> (f32, f32, f32) {
    let (sin_y, cos_y) = camera.rotation_y.sin_cos();
    let tx = point.x * cos_y - point.z * sin_y;
    let tz = point.z * cos_y + point.x * sin_y;

    let (sin_x, cos_x) = camera.rotation_x.sin_cos();
    let ty = point.y * cos_x - tz * sin_x;
    let depth = tz * cos_x + point.y * sin_x;

    (tx, ty, depth)
}

/// Inverse of [`rotate`]: undoes the pitch, then the yaw.
fn unrotate(x: f32, y: f32, depth: f32, camera: &Camera) -> Vec3 {
    let (sin_x, cos_x) = camera.rotation_x.sin_cos();
    let py = y * cos_x + depth * sin_x;
    let tz = depth * cos_x - y * sin_x;

    let (sin_y, cos_y) = camera.rotation_y.sin_cos();
    Vec3::new(x * cos_y + tz * sin_y, py, tz * cos_y - x * sin_y)
}

fn finish(x: f32, y: f32, depth: f32, viewport: Viewport, fov: f32) -> Projection {
    let scale = fov / (fov + depth).max(1.0);
    let (cx, cy) = viewport.center();
    Projection {
        x: cx + x * scale,
        y: cy + y * scale,
        scale,
        depth,
    }
}

/// Projects a scene-space point onto the viewport.
///
/// # Arguments
/// * `point` - Point in scene-local units
/// * `camera` - Current camera orientation (zoom is folded into `fov` by the caller)
/// * `viewport` - Drawing surface size
/// * `fov` - Field of view in the projector's distance units
pub fn project(point: Vec3, camera: &Camera, viewport: Viewport, fov: f32) -> Projection {
    let (x, y, depth) = rotate(point, camera);
    finish(x, y, depth, viewport, fov)
}

/// Projects with the gravitational-lensing warp applied.
///
/// Points whose rotated depth is in front of the threshold are pushed away from the
/// horizontal axis by an amount proportional to `exp(-r² / falloff)`. The warp is a
/// pure function of its inputs.
pub fn project_lensed(point: Vec3, camera: &Camera, viewport: Viewport, fov: f32) -> Projection {
    let (mut x, mut y, depth) = rotate(point, camera);

    if depth > LENS_DEPTH_THRESHOLD {
        let dist_sq = x * x + y * y;
        let magnitude = (-dist_sq / LENS_FALLOFF).exp();
        let warp = LENS_WARP_STRENGTH * (depth / 400.0 + 0.5);
        y += sign_nonzero(y) * warp * magnitude;
        x *= 1.0 + LENS_STRETCH * magnitude;
    }

    finish(x, y, depth, viewport, fov)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn camera(rx: f32, ry: f32) -> Camera {
        Camera {
            rotation_x: rx,
            rotation_y: ry,
            zoom: 1.0,
        }
    }

    /// Any point at depth >= -fov + 1 yields positive scale and finite coordinates.
    #[test]
    fn test_scale_positive_and_finite() {
        let mut rng = StdRng::seed_from_u64(7);
        let fov = 700.0;
        let viewport = Viewport::default();
        for _ in 0..2000 {
            let cam = camera(rng.gen_range(-1.5..1.5), rng.gen_range(-6.0..6.0));
            let p = Vec3::new(
                rng.gen_range(-5000.0..5000.0),
                rng.gen_range(-5000.0..5000.0),
                rng.gen_range(-5000.0..5000.0),
            );
            let proj = project(p, &cam, viewport, fov);
            if proj.depth >= -fov + 1.0 {
                assert!(proj.scale > 0.0);
                assert!(proj.x.is_finite() && proj.y.is_finite());
            }
        }
    }

    /// Points behind the eye hit the denominator floor instead of flipping sign.
    #[test]
    fn test_behind_camera_clamped() {
        let fov = 650.0;
        let proj = project(Vec3::new(10.0, 10.0, -5000.0), &camera(0.0, 0.0), Viewport::default(), fov);
        assert_eq!(proj.scale, fov);
        assert!(proj.x.is_finite());
    }

    /// With zero rotation, a zero-depth point maps to center + (x, y) * scale.
    #[test]
    fn test_identity_maps_to_center_offset() {
        let viewport = Viewport::new(800.0, 600.0);
        let proj = project(Vec3::new(25.0, -40.0, 0.0), &camera(0.0, 0.0), viewport, 700.0);
        assert_eq!(proj.scale, 1.0);
        assert_eq!(proj.x, 400.0 + 25.0);
        assert_eq!(proj.y, 300.0 - 40.0);

        let origin = project(Vec3::ZERO, &camera(0.0, 0.0), viewport, 700.0);
        assert_eq!((origin.x, origin.y), (400.0, 300.0));
    }

    /// A screen offset moves the anchor's projection by exactly that many pixels.
    #[test]
    fn test_screen_offset_tracks_pointer() {
        let mut rng = StdRng::seed_from_u64(4);
        for _ in 0..200 {
            let view = View::new(
                camera(rng.gen_range(-1.2..1.2), rng.gen_range(-3.0..3.0)),
                Viewport::default(),
                700.0,
            );
            let anchor = Vec3::new(
                rng.gen_range(-200.0..200.0),
                rng.gen_range(-200.0..200.0),
                rng.gen_range(-200.0..200.0),
            );
            let before = view.project(anchor);
            let after = view.project(anchor + view.screen_offset(anchor, 12.0, -7.0));
            assert!((after.x - before.x - 12.0).abs() < 1e-2);
            assert!((after.y - before.y + 7.0).abs() < 1e-2);
            assert!((after.depth - before.depth).abs() < 1e-2);
        }
    }

    /// Lensing pushes points near the axis outward and leaves far-behind points alone.
    #[test]
    fn test_lensing_displaces_near_axis() {
        let cam = camera(0.0, 0.0);
        let viewport = Viewport::default();
        let plain = project(Vec3::new(5.0, 5.0, 0.0), &cam, viewport, 650.0);
        let lensed = project_lensed(Vec3::new(5.0, 5.0, 0.0), &cam, viewport, 650.0);
        assert!(lensed.y > plain.y);
        assert!(lensed.x > plain.x);

        let behind = Vec3::new(5.0, 5.0, -200.0);
        assert_eq!(
            project(behind, &cam, viewport, 650.0),
            project_lensed(behind, &cam, viewport, 650.0)
        );
    }

    /// A wide window letterboxes horizontally and maps back exactly.
    #[test]
    fn test_letterbox_round_trip() {
        let fit = Letterbox::fit(Viewport::default(), Viewport::new(1360.0, 768.0));
        assert!((fit.scale - 1.28).abs() < 1e-6);
        assert!((fit.offset_x - 168.0).abs() < 1e-3);
        assert_eq!(fit.offset_y, 0.0);
        let (wx, wy) = fit.to_window(400.0, 300.0);
        assert!((wx - 680.0).abs() < 1e-3 && (wy - 384.0).abs() < 1e-3);
        let (nx, ny) = fit.to_nominal(wx, wy);
        assert!((nx - 400.0).abs() < 1e-3 && (ny - 300.0).abs() < 1e-3);
    }

    #[test]
    fn test_lensing_deterministic() {
        let cam = camera(0.4, -0.4);
        let p = Vec3::new(120.0, -30.0, 44.0);
        let a = project_lensed(p, &cam, Viewport::default(), 650.0);
        let b = project_lensed(p, &cam, Viewport::default(), 650.0);
        assert_eq!(a, b);
    }
}
