//! Procedural scaffolds: shells, rings, lattices and detector cylinders.
//!
//! Everything here is built once per scene reset and then read by the renderer
//! without mutation. A [`Mesh`] is an ordered list of [`Polyline`]s; each polyline
//! carries a coarse [`Region`] label used only for coloring.
//!
//! Generators sample closed-form surfaces with integer step counts, so the number of
//! loops and points depends only on the parameters. The one random component (the
//! optional shell jitter) draws from a caller-supplied RNG.

use rand::Rng;

use crate::color::Color;
use crate::math::Vec3;

/// Coarse label attached to mesh loops and neurons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    Frontal,
    Parietal,
    Temporal,
    Occipital,
    Cerebellum,
    /// Planetary orbit path.
    Orbit,
    /// Spacetime or granulation lattice.
    Lattice,
    /// Detector layer, innermost first.
    Detector(u8),
    /// Magnetic field line.
    Field,
}

impl Region {
    /// The five cortical regions in generation order.
    pub const CORTICAL: [Region; 5] = [
        Region::Frontal,
        Region::Parietal,
        Region::Temporal,
        Region::Occipital,
        Region::Cerebellum,
    ];

    /// Labels a point on the cerebral shell.
    ///
    /// Checks run in order: back of the head, front, top, sides.
    pub fn classify_shell_point(point: Vec3) -> Region {
        if point.y > 100.0 {
            Region::Occipital
        } else if point.z < -30.0 {
            Region::Frontal
        } else if point.z > 80.0 {
            Region::Parietal
        } else if point.x.abs() > 100.0 {
            Region::Temporal
        } else {
            Region::Frontal
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Region::Frontal => "Frontal",
            Region::Parietal => "Parietal",
            Region::Temporal => "Temporal",
            Region::Occipital => "Occipital",
            Region::Cerebellum => "Cerebellum",
            Region::Orbit => "Orbit",
            Region::Lattice => "Lattice",
            Region::Detector(_) => "Detector",
            Region::Field => "Field",
        }
    }

    /// What the region is known for, shown when a neuron is selected.
    pub fn function(&self) -> &'static str {
        match self {
            Region::Frontal => "Executive Planning",
            Region::Parietal => "Sensory Integration",
            Region::Temporal => "Auditory Processing",
            Region::Occipital => "Visual Synthesis",
            Region::Cerebellum => "Motor Coordination",
            _ => "",
        }
    }

    pub fn color(&self) -> Color {
        match self {
            Region::Frontal => Color::hex(0x3b82f6),
            Region::Parietal => Color::hex(0xfbbf24),
            Region::Temporal => Color::hex(0x4ade80),
            Region::Occipital => Color::hex(0xf87171),
            Region::Cerebellum => Color::hex(0xc084fc),
            Region::Orbit => Color::rgb8(255, 255, 255, 0.08),
            Region::Lattice => Color::rgb8(96, 165, 250, 0.3),
            Region::Detector(0) => Color::rgb8(71, 85, 105, 0.1),
            Region::Detector(1) => Color::rgb8(6, 182, 212, 0.04),
            Region::Detector(2) => Color::rgb8(249, 115, 22, 0.03),
            Region::Detector(_) => Color::rgb8(148, 163, 184, 0.08),
            Region::Field => Color::hex(0x38bdf8).with_alpha(0.6),
        }
    }
}

/// An ordered point loop.
#[derive(Debug, Clone, PartialEq)]
pub struct Polyline {
    pub points: Vec<Vec3>,
    pub region: Region,
    /// Whether the renderer should connect the last point back to the first.
    pub closed: bool,
}

impl Polyline {
    pub fn open(points: Vec<Vec3>, region: Region) -> Self {
        Self {
            points,
            region,
            closed: false,
        }
    }

    pub fn closed(points: Vec<Vec3>, region: Region) -> Self {
        Self {
            points,
            region,
            closed: true,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// A static scaffold built once per reset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub loops: Vec<Polyline>,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, line: Polyline) {
        if !line.is_empty() {
            self.loops.push(line);
        }
    }

    pub fn extend(&mut self, other: Mesh) {
        self.loops.extend(other.loops);
    }

    pub fn loop_count(&self) -> usize {
        self.loops.len()
    }

    pub fn point_count(&self) -> usize {
        self.loops.iter().map(Polyline::len).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Polyline> {
        self.loops.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.loops.is_empty()
    }
}

/// Samples `start, start + step, ...` up to and including `end`.
///
/// Uses an integer count so the sample count never depends on float accumulation.
pub fn inclusive_steps(start: f32, end: f32, step: f32) -> impl Iterator<Item = f32> {
    let count = if step > 0.0 && end >= start {
        ((end - start) / step + 1e-4).floor() as usize + 1
    } else {
        0
    };
    (0..count).map(move |i| start + i as f32 * step)
}

/// Samples `start, start + step, ...` strictly below `end`.
pub fn exclusive_steps(start: f32, end: f32, step: f32) -> impl Iterator<Item = f32> {
    let count = if step > 0.0 && end > start {
        ((end - start) / step - 1e-4).ceil() as usize
    } else {
        0
    };
    (0..count).map(move |i| start + i as f32 * step)
}

/// Parameters for the cortical shell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShellParams {
    /// Half-width of each hemisphere.
    pub radius_x: f32,
    /// Front-to-back half-length.
    pub radius_y: f32,
    /// Vertical half-height.
    pub radius_z: f32,
    /// Amplitude of the gyrus ripple on latitude loops.
    pub wrinkle: f32,
    /// Uniform random offset added to every point; zero disables it.
    pub jitter: f32,
}

impl Default for ShellParams {
    fn default() -> Self {
        Self {
            radius_x: 150.0,
            radius_y: 180.0,
            radius_z: 160.0,
            wrinkle: 6.0,
            jitter: 0.0,
        }
    }
}

/// Builds the two-hemisphere cortex plus the cerebellum.
///
/// Per hemisphere: latitude loops for `z` in `[-140, 180]` step 20 (angle step 0.15
/// over `[0, π]`) and longitude loops for angle in `[0, π)` step 0.3 (`z` step 15).
/// The cerebellum adds loops over `[0, 2π]` step 0.6.
pub fn brain_shell<R: Rng + ?Sized>(params: &ShellParams, rng: &mut R) -> Mesh {
    let mut mesh = Mesh::new();
    let mut jitter = |p: Vec3| -> Vec3 {
        if params.jitter > 0.0 {
            let j = params.jitter;
            p + Vec3::new(
                rng.gen_range(-j..=j),
                rng.gen_range(-j..=j),
                rng.gen_range(-j..=j),
            )
        } else {
            p
        }
    };

    let extent = |z: f32| -> (f32, f32) {
        let norm_z = (z - 20.0) / params.radius_z;
        let falloff = (1.0 - norm_z * norm_z).max(0.0).sqrt();
        (falloff * params.radius_x, falloff * params.radius_y)
    };

    for side in [-1.0f32, 1.0] {
        for z in inclusive_steps(-140.0, 180.0, 20.0) {
            let (width, length) = extent(z);
            let mut points = Vec::new();
            let mut regions = Vec::new();
            for angle in inclusive_steps(0.0, std::f32::consts::PI, 0.15) {
                let y = angle.cos() * length - 10.0;
                let x = side * (angle.sin() * width + 10.0);
                let gyrus = (angle * 10.0).sin() * (z * 0.1).cos() * params.wrinkle;
                regions.push(Region::classify_shell_point(Vec3::new(x, y, z)));
                points.push(jitter(Vec3::new(x + gyrus, y + gyrus, z)));
            }
            mesh.push(Polyline::open(points, dominant(&regions)));
        }

        for angle in exclusive_steps(0.0, std::f32::consts::PI, 0.3) {
            let mut points = Vec::new();
            let mut regions = Vec::new();
            for z in inclusive_steps(-140.0, 180.0, 15.0) {
                let (width, length) = extent(z);
                let y = angle.cos() * length - 10.0;
                let x = side * (angle.sin() * width + 10.0);
                let p = Vec3::new(x, y, z);
                regions.push(Region::classify_shell_point(p));
                points.push(jitter(p));
            }
            mesh.push(Polyline::open(points, dominant(&regions)));
        }
    }

    let r = 70.0;
    for angle in inclusive_steps(0.0, std::f32::consts::TAU, 0.6) {
        let points = inclusive_steps(0.0, std::f32::consts::PI, 0.25)
            .map(|ring| {
                jitter(Vec3::new(
                    ring.sin() * angle.cos() * r,
                    ring.sin() * angle.sin() * (r * 0.8) + 120.0,
                    ring.cos() * (r * 0.7) - 110.0,
                ))
            })
            .collect();
        mesh.push(Polyline::open(points, Region::Cerebellum));
    }

    mesh
}

/// Most frequent label in a loop; ties go to the earliest.
fn dominant(regions: &[Region]) -> Region {
    let mut best = Region::Frontal;
    let mut best_count = 0;
    for candidate in regions {
        let count = regions.iter().filter(|r| *r == candidate).count();
        if count > best_count {
            best = *candidate;
            best_count = count;
        }
    }
    best
}

/// Concentric circles in the XZ plane, sampled every `step` radians.
pub fn orbit_rings(radii: &[f32], step: f32) -> Mesh {
    let mut mesh = Mesh::new();
    for &radius in radii {
        let points = exclusive_steps(0.0, std::f32::consts::TAU, step)
            .map(|a| Vec3::new(a.cos() * radius, 0.0, a.sin() * radius))
            .collect();
        mesh.push(Polyline::closed(points, Region::Orbit));
    }
    mesh
}

/// Square lattice in the XZ plane spanning `[-half, half]` cells of size `step`.
///
/// Rows run along Z for each X; with `both_axes` the columns are emitted as well.
/// `height` gives the Y displacement for each `(x, z)` sample.
pub fn lattice<F>(half: i32, step: f32, both_axes: bool, height: F) -> Mesh
where
    F: Fn(f32, f32) -> f32,
{
    let mut mesh = Mesh::new();
    for i in -half..=half {
        let row = (-half..=half)
            .map(|j| {
                let (x, z) = (i as f32 * step, j as f32 * step);
                Vec3::new(x, height(x, z), z)
            })
            .collect();
        mesh.push(Polyline::open(row, Region::Lattice));
        if both_axes {
            let column = (-half..=half)
                .map(|j| {
                    let (x, z) = (j as f32 * step, i as f32 * step);
                    Vec3::new(x, height(x, z), z)
                })
                .collect();
            mesh.push(Polyline::open(column, Region::Lattice));
        }
    }
    mesh
}

/// One calorimeter layer: `radius` and full `height` along Y.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cylinder {
    pub radius: f32,
    pub height: f32,
}

/// Wireframe cylinders: a top ring, a bottom ring and one vertical strut per segment.
pub fn calorimeter(layers: &[Cylinder], segments: usize) -> Mesh {
    let mut mesh = Mesh::new();
    for (layer_index, layer) in layers.iter().enumerate() {
        let region = Region::Detector(layer_index.min(u8::MAX as usize) as u8);
        let half = layer.height / 2.0;
        let corner = |i: usize, y: f32| {
            let a = i as f32 / segments as f32 * std::f32::consts::TAU;
            Vec3::new(a.cos() * layer.radius, y, a.sin() * layer.radius)
        };

        mesh.push(Polyline::closed(
            (0..segments).map(|i| corner(i, half)).collect(),
            region,
        ));
        mesh.push(Polyline::closed(
            (0..segments).map(|i| corner(i, -half)).collect(),
            region,
        ));
        for i in 0..segments {
            mesh.push(Polyline::open(vec![corner(i, -half), corner(i, half)], region));
        }
    }
    mesh
}

/// Arched field lines above the photosphere, sampled as quadratic-ish Bézier curves.
///
/// Loop `k` spans 150 units starting at `origin_x + k * spacing`; the apex height
/// breathes with `time`.
pub fn field_loops(count: usize, origin_x: f32, spacing: f32, time: f32) -> Mesh {
    let mut mesh = Mesh::new();
    for k in 0..count {
        let ox = origin_x + k as f32 * spacing;
        let p0 = Vec3::new(ox, 0.0, 0.0);
        let p1 = Vec3::new(ox + 50.0, -200.0 - time.sin() * 50.0, 0.0);
        let p2 = Vec3::new(ox + 100.0, -200.0, 0.0);
        let p3 = Vec3::new(ox + 150.0, 0.0, 0.0);
        let points = inclusive_steps(0.0, 1.0, 0.05)
            .map(|t| {
                let u = 1.0 - t;
                p0 * (u * u * u) + p1 * (3.0 * u * u * t) + p2 * (3.0 * u * t * t) + p3 * (t * t * t)
            })
            .collect();
        mesh.push(Polyline::open(points, Region::Field));
    }
    mesh
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_step_counts() {
        assert_eq!(inclusive_steps(-140.0, 180.0, 20.0).count(), 17);
        assert_eq!(inclusive_steps(0.0, std::f32::consts::PI, 0.15).count(), 21);
        assert_eq!(exclusive_steps(0.0, std::f32::consts::PI, 0.3).count(), 11);
        assert_eq!(exclusive_steps(0.0, std::f32::consts::TAU, 0.1).count(), 63);
        assert_eq!(inclusive_steps(1.0, 0.0, 0.1).count(), 0);
    }

    /// Two hemispheres of 17 latitudes + 11 longitudes, plus 11 cerebellum loops.
    #[test]
    fn test_brain_shell_structure() {
        let mut rng = StdRng::seed_from_u64(1);
        let mesh = brain_shell(&ShellParams::default(), &mut rng);
        assert_eq!(mesh.loop_count(), 2 * (17 + 11) + 11);

        let latitude_points = mesh.loops[0].len();
        assert_eq!(latitude_points, 21);
        let longitude_points = mesh.loops[17].len();
        assert_eq!(longitude_points, 22);
        assert!(
            mesh.iter()
                .filter(|l| l.region == Region::Cerebellum)
                .all(|l| l.len() == 13)
        );
    }

    /// Regeneration with the same parameters is identical when jitter is off, and
    /// keeps the same shape when it is on.
    #[test]
    fn test_brain_shell_idempotent() {
        let params = ShellParams::default();
        let a = brain_shell(&params, &mut StdRng::seed_from_u64(3));
        let b = brain_shell(&params, &mut StdRng::seed_from_u64(99));
        assert_eq!(a, b);

        let noisy = ShellParams {
            jitter: 2.0,
            ..params
        };
        let c = brain_shell(&noisy, &mut StdRng::seed_from_u64(3));
        let d = brain_shell(&noisy, &mut StdRng::seed_from_u64(4));
        assert_eq!(c.loop_count(), d.loop_count());
        assert_eq!(c.point_count(), d.point_count());
        assert_ne!(c, d);
    }

    #[test]
    fn test_shell_region_rules() {
        assert_eq!(Region::classify_shell_point(Vec3::new(0.0, 150.0, 0.0)), Region::Occipital);
        assert_eq!(Region::classify_shell_point(Vec3::new(0.0, 0.0, -60.0)), Region::Frontal);
        assert_eq!(Region::classify_shell_point(Vec3::new(0.0, 0.0, 120.0)), Region::Parietal);
        assert_eq!(Region::classify_shell_point(Vec3::new(130.0, 0.0, 0.0)), Region::Temporal);
        assert_eq!(Region::classify_shell_point(Vec3::new(0.0, 0.0, 0.0)), Region::Frontal);
    }

    #[test]
    fn test_orbit_rings_radius() {
        let mesh = orbit_rings(&[100.0, 250.0], 0.1);
        assert_eq!(mesh.loop_count(), 2);
        for p in &mesh.loops[1].points {
            assert!((p.planar_length() - 250.0).abs() < 1e-3);
        }
    }

    #[test]
    fn test_lattice_counts() {
        let rows = lattice(18, 45.0, false, |_, _| 0.0);
        assert_eq!(rows.loop_count(), 37);
        assert_eq!(rows.point_count(), 37 * 37);
        let grid = lattice(12, 40.0, true, |_, _| 0.0);
        assert_eq!(grid.loop_count(), 50);
    }

    #[test]
    fn test_calorimeter_counts() {
        let layers = [
            Cylinder { radius: 100.0, height: 300.0 },
            Cylinder { radius: 450.0, height: 800.0 },
        ];
        let mesh = calorimeter(&layers, 32);
        assert_eq!(mesh.loop_count(), 2 * (2 + 32));
        assert!(mesh.loops[0].closed);
    }
}
