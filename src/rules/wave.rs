//! Analytic spacetime-grid displacement.
//!
//! The grid never stores velocity. Every tick the vertical offset of each lattice
//! sample is recomputed from the field's phase accumulator and the current
//! source positions.

use crate::math::{Vec3, floor_denominator};
use crate::mesh::{self, Mesh, Region};

/// A gravity well dragging the grid down around a moving mass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveSource {
    pub position: Vec3,
    /// Numerator of the `depth / (d + softening)` well.
    pub depth: f32,
    pub softening: f32,
}

impl WaveSource {
    pub fn well(position: Vec3) -> Self {
        Self {
            position,
            depth: 1500.0,
            softening: 40.0,
        }
    }
}

/// Displacement model for the spacetime lattice.
#[derive(Debug, Clone, PartialEq)]
pub enum WaveField {
    /// Quadrupole spiral radiated by an orbiting pair, plus one well per source.
    Inspiral {
        phase: f32,
        amplitude: f32,
        sources: Vec<WaveSource>,
    },
    /// A single outgoing wave packet centered at `radius` from the origin.
    Packet { radius: f32 },
}

impl WaveField {
    /// Vertical offset of the sample at `(x, z)`.
    pub fn displacement(&self, x: f32, z: f32) -> f32 {
        let d = (x * x + z * z).sqrt();
        match self {
            WaveField::Inspiral {
                phase,
                amplitude,
                sources,
            } => {
                let angle = z.atan2(x);
                let wave = (d * 0.035 - phase * 8.0 + angle * 2.0).sin() * (amplitude * 15.0);
                let mut y = wave * (-d / 600.0).exp();
                for source in sources {
                    let dx = x - source.position.x;
                    let dz = z - source.position.z;
                    let local = (dx * dx + dz * dz).sqrt();
                    y -= source.depth / floor_denominator(local + source.softening, 1.0);
                }
                y
            }
            WaveField::Packet { radius } => {
                let offset = d - radius;
                let packet = (offset * 0.15).sin() * 100.0;
                let envelope = (-(offset.abs() / 60.0).powi(2)).exp();
                let dissipation = 250.0 / (d + 50.0);
                packet * envelope * dissipation
            }
        }
    }

    /// Samples the field over a square lattice of `(2 * half + 1)²` points.
    pub fn grid(&self, half: i32, step: f32) -> Mesh {
        let mut mesh = mesh::lattice(half, step, false, |x, z| self.displacement(x, z));
        for line in mesh.loops.iter_mut() {
            line.region = Region::Field;
        }
        mesh
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Sources pull the grid down beneath them.
    #[test]
    fn test_inspiral_wells() {
        let field = WaveField::Inspiral {
            phase: 0.0,
            amplitude: 0.0,
            sources: vec![WaveSource::well(Vec3::new(90.0, 0.0, 0.0))],
        };
        let near = field.displacement(90.0, 0.0);
        let far = field.displacement(-800.0, 0.0);
        assert!(near < far);
        assert!((near + 1500.0 / 40.0).abs() < 1e-3);
    }

    /// An unsoftened well directly under a sample still gives a finite depth.
    #[test]
    fn test_unsoftened_well_floored() {
        let source = WaveSource {
            softening: 0.0,
            ..WaveSource::well(Vec3::ZERO)
        };
        let field = WaveField::Inspiral {
            phase: 0.0,
            amplitude: 0.0,
            sources: vec![source],
        };
        let depth = field.displacement(0.0, 0.0);
        assert!(depth.is_finite());
        assert!((depth + 1500.0).abs() < 1e-3);
    }

    /// The packet is negligible far from its front.
    #[test]
    fn test_packet_localised() {
        let field = WaveField::Packet { radius: 400.0 };
        assert!(field.displacement(1200.0, 0.0).abs() < 1e-6);
        assert!(field.displacement(0.0, 0.0).abs() < 1e-6);
        let peak = (380..420)
            .map(|d| field.displacement(d as f32, 0.0).abs())
            .fold(0.0f32, f32::max);
        assert!(peak > 1.0);
    }

    #[test]
    fn test_grid_dimensions() {
        let grid = WaveField::Packet { radius: 0.0 }.grid(18, 45.0);
        assert_eq!(grid.loop_count(), 37);
        assert_eq!(grid.point_count(), 37 * 37);
        assert!(grid.iter().all(|l| l.region == Region::Field));
    }
}
