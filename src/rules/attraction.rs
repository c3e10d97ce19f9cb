//! Pairwise gravitational attraction and inflationary expansion.

use rand::rngs::StdRng;

use super::UpdateRule;
use crate::entity::{EntityKind, EntityStore};
use crate::math::Vec3;

/// O(n²) softened attraction between every pair of matching entities.
///
/// Mass is read from `metadata`. For each pair the acceleration on `a` is
/// `d * (mass_b * constant) / (|d|² + softening)` with `d = b - a`. All
/// accelerations are computed from the pre-tick positions before any entity moves.
#[derive(Debug, Clone)]
pub struct PairwiseAttraction {
    pub kind: EntityKind,
    pub constant: f32,
    pub softening: f32,
}

impl PairwiseAttraction {
    pub fn new(kind: EntityKind, constant: f32, softening: f32) -> Self {
        Self {
            kind,
            constant,
            softening: softening.max(crate::math::MIN_DENOMINATOR),
        }
    }

    /// Accelerations for `bodies` as `(position, mass)` pairs.
    pub fn accelerations(&self, bodies: &[(Vec3, f32)]) -> Vec<Vec3> {
        let mut accel = vec![Vec3::ZERO; bodies.len()];
        for (i, (position, _)) in bodies.iter().enumerate() {
            for (j, (other, mass)) in bodies.iter().enumerate() {
                if i == j {
                    continue;
                }
                let d = *other - *position;
                let f = mass * self.constant / (d.length_squared() + self.softening);
                accel[i] += d * f;
            }
        }
        accel
    }
}

impl UpdateRule for PairwiseAttraction {
    fn apply(&mut self, entities: &mut EntityStore, step: f32, _rng: &mut StdRng) {
        let bodies: Vec<(Vec3, f32)> = entities
            .of_kind(self.kind)
            .map(|e| (e.position, e.metadata))
            .collect();
        if bodies.len() < 2 {
            return;
        }
        let accel = self.accelerations(&bodies);

        let matching = entities.iter_mut().filter(|e| e.kind == self.kind);
        for (entity, a) in matching.zip(accel) {
            entity.velocity += a * step;
            entity.position += entity.velocity * step;
        }
    }
}

/// Scales positions away from the origin by a constant factor per tick.
///
/// Expansion stops for entities past `limit` so coordinates stay finite.
#[derive(Debug, Clone)]
pub struct InflationScale {
    pub kind: EntityKind,
    pub factor: f32,
    pub limit: f32,
}

impl Default for InflationScale {
    fn default() -> Self {
        Self {
            kind: EntityKind::Quantum,
            factor: 1.05,
            limit: 20_000.0,
        }
    }
}

impl UpdateRule for InflationScale {
    fn apply(&mut self, entities: &mut EntityStore, step: f32, _rng: &mut StdRng) {
        let factor = self.factor.powf(step);
        for entity in entities.iter_mut().filter(|e| e.kind == self.kind) {
            if entity.position.length() < self.limit {
                entity.position *= factor;
            }
        }
    }
}
