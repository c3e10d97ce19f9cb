//! Closed-form circular orbits.

use rand::rngs::StdRng;

use super::UpdateRule;
use crate::entity::{EntityKind, EntityStore};
use crate::math::{Vec3, floor_denominator};

/// Days in one Earth year; periods are expressed relative to it.
pub const EARTH_YEAR_DAYS: f32 = 365.2;

/// Advances a shared orbital clock and places every matching entity on its circle.
///
/// Positions are read off the circle each tick rather than integrated, so orbits
/// never drift. The orbit radius is the planar length of the entity's `origin`
/// and its period in days is `metadata`.
#[derive(Debug, Clone)]
pub struct OrbitalAdvance {
    pub kind: EntityKind,
    /// Orbital clock in scene units.
    pub clock: f32,
    /// Clock advance per unit step.
    pub rate: f32,
}

impl Default for OrbitalAdvance {
    fn default() -> Self {
        Self {
            kind: EntityKind::Planet,
            clock: 0.0,
            rate: 0.05,
        }
    }
}

impl OrbitalAdvance {
    /// Orbital angle reached at `clock` for a body with the given period.
    pub fn angle_at(clock: f32, period_days: f32) -> f32 {
        clock / floor_denominator(period_days / EARTH_YEAR_DAYS, 1e-3) * 0.1
    }

    /// Point on a circle of `radius` in the XZ plane.
    pub fn position_at(radius: f32, angle: f32) -> Vec3 {
        Vec3::new(angle.cos() * radius, 0.0, angle.sin() * radius)
    }

    /// Re-places entities for the current clock without advancing it.
    pub fn place(&self, entities: &mut EntityStore) {
        for entity in entities.iter_mut().filter(|e| e.kind == self.kind) {
            let angle = Self::angle_at(self.clock, entity.metadata);
            entity.phase = angle;
            entity.position = Self::position_at(entity.origin.planar_length(), angle);
        }
    }
}

impl UpdateRule for OrbitalAdvance {
    fn apply(&mut self, entities: &mut EntityStore, step: f32, _rng: &mut StdRng) {
        self.clock += self.rate * step;
        self.place(entities);
    }
}
