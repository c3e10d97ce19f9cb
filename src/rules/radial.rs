//! Infall rules: free radial collapse and a rotating accretion disk.

use rand::Rng;
use rand::rngs::StdRng;

use super::UpdateRule;
use crate::entity::{EntityKind, EntityStore};
use crate::math::{Vec3, floor_denominator};

/// Pulls entities toward the origin with acceleration `pull / distance` along the
/// position vector, integrated with explicit Euler.
///
/// Entities inside `hot_radius` get `activation = 1`, everything else `0`; the
/// renderer reads this to recolor the core.
#[derive(Debug, Clone)]
pub struct RadialCollapse {
    pub kind: EntityKind,
    pub pull: f32,
    pub hot_radius: f32,
}

impl RadialCollapse {
    pub fn new(kind: EntityKind, pull: f32, hot_radius: f32) -> Self {
        Self {
            kind,
            pull,
            hot_radius,
        }
    }
}

impl UpdateRule for RadialCollapse {
    fn apply(&mut self, entities: &mut EntityStore, step: f32, _rng: &mut StdRng) {
        for entity in entities.iter_mut().filter(|e| e.kind == self.kind) {
            let distance = entity.position.length();
            let denom = floor_denominator(distance, 1.0);
            let accel = entity.position * (-self.pull / denom);
            entity.velocity += accel * step;
            entity.position += entity.velocity * step;
            entity.activation = if distance < self.hot_radius { 1.0 } else { 0.0 };
        }
    }
}

/// Keplerian-ish disk in the XZ plane with a constant radial drift inward.
///
/// Each tick the tangential speed is recomputed from `sqrt(keplerian / r)` plus a
/// small random perturbation. Entities that fall inside `inner_radius` respawn on
/// the `respawn_radius` ring at a random angle.
#[derive(Debug, Clone)]
pub struct Accretion {
    pub kind: EntityKind,
    pub keplerian: f32,
    pub noise: f32,
    pub infall: f32,
    pub inner_radius: f32,
    pub respawn_radius: f32,
}

impl Default for Accretion {
    fn default() -> Self {
        Self {
            kind: EntityKind::Dust,
            keplerian: 2000.0,
            noise: 0.25,
            infall: 0.5,
            inner_radius: 20.0,
            respawn_radius: 300.0,
        }
    }
}

impl UpdateRule for Accretion {
    fn apply(&mut self, entities: &mut EntityStore, step: f32, rng: &mut StdRng) {
        for entity in entities.iter_mut().filter(|e| e.kind == self.kind) {
            let p = entity.position;
            let r = floor_denominator(p.planar_length(), 1.0);
            let angle = p.z.atan2(p.x);
            let speed = (self.keplerian / r).sqrt();

            entity.velocity = Vec3::new(
                -angle.sin() * speed + rng.gen_range(-self.noise..=self.noise),
                0.0,
                angle.cos() * speed + rng.gen_range(-self.noise..=self.noise),
            );
            let inward = Vec3::new(p.x / r, 0.0, p.z / r) * self.infall;
            entity.position += (entity.velocity - inward) * step;

            if r < self.inner_radius {
                let respawn = rng.gen_range(0.0..std::f32::consts::TAU);
                entity.position.x = respawn.cos() * self.respawn_radius;
                entity.position.z = respawn.sin() * self.respawn_radius;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Entity;
    use rand::SeedableRng;

    /// A resting entity starts falling straight toward the origin.
    #[test]
    fn test_radial_collapse_moves_inward() {
        let mut store = EntityStore::new();
        let id = store
            .insert(Entity::new(EntityKind::Dust, Vec3::new(300.0, 0.0, 0.0)))
            .expect("inserted");
        let mut rule = RadialCollapse::new(EntityKind::Dust, 0.1, 100.0);
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..10 {
            rule.apply(&mut store, 1.0, &mut rng);
        }
        let e = store.get(id).expect("present");
        assert!(e.position.x < 300.0);
        assert_eq!(e.position.y, 0.0);
        assert_eq!(e.activation, 0.0);
    }

    /// An entity sitting exactly on the origin stays finite.
    #[test]
    fn test_radial_collapse_at_origin() {
        let mut store = EntityStore::new();
        let id = store
            .insert(Entity::new(EntityKind::Dust, Vec3::ZERO))
            .expect("inserted");
        let mut rule = RadialCollapse::new(EntityKind::Dust, 0.1, 100.0);
        rule.apply(&mut store, 1.0, &mut StdRng::seed_from_u64(1));
        let e = store.get(id).expect("present");
        assert!(e.position.is_finite());
        assert_eq!(e.activation, 1.0);
    }

    /// Disk particles that reach the core respawn on the outer ring.
    #[test]
    fn test_accretion_respawn() {
        let mut store = EntityStore::new();
        let id = store
            .insert(Entity::new(EntityKind::Dust, Vec3::new(10.0, 0.0, 0.0)))
            .expect("inserted");
        let mut rule = Accretion::default();
        rule.apply(&mut store, 1.0, &mut StdRng::seed_from_u64(3));
        let r = store.get(id).map(|e| e.position.planar_length()).unwrap_or(0.0);
        assert!((r - 300.0).abs() < 1e-2);
    }

    #[test]
    fn test_rules_tolerate_empty_store() {
        let mut store = EntityStore::new();
        let mut rng = StdRng::seed_from_u64(0);
        RadialCollapse::new(EntityKind::Dust, 0.1, 100.0).apply(&mut store, 1.0, &mut rng);
        Accretion::default().apply(&mut store, 1.0, &mut rng);
        assert!(store.is_empty());
    }
}
