//! Eased interpolation toward a single collapsed target.

use rand::rngs::StdRng;

use super::UpdateRule;
use crate::entity::{EntityId, EntityKind, EntityStore};
use crate::math::{Vec3, ease_cubic};
use crate::scheduler::NOMINAL_STEP;

/// Moves every matching entity from its `origin` toward one target position.
///
/// Progress runs from 0 to 1 over `duration` seconds of scene time. Position is
/// `origin + (target - origin) * progress³`. When progress reaches 1 every entity
/// except the target is hidden and [`CollapseInterpolation::is_complete`] turns true.
#[derive(Debug, Clone)]
pub struct CollapseInterpolation {
    pub kind: EntityKind,
    /// Scene seconds from start to collapse.
    pub duration: f32,
    progress: f32,
    target: Option<(EntityId, Vec3)>,
}

impl CollapseInterpolation {
    pub fn new(kind: EntityKind, duration: f32) -> Self {
        Self {
            kind,
            duration: duration.max(NOMINAL_STEP),
            progress: 0.0,
            target: None,
        }
    }

    /// Starts a collapse onto `target`. Ignored while one is already running.
    pub fn begin(&mut self, target: EntityId, position: Vec3) {
        if self.target.is_none() {
            self.target = Some((target, position));
            self.progress = 0.0;
        }
    }

    pub fn is_active(&self) -> bool {
        self.target.is_some() && !self.is_complete()
    }

    pub fn is_complete(&self) -> bool {
        self.target.is_some() && self.progress >= 1.0
    }

    pub fn progress(&self) -> f32 {
        self.progress
    }

    pub fn target(&self) -> Option<EntityId> {
        self.target.map(|(id, _)| id)
    }

    /// Back to the uncollapsed state.
    pub fn reset(&mut self) {
        self.progress = 0.0;
        self.target = None;
    }
}

impl UpdateRule for CollapseInterpolation {
    fn apply(&mut self, entities: &mut EntityStore, step: f32, _rng: &mut StdRng) {
        let Some((target_id, target)) = self.target else {
            return;
        };
        if self.progress >= 1.0 {
            return;
        }
        self.progress = (self.progress + step * NOMINAL_STEP / self.duration).min(1.0);
        let eased = ease_cubic(self.progress);

        for entity in entities.iter_mut().filter(|e| e.kind == self.kind) {
            entity.position = entity.origin.lerp(&target, eased);
            if self.progress >= 1.0 && entity.id != target_id {
                entity.visible = false;
            }
        }
        if self.progress >= 1.0 {
            log::debug!("collapse onto {:?} complete", target_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Entity;
    use rand::SeedableRng;

    /// Once progress reaches 1 every entity sits exactly on the target.
    #[test]
    fn test_collapse_reaches_target() {
        let mut store = EntityStore::new();
        let a = store
            .insert(Entity::new(EntityKind::Orbital, Vec3::new(60.0, -10.0, 5.0)))
            .expect("inserted");
        let b = store
            .insert(Entity::new(EntityKind::Orbital, Vec3::new(-40.0, 25.0, 80.0)))
            .expect("inserted");
        let target = store.get(b).map(|e| e.position).unwrap_or_default();

        let mut rule = CollapseInterpolation::new(EntityKind::Orbital, 1.2);
        rule.begin(b, target);
        let mut rng = StdRng::seed_from_u64(0);
        let mut ticks = 0;
        while !rule.is_complete() {
            rule.apply(&mut store, 1.0, &mut rng);
            ticks += 1;
            assert!(ticks < 1000);
        }
        assert!((74..=77).contains(&ticks));

        let moved = store.get(a).expect("present");
        assert!(moved.position.distance(&target) < 1e-5);
        assert!(!moved.visible);
        assert!(store.get(b).map(|e| e.visible).unwrap_or(false));
    }

    /// Without a target nothing moves.
    #[test]
    fn test_idle_without_target() {
        let mut store = EntityStore::new();
        let id = store
            .insert(Entity::new(EntityKind::Orbital, Vec3::new(1.0, 2.0, 3.0)))
            .expect("inserted");
        let mut rule = CollapseInterpolation::new(EntityKind::Orbital, 1.2);
        rule.apply(&mut store, 1.0, &mut StdRng::seed_from_u64(0));
        assert_eq!(store.get(id).map(|e| e.position), Some(Vec3::new(1.0, 2.0, 3.0)));
        assert!(!rule.is_active());
    }
}
