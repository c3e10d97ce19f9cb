//! Electron probability cloud that collapses onto one eigenstate when observed.

use rand::Rng;
use rand::rngs::StdRng;

use super::{Scene, SceneAction, Tunable, depth_sorted};
use crate::color::Color;
use crate::entity::{Entity, EntityId, EntityKind, EntityStore};
use crate::math::Vec3;
use crate::mesh::{Mesh, orbit_rings};
use crate::projector::View;
use crate::renderer::draw_list::DrawList;
use crate::rules::{CollapseInterpolation, UpdateRule};

const CLOUD_SIZE: usize = 1200;
const COLLAPSE_SECONDS: f32 = 1.2;
const CYAN: Color = Color::hex(0x06b6d4);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaveState {
    Superposition,
    Collapsing,
    Collapsed,
}

pub struct SuperpositionScene {
    level: u8,
    entities: EntityStore,
    collapse: CollapseInterpolation,
    probability_ring: Mesh,
    time: f32,
}

impl SuperpositionScene {
    pub fn new(rng: &mut StdRng) -> Self {
        let mut scene = Self {
            level: 1,
            entities: EntityStore::new(),
            collapse: CollapseInterpolation::new(EntityKind::Orbital, COLLAPSE_SECONDS),
            probability_ring: Mesh::new(),
            time: 0.0,
        };
        scene.reset(rng);
        scene
    }

    pub fn state(&self) -> WaveState {
        if self.collapse.is_complete() {
            WaveState::Collapsed
        } else if self.collapse.is_active() {
            WaveState::Collapsing
        } else {
            WaveState::Superposition
        }
    }

    pub fn level(&self) -> u8 {
        self.level
    }

    /// Rebuilds the cloud for energy level `n`.
    fn generate(&mut self, rng: &mut StdRng) {
        self.collapse.reset();
        self.entities.clear();
        self.entities.insert(
            Entity::new(EntityKind::Nucleus, Vec3::ZERO)
                .with_size(3.0)
                .with_color(Color::hex(0xef4444)),
        );

        let n = self.level as f32;
        for _ in 0..CLOUD_SIZE {
            let r = 60.0 * n + rng.gen_range(-20.0..20.0) * n;
            let mut theta = (2.0 * rng.r#gen::<f32>() - 1.0).acos();
            let mut phi = rng.gen_range(0.0..std::f32::consts::TAU);
            match self.level {
                2 if rng.r#gen::<f32>() > theta.cos().abs() => {
                    let lobe = if rng.gen_bool(0.5) { 0.2 } else { 0.8 };
                    theta = lobe * std::f32::consts::PI;
                }
                3 if rng.gen_bool(0.5) => phi += (theta * 3.0).sin() * 0.5,
                _ => {}
            }
            let position = Vec3::from_spherical(r, theta, phi);
            let color = Color::hsla(180.0 + rng.r#gen::<f32>() * 40.0, 0.8, 0.6, 0.6);
            self.entities.insert(
                Entity::new(EntityKind::Orbital, position)
                    .with_phase(rng.gen_range(0.0..std::f32::consts::TAU))
                    .with_size(rng.gen_range(0.5..2.0))
                    .with_color(color),
            );
        }
        self.probability_ring = orbit_rings(&[60.0 * n], 0.2);
    }

    fn observe(&mut self, rng: &mut StdRng) -> bool {
        match self.state() {
            WaveState::Superposition => {
                let orbitals: Vec<(EntityId, Vec3)> = self
                    .entities
                    .of_kind(EntityKind::Orbital)
                    .map(|e| (e.id, e.origin))
                    .collect();
                if orbitals.is_empty() {
                    return false;
                }
                let (id, position) = orbitals[rng.gen_range(0..orbitals.len())];
                self.collapse.begin(id, position);
                log::info!("wavefunction collapsing onto {:?}", id);
                true
            }
            WaveState::Collapsing => false,
            WaveState::Collapsed => {
                self.generate(rng);
                true
            }
        }
    }

    fn draw_nucleus(&self, view: &View, list: &mut DrawList) -> (f32, f32) {
        let p = view.project(Vec3::ZERO);
        list.glow((p.x, p.y), 8.0 * p.scale, Color::hex(0xf87171));
        list.circle((p.x, p.y), 3.0 * p.scale, Color::hex(0xef4444));
        (p.x, p.y)
    }
}

impl Scene for SuperpositionScene {
    fn title(&self) -> &'static str {
        "Quantum Superposition"
    }

    fn status(&self) -> String {
        let state = match self.state() {
            WaveState::Superposition => "superposition",
            WaveState::Collapsing => "collapsing",
            WaveState::Collapsed => "collapsed",
        };
        format!("n = {} / {}", self.level, state)
    }

    fn entities(&self) -> &EntityStore {
        &self.entities
    }

    fn reset(&mut self, rng: &mut StdRng) {
        self.time = 0.0;
        self.generate(rng);
    }

    fn tick(&mut self, step: f32, rng: &mut StdRng) {
        self.time += 0.02 * step;
        self.collapse.apply(&mut self.entities, step, rng);
    }

    fn draw(&self, view: &View, _selection: Option<EntityId>, list: &mut DrawList) {
        let nucleus = self.draw_nucleus(view, list);
        let state = self.state();
        let progress = match state {
            WaveState::Superposition => 0.0,
            _ => crate::math::ease_cubic(self.collapse.progress()),
        };

        if state == WaveState::Collapsed {
            let Some(target) = self.collapse.target().and_then(|id| self.entities.get(id)) else {
                return;
            };
            let p = view.project(target.position);
            if !p.is_visible(view.fov) {
                return;
            }
            list.glow((p.x, p.y), 15.0 * p.scale, CYAN.with_alpha(0.8));
            list.circle((p.x, p.y), 4.0 * p.scale, Color::WHITE);
            let dots: Vec<(f32, f32)> = (0..=24)
                .map(|i| {
                    let t = i as f32 / 24.0;
                    (nucleus.0 + (p.x - nucleus.0) * t, nucleus.1 + (p.y - nucleus.1) * t)
                })
                .collect();
            list.dashed(&dots, 1.0, Color::WHITE.with_alpha(0.2));
            return;
        }

        let jitter_mult = 1.0 - progress;
        let base_alpha = if state == WaveState::Collapsing {
            0.4 + progress * 0.6
        } else {
            0.4
        };
        let orbitals = self.entities.of_kind(EntityKind::Orbital).map(|e| {
            let jitter = (self.time * 2.0 + e.phase).sin() * 2.0 * jitter_mult;
            (e, e.position + Vec3::new(jitter, jitter, jitter))
        });
        let mut projected: Vec<_> = orbitals
            .map(|(e, position)| (e, view.project(position)))
            .filter(|(e, p)| e.visible && p.is_visible(view.fov))
            .collect();
        projected.sort_by(|a, b| b.1.depth.total_cmp(&a.1.depth));
        for (orbital, p) in projected {
            list.circle(
                (p.x, p.y),
                orbital.size * p.scale,
                orbital.color.with_alpha((base_alpha * p.scale).min(1.0)),
            );
        }

        match state {
            WaveState::Superposition => {
                for ring in self.probability_ring.iter() {
                    list.mesh_loop(view, ring, 1.0, CYAN.with_alpha(0.05));
                }
            }
            _ if progress > 0.7 => {
                let pulse = (progress - 0.7) / 0.3;
                let target = self.collapse.target().and_then(|id| self.entities.get(id));
                if let Some((_, p)) = target.and_then(|t| depth_sorted(view, [t]).pop()) {
                    list.ring((p.x, p.y), pulse * 100.0 * p.scale, 2.0, CYAN.with_alpha(1.0 - pulse));
                }
            }
            _ => {}
        }
    }

    fn handle(&mut self, action: SceneAction, rng: &mut StdRng) -> bool {
        match action {
            SceneAction::Observe => self.observe(rng),
            SceneAction::SetLevel(level @ 1..=3) => {
                self.level = level;
                self.generate(rng);
                true
            }
            _ => false,
        }
    }

    fn tunables(&self) -> Vec<Tunable> {
        vec![Tunable::new("level n", f32::from(self.level), 1.0)]
    }

    fn tune(&mut self, index: usize, value: f32, rng: &mut StdRng) -> bool {
        let level = value.round().clamp(1.0, 3.0) as u8;
        if index != 0 {
            return false;
        }
        level == self.level || self.handle(SceneAction::SetLevel(level), rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn run_until_collapsed(scene: &mut SuperpositionScene, rng: &mut StdRng) -> usize {
        let mut ticks = 0;
        while scene.state() != WaveState::Collapsed {
            scene.tick(1.0, rng);
            ticks += 1;
            assert!(ticks < 1000, "collapse never finished");
        }
        ticks
    }

    /// Observing collapses the cloud onto a single visible orbital.
    #[test]
    fn test_observe_collapses_to_one() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut scene = SuperpositionScene::new(&mut rng);
        assert_eq!(scene.state(), WaveState::Superposition);
        assert!(scene.handle(SceneAction::Observe, &mut rng));
        assert_eq!(scene.state(), WaveState::Collapsing);
        assert!(!scene.handle(SceneAction::Observe, &mut rng));

        run_until_collapsed(&mut scene, &mut rng);
        let visible = scene
            .entities()
            .of_kind(EntityKind::Orbital)
            .filter(|e| e.visible)
            .count();
        assert_eq!(visible, 1);
    }

    /// Observing again after a collapse rebuilds the cloud.
    #[test]
    fn test_observe_after_collapse_regenerates() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut scene = SuperpositionScene::new(&mut rng);
        scene.handle(SceneAction::Observe, &mut rng);
        run_until_collapsed(&mut scene, &mut rng);
        assert!(scene.handle(SceneAction::Observe, &mut rng));
        assert_eq!(scene.state(), WaveState::Superposition);
        assert!(scene.entities().iter().all(|e| e.visible));
    }

    /// Orbitals sit at 60·n ± 20·n from the nucleus.
    #[test]
    fn test_level_radii() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut scene = SuperpositionScene::new(&mut rng);
        for level in 1..=3u8 {
            assert!(scene.handle(SceneAction::SetLevel(level), &mut rng));
            let n = level as f32;
            assert_eq!(scene.entities().count(EntityKind::Orbital), CLOUD_SIZE);
            assert!(
                scene
                    .entities()
                    .of_kind(EntityKind::Orbital)
                    .all(|e| (e.position.length() - 60.0 * n).abs() <= 20.0 * n + 1e-3)
            );
        }
        assert!(!scene.handle(SceneAction::SetLevel(4), &mut rng));
        assert_eq!(scene.level(), 3);
    }

    #[test]
    fn test_reset_restores_superposition() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut scene = SuperpositionScene::new(&mut rng);
        scene.handle(SceneAction::Observe, &mut rng);
        scene.tick(10.0, &mut rng);
        scene.reset(&mut rng);
        assert_eq!(scene.state(), WaveState::Superposition);
        assert_eq!(scene.entities().len(), CLOUD_SIZE + 1);
    }
}
