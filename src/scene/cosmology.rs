//! Cosmic epochs from the initial singularity to the first gravitating stars.

use rand::Rng;
use rand::rngs::StdRng;

use super::{Scene, SceneAction, depth_sorted};
use crate::color::Color;
use crate::entity::{Entity, EntityId, EntityKind, EntityStore};
use crate::math::Vec3;
use crate::mesh::lattice;
use crate::projector::View;
use crate::renderer::draw_list::DrawList;
use crate::rules::{InflationScale, PairwiseAttraction, UpdateRule};
use crate::scheduler::NOMINAL_STEP;

const QUANTUM_COUNT: usize = 1000;
const CMB_COUNT: usize = 400;
const CMB_RADIUS: f32 = 300.0;
const STAR_COUNT: usize = 500;
const GRID_HALF: i32 = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Epoch {
    Singularity,
    Inflation,
    Cmb,
    Structure,
}

impl Epoch {
    pub fn next(self) -> Self {
        match self {
            Epoch::Singularity => Epoch::Inflation,
            Epoch::Inflation => Epoch::Cmb,
            Epoch::Cmb => Epoch::Structure,
            Epoch::Structure => Epoch::Singularity,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Epoch::Singularity => "Singularity (t = 0)",
            Epoch::Inflation => "Cosmic Inflation (10^-36 s)",
            Epoch::Cmb => "Recombination (380,000 years)",
            Epoch::Structure => "Reionization (400 million years)",
        }
    }
}

pub struct CosmologyScene {
    epoch: Epoch,
    entities: EntityStore,
    inflation: InflationScale,
    gravity: PairwiseAttraction,
    /// Seconds since the current epoch began.
    epoch_time: f32,
}

impl CosmologyScene {
    pub fn new(rng: &mut StdRng) -> Self {
        let mut scene = Self {
            epoch: Epoch::Singularity,
            entities: EntityStore::new(),
            inflation: InflationScale::default(),
            gravity: PairwiseAttraction::new(EntityKind::Star, 0.05, 1000.0),
            epoch_time: 0.0,
        };
        scene.reset(rng);
        scene
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    /// Grid spacing multiplier during inflation.
    fn expansion(&self) -> f32 {
        (self.epoch_time * 2.0).min(5.0).exp()
    }

    fn enter(&mut self, epoch: Epoch, rng: &mut StdRng) {
        self.epoch = epoch;
        self.epoch_time = 0.0;
        self.entities.clear();
        match epoch {
            Epoch::Singularity | Epoch::Inflation => {
                for _ in 0..QUANTUM_COUNT {
                    let position = Vec3::new(
                        rng.gen_range(-5.0..5.0),
                        rng.gen_range(-5.0..5.0),
                        rng.gen_range(-5.0..5.0),
                    );
                    self.entities.insert(
                        Entity::new(EntityKind::Quantum, position).with_size(rng.gen_range(0.0..2.0)),
                    );
                }
            }
            Epoch::Cmb => {
                for _ in 0..CMB_COUNT {
                    let phi = rng.gen_range(0.0..std::f32::consts::TAU);
                    let theta = (2.0 * rng.r#gen::<f32>() - 1.0).acos();
                    let position = Vec3::new(
                        CMB_RADIUS * theta.sin() * phi.cos(),
                        CMB_RADIUS * theta.sin() * phi.sin(),
                        CMB_RADIUS * theta.cos(),
                    );
                    let fluctuation: f32 = rng.r#gen();
                    let color = if fluctuation > 0.5 {
                        Color::rgb8(239, 68, 68, 1.0)
                    } else {
                        Color::rgb8(59, 130, 246, 1.0)
                    };
                    self.entities.insert(
                        Entity::new(EntityKind::CmbPoint, position)
                            .with_size(4.0)
                            .with_color(color)
                            .with_metadata(fluctuation),
                    );
                }
            }
            Epoch::Structure => {
                for i in 0..STAR_COUNT {
                    let r = rng.gen_range(0.0..400.0);
                    let a = rng.gen_range(0.0..std::f32::consts::TAU);
                    let position = Vec3::new(a.cos() * r, rng.gen_range(-25.0..25.0), a.sin() * r);
                    let color = if i % 10 == 0 {
                        Color::hex(0x60a5fa)
                    } else {
                        Color::WHITE
                    };
                    self.entities.insert(
                        Entity::new(EntityKind::Star, position)
                            .with_size(rng.gen_range(1.0..5.0))
                            .with_color(color)
                            .with_metadata(rng.gen_range(5.0..15.0)),
                    );
                }
            }
        }
        log::info!("cosmic epoch {:?} with {} entities", epoch, self.entities.len());
    }
}

impl Scene for CosmologyScene {
    fn title(&self) -> &'static str {
        "Cosmic Epochs"
    }

    fn status(&self) -> String {
        self.epoch.label().to_string()
    }

    fn entities(&self) -> &EntityStore {
        &self.entities
    }

    fn reset(&mut self, rng: &mut StdRng) {
        self.enter(Epoch::Singularity, rng);
    }

    fn tick(&mut self, step: f32, rng: &mut StdRng) {
        self.epoch_time += NOMINAL_STEP * step;
        match self.epoch {
            Epoch::Inflation => self.inflation.apply(&mut self.entities, step, rng),
            Epoch::Structure => self.gravity.apply(&mut self.entities, step, rng),
            Epoch::Singularity | Epoch::Cmb => {}
        }
    }

    fn draw(&self, view: &View, _selection: Option<EntityId>, list: &mut DrawList) {
        match self.epoch {
            Epoch::Singularity => {
                let p = view.project(Vec3::ZERO);
                let pulse = (self.epoch_time * 10.0).sin() * 5.0;
                let radius = ((10.0 + pulse) * p.scale).max(0.1);
                list.glow((p.x, p.y), radius * 4.0, Color::WHITE.with_alpha(0.5));
                list.circle((p.x, p.y), radius, Color::WHITE);
            }
            Epoch::Inflation => {
                let expansion = self.expansion();
                let alpha = (0.4 - expansion / 150.0).max(0.0);
                if alpha > 0.0 {
                    let grid = lattice(GRID_HALF, 40.0 * expansion, true, |_, _| 0.0);
                    let color = Color::rgb8(96, 165, 250, alpha);
                    for line in grid.iter() {
                        list.mesh_loop(view, line, 0.5, color);
                    }
                }
                for (quantum, p) in depth_sorted(view, self.entities.of_kind(EntityKind::Quantum)) {
                    list.circle(
                        (p.x, p.y),
                        quantum.size * p.scale,
                        Color::WHITE.with_alpha((0.5 * p.scale).min(1.0)),
                    );
                }
            }
            Epoch::Cmb => {
                for (point, p) in depth_sorted(view, self.entities.of_kind(EntityKind::CmbPoint)) {
                    list.circle(
                        (p.x, p.y),
                        point.size * p.scale,
                        point.color.with_alpha((0.8 * p.scale).min(1.0)),
                    );
                }
            }
            Epoch::Structure => {
                for (star, p) in depth_sorted(view, self.entities.of_kind(EntityKind::Star)) {
                    let alpha = p.scale.min(1.0);
                    list.glow((p.x, p.y), star.size * p.scale * 3.0, star.color.with_alpha(alpha * 0.4));
                    list.circle((p.x, p.y), star.size * p.scale, star.color.with_alpha(alpha));
                }
            }
        }
    }

    fn handle(&mut self, action: SceneAction, rng: &mut StdRng) -> bool {
        match action {
            SceneAction::NextStage => {
                self.enter(self.epoch.next(), rng);
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    /// Each epoch rebuilds its own population.
    #[test]
    fn test_epoch_populations() {
        let mut rng = StdRng::seed_from_u64(6);
        let mut scene = CosmologyScene::new(&mut rng);
        assert_eq!(scene.entities().count(EntityKind::Quantum), QUANTUM_COUNT);

        scene.handle(SceneAction::NextStage, &mut rng);
        assert_eq!(scene.epoch(), Epoch::Inflation);
        assert_eq!(scene.entities().count(EntityKind::Quantum), QUANTUM_COUNT);

        scene.handle(SceneAction::NextStage, &mut rng);
        assert_eq!(scene.entities().count(EntityKind::CmbPoint), CMB_COUNT);
        assert!(
            scene
                .entities()
                .iter()
                .all(|e| (e.position.length() - CMB_RADIUS).abs() < 1e-2)
        );

        scene.handle(SceneAction::NextStage, &mut rng);
        assert_eq!(scene.entities().count(EntityKind::Star), STAR_COUNT);
        assert!(
            scene
                .entities()
                .iter()
                .all(|e| (5.0..15.0).contains(&e.metadata))
        );
    }

    /// Inflation pushes the quantum foam outward; the singularity stays put.
    #[test]
    fn test_inflation_expands() {
        let mut rng = StdRng::seed_from_u64(6);
        let mut scene = CosmologyScene::new(&mut rng);
        let extent = |s: &CosmologyScene| s.entities.iter().map(|e| e.position.length()).fold(0.0, f32::max);
        let start = extent(&scene);
        scene.tick(1.0, &mut rng);
        assert_eq!(extent(&scene), start);

        scene.handle(SceneAction::NextStage, &mut rng);
        let before = extent(&scene);
        for _ in 0..20 {
            scene.tick(1.0, &mut rng);
        }
        assert!(extent(&scene) > before * 2.0);
    }

    #[test]
    fn test_grid_fades_out() {
        let mut rng = StdRng::seed_from_u64(6);
        let mut scene = CosmologyScene::new(&mut rng);
        scene.handle(SceneAction::NextStage, &mut rng);
        assert!((scene.expansion() - 1.0).abs() < 1e-6);
        for _ in 0..400 {
            scene.tick(1.0, &mut rng);
        }
        assert!((scene.expansion() - 5.0f32.exp()).abs() < 1e-2);
    }
}
