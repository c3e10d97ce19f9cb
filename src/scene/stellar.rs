//! Star formation in three stages: a collapsing molecular cloud, an accretion
//! disk around a protostar, and the granulated photosphere of the finished star.

use rand::Rng;
use rand::rngs::StdRng;

use super::{Scene, SceneAction, depth_sorted};
use crate::color::Color;
use crate::entity::{Entity, EntityId, EntityKind, EntityStore};
use crate::math::Vec3;
use crate::mesh::{Mesh, field_loops};
use crate::projector::View;
use crate::renderer::draw_list::DrawList;
use crate::rules::{Accretion, RadialCollapse, UpdateRule};
use crate::scheduler::NOMINAL_STEP;

const CLOUD_SIZE: usize = 2000;
const DISK_SIZE: usize = 1500;
const JET_LENGTH: f32 = 400.0;
const GRANULE_CELLS: i32 = 12;
const GRANULE_SIZE: f32 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Cloud,
    Accretion,
    Atmosphere,
}

impl Stage {
    pub fn next(self) -> Self {
        match self {
            Stage::Cloud => Stage::Accretion,
            Stage::Accretion => Stage::Atmosphere,
            Stage::Atmosphere => Stage::Cloud,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Stage::Cloud => "Molecular Cloud (10 K)",
            Stage::Accretion => "Protostellar Core (2,000 K)",
            Stage::Atmosphere => "Stellar Atmosphere (5,800 K)",
        }
    }
}

pub struct StellarScene {
    stage: Stage,
    entities: EntityStore,
    collapse: RadialCollapse,
    disk: Accretion,
    loops: Mesh,
    time: f32,
}

impl StellarScene {
    pub fn new(rng: &mut StdRng) -> Self {
        let mut scene = Self {
            stage: Stage::Cloud,
            entities: EntityStore::new(),
            collapse: RadialCollapse::new(EntityKind::Dust, 0.1, 100.0),
            disk: Accretion::default(),
            loops: Mesh::new(),
            time: 0.0,
        };
        scene.reset(rng);
        scene
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    fn enter(&mut self, stage: Stage, rng: &mut StdRng) {
        self.stage = stage;
        self.entities.clear();
        self.loops = Mesh::new();
        match stage {
            Stage::Cloud => self.spawn_cloud(rng),
            Stage::Accretion => self.spawn_disk(rng),
            Stage::Atmosphere => self.loops = field_loops(5, -300.0, 120.0, self.time),
        }
        log::info!("star formation entered {:?}", stage);
    }

    fn spawn_cloud(&mut self, rng: &mut StdRng) {
        for _ in 0..CLOUD_SIZE {
            let r = rng.gen_range(200.0..500.0);
            let theta = rng.gen_range(0.0..std::f32::consts::TAU);
            let phi = (2.0 * rng.r#gen::<f32>() - 1.0).acos();
            let position = Vec3::new(
                r * phi.sin() * theta.cos(),
                r * phi.sin() * theta.sin(),
                r * phi.cos(),
            );
            let velocity = Vec3::new(
                rng.gen_range(-0.25..0.25),
                rng.gen_range(-0.25..0.25),
                rng.gen_range(-0.25..0.25),
            );
            let color = Color::hsla(240.0 + rng.r#gen::<f32>() * 60.0, 0.7, 0.5, 0.4);
            self.entities.insert(
                Entity::new(EntityKind::Dust, position)
                    .with_velocity(velocity)
                    .with_size(rng.gen_range(1.0..4.0))
                    .with_color(color),
            );
        }
    }

    fn spawn_disk(&mut self, rng: &mut StdRng) {
        self.entities.insert(
            Entity::new(EntityKind::Protostar, Vec3::ZERO)
                .with_size(30.0)
                .with_color(Color::hex(0xfb923c)),
        );
        for _ in 0..DISK_SIZE {
            let angle = rng.gen_range(0.0..std::f32::consts::TAU);
            let r = rng.gen_range(50.0..300.0);
            let position = Vec3::new(angle.cos() * r, rng.gen_range(-10.0..10.0), angle.sin() * r);
            self.entities.insert(
                Entity::new(EntityKind::Dust, position)
                    .with_velocity(Vec3::new(-angle.sin() * 2.0, 0.0, angle.cos() * 2.0))
                    .with_size(rng.gen_range(1.0..3.0))
                    .with_color(Color::hex(0xfed7aa)),
            );
        }
    }

    fn draw_cloud(&self, view: &View, list: &mut DrawList) {
        let hot = Color::hex(0xef4444);
        for (dust, p) in depth_sorted(view, self.entities.of_kind(EntityKind::Dust)) {
            let color = if dust.activation > 0.0 { hot } else { dust.color };
            list.circle(
                (p.x, p.y),
                dust.size * p.scale,
                color.with_alpha((0.3 * p.scale).min(1.0)),
            );
        }
    }

    fn draw_disk(&self, view: &View, list: &mut DrawList) {
        let core = view.project(Vec3::ZERO);
        list.glow((core.x, core.y), 30.0 * core.scale, Color::hex(0xfb923c));
        list.circle((core.x, core.y), 8.0 * core.scale, Color::hex(0xfff7ed));

        for (dust, p) in depth_sorted(view, self.entities.of_kind(EntityKind::Dust)) {
            let r = dust.position.planar_length();
            let alpha = ((r / 300.0) * p.scale).clamp(0.0, 1.0);
            list.circle((p.x, p.y), dust.size * p.scale, dust.color.with_alpha(alpha));
        }

        let jet = Color::rgb8(125, 211, 252, 0.3);
        for end in [-JET_LENGTH, JET_LENGTH] {
            let tip = view.project(Vec3::new(0.0, end, 0.0));
            if tip.is_visible(view.fov) {
                list.line((core.x, core.y), (tip.x, tip.y), 15.0 * core.scale, jet);
            }
        }
    }

    fn draw_atmosphere(&self, view: &View, list: &mut DrawList) {
        let offset = (GRANULE_CELLS as f32 - 1.0) / 2.0;
        let mut cells = Vec::with_capacity((GRANULE_CELLS * GRANULE_CELLS) as usize);
        for i in 0..GRANULE_CELLS {
            for j in 0..GRANULE_CELLS {
                let center = Vec3::new(
                    (i as f32 - offset) * GRANULE_SIZE,
                    0.0,
                    (j as f32 - offset) * GRANULE_SIZE,
                );
                let p = view.project(center);
                if !p.is_visible(view.fov) {
                    continue;
                }
                let noise = (i as f32 * 0.5 + self.time).sin() * (j as f32 * 0.5 + self.time).cos();
                cells.push((p, noise > 0.0));
            }
        }
        cells.sort_by(|a, b| b.0.depth.total_cmp(&a.0.depth));
        for (p, hot) in cells {
            let color = if hot {
                Color::hex(0xf97316)
            } else {
                Color::hex(0xea580c)
            };
            let side = (GRANULE_SIZE - 2.0) * p.scale;
            list.rect(p.x - side / 2.0, p.y - side / 2.0, side, side, color);
        }

        let field = Color::hex(0x38bdf8).with_alpha(0.6);
        for line in self.loops.iter() {
            list.mesh_loop(view, line, 2.0, field);
        }
    }
}

impl Scene for StellarScene {
    fn title(&self) -> &'static str {
        "Star Formation"
    }

    fn status(&self) -> String {
        self.stage.label().to_string()
    }

    fn entities(&self) -> &EntityStore {
        &self.entities
    }

    fn reset(&mut self, rng: &mut StdRng) {
        self.time = 0.0;
        self.enter(Stage::Cloud, rng);
    }

    fn tick(&mut self, step: f32, rng: &mut StdRng) {
        self.time += NOMINAL_STEP * step;
        match self.stage {
            Stage::Cloud => self.collapse.apply(&mut self.entities, step, rng),
            Stage::Accretion => self.disk.apply(&mut self.entities, step, rng),
            Stage::Atmosphere => self.loops = field_loops(5, -300.0, 120.0, self.time),
        }
    }

    fn draw(&self, view: &View, _selection: Option<EntityId>, list: &mut DrawList) {
        match self.stage {
            Stage::Cloud => self.draw_cloud(view, list),
            Stage::Accretion => self.draw_disk(view, list),
            Stage::Atmosphere => self.draw_atmosphere(view, list),
        }
    }

    fn handle(&mut self, action: SceneAction, rng: &mut StdRng) -> bool {
        match action {
            SceneAction::NextStage => {
                self.enter(self.stage.next(), rng);
                true
            }
            _ => false,
        }
    }
}
