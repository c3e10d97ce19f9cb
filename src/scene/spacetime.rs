//! Binary black hole merger rippling a spacetime lattice.
//!
//! The run goes INSPIRAL → MERGER → RINGDOWN and then starts over on its own.
//! During the inspiral the orbit shrinks as it radiates, and the lattice shows a
//! rotating quadrupole spiral with a gravity well under each hole. After the
//! merger a single wave packet travels outward across the grid.

use rand::Rng;
use rand::rngs::StdRng;

use super::{Scene, draw_starfield, scatter_stars};
use crate::color::Color;
use crate::entity::{Entity, EntityId, EntityKind, EntityStore};
use crate::math::Vec3;
use crate::mesh::Mesh;
use crate::projector::View;
use crate::renderer::draw_list::DrawList;
use crate::rules::{WaveField, WaveSource};

const STAR_COUNT: usize = 600;
const STAR_EXTENT: f32 = 3000.0;
const GRID_HALF: i32 = 18;
const GRID_STEP: f32 = 45.0;
const INITIAL_SEPARATION: f32 = 180.0;
const MERGE_RADIUS: f32 = 10.0;
const WAVE_SPEED: f32 = 15.0;
const HOLE_SIZE: f32 = 22.0;
const CYAN: Color = Color::hex(0x06b6d4);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergerState {
    Inspiral,
    Merger,
    Ringdown,
}

pub struct SpacetimeScene {
    state: MergerState,
    entities: EntityStore,
    radius: f32,
    phase: f32,
    frequency: f32,
    amplitude: f32,
    recoil: Vec3,
    merger_time: f32,
    ringdown_time: f32,
    wave_radius: f32,
    grid: Mesh,
}

impl SpacetimeScene {
    pub fn new(rng: &mut StdRng) -> Self {
        let mut scene = Self {
            state: MergerState::Inspiral,
            entities: EntityStore::new(),
            radius: INITIAL_SEPARATION,
            phase: 0.0,
            frequency: 0.04,
            amplitude: 0.1,
            recoil: Vec3::ZERO,
            merger_time: 0.0,
            ringdown_time: 0.0,
            wave_radius: 0.0,
            grid: Mesh::new(),
        };
        scene.reset(rng);
        scene
    }

    pub fn state(&self) -> MergerState {
        self.state
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn wave_radius(&self) -> f32 {
        self.wave_radius
    }

    /// Starts a fresh inspiral, keeping the starfield.
    fn restart(&mut self) {
        self.state = MergerState::Inspiral;
        self.radius = INITIAL_SEPARATION;
        self.phase = 0.0;
        self.frequency = 0.04;
        self.amplitude = 0.1;
        self.recoil = Vec3::ZERO;
        self.merger_time = 0.0;
        self.ringdown_time = 0.0;
        self.wave_radius = 0.0;

        self.entities.retain(|e| e.kind != EntityKind::BlackHole);
        for angle in [0.0f32, std::f32::consts::PI] {
            let position = Vec3::new(angle.cos() * self.radius, 0.0, angle.sin() * self.radius);
            self.entities.insert(
                Entity::new(EntityKind::BlackHole, position)
                    .with_size(HOLE_SIZE)
                    .with_color(Color::BLACK)
                    .with_phase(angle),
            );
        }
        self.refresh_grid();
    }

    fn field(&self) -> WaveField {
        match self.state {
            MergerState::Inspiral => WaveField::Inspiral {
                phase: self.phase,
                amplitude: self.amplitude,
                sources: self
                    .entities
                    .of_kind(EntityKind::BlackHole)
                    .map(|bh| WaveSource::well(bh.position))
                    .collect(),
            },
            _ => WaveField::Packet {
                radius: self.wave_radius,
            },
        }
    }

    fn refresh_grid(&mut self) {
        self.grid = self.field().grid(GRID_HALF, GRID_STEP);
    }

    fn advance_inspiral(&mut self, step: f32) {
        let decay = 0.00025 * (INITIAL_SEPARATION / self.radius.max(8.0)).powf(3.5);
        self.radius = (self.radius - decay * step).max(0.0);
        self.frequency = 0.035 * (INITIAL_SEPARATION / self.radius.max(5.0)).powf(1.5);
        self.phase += self.frequency * step;
        self.amplitude = 0.1 + (INITIAL_SEPARATION / self.radius.max(20.0)) * 0.5;

        let angular = 0.04 * (INITIAL_SEPARATION / self.radius.max(5.0)).powf(1.5) * step;
        let radius = self.radius;
        for hole in self.entities.iter_mut().filter(|e| e.kind == EntityKind::BlackHole) {
            hole.phase += angular;
            hole.position = Vec3::new(hole.phase.cos() * radius, 0.0, hole.phase.sin() * radius);
        }

        if self.radius < MERGE_RADIUS {
            self.state = MergerState::Merger;
            self.merger_time = 1.0;
            log::info!("black holes merged at phase {:.1}", self.phase);
        }
    }

    fn place_remnant(&mut self) {
        let recoil = self.recoil;
        for hole in self.entities.iter_mut().filter(|e| e.kind == EntityKind::BlackHole) {
            hole.position = recoil;
            hole.size = HOLE_SIZE * 2.0;
        }
    }

    fn draw_grid(&self, view: &View, list: &mut DrawList) {
        for line in self.grid.iter() {
            let projected: Vec<_> = line.points.iter().map(|pt| (pt, view.project(*pt))).collect();
            for pair in projected.windows(2) {
                let ((a, pa), (b, pb)) = (pair[0], pair[1]);
                if !pa.is_visible(view.fov) || !pb.is_visible(view.fov) {
                    continue;
                }
                let intensity = ((a.y.abs() + b.y.abs()) / 120.0).min(1.0);
                let color = Color::rgb8(
                    (60.0 + intensity * 195.0) as u8,
                    (100.0 + intensity * 155.0) as u8,
                    (255.0 - intensity * 50.0) as u8,
                    (0.1 + pa.scale * 0.15).max(0.0),
                );
                list.line((pa.x, pa.y), (pb.x, pb.y), 0.8, color);
            }
        }
    }

    fn draw_holes(&self, view: &View, list: &mut DrawList) {
        let mut holes: Vec<_> = self
            .entities
            .of_kind(EntityKind::BlackHole)
            .map(|bh| (bh, view.project_lensed(bh.position)))
            .filter(|(_, p)| p.is_visible(view.fov))
            .collect();
        holes.sort_by(|a, b| b.1.depth.total_cmp(&a.1.depth));

        let merging = self.state == MergerState::Merger;
        for (hole, p) in holes {
            let r = (hole.size * p.scale).max(0.5);
            let halo = if merging {
                Color::WHITE
            } else {
                CYAN.with_alpha(0.5)
            };
            let blur = if merging { 80.0 } else { 40.0 };
            list.glow((p.x, p.y), r * 3.0 + blur * p.scale * 0.25, halo);
            list.circle((p.x, p.y), r, hole.color);
        }
    }
}

impl Scene for SpacetimeScene {
    fn title(&self) -> &'static str {
        "Spacetime Ripples"
    }

    fn status(&self) -> String {
        match self.state {
            MergerState::Inspiral => format!(
                "Inspiral / separation {:.1} / f {:.3}",
                self.radius, self.frequency
            ),
            MergerState::Merger => "Merger".to_string(),
            MergerState::Ringdown => format!("Ringdown / wavefront {:.0}", self.wave_radius),
        }
    }

    fn entities(&self) -> &EntityStore {
        &self.entities
    }

    fn reset(&mut self, rng: &mut StdRng) {
        self.entities.clear();
        scatter_stars(&mut self.entities, STAR_COUNT, STAR_EXTENT, rng);
        self.restart();
    }

    fn tick(&mut self, step: f32, rng: &mut StdRng) {
        match self.state {
            MergerState::Inspiral => self.advance_inspiral(step),
            MergerState::Merger => {
                self.merger_time -= 0.03 * step;
                self.wave_radius += WAVE_SPEED * step;
                if self.merger_time < 0.2 {
                    self.state = MergerState::Ringdown;
                    self.ringdown_time = 1.0;
                    self.recoil = Vec3::new(
                        rng.gen_range(-15.0..15.0),
                        rng.gen_range(-15.0..15.0),
                        rng.gen_range(-15.0..15.0),
                    );
                }
                self.place_remnant();
            }
            MergerState::Ringdown => {
                self.ringdown_time *= 0.97f32.powf(step);
                self.wave_radius += WAVE_SPEED * step;
                self.recoil *= 0.94f32.powf(step);
                self.place_remnant();
                if self.ringdown_time < 0.01 && self.wave_radius > 1200.0 {
                    log::info!("ringdown finished, restarting inspiral");
                    self.restart();
                }
            }
        }
        self.refresh_grid();
    }

    fn draw(&self, view: &View, _selection: Option<EntityId>, list: &mut DrawList) {
        self.draw_grid(view, list);
        draw_starfield(view, &self.entities, true, list);
        self.draw_holes(view, list);

        if self.merger_time > 0.3 {
            list.rect(
                0.0,
                0.0,
                view.viewport.width,
                view.viewport.height,
                Color::WHITE.with_alpha(self.merger_time * 0.8),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn run_until(scene: &mut SpacetimeScene, rng: &mut StdRng, step: f32, state: MergerState) -> usize {
        let mut ticks = 0;
        while scene.state() != state {
            scene.tick(step, rng);
            ticks += 1;
            assert!(ticks < 5000, "never reached {state:?}");
        }
        ticks
    }

    #[test]
    fn test_population() {
        let scene = SpacetimeScene::new(&mut StdRng::seed_from_u64(1));
        assert_eq!(scene.entities().count(EntityKind::BackgroundStar), STAR_COUNT);
        assert_eq!(scene.entities().count(EntityKind::BlackHole), 2);
        assert_eq!(scene.grid.loop_count(), (2 * GRID_HALF + 1) as usize);
    }

    /// The holes stay opposite each other while the orbit shrinks.
    #[test]
    fn test_inspiral_shrinks_orbit() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut scene = SpacetimeScene::new(&mut rng);
        for _ in 0..200 {
            scene.tick(10.0, &mut rng);
        }
        assert!(scene.radius() < INITIAL_SEPARATION);
        let holes: Vec<Vec3> = scene
            .entities()
            .of_kind(EntityKind::BlackHole)
            .map(|e| e.position)
            .collect();
        assert!((holes[0] + holes[1]).length() < 1e-2);
        assert!((holes[0].length() - scene.radius()).abs() < 1e-2);
    }

    /// A full run merges, rings down and restarts by itself.
    #[test]
    fn test_full_cycle_restarts() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut scene = SpacetimeScene::new(&mut rng);
        run_until(&mut scene, &mut rng, 500.0, MergerState::Merger);
        run_until(&mut scene, &mut rng, 1.0, MergerState::Ringdown);
        assert!(scene.wave_radius() > 0.0);
        run_until(&mut scene, &mut rng, 1.0, MergerState::Inspiral);
        assert_eq!(scene.radius(), INITIAL_SEPARATION);
        assert_eq!(scene.wave_radius(), 0.0);
        assert_eq!(scene.entities().count(EntityKind::BlackHole), 2);
        assert_eq!(scene.entities().count(EntityKind::BackgroundStar), STAR_COUNT);
    }

    /// After the merger the grid is flat away from the outgoing wavefront.
    #[test]
    fn test_packet_after_merger() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut scene = SpacetimeScene::new(&mut rng);
        run_until(&mut scene, &mut rng, 500.0, MergerState::Merger);
        for _ in 0..10 {
            scene.tick(1.0, &mut rng);
        }
        let front = scene.wave_radius();
        let far = scene
            .grid
            .iter()
            .flat_map(|l| l.points.iter())
            .filter(|p| ((p.x * p.x + p.z * p.z).sqrt() - front).abs() > 400.0)
            .all(|p| p.y.abs() < 1e-3);
        assert!(far);
    }
}
