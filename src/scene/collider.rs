//! Proton collision event inside a cylindrical detector.
//!
//! An event is generated up front as a list of helical tracks and calorimeter
//! deposits. The event clock then plays it back: the beams close in while the
//! clock is negative, the vertex flashes around zero, tracks grow outward and
//! deposits light up once the clock passes 0.8.

use rand::Rng;
use rand::rngs::StdRng;

use super::{Scene, SceneAction, Tunable};
use crate::camera::PickTarget;
use crate::color::Color;
use crate::entity::{CaloLayer, Entity, EntityId, EntityKind, EntityStore, Species};
use crate::math::Vec3;
use crate::mesh::{Cylinder, Mesh, calorimeter};
use crate::projector::View;
use crate::renderer::draw_list::DrawList;

const TRACK_POINTS: usize = 100;
const CLOCK_START: f32 = -1.5;
const CLOCK_END: f32 = 2.0;
const DETECTOR_SEGMENTS: usize = 32;
const TIP_HIT_RADIUS: f32 = 18.0;
pub const DEFAULT_FIELD: f32 = 3.8;
pub const MAX_FIELD: f32 = 8.0;

const DETECTOR: [Cylinder; 4] = [
    Cylinder {
        radius: 100.0,
        height: 300.0,
    },
    Cylinder {
        radius: 240.0,
        height: 500.0,
    },
    Cylinder {
        radius: 360.0,
        height: 600.0,
    },
    Cylinder {
        radius: 450.0,
        height: 800.0,
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    Higgs,
    Qcd,
    WDecay,
}

impl EventType {
    pub fn next(self) -> Self {
        match self {
            EventType::Higgs => EventType::Qcd,
            EventType::Qcd => EventType::WDecay,
            EventType::WDecay => EventType::Higgs,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            EventType::Higgs => "H → ZZ* → 4ℓ",
            EventType::Qcd => "QCD multijet",
            EventType::WDecay => "W → eν",
        }
    }
}

/// Kinematics of one reconstructed particle.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub id: EntityId,
    pub species: Species,
    /// Transverse momentum in GeV.
    pub pt: f32,
    pub eta: f32,
    pub phi: f32,
    pub charge: f32,
    pub energy: f32,
    pub points: Vec<Vec3>,
}

impl Track {
    /// Polar angle from pseudorapidity.
    pub fn theta(&self) -> f32 {
        2.0 * (-self.eta).exp().atan()
    }

    fn max_radius(&self) -> f32 {
        if self.species.is_parton() { 80.0 } else { 450.0 }
    }

    /// Samples the helix for the given solenoid field in tesla.
    pub fn trace(&mut self, field: f32) {
        let theta = self.theta();
        let curvature = 0.28 * field * self.charge / (self.pt + 0.01);
        let max_r = self.max_radius();
        self.points = (0..TRACK_POINTS)
            .map(|i| {
                let r = i as f32 / TRACK_POINTS as f32 * max_r;
                let local_phi = self.phi + r * curvature * 0.05;
                Vec3::from_spherical(r, theta, local_phi)
            })
            .collect();
    }

    /// Points revealed at playback `progress` in `[0, 1]`.
    pub fn revealed(&self, progress: f32) -> &[Vec3] {
        let count = ((self.points.len() as f32 * progress.clamp(0.0, 1.0)) as usize).min(self.points.len());
        &self.points[..count]
    }
}

/// Width and dash style for each species.
fn stroke(species: Species, highlighted: bool) -> (f32, bool) {
    let (normal, wide, dashed) = match species {
        Species::Muon => (4.0, 7.0, false),
        Species::Electron => (2.0, 5.0, false),
        Species::Pion => (0.8, 2.5, false),
        Species::Photon => (1.2, 2.5, true),
        Species::Neutrino => (1.0, 1.0, true),
        Species::Quark | Species::Gluon => (6.0, 10.0, false),
    };
    (if highlighted { wide } else { normal }, dashed)
}

pub struct ColliderScene {
    event_type: EventType,
    field: f32,
    clock: f32,
    entities: EntityStore,
    tracks: Vec<Track>,
    detector: Mesh,
}

impl ColliderScene {
    pub fn new(rng: &mut StdRng) -> Self {
        let mut scene = Self {
            event_type: EventType::Higgs,
            field: DEFAULT_FIELD,
            clock: CLOCK_START,
            entities: EntityStore::new(),
            tracks: Vec::new(),
            detector: calorimeter(&DETECTOR, DETECTOR_SEGMENTS),
        };
        scene.reset(rng);
        scene
    }

    pub fn event_type(&self) -> EventType {
        self.event_type
    }

    pub fn clock(&self) -> f32 {
        self.clock
    }

    pub fn field(&self) -> f32 {
        self.field
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Fraction of each track drawn at the current clock.
    fn track_progress(&self) -> f32 {
        if self.clock <= 0.0 {
            0.0
        } else {
            self.clock.min(1.2) / 1.2
        }
    }

    fn deposit_progress(&self) -> f32 {
        ((self.clock - 0.8) / 0.4).clamp(0.0, 1.0)
    }

    fn add_track(
        &mut self,
        species: Species,
        pt: f32,
        eta: Option<f32>,
        phi: Option<f32>,
        rng: &mut StdRng,
    ) -> Option<usize> {
        let eta = eta.unwrap_or_else(|| rng.gen_range(-2.5..2.5));
        let phi = phi.unwrap_or_else(|| rng.gen_range(0.0..std::f32::consts::TAU));
        let charge = if species.is_charged() {
            if rng.gen_bool(0.5) { 1.0 } else { -1.0 }
        } else {
            0.0
        };
        let energy = pt * eta.cosh();
        let id = self.entities.insert(
            Entity::new(EntityKind::Track(species), Vec3::ZERO)
                .with_color(species.color())
                .with_metadata(energy),
        )?;
        let mut track = Track {
            id,
            species,
            pt,
            eta,
            phi,
            charge,
            energy,
            points: Vec::new(),
        };
        track.trace(self.field);
        self.tracks.push(track);
        Some(self.tracks.len() - 1)
    }

    fn add_deposit(&mut self, layer: CaloLayer, track: usize, energy: f32, visible: bool) {
        let Some(track) = self.tracks.get(track) else {
            return;
        };
        let radius = match layer {
            CaloLayer::Ecal => 240.0,
            CaloLayer::Hcal => 360.0,
        };
        let mut deposit = Entity::new(
            EntityKind::Deposit(layer),
            Vec3::from_spherical(radius, track.theta(), track.phi),
        )
        .with_metadata(energy);
        deposit.visible = visible;
        self.entities.insert(deposit);
    }

    /// Builds a fresh event of the current type and rewinds the clock.
    fn generate(&mut self, rng: &mut StdRng) {
        self.entities.clear();
        self.tracks.clear();
        self.clock = CLOCK_START;

        let partons = if self.event_type == EventType::Qcd { 6 } else { 2 };
        for i in 0..partons {
            let species = if i % 5 < 3 {
                Species::Quark
            } else {
                Species::Gluon
            };
            self.add_track(species, rng.gen_range(20.0..70.0), None, None, rng);
        }

        match self.event_type {
            EventType::Higgs => {
                let offset = rng.gen_range(0.0..std::f32::consts::PI);
                for i in 0..4 {
                    let species = if i % 2 == 0 {
                        Species::Muon
                    } else {
                        Species::Electron
                    };
                    let phi = offset + i as f32 * std::f32::consts::FRAC_PI_2 + rng.gen_range(-0.2..0.2);
                    let pt = rng.gen_range(60.0..180.0);
                    let eta = rng.gen_range(-1.0..1.0);
                    self.add_track(species, pt, Some(eta), Some(phi), rng);
                }
            }
            EventType::WDecay => {
                for species in [Species::Electron, Species::Neutrino] {
                    let pt = rng.gen_range(80.0..120.0);
                    let eta = rng.gen_range(-0.75..0.75);
                    let phi = rng.gen_range(0.0..std::f32::consts::TAU);
                    self.add_track(species, pt, Some(eta), Some(phi), rng);
                }
            }
            EventType::Qcd => {}
        }

        let hadrons = if self.event_type == EventType::Qcd { 60 } else { 35 };
        for _ in 0..hadrons {
            let Some(index) = self.add_track(Species::Pion, rng.gen_range(2.0..22.0), None, None, rng)
            else {
                continue;
            };
            let visible = rng.r#gen::<f32>() > 0.6;
            let energy = self.tracks[index].energy * rng.gen_range(0.3..1.0);
            self.add_deposit(CaloLayer::Hcal, index, energy, visible);
        }
        for _ in 0..4 {
            if let Some(index) = self.add_track(Species::Photon, rng.gen_range(10.0..50.0), None, None, rng) {
                let energy = self.tracks[index].energy;
                self.add_deposit(CaloLayer::Ecal, index, energy, true);
            }
        }
        self.place_tips();
        log::info!(
            "{} event with {} tracks",
            self.event_type.label(),
            self.tracks.len()
        );
    }

    /// Moves each track entity to the leading point of its revealed part.
    fn place_tips(&mut self) {
        let progress = self.track_progress();
        for track in &self.tracks {
            let tip = track.revealed(progress).last().copied().unwrap_or(Vec3::ZERO);
            if let Some(entity) = self.entities.get_mut(track.id) {
                entity.position = tip;
            }
        }
    }

    fn set_field(&mut self, field: f32) {
        self.field = field.clamp(0.0, MAX_FIELD);
        for track in &mut self.tracks {
            track.trace(self.field);
        }
        self.place_tips();
    }

    fn draw_beams(&self, view: &View, list: &mut DrawList) {
        if self.clock >= 0.0 {
            return;
        }
        let axis = [
            view.project(Vec3::new(0.0, 1500.0, 0.0)),
            view.project(Vec3::new(0.0, -1500.0, 0.0)),
        ];
        let dashes: Vec<(f32, f32)> = (0..=40)
            .map(|i| {
                let t = i as f32 / 40.0;
                let p = view.project(Vec3::new(0.0, 1500.0 - 3000.0 * t, 0.0));
                (p.x, p.y)
            })
            .collect();
        if axis.iter().all(|p| p.is_visible(view.fov)) {
            list.dashed(&dashes, 1.0, Color::rgb8(96, 165, 250, 0.2));
        }
        let distance = self.clock.abs() * 1000.0;
        for y in [distance, -distance] {
            let p = view.project(Vec3::new(0.0, y, 0.0));
            if p.is_visible(view.fov) {
                list.glow((p.x, p.y), 12.0 * p.scale, Color::hex(0x60a5fa));
                list.circle((p.x, p.y), (4.0 * p.scale).max(0.1), Color::WHITE);
            }
        }
    }

    fn draw_flash(&self, view: &View, list: &mut DrawList) {
        if !(-0.15..0.4).contains(&self.clock) {
            return;
        }
        let v = view.project(Vec3::ZERO);
        let t = self.clock + 0.15;
        let flash = if t < 0.1 {
            t / 0.1
        } else {
            (1.0 - (t - 0.1) / 0.4).max(0.0)
        };
        list.glow((v.x, v.y), 300.0 * flash * v.scale, Color::rgb8(96, 165, 250, 0.4));
        list.glow((v.x, v.y), 60.0 * flash * v.scale, Color::WHITE);
        if t > 0.05 {
            let reach = 100.0 * t * v.scale;
            for i in 0..12 {
                let a = i as f32 / 12.0 * std::f32::consts::TAU;
                list.line(
                    (v.x, v.y),
                    (v.x + a.cos() * reach, v.y + a.sin() * reach),
                    2.0 * v.scale,
                    Color::WHITE,
                );
            }
        }
    }
}

impl Scene for ColliderScene {
    fn title(&self) -> &'static str {
        "Collider Event"
    }

    fn status(&self) -> String {
        format!(
            "{} / B = {:.1} T / t = {:+.2}",
            self.event_type.label(),
            self.field,
            self.clock
        )
    }

    fn entities(&self) -> &EntityStore {
        &self.entities
    }

    fn reset(&mut self, rng: &mut StdRng) {
        self.generate(rng);
    }

    fn tick(&mut self, step: f32, _rng: &mut StdRng) {
        if self.clock >= CLOCK_END {
            return;
        }
        let speed = if self.clock < 0.0 { 0.035 } else { 0.012 };
        self.clock = (self.clock + speed * step).min(CLOCK_END);
        self.place_tips();
    }

    fn draw(&self, view: &View, selection: Option<EntityId>, list: &mut DrawList) {
        for line in self.detector.iter() {
            list.mesh_loop(view, line, 0.5, line.region.color());
        }
        self.draw_beams(view, list);
        self.draw_flash(view, list);

        let progress = self.track_progress();
        if progress > 0.0 {
            for track in &self.tracks {
                let points = track.revealed(progress);
                if points.len() < 2 {
                    continue;
                }
                let highlighted = selection == Some(track.id);
                let (width, dashed) = stroke(track.species, highlighted);
                let color = track.species.color();
                let projected: Vec<(f32, f32)> = points
                    .iter()
                    .map(|pt| view.project(*pt))
                    .filter(|p| p.is_visible(view.fov))
                    .map(|p| (p.x, p.y))
                    .collect();
                if dashed {
                    list.dashed(&projected, width, color);
                } else {
                    list.polyline(&projected, width, color, false);
                }
                if progress < 0.95 {
                    if let Some(lead) = points.last() {
                        let p = view.project(*lead);
                        let r = if highlighted { 4.0 } else { 2.0 };
                        list.circle((p.x, p.y), (r * p.scale).max(0.1), color.with_alpha(1.0));
                    }
                }
            }
        }

        let deposits = self.deposit_progress();
        if deposits > 0.0 {
            for deposit in self.entities.iter().filter(|e| e.visible) {
                let EntityKind::Deposit(layer) = deposit.kind else {
                    continue;
                };
                let color = match layer {
                    CaloLayer::Ecal => Color::rgb8(34, 211, 238, 0.7 * deposits),
                    CaloLayer::Hcal => Color::rgb8(249, 115, 22, 0.7 * deposits),
                };
                let height = deposit.metadata * 0.008 * deposits;
                let start = view.project(deposit.position);
                let end = view.project(deposit.position * (1.0 + height));
                if start.is_visible(view.fov) && end.is_visible(view.fov) {
                    list.line((start.x, start.y), (end.x, end.y), (4.0 * start.scale).max(0.1), color);
                }
            }
        }
    }

    fn pick_targets(&self, _view: &View) -> Vec<PickTarget<EntityId>> {
        if self.clock <= 0.1 {
            return Vec::new();
        }
        let progress = self.track_progress();
        self.tracks
            .iter()
            .filter(|t| t.revealed(progress).len() >= 2)
            .filter_map(|t| self.entities.get(t.id))
            .map(|e| PickTarget {
                id: e.id,
                position: e.position,
                hit_radius: TIP_HIT_RADIUS,
            })
            .collect()
    }

    fn describe(&self, id: EntityId) -> Option<String> {
        let track = self.tracks.iter().find(|t| t.id == id)?;
        let charge = match track.charge {
            c if c > 0.0 => "+1",
            c if c < 0.0 => "-1",
            _ => "0",
        };
        Some(format!(
            "{}\npT {:.1} GeV  η {:.2}  φ {:.2}\nE {:.1} GeV  charge {}",
            track.species.label(),
            track.pt,
            track.eta,
            track.phi,
            track.energy,
            charge
        ))
    }

    fn handle(&mut self, action: SceneAction, rng: &mut StdRng) -> bool {
        match action {
            SceneAction::CycleEventType => {
                self.event_type = self.event_type.next();
                self.generate(rng);
                true
            }
            SceneAction::SetField(field) => {
                self.set_field(field);
                true
            }
            _ => false,
        }
    }

    fn tunables(&self) -> Vec<Tunable> {
        vec![Tunable::new("field (T)", self.field, 0.5)]
    }

    fn tune(&mut self, index: usize, value: f32, rng: &mut StdRng) -> bool {
        index == 0 && self.handle(SceneAction::SetField(value), rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn count_tracks(scene: &ColliderScene, species: Species) -> usize {
        scene.tracks().iter().filter(|t| t.species == species).count()
    }

    /// Track and deposit populations per event type.
    #[test]
    fn test_event_composition() {
        let mut rng = StdRng::seed_from_u64(21);
        let mut scene = ColliderScene::new(&mut rng);
        assert_eq!(scene.event_type(), EventType::Higgs);
        assert_eq!(count_tracks(&scene, Species::Muon), 2);
        assert_eq!(count_tracks(&scene, Species::Electron), 2);
        assert_eq!(count_tracks(&scene, Species::Pion), 35);
        assert_eq!(count_tracks(&scene, Species::Photon), 4);
        assert_eq!(scene.entities().count(EntityKind::Deposit(CaloLayer::Ecal)), 4);
        assert_eq!(scene.entities().count(EntityKind::Deposit(CaloLayer::Hcal)), 35);

        scene.handle(SceneAction::CycleEventType, &mut rng);
        assert_eq!(scene.event_type(), EventType::Qcd);
        let partons = count_tracks(&scene, Species::Quark) + count_tracks(&scene, Species::Gluon);
        assert_eq!(partons, 6);
        assert_eq!(count_tracks(&scene, Species::Pion), 60);

        scene.handle(SceneAction::CycleEventType, &mut rng);
        assert_eq!(count_tracks(&scene, Species::Neutrino), 1);
        assert_eq!(count_tracks(&scene, Species::Electron), 1);
    }

    /// Partons stop at 80 units, everything else reaches the outer detector.
    #[test]
    fn test_track_extent() {
        let scene = ColliderScene::new(&mut StdRng::seed_from_u64(21));
        for track in scene.tracks() {
            let outer = track.points.last().map(|p| p.length()).unwrap_or(0.0);
            let limit = if track.species.is_parton() { 80.0 } else { 450.0 };
            assert_eq!(track.points.len(), TRACK_POINTS);
            assert!(outer < limit && outer > limit * 0.9, "{:?}", track.species);
        }
    }

    /// Charged tracks bend less as the field drops; at zero field they are straight.
    #[test]
    fn test_field_bends_charged_tracks() {
        let mut rng = StdRng::seed_from_u64(21);
        let mut scene = ColliderScene::new(&mut rng);
        scene.handle(SceneAction::SetField(0.0), &mut rng);
        for track in scene.tracks() {
            let first = track.points[1];
            let last = track.points[TRACK_POINTS - 1];
            let phi_first = first.y.atan2(first.x);
            let phi_last = last.y.atan2(last.x);
            assert!((phi_first - phi_last).abs() < 1e-3);
        }
        scene.handle(SceneAction::SetField(50.0), &mut rng);
        assert_eq!(scene.field(), MAX_FIELD);
    }

    /// The clock runs fast before the collision, slowly after, and stops at 2.
    #[test]
    fn test_event_clock() {
        let mut rng = StdRng::seed_from_u64(21);
        let mut scene = ColliderScene::new(&mut rng);
        scene.tick(1.0, &mut rng);
        assert!((scene.clock() - (CLOCK_START + 0.035)).abs() < 1e-5);
        assert!(scene.pick_targets(&View::new(
            crate::camera::Camera::default(),
            Default::default(),
            750.0
        ))
        .is_empty());
        for _ in 0..1000 {
            scene.tick(1.0, &mut rng);
        }
        assert_eq!(scene.clock(), CLOCK_END);
    }

    /// Clicking a fully revealed track tip selects that track.
    #[test]
    fn test_pick_track_tip() {
        let mut rng = StdRng::seed_from_u64(21);
        let mut scene = ColliderScene::new(&mut rng);
        for _ in 0..300 {
            scene.tick(1.0, &mut rng);
        }
        let view = View::new(crate::camera::Camera::new(0.4, -0.6, 0.85), Default::default(), 750.0);
        let targets = scene.pick_targets(&view);
        assert_eq!(targets.len(), scene.tracks().len());
        let muon = scene
            .tracks()
            .iter()
            .find(|t| t.species == Species::Muon)
            .expect("muon");
        let tip = view.project(scene.entities().get(muon.id).expect("entity").position);
        let hit = crate::camera::pick_nearest(targets, &view.camera, view.viewport, view.fov, (tip.x, tip.y));
        assert_eq!(hit, Some(muon.id));
        assert!(scene.describe(muon.id).is_some_and(|d| d.starts_with("Muon")));
    }
}
