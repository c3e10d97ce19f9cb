//! Eight planets on closed-form circular orbits around a sun.

use rand::rngs::StdRng;

use super::{Scene, depth_sorted, draw_starfield, scatter_stars};
use crate::camera::PickTarget;
use crate::color::Color;
use crate::entity::{Entity, EntityId, EntityKind, EntityStore};
use crate::math::Vec3;
use crate::mesh::{Mesh, orbit_rings};
use crate::projector::View;
use crate::renderer::draw_list::DrawList;
use crate::rules::{OrbitalAdvance, UpdateRule};

#[derive(Debug)]
pub struct PlanetInfo {
    pub name: &'static str,
    /// Mean distance from the sun in millions of km.
    pub distance_mkm: f32,
    pub au: f32,
    pub size: f32,
    pub color: u32,
    pub period_days: f32,
    pub has_rings: bool,
}

const fn planet(
    name: &'static str,
    distance_mkm: f32,
    au: f32,
    size: f32,
    color: u32,
    period_days: f32,
) -> PlanetInfo {
    PlanetInfo {
        name,
        distance_mkm,
        au,
        size,
        color,
        period_days,
        has_rings: false,
    }
}

pub const PLANETS: [PlanetInfo; 8] = [
    planet("Mercury", 57.9, 0.387, 4.0, 0xA5A5A5, 88.0),
    planet("Venus", 108.2, 0.723, 9.0, 0xE3BB76, 224.7),
    planet("Earth", 149.6, 1.0, 10.0, 0x2271B3, 365.2),
    planet("Mars", 227.9, 1.524, 5.0, 0xE27B58, 687.0),
    planet("Jupiter", 778.3, 5.203, 22.0, 0xD39C7E, 4331.0),
    PlanetInfo {
        has_rings: true,
        ..planet("Saturn", 1427.0, 9.537, 18.0, 0xC5AB6E, 10747.0)
    },
    planet("Uranus", 2871.0, 19.191, 14.0, 0xBBE1E4, 30589.0),
    planet("Neptune", 4498.0, 30.069, 13.0, 0x6081FF, 59800.0),
];

const STAR_COUNT: usize = 800;
const STAR_EXTENT: f32 = 4000.0;
const SUN_RADIUS: f32 = 40.0;
const ORBIT_SAMPLE_STEP: f32 = 0.1;

/// Orbit radius in scene units for a distance in AU.
pub fn orbit_radius(au: f32) -> f32 {
    80.0 + au.sqrt() * 250.0
}

pub struct SolarScene {
    entities: EntityStore,
    orbit: OrbitalAdvance,
    rings: Mesh,
    /// Planet entity ids in table order.
    planets: Vec<EntityId>,
}

impl SolarScene {
    pub fn new(rng: &mut StdRng) -> Self {
        let mut scene = Self {
            entities: EntityStore::new(),
            orbit: OrbitalAdvance::default(),
            rings: Mesh::new(),
            planets: Vec::new(),
        };
        scene.reset(rng);
        scene
    }

    fn info(&self, id: EntityId) -> Option<&'static PlanetInfo> {
        let index = self.planets.iter().position(|p| *p == id)?;
        PLANETS.get(index)
    }

    pub fn clock(&self) -> f32 {
        self.orbit.clock
    }
}

impl Scene for SolarScene {
    fn title(&self) -> &'static str {
        "Solar System"
    }

    fn status(&self) -> String {
        format!("{:.1} Earth years", self.orbit.clock * 0.1 / std::f32::consts::TAU)
    }

    fn entities(&self) -> &EntityStore {
        &self.entities
    }

    fn reset(&mut self, rng: &mut StdRng) {
        self.entities.clear();
        self.planets.clear();
        self.orbit = OrbitalAdvance::default();

        scatter_stars(&mut self.entities, STAR_COUNT, STAR_EXTENT, rng);
        self.entities.insert(
            Entity::new(EntityKind::Sun, Vec3::ZERO)
                .with_size(SUN_RADIUS)
                .with_color(Color::hex(0xfbbf24)),
        );

        let radii: Vec<f32> = PLANETS.iter().map(|p| orbit_radius(p.au)).collect();
        for (info, radius) in PLANETS.iter().zip(&radii) {
            let planet = Entity::new(EntityKind::Planet, Vec3::new(*radius, 0.0, 0.0))
                .with_size(info.size)
                .with_color(Color::hex(info.color))
                .with_metadata(info.period_days);
            if let Some(id) = self.entities.insert(planet) {
                self.planets.push(id);
            }
        }
        self.rings = orbit_rings(&radii, ORBIT_SAMPLE_STEP);
        self.orbit.place(&mut self.entities);
    }

    fn tick(&mut self, step: f32, rng: &mut StdRng) {
        self.orbit.apply(&mut self.entities, step, rng);
    }

    fn draw(&self, view: &View, selection: Option<EntityId>, list: &mut DrawList) {
        draw_starfield(view, &self.entities, false, list);

        let sun = view.project(Vec3::ZERO);
        let sun_size = (SUN_RADIUS * sun.scale).max(0.1);
        list.glow((sun.x, sun.y), sun_size * 2.0, Color::hex(0xf59e0b));
        list.circle((sun.x, sun.y), sun_size, Color::hex(0xfbbf24));

        let orbit_color = Color::WHITE.with_alpha(0.05);
        for ring in self.rings.iter() {
            list.mesh_loop(view, ring, 1.0, orbit_color);
        }

        for (planet, p) in depth_sorted(view, self.entities.of_kind(EntityKind::Planet)) {
            let r = (planet.size * p.scale).max(0.1);
            if self.info(planet.id).is_some_and(|info| info.has_rings) {
                let ring: Vec<(f32, f32)> = (0..48)
                    .map(|i| {
                        let a = i as f32 / 48.0 * std::f32::consts::TAU;
                        (p.x + a.cos() * r * 2.5, p.y + a.sin() * r * 0.8)
                    })
                    .collect();
                list.polyline(
                    &ring,
                    (4.0 * p.scale).max(0.1),
                    Color::rgb8(197, 171, 110, 0.4),
                    true,
                );
            }
            if selection == Some(planet.id) {
                list.ring((p.x, p.y), r + 6.0, 2.0, Color::WHITE.with_alpha(0.8));
                list.dashed(
                    &dash_points((sun.x, sun.y), (p.x, p.y), 6.0),
                    1.0,
                    Color::WHITE.with_alpha(0.3),
                );
            }
            list.circle((p.x, p.y), r, planet.color);
        }
    }

    fn pick_targets(&self, view: &View) -> Vec<PickTarget<EntityId>> {
        self.entities
            .of_kind(EntityKind::Planet)
            .map(|planet| {
                let scale = view.project(planet.position).scale;
                PickTarget {
                    id: planet.id,
                    position: planet.position,
                    hit_radius: (planet.size * scale).max(15.0) + 10.0,
                }
            })
            .collect()
    }

    fn describe(&self, id: EntityId) -> Option<String> {
        let info = self.info(id)?;
        Some(format!(
            "{}\n{:.3} AU ({} million km)\nOrbital period {} days",
            info.name, info.au, info.distance_mkm, info.period_days
        ))
    }
}

/// Evenly spaced points from `from` to `to`, about `spacing` apart.
fn dash_points(from: (f32, f32), to: (f32, f32), spacing: f32) -> Vec<(f32, f32)> {
    let length = ((to.0 - from.0).powi(2) + (to.1 - from.1).powi(2)).sqrt();
    let count = ((length / spacing).ceil() as usize).max(1);
    (0..=count)
        .map(|i| {
            let t = i as f32 / count as f32;
            (from.0 + (to.0 - from.0) * t, from.1 + (to.1 - from.1) * t)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_population() {
        let scene = SolarScene::new(&mut StdRng::seed_from_u64(2));
        assert_eq!(scene.entities().count(EntityKind::Planet), 8);
        assert_eq!(scene.entities().count(EntityKind::Sun), 1);
        assert_eq!(scene.entities().count(EntityKind::BackgroundStar), STAR_COUNT);
        assert_eq!(scene.rings.loop_count(), 8);
    }

    /// Planets keep their orbit radius while the clock advances.
    #[test]
    fn test_planets_stay_on_orbit() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut scene = SolarScene::new(&mut rng);
        for _ in 0..500 {
            scene.tick(3.0, &mut rng);
        }
        for (id, info) in scene.planets.iter().zip(PLANETS.iter()) {
            let r = scene.entities.get(*id).map(|e| e.position.planar_length());
            let expected = orbit_radius(info.au);
            assert!(r.is_some_and(|r| (r - expected).abs() < 1e-2), "{}", info.name);
        }
        assert!((scene.clock() - 75.0).abs() < 1e-2);
    }

    #[test]
    fn test_describe_planet() {
        let scene = SolarScene::new(&mut StdRng::seed_from_u64(2));
        let earth = scene.planets[2];
        let text = scene.describe(earth).unwrap_or_default();
        assert!(text.starts_with("Earth"));
        assert!(text.contains("365.2 days"));
        assert_eq!(scene.describe(EntityId(u32::MAX)), None);
    }

    #[test]
    fn test_dash_points_endpoints() {
        let points = dash_points((0.0, 0.0), (30.0, 40.0), 5.0);
        assert_eq!(points.len(), 11);
        assert_eq!(points[0], (0.0, 0.0));
        assert_eq!(points[10], (30.0, 40.0));
    }
}
