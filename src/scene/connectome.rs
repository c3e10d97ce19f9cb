//! Spiking connectome inside a wireframe cortex.
//!
//! Five regions of neurons fire independently at their own rates and send single
//! pulses along random connections. Most connections stay inside a region; a few
//! are long-range. The cortex shell is drawn in two passes around the neurons: the
//! half facing away first, the near half last with a scanning highlight.

use rand::Rng;
use rand::rngs::StdRng;

use super::{Scene, SceneAction, SceneParams, Tunable};
use crate::camera::PickTarget;
use crate::color::Color;
use crate::entity::{ActivationDecay, Entity, EntityId, EntityKind, EntityStore};
use crate::graph::{FiringPolicy, GraphParams, NodeRole, SignalGraph};
use crate::math::Vec3;
use crate::mesh::{Mesh, Region, ShellParams, brain_shell};
use crate::projector::View;
use crate::renderer::draw_list::DrawList;

const NEURON_HIT_RADIUS: f32 = 12.0;
const LONG_RANGE_CHANCE: f32 = 0.06;
const DIM: Color = Color::hex(0x334155);

/// Neuron count per region, in [`Region::CORTICAL`] order.
const REGION_SIZES: [usize; 5] = [140, 90, 110, 70, 100];

fn centered(rng: &mut StdRng, range: f32) -> f32 {
    (rng.r#gen::<f32>() - 0.5) * range
}

/// Random position for neuron `index` of `region`: a jittered base point plus a
/// region-specific spread.
fn seed_position(region: Region, index: usize, rng: &mut StdRng) -> Vec3 {
    let (base, spread) = match region {
        Region::Parietal => {
            let x = centered(rng, 110.0);
            let y = -40.0 + centered(rng, 90.0);
            let z = 130.0 + rng.r#gen::<f32>() * 40.0;
            (Vec3::new(x, y, z), 55.0)
        }
        Region::Temporal => {
            let side = if index % 2 == 0 { 150.0 } else { -150.0 };
            let x = side + centered(rng, 40.0);
            let y = -20.0 + centered(rng, 110.0);
            let z = -20.0 + centered(rng, 70.0);
            (Vec3::new(x, y, z), 55.0)
        }
        Region::Occipital => {
            let x = centered(rng, 80.0);
            let y = 130.0 + rng.r#gen::<f32>() * 40.0;
            let z = 20.0 + centered(rng, 60.0);
            (Vec3::new(x, y, z), 50.0)
        }
        Region::Cerebellum => {
            let x = centered(rng, 130.0);
            let y = 90.0 + rng.r#gen::<f32>() * 40.0;
            let z = -110.0 - rng.r#gen::<f32>() * 40.0;
            (Vec3::new(x, y, z), 60.0)
        }
        _ => {
            let x = centered(rng, 80.0);
            let y = -140.0 - rng.r#gen::<f32>() * 40.0;
            let z = 20.0 + centered(rng, 70.0);
            (Vec3::new(x, y, z), 65.0)
        }
    };
    let jitter = Vec3::new(
        centered(rng, spread),
        centered(rng, spread),
        centered(rng, spread),
    );
    base + jitter
}

pub struct ConnectomeScene {
    entities: EntityStore,
    graph: SignalGraph,
    params: GraphParams,
    shell: Mesh,
    show_shell: bool,
    time: f32,
}

impl ConnectomeScene {
    pub fn new(scene_params: &SceneParams, rng: &mut StdRng) -> Self {
        let params = GraphParams {
            policy: FiringPolicy::PerNode,
            fire_rate: 0.08,
            dropout: 0.0,
            base_speed: 0.01,
            speed_spread: 0.02,
            noise: 0.0,
            pulse_cap: scene_params.pulse_cap,
            decay: ActivationDecay::Linear(0.05),
            ..GraphParams::default()
        };
        let mut scene = Self {
            entities: EntityStore::new(),
            graph: SignalGraph::new(),
            params,
            shell: Mesh::new(),
            show_shell: true,
            time: 0.0,
        };
        scene.reset(rng);
        scene
    }

    pub fn graph(&self) -> &SignalGraph {
        &self.graph
    }

    /// Global firing multiplier, clamped to `[0.1, 5]`.
    pub fn set_firing_rate(&mut self, mult: f32) {
        self.params.rate_mult = mult.clamp(0.1, 5.0);
    }

    /// Pulse speed multiplier for newly spawned pulses, clamped to `[0.1, 5]`.
    pub fn set_pulse_speed(&mut self, mult: f32) {
        self.params.speed_mult = mult.clamp(0.1, 5.0);
    }

    fn region_of(&self, id: EntityId) -> Option<Region> {
        match self.entities.get(id)?.kind {
            EntityKind::Neuron(region) => Some(region),
            _ => None,
        }
    }

    fn build(&mut self, rng: &mut StdRng) {
        self.entities.clear();
        self.graph.clear();

        let mut by_region: Vec<Vec<EntityId>> = Vec::with_capacity(REGION_SIZES.len());
        for (region, &count) in Region::CORTICAL.iter().zip(REGION_SIZES.iter()) {
            let mut ids = Vec::with_capacity(count);
            for i in 0..count {
                let neuron = Entity::new(EntityKind::Neuron(*region), seed_position(*region, i, rng))
                    .with_color(region.color())
                    .with_size(rng.gen_range(1.5..4.0))
                    .with_metadata(rng.gen_range(0.03..0.1));
                if let Some(id) = self.entities.insert(neuron) {
                    self.graph.add_node(id, NodeRole::Source);
                    ids.push(id);
                }
            }
            by_region.push(ids);
        }

        let all: Vec<EntityId> = by_region.iter().flatten().copied().collect();
        for group in &by_region {
            for &from in group {
                let connections = rng.gen_range(3..=6);
                for _ in 0..connections {
                    let pool = if rng.r#gen::<f32>() < LONG_RANGE_CHANCE {
                        &all
                    } else {
                        group
                    };
                    let to = pool[rng.gen_range(0..pool.len())];
                    if to == from {
                        continue;
                    }
                    let (Some(a), Some(b)) = (self.entities.get(from), self.entities.get(to)) else {
                        continue;
                    };
                    let path = vec![a.position, b.position];
                    self.graph.add_edge(from, to, path);
                }
            }
        }

        self.shell = brain_shell(&ShellParams::default(), rng);
        log::info!(
            "connectome built: {} neurons, {} synapses, {} shell loops",
            self.entities.len(),
            self.graph.edges().len(),
            self.shell.loop_count()
        );
    }

    /// Draws the parts of each shell loop on one side of the depth plane.
    fn draw_shell(&self, view: &View, front: bool, list: &mut DrawList) {
        let scan = (self.time * 0.5).sin() * 200.0;
        for line in self.shell.iter() {
            let mut run: Vec<(f32, f32)> = Vec::new();
            let mut scanned = false;
            let flush = |run: &mut Vec<(f32, f32)>, scanned: bool, list: &mut DrawList| {
                if run.len() >= 2 {
                    let (width, color) = if !front {
                        (0.5, line.region.color().with_alpha(0.07))
                    } else if scanned {
                        (1.0, Color::WHITE.with_alpha(0.4))
                    } else {
                        (0.5, line.region.color().with_alpha(0.13))
                    };
                    list.polyline(run, width, color, false);
                }
                run.clear();
            };
            for point in &line.points {
                let p = view.project(*point);
                let on_side = p.is_visible(view.fov) && (p.depth <= 0.0) == front;
                if !on_side {
                    flush(&mut run, scanned, list);
                    scanned = false;
                    continue;
                }
                let distance = (point.y - scan).abs();
                scanned |= (-distance * distance / 2000.0).exp() > 0.1;
                run.push((p.x, p.y));
            }
            flush(&mut run, scanned, list);
        }
    }
}

impl Scene for ConnectomeScene {
    fn title(&self) -> &'static str {
        "Neural Connectome"
    }

    fn status(&self) -> String {
        format!(
            "{} neurons / {} synapses / shell {}",
            self.entities.len(),
            self.graph.edges().len(),
            if self.show_shell { "on" } else { "off" }
        )
    }

    fn entities(&self) -> &EntityStore {
        &self.entities
    }

    fn reset(&mut self, rng: &mut StdRng) {
        self.time = 0.0;
        self.build(rng);
    }

    fn tick(&mut self, step: f32, rng: &mut StdRng) {
        self.time += 0.016 * step;
        self.graph.tick(&mut self.entities, &self.params, step, rng);
    }

    fn draw(&self, view: &View, selection: Option<EntityId>, list: &mut DrawList) {
        if self.show_shell {
            self.draw_shell(view, false, list);
        }

        for edge in self.graph.edges() {
            let (Some(from), Some(to)) = (self.entities.get(edge.from), self.entities.get(edge.to)) else {
                continue;
            };
            let a = view.project(from.position);
            let b = view.project(to.position);
            if !a.is_visible(view.fov) || !b.is_visible(view.fov) {
                continue;
            }
            let (width, color) = match selection {
                None => (0.4, from.color.with_alpha(0.04)),
                Some(id) if id == edge.from || id == edge.to => (1.5, from.color.with_alpha(0.6)),
                Some(_) => (0.4, DIM.with_alpha(0.01)),
            };
            list.line((a.x, a.y), (b.x, b.y), width, color);
        }

        for pulse in self.graph.pulses() {
            let Some(edge) = self.graph.edge(pulse.edge) else {
                continue;
            };
            let Some(point) = self.graph.sample(pulse.edge, pulse.progress) else {
                continue;
            };
            let p = view.project(point);
            if !p.is_visible(view.fov) {
                continue;
            }
            let color = self
                .entities
                .get(edge.from)
                .map(|e| e.color)
                .unwrap_or(Color::WHITE);
            match selection {
                Some(id) if id == edge.from || id == edge.to => {
                    list.glow((p.x, p.y), 10.0 * p.scale, color);
                    list.circle((p.x, p.y), 2.5 * p.scale, Color::WHITE);
                }
                Some(_) => list.circle((p.x, p.y), 1.2 * p.scale, color.with_alpha(0.05)),
                None => list.circle((p.x, p.y), 1.2 * p.scale, color.with_alpha(0.8)),
            }
        }

        let selected_region = selection.and_then(|id| self.region_of(id));
        for neuron in self.entities.iter() {
            let EntityKind::Neuron(region) = neuron.kind else {
                continue;
            };
            let p = view.project(neuron.position);
            if !p.is_visible(view.fov) {
                continue;
            }
            let selected = selection == Some(neuron.id);
            let alpha = match selected_region {
                Some(r) if !selected && r != region => 0.08,
                _ => 0.9,
            };
            let extra = if selected { 3.0 } else { 0.0 };
            let r = (neuron.size * (1.0 + neuron.activation * 2.0) + extra) * p.scale;
            if neuron.activation > 0.0 {
                list.glow((p.x, p.y), r + 15.0 * neuron.activation * p.scale, Color::WHITE.with_alpha(alpha));
                list.circle((p.x, p.y), r, Color::WHITE.with_alpha(alpha));
            } else {
                list.circle((p.x, p.y), r, neuron.color.with_alpha(alpha));
            }
            if selected {
                list.ring((p.x, p.y), r, 1.5, Color::WHITE);
            }
        }

        if self.show_shell {
            self.draw_shell(view, true, list);
        }
    }

    fn pick_targets(&self, _view: &View) -> Vec<PickTarget<EntityId>> {
        self.entities
            .iter()
            .filter(|e| matches!(e.kind, EntityKind::Neuron(_)))
            .map(|e| PickTarget {
                id: e.id,
                position: e.position,
                hit_radius: NEURON_HIT_RADIUS,
            })
            .collect()
    }

    fn describe(&self, id: EntityId) -> Option<String> {
        let neuron = self.entities.get(id)?;
        let region = self.region_of(id)?;
        let hz = neuron.metadata * self.params.rate_mult * 100.0;
        Some(format!(
            "{} neuron\n{:.1} Hz\n{}",
            region.label(),
            hz,
            region.function()
        ))
    }

    fn handle(&mut self, action: SceneAction, _rng: &mut StdRng) -> bool {
        match action {
            SceneAction::ToggleShell => {
                self.show_shell = !self.show_shell;
                true
            }
            _ => false,
        }
    }

    fn pulse_count(&self) -> Option<usize> {
        Some(self.graph.pulse_count())
    }

    fn tunables(&self) -> Vec<Tunable> {
        vec![
            Tunable::new("firing rate", self.params.rate_mult, 0.25),
            Tunable::new("pulse speed", self.params.speed_mult, 0.25),
        ]
    }

    fn tune(&mut self, index: usize, value: f32, _rng: &mut StdRng) -> bool {
        match index {
            0 => self.set_firing_rate(value),
            1 => self.set_pulse_speed(value),
            _ => return false,
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn scene(seed: u64) -> (ConnectomeScene, StdRng) {
        let mut rng = StdRng::seed_from_u64(seed);
        let scene = ConnectomeScene::new(&SceneParams::default(), &mut rng);
        (scene, rng)
    }

    /// 510 neurons split across the five regions.
    #[test]
    fn test_region_populations() {
        let (scene, _) = scene(1);
        assert_eq!(scene.entities().len(), 510);
        for (region, count) in Region::CORTICAL.iter().zip(REGION_SIZES) {
            assert_eq!(scene.entities().count(EntityKind::Neuron(*region)), count);
        }
        assert!(
            scene
                .entities()
                .iter()
                .all(|e| (0.03..0.1).contains(&e.metadata) && (1.5..4.0).contains(&e.size))
        );
    }

    /// At most six synapses per neuron, none onto itself, mostly within a region.
    #[test]
    fn test_connections() {
        let (scene, _) = scene(2);
        let graph = scene.graph();
        assert!(graph.is_consistent_with(scene.entities()));
        let mut same_region = 0;
        for edge in graph.edges() {
            assert_ne!(edge.from, edge.to);
            if scene.region_of(edge.from) == scene.region_of(edge.to) {
                same_region += 1;
            }
        }
        assert!(same_region as f32 > graph.edges().len() as f32 * 0.9);
        for id in graph.nodes() {
            assert!(graph.outgoing(*id).len() <= 6);
        }
    }

    /// Firing stays under the cap and flashes decay back to zero.
    #[test]
    fn test_firing_capped_and_decays() {
        let mut rng = StdRng::seed_from_u64(3);
        let params = SceneParams { pulse_cap: 40 };
        let mut scene = ConnectomeScene::new(&params, &mut rng);
        scene.set_firing_rate(5.0);
        scene.set_pulse_speed(2.0);
        let mut fired = false;
        for _ in 0..300 {
            scene.tick(1.0, &mut rng);
            assert!(scene.pulse_count().unwrap_or(0) <= 40);
            fired |= scene.entities().iter().any(|e| e.activation > 0.0);
        }
        assert!(fired);
        scene.set_firing_rate(0.1);
        scene.params.fire_rate = 0.0;
        for _ in 0..130 {
            scene.tick(1.0, &mut rng);
        }
        assert_eq!(scene.pulse_count(), Some(0));
        assert!(scene.entities().iter().all(|e| e.activation == 0.0));
    }

    #[test]
    fn test_toggle_shell() {
        let (mut scene, mut rng) = scene(4);
        assert!(scene.show_shell);
        assert!(scene.handle(SceneAction::ToggleShell, &mut rng));
        assert!(!scene.show_shell);
        let mut list = DrawList::new();
        scene.draw(
            &View::new(crate::camera::Camera::new(0.3, -0.4, 0.85), Default::default(), 750.0),
            None,
            &mut list,
        );
        assert!(!list.is_empty());
        assert!(!scene.handle(SceneAction::Observe, &mut rng));
    }

    #[test]
    fn test_describe_reports_rate() {
        let (scene, _) = scene(5);
        let neuron = scene.entities().iter().next().expect("neuron");
        let text = scene.describe(neuron.id).unwrap_or_default();
        assert!(text.starts_with("Frontal neuron"));
        assert!(text.contains("Hz"));
        assert!(text.ends_with("Executive Planning"));
    }
}
