//! Feed-forward network with pulses travelling layer to layer.

use std::collections::HashMap;

use rand::Rng;
use rand::rngs::StdRng;

use super::{Scene, SceneParams, Tunable};
use crate::camera::PickTarget;
use crate::color::Color;
use crate::entity::{ActivationDecay, Entity, EntityId, EntityKind, EntityStore, Layer};
use crate::graph::{EdgeId, FiringPolicy, GraphParams, NodeRole, SignalGraph};
use crate::math::Vec3;
use crate::projector::View;
use crate::renderer::draw_list::DrawList;

const PATH_SEGMENTS: usize = 20;
const PATH_BEND: f32 = 20.0;
const AURA_START_RADIUS: f32 = 20.0;
const AURA_GROWTH: f32 = 4.0;
const AURA_OPACITY: f32 = 0.8;
const AURA_FADE: f32 = 0.02;
const NODE_HIT_RADIUS: f32 = 20.0;
/// Default animation pace; scales firing, propagation, decay and auras.
const PACE: f32 = 1.5;

const INPUT_COLOR: Color = Color::hex(0x3b82f6);
const HIDDEN_COLOR: Color = Color::hex(0x22c55e);
const HIDDEN_ACTIVE: Color = Color::hex(0xeab320);
const OUTPUT_COLOR: Color = Color::hex(0xef4444);

/// Node positions for each layer, in layer order.
fn layout(layer: Layer) -> Vec<Vec3> {
    match layer {
        Layer::Input => (0..4)
            .map(|i| Vec3::new(-300.0, (i as f32 - 1.5) * 100.0, 0.0))
            .collect(),
        Layer::Hidden1 | Layer::Hidden2 => {
            let x = if layer == Layer::Hidden1 { -100.0 } else { 100.0 };
            (0..6)
                .map(|i| {
                    Vec3::new(
                        x,
                        ((i / 2) as f32 - 1.0) * 80.0,
                        ((i % 2) as f32 - 0.5) * 80.0,
                    )
                })
                .collect()
        }
        Layer::Output => (0..3)
            .map(|i| Vec3::new(300.0, 0.0, (i as f32 - 1.0) * 120.0))
            .collect(),
    }
}

/// Edge path bowed upward in the middle.
fn bent_path(from: Vec3, to: Vec3) -> Vec<Vec3> {
    (0..=PATH_SEGMENTS)
        .map(|step| {
            let t = step as f32 / PATH_SEGMENTS as f32;
            let bend = (t * std::f32::consts::PI).sin() * PATH_BEND;
            from.lerp(&to, t) + Vec3::new(0.0, bend, 0.0)
        })
        .collect()
}

pub struct NetworkScene {
    entities: EntityStore,
    graph: SignalGraph,
    params: GraphParams,
    /// Rotation of the hidden-node markers.
    spin: f32,
    time: f32,
}

impl NetworkScene {
    pub fn new(scene_params: &SceneParams, rng: &mut StdRng) -> Self {
        let params = GraphParams {
            policy: FiringPolicy::OneOf,
            fire_rate: 0.08,
            dropout: 0.1,
            base_speed: 0.02,
            noise: 0.05,
            fanout_threshold: 0.5,
            pulse_cap: scene_params.pulse_cap,
            decay: ActivationDecay::Linear(0.04),
            ..GraphParams::default()
        };
        let mut scene = Self {
            entities: EntityStore::new(),
            graph: SignalGraph::new(),
            params,
            spin: 0.0,
            time: 0.0,
        };
        scene.reset(rng);
        scene
    }

    pub fn graph(&self) -> &SignalGraph {
        &self.graph
    }

    pub fn params(&self) -> &GraphParams {
        &self.params
    }

    /// Probability that any one pulse is lost, clamped to `[0, 0.6]`.
    pub fn set_dropout(&mut self, dropout: f32) {
        self.params.dropout = dropout.clamp(0.0, 0.6);
    }

    /// Activation gate for fan-out, clamped to `[0.1, 0.9]`.
    pub fn set_threshold(&mut self, threshold: f32) {
        self.params.fanout_threshold = threshold.clamp(0.1, 0.9);
    }

    /// Pulse jitter, clamped to `[0, 0.5]`.
    pub fn set_noise(&mut self, noise: f32) {
        self.params.noise = noise.clamp(0.0, 0.5);
    }

    /// Output confidences in node order.
    pub fn outputs(&self) -> Vec<f32> {
        self.entities
            .of_kind(EntityKind::Node(Layer::Output))
            .map(|e| e.metadata)
            .collect()
    }

    fn build(&mut self, rng: &mut StdRng) {
        self.entities.clear();
        self.graph.clear();

        let mut layers: Vec<Vec<EntityId>> = Vec::new();
        for layer in [Layer::Input, Layer::Hidden1, Layer::Hidden2, Layer::Output] {
            let (role, color) = match layer {
                Layer::Input => (NodeRole::Source, INPUT_COLOR),
                Layer::Hidden1 | Layer::Hidden2 => (NodeRole::Intermediate, HIDDEN_COLOR),
                Layer::Output => (NodeRole::Terminal, OUTPUT_COLOR),
            };
            let mut ids = Vec::new();
            for position in layout(layer) {
                let value = match layer {
                    Layer::Input => rng.r#gen::<f32>(),
                    Layer::Output => rng.gen_range(0.1..1.0),
                    _ => 0.0,
                };
                let size = if layer == Layer::Output { 24.0 } else { 18.0 };
                let node = Entity::new(EntityKind::Node(layer), position)
                    .with_color(color)
                    .with_size(size)
                    .with_metadata(value);
                if let Some(id) = self.entities.insert(node) {
                    self.graph.add_node(id, role);
                    ids.push(id);
                }
            }
            layers.push(ids);
        }

        for pair in layers.windows(2) {
            for from in &pair[0] {
                for to in &pair[1] {
                    let (Some(a), Some(b)) = (self.entities.get(*from), self.entities.get(*to)) else {
                        continue;
                    };
                    let path = bent_path(a.position, b.position);
                    self.graph.add_edge(*from, *to, path);
                }
            }
        }
        log::info!(
            "network built: {} nodes, {} edges",
            self.graph.nodes().len(),
            self.graph.edges().len()
        );
    }

    /// Strongest pulse on each edge that currently carries one.
    fn busy_edges(&self) -> HashMap<EdgeId, f32> {
        let mut busy = HashMap::new();
        for pulse in self.graph.pulses() {
            let entry = busy.entry(pulse.edge).or_insert(0.0f32);
            *entry = entry.max(pulse.intensity);
        }
        busy
    }

    fn node_color(node: &Entity, layer: Layer) -> Color {
        match layer {
            Layer::Output => {
                let intensity = 0.3 + node.metadata * 0.7;
                Color::rgb8(
                    (239.0 * intensity) as u8,
                    (68.0 * intensity + node.activation * 100.0).min(255.0) as u8,
                    (68.0 * intensity + node.activation * 100.0).min(255.0) as u8,
                    1.0,
                )
            }
            Layer::Hidden1 | Layer::Hidden2 if node.activation > 0.0 => {
                HIDDEN_COLOR.mix(HIDDEN_ACTIVE, node.activation)
            }
            _ => node.color,
        }
    }

    fn draw_node(&self, node: &Entity, layer: Layer, view: &View, selected: bool, list: &mut DrawList) {
        let p = view.project(node.position);
        if !p.is_visible(view.fov) {
            return;
        }
        let radius = node.size * p.scale * (1.0 + node.activation * 0.25);
        let color = Self::node_color(node, layer);
        if node.activation > 0.0 {
            let blur = if layer == Layer::Output { 30.0 } else { 20.0 };
            list.glow((p.x, p.y), radius + blur * node.activation * p.scale, color);
        }
        list.circle((p.x, p.y), radius, color);
        if node.activation > 0.5 {
            list.circle((p.x - radius * 0.3, p.y - radius * 0.3), radius * 0.35, Color::WHITE.with_alpha(0.6));
        }
        if selected {
            list.ring((p.x, p.y), radius + 6.0, 1.5, Color::WHITE);
        }

        match layer {
            Layer::Hidden1 | Layer::Hidden2 => {
                let marker = if node.activation > 0.1 {
                    Color::hex(0xfbbf24)
                } else {
                    Color::WHITE
                };
                let alpha = 0.4 + node.activation * 0.6;
                for i in 0..4 {
                    let angle = self.spin + i as f32 / 4.0 * std::f32::consts::TAU;
                    let d = radius * 0.55;
                    list.circle(
                        (p.x + angle.cos() * d, p.y + angle.sin() * d),
                        1.2 * p.scale,
                        marker.with_alpha(alpha),
                    );
                }
            }
            Layer::Output => {
                let bar_w = 8.0 * p.scale;
                let bar_h = 60.0 * p.scale;
                let bar_x = p.x + radius + 15.0;
                let bar_y = p.y - bar_h / 2.0;
                list.rect(bar_x, bar_y, bar_w, bar_h, Color::WHITE.with_alpha(0.05));
                let fill = bar_h * node.metadata;
                list.rect(bar_x, bar_y + bar_h - fill, bar_w, fill, OUTPUT_COLOR);
                if node.activation > 0.0 {
                    let outline = [
                        (bar_x - 2.0, bar_y - 2.0),
                        (bar_x + bar_w + 2.0, bar_y - 2.0),
                        (bar_x + bar_w + 2.0, bar_y + bar_h + 2.0),
                        (bar_x - 2.0, bar_y + bar_h + 2.0),
                    ];
                    list.polyline(&outline, 1.0, Color::WHITE.with_alpha(node.activation), true);
                }
            }
            Layer::Input => {}
        }
    }
}

impl Scene for NetworkScene {
    fn title(&self) -> &'static str {
        "Neural Network"
    }

    fn status(&self) -> String {
        let outputs: Vec<String> = self.outputs().iter().map(|v| format!("{v:.2}")).collect();
        format!("4 → 6 → 6 → 3 / out {}", outputs.join(" "))
    }

    fn entities(&self) -> &EntityStore {
        &self.entities
    }

    fn reset(&mut self, rng: &mut StdRng) {
        self.spin = 0.0;
        self.time = 0.0;
        self.build(rng);
    }

    fn tick(&mut self, step: f32, rng: &mut StdRng) {
        let step = step * PACE;
        self.time += 0.016 * step;
        self.spin += 0.1 * step;

        let report = self.graph.tick(&mut self.entities, &self.params, step, rng);

        for id in &report.arrived {
            if let Some(node) = self.entities.get_mut(*id) {
                node.metadata = (node.metadata + (rng.r#gen::<f32>() - 0.5) * 0.05).clamp(0.1, 0.99);
            }
        }

        self.entities.age(AURA_FADE * step);
        for aura in self.entities.iter_mut().filter(|e| e.kind == EntityKind::Aura) {
            aura.size += AURA_GROWTH * step;
        }
        for id in &report.fired {
            let Some(position) = self.entities.get(*id).map(|e| e.position) else {
                continue;
            };
            self.entities.insert(
                Entity::new(EntityKind::Aura, position)
                    .with_size(AURA_START_RADIUS)
                    .with_color(INPUT_COLOR)
                    .with_lifetime(AURA_OPACITY),
            );
        }
    }

    fn draw(&self, view: &View, selection: Option<EntityId>, list: &mut DrawList) {
        let busy = self.busy_edges();
        for (index, edge) in self.graph.edges().iter().enumerate() {
            let from_activation = self.entities.get(edge.from).map(|e| e.activation).unwrap_or(0.0);
            let (width, color) = match busy.get(&index) {
                Some(intensity) => (
                    0.8 + intensity * 2.0,
                    Color::WHITE.with_alpha(0.12 + intensity * 0.4),
                ),
                None => (
                    0.5,
                    Color::rgb8(100, 116, 139, 0.03 + from_activation * 0.08),
                ),
            };
            let points: Vec<(f32, f32)> = edge
                .path
                .iter()
                .map(|pt| view.project(*pt))
                .filter(|p| p.is_visible(view.fov))
                .map(|p| (p.x, p.y))
                .collect();
            list.polyline(&points, width, color, false);
        }

        for aura in self.entities.of_kind(EntityKind::Aura) {
            let p = view.project(aura.position);
            if p.is_visible(view.fov) {
                let opacity = aura.lifetime.unwrap_or(0.0);
                list.ring((p.x, p.y), aura.size * p.scale, 2.0 * p.scale, aura.color.with_alpha(opacity));
            }
        }

        let wobble = (self.time * 10.0).sin_cos();
        for pulse in self.graph.pulses() {
            let Some(point) = self.graph.sample(pulse.edge, pulse.progress) else {
                continue;
            };
            let offset = Vec3::new(pulse.jitter * wobble.0, pulse.jitter * wobble.1, 0.0);
            let p = view.project(point + offset);
            if !p.is_visible(view.fov) {
                continue;
            }
            let r = ((5.0 + self.params.noise * 10.0) * p.scale).max(0.1);
            list.glow((p.x, p.y), r * 2.5, Color::WHITE.with_alpha(pulse.intensity * 0.8));
            list.circle((p.x, p.y), r * 0.6, Color::WHITE);
        }

        for node in self.entities.iter() {
            if let EntityKind::Node(layer) = node.kind {
                self.draw_node(node, layer, view, selection == Some(node.id), list);
            }
        }
    }

    fn pick_targets(&self, _view: &View) -> Vec<PickTarget<EntityId>> {
        self.entities
            .iter()
            .filter(|e| matches!(e.kind, EntityKind::Node(_)))
            .map(|e| PickTarget {
                id: e.id,
                position: e.position,
                hit_radius: NODE_HIT_RADIUS,
            })
            .collect()
    }

    fn describe(&self, id: EntityId) -> Option<String> {
        let node = self.entities.get(id)?;
        let EntityKind::Node(layer) = node.kind else {
            return None;
        };
        let fan_out = self.graph.outgoing(id).len();
        Some(match layer {
            Layer::Output => format!("{} node\nconfidence {:.2}", layer.label(), node.metadata),
            _ => format!(
                "{} node\nactivation {:.2}\n{} outgoing connections",
                layer.label(),
                node.activation,
                fan_out
            ),
        })
    }

    fn pulse_count(&self) -> Option<usize> {
        Some(self.graph.pulse_count())
    }

    fn tunables(&self) -> Vec<Tunable> {
        vec![
            Tunable::new("threshold", self.params.fanout_threshold, 0.05),
            Tunable::new("noise", self.params.noise, 0.05),
            Tunable::new("dropout", self.params.dropout, 0.05),
        ]
    }

    fn tune(&mut self, index: usize, value: f32, _rng: &mut StdRng) -> bool {
        match index {
            0 => self.set_threshold(value),
            1 => self.set_noise(value),
            2 => self.set_dropout(value),
            _ => return false,
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn scene(seed: u64) -> (NetworkScene, StdRng) {
        let mut rng = StdRng::seed_from_u64(seed);
        let scene = NetworkScene::new(&SceneParams::default(), &mut rng);
        (scene, rng)
    }

    /// 4-6-6-3 nodes, fully connected between adjacent layers.
    #[test]
    fn test_topology() {
        let (scene, _) = scene(1);
        assert_eq!(scene.entities().count(EntityKind::Node(Layer::Input)), 4);
        assert_eq!(scene.entities().count(EntityKind::Node(Layer::Hidden1)), 6);
        assert_eq!(scene.entities().count(EntityKind::Node(Layer::Hidden2)), 6);
        assert_eq!(scene.entities().count(EntityKind::Node(Layer::Output)), 3);
        assert_eq!(scene.graph().edges().len(), 4 * 6 + 6 * 6 + 6 * 3);
        assert!(scene.graph().is_consistent_with(scene.entities()));
        assert!(scene.graph().edges().iter().all(|e| e.path.len() == PATH_SEGMENTS + 1));
    }

    /// Edge paths bow by 20 units at their midpoint.
    #[test]
    fn test_path_bend() {
        let path = bent_path(Vec3::new(-100.0, 0.0, 0.0), Vec3::new(100.0, 0.0, 0.0));
        assert_eq!(path[0], Vec3::new(-100.0, 0.0, 0.0));
        assert!((path[PATH_SEGMENTS / 2].y - PATH_BEND).abs() < 1e-4);
        assert!(path[PATH_SEGMENTS].y.abs() < 1e-4);
    }

    /// Inputs fire, leave auras that expire, and pulses reach the outputs.
    #[test]
    fn test_signals_reach_outputs() {
        let (mut scene, mut rng) = scene(2);
        let mut saw_aura = false;
        let mut output_lit = false;
        for _ in 0..600 {
            scene.tick(1.0, &mut rng);
            saw_aura |= scene.entities().count(EntityKind::Aura) > 0;
            output_lit |= scene
                .entities()
                .of_kind(EntityKind::Node(Layer::Output))
                .any(|e| e.activation > 0.0);
            assert!(scene.pulse_count().unwrap_or(0) <= SceneParams::default().pulse_cap);
        }
        assert!(saw_aura);
        assert!(output_lit);
        assert!(scene.outputs().iter().all(|v| (0.1..=0.99).contains(v)));
    }

    /// Auras live for 40 ticks at unit pace.
    #[test]
    fn test_aura_lifetime() {
        let (mut scene, mut rng) = scene(3);
        let id = scene
            .entities
            .insert(Entity::new(EntityKind::Aura, Vec3::ZERO).with_size(20.0).with_lifetime(AURA_OPACITY))
            .expect("aura");
        for _ in 0..39 {
            scene.entities.age(AURA_FADE);
        }
        assert!(scene.entities().contains(id));
        scene.entities.age(AURA_FADE * 2.0);
        assert!(!scene.entities().contains(id));
        scene.tick(1.0, &mut rng);
    }

    /// One frame at rate 1 advances the scene by one and a half steps.
    #[test]
    fn test_default_pace() {
        let (mut scene, mut rng) = scene(6);
        scene.tick(1.0, &mut rng);
        assert!((scene.spin - 0.15).abs() < 1e-6);
        assert!((scene.time - 0.024).abs() < 1e-6);
    }

    #[test]
    fn test_controls_clamped() {
        let (mut scene, _) = scene(4);
        scene.set_dropout(5.0);
        scene.set_threshold(0.0);
        scene.set_noise(-1.0);
        assert_eq!(scene.params().dropout, 0.6);
        assert_eq!(scene.params().fanout_threshold, 0.1);
        assert_eq!(scene.params().noise, 0.0);
    }

    #[test]
    fn test_describe_nodes() {
        let (scene, _) = scene(5);
        let input = scene
            .entities()
            .of_kind(EntityKind::Node(Layer::Input))
            .next()
            .map(|e| e.id)
            .expect("input");
        let text = scene.describe(input).unwrap_or_default();
        assert!(text.contains("6 outgoing"));
        assert!(scene.describe(EntityId(9999)).is_none());
    }
}
