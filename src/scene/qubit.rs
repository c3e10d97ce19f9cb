//! Two-qubit register with Hadamard, Bell-pair entanglement and measurement.

use std::f32::consts::FRAC_1_SQRT_2;

use rand::Rng;
use rand::rngs::StdRng;

use super::{Scene, SceneAction, Tunable};
use crate::camera::PickTarget;
use crate::color::Color;
use crate::entity::{Entity, EntityId, EntityKind, EntityStore};
use crate::graph::{EdgeId, NodeRole, SignalGraph};
use crate::math::Vec3;
use crate::projector::View;
use crate::renderer::draw_list::DrawList;
use crate::scheduler::NOMINAL_STEP;

const QUBIT_X: f32 = 120.0;
const QUBIT_RADIUS: f32 = 35.0;
const LINK_SEGMENTS: usize = 40;
const ZERO_COLOR: Color = Color::hex(0x3b82f6);
const ONE_COLOR: Color = Color::hex(0xef4444);
const LINK_COLOR: Color = Color::hex(0x22d3ee);

/// Real amplitudes of one qubit, `alpha|0⟩ + beta|1⟩`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Amplitudes {
    pub alpha: f32,
    pub beta: f32,
}

impl Amplitudes {
    pub const ZERO: Amplitudes = Amplitudes {
        alpha: 1.0,
        beta: 0.0,
    };
    pub const ONE: Amplitudes = Amplitudes {
        alpha: 0.0,
        beta: 1.0,
    };

    pub fn hadamard(self) -> Self {
        Self {
            alpha: (self.alpha + self.beta) * FRAC_1_SQRT_2,
            beta: (self.alpha - self.beta) * FRAC_1_SQRT_2,
        }
    }

    /// Probability of measuring `|0⟩`.
    pub fn p0(&self) -> f32 {
        self.alpha * self.alpha
    }

    pub fn p1(&self) -> f32 {
        self.beta * self.beta
    }

    pub fn is_superposed(&self) -> bool {
        (self.alpha * self.beta).abs() > 0.1
    }
}

#[derive(Debug, Clone, Copy)]
struct Qubit {
    id: EntityId,
    name: &'static str,
    state: Amplitudes,
    partner: Option<usize>,
}

pub struct QubitScene {
    entities: EntityStore,
    qubits: Vec<Qubit>,
    link: SignalGraph,
    link_edge: Option<EdgeId>,
    photon: Option<EntityId>,
    decoherence: f32,
    time: f32,
}

impl QubitScene {
    pub fn new(rng: &mut StdRng) -> Self {
        let mut scene = Self {
            entities: EntityStore::new(),
            qubits: Vec::new(),
            link: SignalGraph::new(),
            link_edge: None,
            photon: None,
            decoherence: 0.0,
            time: 0.0,
        };
        scene.reset(rng);
        scene
    }

    pub fn amplitudes(&self, index: usize) -> Option<Amplitudes> {
        self.qubits.get(index).map(|q| q.state)
    }

    pub fn is_entangled(&self) -> bool {
        self.qubits.iter().any(|q| q.partner.is_some())
    }

    pub fn decoherence(&self) -> f32 {
        self.decoherence
    }

    /// Re-lays the link between the qubits' rest positions.
    fn rebuild_link(&mut self) {
        self.link.clear();
        self.link_edge = None;
        let ends: Vec<(EntityId, Vec3)> = self
            .qubits
            .iter()
            .filter_map(|q| self.entities.get(q.id).map(|e| (q.id, e.origin)))
            .collect();
        for (id, _) in &ends {
            self.link.add_node(*id, NodeRole::Terminal);
        }
        if let [(a, start), (b, end)] = ends.as_slice() {
            let path = (0..=LINK_SEGMENTS)
                .map(|i| start.lerp(end, i as f32 / LINK_SEGMENTS as f32))
                .collect();
            self.link_edge = self.link.add_edge(*a, *b, path);
        }
    }

    /// Fraction of the link the photon has travelled.
    fn photon_progress(&self) -> f32 {
        (self.time * 0.5).rem_euclid(1.0)
    }

    fn sync_entities(&mut self) {
        for qubit in &self.qubits {
            if let Some(entity) = self.entities.get_mut(qubit.id) {
                entity.metadata = qubit.state.p0();
                entity.color = ZERO_COLOR.mix(ONE_COLOR, qubit.state.p1());
            }
        }
        let entangled = self.is_entangled();
        if let Some(photon) = self.photon.and_then(|id| self.entities.get_mut(id)) {
            photon.visible = entangled;
        }
    }

    fn hadamard(&mut self, index: usize) -> bool {
        let Some(qubit) = self.qubits.get_mut(index) else {
            return false;
        };
        qubit.state = qubit.state.hadamard();
        self.sync_entities();
        true
    }

    fn entangle(&mut self) -> bool {
        if self.qubits.len() < 2 {
            return false;
        }
        for (index, qubit) in self.qubits.iter_mut().enumerate() {
            qubit.state = Amplitudes {
                alpha: FRAC_1_SQRT_2,
                beta: FRAC_1_SQRT_2,
            };
            qubit.partner = Some(1 - index.min(1));
        }
        self.sync_entities();
        log::info!("qubits entangled in a Bell pair");
        true
    }

    /// Measures one qubit; an entangled partner collapses to the same outcome.
    fn measure(&mut self, index: usize, rng: &mut StdRng) -> bool {
        let Some(qubit) = self.qubits.get(index).copied() else {
            return false;
        };
        let outcome = if rng.r#gen::<f32>() < qubit.state.p0() {
            Amplitudes::ZERO
        } else {
            Amplitudes::ONE
        };
        let mut collapsed = vec![index];
        collapsed.extend(qubit.partner);
        for i in collapsed {
            if let Some(q) = self.qubits.get_mut(i) {
                q.state = outcome;
            }
        }
        for q in &mut self.qubits {
            q.partner = None;
        }
        self.sync_entities();
        log::info!(
            "{} measured |{}⟩",
            qubit.name,
            if outcome == Amplitudes::ZERO { 0 } else { 1 }
        );
        true
    }
}

impl Scene for QubitScene {
    fn title(&self) -> &'static str {
        "Qubit Register"
    }

    fn status(&self) -> String {
        let entropy = if self.is_entangled() { 1.0 } else { 0.0 };
        format!(
            "{} / S = {:.2} bits / decoherence {:.0}%",
            if self.is_entangled() {
                "maximally entangled"
            } else {
                "separable"
            },
            entropy,
            self.decoherence * 100.0
        )
    }

    fn entities(&self) -> &EntityStore {
        &self.entities
    }

    fn reset(&mut self, _rng: &mut StdRng) {
        self.entities.clear();
        self.qubits.clear();
        self.time = 0.0;

        for (name, x) in [("Qubit A", -QUBIT_X), ("Qubit B", QUBIT_X)] {
            let entity = Entity::new(EntityKind::Qubit, Vec3::new(x, 0.0, 0.0)).with_size(QUBIT_RADIUS);
            if let Some(id) = self.entities.insert(entity) {
                self.qubits.push(Qubit {
                    id,
                    name,
                    state: Amplitudes::ZERO,
                    partner: None,
                });
            }
        }
        self.rebuild_link();
        self.photon = self.entities.insert(
            Entity::new(EntityKind::LinkPhoton, Vec3::ZERO)
                .with_size(3.0)
                .with_color(Color::WHITE),
        );
        self.sync_entities();
    }

    fn tick(&mut self, step: f32, rng: &mut StdRng) {
        self.time += NOMINAL_STEP * step;
        let amplitude = self.decoherence * 6.0;
        for qubit in &self.qubits {
            if let Some(entity) = self.entities.get_mut(qubit.id) {
                let shake = if amplitude > 0.0 {
                    Vec3::new(
                        rng.gen_range(-amplitude..=amplitude),
                        rng.gen_range(-amplitude..=amplitude),
                        rng.gen_range(-amplitude..=amplitude),
                    )
                } else {
                    Vec3::ZERO
                };
                entity.position = entity.origin + shake;
            }
        }
        let sample = self
            .link_edge
            .and_then(|edge| self.link.sample(edge, self.photon_progress()));
        if let (Some(position), Some(photon)) = (sample, self.photon.and_then(|id| self.entities.get_mut(id))) {
            photon.position = position;
        }
    }

    fn draw(&self, view: &View, selection: Option<EntityId>, list: &mut DrawList) {
        let coherence = 1.0 - self.decoherence;
        if self.is_entangled() {
            if let Some(edge) = self.link_edge.and_then(|e| self.link.edge(e)) {
                let points: Vec<(f32, f32)> = edge
                    .path
                    .iter()
                    .enumerate()
                    .map(|(i, point)| {
                        let p = view.project(*point);
                        let t = i as f32 / LINK_SEGMENTS as f32;
                        let wave = (t * 10.0 + self.time * 5.0).sin() * 5.0 * coherence;
                        (p.x, p.y + wave)
                    })
                    .collect();
                let scale = view.project(edge.path[0]).scale;
                list.polyline(&points, 4.0 * scale, LINK_COLOR.with_alpha(0.4 * coherence), false);
            }
            if let Some(photon) = self.photon.and_then(|id| self.entities.get(id)) {
                let p = view.project(photon.position);
                let t = self.photon_progress();
                let wave = (t * 10.0 + self.time * 5.0).sin() * 5.0;
                list.circle((p.x, p.y + wave), photon.size * p.scale, Color::WHITE);
            }
        }

        let mut projected: Vec<_> = self
            .qubits
            .iter()
            .filter_map(|q| self.entities.get(q.id).map(|e| (q, e, view.project(e.position))))
            .filter(|(_, _, p)| p.is_visible(view.fov))
            .collect();
        projected.sort_by(|a, b| b.2.depth.total_cmp(&a.2.depth));

        for (qubit, entity, p) in projected {
            let r = entity.size * p.scale;
            let halo = if qubit.partner.is_some() {
                LINK_COLOR.with_alpha(0.4)
            } else {
                ZERO_COLOR.with_alpha(qubit.state.p0() * 0.4).mix(
                    ONE_COLOR.with_alpha(qubit.state.p1() * 0.4),
                    qubit.state.p1(),
                )
            };
            list.glow((p.x, p.y), r * 2.5, halo);
            list.circle((p.x, p.y), r, entity.color.with_alpha(0.9));
            if qubit.state.is_superposed() {
                let spokes = Color::WHITE.with_alpha((0.3 * p.scale).min(1.0));
                for i in 0..6 {
                    let a = i as f32 / 6.0 * std::f32::consts::TAU + self.time;
                    list.line((p.x, p.y), (p.x + a.cos() * r, p.y + a.sin() * r), 1.0, spokes);
                }
            }
            if selection == Some(qubit.id) {
                list.ring((p.x, p.y), r + 8.0, 2.0, Color::WHITE.with_alpha(0.8));
            }
        }
    }

    fn pick_targets(&self, view: &View) -> Vec<PickTarget<EntityId>> {
        self.entities
            .of_kind(EntityKind::Qubit)
            .map(|e| PickTarget {
                id: e.id,
                position: e.position,
                hit_radius: (e.size * view.project(e.position).scale).max(15.0),
            })
            .collect()
    }

    fn describe(&self, id: EntityId) -> Option<String> {
        let qubit = self.qubits.iter().find(|q| q.id == id)?;
        let state = if qubit.partner.is_some() {
            "ψ = 1/√2(|00⟩ + |11⟩)".to_string()
        } else {
            format!("{:.2}|0⟩ + {:.2}|1⟩", qubit.state.alpha, qubit.state.beta)
        };
        Some(format!(
            "{}\n{}\nP(0) = {:.0}%  P(1) = {:.0}%",
            qubit.name,
            state,
            qubit.state.p0() * 100.0,
            qubit.state.p1() * 100.0
        ))
    }

    fn handle(&mut self, action: SceneAction, rng: &mut StdRng) -> bool {
        match action {
            SceneAction::Hadamard(index) => self.hadamard(index),
            SceneAction::Entangle => self.entangle(),
            SceneAction::Measure(index) => self.measure(index, rng),
            SceneAction::SetDecoherence(value) => {
                self.decoherence = value.clamp(0.0, 1.0);
                true
            }
            _ => false,
        }
    }

    fn tunables(&self) -> Vec<Tunable> {
        vec![Tunable::new("decoherence", self.decoherence, 0.1)]
    }

    fn tune(&mut self, index: usize, value: f32, rng: &mut StdRng) -> bool {
        index == 0 && self.handle(SceneAction::SetDecoherence(value), rng)
    }

    fn grabbable(&self, id: EntityId) -> bool {
        self.qubits.iter().any(|q| q.id == id)
    }

    /// Moves a qubit's rest position; the link follows.
    fn drag_entity(&mut self, id: EntityId, offset: Vec3) -> bool {
        if !self.grabbable(id) {
            return false;
        }
        let Some(entity) = self.entities.get_mut(id) else {
            return false;
        };
        entity.origin += offset;
        entity.position += offset;
        self.rebuild_link();
        true
    }
}
