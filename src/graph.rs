//! Signal propagation over a static connectivity graph.
//!
//! # Overview
//!
//! A [`SignalGraph`] holds directed [`Edge`]s between entities of one scene's
//! [`EntityStore`], each with a precomputed path, plus the set of in-flight
//! [`Pulse`]s. [`SignalGraph::tick`] is the system's only discrete-event step:
//!
//! 1. node activation decays
//! 2. every active pulse advances; pulses reaching the end of their edge light up
//!    the destination and, for intermediate destinations, fan out downstream
//! 3. source nodes fire spontaneously according to the [`FiringPolicy`]
//! 4. all pulses created in steps 2 and 3 are spliced into the active set at once,
//!    up to the population cap
//!
//! New pulses are never advanced in the tick that created them.
//!
//! # Population cap
//!
//! The active set never exceeds [`GraphParams::pulse_cap`]. Pulses that would
//! exceed it are discarded at splice time, newest first.

use std::collections::HashMap;

use rand::Rng;
use rand::rngs::StdRng;

use crate::entity::{ActivationDecay, EntityId, EntityStore};
use crate::math::Vec3;

/// Index of an edge within its graph.
pub type EdgeId = usize;

/// How a node takes part in propagation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRole {
    /// Fires spontaneously; does not relay arrivals.
    Source,
    /// Relays arrivals to its own outgoing edges.
    Intermediate,
    /// Lights up on arrival and stops the cascade.
    Terminal,
}

/// Which sources fire on a given tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FiringPolicy {
    /// With probability `fire_rate * rate_mult * step`, one random source fires
    /// and emits a pulse on every outgoing edge.
    OneOf,
    /// Every source rolls `fire_rate * rate_mult * step * metadata` independently
    /// and emits one pulse on a random outgoing edge. Firing is skipped while the
    /// active set is at the cap.
    PerNode,
}

/// Tunables for one graph. Scenes adjust these at runtime from user controls.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphParams {
    pub policy: FiringPolicy,
    pub fire_rate: f32,
    /// User-facing firing multiplier.
    pub rate_mult: f32,
    /// Probability each emitted pulse is dropped.
    pub dropout: f32,
    /// Progress per tick at step 1.
    pub base_speed: f32,
    /// Extra random speed in `[0, speed_spread)` added per pulse.
    pub speed_spread: f32,
    pub speed_mult: f32,
    /// Scales both per-tick progress noise and visual jitter.
    pub noise: f32,
    /// Fan-out requires `intensity > fanout_threshold * 0.4`.
    pub fanout_threshold: f32,
    pub pulse_cap: usize,
    pub decay: ActivationDecay,
}

impl Default for GraphParams {
    fn default() -> Self {
        Self {
            policy: FiringPolicy::OneOf,
            fire_rate: 0.08,
            rate_mult: 1.0,
            dropout: 0.1,
            base_speed: 0.02,
            speed_spread: 0.0,
            speed_mult: 1.0,
            noise: 0.05,
            fanout_threshold: 0.5,
            pulse_cap: 1500,
            decay: ActivationDecay::Linear(0.04),
        }
    }
}

/// Static directed connection.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub from: EntityId,
    pub to: EntityId,
    /// Ordered samples from `from` to `to`; never empty.
    pub path: Vec<Vec3>,
}

/// An in-flight signal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pulse {
    pub edge: EdgeId,
    /// In `[0, 1)` while active.
    pub progress: f32,
    pub intensity: f32,
    /// Visual offset perpendicular to the edge.
    pub jitter: f32,
    /// Progress per tick at step 1.
    pub speed: f32,
}

/// What happened during one tick.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TickReport {
    /// Sources that fired this tick.
    pub fired: Vec<EntityId>,
    /// Destinations reached this tick, one entry per arriving pulse.
    pub arrived: Vec<EntityId>,
    /// Pulses added to the active set.
    pub spawned: usize,
    /// Pulses discarded by dropout or the cap.
    pub dropped: usize,
}

/// Adjacency plus pulses for one scene.
#[derive(Debug, Default, Clone)]
pub struct SignalGraph {
    roles: HashMap<EntityId, NodeRole>,
    nodes: Vec<EntityId>,
    edges: Vec<Edge>,
    outgoing: HashMap<EntityId, Vec<EdgeId>>,
    pulses: Vec<Pulse>,
}

impl SignalGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a node. Re-adding a node updates its role.
    pub fn add_node(&mut self, id: EntityId, role: NodeRole) {
        if self.roles.insert(id, role).is_none() {
            self.nodes.push(id);
        }
    }

    /// Adds an edge between two registered nodes.
    ///
    /// Returns `None` for self edges, unknown endpoints or an empty path.
    pub fn add_edge(&mut self, from: EntityId, to: EntityId, path: Vec<Vec3>) -> Option<EdgeId> {
        if from == to || path.is_empty() {
            return None;
        }
        if !self.roles.contains_key(&from) || !self.roles.contains_key(&to) {
            return None;
        }
        let id = self.edges.len();
        self.edges.push(Edge { from, to, path });
        self.outgoing.entry(from).or_default().push(id);
        Some(id)
    }

    pub fn role(&self, id: EntityId) -> Option<NodeRole> {
        self.roles.get(&id).copied()
    }

    pub fn nodes(&self) -> &[EntityId] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(id)
    }

    pub fn outgoing(&self, id: EntityId) -> &[EdgeId] {
        self.outgoing.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn pulses(&self) -> &[Pulse] {
        &self.pulses
    }

    pub fn pulse_count(&self) -> usize {
        self.pulses.len()
    }

    /// Whether every node the graph references exists in `store`.
    pub fn is_consistent_with(&self, store: &EntityStore) -> bool {
        self.nodes.iter().all(|id| store.contains(*id))
    }

    /// Drops every in-flight pulse.
    pub fn clear_pulses(&mut self) {
        self.pulses.clear();
    }

    /// Drops nodes, edges and pulses.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Point at `progress` along an edge's path, linearly interpolated.
    pub fn sample(&self, edge: EdgeId, progress: f32) -> Option<Vec3> {
        let path = &self.edge(edge)?.path;
        let last = path.len() - 1;
        if last == 0 {
            return path.first().copied();
        }
        let scaled = progress.clamp(0.0, 1.0) * last as f32;
        let index = (scaled.floor() as usize).min(last - 1);
        let t = scaled - index as f32;
        Some(path[index].lerp(&path[index + 1], t))
    }

    fn spawn(&self, edge: EdgeId, intensity: f32, params: &GraphParams, rng: &mut StdRng) -> Pulse {
        Pulse {
            edge,
            progress: 0.0,
            intensity,
            jitter: (rng.r#gen::<f32>() - 0.5) * params.noise * 40.0,
            speed: (params.base_speed + rng.r#gen::<f32>() * params.speed_spread) * params.speed_mult,
        }
    }

    fn fire_all_edges(
        &self,
        source: EntityId,
        params: &GraphParams,
        rng: &mut StdRng,
        spawned: &mut Vec<Pulse>,
        report: &mut TickReport,
    ) {
        for &edge in self.outgoing(source) {
            if rng.r#gen::<f32>() >= params.dropout {
                spawned.push(self.spawn(edge, 1.0, params, rng));
            } else {
                report.dropped += 1;
            }
        }
    }

    /// Advances the graph by one tick. See the module docs for the ordering.
    pub fn tick(
        &mut self,
        entities: &mut EntityStore,
        params: &GraphParams,
        step: f32,
        rng: &mut StdRng,
    ) -> TickReport {
        let mut report = TickReport::default();
        let mut spawned: Vec<Pulse> = Vec::new();

        let decay = params.decay.scaled(step);
        for id in &self.nodes {
            if let Some(node) = entities.get_mut(*id) {
                if node.activation > 0.0 {
                    node.activation = decay.apply(node.activation);
                }
            }
        }

        let mut still_active = Vec::with_capacity(self.pulses.len());
        for mut pulse in self.pulses.drain(..) {
            let noise = (rng.r#gen::<f32>() - 0.5) * params.noise * 0.05;
            pulse.progress += pulse.speed * step + noise;
            if pulse.progress < 1.0 {
                still_active.push(pulse);
                continue;
            }

            let Some(edge) = self.edges.get(pulse.edge) else {
                continue;
            };
            let target = edge.to;
            if let Some(node) = entities.get_mut(target) {
                node.fire();
            }
            report.arrived.push(target);

            if self.roles.get(&target) != Some(&NodeRole::Intermediate) {
                continue;
            }
            if let Some(next_edges) = self.outgoing.get(&target) {
                for &next in next_edges {
                    let passes = rng.r#gen::<f32>() >= params.dropout
                        && pulse.intensity > params.fanout_threshold * 0.4;
                    if passes {
                        let intensity = pulse.intensity * rng.gen_range(0.9..=1.0);
                        let child = Pulse {
                            edge: next,
                            progress: 0.0,
                            intensity,
                            jitter: (rng.r#gen::<f32>() - 0.5) * params.noise * 40.0,
                            speed: pulse.speed,
                        };
                        spawned.push(child);
                    } else {
                        report.dropped += 1;
                    }
                }
            }
        }
        self.pulses = still_active;

        let sources: Vec<EntityId> = self
            .nodes
            .iter()
            .copied()
            .filter(|id| self.roles.get(id) == Some(&NodeRole::Source))
            .collect();

        match params.policy {
            FiringPolicy::OneOf => {
                let chance = params.fire_rate * params.rate_mult * step;
                if !sources.is_empty() && rng.r#gen::<f32>() < chance {
                    let source = sources[rng.gen_range(0..sources.len())];
                    if let Some(node) = entities.get_mut(source) {
                        node.fire();
                    }
                    report.fired.push(source);
                    self.fire_all_edges(source, params, rng, &mut spawned, &mut report);
                }
            }
            FiringPolicy::PerNode => {
                if self.pulses.len() + spawned.len() < params.pulse_cap {
                    for source in sources {
                        let Some(node) = entities.get_mut(source) else {
                            continue;
                        };
                        let chance = node.metadata * params.rate_mult * params.fire_rate * step;
                        if rng.r#gen::<f32>() >= chance {
                            continue;
                        }
                        let edges = self.outgoing(source);
                        if edges.is_empty() {
                            continue;
                        }
                        node.fire();
                        report.fired.push(source);
                        let edge = edges[rng.gen_range(0..edges.len())];
                        if rng.r#gen::<f32>() >= params.dropout {
                            spawned.push(self.spawn(edge, 1.0, params, rng));
                        } else {
                            report.dropped += 1;
                        }
                    }
                }
            }
        }

        let room = params.pulse_cap.saturating_sub(self.pulses.len());
        if spawned.len() > room {
            report.dropped += spawned.len() - room;
            spawned.truncate(room);
        }
        report.spawned = spawned.len();
        self.pulses.extend(spawned);

        log::trace!(
            "graph tick: {} active, {} spawned, {} arrived",
            self.pulses.len(),
            report.spawned,
            report.arrived.len()
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Entity, EntityKind, Layer};
    use rand::SeedableRng;

    fn node(store: &mut EntityStore, layer: Layer, x: f32) -> EntityId {
        store
            .insert(Entity::new(EntityKind::Node(layer), Vec3::new(x, 0.0, 0.0)).with_metadata(1.0))
            .expect("inserted")
    }

    fn straight(store: &EntityStore, from: EntityId, to: EntityId) -> Vec<Vec3> {
        let a = store.get(from).map(|e| e.position).unwrap_or_default();
        let b = store.get(to).map(|e| e.position).unwrap_or_default();
        (0..=20).map(|i| a.lerp(&b, i as f32 / 20.0)).collect()
    }

    /// Source -> three intermediates in a chain -> terminal.
    fn chain() -> (EntityStore, SignalGraph, Vec<EntityId>) {
        let mut store = EntityStore::new();
        let mut graph = SignalGraph::new();
        let ids = vec![
            node(&mut store, Layer::Input, -300.0),
            node(&mut store, Layer::Hidden1, -100.0),
            node(&mut store, Layer::Hidden2, 0.0),
            node(&mut store, Layer::Hidden2, 100.0),
            node(&mut store, Layer::Output, 300.0),
        ];
        graph.add_node(ids[0], NodeRole::Source);
        for id in &ids[1..4] {
            graph.add_node(*id, NodeRole::Intermediate);
        }
        graph.add_node(ids[4], NodeRole::Terminal);
        for pair in ids.windows(2) {
            let path = straight(&store, pair[0], pair[1]);
            graph.add_edge(pair[0], pair[1], path);
        }
        (store, graph, ids)
    }

    fn lossless() -> GraphParams {
        GraphParams {
            fire_rate: 1.0,
            dropout: 0.0,
            noise: 0.0,
            ..GraphParams::default()
        }
    }

    /// With no dropout every reachable node lights up at least once.
    #[test]
    fn test_all_reachable_activate() {
        let (mut store, mut graph, ids) = chain();
        let params = lossless();
        let mut rng = StdRng::seed_from_u64(11);
        let mut lit = vec![false; ids.len()];
        for _ in 0..400 {
            graph.tick(&mut store, &params, 1.0, &mut rng);
            for (i, id) in ids.iter().enumerate() {
                if store.get(*id).map(|e| e.activation) == Some(1.0) {
                    lit[i] = true;
                }
            }
        }
        assert!(lit.iter().all(|l| *l), "{lit:?}");
    }

    /// With total dropout nothing downstream of the source ever activates.
    #[test]
    fn test_full_dropout_blocks() {
        let (mut store, mut graph, ids) = chain();
        let params = GraphParams {
            dropout: 1.0,
            ..lossless()
        };
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..400 {
            let report = graph.tick(&mut store, &params, 1.0, &mut rng);
            assert!(report.arrived.is_empty());
            for id in &ids[1..] {
                assert_eq!(store.get(*id).map(|e| e.activation), Some(0.0));
            }
        }
        assert_eq!(graph.pulse_count(), 0);
    }

    /// Saturated firing never pushes the active set past the cap.
    #[test]
    fn test_pulse_cap_respected() {
        let mut store = EntityStore::new();
        let mut graph = SignalGraph::new();
        let ids: Vec<EntityId> = (0..40)
            .map(|i| node(&mut store, Layer::Hidden1, i as f32 * 10.0))
            .collect();
        for id in &ids {
            graph.add_node(*id, NodeRole::Source);
        }
        for (i, from) in ids.iter().enumerate() {
            for to in ids.iter().skip(i + 1).take(5) {
                let path = straight(&store, *from, *to);
                graph.add_edge(*from, *to, path);
            }
        }
        let params = GraphParams {
            policy: FiringPolicy::PerNode,
            fire_rate: 100.0,
            base_speed: 0.001,
            pulse_cap: 64,
            ..lossless()
        };
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..500 {
            graph.tick(&mut store, &params, 1.0, &mut rng);
            assert!(graph.pulse_count() <= 64);
        }
        assert_eq!(graph.pulse_count(), 64);
    }

    /// Dense fan-out cascades stay under the cap too.
    #[test]
    fn test_fanout_cap_respected() {
        let mut store = EntityStore::new();
        let mut graph = SignalGraph::new();
        let source = node(&mut store, Layer::Input, 0.0);
        graph.add_node(source, NodeRole::Source);
        let hidden: Vec<EntityId> = (0..12)
            .map(|i| node(&mut store, Layer::Hidden1, i as f32))
            .collect();
        for id in &hidden {
            graph.add_node(*id, NodeRole::Intermediate);
            let path = straight(&store, source, *id);
            graph.add_edge(source, *id, path);
        }
        for from in &hidden {
            for to in &hidden {
                let path = straight(&store, *from, *to);
                graph.add_edge(*from, *to, path);
            }
        }
        let params = GraphParams {
            pulse_cap: 200,
            base_speed: 0.5,
            ..lossless()
        };
        let mut rng = StdRng::seed_from_u64(2);
        for _ in 0..200 {
            graph.tick(&mut store, &params, 1.0, &mut rng);
            assert!(graph.pulse_count() <= 200);
        }
    }

    /// When one source fires more edges than the cap has room for, the first
    /// edges keep their pulses and the rest are dropped; later firings find no
    /// room and leave the existing pulses untouched.
    #[test]
    fn test_one_of_overflow_drops_newest() {
        let mut store = EntityStore::new();
        let mut graph = SignalGraph::new();
        let source = node(&mut store, Layer::Input, 0.0);
        graph.add_node(source, NodeRole::Source);
        for i in 0..30 {
            let target = node(&mut store, Layer::Output, 10.0 + i as f32);
            graph.add_node(target, NodeRole::Terminal);
            let path = straight(&store, source, target);
            graph.add_edge(source, target, path);
        }
        let params = GraphParams {
            policy: FiringPolicy::OneOf,
            base_speed: 0.001,
            pulse_cap: 10,
            ..lossless()
        };
        let mut rng = StdRng::seed_from_u64(17);

        let report = graph.tick(&mut store, &params, 1.0, &mut rng);
        assert_eq!(report.fired, vec![source]);
        assert_eq!((report.spawned, report.dropped), (10, 20));
        let edges: Vec<EdgeId> = graph.pulses().iter().map(|p| p.edge).collect();
        assert_eq!(edges, (0..10).collect::<Vec<_>>());

        let report = graph.tick(&mut store, &params, 1.0, &mut rng);
        assert_eq!((report.spawned, report.dropped), (0, 30));
        let edges: Vec<EdgeId> = graph.pulses().iter().map(|p| p.edge).collect();
        assert_eq!(edges, (0..10).collect::<Vec<_>>());
        assert!(graph.pulses().iter().all(|p| (p.progress - 0.001).abs() < 1e-6));
    }

    #[test]
    fn test_rejects_bad_edges() {
        let mut store = EntityStore::new();
        let mut graph = SignalGraph::new();
        let a = node(&mut store, Layer::Input, 0.0);
        let b = node(&mut store, Layer::Output, 10.0);
        graph.add_node(a, NodeRole::Source);
        assert!(graph.add_edge(a, a, vec![Vec3::ZERO]).is_none());
        assert!(graph.add_edge(a, b, vec![Vec3::ZERO]).is_none());
        graph.add_node(b, NodeRole::Terminal);
        assert!(graph.add_edge(a, b, Vec::new()).is_none());
        assert_eq!(graph.add_edge(a, b, vec![Vec3::ZERO]), Some(0));
        assert!(graph.is_consistent_with(&store));
    }

    #[test]
    fn test_sample_along_path() {
        let (store, graph, ids) = chain();
        let start = store.get(ids[0]).map(|e| e.position).unwrap_or_default();
        let end = store.get(ids[1]).map(|e| e.position).unwrap_or_default();
        assert_eq!(graph.sample(0, 0.0), Some(start));
        let last = graph.sample(0, 1.0).unwrap_or_default();
        assert!(last.distance(&end) < 1e-3);
        let mid = graph.sample(0, 0.5).unwrap_or_default();
        assert!((mid.x - (-200.0)).abs() < 1e-3);
        assert!(graph.sample(99, 0.5).is_none());
    }

    /// A one-point path samples to that point at any progress.
    #[test]
    fn test_sample_single_point_path() {
        let mut store = EntityStore::new();
        let mut graph = SignalGraph::new();
        let a = node(&mut store, Layer::Input, 0.0);
        let b = node(&mut store, Layer::Output, 10.0);
        graph.add_node(a, NodeRole::Source);
        graph.add_node(b, NodeRole::Terminal);
        let point = Vec3::new(3.0, -2.0, 7.0);
        let edge = graph.add_edge(a, b, vec![point]).expect("edge");
        for progress in [-1.0, 0.0, 0.4, 1.0, 2.5] {
            assert_eq!(graph.sample(edge, progress), Some(point));
        }
    }
}
