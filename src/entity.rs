//! Entity store: the per-scene arena of simulated points.
//!
//! # Overview
//!
//! Every scene owns exactly one [`EntityStore`]. Entities are kept in a dense
//! `Vec` for cache-friendly sweeps, with a side index from the stable
//! [`EntityId`] to the current slot. Removal is a swap-remove that patches the
//! index, so ids held by graph edges and pulses stay valid while slots move.
//!
//! Stores are rebuilt wholesale on scene reset; between resets the only removals
//! are entities whose finite lifetime runs out.
//!
//! # Population cap
//!
//! A store may be given a capacity. Inserts past the cap are dropped and reported
//! as `None`, never grown.

use std::collections::HashMap;

use crate::color::Color;
use crate::math::Vec3;
use crate::mesh::Region;

/// Stable identifier of an entity within one store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u32);

/// Layer of a feed-forward network node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Layer {
    Input,
    Hidden1,
    Hidden2,
    Output,
}

impl Layer {
    pub fn label(&self) -> &'static str {
        match self {
            Layer::Input => "Input",
            Layer::Hidden1 => "Hidden 1",
            Layer::Hidden2 => "Hidden 2",
            Layer::Output => "Output",
        }
    }
}

/// Particle species reconstructed in a collider event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Species {
    Muon,
    Electron,
    Pion,
    Photon,
    Neutrino,
    Quark,
    Gluon,
}

impl Species {
    pub fn label(&self) -> &'static str {
        match self {
            Species::Muon => "Muon",
            Species::Electron => "Electron",
            Species::Pion => "Pion",
            Species::Photon => "Photon",
            Species::Neutrino => "Neutrino",
            Species::Quark => "Quark",
            Species::Gluon => "Gluon",
        }
    }

    /// Whether the species bends in the solenoid field.
    pub fn is_charged(&self) -> bool {
        matches!(
            self,
            Species::Muon | Species::Electron | Species::Pion | Species::Quark
        )
    }

    /// Partons shower close to the vertex.
    pub fn is_parton(&self) -> bool {
        matches!(self, Species::Quark | Species::Gluon)
    }

    pub fn color(&self) -> Color {
        match self {
            Species::Muon => Color::hex(0xf87171),
            Species::Electron => Color::hex(0x22d3ee),
            Species::Pion => Color::rgb8(148, 163, 184, 0.45),
            Species::Photon => Color::hex(0xfde047),
            Species::Neutrino => Color::WHITE.with_alpha(0.15),
            Species::Quark => Color::hex(0xc084fc),
            Species::Gluon => Color::hex(0x4ade80),
        }
    }
}

/// Calorimeter layer that caught a deposit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaloLayer {
    Ecal,
    Hcal,
}

/// What an entity represents. Drives rule selection and draw style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Sun,
    Planet,
    BackgroundStar,
    Dust,
    Protostar,
    /// Pre-inflation quantum fluctuation.
    Quantum,
    /// Sample of the microwave background sphere.
    CmbPoint,
    /// Gravitating star in the structure epoch.
    Star,
    Nucleus,
    /// Sample of an electron probability cloud.
    Orbital,
    Qubit,
    /// Photon travelling an entanglement link.
    LinkPhoton,
    Track(Species),
    Deposit(CaloLayer),
    Neuron(Region),
    Node(Layer),
    /// Expanding ring left behind when a node fires.
    Aura,
    BlackHole,
}

/// How activation fades after a node fires.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ActivationDecay {
    /// Subtract a fixed amount per tick.
    Linear(f32),
    /// Multiply by a factor per tick.
    Geometric(f32),
}

impl ActivationDecay {
    pub fn apply(&self, activation: f32) -> f32 {
        let next = match *self {
            ActivationDecay::Linear(step) => activation - step,
            ActivationDecay::Geometric(factor) => activation * factor,
        };
        next.clamp(0.0, 1.0)
    }

    /// The same decay stretched over `step` nominal ticks.
    pub fn scaled(&self, step: f32) -> Self {
        match *self {
            ActivationDecay::Linear(amount) => ActivationDecay::Linear(amount * step),
            ActivationDecay::Geometric(factor) => ActivationDecay::Geometric(factor.powf(step)),
        }
    }
}

/// A simulated point-like object.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    /// Assigned by the store on insert.
    pub id: EntityId,
    pub kind: EntityKind,
    pub position: Vec3,
    /// Rest or spawn position; interpolation rules read from it.
    pub origin: Vec3,
    pub velocity: Vec3,
    /// Per-entity phase offset for oscillating visuals.
    pub phase: f32,
    pub color: Color,
    pub size: f32,
    /// In `[0, 1]`; set to 1 on firing and decayed every tick.
    pub activation: f32,
    /// Scene-specific scalar: mass, firing rate, amplitude, energy...
    pub metadata: f32,
    /// Remaining life; `None` lives until reset.
    pub lifetime: Option<f32>,
    pub visible: bool,
}

impl Entity {
    /// Creates an entity at `position` with neutral defaults.
    pub fn new(kind: EntityKind, position: Vec3) -> Self {
        Self {
            id: EntityId(0),
            kind,
            position,
            origin: position,
            velocity: Vec3::ZERO,
            phase: 0.0,
            color: Color::WHITE,
            size: 1.0,
            activation: 0.0,
            metadata: 0.0,
            lifetime: None,
            visible: true,
        }
    }

    pub fn with_velocity(mut self, velocity: Vec3) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn with_size(mut self, size: f32) -> Self {
        self.size = size;
        self
    }

    pub fn with_phase(mut self, phase: f32) -> Self {
        self.phase = phase;
        self
    }

    pub fn with_metadata(mut self, metadata: f32) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_lifetime(mut self, lifetime: f32) -> Self {
        self.lifetime = Some(lifetime);
        self
    }

    /// Marks the entity as having just fired.
    pub fn fire(&mut self) {
        self.activation = 1.0;
    }
}

/// Dense arena of entities with stable ids.
#[derive(Debug, Default, Clone)]
pub struct EntityStore {
    entities: Vec<Entity>,
    index: HashMap<EntityId, usize>,
    next_id: u32,
    capacity: Option<usize>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that refuses inserts once `capacity` entities are live.
    pub fn with_capacity_limit(capacity: usize) -> Self {
        Self {
            entities: Vec::with_capacity(capacity.min(4096)),
            capacity: Some(capacity),
            ..Self::default()
        }
    }

    /// Inserts an entity and returns its id, or `None` if the store is full.
    pub fn insert(&mut self, mut entity: Entity) -> Option<EntityId> {
        if self.capacity.is_some_and(|cap| self.entities.len() >= cap) {
            log::trace!("entity cap reached, dropping {:?}", entity.kind);
            return None;
        }
        let id = EntityId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        entity.id = id;
        self.index.insert(id, self.entities.len());
        self.entities.push(entity);
        Some(id)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.index.get(&id).map(|&slot| &self.entities[slot])
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        match self.index.get(&id) {
            Some(&slot) => self.entities.get_mut(slot),
            None => None,
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Entity> {
        self.entities.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Entity> {
        self.entities.iter_mut()
    }

    /// Dense slice in slot order; valid until the next removal.
    pub fn as_slice(&self) -> &[Entity] {
        &self.entities
    }

    pub fn as_mut_slice(&mut self) -> &mut [Entity] {
        &mut self.entities
    }

    /// Entities of one kind, in slot order.
    pub fn of_kind(&self, kind: EntityKind) -> impl Iterator<Item = &Entity> {
        self.entities.iter().filter(move |e| e.kind == kind)
    }

    pub fn count(&self, kind: EntityKind) -> usize {
        self.of_kind(kind).count()
    }

    /// Live count per kind.
    pub fn count_by_kind(&self) -> HashMap<EntityKind, usize> {
        let mut counts = HashMap::new();
        for entity in &self.entities {
            *counts.entry(entity.kind).or_insert(0) += 1;
        }
        counts
    }

    /// Swap-removes an entity, patching the slot of the one moved into its place.
    pub fn remove(&mut self, id: EntityId) -> Option<Entity> {
        let slot = self.index.remove(&id)?;
        let removed = self.entities.swap_remove(slot);
        if let Some(moved) = self.entities.get(slot) {
            self.index.insert(moved.id, slot);
        }
        Some(removed)
    }

    /// Keeps only entities matching `keep`.
    pub fn retain<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(&Entity) -> bool,
    {
        let doomed: Vec<EntityId> = self
            .entities
            .iter()
            .filter(|e| !keep(e))
            .map(|e| e.id)
            .collect();
        for id in &doomed {
            self.remove(*id);
        }
        doomed.len()
    }

    /// Decrements finite lifetimes by `amount` and removes expired entities.
    ///
    /// Returns how many were removed.
    pub fn age(&mut self, amount: f32) -> usize {
        for entity in &mut self.entities {
            if let Some(life) = entity.lifetime.as_mut() {
                *life -= amount;
            }
        }
        self.retain(|e| e.lifetime.is_none_or(|life| life > 0.0))
    }

    /// Drops every entity. Ids are not reused.
    pub fn clear(&mut self) {
        self.entities.clear();
        self.index.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dust(x: f32) -> Entity {
        Entity::new(EntityKind::Dust, Vec3::new(x, 0.0, 0.0))
    }

    /// Removing from the middle keeps every surviving id addressable.
    #[test]
    fn test_swap_remove_keeps_ids() {
        let mut store = EntityStore::new();
        let ids: Vec<EntityId> = (0..5).filter_map(|i| store.insert(dust(i as f32))).collect();
        assert_eq!(store.len(), 5);

        let removed = store.remove(ids[1]).expect("present");
        assert_eq!(removed.position.x, 1.0);
        assert!(!store.contains(ids[1]));
        for (i, id) in ids.iter().enumerate() {
            if i == 1 {
                continue;
            }
            assert_eq!(store.get(*id).map(|e| e.position.x), Some(i as f32));
        }
        assert!(store.remove(ids[1]).is_none());
    }

    /// Inserts past the cap are dropped.
    #[test]
    fn test_capacity_limit() {
        let mut store = EntityStore::with_capacity_limit(3);
        for i in 0..10 {
            store.insert(dust(i as f32));
        }
        assert_eq!(store.len(), 3);
        assert!(store.insert(dust(0.0)).is_none());
    }

    /// Finite lifetimes run out; unbounded ones survive.
    #[test]
    fn test_lifetime_expiry() {
        let mut store = EntityStore::new();
        let aura = store
            .insert(Entity::new(EntityKind::Aura, Vec3::ZERO).with_lifetime(0.05))
            .expect("inserted");
        let node = store
            .insert(Entity::new(EntityKind::Node(Layer::Input), Vec3::ZERO))
            .expect("inserted");
        assert_eq!(store.age(0.02), 0);
        assert_eq!(store.age(0.02), 0);
        assert_eq!(store.age(0.02), 1);
        assert!(!store.contains(aura));
        assert!(store.contains(node));
    }

    #[test]
    fn test_activation_decay() {
        assert_eq!(ActivationDecay::Linear(0.4).apply(0.3), 0.0);
        assert!((ActivationDecay::Geometric(0.5).apply(1.0) - 0.5).abs() < f32::EPSILON);

        let half_step = ActivationDecay::Linear(0.1).scaled(0.5);
        assert!((half_step.apply(1.0) - 0.95).abs() < 1e-6);
        let two_steps = ActivationDecay::Geometric(0.5).scaled(2.0);
        assert!((two_steps.apply(1.0) - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_count_by_kind() {
        let mut store = EntityStore::new();
        store.insert(dust(0.0));
        store.insert(dust(1.0));
        store.insert(Entity::new(EntityKind::Sun, Vec3::ZERO));
        let counts = store.count_by_kind();
        assert_eq!(counts.get(&EntityKind::Dust), Some(&2));
        assert_eq!(counts.get(&EntityKind::Sun), Some(&1));
        assert_eq!(store.count(EntityKind::Planet), 0);
    }
}
