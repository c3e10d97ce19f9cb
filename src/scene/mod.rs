//! Scenes and the context that owns the active one.
//!
//! Every topic has one scene implementing [`Scene`]. [`SceneKind`] is the fixed
//! set of implementations, selected by a [`SceneKey`], and [`SceneContext`] holds
//! everything one running scene needs: its camera, limits, selection, RNG and the
//! scene itself. Switching topics drops the whole context and builds a new one, so
//! nothing survives from one scene into the next.

pub mod collider;
pub mod connectome;
pub mod cosmology;
pub mod network;
pub mod qubit;
pub mod solar;
pub mod spacetime;
pub mod stellar;
pub mod superposition;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::camera::{Camera, CameraLimits, PickTarget, pick_nearest};
use crate::color::Color;
use crate::entity::{Entity, EntityId, EntityKind, EntityStore};
use crate::math::Vec3;
use crate::projector::{Projection, View, Viewport};
use crate::renderer::draw_list::DrawList;
use crate::scheduler::NOMINAL_STEP;
use crate::topic::{SceneKey, Topic};

pub use collider::ColliderScene;
pub use connectome::ConnectomeScene;
pub use cosmology::CosmologyScene;
pub use network::NetworkScene;
pub use qubit::QubitScene;
pub use solar::SolarScene;
pub use spacetime::SpacetimeScene;
pub use stellar::StellarScene;
pub use superposition::SuperpositionScene;

/// Parameters shared by every scene build.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneParams {
    /// Cap on in-flight signal pulses for graph scenes.
    pub pulse_cap: usize,
}

impl Default for SceneParams {
    fn default() -> Self {
        Self { pulse_cap: 1500 }
    }
}

/// Camera and projection defaults for one scene.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneSetup {
    pub base_fov: f32,
    pub camera: Camera,
    pub limits: CameraLimits,
}

/// One user-adjustable scene parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tunable {
    pub name: &'static str,
    pub value: f32,
    /// Change per nudge.
    pub step: f32,
}

impl Tunable {
    pub fn new(name: &'static str, value: f32, step: f32) -> Self {
        Self { name, value, step }
    }
}

/// User commands forwarded to the active scene.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SceneAction {
    Reset,
    NextStage,
    /// Start a wavefunction collapse.
    Observe,
    /// Rebuild the electron cloud at energy level `n`.
    SetLevel(u8),
    Hadamard(usize),
    Entangle,
    Measure(usize),
    SetDecoherence(f32),
    CycleEventType,
    /// Magnetic field strength in tesla.
    SetField(f32),
    ToggleShell,
    /// Select the next tunable parameter.
    NextTunable,
    /// Move the selected tunable by this many steps.
    Nudge(f32),
}

/// One self-contained simulation and its drawing.
pub trait Scene {
    fn title(&self) -> &'static str;

    /// Short state line for the HUD.
    fn status(&self) -> String;

    fn entities(&self) -> &EntityStore;

    /// Rebuilds entities, edges and meshes from scratch.
    fn reset(&mut self, rng: &mut StdRng);

    /// Advances the simulation; `step` is 1.0 for one nominal frame.
    fn tick(&mut self, step: f32, rng: &mut StdRng);

    /// Pushes this frame's shapes, back to front.
    fn draw(&self, view: &View, selection: Option<EntityId>, list: &mut DrawList);

    fn pick_targets(&self, _view: &View) -> Vec<PickTarget<EntityId>> {
        Vec::new()
    }

    /// Text for the selection panel.
    fn describe(&self, _id: EntityId) -> Option<String> {
        None
    }

    /// Applies a scene-specific action. Returns whether the scene used it.
    fn handle(&mut self, _action: SceneAction, _rng: &mut StdRng) -> bool {
        false
    }

    /// In-flight pulses, for scenes with a signal graph.
    fn pulse_count(&self) -> Option<usize> {
        None
    }

    /// User-adjustable parameters, in display order.
    fn tunables(&self) -> Vec<Tunable> {
        Vec::new()
    }

    /// Sets tunable `index`. The scene clamps `value` to its own range.
    fn tune(&mut self, _index: usize, _value: f32, _rng: &mut StdRng) -> bool {
        false
    }

    /// Whether a press on `id` grabs the entity instead of rotating the camera.
    fn grabbable(&self, _id: EntityId) -> bool {
        false
    }

    /// Moves a grabbed entity by a scene-space offset.
    fn drag_entity(&mut self, _id: EntityId, _offset: Vec3) -> bool {
        false
    }
}

/// The fixed set of scene implementations.
pub enum SceneKind {
    Solar(SolarScene),
    Stellar(StellarScene),
    Cosmology(CosmologyScene),
    Superposition(SuperpositionScene),
    Qubits(QubitScene),
    Collider(ColliderScene),
    Network(NetworkScene),
    Connectome(ConnectomeScene),
    Spacetime(SpacetimeScene),
}

impl SceneKind {
    pub fn build(key: SceneKey, params: &SceneParams, rng: &mut StdRng) -> Self {
        match key {
            SceneKey::Topic(Topic::Astronomy) => SceneKind::Solar(SolarScene::new(rng)),
            SceneKey::Topic(Topic::Astrophysics) => SceneKind::Stellar(StellarScene::new(rng)),
            SceneKey::Topic(Topic::Cosmology) => SceneKind::Cosmology(CosmologyScene::new(rng)),
            SceneKey::Topic(Topic::QuantumPhysics) => {
                SceneKind::Superposition(SuperpositionScene::new(rng))
            }
            SceneKey::Topic(Topic::QuantumComputing) => SceneKind::Qubits(QubitScene::new(rng)),
            SceneKey::Topic(Topic::ParticlePhysics) => SceneKind::Collider(ColliderScene::new(rng)),
            SceneKey::Topic(Topic::ArtificialIntelligence) => {
                SceneKind::Network(NetworkScene::new(params, rng))
            }
            SceneKey::Topic(Topic::Neuroscience) => {
                SceneKind::Connectome(ConnectomeScene::new(params, rng))
            }
            SceneKey::Spacetime => SceneKind::Spacetime(SpacetimeScene::new(rng)),
        }
    }

    pub fn setup(key: SceneKey) -> SceneSetup {
        use std::f32::consts::FRAC_PI_2;

        let (base_fov, camera, limits) = match key {
            SceneKey::Topic(Topic::Astronomy) => {
                (800.0, Camera::new(0.6, -0.4, 0.8), CameraLimits::horizon(-0.2))
            }
            SceneKey::Topic(Topic::Astrophysics) => {
                (600.0, Camera::new(0.4, -0.4, 1.0), CameraLimits::default())
            }
            SceneKey::Topic(Topic::Cosmology) => {
                (700.0, Camera::new(0.5, -0.5, 0.8), CameraLimits::default())
            }
            SceneKey::Topic(Topic::QuantumPhysics) => {
                (600.0, Camera::new(0.3, -0.4, 1.0), CameraLimits::default())
            }
            SceneKey::Topic(Topic::QuantumComputing) => {
                (700.0, Camera::new(0.3, -0.4, 1.0), CameraLimits::default())
            }
            SceneKey::Topic(Topic::ParticlePhysics) => {
                (750.0, Camera::new(0.4, -0.6, 0.85), CameraLimits::default())
            }
            SceneKey::Topic(Topic::ArtificialIntelligence) => {
                (750.0, Camera::new(0.2, -0.6, 0.9), CameraLimits::default())
            }
            SceneKey::Topic(Topic::Neuroscience) => (
                750.0,
                Camera::new(0.3, -0.4, 0.85),
                CameraLimits::default().with_zoom(0.4, 2.5),
            ),
            SceneKey::Spacetime => (
                650.0,
                Camera::new(0.4, -0.4, 1.0),
                CameraLimits::horizon(-0.1).with_sensitivity(0.008),
            ),
        };
        debug_assert!(limits.pitch_max <= FRAC_PI_2);
        SceneSetup {
            base_fov,
            camera,
            limits,
        }
    }

    pub fn scene(&self) -> &dyn Scene {
        match self {
            SceneKind::Solar(scene) => scene,
            SceneKind::Stellar(scene) => scene,
            SceneKind::Cosmology(scene) => scene,
            SceneKind::Superposition(scene) => scene,
            SceneKind::Qubits(scene) => scene,
            SceneKind::Collider(scene) => scene,
            SceneKind::Network(scene) => scene,
            SceneKind::Connectome(scene) => scene,
            SceneKind::Spacetime(scene) => scene,
        }
    }

    pub fn scene_mut(&mut self) -> &mut dyn Scene {
        match self {
            SceneKind::Solar(scene) => scene,
            SceneKind::Stellar(scene) => scene,
            SceneKind::Cosmology(scene) => scene,
            SceneKind::Superposition(scene) => scene,
            SceneKind::Qubits(scene) => scene,
            SceneKind::Collider(scene) => scene,
            SceneKind::Network(scene) => scene,
            SceneKind::Connectome(scene) => scene,
            SceneKind::Spacetime(scene) => scene,
        }
    }
}

type SelectCallback = Box<dyn FnMut(Option<EntityId>)>;

/// Everything one running scene owns.
pub struct SceneContext {
    key: SceneKey,
    setup: SceneSetup,
    pub camera: Camera,
    viewport: Viewport,
    selection: Option<EntityId>,
    /// Entity held by the pointer, if the press landed on a grabbable one.
    grabbed: Option<EntityId>,
    /// Index into the scene's tunables.
    tuning: usize,
    /// Scene seconds since the last reset.
    time: f32,
    rng: StdRng,
    kind: SceneKind,
    on_select: Option<SelectCallback>,
}

impl SceneContext {
    /// Builds the scene for `key`. A `seed` makes the run reproducible.
    pub fn init(key: SceneKey, params: SceneParams, seed: Option<u64>) -> Self {
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let setup = SceneKind::setup(key);
        let kind = SceneKind::build(key, &params, &mut rng);
        log::info!(
            "scene '{}' initialised with {} entities",
            kind.scene().title(),
            kind.scene().entities().len()
        );
        Self {
            key,
            setup,
            camera: setup.camera,
            viewport: Viewport::default(),
            selection: None,
            grabbed: None,
            tuning: 0,
            time: 0.0,
            rng,
            kind,
            on_select: None,
        }
    }

    /// Consumes the context, releasing the scene's entities, edges and pulses.
    pub fn teardown(self) {
        log::info!(
            "scene '{}' torn down after {:.1}s",
            self.scene().title(),
            self.time
        );
    }

    pub fn key(&self) -> SceneKey {
        self.key
    }

    pub fn scene(&self) -> &dyn Scene {
        self.kind.scene()
    }

    pub fn selection(&self) -> Option<EntityId> {
        self.selection
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn view(&self) -> View {
        View::new(self.camera, self.viewport, self.setup.base_fov)
    }

    /// Registers the host callback fired whenever the selection changes.
    pub fn set_on_select<F>(&mut self, callback: F)
    where
        F: FnMut(Option<EntityId>) + 'static,
    {
        self.on_select = Some(Box::new(callback));
    }

    /// Advances by `delta` scene seconds.
    pub fn tick(&mut self, delta: f32) {
        self.time += delta;
        let step = delta / NOMINAL_STEP;
        self.kind.scene_mut().tick(step, &mut self.rng);
        if let Some(id) = self.selection {
            if !self.scene().entities().contains(id) {
                self.select(None);
            }
        }
    }

    pub fn draw(&self, list: &mut DrawList) {
        list.rect(
            0.0,
            0.0,
            self.viewport.width,
            self.viewport.height,
            Color::BACKGROUND,
        );
        self.scene().draw(&self.view(), self.selection, list);
    }

    pub fn rotate(&mut self, dx: f32, dy: f32) {
        let limits = self.setup.limits;
        self.camera.rotate_by(dx, dy, &limits);
    }

    pub fn zoom_by(&mut self, delta: f32) {
        let limits = self.setup.limits;
        self.camera.zoom_by(delta, &limits);
    }

    fn pick(&self, x: f32, y: f32) -> Option<EntityId> {
        let view = self.view();
        let targets = self.scene().pick_targets(&view);
        pick_nearest(targets, &view.camera, view.viewport, view.fov, (x, y))
    }

    /// Resolves a click in nominal coordinates and updates the selection.
    pub fn click(&mut self, x: f32, y: f32) -> Option<EntityId> {
        let hit = self.pick(x, y);
        self.select(hit);
        hit
    }

    /// Pointer press in nominal coordinates. Grabs and selects a grabbable entity
    /// under the pointer; returns whether one was grabbed.
    pub fn press(&mut self, x: f32, y: f32) -> bool {
        self.grabbed = self.pick(x, y).filter(|id| self.scene().grabbable(*id));
        if let Some(id) = self.grabbed {
            self.select(Some(id));
        }
        self.grabbed.is_some()
    }

    /// Moves the grabbed entity by a nominal-pixel delta, keeping its depth.
    /// Returns `false` when nothing is grabbed.
    pub fn drag_grabbed(&mut self, dx: f32, dy: f32) -> bool {
        let Some(id) = self.grabbed else {
            return false;
        };
        let Some(anchor) = self.scene().entities().get(id).map(|e| e.origin) else {
            self.grabbed = None;
            return false;
        };
        let offset = self.view().screen_offset(anchor, dx, dy);
        self.kind.scene_mut().drag_entity(id, offset)
    }

    pub fn release_grab(&mut self) {
        self.grabbed = None;
    }

    /// Name and value of the selected tunable, for the HUD.
    pub fn tuning_label(&self) -> Option<String> {
        let tunable = self.scene().tunables().get(self.tuning).copied()?;
        Some(format!("{} {:.2}", tunable.name, tunable.value))
    }

    fn next_tunable(&mut self) -> bool {
        let count = self.scene().tunables().len();
        if count == 0 {
            return false;
        }
        self.tuning = (self.tuning + 1) % count;
        true
    }

    fn nudge(&mut self, steps: f32) -> bool {
        let Some(tunable) = self.scene().tunables().get(self.tuning).copied() else {
            return false;
        };
        let value = tunable.value + tunable.step * steps;
        self.kind.scene_mut().tune(self.tuning, value, &mut self.rng)
    }

    fn select(&mut self, id: Option<EntityId>) {
        if self.selection == id {
            return;
        }
        self.selection = id;
        if let Some(callback) = self.on_select.as_mut() {
            callback(id);
        }
    }

    pub fn describe_selection(&self) -> Option<String> {
        self.selection.and_then(|id| self.scene().describe(id))
    }

    /// Back to the scene's initial state, camera included.
    pub fn reset(&mut self) {
        self.select(None);
        self.grabbed = None;
        self.camera = self.setup.camera;
        self.time = 0.0;
        self.kind.scene_mut().reset(&mut self.rng);
        log::info!("scene '{}' reset", self.scene().title());
    }

    /// Forwards a user action. Returns whether anything handled it.
    pub fn apply(&mut self, action: SceneAction) -> bool {
        let handled = match action {
            SceneAction::Reset => {
                self.reset();
                return true;
            }
            SceneAction::NextTunable => self.next_tunable(),
            SceneAction::Nudge(steps) => self.nudge(steps),
            _ => self.kind.scene_mut().handle(action, &mut self.rng),
        };
        if handled {
            log::debug!("{action:?} -> {}", self.scene().status());
        }
        handled
    }
}

/// Visible entities with their projections, farthest first.
pub(crate) fn depth_sorted<'a, I>(view: &View, entities: I) -> Vec<(&'a Entity, Projection)>
where
    I: IntoIterator<Item = &'a Entity>,
{
    let mut projected: Vec<(&Entity, Projection)> = entities
        .into_iter()
        .filter(|e| e.visible)
        .map(|e| (e, view.project(e.position)))
        .filter(|(_, p)| p.is_visible(view.fov))
        .collect();
    projected.sort_by(|a, b| b.1.depth.total_cmp(&a.1.depth));
    projected
}

/// Scatters `count` background stars uniformly in a cube of half-size `extent`.
pub(crate) fn scatter_stars(store: &mut EntityStore, count: usize, extent: f32, rng: &mut StdRng) {
    for _ in 0..count {
        let position = Vec3::new(
            rng.gen_range(-extent..extent),
            rng.gen_range(-extent..extent),
            rng.gen_range(-extent..extent),
        );
        let star = Entity::new(EntityKind::BackgroundStar, position)
            .with_size(rng.gen_range(0.5..2.0))
            .with_phase(rng.gen_range(0.0..std::f32::consts::TAU));
        store.insert(star);
    }
}

/// Draws background stars, dimmer with distance. `lensed` bends them around
/// the optical axis.
pub(crate) fn draw_starfield(view: &View, store: &EntityStore, lensed: bool, list: &mut DrawList) {
    for star in store.of_kind(EntityKind::BackgroundStar) {
        let p = if lensed {
            view.project_lensed(star.position)
        } else {
            view.project(star.position)
        };
        if !p.is_visible(view.fov) {
            continue;
        }
        let alpha = (p.scale * 0.5).clamp(0.0, 1.0);
        list.circle(
            (p.x, p.y),
            (star.size * p.scale).max(0.3),
            star.color.with_alpha(alpha),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::rc::Rc;

    fn all_keys() -> Vec<SceneKey> {
        let mut keys: Vec<SceneKey> = Topic::ALL.iter().map(|t| SceneKey::Topic(*t)).collect();
        keys.push(SceneKey::Spacetime);
        keys
    }

    fn counts(context: &SceneContext) -> HashMap<EntityKind, usize> {
        context.scene().entities().count_by_kind()
    }

    /// Resetting twice yields the same population per kind, even after ticking.
    #[test]
    fn test_reset_cardinality_idempotent() {
        for key in all_keys() {
            let mut context = SceneContext::init(key, SceneParams::default(), Some(11));
            context.reset();
            let first = counts(&context);
            for _ in 0..30 {
                context.tick(NOMINAL_STEP);
            }
            context.reset();
            assert_eq!(first, counts(&context), "{key:?}");
        }
    }

    /// Every scene survives a few hundred ticks and draws something finite.
    #[test]
    fn test_scenes_tick_and_draw() {
        for key in all_keys() {
            let mut context = SceneContext::init(key, SceneParams::default(), Some(3));
            for _ in 0..200 {
                context.tick(NOMINAL_STEP * 2.0);
            }
            let mut list = DrawList::new();
            context.draw(&mut list);
            assert!(list.len() > 1, "{key:?} drew nothing");
        }
    }

    #[test]
    fn test_setup_matches_limits() {
        for key in all_keys() {
            let setup = SceneKind::setup(key);
            let mut camera = setup.camera;
            camera.clamp_to(&setup.limits);
            assert_eq!(camera, setup.camera, "{key:?} starts outside its limits");
        }
    }

    /// Zoom input outside the scene's range is clamped.
    #[test]
    fn test_zoom_clamped() {
        let mut context =
            SceneContext::init(SceneKey::Topic(Topic::Neuroscience), SceneParams::default(), Some(1));
        context.zoom_by(100.0);
        assert_eq!(context.camera.zoom, 2.5);
        context.zoom_by(-100.0);
        assert_eq!(context.camera.zoom, 0.4);
    }

    /// Clicking on a planet selects it and notifies the host; clicking empty
    /// space clears the selection.
    #[test]
    fn test_click_selects_and_notifies() {
        let mut context =
            SceneContext::init(SceneKey::Topic(Topic::Astronomy), SceneParams::default(), Some(5));
        let seen: Rc<RefCell<Vec<Option<EntityId>>>> = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        context.set_on_select(move |id| sink.borrow_mut().push(id));

        let view = context.view();
        let planet = context
            .scene()
            .entities()
            .of_kind(EntityKind::Planet)
            .next()
            .map(|e| (e.id, view.project(e.position)))
            .expect("planet");
        let hit = context.click(planet.1.x, planet.1.y);
        assert_eq!(hit, Some(planet.0));
        assert!(context.describe_selection().is_some());

        assert_eq!(context.click(-5000.0, -5000.0), None);
        assert_eq!(*seen.borrow(), vec![Some(planet.0), None]);
    }

    /// Pressing on a qubit grabs it and pointer motion carries it across the
    /// screen; planets are not grabbable.
    #[test]
    fn test_press_and_drag_qubit() {
        let mut context = SceneContext::init(
            SceneKey::Topic(Topic::QuantumComputing),
            SceneParams::default(),
            Some(6),
        );
        let view = context.view();
        let (id, before) = context
            .scene()
            .entities()
            .of_kind(EntityKind::Qubit)
            .next()
            .map(|e| (e.id, view.project(e.position)))
            .expect("qubit");

        assert!(context.press(before.x, before.y));
        assert_eq!(context.selection(), Some(id));
        assert!(context.drag_grabbed(25.0, -10.0));
        context.tick(NOMINAL_STEP);
        let after = context
            .scene()
            .entities()
            .get(id)
            .map(|e| view.project(e.position))
            .expect("still there");
        assert!((after.x - before.x - 25.0).abs() < 1e-2);
        assert!((after.y - before.y + 10.0).abs() < 1e-2);

        context.release_grab();
        assert!(!context.drag_grabbed(5.0, 5.0));
        assert!(!context.press(-5000.0, -5000.0));

        let mut solar =
            SceneContext::init(SceneKey::Topic(Topic::Astronomy), SceneParams::default(), Some(6));
        let view = solar.view();
        let planet = solar
            .scene()
            .entities()
            .of_kind(EntityKind::Planet)
            .next()
            .map(|e| view.project(e.position))
            .expect("planet");
        assert!(!solar.press(planet.x, planet.y));
        assert!(!solar.drag_grabbed(10.0, 0.0));
    }

    #[test]
    fn test_reset_clears_selection() {
        let mut context =
            SceneContext::init(SceneKey::Topic(Topic::Neuroscience), SceneParams::default(), Some(8));
        let view = context.view();
        let neuron = context
            .scene()
            .entities()
            .iter()
            .find(|e| matches!(e.kind, EntityKind::Neuron(_)))
            .map(|e| view.project(e.position))
            .expect("neuron");
        assert!(context.click(neuron.x, neuron.y).is_some());
        context.reset();
        assert_eq!(context.selection(), None);
    }
}
