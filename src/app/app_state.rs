//! Application state.
//!
//! [`Session`] is the windowless part: the active scene, the scheduler that ticks
//! it, the content loader and the selected level. [`AppState`] adds the GPU, the
//! renderers and pointer state on top of it.

use std::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;
use std::sync::Arc;

use winit::event::MouseScrollDelta;
use winit::window::Window;

use crate::app::input::{Command, wheel_zoom};
use crate::camera::{DragTracker, PointerRelease};
use crate::config::EngineConfig;
use crate::content::{
    ContentLoader, ContentProvider, ContentState, LibraryProvider, PlaceholderProvider,
};
use crate::error::Result;
use crate::profiling::{ProfileConfig, Profiler};
use crate::projector::Viewport;
use crate::renderer::canvas::CanvasRenderer;
use crate::renderer::draw_list::DrawList;
use crate::renderer::gpu::GpuContext;
use crate::renderer::hud::Hud;
use crate::renderer::text::TextRenderer;
use crate::scene::{SceneContext, SceneParams};
use crate::scheduler::FrameScheduler;
use crate::topic::{Level, SceneKey};

/// The running scene and everything that drives it, without any window.
pub struct Session {
    scene: Rc<RefCell<SceneContext>>,
    pub scheduler: FrameScheduler,
    content: ContentLoader,
    level: Level,
    params: SceneParams,
    seed: Option<u64>,
}

impl Session {
    pub fn new(config: &EngineConfig, provider: Arc<dyn ContentProvider>) -> Self {
        let params = SceneParams {
            pulse_cap: config.pulse_cap,
        };
        let scene = Rc::new(RefCell::new(Self::build(
            config.start_scene,
            params,
            config.seed,
        )));
        let mut session = Self {
            scene,
            scheduler: FrameScheduler::new(config.rate),
            content: ContentLoader::new(provider),
            level: config.level,
            params,
            seed: config.seed,
        };
        session.start();
        session
    }

    fn build(key: SceneKey, params: SceneParams, seed: Option<u64>) -> SceneContext {
        let mut context = SceneContext::init(key, params, seed);
        context.set_on_select(|id| log::debug!("selection changed to {id:?}"));
        context
    }

    /// Hooks the current scene to the scheduler and asks for its content.
    fn start(&mut self) {
        let scene = Rc::clone(&self.scene);
        self.scheduler
            .start(move |delta| scene.borrow_mut().tick(delta));
        let topic = self.scene.borrow().key().topic();
        self.content.request(topic, self.level);
    }

    /// Tears down the active scene and starts the one for `key`.
    pub fn switch_scene(&mut self, key: SceneKey) {
        self.scheduler.stop();
        let next = Rc::new(RefCell::new(Self::build(key, self.params, self.seed)));
        let previous = std::mem::replace(&mut self.scene, next);
        Self::release(previous);
        self.start();
    }

    fn release(scene: Rc<RefCell<SceneContext>>) {
        match Rc::try_unwrap(scene) {
            Ok(cell) => cell.into_inner().teardown(),
            Err(_) => log::warn!("scene still referenced at teardown"),
        }
    }

    /// Applies a command. Returns `false` when the application should quit.
    pub fn run(&mut self, command: Command) -> bool {
        match command {
            Command::SelectScene(key) => {
                if key != self.scene.borrow().key() {
                    self.switch_scene(key);
                }
            }
            Command::TogglePause => {
                let paused = self.scheduler.toggle_pause();
                log::info!("{}", if paused { "paused" } else { "resumed" });
            }
            Command::Step => self.scheduler.request_step(),
            Command::Scene(action) => {
                if !self.scene.borrow_mut().apply(action) {
                    log::debug!("{action:?} ignored by this scene");
                }
            }
            Command::Zoom(delta) => self.scene.borrow_mut().zoom_by(delta),
            Command::ScaleRate(factor) => {
                let rate = self.scheduler.rate() * factor;
                self.scheduler.set_rate(rate);
                log::info!("rate {:.2}x", self.scheduler.rate());
            }
            Command::CycleLevel => {
                self.level = self.level.next();
                let topic = self.scene.borrow().key().topic();
                self.content.request(topic, self.level);
            }
            Command::Quit => return false,
        }
        true
    }

    /// Per-refresh hook; returns whether the scene ticked.
    pub fn on_frame(&mut self) -> bool {
        self.scheduler.on_frame()
    }

    pub fn scene(&self) -> Ref<'_, SceneContext> {
        self.scene.borrow()
    }

    pub fn scene_mut(&self) -> RefMut<'_, SceneContext> {
        self.scene.borrow_mut()
    }

    pub fn level(&self) -> Level {
        self.level
    }

    /// Collects finished content fetches.
    pub fn poll_content(&mut self) -> &ContentState {
        self.content.poll()
    }

    pub fn shutdown(mut self) {
        self.scheduler.stop();
        Self::release(self.scene);
    }
}

/// Content source named by the config, falling back to built-in text.
pub fn content_provider(config: &EngineConfig) -> Arc<dyn ContentProvider> {
    let Some(path) = config.content_library.as_deref() else {
        return Arc::new(PlaceholderProvider);
    };
    match LibraryProvider::from_path(path) {
        Ok(library) => Arc::new(library),
        Err(err) => {
            log::error!("{err}; using built-in content");
            Arc::new(PlaceholderProvider)
        }
    }
}

/// Everything alive while the window exists.
pub struct AppState {
    pub gpu: GpuContext,
    pub canvas: CanvasRenderer,
    pub text_renderer: TextRenderer,
    pub hud: Hud,
    pub draw_list: DrawList,
    pub session: Session,
    pub drag: DragTracker,
    /// Last cursor position in window pixels.
    pub cursor: (f32, f32),
    pub profiler: Profiler,
    pub fps: f64,
}

impl AppState {
    pub async fn new(
        instance: &wgpu::Instance,
        surface: wgpu::Surface<'static>,
        window: &Window,
        config: &EngineConfig,
    ) -> Result<Self> {
        let size = window.inner_size();
        let gpu = GpuContext::new(instance, surface, size.width, size.height).await?;

        let mut canvas = CanvasRenderer::new(&gpu.device, gpu.format(), Viewport::default());
        canvas.resize(size.width as f32, size.height as f32);

        let mut text_renderer = TextRenderer::new(&gpu.device, &gpu.queue, gpu.format());
        text_renderer.resize(&gpu.queue, size.width, size.height);
        let hud = Hud::new(&mut text_renderer, size.width as f32, size.height as f32);

        let profiler = Profiler::new(ProfileConfig {
            write_report: config.profile_report,
            ..ProfileConfig::default()
        });

        Ok(Self {
            gpu,
            canvas,
            text_renderer,
            hud,
            draw_list: DrawList::new(),
            session: Session::new(config, content_provider(config)),
            drag: DragTracker::new(),
            cursor: (0.0, 0.0),
            profiler,
            fps: 0.0,
        })
    }

    /// Resizes the surface and every size-dependent renderer.
    pub fn resize_surface(&mut self, width: u32, height: u32) {
        self.gpu.resize(width, height);
        self.canvas.resize(width as f32, height as f32);
        self.text_renderer.resize(&self.gpu.queue, width, height);
        if let Err(err) = self
            .hud
            .resize(&mut self.text_renderer, width as f32, height as f32)
        {
            log::warn!("failed to reposition HUD: {err}");
        }
    }

    /// Drags the grabbed entity if there is one, otherwise rotates the camera.
    pub fn pointer_moved(&mut self, x: f32, y: f32) {
        self.cursor = (x, y);
        let Some((dx, dy)) = self.drag.motion(x, y) else {
            return;
        };
        let mut scene = self.session.scene_mut();
        let scale = self.canvas.letterbox().scale;
        if !scene.drag_grabbed(dx / scale, dy / scale) {
            scene.rotate(dx, dy);
        }
    }

    pub fn pointer_pressed(&mut self) {
        let (x, y) = self.cursor;
        self.drag.press(x, y);
        let (nx, ny) = self.canvas.letterbox().to_nominal(x, y);
        if self.session.scene_mut().press(nx, ny) {
            log::trace!("grabbed entity at ({nx:.0}, {ny:.0})");
        }
    }

    /// Ends a drag; a short press picks at the cursor.
    pub fn pointer_released(&mut self) {
        let (x, y) = self.cursor;
        self.session.scene_mut().release_grab();
        if let PointerRelease::Click { x, y } = self.drag.release(x, y) {
            let (nx, ny) = self.canvas.letterbox().to_nominal(x, y);
            let hit = self.session.scene_mut().click(nx, ny);
            log::trace!("click at ({nx:.0}, {ny:.0}) -> {hit:?}");
        }
    }

    /// Drops any drag or grab when the pointer leaves the window.
    pub fn pointer_left(&mut self) {
        self.drag.cancel();
        self.session.scene_mut().release_grab();
    }

    pub fn wheel(&mut self, delta: MouseScrollDelta) {
        self.session.scene_mut().zoom_by(wheel_zoom(delta));
    }

    /// Releases the scene and writes the profile report when enabled.
    pub fn shutdown(self) {
        self.session.shutdown();
        if self.profiler.config().write_report {
            if let Err(err) = crate::profiling::write_report("session") {
                log::error!("failed to write profile report: {err}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::SceneAction;
    use crate::topic::Topic;

    fn session() -> Session {
        let config = EngineConfig {
            seed: Some(7),
            ..EngineConfig::default()
        };
        Session::new(&config, Arc::new(PlaceholderProvider))
    }

    /// Switching scenes leaves exactly one live context, shared with the scheduler.
    #[test]
    fn test_switch_scene_replaces_context() {
        let mut session = session();
        assert_eq!(session.scene().key(), SceneKey::Spacetime);
        assert!(session.run(Command::SelectScene(SceneKey::Topic(Topic::Neuroscience))));
        assert_eq!(session.scene().key(), SceneKey::Topic(Topic::Neuroscience));
        assert_eq!(Rc::strong_count(&session.scene), 2);
        assert!(session.on_frame());
    }

    #[test]
    fn test_pause_and_step_commands() {
        let mut session = session();
        session.run(Command::TogglePause);
        assert!(!session.on_frame());
        session.run(Command::Step);
        assert!(session.on_frame());
        assert!(!session.on_frame());
    }

    /// Rate scaling stays within the scheduler's bounds.
    #[test]
    fn test_rate_scaling() {
        let mut session = session();
        session.run(Command::ScaleRate(2.0));
        assert!((session.scheduler.rate() - 2.0).abs() < 1e-6);
        for _ in 0..10 {
            session.run(Command::ScaleRate(2.0));
        }
        assert_eq!(session.scheduler.rate(), crate::scheduler::MAX_RATE);
    }

    #[test]
    fn test_cycle_level_requests_content() {
        let mut session = session();
        session.run(Command::CycleLevel);
        assert_eq!(session.level(), Level::Intermediate);
        assert!(matches!(
            session.poll_content(),
            ContentState::Loading | ContentState::Ready(_)
        ));
    }

    #[test]
    fn test_scene_commands_forwarded() {
        let mut session = session();
        for _ in 0..5 {
            session.on_frame();
        }
        assert!(session.scene().time() > 0.0);
        session.run(Command::Scene(SceneAction::Reset));
        assert_eq!(session.scene().time(), 0.0);
        assert!(!session.run(Command::Quit));
        session.shutdown();
    }
}
