//! Window lifecycle and input routing.
//!
//! [`App`] implements winit's [`ApplicationHandler`]. It creates the window and
//! GPU state on resume, feeds input into the [`AppState`], redraws continuously and
//! exits on close, `Esc` or SIGINT.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{ElementState, KeyEvent, MouseButton, WindowEvent},
    event_loop::ActiveEventLoop,
    window::{Window, WindowId},
};

use crate::app::app_state::AppState;
use crate::app::input::command_for_key;
use crate::config::EngineConfig;
use crate::error::Result;

/// Owns the window and, once it exists, the application state.
pub struct App {
    pub instance: wgpu::Instance,
    pub config: EngineConfig,
    pub state: Option<AppState>,
    pub window: Option<Arc<Window>>,
    /// Set by the SIGINT handler.
    interrupted: Arc<AtomicBool>,
}

impl App {
    pub fn new(config: EngineConfig, interrupted: Arc<AtomicBool>) -> Self {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        Self {
            instance,
            config,
            state: None,
            window: None,
            interrupted,
        }
    }

    /// Creates the surface and all application state for `window`.
    pub async fn set_window(&mut self, window: Window) -> Result<()> {
        let window = Arc::new(window);
        let surface = self.instance.create_surface(window.clone())?;
        let state = AppState::new(&self.instance, surface, &window, &self.config).await?;

        self.window.get_or_insert(window);
        self.state.get_or_insert(state);
        Ok(())
    }

    pub fn handle_resized(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        match self.state.as_mut() {
            Some(state) => state.resize_surface(width, height),
            None => log::warn!("resize before state was initialised"),
        }
    }

    /// Drops the window state, tearing the scene down.
    fn shutdown(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(state) = self.state.take() {
            state.shutdown();
        }
        event_loop.exit();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        let attributes = Window::default_attributes()
            .with_title("Orrery")
            .with_inner_size(PhysicalSize::new(
                self.config.window_width,
                self.config.window_height,
            ));
        let window = match event_loop.create_window(attributes) {
            Ok(window) => window,
            Err(err) => {
                log::error!("failed to create window: {err}");
                event_loop.exit();
                return;
            }
        };
        log::info!(
            "window created ({}x{})",
            self.config.window_width,
            self.config.window_height
        );
        if let Err(err) = pollster::block_on(self.set_window(window)) {
            log::error!("startup failed: {err}");
            event_loop.exit();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _: WindowId, event: WindowEvent) {
        let Some(state) = self.state.as_mut() else {
            return;
        };

        match event {
            WindowEvent::CloseRequested => {
                log::info!("close requested; stopping");
                self.shutdown(event_loop);
            }

            WindowEvent::Resized(new_size) => {
                self.handle_resized(new_size.width, new_size.height);
            }

            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        logical_key: key,
                        state: ElementState::Pressed,
                        repeat: false,
                        ..
                    },
                ..
            } => {
                if let Some(command) = command_for_key(&key) {
                    if !state.session.run(command) {
                        self.shutdown(event_loop);
                    }
                }
            }

            WindowEvent::CursorMoved { position, .. } => {
                state.pointer_moved(position.x as f32, position.y as f32);
            }

            WindowEvent::CursorLeft { .. } => state.pointer_left(),

            WindowEvent::MouseInput {
                state: button_state,
                button: MouseButton::Left,
                ..
            } => match button_state {
                ElementState::Pressed => state.pointer_pressed(),
                ElementState::Released => state.pointer_released(),
            },

            WindowEvent::MouseWheel { delta, .. } => state.wheel(delta),

            WindowEvent::RedrawRequested => self.handle_redraw(),

            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.interrupted.load(Ordering::SeqCst) {
            log::info!("interrupt received; stopping");
            self.shutdown(event_loop);
            return;
        }
        if let Some(window) = self.window.as_ref() {
            window.request_redraw();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(state) = self.state.take() {
            state.shutdown();
        }
        log::info!("shutdown complete");
    }
}
