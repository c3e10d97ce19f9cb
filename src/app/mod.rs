//! Application shell around the scene engine.
//!
//! - [`app_state`]: [`Session`] (scene, scheduler, content) and [`AppState`]
//!   (GPU, renderers, pointer state)
//! - [`event_handler`]: [`App`], the winit event handler
//! - [`input`]: key and mouse mapping
//! - [`update`]: the per-frame tick, draw and present
//!
//! Everything runs on the main thread except content fetches, which the
//! [`crate::content::ContentLoader`] runs in the background.

pub mod app_state;
pub mod event_handler;
pub mod input;
pub mod update;

pub use app_state::{AppState, Session};
pub use event_handler::App;
