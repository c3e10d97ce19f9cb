//! Rendering backend.
//!
//! Scenes never touch the GPU: they fill a [`draw_list::DrawList`] in nominal
//! coordinates, and the canvas renderer turns it into one batched draw call.
//! Text goes through glyphon on top of the canvas.

/// Batched SDF shape pipeline for draw lists.
pub mod canvas;
/// Backend-agnostic 2D shape list filled by scenes.
pub mod draw_list;
/// Surface, device and queue setup.
pub mod gpu;
/// Heads-up display composition.
pub mod hud;
/// Glyphon text buffers.
pub mod text;
