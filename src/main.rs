//! Orrery - interactive 3D science scenes
//!
//! Orrery renders a small catalogue of animated visualisations (a solar system,
//! star formation, cosmic epochs, quantum states, a collider event, a neural
//! network, a connectome and a black-hole merger) through a hand-rolled
//! perspective projector and a batched 2D canvas on WGPU.
//!
//! # Architecture
//! - `projector`, `camera`, `math`: the projection pipeline and picking
//! - `entity`, `rules`, `graph`, `mesh`: the simulation core
//! - `scene/`: one module per visualisation plus the [`scene::SceneContext`]
//! - `scheduler`: fixed-step frame scheduler with pause, single-step and rate
//! - `renderer/`: draw lists, the canvas pipeline, text and HUD
//! - `app/`: window, input and the frame loop
//! - `content`, `config`, `profiling`: ambient services
//!
//! # Usage
//! Run with `cargo run`. `RUST_LOG` sets the log level and `ORRERY_CONFIG` points at
//! a JSON configuration file.

pub mod app;
pub mod camera;
pub mod color;
pub mod config;
pub mod content;
pub mod entity;
pub mod error;
pub mod graph;
pub mod math;
pub mod mesh;
pub mod profiling;
pub mod projector;
pub mod renderer;
pub mod rules;
pub mod scene;
pub mod scheduler;
pub mod topic;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use winit::event_loop::{ControlFlow, EventLoop};

use crate::config::EngineConfig;

#[cfg(feature = "dhat-heap")]
#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

fn main() {
    #[cfg(feature = "dhat-heap")]
    let _profiler = dhat::Profiler::new_heap();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(err) = pollster::block_on(run()) {
        log::error!("{err}");
        std::process::exit(1);
    }
}

/// Loads configuration, installs the interrupt handler and runs the event loop
/// until the window closes.
async fn run() -> error::Result<()> {
    let config = EngineConfig::load();

    let interrupted = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&interrupted);
    if let Err(err) = ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst)) {
        log::warn!("could not install interrupt handler: {err}");
    }

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = app::App::new(config, interrupted);
    event_loop.run_app(&mut app)?;
    Ok(())
}
