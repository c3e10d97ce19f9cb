//! Frame timing and per-section profiling.
//!
//! This module measures where each frame's time goes. The render loop records
//! every presented frame for FPS statistics and wraps the tick, draw and present
//! phases in named sections. Measurements accumulate in a process-wide store and
//! can be written out as a plain-text report when the application exits.
//!
//! # Features
//! - **Frame Rate**: rolling window of frame durations with min/avg/max FPS
//! - **Sections**: named start/end timers aggregated into count/total/avg/min/max
//! - **Reports**: timestamped text report written on exit when enabled

use std::time::Duration;

/// Configuration for profiling.
#[derive(Debug, Clone)]
pub struct ProfileConfig {
    /// Whether section timing is recorded at all.
    pub enabled: bool,
    /// Whether to write a report file on exit.
    pub write_report: bool,
    /// Sections faster than this are not recorded.
    pub min_duration_threshold: Duration,
    /// Frame samples kept for FPS statistics.
    pub max_frame_samples: usize,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            write_report: false,
            min_duration_threshold: Duration::ZERO,
            max_frame_samples: 240,
        }
    }
}

/// Frame counter, section profiler and the shared measurement store.
pub mod data;

/// Plain-text report rendering and file output.
pub mod report;


pub use data::{FrameRateCounter, PROFILE_DATA, Profiler, SectionMetrics};
pub use report::{render_report, write_report};
