use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use super::ProfileConfig;

/// Rolling frame-time window for FPS display.
#[derive(Debug)]
pub struct FrameRateCounter {
    frame_times: VecDeque<Duration>,
    max_samples: usize,
    last_frame_time: Option<Instant>,
}

impl FrameRateCounter {
    pub fn new(max_samples: usize) -> Self {
        Self {
            frame_times: VecDeque::with_capacity(max_samples),
            max_samples: max_samples.max(1),
            last_frame_time: None,
        }
    }

    /// Records a frame at the current instant and returns the average FPS.
    pub fn record_frame(&mut self) -> f64 {
        self.record_frame_at(Instant::now())
    }

    /// Records a frame at `now`.
    pub fn record_frame_at(&mut self, now: Instant) -> f64 {
        if let Some(last) = self.last_frame_time {
            self.frame_times.push_back(now.saturating_duration_since(last));
            while self.frame_times.len() > self.max_samples {
                self.frame_times.pop_front();
            }
        }
        self.last_frame_time = Some(now);
        self.fps()
    }

    /// Average FPS over the window, 0 with no samples.
    pub fn fps(&self) -> f64 {
        if self.frame_times.is_empty() {
            return 0.0;
        }
        let total: Duration = self.frame_times.iter().sum();
        let avg = total.as_secs_f64() / self.frame_times.len() as f64;
        if avg > 0.0 { 1.0 / avg } else { 0.0 }
    }

    /// Shortest frame in the window.
    pub fn min_frame_time(&self) -> Duration {
        self.frame_times.iter().min().copied().unwrap_or(Duration::ZERO)
    }

    /// Longest frame in the window.
    pub fn max_frame_time(&self) -> Duration {
        self.frame_times.iter().max().copied().unwrap_or(Duration::ZERO)
    }

    /// `(min_fps, avg_fps, max_fps)`.
    pub fn fps_stats(&self) -> (f64, f64, f64) {
        let to_fps = |d: Duration| {
            if d.as_secs_f64() > 0.0 {
                1.0 / d.as_secs_f64()
            } else {
                0.0
            }
        };
        (
            to_fps(self.max_frame_time()),
            self.fps(),
            to_fps(self.min_frame_time()),
        )
    }

    pub fn sample_count(&self) -> usize {
        self.frame_times.len()
    }
}

/// Aggregate timings for one named section.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionMetrics {
    pub count: usize,
    pub total: Duration,
    pub min: Duration,
    pub max: Duration,
}

impl SectionMetrics {
    fn new() -> Self {
        Self {
            count: 0,
            total: Duration::ZERO,
            min: Duration::MAX,
            max: Duration::ZERO,
        }
    }

    fn update(&mut self, duration: Duration) {
        self.count += 1;
        self.total += duration;
        self.min = self.min.min(duration);
        self.max = self.max.max(duration);
    }

    pub fn average(&self) -> Duration {
        if self.count == 0 {
            Duration::ZERO
        } else {
            self.total / self.count as u32
        }
    }
}

/// Process-wide measurement store.
#[derive(Debug)]
pub struct ProfileData {
    sections: HashMap<String, SectionMetrics>,
    frames: FrameRateCounter,
}

impl ProfileData {
    fn new() -> Self {
        Self {
            sections: HashMap::new(),
            frames: FrameRateCounter::new(ProfileConfig::default().max_frame_samples),
        }
    }

    pub fn record(&mut self, name: &str, duration: Duration) {
        self.sections
            .entry(name.to_string())
            .or_insert_with(SectionMetrics::new)
            .update(duration);
    }

    pub fn sections(&self) -> &HashMap<String, SectionMetrics> {
        &self.sections
    }

    pub fn record_frame(&mut self) -> f64 {
        self.frames.record_frame()
    }

    pub fn frames(&self) -> &FrameRateCounter {
        &self.frames
    }

    pub fn clear(&mut self) {
        self.sections.clear();
    }
}

lazy_static::lazy_static! {
    /// Measurements shared by every profiler in the process.
    pub static ref PROFILE_DATA: Mutex<ProfileData> = Mutex::new(ProfileData::new());
}

/// Locks the shared store, recovering from a poisoned lock.
pub fn lock() -> MutexGuard<'static, ProfileData> {
    PROFILE_DATA.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Named section timer feeding [`PROFILE_DATA`].
#[derive(Debug)]
pub struct Profiler {
    active_timers: HashMap<String, Instant>,
    config: ProfileConfig,
}

impl Profiler {
    pub fn new(config: ProfileConfig) -> Self {
        Self {
            active_timers: HashMap::new(),
            config,
        }
    }

    pub fn config(&self) -> &ProfileConfig {
        &self.config
    }

    /// Starts timing a section.
    pub fn start_section(&mut self, name: &str) {
        if self.config.enabled {
            self.active_timers.insert(name.to_string(), Instant::now());
        }
    }

    /// Ends timing a section and records it. Returns the elapsed time if the
    /// section was started.
    pub fn end_section(&mut self, name: &str) -> Option<Duration> {
        let start = self.active_timers.remove(name)?;
        let duration = start.elapsed();
        if duration >= self.config.min_duration_threshold {
            lock().record(name, duration);
        }
        Some(duration)
    }

    /// Times a closure as one section.
    pub fn time<F, R>(&mut self, name: &str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        self.start_section(name);
        let result = f();
        self.end_section(name);
        result
    }
}
