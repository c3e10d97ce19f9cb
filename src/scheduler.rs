//! Frame scheduler driving the simulation clock.
//!
//! The window's redraw loop calls [`FrameScheduler::on_frame`] once per display
//! refresh. While running and unpaused, that invokes the registered tick callback
//! with a fixed nominal step scaled by the rate control, so simulation speed does
//! not depend on real frame timing.
//!
//! [`FrameScheduler::stop`] drops the callback, and with it every reference the
//! callback captured; no further ticks happen until [`FrameScheduler::start`] is
//! called again.

/// Simulated seconds per frame at rate 1.
pub const NOMINAL_STEP: f32 = 0.016;
/// Slowest allowed rate.
pub const MIN_RATE: f32 = 0.1;
/// Fastest allowed rate.
pub const MAX_RATE: f32 = 10.0;

type TickFn = Box<dyn FnMut(f32)>;

/// Fixed-step tick driver with pause, single-step and rate control.
pub struct FrameScheduler {
    tick: Option<TickFn>,
    rate: f32,
    paused: bool,
    step_requested: bool,
    ticks: u64,
}

impl Default for FrameScheduler {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl std::fmt::Debug for FrameScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameScheduler")
            .field("running", &self.is_running())
            .field("rate", &self.rate)
            .field("paused", &self.paused)
            .field("ticks", &self.ticks)
            .finish()
    }
}

impl FrameScheduler {
    pub fn new(rate: f32) -> Self {
        Self {
            tick: None,
            rate: clamp_rate(rate),
            paused: false,
            step_requested: false,
            ticks: 0,
        }
    }

    /// Registers the tick callback, replacing (and dropping) any previous one.
    pub fn start<F>(&mut self, tick: F)
    where
        F: FnMut(f32) + 'static,
    {
        self.tick = Some(Box::new(tick));
        self.step_requested = false;
    }

    /// Cancels the pending tick callback.
    pub fn stop(&mut self) {
        if self.tick.take().is_some() {
            log::debug!("scheduler stopped after {} ticks", self.ticks);
        }
        self.step_requested = false;
    }

    pub fn is_running(&self) -> bool {
        self.tick.is_some()
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
        self.step_requested = false;
    }

    pub fn toggle_pause(&mut self) -> bool {
        if self.paused {
            self.resume();
        } else {
            self.pause();
        }
        self.paused
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Queues exactly one tick for the next frame while paused.
    pub fn request_step(&mut self) {
        if self.paused {
            self.step_requested = true;
        }
    }

    /// Sets the rate multiplier, clamped to `[MIN_RATE, MAX_RATE]`.
    pub fn set_rate(&mut self, rate: f32) {
        self.rate = clamp_rate(rate);
    }

    pub fn rate(&self) -> f32 {
        self.rate
    }

    /// Simulated seconds passed to each tick.
    pub fn delta(&self) -> f32 {
        NOMINAL_STEP * self.rate
    }

    /// Ticks delivered since construction.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Called once per display refresh. Returns whether a tick ran.
    pub fn on_frame(&mut self) -> bool {
        if self.paused && !self.step_requested {
            return false;
        }
        let delta = self.delta();
        let Some(tick) = self.tick.as_mut() else {
            return false;
        };
        self.step_requested = false;
        tick(delta);
        self.ticks += 1;
        true
    }
}

fn clamp_rate(rate: f32) -> f32 {
    if rate.is_finite() {
        rate.clamp(MIN_RATE, MAX_RATE)
    } else {
        1.0
    }
}
