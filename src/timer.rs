//! Polled elapsed-time trackers.
//!
//! Timers never schedule callbacks. Owners poll `elapsed` once per fixed tick
//! against the engine's simulation clock.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Stopwatch {
    started_at: Option<f64>,
}

impl Stopwatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the watch if it is not already running
    pub fn start(&mut self, now: f64) {
        if self.started_at.is_none() {
            self.started_at = Some(now);
        }
    }

    /// Start from zero even if already running
    pub fn restart(&mut self, now: f64) {
        self.started_at = Some(now);
    }

    pub fn stop(&mut self) {
        self.started_at = None;
    }

    pub fn is_running(&self) -> bool {
        self.started_at.is_some()
    }

    /// Seconds since start; zero when stopped
    pub fn elapsed(&self, now: f64) -> f64 {
        match self.started_at {
            Some(start) => (now - start).max(0.0),
            None => 0.0,
        }
    }
}

/// Clock snapshot handed to everything that runs inside one fixed tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickContext {
    /// Simulation seconds since the level started
    pub now: f64,
    /// Fixed ticks since the level started
    pub tick: u64,
    /// 1.0 is normal speed; below 1.0 the world is slowed
    pub time_scale: f32,
}

impl TickContext {
    pub fn new(now: f64, tick: u64) -> Self {
        Self {
            now,
            tick,
            time_scale: 1.0,
        }
    }

    /// Stretch a real-time duration by the current time scale
    pub fn scaled(&self, secs: f64) -> f64 {
        if self.time_scale > 0.0 {
            secs / self.time_scale as f64
        } else {
            secs
        }
    }
}
