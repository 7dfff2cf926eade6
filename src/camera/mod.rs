//! Camera feedback driven by the player and the collision dispatcher.
//!
//! The renderer owns the real camera. This rig only tracks what gameplay
//! decides: where to look, how much to shake, and how strong the catnip
//! distortion is.

use bevy::math::Vec2;
use rand::Rng;

use crate::constants::{MAX_SHAKE_OFFSET, TRAUMA_DECAY_PER_TICK};
use crate::timer::{Stopwatch, TickContext};

/// Interpolated path followed while the player climbs a ledge
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClimbPath {
    pub from: Vec2,
    pub to: Vec2,
    pub started_at: f64,
    pub duration: f64,
}

impl ClimbPath {
    pub fn point_at(&self, now: f64) -> Vec2 {
        let t = if self.duration > 0.0 {
            ((now - self.started_at) / self.duration).clamp(0.0, 1.0) as f32
        } else {
            1.0
        };
        // smoothstep
        let eased = t * t * (3.0 - 2.0 * t);
        self.from.lerp(self.to, eased)
    }
}

/// Screen distortion after picking up catnip. Intensity starts at 1 and fades
/// linearly; the world runs slower while it lasts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CatnipEffect {
    timer: Stopwatch,
    pub duration: f64,
    /// Time scale at full intensity
    pub min_time_scale: f32,
}

impl Default for CatnipEffect {
    fn default() -> Self {
        Self {
            timer: Stopwatch::new(),
            duration: 8.0,
            min_time_scale: 0.6,
        }
    }
}

impl CatnipEffect {
    /// Start or refresh the effect
    pub fn trigger(&mut self, now: f64) {
        self.timer.restart(now);
    }

    pub fn is_active(&self) -> bool {
        self.timer.is_running()
    }

    pub fn intensity(&self, now: f64) -> f32 {
        if !self.timer.is_running() || self.duration <= 0.0 {
            return 0.0;
        }
        (1.0 - self.timer.elapsed(now) / self.duration).clamp(0.0, 1.0) as f32
    }

    pub fn time_scale(&self, now: f64) -> f32 {
        1.0 - (1.0 - self.min_time_scale) * self.intensity(now)
    }

    pub fn update(&mut self, now: f64) {
        if self.timer.is_running() && self.timer.elapsed(now) >= self.duration {
            self.timer.stop();
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CameraRig {
    pub position: Vec2,
    /// 0..=1, shake strength grows with its square
    pub trauma: f32,
    snapped: bool,
    climb_path: Option<ClimbPath>,
    pub catnip: CatnipEffect,
}

impl Default for CameraRig {
    fn default() -> Self {
        Self::new(Vec2::ZERO)
    }
}

impl CameraRig {
    pub fn new(position: Vec2) -> Self {
        Self {
            position,
            trauma: 0.0,
            snapped: true,
            climb_path: None,
            catnip: CatnipEffect::default(),
        }
    }

    pub fn add_trauma(&mut self, amount: f32) {
        self.trauma = (self.trauma + amount.max(0.0)).min(1.0);
    }

    pub fn is_snapped(&self) -> bool {
        self.snapped
    }

    pub fn climb_path(&self) -> Option<&ClimbPath> {
        self.climb_path.as_ref()
    }

    /// Stop following the body and glide along a climb path instead
    pub fn unsnap_toward(&mut self, from: Vec2, to: Vec2, now: f64, duration: f64) {
        self.snapped = false;
        self.climb_path = Some(ClimbPath {
            from,
            to,
            started_at: now,
            duration,
        });
    }

    pub fn snap(&mut self) {
        self.snapped = true;
        self.climb_path = None;
    }

    pub fn update(&mut self, ctx: &TickContext, target: Vec2) {
        self.trauma = (self.trauma - TRAUMA_DECAY_PER_TICK).max(0.0);
        self.catnip.update(ctx.now);

        if self.snapped {
            self.position = target;
        } else if let Some(path) = &self.climb_path {
            self.position = path.point_at(ctx.now);
        }
    }

    pub fn shake_offset<R: Rng>(&self, rng: &mut R) -> Vec2 {
        let shake = self.trauma * self.trauma;
        if shake <= 0.0 {
            return Vec2::ZERO;
        }
        Vec2::new(rng.gen_range(-1.0..=1.0), rng.gen_range(-1.0..=1.0)) * shake * MAX_SHAKE_OFFSET
    }
}
