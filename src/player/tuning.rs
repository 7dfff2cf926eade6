//! Player movement tuning. Velocities are pixels per fixed tick, screen space
//! (negative y is up).

use serde::{Deserialize, Serialize};

use crate::error::{CaveError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerTuning {
    pub max_vel: f32,
    pub jump_vel: f32,
    pub wall_jump_x_mult: f32,
    pub wall_jump_y_mult: f32,
    /// Landing faster than this shakes the camera
    pub fall_damage_vel: f32,
    /// Late-jump grace after leaving the ground (milliseconds, halved while sliding)
    pub late_jump_ms: f64,
    /// Fraction of the grace window after which the fall animation starts
    pub late_jump_anim_fraction: f64,
    /// Horizontal decay per tick once movement input is released
    pub decel_step: f32,
    /// World gravity in pixels per tick squared, multiplied by the body's
    /// gravity scale
    pub gravity: f32,
    pub gravity_min: f32,
    pub gravity_max: f32,
    pub gravity_ramp: f32,
    pub wall_jump_grace_ms: f64,
    /// Terminal vertical speed while sliding down a wall
    pub slide_speed: f32,
    pub slide_easing: f32,
    pub climb_secs: f64,
    /// Reversing direction inside this window cancels the climb into a jump
    pub climb_cancel_secs: f64,
    pub knockback_x: f32,
    pub knockback_y: f32,
    pub knockback_secs: f64,
    pub body_width: f32,
    pub body_height: f32,
}

impl Default for PlayerTuning {
    fn default() -> Self {
        Self {
            max_vel: 5.0,
            jump_vel: -25.0,
            wall_jump_x_mult: 1.5,
            wall_jump_y_mult: 0.85,
            fall_damage_vel: 10.0,
            late_jump_ms: 225.0,
            late_jump_anim_fraction: 5.0 / 6.0,
            decel_step: 0.1,
            gravity: 1.2,
            gravity_min: 1.0,
            gravity_max: 3.5,
            gravity_ramp: 0.015,
            wall_jump_grace_ms: 200.0,
            slide_speed: 2.0,
            slide_easing: 0.2,
            climb_secs: 0.5,
            climb_cancel_secs: 0.125,
            knockback_x: 6.0,
            knockback_y: -10.0,
            knockback_secs: 0.3,
            body_width: 20.0,
            body_height: 28.0,
        }
    }
}

impl PlayerTuning {
    pub fn from_ron_str(text: &str) -> Result<Self> {
        let tuning: Self = ron::from_str(text).map_err(|e| CaveError::ConfigParse(e.to_string()))?;
        tuning.validate()?;
        Ok(tuning)
    }

    pub fn late_jump_secs(&self) -> f64 {
        self.late_jump_ms / 1000.0
    }

    pub fn wall_jump_grace_secs(&self) -> f64 {
        self.wall_jump_grace_ms / 1000.0
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| Err(CaveError::InvalidConfig(format!("player: {msg}")));

        if self.max_vel <= 0.0 {
            return invalid("max_vel must be positive");
        }
        if self.jump_vel >= 0.0 {
            return invalid("jump_vel must be negative (up)");
        }
        if self.fall_damage_vel <= 0.0 {
            return invalid("fall_damage_vel must be positive");
        }
        if self.late_jump_ms <= 0.0 || !(0.0..=1.0).contains(&self.late_jump_anim_fraction) {
            return invalid("late jump window is invalid");
        }
        if self.decel_step <= 0.0 {
            return invalid("decel_step must be positive");
        }
        if self.gravity < 0.0 || self.gravity_min <= 0.0 || self.gravity_max < self.gravity_min {
            return invalid("gravity range is invalid");
        }
        if self.climb_secs <= 0.0 || self.climb_cancel_secs > self.climb_secs {
            return invalid("climb timing is invalid");
        }
        if self.body_width <= 0.0 || self.body_height <= 0.0 {
            return invalid("body size must be positive");
        }
        Ok(())
    }
}
