use bevy::math::Vec2;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BodyMode {
    Dynamic,
    /// Frozen in place while hanging from a ledge
    Static,
}

/// Player's view of its physics body. The physics adapter copies this to and
/// from the real body around every physics step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerBody {
    pub position: Vec2,
    /// Pixels per fixed tick, screen space
    pub velocity: Vec2,
    pub gravity_scale: f32,
    pub mode: BodyMode,
    pub size: Vec2,
}

impl PlayerBody {
    pub fn new(position: Vec2, size: Vec2) -> Self {
        Self {
            position,
            velocity: Vec2::ZERO,
            gravity_scale: 1.0,
            mode: BodyMode::Dynamic,
            size,
        }
    }

    pub fn half_extents(&self) -> Vec2 {
        self.size * 0.5
    }

    pub fn is_static(&self) -> bool {
        self.mode == BodyMode::Static
    }
}
