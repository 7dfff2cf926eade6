//! Abstract input events. Keyboard, touch and gamepad adapters all emit the
//! same shape.

use bevy::prelude::Event;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

impl Direction {
    pub fn facing(&self) -> Option<Facing> {
        match self {
            Direction::Left => Some(Facing::Left),
            Direction::Right => Some(Facing::Right),
            Direction::Up | Direction::Down => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputKind {
    #[serde(rename = "inputDown")]
    Down,
    #[serde(rename = "inputUp")]
    Up,
}

#[derive(Event, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputEvent {
    #[serde(rename = "type")]
    pub kind: InputKind,
    pub direction: Direction,
}

impl InputEvent {
    pub fn down(direction: Direction) -> Self {
        Self {
            kind: InputKind::Down,
            direction,
        }
    }

    pub fn up(direction: Direction) -> Self {
        Self {
            kind: InputKind::Up,
            direction,
        }
    }
}

/// Horizontal facing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Facing {
    Left,
    Right,
}

impl Facing {
    pub fn sign(&self) -> f32 {
        match self {
            Facing::Left => -1.0,
            Facing::Right => 1.0,
        }
    }

    pub fn opposite(&self) -> Self {
        match self {
            Facing::Left => Facing::Right,
            Facing::Right => Facing::Left,
        }
    }

    pub fn direction(&self) -> Direction {
        match self {
            Facing::Left => Direction::Left,
            Facing::Right => Direction::Right,
        }
    }
}

/// Which directions are currently pressed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeldInputs {
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
}

impl HeldInputs {
    pub fn is_held(&self, direction: Direction) -> bool {
        match direction {
            Direction::Left => self.left,
            Direction::Right => self.right,
            Direction::Up => self.up,
            Direction::Down => self.down,
        }
    }

    pub fn set(&mut self, direction: Direction, held: bool) {
        match direction {
            Direction::Left => self.left = held,
            Direction::Right => self.right = held,
            Direction::Up => self.up = held,
            Direction::Down => self.down = held,
        }
    }
}
