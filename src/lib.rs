//! Catnip Caves - Core Library
//!
//! Deterministic core of a 2D cave platformer:
//! - Procedural levels (cellular caves, Wang-bitmap dungeons) with one
//!   connected playable region
//! - Tile colliders, walk and ledge sensors, lighting geometry
//! - Segment raycasting visibility and point lights
//! - Player motion state machine (ground, air, wall slide, ledge climb)
//! - Collision dispatch, camera trauma and the catnip effect
//! - Fixed-timestep engine with a Bevy + Rapier2D host

pub mod assets;
pub mod camera;
pub mod collision;
pub mod config;
pub mod constants;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod hotreload;
pub mod lighting;
pub mod logging;
pub mod map;
pub mod player;
pub mod timer;

pub use engine::{CaveEngine, FixedTimestep, PhysicsWorld};
pub use error::{CaveError, Result};
