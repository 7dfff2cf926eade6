//! Centralized constants for the cave core.
//!
//! Tunable gameplay values live in `PlayerTuning` and `MapConfig`; this file
//! only holds values that are fixed by the simulation model itself.

// =====================================================
// Simulation clock
// =====================================================

/// Fixed update cadence (16.666ms)
pub const FIXED_STEP_SECS: f64 = 1.0 / 60.0;

/// Fixed ticks per second, used to convert per-tick velocities for rapier
pub const TICKS_PER_SECOND: f32 = 60.0;

/// Upper bound on fixed steps run for a single rendered frame
pub const MAX_STEPS_PER_FRAME: u32 = 8;

// =====================================================
// Lighting
// =====================================================

/// Angular offset of an auxiliary ray from its primary ray (radians)
pub const AUX_RAY_EPSILON: f32 = 0.005;

/// Distance slack when deciding whether a wall hit occludes a corner
pub const OCCLUSION_TOLERANCE: f32 = 1e-3;

/// Quantization used when deduplicating geometry by value (1/1000 px)
pub const POINT_KEY_SCALE: f32 = 1000.0;

// =====================================================
// Procedural generation
// =====================================================

/// Cellular automaton birth rule
pub const CELLULAR_BIRTH: [u8; 5] = [4, 5, 6, 7, 8];

/// Cellular automaton survive rule
pub const CELLULAR_SURVIVE: [u8; 4] = [2, 3, 4, 5];

/// Default smoothing passes for the cellular strategy
pub const CELLULAR_ITERATIONS: u32 = 9;

/// Reference bitmap pixels below this intensity are open cells
pub const WANG_OPEN_THRESHOLD: u8 = 254;

// =====================================================
// Camera
// =====================================================

/// Trauma removed from the camera every fixed tick
pub const TRAUMA_DECAY_PER_TICK: f32 = 0.02;

/// Maximum shake offset in pixels at full trauma
pub const MAX_SHAKE_OFFSET: f32 = 12.0;
