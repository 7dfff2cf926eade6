//! Player motion state machine.
//!
//! The controller owns a [`PlayerBody`] mirror of the physics body. Input
//! events and the collision dispatcher drive transitions; `update` runs once
//! per fixed tick before the physics step.

pub mod body;
pub mod input;
pub mod tuning;

use bevy::math::Vec2;
use tracing::debug;

use crate::camera::CameraRig;
use crate::timer::{Stopwatch, TickContext};

pub use body::{BodyMode, PlayerBody};
pub use input::{Direction, Facing, HeldInputs, InputEvent, InputKind};
pub use tuning::PlayerTuning;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MotionState {
    Grounded,
    Airborne,
    Sliding,
    /// Holding a ledge while the climb animation plays
    Hanging,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Animation {
    Idle,
    Walk,
    Stop,
    Jump,
    Fall,
    Slide,
    Climb,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Climb {
    started_at: f64,
    from: Vec2,
    target: Vec2,
    direction: Facing,
}

#[derive(Debug, Clone)]
pub struct PlayerController {
    pub tuning: PlayerTuning,
    pub body: PlayerBody,
    state: MotionState,
    facing: Facing,
    /// Horizontal velocity intent, copied to the body every tick
    x_vel: f32,
    in_slow_down: bool,
    /// Late-jump grace, runs after a supporting contact ends
    collision_timer: Stopwatch,
    wall_jump_timer: Stopwatch,
    knockback_timer: Stopwatch,
    last_input: Option<Direction>,
    held: HeldInputs,
    animation: Animation,
    fall_animation_played: bool,
    /// Vertical velocity before the latest physics step
    impact_velocity: f32,
    climb: Option<Climb>,
    wall_side: Option<Facing>,
}

impl PlayerController {
    pub fn new(tuning: PlayerTuning, spawn: Vec2) -> Self {
        let size = Vec2::new(tuning.body_width, tuning.body_height);
        let mut body = PlayerBody::new(spawn, size);
        body.gravity_scale = tuning.gravity_min;
        Self {
            tuning,
            body,
            state: MotionState::Airborne,
            facing: Facing::Right,
            x_vel: 0.0,
            in_slow_down: false,
            collision_timer: Stopwatch::new(),
            wall_jump_timer: Stopwatch::new(),
            knockback_timer: Stopwatch::new(),
            last_input: None,
            held: HeldInputs::default(),
            animation: Animation::Fall,
            fall_animation_played: false,
            impact_velocity: 0.0,
            climb: None,
            wall_side: None,
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn state(&self) -> MotionState {
        self.state
    }

    pub fn animation(&self) -> Animation {
        self.animation
    }

    pub fn facing(&self) -> Facing {
        self.facing
    }

    pub fn x_vel(&self) -> f32 {
        self.x_vel
    }

    pub fn in_slow_down(&self) -> bool {
        self.in_slow_down
    }

    pub fn last_input(&self) -> Option<Direction> {
        self.last_input
    }

    pub fn held(&self) -> HeldInputs {
        self.held
    }

    pub fn wall_side(&self) -> Option<Facing> {
        self.wall_side
    }

    pub fn is_grounded(&self) -> bool {
        self.state == MotionState::Grounded
    }

    pub fn is_airborne(&self) -> bool {
        self.state == MotionState::Airborne
    }

    pub fn is_sliding(&self) -> bool {
        self.state == MotionState::Sliding
    }

    pub fn is_hanging(&self) -> bool {
        self.state == MotionState::Hanging
    }

    pub fn late_jump_pending(&self) -> bool {
        self.collision_timer.is_running()
    }

    pub fn in_wall_jump_grace(&self) -> bool {
        self.wall_jump_timer.is_running()
    }

    pub fn in_knockback(&self) -> bool {
        self.knockback_timer.is_running()
    }

    /// Horizontal direction currently held, preferring the most recent press
    pub fn held_facing(&self) -> Option<Facing> {
        if let Some(facing) = self.last_input.and_then(|d| d.facing()) {
            if self.held.is_held(facing.direction()) {
                return Some(facing);
            }
        }
        if self.held.right {
            Some(Facing::Right)
        } else if self.held.left {
            Some(Facing::Left)
        } else {
            None
        }
    }

    /// A ledge sensor on the right side of its tile is grabbed by a player
    /// moving left, and vice versa
    pub fn ledge_matches(&self, is_right: bool) -> bool {
        match self.held_facing() {
            Some(Facing::Right) => !is_right,
            Some(Facing::Left) => is_right,
            None => false,
        }
    }

    fn set_state(&mut self, next: MotionState) {
        if self.state != next {
            debug!(from = ?self.state, to = ?next, "player state");
            self.state = next;
        }
    }

    // =========================================================================
    // Input
    // =========================================================================

    pub fn handle_input(&mut self, event: InputEvent, ctx: &TickContext, camera: &mut CameraRig) {
        let direction = event.direction;
        match event.kind {
            InputKind::Down => {
                if self.held.is_held(direction) {
                    return;
                }
                self.held.set(direction, true);
                self.last_input = Some(direction);
                match direction {
                    Direction::Left | Direction::Right => {
                        if let Some(facing) = direction.facing() {
                            self.press_direction(facing, ctx, camera);
                        }
                    }
                    Direction::Up => self.jump(ctx),
                    Direction::Down => {}
                }
            }
            InputKind::Up => {
                if !self.held.is_held(direction) {
                    return;
                }
                self.held.set(direction, false);
                if let Some(facing) = direction.facing() {
                    self.release_direction(facing);
                }
            }
        }
    }

    fn press_direction(&mut self, facing: Facing, ctx: &TickContext, camera: &mut CameraRig) {
        if let Some(climb) = self.climb {
            let cancel_window = ctx.scaled(self.tuning.climb_cancel_secs);
            if facing != climb.direction && ctx.now - climb.started_at < cancel_window {
                self.cancel_climb(facing, camera);
            }
            return;
        }
        self.apply_direction(facing);
    }

    fn apply_direction(&mut self, facing: Facing) {
        if self.knockback_timer.is_running() || self.wall_jump_timer.is_running() {
            return;
        }
        self.facing = facing;
        self.x_vel = facing.sign() * self.tuning.max_vel;
        self.in_slow_down = false;

        match self.state {
            MotionState::Grounded => self.animation = Animation::Walk,
            MotionState::Sliding if self.wall_side == Some(facing.opposite()) => {
                self.wall_side = None;
                self.collision_timer.stop();
                self.set_state(MotionState::Airborne);
                self.animation = Animation::Fall;
            }
            _ => {}
        }
    }

    fn release_direction(&mut self, facing: Facing) {
        if self.is_hanging() {
            return;
        }
        if self.held.is_held(facing.opposite().direction()) {
            self.apply_direction(facing.opposite());
            return;
        }
        if self.facing != facing || self.knockback_timer.is_running() || self.wall_jump_timer.is_running() {
            return;
        }
        self.start_slow_down();
    }

    fn start_slow_down(&mut self) {
        if self.x_vel == 0.0 {
            return;
        }
        self.in_slow_down = true;
        if self.is_grounded() {
            self.animation = Animation::Stop;
        }
    }

    fn jump(&mut self, ctx: &TickContext) {
        match self.state {
            MotionState::Grounded => self.launch(self.tuning.jump_vel),
            MotionState::Sliding => self.wall_jump(ctx),
            MotionState::Airborne | MotionState::Hanging => {}
        }
    }

    fn launch(&mut self, vertical: f32) {
        self.body.velocity.y = vertical;
        self.body.gravity_scale = self.tuning.gravity_min;
        self.collision_timer.stop();
        self.wall_side = None;
        self.fall_animation_played = false;
        self.set_state(MotionState::Airborne);
        self.animation = Animation::Jump;
    }

    fn wall_jump(&mut self, ctx: &TickContext) {
        let away = match self.wall_side {
            Some(side) => side.opposite(),
            None => self.facing.opposite(),
        };
        self.facing = away;
        self.x_vel = away.sign() * self.tuning.max_vel * self.tuning.wall_jump_x_mult;
        self.in_slow_down = false;
        self.launch(self.tuning.jump_vel * self.tuning.wall_jump_y_mult);
        self.wall_jump_timer.restart(ctx.now);
        debug!(x_vel = self.x_vel, "wall jump");
    }

    // =========================================================================
    // Per-tick update
    // =========================================================================

    pub fn update(&mut self, ctx: &TickContext, camera: &mut CameraRig) {
        if let Some(climb) = self.climb {
            if ctx.now - climb.started_at >= ctx.scaled(self.tuning.climb_secs) {
                self.finish_climb(camera);
            }
            return;
        }

        if self.knockback_timer.is_running()
            && self.knockback_timer.elapsed(ctx.now) >= ctx.scaled(self.tuning.knockback_secs)
        {
            self.knockback_timer.stop();
            self.reapply_held();
        }

        if self.wall_jump_timer.is_running()
            && self.wall_jump_timer.elapsed(ctx.now) >= ctx.scaled(self.tuning.wall_jump_grace_secs())
        {
            self.wall_jump_timer.stop();
            self.reapply_held();
        }

        self.update_late_jump(ctx);

        let scale = ctx.time_scale;
        let decel = self.tuning.decel_step * scale;
        if self.in_slow_down {
            if self.x_vel.abs() <= decel {
                self.x_vel = 0.0;
                self.in_slow_down = false;
                if self.is_grounded() {
                    self.animation = Animation::Idle;
                }
            } else {
                self.x_vel -= self.x_vel.signum() * decel;
            }
        }
        self.body.velocity.x = self.x_vel;

        if self.is_airborne() {
            self.body.gravity_scale =
                (self.body.gravity_scale + self.tuning.gravity_ramp * scale).min(self.tuning.gravity_max);
        } else {
            self.body.gravity_scale = self.tuning.gravity_min;
        }

        if !self.body.is_static() {
            self.body.velocity.y += self.tuning.gravity * self.body.gravity_scale * scale;
        }

        if self.is_sliding() && self.body.velocity.y >= 0.0 {
            let vy = self.body.velocity.y;
            self.body.velocity.y = vy + (self.tuning.slide_speed - vy) * (self.tuning.slide_easing * scale).min(1.0);
        }

        if self.is_airborne() && self.animation == Animation::Jump && self.body.velocity.y > 0.0 {
            self.animation = Animation::Fall;
        }

        self.impact_velocity = self.body.velocity.y;
    }

    fn update_late_jump(&mut self, ctx: &TickContext) {
        if !self.collision_timer.is_running() {
            return;
        }
        let mut grace = ctx.scaled(self.tuning.late_jump_secs());
        if self.is_sliding() {
            grace *= 0.5;
        }
        let elapsed = self.collision_timer.elapsed(ctx.now);

        if elapsed >= grace {
            self.collision_timer.stop();
            self.wall_side = None;
            self.set_state(MotionState::Airborne);
            if !self.fall_animation_played {
                self.play_fall_animation();
            }
        } else if elapsed >= grace * self.tuning.late_jump_anim_fraction && !self.fall_animation_played {
            self.play_fall_animation();
        }
    }

    fn play_fall_animation(&mut self) {
        self.animation = if self.body.velocity.y < 0.0 {
            Animation::Jump
        } else {
            Animation::Fall
        };
        self.fall_animation_played = true;
    }

    fn reapply_held(&mut self) {
        match self.held_facing() {
            Some(facing) => self.apply_direction(facing),
            None => self.start_slow_down(),
        }
    }

    // =========================================================================
    // Collision feedback
    // =========================================================================

    /// Touch down on a qualifying ground contact. Returns the trauma added to
    /// the camera.
    pub fn land(&mut self, camera: &mut CameraRig) -> f32 {
        let impact = self.body.velocity.y.max(self.impact_velocity);
        self.collision_timer.stop();
        self.wall_side = None;
        self.fall_animation_played = false;
        self.impact_velocity = 0.0;
        self.body.gravity_scale = self.tuning.gravity_min;
        self.set_state(MotionState::Grounded);

        let mut trauma = 0.0;
        if impact > self.tuning.fall_damage_vel {
            trauma = impact / (self.tuning.fall_damage_vel * 2.0);
            camera.add_trauma(trauma);
            debug!(impact, trauma, "hard landing");
        }

        self.animation = if self.in_slow_down || self.x_vel == 0.0 {
            Animation::Stop
        } else {
            Animation::Walk
        };
        trauma
    }

    /// Start sliding down a wall on the given side of the player
    pub fn start_slide(&mut self, wall_side: Facing) {
        self.collision_timer.stop();
        self.wall_side = Some(wall_side);
        self.facing = wall_side;
        self.body.gravity_scale = self.tuning.gravity_min;
        self.fall_animation_played = false;
        self.set_state(MotionState::Sliding);
        self.animation = Animation::Slide;
    }

    /// Support is still present; cancel any pending late-jump grace
    pub fn hold_ground(&mut self) {
        if self.collision_timer.is_running() {
            self.collision_timer.stop();
            if self.fall_animation_played {
                self.fall_animation_played = false;
                self.animation = match self.state {
                    MotionState::Sliding => Animation::Slide,
                    _ if self.x_vel == 0.0 => Animation::Idle,
                    _ if self.in_slow_down => Animation::Stop,
                    _ => Animation::Walk,
                };
            }
        }
    }

    /// Begin the late-jump grace window if it is not already running
    pub fn start_late_jump(&mut self, ctx: &TickContext) {
        if matches!(self.state, MotionState::Grounded | MotionState::Sliding) {
            self.collision_timer.start(ctx.now);
        }
    }

    pub fn on_contact_end(&mut self, is_solid: bool, ctx: &TickContext) {
        if self.is_hanging() {
            return;
        }
        self.start_late_jump(ctx);
        if is_solid && self.body.velocity.y < 0.0 {
            self.animation = Animation::Jump;
            self.fall_animation_played = true;
        }
    }

    /// Freeze on a ledge corner and start climbing over it
    pub fn grab_ledge(&mut self, corner: Vec2, ctx: &TickContext, camera: &mut CameraRig) {
        let direction = self.held_facing().unwrap_or(self.facing);
        let s = direction.sign();
        let half = self.body.half_extents();
        let anchor = corner + Vec2::new(-s * half.x, half.y);
        let target = corner + Vec2::new(s * half.x, -half.y);

        self.body.position = anchor;
        self.body.velocity = Vec2::ZERO;
        self.body.mode = BodyMode::Static;
        self.facing = direction;
        self.x_vel = 0.0;
        self.in_slow_down = false;
        self.collision_timer.stop();
        self.wall_side = None;
        self.climb = Some(Climb {
            started_at: ctx.now,
            from: anchor,
            target,
            direction,
        });
        self.set_state(MotionState::Hanging);
        self.animation = Animation::Climb;
        camera.unsnap_toward(anchor, target, ctx.now, ctx.scaled(self.tuning.climb_secs));
    }

    fn finish_climb(&mut self, camera: &mut CameraRig) {
        let Some(climb) = self.climb.take() else {
            return;
        };
        self.body.position = climb.target;
        self.body.velocity = Vec2::ZERO;
        self.body.mode = BodyMode::Dynamic;
        self.body.gravity_scale = self.tuning.gravity_min;
        self.set_state(MotionState::Grounded);
        camera.snap();

        match self.held_facing() {
            Some(facing) => {
                self.facing = facing;
                self.x_vel = facing.sign() * self.tuning.max_vel;
                self.animation = Animation::Walk;
            }
            None => {
                self.x_vel = 0.0;
                self.animation = Animation::Stop;
            }
        }
    }

    fn cancel_climb(&mut self, facing: Facing, camera: &mut CameraRig) {
        let Some(climb) = self.climb.take() else {
            return;
        };
        debug!(from = ?climb.from, "climb cancelled");
        self.body.mode = BodyMode::Dynamic;
        camera.snap();
        self.facing = facing;
        self.x_vel = facing.sign() * self.tuning.max_vel;
        self.launch(self.tuning.jump_vel);
    }

    /// Knock the player away from `source`
    pub fn apply_knockback(&mut self, source: Vec2, ctx: &TickContext, camera: &mut CameraRig) {
        if self.climb.take().is_some() {
            self.body.mode = BodyMode::Dynamic;
            camera.snap();
        }
        let away = if self.body.position.x < source.x {
            Facing::Left
        } else {
            Facing::Right
        };
        self.x_vel = away.sign() * self.tuning.knockback_x;
        self.in_slow_down = false;
        self.launch(self.tuning.knockback_y);
        self.knockback_timer.restart(ctx.now);
    }
}
