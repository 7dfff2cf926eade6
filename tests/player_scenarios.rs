//! Player scenarios driven through the collision dispatcher against a
//! scripted world: one axis-aligned floor plus hand-fed sensor contacts.

use bevy::math::Vec2;

use cave_core::camera::CameraRig;
use cave_core::collision::{BodyId, BodyTags, CollisionDispatcher, ContactFrame, ContactPair, ContactTracker, DispatchOutcome};
use cave_core::constants::FIXED_STEP_SECS;
use cave_core::player::{Animation, BodyMode, Direction, InputEvent, MotionState, PlayerController, PlayerTuning};
use cave_core::timer::TickContext;

const FLOOR_SOLID: BodyId = 1;
const FLOOR_WALK: BodyId = 2;

#[derive(Debug, Clone, Copy)]
struct Floor {
    top: f32,
    left: f32,
    right: f32,
}

/// Minimal stand-in for the physics step: integrates the body, clamps it to
/// the floor, and reports floor contacts through a tracker.
struct Scenario {
    player: PlayerController,
    camera: CameraRig,
    tracker: ContactTracker,
    floor: Floor,
    on_floor: bool,
    /// Vertical speed of the body the moment it hit the floor
    last_impact: f32,
    now: f64,
    tick: u64,
}

impl Scenario {
    fn new(spawn: Vec2, floor: Floor) -> Self {
        Self {
            player: PlayerController::new(PlayerTuning::default(), spawn),
            camera: CameraRig::new(spawn),
            tracker: ContactTracker::new(),
            floor,
            on_floor: false,
            last_impact: 0.0,
            now: 0.0,
            tick: 0,
        }
    }

    fn ctx(&self) -> TickContext {
        TickContext::new(self.now, self.tick)
    }

    fn input(&mut self, event: InputEvent) {
        let ctx = self.ctx();
        self.player.handle_input(event, &ctx, &mut self.camera);
    }

    fn step(&mut self) -> DispatchOutcome {
        let ctx = self.ctx();
        let frame = self.tracker.take_frame();
        let outcome = CollisionDispatcher.dispatch(&frame, &mut self.player, &mut self.camera, &ctx);
        self.player.update(&ctx, &mut self.camera);
        self.camera.update(&ctx, self.player.body.position);
        self.integrate();
        self.now += FIXED_STEP_SECS;
        self.tick += 1;
        outcome
    }

    fn step_until(&mut self, max_ticks: usize, done: impl Fn(&Scenario) -> bool) -> Option<DispatchOutcome> {
        for _ in 0..max_ticks {
            let outcome = self.step();
            if done(self) {
                return Some(outcome);
            }
        }
        None
    }

    fn integrate(&mut self) {
        let body = &mut self.player.body;
        if body.mode == BodyMode::Static {
            return;
        }
        let half = body.half_extents();
        let previous_bottom = body.position.y + half.y;
        body.position += body.velocity;

        let bottom = body.position.y + half.y;
        let overlaps = body.position.x - half.x < self.floor.right && body.position.x + half.x > self.floor.left;
        let touching = overlaps && previous_bottom <= self.floor.top + 0.01 && bottom >= self.floor.top - 0.01;

        if touching {
            if bottom > self.floor.top {
                self.last_impact = body.velocity.y;
                body.position.y = self.floor.top - half.y;
                body.velocity.y = 0.0;
            }
            if !self.on_floor {
                let anchor = Vec2::new(body.position.x, self.floor.top);
                self.tracker.begin(ContactPair::solid(FLOOR_SOLID, anchor));
                self.tracker.begin(ContactPair::sensor(FLOOR_WALK, BodyTags::walk_box(), anchor));
            }
        } else if self.on_floor {
            self.tracker.end(FLOOR_SOLID);
            self.tracker.end(FLOOR_WALK);
        }
        self.on_floor = touching;
    }
}

fn long_floor() -> Floor {
    Floor {
        top: 200.0,
        left: 0.0,
        right: 300.0,
    }
}

/// Spawn with the body resting on the floor and let it settle
fn standing_at(x: f32) -> Scenario {
    let mut scenario = Scenario::new(Vec2::new(x, 186.0), long_floor());
    let landed = scenario.step_until(4, |s| s.player.is_grounded());
    assert!(landed.is_some(), "player never settled");
    scenario
}

// ============================================================
// Landing
// ============================================================

#[test]
fn test_settling_on_the_floor_is_soft() {
    let scenario = standing_at(100.0);
    assert_eq!(scenario.camera.trauma, 0.0);
    assert_eq!(scenario.player.state(), MotionState::Grounded);
    assert_eq!(scenario.player.body.position.y, 186.0);
}

#[test]
fn test_long_fall_adds_trauma_from_impact_speed() {
    let mut scenario = Scenario::new(Vec2::new(100.0, -300.0), long_floor());
    let outcome = scenario
        .step_until(200, |s| s.player.is_grounded())
        .expect("player should reach the floor");

    assert!(outcome.landed);
    let impact = scenario.last_impact;
    assert!(impact > PlayerTuning::default().fall_damage_vel);
    assert!((outcome.trauma_added - impact / 20.0).abs() < 1e-4);
    assert!(scenario.camera.trauma > 0.0);
}

#[test]
fn test_fall_damage_threshold() {
    let mut camera = CameraRig::default();
    let ctx = TickContext::new(1.0, 60);
    let frame = ContactFrame::with_active(vec![
        ContactPair::solid(FLOOR_SOLID, Vec2::new(100.0, 200.0)),
        ContactPair::sensor(FLOOR_WALK, BodyTags::walk_box(), Vec2::new(100.0, 200.0)),
    ]);

    let mut hard = PlayerController::new(PlayerTuning::default(), Vec2::new(100.0, 186.0));
    hard.body.velocity.y = 15.0;
    let outcome = CollisionDispatcher.dispatch(&frame, &mut hard, &mut camera, &ctx);
    assert!((outcome.trauma_added - 0.75).abs() < 1e-6);
    assert!((camera.trauma - 0.75).abs() < 1e-6);

    camera.trauma = 0.0;
    let mut soft = PlayerController::new(PlayerTuning::default(), Vec2::new(100.0, 186.0));
    soft.body.velocity.y = 5.0;
    let outcome = CollisionDispatcher.dispatch(&frame, &mut soft, &mut camera, &ctx);
    assert!(outcome.landed);
    assert_eq!(outcome.trauma_added, 0.0);
    assert_eq!(camera.trauma, 0.0);
}

// ============================================================
// Late jump
// ============================================================

#[test]
fn test_late_jump_after_walking_off_edge() {
    let mut scenario = standing_at(250.0);
    scenario.input(InputEvent::down(Direction::Right));
    scenario
        .step_until(30, |s| !s.on_floor)
        .expect("player should walk off the edge");

    // contact end is dispatched on the following tick
    for _ in 0..5 {
        scenario.step();
    }
    assert!(scenario.player.late_jump_pending());
    assert_eq!(scenario.player.state(), MotionState::Grounded);

    scenario.input(InputEvent::down(Direction::Up));
    assert!(scenario.player.is_airborne());
    assert_eq!(scenario.player.body.velocity.y, PlayerTuning::default().jump_vel);
    assert_eq!(scenario.player.animation(), Animation::Jump);
}

#[test]
fn test_grace_expiry_leaves_player_airborne() {
    let mut scenario = standing_at(250.0);
    scenario.input(InputEvent::down(Direction::Right));
    scenario.step_until(30, |s| !s.on_floor).expect("walked off");

    // 225ms grace is under 14 ticks
    for _ in 0..16 {
        scenario.step();
    }
    assert!(scenario.player.is_airborne());
    assert!(!scenario.player.late_jump_pending());

    let vy = scenario.player.body.velocity.y;
    scenario.input(InputEvent::down(Direction::Up));
    assert_eq!(scenario.player.body.velocity.y, vy);
}

#[test]
fn test_jump_leaves_floor_without_grace() {
    let mut scenario = standing_at(100.0);
    scenario.input(InputEvent::down(Direction::Up));
    scenario.step();
    assert!(!scenario.on_floor);
    scenario.step();
    assert!(scenario.player.is_airborne());
    assert!(!scenario.player.late_jump_pending());
}

// ============================================================
// Input bookkeeping
// ============================================================

#[test]
fn test_key_repeat_keeps_single_held_state() {
    let mut scenario = standing_at(100.0);
    for _ in 0..3 {
        scenario.input(InputEvent::down(Direction::Right));
        scenario.step();
    }
    assert_eq!(scenario.player.x_vel(), 5.0);

    scenario.input(InputEvent::up(Direction::Right));
    assert!(scenario.player.in_slow_down());
    assert!(!scenario.player.held().right);

    // a second release changes nothing
    scenario.step();
    let x_vel = scenario.player.x_vel();
    scenario.input(InputEvent::up(Direction::Right));
    assert_eq!(scenario.player.x_vel(), x_vel);

    scenario
        .step_until(60, |s| s.player.x_vel() == 0.0)
        .expect("deceleration should finish");
    assert!(!scenario.player.in_slow_down());
    assert_eq!(scenario.player.animation(), Animation::Idle);
}

// ============================================================
// Ledges
// ============================================================

const LEDGE_CORNER: Vec2 = Vec2::new(200.0, 100.0);
const WALL: BodyId = 10;
const EDGE: BodyId = 11;

fn beside_ledge(is_right: bool) -> Scenario {
    let platform = Floor {
        top: 100.0,
        left: 200.0,
        right: 400.0,
    };
    let mut scenario = Scenario::new(Vec2::new(190.0, 120.0), platform);
    scenario.input(InputEvent::down(Direction::Right));
    scenario.tracker.begin(ContactPair::solid(WALL, Vec2::new(216.0, 116.0)));
    scenario
        .tracker
        .begin(ContactPair::sensor(EDGE, BodyTags::edge_box(is_right), LEDGE_CORNER));
    scenario
}

#[test]
fn test_matching_ledge_is_grabbed_and_climbed() {
    let mut scenario = beside_ledge(false);
    let outcome = scenario.step();
    assert!(outcome.ledge_grabbed);
    assert!(!outcome.started_slide);
    assert_eq!(scenario.player.state(), MotionState::Hanging);
    assert_eq!(scenario.player.body.mode, BodyMode::Static);
    assert_eq!(scenario.player.body.position, LEDGE_CORNER + Vec2::new(-10.0, 14.0));
    assert!(!scenario.camera.is_snapped());

    scenario.tracker.end(WALL);
    scenario.tracker.end(EDGE);
    for _ in 0..20 {
        scenario.step();
    }
    assert!(scenario.player.is_hanging());

    scenario
        .step_until(20, |s| s.player.is_grounded())
        .expect("climb should finish");
    assert_eq!(scenario.player.body.mode, BodyMode::Dynamic);
    assert!(scenario.camera.is_snapped());
    assert_eq!(scenario.player.x_vel(), 5.0);

    // the climb target rests on the platform
    scenario.step();
    assert!(scenario.on_floor);
    scenario.step();
    assert!(scenario.player.is_grounded());
}

#[test]
fn test_ledge_on_wrong_side_slides_instead() {
    let mut scenario = beside_ledge(true);
    let outcome = scenario.step();
    assert!(!outcome.ledge_grabbed);
    assert!(outcome.started_slide);
    assert_eq!(scenario.player.state(), MotionState::Sliding);
    assert_eq!(scenario.player.body.mode, BodyMode::Dynamic);
}

#[test]
fn test_ledge_needs_held_direction() {
    let mut scenario = beside_ledge(false);
    scenario.input(InputEvent::up(Direction::Right));
    let outcome = scenario.step();
    assert!(!outcome.ledge_grabbed);
    assert!(!scenario.player.is_hanging());
}
