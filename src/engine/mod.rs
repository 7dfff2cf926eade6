//! Fixed-timestep game loop.
//!
//! [`CaveEngine`] owns the level, lights, player and camera. A host feeds it
//! rendered-frame durations; the engine turns those into whole fixed ticks and
//! drives a [`PhysicsWorld`] in lockstep with them.

pub mod plugin;

use bevy::math::Vec2;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use tracing::{debug, info, warn};

use crate::assets::{verify_required, AssetProvider};
use crate::camera::CameraRig;
use crate::collision::{BodyId, CollisionDispatcher, ContactFrame, DispatchOutcome};
use crate::config::{GameConfig, Viewport};
use crate::constants::{FIXED_STEP_SECS, MAX_STEPS_PER_FRAME};
use crate::error::Result;
use crate::lighting::{PointLight, RayCaster, TorchAnimation, VisibilityMesh};
use crate::logging::TimingSpan;
use crate::map::{strategy_for, LevelSeed, MapBuilder, MapLayout};
use crate::player::{InputEvent, PlayerBody, PlayerController, PlayerTuning};
use crate::timer::TickContext;

pub use plugin::{CaveEngineResource, CavePhysicsPlugin, EnginePlugin};

/// Converts variable frame time into a whole number of fixed steps
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedTimestep {
    pub step: f64,
    lag: f64,
    pub max_steps: u32,
}

impl Default for FixedTimestep {
    fn default() -> Self {
        Self::new(FIXED_STEP_SECS)
    }
}

impl FixedTimestep {
    pub fn new(step: f64) -> Self {
        Self {
            step,
            lag: 0.0,
            max_steps: MAX_STEPS_PER_FRAME,
        }
    }

    /// Add a frame's duration and return how many fixed steps to run.
    ///
    /// At most `max_steps` run per call; any backlog stays in the lag and
    /// is worked off on later frames.
    pub fn advance(&mut self, frame_dt: f64) -> u32 {
        if self.step <= 0.0 {
            return 0;
        }
        self.lag += frame_dt.max(0.0);
        let mut steps = 0;
        while self.lag >= self.step && steps < self.max_steps {
            self.lag -= self.step;
            steps += 1;
        }
        if self.lag >= self.step {
            warn!(
                backlog_steps = (self.lag / self.step) as u64,
                "fixed step falling behind"
            );
        }
        steps
    }

    pub fn lag(&self) -> f64 {
        self.lag
    }

    /// Fraction of a step left in the lag, for render interpolation
    pub fn alpha(&self) -> f64 {
        if self.step > 0.0 {
            (self.lag / self.step).min(1.0)
        } else {
            0.0
        }
    }
}

/// The physics backend a [`CaveEngine`] drives.
///
/// Coordinates are screen space: y grows downward and velocities are pixels
/// per fixed tick.
pub trait PhysicsWorld {
    /// Replace every body with the terrain, pickups and player of a level
    fn load_level(&mut self, layout: &MapLayout, player: &PlayerBody);

    /// Push controller-owned state into the simulated player body
    fn write_player(&mut self, body: &PlayerBody);

    /// Copy the simulated position and velocity back into the mirror
    fn read_player(&self, body: &mut PlayerBody);

    fn step(&mut self, dt: f32);

    /// Contacts gathered since the previous call
    fn drain_contacts(&mut self) -> ContactFrame;

    fn remove_pickup(&mut self, id: BodyId);
}

/// Everything needed to play one level
pub struct CaveEngine {
    config: GameConfig,
    seed: LevelSeed,
    level: u32,
    layout: MapLayout,
    lights: Vec<PointLight>,
    viewer: VisibilityMesh,
    caster: RayCaster,
    player: PlayerController,
    camera: CameraRig,
    dispatcher: CollisionDispatcher,
    timestep: FixedTimestep,
    clock: f64,
    tick: u64,
    visual_rng: Xoshiro256PlusPlus,
    torch_frames: usize,
}

impl CaveEngine {
    /// Validate the config and assets, then build the first level
    pub fn new(config: GameConfig, assets: &dyn AssetProvider) -> Result<Self> {
        config.validate()?;
        verify_required(assets)?;
        let torch_frames = assets.animation_frames("torch").unwrap_or(1);

        let seed = LevelSeed::new(config.map.seed);
        let caster = RayCaster::new(config.lighting.aux_epsilon);
        let layout = build_layout(&config, seed, 0)?;
        let lights = spawn_lights(&config, &layout, caster, torch_frames);
        let spawn = layout.player_spawn();

        Ok(Self {
            player: PlayerController::new(config.player.clone(), spawn),
            camera: CameraRig::new(spawn),
            viewer: VisibilityMesh::empty(spawn),
            visual_rng: Xoshiro256PlusPlus::seed_from_u64(seed.seed ^ 0x5eed_1e55),
            dispatcher: CollisionDispatcher::new(),
            timestep: FixedTimestep::default(),
            clock: 0.0,
            tick: 0,
            config,
            seed,
            level: 0,
            layout,
            lights,
            caster,
            torch_frames,
        })
    }

    // =========================================================================
    // Simulation
    // =========================================================================

    pub fn tick_context(&self) -> TickContext {
        let mut ctx = TickContext::new(self.clock, self.tick);
        ctx.time_scale = self.camera.catnip.time_scale(self.clock);
        ctx
    }

    pub fn handle_input(&mut self, event: InputEvent) {
        let ctx = self.tick_context();
        self.player.handle_input(event, &ctx, &mut self.camera);
    }

    /// One fixed tick: contacts, player, camera, then lighting
    pub fn fixed_step(&mut self, contacts: &ContactFrame) -> DispatchOutcome {
        let ctx = self.tick_context();
        let outcome = self
            .dispatcher
            .dispatch(contacts, &mut self.player, &mut self.camera, &ctx);
        self.player.update(&ctx, &mut self.camera);
        self.camera.update(&ctx, self.player.body.position);

        let time = self.config.lighting.synced_time.then_some(self.clock as f32);
        let dt = (self.timestep.step as f32) * ctx.time_scale;
        for light in &mut self.lights {
            light.update(
                &self.layout.geometry,
                self.config.viewport,
                time,
                dt,
                &mut self.visual_rng,
            );
        }
        self.viewer = self.caster.cast(self.player.body.position, &self.layout.geometry);

        self.clock += self.timestep.step;
        self.tick += 1;
        outcome
    }

    /// Run every fixed step owed for a rendered frame against `world`
    pub fn frame<W: PhysicsWorld>(&mut self, frame_dt: f64, world: &mut W) -> u32 {
        let steps = self.timestep.advance(frame_dt);
        for _ in 0..steps {
            let contacts = world.drain_contacts();
            let outcome = self.fixed_step(&contacts);
            for id in outcome.pickups {
                world.remove_pickup(id);
            }
            // velocities stay per real tick; a slowed tick covers less ground
            let dt = self.timestep.step as f32 * self.tick_context().time_scale;
            world.write_player(&self.player.body);
            world.step(dt);
            world.read_player(&mut self.player.body);
        }
        steps
    }

    // =========================================================================
    // Level lifecycle
    // =========================================================================

    /// Generate the next level from the same run seed
    pub fn reroll(&mut self) -> Result<()> {
        let level = self.level + 1;
        let layout = build_layout(&self.config, self.seed, level)?;
        self.lights = spawn_lights(&self.config, &layout, self.caster, self.torch_frames);

        let spawn = layout.player_spawn();
        self.player = PlayerController::new(self.config.player.clone(), spawn);
        self.camera = CameraRig::new(spawn);
        self.viewer = VisibilityMesh::empty(spawn);
        self.layout = layout;
        self.level = level;
        self.clock = 0.0;
        self.tick = 0;
        info!(level, "level rerolled");
        Ok(())
    }

    pub fn load_into<W: PhysicsWorld>(&self, world: &mut W) {
        world.load_level(&self.layout, &self.player.body);
    }

    /// Swap the player tuning without restarting the level
    pub fn apply_tuning(&mut self, tuning: PlayerTuning) -> Result<()> {
        tuning.validate()?;
        self.player.body.size = Vec2::new(tuning.body_width, tuning.body_height);
        self.player.tuning = tuning.clone();
        self.config.player = tuning;
        debug!("player tuning applied");
        Ok(())
    }

    pub fn resize(&mut self, viewport: Viewport) {
        self.config.viewport = viewport;
        for light in &mut self.lights {
            light.resize(&self.layout.geometry, viewport, &mut self.visual_rng);
        }
    }

    /// Camera position with shake applied, for the render step
    pub fn camera_offset(&mut self) -> Vec2 {
        self.camera.position + self.camera.shake_offset(&mut self.visual_rng)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn layout(&self) -> &MapLayout {
        &self.layout
    }

    pub fn lights(&self) -> &[PointLight] {
        &self.lights
    }

    /// Visibility from the player's position
    pub fn viewer(&self) -> &VisibilityMesh {
        &self.viewer
    }

    pub fn player(&self) -> &PlayerController {
        &self.player
    }

    pub fn player_mut(&mut self) -> &mut PlayerController {
        &mut self.player
    }

    pub fn camera(&self) -> &CameraRig {
        &self.camera
    }

    pub fn clock(&self) -> f64 {
        self.clock
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn timestep(&self) -> &FixedTimestep {
        &self.timestep
    }
}

fn build_layout(config: &GameConfig, seed: LevelSeed, level: u32) -> Result<MapLayout> {
    let _span = TimingSpan::new("level_build");
    let strategy = strategy_for(&config.map);
    let mut rng = seed.rng_for(level);
    MapBuilder::new(config.map.clone()).build(strategy.as_ref(), &mut rng)
}

fn spawn_lights(config: &GameConfig, layout: &MapLayout, caster: RayCaster, torch_frames: usize) -> Vec<PointLight> {
    layout
        .light_positions()
        .into_iter()
        .map(|position| {
            PointLight::new(
                position,
                config.lighting.color,
                caster,
                TorchAnimation::new(torch_frames, config.lighting.torch_fps),
            )
        })
        .collect()
}
