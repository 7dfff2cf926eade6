//! Bevy + Rapier2D host for [`CaveEngine`].
//!
//! Provides:
//! - collision group constants and body bundles for level entities
//! - rapier `CollisionEvent` translation into the core's `ContactFrame`
//! - the fixed-tick chain: contacts → engine tick → body write-back
//! - keyboard input (arrows / WASD / space) as [`InputEvent`]s
//!
//! The core works in screen space (y down, pixels per tick). Rapier runs in
//! Bevy world space (y up, pixels per second), so every crossing flips y and
//! scales velocities by the tick rate.

use bevy::prelude::*;
use bevy::window::WindowResized;
use bevy_rapier2d::prelude::*;
use bevy_rapier2d::rapier::geometry::CollisionEventFlags;

use super::CaveEngine;
use crate::assets::AssetCatalog;
use crate::collision::{BodyId, BodyTags, ContactPair, ContactTracker};
use crate::config::{GameConfig, Viewport};
use crate::constants::{FIXED_STEP_SECS, TICKS_PER_SECOND};
use crate::lighting::LightingPlugin;
use crate::map::{Aabb, MapLayout};
use crate::player::{BodyMode, Direction, InputEvent, PlayerBody};

// ============================================================================
// Resources & Components
// ============================================================================

#[derive(Resource)]
pub struct CaveEngineResource(pub CaveEngine);

/// Begin/end bookkeeping between rapier events and engine ticks
#[derive(Resource, Default)]
pub struct PlayerContacts(pub ContactTracker);

/// Any entity owned by the current level, despawned on reroll
#[derive(Component, Debug, Clone, Copy)]
pub struct LevelEntity;

#[derive(Component, Debug, Clone, Copy)]
pub struct PlayerMarker;

/// Classification of a level body as the collision dispatcher sees it
#[derive(Component, Debug, Clone, Copy)]
pub struct TerrainBody {
    pub tags: BodyTags,
    /// Screen-space reference point (ledge corner, tile centre, pickup)
    pub anchor: Vec2,
}

/// Ask for a freshly generated level
#[derive(Event, Debug, Clone, Copy, Default)]
pub struct RerollRequest;

#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineSet {
    Contacts,
    Tick,
    WriteBack,
}

// ============================================================================
// Collision Layers
// ============================================================================

pub struct PhysicsLayers;

impl PhysicsLayers {
    pub const PLAYER: Group = Group::GROUP_1;
    /// Solid tile bodies
    pub const TERRAIN: Group = Group::GROUP_2;
    /// Walk boxes and ledge boxes
    pub const SENSOR: Group = Group::GROUP_3;
    pub const PICKUP: Group = Group::GROUP_4;
    pub const NPC: Group = Group::GROUP_5;
}

// ============================================================================
// Coordinate conversion
// ============================================================================

/// Screen-space point to Bevy world space
pub fn to_world(p: Vec2) -> Vec2 {
    Vec2::new(p.x, -p.y)
}

pub fn from_world(p: Vec2) -> Vec2 {
    Vec2::new(p.x, -p.y)
}

/// Pixels per tick (y down) to pixels per second (y up)
pub fn to_world_velocity(v: Vec2) -> Vec2 {
    to_world(v) * TICKS_PER_SECOND
}

pub fn from_world_velocity(v: Vec2) -> Vec2 {
    from_world(v) / TICKS_PER_SECOND
}

// ============================================================================
// Physics Component Bundles
// ============================================================================

pub fn player_physics_bundle(body: &PlayerBody) -> impl Bundle {
    let half = body.half_extents();
    (
        RigidBody::Dynamic,
        Collider::cuboid(half.x, half.y),
        Velocity::linear(to_world_velocity(body.velocity)),
        GravityScale(0.0),
        LockedAxes::ROTATION_LOCKED,
        Friction::coefficient(0.0),
        Ccd::enabled(),
        ActiveEvents::COLLISION_EVENTS,
        CollisionGroups::new(
            PhysicsLayers::PLAYER,
            PhysicsLayers::TERRAIN | PhysicsLayers::SENSOR | PhysicsLayers::PICKUP | PhysicsLayers::NPC,
        ),
    )
}

pub fn terrain_physics_bundle(bounds: &Aabb) -> impl Bundle {
    let half = bounds.half_extents();
    (
        RigidBody::Fixed,
        Collider::cuboid(half.x, half.y),
        Friction::coefficient(0.0),
        CollisionGroups::new(PhysicsLayers::TERRAIN, PhysicsLayers::PLAYER),
    )
}

/// Overlap-only volume reporting contacts with the player
pub fn sensor_bundle(bounds: &Aabb, layer: Group) -> impl Bundle {
    let half = bounds.half_extents();
    (
        RigidBody::Fixed,
        Collider::cuboid(half.x, half.y),
        Sensor,
        ActiveEvents::COLLISION_EVENTS,
        CollisionGroups::new(layer, PhysicsLayers::PLAYER),
    )
}

fn placed(bounds: &Aabb) -> Transform {
    Transform::from_translation(to_world(bounds.center()).extend(0.0))
}

// ============================================================================
// Plugins
// ============================================================================

/// Rapier steps a fixed dt, so a slowed tick is handed over as a slower
/// body and read back at full speed
pub fn unscaled_velocity(v: Vec2, time_scale: f32) -> Vec2 {
    if time_scale > 0.0 {
        v / time_scale
    } else {
        v
    }
}

/// Rapier2D configured for the fixed tick
pub struct CavePhysicsPlugin {
    pub pixels_per_meter: f32,
}

impl Plugin for CavePhysicsPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(RapierPhysicsPlugin::<NoUserData>::pixels_per_meter(self.pixels_per_meter).in_fixed_schedule())
            .insert_resource(Time::<Fixed>::from_seconds(FIXED_STEP_SECS));
    }
}

pub struct EnginePlugin {
    pub config: GameConfig,
    pub assets: AssetCatalog,
}

impl Plugin for EnginePlugin {
    fn build(&self, app: &mut App) {
        let tile_size = self.config.map.tile_size;
        match CaveEngine::new(self.config.clone(), &self.assets) {
            Ok(engine) => {
                app.insert_resource(CaveEngineResource(engine));
            }
            Err(e) => error!("Failed to start cave engine: {}", e),
        }

        app.add_plugins(CavePhysicsPlugin {
            pixels_per_meter: tile_size,
        })
        .add_plugins(LightingPlugin)
        .init_resource::<PlayerContacts>()
        .add_event::<InputEvent>()
        .add_event::<RerollRequest>()
        .add_event::<WindowResized>()
        .configure_sets(
            FixedUpdate,
            (EngineSet::Contacts, EngineSet::Tick, EngineSet::WriteBack).chain(),
        )
        .add_systems(Startup, (spawn_camera, spawn_level))
        .add_systems(
            Update,
            (keyboard_input, apply_input, handle_reroll, handle_resize, follow_camera).chain(),
        )
        .add_systems(FixedUpdate, collect_contacts.in_set(EngineSet::Contacts))
        .add_systems(FixedUpdate, run_engine_tick.in_set(EngineSet::Tick))
        .add_systems(FixedUpdate, write_player_body.in_set(EngineSet::WriteBack))
        .add_systems(FixedPostUpdate, read_player_body.after(PhysicsSet::Writeback));
    }
}

// ============================================================================
// Level spawning
// ============================================================================

fn spawn_camera(mut commands: Commands, cameras: Query<(), With<Camera2d>>) {
    if cameras.is_empty() {
        commands.spawn(Camera2d);
    }
}

fn spawn_level(mut commands: Commands, engine: Option<Res<CaveEngineResource>>) {
    let Some(engine) = engine else {
        return;
    };
    spawn_level_entities(&mut commands, engine.0.layout(), &engine.0.player().body);
}

/// Spawn terrain, sensors, pickups and the player for a layout
pub fn spawn_level_entities(commands: &mut Commands, layout: &MapLayout, player: &PlayerBody) {
    for tile in &layout.colliders {
        commands.spawn((
            LevelEntity,
            TerrainBody {
                tags: BodyTags::default(),
                anchor: tile.solid.center(),
            },
            placed(&tile.solid),
            terrain_physics_bundle(&tile.solid),
        ));
        if let Some(walk) = &tile.walk_sensor {
            commands.spawn((
                LevelEntity,
                TerrainBody {
                    tags: BodyTags::walk_box(),
                    anchor: walk.center(),
                },
                placed(walk),
                sensor_bundle(walk, PhysicsLayers::SENSOR),
            ));
        }
        for ledge in [tile.left_ledge, tile.right_ledge].into_iter().flatten() {
            commands.spawn((
                LevelEntity,
                TerrainBody {
                    tags: BodyTags::edge_box(ledge.is_right),
                    anchor: ledge.corner(),
                },
                placed(&ledge.bounds),
                sensor_bundle(&ledge.bounds, PhysicsLayers::SENSOR),
            ));
        }
    }

    let pickup_half = Vec2::splat(layout.tile_size / 4.0);
    for position in layout.catnip_positions() {
        let bounds = Aabb::from_center(position, pickup_half);
        commands.spawn((
            LevelEntity,
            TerrainBody {
                tags: BodyTags::catnip(),
                anchor: position,
            },
            placed(&bounds),
            sensor_bundle(&bounds, PhysicsLayers::PICKUP),
        ));
    }
    let npc_half = Vec2::splat(layout.tile_size / 3.0);
    for position in layout.npc_positions() {
        let bounds = Aabb::from_center(position, npc_half);
        commands.spawn((
            LevelEntity,
            TerrainBody {
                tags: BodyTags::npc(),
                anchor: position,
            },
            placed(&bounds),
            sensor_bundle(&bounds, PhysicsLayers::NPC),
        ));
    }

    commands.spawn((
        LevelEntity,
        PlayerMarker,
        Transform::from_translation(to_world(player.position).extend(1.0)),
        player_physics_bundle(player),
    ));

    info!(
        colliders = layout.colliders.len(),
        catnip = layout.spawns.catnip.len(),
        "level entities spawned"
    );
}

// ============================================================================
// Input
// ============================================================================

const KEY_BINDINGS: [(KeyCode, Direction); 9] = [
    (KeyCode::ArrowLeft, Direction::Left),
    (KeyCode::KeyA, Direction::Left),
    (KeyCode::ArrowRight, Direction::Right),
    (KeyCode::KeyD, Direction::Right),
    (KeyCode::ArrowUp, Direction::Up),
    (KeyCode::KeyW, Direction::Up),
    (KeyCode::Space, Direction::Up),
    (KeyCode::ArrowDown, Direction::Down),
    (KeyCode::KeyS, Direction::Down),
];

fn keyboard_input(
    keys: Option<Res<ButtonInput<KeyCode>>>,
    mut inputs: EventWriter<InputEvent>,
    mut rerolls: EventWriter<RerollRequest>,
) {
    let Some(keys) = keys else {
        return;
    };
    for (key, direction) in KEY_BINDINGS {
        if keys.just_pressed(key) {
            inputs.send(InputEvent::down(direction));
        }
        if keys.just_released(key) {
            inputs.send(InputEvent::up(direction));
        }
    }
    if keys.just_pressed(KeyCode::KeyR) {
        rerolls.send(RerollRequest);
    }
}

fn apply_input(mut inputs: EventReader<InputEvent>, engine: Option<ResMut<CaveEngineResource>>) {
    let Some(mut engine) = engine else {
        inputs.clear();
        return;
    };
    for event in inputs.read() {
        engine.0.handle_input(*event);
    }
}

fn handle_reroll(
    mut commands: Commands,
    mut requests: EventReader<RerollRequest>,
    engine: Option<ResMut<CaveEngineResource>>,
    level_entities: Query<Entity, With<LevelEntity>>,
    mut contacts: ResMut<PlayerContacts>,
) {
    if requests.read().count() == 0 {
        return;
    }
    let Some(mut engine) = engine else {
        return;
    };
    if let Err(e) = engine.0.reroll() {
        error!("Reroll failed, keeping current level: {}", e);
        return;
    }
    for entity in &level_entities {
        commands.entity(entity).despawn_recursive();
    }
    contacts.0.clear();
    spawn_level_entities(&mut commands, engine.0.layout(), &engine.0.player().body);
}

fn handle_resize(mut resized: EventReader<WindowResized>, engine: Option<ResMut<CaveEngineResource>>) {
    let Some(mut engine) = engine else {
        resized.clear();
        return;
    };
    if let Some(last) = resized.read().last() {
        engine.0.resize(Viewport {
            width: last.width,
            height: last.height,
        });
    }
}

fn follow_camera(engine: Option<ResMut<CaveEngineResource>>, mut cameras: Query<&mut Transform, With<Camera2d>>) {
    let Some(mut engine) = engine else {
        return;
    };
    let position = to_world(engine.0.camera_offset());
    for mut transform in &mut cameras {
        transform.translation.x = position.x;
        transform.translation.y = position.y;
    }
}

// ============================================================================
// Fixed tick
// ============================================================================

fn collect_contacts(
    mut collision_events: EventReader<CollisionEvent>,
    player: Query<Entity, With<PlayerMarker>>,
    bodies: Query<&TerrainBody>,
    mut contacts: ResMut<PlayerContacts>,
) {
    let Ok(player) = player.get_single() else {
        collision_events.clear();
        return;
    };
    for event in collision_events.read() {
        let (e1, e2, started, flags) = match event {
            CollisionEvent::Started(e1, e2, flags) => (*e1, *e2, true, *flags),
            CollisionEvent::Stopped(e1, e2, flags) => (*e1, *e2, false, *flags),
        };
        let other = if e1 == player {
            e2
        } else if e2 == player {
            e1
        } else {
            continue;
        };

        let id: BodyId = other.to_bits();
        if !started {
            contacts.0.end(id);
            continue;
        }
        let Ok(body) = bodies.get(other) else {
            continue;
        };
        contacts.0.begin(ContactPair {
            other: id,
            is_sensor: flags.contains(CollisionEventFlags::SENSOR),
            tags: body.tags,
            anchor: body.anchor,
        });
    }
}

fn run_engine_tick(
    mut commands: Commands,
    engine: Option<ResMut<CaveEngineResource>>,
    mut contacts: ResMut<PlayerContacts>,
) {
    let Some(mut engine) = engine else {
        return;
    };
    let frame = contacts.0.take_frame();
    let outcome = engine.0.fixed_step(&frame);
    for id in outcome.pickups {
        contacts.0.end(id);
        let Ok(entity) = Entity::try_from_bits(id) else {
            continue;
        };
        if let Some(entity_commands) = commands.get_entity(entity) {
            entity_commands.despawn_recursive();
        }
    }
}

fn write_player_body(
    engine: Option<Res<CaveEngineResource>>,
    mut player: Query<(&mut Velocity, &mut RigidBody, &mut Transform), With<PlayerMarker>>,
) {
    let Some(engine) = engine else {
        return;
    };
    let body = &engine.0.player().body;
    let time_scale = engine.0.tick_context().time_scale;
    for (mut velocity, mut rigid_body, mut transform) in &mut player {
        let wanted = match body.mode {
            BodyMode::Dynamic => RigidBody::Dynamic,
            BodyMode::Static => RigidBody::KinematicPositionBased,
        };
        if *rigid_body != wanted {
            *rigid_body = wanted;
        }
        velocity.linvel = if body.is_static() {
            Vec2::ZERO
        } else {
            to_world_velocity(body.velocity * time_scale)
        };

        // climbs and snaps move the body directly
        let target = to_world(body.position);
        if transform.translation.truncate().distance(target) > 0.01 {
            transform.translation.x = target.x;
            transform.translation.y = target.y;
        }
    }
}

fn read_player_body(
    engine: Option<ResMut<CaveEngineResource>>,
    player: Query<(&Velocity, &Transform), With<PlayerMarker>>,
) {
    let Some(mut engine) = engine else {
        return;
    };
    let Ok((velocity, transform)) = player.get_single() else {
        return;
    };
    let time_scale = engine.0.tick_context().time_scale;
    let body = &mut engine.0.player_mut().body;
    body.position = from_world(transform.translation.truncate());
    if !body.is_static() {
        body.velocity = unscaled_velocity(from_world_velocity(velocity.linvel), time_scale);
    }
}
