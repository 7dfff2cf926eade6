//! Contact classification and the per-tick collision dispatcher.
//!
//! The physics backend reports contacts involving the player as
//! [`ContactPair`]s. Aggregates are rebuilt from the active list every tick,
//! so repeated begin events never accumulate state.

use bevy::math::Vec2;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::camera::CameraRig;
use crate::player::{Facing, PlayerBody, PlayerController};
use crate::timer::TickContext;

pub type BodyId = u64;

/// Flags attached to every non-player body when it is registered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BodyTags {
    /// Ledge sensor at a tile's top corner
    pub is_edge_box: bool,
    /// Ledge sensor sits on the right side of its tile
    pub is_right: bool,
    /// Ground sensor above a tile
    pub is_walk_box: bool,
    pub is_catnip: bool,
    pub is_particle: bool,
    pub is_npc: bool,
}

impl BodyTags {
    pub fn edge_box(is_right: bool) -> Self {
        Self {
            is_edge_box: true,
            is_right,
            ..Self::default()
        }
    }

    pub fn walk_box() -> Self {
        Self {
            is_walk_box: true,
            ..Self::default()
        }
    }

    pub fn catnip() -> Self {
        Self {
            is_catnip: true,
            ..Self::default()
        }
    }

    pub fn npc() -> Self {
        Self {
            is_npc: true,
            ..Self::default()
        }
    }

    /// Contacts that take part in ground/wall resolution
    pub fn is_terrain(&self) -> bool {
        !(self.is_catnip || self.is_particle || self.is_npc)
    }
}

/// One contact between the player and another body
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactPair {
    pub other: BodyId,
    pub is_sensor: bool,
    pub tags: BodyTags,
    /// Ledge corner for edge boxes, body centre otherwise
    pub anchor: Vec2,
}

impl ContactPair {
    pub fn solid(other: BodyId, anchor: Vec2) -> Self {
        Self {
            other,
            is_sensor: false,
            tags: BodyTags::default(),
            anchor,
        }
    }

    pub fn sensor(other: BodyId, tags: BodyTags, anchor: Vec2) -> Self {
        Self {
            other,
            is_sensor: true,
            tags,
            anchor,
        }
    }
}

/// Contacts for one fixed tick
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContactFrame {
    pub begun: Vec<ContactPair>,
    pub active: Vec<ContactPair>,
    pub ended: Vec<ContactPair>,
}

impl ContactFrame {
    pub fn with_active(active: Vec<ContactPair>) -> Self {
        Self {
            active,
            ..Self::default()
        }
    }
}

/// Turns begin/end events into an active contact list
#[derive(Debug, Clone, Default)]
pub struct ContactTracker {
    active: Vec<ContactPair>,
    begun: Vec<ContactPair>,
    ended: Vec<ContactPair>,
}

impl ContactTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self, pair: ContactPair) {
        match self.active.iter_mut().find(|p| p.other == pair.other) {
            Some(existing) => *existing = pair,
            None => self.active.push(pair),
        }
        self.begun.push(pair);
    }

    pub fn end(&mut self, other: BodyId) {
        if let Some(index) = self.active.iter().position(|p| p.other == other) {
            let pair = self.active.remove(index);
            self.ended.push(pair);
        }
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn clear(&mut self) {
        self.active.clear();
        self.begun.clear();
        self.ended.clear();
    }

    /// Drain begin/end events and snapshot the active list
    pub fn take_frame(&mut self) -> ContactFrame {
        ContactFrame {
            begun: std::mem::take(&mut self.begun),
            active: self.active.clone(),
            ended: std::mem::take(&mut self.ended),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DispatchOutcome {
    pub ledge_grabbed: bool,
    pub landed: bool,
    pub started_slide: bool,
    /// Catnip bodies touched this tick; the caller removes them
    pub pickups: Vec<BodyId>,
    pub trauma_added: f32,
    pub in_walk_box: bool,
    pub rigid_contacts: usize,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CollisionDispatcher;

impl CollisionDispatcher {
    pub fn new() -> Self {
        Self
    }

    pub fn dispatch(
        &self,
        frame: &ContactFrame,
        player: &mut PlayerController,
        camera: &mut CameraRig,
        ctx: &TickContext,
    ) -> DispatchOutcome {
        let mut outcome = DispatchOutcome::default();

        for pair in frame.ended.iter().filter(|p| p.tags.is_terrain()) {
            player.on_contact_end(!pair.is_sensor, ctx);
        }

        for pair in &frame.begun {
            if pair.tags.is_catnip && !outcome.pickups.contains(&pair.other) {
                outcome.pickups.push(pair.other);
                camera.catnip.trigger(ctx.now);
                debug!(body = pair.other, "catnip pickup");
            } else if pair.tags.is_npc && !player.in_knockback() {
                player.apply_knockback(pair.anchor, ctx, camera);
            }
        }

        if player.is_hanging() {
            return outcome;
        }

        let mut wall_anchor = None;
        for pair in frame.active.iter().filter(|p| p.tags.is_terrain()) {
            if pair.tags.is_edge_box {
                if !player.is_grounded() && player.ledge_matches(pair.tags.is_right) {
                    player.grab_ledge(pair.anchor, ctx, camera);
                    outcome.ledge_grabbed = true;
                    debug!(corner = ?pair.anchor, "ledge grabbed");
                    return outcome;
                }
            } else if pair.tags.is_walk_box {
                outcome.in_walk_box = true;
            } else if !pair.is_sensor {
                outcome.rigid_contacts += 1;
                if wall_anchor.is_none() && is_beside(&player.body, pair.anchor) {
                    wall_anchor = Some(pair.anchor);
                }
            }
        }

        let rigid = outcome.rigid_contacts;
        // contacts are one physics step old, so a body that just jumped still touches the floor
        let descending = player.body.velocity.y >= 0.0;
        let qualifies =
            outcome.in_walk_box && descending && ((rigid > 0 && !player.is_sliding()) || rigid >= 2);

        if qualifies && !player.is_grounded() {
            outcome.trauma_added = player.land(camera);
            outcome.landed = true;
        } else if player.is_grounded() {
            if outcome.in_walk_box || rigid > 0 {
                player.hold_ground();
            } else {
                player.start_late_jump(ctx);
            }
        } else if player.is_airborne() {
            if let Some(anchor) = wall_anchor {
                if !outcome.in_walk_box && player.body.velocity.y >= 0.0 {
                    let side = if anchor.x >= player.body.position.x {
                        Facing::Right
                    } else {
                        Facing::Left
                    };
                    player.start_slide(side);
                    outcome.started_slide = true;
                }
            }
        } else if player.is_sliding() {
            if rigid > 0 {
                player.hold_ground();
            } else {
                player.start_late_jump(ctx);
            }
        }

        outcome
    }
}

/// True when a solid's centre sits further out to the side of the body than
/// above or below it. Ceilings and floors touched without a walk box fail.
fn is_beside(body: &PlayerBody, anchor: Vec2) -> bool {
    let half = body.half_extents();
    let offset = (anchor - body.position).abs();
    offset.x - half.x > offset.y - half.y
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::{Direction, InputEvent, PlayerTuning};

    fn airborne_player() -> (PlayerController, CameraRig) {
        let player = PlayerController::new(PlayerTuning::default(), Vec2::new(100.0, 100.0));
        (player, CameraRig::default())
    }

    fn ctx() -> TickContext {
        TickContext::new(1.0, 60)
    }

    fn walk_box(id: BodyId) -> ContactPair {
        ContactPair::sensor(id, BodyTags::walk_box(), Vec2::new(100.0, 114.0))
    }

    fn floor(id: BodyId) -> ContactPair {
        ContactPair::solid(id, Vec2::new(100.0, 130.0))
    }

    #[test]
    fn test_tracker_replaces_duplicate_begin() {
        let mut tracker = ContactTracker::new();
        tracker.begin(floor(1));
        tracker.begin(floor(1));
        assert_eq!(tracker.active_count(), 1);
        let frame = tracker.take_frame();
        assert_eq!(frame.begun.len(), 2);

        tracker.end(1);
        tracker.end(1);
        let frame = tracker.take_frame();
        assert_eq!(frame.ended.len(), 1);
        assert!(frame.active.is_empty());
    }

    #[test]
    fn test_landing_requires_walk_box() {
        let (mut player, mut camera) = airborne_player();
        player.body.velocity.y = 15.0;

        let frame = ContactFrame::with_active(vec![walk_box(2)]);
        let outcome = CollisionDispatcher.dispatch(&frame, &mut player, &mut camera, &ctx());
        assert!(!outcome.landed);
        assert!(player.is_airborne());

        let frame = ContactFrame::with_active(vec![floor(1), walk_box(2)]);
        let outcome = CollisionDispatcher.dispatch(&frame, &mut player, &mut camera, &ctx());
        assert!(outcome.landed);
        assert!((outcome.trauma_added - 0.75).abs() < 1e-6);
        assert!(player.is_grounded());
    }

    #[test]
    fn test_sliding_player_needs_two_rigid_contacts_to_land() {
        let (mut player, mut camera) = airborne_player();
        player.start_slide(Facing::Right);

        let frame = ContactFrame::with_active(vec![floor(1), walk_box(2)]);
        let outcome = CollisionDispatcher.dispatch(&frame, &mut player, &mut camera, &ctx());
        assert!(!outcome.landed);
        assert!(player.is_sliding());

        let frame = ContactFrame::with_active(vec![floor(1), floor(3), walk_box(2)]);
        let outcome = CollisionDispatcher.dispatch(&frame, &mut player, &mut camera, &ctx());
        assert!(outcome.landed);
    }

    #[test]
    fn test_falling_wall_contact_starts_slide() {
        let (mut player, mut camera) = airborne_player();
        player.body.velocity.y = 3.0;
        let wall = ContactPair::solid(7, Vec2::new(116.0, 100.0));
        let outcome = CollisionDispatcher.dispatch(
            &ContactFrame::with_active(vec![wall]),
            &mut player,
            &mut camera,
            &ctx(),
        );
        assert!(outcome.started_slide);
        assert_eq!(player.wall_side(), Some(Facing::Right));
    }

    #[test]
    fn test_ceiling_bump_does_not_slide() {
        let (mut player, mut camera) = airborne_player();
        player.body.velocity.y = 0.5;
        // tile above the head, slightly off centre
        let ceiling = ContactPair::solid(8, Vec2::new(108.0, 70.0));
        let outcome = CollisionDispatcher.dispatch(
            &ContactFrame::with_active(vec![ceiling]),
            &mut player,
            &mut camera,
            &ctx(),
        );
        assert_eq!(outcome.rigid_contacts, 1);
        assert!(!outcome.started_slide);
        assert!(player.is_airborne());

        let wall = ContactPair::solid(7, Vec2::new(74.0, 108.0));
        let outcome = CollisionDispatcher.dispatch(
            &ContactFrame::with_active(vec![ceiling, wall]),
            &mut player,
            &mut camera,
            &ctx(),
        );
        assert!(outcome.started_slide);
        assert_eq!(player.wall_side(), Some(Facing::Left));
    }

    #[test]
    fn test_rising_wall_contact_does_not_slide() {
        let (mut player, mut camera) = airborne_player();
        player.body.velocity.y = -8.0;
        let wall = ContactPair::solid(7, Vec2::new(84.0, 100.0));
        let outcome = CollisionDispatcher.dispatch(
            &ContactFrame::with_active(vec![wall]),
            &mut player,
            &mut camera,
            &ctx(),
        );
        assert!(!outcome.started_slide);
        assert!(player.is_airborne());
    }

    #[test]
    fn test_ledge_capture_short_circuits() {
        let (mut player, mut camera) = airborne_player();
        player.handle_input(InputEvent::down(Direction::Right), &ctx(), &mut camera);
        player.body.velocity.y = 15.0;

        let ledge = ContactPair::sensor(9, BodyTags::edge_box(false), Vec2::new(112.0, 96.0));
        let frame = ContactFrame::with_active(vec![ledge, floor(1), walk_box(2)]);
        let outcome = CollisionDispatcher.dispatch(&frame, &mut player, &mut camera, &ctx());

        assert!(outcome.ledge_grabbed);
        assert!(!outcome.landed);
        assert_eq!(outcome.rigid_contacts, 0);
        assert!(player.is_hanging());
        assert_eq!(camera.trauma, 0.0);
    }

    #[test]
    fn test_ledge_on_wrong_side_falls_through_to_slide() {
        let (mut player, mut camera) = airborne_player();
        player.handle_input(InputEvent::down(Direction::Right), &ctx(), &mut camera);
        player.body.velocity.y = 2.0;

        let ledge = ContactPair::sensor(9, BodyTags::edge_box(true), Vec2::new(112.0, 96.0));
        let wall = ContactPair::solid(4, Vec2::new(120.0, 110.0));
        let frame = ContactFrame::with_active(vec![ledge, wall]);
        let outcome = CollisionDispatcher.dispatch(&frame, &mut player, &mut camera, &ctx());

        assert!(!outcome.ledge_grabbed);
        assert!(outcome.started_slide);
        assert!(player.is_sliding());
    }

    #[test]
    fn test_hanging_player_skips_contact_processing() {
        let (mut player, mut camera) = airborne_player();
        player.handle_input(InputEvent::down(Direction::Left), &ctx(), &mut camera);
        player.grab_ledge(Vec2::new(90.0, 90.0), &ctx(), &mut camera);

        let frame = ContactFrame::with_active(vec![floor(1), walk_box(2)]);
        let outcome = CollisionDispatcher.dispatch(&frame, &mut player, &mut camera, &ctx());
        assert!(!outcome.landed);
        assert!(player.is_hanging());
    }

    #[test]
    fn test_contact_end_starts_late_jump() {
        let (mut player, mut camera) = airborne_player();
        player.land(&mut camera);
        let frame = ContactFrame {
            ended: vec![walk_box(2)],
            ..ContactFrame::default()
        };
        CollisionDispatcher.dispatch(&frame, &mut player, &mut camera, &ctx());
        assert!(player.late_jump_pending());
        assert!(player.is_grounded());
    }

    #[test]
    fn test_catnip_is_collected_once() {
        let (mut player, mut camera) = airborne_player();
        let catnip = ContactPair::sensor(5, BodyTags::catnip(), Vec2::new(100.0, 100.0));
        let frame = ContactFrame {
            begun: vec![catnip, catnip],
            active: vec![catnip],
            ended: Vec::new(),
        };
        let outcome = CollisionDispatcher.dispatch(&frame, &mut player, &mut camera, &ctx());
        assert_eq!(outcome.pickups, vec![5]);
        assert!(camera.catnip.is_active());
        assert_eq!(outcome.rigid_contacts, 0);
    }

    #[test]
    fn test_npc_contact_knocks_back() {
        let (mut player, mut camera) = airborne_player();
        let npc = ContactPair::sensor(11, BodyTags::npc(), Vec2::new(80.0, 100.0));
        let frame = ContactFrame {
            begun: vec![npc],
            active: vec![npc],
            ended: Vec::new(),
        };
        CollisionDispatcher.dispatch(&frame, &mut player, &mut camera, &ctx());
        assert!(player.in_knockback());
        assert_eq!(player.x_vel(), 6.0);
    }
}
