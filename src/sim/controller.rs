//! Character controller
//!
//! Integrates one tick of platformer movement and resolves it against static
//! geometry. `step` is a pure function of the previous state, the frame input,
//! the tick number and the geometry, which is what lets a replay reproduce a
//! recorded run exactly.

use glam::Vec2;

use super::collision::{Aabb, StaticGeometry};
use super::input::FrameInput;
use super::state::PlayerState;
use crate::config::{ControllerConfig, SimConfig};
use crate::{move_towards, ticks_for};

/// Moves shorter than this are treated as no move at all
const SWEEP_EPSILON: f32 = 1e-5;

/// A row of parallel probe points along one side of the box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbeLine {
    pub start: Vec2,
    pub end: Vec2,
    /// Unit direction the probes point in
    pub dir: Vec2,
}

impl ProbeLine {
    /// `count` points evenly spaced from `start` to `end`
    pub fn points(&self, count: u32) -> impl Iterator<Item = Vec2> + '_ {
        let last = (count.max(2) - 1) as f32;
        (0..count).map(move |i| self.start.lerp(self.end, i as f32 / last))
    }
}

/// Which sides of the box have geometry within probe reach
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Contacts {
    pub down: bool,
    pub up: bool,
    pub left: bool,
    pub right: bool,
}

#[derive(Debug, Clone)]
pub struct CharacterController {
    config: ControllerConfig,
    dt: f32,
    coyote_ticks: u32,
    jump_buffer_ticks: u32,
}

impl CharacterController {
    pub fn new(config: ControllerConfig, tick_duration: f32) -> Self {
        let coyote_ticks = ticks_for(config.coyote_time, tick_duration);
        let jump_buffer_ticks = ticks_for(config.jump_buffer, tick_duration);
        Self {
            config,
            dt: tick_duration,
            coyote_ticks,
            jump_buffer_ticks,
        }
    }

    pub fn from_sim_config(config: &SimConfig) -> Self {
        Self::new(config.controller.clone(), config.tick_duration)
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn coyote_ticks(&self) -> u32 {
        self.coyote_ticks
    }

    pub fn jump_buffer_ticks(&self) -> u32 {
        self.jump_buffer_ticks
    }

    /// Collision box of `player`
    #[inline]
    pub fn bounds(&self, player: &PlayerState) -> Aabb {
        Aabb::new(player.position + self.config.offset, self.config.size)
    }

    /// Probe rows for each side in down, up, left, right order
    pub fn probe_lines(&self, bounds: &Aabb) -> [ProbeLine; 4] {
        let min = bounds.min();
        let max = bounds.max();
        let inset = self.config.ray_buffer;
        [
            ProbeLine {
                start: Vec2::new(min.x + inset, min.y),
                end: Vec2::new(max.x - inset, min.y),
                dir: Vec2::NEG_Y,
            },
            ProbeLine {
                start: Vec2::new(min.x + inset, max.y),
                end: Vec2::new(max.x - inset, max.y),
                dir: Vec2::Y,
            },
            ProbeLine {
                start: Vec2::new(min.x, min.y + inset),
                end: Vec2::new(min.x, max.y - inset),
                dir: Vec2::NEG_X,
            },
            ProbeLine {
                start: Vec2::new(max.x, min.y + inset),
                end: Vec2::new(max.x, max.y - inset),
                dir: Vec2::X,
            },
        ]
    }

    /// Probe all four sides of `bounds`
    pub fn contacts<G: StaticGeometry + ?Sized>(&self, bounds: &Aabb, geometry: &G) -> Contacts {
        let reach = self.config.detection_ray_length;
        let count = self.config.detector_count;
        let hit = |line: &ProbeLine| {
            line.points(count)
                .any(|point| geometry.probe(point, line.dir, reach))
        };
        let [down, up, left, right] = self.probe_lines(bounds);
        Contacts {
            down: hit(&down),
            up: hit(&up),
            left: hit(&left),
            right: hit(&right),
        }
    }

    /// Advance `player` by one tick
    pub fn step<G: StaticGeometry + ?Sized>(
        &self,
        player: &PlayerState,
        input: FrameInput,
        tick: u32,
        geometry: &G,
    ) -> PlayerState {
        let cfg = &self.config;
        let dt = self.dt;
        let mut next = *player;

        // Jump request latch (buffer source)
        if input.jump_pressed() {
            next.last_jump_tick = Some(tick);
        }

        match input.move_axis() {
            m if m > 0 => next.facing_right = true,
            m if m < 0 => next.facing_right = false,
            _ => {}
        }

        let contacts = self.contacts(&self.bounds(player), geometry);

        // Ground transitions
        next.landing = false;
        if player.grounded && !contacts.down {
            next.last_ground_tick = Some(tick);
        } else if !player.grounded && contacts.down {
            next.coyote_usable = true;
            next.landing = true;
        }
        next.grounded = contacts.down;

        // Horizontal
        let axis = input.move_axis() as f32;
        if axis != 0.0 {
            next.velocity.x = (next.velocity.x + axis * cfg.acceleration * dt)
                .clamp(-cfg.move_speed, cfg.move_speed);
        } else {
            next.velocity.x = move_towards(next.velocity.x, 0.0, cfg.deceleration * dt);
        }
        if (next.velocity.x > 0.0 && contacts.right) || (next.velocity.x < 0.0 && contacts.left) {
            next.velocity.x = 0.0;
        }

        // Vertical
        if contacts.down {
            next.velocity.y = next.velocity.y.max(0.0);
        } else {
            next.velocity.y += cfg.gravity * dt;
        }
        if contacts.up && next.velocity.y > 0.0 {
            next.velocity.y = 0.0;
        }

        // Jump
        let coyote_jump = next.coyote_usable
            && !contacts.down
            && next
                .last_ground_tick
                .is_some_and(|left_at| left_at.saturating_add(self.coyote_ticks) > tick);
        let buffered_jump = contacts.down
            && next
                .last_jump_tick
                .is_some_and(|pressed_at| pressed_at.saturating_add(self.jump_buffer_ticks) > tick);
        if (input.jump_pressed() && coyote_jump) || buffered_jump {
            next.velocity.y = cfg.jump_velocity;
            next.coyote_usable = false;
            next.last_ground_tick = None;
            next.last_jump_tick = None;
            next.jumping = true;
        } else {
            next.jumping = false;
        }

        let start = player.position + cfg.offset;
        let resolved = self.sweep(start, &mut next.velocity, geometry);
        next.position = resolved - cfg.offset;
        next
    }

    /// Move the box from `start` by one tick of `velocity`, stopping at
    /// geometry. Blocked axes have their velocity zeroed. Only free positions
    /// are ever committed, so a box that starts clear ends clear.
    fn sweep<G: StaticGeometry + ?Sized>(
        &self,
        start: Vec2,
        velocity: &mut Vec2,
        geometry: &G,
    ) -> Vec2 {
        let size = self.config.size;
        let delta = *velocity * self.dt;
        let target = start + delta;

        if !geometry.overlaps(target, size) {
            return target;
        }

        let distance = delta.length();
        if distance <= SWEEP_EPSILON {
            return start;
        }

        let iterations = self.config.collision_iterations.max(1);
        let mut pos = start;
        for i in 1..=iterations {
            let t = i as f32 / iterations as f32;
            let candidate = start.lerp(target, t);

            if !geometry.overlaps(candidate, size) {
                pos = candidate;
                continue;
            }

            if i == 1 {
                // Clipped a corner or ledge straight away: back off along
                // the travel line by the distance still to go
                if velocity.y < 0.0 {
                    velocity.y = 0.0;
                }
                let nudged =
                    candidate + (start - target).normalize_or_zero() * distance * (1.0 - t);
                if !geometry.overlaps(nudged, size) {
                    pos = nudged;
                }
                continue;
            }

            let mut next = pos;
            if geometry.overlaps(Vec2::new(pos.x, candidate.y), size) {
                velocity.y = 0.0;
            } else {
                next.y = candidate.y;
            }
            if geometry.overlaps(Vec2::new(candidate.x, pos.y), size) {
                velocity.x = 0.0;
            } else {
                next.x = candidate.x;
            }
            // Each axis clears alone but not together: keep the vertical part
            if next.x != pos.x && next.y != pos.y && geometry.overlaps(next, size) {
                next.x = pos.x;
                velocity.x = 0.0;
            }
            pos = next;
        }
        pos
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::collision::LevelGeometry;
    use crate::sim::input::InputState;
    use proptest::prelude::*;

    const DT: f32 = 1.0 / 50.0;

    fn controller() -> CharacterController {
        CharacterController::new(ControllerConfig::default(), DT)
    }

    /// Floor with its top at y = 0
    fn flat_level() -> LevelGeometry {
        let mut geometry = LevelGeometry::new();
        geometry.add_solid(Aabb::from_min_max(Vec2::new(-50.0, -1.0), Vec2::new(50.0, 0.0)));
        geometry
    }

    fn idle() -> FrameInput {
        FrameInput::default()
    }

    fn press_jump() -> FrameInput {
        FrameInput::new(InputState::IDLE, InputState::jumping())
    }

    fn hold_move(move_x: i8) -> FrameInput {
        let state = InputState::moving(move_x);
        FrameInput::new(state, state)
    }

    fn airborne_at(position: Vec2) -> PlayerState {
        PlayerState {
            grounded: false,
            ..PlayerState::spawn(position, true)
        }
    }

    #[test]
    fn test_grace_windows_in_ticks() {
        let c = controller();
        assert_eq!(c.coyote_ticks(), 5);
        assert_eq!(c.jump_buffer_ticks(), 5);
    }

    #[test]
    fn test_probe_points_span_side() {
        let line = ProbeLine {
            start: Vec2::new(0.0, 0.0),
            end: Vec2::new(1.0, 0.0),
            dir: Vec2::NEG_Y,
        };
        let points: Vec<Vec2> = line.points(3).collect();
        assert_eq!(points, vec![Vec2::ZERO, Vec2::new(0.5, 0.0), Vec2::X]);
    }

    #[test]
    fn test_contacts_standing_on_floor() {
        let c = controller();
        let geometry = flat_level();
        let player = PlayerState::spawn(Vec2::new(0.0, 0.5), true);
        let contacts = c.contacts(&c.bounds(&player), &geometry);
        assert!(contacts.down);
        assert!(!contacts.up);
        assert!(!contacts.left);
        assert!(!contacts.right);
    }

    #[test]
    fn test_standing_still_is_stable() {
        let c = controller();
        let geometry = flat_level();
        let mut player = PlayerState::spawn(Vec2::new(0.0, 0.5), true);
        for tick in 0..100 {
            player = c.step(&player, idle(), tick, &geometry);
        }
        assert_eq!(player.position, Vec2::new(0.0, 0.5));
        assert!(player.grounded);
    }

    #[test]
    fn test_gravity_when_airborne() {
        let c = controller();
        let geometry = LevelGeometry::new();
        let player = c.step(&airborne_at(Vec2::new(0.0, 10.0)), idle(), 0, &geometry);
        assert!((player.velocity.y - (-1.2)).abs() < 1e-5);
        assert!(player.position.y < 10.0);
    }

    #[test]
    fn test_horizontal_speed_caps_and_decays() {
        let c = controller();
        let geometry = flat_level();
        let mut player = PlayerState::spawn(Vec2::new(0.0, 0.5), true);

        for tick in 0..20 {
            player = c.step(&player, hold_move(1), tick, &geometry);
        }
        assert_eq!(player.velocity.x, 13.0);
        assert!(player.facing_right);

        for tick in 20..28 {
            player = c.step(&player, idle(), tick, &geometry);
        }
        assert_eq!(player.velocity.x, 0.0);

        player = c.step(&player, hold_move(-1), 28, &geometry);
        assert!(!player.facing_right);
        assert!(player.velocity.x < 0.0);
    }

    #[test]
    fn test_grounded_jump() {
        let c = controller();
        let geometry = flat_level();
        let player = PlayerState::spawn(Vec2::new(0.0, 0.5), true);

        let player = c.step(&player, press_jump(), 3, &geometry);
        assert!(player.jumping);
        assert_eq!(player.velocity.y, 20.0);
        assert!(player.position.y > 0.5);
        assert_eq!(player.last_jump_tick, None);
        assert_eq!(player.last_ground_tick, None);

        // Holding jump does not re-trigger
        let held = FrameInput::new(InputState::jumping(), InputState::jumping());
        let player = c.step(&player, held, 4, &geometry);
        assert!(!player.jumping);
    }

    /// Press jump at `t` while airborne, land exactly at `t + k`
    fn buffered_jump_after(k: u32) -> PlayerState {
        let c = controller();
        let geometry = flat_level();
        let t = 10;

        let mut player = c.step(&airborne_at(Vec2::new(0.0, 8.0)), press_jump(), t, &geometry);
        assert!(!player.jumping);
        assert_eq!(player.last_jump_tick, Some(t));

        for tick in t + 1..t + k {
            player = c.step(&player, idle(), tick, &geometry);
            assert!(!player.grounded);
        }

        // Put the box right on the floor for the landing tick
        player.position = Vec2::new(0.0, 0.5);
        c.step(&player, idle(), t + k, &geometry)
    }

    #[test]
    fn test_jump_buffer_within_window() {
        for k in 1..5 {
            let player = buffered_jump_after(k);
            assert!(player.landing, "k = {k}");
            assert!(player.jumping, "k = {k}");
            assert_eq!(player.velocity.y, 20.0);
        }
    }

    #[test]
    fn test_jump_buffer_expires() {
        for k in [5, 6, 12] {
            let player = buffered_jump_after(k);
            assert!(player.landing, "k = {k}");
            assert!(!player.jumping, "k = {k}");
            assert_eq!(player.velocity.y, 0.0);
        }
    }

    /// Leave the ground at `t`, press jump at `t + k`
    fn coyote_jump_after(k: u32) -> PlayerState {
        let c = controller();
        // Nothing underneath: the first step walks off the ledge
        let geometry = LevelGeometry::new();
        let t = 20;
        let mut player = PlayerState {
            coyote_usable: true,
            ..PlayerState::spawn(Vec2::new(0.0, 0.5), true)
        };

        player = c.step(&player, idle(), t, &geometry);
        assert!(!player.grounded);
        assert_eq!(player.last_ground_tick, Some(t));

        for tick in t + 1..t + k {
            player = c.step(&player, idle(), tick, &geometry);
        }
        c.step(&player, press_jump(), t + k, &geometry)
    }

    #[test]
    fn test_coyote_jump_within_window() {
        for k in 1..5 {
            let player = coyote_jump_after(k);
            assert!(player.jumping, "k = {k}");
            assert!(!player.coyote_usable);
            assert_eq!(player.velocity.y, 20.0);
        }
    }

    #[test]
    fn test_coyote_jump_expires() {
        for k in [5, 6, 20] {
            let player = coyote_jump_after(k);
            assert!(!player.jumping, "k = {k}");
            assert!(player.velocity.y < 0.0);
        }
    }

    #[test]
    fn test_no_coyote_without_landing() {
        let c = controller();
        let geometry = LevelGeometry::new();
        // Spawned standing, never landed
        let player = PlayerState::spawn(Vec2::new(0.0, 0.5), true);
        let player = c.step(&player, idle(), 0, &geometry);
        let player = c.step(&player, press_jump(), 1, &geometry);
        assert!(!player.jumping);
    }

    #[test]
    fn test_landing_flag_lasts_one_tick() {
        let c = controller();
        let geometry = flat_level();
        let mut player = airborne_at(Vec2::new(0.0, 3.0));
        let mut landed_at = None;

        for tick in 0..200 {
            player = c.step(&player, idle(), tick, &geometry);
            if player.landing {
                assert!(landed_at.is_none(), "landed twice");
                landed_at = Some(tick);
            }
        }
        assert!(landed_at.is_some());
        assert!(player.grounded);
        assert!(player.coyote_usable);
        assert!(!geometry.overlaps(c.bounds(&player).center, c.bounds(&player).size));
    }

    #[test]
    fn test_wall_stops_movement() {
        let c = controller();
        let mut geometry = flat_level();
        geometry.add_solid(Aabb::from_min_max(Vec2::new(3.0, 0.0), Vec2::new(4.0, 5.0)));
        let mut player = PlayerState::spawn(Vec2::new(0.0, 0.5), true);

        for tick in 0..100 {
            player = c.step(&player, hold_move(1), tick, &geometry);
            let bounds = c.bounds(&player);
            assert!(bounds.max().x <= 3.0);
            assert!(!geometry.overlaps(bounds.center, bounds.size));
        }
        assert_eq!(player.velocity.x, 0.0);
        assert!(player.position.x > 2.3);
    }

    #[test]
    fn test_ceiling_stops_jump() {
        let c = controller();
        let mut geometry = flat_level();
        geometry.add_solid(Aabb::from_min_max(Vec2::new(-5.0, 2.0), Vec2::new(5.0, 3.0)));
        let mut player = c.step(
            &PlayerState::spawn(Vec2::new(0.0, 0.5), true),
            press_jump(),
            0,
            &geometry,
        );
        assert!(player.jumping);

        for tick in 1..30 {
            player = c.step(&player, idle(), tick, &geometry);
            assert!(c.bounds(&player).max().y <= 2.0);
        }
    }

    fn arena() -> LevelGeometry {
        let mut geometry = flat_level();
        // Walls
        geometry.add_solid(Aabb::from_min_max(Vec2::new(-8.0, 0.0), Vec2::new(-7.0, 20.0)));
        geometry.add_solid(Aabb::from_min_max(Vec2::new(7.0, 0.0), Vec2::new(8.0, 20.0)));
        // Ceiling and ledges
        geometry.add_solid(Aabb::from_min_max(Vec2::new(-8.0, 20.0), Vec2::new(8.0, 21.0)));
        geometry.add_solid(Aabb::from_min_max(Vec2::new(2.0, 2.0), Vec2::new(4.0, 2.5)));
        geometry.add_solid(Aabb::from_min_max(Vec2::new(-4.0, 3.5), Vec2::new(-1.5, 4.0)));
        geometry.add_solid(Aabb::from_min_max(Vec2::new(-0.5, 1.2), Vec2::new(0.5, 1.4)));
        geometry
    }

    proptest! {
        #[test]
        fn prop_box_never_penetrates_geometry(
            inputs in prop::collection::vec((-1i8..=1, any::<bool>()), 1..300)
        ) {
            let c = controller();
            let geometry = arena();
            let mut player = PlayerState::spawn(Vec2::new(-3.0, 0.5), true);
            let mut previous = InputState::IDLE;

            for (tick, (move_x, jump)) in inputs.into_iter().enumerate() {
                let current = InputState::new(move_x, jump);
                player = c.step(&player, FrameInput::new(previous, current), tick as u32, &geometry);
                previous = current;

                let bounds = c.bounds(&player);
                prop_assert!(!geometry.overlaps(bounds.center, bounds.size),
                    "overlap at tick {} with {:?}", tick, bounds);
            }
        }
    }
}
