//! World event bus
//!
//! Gameplay objects (doors, hazards, checkpoints) subscribe to the simulation
//! and are notified synchronously, in subscription order, at fixed points of
//! every tick. They never touch simulation state directly: level-wide
//! outcomes go through `WorldContext` as commands the simulation applies
//! after the phase, and the only shared thing they may change is whether
//! their own solids are enabled.

use glam::Vec2;

use super::collision::{Aabb, LevelGeometry, SolidId};
use super::state::{LoopState, PlayerState};

/// Notification points, in per-tick order for the step phases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorldPhase {
    /// World snapped back to tick 0
    Reset,
    /// A recording or replaying segment begins
    WorldStart,
    /// Before the character moves
    PreStep,
    /// After the character moved; geometry-dependent logic runs here
    WorldStep,
    /// End of tick, before the counter increments
    PostStep,
}

/// Subscriber to world notifications; every hook defaults to nothing
pub trait WorldListener {
    /// Restore own state to its saved baseline
    fn on_reset(&mut self, _ctx: &mut WorldContext<'_>) {}

    fn on_world_start(&mut self, _ctx: &mut WorldContext<'_>) {}

    fn pre_step(&mut self, _ctx: &mut WorldContext<'_>) {}

    fn world_step(&mut self, _ctx: &mut WorldContext<'_>) {}

    fn post_step(&mut self, _ctx: &mut WorldContext<'_>) {}
}

/// Level outcome requested by a subscriber
#[derive(Debug, Clone, PartialEq)]
pub enum WorldCommand {
    Die,
    Finish(String),
    Checkpoint { progress: u32, camera_target: Vec2 },
}

/// What a subscriber can see and do during a notification
pub struct WorldContext<'a> {
    tick: u32,
    loop_state: LoopState,
    checkpoint_progress: u32,
    player: &'a PlayerState,
    player_bounds: Aabb,
    geometry: &'a mut LevelGeometry,
    commands: &'a mut Vec<WorldCommand>,
}

impl<'a> WorldContext<'a> {
    pub fn new(
        tick: u32,
        loop_state: LoopState,
        checkpoint_progress: u32,
        player: &'a PlayerState,
        player_bounds: Aabb,
        geometry: &'a mut LevelGeometry,
        commands: &'a mut Vec<WorldCommand>,
    ) -> Self {
        Self {
            tick,
            loop_state,
            checkpoint_progress,
            player,
            player_bounds,
            geometry,
            commands,
        }
    }

    #[inline]
    pub fn tick(&self) -> u32 {
        self.tick
    }

    #[inline]
    pub fn loop_state(&self) -> LoopState {
        self.loop_state
    }

    /// Highest checkpoint committed so far (0 = none)
    #[inline]
    pub fn checkpoint_progress(&self) -> u32 {
        self.checkpoint_progress
    }

    #[inline]
    pub fn player(&self) -> &PlayerState {
        self.player
    }

    /// Character collision box at this point of the tick
    #[inline]
    pub fn player_bounds(&self) -> Aabb {
        self.player_bounds
    }

    pub fn geometry(&self) -> &LevelGeometry {
        &*self.geometry
    }

    /// Enable or disable one of the subscriber's own solids
    pub fn set_solid_enabled(&mut self, id: SolidId, enabled: bool) {
        self.geometry.set_enabled(id, enabled);
    }

    pub fn die(&mut self) {
        self.commands.push(WorldCommand::Die);
    }

    pub fn finish(&mut self, destination: impl Into<String>) {
        self.commands.push(WorldCommand::Finish(destination.into()));
    }

    pub fn checkpoint(&mut self, progress: u32, camera_target: Vec2) {
        self.commands.push(WorldCommand::Checkpoint {
            progress,
            camera_target,
        });
    }
}

/// Handle returned by `EventBus::subscribe`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

/// Ordered observer registry
#[derive(Default)]
pub struct EventBus {
    next_id: u64,
    subscribers: Vec<(SubscriberId, Box<dyn WorldListener>)>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a subscriber; it is notified after all earlier ones
    pub fn subscribe(&mut self, listener: Box<dyn WorldListener>) -> SubscriberId {
        let id = SubscriberId(self.next_id);
        self.next_id += 1;
        self.subscribers.push((id, listener));
        id
    }

    /// Remove a subscriber and hand it back; unknown ids return `None`
    pub fn unsubscribe(&mut self, id: SubscriberId) -> Option<Box<dyn WorldListener>> {
        let index = self.subscribers.iter().position(|(sid, _)| *sid == id)?;
        Some(self.subscribers.remove(index).1)
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    /// Notify every subscriber of `phase`, in subscription order
    pub fn dispatch(&mut self, phase: WorldPhase, ctx: &mut WorldContext<'_>) {
        for (_, listener) in self.subscribers.iter_mut() {
            match phase {
                WorldPhase::Reset => listener.on_reset(ctx),
                WorldPhase::WorldStart => listener.on_world_start(ctx),
                WorldPhase::PreStep => listener.pre_step(ctx),
                WorldPhase::WorldStep => listener.world_step(ctx),
                WorldPhase::PostStep => listener.post_step(ctx),
            }
        }
    }
}

/// Notification for the presentation layer (audio, captions, camera,
/// animation). Queued by the simulation and drained by the host; nothing
/// here feeds back into the simulation.
#[derive(Debug, Clone, PartialEq)]
pub enum SimEvent {
    StateChanged { from: LoopState, to: LoopState },
    /// World rewound; the camera should return to `camera_target`
    WorldReset { camera_target: Vec2 },
    WorldStarted,
    Jumped { tick: u32 },
    Landed { tick: u32 },
    Died { tick: u32 },
    /// `advanced` is false for a provisional success outside replay
    FinishReached { destination: String, advanced: bool },
    /// `committed` is false for a provisional success outside replay
    CheckpointReached {
        progress: u32,
        camera_target: Vec2,
        committed: bool,
    },
    Paused,
    Resumed,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Log = Rc<RefCell<Vec<String>>>;

    struct Recorder {
        name: &'static str,
        log: Log,
    }

    impl WorldListener for Recorder {
        fn on_reset(&mut self, _ctx: &mut WorldContext<'_>) {
            self.log.borrow_mut().push(format!("{}:reset", self.name));
        }

        fn pre_step(&mut self, ctx: &mut WorldContext<'_>) {
            self.log
                .borrow_mut()
                .push(format!("{}:pre@{}", self.name, ctx.tick()));
        }

        fn post_step(&mut self, _ctx: &mut WorldContext<'_>) {
            self.log.borrow_mut().push(format!("{}:post", self.name));
        }
    }

    struct Spikes;

    impl WorldListener for Spikes {
        fn world_step(&mut self, ctx: &mut WorldContext<'_>) {
            if ctx.player_bounds().center.y < 0.0 {
                ctx.die();
            }
        }
    }

    fn dispatch(bus: &mut EventBus, phase: WorldPhase, player: &PlayerState) -> Vec<WorldCommand> {
        let mut geometry = LevelGeometry::new();
        let mut commands = Vec::new();
        let bounds = Aabb::new(player.position, Vec2::ONE);
        let mut ctx = WorldContext::new(
            7,
            LoopState::Recording,
            0,
            player,
            bounds,
            &mut geometry,
            &mut commands,
        );
        bus.dispatch(phase, &mut ctx);
        commands
    }

    #[test]
    fn test_dispatch_in_subscription_order() {
        let log: Log = Rc::default();
        let mut bus = EventBus::new();
        bus.subscribe(Box::new(Recorder {
            name: "a",
            log: log.clone(),
        }));
        bus.subscribe(Box::new(Recorder {
            name: "b",
            log: log.clone(),
        }));

        let player = PlayerState::default();
        dispatch(&mut bus, WorldPhase::Reset, &player);
        dispatch(&mut bus, WorldPhase::PreStep, &player);
        dispatch(&mut bus, WorldPhase::WorldStep, &player);
        dispatch(&mut bus, WorldPhase::PostStep, &player);

        assert_eq!(
            *log.borrow(),
            vec!["a:reset", "b:reset", "a:pre@7", "b:pre@7", "a:post", "b:post"]
        );
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let log: Log = Rc::default();
        let mut bus = EventBus::new();
        let a = bus.subscribe(Box::new(Recorder {
            name: "a",
            log: log.clone(),
        }));
        bus.subscribe(Box::new(Recorder {
            name: "b",
            log: log.clone(),
        }));

        assert!(bus.unsubscribe(a).is_some());
        assert!(bus.unsubscribe(a).is_none());
        assert_eq!(bus.len(), 1);

        dispatch(&mut bus, WorldPhase::Reset, &PlayerState::default());
        assert_eq!(*log.borrow(), vec!["b:reset"]);
    }

    #[test]
    fn test_commands_are_collected() {
        let mut bus = EventBus::new();
        bus.subscribe(Box::new(Spikes));

        let safe = PlayerState::spawn(Vec2::new(0.0, 1.0), true);
        assert!(dispatch(&mut bus, WorldPhase::WorldStep, &safe).is_empty());

        let fallen = PlayerState::spawn(Vec2::new(0.0, -3.0), true);
        assert_eq!(
            dispatch(&mut bus, WorldPhase::WorldStep, &fallen),
            vec![WorldCommand::Die]
        );
        // Other phases don't reach world_step
        assert!(dispatch(&mut bus, WorldPhase::PostStep, &fallen).is_empty());
    }
}
