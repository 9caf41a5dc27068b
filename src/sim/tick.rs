//! Fixed timestep simulation tick
//!
//! `Simulation` owns the loop state machine, the input timeline, the
//! character and the level, and advances them one deterministic tick at a
//! time. Per running tick the order is fixed:
//!
//! 1. resolve input (live sample written to the timeline while recording)
//! 2. `PreStep` notification
//! 3. character controller
//! 4. `WorldStep` notification (geometry-dependent subscribers)
//! 5. `PostStep` notification
//! 6. tick counter increment
//! 7. loop boundary check
//!
//! Subscriber commands are applied right after the phase that issued them.

use glam::Vec2;

use super::clock::SimulationClock;
use super::collision::{Aabb, LevelGeometry};
use super::controller::CharacterController;
use super::events::{
    EventBus, SimEvent, SubscriberId, WorldCommand, WorldContext, WorldListener, WorldPhase,
};
use super::input::{InputSource, InputState, InputTimeline};
use super::state::{LoopState, PlayerState};
use crate::config::SimConfig;

/// The deterministic core: one level, one character, one timeline
pub struct Simulation {
    config: SimConfig,
    controller: CharacterController,
    timeline: InputTimeline,
    clock: SimulationClock,
    state: LoopState,

    player: PlayerState,
    /// Reset target, re-captured on start and at checkpoints
    initial_player: PlayerState,
    geometry: LevelGeometry,

    bus: EventBus,
    commands: Vec<WorldCommand>,
    events: Vec<SimEvent>,

    /// Previous raw sample, for action edge detection
    last_sample: InputState,
    /// Death latch, cleared on every world reset
    died: bool,
    /// Live samples are replaced by idle until the next reset
    skip_input: bool,
    /// Character not stepped until the next reset
    player_locked: bool,
    /// Current replay was started by confirm rather than by running out
    manual_reset: bool,
    paused: bool,

    checkpoint_progress: u32,
    camera_target: Vec2,
    resets: u32,
}

impl Simulation {
    /// Create an inactive simulation; call `start_game` to begin
    ///
    /// An invalid config is replaced by the defaults.
    pub fn new(config: SimConfig, geometry: LevelGeometry, spawn: PlayerState) -> Self {
        let config = config.validated_or_default();
        let controller = CharacterController::from_sim_config(&config);
        let timeline = InputTimeline::for_loop(config.loop_seconds, config.tick_duration);
        let clock = SimulationClock::new(config.loop_seconds, config.tick_duration);

        Self {
            config,
            controller,
            timeline,
            clock,
            state: LoopState::Inactive,
            player: spawn,
            initial_player: spawn,
            geometry,
            bus: EventBus::new(),
            commands: Vec::new(),
            events: Vec::new(),
            last_sample: InputState::IDLE,
            died: false,
            skip_input: false,
            player_locked: false,
            manual_reset: false,
            paused: false,
            checkpoint_progress: 0,
            camera_target: spawn.position,
            resets: 0,
        }
    }

    /// Where the camera returns on every world reset
    pub fn with_camera_target(mut self, target: Vec2) -> Self {
        self.camera_target = target;
        self
    }

    // === Accessors ===

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn controller(&self) -> &CharacterController {
        &self.controller
    }

    #[inline]
    pub fn tick(&self) -> u32 {
        self.clock.tick()
    }

    pub fn clock(&self) -> &SimulationClock {
        &self.clock
    }

    #[inline]
    pub fn loop_state(&self) -> LoopState {
        self.state
    }

    pub fn player(&self) -> &PlayerState {
        &self.player
    }

    pub fn player_bounds(&self) -> Aabb {
        self.controller.bounds(&self.player)
    }

    pub fn initial_player(&self) -> &PlayerState {
        &self.initial_player
    }

    pub fn timeline(&self) -> &InputTimeline {
        &self.timeline
    }

    pub fn geometry(&self) -> &LevelGeometry {
        &self.geometry
    }

    pub fn is_dead(&self) -> bool {
        self.died
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Attempts so far (manual resets and re-recordings)
    pub fn resets(&self) -> u32 {
        self.resets
    }

    pub fn checkpoint_progress(&self) -> u32 {
        self.checkpoint_progress
    }

    pub fn camera_target(&self) -> Vec2 {
        self.camera_target
    }

    /// Timeline index being recorded, for the track display
    pub fn record_cursor(&self) -> Option<u32> {
        match self.state {
            LoopState::Awaiting => Some(0),
            LoopState::Recording => Some(self.clock.tick()),
            _ => None,
        }
    }

    /// Drain queued presentation events
    pub fn take_events(&mut self) -> Vec<SimEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn subscribe(&mut self, listener: Box<dyn WorldListener>) -> SubscriberId {
        self.bus.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriberId) -> Option<Box<dyn WorldListener>> {
        self.bus.unsubscribe(id)
    }

    // === Host commands ===

    /// Inactive → Awaiting, re-capturing the reset target from the character
    pub fn start_game(&mut self) {
        if self.state != LoopState::Inactive {
            log::warn!("start_game ignored in {:?}", self.state);
            return;
        }
        self.initial_player = self.player.baseline(true);
        self.timeline.clear();
        self.reset_world();
        self.transition(LoopState::Awaiting);
    }

    /// Throw the recording away and wait for a fresh one, from any state
    pub fn reset_game(&mut self) {
        if self.paused {
            self.resume();
        }
        self.timeline.clear();
        self.reset_world();
        if self.state != LoopState::Awaiting {
            self.resets += 1;
        }
        self.transition(LoopState::Awaiting);
    }

    /// Stop world stepping (level transition, checkpoint hand-off)
    pub fn lock_world(&mut self) {
        self.paused = false;
        self.transition(LoopState::Inactive);
    }

    pub fn pause(&mut self) {
        if self.state == LoopState::Inactive {
            log::warn!("pause ignored while inactive");
            return;
        }
        if !self.paused {
            self.paused = true;
            self.events.push(SimEvent::Paused);
        }
    }

    pub fn resume(&mut self) {
        if self.paused {
            self.paused = false;
            self.events.push(SimEvent::Resumed);
        }
    }

    // === World outcomes (also reachable from subscribers) ===

    /// Kill the character for the rest of this loop
    pub fn die(&mut self) {
        if self.died {
            return;
        }
        self.died = true;
        self.skip_input = true;
        self.player_locked = true;
        self.events.push(SimEvent::Died {
            tick: self.clock.tick(),
        });
        log::debug!("Died at tick {}", self.clock.tick());
    }

    /// Reach a level exit; only a replaying run actually advances
    pub fn finish(&mut self, destination: &str) {
        if self.died {
            return;
        }
        self.skip_input = true;

        let advanced = self.state == LoopState::Replaying;
        self.events.push(SimEvent::FinishReached {
            destination: destination.to_string(),
            advanced,
        });
        if advanced {
            log::info!("Level finished, advancing to {}", destination);
            self.lock_world();
        }
    }

    /// Reach a checkpoint; only a replaying run commits it
    pub fn checkpoint(&mut self, progress: u32, camera_target: Vec2) {
        let committed = self.state == LoopState::Replaying;
        if committed {
            self.checkpoint_progress = progress;
            self.camera_target = camera_target;
            self.initial_player = self.player.baseline(true);
            log::info!("Checkpoint {} committed at {}", progress, self.player.position);
            self.lock_world();
        }
        self.events.push(SimEvent::CheckpointReached {
            progress,
            camera_target,
            committed,
        });
        self.skip_input = true;
        self.player_locked = true;
    }

    // === Tick driver ===

    /// Run one host tick
    pub fn step<I: InputSource + ?Sized>(&mut self, input: &mut I) {
        if self.paused || self.state == LoopState::Inactive {
            return;
        }

        let sampled = input.sample().normalized();
        let confirm = input.confirm();
        let fast_forward = input.fast_forward();
        let live = if self.skip_input {
            InputState::IDLE
        } else {
            sampled
        };
        let action = sampled.action_started(self.last_sample);
        self.last_sample = sampled;

        if self.state == LoopState::Awaiting && action {
            self.reset_world();
            self.transition(LoopState::Recording);
            self.world_started();
        }

        if self.state == LoopState::Replaying
            && action
            && !self.died
            && (self.manual_reset || self.clock.tick() > self.config.replay_interrupt_ticks)
        {
            self.interrupt_replay();
        }

        if self.state == LoopState::Recording {
            self.timeline.write(self.clock.tick(), live);
        }

        if self.state.is_running() {
            self.advance(confirm);
            if fast_forward && self.state == LoopState::Replaying {
                self.advance(false);
            }
        }
    }

    /// Start recording over the tail of the running replay
    fn interrupt_replay(&mut self) {
        let tick = self.clock.tick();
        log::debug!("Replay interrupted at tick {}", tick);
        self.timeline.clear_from(tick);
        self.resets += 1;
        self.transition(LoopState::Recording);
    }

    /// One full tick followed by the loop boundary check
    fn advance(&mut self, confirm: bool) {
        self.step_frame();

        // Locked by a subscriber command this tick
        if !self.state.is_running() {
            return;
        }

        if self.clock.is_exhausted() || confirm {
            self.manual_reset = confirm;
            self.reset_world();
            self.transition(LoopState::Replaying);
            self.world_started();
        }
    }

    fn step_frame(&mut self) {
        let tick = self.clock.tick();
        let frame = self.timeline.frame_input(tick);

        self.notify(WorldPhase::PreStep);

        if !self.player_locked {
            let next = self
                .controller
                .step(&self.player, frame, tick, &self.geometry);
            if next.jumping {
                self.events.push(SimEvent::Jumped { tick });
            }
            if next.landing {
                self.events.push(SimEvent::Landed { tick });
            }
            self.player = next;
        }

        self.notify(WorldPhase::WorldStep);
        self.notify(WorldPhase::PostStep);
        self.clock.advance();
    }

    fn reset_world(&mut self) {
        self.clock.reset();
        self.died = false;
        self.skip_input = false;
        self.player_locked = false;
        self.player = self.initial_player;
        self.events.push(SimEvent::WorldReset {
            camera_target: self.camera_target,
        });
        self.notify(WorldPhase::Reset);
    }

    fn world_started(&mut self) {
        self.events.push(SimEvent::WorldStarted);
        self.notify(WorldPhase::WorldStart);
    }

    fn transition(&mut self, to: LoopState) {
        let from = self.state;
        if from == to {
            return;
        }
        log::debug!("Loop state {:?} -> {:?} at tick {}", from, to, self.clock.tick());
        self.state = to;
        self.events.push(SimEvent::StateChanged { from, to });
    }

    fn notify(&mut self, phase: WorldPhase) {
        if !self.bus.is_empty() {
            let bounds = self.controller.bounds(&self.player);
            let mut ctx = WorldContext::new(
                self.clock.tick(),
                self.state,
                self.checkpoint_progress,
                &self.player,
                bounds,
                &mut self.geometry,
                &mut self.commands,
            );
            self.bus.dispatch(phase, &mut ctx);
        }
        self.apply_commands();
    }

    fn apply_commands(&mut self) {
        if self.commands.is_empty() {
            return;
        }
        for command in std::mem::take(&mut self.commands) {
            match command {
                WorldCommand::Die => self.die(),
                WorldCommand::Finish(destination) => self.finish(&destination),
                WorldCommand::Checkpoint {
                    progress,
                    camera_target,
                } => self.checkpoint(progress, camera_target),
            }
        }
    }
}
