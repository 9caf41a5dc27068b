//! Per-tick input and the loop's input timeline
//!
//! Every physics step consumes a `FrameInput` built from the timeline. While
//! recording, the live sample is written into the timeline first; while
//! replaying it is only read. That single rule is what makes a replay follow
//! the recorded run exactly.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::ticks_for;

/// Control state sampled once per tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InputState {
    /// Horizontal intent: -1 (left), 0, 1 (right)
    pub move_x: i8,
    /// Jump held
    pub jump: bool,
}

impl InputState {
    pub const IDLE: Self = Self {
        move_x: 0,
        jump: false,
    };

    /// Create a sample, folding any horizontal value into -1/0/1
    pub const fn new(move_x: i8, jump: bool) -> Self {
        Self {
            move_x: move_x.signum(),
            jump,
        }
    }

    pub const fn moving(move_x: i8) -> Self {
        Self::new(move_x, false)
    }

    pub const fn jumping() -> Self {
        Self::new(0, true)
    }

    /// Same sample with the axis folded into -1/0/1
    #[inline]
    pub const fn normalized(self) -> Self {
        Self::new(self.move_x, self.jump)
    }

    /// A control was engaged this tick that was not engaged on `previous`
    #[inline]
    pub fn action_started(&self, previous: InputState) -> bool {
        (self.move_x != 0 && self.move_x != previous.move_x) || (self.jump && !previous.jump)
    }
}

/// Read-only view of the current and previous tick's input
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameInput {
    pub previous: InputState,
    pub current: InputState,
}

impl FrameInput {
    pub fn new(previous: InputState, current: InputState) -> Self {
        Self { previous, current }
    }

    #[inline]
    pub fn move_axis(&self) -> i8 {
        self.current.move_x
    }

    #[inline]
    pub fn jump_held(&self) -> bool {
        self.current.jump
    }

    #[inline]
    pub fn jump_pressed(&self) -> bool {
        self.current.jump && !self.previous.jump
    }

    #[inline]
    pub fn jump_released(&self) -> bool {
        !self.current.jump && self.previous.jump
    }
}

/// Fixed-length record of one loop's inputs, indexed by tick
///
/// Allocated once; the length never changes. Entries past the write cursor
/// while recording are idle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputTimeline {
    entries: Box<[InputState]>,
}

impl InputTimeline {
    /// Timeline of exactly `len` idle entries
    pub fn new(len: u32) -> Self {
        Self {
            entries: vec![InputState::IDLE; len as usize].into_boxed_slice(),
        }
    }

    /// Timeline covering `loop_seconds` of ticks
    pub fn for_loop(loop_seconds: f32, tick_duration: f32) -> Self {
        let timeline = Self::new(ticks_for(loop_seconds, tick_duration));
        log::info!("Input timeline allocated with {} ticks", timeline.len());
        timeline
    }

    #[inline]
    pub fn len(&self) -> u32 {
        self.entries.len() as u32
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Store `state` at `tick` (wrapped into the loop)
    pub fn write(&mut self, tick: u32, state: InputState) {
        if self.entries.is_empty() {
            return;
        }
        if tick >= self.len() {
            log::warn!("Timeline write at tick {} past loop end {}", tick, self.len());
        }
        let index = (tick % self.len()) as usize;
        self.entries[index] = state;
    }

    /// Stored state at `tick`, idle past the end
    #[inline]
    pub fn read(&self, tick: u32) -> InputState {
        self.entries
            .get(tick as usize)
            .copied()
            .unwrap_or(InputState::IDLE)
    }

    /// Input view for the step at `tick`
    pub fn frame_input(&self, tick: u32) -> FrameInput {
        let previous = if tick > 0 {
            self.read(tick - 1)
        } else {
            InputState::IDLE
        };
        FrameInput::new(previous, self.read(tick))
    }

    /// Idle every entry from `tick` to the end
    pub fn clear_from(&mut self, tick: u32) {
        let start = (tick as usize).min(self.entries.len());
        self.entries[start..].fill(InputState::IDLE);
    }

    pub fn clear(&mut self) {
        self.clear_from(0);
    }

    /// Snapshot for track visualization (not authoritative)
    pub fn as_slice(&self) -> &[InputState] {
        &self.entries
    }
}

/// Live input device as seen by the simulation
///
/// `sample` is called once per running tick, followed by `confirm` and
/// `fast_forward`.
pub trait InputSource {
    /// Current control state
    fn sample(&mut self) -> InputState;

    /// Confirm ("play now") pressed since the previous tick
    fn confirm(&mut self) -> bool {
        false
    }

    /// Fast-forward held
    fn fast_forward(&mut self) -> bool {
        false
    }
}

/// One tick's worth of host input
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LiveInput {
    pub state: InputState,
    pub confirm: bool,
    pub fast_forward: bool,
}

impl LiveInput {
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn with_state(state: InputState) -> Self {
        Self {
            state,
            ..Default::default()
        }
    }

    pub fn confirmed() -> Self {
        Self {
            confirm: true,
            ..Default::default()
        }
    }
}

impl InputSource for LiveInput {
    fn sample(&mut self) -> InputState {
        self.state
    }

    fn confirm(&mut self) -> bool {
        self.confirm
    }

    fn fast_forward(&mut self) -> bool {
        self.fast_forward
    }
}

/// Input source that plays back a queued script, idle once exhausted
#[derive(Debug, Clone, Default)]
pub struct ScriptedInput {
    queue: VecDeque<LiveInput>,
    current: LiveInput,
}

impl ScriptedInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `state` for the next `ticks` ticks
    pub fn hold(mut self, state: InputState, ticks: u32) -> Self {
        self.queue
            .extend(std::iter::repeat_n(LiveInput::with_state(state), ticks as usize));
        self
    }

    /// Queue a single tick with confirm pressed
    pub fn then_confirm(mut self) -> Self {
        self.queue.push_back(LiveInput::confirmed());
        self
    }

    /// Ticks left in the script
    pub fn remaining(&self) -> usize {
        self.queue.len()
    }
}

impl InputSource for ScriptedInput {
    fn sample(&mut self) -> InputState {
        self.current = self.queue.pop_front().unwrap_or_default();
        self.current.state
    }

    fn confirm(&mut self) -> bool {
        self.current.confirm
    }

    fn fast_forward(&mut self) -> bool {
        self.current.fast_forward
    }
}
