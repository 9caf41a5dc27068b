//! Tenloop - the deterministic core of a ten-second time-loop platformer
//!
//! The player records a run inside a fixed window, the window rewinds and the
//! recorded inputs replay while a new run can be layered on top.
//!
//! Core modules:
//! - `sim`: Deterministic simulation (input timeline, loop state machine,
//!   character controller, world event bus)
//! - `config`: Timing and movement tuning, loaded from JSON

pub mod config;
pub mod sim;

pub use config::{ConfigError, ControllerConfig, SimConfig};

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (50 Hz)
    pub const SIM_DT: f32 = 1.0 / 50.0;
    /// Length of one loop window in seconds
    pub const LOOP_SECONDS: f32 = 10.0;
    /// Maximum substeps per host frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;
    /// Longest host frame the stepper will try to catch up on
    pub const MAX_FRAME_TIME: f32 = 0.1;

    /// Replay must run this many ticks before new input may interrupt it
    pub const REPLAY_INTERRUPT_TICKS: u32 = 30;
    /// Vanishing platforms drop out this long after being touched
    pub const VANISH_SECONDS: f32 = 0.25;
    /// A revealed hidden spike kills on re-entry after this many ticks
    pub const HIDDEN_SPIKE_ARM_TICKS: u32 = 3;
}

/// Number of whole ticks covering `seconds` at the given tick duration
#[inline]
pub fn ticks_for(seconds: f32, tick_duration: f32) -> u32 {
    (seconds / tick_duration).round().max(0.0) as u32
}

/// Move `current` toward `target` by at most `max_delta`
#[inline]
pub fn move_towards(current: f32, target: f32, max_delta: f32) -> f32 {
    if (target - current).abs() <= max_delta {
        target
    } else {
        current + (target - current).signum() * max_delta
    }
}
