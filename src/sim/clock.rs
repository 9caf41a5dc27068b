//! Tick counting and host pacing
//!
//! `SimulationClock` is the only timing authority inside a loop. `FixedStepper`
//! lives on the host side and only decides how many ticks to run per frame.

use crate::consts::{MAX_FRAME_TIME, MAX_SUBSTEPS};
use crate::ticks_for;

/// Tick counter for the current loop
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationClock {
    tick: u32,
    loop_length: u32,
    tick_duration: f32,
}

impl SimulationClock {
    pub fn new(loop_seconds: f32, tick_duration: f32) -> Self {
        Self {
            tick: 0,
            loop_length: ticks_for(loop_seconds, tick_duration),
            tick_duration,
        }
    }

    #[inline]
    pub fn tick(&self) -> u32 {
        self.tick
    }

    /// Ticks in one loop (the timeline length)
    #[inline]
    pub fn loop_length(&self) -> u32 {
        self.loop_length
    }

    #[inline]
    pub fn tick_duration(&self) -> f32 {
        self.tick_duration
    }

    pub fn advance(&mut self) {
        self.tick = self.tick.saturating_add(1);
    }

    pub fn reset(&mut self) {
        self.tick = 0;
    }

    /// Every tick of the loop has been stepped
    #[inline]
    pub fn is_exhausted(&self) -> bool {
        self.tick >= self.loop_length
    }

    pub fn elapsed_seconds(&self) -> f32 {
        self.tick as f32 * self.tick_duration
    }

    /// Fraction of the loop elapsed, in [0, 1]
    pub fn progress(&self) -> f32 {
        if self.loop_length == 0 {
            return 1.0;
        }
        (self.tick as f32 / self.loop_length as f32).min(1.0)
    }
}

/// Converts variable host frame times into whole fixed ticks
#[derive(Debug, Clone)]
pub struct FixedStepper {
    accumulator: f32,
    dt: f32,
    max_substeps: u32,
}

impl FixedStepper {
    pub fn new(dt: f32) -> Self {
        Self {
            accumulator: 0.0,
            dt,
            max_substeps: MAX_SUBSTEPS,
        }
    }

    pub fn with_max_substeps(mut self, max_substeps: u32) -> Self {
        self.max_substeps = max_substeps.max(1);
        self
    }

    /// Add one host frame and return how many ticks to run for it
    pub fn advance(&mut self, frame_dt: f32) -> u32 {
        // Clamp long frames (tab switch, breakpoint) instead of catching up
        self.accumulator += frame_dt.clamp(0.0, MAX_FRAME_TIME);

        let mut substeps = 0;
        while self.accumulator >= self.dt && substeps < self.max_substeps {
            self.accumulator -= self.dt;
            substeps += 1;
        }
        if substeps == self.max_substeps {
            // Drop the backlog rather than spiral
            self.accumulator = self.accumulator.min(self.dt);
        }
        substeps
    }

    /// Forget banked time (after the host stops stepping for a while)
    pub fn reset(&mut self) {
        self.accumulator = 0.0;
    }
}
