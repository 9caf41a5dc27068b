//! Loop mode and character state
//!
//! `PlayerState` is the whole physical state of the character; restoring a
//! saved copy is all a world reset needs to do for it.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Authoritative mode of the time loop
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoopState {
    /// World stepping disabled (level transition, before start)
    #[default]
    Inactive,
    /// World reset and waiting for the first action to start recording
    Awaiting,
    /// Live input is written into the timeline, then stepped
    Recording,
    /// The recorded timeline drives the world
    Replaying,
}

impl LoopState {
    /// Ticks advance in this state
    #[inline]
    pub fn is_running(self) -> bool {
        matches!(self, LoopState::Recording | LoopState::Replaying)
    }
}

/// Full physical state of the character
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    pub velocity: Vec2,
    /// Character origin (the collision box is offset from it)
    pub position: Vec2,
    pub grounded: bool,
    /// A jump was taken this tick
    pub jumping: bool,
    /// Touched ground this tick after being airborne
    pub landing: bool,
    /// A coyote jump is still available since the last landing
    pub coyote_usable: bool,
    /// Tick of the latest unconsumed jump press (`None` = never)
    pub last_jump_tick: Option<u32>,
    /// Tick the character last left the ground (`None` = never)
    pub last_ground_tick: Option<u32>,
    pub facing_right: bool,
}

impl Default for PlayerState {
    fn default() -> Self {
        Self::spawn(Vec2::ZERO, true)
    }
}

impl PlayerState {
    /// Fresh character at `position`, assumed standing
    pub fn spawn(position: Vec2, facing_right: bool) -> Self {
        Self {
            velocity: Vec2::ZERO,
            position,
            grounded: true,
            jumping: false,
            landing: false,
            coyote_usable: false,
            last_jump_tick: None,
            last_ground_tick: None,
            facing_right,
        }
    }

    /// Copy suitable as a reset target
    ///
    /// Tick bookkeeping never survives a reset since ticks restart at 0.
    /// With `only_position` the motion is dropped too, keeping where the
    /// character stands and which way it faces.
    pub fn baseline(&self, only_position: bool) -> Self {
        let mut saved = Self {
            last_jump_tick: None,
            last_ground_tick: None,
            ..*self
        };
        if only_position {
            saved.velocity = Vec2::ZERO;
            saved.jumping = false;
            saved.landing = false;
            saved.coyote_usable = false;
        }
        saved
    }
}
