//! Simulation tuning
//!
//! Timing and movement parameters, loaded from JSON by the host and handed to
//! the simulation once at construction. Nothing here changes mid-loop.

use std::path::{Path, PathBuf};

use glam::Vec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::*;
use crate::ticks_for;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("tick duration must be positive and finite, got {0}")]
    InvalidTickDuration(f32),
    #[error("loop of {seconds}s is shorter than one tick")]
    LoopTooShort { seconds: f32 },
    #[error("at least two probe points per side are required, got {0}")]
    TooFewDetectors(u32),
    #[error("collision sweep needs at least one iteration")]
    NoCollisionIterations,
    #[error("character box must have a positive size, got {0}")]
    InvalidBoxSize(Vec2),
}

/// Character movement tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Collision box size
    pub size: Vec2,
    /// Collision box center relative to the character position
    pub offset: Vec2,

    // === Movement ===
    /// Horizontal acceleration while a direction is held (units/s²)
    pub acceleration: f32,
    /// Horizontal deceleration with no direction held (units/s²)
    pub deceleration: f32,
    /// Horizontal speed cap (units/s)
    pub move_speed: f32,
    /// Vertical acceleration while airborne (negative = down)
    pub gravity: f32,

    // === Jumping ===
    /// Vertical speed set when a jump is taken
    pub jump_velocity: f32,
    /// Grace window after leaving ground (seconds)
    pub coyote_time: f32,
    /// Grace window for an early jump press before landing (seconds)
    pub jump_buffer: f32,

    // === Detection ===
    /// Probe points per box side
    pub detector_count: u32,
    /// Probe reach past the box edge
    pub detection_ray_length: f32,
    /// Inset of the outermost probe points from the box corners
    pub ray_buffer: f32,
    /// Interpolation steps of the collision sweep
    pub collision_iterations: u32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            size: Vec2::new(1.0, 1.0),
            offset: Vec2::ZERO,

            acceleration: 60.0,
            deceleration: 90.0,
            move_speed: 13.0,
            gravity: -60.0,

            jump_velocity: 20.0,
            coyote_time: 0.1,
            jump_buffer: 0.1,

            detector_count: 3,
            detection_ray_length: 0.1,
            ray_buffer: 0.1,
            collision_iterations: 10,
        }
    }
}

/// Whole-simulation tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Fixed tick duration in seconds
    pub tick_duration: f32,
    /// Length of the loop window in seconds
    pub loop_seconds: f32,
    /// Replay ticks that must elapse before live input may interrupt a
    /// replay (ignored when the replay was restarted manually)
    pub replay_interrupt_ticks: u32,
    pub controller: ControllerConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tick_duration: SIM_DT,
            loop_seconds: LOOP_SECONDS,
            replay_interrupt_ticks: REPLAY_INTERRUPT_TICKS,
            controller: ControllerConfig::default(),
        }
    }
}

impl SimConfig {
    /// Parse and validate a JSON config; missing fields take defaults
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json_str(&json)?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.tick_duration.is_finite() && self.tick_duration > 0.0) {
            return Err(ConfigError::InvalidTickDuration(self.tick_duration));
        }
        if self.loop_ticks() == 0 {
            return Err(ConfigError::LoopTooShort {
                seconds: self.loop_seconds,
            });
        }
        let controller = &self.controller;
        if controller.detector_count < 2 {
            return Err(ConfigError::TooFewDetectors(controller.detector_count));
        }
        if controller.collision_iterations == 0 {
            return Err(ConfigError::NoCollisionIterations);
        }
        if controller.size.x <= 0.0 || controller.size.y <= 0.0 {
            return Err(ConfigError::InvalidBoxSize(controller.size));
        }
        Ok(())
    }

    /// Ticks in one loop window
    pub fn loop_ticks(&self) -> u32 {
        ticks_for(self.loop_seconds, self.tick_duration)
    }

    /// This config if it validates, the defaults otherwise
    pub fn validated_or_default(self) -> Self {
        match self.validate() {
            Ok(()) => self,
            Err(err) => {
                log::warn!("Invalid config ({}), using defaults", err);
                Self::default()
            }
        }
    }
}
