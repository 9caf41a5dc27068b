//! Level descriptions
//!
//! A level is plain data: spawn point, static solids and gadget triggers.
//! `instantiate` turns it into a ready-to-start `Simulation` with every
//! trigger subscribed in file order.

use std::path::Path;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::collision::{Aabb, LevelGeometry, StaticGeometry};
use super::gadgets::{Gadget, LogicTrigger};
use super::state::PlayerState;
use super::tick::Simulation;
use crate::config::{ConfigError, SimConfig};

fn default_true() -> bool {
    true
}

fn default_hits() -> u32 {
    1
}

/// Gadget as written in a level file; solids are declared inline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GadgetDesc {
    Door {
        panel: Aabb,
    },
    Breakable {
        block: Aabb,
        #[serde(default = "default_hits")]
        hits: u32,
    },
    VanishingPlatform {
        platform: Aabb,
    },
    Checkpoint {
        progress: u32,
        camera_target: Vec2,
    },
    Hazard,
    HiddenSpike,
    Finish {
        destination: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerDesc {
    pub region: Aabb,
    #[serde(default)]
    pub repeatable: bool,
    pub gadget: GadgetDesc,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelDescription {
    pub name: String,
    pub spawn: Vec2,
    #[serde(default = "default_true")]
    pub facing_right: bool,
    /// Camera reset target (defaults to the spawn point)
    #[serde(default)]
    pub camera_target: Option<Vec2>,
    #[serde(default)]
    pub solids: Vec<Aabb>,
    #[serde(default)]
    pub triggers: Vec<TriggerDesc>,
}

impl LevelDescription {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let level = Self::from_json_str(&json)?;
        log::info!("Loaded level '{}' from {}", level.name, path.display());
        Ok(level)
    }

    /// Build an inactive simulation for this level
    pub fn instantiate(&self, config: SimConfig) -> Simulation {
        let config = config.validated_or_default();
        let mut geometry = LevelGeometry::new();
        for solid in &self.solids {
            geometry.add_solid(*solid);
        }

        // Gadget solids go in after the static ones
        let tick_duration = config.tick_duration;
        let triggers: Vec<LogicTrigger<Gadget>> = self
            .triggers
            .iter()
            .map(|desc| {
                let gadget = match &desc.gadget {
                    GadgetDesc::Door { panel } => Gadget::door(geometry.add_solid(*panel)),
                    GadgetDesc::Breakable { block, hits } => {
                        Gadget::breakable(geometry.add_solid(*block), *hits)
                    }
                    GadgetDesc::VanishingPlatform { platform } => {
                        Gadget::vanishing_platform(geometry.add_solid(*platform), tick_duration)
                    }
                    GadgetDesc::Checkpoint {
                        progress,
                        camera_target,
                    } => Gadget::checkpoint(*progress, *camera_target),
                    GadgetDesc::Hazard => Gadget::Hazard,
                    GadgetDesc::HiddenSpike => Gadget::hidden_spike(),
                    GadgetDesc::Finish { destination } => Gadget::finish(destination.as_str()),
                };
                let repeatable = desc.repeatable || gadget.needs_exit();
                LogicTrigger::new(desc.region, gadget).repeatable(repeatable)
            })
            .collect();

        let spawn = PlayerState::spawn(self.spawn, self.facing_right);
        let mut sim = Simulation::new(config, geometry, spawn)
            .with_camera_target(self.camera_target.unwrap_or(self.spawn));

        let bounds = sim.player_bounds();
        if sim.geometry().overlaps(bounds.center, bounds.size) {
            log::warn!("Level '{}': spawn overlaps geometry", self.name);
        }

        let trigger_count = triggers.len();
        for trigger in triggers {
            sim.subscribe(Box::new(trigger));
        }
        log::info!(
            "Level '{}' ready: {} solids, {} triggers",
            self.name,
            sim.geometry().len(),
            trigger_count
        );
        sim
    }
}
