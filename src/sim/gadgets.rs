//! Level gadgets
//!
//! A `LogicTrigger` watches a region for the character and drives a
//! `Switchable` target. The simulation only ever sees the trigger as a
//! `WorldListener`; what the target does is up to the target.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::collision::{Aabb, SolidId};
use super::events::{WorldContext, WorldListener};
use super::state::LoopState;
use crate::consts::{HIDDEN_SPIKE_ARM_TICKS, VANISH_SECONDS};
use crate::ticks_for;

/// Something a trigger can switch
pub trait Switchable {
    /// Character entered the trigger region
    fn trigger(&mut self, ctx: &mut WorldContext<'_>);

    /// Character left the region of a repeatable trigger
    fn untrigger(&mut self, _ctx: &mut WorldContext<'_>) {}

    /// Restore the start-of-loop state
    fn reset(&mut self, _ctx: &mut WorldContext<'_>) {}

    /// Per-tick logic, run in the world-step phase
    fn world_step(&mut self, _ctx: &mut WorldContext<'_>) {}

    /// Inactive targets are neither triggered nor untriggered
    fn is_active(&self) -> bool {
        true
    }
}

/// Built-in switchable gadgets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Gadget {
    /// Panel solid that opens (disables) when triggered
    Door { panel: SolidId, open: bool },
    /// Block that breaks after `hits_required` entries
    Breakable {
        block: SolidId,
        hits_required: u32,
        hits: u32,
    },
    /// Platform that drops out `break_ticks` after first being touched
    VanishingPlatform {
        platform: SolidId,
        break_ticks: u32,
        touched_at: Option<u32>,
    },
    /// Commits progress when a replaying run reaches it
    Checkpoint {
        progress: u32,
        camera_target: Vec2,
        active: bool,
    },
    /// Kills on contact
    Hazard,
    /// Trap revealed when the character steps off it; stepping back on
    /// later kills. Needs a repeatable trigger to see the exit.
    HiddenSpike { hidden: bool, left_at: Option<u32> },
    /// Level exit
    Finish { destination: String },
}

impl Gadget {
    pub fn door(panel: SolidId) -> Self {
        Gadget::Door { panel, open: false }
    }

    pub fn breakable(block: SolidId, hits_required: u32) -> Self {
        Gadget::Breakable {
            block,
            hits_required: hits_required.max(1),
            hits: 0,
        }
    }

    pub fn vanishing_platform(platform: SolidId, tick_duration: f32) -> Self {
        Gadget::VanishingPlatform {
            platform,
            break_ticks: ticks_for(VANISH_SECONDS, tick_duration),
            touched_at: None,
        }
    }

    pub fn checkpoint(progress: u32, camera_target: Vec2) -> Self {
        Gadget::Checkpoint {
            progress,
            camera_target,
            active: true,
        }
    }

    pub fn hidden_spike() -> Self {
        Gadget::HiddenSpike {
            hidden: true,
            left_at: None,
        }
    }

    /// Has to see the character leave its region
    pub fn needs_exit(&self) -> bool {
        matches!(self, Gadget::HiddenSpike { .. })
    }

    pub fn finish(destination: impl Into<String>) -> Self {
        Gadget::Finish {
            destination: destination.into(),
        }
    }
}

impl Switchable for Gadget {
    fn trigger(&mut self, ctx: &mut WorldContext<'_>) {
        match self {
            Gadget::Door { panel, open } => {
                if !*open {
                    *open = true;
                    ctx.set_solid_enabled(*panel, false);
                }
            }
            Gadget::Breakable {
                block,
                hits_required,
                hits,
            } => {
                *hits += 1;
                if *hits >= *hits_required {
                    ctx.set_solid_enabled(*block, false);
                }
            }
            Gadget::VanishingPlatform { touched_at, .. } => {
                if touched_at.is_none() {
                    *touched_at = Some(ctx.tick());
                }
            }
            Gadget::Checkpoint {
                progress,
                camera_target,
                ..
            } => {
                // Only a replaying run proves the checkpoint reachable
                if ctx.loop_state() == LoopState::Replaying {
                    ctx.checkpoint(*progress, *camera_target);
                }
            }
            Gadget::Hazard => ctx.die(),
            Gadget::HiddenSpike { left_at, .. } => {
                let tick = ctx.tick();
                if left_at.is_some_and(|left| tick.saturating_sub(left) > HIDDEN_SPIKE_ARM_TICKS) {
                    ctx.die();
                }
            }
            Gadget::Finish { destination } => ctx.finish(destination.as_str()),
        }
    }

    fn untrigger(&mut self, ctx: &mut WorldContext<'_>) {
        if let Gadget::HiddenSpike { hidden, left_at } = self {
            if *hidden {
                *hidden = false;
                *left_at = Some(ctx.tick());
                log::debug!("Hidden spike revealed at tick {}", ctx.tick());
            }
        }
    }

    fn reset(&mut self, ctx: &mut WorldContext<'_>) {
        match self {
            Gadget::Door { panel, open } => {
                *open = false;
                ctx.set_solid_enabled(*panel, true);
            }
            Gadget::Breakable { block, hits, .. } => {
                *hits = 0;
                ctx.set_solid_enabled(*block, true);
            }
            Gadget::VanishingPlatform {
                platform,
                touched_at,
                ..
            } => {
                *touched_at = None;
                ctx.set_solid_enabled(*platform, true);
            }
            Gadget::Checkpoint {
                progress, active, ..
            } => {
                *active = ctx.checkpoint_progress() < *progress;
            }
            Gadget::HiddenSpike { hidden, left_at } => {
                *hidden = true;
                *left_at = None;
            }
            Gadget::Hazard | Gadget::Finish { .. } => {}
        }
    }

    fn world_step(&mut self, ctx: &mut WorldContext<'_>) {
        if let Gadget::VanishingPlatform {
            platform,
            break_ticks,
            touched_at: Some(touched),
        } = self
        {
            if ctx.tick().saturating_sub(*touched) > *break_ticks {
                ctx.set_solid_enabled(*platform, false);
            }
        }
    }

    fn is_active(&self) -> bool {
        match self {
            Gadget::Checkpoint { active, .. } => *active,
            _ => true,
        }
    }
}

/// Region that switches its target when the character enters it
///
/// Fires once per entry. A repeatable trigger also untriggers its target
/// when the character leaves.
#[derive(Debug, Clone)]
pub struct LogicTrigger<S> {
    region: Aabb,
    target: S,
    repeatable: bool,
    triggered: bool,
}

impl<S: Switchable> LogicTrigger<S> {
    pub fn new(region: Aabb, target: S) -> Self {
        Self {
            region,
            target,
            repeatable: false,
            triggered: false,
        }
    }

    pub fn repeatable(mut self, repeatable: bool) -> Self {
        self.repeatable = repeatable;
        self
    }

    pub fn region(&self) -> Aabb {
        self.region
    }

    pub fn target(&self) -> &S {
        &self.target
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered
    }
}

impl<S: Switchable> WorldListener for LogicTrigger<S> {
    fn on_reset(&mut self, ctx: &mut WorldContext<'_>) {
        self.triggered = false;
        self.target.reset(ctx);
    }

    fn world_step(&mut self, ctx: &mut WorldContext<'_>) {
        if self.target.is_active() {
            if self.region.overlaps(&ctx.player_bounds()) {
                if !self.triggered {
                    self.triggered = true;
                    self.target.trigger(ctx);
                }
            } else if self.triggered {
                self.triggered = false;
                if self.repeatable {
                    self.target.untrigger(ctx);
                }
            }
        }
        self.target.world_step(ctx);
    }
}
