//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only; the tick counter is the only clock
//! - Replays consume the same `FrameInput` sequence as the recording
//! - Stable iteration order (solids and subscribers in insertion order)
//! - No rendering, audio or platform dependencies

pub mod clock;
pub mod collision;
pub mod controller;
pub mod events;
pub mod gadgets;
pub mod input;
pub mod level;
pub mod state;
pub mod tick;

pub use clock::{FixedStepper, SimulationClock};
pub use collision::{Aabb, LevelGeometry, SolidId, StaticGeometry};
pub use controller::{CharacterController, Contacts, ProbeLine};
pub use events::{
    EventBus, SimEvent, SubscriberId, WorldCommand, WorldContext, WorldListener, WorldPhase,
};
pub use gadgets::{Gadget, LogicTrigger, Switchable};
pub use input::{FrameInput, InputSource, InputState, InputTimeline, LiveInput, ScriptedInput};
pub use level::{GadgetDesc, LevelDescription, TriggerDesc};
pub use state::{LoopState, PlayerState};
pub use tick::Simulation;
