//! Tenloop - headless driver
//!
//! Plays a level with scripted input: records a run, lets it replay, restarts
//! from committed checkpoints and stops when the replay reaches the exit.
//! Every replayed tick is compared against the recording.
//!
//! Usage: `tenloop [config.json] [level.json]`

use anyhow::{Context, bail};

use tenloop::SimConfig;
use tenloop::sim::{
    FixedStepper, InputState, LevelDescription, LoopState, ScriptedInput, SimEvent, Simulation,
};

const DEMO_LEVEL: &str = include_str!("../levels/demo.json");

/// Host frame time the stepper is fed with
const FRAME_DT: f32 = 1.0 / 60.0;
/// Give up after this many host frames (60s)
const MAX_FRAMES: u32 = 3600;

/// Run right from the spawn, hopping over the door, then confirm
fn opening_script() -> ScriptedInput {
    ScriptedInput::new()
        .hold(InputState::moving(1), 25)
        .hold(InputState::new(1, true), 3)
        .hold(InputState::moving(1), 112)
        .hold(InputState::IDLE, 5)
        .then_confirm()
}

/// Run from the checkpoint to the exit, then confirm
fn checkpoint_script() -> ScriptedInput {
    ScriptedInput::new()
        .hold(InputState::moving(1), 100)
        .hold(InputState::IDLE, 5)
        .then_confirm()
}

/// Replay check for the current recording segment
#[derive(Default)]
struct ReplayCheck {
    /// Player position after each recorded tick (index = tick - 1)
    recorded: Vec<glam::Vec2>,
    compared: usize,
    diverged_at: Option<u32>,
}

impl ReplayCheck {
    fn observe(&mut self, sim: &Simulation) {
        let tick = sim.tick();
        let position = sim.player().position;
        match sim.loop_state() {
            LoopState::Recording if tick > 0 => {
                self.recorded.truncate(tick as usize - 1);
                self.recorded.push(position);
            }
            LoopState::Replaying if tick > 0 => {
                if let Some(expected) = self.recorded.get(tick as usize - 1) {
                    self.compared += 1;
                    if *expected != position && self.diverged_at.is_none() {
                        self.diverged_at = Some(tick);
                    }
                }
            }
            _ => {}
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    log::info!("Tenloop (headless) starting...");

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => {
            SimConfig::load(&path).with_context(|| format!("loading config {}", path))?
        }
        None => SimConfig::default(),
    };
    let level = match args.next() {
        Some(path) => {
            LevelDescription::load(&path).with_context(|| format!("loading level {}", path))?
        }
        None => LevelDescription::from_json_str(DEMO_LEVEL).context("parsing built-in level")?,
    };

    let mut sim = level.instantiate(config.clone());
    let mut stepper = FixedStepper::new(config.tick_duration);
    let mut script = opening_script();
    let mut check = ReplayCheck::default();
    let mut finished = None;
    let mut restart_from_checkpoint = false;

    sim.start_game();

    for _ in 0..MAX_FRAMES {
        for _ in 0..stepper.advance(FRAME_DT) {
            sim.step(&mut script);

            for event in sim.take_events() {
                match event {
                    SimEvent::StateChanged {
                        from: LoopState::Awaiting,
                        to: LoopState::Recording,
                    } => check.recorded.clear(),
                    SimEvent::StateChanged { from, to } => {
                        log::info!("{:?} -> {:?} at tick {}", from, to, sim.tick());
                    }
                    SimEvent::Died { tick } => log::info!("Died at tick {}", tick),
                    SimEvent::CheckpointReached {
                        progress,
                        committed: true,
                        ..
                    } => {
                        log::info!("Checkpoint {} committed", progress);
                        restart_from_checkpoint = true;
                    }
                    SimEvent::FinishReached {
                        destination,
                        advanced: true,
                    } => finished = Some(destination),
                    SimEvent::FinishReached {
                        advanced: false, ..
                    } => log::info!("Exit reached while recording; replay to advance"),
                    _ => {}
                }
            }

            check.observe(&sim);
        }

        if sim.loop_state() == LoopState::Inactive {
            if restart_from_checkpoint {
                restart_from_checkpoint = false;
                sim.start_game();
                stepper.reset();
                script = checkpoint_script();
            } else {
                break;
            }
        }
    }

    println!("Level '{}':", level.name);
    println!("  replayed ticks checked: {}", check.compared);
    println!("  checkpoint progress:    {}", sim.checkpoint_progress());
    println!("  attempts:               {}", sim.resets());
    match &finished {
        Some(destination) => println!("  finished, next level:   {}", destination),
        None => println!("  not finished (state {:?})", sim.loop_state()),
    }

    if let Some(tick) = check.diverged_at {
        bail!("replay diverged from the recording at tick {}", tick);
    }
    println!("Replay matched the recording.");
    Ok(())
}
