#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative run-level state management for Reflex Grid.
//!
//! The world owns everything the highlight scheduler is forbidden to own:
//! the virtual clock, score, combo, lives, and the run lifecycle flags.
//! Adapters and systems mutate it exclusively through [`apply`], and the
//! world confirms every mutation by broadcasting [`Event`] values.

use std::time::Duration;

use reflex_core::{Command, DifficultyPreset, Event, GameMode, WELCOME_BANNER};

/// Represents the authoritative Reflex Grid run state.
#[derive(Debug)]
pub struct World {
    banner: &'static str,
    clock_ms: u64,
    score: u64,
    combo: u32,
    best_combo: u32,
    lives: u32,
    life_cap: u32,
    game_over: bool,
    paused: bool,
    ready: bool,
    mode: GameMode,
    preset: DifficultyPreset,
}

impl World {
    /// Creates a new world with no run in progress.
    #[must_use]
    pub fn new() -> Self {
        Self {
            banner: WELCOME_BANNER,
            clock_ms: 0,
            score: 0,
            combo: 0,
            best_combo: 0,
            lives: 0,
            life_cap: 0,
            game_over: true,
            paused: false,
            ready: false,
            mode: GameMode::Reflex,
            preset: DifficultyPreset::Medium,
        }
    }

    fn start_run(&mut self, mode: GameMode, preset: DifficultyPreset, out_events: &mut Vec<Event>) {
        let preset = match mode.forced_preset() {
            Some(forced) => forced,
            None => preset,
        };
        self.score = 0;
        self.combo = 0;
        self.best_combo = 0;
        self.lives = mode.initial_lives();
        self.life_cap = mode.initial_lives();
        self.game_over = false;
        self.paused = false;
        self.ready = true;
        self.mode = mode;
        self.preset = preset;
        out_events.push(Event::RunStarted {
            mode,
            preset,
            at_ms: self.clock_ms,
        });
    }

    fn advance_clock(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        let millis = u64::try_from(dt.as_millis()).unwrap_or(u64::MAX);
        self.clock_ms = self.clock_ms.saturating_add(millis);
        out_events.push(Event::TimeAdvanced {
            now_ms: self.clock_ms,
            dt,
        });
    }

    fn decrement_lives(&mut self, out_events: &mut Vec<Event>) {
        if self.game_over {
            return;
        }
        self.lives = self.lives.saturating_sub(1);
        out_events.push(Event::LivesChanged { lives: self.lives });
        if self.lives == 0 {
            self.game_over = true;
            out_events.push(Event::RunEnded {
                at_ms: self.clock_ms,
            });
        }
    }

    fn grant_life(&mut self, out_events: &mut Vec<Event>) {
        if self.game_over || !self.mode.allows_healing() {
            return;
        }
        if self.lives < self.life_cap {
            self.lives += 1;
            out_events.push(Event::LivesChanged { lives: self.lives });
        }
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::StartRun { mode, preset } => world.start_run(mode, preset, out_events),
        Command::Tick { dt } => world.advance_clock(dt, out_events),
        Command::Press { cell } => {
            if !world.game_over && !world.paused {
                out_events.push(Event::PressRegistered {
                    cell,
                    at_ms: world.clock_ms,
                });
            }
        }
        Command::SetInputReady { ready } => {
            if world.ready != ready {
                world.ready = ready;
                out_events.push(Event::InputReadyChanged { ready });
            }
        }
        Command::PauseRun => {
            if !world.paused && !world.game_over {
                world.paused = true;
                out_events.push(Event::RunPaused {
                    at_ms: world.clock_ms,
                });
            }
        }
        Command::ResumeRun => {
            if world.paused {
                world.paused = false;
                out_events.push(Event::RunResumed {
                    at_ms: world.clock_ms,
                });
            }
        }
        Command::SwitchMode { mode } => {
            if world.mode != mode {
                world.mode = mode;
                if let Some(forced) = mode.forced_preset() {
                    world.preset = forced;
                }
                out_events.push(Event::ModeChanged { mode });
            }
        }
        Command::AddScore { points } => {
            world.score = world.score.saturating_add(points);
            out_events.push(Event::ScoreChanged { score: world.score });
        }
        Command::IncrementCombo => {
            world.combo = world.combo.saturating_add(1);
            world.best_combo = world.best_combo.max(world.combo);
            out_events.push(Event::ComboChanged { combo: world.combo });
        }
        Command::ResetCombo => {
            world.combo = 0;
            out_events.push(Event::ComboChanged { combo: 0 });
        }
        Command::DecrementLives => world.decrement_lives(out_events),
        Command::GrantLife => world.grant_life(out_events),
        Command::EndRun => {
            if !world.game_over {
                world.game_over = true;
                out_events.push(Event::RunEnded {
                    at_ms: world.clock_ms,
                });
            }
        }
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use super::World;
    use reflex_core::RunView;

    /// Retrieves the welcome banner that adapters may display to players.
    #[must_use]
    pub fn welcome_banner(world: &World) -> &'static str {
        world.banner
    }

    /// Captures a read-only copy of the run-level state.
    #[must_use]
    pub fn run_view(world: &World) -> RunView {
        RunView {
            score: world.score,
            combo: world.combo,
            best_combo: world.best_combo,
            lives: world.lives,
            game_over: world.game_over,
            paused: world.paused,
            ready: world.ready,
            mode: world.mode,
            preset: world.preset,
            now_ms: world.clock_ms,
        }
    }

    /// Current virtual clock reading in milliseconds.
    #[must_use]
    pub fn now_ms(world: &World) -> u64 {
        world.clock_ms
    }
}
