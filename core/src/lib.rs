#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Reflex Grid engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative run state, and the gameplay systems. Adapters submit
//! [`Command`] values describing desired mutations, the world executes those
//! commands via its `apply` entry point, and then broadcasts [`Event`] values
//! for systems to react to deterministically. The highlight scheduler
//! consumes the event stream, drives its round state machine, and responds
//! exclusively with new command batches and presentation events.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Canonical banner emitted when the experience boots.
pub const WELCOME_BANNER: &str = "Welcome to Reflex Grid.";

/// Number of addressable cells in the target grid.
pub const CELL_COUNT: u8 = 10;

/// Row spans of the fixed 3-4-3 target grid, expressed as raw cell ids.
///
/// Only the pattern generator interprets this geometry; every other
/// component treats cell ids as opaque.
pub const GRID_ROWS: [&[u8]; 3] = [&[1, 2, 3], &[4, 5, 6, 7], &[8, 9, 10]];

/// Identifier of a single addressable target cell, always within `1..=10`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellId(u8);

impl CellId {
    /// Creates a cell identifier, rejecting values outside the fixed grid.
    #[must_use]
    pub const fn new(value: u8) -> Option<Self> {
        if value >= 1 && value <= CELL_COUNT {
            Some(Self(value))
        } else {
            None
        }
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u8 {
        self.0
    }

    /// Enumerates every cell id on the grid in ascending order.
    #[must_use]
    pub fn all() -> [CellId; CELL_COUNT as usize] {
        let mut cells = [CellId(1); CELL_COUNT as usize];
        let mut value = 1;
        for slot in &mut cells {
            *slot = CellId(value);
            value += 1;
        }
        cells
    }
}

/// Gameplay modes selectable for a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameMode {
    /// Standard reflex mode: hit every highlighted target before the deadline.
    Reflex,
    /// Single-life endurance mode without healing.
    Survival,
    /// Hardest mode; selecting it forces the nightmare preset.
    Nightmare,
    /// Exactly one highlighted target is correct; the rest are decoys.
    OddOneOut,
    /// Memory-recall mode with an independent timing scheme. The highlight
    /// scheduler never arms rounds while this mode is active.
    Sequence,
}

impl GameMode {
    /// Flat score multiplier rewarded for playing the mode.
    #[must_use]
    pub const fn score_multiplier(self) -> f64 {
        match self {
            Self::Reflex => 1.0,
            Self::Survival => 1.2,
            Self::Nightmare => 1.4,
            Self::OddOneOut => 1.1,
            Self::Sequence => 0.9,
        }
    }

    /// Number of lives granted when a run starts in this mode.
    #[must_use]
    pub const fn initial_lives(self) -> u32 {
        match self {
            Self::Survival => 1,
            _ => 3,
        }
    }

    /// Reports whether bonus targets may restore lives in this mode.
    #[must_use]
    pub const fn allows_healing(self) -> bool {
        !matches!(self, Self::Survival)
    }

    /// Preset the mode forces for the run, if any.
    #[must_use]
    pub const fn forced_preset(self) -> Option<DifficultyPreset> {
        match self {
            Self::Nightmare => Some(DifficultyPreset::Nightmare),
            _ => None,
        }
    }
}

/// Named difficulty presets selectable before a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DifficultyPreset {
    /// Generous timing with few simultaneous targets.
    Easy,
    /// Baseline timing and target counts.
    Medium,
    /// Tight timing with larger target sets.
    Hard,
    /// Shortest deadlines and the widest target-count ceiling.
    Nightmare,
}

impl DifficultyPreset {
    /// Static timing and target-count configuration for the preset.
    #[must_use]
    pub const fn config(self) -> PresetConfig {
        match self {
            Self::Easy => PresetConfig::new(2_500, 1_200, 3, 0.5, 2),
            Self::Medium => PresetConfig::new(2_000, 900, 4, 0.75, 2),
            Self::Hard => PresetConfig::new(1_600, 700, 5, 1.0, 3),
            Self::Nightmare => PresetConfig::new(1_200, 500, 6, 1.25, 4),
        }
    }

    /// Flat score multiplier rewarded for choosing the preset.
    #[must_use]
    pub const fn score_multiplier(self) -> f64 {
        match self {
            Self::Easy => 0.8,
            Self::Medium => 1.0,
            Self::Hard => 1.3,
            Self::Nightmare => 1.6,
        }
    }
}

/// Static configuration supplied by a difficulty preset.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PresetConfig {
    base_duration_ms: u32,
    min_duration_ms: u32,
    max_simultaneous_targets: u32,
    ramp_rate: f32,
    multi_hit_requirement: u8,
}

impl PresetConfig {
    /// Creates a preset configuration with explicit values.
    #[must_use]
    pub const fn new(
        base_duration_ms: u32,
        min_duration_ms: u32,
        max_simultaneous_targets: u32,
        ramp_rate: f32,
        multi_hit_requirement: u8,
    ) -> Self {
        Self {
            base_duration_ms,
            min_duration_ms,
            max_simultaneous_targets,
            ramp_rate,
            multi_hit_requirement,
        }
    }

    /// Round duration granted at combo zero before adaptive scaling.
    #[must_use]
    pub const fn base_duration_ms(&self) -> u32 {
        self.base_duration_ms
    }

    /// Hard floor for the round duration regardless of combo or multiplier.
    #[must_use]
    pub const fn min_duration_ms(&self) -> u32 {
        self.min_duration_ms
    }

    /// Largest simultaneous target count before adaptive scaling.
    #[must_use]
    pub const fn max_simultaneous_targets(&self) -> u32 {
        self.max_simultaneous_targets
    }

    /// Combo-driven escalation rate for the simultaneous target count.
    #[must_use]
    pub const fn ramp_rate(&self) -> f32 {
        self.ramp_rate
    }

    /// Hit count assigned to targets selected for multi-hit duty.
    #[must_use]
    pub const fn multi_hit_requirement(&self) -> u8 {
        self.multi_hit_requirement
    }
}

/// Geometric shape kinds produced by the pattern generator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShapeKind {
    /// Uniformly random cells with no geometric identity.
    Random,
    /// Small blob of adjacent cells.
    Cluster,
    /// Cells hugging one corner of the grid.
    Corner,
    /// One full row of the 3-4-3 layout.
    HorizontalLine,
    /// Column sweep travelling left to right.
    SweepRight,
    /// Column sweep travelling right to left.
    SweepLeft,
    /// One of the eight tabled L arrangements.
    LShape,
    /// One of the tabled T arrangements.
    TShape,
    /// Plus-shaped arrangement centred on the middle row.
    Cross,
}

impl ShapeKind {
    /// Fixed score multiplier attached to patterns of this kind.
    #[must_use]
    pub const fn score_bonus(self) -> f64 {
        match self {
            Self::Random => 1.0,
            Self::Cluster => 1.1,
            Self::Corner => 1.15,
            Self::HorizontalLine => 1.2,
            Self::SweepRight | Self::SweepLeft => 1.25,
            Self::LShape | Self::TShape => 1.3,
            Self::Cross => 1.4,
        }
    }

    /// Recognizable shapes are returned exactly as tabled and never trimmed,
    /// padded, or filtered, because altering them would destroy their visual
    /// identity.
    #[must_use]
    pub const fn is_recognizable(self) -> bool {
        matches!(self, Self::LShape | Self::TShape | Self::Cross)
    }
}

/// Immutable target arrangement produced by the pattern generator and
/// consumed once by the scheduler for the round it was generated for.
#[derive(Clone, Debug, PartialEq)]
pub struct Pattern {
    kind: ShapeKind,
    targets: Vec<CellId>,
    bonus_target: Option<CellId>,
}

impl Pattern {
    /// Creates a pattern from a shape kind and its ordered target cells.
    #[must_use]
    pub fn new(kind: ShapeKind, targets: Vec<CellId>, bonus_target: Option<CellId>) -> Self {
        Self {
            kind,
            targets,
            bonus_target,
        }
    }

    /// Shape kind the pattern was instantiated from.
    #[must_use]
    pub const fn kind(&self) -> ShapeKind {
        self.kind
    }

    /// Ordered target cells composing the pattern. Never empty.
    #[must_use]
    pub fn targets(&self) -> &[CellId] {
        &self.targets
    }

    /// Score multiplier granted for clearing the pattern, always ≥ 1.0.
    #[must_use]
    pub fn score_bonus(&self) -> f64 {
        self.kind.score_bonus()
    }

    /// Bonus cell embedded in the pattern, if one was requested.
    #[must_use]
    pub const fn bonus_target(&self) -> Option<CellId> {
        self.bonus_target
    }
}

/// Outcome of a single round resolution reported to the difficulty
/// controller and the scoring engine.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Outcome {
    /// Clock timestamp at which the outcome was resolved.
    pub timestamp_ms: u64,
    /// Reaction time for hits; `None` for misses.
    pub reaction_ms: Option<f64>,
    /// Whether the outcome was a hit.
    pub is_hit: bool,
}

impl Outcome {
    /// Creates a hit outcome with the measured reaction time.
    #[must_use]
    pub const fn hit(timestamp_ms: u64, reaction_ms: f64) -> Self {
        Self {
            timestamp_ms,
            reaction_ms: Some(reaction_ms),
            is_hit: true,
        }
    }

    /// Creates a miss outcome.
    #[must_use]
    pub const fn miss(timestamp_ms: u64) -> Self {
        Self {
            timestamp_ms,
            reaction_ms: None,
            is_hit: false,
        }
    }
}

/// Multiplicative and additive factors composing one hit's score.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoreFactors {
    /// Base score derived from the reaction-time curve.
    pub base: f64,
    /// Step multiplier derived from the current combo.
    pub combo_multiplier: f64,
    /// Additive bonus earned from the perfect-hit streak.
    pub accuracy_bonus: f64,
    /// Additive bonus earned from reaction-time consistency.
    pub consistency_bonus: f64,
    /// Flat multiplier rewarded for the chosen difficulty preset.
    pub difficulty_multiplier: f64,
    /// Flat multiplier rewarded for the active game mode.
    pub mode_multiplier: f64,
    /// Floored total awarded for the hit.
    pub total: u64,
}

impl ScoreFactors {
    /// Factors describing a miss: every component is zero.
    #[must_use]
    pub const fn zero() -> Self {
        Self {
            base: 0.0,
            combo_multiplier: 0.0,
            accuracy_bonus: 0.0,
            consistency_bonus: 0.0,
            difficulty_multiplier: 0.0,
            mode_multiplier: 0.0,
            total: 0,
        }
    }
}

/// Display classification of the current run temperature.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ComboRating {
    /// No streak worth mentioning.
    Cold,
    /// A streak is forming.
    Warm,
    /// Sustained accurate play.
    Hot,
    /// Long streak with fast reactions.
    Blazing,
    /// The rating ceiling.
    Legendary,
}

/// Reasons a round resolved as a miss.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MissReason {
    /// The deadline fired with targets still active.
    Timeout,
    /// A press landed on a cell outside the active set.
    WrongPress,
}

/// State of a single active target within a live round.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TargetState {
    /// Cell occupied by the target.
    pub cell: CellId,
    /// Presses required before the target clears.
    pub required_hits: u8,
    /// Presses registered so far.
    pub hits: u8,
}

impl TargetState {
    /// Creates a fresh target with the provided hit requirement.
    #[must_use]
    pub const fn new(cell: CellId, required_hits: u8) -> Self {
        Self {
            cell,
            required_hits,
            hits: 0,
        }
    }

    /// Presses still required before the target clears.
    #[must_use]
    pub const fn remaining_hits(&self) -> u8 {
        self.required_hits.saturating_sub(self.hits)
    }
}

/// Read-only projection of the scheduler's live round, regenerated on every
/// mutation for the rendering layer.
#[derive(Clone, Debug, PartialEq)]
pub struct RoundSnapshot {
    /// Targets still active in the round.
    pub targets: Vec<TargetState>,
    /// Unique correct target in odd-one-out rounds.
    pub odd_one_out: Option<CellId>,
    /// Bonus target that restores a life when hit.
    pub bonus_target: Option<CellId>,
    /// Clock timestamp at which the round was armed.
    pub started_at_ms: u64,
    /// Deadline window granted to the round.
    pub duration_ms: u32,
    /// Shape kind backing the round, if a pattern was used.
    pub shape: Option<ShapeKind>,
    /// Score multiplier applied to hits within the round.
    pub score_bonus: f64,
}

/// Read-only copy of the run-level state consumed by systems each frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RunView {
    /// Accumulated score for the run.
    pub score: u64,
    /// Consecutive-hit counter; resets to zero on any miss.
    pub combo: u32,
    /// Highest combo reached during the run.
    pub best_combo: u32,
    /// Remaining lives.
    pub lives: u32,
    /// Whether the run has ended.
    pub game_over: bool,
    /// Whether the run is paused.
    pub paused: bool,
    /// Whether the input layer is ready for rounds to arm.
    pub ready: bool,
    /// Active gameplay mode.
    pub mode: GameMode,
    /// Difficulty preset selected for the run.
    pub preset: DifficultyPreset,
    /// Current virtual clock reading.
    pub now_ms: u64,
}

/// Commands that express all permissible run-state mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Starts a fresh run with the provided mode and preset.
    StartRun {
        /// Gameplay mode for the run.
        mode: GameMode,
        /// Difficulty preset; overridden when the mode forces one.
        preset: DifficultyPreset,
    },
    /// Advances the virtual clock by the provided delta time.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Reports a press from the input collaborator.
    Press {
        /// Cell the press landed on.
        cell: CellId,
    },
    /// Reports whether the input collaborator is ready to deliver presses.
    SetInputReady {
        /// Readiness flag published by the input layer.
        ready: bool,
    },
    /// Suspends round arming and deadline effects.
    PauseRun,
    /// Resumes a paused run.
    ResumeRun,
    /// Switches the active gameplay mode mid-run.
    SwitchMode {
        /// Mode to activate.
        mode: GameMode,
    },
    /// Adds points produced by the scoring engine to the running total.
    AddScore {
        /// Points to add.
        points: u64,
    },
    /// Increments the consecutive-hit counter.
    IncrementCombo,
    /// Resets the consecutive-hit counter to zero.
    ResetCombo,
    /// Removes one life; ends the run when none remain.
    DecrementLives,
    /// Restores one life up to the mode's cap; ignored where healing is
    /// disabled.
    GrantLife,
    /// Ends the run immediately.
    EndRun,
}

/// Events broadcast by the world and the scheduler after processing
/// commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that the virtual clock advanced.
    TimeAdvanced {
        /// Clock reading after the advance.
        now_ms: u64,
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Confirms that a fresh run started.
    RunStarted {
        /// Mode active for the run.
        mode: GameMode,
        /// Preset active for the run.
        preset: DifficultyPreset,
        /// Clock reading at the start.
        at_ms: u64,
    },
    /// Announces a change in input-layer readiness.
    InputReadyChanged {
        /// Readiness flag after the change.
        ready: bool,
    },
    /// Confirms that the run paused.
    RunPaused {
        /// Clock reading at the pause.
        at_ms: u64,
    },
    /// Confirms that the run resumed.
    RunResumed {
        /// Clock reading at the resume.
        at_ms: u64,
    },
    /// Announces that the run ended.
    RunEnded {
        /// Clock reading at the end.
        at_ms: u64,
    },
    /// Announces a mid-run mode switch.
    ModeChanged {
        /// Mode that became active.
        mode: GameMode,
    },
    /// Confirms that a press reached the engine.
    PressRegistered {
        /// Cell the press landed on.
        cell: CellId,
        /// Clock reading when the press was registered.
        at_ms: u64,
    },
    /// Reports the new running score.
    ScoreChanged {
        /// Score after the change.
        score: u64,
    },
    /// Reports the new combo counter.
    ComboChanged {
        /// Combo after the change.
        combo: u32,
    },
    /// Reports the new life count.
    LivesChanged {
        /// Lives after the change.
        lives: u32,
    },
    /// Publishes a freshly armed round for rendering.
    RoundArmed {
        /// Projection of the armed round.
        round: RoundSnapshot,
    },
    /// Announces that the live round was cleared or torn down.
    RoundCleared {
        /// Clock reading at the clear.
        at_ms: u64,
    },
    /// Reports partial progress on a multi-hit target.
    TargetStruck {
        /// Cell that was struck.
        cell: CellId,
        /// Presses still required before the target clears.
        remaining_hits: u8,
    },
    /// Reports a fully cleared target.
    TargetHit {
        /// Cell that cleared.
        cell: CellId,
        /// Reaction time measured from the round start.
        reaction_ms: f64,
        /// Points awarded for the hit.
        points: u64,
    },
    /// Reports that the bonus target was collected.
    BonusCollected {
        /// Cell that carried the bonus.
        cell: CellId,
    },
    /// Reports that the round resolved as a miss.
    RoundMissed {
        /// Why the round missed.
        reason: MissReason,
        /// Offending cell for wrong presses.
        cell: Option<CellId>,
    },
    /// Announces a combo-rating tier transition.
    RatingChanged {
        /// Tier that became active.
        rating: ComboRating,
    },
}
