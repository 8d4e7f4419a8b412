#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Multi-factor score computation for the Reflex Grid engine.
//!
//! The engine is stateful across calls within a run: it tracks the rolling
//! reaction-time history used for the consistency bonus and the perfect-hit
//! streak used for the accuracy bonus. Misses zero every factor and break
//! the perfect streak but deliberately keep the reaction history intact.

use std::collections::VecDeque;

use reflex_core::{DifficultyPreset, GameMode, ScoreFactors};

/// Number of reaction-time samples retained for consistency scoring.
const REACTION_HISTORY: usize = 10;

/// Samples required before the consistency bonus activates.
const CONSISTENCY_MIN_SAMPLES: usize = 5;

/// Reaction time below which a hit counts toward the perfect streak.
const PERFECT_THRESHOLD_MS: f64 = 150.0;

/// Stateful per-run scoring engine.
#[derive(Debug, Default)]
pub struct Scoring {
    recent_reaction_times: VecDeque<f64>,
    perfect_streak: u32,
}

impl Scoring {
    /// Creates a scoring engine with empty per-run state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears all per-run state between runs.
    pub fn reset(&mut self) {
        self.recent_reaction_times.clear();
        self.perfect_streak = 0;
    }

    /// Current perfect-hit streak, exposed for display metrics.
    #[must_use]
    pub const fn perfect_streak(&self) -> u32 {
        self.perfect_streak
    }

    /// Computes the score factors for one resolved target.
    ///
    /// Misses and non-positive reaction times yield all-zero factors and
    /// reset the perfect streak; the rolling reaction history is preserved
    /// so consistency scoring survives an isolated mistake.
    pub fn calculate_score(
        &mut self,
        reaction_ms: f64,
        is_hit: bool,
        combo: u32,
        preset: DifficultyPreset,
        mode: GameMode,
    ) -> ScoreFactors {
        if !is_hit || reaction_ms <= 0.0 {
            self.perfect_streak = 0;
            return ScoreFactors::zero();
        }

        if self.recent_reaction_times.len() == REACTION_HISTORY {
            let _ = self.recent_reaction_times.pop_front();
        }
        self.recent_reaction_times.push_back(reaction_ms);

        if reaction_ms < PERFECT_THRESHOLD_MS {
            self.perfect_streak = self.perfect_streak.saturating_add(1);
        } else {
            self.perfect_streak = 0;
        }

        let base = base_score(reaction_ms);
        let combo_multiplier = combo_multiplier(combo);
        let accuracy_bonus = accuracy_bonus(self.perfect_streak);
        let consistency_bonus = consistency_bonus(&self.recent_reaction_times);
        let difficulty_multiplier = preset.score_multiplier();
        let mode_multiplier = mode.score_multiplier();

        let raw_total = base * combo_multiplier * difficulty_multiplier * mode_multiplier
            + accuracy_bonus
            + consistency_bonus;
        let total = raw_total.max(0.0).floor() as u64;

        ScoreFactors {
            base,
            combo_multiplier,
            accuracy_bonus,
            consistency_bonus,
            difficulty_multiplier,
            mode_multiplier,
            total,
        }
    }
}

/// Piecewise reaction-time curve mapping milliseconds to a base score.
fn base_score(reaction_ms: f64) -> f64 {
    if reaction_ms < 150.0 {
        100.0
    } else if reaction_ms <= 200.0 {
        100.0 - (reaction_ms - 150.0) / 50.0 * 20.0
    } else if reaction_ms <= 350.0 {
        80.0 - (reaction_ms - 200.0) / 150.0 * 30.0
    } else if reaction_ms <= 500.0 {
        50.0 - (reaction_ms - 350.0) / 150.0 * 25.0
    } else {
        (25.0 - (reaction_ms - 500.0) / 100.0 * 3.0).max(10.0)
    }
}

/// Step function mapping the current combo to its multiplier.
fn combo_multiplier(combo: u32) -> f64 {
    match combo {
        0..=2 => 1.0,
        3..=4 => 1.2,
        5..=9 => 1.5,
        10..=14 => 2.0,
        15..=19 => 2.5,
        20..=29 => 3.0,
        30..=39 => 3.5,
        40..=49 => 4.0,
        _ => 4.0 + ((combo - 50) as f64 / 25.0).min(2.0),
    }
}

/// Additive bonus earned from the perfect-hit streak.
fn accuracy_bonus(streak: u32) -> f64 {
    match streak {
        0..=2 => 0.0,
        3..=4 => 10.0 + f64::from(streak - 3) * 7.5,
        5..=9 => 25.0 + f64::from(streak - 5) * 15.0,
        _ => 100.0 + f64::from(streak - 10) * 20.0,
    }
}

/// Additive bonus earned from reaction-time consistency.
///
/// Requires at least five samples; tiers are keyed on the population
/// standard deviation of the retained history.
fn consistency_bonus(samples: &VecDeque<f64>) -> f64 {
    if samples.len() < CONSISTENCY_MIN_SAMPLES {
        return 0.0;
    }

    let count = samples.len() as f64;
    let mean = samples.iter().sum::<f64>() / count;
    let variance = samples
        .iter()
        .map(|sample| {
            let diff = sample - mean;
            diff * diff
        })
        .sum::<f64>()
        / count;
    let deviation = variance.sqrt();

    if deviation < 30.0 {
        50.0
    } else if deviation < 50.0 {
        30.0
    } else if deviation < 75.0 {
        15.0
    } else if deviation < 100.0 {
        5.0
    } else {
        0.0
    }
}
