#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Feedback control loop that nudges run difficulty from rolling metrics.
//!
//! The controller consumes the outcome stream reported by the highlight
//! scheduler and re-evaluates a difficulty multiplier on a fixed virtual
//! clock cadence. Misses additionally trigger an immediate hard relief so a
//! mistake is felt at once rather than at the next tick. The controller is
//! deliberately non-fatal: querying it in any state returns the last known
//! multiplier instead of erroring.

use std::collections::VecDeque;

use reflex_core::{DifficultyPreset, Event, Outcome};

/// Interval between control-loop re-evaluations.
const TICK_INTERVAL_MS: u64 = 3_000;

/// Capacity of the rolling outcome window.
const WINDOW_SIZE: usize = 15;

/// Outcomes required before a tick may adjust the multiplier.
const MIN_SAMPLES_BEFORE_ADJUSTMENT: usize = 3;

/// Largest adjustment a single tick may apply in either direction.
const MAX_CHANGE_PER_TICK: f64 = 0.15;

/// Rate at which the multiplier decays toward 1.0 each tick.
const DECAY_RATE: f64 = 0.05;

/// Multiplier applied immediately after any miss, before clamping.
const MISS_RELIEF_MULTIPLIER: f64 = 0.7;

/// Per-miss penalty applied once the miss streak reaches two.
const MISS_STREAK_PENALTY: f64 = 0.08;

/// Flat penalty applied when windowed accuracy collapses below one half.
const LOW_ACCURACY_PENALTY: f64 = 0.1;

/// Samples required before the low-accuracy penalty may apply.
const LOW_ACCURACY_MIN_SAMPLES: usize = 5;

/// Weight of each new hit in the baseline reaction-time moving average.
const BASELINE_EMA_WEIGHT: f64 = 0.1;

/// Preset-specific control parameters.
///
/// Easier presets use a lower target accuracy and a higher sensitivity so
/// they correct faster, and a smaller ceiling so beginners are never pushed
/// far beyond the preset's static difficulty.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AdaptiveProfile {
    target_accuracy: f64,
    sensitivity: f64,
    floor: f64,
    ceiling: f64,
}

impl AdaptiveProfile {
    /// Control parameters tuned for the provided preset.
    #[must_use]
    pub const fn for_preset(preset: DifficultyPreset) -> Self {
        match preset {
            DifficultyPreset::Easy => Self {
                target_accuracy: 0.60,
                sensitivity: 0.5,
                floor: 0.3,
                ceiling: 1.1,
            },
            DifficultyPreset::Medium => Self {
                target_accuracy: 0.70,
                sensitivity: 0.4,
                floor: 0.3,
                ceiling: 1.2,
            },
            DifficultyPreset::Hard => Self {
                target_accuracy: 0.75,
                sensitivity: 0.35,
                floor: 0.3,
                ceiling: 1.3,
            },
            DifficultyPreset::Nightmare => Self {
                target_accuracy: 0.80,
                sensitivity: 0.3,
                floor: 0.3,
                ceiling: 1.4,
            },
        }
    }

    /// Smallest multiplier the profile permits.
    #[must_use]
    pub const fn floor(&self) -> f64 {
        self.floor
    }

    /// Largest multiplier the profile permits.
    #[must_use]
    pub const fn ceiling(&self) -> f64 {
        self.ceiling
    }

    fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.floor, self.ceiling)
    }
}

/// Windowed metrics captured alongside every adjustment.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MetricsSnapshot {
    /// Hit ratio across the rolling window.
    pub accuracy: f64,
    /// Mean reaction time over hits in the window, when any exist.
    pub avg_reaction_ms: Option<f64>,
    /// Number of outcomes in the window at the time of the tick.
    pub samples: usize,
}

/// One entry of the controller's append-only change log.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AdjustmentRecord {
    /// Clock reading when the tick fired.
    pub timestamp_ms: u64,
    /// Multiplier after the tick was applied.
    pub multiplier: f64,
    /// Clamped adjustment the tick contributed, excluding decay.
    pub adjustment: f64,
    /// Metrics the adjustment was derived from.
    pub metrics: MetricsSnapshot,
}

/// Per-run adaptive difficulty controller.
#[derive(Debug)]
pub struct AdaptiveDifficulty {
    profile: AdaptiveProfile,
    running: bool,
    multiplier: f64,
    window: VecDeque<Outcome>,
    miss_streak: u32,
    baseline_reaction_ms: Option<f64>,
    next_tick_at_ms: Option<u64>,
    change_log: Vec<AdjustmentRecord>,
}

impl AdaptiveDifficulty {
    /// Creates a stopped controller tuned for the provided preset.
    #[must_use]
    pub fn new(preset: DifficultyPreset) -> Self {
        Self {
            profile: AdaptiveProfile::for_preset(preset),
            running: false,
            multiplier: 1.0,
            window: VecDeque::with_capacity(WINDOW_SIZE),
            miss_streak: 0,
            baseline_reaction_ms: None,
            next_tick_at_ms: None,
            change_log: Vec::new(),
        }
    }

    /// Profile the controller is currently tuned with.
    #[must_use]
    pub const fn profile(&self) -> &AdaptiveProfile {
        &self.profile
    }

    /// Begins the periodic re-evaluation loop. Idempotent.
    pub fn start(&mut self, now_ms: u64) {
        if self.running {
            return;
        }
        self.running = true;
        self.next_tick_at_ms = Some(now_ms.saturating_add(TICK_INTERVAL_MS));
    }

    /// Halts the periodic loop without discarding state. Idempotent.
    pub fn stop(&mut self) {
        self.running = false;
        self.next_tick_at_ms = None;
    }

    /// Restores the controller to its run-start state for the given preset.
    pub fn reset(&mut self, preset: DifficultyPreset) {
        self.profile = AdaptiveProfile::for_preset(preset);
        self.running = false;
        self.multiplier = 1.0;
        self.window.clear();
        self.miss_streak = 0;
        self.baseline_reaction_ms = None;
        self.next_tick_at_ms = None;
        self.change_log.clear();
    }

    /// Current difficulty multiplier. Safe to query in any state.
    #[must_use]
    pub const fn multiplier(&self) -> f64 {
        self.multiplier
    }

    /// Append-only record of every tick adjustment, for post-run diagnostics.
    #[must_use]
    pub fn change_log(&self) -> &[AdjustmentRecord] {
        &self.change_log
    }

    /// Records one hit or miss outcome reported by the scheduler.
    ///
    /// Misses apply the hard relief immediately, overriding whatever the
    /// tick loop last computed; the next tick operates on the post-relief
    /// value.
    pub fn record_outcome(&mut self, outcome: Outcome) {
        if self.window.len() == WINDOW_SIZE {
            let _ = self.window.pop_front();
        }
        self.window.push_back(outcome);

        if outcome.is_hit {
            self.miss_streak = 0;
            if let Some(reaction) = outcome.reaction_ms {
                self.baseline_reaction_ms = Some(match self.baseline_reaction_ms {
                    Some(baseline) => baseline + BASELINE_EMA_WEIGHT * (reaction - baseline),
                    None => reaction,
                });
            }
        } else {
            self.miss_streak = self.miss_streak.saturating_add(1);
            self.multiplier = self.profile.clamp(MISS_RELIEF_MULTIPLIER);
        }
    }

    /// Consumes world events to drive the periodic re-evaluation.
    pub fn handle(&mut self, events: &[Event]) {
        for event in events {
            match event {
                Event::TimeAdvanced { now_ms, .. } => self.advance_to(*now_ms),
                Event::RunStarted { preset, at_ms, .. } => {
                    self.reset(*preset);
                    self.start(*at_ms);
                }
                Event::RunPaused { .. } => self.stop(),
                Event::RunResumed { at_ms } => self.start(*at_ms),
                Event::RunEnded { .. } => self.stop(),
                _ => {}
            }
        }
    }

    fn advance_to(&mut self, now_ms: u64) {
        if !self.running {
            return;
        }
        let Some(due) = self.next_tick_at_ms else {
            return;
        };
        if now_ms < due {
            return;
        }
        self.tick(now_ms);
        self.next_tick_at_ms = Some(now_ms.saturating_add(TICK_INTERVAL_MS));
    }

    fn tick(&mut self, now_ms: u64) {
        if self.window.len() < MIN_SAMPLES_BEFORE_ADJUSTMENT {
            return;
        }

        let samples = self.window.len();
        let hits = self.window.iter().filter(|outcome| outcome.is_hit).count();
        let accuracy = hits as f64 / samples as f64;
        let avg_reaction_ms = average_hit_reaction(&self.window);

        let accuracy_diff = accuracy - self.profile.target_accuracy;
        // Under-performing players are corrected twice as aggressively as
        // over-performing ones.
        let weight = if accuracy_diff < 0.0 { 4.0 } else { 2.0 };
        let mut adjustment = accuracy_diff * self.profile.sensitivity * weight;

        if let (Some(baseline), Some(avg)) = (self.baseline_reaction_ms, avg_reaction_ms) {
            if baseline > 0.0 {
                adjustment += (baseline - avg) / baseline * self.profile.sensitivity;
            }
        }

        if self.miss_streak >= 2 {
            adjustment -= MISS_STREAK_PENALTY * f64::from(self.miss_streak - 1);
        }
        if accuracy < 0.5 && samples >= LOW_ACCURACY_MIN_SAMPLES {
            adjustment -= LOW_ACCURACY_PENALTY;
        }

        adjustment = adjustment.clamp(-MAX_CHANGE_PER_TICK, MAX_CHANGE_PER_TICK);
        let decay = (1.0 - self.multiplier) * DECAY_RATE;
        self.multiplier = self.profile.clamp(self.multiplier + adjustment + decay);

        self.change_log.push(AdjustmentRecord {
            timestamp_ms: now_ms,
            multiplier: self.multiplier,
            adjustment,
            metrics: MetricsSnapshot {
                accuracy,
                avg_reaction_ms,
                samples,
            },
        });
    }
}

fn average_hit_reaction(window: &VecDeque<Outcome>) -> Option<f64> {
    let mut total = 0.0;
    let mut count = 0usize;
    for outcome in window {
        if let (true, Some(reaction)) = (outcome.is_hit, outcome.reaction_ms) {
            total += reaction;
            count += 1;
        }
    }
    if count == 0 {
        None
    } else {
        Some(total / count as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn time_advanced(now_ms: u64) -> Event {
        Event::TimeAdvanced {
            now_ms,
            dt: Duration::from_millis(16),
        }
    }

    fn running_controller(preset: DifficultyPreset) -> AdaptiveDifficulty {
        let mut controller = AdaptiveDifficulty::new(preset);
        controller.start(0);
        controller
    }

    #[test]
    fn multiplier_defaults_to_unity_before_start() {
        let controller = AdaptiveDifficulty::new(DifficultyPreset::Medium);
        assert_eq!(controller.multiplier(), 1.0);
    }

    #[test]
    fn any_miss_applies_the_hard_relief_immediately() {
        let mut controller = running_controller(DifficultyPreset::Medium);
        controller.multiplier = 1.15;
        controller.record_outcome(Outcome::miss(100));
        assert_eq!(controller.multiplier(), 0.7);

        controller.multiplier = 0.4;
        controller.record_outcome(Outcome::miss(200));
        assert_eq!(controller.multiplier(), 0.7);
    }

    #[test]
    fn relief_clamps_into_the_profile_bounds() {
        let mut controller = running_controller(DifficultyPreset::Easy);
        controller.record_outcome(Outcome::miss(50));
        let profile = *controller.profile();
        assert!(controller.multiplier() >= profile.floor());
        assert!(controller.multiplier() <= profile.ceiling());
        assert_eq!(controller.multiplier(), 0.7);
    }

    #[test]
    fn ticks_wait_for_the_minimum_sample_count() {
        let mut controller = running_controller(DifficultyPreset::Medium);
        controller.record_outcome(Outcome::hit(10, 180.0));
        controller.record_outcome(Outcome::hit(20, 190.0));
        controller.handle(&[time_advanced(TICK_INTERVAL_MS)]);
        assert_eq!(controller.multiplier(), 1.0);
        assert!(controller.change_log().is_empty());
    }

    #[test]
    fn fast_accurate_play_raises_the_multiplier() {
        let mut controller = running_controller(DifficultyPreset::Medium);
        for index in 0..6u32 {
            controller.record_outcome(Outcome::hit(u64::from(index) * 100, 120.0));
        }
        controller.handle(&[time_advanced(TICK_INTERVAL_MS)]);
        assert!(controller.multiplier() > 1.0);
        assert_eq!(controller.change_log().len(), 1);
    }

    #[test]
    fn poor_accuracy_lowers_the_multiplier_faster_than_good_play_raises_it() {
        // Accuracy 0.8 sits 0.10 above the medium target of 0.70.
        let mut strong = running_controller(DifficultyPreset::Medium);
        for index in 0..3u64 {
            strong.record_outcome(Outcome::miss(index));
        }
        for index in 0..12u64 {
            strong.record_outcome(Outcome::hit(100 + index, 250.0));
        }
        strong.multiplier = 1.0;
        strong.handle(&[time_advanced(TICK_INTERVAL_MS)]);
        let gain = strong.multiplier() - 1.0;

        // Accuracy 0.6 sits 0.10 below target, the mirror image.
        let mut weak = running_controller(DifficultyPreset::Medium);
        for index in 0..6u64 {
            weak.record_outcome(Outcome::miss(index));
        }
        for index in 0..9u64 {
            weak.record_outcome(Outcome::hit(100 + index, 250.0));
        }
        weak.multiplier = 1.0;
        weak.handle(&[time_advanced(TICK_INTERVAL_MS)]);
        let drop = 1.0 - weak.multiplier();

        assert!((gain - 0.08).abs() < 1e-9);
        assert!((drop - 0.15).abs() < 1e-9);
        assert!(drop > gain);
    }

    #[test]
    fn multiplier_stays_within_bounds_for_any_outcome_sequence() {
        let mut controller = running_controller(DifficultyPreset::Nightmare);
        let profile = *controller.profile();
        let mut clock = 0u64;
        for index in 0..200u64 {
            clock += 400;
            if index % 3 == 0 {
                controller.record_outcome(Outcome::miss(clock));
            } else {
                controller.record_outcome(Outcome::hit(clock, 80.0 + (index % 7) as f64 * 60.0));
            }
            controller.handle(&[time_advanced(clock)]);
            assert!(controller.multiplier() >= profile.floor());
            assert!(controller.multiplier() <= profile.ceiling());
        }
    }

    #[test]
    fn baseline_seeds_from_the_first_hit_then_moves_slowly() {
        let mut controller = running_controller(DifficultyPreset::Medium);
        controller.record_outcome(Outcome::hit(10, 200.0));
        assert_eq!(controller.baseline_reaction_ms, Some(200.0));
        controller.record_outcome(Outcome::hit(20, 300.0));
        assert_eq!(controller.baseline_reaction_ms, Some(210.0));
    }

    #[test]
    fn miss_streak_penalty_deepens_the_correction() {
        let mut single = running_controller(DifficultyPreset::Medium);
        for index in 0..4u64 {
            single.record_outcome(Outcome::hit(index, 250.0));
        }
        single.record_outcome(Outcome::miss(100));
        single.handle(&[time_advanced(TICK_INTERVAL_MS)]);
        let single_result = single.multiplier();

        let mut streaky = running_controller(DifficultyPreset::Medium);
        for index in 0..4u64 {
            streaky.record_outcome(Outcome::hit(index, 250.0));
        }
        streaky.record_outcome(Outcome::miss(100));
        streaky.record_outcome(Outcome::miss(200));
        streaky.record_outcome(Outcome::miss(300));
        streaky.handle(&[time_advanced(TICK_INTERVAL_MS)]);

        assert!(streaky.multiplier() <= single_result);
    }

    #[test]
    fn start_and_stop_are_idempotent() {
        let mut controller = AdaptiveDifficulty::new(DifficultyPreset::Medium);
        controller.start(0);
        let scheduled = controller.next_tick_at_ms;
        controller.start(2_500);
        assert_eq!(controller.next_tick_at_ms, scheduled);

        controller.stop();
        controller.stop();
        assert!(controller.next_tick_at_ms.is_none());
    }

    #[test]
    fn run_started_event_resets_and_starts_the_loop() {
        let mut controller = AdaptiveDifficulty::new(DifficultyPreset::Medium);
        controller.multiplier = 0.5;
        controller.record_outcome(Outcome::miss(5));
        controller.handle(&[Event::RunStarted {
            mode: reflex_core::GameMode::Reflex,
            preset: DifficultyPreset::Hard,
            at_ms: 1_000,
        }]);
        assert_eq!(controller.multiplier(), 1.0);
        assert!(controller.window.is_empty());
        assert_eq!(controller.profile(), &AdaptiveProfile::for_preset(DifficultyPreset::Hard));
        assert!(controller.running);
    }

    #[test]
    fn paused_runs_do_not_tick() {
        let mut controller = running_controller(DifficultyPreset::Medium);
        for index in 0..6u64 {
            controller.record_outcome(Outcome::hit(index, 120.0));
        }
        controller.handle(&[Event::RunPaused { at_ms: 100 }]);
        controller.handle(&[time_advanced(TICK_INTERVAL_MS * 2)]);
        assert!(controller.change_log().is_empty());

        controller.handle(&[Event::RunResumed {
            at_ms: TICK_INTERVAL_MS * 2,
        }]);
        controller.handle(&[time_advanced(TICK_INTERVAL_MS * 3)]);
        assert_eq!(controller.change_log().len(), 1);
    }

    #[test]
    fn decay_pulls_an_undisturbed_multiplier_toward_unity() {
        let mut controller = running_controller(DifficultyPreset::Medium);
        // Three misses then seven hits leave accuracy exactly on target with
        // no live miss streak, so only decay moves the multiplier.
        for index in 0..3u64 {
            controller.record_outcome(Outcome::miss(index));
        }
        for index in 0..7u64 {
            controller.record_outcome(Outcome::hit(100 + index, 250.0));
        }
        assert_eq!(controller.multiplier(), 0.7);
        controller.handle(&[time_advanced(TICK_INTERVAL_MS)]);
        assert!((controller.multiplier() - 0.715).abs() < 1e-9);
    }
}
