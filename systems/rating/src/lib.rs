#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Combo-rating classifier for the Reflex Grid engine.
//!
//! A derived display metric: the classifier folds the event stream into a
//! run temperature tier. It never influences gameplay. Tiers rise with the
//! combo counter and recent reaction quality; any miss drops straight back
//! to [`ComboRating::Cold`]. [`Event::RatingChanged`] is published only on
//! tier transitions so render layers can animate them.

use std::collections::VecDeque;

use reflex_core::{ComboRating, Event};

/// Reaction samples retained for the quality gates.
const REACTION_SAMPLES: usize = 5;

/// Combo floor for [`ComboRating::Warm`].
const WARM_COMBO: u32 = 3;

/// Combo floor for [`ComboRating::Hot`].
const HOT_COMBO: u32 = 10;

/// Combo floor for [`ComboRating::Blazing`].
const BLAZING_COMBO: u32 = 20;

/// Combo floor for [`ComboRating::Legendary`].
const LEGENDARY_COMBO: u32 = 35;

/// Average reaction ceiling for [`ComboRating::Blazing`].
const BLAZING_REACTION_MS: f64 = 300.0;

/// Average reaction ceiling for [`ComboRating::Legendary`].
const LEGENDARY_REACTION_MS: f64 = 220.0;

/// Stateful classifier folding run events into a [`ComboRating`].
#[derive(Debug)]
pub struct RatingTracker {
    rating: ComboRating,
    combo: u32,
    recent_reactions: VecDeque<f64>,
}

impl Default for RatingTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl RatingTracker {
    /// Creates a tracker starting at [`ComboRating::Cold`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            rating: ComboRating::Cold,
            combo: 0,
            recent_reactions: VecDeque::with_capacity(REACTION_SAMPLES),
        }
    }

    /// Tier currently active.
    #[must_use]
    pub const fn rating(&self) -> ComboRating {
        self.rating
    }

    /// Folds a batch of events, appending [`Event::RatingChanged`] to `out`
    /// whenever the tier moves.
    pub fn handle(&mut self, events: &[Event], out: &mut Vec<Event>) {
        for event in events {
            match event {
                Event::RunStarted { .. } => self.reset(),
                Event::ComboChanged { combo } => {
                    self.combo = *combo;
                    self.reclassify(out);
                }
                Event::TargetHit { reaction_ms, .. } => {
                    if self.recent_reactions.len() == REACTION_SAMPLES {
                        let _ = self.recent_reactions.pop_front();
                    }
                    self.recent_reactions.push_back(*reaction_ms);
                    self.reclassify(out);
                }
                Event::RoundMissed { .. } => {
                    self.recent_reactions.clear();
                    if self.rating != ComboRating::Cold {
                        self.rating = ComboRating::Cold;
                        out.push(Event::RatingChanged {
                            rating: ComboRating::Cold,
                        });
                    }
                }
                _ => {}
            }
        }
    }

    fn reset(&mut self) {
        self.rating = ComboRating::Cold;
        self.combo = 0;
        self.recent_reactions.clear();
    }

    fn reclassify(&mut self, out: &mut Vec<Event>) {
        let next = classify(self.combo, self.average_reaction_ms());
        if next != self.rating {
            self.rating = next;
            out.push(Event::RatingChanged { rating: next });
        }
    }

    fn average_reaction_ms(&self) -> Option<f64> {
        if self.recent_reactions.is_empty() {
            return None;
        }
        let sum: f64 = self.recent_reactions.iter().sum();
        Some(sum / self.recent_reactions.len() as f64)
    }
}

/// Maps the combo counter and recent reaction quality to a tier.
///
/// The top two tiers gate on reaction speed as well as the combo so a slow
/// but careful player tops out at [`ComboRating::Hot`].
fn classify(combo: u32, average_reaction_ms: Option<f64>) -> ComboRating {
    let fast_enough = |ceiling: f64| average_reaction_ms.is_some_and(|avg| avg < ceiling);

    if combo >= LEGENDARY_COMBO && fast_enough(LEGENDARY_REACTION_MS) {
        ComboRating::Legendary
    } else if combo >= BLAZING_COMBO && fast_enough(BLAZING_REACTION_MS) {
        ComboRating::Blazing
    } else if combo >= HOT_COMBO {
        ComboRating::Hot
    } else if combo >= WARM_COMBO {
        ComboRating::Warm
    } else {
        ComboRating::Cold
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reflex_core::{CellId, DifficultyPreset, GameMode, MissReason};

    fn cell(id: u8) -> CellId {
        CellId::new(id).unwrap()
    }

    fn combo_changed(combo: u32) -> Event {
        Event::ComboChanged { combo }
    }

    fn target_hit(reaction_ms: f64) -> Event {
        Event::TargetHit {
            cell: cell(5),
            reaction_ms,
            points: 100,
        }
    }

    fn ratings(out: &[Event]) -> Vec<ComboRating> {
        out.iter()
            .filter_map(|event| match event {
                Event::RatingChanged { rating } => Some(*rating),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn fresh_tracker_starts_cold() {
        assert_eq!(RatingTracker::new().rating(), ComboRating::Cold);
    }

    #[test]
    fn combo_alone_climbs_through_warm_and_hot() {
        let mut tracker = RatingTracker::new();
        let mut out = Vec::new();

        tracker.handle(&[combo_changed(2)], &mut out);
        assert!(out.is_empty());

        tracker.handle(&[combo_changed(3)], &mut out);
        tracker.handle(&[combo_changed(10)], &mut out);
        assert_eq!(ratings(&out), vec![ComboRating::Warm, ComboRating::Hot]);
    }

    #[test]
    fn blazing_requires_fast_reactions() {
        let mut tracker = RatingTracker::new();
        let mut out = Vec::new();

        // Combo 25 with slow reactions stays Hot.
        tracker.handle(&[combo_changed(25), target_hit(450.0)], &mut out);
        assert_eq!(tracker.rating(), ComboRating::Hot);

        // Fast samples push the average under the gate.
        for _ in 0..5 {
            tracker.handle(&[target_hit(200.0)], &mut out);
        }
        assert_eq!(tracker.rating(), ComboRating::Blazing);
    }

    #[test]
    fn legendary_needs_both_combo_and_speed() {
        let mut tracker = RatingTracker::new();
        let mut out = Vec::new();

        for _ in 0..5 {
            tracker.handle(&[target_hit(150.0)], &mut out);
        }
        tracker.handle(&[combo_changed(34)], &mut out);
        assert_eq!(tracker.rating(), ComboRating::Blazing);

        tracker.handle(&[combo_changed(35)], &mut out);
        assert_eq!(tracker.rating(), ComboRating::Legendary);
    }

    #[test]
    fn a_miss_drops_straight_to_cold() {
        let mut tracker = RatingTracker::new();
        let mut out = Vec::new();
        tracker.handle(&[combo_changed(12)], &mut out);
        assert_eq!(tracker.rating(), ComboRating::Hot);

        out.clear();
        tracker.handle(
            &[Event::RoundMissed {
                reason: MissReason::Timeout,
                cell: None,
            }],
            &mut out,
        );
        assert_eq!(tracker.rating(), ComboRating::Cold);
        assert_eq!(ratings(&out), vec![ComboRating::Cold]);
    }

    #[test]
    fn transitions_fire_exactly_once() {
        let mut tracker = RatingTracker::new();
        let mut out = Vec::new();
        tracker.handle(&[combo_changed(4), combo_changed(4)], &mut out);
        assert_eq!(ratings(&out), vec![ComboRating::Warm]);
    }

    #[test]
    fn run_start_resets_silently() {
        let mut tracker = RatingTracker::new();
        let mut out = Vec::new();
        tracker.handle(&[combo_changed(15)], &mut out);

        out.clear();
        tracker.handle(
            &[Event::RunStarted {
                mode: GameMode::Reflex,
                preset: DifficultyPreset::Medium,
                at_ms: 0,
            }],
            &mut out,
        );
        assert_eq!(tracker.rating(), ComboRating::Cold);
        assert!(out.is_empty());
    }

    #[test]
    fn reaction_window_is_bounded() {
        let mut tracker = RatingTracker::new();
        let mut out = Vec::new();
        for _ in 0..12 {
            tracker.handle(&[target_hit(180.0)], &mut out);
        }
        assert_eq!(tracker.recent_reactions.len(), REACTION_SAMPLES);
    }
}
