#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Highlight scheduler for the Reflex Grid engine.
//!
//! The scheduler is the orchestrating state machine. It owns the live round,
//! an explicit timer-handle table, and the pattern generator; it calls the
//! adaptive difficulty controller and the scoring engine directly. It never
//! mutates run-level state itself: every score, combo, or life change leaves
//! as a [`Command`] for the world, and every presentation-facing change
//! leaves as an [`Event`].
//!
//! Round state here is the single source of truth. The rendering layer only
//! ever sees [`RoundSnapshot`] projections regenerated on mutation, and every
//! timer carries an absolute fire-at deadline that is re-validated against
//! the current run state when it fires, so a timer armed for a round that no
//! longer exists is a no-op rather than a race.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use reflex_core::{
    CellId, Command, Event, GameMode, MissReason, Outcome, RoundSnapshot, RunView, ShapeKind,
    TargetState, CELL_COUNT,
};
use reflex_system_adaptive::AdaptiveDifficulty;
use reflex_system_patterns::PatternGenerator;
use reflex_system_scoring::Scoring;

/// Delay before re-arming after a cleared round.
const CLEAR_REARM_MS: u64 = 500;

/// Delay before re-arming after a cleared odd-one-out round.
const ODD_ONE_OUT_REARM_MS: u64 = 700;

/// Delay before re-arming after a wrong press tears a round down.
const WRONG_PRESS_REARM_MS: u64 = 500;

/// Delay before re-arming after a deadline miss.
const TIMEOUT_REARM_MS: u64 = 1_000;

/// Chance that a non-odd-one-out round carries a pattern at combo zero.
const PATTERN_CHANCE_FLOOR: f64 = 0.2;

/// Chance that a round carries a pattern at combo 100 and beyond.
const PATTERN_CHANCE_CEILING: f64 = 0.6;

/// Combo at which pattern chance and duration scaling saturate.
const COMBO_SCALE_CAP: u32 = 100;

/// Chance that a reflex or nightmare round embeds a bonus target.
const BONUS_CHANCE: f64 = 0.18;

/// Independent chance, rolled per target, that it demands multiple presses.
const MULTI_HIT_CHANCE: f64 = 0.3;

/// Smallest and largest target counts for odd-one-out rounds.
const ODD_ONE_OUT_COUNT_RANGE: (u32, u32) = (3, 6);

/// Timer slots owned by the scheduler, keyed by purpose.
///
/// Arming a slot that is already armed replaces the old deadline, which is
/// the explicit cancel-on-rearm rule: a purpose never has two live timers.
#[derive(Debug, Default)]
struct TimerTable {
    deadline_at_ms: Option<u64>,
    next_round_at_ms: Option<u64>,
}

impl TimerTable {
    fn clear(&mut self) {
        self.deadline_at_ms = None;
        self.next_round_at_ms = None;
    }
}

/// Live round owned by the scheduler.
#[derive(Debug)]
struct Round {
    targets: Vec<TargetState>,
    odd_one_out: Option<CellId>,
    bonus_target: Option<CellId>,
    started_at_ms: u64,
    duration_ms: u32,
    shape: Option<ShapeKind>,
    score_bonus: f64,
}

impl Round {
    fn snapshot(&self) -> RoundSnapshot {
        RoundSnapshot {
            targets: self.targets.clone(),
            odd_one_out: self.odd_one_out,
            bonus_target: self.bonus_target,
            started_at_ms: self.started_at_ms,
            duration_ms: self.duration_ms,
            shape: self.shape,
            score_bonus: self.score_bonus,
        }
    }
}

/// Mutable collaborators one `handle` call threads through the scheduler's
/// resolution paths.
struct Collaborators<'a> {
    view: &'a RunView,
    adaptive: &'a mut AdaptiveDifficulty,
    scoring: &'a mut Scoring,
    commands: &'a mut Vec<Command>,
    out: &'a mut Vec<Event>,
}

/// Orchestrating state machine that arms rounds, resolves presses, and
/// enforces deadlines.
#[derive(Debug)]
pub struct Scheduler {
    generator: PatternGenerator,
    rng: ChaCha8Rng,
    round: Option<Round>,
    timers: TimerTable,
    recently_used: Vec<CellId>,
    now_ms: u64,
}

impl Scheduler {
    /// Creates a scheduler whose random choices are determined by the seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            generator: PatternGenerator::new(seed),
            rng: ChaCha8Rng::seed_from_u64(seed.wrapping_add(1)),
            round: None,
            timers: TimerTable::default(),
            recently_used: Vec::new(),
            now_ms: 0,
        }
    }

    /// Read-only projection of the live round for the rendering layer.
    #[must_use]
    pub fn round(&self) -> Option<RoundSnapshot> {
        self.round.as_ref().map(Round::snapshot)
    }

    /// Processes one batch of world events.
    ///
    /// The scheduler forwards the batch to the adaptive controller first so
    /// round arming always reads the post-tick multiplier. Run-state
    /// mutations are appended to `commands`; presentation events to `out`.
    pub fn handle(
        &mut self,
        events: &[Event],
        view: &RunView,
        adaptive: &mut AdaptiveDifficulty,
        scoring: &mut Scoring,
        commands: &mut Vec<Command>,
        out: &mut Vec<Event>,
    ) {
        adaptive.handle(events);
        let mut ctx = Collaborators {
            view,
            adaptive,
            scoring,
            commands,
            out,
        };

        for event in events {
            match event {
                Event::TimeAdvanced { now_ms, .. } => self.now_ms = *now_ms,
                Event::RunStarted { at_ms, .. } => {
                    self.round = None;
                    self.timers.clear();
                    self.recently_used.clear();
                    self.now_ms = *at_ms;
                    ctx.scoring.reset();
                    self.timers.next_round_at_ms = Some(*at_ms);
                }
                Event::RunPaused { at_ms } => {
                    self.timers.clear();
                    if self.round.take().is_some() {
                        ctx.out.push(Event::RoundCleared { at_ms: *at_ms });
                    }
                }
                Event::RunResumed { at_ms } => {
                    self.timers.next_round_at_ms = Some(*at_ms);
                }
                Event::InputReadyChanged { ready } => {
                    // An arm attempt that found the input layer not ready has
                    // already consumed its timer, so readiness reschedules it.
                    if *ready && self.round.is_none() {
                        self.timers.next_round_at_ms = Some(self.now_ms);
                    }
                }
                Event::RunEnded { at_ms } => {
                    self.timers.clear();
                    if self.round.take().is_some() {
                        ctx.out.push(Event::RoundCleared { at_ms: *at_ms });
                    }
                }
                Event::ModeChanged { mode } => {
                    self.timers.clear();
                    if self.round.take().is_some() {
                        ctx.out.push(Event::RoundCleared { at_ms: self.now_ms });
                    }
                    if *mode != GameMode::Sequence {
                        self.timers.next_round_at_ms = Some(self.now_ms);
                    }
                }
                Event::PressRegistered { cell, at_ms } => {
                    self.resolve_press(*cell, *at_ms, &mut ctx);
                }
                _ => {}
            }
        }

        self.fire_due_timers(&mut ctx);
    }

    /// Fires every timer whose deadline has passed, re-validating run state
    /// at each firing so stale timers degrade to no-ops.
    fn fire_due_timers(&mut self, ctx: &mut Collaborators<'_>) {
        if let Some(fire_at) = self.timers.deadline_at_ms {
            if fire_at <= self.now_ms {
                self.timers.deadline_at_ms = None;
                self.resolve_timeout(fire_at, ctx);
            }
        }

        if let Some(fire_at) = self.timers.next_round_at_ms {
            if fire_at <= self.now_ms {
                self.timers.next_round_at_ms = None;
                if self.may_arm(ctx.view) {
                    self.arm_round(ctx);
                }
            }
        }
    }

    /// Entry guard for arming. All conditions must hold, and in particular
    /// no round may currently be live: a previously armed target set must be
    /// fully resolved before the next one appears.
    fn may_arm(&self, view: &RunView) -> bool {
        !view.game_over
            && view.ready
            && !view.paused
            && view.mode != GameMode::Sequence
            && self.round.is_none()
    }

    fn arm_round(&mut self, ctx: &mut Collaborators<'_>) {
        // The multiplier is snapshotted here and never re-read mid-round, so
        // a tick firing while the round is live cannot retime it.
        let multiplier = ctx.adaptive.multiplier();

        let round = match ctx.view.mode {
            GameMode::OddOneOut => self.arm_odd_one_out(ctx.view, multiplier),
            GameMode::Sequence => return,
            _ => self.arm_standard(ctx.view, multiplier),
        };

        self.recently_used = round.targets.iter().map(|target| target.cell).collect();
        self.timers.deadline_at_ms = Some(round.started_at_ms + u64::from(round.duration_ms));
        let snapshot = round.snapshot();
        self.round = Some(round);
        ctx.out.push(Event::RoundArmed { round: snapshot });
    }

    fn arm_standard(&mut self, view: &RunView, multiplier: f64) -> Round {
        let config = view.preset.config();
        let count = self.target_count(view, multiplier);
        let include_bonus = matches!(view.mode, GameMode::Reflex | GameMode::Nightmare)
            && self.rng.gen_bool(BONUS_CHANCE);

        let (targets, bonus_target, shape, score_bonus) =
            if self.rng.gen_bool(self.pattern_chance(view.combo)) {
                let pattern =
                    self.generator
                        .generate(count, view.score, &self.recently_used, include_bonus);
                let cells = pattern.targets().to_vec();
                (
                    cells,
                    pattern.bonus_target(),
                    Some(pattern.kind()),
                    pattern.score_bonus(),
                )
            } else {
                // Random sets gain their bonus as one extra cell outside the
                // mandatory targets; patterns embed theirs instead.
                let mut cells = self.random_cells(count as usize, &[]);
                let bonus = include_bonus
                    .then(|| self.random_cells(1, &cells))
                    .and_then(|extra| extra.into_iter().next());
                if let Some(extra) = bonus {
                    cells.push(extra);
                }
                (cells, bonus, None, 1.0)
            };

        let mut targets: Vec<TargetState> = targets
            .into_iter()
            .map(|cell| TargetState::new(cell, 1))
            .collect();
        for target in &mut targets {
            if self.rng.gen_bool(MULTI_HIT_CHANCE) {
                *target = TargetState::new(target.cell, config.multi_hit_requirement());
            }
        }

        Round {
            targets,
            odd_one_out: None,
            bonus_target,
            started_at_ms: self.now_ms,
            duration_ms: self.round_duration(view, multiplier),
            shape,
            score_bonus,
        }
    }

    fn arm_odd_one_out(&mut self, view: &RunView, multiplier: f64) -> Round {
        let (min_count, max_count) = ODD_ONE_OUT_COUNT_RANGE;
        let count = self.target_count(view, multiplier).clamp(min_count, max_count);

        let (cells, shape, score_bonus) = if self.rng.gen_bool(self.pattern_chance(view.combo)) {
            let pattern = self
                .generator
                .generate(count, view.score, &self.recently_used, false);
            (
                pattern.targets().to_vec(),
                Some(pattern.kind()),
                pattern.score_bonus(),
            )
        } else {
            (self.random_cells(count as usize, &[]), None, 1.0)
        };

        let odd = cells[self.rng.gen_range(0..cells.len())];
        Round {
            targets: cells
                .into_iter()
                .map(|cell| TargetState::new(cell, 1))
                .collect(),
            odd_one_out: Some(odd),
            bonus_target: None,
            started_at_ms: self.now_ms,
            duration_ms: self.round_duration(view, multiplier),
            shape,
            score_bonus,
        }
    }

    /// Simultaneous target count: combo escalates it at the preset's ramp
    /// rate, capped by the adaptive-scaled preset ceiling.
    fn target_count(&self, view: &RunView, multiplier: f64) -> u32 {
        let config = view.preset.config();
        let escalated = 1 + (view.combo as f32 * config.ramp_rate() / 10.0) as u32;
        let cap = (f64::from(config.max_simultaneous_targets()) * multiplier).ceil() as u32;
        escalated.min(cap.min(u32::from(CELL_COUNT))).max(1)
    }

    /// Round duration: the base window shrinks linearly toward the preset
    /// minimum as the combo climbs, then the adaptive multiplier divides it.
    /// The preset minimum is an absolute floor.
    fn round_duration(&self, view: &RunView, multiplier: f64) -> u32 {
        let config = view.preset.config();
        let base = f64::from(config.base_duration_ms());
        let min = f64::from(config.min_duration_ms());
        let progress = f64::from(view.combo.min(COMBO_SCALE_CAP)) / f64::from(COMBO_SCALE_CAP);
        let scaled = (base - (base - min) * progress) / multiplier.max(f64::MIN_POSITIVE);
        scaled.max(min) as u32
    }

    /// Chance that the next round uses the pattern generator, scaling
    /// linearly from 20 % at combo zero to 60 % at combo 100.
    fn pattern_chance(&self, combo: u32) -> f64 {
        let progress = f64::from(combo.min(COMBO_SCALE_CAP)) / f64::from(COMBO_SCALE_CAP);
        PATTERN_CHANCE_FLOOR + (PATTERN_CHANCE_CEILING - PATTERN_CHANCE_FLOOR) * progress
    }

    fn random_cells(&mut self, count: usize, exclude: &[CellId]) -> Vec<CellId> {
        let mut pool: Vec<CellId> = CellId::all()
            .into_iter()
            .filter(|candidate| !exclude.contains(candidate))
            .collect();
        let mut cells = Vec::with_capacity(count);
        for _ in 0..count.min(pool.len()) {
            let index = self.rng.gen_range(0..pool.len());
            cells.push(pool.swap_remove(index));
        }
        cells
    }

    fn resolve_press(&mut self, cell: CellId, at_ms: u64, ctx: &mut Collaborators<'_>) {
        if ctx.view.game_over || ctx.view.paused {
            return;
        }
        let Some(round) = self.round.as_mut() else {
            return;
        };

        let correct = match round.odd_one_out {
            Some(odd) => (cell == odd).then(|| {
                round
                    .targets
                    .iter()
                    .position(|target| target.cell == odd)
                    .unwrap_or(0)
            }),
            None => round
                .targets
                .iter()
                .position(|target| target.cell == cell),
        };

        let Some(index) = correct else {
            self.resolve_miss(MissReason::WrongPress, Some(cell), at_ms, WRONG_PRESS_REARM_MS, ctx);
            return;
        };

        round.targets[index].hits += 1;
        if round.targets[index].remaining_hits() > 0 {
            ctx.out.push(Event::TargetStruck {
                cell,
                remaining_hits: round.targets[index].remaining_hits(),
            });
            return;
        }

        let reaction_ms = at_ms.saturating_sub(round.started_at_ms) as f64;
        let factors = ctx.scoring.calculate_score(
            reaction_ms,
            true,
            ctx.view.combo,
            ctx.view.preset,
            ctx.view.mode,
        );
        let points = (factors.total as f64 * round.score_bonus).floor() as u64;
        ctx.adaptive.record_outcome(Outcome::hit(at_ms, reaction_ms));

        ctx.commands.push(Command::AddScore { points });
        ctx.commands.push(Command::IncrementCombo);
        ctx.out.push(Event::TargetHit {
            cell,
            reaction_ms,
            points,
        });

        if round.bonus_target == Some(cell) {
            round.bonus_target = None;
            ctx.commands.push(Command::GrantLife);
            ctx.out.push(Event::BonusCollected { cell });
        }

        let _ = round.targets.swap_remove(index);
        // In odd-one-out rounds the decoys vanish with the correct target.
        let cleared = round.odd_one_out.is_some() || round.targets.is_empty();
        if cleared {
            let rearm_delay = if round.odd_one_out.is_some() {
                ODD_ONE_OUT_REARM_MS
            } else {
                CLEAR_REARM_MS
            };
            self.round = None;
            self.timers.deadline_at_ms = None;
            self.timers.next_round_at_ms = Some(at_ms + rearm_delay);
            ctx.out.push(Event::RoundCleared { at_ms });
        }
    }

    fn resolve_timeout(&mut self, fire_at_ms: u64, ctx: &mut Collaborators<'_>) {
        if ctx.view.game_over || ctx.view.paused || self.round.is_none() {
            return;
        }
        self.resolve_miss(MissReason::Timeout, None, fire_at_ms, TIMEOUT_REARM_MS, ctx);
    }

    fn resolve_miss(
        &mut self,
        reason: MissReason,
        cell: Option<CellId>,
        at_ms: u64,
        rearm_delay_ms: u64,
        ctx: &mut Collaborators<'_>,
    ) {
        ctx.adaptive.record_outcome(Outcome::miss(at_ms));
        // Misses route through the scoring engine solely to break the
        // perfect streak; the factors come back all zero.
        let _ = ctx
            .scoring
            .calculate_score(0.0, false, ctx.view.combo, ctx.view.preset, ctx.view.mode);

        ctx.commands.push(Command::ResetCombo);
        ctx.commands.push(Command::DecrementLives);
        ctx.out.push(Event::RoundMissed { reason, cell });

        self.round = None;
        self.timers.deadline_at_ms = None;
        self.timers.next_round_at_ms = Some(at_ms + rearm_delay_ms);
        ctx.out.push(Event::RoundCleared { at_ms });
    }
}
