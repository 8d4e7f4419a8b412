#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that boots the Reflex Grid experience.
//!
//! Runs a scripted demo: a simulated player with a fixed reaction time plays
//! a full run on a virtual clock, while the adapter logs round lifecycle,
//! scoring, and rating events and prints a summary when the run ends.

use std::time::Duration;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use reflex_core::{Command, DifficultyPreset, Event, GameMode};
use reflex_system_adaptive::AdaptiveDifficulty;
use reflex_system_bootstrap::{welcome_banner, RunConfig};
use reflex_system_rating::RatingTracker;
use reflex_system_scheduler::Scheduler;
use reflex_system_scoring::Scoring;
use reflex_world::{apply, query, World};
use tracing::{debug, info};

/// Virtual time advanced per simulation step.
const STEP_MS: u64 = 50;

/// Gameplay mode selectable from the command line.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum ModeArg {
    /// Standard reflex mode.
    Reflex,
    /// One life, no healing.
    Survival,
    /// Forces the nightmare preset.
    Nightmare,
    /// One correct target among decoys.
    OddOneOut,
    /// Memory-recall mode; the scheduler stays idle.
    Sequence,
}

impl From<ModeArg> for GameMode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Reflex => Self::Reflex,
            ModeArg::Survival => Self::Survival,
            ModeArg::Nightmare => Self::Nightmare,
            ModeArg::OddOneOut => Self::OddOneOut,
            ModeArg::Sequence => Self::Sequence,
        }
    }
}

/// Difficulty preset selectable from the command line.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum PresetArg {
    /// Generous timing.
    Easy,
    /// Baseline timing.
    Medium,
    /// Tight timing.
    Hard,
    /// Shortest deadlines.
    Nightmare,
}

impl From<PresetArg> for DifficultyPreset {
    fn from(arg: PresetArg) -> Self {
        match arg {
            PresetArg::Easy => Self::Easy,
            PresetArg::Medium => Self::Medium,
            PresetArg::Hard => Self::Hard,
            PresetArg::Nightmare => Self::Nightmare,
        }
    }
}

/// Command-line arguments for the scripted demo run.
#[derive(Debug, Parser)]
#[command(name = "reflex-grid", about = "Scripted demo run of the Reflex Grid engine")]
struct Args {
    /// Gameplay mode for the run.
    #[arg(long, value_enum, default_value = "reflex")]
    mode: ModeArg,

    /// Difficulty preset for the run.
    #[arg(long, value_enum, default_value = "medium")]
    preset: PresetArg,

    /// Seed driving every random choice in the run.
    #[arg(long, default_value_t = 1)]
    seed: u64,

    /// Virtual play time in milliseconds.
    #[arg(long, default_value_t = 60_000)]
    duration_ms: u64,

    /// Reaction time of the scripted player in milliseconds.
    #[arg(long, default_value_t = 220)]
    reaction_ms: u64,
}

/// Entry point for the Reflex Grid command-line interface.
fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = RunConfig::new(args.mode.into(), args.preset.into());

    let mut world = World::new();
    println!("{}", welcome_banner(&world));
    info!(
        mode = ?config.mode,
        preset = ?config.effective_preset(),
        seed = args.seed,
        "starting scripted run"
    );

    let mut scheduler = Scheduler::new(args.seed);
    let mut adaptive = AdaptiveDifficulty::new(config.effective_preset());
    let mut scoring = Scoring::new();
    let mut rating = RatingTracker::new();

    let mut pending: Vec<Event> = Vec::new();
    apply(
        &mut world,
        Command::StartRun {
            mode: config.mode,
            preset: config.preset,
        },
        &mut pending,
    );

    let mut commands: Vec<Command> = Vec::new();
    let mut scheduler_out: Vec<Event> = Vec::new();

    while query::now_ms(&world) < args.duration_ms {
        let mut frame_events = std::mem::take(&mut pending);
        apply(
            &mut world,
            Command::Tick {
                dt: Duration::from_millis(STEP_MS),
            },
            &mut frame_events,
        );

        // The scripted player presses the next open target once its
        // reaction time has elapsed since the round armed.
        if let Some(round) = scheduler.round() {
            let now = query::now_ms(&world);
            if now >= round.started_at_ms + args.reaction_ms {
                let target = round
                    .odd_one_out
                    .or_else(|| round.targets.first().map(|target| target.cell));
                if let Some(cell) = target {
                    apply(&mut world, Command::Press { cell }, &mut frame_events);
                }
            }
        }

        let view = query::run_view(&world);
        commands.clear();
        scheduler_out.clear();
        scheduler.handle(
            &frame_events,
            &view,
            &mut adaptive,
            &mut scoring,
            &mut commands,
            &mut scheduler_out,
        );

        for command in commands.drain(..) {
            apply(&mut world, command, &mut pending);
        }

        let mut rating_out = Vec::new();
        rating.handle(&frame_events, &mut rating_out);
        rating.handle(&scheduler_out, &mut rating_out);
        scheduler_out.append(&mut rating_out);

        log_events(&frame_events);
        log_events(&scheduler_out);
        log_events(&pending);

        if query::run_view(&world).game_over {
            break;
        }
    }

    let view = query::run_view(&world);
    println!(
        "run finished: score {} | best combo {} | lives {} | rating {:?} | difficulty x{:.2} ({} adjustments)",
        view.score,
        view.best_combo,
        view.lives,
        rating.rating(),
        adaptive.multiplier(),
        adaptive.change_log().len(),
    );
    Ok(())
}

/// Logs the interesting subset of an event batch.
fn log_events(events: &[Event]) {
    for event in events {
        match event {
            Event::RoundArmed { round } => info!(
                targets = round.targets.len(),
                duration_ms = round.duration_ms,
                shape = ?round.shape,
                "round armed"
            ),
            Event::TargetHit {
                cell,
                reaction_ms,
                points,
            } => info!(cell = cell.get(), reaction_ms, points, "target hit"),
            Event::BonusCollected { cell } => info!(cell = cell.get(), "bonus collected"),
            Event::RoundMissed { reason, .. } => info!(?reason, "round missed"),
            Event::RatingChanged { rating } => info!(?rating, "rating changed"),
            Event::RunEnded { at_ms } => info!(at_ms, "run ended"),
            Event::ScoreChanged { score } => debug!(score, "score changed"),
            Event::ComboChanged { combo } => debug!(combo, "combo changed"),
            Event::LivesChanged { lives } => debug!(lives, "lives changed"),
            _ => {}
        }
    }
}
