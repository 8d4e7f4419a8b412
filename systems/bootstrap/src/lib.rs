#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Presentation-facing bootstrap facade for the Reflex Grid engine.
//!
//! Adapters call into this crate once at startup to obtain everything the
//! presentation layer needs before the first round arms: the welcome
//! banner, the grid geometry, and the resolved run configuration.

use reflex_core::{CellId, DifficultyPreset, GameMode, GRID_ROWS};
use reflex_world::World;

/// Run configuration selected by the player before a run starts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunConfig {
    /// Gameplay mode requested by the player.
    pub mode: GameMode,
    /// Difficulty preset requested by the player.
    pub preset: DifficultyPreset,
}

impl RunConfig {
    /// Creates a run configuration from the player's selections.
    #[must_use]
    pub const fn new(mode: GameMode, preset: DifficultyPreset) -> Self {
        Self { mode, preset }
    }

    /// Preset the run will actually use: modes that force a preset override
    /// the player's selection.
    #[must_use]
    pub const fn effective_preset(&self) -> DifficultyPreset {
        match self.mode.forced_preset() {
            Some(forced) => forced,
            None => self.preset,
        }
    }

    /// Lives the run starts with.
    #[must_use]
    pub const fn initial_lives(&self) -> u32 {
        self.mode.initial_lives()
    }
}

/// Retrieves the banner adapters display before the first round arms.
#[must_use]
pub fn welcome_banner(world: &World) -> &'static str {
    reflex_world::query::welcome_banner(world)
}

/// Grid geometry for the rendering layer, one vector of cells per row of
/// the 3-4-3 layout.
#[must_use]
pub fn grid_rows() -> Vec<Vec<CellId>> {
    GRID_ROWS
        .iter()
        .map(|row| {
            row.iter()
                .map(|raw| CellId::new(*raw).expect("grid rows contain only valid cell ids"))
                .collect()
        })
        .collect()
}
