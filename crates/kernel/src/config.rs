use serde::{Deserialize, Serialize};

use crate::tuning::PlayerTuning;

/// World configuration: index granularity, resolver budgets and effect timers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Spatial grid cell edge in pixels.
    pub grid_cell_px: i32,
    /// Nearest-valid-position expansions allowed per search.
    pub node_limit: usize,
    /// Largest pixel distance covered by one sub-step of a move.
    pub max_step_px: i32,
    /// Padding around an actor's swept box when gathering obstacles.
    pub search_margin_px: i32,
    /// Lifetime of indicator entities, in ticks.
    pub indicator_ticks: u32,
    /// Lifetime of animation entities, in ticks.
    pub animation_ticks: u32,
    /// Tuning for players spawned without their own.
    pub player: PlayerTuning,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            grid_cell_px: 32,
            node_limit: 100,
            max_step_px: 4,
            search_margin_px: 32,
            indicator_ticks: 60,
            animation_ticks: 24,
            player: PlayerTuning::default(),
        }
    }
}
