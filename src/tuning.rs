//! Tuning knobs for the optimisation phases.
//!
//! The defaults reproduce the empirically chosen behaviour. Loaded from
//! TOML/JSON at runtime; any field left out keeps its default.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How the equity phase orders equally ranked candidates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// Ascending participant id. The seed is never consumed.
    #[default]
    Ordered,
    /// Candidate lists shuffled with the run's seeded generator.
    Seeded,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    /// Local search sweep budget when called directly.
    pub improve_max_iterations: usize,
    /// Consecutive sweeps without an improving swap before local search stops.
    pub plateau_threshold: usize,
    /// Hard cap on equity iterations.
    pub equity_max_iterations: usize,
    /// Number of recent gap values inspected for oscillation.
    pub oscillation_window: usize,
    /// Occurrences of the oldest windowed gap that count as a cycle.
    pub oscillation_repeats: usize,
    /// VIP priority lapses once the least-served VIP leads the least-served
    /// regular participant by this many meetings.
    pub vip_max_advantage: i64,
    /// Events with at least this many participants skip local search.
    pub local_search_cutoff: usize,
    /// Events below this size get `small_event_iterations` of local search,
    /// larger ones `large_event_iterations`.
    pub small_event_size: usize,
    pub small_event_iterations: usize,
    pub large_event_iterations: usize,
    pub tie_break: TieBreak,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            improve_max_iterations: 100,
            plateau_threshold: 5,
            equity_max_iterations: 1000,
            oscillation_window: 10,
            oscillation_repeats: 3,
            vip_max_advantage: 2,
            local_search_cutoff: 50,
            small_event_size: 20,
            small_event_iterations: 50,
            large_event_iterations: 20,
            tie_break: TieBreak::Ordered,
        }
    }
}

#[derive(Debug, Error)]
pub enum TuningError {
    #[error("invalid TOML tuning: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid JSON tuning: {0}")]
    Json(#[from] serde_json::Error),
}

impl Tuning {
    pub fn from_toml_str(source: &str) -> Result<Tuning, TuningError> {
        Ok(toml::from_str(source)?)
    }

    pub fn from_json_str(source: &str) -> Result<Tuning, TuningError> {
        Ok(serde_json::from_str(source)?)
    }

    /// Local search iteration budget the orchestrator grants an event of
    /// `participants` people, or `None` when the phase is skipped.
    pub fn local_search_budget(&self, participants: usize) -> Option<usize> {
        if participants >= self.local_search_cutoff {
            None
        } else if participants < self.small_event_size {
            Some(self.small_event_iterations)
        } else {
            Some(self.large_event_iterations)
        }
    }
}
