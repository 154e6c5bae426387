//! Exploration configuration.

use serde::{Deserialize, Serialize};

/// Parameters shared by every exploration strategy.
///
/// The seed is mandatory: the core never falls back to ambient entropy, so
/// a reported schedule can always be replayed by re-running with the same
/// configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplorationConfig {
    /// Maximum number of scheduling decisions per iteration. `0` means
    /// unlimited.
    pub max_steps: u64,
    /// The PCT depth parameter `d`: at most `d - 1` priority-change points
    /// are installed per iteration. `0` and `1` both mean no priority
    /// changes (deterministic-priority exploration).
    pub max_priority_switch_points: u64,
    /// Seed for the strategy RNG.
    pub seed: u64,
}

impl ExplorationConfig {
    /// Build a configuration with the default switch-point budget.
    pub fn new(max_steps: u64, seed: u64) -> Self {
        Self {
            max_steps,
            max_priority_switch_points: 1,
            seed,
        }
    }

    /// Set the PCT depth parameter `d`.
    pub fn with_priority_switch_points(mut self, d: u64) -> Self {
        self.max_priority_switch_points = d;
        self
    }

    /// Number of priority-change points to draw for a schedule of the given
    /// length: `min(d - 1, schedule_length)`.
    pub fn change_point_budget(&self, schedule_length: u64) -> usize {
        let d = self.max_priority_switch_points;
        d.saturating_sub(1).min(schedule_length) as usize
    }
}

impl Default for ExplorationConfig {
    fn default() -> Self {
        Self::new(0, 0)
    }
}
