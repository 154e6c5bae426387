//! Uniform-random exploration.
//!
//! At every scheduling point the random strategy picks one of the enabled
//! operations uniformly at random. It keeps no group bookkeeping and no
//! inter-iteration state beyond the step counter, and it is the only fair
//! strategy in the crate: every enabled operation has positive probability
//! of being scheduled at every step.

use interlace_core::{ExplorationConfig, OperationId, OperationTable, SeededRng};
use tracing::trace;

/// Uniform-random scheduling strategy.
#[derive(Debug)]
pub struct RandomStrategy {
    rng: SeededRng,
    max_steps: u64,
    step_count: u64,
}

impl RandomStrategy {
    /// Build a random strategy from the exploration configuration.
    pub fn new(config: &ExplorationConfig) -> Self {
        Self {
            rng: SeededRng::new(config.seed),
            max_steps: config.max_steps,
            step_count: 0,
        }
    }

    /// Reset per-iteration state. The RNG stream continues across
    /// iterations so each one explores a fresh schedule.
    pub fn initialize_next_iteration(&mut self, _iteration: u64) -> bool {
        self.step_count = 0;
        true
    }

    /// Pick the next operation uniformly among the enabled candidates.
    /// Returns `None` iff nothing is enabled (deadlock).
    pub fn next_operation(
        &mut self,
        table: &mut OperationTable,
        candidates: &[OperationId],
        _current: Option<OperationId>,
        _is_yielding: bool,
    ) -> Option<OperationId> {
        let enabled: Vec<OperationId> = candidates
            .iter()
            .copied()
            .filter(|&id| table.get(id).is_enabled())
            .collect();
        if enabled.is_empty() {
            return None;
        }
        let choice = *self.rng.pick(&enabled);
        trace!(step = self.step_count, op = %choice, "random pick");
        self.step_count += 1;
        Some(choice)
    }

    /// Return `true` with probability `1/max_value`.
    pub fn next_boolean_choice(&mut self, _current: Option<OperationId>, max_value: u64) -> bool {
        self.step_count += 1;
        self.rng.next_bool(max_value)
    }

    /// Return a uniform integer in `[0, max_value)`.
    pub fn next_integer_choice(&mut self, _current: Option<OperationId>, max_value: u64) -> u64 {
        self.step_count += 1;
        self.rng.next_index(max_value)
    }

    /// Scheduling decisions made in the current iteration.
    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    /// Whether the per-iteration step budget is exhausted.
    pub fn is_max_steps_reached(&self) -> bool {
        self.max_steps != 0 && self.step_count >= self.max_steps
    }

    /// Random exploration is fair.
    pub fn is_fair(&self) -> bool {
        true
    }

    /// Stable human-readable tag.
    pub fn description(&self) -> String {
        format!("random[seed '{}']", self.rng.seed())
    }

    /// Return to the pristine state of a freshly constructed instance.
    pub fn reset(&mut self) {
        self.step_count = 0;
        self.rng.reseed();
    }
}
