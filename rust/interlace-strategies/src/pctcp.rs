//! PCT with change points at communication boundaries (PCT-CP).
//!
//! Identical to [`PctStrategy`](crate::pct::PctStrategy) except for where
//! the priority-change points come from. Instead of drawing step indices
//! uniformly from the whole schedule, each iteration records the steps at
//! which a synchronization-classified operation (send, receive, join,
//! yield, create) was scheduled, and the next iteration samples up to
//! `d - 1` of those recorded indices as its change points. Priority
//! reversals then land exactly on logical communication boundaries, which
//! is where message-passing programs decide their races.
//!
//! Group formation, remigration, demotion, and selection are shared with
//! PCT through the same priority engine.

use interlace_core::{ExplorationConfig, OperationId, OperationTable, SeededRng};
use tracing::{debug, trace};

use crate::pct::PriorityEngine;

/// The PCT-CP scheduling strategy.
#[derive(Debug)]
pub struct PctCpStrategy {
    engine: PriorityEngine,
    rng: SeededRng,
    config: ExplorationConfig,
    step_count: u64,
    /// Running maximum of step counts observed across iterations.
    schedule_length: u64,
    /// Step indices of this iteration at which a synchronizing operation
    /// was scheduled; the candidate pool for the next iteration's change
    /// points.
    sync_steps: Vec<u64>,
}

impl PctCpStrategy {
    /// Build a PCT-CP strategy from the exploration configuration.
    pub fn new(config: &ExplorationConfig) -> Self {
        Self {
            engine: PriorityEngine::new(),
            rng: SeededRng::new(config.seed),
            config: *config,
            step_count: 0,
            schedule_length: 0,
            sync_steps: Vec::new(),
        }
    }

    /// Reset per-iteration state; change points for iteration `k ≥ 1` are
    /// sampled from the synchronization steps recorded during iteration
    /// `k - 1`.
    pub fn initialize_next_iteration(&mut self, iteration: u64) -> bool {
        if iteration > 0 {
            self.schedule_length = self.schedule_length.max(self.step_count);
        }
        self.engine.clear();
        self.step_count = 0;
        if iteration > 0 {
            let budget = self.config.change_point_budget(self.schedule_length);
            let points = self.rng.sample(&self.sync_steps, budget);
            debug!(iteration, recorded = self.sync_steps.len(),
                   change_points = points.len(), "pctcp iteration initialized");
            self.engine.set_change_points(points);
        }
        self.sync_steps.clear();
        true
    }

    /// Select the next operation to resume; `None` iff nothing is enabled.
    ///
    /// Records the current step index when the selected operation is a
    /// synchronization event, feeding the next iteration's change-point
    /// draw.
    pub fn next_operation(
        &mut self,
        table: &mut OperationTable,
        candidates: &[OperationId],
        current: Option<OperationId>,
        is_yielding: bool,
    ) -> Option<OperationId> {
        let choice = self.engine.schedule_next(
            self.step_count,
            table,
            candidates,
            current,
            is_yielding,
            &mut self.rng,
        )?;
        if table.get(choice).kind.is_synchronizing() {
            self.sync_steps.push(self.step_count);
        }
        trace!(step = self.step_count, op = %choice, "pctcp pick");
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
        self.config.max_steps != 0 && self.step_count >= self.config.max_steps
    }

    /// Like PCT, PCT-CP starves demoted groups; it is not fair.
    pub fn is_fair(&self) -> bool {
        false
    }

    /// Stable human-readable tag.
    pub fn description(&self) -> String {
        format!("pctcp[seed '{}']", self.rng.seed())
    }

    /// Return to the pristine state of a freshly constructed instance.
    pub fn reset(&mut self) {
        self.engine.clear();
        self.step_count = 0;
        self.schedule_length = 0;
        self.sync_steps.clear();
        self.rng.reseed();
    }

    #[cfg(test)]
    fn recorded_sync_steps(&self) -> &[u64] {
        &self.sync_steps
    }

    #[cfg(test)]
    fn change_point_count(&self) -> usize {
        self.engine.change_point_count()
    }
}
