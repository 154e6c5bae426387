//! The strategy interface.
//!
//! Exploration strategies are a small, closed set, so they are modeled as a
//! tagged variant rather than a trait object: exhaustive matching catches a
//! forgotten delegation at compile time, and the runtime can hold a
//! [`SchedulingStrategy`] by value.
//!
//! # Lifecycle
//!
//! The controlled runtime drives a strategy through the same sequence every
//! iteration: one `initialize_next_iteration` call, then one
//! `next_operation` / `next_boolean_choice` / `next_integer_choice` call
//! per scheduling decision. Strategies never observe the program under
//! test directly and never suspend; given the same seed and the same call
//! sequence they produce the same outputs, which is what makes recorded
//! schedules replayable.

use interlace_core::{ExplorationConfig, OperationId, OperationTable};

use crate::pct::PctStrategy;
use crate::pctcp::PctCpStrategy;
use crate::random::RandomStrategy;

// ---------------------------------------------------------------------------
// StrategyKind
// ---------------------------------------------------------------------------

/// Selector for the exploration strategy to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    /// Uniform-random exploration.
    Random,
    /// Priority-based probabilistic exploration.
    Pct,
    /// PCT with change points at communication boundaries.
    PctCp,
}

// ---------------------------------------------------------------------------
// SchedulingStrategy
// ---------------------------------------------------------------------------

/// One of the systematic exploration strategies, chosen at construction.
#[derive(Debug)]
pub enum SchedulingStrategy {
    /// Uniform-random exploration.
    Random(RandomStrategy),
    /// Priority-based probabilistic exploration.
    Pct(PctStrategy),
    /// PCT with change points at communication boundaries.
    PctCp(PctCpStrategy),
}

impl SchedulingStrategy {
    /// Build the strategy selected by `kind` from the configuration.
    pub fn from_config(kind: StrategyKind, config: &ExplorationConfig) -> Self {
        match kind {
            StrategyKind::Random => SchedulingStrategy::Random(RandomStrategy::new(config)),
            StrategyKind::Pct => SchedulingStrategy::Pct(PctStrategy::new(config)),
            StrategyKind::PctCp => SchedulingStrategy::PctCp(PctCpStrategy::new(config)),
        }
    }

    /// Reset per-iteration state before iteration `iteration`. Returns
    /// `false` when further iterations would be meaningless; the strategies
    /// here always have more schedules to explore.
    pub fn initialize_next_iteration(&mut self, iteration: u64) -> bool {
        match self {
            SchedulingStrategy::Random(s) => s.initialize_next_iteration(iteration),
            SchedulingStrategy::Pct(s) => s.initialize_next_iteration(iteration),
            SchedulingStrategy::PctCp(s) => s.initialize_next_iteration(iteration),
        }
    }

    /// Select the next operation to resume among `candidates` (the complete
    /// live set; the strategy filters to enabled ones itself). `current` is
    /// the operation that just ran, and `is_yielding` reports whether it
    /// voluntarily relinquished execution. Returns `None` iff no operation
    /// is enabled — a deadlock, which the runtime interprets.
    pub fn next_operation(
        &mut self,
        table: &mut OperationTable,
        candidates: &[OperationId],
        current: Option<OperationId>,
        is_yielding: bool,
    ) -> Option<OperationId> {
        match self {
            SchedulingStrategy::Random(s) => {
                s.next_operation(table, candidates, current, is_yielding)
            }
            SchedulingStrategy::Pct(s) => {
                s.next_operation(table, candidates, current, is_yielding)
            }
            SchedulingStrategy::PctCp(s) => {
                s.next_operation(table, candidates, current, is_yielding)
            }
        }
    }

    /// Return `true` with probability `1/max_value`.
    pub fn next_boolean_choice(&mut self, current: Option<OperationId>, max_value: u64) -> bool {
        match self {
            SchedulingStrategy::Random(s) => s.next_boolean_choice(current, max_value),
            SchedulingStrategy::Pct(s) => s.next_boolean_choice(current, max_value),
            SchedulingStrategy::PctCp(s) => s.next_boolean_choice(current, max_value),
        }
    }

    /// Return a uniform integer in `[0, max_value)`.
    pub fn next_integer_choice(&mut self, current: Option<OperationId>, max_value: u64) -> u64 {
        match self {
            SchedulingStrategy::Random(s) => s.next_integer_choice(current, max_value),
            SchedulingStrategy::Pct(s) => s.next_integer_choice(current, max_value),
            SchedulingStrategy::PctCp(s) => s.next_integer_choice(current, max_value),
        }
    }

    /// Scheduling decisions made in the current iteration. Every operation,
    /// boolean, and integer choice counts as one step.
    pub fn step_count(&self) -> u64 {
        match self {
            SchedulingStrategy::Random(s) => s.step_count(),
            SchedulingStrategy::Pct(s) => s.step_count(),
            SchedulingStrategy::PctCp(s) => s.step_count(),
        }
    }

    /// Whether the per-iteration step budget is exhausted (`max_steps` of 0
    /// never exhausts).
    pub fn is_max_steps_reached(&self) -> bool {
        match self {
            SchedulingStrategy::Random(s) => s.is_max_steps_reached(),
            SchedulingStrategy::Pct(s) => s.is_max_steps_reached(),
            SchedulingStrategy::PctCp(s) => s.is_max_steps_reached(),
        }
    }

    /// Whether every enabled operation has positive probability of being
    /// scheduled at every step. True only for random exploration.
    pub fn is_fair(&self) -> bool {
        match self {
            SchedulingStrategy::Random(s) => s.is_fair(),
            SchedulingStrategy::Pct(s) => s.is_fair(),
            SchedulingStrategy::PctCp(s) => s.is_fair(),
        }
    }

    /// Stable human-readable tag, e.g. `pct[seed '42']`. Suitable for
    /// golden comparisons in test reports.
    pub fn description(&self) -> String {
        match self {
            SchedulingStrategy::Random(s) => s.description(),
            SchedulingStrategy::Pct(s) => s.description(),
            SchedulingStrategy::PctCp(s) => s.description(),
        }
    }

    /// Return to the pristine state of a freshly constructed instance,
    /// including a reseeded RNG.
    pub fn reset(&mut self) {
        match self {
            SchedulingStrategy::Random(s) => s.reset(),
            SchedulingStrategy::Pct(s) => s.reset(),
            SchedulingStrategy::PctCp(s) => s.reset(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_config_builds_the_selected_variant() {
        let config = ExplorationConfig::new(100, 7);
        assert!(matches!(
            SchedulingStrategy::from_config(StrategyKind::Random, &config),
            SchedulingStrategy::Random(_),
        ));
        assert!(matches!(
            SchedulingStrategy::from_config(StrategyKind::Pct, &config),
            SchedulingStrategy::Pct(_),
        ));
        assert!(matches!(
            SchedulingStrategy::from_config(StrategyKind::PctCp, &config),
            SchedulingStrategy::PctCp(_),
        ));
    }

    #[test]
    fn descriptions_are_stable_tags() {
        let config = ExplorationConfig::new(0, 9);
        for (kind, tag) in [
            (StrategyKind::Random, "random[seed '9']"),
            (StrategyKind::Pct, "pct[seed '9']"),
            (StrategyKind::PctCp, "pctcp[seed '9']"),
        ] {
            let strategy = SchedulingStrategy::from_config(kind, &config);
            assert_eq!(strategy.description(), tag);
        }
    }

    #[test]
    fn only_random_is_fair() {
        let config = ExplorationConfig::new(0, 1);
        assert!(SchedulingStrategy::from_config(StrategyKind::Random, &config).is_fair());
        assert!(!SchedulingStrategy::from_config(StrategyKind::Pct, &config).is_fair());
        assert!(!SchedulingStrategy::from_config(StrategyKind::PctCp, &config).is_fair());
    }

    #[test]
    fn all_strategies_have_more_iterations_to_offer() {
        let config = ExplorationConfig::new(0, 1);
        for kind in [StrategyKind::Random, StrategyKind::Pct, StrategyKind::PctCp] {
            let mut strategy = SchedulingStrategy::from_config(kind, &config);
            for iteration in 0..5 {
                assert!(strategy.initialize_next_iteration(iteration));
            }
        }
    }
}
