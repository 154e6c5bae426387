//! Interlace Strategies
//!
//! The systematic concurrency exploration strategies: on every scheduling
//! decision point of a program under test, a strategy chooses which of the
//! currently enabled asynchronous operations runs next and which boolean
//! and integer nondeterminism values are returned. Re-running the program
//! many times over the schedules these strategies produce surfaces
//! assertion violations, deadlocks, and data races with known coverage
//! bounds.
//!
//! Three strategies are provided behind one closed interface
//! ([`SchedulingStrategy`]):
//!
//! * [`RandomStrategy`] — uniform-random choice among enabled operations;
//!   fair, good at shallow bugs.
//! * [`PctStrategy`] — priority-based probabilistic exploration over
//!   task-operation groups, with the `1/(n·k^(d-1))` bug-depth guarantee.
//! * [`PctCpStrategy`] — PCT with priority-change points sampled at
//!   communication boundaries instead of uniform step indices.
//!
//! Strategies are pure-in, pure-out: they never suspend, never observe the
//! program directly, and are deterministic given their seed and call
//! sequence. Schedules can be captured with [`ScheduleTrace`] for replay.

pub mod pct;
pub mod pctcp;
pub mod random;
pub mod schedule;
pub mod strategy;

pub use pct::PctStrategy;
pub use pctcp::PctCpStrategy;
pub use random::RandomStrategy;
pub use schedule::{ScheduleError, ScheduleStep, ScheduleTrace};
pub use strategy::{SchedulingStrategy, StrategyKind};
