//! Serializable record of one iteration's scheduling decisions.
//!
//! The core itself persists nothing; the driver that owns the exploration
//! loop can capture each decision into a [`ScheduleTrace`] as it forwards
//! strategy choices to the program under test, serialize the trace next to
//! a failing test report, and later replay the interleaving by re-running
//! with the recorded seed. The trace stores raw values only — no handles
//! into live runtime state.

use serde::{Deserialize, Serialize};
use std::path::Path;

use interlace_core::OperationId;

// ---------------------------------------------------------------------------
// ScheduleStep
// ---------------------------------------------------------------------------

/// A single recorded decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScheduleStep {
    /// An operation was selected to resume.
    Operation(u64),
    /// A boolean nondeterminism value was returned to the program.
    Boolean(bool),
    /// An integer nondeterminism value was returned to the program.
    Integer(u64),
}

// ---------------------------------------------------------------------------
// ScheduleTrace
// ---------------------------------------------------------------------------

/// An ordered sequence of decisions plus the context needed to replay it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleTrace {
    /// The description tag of the strategy that produced the trace.
    pub strategy: String,
    /// The seed the strategy ran with.
    pub seed: u64,
    /// Decisions in the order they were made.
    pub steps: Vec<ScheduleStep>,
}

impl ScheduleTrace {
    /// Create an empty trace for the given strategy tag and seed.
    pub fn new(strategy: impl Into<String>, seed: u64) -> Self {
        Self {
            strategy: strategy.into(),
            seed,
            steps: Vec::new(),
        }
    }

    /// Record an operation selection.
    pub fn record_operation(&mut self, op: OperationId) {
        self.steps.push(ScheduleStep::Operation(op.as_u64()));
    }

    /// Record a boolean choice.
    pub fn record_boolean(&mut self, value: bool) {
        self.steps.push(ScheduleStep::Boolean(value));
    }

    /// Record an integer choice.
    pub fn record_integer(&mut self, value: u64) {
        self.steps.push(ScheduleStep::Integer(value));
    }

    /// Number of recorded decisions.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, ScheduleError> {
        serde_json::to_string_pretty(self).map_err(|e| ScheduleError::Serialize(e.to_string()))
    }

    /// Deserialize from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, ScheduleError> {
        serde_json::from_str(json).map_err(|e| ScheduleError::Deserialize(e.to_string()))
    }

    /// Save the trace to a file as JSON.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ScheduleError> {
        let json = self.to_json()?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load a trace from a JSON file.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ScheduleError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }
}

// ---------------------------------------------------------------------------
// ScheduleError
// ---------------------------------------------------------------------------

/// Failures while moving a trace to or from storage.
#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialize(String),
    #[error("deserialization error: {0}")]
    Deserialize(String),
}
