//! Interlace Core
//!
//! The data model shared by the systematic concurrency exploration
//! strategies: asynchronous operations and their scheduling states,
//! task-operation groups, the seeded RNG every nondeterministic choice
//! flows through, the exploration configuration, and the operation table
//! the controlled runtime maintains on the strategies' behalf.

pub mod config;
pub mod group;
pub mod operation;
pub mod rng;
pub mod runtime;

pub use config::ExplorationConfig;
pub use group::{GroupId, GroupTable, OperationGroup};
pub use operation::{
    AsyncOperation, OperationId, OperationKind, OperationScope, OperationStatus, TaskId,
};
pub use rng::SeededRng;
pub use runtime::OperationTable;
