//! The asynchronous operation model.
//!
//! An [`AsyncOperation`] is the unit of concurrency the exploration
//! strategies schedule over: an OS thread, a task continuation, or a timer
//! delay, as declared by the controlled runtime. Operations carry the
//! attributes the strategies read (status, kind, parent linkage, task
//! membership) and a single flag the strategies write back
//! ([`AsyncOperation::advance_handled`]).
//!
//! Identity is an arena index: the runtime's operation table stores
//! operations in a `Vec` and hands out [`OperationId`] handles, so there are
//! no back-references between operations and the groups that collect them.

use std::fmt;

// ---------------------------------------------------------------------------
// OperationId
// ---------------------------------------------------------------------------

/// A stable identifier for an operation within one test iteration.
///
/// Ids index into the runtime's operation table and are assigned densely in
/// creation order. They are never reused while an iteration is running.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OperationId(u64);

impl OperationId {
    /// Build an id from a raw table index.
    pub const fn from_index(index: usize) -> Self {
        Self(index as u64)
    }

    /// Return the raw numeric value (useful for logging and trace records).
    pub fn as_u64(self) -> u64 {
        self.0
    }

    /// Return the operation-table index this id refers to.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OperationId({})", self.0)
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "op:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// TaskId
// ---------------------------------------------------------------------------

/// The runtime-declared logical task an operation belongs to.
///
/// A single asynchronous computation is implemented as a sequence of
/// short-lived continuation operations; all of them share the task id of the
/// computation they advance. Plain threads and delays carry no task id.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub u64);

impl TaskId {
    /// Return the raw numeric value.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TaskId({})", self.0)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// OperationStatus
// ---------------------------------------------------------------------------

/// The scheduling state of an operation.
///
/// Only [`Enabled`](OperationStatus::Enabled) operations are eligible for
/// selection. Status transitions are driven exclusively by the runtime; the
/// strategies treat the field as read-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationStatus {
    /// Created but not yet runnable.
    None,
    /// Eligible to be scheduled at the next decision point.
    Enabled,
    /// Sleeping on a timer; becomes enabled when the runtime fires it.
    Delayed,
    /// Waiting for all of a set of operations to complete.
    BlockedOnWaitAll,
    /// Waiting for any of a set of operations to complete.
    BlockedOnWaitAny,
    /// Waiting to acquire a lock or other exclusive resource.
    BlockedOnResource,
    /// Waiting for a message to arrive.
    BlockedOnReceive,
    /// Finished; will never run again.
    Completed,
}

impl OperationStatus {
    /// Whether the operation can be picked at a scheduling point.
    pub fn is_enabled(self) -> bool {
        matches!(self, OperationStatus::Enabled)
    }

    /// Whether the operation is waiting on another operation or resource.
    pub fn is_blocked(self) -> bool {
        matches!(
            self,
            OperationStatus::BlockedOnWaitAll
                | OperationStatus::BlockedOnWaitAny
                | OperationStatus::BlockedOnResource
                | OperationStatus::BlockedOnReceive
        )
    }
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            OperationStatus::None => "None",
            OperationStatus::Enabled => "Enabled",
            OperationStatus::Delayed => "Delayed",
            OperationStatus::BlockedOnWaitAll => "BlockedOnWaitAll",
            OperationStatus::BlockedOnWaitAny => "BlockedOnWaitAny",
            OperationStatus::BlockedOnResource => "BlockedOnResource",
            OperationStatus::BlockedOnReceive => "BlockedOnReceive",
            OperationStatus::Completed => "Completed",
        };
        f.write_str(label)
    }
}

// ---------------------------------------------------------------------------
// OperationKind
// ---------------------------------------------------------------------------

/// Taxonomy tag describing what an operation does.
///
/// Strategies may observe the kind; the PCT-CP strategy uses it to identify
/// synchronization events (see [`OperationKind::is_synchronizing`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    /// The bootstrap operation that starts a test iteration.
    Start,
    /// Creation of a new task or thread.
    Create,
    /// Joining on another operation's completion.
    Join,
    /// Sending a message or signal.
    Send,
    /// Receiving a message or signal.
    Receive,
    /// A voluntary yield back to the scheduler.
    Yield,
    /// A timer delay.
    Delay,
    /// Ordinary computation with no special classification.
    Default,
}

impl OperationKind {
    /// Whether this kind marks a logical communication boundary.
    ///
    /// PCT-CP concentrates priority-change points at steps where an
    /// operation of a synchronizing kind was scheduled.
    pub fn is_synchronizing(self) -> bool {
        matches!(
            self,
            OperationKind::Send
                | OperationKind::Receive
                | OperationKind::Join
                | OperationKind::Yield
                | OperationKind::Create
        )
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            OperationKind::Start => "Start",
            OperationKind::Create => "Create",
            OperationKind::Join => "Join",
            OperationKind::Send => "Send",
            OperationKind::Receive => "Receive",
            OperationKind::Yield => "Yield",
            OperationKind::Delay => "Delay",
            OperationKind::Default => "Default",
        };
        f.write_str(label)
    }
}

// ---------------------------------------------------------------------------
// OperationScope
// ---------------------------------------------------------------------------

/// Whether the operation currently holds a monitor-style lock.
///
/// The runtime toggles the scope when the operation enters or exits a
/// critical section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationScope {
    /// Not inside a critical section.
    Default,
    /// Currently holding a lock.
    Synchronized,
}

// ---------------------------------------------------------------------------
// AsyncOperation
// ---------------------------------------------------------------------------

/// A scheduler-visible unit of concurrent work.
///
/// Created by the runtime, destroyed when the iteration ends. The `id` and
/// `task` fields never change after creation; `parent` may be rewritten by
/// the runtime only while [`advance_handled`](Self::advance_handled) is
/// `false` (i.e. while an unhandled continuation boundary is pending).
#[derive(Debug, Clone)]
pub struct AsyncOperation {
    /// Stable identity within the iteration.
    id: OperationId,
    /// Scheduling state; written only by the runtime.
    pub status: OperationStatus,
    /// Taxonomy tag.
    pub kind: OperationKind,
    /// Lock-holding scope; toggled by the runtime on monitor enter/exit.
    pub scope: OperationScope,
    /// The operation that created or most recently resumed this one.
    pub parent: Option<OperationId>,
    /// The logical task this operation advances; `None` for plain threads
    /// and delays.
    task: Option<TaskId>,
    /// Set by the runtime when this operation is a state-machine
    /// continuation rather than a fresh thread of control.
    pub is_continuation: bool,
    /// Set by the runtime on the first operation of a logical task.
    pub is_task_owner: bool,
    /// Set by the runtime on timer-delay operations.
    pub is_delay: bool,
    /// Cleared by the runtime whenever the underlying state machine
    /// advances; set back to `true` by the strategy once it has re-homed
    /// the operation into its parent's group. This is the only operation
    /// field a strategy writes.
    pub advance_handled: bool,
}

impl AsyncOperation {
    /// Build a fresh operation record. Used by the runtime's operation
    /// table; not part of the strategy-facing surface.
    pub(crate) fn new(
        id: OperationId,
        kind: OperationKind,
        parent: Option<OperationId>,
        task: Option<TaskId>,
    ) -> Self {
        Self {
            id,
            status: OperationStatus::None,
            kind,
            scope: OperationScope::Default,
            parent,
            task,
            is_continuation: false,
            is_task_owner: false,
            is_delay: false,
            advance_handled: true,
        }
    }

    /// The operation's stable identity.
    pub fn id(&self) -> OperationId {
        self.id
    }

    /// The logical task this operation belongs to, if any.
    pub fn task(&self) -> Option<TaskId> {
        self.task
    }

    /// Shorthand for `self.status.is_enabled()`.
    pub fn is_enabled(&self) -> bool {
        self.status.is_enabled()
    }
}
