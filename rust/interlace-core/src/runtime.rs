//! The runtime-facing operation table and the contract it enforces.
//!
//! The controlled runtime serializes the program under test so that exactly
//! one operation executes between two consecutive scheduling points. At each
//! point it hands the strategy the complete set of live operations via this
//! table. The table is the runtime's half of the bargain; the obligations it
//! honors are:
//!
//! * `status` transitions, `parent`, and the classification flags are
//!   written before the next scheduling point;
//! * every state-machine advance is reported through
//!   [`OperationTable::notify_continuation`], which clears
//!   `advance_handled` and rewrites the parent;
//! * between two consecutive scheduling points at most one new operation
//!   appears — except the very first point, which may introduce two (the
//!   bootstrap pair). [`OperationTable::take_created_since_last_point`]
//!   checks this.
//!
//! Operations live in an arena `Vec` indexed by [`OperationId`]; they are
//! created by the runtime and destroyed wholesale when the iteration ends.

use tracing::trace;

use crate::operation::{
    AsyncOperation, OperationId, OperationKind, OperationScope, OperationStatus, TaskId,
};

/// How many operations the very first scheduling point may introduce.
///
/// Test entry points start a root thread and the root task's owner before
/// the scheduler runs, so the first point sees up to two fresh operations.
const BOOTSTRAP_PAIR: usize = 2;

// ---------------------------------------------------------------------------
// OperationTable
// ---------------------------------------------------------------------------

/// Arena of all operations known in the current iteration.
#[derive(Debug, Default)]
pub struct OperationTable {
    ops: Vec<AsyncOperation>,
    /// Operations created since the previous scheduling point.
    created_since_point: Vec<OperationId>,
    /// Number of scheduling points observed so far this iteration.
    points_observed: u64,
}

impl OperationTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of operations created this iteration.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Whether no operations have been created yet.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Look up an operation by id.
    ///
    /// # Panics
    /// Panics if `id` was not minted by this table in this iteration.
    pub fn get(&self, id: OperationId) -> &AsyncOperation {
        &self.ops[id.index()]
    }

    /// Mutable lookup. Strategy code uses this solely to set
    /// `advance_handled` after remigration.
    pub fn get_mut(&mut self, id: OperationId) -> &mut AsyncOperation {
        &mut self.ops[id.index()]
    }

    /// The complete candidate set for a scheduling point: every operation
    /// in creation order, enabled or not.
    pub fn candidates(&self) -> Vec<OperationId> {
        self.ops.iter().map(|op| op.id()).collect()
    }

    /// Number of currently enabled operations.
    pub fn enabled_count(&self) -> usize {
        self.ops.iter().filter(|op| op.is_enabled()).count()
    }

    // -- creation ---------------------------------------------------------

    fn push(&mut self, op: AsyncOperation) -> OperationId {
        let id = op.id();
        trace!(%id, kind = %op.kind, "operation created");
        self.ops.push(op);
        self.created_since_point.push(id);
        id
    }

    /// Create the owner operation of a new logical task.
    pub fn spawn_task_owner(
        &mut self,
        kind: OperationKind,
        parent: Option<OperationId>,
        task: TaskId,
    ) -> OperationId {
        let id = OperationId::from_index(self.ops.len());
        let mut op = AsyncOperation::new(id, kind, parent, Some(task));
        op.is_task_owner = true;
        self.push(op)
    }

    /// Create a continuation of an existing logical task.
    ///
    /// The continuation is born with an unhandled advance (its boundary has
    /// not been seen by a strategy yet), so the next scheduling point will
    /// home it into its parent's group.
    pub fn spawn_continuation(
        &mut self,
        kind: OperationKind,
        parent: OperationId,
        task: TaskId,
    ) -> OperationId {
        let id = OperationId::from_index(self.ops.len());
        let mut op = AsyncOperation::new(id, kind, Some(parent), Some(task));
        op.is_continuation = true;
        op.advance_handled = false;
        self.push(op)
    }

    /// Create a plain thread-of-control operation with no task membership.
    pub fn spawn_thread(&mut self, kind: OperationKind, parent: Option<OperationId>) -> OperationId {
        let id = OperationId::from_index(self.ops.len());
        let op = AsyncOperation::new(id, kind, parent, None);
        self.push(op)
    }

    /// Create a timer-delay operation.
    pub fn spawn_delay(&mut self, parent: Option<OperationId>) -> OperationId {
        let id = OperationId::from_index(self.ops.len());
        let mut op = AsyncOperation::new(id, OperationKind::Delay, parent, None);
        op.is_delay = true;
        op.status = OperationStatus::Delayed;
        self.push(op)
    }

    // -- runtime-side transitions ----------------------------------------

    /// Set an operation's scheduling status.
    pub fn set_status(&mut self, id: OperationId, status: OperationStatus) {
        let op = &mut self.ops[id.index()];
        trace!(%id, from = %op.status, to = %status, "status transition");
        op.status = status;
    }

    /// Mark an operation enabled.
    pub fn enable(&mut self, id: OperationId) {
        self.set_status(id, OperationStatus::Enabled);
    }

    /// Mark an operation completed.
    pub fn complete(&mut self, id: OperationId) {
        self.set_status(id, OperationStatus::Completed);
    }

    /// Report that an operation's state machine advanced across an awaiting
    /// point and is now owned by `new_parent`.
    ///
    /// This is the single hook the exploration core needs from the
    /// instrumentation: it clears `advance_handled` (the parent rewrite is
    /// only legal while the flag is down) and records the new parent. The
    /// strategy consumes the flag at the next scheduling point by
    /// remigrating the operation into its parent's group.
    ///
    /// # Panics
    /// Panics if the operation does not belong to a logical task; plain
    /// threads and delays have no state machine to advance.
    pub fn notify_continuation(&mut self, id: OperationId, new_parent: OperationId) {
        let op = &mut self.ops[id.index()];
        assert!(
            op.task().is_some(),
            "{id} is not a task operation; nothing can advance it"
        );
        trace!(%id, parent = %new_parent, "continuation advanced");
        op.parent = Some(new_parent);
        op.advance_handled = false;
    }

    /// Record that the operation entered a monitor-style critical section.
    pub fn enter_synchronized(&mut self, id: OperationId) {
        self.ops[id.index()].scope = OperationScope::Synchronized;
    }

    /// Record that the operation exited its critical section.
    pub fn exit_synchronized(&mut self, id: OperationId) {
        self.ops[id.index()].scope = OperationScope::Default;
    }

    // -- contract checks --------------------------------------------------

    /// Drain the list of operations created since the previous scheduling
    /// point, advancing the point counter.
    ///
    /// In debug builds this asserts the creation-rate contract: at most one
    /// fresh operation per context switch, except the first point which may
    /// introduce the bootstrap pair. A violation means the instrumentation
    /// is wrong, not the program under test.
    pub fn take_created_since_last_point(&mut self) -> Vec<OperationId> {
        let created = std::mem::take(&mut self.created_since_point);
        let limit = if self.points_observed == 0 {
            BOOTSTRAP_PAIR
        } else {
            1
        };
        debug_assert!(
            created.len() <= limit,
            "{} operations appeared between scheduling points (limit {limit}); \
             the runtime adapter is broken",
            created.len(),
        );
        self.points_observed += 1;
        created
    }

    /// Number of scheduling points observed this iteration.
    pub fn points_observed(&self) -> u64 {
        self.points_observed
    }

    /// Destroy all operations. Called when the iteration ends.
    pub fn reset(&mut self) {
        self.ops.clear();
        self.created_since_point.clear();
        self.points_observed = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_shapes_set_the_classification_flags() {
        let mut table = OperationTable::new();
        let owner = table.spawn_task_owner(OperationKind::Start, None, TaskId(1));
        let cont = table.spawn_continuation(OperationKind::Default, owner, TaskId(1));
        let thread = table.spawn_thread(OperationKind::Create, Some(owner));
        let delay = table.spawn_delay(Some(owner));

        assert!(table.get(owner).is_task_owner);
        assert!(!table.get(owner).is_continuation);

        assert!(table.get(cont).is_continuation);
        assert!(!table.get(cont).advance_handled);
        assert_eq!(table.get(cont).parent, Some(owner));

        assert_eq!(table.get(thread).task(), None);
        assert!(table.get(delay).is_delay);
        assert_eq!(table.get(delay).status, OperationStatus::Delayed);
    }

    #[test]
    fn candidates_cover_every_operation_in_creation_order() {
        let mut table = OperationTable::new();
        let a = table.spawn_thread(OperationKind::Start, None);
        let b = table.spawn_thread(OperationKind::Create, Some(a));
        table.complete(a);
        assert_eq!(table.candidates(), vec![a, b]);
    }

    #[test]
    fn notify_continuation_clears_the_handled_flag() {
        let mut table = OperationTable::new();
        let owner = table.spawn_task_owner(OperationKind::Start, None, TaskId(1));
        let cont = table.spawn_continuation(OperationKind::Default, owner, TaskId(1));
        table.get_mut(cont).advance_handled = true;

        let resumer = table.spawn_thread(OperationKind::Default, None);
        table.notify_continuation(cont, resumer);
        assert_eq!(table.get(cont).parent, Some(resumer));
        assert!(!table.get(cont).advance_handled);
    }

    #[test]
    #[should_panic(expected = "not a task operation")]
    fn plain_threads_have_no_state_machine() {
        let mut table = OperationTable::new();
        let a = table.spawn_thread(OperationKind::Start, None);
        let b = table.spawn_thread(OperationKind::Create, Some(a));
        table.notify_continuation(b, a);
    }

    #[test]
    fn first_point_accepts_the_bootstrap_pair() {
        let mut table = OperationTable::new();
        let root = table.spawn_thread(OperationKind::Start, None);
        let owner = table.spawn_task_owner(OperationKind::Create, Some(root), TaskId(0));
        let created = table.take_created_since_last_point();
        assert_eq!(created, vec![root, owner]);
        assert_eq!(table.points_observed(), 1);
    }

    #[test]
    fn later_points_see_at_most_one_new_operation() {
        let mut table = OperationTable::new();
        table.spawn_thread(OperationKind::Start, None);
        table.take_created_since_last_point();

        let next = table.spawn_thread(OperationKind::Create, None);
        let created = table.take_created_since_last_point();
        assert_eq!(created, vec![next]);

        // A quiet point drains nothing.
        assert!(table.take_created_since_last_point().is_empty());
    }

    #[test]
    fn synchronized_scope_toggles() {
        let mut table = OperationTable::new();
        let a = table.spawn_thread(OperationKind::Start, None);
        table.enter_synchronized(a);
        assert_eq!(table.get(a).scope, OperationScope::Synchronized);
        table.exit_synchronized(a);
        assert_eq!(table.get(a).scope, OperationScope::Default);
    }

    #[test]
    fn reset_destroys_the_iteration() {
        let mut table = OperationTable::new();
        table.spawn_thread(OperationKind::Start, None);
        table.take_created_since_last_point();
        table.reset();
        assert!(table.is_empty());
        assert_eq!(table.points_observed(), 0);
        assert!(table.candidates().is_empty());
    }
}
