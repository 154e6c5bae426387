//! Task-operation groups.
//!
//! A group collects the operations that together implement one logical
//! asynchronous task, so that a priority-based strategy can hand out one
//! priority per *task* instead of one per short-lived continuation. Three
//! shapes of group exist:
//!
//! 1. One group per logical task, created when the task's owner operation
//!    first appears.
//! 2. A single shared group for all plain (non-task, non-delay) operations.
//! 3. A single shared group for all delay operations.
//!
//! Groups are stored in an arena ([`GroupTable`]) and addressed by
//! [`GroupId`] handles; membership is a flat map from operation to group.
//! Every live operation belongs to exactly one group at a time. A group's
//! owner is the first operation registered for it and is pinned: it stays in
//! the chain until the table is cleared between iterations.

use std::collections::HashMap;
use std::fmt;

use tracing::debug;

use crate::operation::{OperationId, TaskId};

// ---------------------------------------------------------------------------
// GroupId
// ---------------------------------------------------------------------------

/// Arena handle for a group in a [`GroupTable`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupId(usize);

impl GroupId {
    /// Return the raw arena index.
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Debug for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GroupId({})", self.0)
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "group:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// OperationGroup
// ---------------------------------------------------------------------------

/// One logical task's worth of operations, in chain order.
#[derive(Debug, Clone)]
pub struct OperationGroup {
    id: GroupId,
    /// The first operation registered for this group. Never removed.
    owner: OperationId,
    /// The logical task this group represents; `None` for the two shared
    /// singletons.
    task: Option<TaskId>,
    /// Ordered member list. Always contains `owner`.
    chain: Vec<OperationId>,
}

impl OperationGroup {
    fn new(id: GroupId, owner: OperationId, task: Option<TaskId>) -> Self {
        Self {
            id,
            owner,
            task,
            chain: vec![owner],
        }
    }

    /// The group's arena handle.
    pub fn id(&self) -> GroupId {
        self.id
    }

    /// The pinned owner operation.
    pub fn owner(&self) -> OperationId {
        self.owner
    }

    /// The logical task this group represents, if any.
    pub fn task(&self) -> Option<TaskId> {
        self.task
    }

    /// The ordered member chain.
    pub fn chain(&self) -> &[OperationId] {
        &self.chain
    }

    /// Number of member operations.
    pub fn len(&self) -> usize {
        self.chain.len()
    }

    /// A group always holds at least its owner.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Whether `op` is currently a member.
    pub fn contains(&self, op: OperationId) -> bool {
        self.chain.contains(&op)
    }
}

// ---------------------------------------------------------------------------
// GroupTable
// ---------------------------------------------------------------------------

/// Arena of groups plus the operation-to-group membership map.
///
/// The table outlives the operations that enter it during an iteration and
/// is cleared wholesale between iterations.
#[derive(Debug, Default)]
pub struct GroupTable {
    groups: Vec<OperationGroup>,
    membership: HashMap<OperationId, GroupId>,
    /// The shared group for plain (non-task, non-delay) operations.
    plain_singleton: Option<GroupId>,
    /// The shared group for delay operations.
    delay_singleton: Option<GroupId>,
}

impl GroupTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of groups currently in the arena.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Whether the arena holds no groups.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Look up a group by handle.
    ///
    /// # Panics
    /// Panics if `id` does not refer to a live group; handles are only ever
    /// minted by this table, so a miss is a bookkeeping bug.
    pub fn get(&self, id: GroupId) -> &OperationGroup {
        &self.groups[id.0]
    }

    /// The group `op` currently belongs to, if it has been registered.
    pub fn group_of(&self, op: OperationId) -> Option<GroupId> {
        self.membership.get(&op).copied()
    }

    /// The shared plain-operation group, if it has been created.
    pub fn plain_singleton(&self) -> Option<GroupId> {
        self.plain_singleton
    }

    /// The shared delay-operation group, if it has been created.
    pub fn delay_singleton(&self) -> Option<GroupId> {
        self.delay_singleton
    }

    /// Iterate over all groups in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &OperationGroup> {
        self.groups.iter()
    }

    // -- registration -----------------------------------------------------

    /// Create a new per-task group owned by `owner`.
    ///
    /// # Panics
    /// Panics if `owner` already belongs to a group.
    pub fn create_task_group(&mut self, owner: OperationId, task: TaskId) -> GroupId {
        assert!(
            !self.membership.contains_key(&owner),
            "{owner} is already grouped; cannot own a new group"
        );
        let id = GroupId(self.groups.len());
        self.groups.push(OperationGroup::new(id, owner, Some(task)));
        self.membership.insert(owner, id);
        debug!(group = %id, %owner, %task, "created task group");
        id
    }

    /// Append `op` to the shared plain-operation group, creating the group
    /// (owned by `op`) if this is its first member. Returns the group handle
    /// and whether the group was created by this call.
    pub fn append_to_plain(&mut self, op: OperationId) -> (GroupId, bool) {
        match self.plain_singleton {
            Some(id) => {
                self.append_member(id, op);
                (id, false)
            }
            None => {
                let id = GroupId(self.groups.len());
                self.groups.push(OperationGroup::new(id, op, None));
                self.membership.insert(op, id);
                self.plain_singleton = Some(id);
                debug!(group = %id, %op, "created plain singleton group");
                (id, true)
            }
        }
    }

    /// Append `op` to the shared delay group, creating the group (owned by
    /// `op`) if this is its first member. Returns the group handle and
    /// whether the group was created by this call.
    pub fn append_to_delay(&mut self, op: OperationId) -> (GroupId, bool) {
        match self.delay_singleton {
            Some(id) => {
                self.append_member(id, op);
                (id, false)
            }
            None => {
                let id = GroupId(self.groups.len());
                self.groups.push(OperationGroup::new(id, op, None));
                self.membership.insert(op, id);
                self.delay_singleton = Some(id);
                debug!(group = %id, %op, "created delay singleton group");
                (id, true)
            }
        }
    }

    // -- membership surgery -----------------------------------------------

    /// Append `op` to the tail of `group`'s chain.
    ///
    /// # Panics
    /// Panics if `op` already belongs to a group.
    pub fn append_member(&mut self, group: GroupId, op: OperationId) {
        assert!(
            !self.membership.contains_key(&op),
            "{op} is already grouped; remove it before re-inserting"
        );
        self.groups[group.0].chain.push(op);
        self.membership.insert(op, group);
    }

    /// Insert `op` into `group`'s chain at `index` (clamped to the chain
    /// length).
    ///
    /// # Panics
    /// Panics if `op` already belongs to a group.
    pub fn insert_member(&mut self, group: GroupId, index: usize, op: OperationId) {
        assert!(
            !self.membership.contains_key(&op),
            "{op} is already grouped; remove it before re-inserting"
        );
        let chain = &mut self.groups[group.0].chain;
        let index = index.min(chain.len());
        chain.insert(index, op);
        self.membership.insert(op, group);
    }

    /// Remove `op` from its current group's chain, returning the group it
    /// was removed from.
    ///
    /// # Panics
    /// Panics if `op` is not grouped, or if `op` is its group's owner —
    /// owners are pinned and must never be removed.
    pub fn remove_member(&mut self, op: OperationId) -> GroupId {
        let group = self
            .membership
            .remove(&op)
            .unwrap_or_else(|| panic!("{op} is not a member of any group"));
        let record = &mut self.groups[group.0];
        assert!(
            record.owner != op,
            "{op} owns {group}; owners are pinned and cannot be removed"
        );
        let pos = record
            .chain
            .iter()
            .position(|&member| member == op)
            .unwrap_or_else(|| panic!("{op} mapped to {group} but is missing from its chain"));
        record.chain.remove(pos);
        group
    }

    /// Drop all groups and memberships. Called between iterations.
    pub fn clear(&mut self) {
        self.groups.clear();
        self.membership.clear();
        self.plain_singleton = None;
        self.delay_singleton = None;
    }

    // -- invariants -------------------------------------------------------

    /// Check the structural invariants: the membership map and the chains
    /// agree, every chain contains its owner, and no operation appears in
    /// two chains. Intended for tests and debug assertions.
    pub fn is_consistent(&self) -> bool {
        let mut seen = HashMap::new();
        for group in &self.groups {
            if !group.contains(group.owner) {
                return false;
            }
            for &member in &group.chain {
                if seen.insert(member, group.id).is_some() {
                    return false;
                }
                if self.membership.get(&member) != Some(&group.id) {
                    return false;
                }
            }
        }
        seen.len() == self.membership.len()
    }
}
