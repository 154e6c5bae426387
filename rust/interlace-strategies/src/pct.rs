//! Probabilistic concurrency testing (PCT) over task-operation groups.
//!
//! PCT maintains a totally ordered priority list and always runs an enabled
//! operation from the highest-priority group, demoting a group to the tail
//! at a small number of randomly chosen step indices (priority-change
//! points). With `n` tasks, schedules of length `k`, and `d` priorities,
//! any bug of depth `d` is found with probability at least
//! `1/(n * k^(d-1))` per iteration.
//!
//! The subtlety on asynchronous task graphs is what a "task" is. A single
//! logical computation is implemented as a run of short-lived continuation
//! operations, so priorities are handed out per *group* of operations, not
//! per operation: every continuation is merged into the group of the task
//! that owns it, identified by its `parent` at each awaiting point. The
//! merge keeps `d` priorities meaning `d` tasks, which is what the
//! probability bound is stated over.
//!
//! # Per-step algorithm
//!
//! 1. Filter the candidate set to enabled operations; none ⇒ deadlock.
//! 2. Register operations seen for the first time and remigrate operations
//!    whose state machine advanced since the last decision point.
//! 3. If this step is a priority-change point, demote the group of the
//!    highest-priority enabled operation; otherwise, if the current
//!    operation is voluntarily yielding, demote its group. Skipped when
//!    only one operation is enabled.
//! 4. Walk the priority list; the first group with an enabled member wins,
//!    and the winner is drawn uniformly from that group's enabled members.

use std::collections::HashSet;

use interlace_core::{
    ExplorationConfig, GroupId, GroupTable, OperationId, OperationTable, SeededRng,
};
use tracing::{debug, trace};

// ---------------------------------------------------------------------------
// PriorityEngine — shared by PCT and PCT-CP
// ---------------------------------------------------------------------------

/// Group bookkeeping and priority-list mechanics.
///
/// The engine is the per-iteration state both PCT variants share; only the
/// derivation of [`change_points`](Self::set_change_points) differs between
/// them.
#[derive(Debug, Default)]
pub(crate) struct PriorityEngine {
    groups: GroupTable,
    /// Priority order over groups; index 0 is highest.
    priority_list: Vec<GroupId>,
    /// Operations that have been registered this iteration.
    known: HashSet<OperationId>,
    /// Step indices at which the highest-priority enabled group is demoted.
    change_points: HashSet<u64>,
}

impl PriorityEngine {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Drop all per-iteration state.
    pub(crate) fn clear(&mut self) {
        self.groups.clear();
        self.priority_list.clear();
        self.known.clear();
        self.change_points.clear();
    }

    /// Install the change-point set for the coming iteration.
    pub(crate) fn set_change_points(&mut self, points: impl IntoIterator<Item = u64>) {
        self.change_points = points.into_iter().collect();
    }

    #[cfg(test)]
    pub(crate) fn change_point_count(&self) -> usize {
        self.change_points.len()
    }

    /// Insert a group at a uniformly random position in the priority list
    /// (appended when the list is empty).
    fn insert_at_random_priority(&mut self, group: GroupId, rng: &mut SeededRng) {
        let position = rng.next_usize(self.priority_list.len() + 1);
        self.priority_list.insert(position, group);
        trace!(%group, position, "group prioritized");
    }

    /// Move a group to the tail of the priority list.
    fn deprioritize(&mut self, group: GroupId) {
        let position = self
            .priority_list
            .iter()
            .position(|&g| g == group)
            .unwrap_or_else(|| panic!("{group} is not in the priority list"));
        self.priority_list.remove(position);
        self.priority_list.push(group);
        debug!(%group, from = position, "group deprioritized");
    }

    /// Register first-seen operations and remigrate advanced continuations.
    ///
    /// Registration shapes, in order of legality:
    /// * a task owner starts a new group at a random priority;
    /// * a delay joins the shared delay group; any other non-task operation
    ///   joins the shared plain group (each created at a random priority on
    ///   first use);
    /// * a fresh continuation joins its parent's group at a random chain
    ///   index.
    ///
    /// A known operation whose `advance_handled` flag is down has crossed a
    /// continuation boundary: it leaves its chain and re-enters its current
    /// parent's chain at a random index. Group owners are pinned and only
    /// have their flag raised. Any other shape is a fatal contract
    /// violation in the runtime adapter, not a recoverable error.
    fn update_registrations(
        &mut self,
        table: &mut OperationTable,
        candidates: &[OperationId],
        rng: &mut SeededRng,
    ) {
        for &id in candidates {
            let op = table.get(id);
            let task = op.task();
            let is_task_owner = op.is_task_owner;
            let is_delay = op.is_delay;
            let is_continuation = op.is_continuation;
            let advance_handled = op.advance_handled;
            let parent = op.parent;

            if self.known.insert(id) {
                match task {
                    Some(task) if is_task_owner => {
                        let group = self.groups.create_task_group(id, task);
                        self.insert_at_random_priority(group, rng);
                    }
                    Some(_) => {
                        assert!(
                            is_continuation,
                            "{id} belongs to a task but is neither its owner nor a \
                             continuation; the runtime adapter is broken"
                        );
                        let parent = parent.unwrap_or_else(|| {
                            panic!("continuation {id} appeared with no parent")
                        });
                        let group = self.groups.group_of(parent).unwrap_or_else(|| {
                            panic!(
                                "continuation {id} appeared before its parent {parent} \
                                 was registered"
                            )
                        });
                        let index = rng.next_usize(self.groups.get(group).len() + 1);
                        self.groups.insert_member(group, index, id);
                        table.get_mut(id).advance_handled = true;
                        trace!(%id, %group, "continuation registered into parent group");
                    }
                    None if is_delay => {
                        let (group, created) = self.groups.append_to_delay(id);
                        if created {
                            self.insert_at_random_priority(group, rng);
                        }
                    }
                    None => {
                        let (group, created) = self.groups.append_to_plain(id);
                        if created {
                            self.insert_at_random_priority(group, rng);
                        }
                    }
                }
            } else if !advance_handled {
                let group = self.groups.group_of(id).unwrap_or_else(|| {
                    panic!("{id} is known but belongs to no group")
                });
                if self.groups.get(group).owner() == id {
                    // Owners are pinned; the advance is absorbed in place.
                    table.get_mut(id).advance_handled = true;
                    continue;
                }
                let parent = parent.unwrap_or_else(|| {
                    panic!("{id} advanced but has no parent to remigrate to")
                });
                let target = self.groups.group_of(parent).unwrap_or_else(|| {
                    panic!("remigration target group of {parent} does not exist")
                });
                self.groups.remove_member(id);
                let index = rng.next_usize(self.groups.get(target).len() + 1);
                self.groups.insert_member(target, index, id);
                table.get_mut(id).advance_handled = true;
                debug!(%id, from = %group, to = %target, "continuation remigrated");
            }
        }
    }

    /// The first group in priority order with an enabled member.
    fn highest_priority_enabled_group(&self, table: &OperationTable) -> Option<GroupId> {
        self.priority_list.iter().copied().find(|&group| {
            self.groups
                .get(group)
                .chain()
                .iter()
                .any(|&member| table.get(member).is_enabled())
        })
    }

    /// Demote a group if this step is a change point, or if the current
    /// operation is yielding. The caller skips this entirely when fewer
    /// than two operations are enabled.
    fn maybe_deprioritize(
        &mut self,
        step: u64,
        table: &OperationTable,
        current: Option<OperationId>,
        is_yielding: bool,
    ) {
        if self.change_points.contains(&step) {
            if let Some(group) = self.highest_priority_enabled_group(table) {
                debug!(step, %group, "priority-change point hit");
                self.deprioritize(group);
            }
        } else if is_yielding {
            if let Some(group) = current.and_then(|op| self.groups.group_of(op)) {
                debug!(step, %group, "yield demotion");
                self.deprioritize(group);
            }
        }
    }

    /// Pick the winner: a uniform draw among the enabled members of the
    /// highest-priority enabled group.
    ///
    /// # Panics
    /// Panics if no registered group has an enabled member; the caller has
    /// already established that the enabled set is non-empty, so a miss
    /// here means registration was skipped for some candidate.
    fn select(&self, table: &OperationTable, rng: &mut SeededRng) -> OperationId {
        let group = self
            .highest_priority_enabled_group(table)
            .expect("an enabled operation exists but no prioritized group contains one");
        let enabled: Vec<OperationId> = self
            .groups
            .get(group)
            .chain()
            .iter()
            .copied()
            .filter(|&member| table.get(member).is_enabled())
            .collect();
        *rng.pick(&enabled)
    }

    /// Run one full scheduling decision. Returns `None` iff no candidate is
    /// enabled.
    pub(crate) fn schedule_next(
        &mut self,
        step: u64,
        table: &mut OperationTable,
        candidates: &[OperationId],
        current: Option<OperationId>,
        is_yielding: bool,
        rng: &mut SeededRng,
    ) -> Option<OperationId> {
        let enabled_count = candidates
            .iter()
            .filter(|&&id| table.get(id).is_enabled())
            .count();
        if enabled_count == 0 {
            return None;
        }
        self.update_registrations(table, candidates, rng);
        if enabled_count > 1 {
            self.maybe_deprioritize(step, table, current, is_yielding);
        }
        Some(self.select(table, rng))
    }

    #[cfg(test)]
    pub(crate) fn priority_order(&self) -> &[GroupId] {
        &self.priority_list
    }

    #[cfg(test)]
    pub(crate) fn groups(&self) -> &GroupTable {
        &self.groups
    }

    #[cfg(test)]
    pub(crate) fn force_change_point(&mut self, step: u64) {
        self.change_points.insert(step);
    }
}

// ---------------------------------------------------------------------------
// PctStrategy
// ---------------------------------------------------------------------------

/// The PCT scheduling strategy.
#[derive(Debug)]
pub struct PctStrategy {
    engine: PriorityEngine,
    rng: SeededRng,
    config: ExplorationConfig,
    step_count: u64,
    /// Running maximum of step counts observed across iterations; the
    /// domain change points are drawn from.
    schedule_length: u64,
}

impl PctStrategy {
    /// Build a PCT strategy from the exploration configuration.
    pub fn new(config: &ExplorationConfig) -> Self {
        Self {
            engine: PriorityEngine::new(),
            rng: SeededRng::new(config.seed),
            config: *config,
            step_count: 0,
            schedule_length: 0,
        }
    }

    /// Reset per-iteration state and draw the next change-point set.
    ///
    /// Iteration 0 runs with an empty priority list and no change points.
    /// Every later iteration first folds the previous iteration's step
    /// count into the running schedule length, then Fisher–Yates-samples
    /// `min(d - 1, schedule_length)` distinct step indices from
    /// `[0, schedule_length)`.
    pub fn initialize_next_iteration(&mut self, iteration: u64) -> bool {
        if iteration > 0 {
            self.schedule_length = self.schedule_length.max(self.step_count);
        }
        self.engine.clear();
        self.step_count = 0;
        if iteration > 0 {
            let budget = self.config.change_point_budget(self.schedule_length);
            let points = self.rng.sample_indices(self.schedule_length, budget);
            debug!(iteration, schedule_length = self.schedule_length,
                   change_points = points.len(), "pct iteration initialized");
            self.engine.set_change_points(points);
        }
        true
    }

    /// Select the next operation to resume; `None` iff nothing is enabled.
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
        trace!(step = self.step_count, op = %choice, "pct pick");
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

    /// PCT starves demoted groups by design; it is not fair.
    pub fn is_fair(&self) -> bool {
        false
    }

    /// Stable human-readable tag.
    pub fn description(&self) -> String {
        format!("pct[seed '{}']", self.rng.seed())
    }

    /// Return to the pristine state of a freshly constructed instance.
    pub fn reset(&mut self) {
        self.engine.clear();
        self.step_count = 0;
        self.schedule_length = 0;
        self.rng.reseed();
    }

    #[cfg(test)]
    pub(crate) fn engine(&self) -> &PriorityEngine {
        &self.engine
    }

    #[cfg(test)]
    pub(crate) fn engine_mut(&mut self) -> &mut PriorityEngine {
        &mut self.engine
    }
}
