//! Runtime-adapter integration: drives each strategy through a scripted
//! program the way the controlled runtime would — one operation resumed
//! per scheduling point, operations spawned mid-run, statuses maintained
//! by the driver, and the creation-rate contract checked at every point.

use std::collections::HashMap;

use interlace_core::{
    ExplorationConfig, OperationId, OperationKind, OperationStatus, OperationTable, TaskId,
};
use interlace_strategies::{ScheduleTrace, SchedulingStrategy, StrategyKind};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

/// One pass of the scripted program: a root thread and a first task owner
/// boot together (the bootstrap pair); the owner later spawns a
/// continuation and the root starts a second task. Every selection spends
/// one unit of the selected operation's budget; at zero it completes.
///
/// Returns the step count and the completion order.
fn drive_program(strategy: &mut SchedulingStrategy) -> (u64, Vec<u64>) {
    let mut table = OperationTable::new();
    let root = table.spawn_thread(OperationKind::Start, None);
    table.enable(root);
    let owner = table.spawn_task_owner(OperationKind::Create, Some(root), TaskId(0));
    table.enable(owner);

    let mut budgets: HashMap<OperationId, u32> = HashMap::from([(root, 4), (owner, 6)]);
    let mut spawned_continuation = false;
    let mut spawned_second_task = false;
    let mut current = None;
    let mut completion_order = Vec::new();

    loop {
        // The runtime half of the bargain: at most one fresh operation per
        // scheduling point, two at the very first.
        let created = table.take_created_since_last_point();
        assert!(created.len() <= 2);

        if strategy.is_max_steps_reached() {
            break;
        }
        let candidates = table.candidates();
        let Some(next) = strategy.next_operation(&mut table, &candidates, current, false) else {
            break;
        };
        current = Some(next);

        let budget = budgets.get_mut(&next).expect("selected op has a budget");
        *budget -= 1;
        let budget = *budget;

        if next == owner && budget == 3 && !spawned_continuation {
            spawned_continuation = true;
            let cont = table.spawn_continuation(OperationKind::Default, owner, TaskId(0));
            table.enable(cont);
            budgets.insert(cont, 3);
        } else if next == root && budget == 2 && !spawned_second_task {
            spawned_second_task = true;
            let second = table.spawn_task_owner(OperationKind::Create, Some(root), TaskId(1));
            table.enable(second);
            budgets.insert(second, 2);
        }

        if budget == 0 {
            table.complete(next);
            completion_order.push(next.as_u64());
        }
    }
    (strategy.step_count(), completion_order)
}

/// Total budget of the scripted program: 4 + 6 + 3 + 2.
const PROGRAM_STEPS: u64 = 15;

#[test]
fn every_strategy_runs_the_program_to_completion() {
    init_tracing();
    let config = ExplorationConfig::new(0, 42).with_priority_switch_points(3);
    for kind in [StrategyKind::Random, StrategyKind::Pct, StrategyKind::PctCp] {
        let mut strategy = SchedulingStrategy::from_config(kind, &config);
        assert!(strategy.initialize_next_iteration(0));
        let (steps, order) = drive_program(&mut strategy);
        assert_eq!(steps, PROGRAM_STEPS, "{}", strategy.description());
        assert_eq!(order.len(), 4, "all four operations complete");
    }
}

#[test]
fn identical_seeds_produce_identical_explorations() {
    init_tracing();
    let config = ExplorationConfig::new(0, 7).with_priority_switch_points(4);
    for kind in [StrategyKind::Random, StrategyKind::Pct, StrategyKind::PctCp] {
        let mut first_run = Vec::new();
        let mut second_run = Vec::new();
        for run in [&mut first_run, &mut second_run] {
            let mut strategy = SchedulingStrategy::from_config(kind, &config);
            for iteration in 0..4 {
                assert!(strategy.initialize_next_iteration(iteration));
                run.push(drive_program(&mut strategy));
            }
        }
        assert_eq!(first_run, second_run);
    }
}

#[test]
fn iterations_explore_under_a_carried_schedule_length() {
    init_tracing();
    // Multi-iteration PCT: iteration 0 measures the schedule, later
    // iterations draw change points from it. The program still always
    // finishes in exactly its budgeted steps.
    let config = ExplorationConfig::new(0, 99).with_priority_switch_points(5);
    let mut strategy = SchedulingStrategy::from_config(StrategyKind::Pct, &config);
    for iteration in 0..6 {
        assert!(strategy.initialize_next_iteration(iteration));
        let (steps, _) = drive_program(&mut strategy);
        assert_eq!(steps, PROGRAM_STEPS);
    }
}

#[test]
fn deadlocked_program_is_reported_not_stepped() {
    init_tracing();
    let config = ExplorationConfig::new(0, 5);
    for kind in [StrategyKind::Random, StrategyKind::Pct, StrategyKind::PctCp] {
        let mut strategy = SchedulingStrategy::from_config(kind, &config);
        let mut table = OperationTable::new();
        let a = table.spawn_task_owner(OperationKind::Start, None, TaskId(0));
        let b = table.spawn_task_owner(OperationKind::Start, None, TaskId(1));
        // Both tasks wait on each other: nothing is enabled.
        table.set_status(a, OperationStatus::BlockedOnWaitAll);
        table.set_status(b, OperationStatus::BlockedOnWaitAll);
        assert_eq!(table.enabled_count(), 0);
        let candidates = table.candidates();
        assert_eq!(strategy.next_operation(&mut table, &candidates, None, false), None);
        assert_eq!(strategy.step_count(), 0);
    }
}

#[test]
fn max_steps_budget_stops_the_iteration() {
    init_tracing();
    let config = ExplorationConfig::new(5, 21).with_priority_switch_points(2);
    let mut strategy = SchedulingStrategy::from_config(StrategyKind::Pct, &config);
    assert!(strategy.initialize_next_iteration(0));
    let (steps, order) = drive_program(&mut strategy);
    assert_eq!(steps, 5);
    assert!(order.len() < 4, "the budget cuts the program short");
    assert!(strategy.is_max_steps_reached());
}

#[test]
fn recorded_traces_replay_bit_for_bit() {
    init_tracing();
    let config = ExplorationConfig::new(0, 1312);
    let record = |kind: StrategyKind| -> ScheduleTrace {
        let mut strategy = SchedulingStrategy::from_config(kind, &config);
        strategy.initialize_next_iteration(0);
        let mut trace = ScheduleTrace::new(strategy.description(), config.seed);
        let mut table = OperationTable::new();
        let a = table.spawn_task_owner(OperationKind::Send, None, TaskId(0));
        table.enable(a);
        let b = table.spawn_task_owner(OperationKind::Receive, None, TaskId(1));
        table.enable(b);
        let candidates = table.candidates();
        for i in 0..30 {
            match i % 3 {
                0 => {
                    let op = strategy
                        .next_operation(&mut table, &candidates, None, false)
                        .unwrap();
                    trace.record_operation(op);
                }
                1 => trace.record_boolean(strategy.next_boolean_choice(None, 2)),
                _ => trace.record_integer(strategy.next_integer_choice(None, 16)),
            }
        }
        trace
    };

    for kind in [StrategyKind::Random, StrategyKind::Pct, StrategyKind::PctCp] {
        let first = record(kind);
        let second = record(kind);
        assert_eq!(first, second);

        let json = first.to_json().unwrap();
        assert_eq!(ScheduleTrace::from_json(&json).unwrap(), first);
    }
}

#[test]
#[should_panic(expected = "operations appeared between scheduling points")]
fn runaway_operation_creation_is_caught() {
    let mut table = OperationTable::new();
    table.spawn_thread(OperationKind::Start, None);
    table.take_created_since_last_point();
    // Two spawns with no scheduling point in between: the adapter is broken.
    table.spawn_thread(OperationKind::Create, None);
    table.spawn_thread(OperationKind::Create, None);
    table.take_created_since_last_point();
}
