use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use interlace_core::{ExplorationConfig, OperationId, OperationKind, OperationTable, TaskId};
use interlace_strategies::{SchedulingStrategy, StrategyKind};

/// Build a table of `n` enabled task owners plus one continuation each.
fn synthetic_table(n: u64) -> (OperationTable, Vec<OperationId>) {
    let mut table = OperationTable::new();
    for i in 0..n {
        let owner = table.spawn_task_owner(OperationKind::Start, None, TaskId(i));
        table.enable(owner);
        let cont = table.spawn_continuation(OperationKind::Default, owner, TaskId(i));
        table.enable(cont);
    }
    let candidates = table.candidates();
    (table, candidates)
}

fn next_operation_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("next_operation");

    for tasks in [4u64, 16, 64] {
        for (label, kind) in [
            ("random", StrategyKind::Random),
            ("pct", StrategyKind::Pct),
            ("pctcp", StrategyKind::PctCp),
        ] {
            group.bench_with_input(BenchmarkId::new(label, tasks), &tasks, |b, &tasks| {
                let config = ExplorationConfig::new(0, 42).with_priority_switch_points(3);
                let (mut table, candidates) = synthetic_table(tasks);
                let mut strategy = SchedulingStrategy::from_config(kind, &config);
                strategy.initialize_next_iteration(0);
                let mut current = None;
                b.iter(|| {
                    let pick = strategy.next_operation(
                        black_box(&mut table),
                        black_box(&candidates),
                        current,
                        false,
                    );
                    current = pick;
                    black_box(pick)
                });
            });
        }
    }
    group.finish();
}

criterion_group!(benches, next_operation_benchmark);
criterion_main!(benches);
