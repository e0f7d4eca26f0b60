//! Workflow engine benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use flowd_core::WorkflowEngine;
use std::sync::atomic::{AtomicU64, Ordering};

// Global counter to ensure unique definition IDs across all benchmark iterations
static DEF_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Two states, one action that loops back into `active`, so every
/// EXECUTE_ACTION succeeds no matter how often it runs.
fn loop_definition(id: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "name": "Benchmark loop",
        "states": [
            {"id": "open", "name": "Open", "is_initial": true},
            {"id": "active", "name": "Active"}
        ],
        "actions": [
            {"id": "turn", "name": "Turn", "from_states": ["open", "active"], "to_state": "active"}
        ]
    })
}

fn chain_definition(id: &str, states: usize) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "name": "Benchmark chain",
        "states": (0..states).map(|i| serde_json::json!({
            "id": format!("state_{}", i),
            "name": format!("State {}", i),
            "is_initial": i == 0,
            "is_final": i == states - 1
        })).collect::<Vec<_>>(),
        "actions": (0..states - 1).map(|i| serde_json::json!({
            "id": format!("next_{}", i),
            "name": format!("Next {}", i),
            "from_states": format!("state_{}", i),
            "to_state": format!("state_{}", i + 1)
        })).collect::<Vec<_>>()
    })
}

fn bench_create_definition(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine_create_definition");

    let engine = WorkflowEngine::new();

    // Simple definition: validation cost is dominated by fixed overhead
    group.bench_function("simple", |b| {
        b.iter(|| {
            let n = DEF_COUNTER.fetch_add(1, Ordering::Relaxed);
            let doc = loop_definition(&format!("simple-{}", n));
            black_box(engine.add_definition(&doc).unwrap())
        });
    });

    // Large definition: validation walks every state and action reference
    group.bench_function("complex", |b| {
        b.iter(|| {
            let n = DEF_COUNTER.fetch_add(1, Ordering::Relaxed);
            let doc = chain_definition(&format!("complex-{}", n), 20);
            black_box(engine.add_definition(&doc).unwrap())
        });
    });

    group.finish();
}

fn bench_start_instance(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine_start_instance");

    let engine = WorkflowEngine::new();
    engine.add_definition(&loop_definition("bench")).unwrap();

    group.throughput(Throughput::Elements(1));
    group.bench_function("start", |b| {
        b.iter(|| black_box(engine.start_instance("bench").unwrap()));
    });

    group.finish();
}

fn bench_get_instance(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine_get_instance");

    let engine = WorkflowEngine::new();
    engine.add_definition(&loop_definition("bench")).unwrap();

    // Pre-start instances
    let ids: Vec<String> = (0..1000)
        .map(|_| engine.start_instance("bench").unwrap().id)
        .collect();

    group.throughput(Throughput::Elements(1));
    group.bench_function("get", |b| {
        let mut i = 0usize;
        b.iter(|| {
            i = (i + 1) % ids.len();
            black_box(engine.get_instance(&ids[i]).unwrap())
        });
    });

    group.finish();
}

fn bench_execute_action(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine_execute_action");

    let engine = WorkflowEngine::new();
    engine.add_definition(&loop_definition("bench")).unwrap();

    let ids: Vec<String> = (0..1000)
        .map(|_| engine.start_instance("bench").unwrap().id)
        .collect();

    group.throughput(Throughput::Elements(1));

    group.bench_function("self_loop", |b| {
        let mut i = 0usize;
        b.iter(|| {
            i = (i + 1) % ids.len();
            black_box(engine.execute_action(&ids[i], "turn").unwrap())
        });
    });

    // Source check scans the whole from_states list; after the first
    // transition the instance sits in state_20, the last entry.
    let mut wide = chain_definition("wide", 21);
    wide["actions"] = serde_json::json!([{
        "id": "turn",
        "name": "Turn",
        "from_states": (0..21).map(|i| format!("state_{}", i)).collect::<Vec<_>>(),
        "to_state": "state_20"
    }]);
    // Undo the chain's final state so the loop never locks
    wide["states"][20]["is_final"] = serde_json::json!(false);
    engine.add_definition(&wide).unwrap();

    let wide_ids: Vec<String> = (0..1000)
        .map(|_| engine.start_instance("wide").unwrap().id)
        .collect();

    group.bench_function("many_sources", |b| {
        let mut i = 0usize;
        b.iter(|| {
            i = (i + 1) % wide_ids.len();
            black_box(engine.execute_action(&wide_ids[i], "turn").unwrap())
        });
    });

    group.finish();
}

fn bench_execute_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine_throughput");
    group.sample_size(20);

    let engine = WorkflowEngine::new();
    engine.add_definition(&loop_definition("bench")).unwrap();

    for batch_size in [100, 1000] {
        let ids: Vec<String> = (0..batch_size)
            .map(|_| engine.start_instance("bench").unwrap().id)
            .collect();

        group.throughput(Throughput::Elements(batch_size as u64));
        group.bench_with_input(
            BenchmarkId::new("actions", batch_size),
            &ids,
            |b, ids| {
                b.iter(|| {
                    for id in ids {
                        let _ = engine.execute_action(id, "turn");
                    }
                });
            },
        );
    }

    group.finish();
}

fn bench_list_instances(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine_list_instances");

    for count in [100, 1000] {
        let engine = WorkflowEngine::new();
        engine.add_definition(&loop_definition("bench")).unwrap();
        for _ in 0..count {
            engine.start_instance("bench").unwrap();
        }

        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(
            BenchmarkId::new("list", count),
            &engine,
            |b, engine| {
                b.iter(|| black_box(engine.list_instances().len()));
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_create_definition,
    bench_start_instance,
    bench_get_instance,
    bench_execute_action,
    bench_execute_throughput,
    bench_list_instances,
);

criterion_main!(benches);
