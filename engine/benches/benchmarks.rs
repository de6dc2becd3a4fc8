//! Performance benchmarks for opledger-engine

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use opledger_engine::{
    payload, Operation, OperationKind, OperationRecorder, Reducer, RelationRef,
};
use serde_json::json;

/// A mixed workload spread over `keys` fields, with no conflicting pairs.
fn mixed_operations(count: usize, keys: usize) -> Vec<Operation> {
    (0..count)
        .map(|i| {
            let key = format!("field_{}", i % keys);
            match (i % keys) % 4 {
                0 => Operation::set(key, json!(format!("value {}", i))),
                1 => Operation::increment(key, 1),
                2 => Operation::add_unique(key, vec![json!(i % 7)]),
                _ => Operation::add_relation(key, vec![RelationRef::new("Post", format!("p{}", i))]),
            }
            .expect("benchmark operation")
        })
        .collect()
}

fn bench_recorder(c: &mut Criterion) {
    let mut group = c.benchmark_group("recorder");

    group.bench_function("append", |b| {
        let mut recorder = OperationRecorder::new();
        let mut n = 0u64;

        b.iter(|| {
            n += 1;
            recorder
                .append(
                    black_box(OperationKind::Increment),
                    black_box("counter"),
                    Some(json!(n)),
                )
                .map(|op| op.kind())
        })
    });

    group.bench_function("stage_reduce_clear", |b| {
        b.iter(|| {
            let mut recorder = OperationRecorder::new();
            for op in mixed_operations(100, 10) {
                recorder.append_operation(op);
            }
            let table = recorder.reduce();
            recorder.clear_staged();
            table
        })
    });

    group.finish();
}

fn bench_reduction(c: &mut Criterion) {
    let mut group = c.benchmark_group("reduction");

    for size in [10, 100, 1000].iter() {
        group.bench_with_input(BenchmarkId::new("same_key", size), size, |b, &size| {
            let ops: Vec<_> = (0..size)
                .map(|i| Operation::increment("counter", i as i64).expect("increment"))
                .collect();
            b.iter(|| Reducer::reduce(black_box(&ops)))
        });

        group.bench_with_input(BenchmarkId::new("spread_keys", size), size, |b, &size| {
            let ops = mixed_operations(size, 32);
            b.iter(|| Reducer::reduce(black_box(&ops)))
        });
    }

    group.finish();
}

fn bench_snapshot(c: &mut Criterion) {
    let mut group = c.benchmark_group("snapshot");

    for size in [100, 1000].iter() {
        let mut recorder = OperationRecorder::new();
        for op in mixed_operations(*size, 16) {
            recorder.append_operation(op);
        }
        recorder.stage();
        let snapshot = recorder.export_state();

        group.bench_with_input(BenchmarkId::new("export", size), size, |b, _| {
            b.iter(|| recorder.export_state())
        });

        group.bench_with_input(BenchmarkId::new("import", size), size, |b, _| {
            b.iter(|| {
                let mut restored = OperationRecorder::new();
                restored.import_state(black_box(snapshot.clone()))
            })
        });
    }

    group.finish();
}

fn bench_serialization(c: &mut Criterion) {
    let mut group = c.benchmark_group("serialization");

    group.bench_function("encode_payload", |b| {
        let table = Reducer::reduce(&mixed_operations(200, 20)).expect("reduce");
        b.iter(|| payload::encode(black_box(&table)))
    });

    group.bench_function("decode_payload", |b| {
        let table = Reducer::reduce(&mixed_operations(200, 20)).expect("reduce");
        let encoded = payload::encode(&table);
        b.iter(|| payload::decode(black_box(&encoded)))
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_recorder,
    bench_reduction,
    bench_snapshot,
    bench_serialization,
);
criterion_main!(benches);
