//! Criterion micro-benchmarks for history lookups and journal replay.

use std::hint::black_box;
use std::io::Cursor;

use criterion::{criterion_group, criterion_main, Criterion};
use orrery_bench::seeded_history;
use orrery_history::{HistoryStore, JournalReader, JournalRecord, JournalWriter, WorldCatalog};

/// Benchmark: resume lookup (highest step + load) on a 1K-step world.
fn bench_resume_lookup_1k(c: &mut Criterion) {
    let (store, world) = seeded_history(1_000);

    c.bench_function("resume_lookup_1k", |b| {
        b.iter(|| {
            let step = store.find_highest_step_id(world).unwrap().unwrap();
            black_box(store.load_step(step).unwrap());
        });
    });
}

/// Benchmark: replay a 1K-step journal into memory.
fn bench_journal_restore_1k(c: &mut Criterion) {
    let (store, world) = seeded_history(1_000);
    let mut writer = JournalWriter::new(Vec::new()).unwrap();
    writer
        .append(&JournalRecord::World(store.world(world).unwrap()))
        .unwrap();
    let mut stages = store.stages_for_world(world).unwrap();
    stages.reverse();
    for stage in stages {
        writer.append(&JournalRecord::Stage(stage)).unwrap();
    }
    let mut steps = store.steps_for_world(world).unwrap();
    steps.reverse();
    for step in steps {
        writer.append(&JournalRecord::Step(step)).unwrap();
    }
    let bytes = writer.into_inner();

    c.bench_function("journal_restore_1k", |b| {
        b.iter(|| {
            let reader = JournalReader::open(Cursor::new(bytes.as_slice())).unwrap();
            black_box(reader.restore().unwrap());
        });
    });
}

criterion_group!(benches, bench_resume_lookup_1k, bench_journal_restore_1k);
criterion_main!(benches);
