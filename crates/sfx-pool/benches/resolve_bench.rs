//! Key resolution and transient pool benchmarks

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use sfx_core::{ClipHandle, Key};
use sfx_pool::{EffectDefinition, EffectPool, EffectSet, PoolBackend, PoolConfig};
use std::sync::Arc;

fn create_pool(effects: u32) -> EffectPool {
    let (backend, _, _, _) = PoolBackend::headless();
    let mut pool = EffectPool::new(
        PoolConfig {
            warn_on_miss: false,
            ..PoolConfig::deterministic(1)
        },
        backend,
    );
    let set = EffectSet::new("bench").with_definitions((0..effects).map(|i| {
        Arc::new(
            EffectDefinition::new(format!("sfx.{i}"), format!("Effect {i}"))
                .with_clips([ClipHandle::new(i * 2, 0.5), ClipHandle::new(i * 2 + 1, 0.7)])
                .with_random_clip()
                .with_pitch_range(0.9, 1.1),
        )
    }));
    pool.init([Arc::new(set)], []);
    pool
}

fn bench_peek_by_key(c: &mut Criterion) {
    let mut pool = create_pool(256);
    let key = Key::from_literal("sfx.128");

    c.bench_function("peek_by_key_256", |b| {
        b.iter(|| {
            black_box(pool.peek(black_box(&key)).map(|v| v.id()));
        })
    });
}

fn bench_play_by_key(c: &mut Criterion) {
    let mut pool = create_pool(256);
    let key = Key::from_literal("sfx.64");

    c.bench_function("play_by_key_256", |b| {
        b.iter(|| {
            black_box(pool.play(black_box(&key)).map(|v| v.id()));
        })
    });
}

fn bench_lookup_miss(c: &mut Criterion) {
    let mut pool = create_pool(256);
    let key = Key::from_literal("sfx.missing");

    c.bench_function("peek_miss_256", |b| {
        b.iter(|| {
            black_box(pool.peek(black_box(&key)).is_none());
        })
    });
}

fn bench_transient_cycle(c: &mut Criterion) {
    let mut pool = create_pool(1);
    let def = Arc::new(
        EffectDefinition::new("sfx.transient", "Transient").with_clip(ClipHandle::new(9, 0.3)),
    );

    c.bench_function("transient_play_return", |b| {
        b.iter(|| {
            if let Some(id) = pool.play_definition(black_box(&def), false) {
                let _ = pool.return_voice(id);
            }
        })
    });
}

criterion_group!(
    benches,
    bench_peek_by_key,
    bench_play_by_key,
    bench_lookup_miss,
    bench_transient_cycle
);
criterion_main!(benches);
