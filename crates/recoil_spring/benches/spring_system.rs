//! Criterion benchmarks for stepping many springs at once.

use std::cell::RefCell;
use std::rc::Rc;

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};

use recoil_core::SpringProperty;
use recoil_spring::{MotionRuntime, SpringSystem, SpringTo};

const FRAME: f32 = 0.016;

fn moving_system(springs: usize) -> SpringSystem {
    let system = SpringSystem::new();
    for i in 0..springs {
        let id = system.create_spring();
        system.with_spring_mut(id, |s| s.set_end_value(i as f32));
    }
    system
}

fn bench_step_1000_springs(c: &mut Criterion) {
    c.bench_function("step_1000_springs", |b| {
        b.iter_batched(
            || moving_system(1000),
            |system| system.step(black_box(FRAME)),
            BatchSize::SmallInput,
        )
    });
}

fn bench_settle_100_springs(c: &mut Criterion) {
    c.bench_function("settle_100_springs", |b| {
        b.iter_batched(
            || moving_system(100),
            |system| {
                let mut frames = 0u32;
                while let Ok(true) = system.step(FRAME) {
                    frames += 1;
                }
                frames
            },
            BatchSize::SmallInput,
        )
    });
}

struct Dot {
    x: f32,
}

fn bench_runtime_100_targets(c: &mut Criterion) {
    let x = SpringProperty::new("x", |d: &Dot| d.x, |d: &mut Dot, v| d.x = v);
    c.bench_function("runtime_100_targets_frame", |b| {
        b.iter_batched(
            || {
                let mut runtime = MotionRuntime::new();
                let dots: Vec<_> = (0..100)
                    .map(|_| Rc::new(RefCell::new(Dot { x: 0.0 })))
                    .collect();
                for dot in &dots {
                    let _ = runtime.add_plan(&SpringTo::new(x.clone(), 100.0), dot);
                }
                (runtime, dots)
            },
            |(runtime, dots)| {
                let _ = runtime.step(black_box(FRAME));
                (runtime, dots)
            },
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(
    benches,
    bench_step_1000_springs,
    bench_settle_100_springs,
    bench_runtime_100_targets
);
criterion_main!(benches);
