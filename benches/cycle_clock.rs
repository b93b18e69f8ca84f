//! Cost of computing a delta and delivering a tick batch.

use std::hint::black_box;
use std::time::Duration;

use casioemu_core::scheduler::run_due_cycles;
use casioemu_core::{CycleClock, IdleChipset, ManualTimeSource};
use criterion::{Criterion, criterion_group, criterion_main};

fn clock_delta(c: &mut Criterion) {
    let time = ManualTimeSource::new();
    let mut clock = CycleClock::new(128 * 1024, Box::new(time.clone()));
    clock.reset();

    c.bench_function("cycle_clock_delta", |b| {
        b.iter(|| {
            time.advance(Duration::from_micros(1));
            black_box(clock.delta())
        })
    });
}

fn tick_batch(c: &mut Criterion) {
    let time = ManualTimeSource::new();
    let mut clock = CycleClock::new(128 * 1024, Box::new(time.clone()));
    let mut chipset = IdleChipset::new();
    clock.reset();

    // one 20ms timer interval at the default rate
    c.bench_function("tick_batch_20ms", |b| {
        b.iter(|| {
            time.advance(Duration::from_millis(20));
            black_box(run_due_cycles(&mut clock, &mut chipset))
        })
    });
}

criterion_group!(benches, clock_delta, tick_batch);
criterion_main!(benches);
