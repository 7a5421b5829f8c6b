use criterion::{black_box, criterion_group, criterion_main, Criterion};
use sonic_core::prelude::*;

const SR: u32 = 44_100;
const BLOCK: usize = 1024;

fn fill_constant(c: &mut Criterion) {
    let mut osc = Oscillator::new(FrequencyProgram::constant(440.0), 1.0, SR);
    let mut block = vec![0.0f32; BLOCK];
    c.bench_function("fill 1024 constant", |b| {
        b.iter(|| {
            osc.fill(black_box(&mut block), 0.0);
        });
    });
}

fn fill_sweep(c: &mut Criterion) {
    let mut osc = Oscillator::new(FrequencyProgram::sweep(200.0, 2000.0, 3.0), 1.0, SR);
    let mut block = vec![0.0f32; BLOCK];
    let mut t = 0.0;
    c.bench_function("fill 1024 sweep", |b| {
        b.iter(|| {
            osc.fill(black_box(&mut block), t);
            t = (t + BLOCK as f64 / f64::from(SR)) % 3.0;
        });
    });
}

fn per_sample_iterator(c: &mut Criterion) {
    let mut osc = Oscillator::new(FrequencyProgram::sweep(20.0, 22_000.0, 1.0), 1.0, SR);
    c.bench_function("samples().take(1024)", |b| {
        b.iter(|| osc.samples(0.0).take(BLOCK).fold(0.0f32, |acc, s| acc + black_box(s)));
    });
}

criterion_group!(benches, fill_constant, fill_sweep, per_sample_iterator);
criterion_main!(benches);
