//! Criterion benchmarks for the clock-tree search.
//!
//! Run: cargo bench -p clocktree --bench search
//!
//! Results show:
//!   sysclk_best           — full STM32F4 main PLL search, pruned
//!   sysclk_m8/pruned      — main PLL with M fixed to 8, pruned
//!   sysclk_m8/naive       — same space, every tuple evaluated then filtered
//!   i2s_44k1_mclk         — PLLI2S search for 44.1 kHz, 16-bit, MCLK on

#![allow(
    clippy::unwrap_used, // benchmark helpers use unwrap for brevity
    clippy::expect_used,
    clippy::panic,
    missing_docs, // criterion_group! macro generates undocumented items
)]

use std::hint::black_box;
use std::time::Duration;

use clocktree::hz;
use clocktree::presets::stm32f4::{i2s_problem, system_clock_problem, SYSCLK_MAX_HZ};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

fn bench_sysclk(c: &mut Criterion) {
    let problem = system_clock_problem(hz(SYSCLK_MAX_HZ)).unwrap();
    c.bench_function("sysclk_best", |b| b.iter(|| black_box(problem.best().unwrap())));
}

fn bench_pruning(c: &mut Criterion) {
    let fixed = system_clock_problem(hz(SYSCLK_MAX_HZ)).unwrap().restrict("M", 8).unwrap();
    let mut group = c.benchmark_group("sysclk_m8");
    group.sample_size(10);
    group.measurement_time(Duration::from_secs(10));
    for (label, pruning) in [("pruned", true), ("naive", false)] {
        let problem = fixed.clone().pruning(pruning);
        group.bench_with_input(BenchmarkId::from_parameter(label), &problem, |b, p| {
            b.iter(|| black_box(p.all().unwrap()));
        });
    }
    group.finish();
}

fn bench_i2s(c: &mut Criterion) {
    let problem = i2s_problem(hz(44_100), 0.001, Some(16), Some(true)).unwrap();
    let mut group = c.benchmark_group("i2s");
    group.sample_size(10);
    group.bench_function("i2s_44k1_mclk", |b| b.iter(|| black_box(problem.all().unwrap())));
    group.finish();
}

criterion_group!(benches, bench_sysclk, bench_pruning, bench_i2s);
criterion_main!(benches);
