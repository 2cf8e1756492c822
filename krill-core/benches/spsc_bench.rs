//! SPSC queue throughput benchmarks

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use krill_core::queue::channel;

fn bench_push_pop(c: &mut Criterion) {
    let (tx, rx) = channel::<u64>(1024);
    c.bench_function("spsc_push_pop_same_thread", |b| {
        b.iter(|| {
            tx.push(black_box(42)).unwrap();
            black_box(rx.pop())
        })
    });
}

fn bench_burst(c: &mut Criterion) {
    let (tx, rx) = channel::<u64>(1024);
    c.bench_function("spsc_burst_256", |b| {
        b.iter(|| {
            for i in 0..256u64 {
                tx.push(i).unwrap();
            }
            let mut sum = 0u64;
            while let Some(v) = rx.pop() {
                sum = sum.wrapping_add(v);
            }
            black_box(sum)
        })
    });
}

criterion_group!(benches, bench_push_pop, bench_burst);
criterion_main!(benches);
