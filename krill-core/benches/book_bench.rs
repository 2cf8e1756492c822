//! Order book hot-path benchmarks

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use krill_core::fixed_point::SCALE;
use krill_core::orderbook::OrderBook;
use krill_core::{Side, Symbol};

fn seeded_book(levels: i64) -> OrderBook {
    let mut book = OrderBook::new(Symbol::new("BTCUSDT").unwrap());
    for i in 0..levels {
        book.apply_l2_update(Side::Buy, (100 - i) * SCALE, SCALE, i as u64);
        book.apply_l2_update(Side::Sell, (101 + i) * SCALE, SCALE, i as u64);
    }
    book
}

fn bench_l2_update(c: &mut Criterion) {
    let mut book = seeded_book(20);
    let mut i = 0u64;
    c.bench_function("l2_update_replace", |b| {
        b.iter(|| {
            i += 1;
            book.apply_l2_update(Side::Buy, 100 * SCALE, SCALE + (i % 100) as i64, i);
            black_box(book.sequence())
        })
    });
}

fn bench_top_queries(c: &mut Criterion) {
    let book = seeded_book(20);
    c.bench_function("best_and_mid", |b| {
        b.iter(|| {
            black_box(book.best_bid());
            black_box(book.best_ask());
            black_box(book.mid())
        })
    });
}

fn bench_metrics(c: &mut Criterion) {
    let mut book = seeded_book(20);
    c.bench_function("vwap_5_levels", |b| {
        b.iter(|| black_box(book.vwap(Side::Sell, 3 * SCALE)))
    });
    c.bench_function("imbalance_5_levels", |b| {
        b.iter(|| black_box(book.imbalance(5)))
    });
}

fn bench_snapshot(c: &mut Criterion) {
    let mut book = seeded_book(20);
    c.bench_function("snapshot_copy", |b| b.iter(|| black_box(book.snapshot())));
}

criterion_group!(
    benches,
    bench_l2_update,
    bench_top_queries,
    bench_metrics,
    bench_snapshot
);
criterion_main!(benches);
