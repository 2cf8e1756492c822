//! End-to-end pipeline tests: paper adapter -> book -> strategy -> risk
//! -> orders -> fills -> position

use krill_core::engine::{EngineConfig, TradingEngine};
use krill_core::exchange::{ExchangeAdapter, PaperAdapter};
use krill_core::fixed_point::SCALE;
use krill_core::risk::{RiskLimits, RiskManager};
use krill_core::Symbol;
use krill_strategies::{BaselineQuoter, QuoterParams};
use std::sync::Arc;
use std::time::{Duration, Instant};

fn sym() -> Symbol {
    Symbol::new("BTCUSDT").unwrap()
}

fn quoter_params() -> QuoterParams {
    QuoterParams {
        min_spread_bps: 2,
        max_spread_bps: 100,
        target_spread_bps: 20,
        inventory_skew: krill_core::fixed_point::ONE / 2,
        inventory_target: 0,
        default_order_size: SCALE, // 1.0
        min_order_size: SCALE / 10,
        max_order_size: 2 * SCALE,
        max_position: 10 * SCALE,
        tick_size: SCALE / 100,
    }
}

fn test_limits() -> RiskLimits {
    RiskLimits {
        max_orders_per_second: 1_000,
        max_open_orders: 16,
        ..RiskLimits::default()
    }
}

fn engine_config(min_quote_life_us: u64) -> EngineConfig {
    let mut config = EngineConfig::new(sym());
    config.quote_refresh_us = 0;
    config.min_quote_life_us = min_quote_life_us;
    config.risk_interval = Duration::from_millis(10);
    config
}

fn wait_until(timeout: Duration, mut pred: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if pred() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    false
}

const WAIT: Duration = Duration::from_secs(5);

#[test]
fn two_sided_market_produces_two_quotes() {
    let paper = Arc::new(PaperAdapter::new());
    let adapter: Arc<dyn ExchangeAdapter> = paper.clone();
    let risk = RiskManager::new(test_limits());

    let mut engine = TradingEngine::new(
        // Long min quote life: exactly one quote batch expected
        engine_config(10_000_000),
        Arc::clone(&risk),
        BaselineQuoter::new(quoter_params()),
        adapter,
    );
    engine.start().unwrap();

    paper.inject_top(sym(), (100 * SCALE, SCALE), (100 * SCALE + SCALE / 10, SCALE));

    assert!(
        wait_until(WAIT, || paper.get_open_orders(sym()).unwrap().len() == 2),
        "expected a resting bid and ask, got {:?}",
        paper.get_open_orders(sym()).unwrap()
    );

    let resting = paper.get_open_orders(sym()).unwrap();
    let mid = 100 * SCALE + SCALE / 20;
    for order in &resting {
        match order.side {
            krill_core::Side::Buy => assert!(order.price < mid),
            krill_core::Side::Sell => assert!(order.price > mid),
        }
    }

    // More ticks inside the min quote life must not replace the quotes
    for i in 0..5 {
        paper.inject_top(
            sym(),
            (100 * SCALE + i, SCALE),
            (100 * SCALE + SCALE / 10 + i, SCALE),
        );
    }
    std::thread::sleep(Duration::from_millis(100));
    assert_eq!(
        engine
            .stats()
            .orders_sent
            .load(std::sync::atomic::Ordering::Relaxed),
        2,
        "refresh gating should hold the first quote batch"
    );

    engine.stop().unwrap();
    assert!(!engine.is_fatal());
}

#[test]
fn crossing_fill_reaches_the_position_book() {
    let paper = Arc::new(PaperAdapter::new());
    let adapter: Arc<dyn ExchangeAdapter> = paper.clone();
    let risk = RiskManager::new(test_limits());

    let mut engine = TradingEngine::new(
        engine_config(10_000_000),
        Arc::clone(&risk),
        BaselineQuoter::new(quoter_params()),
        adapter,
    );
    engine.start().unwrap();

    paper.inject_top(sym(), (100 * SCALE, SCALE), (100 * SCALE + SCALE / 10, SCALE));
    assert!(wait_until(WAIT, || {
        paper.get_open_orders(sym()).unwrap().len() == 2
    }));

    let our_bid = paper
        .get_open_orders(sym())
        .unwrap()
        .iter()
        .find(|o| o.side == krill_core::Side::Buy)
        .unwrap()
        .price;

    // Offers collapse through our bid: the resting buy fills
    paper.inject_top(sym(), (our_bid - SCALE, SCALE), (our_bid - SCALE / 2, SCALE));

    assert!(
        wait_until(WAIT, || risk.positions().quantity(sym()) > 0),
        "fill never reached the position book"
    );
    let position = risk.positions().get(sym()).unwrap();
    assert_eq!(position.avg_price, our_bid);

    engine.stop().unwrap();
}

#[test]
fn kill_switch_stops_quoting() {
    let paper = Arc::new(PaperAdapter::new());
    let adapter: Arc<dyn ExchangeAdapter> = paper.clone();
    let risk = RiskManager::new(test_limits());

    let mut engine = TradingEngine::new(
        engine_config(0),
        Arc::clone(&risk),
        BaselineQuoter::new(quoter_params()),
        adapter,
    );
    engine.start().unwrap();

    risk.kill_switch().activate("test halt");
    paper.inject_top(sym(), (100 * SCALE, SCALE), (100 * SCALE + SCALE / 10, SCALE));

    // Decisions flow, orders do not
    assert!(wait_until(WAIT, || {
        engine
            .stats()
            .decisions
            .load(std::sync::atomic::Ordering::Relaxed)
            > 0
    }));
    assert_eq!(
        engine
            .stats()
            .orders_sent
            .load(std::sync::atomic::Ordering::Relaxed),
        0
    );
    assert!(paper.get_open_orders(sym()).unwrap().is_empty());

    engine.stop().unwrap();
}

#[test]
fn contiguous_stream_never_requests_resync() {
    let paper = Arc::new(PaperAdapter::new());
    let adapter: Arc<dyn ExchangeAdapter> = paper.clone();
    let risk = RiskManager::new(test_limits());

    let mut engine = TradingEngine::new(
        engine_config(10_000_000),
        Arc::clone(&risk),
        BaselineQuoter::new(quoter_params()),
        adapter,
    );
    engine.start().unwrap();

    // The paper adapter numbers its own updates contiguously, so the gap
    // detector must stay quiet across an arbitrary burst
    for _ in 0..4 {
        paper.inject_top(sym(), (100 * SCALE, SCALE), (100 * SCALE + SCALE / 10, SCALE));
    }
    assert!(wait_until(WAIT, || {
        engine
            .stats()
            .ticks_processed
            .load(std::sync::atomic::Ordering::Relaxed)
            >= 8
    }));

    engine.stop().unwrap();
    assert_eq!(paper.resync_requests(), 0);
    assert_eq!(
        engine
            .stats()
            .resync_requests
            .load(std::sync::atomic::Ordering::Relaxed),
        0
    );
}

#[test]
fn stop_is_idempotent_and_clean() {
    let paper = Arc::new(PaperAdapter::new());
    let adapter: Arc<dyn ExchangeAdapter> = paper.clone();
    let risk = RiskManager::new(test_limits());

    let mut engine = TradingEngine::new(
        engine_config(0),
        risk,
        BaselineQuoter::new(quoter_params()),
        adapter,
    );
    engine.start().unwrap();
    engine.stop().unwrap();
    engine.stop().unwrap();
    assert!(!paper.is_connected());
}
