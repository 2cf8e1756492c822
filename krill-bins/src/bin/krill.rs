//! Krill - single-venue market-making engine
//!
//! Loads a JSON config, builds the adapter from the registry, wires the
//! strategy and risk manager into the engine and runs until stopped.
//!
//! Exit codes: 0 clean shutdown, 1 startup failure, 2 kill-switch or
//! fatal-error forced exit.

use anyhow::{Context, Result};
use clap::Parser;
use krill_core::prelude::*;
use krill_core::Symbol;
use krill_strategies::StrategyKind;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about = "Krill market-making engine")]
struct Args {
    /// Path to the JSON configuration file
    #[arg(short = 'c', long = "config")]
    config: String,

    /// Override the configured trading symbol
    #[arg(short = 's', long = "symbol")]
    symbol: Option<String>,

    /// Use the venue's testnet endpoints
    #[arg(long)]
    testnet: bool,

    /// Force paper trading regardless of config
    #[arg(long)]
    paper: bool,

    /// Log level override (trace/debug/info/warn/error)
    #[arg(long)]
    log_level: Option<String>,

    /// Pin workers to cores starting at this one (tick, strategy, order, risk)
    #[arg(long)]
    first_core: Option<usize>,
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(args) {
        Ok(code) => code,
        Err(e) => {
            error!("startup failed: {:#}", e);
            eprintln!("startup failed: {:#}", e);
            ExitCode::from(1)
        }
    }
}

fn run(args: Args) -> Result<ExitCode> {
    let mut config =
        Config::load(&args.config).with_context(|| format!("loading {}", args.config))?;

    if let Some(symbol) = &args.symbol {
        config.trading.symbol = symbol.clone();
    }
    if args.paper {
        config.trading.paper_trading = true;
        config.exchange.name = "paper".to_string();
    }

    let level = args
        .log_level
        .as_deref()
        .unwrap_or(&config.logging.log_level);
    init_logger(level, config.logging.json_logs);

    info!(
        config = %args.config,
        symbol = %config.trading.symbol,
        exchange = %config.exchange.name,
        testnet = args.testnet,
        paper = config.trading.paper_trading,
        "krill starting"
    );
    if args.testnet {
        warn!("testnet mode: venue endpoints switch to their test cluster");
    }

    let symbol = Symbol::new(&config.trading.symbol)
        .map_err(|e| anyhow::anyhow!("invalid symbol: {}", e))?;

    // Adapter registry: the binary decides what it links, no globals
    let mut registry = AdapterRegistry::new();
    registry.register("paper", |_cfg| Ok(Arc::new(PaperAdapter::new()) as _));

    let adapter = if config.trading.paper_trading {
        registry.build("paper", &config.exchange)
    } else {
        registry.build(&config.exchange.name, &config.exchange)
    }
    .context("building exchange adapter")?;

    let risk = RiskManager::new(config.risk_limits().context("risk limits")?);
    risk.kill_switch().set_callback(|reason| {
        error!(reason, "KILL SWITCH ACTIVE - trading halted, manual reset required");
    });

    let quoter =
        StrategyKind::from_config(&config.strategy).context("building strategy")?;

    let mut engine_config = EngineConfig::new(symbol);
    engine_config.quote_refresh_us = config.timing.quote_refresh_us;
    engine_config.min_quote_life_us = config.timing.min_quote_life_us;
    if let Some(first) = args.first_core {
        engine_config.pin_cores = Some([first, first + 1, first + 2, first + 3]);
    }

    let mut engine = TradingEngine::new(engine_config, Arc::clone(&risk), quoter, adapter);

    let stop = engine.shutdown_handle();
    ctrlc::set_handler(move || {
        warn!("interrupt received, shutting down");
        stop();
    })
    .context("installing signal handler")?;

    engine.start().context("starting engine")?;
    info!("engine running");

    while !engine.is_stopping() {
        std::thread::sleep(Duration::from_millis(100));
    }

    // No implicit cancellation: clear our resting orders explicitly
    // before tearing the engine down
    match engine.cancel_all_orders() {
        Ok(cancelled) => info!(cancelled, "resting orders cancelled"),
        Err(e) => warn!(%e, "cancel-all before shutdown failed"),
    }

    let stop_result = engine.stop();
    let kill_reason = risk.kill_switch().is_active().then(|| {
        risk.kill_switch()
            .reason()
            .unwrap_or_else(|| "unknown".to_string())
    });

    let stats = engine.stats();
    info!(
        ticks = stats.ticks_processed.load(std::sync::atomic::Ordering::Relaxed),
        orders = stats.orders_sent.load(std::sync::atomic::Ordering::Relaxed),
        fills = stats.fills.load(std::sync::atomic::Ordering::Relaxed),
        pretrade_rejects = stats.pretrade_rejects.load(std::sync::atomic::Ordering::Relaxed),
        errors = stats.total_errors(),
        "engine stopped"
    );

    if let Some(reason) = kill_reason {
        error!(reason, "exited via kill switch");
        return Ok(ExitCode::from(2));
    }
    if stop_result.is_err() {
        return Ok(ExitCode::from(2));
    }
    Ok(ExitCode::SUCCESS)
}
