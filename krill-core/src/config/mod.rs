//! Runtime configuration
//!
//! Loaded from a JSON file at startup. Unknown keys are rejected
//! (`deny_unknown_fields`) so a typo'd limit can never silently fall back
//! to a default. Money and size fields parse as decimals and convert to
//! fixed-point here, at the boundary; nothing downstream sees a float.

use crate::core::errors::EngineError;
use crate::core::fixed_point::from_decimal;
use crate::risk::RiskLimits;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level config file layout
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub exchange: ExchangeConfig,
    pub trading: TradingConfig,
    pub strategy: StrategyConfig,
    pub risk: RiskConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Venue selection and endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExchangeConfig {
    /// Adapter name in the registry ("paper", "binance", ...)
    pub name: String,
    #[serde(default)]
    pub rest_url: String,
    #[serde(default)]
    pub ws_url: String,
    #[serde(default)]
    pub credentials: Option<Credentials>,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            name: "paper".to_string(),
            rest_url: String::new(),
            ws_url: String::new(),
            credentials: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Credentials {
    pub api_key: String,
    pub api_secret: String,
}

/// Instrument and run mode
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TradingConfig {
    pub symbol: String,
    #[serde(default)]
    pub paper_trading: bool,
}

/// Quoting parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StrategyConfig {
    /// "baseline", "inventory" or "avellaneda_stoikov"
    #[serde(rename = "type", default = "default_strategy_type")]
    pub strategy_type: String,

    pub min_spread_bps: i64,
    pub max_spread_bps: i64,
    pub target_spread_bps: i64,

    /// Skew strength per unit of normalized inventory, [0, 1]
    #[serde(default)]
    pub inventory_skew: f64,

    /// Inventory the skew steers toward; converted to fixed-point with
    /// banker's rounding at load time
    #[serde(default)]
    pub inventory_target: Decimal,

    pub default_order_size: Decimal,
    pub min_order_size: Decimal,
    pub max_order_size: Decimal,

    /// Position envelope used for size scaling and skew normalization
    pub max_position: Decimal,

    /// EWMA weight for the inventory-adjusted variant
    #[serde(default = "default_ewma_alpha")]
    pub ewma_alpha: f64,

    /// Avellaneda-Stoikov parameters; horizon in seconds
    #[serde(default = "default_gamma")]
    pub gamma: f64,
    #[serde(default = "default_sigma")]
    pub sigma: f64,
    #[serde(default = "default_arrival_k")]
    pub arrival_k: f64,
    #[serde(default = "default_horizon_secs")]
    pub horizon_secs: f64,

    /// Exchange price increment for quote rounding
    #[serde(default = "default_tick_size")]
    pub tick_size: Decimal,
}

/// Risk limits, pre-conversion
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RiskConfig {
    pub max_position_qty: Decimal,
    pub max_position_value: Decimal,
    pub max_order_qty: Decimal,
    pub max_order_value: Decimal,
    pub max_orders_per_second: u32,
    pub max_open_orders: u32,
    pub max_daily_loss: Decimal,
    pub max_drawdown: Decimal,
    pub max_deviation_bps: i64,
    #[serde(default = "default_error_threshold")]
    pub error_threshold: u32,
    #[serde(default = "default_reject_threshold")]
    pub reject_threshold: u32,
}

/// Gating knobs, all in microseconds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimingConfig {
    #[serde(default = "default_quote_refresh_us")]
    pub quote_refresh_us: u64,
    #[serde(default = "default_min_quote_life_us")]
    pub min_quote_life_us: u64,
    #[serde(default = "default_hedge_timeout_us")]
    pub hedge_timeout_us: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            quote_refresh_us: default_quote_refresh_us(),
            min_quote_life_us: default_min_quote_life_us(),
            hedge_timeout_us: default_hedge_timeout_us(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub json_logs: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logs: false,
        }
    }
}

fn default_strategy_type() -> String {
    "baseline".to_string()
}

fn default_ewma_alpha() -> f64 {
    0.1
}

fn default_gamma() -> f64 {
    0.1
}

fn default_sigma() -> f64 {
    0.02
}

fn default_arrival_k() -> f64 {
    1.5
}

fn default_horizon_secs() -> f64 {
    300.0
}

fn default_tick_size() -> Decimal {
    Decimal::new(1, 2) // 0.01
}

fn default_error_threshold() -> u32 {
    5
}

fn default_reject_threshold() -> u32 {
    5
}

fn default_quote_refresh_us() -> u64 {
    10_000 // 10ms
}

fn default_min_quote_life_us() -> u64 {
    50_000 // 50ms
}

fn default_hedge_timeout_us() -> u64 {
    1_000_000 // 1s
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load and validate a JSON config file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, EngineError> {
        let raw = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            EngineError::Config(format!("cannot read {}: {}", path.as_ref().display(), e))
        })?;
        Self::from_json(&raw)
    }

    /// Parse and validate a JSON document
    pub fn from_json(raw: &str) -> Result<Self, EngineError> {
        let config: Config = serde_json::from_str(raw)
            .map_err(|e| EngineError::Config(format!("invalid config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), EngineError> {
        let s = &self.strategy;
        if s.min_spread_bps < 0 || s.max_spread_bps < s.min_spread_bps {
            return Err(EngineError::Config(
                "spread band requires 0 <= min_spread_bps <= max_spread_bps".into(),
            ));
        }
        if s.target_spread_bps < s.min_spread_bps || s.target_spread_bps > s.max_spread_bps {
            return Err(EngineError::Config(
                "target_spread_bps must sit inside [min_spread_bps, max_spread_bps]".into(),
            ));
        }
        if !(0.0..=1.0).contains(&s.inventory_skew) {
            return Err(EngineError::Config("inventory_skew must be in [0, 1]".into()));
        }
        if s.max_position <= Decimal::ZERO {
            return Err(EngineError::Config("max_position must be positive".into()));
        }
        if s.min_order_size > s.max_order_size {
            return Err(EngineError::Config(
                "min_order_size must not exceed max_order_size".into(),
            ));
        }
        if self.trading.symbol.len() > crate::core::types::SYMBOL_MAX {
            return Err(EngineError::Config(format!(
                "symbol {:?} exceeds 16 bytes",
                self.trading.symbol
            )));
        }
        Ok(())
    }

    /// Convert the risk section into an immutable limit snapshot
    pub fn risk_limits(&self) -> Result<RiskLimits, EngineError> {
        let r = &self.risk;
        let fixed = |d: Decimal, key: &str| {
            from_decimal(d).map_err(|e| EngineError::Config(format!("risk.{}: {}", key, e)))
        };
        Ok(RiskLimits {
            max_order_qty: fixed(r.max_order_qty, "max_order_qty")?,
            max_order_value: fixed(r.max_order_value, "max_order_value")?,
            max_orders_per_second: r.max_orders_per_second,
            max_open_orders: r.max_open_orders,
            max_position_qty: fixed(r.max_position_qty, "max_position_qty")?,
            max_position_value: fixed(r.max_position_value, "max_position_value")?,
            max_daily_loss: fixed(r.max_daily_loss, "max_daily_loss")?,
            max_drawdown: fixed(r.max_drawdown, "max_drawdown")?,
            max_deviation_bps: r.max_deviation_bps,
            error_threshold: r.error_threshold,
            reject_threshold: r.reject_threshold,
        })
    }
}

impl StrategyConfig {
    /// Fixed-point conversion of a sizing field
    pub fn fixed(&self, d: Decimal, key: &str) -> Result<i64, EngineError> {
        from_decimal(d).map_err(|e| EngineError::Config(format!("strategy.{}: {}", key, e)))
    }

    /// Inventory target in fixed-point (banker's-rounded once, here)
    pub fn inventory_target_fixed(&self) -> Result<i64, EngineError> {
        self.fixed(self.inventory_target, "inventory_target")
    }

    pub fn tick_size_fixed(&self) -> Result<i64, EngineError> {
        let t = self.fixed(self.tick_size, "tick_size")?;
        if t <= 0 {
            return Err(EngineError::Config("tick_size must be positive".into()));
        }
        Ok(t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_json() -> String {
        r#"{
            "exchange": { "name": "paper" },
            "trading": { "symbol": "BTCUSDT", "paper_trading": true },
            "strategy": {
                "type": "baseline",
                "min_spread_bps": 2,
                "max_spread_bps": 50,
                "target_spread_bps": 10,
                "inventory_skew": 0.5,
                "default_order_size": "0.1",
                "min_order_size": "0.01",
                "max_order_size": "1.0",
                "max_position": "2.0"
            },
            "risk": {
                "max_position_qty": "2.0",
                "max_position_value": "250000",
                "max_order_qty": "1.0",
                "max_order_value": "125000",
                "max_orders_per_second": 10,
                "max_open_orders": 8,
                "max_daily_loss": "1000",
                "max_drawdown": "2500",
                "max_deviation_bps": 200
            }
        }"#
        .to_string()
    }

    #[test]
    fn loads_valid_config() {
        let config = Config::from_json(&sample_json()).unwrap();
        assert_eq!(config.trading.symbol, "BTCUSDT");
        assert_eq!(config.strategy.target_spread_bps, 10);
        // Defaults filled in
        assert_eq!(config.timing.min_quote_life_us, 50_000);
        assert_eq!(config.strategy.ewma_alpha, 0.1);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let json = sample_json().replace(
            r#""paper_trading": true"#,
            r#""paper_trading": true, "papertrading": false"#,
        );
        let err = Config::from_json(&json).unwrap_err();
        assert!(err.to_string().contains("papertrading"));
    }

    #[test]
    fn risk_limits_convert_to_fixed_point() {
        use crate::core::fixed_point::SCALE;
        let config = Config::from_json(&sample_json()).unwrap();
        let limits = config.risk_limits().unwrap();
        assert_eq!(limits.max_order_qty, SCALE);
        assert_eq!(limits.max_position_qty, 2 * SCALE);
        assert_eq!(limits.max_daily_loss, 1_000 * SCALE);
        assert_eq!(limits.max_orders_per_second, 10);
    }

    #[test]
    fn spread_band_validation() {
        let json = sample_json().replace(r#""target_spread_bps": 10"#, r#""target_spread_bps": 99"#);
        assert!(matches!(
            Config::from_json(&json),
            Err(EngineError::Config(_))
        ));
    }

    #[test]
    fn inventory_target_uses_bankers_rounding() {
        let json = sample_json().replace(
            r#""inventory_skew": 0.5,"#,
            r#""inventory_skew": 0.5, "inventory_target": "0.000000015","#,
        );
        let config = Config::from_json(&json).unwrap();
        // 1.5e-8 rounds half-to-even to 2 units
        assert_eq!(config.strategy.inventory_target_fixed().unwrap(), 2);
    }

    #[test]
    fn oversized_symbol_rejected() {
        let json = sample_json().replace("BTCUSDT", "AVERYLONGSYMBOLNAME");
        assert!(matches!(
            Config::from_json(&json),
            Err(EngineError::Config(_))
        ));
    }
}
