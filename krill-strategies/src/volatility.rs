//! EWMA volatility estimation for dynamic spread adjustment
//!
//! Tracks an exponentially weighted variance of mid-price returns in
//! basis points. The spread adjustment widens quotes when realized
//! volatility picks up and decays back as it calms; the estimator stays
//! silent (adjustment 0) until it has seen enough observations.

/// Observations required before the estimate is trusted
const WARMUP: u64 = 8;

#[derive(Debug, Clone, Copy)]
pub struct EwmaVolatility {
    alpha: f64,
    /// EWMA of squared returns, bps^2
    variance_bps2: f64,
    last_price: i64,
    observations: u64,
}

impl EwmaVolatility {
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha: alpha.clamp(0.0, 1.0),
            variance_bps2: 0.0,
            last_price: 0,
            observations: 0,
        }
    }

    /// Feed one mid-price observation
    #[inline]
    pub fn on_price(&mut self, price: i64) {
        if price <= 0 {
            return;
        }
        if self.last_price > 0 && price != self.last_price {
            let ret_bps = (price - self.last_price) as f64 * 10_000.0 / self.last_price as f64;
            self.variance_bps2 =
                self.alpha * ret_bps * ret_bps + (1.0 - self.alpha) * self.variance_bps2;
            self.observations += 1;
        }
        self.last_price = price;
    }

    /// Realized volatility in basis points
    #[inline]
    pub fn vol_bps(&self) -> f64 {
        self.variance_bps2.sqrt()
    }

    #[inline]
    pub fn is_ready(&self) -> bool {
        self.observations >= WARMUP
    }

    /// Whole-bps spread adjustment; 0 while warming up
    #[inline]
    pub fn adjustment_bps(&self) -> i64 {
        if self.is_ready() {
            self.vol_bps().round() as i64
        } else {
            0
        }
    }

    pub fn reset(&mut self) {
        self.variance_bps2 = 0.0;
        self.last_price = 0;
        self.observations = 0;
    }
}

impl Default for EwmaVolatility {
    fn default() -> Self {
        Self::new(0.1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use krill_core::fixed_point::SCALE;

    #[test]
    fn silent_during_warmup() {
        let mut vol = EwmaVolatility::default();
        vol.on_price(100 * SCALE);
        vol.on_price(101 * SCALE);
        assert!(!vol.is_ready());
        assert_eq!(vol.adjustment_bps(), 0);
    }

    #[test]
    fn tracks_realized_moves() {
        let mut vol = EwmaVolatility::new(0.2);
        let mut price = 100 * SCALE;
        // Alternate +/-50 bps moves
        for i in 0..20 {
            price = if i % 2 == 0 {
                price + price / 200
            } else {
                price - price / 200
            };
            vol.on_price(price);
        }
        assert!(vol.is_ready());
        let adj = vol.adjustment_bps();
        assert!(adj >= 30 && adj <= 70, "adjustment {} out of range", adj);
    }

    #[test]
    fn flat_prices_decay_to_zero() {
        let mut vol = EwmaVolatility::new(0.5);
        vol.on_price(100 * SCALE);
        vol.on_price(101 * SCALE);
        let spiked = vol.vol_bps();

        // Repeated small moves decay the estimate
        let mut price = 101 * SCALE;
        for _ in 0..50 {
            price += 1; // sub-bps drift
            vol.on_price(price);
        }
        assert!(vol.vol_bps() < spiked / 10.0);
    }

    #[test]
    fn reset_clears_state() {
        let mut vol = EwmaVolatility::default();
        for i in 0..20 {
            vol.on_price((100 + i) * SCALE);
        }
        vol.reset();
        assert!(!vol.is_ready());
        assert_eq!(vol.vol_bps(), 0.0);
    }
}
