use crate::models::Bar;
use chrono::{DateTime, Duration, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Market scenario types for synthetic data generation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketScenario {
    /// Steady uptrend with noise (+0.4% daily average)
    Uptrend,
    /// Steady downtrend with noise (-0.4% daily average)
    Downtrend,
    /// Sideways/choppy market around the starting price
    Sideways,
    /// High volatility (±4% large swings)
    Volatile,
    /// Uptrend that retraces every few weeks
    Pullbacks,
}

impl MarketScenario {
    pub const ALL: [MarketScenario; 5] = [
        MarketScenario::Uptrend,
        MarketScenario::Downtrend,
        MarketScenario::Sideways,
        MarketScenario::Volatile,
        MarketScenario::Pullbacks,
    ];
}

/// Generates synthetic daily bars for backtesting
///
/// Same seed, same bars: timestamps start at a fixed date, not the wall clock.
pub struct SyntheticDataGenerator {
    rng: StdRng,
    base_price: f64,
    base_volume: f64,
    start: DateTime<Utc>,
}

impl SyntheticDataGenerator {
    /// Create a new generator with a seed for reproducibility
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            base_price: 150.0,
            base_volume: 1_000_000.0,
            start: Utc
                .with_ymd_and_hms(2020, 1, 1, 0, 0, 0)
                .single()
                .unwrap_or_default(),
        }
    }

    pub fn with_base_price(mut self, base_price: f64) -> Self {
        self.base_price = base_price;
        self
    }

    /// Generate `num_bars` daily bars for a scenario
    pub fn generate(&mut self, scenario: MarketScenario, num_bars: usize) -> Vec<Bar> {
        let mut bars = Vec::with_capacity(num_bars);
        let mut price = self.base_price;

        for i in 0..num_bars {
            let change = match scenario {
                MarketScenario::Uptrend => 0.004 + self.rng.gen_range(-0.01..0.01),
                MarketScenario::Downtrend => -0.004 + self.rng.gen_range(-0.01..0.01),
                MarketScenario::Sideways => {
                    // 10% pull to mean
                    (self.base_price - price) / price * 0.1 + self.rng.gen_range(-0.01..0.01)
                }
                MarketScenario::Volatile => self.rng.gen_range(-0.04..0.04),
                MarketScenario::Pullbacks => {
                    let phase = i % 20;
                    let drift = if phase < 14 { 0.008 } else { -0.012 };
                    drift + self.rng.gen_range(-0.006..0.006)
                }
            };
            price = (price * (1.0 + change)).max(self.base_price * 0.2);

            let bar = self.create_bar(price, i);
            bars.push(bar);
        }

        bars
    }

    /// Generate an instrument that follows `reference` with the given beta
    /// plus its own noise and drift. Timestamps match `reference` exactly.
    pub fn generate_correlated(
        &mut self,
        reference: &[Bar],
        beta: f64,
        drift: f64,
        noise: f64,
    ) -> Vec<Bar> {
        let mut bars = Vec::with_capacity(reference.len());
        let mut price = self.base_price;

        for (i, window) in std::iter::once(None)
            .chain(reference.windows(2).map(Some))
            .enumerate()
        {
            if let Some(pair) = window {
                let market = pair[1].close / pair[0].close - 1.0;
                let idio = if noise > 0.0 {
                    self.rng.gen_range(-noise..noise)
                } else {
                    0.0
                };
                price = (price * (1.0 + beta * market + drift + idio)).max(self.base_price * 0.2);
            }
            bars.push(self.create_bar(price, i));
        }

        bars
    }

    /// Helper to create a bar from close price and day index
    fn create_bar(&mut self, price: f64, index: usize) -> Bar {
        // ±1% intrabar range
        let range_pct = 0.01;

        let high = price * (1.0 + self.rng.gen_range(0.0..range_pct));
        let low = price * (1.0 - self.rng.gen_range(0.0..range_pct));

        let open_raw = price * (1.0 + self.rng.gen_range(-range_pct..range_pct));
        let open = open_raw.clamp(low, high);

        // Vary volume ±30%
        let volume = self.base_volume * self.rng.gen_range(0.7..1.3);

        Bar {
            timestamp: self.start + Duration::days(index as i64),
            open,
            high,
            low,
            close: price,
            volume,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_uptrend() {
        let mut gen = SyntheticDataGenerator::new(42);
        let bars = gen.generate(MarketScenario::Uptrend, 250);

        assert_eq!(bars.len(), 250);
        let first_price = bars.first().unwrap().close;
        let last_price = bars.last().unwrap().close;
        assert!(
            last_price > first_price,
            "Uptrend should end higher: {} -> {}",
            first_price,
            last_price
        );
    }

    #[test]
    fn test_generate_downtrend() {
        let mut gen = SyntheticDataGenerator::new(42);
        let bars = gen.generate(MarketScenario::Downtrend, 250);

        let first_price = bars.first().unwrap().close;
        let last_price = bars.last().unwrap().close;
        assert!(
            last_price < first_price,
            "Downtrend should end lower: {} -> {}",
            first_price,
            last_price
        );
    }

    #[test]
    fn test_generate_sideways() {
        let mut gen = SyntheticDataGenerator::new(42);
        let bars = gen.generate(MarketScenario::Sideways, 250);

        // Should stay roughly around base price (±15%)
        let base = gen.base_price;
        for bar in &bars {
            assert!(
                bar.close > base * 0.85 && bar.close < base * 1.15,
                "Sideways should stay near base: {} vs {}",
                bar.close,
                base
            );
        }
    }

    #[test]
    fn test_same_seed_same_bars() {
        let a = SyntheticDataGenerator::new(7).generate(MarketScenario::Volatile, 100);
        let b = SyntheticDataGenerator::new(7).generate(MarketScenario::Volatile, 100);
        assert_eq!(a, b);
    }

    #[test]
    fn test_correlated_shares_timestamps() {
        let mut gen = SyntheticDataGenerator::new(42);
        let benchmark = gen.generate(MarketScenario::Uptrend, 120);
        let instrument = gen.generate_correlated(&benchmark, 1.2, 0.0, 0.005);

        assert_eq!(instrument.len(), benchmark.len());
        assert!(benchmark
            .iter()
            .zip(&instrument)
            .all(|(b, i)| b.timestamp == i.timestamp));
    }

    #[test]
    fn test_timestamps_are_sequential() {
        let mut gen = SyntheticDataGenerator::new(42);
        let bars = gen.generate(MarketScenario::Uptrend, 100);

        for i in 1..bars.len() {
            assert!(
                bars[i].timestamp > bars[i - 1].timestamp,
                "Timestamps should be sequential"
            );
        }
    }

    #[test]
    fn test_ohlc_consistency() {
        let mut gen = SyntheticDataGenerator::new(42);
        let bars = gen.generate(MarketScenario::Volatile, 100);

        for bar in &bars {
            assert!(bar.high >= bar.close, "High should be >= close");
            assert!(bar.high >= bar.open, "High should be >= open");
            assert!(bar.low <= bar.close, "Low should be <= close");
            assert!(bar.low <= bar.open, "Low should be <= open");
        }
    }
}
