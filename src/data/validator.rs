use crate::error::{Result, StrategyError};
use crate::models::Bar;

/// Close-to-close move above this is flagged as a probable data error
pub const EXTREME_MOVE_PCT: f64 = 20.0;

/// Validates OHLC bar data for sanity and correctness
pub struct BarValidator;

impl BarValidator {
    pub fn new() -> Self {
        Self
    }

    /// Validate a bar for correctness
    pub fn validate(&self, bar: &Bar) -> Result<()> {
        self.validate_prices(bar)?;
        self.validate_ohlc_relationship(bar)?;
        Ok(())
    }

    /// Validate that all prices are positive
    fn validate_prices(&self, bar: &Bar) -> Result<()> {
        let prices = [
            ("open", bar.open),
            ("high", bar.high),
            ("low", bar.low),
            ("close", bar.close),
        ];
        for (name, price) in prices {
            if !(price > 0.0) {
                return Err(StrategyError::InvalidBar(format!(
                    "Invalid {} price: {} at {}",
                    name, price, bar.timestamp
                )));
            }
        }
        if bar.volume < 0.0 {
            return Err(StrategyError::InvalidBar(format!(
                "Invalid volume: {} at {}",
                bar.volume, bar.timestamp
            )));
        }
        Ok(())
    }

    /// Validate OHLC relationships (high >= low, etc.)
    fn validate_ohlc_relationship(&self, bar: &Bar) -> Result<()> {
        if bar.high < bar.low {
            return Err(StrategyError::InvalidBar(format!(
                "High ({}) is less than low ({})",
                bar.high, bar.low
            )));
        }
        if bar.high < bar.open.max(bar.close) {
            return Err(StrategyError::InvalidBar(format!(
                "High ({}) is less than open/close ({}/{})",
                bar.high, bar.open, bar.close
            )));
        }
        if bar.low > bar.open.min(bar.close) {
            return Err(StrategyError::InvalidBar(format!(
                "Low ({}) is greater than open/close ({}/{})",
                bar.low, bar.open, bar.close
            )));
        }
        Ok(())
    }
}

impl Default for BarValidator {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of checking a whole series
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeriesReport {
    pub total_bars: usize,
    pub issues: Vec<String>,
    /// Indices of bars whose close moved more than [`EXTREME_MOVE_PCT`]
    pub extreme_moves: Vec<usize>,
}

impl SeriesReport {
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Check every bar plus ordering; extreme moves are reported, not rejected
pub fn validate_series(bars: &[Bar]) -> SeriesReport {
    let validator = BarValidator::new();
    let mut report = SeriesReport {
        total_bars: bars.len(),
        ..Default::default()
    };

    for bar in bars {
        if let Err(e) = validator.validate(bar) {
            report.issues.push(e.to_string());
        }
    }

    for (i, pair) in bars.windows(2).enumerate() {
        if pair[1].timestamp <= pair[0].timestamp {
            report.issues.push(format!(
                "Bars not strictly increasing: {} follows {}",
                pair[1].timestamp, pair[0].timestamp
            ));
        }
        if pair[0].close > 0.0 {
            let change_pct = ((pair[1].close - pair[0].close) / pair[0].close * 100.0).abs();
            if change_pct > EXTREME_MOVE_PCT {
                report.extreme_moves.push(i + 1);
            }
        }
    }

    if !report.extreme_moves.is_empty() {
        tracing::warn!(
            "{} bars moved more than {}% close-to-close (possible data errors)",
            report.extreme_moves.len(),
            EXTREME_MOVE_PCT
        );
    }

    report
}

/// Repair a raw series into something the decision core can consume.
///
/// Sorts, drops duplicate timestamps (first wins), swaps inverted high/low,
/// widens high/low to contain open/close and drops non-positive prices.
pub fn clean_bars(mut bars: Vec<Bar>) -> Vec<Bar> {
    let raw_len = bars.len();
    bars.sort_by_key(|b| b.timestamp);
    bars.dedup_by_key(|b| b.timestamp);
    let duplicates = raw_len - bars.len();

    let mut swapped = 0;
    for bar in &mut bars {
        if bar.high < bar.low {
            std::mem::swap(&mut bar.high, &mut bar.low);
            swapped += 1;
        }
        bar.high = bar.high.max(bar.open).max(bar.close);
        bar.low = bar.low.min(bar.open).min(bar.close);
    }

    let before = bars.len();
    bars.retain(|b| b.open > 0.0 && b.high > 0.0 && b.low > 0.0 && b.close > 0.0);
    let dropped = before - bars.len();

    if duplicates + swapped + dropped > 0 {
        tracing::info!(
            "Cleaned series: {} duplicates removed, {} high/low swaps, {} non-positive bars dropped",
            duplicates,
            swapped,
            dropped
        );
    }

    bars
}
