// Reference indicator calculations.
// The decision core consumes indicator series as inputs; these produce them
// for the backtest harness and the demo binary.

pub mod adx;
pub mod atr;
pub mod moving_average;
pub mod rsi;
pub mod stochastic;

pub use adx::{calculate_adx_series, DirectionalSeries};
pub use atr::calculate_atr_series;
pub use moving_average::calculate_sma_series;
pub use rsi::calculate_rsi_series;
pub use stochastic::calculate_stochastic_series;

use crate::config::StrategyConfig;
use crate::error::Result;
use crate::models::{Bar, IndicatorFrame, MarketSeries, Timeframe};

/// Compute every indicator the decision core reads, aligned with `bars`
pub fn compute_frame(bars: &[Bar], config: &StrategyConfig) -> IndicatorFrame {
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let directional = calculate_adx_series(bars, config.trend.adx_period);
    let (stoch_k, stoch_d) = calculate_stochastic_series(
        bars,
        config.entry.stoch_k_period,
        config.entry.stoch_d_period,
    );

    IndicatorFrame {
        adx: directional.adx,
        plus_di: directional.plus_di,
        minus_di: directional.minus_di,
        rsi: calculate_rsi_series(&closes, config.entry.rsi_period),
        stoch_k,
        stoch_d,
        ma: calculate_sma_series(&closes, config.entry.ma_period),
        atr: calculate_atr_series(bars, config.trend.adx_period),
    }
}

/// Bars plus freshly computed indicators
pub fn build_series(
    symbol: &str,
    timeframe: Timeframe,
    bars: Vec<Bar>,
    config: &StrategyConfig,
) -> Result<MarketSeries> {
    let frame = compute_frame(&bars, config);
    MarketSeries::new(symbol, timeframe, bars, frame)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::series::test_support::bars_from_closes;

    #[test]
    fn test_frame_is_aligned_with_bars() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + (i as f64 * 0.3).sin() * 5.0).collect();
        let bars = bars_from_closes(&closes);
        let series = build_series("ABC", Timeframe::Lower, bars, &StrategyConfig::default()).unwrap();

        let frame = series.indicators();
        assert_eq!(frame.adx.len(), 60);
        assert_eq!(frame.stoch_d.len(), 60);
        assert!(frame.adx[59].is_finite());
        assert!(frame.stoch_d[59].is_finite());
        assert!(frame.ma[59].is_finite());
    }
}
