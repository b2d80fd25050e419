use serde::{Deserialize, Serialize};

use super::{Bar, Timeframe};
use crate::error::{Result, StrategyError};

/// Externally computed indicator values, one entry per bar.
///
/// Values before an indicator's warm-up are expected to be NaN and are
/// treated as missing history.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct IndicatorFrame {
    pub adx: Vec<f64>,
    pub plus_di: Vec<f64>,
    pub minus_di: Vec<f64>,
    pub rsi: Vec<f64>,
    pub stoch_k: Vec<f64>,
    pub stoch_d: Vec<f64>,
    pub ma: Vec<f64>,
    pub atr: Vec<f64>,
}

impl IndicatorFrame {
    fn columns(&self) -> [(&'static str, &[f64]); 8] {
        [
            ("adx", &self.adx),
            ("plus_di", &self.plus_di),
            ("minus_di", &self.minus_di),
            ("rsi", &self.rsi),
            ("stoch_k", &self.stoch_k),
            ("stoch_d", &self.stoch_d),
            ("ma", &self.ma),
            ("atr", &self.atr),
        ]
    }
}

/// Bars plus their aligned indicators for one (symbol, timeframe)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketSeries {
    symbol: String,
    timeframe: Timeframe,
    bars: Vec<Bar>,
    indicators: IndicatorFrame,
}

impl MarketSeries {
    /// Pair bars with indicators, rejecting any column that is not 1:1 with the bars
    pub fn new(
        symbol: impl Into<String>,
        timeframe: Timeframe,
        bars: Vec<Bar>,
        indicators: IndicatorFrame,
    ) -> Result<Self> {
        let symbol = symbol.into();
        for (name, column) in indicators.columns() {
            if column.len() != bars.len() {
                return Err(StrategyError::MisalignedSeries(format!(
                    "{} {:?}: {} has {} values for {} bars",
                    symbol,
                    timeframe,
                    name,
                    column.len(),
                    bars.len()
                )));
            }
        }

        if let Some(pair) = bars.windows(2).find(|w| w[1].timestamp <= w[0].timestamp) {
            return Err(StrategyError::MisalignedSeries(format!(
                "{} {:?}: timestamps not strictly increasing at {}",
                symbol, timeframe, pair[1].timestamp
            )));
        }

        Ok(Self {
            symbol,
            timeframe,
            bars,
            indicators,
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn indicators(&self) -> &IndicatorFrame {
        &self.indicators
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Full-length view
    pub fn view(&self) -> SeriesWindow<'_> {
        self.window(self.bars.len())
    }

    /// View of the first `end` bars, as they looked when bar `end - 1` closed
    pub fn window(&self, end: usize) -> SeriesWindow<'_> {
        let end = end.min(self.bars.len());
        let ind = &self.indicators;
        SeriesWindow {
            symbol: &self.symbol,
            timeframe: self.timeframe,
            bars: &self.bars[..end],
            adx: &ind.adx[..end],
            plus_di: &ind.plus_di[..end],
            minus_di: &ind.minus_di[..end],
            rsi: &ind.rsi[..end],
            stoch_k: &ind.stoch_k[..end],
            stoch_d: &ind.stoch_d[..end],
            ma: &ind.ma[..end],
            atr: &ind.atr[..end],
        }
    }
}

/// Borrowed prefix of a [`MarketSeries`]; the last element is the current bar.
#[derive(Debug, Clone, Copy)]
pub struct SeriesWindow<'a> {
    pub symbol: &'a str,
    pub timeframe: Timeframe,
    pub bars: &'a [Bar],
    pub adx: &'a [f64],
    pub plus_di: &'a [f64],
    pub minus_di: &'a [f64],
    pub rsi: &'a [f64],
    pub stoch_k: &'a [f64],
    pub stoch_d: &'a [f64],
    pub ma: &'a [f64],
    pub atr: &'a [f64],
}

impl<'a> SeriesWindow<'a> {
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn last_bar(&self) -> Option<&'a Bar> {
        self.bars.last()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }
}

/// Last finite value of a series
pub fn last_value(series: &[f64]) -> Option<f64> {
    series.last().copied().filter(|v| v.is_finite())
}

/// `(prev, last)` when both are finite
pub fn last_two(series: &[f64]) -> Option<(f64, f64)> {
    match series {
        [.., prev, last] if prev.is_finite() && last.is_finite() => Some((*prev, *last)),
        _ => None,
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn test_rejects_short_indicator_column() {
        let bars = bars_from_closes(&[100.0, 101.0, 102.0]);
        let mut frame = flat_frame(3);
        frame.rsi.pop();

        let result = MarketSeries::new("ABC", Timeframe::Lower, bars, frame);
        assert!(matches!(result, Err(StrategyError::MisalignedSeries(msg)) if msg.contains("rsi")));
    }

    #[test]
    fn test_rejects_non_increasing_timestamps() {
        let mut bars = bars_from_closes(&[100.0, 101.0, 102.0]);
        bars[2].timestamp = bars[1].timestamp;

        let result = MarketSeries::new("ABC", Timeframe::Lower, bars, flat_frame(3));
        assert!(matches!(result, Err(StrategyError::MisalignedSeries(_))));
    }

    #[test]
    fn test_window_is_prefix() {
        let bars = bars_from_closes(&[100.0, 101.0, 102.0, 103.0]);
        let series = MarketSeries::new("ABC", Timeframe::Lower, bars, flat_frame(4)).unwrap();

        let window = series.window(2);
        assert_eq!(window.len(), 2);
        assert_eq!(window.adx.len(), 2);
        assert_eq!(window.last_bar().unwrap().close, 101.0);
        assert_eq!(series.window(99).len(), 4);
    }

    #[test]
    fn test_last_two_requires_finite_values() {
        assert_eq!(last_two(&[1.0, 2.0, 3.0]), Some((2.0, 3.0)));
        assert_eq!(last_two(&[f64::NAN, 3.0]), None);
        assert_eq!(last_two(&[3.0]), None);
        assert_eq!(last_value(&[f64::NAN]), None);
    }
}
