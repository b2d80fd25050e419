use super::EntryScorer;
use crate::config::OscillatorConfig;
use crate::models::series::{last_value, SeriesWindow};
use crate::models::{Signal, SignalSource, TradeDirection, TrendDirection};
use crate::regime::ContextVerdict;

/// Range-trade fallback for consolidating instruments
///
/// Only trades with the benchmark: long an oversold instrument in a rising
/// market, short an overbought one in a falling market. RSI, %K and %D must
/// all agree, so the score is either 3/3 or no signal.
#[derive(Debug, Clone)]
pub struct OscillatorScorer {
    config: OscillatorConfig,
}

impl OscillatorScorer {
    pub fn new(config: &OscillatorConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }
}

impl Default for OscillatorScorer {
    fn default() -> Self {
        Self::new(&OscillatorConfig::default())
    }
}

impl EntryScorer for OscillatorScorer {
    fn score(&self, verdict: &ContextVerdict, entry: &SeriesWindow<'_>) -> Option<Signal> {
        let rsi = last_value(entry.rsi)?;
        let k = last_value(entry.stoch_k)?;
        let d = last_value(entry.stoch_d)?;
        let cfg = &self.config;

        let (direction, conditions) = match verdict.benchmark_trend.direction {
            TrendDirection::Up => (
                TradeDirection::Long,
                [
                    rsi < cfg.rsi_oversold,
                    k < cfg.stoch_oversold,
                    d < cfg.stoch_oversold,
                ],
            ),
            TrendDirection::Down => (
                TradeDirection::Short,
                [
                    rsi > cfg.rsi_overbought,
                    k > cfg.stoch_overbought,
                    d > cfg.stoch_overbought,
                ],
            ),
        };

        let score = conditions.iter().filter(|&&x| x).count() as u8;
        let required = conditions.len() as u8;
        tracing::debug!(
            "{} {:?} oscillator: RSI={:.1}, %K={:.1}, %D={:.1} ({}/{} met)",
            entry.symbol,
            direction,
            rsi,
            k,
            d,
            score,
            required
        );

        (score == required).then(|| Signal {
            symbol: entry.symbol.to_string(),
            direction,
            confluence_score: score,
            required_confirmations: required,
            source: SignalSource::Oscillator,
        })
    }

    fn name(&self) -> &str {
        "OscillatorScorer"
    }

    fn min_bars_required(&self) -> usize {
        1
    }
}
