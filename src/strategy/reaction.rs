use super::EntryScorer;
use crate::config::EntryConfig;
use crate::models::series::{last_two, SeriesWindow};
use crate::models::{Signal, SignalSource, TradeDirection};
use crate::regime::{detect_crossover, ContextVerdict};

/// The four independent confirmations behind a reaction entry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubSignals {
    pub di_crossover: bool,
    pub ma_crossover: bool,
    pub rsi_reversal: bool,
    pub stoch_reversal: bool,
}

impl SubSignals {
    pub fn score(&self) -> u8 {
        [
            self.di_crossover,
            self.ma_crossover,
            self.rsi_reversal,
            self.stoch_reversal,
        ]
        .iter()
        .filter(|&&x| x)
        .count() as u8
    }
}

/// Reaction entry scorer for trending instruments
///
/// Trades in the instrument's higher-timeframe direction and looks for a
/// reaction on the lower timeframe:
/// - DI crossover in the trade direction
/// - Close crossing the moving average in the trade direction
/// - RSI leaving the oversold (overbought) zone
/// - Stochastic %K/%D leaving the oversold (overbought) zone
///
/// Counter-benchmark trades need one more confirmation than aligned ones.
#[derive(Debug, Clone)]
pub struct ReactionScorer {
    config: EntryConfig,
}

impl ReactionScorer {
    pub fn new(config: &EntryConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    pub fn required_confirmations(&self, verdict: &ContextVerdict, direction: TradeDirection) -> u8 {
        if verdict.benchmark_trend.direction == direction.trend() {
            self.config.aligned_confirmations
        } else {
            self.config.counter_trend_confirmations
        }
    }

    /// Evaluate each confirmation against the last two bars of `entry`
    pub fn sub_signals(&self, direction: TradeDirection, entry: &SeriesWindow<'_>) -> SubSignals {
        let cfg = &self.config;

        let di_crossover = detect_crossover(entry.plus_di, entry.minus_di)
            .is_some_and(|c| c.supports(direction));

        let closes = [
            entry.bars.len().checked_sub(2).map(|i| entry.bars[i].close),
            entry.bars.last().map(|b| b.close),
        ];
        let ma_crossover = match (closes, last_two(entry.ma)) {
            ([Some(prev_close), Some(close)], Some((prev_ma, ma))) => match direction {
                TradeDirection::Long => prev_close < prev_ma && close > ma,
                TradeDirection::Short => prev_close > prev_ma && close < ma,
            },
            _ => false,
        };

        let rsi_reversal = last_two(entry.rsi).is_some_and(|(prev, last)| match direction {
            TradeDirection::Long => prev < cfg.rsi_oversold && last > prev,
            TradeDirection::Short => prev > cfg.rsi_overbought && last < prev,
        });

        let stoch_reversal = match (last_two(entry.stoch_k), last_two(entry.stoch_d)) {
            (Some((k_prev, k)), Some((d_prev, d))) => match direction {
                TradeDirection::Long => {
                    k_prev < cfg.stoch_oversold
                        && d_prev < cfg.stoch_oversold
                        && (k > k_prev || d > d_prev)
                }
                TradeDirection::Short => {
                    k_prev > cfg.stoch_overbought
                        && d_prev > cfg.stoch_overbought
                        && (k < k_prev || d < d_prev)
                }
            },
            _ => false,
        };

        SubSignals {
            di_crossover,
            ma_crossover,
            rsi_reversal,
            stoch_reversal,
        }
    }
}

impl Default for ReactionScorer {
    fn default() -> Self {
        Self::new(&EntryConfig::default())
    }
}

impl EntryScorer for ReactionScorer {
    fn score(&self, verdict: &ContextVerdict, entry: &SeriesWindow<'_>) -> Option<Signal> {
        if entry.len() < self.min_bars_required() {
            return None;
        }

        let direction = TradeDirection::from_trend(verdict.instrument_trend.direction);
        let subs = self.sub_signals(direction, entry);
        let score = subs.score();
        let required = self.required_confirmations(verdict, direction);

        tracing::debug!(
            "{} {:?} reaction: DI×={}, MA×={}, RSI↺={}, Stoch↺={} ({}/{} required)",
            entry.symbol,
            direction,
            subs.di_crossover,
            subs.ma_crossover,
            subs.rsi_reversal,
            subs.stoch_reversal,
            score,
            required
        );

        (score >= required).then(|| Signal {
            symbol: entry.symbol.to_string(),
            direction,
            confluence_score: score,
            required_confirmations: required,
            source: SignalSource::Reaction,
        })
    }

    fn name(&self) -> &str {
        "ReactionScorer"
    }

    fn min_bars_required(&self) -> usize {
        2
    }
}
