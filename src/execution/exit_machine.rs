//! Per-position exit state machine
//!
//! Each bar: trailing-stop maintenance, then the first matching guard of
//! 1. Risk stop
//! 2. Technical reversal
//! 3. Profit targets (1.5R then 2.5R, each once)
//! 4. Time exits (max holding period, no progress)
//!
//! `step` is pure: it returns the next position state together with the
//! intent, so a caller commits both or neither.

use crate::config::{ExitConfig, PivotConfig, TrailingMode};
use crate::execution::pivot::{latest_pivot, PivotKind};
use crate::execution::position::Position;
use crate::models::series::{last_two, last_value, SeriesWindow};
use crate::models::{Bar, ExitIntent, ExitReason, TradeDirection};
use crate::regime::{detect_crossover, Crossover};

/// Everything the exit machine reads for one bar of the entry timeframe
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExitInputs {
    pub bar: Bar,
    pub prev_close: Option<f64>,
    pub adx: Option<f64>,
    pub crossover: Option<Crossover>,
    /// Moving average on the previous and current bar
    pub ma: Option<(f64, f64)>,
    pub atr: Option<f64>,
    /// Most recent confirmed swing low before the current bar
    pub swing_low: Option<f64>,
    pub swing_high: Option<f64>,
}

impl ExitInputs {
    /// Snapshot the last bar of a lower-timeframe window
    pub fn from_window(window: &SeriesWindow<'_>, pivot: &PivotConfig) -> Option<Self> {
        let bar = *window.last_bar()?;
        let history = &window.bars[..window.len() - 1];
        let recent = &history[history.len().saturating_sub(pivot.window)..];

        Some(Self {
            bar,
            prev_close: history.last().map(|b| b.close),
            adx: last_value(window.adx),
            crossover: detect_crossover(window.plus_di, window.minus_di),
            ma: last_two(window.ma),
            atr: last_value(window.atr),
            swing_low: latest_pivot(recent, pivot.wing, PivotKind::Low).map(|(_, l)| l),
            swing_high: latest_pivot(recent, pivot.wing, PivotKind::High).map(|(_, l)| l),
        })
    }

    /// Bare price bar with no indicator context
    pub fn from_bar(bar: Bar) -> Self {
        Self {
            bar,
            prev_close: None,
            adx: None,
            crossover: None,
            ma: None,
            atr: None,
            swing_low: None,
            swing_high: None,
        }
    }
}

/// Result of one bar: the committed next state plus at most one action
#[derive(Debug, Clone, PartialEq)]
pub struct ExitStep {
    pub position: Position,
    pub intent: Option<ExitIntent>,
}

#[derive(Debug, Clone)]
pub struct ExitMachine {
    config: ExitConfig,
}

impl Default for ExitMachine {
    fn default() -> Self {
        Self::new(&ExitConfig::default())
    }
}

impl ExitMachine {
    pub fn new(config: &ExitConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    pub fn step(&self, position: &Position, inputs: &ExitInputs) -> ExitStep {
        let mut next = position.clone();
        if !next.is_open() {
            return ExitStep {
                position: next,
                intent: None,
            };
        }

        track_excursion(&mut next, &inputs.bar);
        self.maintain_trailing_stop(&mut next, inputs);

        let close = inputs.bar.close;
        let action = self
            .risk_exit(&next, close)
            .or_else(|| self.reversal_exit(&next, inputs))
            .or_else(|| self.profit_exit(&next, close))
            .or_else(|| self.time_exit(&next));

        let intent = action.map(|(reason, shares)| apply_exit(&mut next, reason, shares, inputs));
        ExitStep {
            position: next,
            intent,
        }
    }

    fn maintain_trailing_stop(&self, position: &mut Position, inputs: &ExitInputs) {
        let close = inputs.bar.close;
        if position.unrealized_r(close) < self.config.trailing_activation_r {
            return;
        }

        let sign = position.direction.sign();
        let candidate = match self.config.trailing_mode {
            TrailingMode::Atr => inputs
                .atr
                .map(|atr| close - sign * self.config.atr_multiple * atr),
            TrailingMode::MovingAverage => inputs.ma.map(|(_, ma)| ma),
        };

        let Some(candidate) = candidate else {
            return;
        };
        let tightens = (candidate - position.current_stop) * sign > 0.0;
        let below_price = (close - candidate) * sign > 0.0;
        if tightens && below_price {
            tracing::debug!(
                "{} trailing stop {:.4} -> {:.4}",
                position.symbol,
                position.current_stop,
                candidate
            );
            position.current_stop = candidate;
        }
    }

    fn risk_exit(&self, position: &Position, close: f64) -> Option<(ExitReason, u64)> {
        let breached = match position.direction {
            TradeDirection::Long => close <= position.current_stop,
            TradeDirection::Short => close >= position.current_stop,
        };
        breached.then_some((ExitReason::StopLoss, position.size))
    }

    fn reversal_exit(&self, position: &Position, inputs: &ExitInputs) -> Option<(ExitReason, u64)> {
        let direction = position.direction;
        let close = inputs.bar.close;

        let di_reversal = matches!(
            (inputs.crossover, inputs.adx),
            (Some(cross), Some(adx)) if cross.is_against(direction) && adx > self.config.reversal_adx
        );

        let ma_reversal = match (inputs.prev_close, inputs.ma) {
            (Some(prev), Some((prev_ma, ma))) => match direction {
                TradeDirection::Long => prev >= prev_ma && close < ma,
                TradeDirection::Short => prev <= prev_ma && close > ma,
            },
            _ => false,
        };

        let pivot_break = match direction {
            TradeDirection::Long => inputs.swing_low.is_some_and(|low| close < low),
            TradeDirection::Short => inputs.swing_high.is_some_and(|high| close > high),
        };

        (di_reversal || ma_reversal || pivot_break)
            .then_some((ExitReason::TechnicalReversal, position.size))
    }

    fn profit_exit(&self, position: &Position, close: f64) -> Option<(ExitReason, u64)> {
        let gain_r = position.unrealized_r(close);
        let reason = match position.partial_exits_taken.len() {
            0 if gain_r >= self.config.first_target_r => ExitReason::FirstProfitTarget,
            1 if gain_r >= self.config.second_target_r => ExitReason::SecondProfitTarget,
            _ => return None,
        };

        let target = (position.original_size as f64 * self.config.partial_fraction).floor() as u64;
        Some((reason, target.clamp(1, position.size)))
    }

    fn time_exit(&self, position: &Position) -> Option<(ExitReason, u64)> {
        if position.bars_held > self.config.max_holding_bars {
            Some((ExitReason::MaxHoldingPeriod, position.size))
        } else if position.bars_since_extreme >= self.config.no_progress_bars {
            Some((ExitReason::NoProgress, position.size))
        } else {
            None
        }
    }
}

fn track_excursion(position: &mut Position, bar: &Bar) {
    position.bars_held += 1;

    let extreme = match position.direction {
        TradeDirection::Long => bar.high,
        TradeDirection::Short => bar.low,
    };
    if (extreme - position.best_price) * position.direction.sign() > 0.0 {
        position.best_price = extreme;
        position.bars_since_extreme = 0;
    } else {
        position.bars_since_extreme += 1;
    }

    let excursion = (position.best_price - position.entry_price) * position.direction.sign();
    position.max_favorable_excursion = position.max_favorable_excursion.max(excursion);
}

fn apply_exit(
    position: &mut Position,
    reason: ExitReason,
    shares: u64,
    inputs: &ExitInputs,
) -> ExitIntent {
    let price = inputs.bar.close;
    let fraction = shares as f64 / position.original_size as f64;

    position.size -= shares;
    position.realized_pnl +=
        (price - position.entry_price) * position.direction.sign() * shares as f64;
    if reason.is_partial() {
        position.partial_exits_taken.push(fraction);
    }
    if position.size == 0 {
        position.closed_at = Some(inputs.bar.timestamp);
        position.exit_reason = Some(reason);
    }

    ExitIntent {
        symbol: position.symbol.clone(),
        fraction_to_close: fraction,
        shares,
        price,
        reason,
    }
}
