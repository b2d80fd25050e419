//! Swing pivots and initial stop placement
//!
//! A pivot low is a bar whose low is strictly below the lows of `wing` bars
//! on each side; a pivot high mirrors it with highs.

use crate::config::PivotConfig;
use crate::error::{Result, StrategyError};
use crate::models::{Bar, TradeDirection};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PivotKind {
    Low,
    High,
}

impl PivotKind {
    /// Pivot that anchors the protective stop for `direction`
    pub fn protecting(direction: TradeDirection) -> Self {
        match direction {
            TradeDirection::Long => PivotKind::Low,
            TradeDirection::Short => PivotKind::High,
        }
    }

    fn level(self, bar: &Bar) -> f64 {
        match self {
            PivotKind::Low => bar.low,
            PivotKind::High => bar.high,
        }
    }

    /// True when `a` is strictly more extreme than `b`
    fn beyond(self, a: f64, b: f64) -> bool {
        match self {
            PivotKind::Low => a < b,
            PivotKind::High => a > b,
        }
    }
}

fn is_pivot(bars: &[Bar], i: usize, wing: usize, kind: PivotKind) -> bool {
    let level = kind.level(&bars[i]);
    bars[i - wing..i]
        .iter()
        .chain(&bars[i + 1..=i + wing])
        .all(|b| kind.beyond(level, kind.level(b)))
}

fn candidates(len: usize, wing: usize) -> std::ops::Range<usize> {
    if len < 2 * wing + 1 {
        0..0
    } else {
        wing..len - wing
    }
}

/// Oldest pivot in `bars`, as `(index, level)`
pub fn first_pivot(bars: &[Bar], wing: usize, kind: PivotKind) -> Option<(usize, f64)> {
    candidates(bars.len(), wing)
        .find(|&i| is_pivot(bars, i, wing, kind))
        .map(|i| (i, kind.level(&bars[i])))
}

/// Newest confirmed pivot in `bars`, as `(index, level)`
pub fn latest_pivot(bars: &[Bar], wing: usize, kind: PivotKind) -> Option<(usize, f64)> {
    candidates(bars.len(), wing)
        .rev()
        .find(|&i| is_pivot(bars, i, wing, kind))
        .map(|i| (i, kind.level(&bars[i])))
}

/// Initial stop for a trade entered on the last bar of `bars`
///
/// Uses the oldest pivot in the trailing window, falling back to the extreme
/// of the last few bars, then pushes it away from price by the buffer.
pub fn locate_stop(bars: &[Bar], direction: TradeDirection, config: &PivotConfig) -> Result<f64> {
    if bars.len() < config.fallback_window {
        return Err(StrategyError::insufficient(
            "pivot",
            config.fallback_window,
            bars.len(),
        ));
    }

    let kind = PivotKind::protecting(direction);
    let window = &bars[bars.len().saturating_sub(config.window)..];

    let anchor = match first_pivot(window, config.wing, kind) {
        Some((index, level)) => {
            tracing::debug!("Pivot {:?} at window index {}: {:.4}", kind, index, level);
            level
        }
        None => {
            let recent = &bars[bars.len() - config.fallback_window..];
            let levels = recent.iter().map(|b| kind.level(b));
            let level = match kind {
                PivotKind::Low => levels.fold(f64::INFINITY, f64::min),
                PivotKind::High => levels.fold(f64::NEG_INFINITY, f64::max),
            };
            tracing::debug!(
                "No pivot in {} bars, falling back to last {} bars: {:.4}",
                window.len(),
                config.fallback_window,
                level
            );
            level
        }
    };

    Ok(match direction {
        TradeDirection::Long => anchor * (1.0 - config.buffer_pct),
        TradeDirection::Short => anchor * (1.0 + config.buffer_pct),
    })
}
