pub mod series;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use series::{IndicatorFrame, MarketSeries};

/// OHLCV bar for one (symbol, timeframe) pair
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Bar timeframe. Higher sets context, lower times entries and exits.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Timeframe {
    Higher,
    Lower,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TrendDirection {
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TrendStrength {
    Weak,
    Moderate,
    Strong,
}

/// Direction and strength of a trend at one bar
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct TrendState {
    pub direction: TrendDirection,
    pub strength: TrendStrength,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TradeDirection {
    Long,
    Short,
}

impl TradeDirection {
    /// The trend direction a trade in this direction follows
    pub fn trend(self) -> TrendDirection {
        match self {
            TradeDirection::Long => TrendDirection::Up,
            TradeDirection::Short => TrendDirection::Down,
        }
    }

    pub fn from_trend(direction: TrendDirection) -> Self {
        match direction {
            TrendDirection::Up => TradeDirection::Long,
            TrendDirection::Down => TradeDirection::Short,
        }
    }

    /// +1 for long, -1 for short. Multiplies a price move into a signed gain.
    pub fn sign(self) -> f64 {
        match self {
            TradeDirection::Long => 1.0,
            TradeDirection::Short => -1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum SignalSource {
    Reaction,
    Oscillator,
}

/// Entry signal; only constructed when the confluence threshold is met
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Signal {
    pub symbol: String,
    pub direction: TradeDirection,
    pub confluence_score: u8,
    pub required_confirmations: u8,
    pub source: SignalSource,
}

/// New-entry instruction for the external execution collaborator
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderIntent {
    pub symbol: String,
    pub direction: TradeDirection,
    pub share_count: u64,
    pub entry_price: f64,
    pub stop_price: f64,
    /// Capital at risk reserved against the portfolio budget
    pub risk_amount: f64,
    pub source: SignalSource,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ExitReason {
    StopLoss,
    TechnicalReversal,
    FirstProfitTarget,
    SecondProfitTarget,
    MaxHoldingPeriod,
    NoProgress,
}

impl ExitReason {
    pub fn is_partial(self) -> bool {
        matches!(
            self,
            ExitReason::FirstProfitTarget | ExitReason::SecondProfitTarget
        )
    }
}

/// Exit or partial-exit instruction for an open position
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExitIntent {
    pub symbol: String,
    /// Fraction of the position's original size being closed
    pub fraction_to_close: f64,
    pub shares: u64,
    pub price: f64,
    pub reason: ExitReason,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trade_direction_round_trips_trend() {
        assert_eq!(TradeDirection::from_trend(TrendDirection::Up), TradeDirection::Long);
        assert_eq!(TradeDirection::Short.trend(), TrendDirection::Down);
        assert_eq!(TradeDirection::Long.sign(), 1.0);
        assert_eq!(TradeDirection::Short.sign(), -1.0);
    }

    #[test]
    fn test_strength_ordering() {
        assert!(TrendStrength::Weak < TrendStrength::Moderate);
        assert!(TrendStrength::Moderate < TrendStrength::Strong);
    }

    #[test]
    fn test_partial_reasons() {
        assert!(ExitReason::FirstProfitTarget.is_partial());
        assert!(ExitReason::SecondProfitTarget.is_partial());
        assert!(!ExitReason::StopLoss.is_partial());
    }
}
