use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, StrategyError};
use crate::models::{ExitReason, OrderIntent, SignalSource, TradeDirection};
use crate::risk::Reservation;

/// Lifecycle stage, derived from size and partials taken
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitStage {
    Open,
    PartiallyClosed(u8),
    Closed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub id: Uuid,
    pub symbol: String,
    pub direction: TradeDirection,
    pub source: SignalSource,
    pub original_size: u64,
    pub size: u64,
    pub entry_price: f64,
    pub initial_stop: f64,
    /// Only ever tightened toward the favorable side
    pub current_stop: f64,
    pub bars_held: u32,
    /// Most favorable price seen (highest high for longs, lowest low for shorts)
    pub best_price: f64,
    pub max_favorable_excursion: f64,
    pub bars_since_extreme: u32,
    /// Fractions of the original size closed by profit targets, in order
    pub partial_exits_taken: Vec<f64>,
    pub realized_pnl: f64,
    pub opened_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub exit_reason: Option<ExitReason>,
    pub reservation: Option<Reservation>,
}

impl Position {
    /// Create a position from a filled order intent
    pub fn open(
        intent: &OrderIntent,
        fill_price: f64,
        opened_at: DateTime<Utc>,
        reservation: Option<Reservation>,
    ) -> Result<Self> {
        if intent.share_count == 0 {
            return Err(StrategyError::DegenerateRisk(format!(
                "{}: zero-share fill",
                intent.symbol
            )));
        }

        let sign = intent.direction.sign();
        if !((fill_price - intent.stop_price) * sign > 0.0) {
            return Err(StrategyError::DegenerateRisk(format!(
                "{} {:?}: stop {:.4} is not on the protective side of fill {:.4}",
                intent.symbol, intent.direction, intent.stop_price, fill_price
            )));
        }

        Ok(Self {
            id: Uuid::new_v4(),
            symbol: intent.symbol.clone(),
            direction: intent.direction,
            source: intent.source,
            original_size: intent.share_count,
            size: intent.share_count,
            entry_price: fill_price,
            initial_stop: intent.stop_price,
            current_stop: intent.stop_price,
            bars_held: 0,
            best_price: fill_price,
            max_favorable_excursion: 0.0,
            bars_since_extreme: 0,
            partial_exits_taken: Vec::new(),
            realized_pnl: 0.0,
            opened_at,
            closed_at: None,
            exit_reason: None,
            reservation,
        })
    }

    /// R: distance from entry to the initial stop
    pub fn initial_risk(&self) -> f64 {
        (self.entry_price - self.initial_stop).abs()
    }

    /// Signed gain at `price` in multiples of R
    pub fn unrealized_r(&self, price: f64) -> f64 {
        (price - self.entry_price) * self.direction.sign() / self.initial_risk()
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        (price - self.entry_price) * self.direction.sign() * self.size as f64
    }

    pub fn is_open(&self) -> bool {
        self.size > 0
    }

    pub fn stage(&self) -> ExitStage {
        if self.size == 0 {
            ExitStage::Closed
        } else if self.partial_exits_taken.is_empty() {
            ExitStage::Open
        } else {
            ExitStage::PartiallyClosed(self.partial_exits_taken.len() as u8)
        }
    }
}
