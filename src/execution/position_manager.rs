use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::ExitConfig;
use crate::execution::exit_machine::{ExitInputs, ExitMachine};
use crate::execution::position::Position;
use crate::models::{ExitIntent, OrderIntent};
use crate::risk::{PortfolioRiskBudget, Reservation};

/// Open and closed positions, their exits, and the risk they hold
///
/// Each position has a single writer: `on_bar` takes `&mut self`, computes the
/// next state with the exit machine and swaps it in whole.
pub struct PositionManager {
    positions: Vec<Position>,
    machine: ExitMachine,
    budget: Arc<PortfolioRiskBudget>,
    initial_equity: f64,
    total_pnl: f64, // Realized P&L across all exits, partials included
}

impl PositionManager {
    pub fn new(initial_equity: f64, exits: &ExitConfig, budget: Arc<PortfolioRiskBudget>) -> Self {
        Self {
            positions: Vec::new(),
            machine: ExitMachine::new(exits),
            budget,
            initial_equity,
            total_pnl: 0.0,
        }
    }

    /// Get all positions (both open and closed)
    pub fn all_positions(&self) -> &[Position] {
        &self.positions
    }

    /// Get all open positions
    pub fn open_positions(&self) -> Vec<&Position> {
        self.positions.iter().filter(|p| p.is_open()).collect()
    }

    /// Get total realized P&L
    pub fn total_pnl(&self) -> f64 {
        self.total_pnl
    }

    /// Starting equity plus realized P&L
    pub fn equity(&self) -> f64 {
        self.initial_equity + self.total_pnl
    }

    pub fn budget(&self) -> &Arc<PortfolioRiskBudget> {
        &self.budget
    }

    /// Check if we have open position for symbol
    pub fn has_open_position(&self, symbol: &str) -> bool {
        self.positions.iter().any(|p| p.symbol == symbol && p.is_open())
    }

    /// Get open position for symbol
    pub fn get_open_position(&self, symbol: &str) -> Option<&Position> {
        self.positions
            .iter()
            .find(|p| p.symbol == symbol && p.is_open())
    }

    /// Get position by ID
    pub fn get_position(&self, position_id: Uuid) -> anyhow::Result<&Position> {
        self.positions
            .iter()
            .find(|p| p.id == position_id)
            .ok_or_else(|| anyhow::anyhow!("Position not found"))
    }

    /// Create a position from a confirmed fill
    ///
    /// The reservation taken when the intent was sized moves onto the
    /// position. If the position cannot be opened it is released.
    pub fn open_from_fill(
        &mut self,
        intent: &OrderIntent,
        fill_price: f64,
        timestamp: DateTime<Utc>,
        reservation: Option<Reservation>,
    ) -> anyhow::Result<Uuid> {
        let opened = if self.has_open_position(&intent.symbol) {
            Err(anyhow::anyhow!(
                "Already have open position for {}",
                intent.symbol
            ))
        } else {
            Position::open(intent, fill_price, timestamp, reservation).map_err(anyhow::Error::from)
        };

        let position = match opened {
            Ok(position) => position,
            Err(e) => {
                if let Some(r) = &reservation {
                    self.budget.release(r);
                }
                return Err(e);
            }
        };

        tracing::info!(
            "Opened {:?} {} x{} @ ${:.2} (stop ${:.2}, {:?})",
            position.direction,
            position.symbol,
            position.size,
            position.entry_price,
            position.initial_stop,
            position.source
        );

        let id = position.id;
        self.positions.push(position);
        Ok(id)
    }

    /// Run the exit machine for the symbol's open position on one bar
    pub fn on_bar(&mut self, symbol: &str, inputs: &ExitInputs) -> Option<ExitIntent> {
        let index = self
            .positions
            .iter()
            .position(|p| p.symbol == symbol && p.is_open())?;

        let step = self.machine.step(&self.positions[index], inputs);
        let realized = step.position.realized_pnl - self.positions[index].realized_pnl;
        self.positions[index] = step.position;

        let intent = step.intent?;
        let position = &self.positions[index];
        if let Some(reservation) = &position.reservation {
            if position.is_open() {
                self.budget.release_fraction(reservation, intent.fraction_to_close);
            } else {
                self.budget.release(reservation);
            }
        }

        tracing::info!(
            "{:?} {} x{} ({:.0}% of original) @ ${:.2}: {:?}, P&L ${:.2}",
            position.direction,
            position.symbol,
            intent.shares,
            intent.fraction_to_close * 100.0,
            intent.price,
            intent.reason,
            realized
        );

        self.total_pnl += realized;
        self.budget.set_equity(self.equity());

        Some(intent)
    }

    /// Run exits for every open position that has inputs this bar
    pub fn check_exits(&mut self, inputs: &HashMap<String, ExitInputs>) -> Vec<ExitIntent> {
        let symbols: Vec<String> = self
            .open_positions()
            .iter()
            .map(|p| p.symbol.clone())
            .collect();

        symbols
            .iter()
            .filter_map(|symbol| {
                let bar_inputs = inputs.get(symbol)?;
                self.on_bar(symbol, bar_inputs)
            })
            .collect()
    }

    /// Realized plus unrealized value at the given prices
    pub fn portfolio_value(&self, prices: &HashMap<String, f64>) -> f64 {
        let unrealized: f64 = self
            .positions
            .iter()
            .filter(|p| p.is_open())
            .filter_map(|p| prices.get(&p.symbol).map(|&price| p.unrealized_pnl(price)))
            .sum();

        self.equity() + unrealized
    }
}
