use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, StrategyError};

const EPSILON: f64 = 1e-9;

/// Handle for capital at risk held against the portfolio ceiling
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: Uuid,
    pub amount: f64,
}

#[derive(Debug, Clone, Copy)]
struct Held {
    original: f64,
    remaining: f64,
}

#[derive(Debug)]
struct BudgetState {
    equity: f64,
    open_risk: f64,
    reservations: HashMap<Uuid, Held>,
}

/// Portfolio-wide cap on aggregate open risk
///
/// Shared across symbol pipelines. Every check-and-reserve happens under one
/// lock so concurrent signals can never jointly overshoot the ceiling.
#[derive(Debug)]
pub struct PortfolioRiskBudget {
    ceiling_pct: f64,
    state: Mutex<BudgetState>,
}

impl PortfolioRiskBudget {
    pub fn new(equity: f64, ceiling_pct: f64) -> Self {
        Self {
            ceiling_pct,
            state: Mutex::new(BudgetState {
                equity,
                open_risk: 0.0,
                reservations: HashMap::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BudgetState> {
        // State is only mutated after all checks pass, so a poisoned guard is still consistent
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn equity(&self) -> f64 {
        self.lock().equity
    }

    pub fn set_equity(&self, equity: f64) {
        self.lock().equity = equity;
    }

    pub fn open_risk(&self) -> f64 {
        self.lock().open_risk
    }

    pub fn ceiling(&self) -> f64 {
        self.lock().equity * self.ceiling_pct
    }

    pub fn headroom(&self) -> f64 {
        let state = self.lock();
        (state.equity * self.ceiling_pct - state.open_risk).max(0.0)
    }

    pub fn reservation_count(&self) -> usize {
        self.lock().reservations.len()
    }

    /// Atomically check the ceiling and reserve `amount` if it fits
    pub fn try_reserve(&self, amount: f64) -> Result<Reservation> {
        if !(amount > 0.0) || !amount.is_finite() {
            return Err(StrategyError::DegenerateRisk(format!(
                "cannot reserve risk amount {}",
                amount
            )));
        }

        let mut state = self.lock();
        let ceiling = state.equity * self.ceiling_pct;
        if state.open_risk + amount > ceiling + EPSILON {
            return Err(StrategyError::BudgetExceeded {
                requested: amount,
                open: state.open_risk,
                ceiling,
            });
        }

        let id = Uuid::new_v4();
        state.open_risk += amount;
        state.reservations.insert(
            id,
            Held {
                original: amount,
                remaining: amount,
            },
        );
        tracing::debug!(
            "Reserved {:.2} risk ({:.2}/{:.2} open)",
            amount,
            state.open_risk,
            ceiling
        );

        Ok(Reservation { id, amount })
    }

    /// Release whatever is left of a reservation. Returns the amount freed.
    pub fn release(&self, reservation: &Reservation) -> f64 {
        let mut state = self.lock();
        match state.reservations.remove(&reservation.id) {
            Some(held) => {
                state.open_risk = (state.open_risk - held.remaining).max(0.0);
                held.remaining
            }
            None => 0.0,
        }
    }

    /// Release `fraction` of the reservation's original amount
    pub fn release_fraction(&self, reservation: &Reservation, fraction: f64) -> f64 {
        let mut state = self.lock();
        let Some(held) = state.reservations.get_mut(&reservation.id) else {
            return 0.0;
        };

        let freed = (held.original * fraction.clamp(0.0, 1.0)).min(held.remaining);
        held.remaining -= freed;
        if held.remaining <= EPSILON {
            state.reservations.remove(&reservation.id);
        }
        state.open_risk = (state.open_risk - freed).max(0.0);
        freed
    }
}
