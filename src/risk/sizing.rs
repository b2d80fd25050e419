use serde::{Deserialize, Serialize};

use crate::config::SizingConfig;
use crate::error::{Result, StrategyError};
use crate::models::{SignalSource, TrendStrength};
use crate::regime::ContextVerdict;

/// Outcome of sizing one signal
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SizingDecision {
    pub final_factor: f64,
    pub shares: u64,
    /// shares × stop distance, the capital lost if the stop is hit
    pub risk_amount: f64,
}

/// Position sizing from trend tier, alignment and stop distance
///
/// shares = floor(equity × risk_pct / |entry − stop| × tier × modifier)
#[derive(Debug, Clone)]
pub struct PositionSizer {
    config: SizingConfig,
}

impl Default for PositionSizer {
    fn default() -> Self {
        Self::new(&SizingConfig::default())
    }
}

impl PositionSizer {
    pub fn new(config: &SizingConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    fn tier(&self, strength: TrendStrength) -> f64 {
        match strength {
            TrendStrength::Strong => self.config.strong_tier,
            TrendStrength::Moderate => self.config.moderate_tier,
            TrendStrength::Weak => self.config.weak_tier,
        }
    }

    fn alignment_modifier(&self, verdict: &ContextVerdict) -> f64 {
        if !verdict.aligned {
            return self.config.misaligned_modifier;
        }
        match verdict.benchmark_trend.strength {
            TrendStrength::Strong => self.config.aligned_strong_modifier,
            TrendStrength::Moderate => self.config.aligned_moderate_modifier,
            TrendStrength::Weak => self.config.aligned_weak_modifier,
        }
    }

    /// Tier × alignment modifier. Oscillator signals always use the weak tier.
    pub fn final_factor(&self, verdict: &ContextVerdict, source: SignalSource) -> f64 {
        let base = match source {
            SignalSource::Reaction => self.tier(verdict.instrument_trend.strength),
            SignalSource::Oscillator => self.config.weak_tier,
        };
        base * self.alignment_modifier(verdict)
    }

    pub fn size(
        &self,
        verdict: &ContextVerdict,
        source: SignalSource,
        equity: f64,
        entry_price: f64,
        stop_price: f64,
    ) -> Result<SizingDecision> {
        if !(equity > 0.0) {
            return Err(StrategyError::DegenerateRisk(format!(
                "non-positive equity {:.2}",
                equity
            )));
        }

        let distance = (entry_price - stop_price).abs();
        if !(distance > 0.0) || !distance.is_finite() {
            return Err(StrategyError::DegenerateRisk(format!(
                "stop distance {} between entry {} and stop {}",
                distance, entry_price, stop_price
            )));
        }

        let final_factor = self.final_factor(verdict, source);
        let raw = equity * self.config.risk_pct / distance * final_factor;
        let shares = raw.floor() as u64;
        if shares == 0 {
            return Err(StrategyError::DegenerateRisk(format!(
                "position rounds to zero shares ({:.4})",
                raw
            )));
        }

        Ok(SizingDecision {
            final_factor,
            shares,
            risk_amount: shares as f64 * distance,
        })
    }
}
