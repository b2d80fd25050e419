/// Context gate: benchmark trend + instrument trend + relative strength
///
/// Three-way routing, evaluated in order:
/// 1. Misaligned trends skip, unless the benchmark is falling and the
///    instrument outperforms it by more than the override threshold
/// 2. Instrument ADX below the consolidation level routes to the oscillator
///    scorer, except a strong benchmark against a misaligned instrument
/// 3. Everything else routes to the reaction scorer
use serde::{Deserialize, Serialize};

use crate::config::ContextConfig;
use crate::models::{TrendDirection, TrendState, TrendStrength};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Regime {
    Trending,
    Consolidating,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContextVerdict {
    pub benchmark_trend: TrendState,
    pub instrument_trend: TrendState,
    pub aligned: bool,
    pub relative_strength: f64,
    pub regime: Regime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Misaligned,
    StrongBenchmarkAgainstConsolidation,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ContextDecision {
    Skip(SkipReason),
    Oscillator(ContextVerdict),
    Reaction(ContextVerdict),
}

impl ContextDecision {
    pub fn verdict(&self) -> Option<&ContextVerdict> {
        match self {
            ContextDecision::Skip(_) => None,
            ContextDecision::Oscillator(v) | ContextDecision::Reaction(v) => Some(v),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContextAggregator {
    consolidation_adx: f64,
    rs_override: f64,
}

impl Default for ContextAggregator {
    fn default() -> Self {
        Self::new(&ContextConfig::default())
    }
}

impl ContextAggregator {
    pub fn new(config: &ContextConfig) -> Self {
        Self {
            consolidation_adx: config.consolidation_adx,
            rs_override: config.rs_override,
        }
    }

    pub fn evaluate(
        &self,
        benchmark: TrendState,
        instrument: TrendState,
        relative_strength: f64,
        instrument_adx: f64,
    ) -> ContextDecision {
        let aligned = benchmark.direction == instrument.direction;

        let outperforming_weak_market =
            benchmark.direction == TrendDirection::Down && relative_strength > self.rs_override;
        if !aligned && !outperforming_weak_market {
            return ContextDecision::Skip(SkipReason::Misaligned);
        }

        let verdict = |regime| ContextVerdict {
            benchmark_trend: benchmark,
            instrument_trend: instrument,
            aligned,
            relative_strength,
            regime,
        };

        if instrument_adx < self.consolidation_adx {
            if benchmark.strength != TrendStrength::Strong || aligned {
                return ContextDecision::Oscillator(verdict(Regime::Consolidating));
            }
            return ContextDecision::Skip(SkipReason::StrongBenchmarkAgainstConsolidation);
        }

        ContextDecision::Reaction(verdict(Regime::Trending))
    }
}
