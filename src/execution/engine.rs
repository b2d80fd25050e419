use crate::config::{PivotConfig, StrategyConfig};
use crate::data::ensure_aligned;
use crate::error::{Result, StrategyError};
use crate::execution::pivot::locate_stop;
use crate::execution::position::Position;
use crate::models::series::{last_value, SeriesWindow};
use crate::models::{OrderIntent, Signal};
use crate::regime::{
    relative_strength, ContextAggregator, ContextDecision, SkipReason, TrendClassifier,
};
use crate::risk::{PortfolioRiskBudget, PositionSizer, Reservation};
use crate::strategy::{EntryScorer, OscillatorScorer, ReactionScorer};

/// Per-symbol inputs for one evaluation cycle
#[derive(Debug, Clone, Copy)]
pub struct EntryInput<'a> {
    /// Benchmark, higher timeframe
    pub benchmark: SeriesWindow<'a>,
    /// Instrument, higher timeframe (trend and regime)
    pub instrument_higher: SeriesWindow<'a>,
    /// Instrument, lower timeframe (entry timing and stops)
    pub instrument_lower: SeriesWindow<'a>,
    pub position: Option<&'a Position>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipCause {
    OpenPosition,
    Indeterminate(&'static str),
    Context(SkipReason),
}

#[derive(Debug, Clone, PartialEq)]
pub enum EntryDecision {
    /// Sized, stopped and reserved against the portfolio budget
    Order {
        intent: OrderIntent,
        signal: Signal,
        reservation: Reservation,
    },
    NoSignal,
    Skip(SkipCause),
    Rejected(StrategyError),
}

/// Entry pipeline: context gate, scorer, stop, sizing, reservation
pub struct SignalEngine {
    classifier: TrendClassifier,
    aggregator: ContextAggregator,
    reaction: ReactionScorer,
    oscillator: OscillatorScorer,
    sizer: PositionSizer,
    pivot: PivotConfig,
    rs_lookback: usize,
}

impl SignalEngine {
    pub fn new(config: &StrategyConfig) -> Self {
        Self {
            classifier: TrendClassifier::new(&config.trend),
            aggregator: ContextAggregator::new(&config.context),
            reaction: ReactionScorer::new(&config.entry),
            oscillator: OscillatorScorer::new(&config.oscillator),
            sizer: PositionSizer::new(&config.sizing),
            pivot: config.pivot.clone(),
            rs_lookback: config.context.rs_lookback,
        }
    }

    /// Evaluate one symbol at its latest closed bar
    ///
    /// Only misaligned benchmark/instrument series are returned as errors.
    /// Every other failure becomes a skip or rejection for this cycle.
    pub fn evaluate_entry(
        &self,
        input: &EntryInput<'_>,
        equity: f64,
        budget: &PortfolioRiskBudget,
    ) -> Result<EntryDecision> {
        let symbol = input.instrument_lower.symbol;

        if input.position.is_some() {
            return Ok(EntryDecision::Skip(SkipCause::OpenPosition));
        }

        if let Err(e) = ensure_aligned(
            input.benchmark.bars,
            input.instrument_higher.bars,
            self.rs_lookback + 1,
        ) {
            tracing::error!("{}: {}", symbol, e);
            return Err(e);
        }

        let Some(benchmark_trend) = self.classifier.classify_window(&input.benchmark) else {
            return Ok(EntryDecision::Skip(SkipCause::Indeterminate("benchmark trend")));
        };
        let Some(instrument_trend) = self.classifier.classify_window(&input.instrument_higher)
        else {
            return Ok(EntryDecision::Skip(SkipCause::Indeterminate("instrument trend")));
        };
        let Some(instrument_adx) = last_value(input.instrument_higher.adx) else {
            return Ok(EntryDecision::Skip(SkipCause::Indeterminate("instrument adx")));
        };

        let rs = relative_strength(
            &input.instrument_higher.closes(),
            &input.benchmark.closes(),
            self.rs_lookback,
        );

        let decision = self
            .aggregator
            .evaluate(benchmark_trend, instrument_trend, rs, instrument_adx);
        tracing::debug!(
            "{}: benchmark {:?}, instrument {:?}, RS {:.2}, ADX {:.1} -> {:?}",
            symbol,
            benchmark_trend,
            instrument_trend,
            rs,
            instrument_adx,
            decision
        );

        let (verdict, scorer) = match decision {
            ContextDecision::Skip(reason) => {
                return Ok(EntryDecision::Skip(SkipCause::Context(reason)))
            }
            ContextDecision::Oscillator(v) => (v, &self.oscillator as &dyn EntryScorer),
            ContextDecision::Reaction(v) => (v, &self.reaction as &dyn EntryScorer),
        };

        if input.instrument_lower.len() < scorer.min_bars_required() {
            return Ok(EntryDecision::Skip(SkipCause::Indeterminate("entry history")));
        }
        let Some(signal) = scorer.score(&verdict, &input.instrument_lower) else {
            return Ok(EntryDecision::NoSignal);
        };
        tracing::info!(
            "{}: {:?} signal from {} ({}/{} confirmations)",
            symbol,
            signal.direction,
            scorer.name(),
            signal.confluence_score,
            signal.required_confirmations
        );

        let Some(entry_bar) = input.instrument_lower.last_bar() else {
            return Ok(EntryDecision::Skip(SkipCause::Indeterminate("entry bar")));
        };
        let entry_price = entry_bar.close;

        let stop = locate_stop(input.instrument_lower.bars, signal.direction, &self.pivot);
        let stop_price = match stop {
            Ok(stop) => stop,
            Err(e) => return Ok(EntryDecision::Rejected(e)),
        };
        if !((entry_price - stop_price) * signal.direction.sign() > 0.0) {
            return Ok(EntryDecision::Rejected(StrategyError::DegenerateRisk(format!(
                "stop {:.4} not on the protective side of entry {:.4}",
                stop_price, entry_price
            ))));
        }

        let sizing = match self
            .sizer
            .size(&verdict, signal.source, equity, entry_price, stop_price)
        {
            Ok(sizing) => sizing,
            Err(e) => {
                tracing::debug!("{}: sizing rejected: {}", symbol, e);
                return Ok(EntryDecision::Rejected(e));
            }
        };

        let reservation = match budget.try_reserve(sizing.risk_amount) {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!("{}: skipping signal, {}", symbol, e);
                return Ok(EntryDecision::Rejected(e));
            }
        };

        let intent = OrderIntent {
            symbol: symbol.to_string(),
            direction: signal.direction,
            share_count: sizing.shares,
            entry_price,
            stop_price,
            risk_amount: sizing.risk_amount,
            source: signal.source,
        };
        tracing::info!(
            "{}: order {:?} x{} @ ${:.2}, stop ${:.2}, risk ${:.2} (factor {:.3})",
            symbol,
            intent.direction,
            intent.share_count,
            intent.entry_price,
            intent.stop_price,
            intent.risk_amount,
            sizing.final_factor
        );

        Ok(EntryDecision::Order {
            intent,
            signal,
            reservation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::position::test_support::create_test_position;
    use crate::models::series::test_support::{bar_at, flat_frame};
    use crate::models::{
        Bar, IndicatorFrame, MarketSeries, SignalSource, Timeframe, TradeDirection,
    };

    const LEN: usize = 30;

    fn uptrend_bars() -> Vec<Bar> {
        // Gentle rise with a swing low at index 20
        (0..LEN)
            .map(|i| {
                let base = 100.0 + i as f64 * 0.5 - if i == 20 { 3.0 } else { 0.0 };
                bar_at(i, base, base + 1.0, base - 1.0, base + 0.5)
            })
            .collect()
    }

    fn trend_frame(adx: f64, plus: f64, minus: f64) -> IndicatorFrame {
        IndicatorFrame {
            adx: vec![adx; LEN],
            plus_di: vec![plus; LEN],
            minus_di: vec![minus; LEN],
            ..flat_frame(LEN)
        }
    }

    struct Fixture {
        benchmark: MarketSeries,
        higher: MarketSeries,
        lower: MarketSeries,
    }

    impl Fixture {
        fn new(lower_frame: IndicatorFrame) -> Self {
            Self {
                benchmark: MarketSeries::new(
                    "BENCH",
                    Timeframe::Higher,
                    uptrend_bars(),
                    trend_frame(35.0, 30.0, 10.0),
                )
                .unwrap(),
                higher: MarketSeries::new(
                    "ABC",
                    Timeframe::Higher,
                    uptrend_bars(),
                    trend_frame(35.0, 30.0, 10.0),
                )
                .unwrap(),
                lower: MarketSeries::new("ABC", Timeframe::Lower, uptrend_bars(), lower_frame)
                    .unwrap(),
            }
        }

        fn input(&self) -> EntryInput<'_> {
            EntryInput {
                benchmark: self.benchmark.view(),
                instrument_higher: self.higher.view(),
                instrument_lower: self.lower.view(),
                position: None,
            }
        }
    }

    fn reaction_frame() -> IndicatorFrame {
        let mut frame = flat_frame(LEN);
        frame.plus_di[LEN - 2] = 10.0;
        frame.minus_di[LEN - 2] = 20.0;
        frame.rsi[LEN - 2] = 35.0;
        frame.rsi[LEN - 1] = 45.0;
        frame
    }

    #[test]
    fn test_reaction_long_order() {
        let fixture = Fixture::new(reaction_frame());
        let budget = PortfolioRiskBudget::new(100_000.0, 0.04);
        let engine = SignalEngine::new(&StrategyConfig::default());

        let decision = engine
            .evaluate_entry(&fixture.input(), 100_000.0, &budget)
            .unwrap();

        let EntryDecision::Order { intent, signal, .. } = decision else {
            panic!("expected order, got {:?}", decision);
        };
        assert_eq!(intent.direction, TradeDirection::Long);
        assert_eq!(signal.required_confirmations, 2);
        assert!(intent.stop_price < intent.entry_price);
        assert!(intent.share_count > 0);
        assert!((budget.open_risk() - intent.risk_amount).abs() < 1e-9);
    }

    #[test]
    fn test_consolidating_instrument_uses_oscillator_at_weak_tier() {
        let mut lower = flat_frame(LEN);
        lower.rsi[LEN - 1] = 25.0;
        lower.stoch_k[LEN - 1] = 10.0;
        lower.stoch_d[LEN - 1] = 12.0;
        let mut fixture = Fixture::new(lower);
        fixture.higher = MarketSeries::new(
            "ABC",
            Timeframe::Higher,
            uptrend_bars(),
            trend_frame(12.0, 30.0, 10.0),
        )
        .unwrap();
        let budget = PortfolioRiskBudget::new(100_000.0, 0.04);

        let decision = SignalEngine::new(&StrategyConfig::default())
            .evaluate_entry(&fixture.input(), 100_000.0, &budget)
            .unwrap();

        let EntryDecision::Order { intent, signal, .. } = decision else {
            panic!("expected oscillator order, got {:?}", decision);
        };
        assert_eq!(signal.source, SignalSource::Oscillator);
        assert_eq!(intent.source, SignalSource::Oscillator);
        assert_eq!(intent.direction, TradeDirection::Long);

        // Weak tier regardless of instrument strength, aligned under a strong benchmark
        let factor = 0.33 * 1.0;
        let distance = intent.entry_price - intent.stop_price;
        assert_eq!(
            intent.share_count,
            (100_000.0 * 0.02 / distance * factor).floor() as u64
        );
        assert_eq!(intent.share_count, 72);
    }

    #[test]
    fn test_short_entry_history_skips_before_scoring() {
        let fixture = Fixture::new(reaction_frame());
        let input = EntryInput {
            instrument_lower: fixture.lower.window(1),
            ..fixture.input()
        };
        let budget = PortfolioRiskBudget::new(100_000.0, 0.04);

        let decision = SignalEngine::new(&StrategyConfig::default())
            .evaluate_entry(&input, 100_000.0, &budget)
            .unwrap();
        assert_eq!(
            decision,
            EntryDecision::Skip(SkipCause::Indeterminate("entry history"))
        );

        // The oscillator route needs at least one bar too
        let mut fixture = Fixture::new(flat_frame(LEN));
        fixture.higher = MarketSeries::new(
            "ABC",
            Timeframe::Higher,
            uptrend_bars(),
            trend_frame(12.0, 30.0, 10.0),
        )
        .unwrap();
        let input = EntryInput {
            instrument_lower: fixture.lower.window(0),
            ..fixture.input()
        };
        let decision = SignalEngine::new(&StrategyConfig::default())
            .evaluate_entry(&input, 100_000.0, &budget)
            .unwrap();
        assert_eq!(
            decision,
            EntryDecision::Skip(SkipCause::Indeterminate("entry history"))
        );
        assert_eq!(budget.open_risk(), 0.0);
    }

    #[test]
    fn test_no_confluence_no_signal() {
        let fixture = Fixture::new(flat_frame(LEN));
        let budget = PortfolioRiskBudget::new(100_000.0, 0.04);
        let engine = SignalEngine::new(&StrategyConfig::default());

        let decision = engine
            .evaluate_entry(&fixture.input(), 100_000.0, &budget)
            .unwrap();
        assert_eq!(decision, EntryDecision::NoSignal);
        assert_eq!(budget.open_risk(), 0.0);
    }

    #[test]
    fn test_open_position_skips() {
        let fixture = Fixture::new(reaction_frame());
        let position = create_test_position(TradeDirection::Long, 100.0, 95.0);
        let input = EntryInput {
            position: Some(&position),
            ..fixture.input()
        };

        let decision = SignalEngine::new(&StrategyConfig::default())
            .evaluate_entry(&input, 100_000.0, &PortfolioRiskBudget::new(100_000.0, 0.04))
            .unwrap();
        assert_eq!(decision, EntryDecision::Skip(SkipCause::OpenPosition));
    }

    #[test]
    fn test_exhausted_budget_rejects() {
        let fixture = Fixture::new(reaction_frame());
        let budget = PortfolioRiskBudget::new(100_000.0, 0.04);
        budget.try_reserve(3999.0).unwrap();

        let decision = SignalEngine::new(&StrategyConfig::default())
            .evaluate_entry(&fixture.input(), 100_000.0, &budget)
            .unwrap();
        assert!(matches!(
            decision,
            EntryDecision::Rejected(StrategyError::BudgetExceeded { .. })
        ));
    }

    #[test]
    fn test_misaligned_series_is_fatal() {
        let fixture = Fixture::new(reaction_frame());
        let short_benchmark = fixture.benchmark.window(LEN - 1);
        let input = EntryInput {
            benchmark: short_benchmark,
            ..fixture.input()
        };

        let result = SignalEngine::new(&StrategyConfig::default()).evaluate_entry(
            &input,
            100_000.0,
            &PortfolioRiskBudget::new(100_000.0, 0.04),
        );
        assert!(matches!(result, Err(e) if e.is_fatal()));
    }

    #[test]
    fn test_indeterminate_benchmark_skips() {
        let mut frame = trend_frame(35.0, 30.0, 10.0);
        frame.adx[LEN - 1] = f64::NAN;
        let mut fixture = Fixture::new(reaction_frame());
        fixture.benchmark =
            MarketSeries::new("BENCH", Timeframe::Higher, uptrend_bars(), frame).unwrap();

        let decision = SignalEngine::new(&StrategyConfig::default())
            .evaluate_entry(
                &fixture.input(),
                100_000.0,
                &PortfolioRiskBudget::new(100_000.0, 0.04),
            )
            .unwrap();
        assert_eq!(
            decision,
            EntryDecision::Skip(SkipCause::Indeterminate("benchmark trend"))
        );
    }
}
