use crate::backtest::metrics::BacktestMetrics;
use crate::config::StrategyConfig;
use crate::data::resample;
use crate::error::{Result, StrategyError};
use crate::execution::{EntryDecision, EntryInput, ExitInputs, PositionManager, SignalEngine};
use crate::indicators::build_series;
use crate::models::{Bar, MarketSeries, Timeframe};
use crate::risk::PortfolioRiskBudget;
use std::collections::HashMap;
use std::sync::Arc;

pub const BENCHMARK_SYMBOL: &str = "BENCH";

struct Instrument {
    symbol: String,
    higher: MarketSeries,
    lower: MarketSeries,
}

/// Bar-by-bar replay of the entry pipeline and exit machine
///
/// Lower-timeframe bars drive the clock. Higher-timeframe bars are built by
/// resampling, and only completed higher bars are visible at each step.
/// Entries fill at the signal bar's close; exits are evaluated from the next
/// bar on, before any new entries.
pub struct BacktestRunner {
    config: StrategyConfig,
    initial_portfolio_value: f64,
    resample_factor: usize,
}

impl BacktestRunner {
    /// Create a new backtest runner
    pub fn new(config: StrategyConfig, initial_portfolio_value: f64) -> Self {
        Self {
            config,
            initial_portfolio_value,
            resample_factor: 5,
        }
    }

    /// Lower bars per higher bar (5 daily bars make a week)
    pub fn with_resample_factor(mut self, factor: usize) -> Self {
        self.resample_factor = factor.max(1);
        self
    }

    fn min_bars_required(&self) -> usize {
        // ADX is the slowest indicator: 2 × period - 1 higher bars, plus one more for crossovers
        (2 * self.config.trend.adx_period + 1) * self.resample_factor
    }

    /// Run a backtest over a benchmark and instruments sharing its timestamps
    pub fn run(
        &self,
        benchmark: &[Bar],
        instruments: &[(String, Vec<Bar>)],
    ) -> Result<BacktestMetrics> {
        let needed = self.min_bars_required();
        if benchmark.len() < needed {
            return Err(StrategyError::insufficient(
                "backtest",
                needed,
                benchmark.len(),
            ));
        }

        let benchmark_higher = build_series(
            BENCHMARK_SYMBOL,
            Timeframe::Higher,
            resample(benchmark, self.resample_factor),
            &self.config,
        )?;

        let universe = instruments
            .iter()
            .map(|(symbol, bars)| {
                if bars.len() != benchmark.len() {
                    return Err(StrategyError::MisalignedSeries(format!(
                        "{} has {} bars, benchmark has {}",
                        symbol,
                        bars.len(),
                        benchmark.len()
                    )));
                }
                Ok(Instrument {
                    symbol: symbol.clone(),
                    higher: build_series(
                        symbol,
                        Timeframe::Higher,
                        resample(bars, self.resample_factor),
                        &self.config,
                    )?,
                    lower: build_series(symbol, Timeframe::Lower, bars.clone(), &self.config)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        tracing::info!(
            "Starting backtest: {} bars, {} instruments, {} higher bars",
            benchmark.len(),
            universe.len(),
            benchmark_higher.len()
        );

        let budget = Arc::new(PortfolioRiskBudget::new(
            self.initial_portfolio_value,
            self.config.sizing.max_portfolio_risk_pct,
        ));
        let mut pm = PositionManager::new(
            self.initial_portfolio_value,
            &self.config.exits,
            budget.clone(),
        );
        let engine = SignalEngine::new(&self.config);

        let mut exits = Vec::new();
        let mut rejected_signals = 0;

        for t in 0..benchmark.len() {
            // Exits for positions opened on earlier bars
            let bar_inputs: HashMap<String, ExitInputs> = universe
                .iter()
                .filter(|i| pm.has_open_position(&i.symbol))
                .filter_map(|i| {
                    ExitInputs::from_window(&i.lower.window(t + 1), &self.config.pivot)
                        .map(|inputs| (i.symbol.clone(), inputs))
                })
                .collect();
            exits.extend(pm.check_exits(&bar_inputs));

            let completed_higher = (t + 1) / self.resample_factor;
            if completed_higher < 2 {
                continue;
            }

            for instrument in &universe {
                let input = EntryInput {
                    benchmark: benchmark_higher.window(completed_higher),
                    instrument_higher: instrument.higher.window(completed_higher),
                    instrument_lower: instrument.lower.window(t + 1),
                    position: pm.get_open_position(&instrument.symbol),
                };

                match engine.evaluate_entry(&input, pm.equity(), &budget)? {
                    EntryDecision::Order {
                        intent,
                        reservation,
                        ..
                    } => {
                        let timestamp = instrument.lower.bars()[t].timestamp;
                        let fill = pm.open_from_fill(
                            &intent,
                            intent.entry_price,
                            timestamp,
                            Some(reservation),
                        );
                        if let Err(e) = fill {
                            tracing::warn!("Fill rejected for {}: {}", intent.symbol, e);
                        }
                    }
                    EntryDecision::Rejected(e) => {
                        tracing::debug!("{} rejected at bar {}: {}", instrument.symbol, t, e);
                        rejected_signals += 1;
                    }
                    EntryDecision::NoSignal | EntryDecision::Skip(_) => {}
                }
            }
        }

        let final_prices: HashMap<String, f64> = universe
            .iter()
            .filter_map(|i| i.lower.bars().last().map(|b| (i.symbol.clone(), b.close)))
            .collect();
        let final_portfolio_value = pm.portfolio_value(&final_prices);

        let metrics = BacktestMetrics::from_positions(
            pm.all_positions(),
            &exits,
            self.initial_portfolio_value,
            final_portfolio_value,
            rejected_signals,
        );

        tracing::info!(
            "Backtest complete: {} trades, P&L: ${:.2} ({:.2}%)",
            metrics.total_trades,
            metrics.total_pnl,
            metrics.total_return_pct
        );

        Ok(metrics)
    }

    /// Run backtest and print report
    pub fn run_and_report(
        &self,
        benchmark: &[Bar],
        instruments: &[(String, Vec<Bar>)],
        scenario_name: &str,
    ) -> Result<BacktestMetrics> {
        println!("\n🔬 Running backtest: {}", scenario_name);
        println!("   Instruments: {}", instruments.len());
        println!("   Bars: {}", benchmark.len());
        println!("   Initial Portfolio: ${:.2}", self.initial_portfolio_value);

        let metrics = self.run(benchmark, instruments)?;
        metrics.print_report();

        Ok(metrics)
    }
}
