use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use swingbot::backtest::{MarketScenario, SyntheticDataGenerator, BENCHMARK_SYMBOL};
use swingbot::data::{clean_bars, ensure_aligned, resample, validate_series};
use swingbot::execution::{EntryDecision, EntryInput, SignalEngine};
use swingbot::indicators::build_series;
use swingbot::models::{Bar, MarketSeries, Timeframe};
use swingbot::risk::PortfolioRiskBudget;
use swingbot::StrategyConfig;
use tokio::task::JoinSet;
use tracing_subscriber::EnvFilter;

/// Lower bars per higher bar
const RESAMPLE_FACTOR: usize = 5;

#[derive(Parser, Debug)]
#[command(author, version, about = "Scan a synthetic universe for swing entries")]
struct Args {
    /// TOML config file (SWINGBOT__* env vars override it)
    #[arg(short, long, env = "SWINGBOT_CONFIG")]
    config: Option<PathBuf>,

    /// Number of instruments to scan
    #[arg(short, long, default_value = "8")]
    symbols: usize,

    /// Daily bars per series
    #[arg(short, long, default_value = "300")]
    bars: usize,

    /// Seed for the synthetic universe
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Account equity
    #[arg(short, long, default_value = "100000")]
    equity: f64,

    /// Debug logging for swingbot
    #[arg(short, long)]
    verbose: bool,
}

struct SymbolSeries {
    higher: MarketSeries,
    lower: MarketSeries,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    setup_logging(args.verbose);

    let config = Arc::new(
        StrategyConfig::load(args.config.as_deref()).context("Failed to load configuration")?,
    );

    tracing::info!("🚀 swingbot scan starting");
    tracing::info!(
        "  Symbols: {}, bars: {}, seed: {}, equity: ${:.2}",
        args.symbols,
        args.bars,
        args.seed,
        args.equity
    );
    tracing::info!(
        "  Risk per trade: {:.1}%, portfolio ceiling: {:.1}%",
        config.sizing.risk_pct * 100.0,
        config.sizing.max_portfolio_risk_pct * 100.0
    );

    let (benchmark_bars, universe) = generate_universe(args.seed, args.symbols, args.bars);
    let benchmark_bars = prepare_bars(BENCHMARK_SYMBOL, benchmark_bars)
        .context("Benchmark series failed validation")?;

    let benchmark = Arc::new(
        build_series(
            BENCHMARK_SYMBOL,
            Timeframe::Higher,
            resample(&benchmark_bars, RESAMPLE_FACTOR),
            &config,
        )
        .context("Failed to build benchmark series")?,
    );

    let mut series = Vec::with_capacity(universe.len());
    for (symbol, bars) in universe {
        let Some(bars) = prepare_instrument(&benchmark_bars, &symbol, bars) else {
            continue;
        };

        let higher = build_series(
            &symbol,
            Timeframe::Higher,
            resample(&bars, RESAMPLE_FACTOR),
            &config,
        )?;
        let lower = build_series(&symbol, Timeframe::Lower, bars, &config)?;
        series.push(Arc::new(SymbolSeries { higher, lower }));
    }

    let engine = Arc::new(SignalEngine::new(&config));
    let budget = Arc::new(PortfolioRiskBudget::new(
        args.equity,
        config.sizing.max_portfolio_risk_pct,
    ));

    // Every symbol evaluates in parallel; the budget serializes reservations
    let mut tasks = JoinSet::new();
    for symbol_series in series {
        let engine = engine.clone();
        let budget = budget.clone();
        let benchmark = benchmark.clone();
        let equity = args.equity;

        tasks.spawn(async move {
            let input = EntryInput {
                benchmark: benchmark.view(),
                instrument_higher: symbol_series.higher.view(),
                instrument_lower: symbol_series.lower.view(),
                position: None,
            };
            let decision = engine.evaluate_entry(&input, equity, &budget);
            (symbol_series.lower.symbol().to_string(), decision)
        });
    }

    let mut orders = 0;
    while let Some(joined) = tasks.join_next().await {
        let (symbol, decision) = joined.context("Scan task failed")?;
        match decision.with_context(|| format!("Fatal error evaluating {}", symbol))? {
            EntryDecision::Order { intent, .. } => {
                orders += 1;
                println!("{}", serde_json::to_string(&intent)?);
            }
            EntryDecision::Rejected(e) => tracing::info!("{}: rejected ({})", symbol, e),
            EntryDecision::Skip(cause) => tracing::debug!("{}: skipped ({:?})", symbol, cause),
            EntryDecision::NoSignal => tracing::debug!("{}: no signal", symbol),
        }
    }

    tracing::info!(
        "✅ Scan complete: {} orders, open risk ${:.2} of ${:.2}",
        orders,
        budget.open_risk(),
        budget.ceiling()
    );

    Ok(())
}

fn setup_logging(verbose: bool) {
    let default = if verbose { "swingbot=debug" } else { "swingbot=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Clean a raw series and drop it if issues remain
fn prepare_bars(symbol: &str, bars: Vec<Bar>) -> Option<Vec<Bar>> {
    let bars = clean_bars(bars);
    let report = validate_series(&bars);
    if !report.is_valid() {
        tracing::warn!("{}: {} data issues, skipping", symbol, report.issues.len());
        return None;
    }
    Some(bars)
}

/// Cleaned instrument bars, or None when they no longer line up with the benchmark
fn prepare_instrument(benchmark: &[Bar], symbol: &str, bars: Vec<Bar>) -> Option<Vec<Bar>> {
    let bars = prepare_bars(symbol, bars)?;
    if let Err(e) = ensure_aligned(benchmark, &bars, bars.len()) {
        tracing::warn!("{}: {}, skipping", symbol, e);
        return None;
    }
    Some(bars)
}

/// Benchmark plus instruments with different betas and drifts
fn generate_universe(
    seed: u64,
    symbols: usize,
    bars: usize,
) -> (Vec<Bar>, Vec<(String, Vec<Bar>)>) {
    let mut generator = SyntheticDataGenerator::new(seed).with_base_price(80.0);
    let benchmark = generator.generate(MarketScenario::Pullbacks, bars);

    let universe = (0..symbols)
        .map(|i| {
            let beta = 0.6 + 0.15 * (i % 6) as f64;
            let drift = if i % 3 == 2 { -0.001 } else { 0.0005 * (i % 3) as f64 };
            let bars = generator.generate_correlated(&benchmark, beta, drift, 0.012);
            (format!("SYN{:02}", i), bars)
        })
        .collect();

    (benchmark, universe)
}
