use anyhow::{Context, Result};
use swingbot::backtest::{BacktestMetrics, BacktestRunner, MarketScenario, SyntheticDataGenerator};
use swingbot::StrategyConfig;
use tracing_subscriber::EnvFilter;

const BARS: usize = 500;
const INSTRUMENTS: usize = 5;

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("swingbot=info")),
        )
        .init();

    println!("\n=======================================================");
    println!("             SWINGBOT BACKTESTING SUITE");
    println!("=======================================================");

    let config = StrategyConfig::load(None).context("Failed to load configuration")?;
    let initial_portfolio_value = 100_000.0;
    let runner = BacktestRunner::new(config, initial_portfolio_value);

    // Test scenarios
    let scenarios = vec![
        (MarketScenario::Uptrend, "📈 Uptrend"),
        (MarketScenario::Downtrend, "📉 Downtrend"),
        (MarketScenario::Sideways, "↔️  Sideways (mean-reverting)"),
        (MarketScenario::Volatile, "⚡ Volatile (±4% swings)"),
        (MarketScenario::Pullbacks, "🔁 Trend with pullbacks"),
    ];

    let mut all_metrics = Vec::new();

    for (scenario, name) in scenarios {
        let mut generator = SyntheticDataGenerator::new(42);
        let benchmark = generator.generate(scenario, BARS);
        let instruments: Vec<_> = (0..INSTRUMENTS)
            .map(|i| {
                let beta = 0.7 + 0.15 * i as f64;
                let bars = generator.generate_correlated(&benchmark, beta, 0.0003, 0.01);
                (format!("SYN{}", i), bars)
            })
            .collect();

        match runner.run_and_report(&benchmark, &instruments, name) {
            Ok(metrics) => {
                all_metrics.push((name.to_string(), metrics));
            }
            Err(e) => {
                eprintln!("❌ Backtest failed for {}: {}", name, e);
            }
        }
    }

    print_summary_comparison(&all_metrics);

    Ok(())
}

fn print_summary_comparison(results: &[(String, BacktestMetrics)]) {
    println!("\n=======================================================");
    println!("                 SCENARIO COMPARISON");
    println!("=======================================================\n");

    println!(
        "{:<32} {:>10} {:>10} {:>8} {:>8} {:>8}",
        "Scenario", "P&L", "Return%", "Trades", "Win%", "Avg R"
    );
    println!("{}", "─".repeat(80));

    for (name, metrics) in results {
        println!(
            "{:<32} {:>10.2} {:>10.2} {:>8} {:>8.1} {:>8.2}",
            name,
            metrics.total_pnl,
            metrics.total_return_pct,
            metrics.total_trades,
            metrics.win_rate,
            metrics.avg_r_multiple
        );
    }

    println!("\n");
}
