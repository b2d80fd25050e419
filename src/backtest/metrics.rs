use crate::execution::Position;
use crate::models::{ExitIntent, ExitReason, SignalSource, TradeDirection};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const REASONS: [ExitReason; 6] = [
    ExitReason::StopLoss,
    ExitReason::TechnicalReversal,
    ExitReason::FirstProfitTarget,
    ExitReason::SecondProfitTarget,
    ExitReason::MaxHoldingPeriod,
    ExitReason::NoProgress,
];

/// Record of a single closed position for analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub symbol: String,
    pub direction: TradeDirection,
    pub source: SignalSource,
    pub entry_time: DateTime<Utc>,
    pub exit_time: DateTime<Utc>,
    pub entry_price: f64,
    pub shares: u64,
    /// Realized P&L including partial exits
    pub pnl: f64,
    /// P&L in units of the initial risk on the full size
    pub r_multiple: f64,
    pub holding_bars: u32,
    pub partial_exits: usize,
    pub exit_reason: ExitReason,
}

impl TradeRecord {
    pub fn from_position(position: &Position) -> Option<Self> {
        let (Some(exit_time), Some(exit_reason)) = (position.closed_at, position.exit_reason) else {
            return None;
        };

        let initial_risk = position.initial_risk() * position.original_size as f64;
        Some(Self {
            symbol: position.symbol.clone(),
            direction: position.direction,
            source: position.source,
            entry_time: position.opened_at,
            exit_time,
            entry_price: position.entry_price,
            shares: position.original_size,
            pnl: position.realized_pnl,
            r_multiple: if initial_risk > 0.0 {
                position.realized_pnl / initial_risk
            } else {
                0.0
            },
            holding_bars: position.bars_held,
            partial_exits: position.partial_exits_taken.len(),
            exit_reason,
        })
    }
}

/// Complete backtest performance metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestMetrics {
    // P&L Metrics
    pub total_pnl: f64,
    pub total_return_pct: f64,
    pub initial_portfolio_value: f64,
    pub final_portfolio_value: f64,

    // Trade Statistics
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub win_rate: f64,
    pub open_positions: usize,

    // P&L Distribution
    pub avg_win: f64,
    pub avg_loss: f64,
    pub avg_r_multiple: f64,
    pub profit_factor: f64, // Total wins / Total losses

    // Risk Metrics
    pub max_drawdown: f64,
    pub max_drawdown_pct: f64,
    pub rejected_signals: usize,

    pub avg_holding_bars: f64,

    /// Every exit action, partials included, by reason
    pub exits_by_reason: Vec<(ExitReason, usize)>,

    // Trade Records
    pub trades: Vec<TradeRecord>,
}

impl BacktestMetrics {
    /// Calculate metrics from positions and the exit actions taken on them
    pub fn from_positions(
        positions: &[Position],
        exits: &[ExitIntent],
        initial_portfolio_value: f64,
        final_portfolio_value: f64,
        rejected_signals: usize,
    ) -> Self {
        let mut trades: Vec<TradeRecord> =
            positions.iter().filter_map(TradeRecord::from_position).collect();
        trades.sort_by_key(|t| t.exit_time);

        let total_trades = trades.len();
        let total_pnl: f64 = trades.iter().map(|t| t.pnl).sum();
        let total_return_pct =
            ((final_portfolio_value - initial_portfolio_value) / initial_portfolio_value) * 100.0;

        // Win/Loss statistics
        let wins: Vec<f64> = trades.iter().map(|t| t.pnl).filter(|&p| p > 0.0).collect();
        let losses: Vec<f64> = trades.iter().map(|t| t.pnl).filter(|&p| p <= 0.0).collect();
        let total_wins: f64 = wins.iter().sum();
        let loss_sizes: Vec<f64> = losses.iter().map(|p| p.abs()).collect();
        let total_losses: f64 = loss_sizes.iter().sum();

        let mean = |values: &[f64]| {
            if values.is_empty() {
                0.0
            } else {
                values.iter().sum::<f64>() / values.len() as f64
            }
        };

        let win_rate = if total_trades > 0 {
            (wins.len() as f64 / total_trades as f64) * 100.0
        } else {
            0.0
        };

        let profit_factor = if total_losses > 0.0 {
            total_wins / total_losses
        } else if total_wins > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };

        let (max_drawdown, max_drawdown_pct) = realized_drawdown(&trades, initial_portfolio_value);

        let r_multiples: Vec<f64> = trades.iter().map(|t| t.r_multiple).collect();
        let holding: Vec<f64> = trades.iter().map(|t| t.holding_bars as f64).collect();

        let exits_by_reason = REASONS
            .iter()
            .map(|&reason| (reason, exits.iter().filter(|e| e.reason == reason).count()))
            .filter(|(_, count)| *count > 0)
            .collect();

        Self {
            total_pnl,
            total_return_pct,
            initial_portfolio_value,
            final_portfolio_value,
            total_trades,
            winning_trades: wins.len(),
            losing_trades: losses.len(),
            win_rate,
            open_positions: positions.iter().filter(|p| p.is_open()).count(),
            avg_win: mean(&wins),
            avg_loss: mean(&loss_sizes),
            avg_r_multiple: mean(&r_multiples),
            profit_factor,
            max_drawdown,
            max_drawdown_pct,
            rejected_signals,
            avg_holding_bars: mean(&holding),
            exits_by_reason,
            trades,
        }
    }

    /// Print a formatted report to stdout
    pub fn print_report(&self) {
        println!("\n=======================================================");
        println!("              BACKTEST PERFORMANCE REPORT");
        println!("=======================================================\n");

        println!("📊 P&L SUMMARY");
        println!(
            "  Initial Portfolio:     ${:.2}",
            self.initial_portfolio_value
        );
        println!(
            "  Final Portfolio:       ${:.2}",
            self.final_portfolio_value
        );
        println!(
            "  Realized P&L:          ${:.2} ({:+.2}% total return)",
            self.total_pnl, self.total_return_pct
        );

        println!("\n📈 TRADE STATISTICS");
        println!("  Closed Trades:         {}", self.total_trades);
        println!(
            "  Winning Trades:        {} ({:.1}%)",
            self.winning_trades, self.win_rate
        );
        println!("  Losing Trades:         {}", self.losing_trades);
        println!("  Still Open:            {}", self.open_positions);
        println!("  Rejected Signals:      {}", self.rejected_signals);

        if self.total_trades > 0 {
            println!("\n💰 WIN/LOSS ANALYSIS");
            println!("  Average Win:           ${:.2}", self.avg_win);
            println!("  Average Loss:          ${:.2}", self.avg_loss);
            println!("  Average R:             {:+.2}R", self.avg_r_multiple);
            println!("  Profit Factor:         {:.2}", self.profit_factor);
            println!(
                "  Max Drawdown:          ${:.2} ({:.2}%)",
                self.max_drawdown, self.max_drawdown_pct
            );
            println!("  Avg Holding:           {:.1} bars", self.avg_holding_bars);
        }

        if !self.exits_by_reason.is_empty() {
            println!("\n🚪 EXITS");
            for (reason, count) in &self.exits_by_reason {
                println!("  {:<22} {}", format!("{:?}:", reason), count);
            }
        }

        println!("\n=======================================================\n");
    }
}

/// Deepest peak-to-trough fall of the realized equity curve, in dollars and
/// as a percentage of the peak it fell from
fn realized_drawdown(trades: &[TradeRecord], initial_value: f64) -> (f64, f64) {
    let mut equity = initial_value;
    let mut peak = initial_value;
    let (mut worst, mut worst_pct) = (0.0, 0.0);

    for trade in trades {
        equity += trade.pnl;
        peak = peak.max(equity);
        let drawdown = peak - equity;
        if drawdown > worst {
            worst = drawdown;
            worst_pct = if peak > 0.0 { drawdown / peak * 100.0 } else { 0.0 };
        }
    }

    (worst, worst_pct)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::position::test_support::create_test_position;

    fn create_closed_position(pnl: f64, day: i64) -> Position {
        let mut position = create_test_position(TradeDirection::Long, 100.0, 98.0);
        position.size = 0;
        position.realized_pnl = pnl;
        position.bars_held = 4;
        position.closed_at = Some(position.opened_at + chrono::Duration::days(day));
        position.exit_reason = Some(ExitReason::StopLoss);
        position
    }

    fn exit(reason: ExitReason) -> ExitIntent {
        ExitIntent {
            symbol: "ABC".to_string(),
            fraction_to_close: 1.0,
            shares: 1000,
            price: 100.0,
            reason,
        }
    }

    #[test]
    fn test_metrics_with_winning_trades() {
        let positions = vec![
            create_closed_position(1000.0, 1),
            create_closed_position(500.0, 2),
            create_closed_position(-300.0, 3),
        ];

        let metrics = BacktestMetrics::from_positions(&positions, &[], 100_000.0, 101_200.0, 0);

        assert_eq!(metrics.total_trades, 3);
        assert_eq!(metrics.winning_trades, 2);
        assert_eq!(metrics.losing_trades, 1);
        assert!((metrics.win_rate - 66.66).abs() < 0.1);
        assert!((metrics.total_pnl - 1200.0).abs() < 0.01);
        // 1000 shares × R of 2.0 = 2000 risked per trade
        assert!((metrics.trades[0].r_multiple - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_metrics_with_no_trades() {
        let metrics = BacktestMetrics::from_positions(&[], &[], 10_000.0, 10_000.0, 2);

        assert_eq!(metrics.total_trades, 0);
        assert_eq!(metrics.win_rate, 0.0);
        assert_eq!(metrics.total_pnl, 0.0);
        assert_eq!(metrics.rejected_signals, 2);
    }

    #[test]
    fn test_open_positions_are_not_trades() {
        let positions = vec![create_test_position(TradeDirection::Long, 100.0, 98.0)];
        let metrics = BacktestMetrics::from_positions(&positions, &[], 10_000.0, 10_000.0, 0);
        assert_eq!(metrics.total_trades, 0);
        assert_eq!(metrics.open_positions, 1);
    }

    #[test]
    fn test_profit_factor_calculation() {
        let positions = vec![
            create_closed_position(200.0, 1),
            create_closed_position(100.0, 2),
            create_closed_position(-50.0, 3),
        ];

        let metrics = BacktestMetrics::from_positions(&positions, &[], 10_000.0, 10_250.0, 0);

        // Profit factor = Total wins / Total losses = 300 / 50 = 6.0
        assert!((metrics.profit_factor - 6.0).abs() < 0.01);
    }

    #[test]
    fn test_drawdown_calculation() {
        let positions = vec![
            create_closed_position(100.0, 1),  // Peak at 10100
            create_closed_position(-200.0, 2), // Down to 9900 (drawdown: 200)
            create_closed_position(50.0, 3),   // Back to 9950
        ];

        let metrics = BacktestMetrics::from_positions(&positions, &[], 10_000.0, 9_950.0, 0);

        assert!((metrics.max_drawdown - 200.0).abs() < 0.01);
    }

    #[test]
    fn test_exits_by_reason_counts_partials() {
        let exits = vec![
            exit(ExitReason::FirstProfitTarget),
            exit(ExitReason::SecondProfitTarget),
            exit(ExitReason::FirstProfitTarget),
            exit(ExitReason::StopLoss),
        ];
        let metrics = BacktestMetrics::from_positions(&[], &exits, 10_000.0, 10_000.0, 0);

        assert_eq!(
            metrics.exits_by_reason,
            vec![
                (ExitReason::StopLoss, 1),
                (ExitReason::FirstProfitTarget, 2),
                (ExitReason::SecondProfitTarget, 1),
            ]
        );
    }
}
