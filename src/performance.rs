use crate::models::{PerformanceMetrics, PortfolioSnapshot, Trade};
use statrs::statistics::Statistics;

const TRADING_DAYS_PER_YEAR: f64 = 252.0;

pub struct PerformanceCalculator;

impl PerformanceCalculator {
    /// Derive the full metric set from the realized-trade ledger and the
    /// daily snapshot series. Max drawdown is taken from the ledger's
    /// incremental tracking rather than recomputed.
    pub fn calculate(
        trades: &[Trade],
        snapshots: &[PortfolioSnapshot],
        initial_capital: f64,
        max_drawdown_pct: f64,
    ) -> PerformanceMetrics {
        let final_value = snapshots
            .last()
            .map(|snapshot| snapshot.total_value)
            .unwrap_or(initial_capital);

        let total_return_pct = if initial_capital > 0.0 {
            (final_value - initial_capital) / initial_capital * 100.0
        } else {
            0.0
        };

        let backtest_years = snapshots.len() as f64 / TRADING_DAYS_PER_YEAR;
        let annualized_return_pct =
            Self::annualized_return(initial_capital, final_value, backtest_years);
        let sharpe_ratio = Self::sharpe_ratio(snapshots);

        let winning: Vec<&Trade> = trades.iter().filter(|trade| trade.pnl > 0.0).collect();
        let losing: Vec<&Trade> = trades.iter().filter(|trade| trade.pnl < 0.0).collect();
        let total_trades = trades.len();

        let win_rate_pct = if total_trades > 0 {
            winning.len() as f64 / total_trades as f64 * 100.0
        } else {
            0.0
        };
        let avg_win_pct = Self::average(winning.iter().map(|trade| trade.pnl_pct));
        let avg_loss_pct = Self::average(losing.iter().map(|trade| trade.pnl_pct));
        let avg_holding_days = Self::average(trades.iter().map(|trade| trade.holding_days as f64));

        let gross_profit: f64 = winning.iter().map(|trade| trade.pnl).sum();
        let gross_loss: f64 = losing.iter().map(|trade| trade.pnl.abs()).sum();
        let profit_factor = if gross_loss > 0.0 {
            gross_profit / gross_loss
        } else if !winning.is_empty() {
            f64::INFINITY
        } else {
            0.0
        };

        PerformanceMetrics {
            initial_capital,
            final_value,
            total_return_pct,
            annualized_return_pct,
            max_drawdown_pct,
            sharpe_ratio,
            total_trades,
            winning_trades: winning.len(),
            losing_trades: losing.len(),
            win_rate_pct,
            avg_win_pct,
            avg_loss_pct,
            avg_holding_days,
            profit_factor,
            max_consecutive_losses: Self::max_consecutive_losses(trades),
            backtest_years,
        }
    }

    fn annualized_return(initial_capital: f64, final_value: f64, years: f64) -> f64 {
        if years <= 0.0 || initial_capital <= 0.0 || !final_value.is_finite() {
            return 0.0;
        }
        let ratio = final_value / initial_capital;
        if ratio <= 0.0 {
            return 0.0;
        }
        (ratio.powf(1.0 / years) - 1.0) * 100.0
    }

    fn sharpe_ratio(snapshots: &[PortfolioSnapshot]) -> f64 {
        if snapshots.len() < 2 {
            return 0.0;
        }
        let returns: Vec<f64> = snapshots
            .windows(2)
            .map(|window| {
                let prev = window[0].total_value;
                let curr = window[1].total_value;
                if prev > 0.0 {
                    (curr - prev) / prev
                } else {
                    0.0
                }
            })
            .collect();

        let mean_return = returns.clone().mean();
        let std_dev = returns.std_dev();
        if std_dev == 0.0 || !std_dev.is_finite() {
            return 0.0;
        }
        mean_return / std_dev * TRADING_DAYS_PER_YEAR.sqrt()
    }

    fn average(values: impl Iterator<Item = f64>) -> f64 {
        let mut sum = 0.0;
        let mut count = 0usize;
        for value in values {
            if value.is_finite() {
                sum += value;
                count += 1;
            }
        }
        if count == 0 {
            0.0
        } else {
            sum / count as f64
        }
    }

    fn max_consecutive_losses(trades: &[Trade]) -> usize {
        let mut longest = 0usize;
        let mut current = 0usize;
        for trade in trades {
            if trade.pnl < 0.0 {
                current += 1;
                longest = longest.max(current);
            } else {
                current = 0;
            }
        }
        longest
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EntrySignal, ExitReason, SignalClass, TrendResult, VcpResult};
    use chrono::NaiveDate;

    fn day(offset: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 2).unwrap() + chrono::Duration::days(offset)
    }

    fn trade(pnl: f64, holding_days: i64) -> Trade {
        let symbol = "AAA".to_string();
        Trade {
            symbol: symbol.clone(),
            entry_date: day(0),
            exit_date: day(holding_days),
            entry_price: 100.0,
            exit_price: 100.0 + pnl / 100.0,
            shares: 100,
            pnl,
            pnl_pct: pnl / 10_000.0 * 100.0,
            exit_reason: if pnl >= 0.0 {
                ExitReason::TakeProfit20
            } else {
                ExitReason::StopLoss
            },
            holding_days,
            signal: EntrySignal {
                symbol: symbol.clone(),
                class: SignalClass::Buy,
                strength: 8,
                entry_price: 100.0,
                stop_loss_price: 93.0,
                suggested_position_pct: 5.0,
                trend: TrendResult::insufficient_history(&symbol),
                vcp: VcpResult::insufficient_history(&symbol),
                as_of: day(0),
            },
        }
    }

    fn snapshot(offset: i64, total_value: f64) -> PortfolioSnapshot {
        PortfolioSnapshot {
            date: day(offset),
            cash: total_value,
            positions_value: 0.0,
            total_value,
            open_positions: 0,
            drawdown: 0.0,
        }
    }

    #[test]
    fn one_year_of_snapshots_annualizes_exactly() {
        // 252 snapshots is exactly one year; +20% total is +20% annualized.
        let snapshots: Vec<PortfolioSnapshot> = (0..252)
            .map(|i| snapshot(i, 100_000.0 + (i as f64 + 1.0) / 252.0 * 20_000.0))
            .collect();
        let metrics = PerformanceCalculator::calculate(&[], &snapshots, 100_000.0, 0.0);

        assert!((metrics.backtest_years - 1.0).abs() < 1e-12);
        assert!((metrics.total_return_pct - 20.0).abs() < 1e-9);
        assert!((metrics.annualized_return_pct - 20.0).abs() < 1e-9);
        assert_eq!(metrics.total_trades, 0);
        assert_eq!(metrics.win_rate_pct, 0.0);
    }

    #[test]
    fn no_snapshots_reports_zero_returns() {
        let metrics = PerformanceCalculator::calculate(&[], &[], 100_000.0, 0.0);
        assert!((metrics.final_value - 100_000.0).abs() < 1e-9);
        assert_eq!(metrics.annualized_return_pct, 0.0);
        assert_eq!(metrics.sharpe_ratio, 0.0);
    }

    #[test]
    fn all_winners_reports_infinite_profit_factor() {
        let trades = vec![trade(500.0, 10), trade(300.0, 20)];
        let metrics = PerformanceCalculator::calculate(&trades, &[], 100_000.0, 0.0);

        assert!(metrics.profit_factor.is_infinite());
        assert!((metrics.win_rate_pct - 100.0).abs() < 1e-9);
        assert_eq!(metrics.max_consecutive_losses, 0);
        assert!((metrics.avg_holding_days - 15.0).abs() < 1e-9);
    }

    #[test]
    fn counts_longest_losing_streak() {
        let trades = vec![
            trade(100.0, 5),
            trade(-50.0, 5),
            trade(-50.0, 5),
            trade(-50.0, 5),
            trade(200.0, 5),
            trade(-50.0, 5),
        ];
        let metrics = PerformanceCalculator::calculate(&trades, &[], 100_000.0, 0.0);

        assert_eq!(metrics.max_consecutive_losses, 3);
        assert_eq!(metrics.winning_trades, 2);
        assert_eq!(metrics.losing_trades, 4);
        assert!((metrics.profit_factor - 300.0 / 200.0).abs() < 1e-9);
    }

    #[test]
    fn flat_equity_curve_has_zero_sharpe() {
        let snapshots: Vec<PortfolioSnapshot> =
            (0..100).map(|i| snapshot(i, 100_000.0)).collect();
        let metrics = PerformanceCalculator::calculate(&[], &snapshots, 100_000.0, 0.0);
        assert_eq!(metrics.sharpe_ratio, 0.0);
    }
}
