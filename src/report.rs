use crate::models::{EntrySignal, SignalClass, SimulationResult};
use std::fmt::Write;

const TOP_OPPORTUNITIES: usize = 20;
const TOP_TRADES: usize = 5;

/// Console rendering of ranked screening results.
pub fn render_screening_report(signals: &[EntrySignal]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "STOCK SCREENING RESULTS");
    let _ = writeln!(out, "{}", "=".repeat(50));
    if let Some(first) = signals.first() {
        let _ = writeln!(out, "Analysis date: {}", first.as_of);
    }
    let _ = writeln!(out, "Symbols with signals: {}", signals.len());
    let _ = writeln!(out);

    let count = |class: SignalClass| signals.iter().filter(|s| s.class == class).count();
    let _ = writeln!(out, "SIGNAL SUMMARY:");
    let _ = writeln!(out, "  STRONG BUY: {}", count(SignalClass::StrongBuy));
    let _ = writeln!(out, "  BUY:        {}", count(SignalClass::Buy));
    let _ = writeln!(out, "  WATCH:      {}", count(SignalClass::Watch));
    let _ = writeln!(out);

    let _ = writeln!(out, "TOP OPPORTUNITIES (ranked by signal strength):");
    let _ = writeln!(out, "{}", "-".repeat(50));
    for (rank, signal) in signals.iter().take(TOP_OPPORTUNITIES).enumerate() {
        let _ = writeln!(
            out,
            "{:2}. {:10} | {:10} | strength {}/10",
            rank + 1,
            signal.symbol,
            signal.class.as_str(),
            signal.strength
        );
        let _ = writeln!(
            out,
            "    price {:.2} | stop {:.2} | position {:.1}%",
            signal.entry_price, signal.stop_loss_price, signal.suggested_position_pct
        );
        let _ = writeln!(
            out,
            "    template {}/8 | VCP: {} ({} contractions)",
            signal.trend.criteria_passed,
            if signal.vcp.has_pattern { "yes" } else { "no" },
            signal.vcp.contractions_found
        );
        if let Some(latest) = &signal.trend.latest {
            let _ = writeln!(
                out,
                "    from 52w high {:.1}% | above 52w low {:.1}%",
                latest.pct_from_52w_high, latest.pct_from_52w_low
            );
        }
        let _ = writeln!(out);
    }
    out
}

/// Console rendering of a completed walk-forward run.
pub fn render_backtest_report(result: &SimulationResult) -> String {
    let metrics = &result.metrics;
    let mut out = String::new();
    let _ = writeln!(out, "WALK-FORWARD BACKTEST RESULTS");
    let _ = writeln!(out, "{}", "=".repeat(60));
    let _ = writeln!(
        out,
        "Period: {} to {} ({:.1} years)",
        result.start_date, result.end_date, metrics.backtest_years
    );
    let _ = writeln!(out, "Initial capital: {:.0}", metrics.initial_capital);
    let _ = writeln!(out, "Final value:     {:.0}", metrics.final_value);
    let _ = writeln!(out);

    let _ = writeln!(out, "PERFORMANCE SUMMARY:");
    let _ = writeln!(out, "{}", "-".repeat(30));
    let _ = writeln!(out, "Total return:      {:.2}%", metrics.total_return_pct);
    let _ = writeln!(
        out,
        "Annualized return: {:.2}%",
        metrics.annualized_return_pct
    );
    let _ = writeln!(out, "Max drawdown:      {:.2}%", metrics.max_drawdown_pct);
    let _ = writeln!(out, "Sharpe ratio:      {:.2}", metrics.sharpe_ratio);
    let _ = writeln!(out);

    let _ = writeln!(out, "TRADING STATISTICS:");
    let _ = writeln!(out, "{}", "-".repeat(30));
    let _ = writeln!(out, "Total trades:   {}", metrics.total_trades);
    let _ = writeln!(out, "Winning trades: {}", metrics.winning_trades);
    let _ = writeln!(out, "Losing trades:  {}", metrics.losing_trades);
    let _ = writeln!(out, "Win rate:       {:.1}%", metrics.win_rate_pct);
    let _ = writeln!(out, "Average win:    {:.2}%", metrics.avg_win_pct);
    let _ = writeln!(out, "Average loss:   {:.2}%", metrics.avg_loss_pct);
    let _ = writeln!(out, "Avg holding:    {:.1} days", metrics.avg_holding_days);
    if metrics.profit_factor.is_infinite() {
        let _ = writeln!(out, "Profit factor:  inf");
    } else {
        let _ = writeln!(out, "Profit factor:  {:.2}", metrics.profit_factor);
    }
    let _ = writeln!(
        out,
        "Max consecutive losses: {}",
        metrics.max_consecutive_losses
    );

    let mut best: Vec<&crate::models::Trade> = result.trades.iter().collect();
    best.sort_by(|a, b| {
        b.pnl_pct
            .partial_cmp(&a.pnl_pct)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    if !best.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "TOP WINNING TRADES:");
        let _ = writeln!(out, "{}", "-".repeat(30));
        for (rank, trade) in best.iter().take(TOP_TRADES).enumerate() {
            let _ = writeln!(
                out,
                "{}. {}: {:.2}% ({} days, {})",
                rank + 1,
                trade.symbol,
                trade.pnl_pct,
                trade.holding_days,
                trade.exit_reason.as_str()
            );
        }
    }

    if !result.open_positions.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "OPEN POSITIONS AT END:");
        let _ = writeln!(out, "{}", "-".repeat(30));
        for position in &result.open_positions {
            let _ = writeln!(
                out,
                "{}: {} shares at {:.2} since {}",
                position.symbol, position.shares, position.entry_price, position.entry_date
            );
        }
    }
    out
}
