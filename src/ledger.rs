use crate::config::EngineConfig;
use crate::models::{EntrySignal, ExitReason, PortfolioSnapshot, Position, Trade};
use crate::trading_rules::{size_position, PositionSizingOutcome, PositionSizingParams};
use chrono::NaiveDate;
use log::warn;
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("position already open for {0}")]
    PositionExists(String),
    #[error("no open position for {0}")]
    NoPosition(String),
    #[error("sizing produced zero shares for {0}")]
    ZeroSize(String),
    #[error("insufficient cash for {symbol}: need {required:.2}, have {available:.2}")]
    InsufficientCash {
        symbol: String,
        required: f64,
        available: f64,
    },
}

/// Cash, open positions, realized trades and the daily snapshot series.
///
/// All mutation goes through `open`, `close` and `mark_to_market`, so the
/// cash-plus-positions identity and the incremental peak/drawdown tracking
/// cannot drift. Positions exit in full only.
pub struct PortfolioLedger {
    initial_capital: f64,
    cash: f64,
    risk_per_trade: f64,
    max_position_size: f64,
    cash_reserve_ratio: f64,
    positions: BTreeMap<String, Position>,
    trades: Vec<Trade>,
    snapshots: Vec<PortfolioSnapshot>,
    peak_value: f64,
    max_drawdown: f64,
}

impl PortfolioLedger {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            initial_capital: config.initial_capital,
            cash: config.initial_capital,
            risk_per_trade: config.risk_per_trade,
            max_position_size: config.max_position_size,
            cash_reserve_ratio: config.cash_reserve_ratio,
            positions: BTreeMap::new(),
            trades: Vec::new(),
            snapshots: Vec::new(),
            peak_value: config.initial_capital,
            max_drawdown: 0.0,
        }
    }

    /// Open a position from an entry signal, sizing it against current cash.
    pub fn open(&mut self, signal: &EntrySignal, date: NaiveDate) -> Result<&Position, LedgerError> {
        if self.positions.contains_key(&signal.symbol) {
            return Err(LedgerError::PositionExists(signal.symbol.clone()));
        }

        let outcome = size_position(PositionSizingParams {
            entry_price: signal.entry_price,
            stop_loss_price: signal.stop_loss_price,
            available_cash: self.cash,
            risk_per_trade: self.risk_per_trade,
            max_position_size: self.max_position_size,
            cash_reserve_ratio: self.cash_reserve_ratio,
        });
        let (shares, cost) = match outcome {
            PositionSizingOutcome::Sized { shares, cost } => (shares, cost),
            PositionSizingOutcome::NoSize => {
                return Err(LedgerError::ZeroSize(signal.symbol.clone()))
            }
        };
        if cost > self.cash {
            return Err(LedgerError::InsufficientCash {
                symbol: signal.symbol.clone(),
                required: cost,
                available: self.cash,
            });
        }

        self.cash -= cost;
        let position = Position {
            symbol: signal.symbol.clone(),
            entry_date: date,
            entry_price: signal.entry_price,
            stop_loss_price: signal.stop_loss_price,
            shares,
            cost_basis: cost,
            signal: signal.clone(),
        };
        Ok(self
            .positions
            .entry(signal.symbol.clone())
            .or_insert(position))
    }

    /// Close the full position, returning the realized trade.
    pub fn close(
        &mut self,
        symbol: &str,
        exit_date: NaiveDate,
        exit_price: f64,
        reason: ExitReason,
    ) -> Result<Trade, LedgerError> {
        let position = self
            .positions
            .remove(symbol)
            .ok_or_else(|| LedgerError::NoPosition(symbol.to_string()))?;

        let proceeds = position.shares as f64 * exit_price;
        self.cash += proceeds;

        let pnl = proceeds - position.cost_basis;
        let pnl_pct = if position.cost_basis > 0.0 {
            pnl / position.cost_basis * 100.0
        } else {
            0.0
        };
        let raw_days = (exit_date - position.entry_date).num_days();
        let holding_days = if raw_days < 0 {
            warn!(
                "Exit date {} precedes entry date {} for {}; clamping holding period to 0",
                exit_date, position.entry_date, symbol
            );
            0
        } else {
            raw_days
        };

        let trade = Trade {
            symbol: position.symbol,
            entry_date: position.entry_date,
            exit_date,
            entry_price: position.entry_price,
            exit_price,
            shares: position.shares,
            pnl,
            pnl_pct,
            exit_reason: reason,
            holding_days,
            signal: position.signal,
        };
        self.trades.push(trade.clone());
        Ok(trade)
    }

    /// Value the book at today's prices and append the daily snapshot.
    /// Symbols without a price today are carried at their entry price.
    pub fn mark_to_market(
        &mut self,
        date: NaiveDate,
        prices: &HashMap<String, f64>,
    ) -> PortfolioSnapshot {
        let positions_value: f64 = self
            .positions
            .values()
            .map(|position| {
                let price = prices
                    .get(&position.symbol)
                    .copied()
                    .unwrap_or(position.entry_price);
                position.shares as f64 * price
            })
            .sum();
        let total_value = self.cash + positions_value;

        if total_value > self.peak_value {
            self.peak_value = total_value;
        }
        let drawdown = if self.peak_value > 0.0 {
            (self.peak_value - total_value) / self.peak_value
        } else {
            0.0
        };
        if drawdown > self.max_drawdown {
            self.max_drawdown = drawdown;
        }

        let snapshot = PortfolioSnapshot {
            date,
            cash: self.cash,
            positions_value,
            total_value,
            open_positions: self.positions.len(),
            drawdown,
        };
        self.snapshots.push(snapshot.clone());
        snapshot
    }

    pub fn initial_capital(&self) -> f64 {
        self.initial_capital
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn has_position(&self, symbol: &str) -> bool {
        self.positions.contains_key(symbol)
    }

    pub fn open_count(&self) -> usize {
        self.positions.len()
    }

    pub fn positions(&self) -> impl Iterator<Item = &Position> {
        self.positions.values()
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn snapshots(&self) -> &[PortfolioSnapshot] {
        &self.snapshots
    }

    /// Worst observed drawdown so far, as a fraction of the running peak.
    pub fn max_drawdown(&self) -> f64 {
        self.max_drawdown
    }

    /// Total value as of the latest snapshot, or cash plus cost basis before
    /// the first mark.
    pub fn total_value(&self) -> f64 {
        self.snapshots
            .last()
            .map(|snapshot| snapshot.total_value)
            .unwrap_or_else(|| {
                self.cash
                    + self
                        .positions
                        .values()
                        .map(|position| position.cost_basis)
                        .sum::<f64>()
            })
    }

    pub fn into_records(self) -> (Vec<Trade>, Vec<PortfolioSnapshot>, Vec<Position>) {
        (
            self.trades,
            self.snapshots,
            self.positions.into_values().collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SignalClass, TrendResult, VcpResult};

    fn day(offset: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 2).unwrap() + chrono::Duration::days(offset)
    }

    fn signal(symbol: &str, entry: f64) -> EntrySignal {
        EntrySignal {
            symbol: symbol.to_string(),
            class: SignalClass::Buy,
            strength: 8,
            entry_price: entry,
            stop_loss_price: entry * 0.93,
            suggested_position_pct: 5.0,
            trend: TrendResult::insufficient_history(symbol),
            vcp: VcpResult::insufficient_history(symbol),
            as_of: day(0),
        }
    }

    fn ledger() -> PortfolioLedger {
        PortfolioLedger::new(&EngineConfig::default())
    }

    #[test]
    fn open_debits_cash_by_cost_basis() {
        let mut ledger = ledger();
        ledger.open(&signal("AAA", 100.0), day(0)).unwrap();

        // 5% cap on 1,000,000 at 100/share.
        assert_eq!(ledger.open_count(), 1);
        assert!((ledger.cash() - 950_000.0).abs() < 1e-6);
    }

    #[test]
    fn duplicate_open_is_rejected() {
        let mut ledger = ledger();
        ledger.open(&signal("AAA", 100.0), day(0)).unwrap();
        assert!(matches!(
            ledger.open(&signal("AAA", 100.0), day(1)),
            Err(LedgerError::PositionExists(_))
        ));
    }

    #[test]
    fn round_trip_realizes_pnl_into_cash() {
        let mut ledger = ledger();
        ledger.open(&signal("AAA", 100.0), day(0)).unwrap();
        let trade = ledger
            .close("AAA", day(31), 110.0, ExitReason::TakeProfit20)
            .unwrap();

        assert_eq!(trade.shares, 500);
        assert!((trade.pnl - 5_000.0).abs() < 1e-6);
        assert!((trade.pnl_pct - 10.0).abs() < 1e-9);
        assert_eq!(trade.holding_days, 31);
        // Cash equals initial capital plus realized pnl exactly.
        assert!((ledger.cash() - 1_005_000.0).abs() < 1e-6);
        assert_eq!(ledger.open_count(), 0);
    }

    #[test]
    fn flat_round_trip_restores_cash() {
        let mut ledger = ledger();
        ledger.open(&signal("AAA", 100.0), day(0)).unwrap();
        let trade = ledger
            .close("AAA", day(0), 100.0, ExitReason::Sma50Break)
            .unwrap();

        assert!((trade.pnl - 0.0).abs() < 1e-9);
        assert!((ledger.cash() - 1_000_000.0).abs() < 1e-9);
    }

    #[test]
    fn close_without_position_is_rejected() {
        let mut ledger = ledger();
        assert!(matches!(
            ledger.close("AAA", day(0), 100.0, ExitReason::StopLoss),
            Err(LedgerError::NoPosition(_))
        ));
    }

    #[test]
    fn inverted_dates_clamp_holding_days() {
        let mut ledger = ledger();
        ledger.open(&signal("AAA", 100.0), day(10)).unwrap();
        let trade = ledger
            .close("AAA", day(5), 100.0, ExitReason::StopLoss)
            .unwrap();
        assert_eq!(trade.holding_days, 0);
    }

    #[test]
    fn drawdown_tracks_peak_incrementally() {
        let mut ledger = ledger();
        ledger.open(&signal("AAA", 100.0), day(0)).unwrap();

        let mut prices = HashMap::new();
        prices.insert("AAA".to_string(), 120.0);
        let up = ledger.mark_to_market(day(1), &prices);
        assert!((up.total_value - 1_010_000.0).abs() < 1e-6);
        assert!((up.drawdown - 0.0).abs() < 1e-9);

        prices.insert("AAA".to_string(), 90.0);
        let down = ledger.mark_to_market(day(2), &prices);
        assert!(down.drawdown > 0.0);
        // Peak is 1,010,000; value is 995,000.
        assert!((down.drawdown - 15_000.0 / 1_010_000.0).abs() < 1e-12);
        assert!((ledger.max_drawdown() - down.drawdown).abs() < 1e-15);
    }

    #[test]
    fn missing_price_marks_at_entry() {
        let mut ledger = ledger();
        ledger.open(&signal("AAA", 100.0), day(0)).unwrap();
        let snapshot = ledger.mark_to_market(day(1), &HashMap::new());
        assert!((snapshot.total_value - 1_000_000.0).abs() < 1e-6);
    }
}
