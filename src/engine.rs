use crate::config::{EngineConfig, EntryOrdering};
use crate::ledger::PortfolioLedger;
use crate::models::{Bar, EntrySignal, ExitReason, ExitSignal, SimulationResult};
use crate::performance::PerformanceCalculator;
use crate::signals::SignalGenerator;
use crate::trend::MIN_TREND_BARS;
use crate::universe::Universe;
use chrono::{Months, NaiveDate, Utc};
use log::{info, warn};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("universe contains no symbols")]
    EmptyUniverse,
    #[error("universe contains no dates to simulate")]
    EmptyDateRange,
}

/// Walk-forward simulator. Replays the universe one trading day at a time:
/// refresh per-symbol data, evaluate and apply exits, evaluate entries, then
/// mark the book to market. At most one new position is opened per day.
pub struct SimulationEngine {
    config: EngineConfig,
    signals: SignalGenerator,
}

impl SimulationEngine {
    pub fn new(config: EngineConfig) -> Self {
        let signals = SignalGenerator::new(config.signal_config());
        Self { config, signals }
    }

    pub fn run(&self, universe: &Universe) -> Result<SimulationResult, SimulationError> {
        if universe.is_empty() {
            return Err(SimulationError::EmptyUniverse);
        }

        let as_of = self.config.as_of.unwrap_or_else(|| Utc::now().date_naive());
        let dates = select_dates(
            &universe.all_dates(),
            as_of,
            self.config.lookback_years,
            self.config.fallback_trading_days,
        );
        let (start_date, end_date) = match (dates.first(), dates.last()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => return Err(SimulationError::EmptyDateRange),
        };
        info!(
            "Simulating {} symbols over {} trading days ({} to {}), entry ordering: {}",
            universe.len(),
            dates.len(),
            start_date,
            end_date,
            self.config.entry_ordering.label()
        );

        let series: Vec<(&str, &[Bar])> = universe.iter().collect();
        let mut cursors = vec![0usize; series.len()];
        let mut ledger = PortfolioLedger::new(&self.config);
        let mut entry_signals: Vec<EntrySignal> = Vec::new();
        let mut exit_signals: Vec<ExitSignal> = Vec::new();
        let min_cash = self.config.min_cash_ratio * self.config.initial_capital;

        for (day_index, date) in dates.iter().copied().enumerate() {
            if day_index > 0 && day_index % 500 == 0 {
                info!(
                    "Day {}/{}: portfolio value {:.2}",
                    day_index,
                    dates.len(),
                    ledger.total_value()
                );
            }

            // MARK-DATA: advance each symbol to its last bar on or before today.
            let mut prices: HashMap<String, f64> = HashMap::new();
            for (idx, (symbol, bars)) in series.iter().enumerate() {
                while cursors[idx] < bars.len() && bars[cursors[idx]].date <= date {
                    cursors[idx] += 1;
                }
                if cursors[idx] > 0 && bars[cursors[idx] - 1].date == date {
                    prices.insert(symbol.to_string(), bars[cursors[idx] - 1].close);
                }
            }

            // EVALUATE-EXITS on every open position with data today. A close
            // at or below the stored stop is a stop-out regardless of the
            // rule-based exits.
            let mut to_close: Vec<(String, f64, ExitReason)> = Vec::new();
            for position in ledger.positions() {
                let Some(idx) = series
                    .iter()
                    .position(|(symbol, _)| *symbol == position.symbol)
                else {
                    continue;
                };
                let bars = series[idx].1;
                if cursors[idx] == 0 || bars[cursors[idx] - 1].date != date {
                    continue;
                }
                let bar = &bars[cursors[idx] - 1];

                let exit = if bar.close <= position.stop_loss_price {
                    ExitSignal {
                        symbol: position.symbol.clone(),
                        triggered_reasons: vec![ExitReason::StopLoss],
                        primary_reason: Some(ExitReason::StopLoss),
                        current_price: bar.close,
                        as_of: date,
                    }
                } else {
                    self.signals.generate_exit(position, bar)
                };
                if let Some(reason) = exit.primary_reason {
                    to_close.push((position.symbol.clone(), exit.current_price, reason));
                }
                exit_signals.push(exit);
            }

            // APPLY-EXITS
            for (symbol, price, reason) in to_close {
                if let Err(err) = ledger.close(&symbol, date, price, reason) {
                    warn!("Skipping exit for {} on {}: {}", symbol, date, err);
                }
            }

            // EVALUATE-ENTRIES: gated by position count and a cash floor.
            if ledger.open_count() < self.config.max_positions && ledger.cash() > min_cash {
                let mut candidates: Vec<EntrySignal> = Vec::new();
                for (idx, (symbol, bars)) in series.iter().enumerate() {
                    if ledger.has_position(symbol) {
                        continue;
                    }
                    if cursors[idx] < MIN_TREND_BARS || bars[cursors[idx] - 1].date != date {
                        continue;
                    }
                    let signal = self.signals.generate_entry(symbol, &bars[..cursors[idx]]);
                    if signal.strength > 0 {
                        entry_signals.push(signal.clone());
                    }
                    if signal.class.is_actionable() {
                        candidates.push(signal);
                    }
                }

                order_candidates(&mut candidates, self.config.entry_ordering);
                for candidate in candidates {
                    match ledger.open(&candidate, date) {
                        Ok(position) => {
                            info!(
                                "Opened {} on {}: {} shares at {:.2}",
                                position.symbol, date, position.shares, position.entry_price
                            );
                            break;
                        }
                        Err(err) => {
                            warn!("Entry for {} on {} not taken: {}", candidate.symbol, date, err);
                        }
                    }
                }
            }

            // MARK-TO-MARKET
            ledger.mark_to_market(date, &prices);
        }

        let metrics = PerformanceCalculator::calculate(
            ledger.trades(),
            ledger.snapshots(),
            ledger.initial_capital(),
            ledger.max_drawdown() * 100.0,
        );
        let final_value = ledger.total_value();
        info!(
            "Simulation complete: final value {:.2}, {} trades",
            final_value,
            ledger.trades().len()
        );

        let (trades, snapshots, open_positions) = ledger.into_records();
        Ok(SimulationResult {
            start_date,
            end_date,
            initial_capital: self.config.initial_capital,
            final_value,
            metrics,
            snapshots,
            trades,
            open_positions,
            entry_signals,
            exit_signals,
        })
    }
}

/// Restrict the universe's dates to the trailing lookback window ending at
/// `as_of`. An empty restriction falls back to the most recent
/// `fallback_days` dates of the full set.
fn select_dates(
    all_dates: &[NaiveDate],
    as_of: NaiveDate,
    lookback_years: u32,
    fallback_days: usize,
) -> Vec<NaiveDate> {
    let window_start = as_of
        .checked_sub_months(Months::new(lookback_years * 12))
        .unwrap_or(NaiveDate::MIN);
    let restricted: Vec<NaiveDate> = all_dates
        .iter()
        .copied()
        .filter(|date| *date > window_start && *date <= as_of)
        .collect();
    if !restricted.is_empty() {
        return restricted;
    }
    warn!(
        "No dates within {} years of {}; falling back to the {} most recent",
        lookback_years, as_of, fallback_days
    );
    all_dates[all_dates.len().saturating_sub(fallback_days)..].to_vec()
}

fn order_candidates(candidates: &mut [EntrySignal], ordering: EntryOrdering) {
    match ordering {
        EntryOrdering::UniverseOrder => {}
        EntryOrdering::SymbolName => {
            candidates.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        }
        EntryOrdering::SignalStrength => {
            candidates.sort_by(|a, b| {
                b.strength
                    .cmp(&a.strength)
                    .then_with(|| a.symbol.cmp(&b.symbol))
            });
        }
    }
}
