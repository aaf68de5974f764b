use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use std::collections::HashMap;

/// Policy for ordering entry candidates each day. The walk-forward loop
/// takes at most one new position per day, so this ordering decides which
/// qualifying symbol wins when several fire at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryOrdering {
    /// Whatever order the caller supplied the universe in.
    UniverseOrder,
    /// Alphabetical by symbol. Deterministic regardless of input order.
    SymbolName,
    /// Strongest signal first, ties broken by symbol name.
    SignalStrength,
}

impl EntryOrdering {
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "universe" | "universe_order" => Ok(Self::UniverseOrder),
            "symbol" | "symbol_name" => Ok(Self::SymbolName),
            "strength" | "signal_strength" => Ok(Self::SignalStrength),
            other => Err(anyhow!(
                "entry ordering must be universe, symbol or strength (value: {})",
                other
            )),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::UniverseOrder => "universe order",
            Self::SymbolName => "symbol name",
            Self::SignalStrength => "signal strength",
        }
    }
}

/// The subset of configuration the signal generator needs.
#[derive(Debug, Clone)]
pub struct SignalConfig {
    /// Fraction of capital risked per trade (default 1%).
    pub risk_per_trade: f64,
    /// Cap on the suggested position, as a fraction of portfolio.
    pub max_position_size: f64,
    /// Initial stop distance below entry (default 7%).
    pub stop_loss_ratio: f64,
    /// Minimum count of tightening volatility troughs for a VCP.
    pub min_contractions: usize,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            risk_per_trade: 0.01,
            max_position_size: 0.05,
            stop_loss_ratio: 0.07,
            min_contractions: 2,
        }
    }
}

/// Full configuration for one simulation run. Passed explicitly into the
/// engine and signal generator at construction so every run is independently
/// configurable and reproducible.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub initial_capital: f64,
    pub max_positions: usize,
    pub risk_per_trade: f64,
    pub max_position_size: f64,
    /// Fraction of cash never committed to a single entry (default 5%).
    pub cash_reserve_ratio: f64,
    /// Entries stop once cash falls to this fraction of initial capital.
    pub min_cash_ratio: f64,
    pub stop_loss_ratio: f64,
    pub min_contractions: usize,
    /// Trailing simulation window in years, anchored at `as_of`.
    pub lookback_years: u32,
    /// Trailing day count used when the year window matches no dates.
    pub fallback_trading_days: usize,
    pub entry_ordering: EntryOrdering,
    /// Anchor for the trailing window; defaults to today when `None`.
    pub as_of: Option<NaiveDate>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            initial_capital: 1_000_000.0,
            max_positions: 10,
            risk_per_trade: 0.01,
            max_position_size: 0.05,
            cash_reserve_ratio: 0.05,
            min_cash_ratio: 0.10,
            stop_loss_ratio: 0.07,
            min_contractions: 2,
            lookback_years: 10,
            fallback_trading_days: 2_520,
            entry_ordering: EntryOrdering::SymbolName,
            as_of: None,
        }
    }
}

impl EngineConfig {
    /// Create a config from a flat parameter map, falling back to defaults
    /// for anything missing or non-finite.
    pub fn from_parameters(parameters: &HashMap<String, f64>) -> Self {
        let defaults = Self::default();
        Self {
            initial_capital: get_param(
                parameters,
                "initialCapital",
                defaults.initial_capital,
            ),
            max_positions: get_usize_param(parameters, "maxPositions", defaults.max_positions),
            risk_per_trade: get_param(parameters, "riskPerTrade", defaults.risk_per_trade),
            max_position_size: get_param(
                parameters,
                "maxPositionSize",
                defaults.max_position_size,
            ),
            cash_reserve_ratio: get_param(
                parameters,
                "cashReserveRatio",
                defaults.cash_reserve_ratio,
            ),
            min_cash_ratio: get_param(parameters, "minCashRatio", defaults.min_cash_ratio),
            stop_loss_ratio: get_param(parameters, "stopLossRatio", defaults.stop_loss_ratio),
            min_contractions: get_usize_param(
                parameters,
                "minContractions",
                defaults.min_contractions,
            ),
            lookback_years: get_usize_param(
                parameters,
                "lookbackYears",
                defaults.lookback_years as usize,
            ) as u32,
            fallback_trading_days: get_usize_param(
                parameters,
                "fallbackTradingDays",
                defaults.fallback_trading_days,
            ),
            entry_ordering: defaults.entry_ordering,
            as_of: None,
        }
    }

    pub fn signal_config(&self) -> SignalConfig {
        SignalConfig {
            risk_per_trade: self.risk_per_trade,
            max_position_size: self.max_position_size,
            stop_loss_ratio: self.stop_loss_ratio,
            min_contractions: self.min_contractions,
        }
    }
}

fn get_param(params: &HashMap<String, f64>, key: &str, default: f64) -> f64 {
    match params.get(key) {
        Some(value) if value.is_finite() => *value,
        _ => default,
    }
}

fn get_usize_param(params: &HashMap<String, f64>, key: &str, default: usize) -> usize {
    match params.get(key) {
        Some(value) if value.is_finite() && *value >= 0.0 => value.round() as usize,
        _ => default,
    }
}
