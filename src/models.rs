use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One daily bar with its precomputed indicators. Produced by an external
/// indicator stage; the simulation core never computes raw indicators itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
    pub sma_10: f64,
    pub sma_50: f64,
    pub sma_150: f64,
    pub sma_200: f64,
    pub volume_sma_50: f64,
    pub pct_from_52w_high: f64,
    pub pct_from_52w_low: f64,
    pub atr: f64,
    pub rs: f64,
}

/// The eight gating trend-template criteria plus two non-gating quality flags.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendCriteria {
    pub price_above_sma_150: bool,
    pub price_above_sma_200: bool,
    pub sma_150_above_200: bool,
    pub sma_200_trending_up: bool,
    pub sma_50_above_150_200: bool,
    pub price_above_sma_50: bool,
    pub above_52w_low_30pct: bool,
    pub near_52w_high: bool,
    // Quality flags, reported but never gating.
    pub sufficient_volume: bool,
    pub not_penny_stock: bool,
}

impl TrendCriteria {
    pub fn primary(&self) -> [bool; 8] {
        [
            self.price_above_sma_150,
            self.price_above_sma_200,
            self.sma_150_above_200,
            self.sma_200_trending_up,
            self.sma_50_above_150_200,
            self.price_above_sma_50,
            self.above_52w_low_30pct,
            self.near_52w_high,
        ]
    }

    pub fn passed_count(&self) -> usize {
        self.primary().iter().filter(|flag| **flag).count()
    }

    pub fn passes_all(&self) -> bool {
        self.primary().iter().all(|flag| *flag)
    }
}

/// Key fields of the bar a trend evaluation was made on.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendSnapshot {
    pub date: NaiveDate,
    pub close: f64,
    pub volume: i64,
    pub sma_50: f64,
    pub sma_150: f64,
    pub sma_200: f64,
    pub pct_from_52w_high: f64,
    pub pct_from_52w_low: f64,
    pub rs: f64,
    pub atr: f64,
}

/// Result of one trend-template evaluation. `criteria` and `latest` are
/// `None` when the series is too short to evaluate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendResult {
    pub symbol: String,
    pub criteria: Option<TrendCriteria>,
    pub passes_all: bool,
    pub criteria_passed: usize,
    pub latest: Option<TrendSnapshot>,
}

impl TrendResult {
    pub fn insufficient_history(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            criteria: None,
            passes_all: false,
            criteria_passed: 0,
            latest: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VcpQuality {
    None,
    Fair,
    Good,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VcpResult {
    pub symbol: String,
    pub has_pattern: bool,
    pub contractions_found: usize,
    pub quality: VcpQuality,
    pub breakout_candidate: bool,
    pub current_atr: f64,
    pub trailing_avg_atr: f64,
}

impl VcpResult {
    pub fn insufficient_history(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            has_pattern: false,
            contractions_found: 0,
            quality: VcpQuality::None,
            breakout_candidate: false,
            current_atr: 0.0,
            trailing_avg_atr: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalClass {
    None,
    Watch,
    Buy,
    StrongBuy,
}

impl SignalClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalClass::None => "NONE",
            SignalClass::Watch => "WATCH",
            SignalClass::Buy => "BUY",
            SignalClass::StrongBuy => "STRONG BUY",
        }
    }

    pub fn is_actionable(&self) -> bool {
        matches!(self, SignalClass::Buy | SignalClass::StrongBuy)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntrySignal {
    pub symbol: String,
    pub class: SignalClass,
    /// 0..=10: +5 trend template, +3 VCP pattern, +2 breakout.
    pub strength: u8,
    pub entry_price: f64,
    pub stop_loss_price: f64,
    /// Percent of portfolio that risks `risk_per_trade` of capital given the
    /// stop distance, capped at the maximum position size.
    pub suggested_position_pct: f64,
    pub trend: TrendResult,
    pub vcp: VcpResult,
    pub as_of: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExitReason {
    StopLoss,
    TakeProfit20,
    TakeProfit50,
    TrailingStop,
    Sma50Break,
    VolumeSell,
}

impl ExitReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExitReason::StopLoss => "STOP_LOSS",
            ExitReason::TakeProfit20 => "TAKE_PROFIT_20",
            ExitReason::TakeProfit50 => "TAKE_PROFIT_50",
            ExitReason::TrailingStop => "TRAILING_STOP",
            ExitReason::Sma50Break => "SMA_50_BREAK",
            ExitReason::VolumeSell => "VOLUME_SELL",
        }
    }
}

/// Exit evaluation for one open position on one day. `triggered_reasons`
/// lists every rule that fired, in priority order; `primary_reason` is the
/// first of them, or `None` for HOLD.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExitSignal {
    pub symbol: String,
    pub triggered_reasons: Vec<ExitReason>,
    pub primary_reason: Option<ExitReason>,
    pub current_price: f64,
    pub as_of: NaiveDate,
}

impl ExitSignal {
    pub fn fires(&self) -> bool {
        self.primary_reason.is_some()
    }
}

/// An open position, exclusively owned by the portfolio ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub symbol: String,
    pub entry_date: NaiveDate,
    pub entry_price: f64,
    pub stop_loss_price: f64,
    pub shares: u64,
    pub cost_basis: f64,
    pub signal: EntrySignal,
}

/// A closed trade. Append-only history, immutable once recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trade {
    pub symbol: String,
    pub entry_date: NaiveDate,
    pub exit_date: NaiveDate,
    pub entry_price: f64,
    pub exit_price: f64,
    pub shares: u64,
    pub pnl: f64,
    pub pnl_pct: f64,
    pub exit_reason: ExitReason,
    pub holding_days: i64,
    pub signal: EntrySignal,
}

/// One end-of-day portfolio record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioSnapshot {
    pub date: NaiveDate,
    pub cash: f64,
    pub positions_value: f64,
    pub total_value: f64,
    pub open_positions: usize,
    /// Distance below the running peak, as a fraction of the peak.
    pub drawdown: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceMetrics {
    pub initial_capital: f64,
    pub final_value: f64,
    pub total_return_pct: f64,
    pub annualized_return_pct: f64,
    pub max_drawdown_pct: f64,
    pub sharpe_ratio: f64,
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub win_rate_pct: f64,
    pub avg_win_pct: f64,
    pub avg_loss_pct: f64,
    pub avg_holding_days: f64,
    /// Gross profit over gross loss; `f64::INFINITY` when there are winners
    /// and no losers.
    pub profit_factor: f64,
    pub max_consecutive_losses: usize,
    pub backtest_years: f64,
}

/// Everything a completed walk-forward run exposes to callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationResult {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub initial_capital: f64,
    pub final_value: f64,
    pub metrics: PerformanceMetrics,
    pub snapshots: Vec<PortfolioSnapshot>,
    pub trades: Vec<Trade>,
    pub open_positions: Vec<Position>,
    /// Entry evaluations with strength > 0, in the order they were produced.
    pub entry_signals: Vec<EntrySignal>,
    /// Exit evaluations for open positions, including HOLD days.
    pub exit_signals: Vec<ExitSignal>,
}
