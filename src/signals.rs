use crate::config::SignalConfig;
use crate::models::{Bar, EntrySignal, ExitReason, ExitSignal, Position, SignalClass};
use crate::trend::evaluate_trend_template;
use crate::universe::Universe;
use crate::vcp::detect_vcp;
use chrono::NaiveDate;

/// Composes the trend template and VCP detector into entry decisions, and
/// evaluates the exit rules for open positions. Stateless apart from its
/// configuration.
pub struct SignalGenerator {
    config: SignalConfig,
}

impl SignalGenerator {
    pub fn new(config: SignalConfig) -> Self {
        Self { config }
    }

    /// Entry decision on the latest bar of `bars`.
    ///
    /// Strength accumulates 0..=10: +5 for a full trend-template pass, +3
    /// more for a VCP, +2 more for a breakout. The class follows the same
    /// ladder; a degenerate stop distance forces the signal back to `None`.
    pub fn generate_entry(&self, symbol: &str, bars: &[Bar]) -> EntrySignal {
        let trend = evaluate_trend_template(symbol, bars);
        let vcp = detect_vcp(symbol, bars, self.config.min_contractions);

        let mut strength: u8 = 0;
        let mut class = SignalClass::None;
        if trend.passes_all {
            strength += 5;
            class = SignalClass::Watch;
            if vcp.has_pattern {
                strength += 3;
                class = SignalClass::Buy;
                if vcp.breakout_candidate {
                    strength += 2;
                    class = SignalClass::StrongBuy;
                }
            }
        }

        let entry_price = bars.last().map(|bar| bar.close).unwrap_or(0.0);
        let as_of = bars
            .last()
            .map(|bar| bar.date)
            .unwrap_or_else(|| NaiveDate::from_ymd_opt(1970, 1, 1).unwrap());
        let stop_loss_price = entry_price * (1.0 - self.config.stop_loss_ratio);

        let stop_fraction = if entry_price > 0.0 {
            (entry_price - stop_loss_price) / entry_price
        } else {
            0.0
        };
        let suggested_position_pct = if stop_fraction > 0.0 {
            (self.config.risk_per_trade / stop_fraction * 100.0)
                .min(self.config.max_position_size * 100.0)
        } else {
            class = SignalClass::None;
            0.0
        };

        EntrySignal {
            symbol: symbol.to_string(),
            class,
            strength,
            entry_price,
            stop_loss_price,
            suggested_position_pct,
            trend,
            vcp,
            as_of,
        }
    }

    /// Exit decision for an open position on the current bar. Every rule is
    /// checked and recorded in priority order; the first one is primary.
    /// The two profit targets are mutually exclusive.
    pub fn generate_exit(&self, position: &Position, bar: &Bar) -> ExitSignal {
        let price = bar.close;
        let return_pct = if position.entry_price > 0.0 {
            (price - position.entry_price) / position.entry_price * 100.0
        } else {
            0.0
        };

        let mut reasons = Vec::new();
        if return_pct <= -self.config.stop_loss_ratio * 100.0 {
            reasons.push(ExitReason::StopLoss);
        }
        if (20.0..50.0).contains(&return_pct) {
            reasons.push(ExitReason::TakeProfit20);
        }
        if return_pct >= 50.0 {
            reasons.push(ExitReason::TakeProfit50);
        }
        if price < bar.sma_10 {
            reasons.push(ExitReason::TrailingStop);
        }
        if price < bar.sma_50 {
            reasons.push(ExitReason::Sma50Break);
        }
        if bar.volume as f64 >= bar.volume_sma_50 * 2.0 && price < bar.open {
            reasons.push(ExitReason::VolumeSell);
        }

        ExitSignal {
            symbol: position.symbol.clone(),
            primary_reason: reasons.first().copied(),
            triggered_reasons: reasons,
            current_price: price,
            as_of: bar.date,
        }
    }

    /// Entry evaluation across a whole universe: every symbol with a
    /// non-zero strength, strongest first, ties broken by symbol name.
    pub fn screen_universe(&self, universe: &Universe) -> Vec<EntrySignal> {
        let mut results: Vec<EntrySignal> = universe
            .iter()
            .map(|(symbol, bars)| self.generate_entry(symbol, bars))
            .filter(|signal| signal.strength > 0)
            .collect();
        results.sort_by(|a, b| {
            b.strength
                .cmp(&a.strength)
                .then_with(|| a.symbol.cmp(&b.symbol))
        });
        results
    }
}
