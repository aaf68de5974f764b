pub const PRICE_EPSILON: f64 = 1e-6;

pub struct PositionSizingParams {
    pub entry_price: f64,
    pub stop_loss_price: f64,
    pub available_cash: f64,
    /// Fraction of available cash risked if the stop is hit.
    pub risk_per_trade: f64,
    /// Cap on position cost as a fraction of available cash.
    pub max_position_size: f64,
    /// Fraction of cash never committed to the entry.
    pub cash_reserve_ratio: f64,
}

#[derive(Debug, PartialEq)]
pub enum PositionSizingOutcome {
    Sized { shares: u64, cost: f64 },
    /// Degenerate stop or a size that rounds to zero shares.
    NoSize,
}

/// Risk-based position sizing: the share count that loses `risk_per_trade`
/// of cash at the stop, capped by `max_position_size` of cash and by the
/// cash reserve. A stop at or above entry carries no defined risk and
/// yields no position.
pub fn size_position(params: PositionSizingParams) -> PositionSizingOutcome {
    let PositionSizingParams {
        entry_price,
        stop_loss_price,
        available_cash,
        risk_per_trade,
        max_position_size,
        cash_reserve_ratio,
    } = params;

    if entry_price <= 0.0 || !entry_price.is_finite() || !available_cash.is_finite() {
        return PositionSizingOutcome::NoSize;
    }
    let risk_per_share = entry_price - stop_loss_price;
    if risk_per_share <= PRICE_EPSILON {
        return PositionSizingOutcome::NoSize;
    }

    let cash = available_cash.max(0.0);
    let risk_shares = cash * risk_per_trade.max(0.0) / risk_per_share;
    let cap_shares = cash * max_position_size.max(0.0) / entry_price;
    let mut shares = risk_shares.min(cap_shares).floor().max(0.0) as u64;

    let spendable = cash * (1.0 - cash_reserve_ratio.clamp(0.0, 1.0));
    while shares > 0 && shares as f64 * entry_price > spendable + PRICE_EPSILON {
        shares -= 1;
    }

    if shares == 0 {
        return PositionSizingOutcome::NoSize;
    }

    PositionSizingOutcome::Sized {
        shares,
        cost: shares as f64 * entry_price,
    }
}
