use crate::models::{Bar, TrendCriteria, TrendResult, TrendSnapshot};

/// Bars required before the template can be evaluated at all.
pub const MIN_TREND_BARS: usize = 200;
/// Bars required for the SMA-200 slope check (21-bar lookback on top of 200).
const SMA_200_SLOPE_BARS: usize = 220;
const SMA_200_SLOPE_LOOKBACK: usize = 21;

/// Evaluate the eight-criterion stage-2 trend template on the latest bar.
///
/// Fewer than 200 bars yields a no-pass result with no criteria rather than
/// an error; the caller treats thin history as "not qualified". The SMA-200
/// slope criterion compares against the value 21 bars back and is forced
/// false below 220 bars.
pub fn evaluate_trend_template(symbol: &str, bars: &[Bar]) -> TrendResult {
    if bars.len() < MIN_TREND_BARS {
        return TrendResult::insufficient_history(symbol);
    }

    let latest = &bars[bars.len() - 1];
    let close = latest.close;

    let sma_200_trending_up = if bars.len() >= SMA_200_SLOPE_BARS {
        let past = &bars[bars.len() - SMA_200_SLOPE_LOOKBACK];
        latest.sma_200 > past.sma_200
    } else {
        false
    };

    let criteria = TrendCriteria {
        price_above_sma_150: close > latest.sma_150,
        price_above_sma_200: close > latest.sma_200,
        sma_150_above_200: latest.sma_150 > latest.sma_200,
        sma_200_trending_up,
        sma_50_above_150_200: latest.sma_50 > latest.sma_150 && latest.sma_50 > latest.sma_200,
        price_above_sma_50: close > latest.sma_50,
        above_52w_low_30pct: latest.pct_from_52w_low >= 30.0,
        near_52w_high: latest.pct_from_52w_high <= 25.0,
        sufficient_volume: latest.volume as f64 >= latest.volume_sma_50 * 0.5,
        not_penny_stock: close > 100.0,
    };

    TrendResult {
        symbol: symbol.to_string(),
        passes_all: criteria.passes_all(),
        criteria_passed: criteria.passed_count(),
        latest: Some(TrendSnapshot {
            date: latest.date,
            close,
            volume: latest.volume,
            sma_50: latest.sma_50,
            sma_150: latest.sma_150,
            sma_200: latest.sma_200,
            pct_from_52w_high: latest.pct_from_52w_high,
            pct_from_52w_low: latest.pct_from_52w_low,
            rs: latest.rs,
            atr: latest.atr,
        }),
        criteria: Some(criteria),
    }
}
