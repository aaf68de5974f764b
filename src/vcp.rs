use crate::models::{Bar, VcpQuality, VcpResult};

/// Trailing analysis window in bars.
const VCP_WINDOW: usize = 100;
/// Rolling-mean length applied to ATR before looking for troughs.
const ATR_SMOOTHING: usize = 20;
/// Lookback for the breakout pivot high.
const BREAKOUT_LOOKBACK: usize = 20;

/// Detect a volatility-contraction pattern over the trailing window.
///
/// The raw ATR series is smoothed with a 20-bar rolling mean and each strict
/// local minimum of the smoothed series counts as one contraction. A pattern
/// requires at least `min_contractions` of them with the most recent
/// `min_contractions` strictly decreasing (each pullback tighter than the
/// last). The breakout flag is computed independently of the pattern: close
/// within 2% of the trailing 20-bar high on at least 120% of average volume.
/// Fewer than 100 bars is reported as no pattern.
pub fn detect_vcp(symbol: &str, bars: &[Bar], min_contractions: usize) -> VcpResult {
    if bars.len() < VCP_WINDOW {
        return VcpResult::insufficient_history(symbol);
    }

    let window = &bars[bars.len() - VCP_WINDOW..];
    let smoothed = rolling_mean_atr(window, ATR_SMOOTHING);

    let mut contractions = Vec::new();
    for i in 1..smoothed.len().saturating_sub(1) {
        if smoothed[i] < smoothed[i - 1] && smoothed[i] < smoothed[i + 1] {
            contractions.push(smoothed[i]);
        }
    }

    let tightening = contractions.len() >= min_contractions
        && min_contractions >= 1
        && contractions[contractions.len() - min_contractions..]
            .windows(2)
            .all(|pair| pair[1] < pair[0]);

    let quality = if !tightening {
        VcpQuality::None
    } else if contractions.len() >= 3 {
        VcpQuality::Good
    } else {
        VcpQuality::Fair
    };

    let latest = &window[window.len() - 1];
    let pivot_high = window[window.len().saturating_sub(BREAKOUT_LOOKBACK)..]
        .iter()
        .map(|bar| bar.high)
        .fold(f64::NEG_INFINITY, f64::max);
    let breakout_candidate = latest.close >= pivot_high * 0.98
        && latest.volume as f64 >= latest.volume_sma_50 * 1.2;

    VcpResult {
        symbol: symbol.to_string(),
        has_pattern: tightening,
        contractions_found: contractions.len(),
        quality,
        breakout_candidate,
        current_atr: latest.atr,
        trailing_avg_atr: smoothed.last().copied().unwrap_or(0.0),
    }
}

fn rolling_mean_atr(bars: &[Bar], length: usize) -> Vec<f64> {
    if bars.len() < length {
        return Vec::new();
    }
    let mut means = Vec::with_capacity(bars.len() - length + 1);
    let mut sum: f64 = bars[..length].iter().map(|bar| bar.atr).sum();
    means.push(sum / length as f64);
    for i in length..bars.len() {
        sum += bars[i].atr - bars[i - length].atr;
        means.push(sum / length as f64);
    }
    means
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn bar(offset: i64, atr: f64) -> Bar {
        Bar {
            date: NaiveDate::from_ymd_opt(2023, 6, 1).unwrap() + chrono::Duration::days(offset),
            open: 100.0,
            high: 102.0,
            low: 98.0,
            close: 100.0,
            volume: 1_000_000,
            sma_10: 100.0,
            sma_50: 100.0,
            sma_150: 100.0,
            sma_200: 100.0,
            volume_sma_50: 1_000_000.0,
            pct_from_52w_high: 5.0,
            pct_from_52w_low: 40.0,
            atr,
            rs: 1.0,
        }
    }

    fn series(atr: impl Fn(usize) -> f64) -> Vec<Bar> {
        (0..100).map(|j| bar(j as i64, atr(j))).collect()
    }

    // Two volatility troughs, the second deeper than the first.
    fn tightening_atr(j: usize) -> f64 {
        let j = j as f64;
        if j <= 30.0 {
            4.0 - 0.1 * j
        } else if j <= 50.0 {
            1.0 + 0.05 * (j - 30.0)
        } else if j <= 80.0 {
            2.0 - 0.05 * (j - 50.0)
        } else {
            0.5 + 0.06 * (j - 80.0)
        }
    }

    #[test]
    fn detects_two_tightening_contractions() {
        let bars = series(tightening_atr);
        let result = detect_vcp("AAA", &bars, 2);

        assert!(result.has_pattern);
        assert_eq!(result.contractions_found, 2);
        assert_eq!(result.quality, VcpQuality::Fair);
        assert!((result.trailing_avg_atr - 1.07).abs() < 1e-9);
    }

    #[test]
    fn rejects_widening_contractions() {
        // Same shape but the second trough is shallower than the first.
        let bars = series(|j| {
            let j = j as f64;
            if j <= 30.0 {
                4.0 - 0.1 * j
            } else if j <= 50.0 {
                1.0 + 0.05 * (j - 30.0)
            } else if j <= 80.0 {
                2.0 - 0.01 * (j - 50.0)
            } else {
                1.7 + 0.06 * (j - 80.0)
            }
        });
        let result = detect_vcp("AAA", &bars, 2);

        assert!(!result.has_pattern);
        assert_eq!(result.contractions_found, 2);
        assert_eq!(result.quality, VcpQuality::None);
    }

    #[test]
    fn three_contractions_rate_good() {
        let bars = series(|j| {
            let j = j as f64;
            if j <= 12.0 {
                6.0 - 0.3 * j
            } else if j <= 30.0 {
                2.4 + 0.25 * (j - 12.0)
            } else if j <= 45.0 {
                6.9 - 0.35 * (j - 30.0)
            } else if j <= 62.0 {
                1.65 + 0.3 * (j - 45.0)
            } else if j <= 80.0 {
                6.75 - 0.33 * (j - 62.0)
            } else {
                0.81 + 0.2 * (j - 80.0)
            }
        });
        let result = detect_vcp("AAA", &bars, 2);

        assert!(result.has_pattern);
        assert_eq!(result.contractions_found, 3);
        assert_eq!(result.quality, VcpQuality::Good);
    }

    #[test]
    fn breakout_flag_independent_of_pattern() {
        let mut bars = series(|_| 2.0); // flat ATR, no contractions
        let last = bars.last_mut().unwrap();
        last.close = 101.0; // within 2% of the 102.0 pivot high
        last.volume = 1_300_000;

        let result = detect_vcp("AAA", &bars, 2);
        assert!(!result.has_pattern);
        assert!(result.breakout_candidate);
    }

    #[test]
    fn weak_volume_blocks_breakout() {
        let mut bars = series(|_| 2.0);
        let last = bars.last_mut().unwrap();
        last.close = 101.0;
        last.volume = 1_100_000; // below 120% of average

        let result = detect_vcp("AAA", &bars, 2);
        assert!(!result.breakout_candidate);
    }

    #[test]
    fn short_history_is_no_pattern() {
        let bars: Vec<Bar> = (0..15).map(|j| bar(j as i64, 2.0)).collect();
        let result = detect_vcp("AAA", &bars, 2);

        assert!(!result.has_pattern);
        assert_eq!(result.quality, VcpQuality::None);
        assert_eq!(result.contractions_found, 0);
    }
}
