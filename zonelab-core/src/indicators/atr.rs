//! Average True Range (ATR).
//!
//! True Range: max(high-low, |high-prev_close|, |low-prev_close|).
//! Smoothing is parameterized: Wilder (EMA with alpha = 1/period) or a
//! simple moving average over `period`.

use serde::{Deserialize, Serialize};

use crate::domain::Candle;

/// Which smoothing the ATR applies to the true-range series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AtrMethod {
    Wilder,
    Simple,
}

/// Compute the True Range series.
///
/// TR[0] has no previous close and is marked NaN so smoothing seeds from
/// TR[1], consistent with a lookback of `period`.
pub fn true_range(candles: &[Candle]) -> Vec<f64> {
    let n = candles.len();
    let mut tr = vec![f64::NAN; n];

    for i in 1..n {
        let h = candles[i].high;
        let l = candles[i].low;
        let pc = candles[i - 1].close;
        tr[i] = (h - l).max((h - pc).abs()).max((l - pc).abs());
    }

    tr
}

/// Apply Wilder smoothing to a series. Alpha = 1/period.
/// Seed: mean of the first `period` consecutive non-NaN values.
pub fn wilder_smooth(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];

    if period == 0 || n < period {
        return result;
    }

    // First index with `period` consecutive non-NaN values
    let seed_start = match values
        .windows(period)
        .position(|w| w.iter().all(|v| !v.is_nan()))
    {
        Some(s) => s,
        None => return result,
    };
    let seed_end = seed_start + period;

    let seed: f64 = values[seed_start..seed_end].iter().sum::<f64>() / period as f64;
    result[seed_end - 1] = seed;

    let alpha = 1.0 / period as f64;
    let mut prev = seed;

    for i in seed_end..n {
        if values[i].is_nan() {
            return result;
        }
        let smoothed = alpha * values[i] + (1.0 - alpha) * prev;
        result[i] = smoothed;
        prev = smoothed;
    }

    result
}

/// Rolling simple moving average. NaN until `period` non-NaN values have
/// accumulated; any NaN inside the window yields NaN for that index.
pub fn sma(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if period == 0 {
        return result;
    }

    for i in (period - 1)..n {
        let window = &values[i + 1 - period..=i];
        if window.iter().any(|v| v.is_nan()) {
            continue;
        }
        result[i] = window.iter().sum::<f64>() / period as f64;
    }

    result
}

/// ATR series over `candles` with the given period and smoothing method.
pub fn atr(candles: &[Candle], period: usize, method: AtrMethod) -> Vec<f64> {
    let tr = true_range(candles);
    match method {
        AtrMethod::Wilder => wilder_smooth(&tr, period),
        AtrMethod::Simple => sma(&tr, period),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_candles, DEFAULT_EPSILON};
    use chrono::TimeZone;

    fn make_ohlc(data: &[(f64, f64, f64, f64)]) -> Vec<Candle> {
        let base = chrono::Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        data.iter()
            .enumerate()
            .map(|(i, &(open, high, low, close))| Candle {
                timestamp: base + chrono::Duration::hours(i as i64),
                open,
                high,
                low,
                close,
                volume: 1000.0,
            })
            .collect()
    }

    #[test]
    fn true_range_basic() {
        let candles = make_ohlc(&[
            (100.0, 105.0, 95.0, 102.0),
            (102.0, 108.0, 100.0, 106.0), // TR = max(8, 6, 2) = 8
            (106.0, 107.0, 98.0, 99.0),   // TR = max(9, 1, 8) = 9
        ]);
        let tr = true_range(&candles);
        assert!(tr[0].is_nan());
        assert_approx(tr[1], 8.0, DEFAULT_EPSILON);
        assert_approx(tr[2], 9.0, DEFAULT_EPSILON);
    }

    #[test]
    fn true_range_gap_up() {
        // Prev close 100, current bar 108-115
        let candles = make_ohlc(&[
            (98.0, 102.0, 97.0, 100.0),
            (110.0, 115.0, 108.0, 112.0), // TR = max(7, 15, 8) = 15
        ]);
        let tr = true_range(&candles);
        assert_approx(tr[1], 15.0, DEFAULT_EPSILON);
    }

    #[test]
    fn atr_wilder_period_3() {
        let candles = make_ohlc(&[
            (100.0, 105.0, 95.0, 102.0),
            (102.0, 108.0, 100.0, 106.0), // TR = 8
            (106.0, 107.0, 98.0, 99.0),   // TR = 9
            (99.0, 103.0, 97.0, 101.0),   // TR = 6
            (101.0, 106.0, 100.0, 105.0), // TR = 6
        ]);
        let result = atr(&candles, 3, AtrMethod::Wilder);

        assert!(result[0].is_nan());
        assert!(result[1].is_nan());
        assert!(result[2].is_nan());
        // Seed uses TR[1..=3] = [8, 9, 6]: ATR[3] = 23/3
        // ATR[4] = (1/3)*6 + (2/3)*(23/3) = 64/9
        assert_approx(result[3], 23.0 / 3.0, DEFAULT_EPSILON);
        assert_approx(result[4], 64.0 / 9.0, DEFAULT_EPSILON);
    }

    #[test]
    fn atr_simple_matches_mean_of_window() {
        let candles = make_ohlc(&[
            (100.0, 105.0, 95.0, 102.0),
            (102.0, 108.0, 100.0, 106.0), // TR = 8
            (106.0, 107.0, 98.0, 99.0),   // TR = 9
            (99.0, 103.0, 97.0, 101.0),   // TR = 6
        ]);
        let result = atr(&candles, 2, AtrMethod::Simple);
        // SMA over TR needs two non-NaN values: first at index 2
        assert!(result[1].is_nan());
        assert_approx(result[2], (8.0 + 9.0) / 2.0, DEFAULT_EPSILON);
        assert_approx(result[3], (9.0 + 6.0) / 2.0, DEFAULT_EPSILON);
    }

    #[test]
    fn atr_too_few_candles() {
        let candles = make_candles(&[100.0, 101.0]);
        let result = atr(&candles, 5, AtrMethod::Wilder);
        assert!(result.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn sma_basic() {
        let values = [1.0, 2.0, 3.0, 4.0];
        let result = sma(&values, 2);
        assert!(result[0].is_nan());
        assert_approx(result[1], 1.5, DEFAULT_EPSILON);
        assert_approx(result[2], 2.5, DEFAULT_EPSILON);
        assert_approx(result[3], 3.5, DEFAULT_EPSILON);
    }
}
