//! Indicator implementations.
//!
//! Indicators are pure transforms: candle history in, aligned output series
//! out, with `f64::NAN` during warmup. They are precomputed once per run and
//! indexed per bar by the pipeline — no per-bar recomputation, no hidden
//! per-instance caches.

pub mod atr;
pub mod rsi;
pub mod stoch_rsi;
pub mod supertrend;

pub use atr::{atr, sma, true_range, wilder_smooth, AtrMethod};
pub use rsi::rsi;
pub use stoch_rsi::{compute_stoch_rsi, StochRsiConfig, StochRsiSnapshot};
pub use supertrend::{compute_supertrend, SupertrendConfig, SupertrendOutput, TrendState};

/// Create synthetic candles from close prices for testing.
///
/// Generates plausible OHLCV: open = prev close (or close for the first bar),
/// high/low bracket the body by 1.0, volume = 1000, hourly timestamps.
#[cfg(test)]
pub fn make_candles(closes: &[f64]) -> Vec<crate::domain::Candle> {
    use chrono::TimeZone;
    let base = chrono::Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            crate::domain::Candle {
                timestamp: base + chrono::Duration::hours(i as i64),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: 1000.0,
            }
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
