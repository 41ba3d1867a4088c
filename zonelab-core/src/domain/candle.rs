//! Candle — the fundamental market data unit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// OHLCV candle for a single instrument on a single base-timeframe interval.
///
/// The timestamp is the open time of the interval. Volume is fractional to
/// support instruments quoted in lots or coins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    /// Returns true if any OHLCV field is NaN.
    pub fn is_void(&self) -> bool {
        self.open.is_nan()
            || self.high.is_nan()
            || self.low.is_nan()
            || self.close.is_nan()
            || self.volume.is_nan()
    }

    /// Basic OHLCV sanity check: high >= low, body inside the range,
    /// non-negative volume.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.volume >= 0.0
    }

    /// High-low range of the bar.
    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    /// Midpoint of the bar's range (hl2).
    pub fn midpoint(&self) -> f64 {
        (self.high + self.low) / 2.0
    }
}

/// Contract violations in an input candle series.
///
/// These are the only hard errors the pipeline raises to the caller;
/// everything downstream degrades to neutral output instead.
#[derive(Debug, Error, PartialEq)]
pub enum SeriesError {
    #[error("candle at index {index} is malformed (NaN field or inverted range)")]
    MalformedCandle { index: usize },

    #[error("timestamps not strictly increasing at index {index}")]
    NonMonotonicTimestamp { index: usize },
}

/// Validate the series contract: every candle sane, timestamps strictly
/// increasing and therefore unique.
pub fn validate_series(candles: &[Candle]) -> Result<(), SeriesError> {
    for (i, candle) in candles.iter().enumerate() {
        if !candle.is_sane() {
            return Err(SeriesError::MalformedCandle { index: i });
        }
        if i > 0 && candle.timestamp <= candles[i - 1].timestamp {
            return Err(SeriesError::NonMonotonicTimestamp { index: i });
        }
    }
    Ok(())
}
