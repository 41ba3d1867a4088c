//! Higher-timeframe resampling and anti-lookahead alignment.
//!
//! Resampling buckets base candles into fixed intervals with standard OHLCV
//! aggregation (open = first, high = max, low = min, close = last,
//! volume = sum). Alignment maps each base bar to the most recent bucket
//! whose end is at or before the base bar's timestamp — the previous fully
//! completed bucket, never the partially formed current one. Every
//! constituent base bar of the aligned value is therefore strictly earlier
//! than the bar it informs.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::domain::Candle;

/// A resampling interval, parsed from rule strings like "15M", "4H", "1D".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeframe {
    minutes: i64,
}

#[derive(Debug, Error, PartialEq)]
pub enum TimeframeError {
    #[error("unrecognized timeframe rule '{0}' (expected e.g. \"15M\", \"4H\", \"1D\")")]
    Unparseable(String),

    #[error("timeframe must be a positive interval")]
    NonPositive,
}

impl Timeframe {
    pub fn minutes(minutes: i64) -> Result<Self, TimeframeError> {
        if minutes <= 0 {
            return Err(TimeframeError::NonPositive);
        }
        Ok(Self { minutes })
    }

    pub fn hours(hours: i64) -> Result<Self, TimeframeError> {
        Self::minutes(hours * 60)
    }

    pub fn duration(&self) -> Duration {
        Duration::minutes(self.minutes)
    }

    /// Start of the bucket containing `ts` (buckets anchored at the epoch).
    pub fn bucket_start(&self, ts: DateTime<Utc>) -> DateTime<Utc> {
        let secs = self.minutes * 60;
        ts - Duration::seconds(ts.timestamp().rem_euclid(secs))
            - Duration::nanoseconds(ts.timestamp_subsec_nanos() as i64)
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.minutes % (24 * 60) == 0 {
            write!(f, "{}D", self.minutes / (24 * 60))
        } else if self.minutes % 60 == 0 {
            write!(f, "{}H", self.minutes / 60)
        } else {
            write!(f, "{}M", self.minutes)
        }
    }
}

impl FromStr for Timeframe {
    type Err = TimeframeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.trim().chars();
        let unit = chars
            .next_back()
            .ok_or_else(|| TimeframeError::Unparseable(s.to_string()))?;
        let count: i64 = chars
            .as_str()
            .parse()
            .map_err(|_| TimeframeError::Unparseable(s.to_string()))?;
        let minutes = match unit.to_ascii_uppercase() {
            'M' => count,
            'H' => count * 60,
            'D' => count * 24 * 60,
            _ => return Err(TimeframeError::Unparseable(s.to_string())),
        };
        Timeframe::minutes(minutes)
    }
}

impl Serialize for Timeframe {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Timeframe {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// Aggregate base candles into higher-timeframe candles.
///
/// The returned candles carry the bucket start as their timestamp. Buckets
/// with no base candles are simply absent (gap-tolerant).
pub fn resample(candles: &[Candle], timeframe: Timeframe) -> Vec<Candle> {
    let mut out: Vec<Candle> = Vec::new();

    for candle in candles {
        let bucket = timeframe.bucket_start(candle.timestamp);
        match out.last_mut() {
            Some(last) if last.timestamp == bucket => {
                last.high = last.high.max(candle.high);
                last.low = last.low.min(candle.low);
                last.close = candle.close;
                last.volume += candle.volume;
            }
            _ => out.push(Candle {
                timestamp: bucket,
                open: candle.open,
                high: candle.high,
                low: candle.low,
                close: candle.close,
                volume: candle.volume,
            }),
        }
    }

    out
}

/// Fold a higher-timeframe series back onto the base index with the
/// one-completed-bucket shift.
///
/// `values[j]` belongs to `htf[j]`. For each base bar the result is the value
/// of the latest higher-timeframe bucket that had fully closed by the base
/// bar's timestamp, forward-filled; NaN before the first completed bucket.
pub fn align_shifted(
    base: &[Candle],
    htf: &[Candle],
    values: &[f64],
    timeframe: Timeframe,
) -> Vec<f64> {
    debug_assert_eq!(htf.len(), values.len());
    let duration = timeframe.duration();
    let mut out = vec![f64::NAN; base.len()];
    let mut j: usize = 0; // candidate htf index (next bucket to consume)
    let mut current = f64::NAN;

    for (i, bar) in base.iter().enumerate() {
        while j < htf.len() && htf[j].timestamp + duration <= bar.timestamp {
            current = values[j];
            j += 1;
        }
        out[i] = current;
    }

    out
}

/// Index of the latest fully-closed higher-timeframe bar for each base bar,
/// or `None` before the first completed bucket. Used by lookahead tests and
/// diagnostics; `align_shifted` is the hot path.
pub fn aligned_source_index(
    base: &[Candle],
    htf: &[Candle],
    timeframe: Timeframe,
) -> Vec<Option<usize>> {
    let duration = timeframe.duration();
    let mut out = vec![None; base.len()];
    let mut j: usize = 0;
    let mut current = None;

    for (i, bar) in base.iter().enumerate() {
        while j < htf.len() && htf[j].timestamp + duration <= bar.timestamp {
            current = Some(j);
            j += 1;
        }
        out[i] = current;
    }

    out
}
