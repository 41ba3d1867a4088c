//! Supertrend — ATR-band trend filter.
//!
//! Basic bands sit at hl2 ± multiplier·ATR. Final bands ratchet toward price
//! (the upper band can only tighten downward while the close stays below it,
//! the lower band only upward while the close stays above it), which keeps
//! the filter from whipsawing inside a trend. Direction flips when the close
//! crosses the active band.
//!
//! The recurrence is an explicit fold: `TrendState::step` consumes the
//! previous state by value and returns the next, so each bar is unit-testable
//! in isolation. `compute_supertrend` runs the fold over a whole series in
//! the precomputed-array form the pipeline consumes.

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::domain::Candle;
use crate::indicators::atr::{atr, AtrMethod};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupertrendConfig {
    pub period: usize,
    pub multiplier: f64,
    pub atr_method: AtrMethod,
}

impl Default for SupertrendConfig {
    fn default() -> Self {
        Self {
            period: 10,
            multiplier: 3.0,
            atr_method: AtrMethod::Wilder,
        }
    }
}

impl SupertrendConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.period == 0 {
            return Err(ConfigError::NonPositivePeriod {
                name: "supertrend period",
            });
        }
        if self.multiplier <= 0.0 {
            return Err(ConfigError::NonPositiveMultiplier {
                name: "supertrend multiplier",
            });
        }
        Ok(())
    }
}

/// Trend direction as a signed value: +1.0 up, -1.0 down.
///
/// Carried as f64 throughout the band/alignment plumbing so warmup can be
/// NaN and forward-filling needs no special casing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendState {
    pub direction: f64,
    pub final_upper: f64,
    pub final_lower: f64,
}

impl TrendState {
    /// Seed the recurrence at the first bar with a valid ATR.
    /// Starts trending up, matching the usual convention.
    pub fn seed(candle: &Candle, atr_value: f64, multiplier: f64) -> Self {
        let mid = candle.midpoint();
        Self {
            direction: 1.0,
            final_upper: mid + multiplier * atr_value,
            final_lower: mid - multiplier * atr_value,
        }
    }

    /// Advance one bar: ratchet the bands, then flip direction if the close
    /// crossed the active band.
    pub fn step(self, candle: &Candle, prev_close: f64, atr_value: f64, multiplier: f64) -> Self {
        let mid = candle.midpoint();
        let basic_upper = mid + multiplier * atr_value;
        let basic_lower = mid - multiplier * atr_value;

        let mut final_upper = if basic_upper < self.final_upper || prev_close > self.final_upper {
            basic_upper
        } else {
            self.final_upper
        };
        let mut final_lower = if basic_lower > self.final_lower || prev_close < self.final_lower {
            basic_lower
        } else {
            self.final_lower
        };

        // An extreme gap can jump the basic bands past a stale opposite band;
        // reset both so final_lower <= final_upper always holds.
        if final_lower > final_upper {
            final_upper = basic_upper;
            final_lower = basic_lower;
        }

        let direction = if self.direction > 0.0 && candle.close < final_lower {
            -1.0
        } else if self.direction < 0.0 && candle.close > final_upper {
            1.0
        } else {
            self.direction
        };

        Self {
            direction,
            final_upper,
            final_lower,
        }
    }
}

/// Full-series supertrend output, NaN during warmup.
#[derive(Debug, Clone)]
pub struct SupertrendOutput {
    pub direction: Vec<f64>,
    pub final_upper: Vec<f64>,
    pub final_lower: Vec<f64>,
}

impl SupertrendOutput {
    fn nan(n: usize) -> Self {
        Self {
            direction: vec![f64::NAN; n],
            final_upper: vec![f64::NAN; n],
            final_lower: vec![f64::NAN; n],
        }
    }
}

/// Run the supertrend fold over a candle series.
pub fn compute_supertrend(candles: &[Candle], config: &SupertrendConfig) -> SupertrendOutput {
    let n = candles.len();
    let mut out = SupertrendOutput::nan(n);

    let atr_series = atr(candles, config.period, config.atr_method);
    let start = match atr_series.iter().position(|v| !v.is_nan()) {
        Some(idx) => idx,
        None => return out,
    };

    let mut state = TrendState::seed(&candles[start], atr_series[start], config.multiplier);
    out.direction[start] = state.direction;
    out.final_upper[start] = state.final_upper;
    out.final_lower[start] = state.final_lower;

    for i in (start + 1)..n {
        state = state.step(
            &candles[i],
            candles[i - 1].close,
            atr_series[i],
            config.multiplier,
        );
        out.direction[i] = state.direction;
        out.final_upper[i] = state.final_upper;
        out.final_lower[i] = state.final_lower;
    }

    out
}
