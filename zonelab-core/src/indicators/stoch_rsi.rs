//! Stochastic RSI — a stochastic oscillator applied to RSI values.
//!
//! raw[i] = (RSI[i] - min(RSI, window)) / (max - min) * 100, defined as 50
//! when the window is flat. %K = SMA(raw, k_smooth), %D = SMA(%K, d_smooth).
//!
//! While warming up the snapshot is neutral (50/50, no flags) rather than
//! absent, so downstream consumers never divide by or branch on NaN.

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::domain::Candle;
use crate::indicators::atr::sma;
use crate::indicators::rsi::rsi;

/// Periods and thresholds for the oscillator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StochRsiConfig {
    pub rsi_period: usize,
    pub stoch_period: usize,
    pub k_smooth: usize,
    pub d_smooth: usize,
    pub oversold: f64,
    pub overbought: f64,
    /// Upper bound for a valid oversold-recovery cross (excludes crosses that
    /// are already overextended).
    pub confirm_ceiling: f64,
    /// Lower bound for a valid overbought-breakdown cross.
    pub confirm_floor: f64,
}

impl Default for StochRsiConfig {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            stoch_period: 14,
            k_smooth: 3,
            d_smooth: 3,
            oversold: 20.0,
            overbought: 80.0,
            confirm_ceiling: 60.0,
            confirm_floor: 40.0,
        }
    }
}

impl StochRsiConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, period) in [
            ("rsi_period", self.rsi_period),
            ("stoch_period", self.stoch_period),
            ("k_smooth", self.k_smooth),
            ("d_smooth", self.d_smooth),
        ] {
            if period == 0 {
                return Err(ConfigError::NonPositivePeriod { name });
            }
        }
        if !(0.0..=100.0).contains(&self.oversold)
            || !(0.0..=100.0).contains(&self.overbought)
            || self.oversold >= self.overbought
        {
            return Err(ConfigError::InvalidThresholds {
                name: "stoch_rsi oversold/overbought",
            });
        }
        Ok(())
    }
}

/// Per-bar oscillator state plus derived flags.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StochRsiSnapshot {
    pub k: f64,
    pub d: f64,
    pub oversold: bool,
    pub overbought: bool,
    pub crossed_from_oversold: bool,
    pub crossed_from_overbought: bool,
}

impl StochRsiSnapshot {
    /// Neutral snapshot used during warmup.
    pub fn neutral() -> Self {
        Self {
            k: 50.0,
            d: 50.0,
            oversold: false,
            overbought: false,
            crossed_from_oversold: false,
            crossed_from_overbought: false,
        }
    }
}

/// Compute the full snapshot series for a candle sequence.
pub fn compute_stoch_rsi(candles: &[Candle], config: &StochRsiConfig) -> Vec<StochRsiSnapshot> {
    let n = candles.len();
    let rsi_series = rsi(candles, config.rsi_period);

    // Raw stochastic of RSI
    let mut raw = vec![f64::NAN; n];
    for i in 0..n {
        if i + 1 < config.stoch_period || rsi_series[i].is_nan() {
            continue;
        }
        let window = &rsi_series[i + 1 - config.stoch_period..=i];
        if window.iter().any(|v| v.is_nan()) {
            continue;
        }
        let min = window.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = window.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        raw[i] = if max > min {
            (rsi_series[i] - min) / (max - min) * 100.0
        } else {
            50.0 // flat RSI window
        };
    }

    let k_series = sma(&raw, config.k_smooth);
    let d_series = sma(&k_series, config.d_smooth);

    let mut out = Vec::with_capacity(n);
    let mut prev_k = 50.0;
    for i in 0..n {
        let k = k_series[i];
        let d = d_series[i];
        if k.is_nan() || d.is_nan() {
            out.push(StochRsiSnapshot::neutral());
            continue;
        }

        let snapshot = StochRsiSnapshot {
            k,
            d,
            oversold: k < config.oversold,
            overbought: k > config.overbought,
            crossed_from_oversold: prev_k <= config.oversold
                && k > config.oversold
                && k < config.confirm_ceiling,
            crossed_from_overbought: prev_k >= config.overbought
                && k < config.overbought
                && k > config.confirm_floor,
        };
        prev_k = k;
        out.push(snapshot);
    }

    out
}
