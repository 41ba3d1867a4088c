//! Per-bar confluence signal evaluation.
//!
//! The engine is the only stateful part of the signal layer: it owns the
//! bars-since-last-trade cooldown counter. Everything else arrives as a
//! read-only snapshot of the upstream engines for the current bar.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ConfigError;
use crate::domain::{Candle, Direction, Signal, SignalKind};
use crate::indicators::stoch_rsi::{StochRsiConfig, StochRsiSnapshot};
use crate::profile::VolumeProfile;
use crate::signals::confluence::ConfluenceWeights;
use crate::zones::{GapDirection, GapZoneTracker, ZoneEvents};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalConfig {
    /// Entry cooldown: bars that must elapse after any emitted signal before
    /// another entry is considered. Exits ignore it.
    pub min_bars_between_trades: usize,
    pub stop_atr_multiplier: f64,
    pub target_atr_multiplier: f64,
    /// Minimum target/stop ratio; configurations below it are rejected at
    /// construction.
    pub min_risk_reward: f64,
    /// Proximity tolerance to profile levels, in ATRs.
    pub level_tolerance_atr: f64,
    /// %K beyond which an open position is force-exited (long side; the
    /// short side mirrors at 100 - this value).
    pub exit_extreme_k: f64,
    pub weights: ConfluenceWeights,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            min_bars_between_trades: 5,
            stop_atr_multiplier: 1.5,
            target_atr_multiplier: 3.0,
            min_risk_reward: 1.5,
            level_tolerance_atr: 0.5,
            exit_extreme_k: 90.0,
            weights: ConfluenceWeights::default(),
        }
    }
}

impl SignalConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stop_atr_multiplier <= 0.0 {
            return Err(ConfigError::NonPositiveMultiplier {
                name: "stop_atr_multiplier",
            });
        }
        if self.target_atr_multiplier <= 0.0 {
            return Err(ConfigError::NonPositiveMultiplier {
                name: "target_atr_multiplier",
            });
        }
        if self.target_atr_multiplier < self.stop_atr_multiplier * self.min_risk_reward {
            return Err(ConfigError::RiskRewardTooLow {
                target: self.target_atr_multiplier,
                stop: self.stop_atr_multiplier,
                min_rr: self.min_risk_reward,
            });
        }
        if !(50.0..=100.0).contains(&self.exit_extreme_k) {
            return Err(ConfigError::InvalidThresholds {
                name: "exit_extreme_k",
            });
        }
        self.weights.validate()
    }
}

/// Read-only view of the upstream engines for one bar.
pub struct BarSnapshot<'a> {
    pub index: usize,
    pub candle: &'a Candle,
    /// Aligned higher-timeframe trend direction: +1, -1, or NaN during warmup.
    pub htf_trend: f64,
    pub stoch: &'a StochRsiSnapshot,
    pub zone_events: &'a ZoneEvents,
    pub tracker: &'a GapZoneTracker,
    pub profile: &'a VolumeProfile,
    /// Current base-timeframe ATR, NaN during warmup.
    pub atr: f64,
}

/// Stateful per-run signal engine.
pub struct SignalEngine {
    config: SignalConfig,
    momentum: StochRsiConfig,
    /// Bars elapsed since the last emitted signal; `None` before the first.
    bars_since_signal: Option<usize>,
}

impl SignalEngine {
    pub fn new(config: SignalConfig, momentum: StochRsiConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        momentum.validate()?;
        Ok(Self {
            config,
            momentum,
            bars_since_signal: None,
        })
    }

    /// Evaluate one bar. `open_position` is the direction of the simulator's
    /// open position, if any. Returns `None` when no signal fires.
    pub fn evaluate(
        &mut self,
        snapshot: &BarSnapshot<'_>,
        open_position: Option<Direction>,
    ) -> Option<Signal> {
        if let Some(count) = self.bars_since_signal.as_mut() {
            *count += 1;
        }

        // Exits bypass the cooldown entirely; while a position is open no
        // new entry is considered.
        if let Some(direction) = open_position {
            if let Some(signal) = self.evaluate_exit(snapshot, direction) {
                self.bars_since_signal = Some(0);
                return Some(signal);
            }
            return None;
        }

        if let Some(count) = self.bars_since_signal {
            if count < self.config.min_bars_between_trades {
                return None;
            }
        }

        let signal = self
            .evaluate_entry(snapshot, Direction::Long)
            .or_else(|| self.evaluate_entry(snapshot, Direction::Short))?;

        debug!(
            bar = snapshot.index,
            kind = ?signal.kind,
            strength = signal.strength,
            "entry signal"
        );
        self.bars_since_signal = Some(0);
        Some(signal)
    }

    fn evaluate_exit(&self, snapshot: &BarSnapshot<'_>, direction: Direction) -> Option<Signal> {
        let trend_against = match direction {
            Direction::Long => snapshot.htf_trend < 0.0,
            Direction::Short => snapshot.htf_trend > 0.0,
        };
        let momentum_extreme = match direction {
            Direction::Long => snapshot.stoch.k > self.config.exit_extreme_k,
            Direction::Short => snapshot.stoch.k < 100.0 - self.config.exit_extreme_k,
        };

        if !trend_against && !momentum_extreme {
            return None;
        }

        let mut reasons = Vec::new();
        if trend_against {
            reasons.push("htf_trend_reversal".to_string());
        }
        if momentum_extreme {
            reasons.push("momentum_extreme".to_string());
        }

        Some(Signal {
            kind: match direction {
                Direction::Long => SignalKind::ExitLong,
                Direction::Short => SignalKind::ExitShort,
            },
            timestamp: snapshot.candle.timestamp,
            price: snapshot.candle.close,
            strength: 1.0,
            stop_loss: None,
            take_profit: None,
            reasons,
        })
    }

    fn evaluate_entry(&self, snapshot: &BarSnapshot<'_>, direction: Direction) -> Option<Signal> {
        // Insufficient data upstream: no trend or volatility, no entry.
        if snapshot.htf_trend.is_nan() || snapshot.atr.is_nan() || snapshot.atr <= 0.0 {
            return None;
        }

        let trend_aligned = match direction {
            Direction::Long => snapshot.htf_trend > 0.0,
            Direction::Short => snapshot.htf_trend < 0.0,
        };
        if !trend_aligned {
            return None;
        }

        let stoch = snapshot.stoch;
        let (crossed, recovering) = match direction {
            Direction::Long => (
                stoch.crossed_from_oversold,
                stoch.k > self.momentum.oversold && stoch.k < self.momentum.confirm_ceiling,
            ),
            Direction::Short => (
                stoch.crossed_from_overbought,
                stoch.k < self.momentum.overbought && stoch.k > self.momentum.confirm_floor,
            ),
        };
        if !crossed && !recovering {
            return None;
        }

        let close = snapshot.candle.close;

        // Avoid entries inside illiquid price areas.
        if snapshot.profile.contains_lvn(close) {
            return None;
        }

        let (zone_confluence, zone_reason) = self.zone_confluence(snapshot, direction);
        let level_confluence = self.level_confluence(snapshot);
        if !zone_confluence && !level_confluence {
            return None;
        }

        let mut reasons = Vec::with_capacity(4);
        reasons.push(match direction {
            Direction::Long => "htf_trend_up".to_string(),
            Direction::Short => "htf_trend_down".to_string(),
        });
        reasons.push(if crossed {
            "stochrsi_cross".to_string()
        } else {
            "stochrsi_recovery".to_string()
        });
        if let Some(reason) = zone_reason {
            reasons.push(reason);
        }
        if level_confluence {
            reasons.push("profile_level".to_string());
        }

        let strength =
            self.config
                .weights
                .strength(true, true, zone_confluence, level_confluence);

        let stop_distance = snapshot.atr * self.config.stop_atr_multiplier;
        let target_distance = snapshot.atr * self.config.target_atr_multiplier;
        let (kind, stop_loss, take_profit) = match direction {
            Direction::Long => (
                SignalKind::Long,
                close - stop_distance,
                close + target_distance,
            ),
            Direction::Short => (
                SignalKind::Short,
                close + stop_distance,
                close - target_distance,
            ),
        };

        Some(Signal {
            kind,
            timestamp: snapshot.candle.timestamp,
            price: close,
            strength,
            stop_loss: Some(stop_loss),
            take_profit: Some(take_profit),
            reasons,
        })
    }

    /// Gap-zone confluence: a bounce on this bar, or the close sitting inside
    /// an active unmitigated zone of the trade's direction.
    fn zone_confluence(
        &self,
        snapshot: &BarSnapshot<'_>,
        direction: Direction,
    ) -> (bool, Option<String>) {
        let (bounced, gap_direction) = match direction {
            Direction::Long => (snapshot.zone_events.bullish_bounce, GapDirection::Bullish),
            Direction::Short => (snapshot.zone_events.bearish_bounce, GapDirection::Bearish),
        };
        if bounced {
            return (true, Some("zone_bounce".to_string()));
        }

        let close = snapshot.candle.close;
        let contained = snapshot
            .tracker
            .active_unmitigated(gap_direction)
            .any(|z| z.contains(close));
        if contained {
            (true, Some("zone_containment".to_string()))
        } else {
            (false, None)
        }
    }

    /// Profile-level confluence: close within an ATR-scaled tolerance of the
    /// POC, value area edge, or an HVN zone.
    fn level_confluence(&self, snapshot: &BarSnapshot<'_>) -> bool {
        let distance = snapshot.profile.nearest_level_distance(snapshot.candle.close);
        !distance.is_nan() && distance <= snapshot.atr * self.config.level_tolerance_atr
    }
}
