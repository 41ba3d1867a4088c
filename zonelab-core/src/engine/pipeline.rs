//! The per-run pipeline: candles in, indicator stream + signals + simulated
//! trades out.
//!
//! All derived state is rebuilt from the candle array on every run — there
//! are no persisted singletons, so a run is deterministic given fixed inputs
//! and configuration. Bars advance strictly in order; each stateful engine
//! (trend fold, zone tracker, signal cooldown, simulator) is owned by this
//! function for exactly one run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::ConfigError;
use crate::domain::{validate_series, Candle, SeriesError, Signal};
use crate::engine::simulator::{PositionSimulator, SimulationResult, SimulatorConfig};
use crate::engine::sizer::PositionSizer;
use crate::indicators::atr::{atr, AtrMethod};
use crate::indicators::stoch_rsi::{compute_stoch_rsi, StochRsiConfig};
use crate::indicators::supertrend::{compute_supertrend, SupertrendConfig};
use crate::profile::{compute_profile, VolumeProfileConfig};
use crate::signals::generator::{BarSnapshot, SignalConfig, SignalEngine};
use crate::timeframe::{align_shifted, resample, Timeframe};
use crate::zones::{GapDirection, GapZoneConfig, GapZoneTracker};

/// Full parameter set for one run. Immutable once validated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub atr_period: usize,
    pub atr_method: AtrMethod,
    /// Trailing candle window the volume profile is computed over.
    pub profile_window: usize,
    pub higher_timeframe: Timeframe,
    pub supertrend: SupertrendConfig,
    pub stoch_rsi: StochRsiConfig,
    pub profile: VolumeProfileConfig,
    pub gap: GapZoneConfig,
    pub signal: SignalConfig,
    pub simulator: SimulatorConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            atr_period: 14,
            atr_method: AtrMethod::Wilder,
            profile_window: 50,
            higher_timeframe: Timeframe::hours(4).expect("constant timeframe"),
            supertrend: SupertrendConfig::default(),
            stoch_rsi: StochRsiConfig::default(),
            profile: VolumeProfileConfig::default(),
            gap: GapZoneConfig::default(),
            signal: SignalConfig::default(),
            simulator: SimulatorConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.atr_period == 0 {
            return Err(ConfigError::NonPositivePeriod { name: "atr_period" });
        }
        if self.profile_window == 0 {
            return Err(ConfigError::NonPositivePeriod {
                name: "profile_window",
            });
        }
        self.supertrend.validate()?;
        self.stoch_rsi.validate()?;
        self.profile.validate()?;
        self.gap.validate()?;
        self.signal.validate()
    }
}

/// One row of the per-bar indicator stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorRow {
    pub timestamp: DateTime<Utc>,
    pub close: f64,
    /// Aligned higher-timeframe trend: +1, -1, or NaN during warmup.
    pub htf_trend: f64,
    pub stoch_k: f64,
    pub stoch_d: f64,
    pub atr: f64,
    pub active_bullish_zones: usize,
    pub active_bearish_zones: usize,
    pub zone_bounce: bool,
    pub poc: f64,
    pub vah: f64,
    pub val: f64,
}

/// Everything a run produces.
#[derive(Debug)]
pub struct PipelineOutput {
    pub rows: Vec<IndicatorRow>,
    pub signals: Vec<Signal>,
    pub simulation: SimulationResult,
    /// Bars before the trend and volatility indicators were warm.
    pub warmup_bars: usize,
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("input series error: {0}")]
    Series(#[from] SeriesError),
}

/// Run the full pipeline over a validated candle series.
pub fn run_pipeline(
    candles: &[Candle],
    config: &PipelineConfig,
    sizer: &dyn PositionSizer,
) -> Result<PipelineOutput, PipelineError> {
    config.validate()?;
    validate_series(candles)?;

    let n = candles.len();

    // Precompute pure indicator series.
    let atr_series = atr(candles, config.atr_period, config.atr_method);
    let stoch_series = compute_stoch_rsi(candles, &config.stoch_rsi);

    // Higher-timeframe trend, folded back with the anti-lookahead shift.
    let htf_candles = resample(candles, config.higher_timeframe);
    let htf_supertrend = compute_supertrend(&htf_candles, &config.supertrend);
    let htf_trend = align_shifted(
        candles,
        &htf_candles,
        &htf_supertrend.direction,
        config.higher_timeframe,
    );

    let warmup_bars = htf_trend
        .iter()
        .zip(&atr_series)
        .position(|(t, a)| !t.is_nan() && !a.is_nan())
        .unwrap_or(n);

    // Stateful engines, one instance per run.
    let mut tracker = GapZoneTracker::new(config.gap.clone())?;
    let mut engine = SignalEngine::new(config.signal.clone(), config.stoch_rsi.clone())?;
    let mut simulator = PositionSimulator::new(config.simulator.clone(), sizer);

    let mut rows = Vec::with_capacity(n);
    let mut signals = Vec::new();

    for (i, candle) in candles.iter().enumerate() {
        let zone_events = tracker.step(candles, i, atr_series[i]);

        let window_start = (i + 1).saturating_sub(config.profile_window);
        let profile = compute_profile(&candles[window_start..=i], &config.profile);

        let snapshot = BarSnapshot {
            index: i,
            candle,
            htf_trend: htf_trend[i],
            stoch: &stoch_series[i],
            zone_events: &zone_events,
            tracker: &tracker,
            profile: &profile,
            atr: atr_series[i],
        };

        let signal = engine.evaluate(&snapshot, simulator.open_direction());
        simulator.step(candle, i, signal.as_ref());

        rows.push(build_row(&snapshot));
        if let Some(signal) = signal {
            debug!(bar = i, kind = ?signal.kind, "pipeline signal");
            signals.push(signal);
        }
    }

    let simulation = simulator.finish();
    info!(
        bars = n,
        warmup = warmup_bars,
        signals = signals.len(),
        trades = simulation.trades.len(),
        "pipeline run complete"
    );

    Ok(PipelineOutput {
        rows,
        signals,
        simulation,
        warmup_bars,
    })
}

fn build_row(snapshot: &BarSnapshot<'_>) -> IndicatorRow {
    IndicatorRow {
        timestamp: snapshot.candle.timestamp,
        close: snapshot.candle.close,
        htf_trend: snapshot.htf_trend,
        stoch_k: snapshot.stoch.k,
        stoch_d: snapshot.stoch.d,
        atr: snapshot.atr,
        active_bullish_zones: snapshot.tracker.active_count(GapDirection::Bullish),
        active_bearish_zones: snapshot.tracker.active_count(GapDirection::Bearish),
        zone_bounce: snapshot.zone_events.bullish_bounce || snapshot.zone_events.bearish_bounce,
        poc: snapshot.profile.poc,
        vah: snapshot.profile.vah,
        val: snapshot.profile.val,
    }
}
