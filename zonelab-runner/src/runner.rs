//! Backtest runner — wires together data, pipeline, and metrics.
//!
//! Two entry points:
//! - `run_backtest()`: loads candles from CSV, then runs. The outermost
//!   orchestration surface.
//! - `run_backtest_from_candles()`: takes pre-loaded candles — no I/O. Used
//!   by embedding applications and tests.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use zonelab_core::domain::{Candle, Signal, TradeRecord};
use zonelab_core::engine::run_pipeline;
use zonelab_core::PipelineError;

use crate::config::{BacktestConfig, ConfigError, RunId};
use crate::data::{load_candles, LoadError};
use crate::metrics::PerformanceMetrics;

/// Current schema version for persisted reports.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("data error: {0}")]
    Data(#[from] LoadError),

    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),
}

/// Complete, serializable result of a single backtest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestReport {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub run_id: RunId,
    pub symbol: String,
    pub metrics: PerformanceMetrics,
    pub trades: Vec<TradeRecord>,
    pub signals: Vec<Signal>,
    pub equity_curve: Vec<f64>,
    pub bar_count: usize,
    pub warmup_bars: usize,
    /// Count of trades per exit reason, for quick diagnostics.
    pub exit_reasons: BTreeMap<String, usize>,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Run a backtest over a CSV candle file.
pub fn run_backtest(config: &BacktestConfig, csv_path: &Path) -> Result<BacktestReport, RunError> {
    let candles = load_candles(csv_path)?;
    run_backtest_from_candles(config, &candles)
}

/// Outermost convenience entry: TOML config file + CSV candle file → report.
///
/// Errors are wrapped with file context here; the typed `RunError` surface
/// stays available through `run_backtest` for callers that match on kinds.
pub fn run_from_files(
    config_path: &Path,
    csv_path: &Path,
) -> anyhow::Result<BacktestReport> {
    use anyhow::Context;

    let config = BacktestConfig::from_toml_file(config_path)
        .with_context(|| format!("loading backtest config {}", config_path.display()))?;
    let report = run_backtest(&config, csv_path)
        .with_context(|| format!("running backtest over {}", csv_path.display()))?;
    Ok(report)
}

/// Run a backtest over pre-loaded candles — no I/O.
pub fn run_backtest_from_candles(
    config: &BacktestConfig,
    candles: &[Candle],
) -> Result<BacktestReport, RunError> {
    config.validate()?;
    let sizer = config.sizer.build()?;

    let output = run_pipeline(candles, &config.pipeline, sizer.as_ref())?;
    let simulation = output.simulation;

    let metrics = PerformanceMetrics::compute(
        &simulation.equity_curve,
        &simulation.trades,
        simulation.final_balance,
    );

    let mut exit_reasons: BTreeMap<String, usize> = BTreeMap::new();
    for trade in &simulation.trades {
        *exit_reasons
            .entry(trade.exit_reason.as_str().to_string())
            .or_default() += 1;
    }

    info!(
        run_id = %config.run_id(),
        trades = metrics.total_trades,
        final_balance = metrics.final_balance,
        "backtest complete"
    );

    Ok(BacktestReport {
        schema_version: SCHEMA_VERSION,
        run_id: config.run_id(),
        symbol: config.symbol.clone(),
        metrics,
        trades: simulation.trades,
        signals: output.signals,
        equity_curve: simulation.equity_curve,
        bar_count: candles.len(),
        warmup_bars: output.warmup_bars,
        exit_reasons,
    })
}
