//! ZoneLab Runner — backtest orchestration on top of `zonelab-core`.
//!
//! This crate provides:
//! - CSV candle ingestion with series-contract enforcement
//! - Serializable run configuration (TOML) with content-addressed run IDs
//! - Performance metrics (win rate, profit factor, drawdown, Sharpe)
//! - Report assembly for a single backtest run
//!
//! Logging uses `tracing` events only; installing a subscriber is the
//! embedding application's responsibility.

pub mod config;
pub mod data;
pub mod metrics;
pub mod runner;

pub use config::{BacktestConfig, ConfigError, RunId, SizerConfig};
pub use data::{load_candles, LoadError};
pub use metrics::PerformanceMetrics;
pub use runner::{
    run_backtest, run_backtest_from_candles, run_from_files, BacktestReport, RunError,
    SCHEMA_VERSION,
};
