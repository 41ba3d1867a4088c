//! ZoneLab Core — deterministic market-structure analysis and backtesting.
//!
//! This crate contains the heart of the system:
//! - Domain types (candles, signals, positions, trades)
//! - Pure indicator transforms (ATR, RSI, StochRSI, Supertrend)
//! - Volume-by-price profiling (POC, value area, HVN/LVN zones)
//! - Fair value gap detection with mitigation tracking
//! - Higher-timeframe resampling with anti-lookahead alignment
//! - Confluence signal generation with cooldown and bracket sizing
//! - Bar-by-bar position simulation with conservative fill tie-breaking
//!
//! The whole pipeline is synchronous and deterministic: identical candles
//! and configuration always produce identical output. No I/O happens here.

pub mod config;
pub mod domain;
pub mod engine;
pub mod indicators;
pub mod profile;
pub mod signals;
pub mod timeframe;
pub mod zones;

pub use config::ConfigError;
pub use engine::{run_pipeline, PipelineConfig, PipelineError, PipelineOutput};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: core types are Send + Sync, so embedding
    /// applications can run independent simulations on worker threads.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        // Domain types
        require_send::<domain::Candle>();
        require_sync::<domain::Candle>();
        require_send::<domain::Signal>();
        require_sync::<domain::Signal>();
        require_send::<domain::Position>();
        require_sync::<domain::Position>();
        require_send::<domain::TradeRecord>();
        require_sync::<domain::TradeRecord>();

        // Engine state
        require_send::<zones::GapZoneTracker>();
        require_sync::<zones::GapZoneTracker>();
        require_send::<profile::VolumeProfile>();
        require_sync::<profile::VolumeProfile>();
        require_send::<indicators::StochRsiSnapshot>();
        require_sync::<indicators::StochRsiSnapshot>();
        require_send::<indicators::TrendState>();
        require_sync::<indicators::TrendState>();

        // Configuration
        require_send::<PipelineConfig>();
        require_sync::<PipelineConfig>();
        require_send::<engine::SimulatorConfig>();
        require_sync::<engine::SimulatorConfig>();
    }
}
