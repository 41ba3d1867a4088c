//! Configuration validation errors.
//!
//! Misconfiguration is rejected once, at pipeline construction, so per-bar
//! evaluation never has to branch on invalid parameters.

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{name} must be >= 1")]
    NonPositivePeriod { name: &'static str },

    #[error("{name} must be > 0")]
    NonPositiveMultiplier { name: &'static str },

    #[error("{name} must be a fraction in (0, 1], got {value}")]
    InvalidFraction { name: &'static str, value: f64 },

    #[error("{name} thresholds are inverted or out of range")]
    InvalidThresholds { name: &'static str },

    #[error("volume profile bin count must be >= 1")]
    ZeroBins,

    #[error("gap tracker max_zones must be >= 1")]
    ZeroMaxZones,

    #[error(
        "target multiplier {target} below stop multiplier {stop} x minimum risk/reward {min_rr}"
    )]
    RiskRewardTooLow { target: f64, stop: f64, min_rr: f64 },
}
