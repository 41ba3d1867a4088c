//! Serializable backtest configuration.
//!
//! Captures everything needed to reproduce a run: the full pipeline
//! parameter set plus the sizing policy. Two identical configs hash to the
//! same content-addressed run ID.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use zonelab_core::engine::{FixedFractionalSizer, FixedUnitsSizer, PipelineConfig, PositionSizer};

/// Unique identifier for a backtest run (content-addressable hash).
pub type RunId = String;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid parameters: {0}")]
    Invalid(#[from] zonelab_core::ConfigError),

    #[error("sizer risk_fraction must be in (0, 1), got {0}")]
    InvalidRiskFraction(f64),

    #[error("sizer units must be > 0, got {0}")]
    InvalidUnits(f64),
}

/// Position sizing policy (serializable enum).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SizerConfig {
    /// Risk a fixed fraction of the balance per trade.
    FixedFractional { risk_fraction: f64 },

    /// Constant unit count per trade.
    FixedUnits { units: f64 },
}

impl Default for SizerConfig {
    fn default() -> Self {
        Self::FixedFractional {
            risk_fraction: 0.01,
        }
    }
}

impl SizerConfig {
    pub fn build(&self) -> Result<Box<dyn PositionSizer>, ConfigError> {
        match *self {
            SizerConfig::FixedFractional { risk_fraction } => {
                if !(risk_fraction > 0.0 && risk_fraction < 1.0) {
                    return Err(ConfigError::InvalidRiskFraction(risk_fraction));
                }
                Ok(Box::new(FixedFractionalSizer::new(risk_fraction)))
            }
            SizerConfig::FixedUnits { units } => {
                if units <= 0.0 {
                    return Err(ConfigError::InvalidUnits(units));
                }
                Ok(Box::new(FixedUnitsSizer::new(units)))
            }
        }
    }
}

/// Serializable configuration for a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct BacktestConfig {
    /// Instrument label carried through to the report.
    pub symbol: String,
    pub pipeline: PipelineConfig,
    pub sizer: SizerConfig,
}

impl BacktestConfig {
    /// Load and validate a TOML config file.
    pub fn from_toml_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.pipeline.validate()?;
        self.sizer.build().map(|_| ())
    }

    /// Deterministic content hash of this configuration.
    ///
    /// Two runs with identical configs share a RunId and are reproducible
    /// from one another.
    pub fn run_id(&self) -> RunId {
        let json = serde_json::to_string(self).expect("BacktestConfig serialization failed");
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }
}
