//! Confluence factor weighting.

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// Relative weight of each confluence factor in the strength score.
///
/// The score is the weight-sum of satisfied factors normalized by the total
/// weight, so the weights need not sum to one. Defaults weight all four
/// factors equally.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfluenceWeights {
    pub trend: f64,
    pub momentum: f64,
    pub zone: f64,
    pub level: f64,
}

impl Default for ConfluenceWeights {
    fn default() -> Self {
        Self {
            trend: 1.0,
            momentum: 1.0,
            zone: 1.0,
            level: 1.0,
        }
    }
}

impl ConfluenceWeights {
    pub fn total(&self) -> f64 {
        self.trend + self.momentum + self.zone + self.level
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let any_negative =
            self.trend < 0.0 || self.momentum < 0.0 || self.zone < 0.0 || self.level < 0.0;
        if any_negative || self.total() <= 0.0 {
            return Err(ConfigError::InvalidThresholds {
                name: "confluence weights",
            });
        }
        Ok(())
    }

    /// Normalized strength for a set of satisfied factors, capped at 1.0.
    pub fn strength(&self, trend: bool, momentum: bool, zone: bool, level: bool) -> f64 {
        let mut sum = 0.0;
        if trend {
            sum += self.trend;
        }
        if momentum {
            sum += self.momentum;
        }
        if zone {
            sum += self.zone;
        }
        if level {
            sum += self.level;
        }
        (sum / self.total()).min(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_weights_quarter_each() {
        let w = ConfluenceWeights::default();
        assert_eq!(w.strength(true, true, false, false), 0.5);
        assert_eq!(w.strength(true, true, true, false), 0.75);
        assert_eq!(w.strength(true, true, true, true), 1.0);
    }

    #[test]
    fn strength_bounded() {
        let w = ConfluenceWeights {
            trend: 3.0,
            momentum: 1.0,
            zone: 1.0,
            level: 1.0,
        };
        let s = w.strength(true, true, true, true);
        assert!(s <= 1.0);
        assert!(w.strength(false, false, false, false) == 0.0);
    }

    #[test]
    fn validation_rejects_degenerate() {
        let zero = ConfluenceWeights {
            trend: 0.0,
            momentum: 0.0,
            zone: 0.0,
            level: 0.0,
        };
        assert!(zero.validate().is_err());
        let negative = ConfluenceWeights {
            trend: -1.0,
            ..ConfluenceWeights::default()
        };
        assert!(negative.validate().is_err());
        assert!(ConfluenceWeights::default().validate().is_ok());
    }
}
