//! Fair value gap (FVG) detection and mitigation tracking.
//!
//! A bullish zone forms at index i when low[i] clears high[i-2] by more than
//! the configured minimum; bearish is the mirror. Zones live in a bounded
//! list (oldest evicted first) and are checked for mitigation on every later
//! bar. Mitigation is a one-way, idempotent transition: once a zone is
//! filled it never reverts.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::domain::Candle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapDirection {
    Bullish,
    Bearish,
}

/// Minimum gap size, scaled either by current volatility or by price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapThreshold {
    /// Gap must exceed this multiple of the current ATR.
    AtrMultiple(f64),
    /// Gap must exceed this fraction of the current close.
    PricePercent(f64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GapZoneConfig {
    /// Upper bound on tracked zones; the oldest is evicted first.
    pub max_zones: usize,
    pub threshold: GapThreshold,
}

impl Default for GapZoneConfig {
    fn default() -> Self {
        Self {
            max_zones: 20,
            threshold: GapThreshold::AtrMultiple(0.5),
        }
    }
}

impl GapZoneConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_zones == 0 {
            return Err(ConfigError::ZeroMaxZones);
        }
        let value = match self.threshold {
            GapThreshold::AtrMultiple(m) => m,
            GapThreshold::PricePercent(p) => p,
        };
        if value <= 0.0 {
            return Err(ConfigError::NonPositiveMultiplier {
                name: "gap threshold",
            });
        }
        Ok(())
    }
}

/// A detected imbalance zone. `top > bottom` always; candidates violating
/// that are dropped before they enter the list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GapZone {
    pub direction: GapDirection,
    pub top: f64,
    pub bottom: f64,
    pub created_index: usize,
    pub mitigated: bool,
    pub mitigated_index: Option<usize>,
}

impl GapZone {
    pub fn width(&self) -> f64 {
        self.top - self.bottom
    }

    pub fn contains(&self, price: f64) -> bool {
        price >= self.bottom && price <= self.top
    }
}

/// What happened to the zone list on one bar.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ZoneEvents {
    pub formed: Option<GapDirection>,
    /// Wick entered a bullish zone but the close finished back above it.
    pub bullish_bounce: bool,
    /// Wick entered a bearish zone but the close finished back below it.
    pub bearish_bounce: bool,
    /// Zones newly mitigated on this bar.
    pub mitigated: usize,
}

/// Stateful zone tracker, advanced strictly in bar order. One instance per
/// simulated run; instances are never shared across concurrent runs.
#[derive(Debug, Clone)]
pub struct GapZoneTracker {
    config: GapZoneConfig,
    zones: VecDeque<GapZone>,
}

impl GapZoneTracker {
    pub fn new(config: GapZoneConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            zones: VecDeque::new(),
        })
    }

    /// Advance the tracker by one bar.
    ///
    /// Mitigation and bounce checks run against zones formed on earlier bars,
    /// then a new zone may form from the three-candle pattern ending at
    /// `index`. `atr` may be NaN during warmup, which disables ATR-scaled
    /// thresholds (no zone can form until volatility is known).
    pub fn step(&mut self, candles: &[Candle], index: usize, atr: f64) -> ZoneEvents {
        let mut events = ZoneEvents::default();
        let bar = &candles[index];

        for zone in &mut self.zones {
            if !zone.mitigated {
                let hit = match zone.direction {
                    GapDirection::Bullish => bar.low <= zone.bottom,
                    GapDirection::Bearish => bar.high >= zone.top,
                };
                if hit {
                    zone.mitigated = true;
                    zone.mitigated_index = Some(index);
                    events.mitigated += 1;
                }
            }

            // Bounce: wick into the zone, close back outside in the
            // breakout's favor. Independent of mitigation state.
            match zone.direction {
                GapDirection::Bullish => {
                    if zone.contains(bar.low) && bar.close > zone.top {
                        events.bullish_bounce = true;
                    }
                }
                GapDirection::Bearish => {
                    if zone.contains(bar.high) && bar.close < zone.bottom {
                        events.bearish_bounce = true;
                    }
                }
            }
        }

        if index >= 2 {
            events.formed = self.detect(candles, index, atr);
        }

        events
    }

    /// Read-only view of all tracked zones, oldest first.
    pub fn zones(&self) -> impl Iterator<Item = &GapZone> {
        self.zones.iter()
    }

    /// Unmitigated zones of one direction.
    pub fn active_unmitigated(
        &self,
        direction: GapDirection,
    ) -> impl Iterator<Item = &GapZone> {
        self.zones
            .iter()
            .filter(move |z| z.direction == direction && !z.mitigated)
    }

    pub fn active_count(&self, direction: GapDirection) -> usize {
        self.active_unmitigated(direction).count()
    }

    fn detect(&mut self, candles: &[Candle], index: usize, atr: f64) -> Option<GapDirection> {
        let bar = &candles[index];
        let ref_bar = &candles[index - 2];
        let min_gap = self.min_gap(bar.close, atr)?;

        let (direction, top, bottom) = if bar.low > ref_bar.high && bar.low - ref_bar.high > min_gap
        {
            (GapDirection::Bullish, bar.low, ref_bar.high)
        } else if bar.high < ref_bar.low && ref_bar.low - bar.high > min_gap {
            (GapDirection::Bearish, ref_bar.low, bar.high)
        } else {
            return None;
        };

        // Geometrically impossible here, but checked so a bad zone can never
        // reach the signal layer.
        if top <= bottom {
            return None;
        }

        if self.zones.len() == self.config.max_zones {
            self.zones.pop_front();
        }
        self.zones.push_back(GapZone {
            direction,
            top,
            bottom,
            created_index: index,
            mitigated: false,
            mitigated_index: None,
        });
        Some(direction)
    }

    fn min_gap(&self, price: f64, atr: f64) -> Option<f64> {
        match self.config.threshold {
            GapThreshold::AtrMultiple(m) => {
                if atr.is_nan() {
                    None
                } else {
                    Some(m * atr)
                }
            }
            GapThreshold::PricePercent(p) => Some(p * price),
        }
    }
}
