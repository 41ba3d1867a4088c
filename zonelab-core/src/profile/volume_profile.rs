//! Volume-by-price histogram with POC, value area, and HVN/LVN zones.
//!
//! Each candle's volume is distributed across every bin its [low, high] range
//! overlaps, weighted by the fractional overlap. This conserves total input
//! volume exactly; the equal-split-per-bin alternative seen in some
//! implementations does not, and is deliberately not used.

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::domain::Candle;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeProfileConfig {
    /// Number of equal-width price bins.
    pub bins: usize,
    /// Target fraction of total volume inside the value area.
    pub value_area_fraction: f64,
    /// HVN threshold: mean + this many standard deviations of bin volume.
    pub hvn_stddev_mult: f64,
    /// LVN threshold: this fraction of the maximum bin volume.
    pub lvn_max_fraction: f64,
}

impl Default for VolumeProfileConfig {
    fn default() -> Self {
        Self {
            bins: 24,
            value_area_fraction: 0.70,
            hvn_stddev_mult: 1.5,
            lvn_max_fraction: 0.25,
        }
    }
}

impl VolumeProfileConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bins == 0 {
            return Err(ConfigError::ZeroBins);
        }
        if !(self.value_area_fraction > 0.0 && self.value_area_fraction <= 1.0) {
            return Err(ConfigError::InvalidFraction {
                name: "value_area_fraction",
                value: self.value_area_fraction,
            });
        }
        if !(self.lvn_max_fraction > 0.0 && self.lvn_max_fraction <= 1.0) {
            return Err(ConfigError::InvalidFraction {
                name: "lvn_max_fraction",
                value: self.lvn_max_fraction,
            });
        }
        Ok(())
    }
}

/// A contiguous price band (merged from adjacent qualifying bins).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceZone {
    pub low: f64,
    pub high: f64,
}

impl PriceZone {
    pub fn contains(&self, price: f64) -> bool {
        price >= self.low && price <= self.high
    }

    pub fn midpoint(&self) -> f64 {
        (self.low + self.high) / 2.0
    }
}

/// The computed profile for one window.
///
/// `bin_edges` has `bin_volumes.len() + 1` entries. An empty window yields an
/// empty profile (NaN levels, no bins); a flat window yields the single-point
/// profile with poc = vah = val.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeProfile {
    pub poc: f64,
    pub vah: f64,
    pub val: f64,
    pub total_volume: f64,
    pub bin_edges: Vec<f64>,
    pub bin_volumes: Vec<f64>,
    pub hvn_zones: Vec<PriceZone>,
    pub lvn_zones: Vec<PriceZone>,
}

impl VolumeProfile {
    /// Neutral profile for an empty or zero-volume window.
    pub fn empty() -> Self {
        Self {
            poc: f64::NAN,
            vah: f64::NAN,
            val: f64::NAN,
            total_volume: 0.0,
            bin_edges: Vec::new(),
            bin_volumes: Vec::new(),
            hvn_zones: Vec::new(),
            lvn_zones: Vec::new(),
        }
    }

    /// Degenerate profile for a flat-price window.
    pub fn single_point(price: f64, total_volume: f64) -> Self {
        Self {
            poc: price,
            vah: price,
            val: price,
            total_volume,
            bin_edges: vec![price, price],
            bin_volumes: vec![total_volume],
            hvn_zones: Vec::new(),
            lvn_zones: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.poc.is_nan()
    }

    /// Whether `price` falls inside any low-volume zone.
    pub fn contains_lvn(&self, price: f64) -> bool {
        self.lvn_zones.iter().any(|z| z.contains(price))
    }

    /// Distance from `price` to the nearest significant level: POC, VAH,
    /// VAL, or an HVN zone (zero when inside one). NaN for empty profiles.
    pub fn nearest_level_distance(&self, price: f64) -> f64 {
        if self.is_empty() {
            return f64::NAN;
        }
        let mut best = (price - self.poc)
            .abs()
            .min((price - self.vah).abs())
            .min((price - self.val).abs());
        for zone in &self.hvn_zones {
            let d = if zone.contains(price) {
                0.0
            } else {
                (price - zone.low).abs().min((price - zone.high).abs())
            };
            best = best.min(d);
        }
        best
    }
}

/// Build the profile for a window of candles.
pub fn compute_profile(candles: &[Candle], config: &VolumeProfileConfig) -> VolumeProfile {
    if candles.is_empty() || config.bins == 0 {
        return VolumeProfile::empty();
    }

    let min = candles.iter().map(|c| c.low).fold(f64::INFINITY, f64::min);
    let max = candles
        .iter()
        .map(|c| c.high)
        .fold(f64::NEG_INFINITY, f64::max);
    let total_volume: f64 = candles.iter().map(|c| c.volume).sum();

    if total_volume <= 0.0 {
        return VolumeProfile::empty();
    }
    if min == max {
        return VolumeProfile::single_point(min, total_volume);
    }

    let n_bins = config.bins;
    let width = (max - min) / n_bins as f64;
    let bin_edges: Vec<f64> = (0..=n_bins).map(|i| min + width * i as f64).collect();
    let mut bin_volumes = vec![0.0; n_bins];

    for candle in candles {
        distribute(candle, min, width, &mut bin_volumes);
    }

    let poc_bin = max_bin(&bin_volumes);
    let poc = bin_mid(&bin_edges, poc_bin);

    let (va_low_bin, va_high_bin) =
        expand_value_area(&bin_volumes, poc_bin, config.value_area_fraction * total_volume);
    let val = bin_mid(&bin_edges, va_low_bin);
    let vah = bin_mid(&bin_edges, va_high_bin);

    let (hvn_zones, lvn_zones) = node_zones(&bin_volumes, &bin_edges, config);

    VolumeProfile {
        poc,
        vah,
        val,
        total_volume,
        bin_edges,
        bin_volumes,
        hvn_zones,
        lvn_zones,
    }
}

/// Spread one candle's volume across the bins its range overlaps,
/// proportionally to the overlap. A zero-range candle drops its full volume
/// into the bin containing its price.
fn distribute(candle: &Candle, min: f64, width: f64, bin_volumes: &mut [f64]) {
    let n_bins = bin_volumes.len();
    let range = candle.high - candle.low;

    if range <= 0.0 {
        let idx = bin_index(candle.low, min, width, n_bins);
        bin_volumes[idx] += candle.volume;
        return;
    }

    let first = bin_index(candle.low, min, width, n_bins);
    let last = bin_index(candle.high, min, width, n_bins);
    for idx in first..=last {
        let bin_lo = min + width * idx as f64;
        let bin_hi = bin_lo + width;
        let overlap = (candle.high.min(bin_hi) - candle.low.max(bin_lo)).max(0.0);
        bin_volumes[idx] += candle.volume * overlap / range;
    }
}

fn bin_index(price: f64, min: f64, width: f64, n_bins: usize) -> usize {
    (((price - min) / width) as usize).min(n_bins - 1)
}

fn bin_mid(edges: &[f64], idx: usize) -> f64 {
    (edges[idx] + edges[idx + 1]) / 2.0
}

fn max_bin(volumes: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in volumes.iter().enumerate() {
        if v > volumes[best] {
            best = i;
        }
    }
    best
}

/// Grow the value area outward from the POC bin: repeatedly include whichever
/// adjacent bin holds more volume, preferring the lower-price side on ties,
/// until the cumulative volume reaches the target or both edges are exhausted.
fn expand_value_area(volumes: &[f64], poc_bin: usize, target: f64) -> (usize, usize) {
    let n = volumes.len();
    let mut low = poc_bin;
    let mut high = poc_bin;
    let mut cumulative = volumes[poc_bin];

    while cumulative < target && (low > 0 || high + 1 < n) {
        let below = if low > 0 { Some(volumes[low - 1]) } else { None };
        let above = if high + 1 < n {
            Some(volumes[high + 1])
        } else {
            None
        };

        match (below, above) {
            (Some(b), Some(a)) if b >= a => {
                low -= 1;
                cumulative += b;
            }
            (_, Some(a)) => {
                high += 1;
                cumulative += a;
            }
            (Some(b), None) => {
                low -= 1;
                cumulative += b;
            }
            (None, None) => break,
        }
    }

    (low, high)
}

/// Classify bins into high/low volume nodes and merge adjacent qualifying
/// bins into contiguous zones.
fn node_zones(
    volumes: &[f64],
    edges: &[f64],
    config: &VolumeProfileConfig,
) -> (Vec<PriceZone>, Vec<PriceZone>) {
    let n = volumes.len() as f64;
    let mean = volumes.iter().sum::<f64>() / n;
    let variance = volumes.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let hvn_threshold = mean + config.hvn_stddev_mult * variance.sqrt();

    let max_volume = volumes.iter().cloned().fold(0.0, f64::max);
    let lvn_threshold = max_volume * config.lvn_max_fraction;

    let hvn = merge_qualifying(volumes, edges, |v| v >= hvn_threshold && v > 0.0);
    let lvn = merge_qualifying(volumes, edges, |v| v <= lvn_threshold);
    (hvn, lvn)
}

fn merge_qualifying(
    volumes: &[f64],
    edges: &[f64],
    qualifies: impl Fn(f64) -> bool,
) -> Vec<PriceZone> {
    let mut zones = Vec::new();
    let mut start: Option<usize> = None;

    for (i, &v) in volumes.iter().enumerate() {
        if qualifies(v) {
            start.get_or_insert(i);
        } else if let Some(s) = start.take() {
            zones.push(PriceZone {
                low: edges[s],
                high: edges[i],
            });
        }
    }
    if let Some(s) = start {
        zones.push(PriceZone {
            low: edges[s],
            high: edges[volumes.len()],
        });
    }

    zones
}
