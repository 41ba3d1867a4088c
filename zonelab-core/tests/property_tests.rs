//! Property tests for the structural invariants.

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;

use zonelab_core::domain::Candle;
use zonelab_core::indicators::{compute_stoch_rsi, compute_supertrend, StochRsiConfig, SupertrendConfig};
use zonelab_core::profile::{compute_profile, VolumeProfileConfig};
use zonelab_core::zones::{GapThreshold, GapZoneConfig, GapZoneTracker};

/// Build a sane candle series from (close, half-range, volume) triples.
fn build_candles(parts: &[(f64, f64, f64)]) -> Vec<Candle> {
    let base = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
    let mut out = Vec::with_capacity(parts.len());
    for (i, &(close, half_range, volume)) in parts.iter().enumerate() {
        let open = if i == 0 {
            close
        } else {
            parts[i - 1].0
        };
        out.push(Candle {
            timestamp: base + Duration::hours(i as i64),
            open,
            high: open.max(close) + half_range,
            low: open.min(close) - half_range,
            close,
            volume,
        });
    }
    out
}

fn candle_parts(len: usize) -> impl Strategy<Value = Vec<(f64, f64, f64)>> {
    prop::collection::vec(
        (10.0_f64..1000.0, 0.01_f64..5.0, 0.0_f64..10_000.0),
        3..len,
    )
}

proptest! {
    #[test]
    fn profile_level_ordering(parts in candle_parts(60)) {
        let candles = build_candles(&parts);
        let profile = compute_profile(&candles, &VolumeProfileConfig::default());
        if !profile.is_empty() {
            prop_assert!(profile.val <= profile.poc + 1e-9);
            prop_assert!(profile.poc <= profile.vah + 1e-9);
        }
    }

    #[test]
    fn profile_conserves_volume(parts in candle_parts(60)) {
        let candles = build_candles(&parts);
        let profile = compute_profile(&candles, &VolumeProfileConfig::default());
        let input: f64 = candles.iter().map(|c| c.volume).sum();
        if !profile.is_empty() {
            let binned: f64 = profile.bin_volumes.iter().sum();
            prop_assert!((binned - input).abs() < input.max(1.0) * 1e-9);
        }
    }

    #[test]
    fn profile_value_area_covers_fraction(parts in candle_parts(60)) {
        let config = VolumeProfileConfig::default();
        let candles = build_candles(&parts);
        let profile = compute_profile(&candles, &config);
        if !profile.is_empty() && profile.bin_volumes.len() > 1 {
            let mut included = 0.0;
            for i in 0..profile.bin_volumes.len() {
                let mid = (profile.bin_edges[i] + profile.bin_edges[i + 1]) / 2.0;
                if mid >= profile.val && mid <= profile.vah {
                    included += profile.bin_volumes[i];
                }
            }
            let max_bin = profile.bin_volumes.iter().cloned().fold(0.0, f64::max);
            prop_assert!(
                included + max_bin + 1e-9 >= config.value_area_fraction * profile.total_volume
            );
        }
    }

    #[test]
    fn supertrend_direction_and_band_order(parts in candle_parts(80)) {
        let candles = build_candles(&parts);
        let out = compute_supertrend(&candles, &SupertrendConfig::default());
        for i in 0..candles.len() {
            let d = out.direction[i];
            prop_assert!(d.is_nan() || d == 1.0 || d == -1.0);
            if !d.is_nan() {
                prop_assert!(out.final_lower[i] <= out.final_upper[i] + 1e-9);
            }
        }
    }

    #[test]
    fn stoch_rsi_bounded(parts in candle_parts(80)) {
        let candles = build_candles(&parts);
        let snaps = compute_stoch_rsi(&candles, &StochRsiConfig::default());
        for s in &snaps {
            prop_assert!((0.0..=100.0).contains(&s.k));
            prop_assert!((0.0..=100.0).contains(&s.d));
        }
    }

    #[test]
    fn zone_mitigation_is_monotonic(parts in candle_parts(80)) {
        let candles = build_candles(&parts);
        let mut tracker = GapZoneTracker::new(GapZoneConfig {
            threshold: GapThreshold::PricePercent(0.0001),
            max_zones: 50,
        }).unwrap();

        // Track (created_index, mitigated) across steps; once true, a zone
        // must stay true for the rest of the run.
        let mut seen_mitigated: Vec<usize> = Vec::new();
        for i in 0..candles.len() {
            tracker.step(&candles, i, f64::NAN);
            for zone in tracker.zones() {
                let key = zone.created_index;
                if seen_mitigated.contains(&key) {
                    prop_assert!(
                        zone.mitigated,
                        "zone created at {key} reverted to unmitigated at bar {i}"
                    );
                } else if zone.mitigated {
                    prop_assert!(zone.mitigated_index.is_some());
                    seen_mitigated.push(key);
                }
            }
        }
    }

    #[test]
    fn zone_geometry_always_valid(parts in candle_parts(80)) {
        let candles = build_candles(&parts);
        let mut tracker = GapZoneTracker::new(GapZoneConfig {
            threshold: GapThreshold::PricePercent(0.0001),
            max_zones: 50,
        }).unwrap();
        for i in 0..candles.len() {
            tracker.step(&candles, i, f64::NAN);
        }
        for zone in tracker.zones() {
            prop_assert!(zone.top > zone.bottom);
        }
    }
}
