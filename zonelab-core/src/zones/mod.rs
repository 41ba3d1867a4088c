//! Price-imbalance zone tracking.

pub mod gap;

pub use gap::{GapDirection, GapThreshold, GapZone, GapZoneConfig, GapZoneTracker, ZoneEvents};
