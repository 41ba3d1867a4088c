//! Volume profile — volume-by-price histogram over a candle window.

pub mod volume_profile;

pub use volume_profile::{compute_profile, PriceZone, VolumeProfile, VolumeProfileConfig};
