//! Confluence signal generation.

pub mod confluence;
pub mod generator;

pub use confluence::ConfluenceWeights;
pub use generator::{BarSnapshot, SignalConfig, SignalEngine};
