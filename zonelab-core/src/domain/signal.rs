//! Signal — an immutable per-bar trading decision.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Direction of a trade or position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// +1.0 for long, -1.0 for short. Used in P&L arithmetic.
    pub fn sign(&self) -> f64 {
        match self {
            Direction::Long => 1.0,
            Direction::Short => -1.0,
        }
    }

    pub fn opposite(&self) -> Direction {
        match self {
            Direction::Long => Direction::Short,
            Direction::Short => Direction::Long,
        }
    }
}

/// What a signal asks the simulator to do.
///
/// "No signal" is represented by `Option::<Signal>::None` at the evaluation
/// seam, so the emitted stream only carries actionable records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalKind {
    Long,
    Short,
    ExitLong,
    ExitShort,
}

impl SignalKind {
    pub fn is_entry(&self) -> bool {
        matches!(self, SignalKind::Long | SignalKind::Short)
    }

    pub fn is_exit(&self) -> bool {
        !self.is_entry()
    }

    /// Direction of the position this signal opens (entries) or closes (exits).
    pub fn direction(&self) -> Direction {
        match self {
            SignalKind::Long | SignalKind::ExitLong => Direction::Long,
            SignalKind::Short | SignalKind::ExitShort => Direction::Short,
        }
    }
}

/// An immutable signal record, created once per evaluated bar and never
/// mutated afterward.
///
/// Entries carry bracket levels; exits carry only the reference price.
/// `reasons` lists the confluence factors that fired, for report traceability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    pub kind: SignalKind,
    pub timestamp: DateTime<Utc>,
    pub price: f64,
    /// Confluence strength in [0, 1].
    pub strength: f64,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
    pub reasons: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn kind_classification() {
        assert!(SignalKind::Long.is_entry());
        assert!(SignalKind::Short.is_entry());
        assert!(SignalKind::ExitLong.is_exit());
        assert!(SignalKind::ExitShort.is_exit());
        assert_eq!(SignalKind::ExitShort.direction(), Direction::Short);
    }

    #[test]
    fn direction_sign_and_opposite() {
        assert_eq!(Direction::Long.sign(), 1.0);
        assert_eq!(Direction::Short.sign(), -1.0);
        assert_eq!(Direction::Long.opposite(), Direction::Short);
    }

    #[test]
    fn signal_serialization_roundtrip() {
        let signal = Signal {
            kind: SignalKind::Long,
            timestamp: Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap(),
            price: 1.1000,
            strength: 0.75,
            stop_loss: Some(1.0950),
            take_profit: Some(1.1100),
            reasons: vec!["htf_trend_up".into(), "stochrsi_recovery".into()],
        };
        let json = serde_json::to_string(&signal).unwrap();
        let deser: Signal = serde_json::from_str(&json).unwrap();
        assert_eq!(deser.kind, SignalKind::Long);
        assert_eq!(deser.stop_loss, Some(1.0950));
        assert_eq!(deser.reasons.len(), 2);
    }
}
