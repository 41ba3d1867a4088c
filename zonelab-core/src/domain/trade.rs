//! TradeRecord — a completed round-trip trade.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::position::ExitReason;
use super::signal::Direction;

/// A complete round-trip trade record: entry → exit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRecord {
    pub entry_time: DateTime<Utc>,
    pub exit_time: DateTime<Utc>,
    pub direction: Direction,
    pub units: f64,
    pub entry_price: f64,
    pub exit_price: f64,
    /// Net P&L after configured spread and commission.
    pub pnl: f64,
    pub exit_reason: ExitReason,
}

impl TradeRecord {
    pub fn is_winner(&self) -> bool {
        self.pnl > 0.0
    }

    /// Return as a fraction of entry notional.
    pub fn return_pct(&self) -> f64 {
        let notional = self.entry_price * self.units;
        if notional == 0.0 {
            return 0.0;
        }
        self.pnl / notional
    }
}
