//! Position — the simulator's single unit of open market exposure.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::signal::Direction;

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    StopLoss,
    TakeProfit,
    SignalExit,
}

impl ExitReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExitReason::StopLoss => "stop_loss",
            ExitReason::TakeProfit => "take_profit",
            ExitReason::SignalExit => "signal_exit",
        }
    }
}

/// Lifecycle state of a position. "No position" is `Option::None` on the
/// simulator, so there is no separate flat variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionStatus {
    Open,
    Closed,
}

/// An open or closed position. Created by the simulator on an entry signal,
/// mutated only by the simulator, archived as a `TradeRecord` on close.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub id: u64,
    pub direction: Direction,
    pub units: f64,
    pub entry_index: usize,
    pub entry_time: DateTime<Utc>,
    pub entry_price: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub status: PositionStatus,
    pub exit_price: Option<f64>,
    pub exit_reason: Option<ExitReason>,
    pub realized_pnl: Option<f64>,
}

impl Position {
    pub fn open(
        id: u64,
        direction: Direction,
        units: f64,
        entry_index: usize,
        entry_time: DateTime<Utc>,
        entry_price: f64,
        stop_loss: f64,
        take_profit: f64,
    ) -> Self {
        Self {
            id,
            direction,
            units,
            entry_index,
            entry_time,
            entry_price,
            stop_loss,
            take_profit,
            status: PositionStatus::Open,
            exit_price: None,
            exit_reason: None,
            realized_pnl: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == PositionStatus::Open
    }

    /// P&L if the position were closed at `price`, before costs.
    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        (price - self.entry_price) * self.units * self.direction.sign()
    }
}
