//! Position simulator — replays signals against raw OHLC bars.
//!
//! State machine per run: no position → open → closed, at most one open
//! position at a time. Bracket levels are checked against each bar's
//! [low, high] range; when both the stop and the target are touched inside
//! the same bar the stop resolves first. That is a deliberate conservative
//! policy — with only OHLC data the intrabar path is unknown, so the
//! simulator books the worse outcome rather than guess.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{Candle, Direction, ExitReason, Position, Signal, SignalKind, TradeRecord};
use crate::engine::sizer::PositionSizer;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    pub initial_balance: f64,
    /// Per-unit round-trip spread cost.
    pub spread: f64,
    /// Flat round-trip commission per trade.
    pub commission: f64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            initial_balance: 100_000.0,
            spread: 0.0,
            commission: 0.0,
        }
    }
}

/// Result of a completed simulation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationResult {
    pub trades: Vec<TradeRecord>,
    /// Mark-to-market equity at each bar close.
    pub equity_curve: Vec<f64>,
    pub initial_balance: f64,
    /// Realized balance (cash); excludes any still-open position.
    pub final_balance: f64,
    pub peak_balance: f64,
    /// Worst peak-to-trough equity decline as a positive fraction.
    pub max_drawdown: f64,
}

/// Stateful simulator, advanced one bar at a time in chronological order.
pub struct PositionSimulator<'a> {
    config: SimulatorConfig,
    sizer: &'a dyn PositionSizer,
    balance: f64,
    open: Option<Position>,
    next_id: u64,
    trades: Vec<TradeRecord>,
    equity_curve: Vec<f64>,
    peak_equity: f64,
    max_drawdown: f64,
}

impl<'a> PositionSimulator<'a> {
    pub fn new(config: SimulatorConfig, sizer: &'a dyn PositionSizer) -> Self {
        let balance = config.initial_balance;
        Self {
            config,
            sizer,
            balance,
            open: None,
            next_id: 1,
            trades: Vec::new(),
            equity_curve: Vec::new(),
            peak_equity: balance,
            max_drawdown: 0.0,
        }
    }

    /// Direction of the currently open position, if any. Fed back into the
    /// signal engine for exit evaluation.
    pub fn open_direction(&self) -> Option<Direction> {
        self.open.as_ref().map(|p| p.direction)
    }

    /// Advance one bar: resolve the open position's bracket, then act on the
    /// bar's signal, then mark equity.
    pub fn step(&mut self, candle: &Candle, index: usize, signal: Option<&Signal>) {
        if let Some(position) = self.open.take() {
            self.open = self.manage_open(position, candle, index, signal);
        }

        if self.open.is_none() {
            if let Some(signal) = signal {
                if signal.kind.is_entry() {
                    self.try_open(candle, index, signal);
                }
            }
        }

        let equity = self.balance
            + self
                .open
                .as_ref()
                .map(|p| p.unrealized_pnl(candle.close))
                .unwrap_or(0.0);
        self.equity_curve.push(equity);

        if equity > self.peak_equity {
            self.peak_equity = equity;
        }
        if self.peak_equity > 0.0 {
            let drawdown = (self.peak_equity - equity) / self.peak_equity;
            if drawdown > self.max_drawdown {
                self.max_drawdown = drawdown;
            }
        }
    }

    /// Finish the run. Any still-open position stays open (unrealized); the
    /// final balance reflects realized trades only.
    pub fn finish(self) -> SimulationResult {
        SimulationResult {
            trades: self.trades,
            equity_curve: self.equity_curve,
            initial_balance: self.config.initial_balance,
            final_balance: self.balance,
            peak_balance: self.peak_equity,
            max_drawdown: self.max_drawdown,
        }
    }

    fn manage_open(
        &mut self,
        position: Position,
        candle: &Candle,
        index: usize,
        signal: Option<&Signal>,
    ) -> Option<Position> {
        // Bracket levels apply from the bar after entry; the entry bar's
        // close is the fill itself.
        if index > position.entry_index {
            let (stop_hit, target_hit) = match position.direction {
                Direction::Long => (
                    candle.low <= position.stop_loss,
                    candle.high >= position.take_profit,
                ),
                Direction::Short => (
                    candle.high >= position.stop_loss,
                    candle.low <= position.take_profit,
                ),
            };

            // Stop before target when both are touched in one bar.
            if stop_hit {
                let stop_loss = position.stop_loss;
                self.close(position, candle, stop_loss, ExitReason::StopLoss);
                return None;
            }
            if target_hit {
                let take_profit = position.take_profit;
                self.close(
                    position,
                    candle,
                    take_profit,
                    ExitReason::TakeProfit,
                );
                return None;
            }
        }

        if let Some(signal) = signal {
            let explicit_exit = matches!(
                (signal.kind, position.direction),
                (SignalKind::ExitLong, Direction::Long)
                    | (SignalKind::ExitShort, Direction::Short)
            );
            let flip = signal.kind.is_entry() && signal.kind.direction() != position.direction;
            if explicit_exit || flip {
                self.close(position, candle, signal.price, ExitReason::SignalExit);
                return None;
            }
        }

        Some(position)
    }

    fn try_open(&mut self, candle: &Candle, index: usize, signal: &Signal) {
        let (stop_loss, take_profit) = match (signal.stop_loss, signal.take_profit) {
            (Some(stop), Some(target)) => (stop, target),
            _ => return, // entry without a bracket is malformed; skip it
        };

        let units = self.sizer.size(self.balance, signal.price, stop_loss);
        if units <= 0.0 {
            return;
        }

        let position = Position::open(
            self.next_id,
            signal.kind.direction(),
            units,
            index,
            candle.timestamp,
            signal.price,
            stop_loss,
            take_profit,
        );
        debug!(
            id = position.id,
            direction = ?position.direction,
            units,
            entry = signal.price,
            "open position"
        );
        self.next_id += 1;
        self.open = Some(position);
    }

    fn close(&mut self, mut position: Position, candle: &Candle, exit_price: f64, reason: ExitReason) {
        let gross = (exit_price - position.entry_price) * position.units * position.direction.sign();
        let cost = self.config.commission + self.config.spread * position.units;
        let pnl = gross - cost;

        position.status = crate::domain::PositionStatus::Closed;
        position.exit_price = Some(exit_price);
        position.exit_reason = Some(reason);
        position.realized_pnl = Some(pnl);

        self.balance += pnl;
        debug!(id = position.id, ?reason, pnl, "close position");

        self.trades.push(TradeRecord {
            entry_time: position.entry_time,
            exit_time: candle.timestamp,
            direction: position.direction,
            units: position.units,
            entry_price: position.entry_price,
            exit_price,
            pnl,
            exit_reason: reason,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::sizer::FixedUnitsSizer;
    use chrono::TimeZone;

    fn candle_at(hour: i64, open: f64, high: f64, low: f64, close: f64) -> Candle {
        let base = chrono::Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        Candle {
            timestamp: base + chrono::Duration::hours(hour),
            open,
            high,
            low,
            close,
            volume: 1000.0,
        }
    }

    fn long_signal(price: f64, stop: f64, target: f64, hour: i64) -> Signal {
        Signal {
            kind: SignalKind::Long,
            timestamp: chrono::Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap()
                + chrono::Duration::hours(hour),
            price,
            strength: 1.0,
            stop_loss: Some(stop),
            take_profit: Some(target),
            reasons: vec![],
        }
    }

    fn sim_config(balance: f64) -> SimulatorConfig {
        SimulatorConfig {
            initial_balance: balance,
            spread: 0.0,
            commission: 0.0,
        }
    }

    #[test]
    fn stop_fills_at_stop_price() {
        // Entry 1.1000, stop 1.0950, target 1.1100; next bar's range
        // reaches the stop only → stop_loss at 1.0950.
        let sizer = FixedUnitsSizer::new(100.0);
        let mut sim = PositionSimulator::new(sim_config(10_000.0), &sizer);

        let entry_bar = candle_at(0, 1.0995, 1.1005, 1.0990, 1.1000);
        let signal = long_signal(1.1000, 1.0950, 1.1100, 0);
        sim.step(&entry_bar, 0, Some(&signal));
        assert_eq!(sim.open_direction(), Some(Direction::Long));

        let wide_bar = candle_at(1, 1.1000, 1.1050, 1.0940, 1.1000);
        sim.step(&wide_bar, 1, None);

        let result = sim.finish();
        assert_eq!(result.trades.len(), 1);
        let trade = &result.trades[0];
        assert_eq!(trade.exit_reason, ExitReason::StopLoss);
        assert_eq!(trade.exit_price, 1.0950);
        assert!((trade.pnl - (1.0950 - 1.1000) * 100.0).abs() < 1e-9);
    }

    #[test]
    fn stop_resolves_before_target_when_both_touched() {
        // One bar spans both bracket levels; the conservative tie-break
        // books the stop.
        let sizer = FixedUnitsSizer::new(100.0);
        let mut sim = PositionSimulator::new(sim_config(10_000.0), &sizer);

        let signal = long_signal(1.1000, 1.0950, 1.1100, 0);
        sim.step(&candle_at(0, 1.0995, 1.1005, 1.0990, 1.1000), 0, Some(&signal));
        sim.step(&candle_at(1, 1.1000, 1.1150, 1.0940, 1.1010), 1, None);

        let result = sim.finish();
        assert_eq!(result.trades[0].exit_reason, ExitReason::StopLoss);
        assert_eq!(result.trades[0].exit_price, 1.0950);
    }

    #[test]
    fn take_profit_fills_when_stop_untouched() {
        let sizer = FixedUnitsSizer::new(100.0);
        let mut sim = PositionSimulator::new(sim_config(10_000.0), &sizer);

        let signal = long_signal(1.1000, 1.0950, 1.1100, 0);
        sim.step(&candle_at(0, 1.0995, 1.1005, 1.0990, 1.1000), 0, Some(&signal));
        sim.step(&candle_at(1, 1.1000, 1.1120, 1.0990, 1.1110), 1, None);

        let result = sim.finish();
        assert_eq!(result.trades[0].exit_reason, ExitReason::TakeProfit);
        assert_eq!(result.trades[0].exit_price, 1.1100);
        assert!(result.final_balance > result.initial_balance);
    }

    #[test]
    fn entry_bar_bracket_not_evaluated() {
        // The entry bar's own range spans the stop; the fill happens at the
        // close, so the stop must not trigger until the next bar.
        let sizer = FixedUnitsSizer::new(100.0);
        let mut sim = PositionSimulator::new(sim_config(10_000.0), &sizer);

        let signal = long_signal(1.1000, 1.0950, 1.1100, 0);
        sim.step(&candle_at(0, 1.0940, 1.1010, 1.0930, 1.1000), 0, Some(&signal));

        assert_eq!(sim.open_direction(), Some(Direction::Long));
    }

    #[test]
    fn short_bracket_mirrors_long() {
        let sizer = FixedUnitsSizer::new(100.0);
        let mut sim = PositionSimulator::new(sim_config(10_000.0), &sizer);

        let signal = Signal {
            kind: SignalKind::Short,
            stop_loss: Some(1.1050),
            take_profit: Some(1.0900),
            ..long_signal(1.1000, 0.0, 0.0, 0)
        };
        sim.step(&candle_at(0, 1.1005, 1.1010, 1.0995, 1.1000), 0, Some(&signal));
        // Bar touches the short stop (high above 1.1050)
        sim.step(&candle_at(1, 1.1000, 1.1060, 1.0995, 1.1040), 1, None);

        let result = sim.finish();
        assert_eq!(result.trades[0].exit_reason, ExitReason::StopLoss);
        assert!((result.trades[0].pnl - (1.1000 - 1.1050) * 100.0).abs() < 1e-9);
    }

    #[test]
    fn explicit_exit_signal_closes_at_signal_price() {
        let sizer = FixedUnitsSizer::new(100.0);
        let mut sim = PositionSimulator::new(sim_config(10_000.0), &sizer);

        let entry = long_signal(1.1000, 1.0950, 1.1100, 0);
        sim.step(&candle_at(0, 1.0995, 1.1005, 1.0990, 1.1000), 0, Some(&entry));

        let exit = Signal {
            kind: SignalKind::ExitLong,
            stop_loss: None,
            take_profit: None,
            ..long_signal(1.1030, 0.0, 0.0, 1)
        };
        sim.step(&candle_at(1, 1.1000, 1.1040, 1.0995, 1.1030), 1, Some(&exit));

        let result = sim.finish();
        assert_eq!(result.trades[0].exit_reason, ExitReason::SignalExit);
        assert_eq!(result.trades[0].exit_price, 1.1030);
    }

    #[test]
    fn opposite_entry_flips_position() {
        let sizer = FixedUnitsSizer::new(100.0);
        let mut sim = PositionSimulator::new(sim_config(10_000.0), &sizer);

        let entry = long_signal(1.1000, 1.0950, 1.1100, 0);
        sim.step(&candle_at(0, 1.0995, 1.1005, 1.0990, 1.1000), 0, Some(&entry));

        let short = Signal {
            kind: SignalKind::Short,
            stop_loss: Some(1.1070),
            take_profit: Some(1.0920),
            ..long_signal(1.1020, 0.0, 0.0, 1)
        };
        sim.step(&candle_at(1, 1.1000, 1.1030, 1.0995, 1.1020), 1, Some(&short));

        let result_direction = sim.open_direction();
        assert_eq!(result_direction, Some(Direction::Short));
        let result = sim.finish();
        assert_eq!(result.trades.len(), 1);
        assert_eq!(result.trades[0].exit_reason, ExitReason::SignalExit);
    }

    #[test]
    fn zero_size_skips_trade() {
        let sizer = FixedUnitsSizer::new(0.0);
        let mut sim = PositionSimulator::new(sim_config(10_000.0), &sizer);
        let signal = long_signal(1.1000, 1.0950, 1.1100, 0);
        sim.step(&candle_at(0, 1.0995, 1.1005, 1.0990, 1.1000), 0, Some(&signal));
        assert_eq!(sim.open_direction(), None);
    }

    #[test]
    fn balance_conserved_over_trades() {
        let sizer = FixedUnitsSizer::new(100.0);
        let mut sim = PositionSimulator::new(sim_config(10_000.0), &sizer);

        // Win then lose
        sim.step(
            &candle_at(0, 1.0995, 1.1005, 1.0990, 1.1000),
            0,
            Some(&long_signal(1.1000, 1.0950, 1.1100, 0)),
        );
        sim.step(&candle_at(1, 1.1000, 1.1120, 1.0990, 1.1110), 1, None);
        sim.step(
            &candle_at(2, 1.1110, 1.1120, 1.1100, 1.1110),
            2,
            Some(&long_signal(1.1110, 1.1060, 1.1210, 2)),
        );
        sim.step(&candle_at(3, 1.1110, 1.1115, 1.1050, 1.1060), 3, None);

        let result = sim.finish();
        assert_eq!(result.trades.len(), 2);
        let pnl_sum: f64 = result.trades.iter().map(|t| t.pnl).sum();
        assert!((result.final_balance - (result.initial_balance + pnl_sum)).abs() < 1e-9);
    }

    #[test]
    fn costs_reduce_pnl() {
        let sizer = FixedUnitsSizer::new(100.0);
        let config = SimulatorConfig {
            initial_balance: 10_000.0,
            spread: 0.0001,
            commission: 1.0,
        };
        let mut sim = PositionSimulator::new(config, &sizer);
        sim.step(
            &candle_at(0, 1.0995, 1.1005, 1.0990, 1.1000),
            0,
            Some(&long_signal(1.1000, 1.0950, 1.1100, 0)),
        );
        sim.step(&candle_at(1, 1.1000, 1.1120, 1.0990, 1.1110), 1, None);

        let result = sim.finish();
        let gross = (1.1100 - 1.1000) * 100.0;
        let expected = gross - 1.0 - 0.0001 * 100.0;
        assert!((result.trades[0].pnl - expected).abs() < 1e-9);
    }

    #[test]
    fn drawdown_tracked_from_peak() {
        let sizer = FixedUnitsSizer::new(100.0);
        let mut sim = PositionSimulator::new(sim_config(10_000.0), &sizer);

        // Ride a position up, then down past entry before the stop
        sim.step(
            &candle_at(0, 1.0995, 1.1005, 1.0990, 1.1000),
            0,
            Some(&long_signal(1.1000, 1.0900, 1.1500, 0)),
        );
        sim.step(&candle_at(1, 1.1000, 1.1210, 1.0990, 1.1200), 1, None);
        sim.step(&candle_at(2, 1.1200, 1.1205, 1.0995, 1.1000), 2, None);

        let result = sim.finish();
        assert!(result.max_drawdown > 0.0);
        assert!(result.peak_balance > result.initial_balance);
    }

    #[test]
    fn no_signals_no_trades() {
        let sizer = FixedUnitsSizer::new(100.0);
        let mut sim = PositionSimulator::new(sim_config(10_000.0), &sizer);
        for i in 0..10 {
            sim.step(&candle_at(i, 1.1, 1.11, 1.09, 1.1), i as usize, None);
        }
        let result = sim.finish();
        assert!(result.trades.is_empty());
        assert_eq!(result.final_balance, result.initial_balance);
        assert_eq!(result.equity_curve.len(), 10);
        assert!(result.equity_curve.iter().all(|&e| e == 10_000.0));
    }
}
