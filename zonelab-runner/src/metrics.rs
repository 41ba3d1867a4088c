//! Performance metrics — pure functions over equity curves and trade lists.
//!
//! No dependencies on the runner or the engine; everything here is a scalar
//! function of the run's outputs.

use serde::{Deserialize, Serialize};
use zonelab_core::domain::TradeRecord;

/// Bars per year used to annualize the Sharpe ratio. Daily-bar convention.
pub const DEFAULT_PERIODS_PER_YEAR: f64 = 252.0;

/// Aggregate performance metrics for a single backtest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub total_trades: usize,
    pub win_rate: f64,
    pub profit_factor: f64,
    /// Worst peak-to-trough equity decline as a positive fraction.
    pub max_drawdown_pct: f64,
    pub sharpe_ratio: f64,
    pub final_balance: f64,
}

impl PerformanceMetrics {
    pub fn compute(equity_curve: &[f64], trades: &[TradeRecord], final_balance: f64) -> Self {
        Self {
            total_trades: trades.len(),
            win_rate: win_rate(trades),
            profit_factor: profit_factor(trades),
            max_drawdown_pct: max_drawdown_pct(equity_curve),
            sharpe_ratio: sharpe_ratio(equity_curve, DEFAULT_PERIODS_PER_YEAR),
            final_balance,
        }
    }
}

/// Fraction of trades that closed profitable. 0.0 for an empty ledger.
pub fn win_rate(trades: &[TradeRecord]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let winners = trades.iter().filter(|t| t.is_winner()).count();
    winners as f64 / trades.len() as f64
}

/// Gross profits over gross losses, capped at 100 for loss-free ledgers.
pub fn profit_factor(trades: &[TradeRecord]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let gross_profit: f64 = trades.iter().filter(|t| t.pnl > 0.0).map(|t| t.pnl).sum();
    let gross_loss: f64 = trades
        .iter()
        .filter(|t| t.pnl < 0.0)
        .map(|t| t.pnl.abs())
        .sum();

    if gross_loss < 1e-10 {
        return if gross_profit > 0.0 { 100.0 } else { 0.0 };
    }
    (gross_profit / gross_loss).min(100.0)
}

/// Maximum drawdown as a positive fraction of the running peak.
pub fn max_drawdown_pct(equity_curve: &[f64]) -> f64 {
    if equity_curve.len() < 2 {
        return 0.0;
    }
    let mut peak = equity_curve[0];
    let mut max_dd = 0.0_f64;

    for &eq in equity_curve {
        if eq > peak {
            peak = eq;
        }
        if peak > 0.0 {
            let dd = (peak - eq) / peak;
            if dd > max_dd {
                max_dd = dd;
            }
        }
    }
    max_dd
}

/// Annualized Sharpe ratio from per-bar returns, zero risk-free rate.
/// 0.0 when the variance vanishes or fewer than 3 bars exist.
pub fn sharpe_ratio(equity_curve: &[f64], periods_per_year: f64) -> f64 {
    let returns = bar_returns(equity_curve);
    if returns.len() < 2 {
        return 0.0;
    }
    let mean = returns.iter().sum::<f64>() / returns.len() as f64;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>()
        / (returns.len() - 1) as f64;
    let std = variance.sqrt();
    if std < 1e-15 {
        return 0.0;
    }
    (mean / std) * periods_per_year.sqrt()
}

fn bar_returns(equity_curve: &[f64]) -> Vec<f64> {
    equity_curve
        .windows(2)
        .map(|w| if w[0] > 0.0 { (w[1] - w[0]) / w[0] } else { 0.0 })
        .collect()
}
