//! Position sizing — the simulator's external collaborator.
//!
//! The simulator asks the sizer for a unit count given the account balance
//! and the entry/stop pair; a non-positive answer skips the trade.

/// Collaborator contract: balance + bracket geometry in, units out.
pub trait PositionSizer: Send + Sync {
    fn size(&self, balance: f64, entry_price: f64, stop_loss: f64) -> f64;

    fn name(&self) -> &str;
}

/// Risk a fixed fraction of the balance against the entry-to-stop distance.
///
/// units = balance * risk_fraction / |entry - stop|
#[derive(Debug, Clone)]
pub struct FixedFractionalSizer {
    risk_fraction: f64,
}

impl FixedFractionalSizer {
    pub fn new(risk_fraction: f64) -> Self {
        assert!(
            risk_fraction > 0.0 && risk_fraction < 1.0,
            "risk_fraction must be in (0, 1)"
        );
        Self { risk_fraction }
    }
}

impl PositionSizer for FixedFractionalSizer {
    fn size(&self, balance: f64, entry_price: f64, stop_loss: f64) -> f64 {
        if balance <= 0.0 {
            return 0.0;
        }
        let stop_distance = (entry_price - stop_loss).abs();
        if stop_distance <= 0.0 {
            return 0.0;
        }
        balance * self.risk_fraction / stop_distance
    }

    fn name(&self) -> &str {
        "fixed_fractional"
    }
}

/// Constant unit count regardless of balance. Test and calibration stub.
#[derive(Debug, Clone)]
pub struct FixedUnitsSizer {
    units: f64,
}

impl FixedUnitsSizer {
    pub fn new(units: f64) -> Self {
        Self { units }
    }
}

impl PositionSizer for FixedUnitsSizer {
    fn size(&self, balance: f64, _entry_price: f64, _stop_loss: f64) -> f64 {
        if balance <= 0.0 {
            return 0.0;
        }
        self.units
    }

    fn name(&self) -> &str {
        "fixed_units"
    }
}
