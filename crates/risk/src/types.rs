// In crates/risk/src/types.rs

use serde::{Deserialize, Serialize};

/// Settings for the fixed-fractional position sizer.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct SizingSettings {
    /// Share of account equity put at risk per trade, in percent (e.g., 1.0 for 1%).
    pub risk_percent: f64,
    /// Quote notional of one lot. The standard-lot convention is 100000 units.
    pub lot_notional: f64,
    /// Order size used when equity or the reference price is unavailable.
    pub default_size: f64,
    /// Smallest order size the broker accepts.
    pub min_size: f64,
}

impl Default for SizingSettings {
    fn default() -> Self {
        Self {
            risk_percent: 1.0,
            lot_notional: 100_000.0,
            default_size: 0.1,
            min_size: 0.01,
        }
    }
}
