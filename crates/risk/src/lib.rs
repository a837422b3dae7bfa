// In crates/risk/src/lib.rs

use core_types::{OrderIntent, Signal, Symbol};
use rust_decimal::Decimal;

pub mod error;
pub mod single_position;
pub mod sizer;
pub mod types;

// Re-export public types
pub use error::{Error, Result};
pub use single_position::SinglePositionManager;
pub use sizer::PositionSizer;
pub use types::SizingSettings;

/// Account figures the sizing step needs. Either may be unavailable.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AccountSnapshot {
    pub equity: Option<Decimal>,
    pub reference_price: Option<Decimal>,
}

/// The universal interface for a risk management module.
///
/// A `RiskManager` gates a trading `Signal` against the current position state and,
/// if approved, sizes it into an `OrderIntent`. Implementations are pure: the same
/// inputs always produce the same intent.
pub trait RiskManager: Sync {
    /// The name of the risk management strategy.
    fn name(&self) -> &'static str;

    /// Turns a signal into an order intent, or `None` when nothing should be traded.
    ///
    /// # Arguments
    ///
    /// * `signal`: The `Signal` produced by the strategy for this cycle.
    /// * `symbol`: The instrument the signal was generated for.
    /// * `has_open_position`: Whether the instrument already has an open position.
    /// * `account`: Equity and reference price used for sizing.
    fn evaluate(
        &self,
        signal: &Signal,
        symbol: &Symbol,
        has_open_position: bool,
        account: &AccountSnapshot,
    ) -> Option<OrderIntent>;
}
