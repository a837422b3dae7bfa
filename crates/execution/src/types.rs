// In crates/execution/src/types.rs

use core_types::{Side, Symbol};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// A position opened by a simulated fill.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedPosition {
    pub side: Side,
    pub size: Decimal,
    pub entry_price: Decimal,
}

/// Represents the state of the simulated trading portfolio.
#[derive(Debug)]
pub struct Portfolio {
    /// The total cash balance of the portfolio (e.g., in USDT).
    pub cash: Decimal,

    /// A map holding the currently open positions, keyed by symbol.
    pub open_positions: HashMap<Symbol, SimulatedPosition>,
}

impl Portfolio {
    /// Creates a new portfolio with an initial cash balance.
    pub fn new(initial_cash: Decimal) -> Self {
        Self {
            cash: initial_cash,
            open_positions: HashMap::new(),
        }
    }

    pub fn has_position(&self, symbol: &Symbol) -> bool {
        self.open_positions.contains_key(symbol)
    }
}

/// A portfolio shared between the paper executor and the account view of it.
pub type SharedPortfolio = Arc<Mutex<Portfolio>>;
