// In crates/risk/src/single_position.rs

use crate::sizer::PositionSizer;
use crate::types::SizingSettings;
use crate::{AccountSnapshot, Result, RiskManager};
use core_types::{OrderIntent, Signal, Symbol};

/// A risk manager that allows one position per instrument at a time.
///
/// While a position is open every signal is ignored: no pyramiding and no
/// reversal. Otherwise entry signals are sized with a [`PositionSizer`].
#[derive(Debug, Clone)]
pub struct SinglePositionManager {
    sizer: PositionSizer,
}

impl SinglePositionManager {
    pub fn new(settings: &SizingSettings) -> Result<Self> {
        Ok(Self {
            sizer: PositionSizer::new(settings)?,
        })
    }
}

impl RiskManager for SinglePositionManager {
    fn name(&self) -> &'static str {
        "SinglePositionManager"
    }

    fn evaluate(
        &self,
        signal: &Signal,
        symbol: &Symbol,
        has_open_position: bool,
        account: &AccountSnapshot,
    ) -> Option<OrderIntent> {
        if has_open_position {
            return None;
        }

        let side = signal.side()?;
        let size = self.sizer.size(account.equity, account.reference_price);

        Some(OrderIntent {
            symbol: symbol.clone(),
            side,
            size,
        })
    }
}
