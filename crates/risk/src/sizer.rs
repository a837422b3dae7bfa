// In crates/risk/src/sizer.rs

use crate::types::SizingSettings;
use crate::{Error, Result};
use num_traits::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

/// Lot sizes are quoted with this many decimal places.
const SIZE_SCALE: u32 = 2;

/// Converts account equity and a risk percentage into an order size in lots.
///
/// `size = floor2(equity * risk% / 100 / (price * lot_notional))`, never below the
/// broker minimum. Missing or unusable inputs fall back to the default size.
#[derive(Debug, Clone)]
pub struct PositionSizer {
    risk_percent: Decimal,
    lot_notional: Decimal,
    default_size: Decimal,
    min_size: Decimal,
}

impl PositionSizer {
    pub fn new(settings: &SizingSettings) -> Result<Self> {
        let risk_percent = to_decimal("risk_percent", settings.risk_percent)?;
        if risk_percent <= Decimal::ZERO || risk_percent > dec!(100) {
            return Err(Error::InvalidParameters(format!(
                "risk_percent must be in (0, 100], got {}",
                settings.risk_percent
            )));
        }

        let lot_notional = to_decimal("lot_notional", settings.lot_notional)?;
        if lot_notional <= Decimal::ZERO {
            return Err(Error::InvalidParameters("lot_notional must be positive".to_string()));
        }

        let min_size = to_lot_size("min_size", settings.min_size)?;
        let default_size = to_lot_size("default_size", settings.default_size)?;
        if default_size < min_size {
            return Err(Error::InvalidParameters(format!(
                "default_size ({default_size}) is below min_size ({min_size})"
            )));
        }

        Ok(Self {
            risk_percent,
            lot_notional,
            default_size,
            min_size,
        })
    }

    /// Sizes an order. Always returns at least the minimum size.
    pub fn size(&self, equity: Option<Decimal>, reference_price: Option<Decimal>) -> Decimal {
        self.risk_sized(equity, reference_price)
            .unwrap_or(self.default_size)
    }

    fn risk_sized(&self, equity: Option<Decimal>, reference_price: Option<Decimal>) -> Option<Decimal> {
        let equity = equity.filter(|e| !e.is_sign_negative())?;
        let price = reference_price.filter(|p| *p > Decimal::ZERO)?;

        let risk_amount = equity.checked_mul(self.risk_percent)?.checked_div(dec!(100))?;
        let lot_value = price.checked_mul(self.lot_notional)?;
        let raw = risk_amount.checked_div(lot_value)?;

        let floored = raw.round_dp_with_strategy(SIZE_SCALE, RoundingStrategy::ToZero);
        Some(floored.max(self.min_size))
    }
}

fn to_decimal(name: &str, value: f64) -> Result<Decimal> {
    Decimal::from_f64(value)
        .ok_or_else(|| Error::InvalidParameters(format!("{name} is not a finite number: {value}")))
}

fn to_lot_size(name: &str, value: f64) -> Result<Decimal> {
    let size = to_decimal(name, value)?.normalize();
    if size <= Decimal::ZERO || size.scale() > SIZE_SCALE {
        return Err(Error::InvalidParameters(format!(
            "{name} must be positive with at most {SIZE_SCALE} decimal places, got {value}"
        )));
    }
    Ok(size)
}
