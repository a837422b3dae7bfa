// In crates/execution/src/paper.rs

use crate::types::{Portfolio, SharedPortfolio, SimulatedPosition};
use crate::{Error, Executor, Result};
use app_config::PaperSettings;
use async_trait::async_trait;
use core_types::{ExecutionOutcome, OrderIntent, Quote, Side};
use num_traits::FromPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use tokio::sync::Mutex;

/// An executor that fills market orders against an in-memory portfolio.
///
/// Long entries fill at the ask and short entries at the bid, worsened by the
/// configured slippage. The taker fee is charged from cash.
pub struct PaperExecutor {
    taker_fee: Decimal,
    slippage: Decimal,
    portfolio: SharedPortfolio,
    next_order_id: std::sync::atomic::AtomicU64,
}

impl PaperExecutor {
    pub fn new(settings: &PaperSettings) -> Result<Self> {
        let initial_cash = to_decimal("initial_cash", settings.initial_cash)?;
        let taker_fee = to_decimal("taker_fee", settings.taker_fee)?;
        let slippage = to_decimal("slippage_percent", settings.slippage_percent)?;

        if initial_cash.is_sign_negative() || taker_fee.is_sign_negative() || slippage.is_sign_negative() {
            return Err(Error::InvalidSettings(
                "initial_cash, taker_fee and slippage_percent must not be negative".to_string(),
            ));
        }
        if slippage >= dec!(1) {
            return Err(Error::InvalidSettings(format!(
                "slippage_percent must be below 1, got {slippage}"
            )));
        }

        Ok(Self {
            taker_fee,
            slippage,
            portfolio: Arc::new(Mutex::new(Portfolio::new(initial_cash))),
            next_order_id: std::sync::atomic::AtomicU64::new(1),
        })
    }

    /// A handle to the simulated portfolio.
    pub fn portfolio(&self) -> SharedPortfolio {
        Arc::clone(&self.portfolio)
    }

    fn fill_price(&self, side: Side, quote: &Quote) -> Decimal {
        let price = quote.price_for(side);
        match side {
            // Slippage always makes the price worse.
            Side::Long => price * (dec!(1) + self.slippage),
            Side::Short => price * (dec!(1) - self.slippage),
        }
    }

    /// Processes an entry order (opening a new long or short position).
    fn process_entry(
        &self,
        intent: &OrderIntent,
        quote: Option<&Quote>,
        portfolio: &mut Portfolio,
    ) -> ExecutionOutcome {
        if portfolio.has_position(&intent.symbol) {
            return ExecutionOutcome::Rejected {
                reason: format!("a position in {} is already open", intent.symbol),
            };
        }
        let Some(quote) = quote else {
            return ExecutionOutcome::Rejected {
                reason: "no quote to fill against".to_string(),
            };
        };

        let price = self.fill_price(intent.side, quote);
        if price <= Decimal::ZERO {
            return ExecutionOutcome::Rejected {
                reason: format!("no usable {:?} price in quote", intent.side),
            };
        }

        let fee = intent.size * price * self.taker_fee;
        if portfolio.cash < fee {
            return ExecutionOutcome::Rejected {
                reason: "Insufficient cash for fees".to_string(),
            };
        }
        portfolio.cash -= fee;

        portfolio.open_positions.insert(
            intent.symbol.clone(),
            SimulatedPosition {
                side: intent.side,
                size: intent.size,
                entry_price: price,
            },
        );

        let order_id = self
            .next_order_id
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);

        ExecutionOutcome::Accepted {
            order_id: format!("paper-{order_id}"),
            price,
            size: intent.size,
        }
    }
}

#[async_trait]
impl Executor for PaperExecutor {
    fn name(&self) -> &'static str {
        "PaperExecutor"
    }

    async fn execute(&self, intent: &OrderIntent, quote: Option<&Quote>) -> Result<ExecutionOutcome> {
        let mut portfolio = self.portfolio.lock().await;
        let outcome = self.process_entry(intent, quote, &mut portfolio);

        match &outcome {
            ExecutionOutcome::Accepted { order_id, price, size } => tracing::info!(
                symbol = %intent.symbol,
                side = ?intent.side,
                %price,
                %size,
                %order_id,
                cash = %portfolio.cash,
                "Paper order filled."
            ),
            ExecutionOutcome::Rejected { reason } => {
                tracing::warn!(symbol = %intent.symbol, %reason, "Paper order rejected.")
            }
        }

        Ok(outcome)
    }
}

fn to_decimal(name: &str, value: f64) -> Result<Decimal> {
    Decimal::from_f64(value)
        .ok_or_else(|| Error::InvalidSettings(format!("{name} is not a finite number: {value}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::Symbol;

    fn settings() -> PaperSettings {
        PaperSettings {
            initial_cash: 1000.0,
            taker_fee: 0.001,
            slippage_percent: 0.0,
        }
    }

    fn intent(side: Side) -> OrderIntent {
        OrderIntent {
            symbol: Symbol("BTCUSDT".into()),
            side,
            size: dec!(0.5),
        }
    }

    fn quote() -> Quote {
        Quote {
            bid: dec!(99),
            ask: dec!(101),
        }
    }

    #[tokio::test]
    async fn long_fills_at_ask_and_charges_fee() {
        let executor = PaperExecutor::new(&settings()).unwrap();
        let outcome = executor.execute(&intent(Side::Long), Some(&quote())).await.unwrap();

        assert_eq!(
            outcome,
            ExecutionOutcome::Accepted {
                order_id: "paper-1".into(),
                price: dec!(101),
                size: dec!(0.5),
            }
        );

        let portfolio = executor.portfolio();
        let portfolio = portfolio.lock().await;
        // fee = 0.5 * 101 * 0.001
        assert_eq!(portfolio.cash, dec!(1000) - dec!(0.0505));
        assert!(portfolio.has_position(&Symbol("BTCUSDT".into())));
    }

    #[tokio::test]
    async fn short_fills_at_bid_with_slippage() {
        let executor = PaperExecutor::new(&PaperSettings {
            slippage_percent: 0.01,
            ..settings()
        })
        .unwrap();
        let outcome = executor.execute(&intent(Side::Short), Some(&quote())).await.unwrap();

        match outcome {
            ExecutionOutcome::Accepted { price, .. } => assert_eq!(price, dec!(98.01)),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn second_entry_on_same_symbol_is_rejected() {
        let executor = PaperExecutor::new(&settings()).unwrap();
        executor.execute(&intent(Side::Long), Some(&quote())).await.unwrap();
        let outcome = executor.execute(&intent(Side::Short), Some(&quote())).await.unwrap();

        assert!(matches!(outcome, ExecutionOutcome::Rejected { .. }));
        let portfolio = executor.portfolio();
        assert_eq!(portfolio.lock().await.open_positions.len(), 1);
    }

    #[tokio::test]
    async fn insufficient_cash_is_rejected() {
        let executor = PaperExecutor::new(&PaperSettings {
            initial_cash: 0.0,
            ..settings()
        })
        .unwrap();
        let outcome = executor.execute(&intent(Side::Long), Some(&quote())).await.unwrap();
        assert!(matches!(outcome, ExecutionOutcome::Rejected { .. }));
    }

    #[tokio::test]
    async fn missing_quote_is_rejected() {
        let executor = PaperExecutor::new(&settings()).unwrap();
        let outcome = executor.execute(&intent(Side::Long), None).await.unwrap();
        assert!(matches!(outcome, ExecutionOutcome::Rejected { .. }));
        assert!(executor.portfolio().lock().await.open_positions.is_empty());
    }

    #[test]
    fn rejects_invalid_settings() {
        for bad in [
            PaperSettings { initial_cash: -1.0, ..settings() },
            PaperSettings { taker_fee: f64::NAN, ..settings() },
            PaperSettings { slippage_percent: 1.5, ..settings() },
        ] {
            assert!(PaperExecutor::new(&bad).is_err());
        }
    }
}
