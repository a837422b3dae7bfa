// In crates/execution/src/live.rs

use crate::{Executor, Result};
use api_client::{ApiClient, NewOrderResponse};
use async_trait::async_trait;
use core_types::{ExecutionOutcome, OrderIntent, Quote};

/// An executor that places real market orders on the exchange.
#[derive(Debug, Clone)]
pub struct LiveExecutor {
    /// The API client for communicating with the exchange.
    api_client: ApiClient,
}

impl LiveExecutor {
    pub fn new(api_client: ApiClient) -> Self {
        Self { api_client }
    }
}

#[async_trait]
impl Executor for LiveExecutor {
    fn name(&self) -> &'static str {
        "LiveExecutor"
    }

    async fn execute(&self, intent: &OrderIntent, _quote: Option<&Quote>) -> Result<ExecutionOutcome> {
        tracing::info!(?intent, "Executing live order...");

        // An account that may not trade gets an error object back, which
        // becomes a rejection below.
        let response = self
            .api_client
            .place_market_order(&intent.symbol, intent.side, intent.size)
            .await;

        let outcome = classify(response)?;
        match &outcome {
            ExecutionOutcome::Accepted { order_id, price, size } => tracing::info!(
                %order_id,
                %price,
                %size,
                "Market order placed."
            ),
            ExecutionOutcome::Rejected { reason } => {
                tracing::error!(%reason, "Market order rejected by the exchange.")
            }
        }
        Ok(outcome)
    }
}

/// The exchange's `{code, msg}` answers are rejections; anything else that
/// failed never reached a decision and is an error.
fn classify(response: api_client::Result<NewOrderResponse>) -> Result<ExecutionOutcome> {
    match response {
        // The exchange's avgPrice and executedQty are the source of truth.
        Ok(fill) => Ok(ExecutionOutcome::Accepted {
            order_id: fill.order_id.to_string(),
            price: fill.avg_price,
            size: fill.executed_qty,
        }),
        Err(api_client::Error::ApiError { code, msg }) => Ok(ExecutionOutcome::Rejected {
            reason: format!("code {code}: {msg}"),
        }),
        Err(e) => Err(e.into()),
    }
}
