// In crates/api-client/src/types.rs

use crate::{Error, Result};
use core_types::Candle;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;

/// The main client for the USDⓈ-M futures REST API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    /// The persistent HTTP client.
    pub(crate) http_client: Client,
    /// The user's API key.
    pub(crate) api_key: String,
    /// The user's secret key.
    pub(crate) secret_key: String,
    /// The base URL for the futures API.
    pub(crate) base_url: String,
}

/// Represents a single position as returned by the account endpoint.
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PositionInfo {
    /// The trading pair symbol (e.g., "BTCUSDT").
    pub symbol: String,
    /// The quantity of the position (positive for long, negative for short, zero when flat).
    pub position_amt: Decimal,
    /// The average entry price of the position.
    pub entry_price: Decimal,
    /// The unrealized profit/loss of the position.
    pub unrealized_profit: Decimal,
    /// The side of the position ("LONG", "SHORT", or "BOTH").
    pub position_side: String,
}

/// Represents the overall futures account state.
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AccountState {
    /// Whether the account is currently allowed to place orders.
    pub can_trade: bool,
    /// A list of positions in the account, including flat ones.
    #[serde(default)]
    pub positions: Vec<PositionInfo>,
    /// The total wallet balance in the margin asset.
    pub total_wallet_balance: Decimal,
    /// The total unrealized profit and loss.
    pub total_unrealized_profit: Decimal,
}

impl AccountState {
    /// Whether `symbol` has a non-zero position.
    pub fn has_open_position(&self, symbol: &str) -> bool {
        self.positions
            .iter()
            .any(|p| p.symbol == symbol && !p.position_amt.is_zero())
    }
}

/// Temporary struct to deserialize the kline response,
/// which is a JSON array of mixed types.
#[derive(Debug, Deserialize)]
pub struct RawKline(
    pub i64,         // 0: Open time
    pub String,      // 1: Open
    pub String,      // 2: High
    pub String,      // 3: Low
    pub String,      // 4: Close
    pub String,      // 5: Volume
    pub i64,         // 6: Close time
    pub String,      // 7: Quote asset volume
    pub i64,         // 8: Number of trades
    pub String,      // 9: Taker buy base asset volume
    pub String,      // 10: Taker buy quote asset volume
    pub String,      // 11: Ignore
);

impl RawKline {
    pub fn into_candle(self) -> Result<Candle> {
        Ok(Candle {
            open_time: self.0,
            open: parse_decimal("open", &self.1)?,
            high: parse_decimal("high", &self.2)?,
            low: parse_decimal("low", &self.3)?,
            close: parse_decimal("close", &self.4)?,
            volume: parse_decimal("volume", &self.5)?,
            close_time: self.6,
        })
    }
}

fn parse_decimal(field: &str, raw: &str) -> Result<Decimal> {
    Decimal::from_str(raw)
        .map_err(|e| Error::MalformedResponse(format!("kline {field} '{raw}': {e}")))
}

/// Best bid/ask as returned by the book ticker endpoint.
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct BookTicker {
    pub symbol: String,
    pub bid_price: Decimal,
    pub ask_price: Decimal,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NewOrderResponse {
    pub order_id: i64,
    pub symbol: String,
    pub status: String,
    pub side: String, // "BUY" or "SELL"
    pub avg_price: Decimal, // The actual average fill price
    pub executed_qty: Decimal, // The actual filled quantity
    pub cum_quote: Decimal, // The cumulative quote asset transacted
}
