// In crates/api-client/src/lib.rs

use app_config::types::BinanceSettings;
use chrono::Utc;
use core_types::{CandleSeries, Quote, Side, Symbol, Timeframe};
use hmac::{Hmac, Mac};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde_json::Value;
use sha2::Sha256;
use std::time::Duration;

// Create a type alias for the HMAC-SHA256 implementation.
type HmacSha256 = Hmac<Sha256>;

pub mod error;
pub mod session;
pub mod types;

// Re-export public types
pub use error::{Error, Result};
pub use session::BrokerSession;
pub use types::*;

/// Every request gives up after this long.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

impl ApiClient {
    /// Constructs a new ApiClient from BinanceSettings.
    pub fn new(settings: &BinanceSettings) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::ClientBuildError(e.to_string()))?;

        Ok(ApiClient {
            http_client,
            api_key: settings.api_key.clone(),
            secret_key: settings.secret_key.clone(),
            base_url: settings.rest_base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Whether the client carries credentials for signed endpoints.
    pub fn has_credentials(&self) -> bool {
        !self.api_key.is_empty() && !self.secret_key.is_empty()
    }

    /// Generates a hex encoded HMAC-SHA256 signature for a query string.
    fn sign(&self, query_string: &str) -> Result<String> {
        let mut mac = HmacSha256::new_from_slice(self.secret_key.as_bytes())
            .map_err(|e| Error::ClientBuildError(format!("invalid secret key: {e}")))?;
        mac.update(query_string.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Appends the timestamp and signature to `params`.
    fn create_signed_query(&self, params: &mut String) -> Result<()> {
        let timestamp = Utc::now().timestamp_millis();

        if !params.is_empty() {
            params.push('&');
        }
        params.push_str(&format!("timestamp={}", timestamp));

        let signature = self.sign(params)?;
        params.push_str(&format!("&signature={}", signature));
        Ok(())
    }

    /// Checks connectivity. `GET /fapi/v1/ping`.
    pub async fn ping(&self) -> Result<()> {
        let url = format!("{}/fapi/v1/ping", self.base_url);
        let body = self.http_client.get(&url).send().await?.text().await?;
        decode::<Value>(&body)?;
        Ok(())
    }

    /// Fetches the futures account balance and positions.
    ///
    /// This corresponds to the `GET /fapi/v2/account` endpoint.
    pub async fn get_account(&self) -> Result<AccountState> {
        let mut params = String::new();
        self.create_signed_query(&mut params)?;

        let url = format!("{}/fapi/v2/account?{}", self.base_url, params);

        let body = self
            .http_client
            .get(&url)
            .header("X-MBX-APIKEY", &self.api_key)
            .send()
            .await?
            .text()
            .await?;

        decode(&body)
    }

    /// Fetches the most recent `limit` candles, oldest first.
    ///
    /// The last candle is the one still forming. This corresponds to the
    /// `GET /fapi/v1/klines` endpoint.
    pub async fn get_candles(
        &self,
        symbol: &Symbol,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<CandleSeries> {
        let url = format!(
            "{}/fapi/v1/klines?symbol={}&interval={}&limit={}",
            self.base_url,
            symbol.0,
            timeframe.as_str(),
            limit
        );

        let body = self.http_client.get(&url).send().await?.text().await?;
        let raw_klines: Vec<RawKline> = decode(&body)?;

        let candles = raw_klines
            .into_iter()
            .map(RawKline::into_candle)
            .collect::<Result<Vec<_>>>()?;

        CandleSeries::new(symbol.clone(), timeframe, candles)
            .map_err(|e| Error::MalformedResponse(e.to_string()))
    }

    /// Fetches the best bid and ask. `GET /fapi/v1/ticker/bookTicker`.
    pub async fn get_quote(&self, symbol: &Symbol) -> Result<Quote> {
        let url = format!(
            "{}/fapi/v1/ticker/bookTicker?symbol={}",
            self.base_url, symbol.0
        );

        let body = self.http_client.get(&url).send().await?.text().await?;
        let ticker: BookTicker = decode(&body)?;

        Ok(Quote {
            bid: ticker.bid_price,
            ask: ticker.ask_price,
        })
    }

    /// Places a new market order in one-way position mode.
    /// Corresponds to `POST /fapi/v1/order`.
    pub async fn place_market_order(
        &self,
        symbol: &Symbol,
        side: Side,
        quantity: Decimal,
    ) -> Result<NewOrderResponse> {
        let mut params = format!(
            "symbol={}&side={}&type=MARKET&quantity={}&newOrderRespType=RESULT",
            symbol.0,
            order_side(side),
            quantity.normalize()
        );
        self.create_signed_query(&mut params)?;

        let url = format!("{}/fapi/v1/order", self.base_url);

        let body = self
            .http_client
            .post(&url)
            .header("X-MBX-APIKEY", &self.api_key)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(params)
            .send()
            .await?
            .text()
            .await?;

        decode(&body)
    }
}

fn order_side(side: Side) -> &'static str {
    match side {
        Side::Long => "BUY",
        Side::Short => "SELL",
    }
}

/// Parses a response body, surfacing the exchange's `{code, msg}` error object.
fn decode<T: DeserializeOwned>(body: &str) -> Result<T> {
    let value: Value = serde_json::from_str(body)?;

    // Errors are reported with a negative code; some successful calls echo `code: 200`.
    if let Some(code) = value.get("code").and_then(Value::as_i64) {
        if code < 0 {
            let msg = value
                .get("msg")
                .and_then(Value::as_str)
                .unwrap_or("Unknown error")
                .to_string();
            return Err(Error::ApiError { code, msg });
        }
    }

    Ok(serde_json::from_value(value)?)
}
