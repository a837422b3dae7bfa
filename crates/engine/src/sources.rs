// In crates/engine/src/sources.rs

use crate::{Error, Result};
use api_client::ApiClient;
use async_trait::async_trait;
use core_types::{CandleSeries, Quote, Symbol, Timeframe};
use execution::SharedPortfolio;
use rust_decimal::Decimal;

/// Where candles come from.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// The most recent `count` candles, oldest first. The last one may still be forming.
    async fn fetch_candles(
        &self,
        symbol: &Symbol,
        timeframe: Timeframe,
        count: usize,
    ) -> Result<CandleSeries>;
}

/// What a cycle needs to know about the account, read once per cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AccountStatus {
    pub has_open_position: bool,
    /// `None` when equity cannot be read; sizing then uses the default size.
    pub equity: Option<Decimal>,
}

/// Read access to the trading account.
#[async_trait]
pub trait AccountSource: Send + Sync {
    /// Account equity, or `None` when it cannot be read.
    async fn account_equity(&self) -> Option<Decimal>;

    async fn has_open_position(&self, symbol: &Symbol) -> Result<bool>;

    /// Position state and equity together. Sources backed by a single account
    /// request should override this to answer from one response.
    async fn account_status(&self, symbol: &Symbol) -> Result<AccountStatus> {
        let has_open_position = self.has_open_position(symbol).await?;
        let equity = self.account_equity().await;
        Ok(AccountStatus {
            has_open_position,
            equity,
        })
    }
}

#[async_trait]
pub trait QuoteSource: Send + Sync {
    async fn quote(&self, symbol: &Symbol) -> Result<Quote>;
}

#[async_trait]
impl MarketDataSource for ApiClient {
    async fn fetch_candles(
        &self,
        symbol: &Symbol,
        timeframe: Timeframe,
        count: usize,
    ) -> Result<CandleSeries> {
        self.get_candles(symbol, timeframe, count)
            .await
            .map_err(|e| Error::DataUnavailable {
                timeframe,
                reason: e.to_string(),
            })
    }
}

#[async_trait]
impl AccountSource for ApiClient {
    async fn account_equity(&self) -> Option<Decimal> {
        match self.get_account().await {
            Ok(account) => Some(account.total_wallet_balance),
            Err(e) => {
                tracing::warn!(error = %e, "Could not read account equity.");
                None
            }
        }
    }

    async fn has_open_position(&self, symbol: &Symbol) -> Result<bool> {
        let account = self
            .get_account()
            .await
            .map_err(|e| Error::AccountInfoUnavailable(e.to_string()))?;
        Ok(account.has_open_position(&symbol.0))
    }

    async fn account_status(&self, symbol: &Symbol) -> Result<AccountStatus> {
        let account = self
            .get_account()
            .await
            .map_err(|e| Error::AccountInfoUnavailable(e.to_string()))?;
        Ok(AccountStatus {
            has_open_position: account.has_open_position(&symbol.0),
            equity: Some(account.total_wallet_balance),
        })
    }
}

#[async_trait]
impl QuoteSource for ApiClient {
    async fn quote(&self, symbol: &Symbol) -> Result<Quote> {
        self.get_quote(symbol)
            .await
            .map_err(|e| Error::QuoteUnavailable(e.to_string()))
    }
}

/// The account view of a paper portfolio: cash is equity, and only simulated
/// fills count as positions.
#[derive(Debug, Clone)]
pub struct PaperAccount {
    portfolio: SharedPortfolio,
}

impl PaperAccount {
    pub fn new(portfolio: SharedPortfolio) -> Self {
        Self { portfolio }
    }
}

#[async_trait]
impl AccountSource for PaperAccount {
    async fn account_equity(&self) -> Option<Decimal> {
        Some(self.portfolio.lock().await.cash)
    }

    async fn has_open_position(&self, symbol: &Symbol) -> Result<bool> {
        Ok(self.portfolio.lock().await.has_position(symbol))
    }
}
