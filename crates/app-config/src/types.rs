// In crates/app-config/src/types.rs

use crate::{Error, Result};
use core_types::Timeframe;
use risk::types::SizingSettings;
use serde::Deserialize;
use strategies::types::IndicatorSettings;

/// The most bars a single klines request may return.
pub const MAX_LOOKBACK: usize = 1500;

#[derive(Deserialize, Debug, Clone)]
pub struct Settings {
    /// The application's general settings.
    pub app: AppSettings,
    /// Settings for the exchange API.
    pub binance: BinanceSettings,
    /// The instrument, timeframes and cadence of the bot.
    pub bot: BotSettings,
    /// Indicator windows and thresholds.
    #[serde(default)]
    pub strategy: IndicatorSettings,
    /// Position sizing.
    #[serde(default)]
    pub risk: SizingSettings,
    /// Paper trading account used when live trading is disabled.
    #[serde(default)]
    pub paper: PaperSettings,
}

#[derive(Deserialize, Debug, Clone)]
pub struct AppSettings {
    /// The environment the application is running in (e.g., "development", "production").
    pub environment: String,
    /// The log level for the application.
    pub log_level: String,
    /// Real orders are only sent when this is true; otherwise fills are simulated.
    #[serde(default)]
    pub live_trading_enabled: bool,
}

#[derive(Deserialize, Debug, Clone)]
pub struct BinanceSettings {
    /// The API key. Only required for live trading.
    #[serde(default)]
    pub api_key: String,
    /// The secret key. Only required for live trading.
    #[serde(default)]
    pub secret_key: String,
    /// The REST API base URL.
    pub rest_base_url: String,
}

/// One value per timeframe role.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct TimeframeSet<T> {
    /// Primary trend timeframe.
    pub higher: T,
    /// Trend confirmation timeframe.
    pub middle: T,
    /// Entry (execution) timeframe.
    pub lower: T,
}

#[derive(Deserialize, Debug, Clone)]
pub struct BotSettings {
    pub symbol: String,
    pub timeframes: TimeframeSet<Timeframe>,
    /// Bars fetched per timeframe every cycle.
    pub lookback: TimeframeSet<usize>,
    #[serde(default = "default_cycle_minutes")]
    pub cycle_minutes: u64,
    #[serde(default = "default_retry_cooldown_secs")]
    pub retry_cooldown_secs: u64,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct PaperSettings {
    /// The starting cash balance (e.g., in USDT).
    pub initial_cash: f64,
    /// The taker fee charged on simulated fills (e.g., 0.0004 for 0.04%).
    pub taker_fee: f64,
    /// The simulated slippage for market orders (e.g., 0.0005 for 0.05%).
    pub slippage_percent: f64,
}

impl Default for PaperSettings {
    fn default() -> Self {
        Self {
            initial_cash: 10_000.0,
            taker_fee: 0.0004,
            slippage_percent: 0.0,
        }
    }
}

/// Helper functions for serde defaults
fn default_cycle_minutes() -> u64 { 15 }
fn default_retry_cooldown_secs() -> u64 { 60 }

impl Settings {
    /// Checks the cross-field rules serde cannot express.
    pub fn validate(&self) -> Result<()> {
        self.bot.validate(self.strategy.min_bars())?;
        self.strategy
            .validate()
            .map_err(|e| Error::Invalid(e.to_string()))?;

        if self.app.live_trading_enabled
            && (self.binance.api_key.is_empty() || self.binance.secret_key.is_empty())
        {
            return Err(Error::Invalid(
                "live trading requires binance.api_key and binance.secret_key".to_string(),
            ));
        }
        Ok(())
    }
}

impl BotSettings {
    fn validate(&self, min_bars: usize) -> Result<()> {
        if self.symbol.trim().is_empty() {
            return Err(Error::Invalid("bot.symbol must not be empty".to_string()));
        }

        let TimeframeSet { higher, middle, lower } = self.timeframes;
        if !(higher.duration_ms() > middle.duration_ms() && middle.duration_ms() > lower.duration_ms()) {
            return Err(Error::Invalid(format!(
                "timeframes must be ordered higher > middle > lower, got {higher} / {middle} / {lower}"
            )));
        }

        for (role, bars) in [
            ("higher", self.lookback.higher),
            ("middle", self.lookback.middle),
            ("lower", self.lookback.lower),
        ] {
            if bars < min_bars || bars > MAX_LOOKBACK {
                return Err(Error::Invalid(format!(
                    "lookback.{role} must be between {min_bars} and {MAX_LOOKBACK}, got {bars}"
                )));
            }
        }

        if self.cycle_minutes == 0 {
            return Err(Error::Invalid("bot.cycle_minutes must be greater than 0".to_string()));
        }
        Ok(())
    }
}
