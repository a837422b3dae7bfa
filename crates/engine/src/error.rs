// In crates/engine/src/error.rs

use core_types::Timeframe;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Market data for {timeframe} is unavailable: {reason}")]
    DataUnavailable { timeframe: Timeframe, reason: String },

    #[error("Account information is unavailable: {0}")]
    AccountInfoUnavailable(String),

    #[error("Quote is unavailable: {0}")]
    QuoteUnavailable(String),

    #[error("Execution error: {0}")]
    Execution(#[from] execution::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
