// In crates/strategies/src/lib.rs

use core_types::{CandleSeries, Signal};

pub mod error;
pub mod frame;
pub mod indicators;
pub mod types;
pub mod wave_trend_flow;

pub use error::{Error, Result};
pub use frame::{IndicatorEngine, IndicatorFrame, IndicatorRow};
pub use types::IndicatorSettings;
pub use wave_trend_flow::{SignalSnapshot, WaveTrendFlow};

/// The universal interface for a trading strategy.
///
/// A strategy derives an indicator frame for each timeframe it watches and fuses
/// the latest rows of the higher, middle and lower frames into a `Signal`. It holds
/// no state between cycles: every call works only from the frames it is given.
pub trait Strategy {
    /// The name of the strategy.
    fn name(&self) -> &'static str;

    /// Derives the indicator frame for one candle series.
    fn compute(&self, series: &CandleSeries) -> IndicatorFrame;

    /// Captures the flags the decision depends on.
    fn snapshot(
        &self,
        higher: &IndicatorFrame,
        middle: &IndicatorFrame,
        lower: &IndicatorFrame,
    ) -> SignalSnapshot;

    fn assess(&self, higher: &IndicatorFrame, middle: &IndicatorFrame, lower: &IndicatorFrame) -> Signal {
        self.snapshot(higher, middle, lower).evaluate()
    }
}
