// In crates/strategies/src/wave_trend_flow.rs

use crate::frame::{IndicatorEngine, IndicatorFrame};
use crate::types::IndicatorSettings;
use crate::{Result, Strategy};
use core_types::{CandleSeries, Signal};
use serde::Serialize;

/// The latest flags the evaluator looks at, captured once per cycle.
///
/// Trend flags come from the higher and middle timeframes; crossover and flow
/// flags come from the lower (execution) timeframe.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct SignalSnapshot {
    pub higher_trend_up: Option<bool>,
    pub higher_trend_down: Option<bool>,
    pub middle_trend_up: Option<bool>,
    pub middle_trend_down: Option<bool>,
    pub wt_cross_up: Option<bool>,
    pub wt_cross_down: Option<bool>,
    pub flow_up: Option<bool>,
    pub flow_down: Option<bool>,
}

impl SignalSnapshot {
    pub fn capture(higher: &IndicatorFrame, middle: &IndicatorFrame, lower: &IndicatorFrame) -> Self {
        let higher = higher.latest();
        let middle = middle.latest();
        let lower = lower.latest();

        Self {
            higher_trend_up: higher.and_then(|r| r.trend_up),
            higher_trend_down: higher.and_then(|r| r.trend_down),
            middle_trend_up: middle.and_then(|r| r.trend_up),
            middle_trend_down: middle.and_then(|r| r.trend_down),
            wt_cross_up: lower.and_then(|r| r.wt_cross_up),
            wt_cross_down: lower.and_then(|r| r.wt_cross_down),
            flow_up: lower.and_then(|r| r.flow_up),
            flow_down: lower.and_then(|r| r.flow_down),
        }
    }

    /// Fuses the snapshot into a signal.
    ///
    /// Any undefined flag yields `Hold`. The long condition is checked first, so
    /// it wins if malformed input ever makes both conditions true.
    pub fn evaluate(&self) -> Signal {
        let (
            Some(higher_up),
            Some(higher_down),
            Some(middle_up),
            Some(middle_down),
            Some(cross_up),
            Some(cross_down),
            Some(flow_up),
            Some(flow_down),
        ) = (
            self.higher_trend_up,
            self.higher_trend_down,
            self.middle_trend_up,
            self.middle_trend_down,
            self.wt_cross_up,
            self.wt_cross_down,
            self.flow_up,
            self.flow_down,
        )
        else {
            return Signal::Hold;
        };

        if higher_up && middle_up && cross_up && flow_up {
            Signal::GoLong
        } else if higher_down && middle_down && cross_down && flow_down {
            Signal::GoShort
        } else {
            Signal::Hold
        }
    }
}

/// Multi-timeframe strategy: EMA trend on the two higher timeframes, WaveTrend
/// crossover out of an extreme zone plus flow confirmation on the lowest one.
#[derive(Debug, Clone)]
pub struct WaveTrendFlow {
    engine: IndicatorEngine,
}

impl WaveTrendFlow {
    pub fn new(settings: IndicatorSettings) -> Result<Self> {
        Ok(Self {
            engine: IndicatorEngine::new(settings)?,
        })
    }

    pub fn settings(&self) -> &IndicatorSettings {
        self.engine.settings()
    }
}

impl Strategy for WaveTrendFlow {
    fn name(&self) -> &'static str {
        "WaveTrendFlow"
    }

    fn compute(&self, series: &CandleSeries) -> IndicatorFrame {
        self.engine.compute(series)
    }

    fn snapshot(
        &self,
        higher: &IndicatorFrame,
        middle: &IndicatorFrame,
        lower: &IndicatorFrame,
    ) -> SignalSnapshot {
        SignalSnapshot::capture(higher, middle, lower)
    }
}
