// In crates/strategies/src/types.rs

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Windows and thresholds for the trend, WaveTrend and flow indicators.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct IndicatorSettings {
    // Trend filter
    pub ema_fast_period: usize,
    pub ema_slow_period: usize,

    // WaveTrend oscillator
    /// Window for both the typical-price EMA and its mean deviation.
    pub channel_period: usize,
    /// Window of the EMA that turns the channel index into `wt1`.
    pub average_period: usize,
    /// Window of the simple moving average of `wt1` (`wt2`).
    pub signal_period: usize,
    pub oversold: f64,
    pub overbought: f64,

    // Flow oscillator
    pub flow_period: usize,
}

impl Default for IndicatorSettings {
    fn default() -> Self {
        Self {
            ema_fast_period: 20,
            ema_slow_period: 50,
            channel_period: 10,
            average_period: 21,
            signal_period: 4,
            oversold: -60.0,
            overbought: 60.0,
            flow_period: 5,
        }
    }
}

impl IndicatorSettings {
    pub fn validate(&self) -> Result<()> {
        let periods = [
            ("ema_fast_period", self.ema_fast_period),
            ("ema_slow_period", self.ema_slow_period),
            ("channel_period", self.channel_period),
            ("average_period", self.average_period),
            ("signal_period", self.signal_period),
            ("flow_period", self.flow_period),
        ];
        if let Some((name, _)) = periods.iter().find(|(_, period)| *period == 0) {
            return Err(Error::InvalidParameters(format!("{name} must be greater than 0")));
        }
        if !(self.oversold < self.overbought) {
            return Err(Error::InvalidParameters(format!(
                "oversold ({}) must be below overbought ({})",
                self.oversold, self.overbought
            )));
        }
        Ok(())
    }

    /// The number of bars a series needs before every indicator field can be defined.
    pub fn min_bars(&self) -> usize {
        let trend = self.ema_slow_period;
        // esa and its deviation warm up back to back, then wt1 and wt2, plus one
        // extra bar because a crossover compares against the previous bar.
        let wave = 2 * self.channel_period + self.average_period + self.signal_period - 2;
        // The first bar has no previous close to diff against.
        let flow = self.flow_period + 1;
        trend.max(wave).max(flow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_need_fifty_bars() {
        let settings = IndicatorSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.min_bars(), 50);
    }

    #[test]
    fn zero_period_is_rejected() {
        let settings = IndicatorSettings {
            signal_period: 0,
            ..Default::default()
        };
        assert!(matches!(settings.validate(), Err(Error::InvalidParameters(_))));
    }

    #[test]
    fn inverted_thresholds_are_rejected() {
        let settings = IndicatorSettings {
            oversold: 60.0,
            overbought: -60.0,
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }
}
