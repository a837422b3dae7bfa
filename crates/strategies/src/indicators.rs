//! Streaming building blocks for the indicator frame.
//!
//! Every output is an `Option<f64>`: `None` marks a bar without enough history,
//! or a bar whose input was itself undefined. Nothing here pads a window.

use crate::{Error, Result};
use std::collections::VecDeque;
use ta::indicators::ExponentialMovingAverage as Ema;
use ta::Next;

/// An EMA that stays undefined until `period` defined inputs have been seen.
///
/// The recursion is seeded with the first defined input and uses
/// `alpha = 2 / (period + 1)`. Undefined inputs are skipped without touching the
/// recursion state and produce an undefined output for their bar.
#[derive(Debug, Clone)]
pub struct WarmEma {
    ema: Ema,
    period: usize,
    observed: usize,
}

impl WarmEma {
    pub fn new(period: usize) -> Result<Self> {
        let ema = Ema::new(period)
            .map_err(|e| Error::InvalidParameters(format!("EMA period {period}: {e:?}")))?;
        Ok(Self {
            ema,
            period,
            observed: 0,
        })
    }

    pub fn next(&mut self, input: Option<f64>) -> Option<f64> {
        let value = input.filter(|v| v.is_finite())?;
        let smoothed = self.ema.next(value);
        self.observed += 1;
        (self.observed >= self.period).then_some(smoothed)
    }
}

/// A rolling mean defined only while its trailing window is fully populated.
///
/// The mean is summed afresh from the window on every bar, so a window of zeros
/// averages to exactly zero however large the values that left it were. An
/// undefined input empties the window, so the mean reappears `period` bars after
/// the last gap.
#[derive(Debug, Clone)]
pub struct RollingMean {
    window: VecDeque<f64>,
    period: usize,
}

impl RollingMean {
    pub fn new(period: usize) -> Result<Self> {
        if period == 0 {
            return Err(Error::InvalidParameters(
                "rolling mean period must be positive".into(),
            ));
        }
        Ok(Self {
            window: VecDeque::with_capacity(period),
            period,
        })
    }

    pub fn next(&mut self, input: Option<f64>) -> Option<f64> {
        let Some(value) = input.filter(|v| v.is_finite()) else {
            self.window.clear();
            return None;
        };
        if self.window.len() == self.period {
            self.window.pop_front();
        }
        self.window.push_back(value);
        (self.window.len() == self.period)
            .then(|| self.window.iter().sum::<f64>() / self.period as f64)
    }
}

/// WaveTrend channel index: `(hlc3 - esa) / (0.015 * d)`.
///
/// Undefined when either average is undefined or the deviation is zero.
pub fn channel_index(hlc3: f64, esa: Option<f64>, deviation: Option<f64>) -> Option<f64> {
    let (esa, deviation) = esa.zip(deviation)?;
    if deviation == 0.0 {
        return None;
    }
    Some((hlc3 - esa) / (0.015 * deviation))
}

/// Crossover pulses between `wt1` and `wt2`, as `(cross_up, cross_down)`.
///
/// `previous` and `current` are `(wt1, wt2)` pairs. Both flags are undefined
/// unless both pairs are defined.
pub fn crossover(
    previous: Option<(f64, f64)>,
    current: Option<(f64, f64)>,
    oversold: f64,
    overbought: f64,
) -> (Option<bool>, Option<bool>) {
    match (previous, current) {
        (Some((prev_wt1, prev_wt2)), Some((wt1, wt2))) => {
            let up = wt1 > wt2 && prev_wt1 <= prev_wt2 && wt1 < oversold;
            let down = wt1 < wt2 && prev_wt1 >= prev_wt2 && wt1 > overbought;
            (Some(up), Some(down))
        }
        _ => (None, None),
    }
}

/// Flow oscillator in `[-100, 100]` from average buying and selling pressure.
///
/// With no selling pressure the index saturates at +100; with no pressure at
/// all it is undefined.
pub fn flow_index(bull_flow: Option<f64>, bear_flow: Option<f64>) -> Option<f64> {
    let (bull, bear) = bull_flow.zip(bear_flow)?;
    if bear <= 0.0 {
        return (bull > 0.0).then_some(100.0);
    }
    let index = 2.0 * (100.0 - 100.0 / (1.0 + bull.max(0.0) / bear)) - 100.0;
    Some(index.clamp(-100.0, 100.0))
}
