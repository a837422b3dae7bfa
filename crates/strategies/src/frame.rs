// In crates/strategies/src/frame.rs

use crate::indicators::{channel_index, crossover, flow_index, RollingMean, WarmEma};
use crate::types::IndicatorSettings;
use crate::Result;
use core_types::{CandleSeries, Timeframe};
use num_traits::cast::ToPrimitive;
use rust_decimal::Decimal;

/// Indicator values for a single bar. `None` means "not enough history yet".
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct IndicatorRow {
    pub open_time: i64,
    pub ema_fast: Option<f64>,
    pub ema_slow: Option<f64>,
    pub trend_up: Option<bool>,
    pub trend_down: Option<bool>,
    pub wt1: Option<f64>,
    pub wt2: Option<f64>,
    pub wt_cross_up: Option<bool>,
    pub wt_cross_down: Option<bool>,
    pub flow_index: Option<f64>,
    pub flow_up: Option<bool>,
    pub flow_down: Option<bool>,
}

/// Indicator rows aligned one-to-one with the candles of a series.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorFrame {
    pub timeframe: Timeframe,
    rows: Vec<IndicatorRow>,
}

impl IndicatorFrame {
    pub fn new(timeframe: Timeframe, rows: Vec<IndicatorRow>) -> Self {
        Self { timeframe, rows }
    }

    pub fn rows(&self) -> &[IndicatorRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The row of the most recent bar.
    pub fn latest(&self) -> Option<&IndicatorRow> {
        self.rows.last()
    }
}

/// Derives an [`IndicatorFrame`] from a candle series.
///
/// The engine keeps freshly constructed indicators as templates and clones them on
/// every call, so each series is computed from a clean state.
#[derive(Debug, Clone)]
pub struct IndicatorEngine {
    settings: IndicatorSettings,
    ema_fast: WarmEma,
    ema_slow: WarmEma,
    esa: WarmEma,
    deviation: WarmEma,
    wave: WarmEma,
    signal_line: RollingMean,
    bull_flow: RollingMean,
    bear_flow: RollingMean,
}

impl IndicatorEngine {
    pub fn new(settings: IndicatorSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            ema_fast: WarmEma::new(settings.ema_fast_period)?,
            ema_slow: WarmEma::new(settings.ema_slow_period)?,
            esa: WarmEma::new(settings.channel_period)?,
            deviation: WarmEma::new(settings.channel_period)?,
            wave: WarmEma::new(settings.average_period)?,
            signal_line: RollingMean::new(settings.signal_period)?,
            bull_flow: RollingMean::new(settings.flow_period)?,
            bear_flow: RollingMean::new(settings.flow_period)?,
            settings,
        })
    }

    pub fn settings(&self) -> &IndicatorSettings {
        &self.settings
    }

    pub fn compute(&self, series: &CandleSeries) -> IndicatorFrame {
        let mut ema_fast = self.ema_fast.clone();
        let mut ema_slow = self.ema_slow.clone();
        let mut esa = self.esa.clone();
        let mut deviation = self.deviation.clone();
        let mut wave = self.wave.clone();
        let mut signal_line = self.signal_line.clone();
        let mut bull_flow = self.bull_flow.clone();
        let mut bear_flow = self.bear_flow.clone();

        let mut previous_wave: Option<(f64, f64)> = None;
        let mut previous_close: Option<f64> = None;
        let mut rows = Vec::with_capacity(series.len());

        for candle in series.candles() {
            let high = as_f64(candle.high);
            let low = as_f64(candle.low);
            let close = as_f64(candle.close);
            let volume = as_f64(candle.volume);

            // --- Trend ---
            let fast = ema_fast.next(Some(close));
            let slow = ema_slow.next(Some(close));
            let (trend_up, trend_down) = match fast.zip(slow) {
                Some((f, s)) => (Some(f > s), Some(f < s)),
                None => (None, None),
            };

            // --- WaveTrend ---
            let hlc3 = (high + low + close) / 3.0;
            let esa_value = esa.next(Some(hlc3));
            let d = deviation.next(esa_value.map(|e| (hlc3 - e).abs()));
            let wt1 = wave.next(channel_index(hlc3, esa_value, d));
            let wt2 = signal_line.next(wt1);
            let current_wave = wt1.zip(wt2);
            let (wt_cross_up, wt_cross_down) = crossover(
                previous_wave,
                current_wave,
                self.settings.oversold,
                self.settings.overbought,
            );
            previous_wave = current_wave;

            // --- Flow ---
            let flow = previous_close
                .filter(|_| close.is_finite())
                .map(|prev| (close - prev) * volume);
            previous_close = Some(close).filter(|c| c.is_finite());
            let bull = bull_flow.next(flow.map(|f| f.max(0.0)));
            let bear = bear_flow.next(flow.map(|f| (-f).max(0.0)));
            let flow_index = flow_index(bull, bear);

            rows.push(IndicatorRow {
                open_time: candle.open_time,
                ema_fast: fast,
                ema_slow: slow,
                trend_up,
                trend_down,
                wt1,
                wt2,
                wt_cross_up,
                wt_cross_down,
                flow_index,
                flow_up: flow_index.map(|v| v > 0.0),
                flow_down: flow_index.map(|v| v < 0.0),
            });
        }

        IndicatorFrame::new(series.timeframe(), rows)
    }
}

// A price that does not fit an f64 becomes NaN and is treated as undefined downstream.
fn as_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(f64::NAN)
}
