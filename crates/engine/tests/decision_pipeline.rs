// In crates/engine/tests/decision_pipeline.rs

use app_config::{BotSettings, TimeframeSet};
use async_trait::async_trait;
use core_types::{
    Candle, CandleSeries, ExecutionOutcome, OrderIntent, Quote, Side, Signal, Symbol, Timeframe,
};
use engine::{AccountSource, Bot, Engine, MarketDataSource, QuoteSource, Sources};
use execution::Executor;
use risk::{AccountSnapshot, RiskManager, SinglePositionManager, SizingSettings};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use strategies::{IndicatorSettings, SignalSnapshot, Strategy, WaveTrendFlow};

fn symbol() -> Symbol {
    Symbol("EURUSD".into())
}

fn long_flags() -> SignalSnapshot {
    SignalSnapshot {
        higher_trend_up: Some(true),
        higher_trend_down: Some(false),
        middle_trend_up: Some(true),
        middle_trend_down: Some(false),
        wt_cross_up: Some(true),
        wt_cross_down: Some(false),
        flow_up: Some(true),
        flow_down: Some(false),
    }
}

fn rising_series(timeframe: Timeframe, bars: usize) -> CandleSeries {
    let step = timeframe.duration_ms();
    let candles = (0..bars as i64)
        .map(|i| {
            let close = Decimal::from(100 + i);
            Candle {
                open_time: i * step,
                open: close - dec!(0.5),
                high: close + dec!(1),
                low: close - dec!(1),
                close,
                volume: dec!(10),
                close_time: (i + 1) * step - 1,
            }
        })
        .collect();
    CandleSeries::new(symbol(), timeframe, candles).unwrap()
}

fn manager() -> SinglePositionManager {
    SinglePositionManager::new(&SizingSettings::default()).unwrap()
}

fn account() -> AccountSnapshot {
    AccountSnapshot {
        equity: Some(dec!(10000)),
        reference_price: Some(dec!(100)),
    }
}

#[test]
fn long_flags_without_position_order_minimum_size() {
    let signal = long_flags().evaluate();
    assert_eq!(signal, Signal::GoLong);

    let intent = manager().evaluate(&signal, &symbol(), false, &account());
    assert_eq!(
        intent,
        Some(OrderIntent {
            symbol: symbol(),
            side: Side::Long,
            size: dec!(0.01),
        })
    );
}

#[test]
fn long_flags_with_open_position_order_nothing() {
    let signal = long_flags().evaluate();
    assert_eq!(manager().evaluate(&signal, &symbol(), true, &account()), None);
}

#[test]
fn lower_timeframe_shorter_than_warmup_holds() {
    let strategy = WaveTrendFlow::new(IndicatorSettings::default()).unwrap();
    let higher = strategy.compute(&rising_series(Timeframe::H4, 200));
    let middle = strategy.compute(&rising_series(Timeframe::H1, 200));
    let lower = strategy.compute(&rising_series(Timeframe::M15, 30));

    let snapshot = strategy.snapshot(&higher, &middle, &lower);
    assert_eq!(snapshot.higher_trend_up, Some(true));
    assert_eq!(snapshot.wt_cross_up, None);
    assert_eq!(strategy.assess(&higher, &middle, &lower), Signal::Hold);
}

#[test]
fn contradictory_flags_resolve_to_long() {
    let snapshot = SignalSnapshot {
        higher_trend_down: Some(true),
        middle_trend_down: Some(true),
        wt_cross_down: Some(true),
        flow_down: Some(true),
        ..long_flags()
    };
    assert_eq!(snapshot.evaluate(), Signal::GoLong);
}

/// Never answers, so every evaluation stays in flight.
struct StalledMarket;

#[async_trait]
impl MarketDataSource for StalledMarket {
    async fn fetch_candles(
        &self,
        _: &Symbol,
        _: Timeframe,
        _: usize,
    ) -> engine::Result<CandleSeries> {
        std::future::pending().await
    }
}

struct FlatAccount;

#[async_trait]
impl AccountSource for FlatAccount {
    async fn account_equity(&self) -> Option<Decimal> {
        Some(dec!(10000))
    }

    async fn has_open_position(&self, _: &Symbol) -> engine::Result<bool> {
        Ok(false)
    }
}

struct FixedQuote;

#[async_trait]
impl QuoteSource for FixedQuote {
    async fn quote(&self, _: &Symbol) -> engine::Result<Quote> {
        Ok(Quote {
            bid: dec!(99),
            ask: dec!(100),
        })
    }
}

#[derive(Default)]
struct CountingExecutor(AtomicUsize);

#[async_trait]
impl Executor for CountingExecutor {
    fn name(&self) -> &'static str {
        "Counting"
    }

    async fn execute(
        &self,
        intent: &OrderIntent,
        _: Option<&Quote>,
    ) -> execution::Result<ExecutionOutcome> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok(ExecutionOutcome::Accepted {
            order_id: "1".into(),
            price: dec!(100),
            size: intent.size,
        })
    }
}

#[tokio::test]
async fn shutdown_abandons_an_evaluation_in_flight() {
    let settings = BotSettings {
        symbol: symbol().0,
        timeframes: TimeframeSet {
            higher: Timeframe::H4,
            middle: Timeframe::H1,
            lower: Timeframe::M15,
        },
        lookback: TimeframeSet {
            higher: 100,
            middle: 100,
            lower: 100,
        },
        cycle_minutes: 15,
        retry_cooldown_secs: 60,
    };
    let executor = Arc::new(CountingExecutor::default());
    let bot = Bot::new(
        &settings,
        Box::new(WaveTrendFlow::new(IndicatorSettings::default()).unwrap()),
        Box::new(manager()),
        Sources {
            market_data: Arc::new(StalledMarket),
            account: Arc::new(FlatAccount),
            quotes: Arc::new(FixedQuote),
        },
        executor.clone(),
    );

    let engine = Engine::new(bot, &settings);
    let stopped = tokio::time::timeout(
        Duration::from_secs(5),
        engine.run(tokio::time::sleep(Duration::from_millis(20))),
    )
    .await;

    assert!(stopped.is_ok(), "engine did not stop on shutdown");
    assert_eq!(executor.0.load(Ordering::SeqCst), 0);
}
