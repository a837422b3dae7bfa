// In crates/engine/src/bot.rs

use crate::sources::{AccountSource, MarketDataSource, QuoteSource};
use crate::{Error, Result};
use app_config::{BotSettings, TimeframeSet};
use core_types::{CandleSeries, ExecutionOutcome, OrderIntent, Quote, Signal, Symbol, Timeframe};
use execution::Executor;
use risk::{AccountSnapshot, RiskManager};
use std::sync::Arc;
use strategies::Strategy;

/// Where the bot is within a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    Idle,
    Evaluating,
    Ordering,
}

/// How a cycle ended.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// The strategy said `Hold`.
    NoSignal,
    /// A signal fired but the instrument already has a position.
    PositionOpen { signal: Signal },
    /// A timeframe could not be fetched in full. Nothing was decided.
    DataUnavailable { timeframe: Timeframe, reason: String },
    /// An intent was submitted and the executor answered.
    Ordered {
        intent: OrderIntent,
        outcome: ExecutionOutcome,
    },
}

/// A fully computed order, ready to submit. Only [`Bot::evaluate`] creates one.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingOrder {
    intent: OrderIntent,
    quote: Option<Quote>,
}

impl PendingOrder {
    pub fn intent(&self) -> &OrderIntent {
        &self.intent
    }
}

/// The result of the evaluation phase.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// The cycle is over without an order.
    Done(CycleOutcome),
    Submit(PendingOrder),
}

/// The external collaborators a bot reads from.
#[derive(Clone)]
pub struct Sources {
    pub market_data: Arc<dyn MarketDataSource>,
    pub account: Arc<dyn AccountSource>,
    pub quotes: Arc<dyn QuoteSource>,
}

/// A trading instance for one instrument across three timeframes.
///
/// A cycle is split in two phases. [`Bot::evaluate`] fetches candles, derives
/// indicators and decides; it may be abandoned at any await point without side
/// effects. [`Bot::submit`] executes the resulting order and is meant to run to
/// completion.
pub struct Bot {
    state: CycleState,
    pipeline: Pipeline,
}

struct Pipeline {
    symbol: Symbol,
    timeframes: TimeframeSet<Timeframe>,
    lookback: TimeframeSet<usize>,
    strategy: Box<dyn Strategy + Send + Sync>,
    risk_manager: Box<dyn RiskManager + Send + Sync>,
    sources: Sources,
    executor: Arc<dyn Executor>,
}

impl Bot {
    pub fn new(
        settings: &BotSettings,
        strategy: Box<dyn Strategy + Send + Sync>,
        risk_manager: Box<dyn RiskManager + Send + Sync>,
        sources: Sources,
        executor: Arc<dyn Executor>,
    ) -> Self {
        tracing::info!(
            symbol = %settings.symbol,
            strategy = strategy.name(),
            risk_manager = risk_manager.name(),
            executor = executor.name(),
            "Creating new bot instance."
        );

        Self {
            state: CycleState::Idle,
            pipeline: Pipeline {
                symbol: Symbol(settings.symbol.clone()),
                timeframes: settings.timeframes,
                lookback: settings.lookback,
                strategy,
                risk_manager,
                sources,
                executor,
            },
        }
    }

    pub fn symbol(&self) -> &Symbol {
        &self.pipeline.symbol
    }

    pub fn state(&self) -> CycleState {
        self.state
    }

    /// Runs the evaluation phase.
    ///
    /// Leaves the bot `Ordering` when an order is pending, `Idle` otherwise,
    /// including when the returned future is dropped before completing.
    pub async fn evaluate(&mut self) -> Result<Decision> {
        let mut guard = EvaluationGuard::enter(&mut self.state);
        let decision = self.pipeline.decide().await;

        if let Ok(Decision::Submit(_)) = &decision {
            guard.advance(CycleState::Ordering);
        }
        decision
    }

    /// Runs the order phase for a decision produced by [`Bot::evaluate`].
    pub async fn submit(&mut self, order: PendingOrder) -> Result<CycleOutcome> {
        self.state = CycleState::Ordering;
        let result = self.pipeline.submit(order).await;
        self.state = CycleState::Idle;
        result
    }

    /// Evaluates and, if needed, submits.
    pub async fn run_cycle(&mut self) -> Result<CycleOutcome> {
        match self.evaluate().await? {
            Decision::Done(outcome) => Ok(outcome),
            Decision::Submit(order) => self.submit(order).await,
        }
    }

    /// Computes the strategy's view of the market without trading.
    pub async fn snapshot(&self) -> Result<strategies::SignalSnapshot> {
        self.pipeline.snapshot().await
    }
}

/// Holds the bot in `Evaluating` and puts it back to `Idle` on drop, unless
/// the evaluation advanced it.
struct EvaluationGuard<'a> {
    state: &'a mut CycleState,
}

impl<'a> EvaluationGuard<'a> {
    fn enter(state: &'a mut CycleState) -> Self {
        *state = CycleState::Evaluating;
        Self { state }
    }

    fn advance(&mut self, next: CycleState) {
        *self.state = next;
    }
}

impl Drop for EvaluationGuard<'_> {
    fn drop(&mut self) {
        if *self.state == CycleState::Evaluating {
            *self.state = CycleState::Idle;
        }
    }
}

impl Pipeline {
    /// Fetches one timeframe. Short series count as unavailable.
    async fn fetch(&self, timeframe: Timeframe, count: usize) -> Result<CandleSeries> {
        let series = self
            .sources
            .market_data
            .fetch_candles(&self.symbol, timeframe, count)
            .await?;

        if series.symbol() != &self.symbol || series.timeframe() != timeframe {
            return Err(Error::DataUnavailable {
                timeframe,
                reason: format!("received {} {} candles", series.symbol(), series.timeframe()),
            });
        }
        if series.len() < count {
            return Err(Error::DataUnavailable {
                timeframe,
                reason: format!("expected {count} candles, got {}", series.len()),
            });
        }
        Ok(series)
    }

    async fn snapshot(&self) -> Result<strategies::SignalSnapshot> {
        let higher = self.fetch(self.timeframes.higher, self.lookback.higher).await?;
        let middle = self.fetch(self.timeframes.middle, self.lookback.middle).await?;
        let lower = self.fetch(self.timeframes.lower, self.lookback.lower).await?;

        Ok(self.strategy.snapshot(
            &self.strategy.compute(&higher),
            &self.strategy.compute(&middle),
            &self.strategy.compute(&lower),
        ))
    }

    async fn decide(&self) -> Result<Decision> {
        let snapshot = match self.snapshot().await {
            Ok(snapshot) => snapshot,
            Err(Error::DataUnavailable { timeframe, reason }) => {
                tracing::warn!(symbol = %self.symbol, %timeframe, %reason, "Market data unavailable. Skipping cycle.");
                return Ok(Decision::Done(CycleOutcome::DataUnavailable { timeframe, reason }));
            }
            Err(e) => return Err(e),
        };

        let signal = snapshot.evaluate();
        tracing::debug!(symbol = %self.symbol, ?snapshot, ?signal, "Signals computed.");

        if signal == Signal::Hold {
            return Ok(Decision::Done(CycleOutcome::NoSignal));
        }
        tracing::info!(symbol = %self.symbol, ?signal, "Strategy generated a signal.");

        let status = self.sources.account.account_status(&self.symbol).await?;
        if status.has_open_position {
            tracing::info!(symbol = %self.symbol, "Position already open. Signal ignored.");
            return Ok(Decision::Done(CycleOutcome::PositionOpen { signal }));
        }

        let quote = match self.sources.quotes.quote(&self.symbol).await {
            Ok(quote) => Some(quote),
            Err(e) => {
                tracing::warn!(error = %e, "Quote unavailable. Sizing falls back to the default size.");
                None
            }
        };

        let account = AccountSnapshot {
            equity: status.equity,
            reference_price: quote.map(|q| q.ask),
        };

        let Some(intent) = self
            .risk_manager
            .evaluate(&signal, &self.symbol, status.has_open_position, &account)
        else {
            return Ok(Decision::Done(CycleOutcome::NoSignal));
        };

        tracing::info!(?intent, ?account, "Signal approved by risk manager.");
        Ok(Decision::Submit(PendingOrder { intent, quote }))
    }

    async fn submit(&self, order: PendingOrder) -> Result<CycleOutcome> {
        let PendingOrder { intent, quote } = order;
        let outcome = self.executor.execute(&intent, quote.as_ref()).await?;

        if let ExecutionOutcome::Rejected { reason } = &outcome {
            tracing::warn!(symbol = %self.symbol, %reason, "Order rejected. Not retrying this cycle.");
        }
        Ok(CycleOutcome::Ordered { intent, outcome })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::AccountStatus;
    use async_trait::async_trait;
    use core_types::{Candle, Side};
    use risk::{SinglePositionManager, SizingSettings};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use strategies::{IndicatorFrame, SignalSnapshot};

    /// A strategy that ignores the frames and reports a fixed snapshot.
    struct FixedStrategy(SignalSnapshot);

    impl Strategy for FixedStrategy {
        fn name(&self) -> &'static str {
            "Fixed"
        }

        fn compute(&self, series: &CandleSeries) -> IndicatorFrame {
            IndicatorFrame::new(series.timeframe(), Vec::new())
        }

        fn snapshot(&self, _: &IndicatorFrame, _: &IndicatorFrame, _: &IndicatorFrame) -> SignalSnapshot {
            self.0
        }
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

    #[derive(Default)]
    struct FakeMarket {
        /// Bars returned per timeframe, overriding the requested count.
        short: HashMap<Timeframe, usize>,
        fail: Option<Timeframe>,
        stall: bool,
        /// Answer with candles of another instrument.
        foreign: Option<Symbol>,
    }

    #[async_trait]
    impl MarketDataSource for FakeMarket {
        async fn fetch_candles(&self, symbol: &Symbol, timeframe: Timeframe, count: usize) -> Result<CandleSeries> {
            if self.stall {
                std::future::pending::<()>().await;
            }
            if self.fail == Some(timeframe) {
                return Err(Error::DataUnavailable {
                    timeframe,
                    reason: "feed down".into(),
                });
            }
            let bars = self.short.get(&timeframe).copied().unwrap_or(count);
            let step = timeframe.duration_ms();
            let candles = (0..bars as i64)
                .map(|i| Candle {
                    open_time: i * step,
                    open: dec!(100),
                    high: dec!(101),
                    low: dec!(99),
                    close: dec!(100),
                    volume: dec!(1),
                    close_time: (i + 1) * step - 1,
                })
                .collect();
            let symbol = self.foreign.clone().unwrap_or_else(|| symbol.clone());
            Ok(CandleSeries::new(symbol, timeframe, candles).unwrap())
        }
    }

    #[derive(Default)]
    struct FakeAccount {
        equity: Option<Decimal>,
        open: bool,
        /// Account requests made, counted the way a broker would see them.
        requests: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl AccountSource for FakeAccount {
        async fn account_equity(&self) -> Option<Decimal> {
            self.requests.fetch_add(1, Ordering::SeqCst);
            self.equity
        }

        async fn has_open_position(&self, _: &Symbol) -> Result<bool> {
            self.requests.fetch_add(1, Ordering::SeqCst);
            Ok(self.open)
        }

        async fn account_status(&self, _: &Symbol) -> Result<AccountStatus> {
            self.requests.fetch_add(1, Ordering::SeqCst);
            Ok(AccountStatus {
                has_open_position: self.open,
                equity: self.equity,
            })
        }
    }

    struct FakeQuotes(Option<Quote>);

    #[async_trait]
    impl QuoteSource for FakeQuotes {
        async fn quote(&self, _: &Symbol) -> Result<Quote> {
            self.0.ok_or_else(|| Error::QuoteUnavailable("no book".into()))
        }
    }

    #[derive(Default)]
    struct RecordingExecutor {
        calls: AtomicUsize,
        seen: Mutex<Vec<(OrderIntent, Option<Quote>)>>,
        reject: bool,
    }

    #[async_trait]
    impl Executor for RecordingExecutor {
        fn name(&self) -> &'static str {
            "Recording"
        }

        async fn execute(&self, intent: &OrderIntent, quote: Option<&Quote>) -> execution::Result<ExecutionOutcome> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push((intent.clone(), quote.copied()));
            if self.reject {
                Ok(ExecutionOutcome::Rejected {
                    reason: "market closed".into(),
                })
            } else {
                Ok(ExecutionOutcome::Accepted {
                    order_id: "1".into(),
                    price: dec!(100),
                    size: intent.size,
                })
            }
        }
    }

    fn settings() -> BotSettings {
        BotSettings {
            symbol: "BTCUSDT".into(),
            timeframes: TimeframeSet {
                higher: Timeframe::H4,
                middle: Timeframe::H1,
                lower: Timeframe::M15,
            },
            lookback: TimeframeSet {
                higher: 60,
                middle: 60,
                lower: 60,
            },
            cycle_minutes: 15,
            retry_cooldown_secs: 60,
        }
    }

    struct Harness {
        snapshot: SignalSnapshot,
        market: FakeMarket,
        account: FakeAccount,
        quote: Option<Quote>,
        executor: Arc<RecordingExecutor>,
    }

    impl Default for Harness {
        fn default() -> Self {
            Self {
                snapshot: long_flags(),
                market: FakeMarket::default(),
                account: FakeAccount {
                    equity: Some(dec!(10000)),
                    ..Default::default()
                },
                quote: Some(Quote {
                    bid: dec!(99),
                    ask: dec!(100),
                }),
                executor: Arc::new(RecordingExecutor::default()),
            }
        }
    }

    impl Harness {
        fn build(self) -> (Bot, Arc<RecordingExecutor>) {
            let executor = self.executor;
            let bot = Bot::new(
                &settings(),
                Box::new(FixedStrategy(self.snapshot)),
                Box::new(SinglePositionManager::new(&SizingSettings::default()).unwrap()),
                Sources {
                    market_data: Arc::new(self.market),
                    account: Arc::new(self.account),
                    quotes: Arc::new(FakeQuotes(self.quote)),
                },
                executor.clone(),
            );
            (bot, executor)
        }
    }

    #[tokio::test]
    async fn long_signal_is_sized_and_submitted() {
        let (mut bot, executor) = Harness::default().build();
        let outcome = bot.run_cycle().await.unwrap();

        let expected_intent = OrderIntent {
            symbol: Symbol("BTCUSDT".into()),
            side: Side::Long,
            size: dec!(0.01),
        };
        match outcome {
            CycleOutcome::Ordered { intent, outcome } => {
                assert_eq!(intent, expected_intent);
                assert!(matches!(outcome, ExecutionOutcome::Accepted { .. }));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(executor.calls.load(Ordering::SeqCst), 1);
        assert_eq!(bot.state(), CycleState::Idle);
    }

    #[tokio::test]
    async fn open_position_blocks_order() {
        let (mut bot, executor) = Harness {
            account: FakeAccount {
                equity: Some(dec!(10000)),
                open: true,
                ..Default::default()
            },
            ..Default::default()
        }
        .build();

        let outcome = bot.run_cycle().await.unwrap();
        assert_eq!(outcome, CycleOutcome::PositionOpen { signal: Signal::GoLong });
        assert_eq!(executor.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn hold_ends_cycle_without_order() {
        let (mut bot, executor) = Harness {
            snapshot: SignalSnapshot::default(),
            ..Default::default()
        }
        .build();

        assert_eq!(bot.run_cycle().await.unwrap(), CycleOutcome::NoSignal);
        assert_eq!(executor.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failed_feed_ends_cycle_as_data_unavailable() {
        let (mut bot, executor) = Harness {
            market: FakeMarket {
                fail: Some(Timeframe::H1),
                ..Default::default()
            },
            ..Default::default()
        }
        .build();

        let outcome = bot.run_cycle().await.unwrap();
        assert!(matches!(
            outcome,
            CycleOutcome::DataUnavailable { timeframe: Timeframe::H1, .. }
        ));
        assert_eq!(executor.calls.load(Ordering::SeqCst), 0);
        assert_eq!(bot.state(), CycleState::Idle);
    }

    #[tokio::test]
    async fn short_series_counts_as_unavailable() {
        let (mut bot, _) = Harness {
            market: FakeMarket {
                short: HashMap::from([(Timeframe::M15, 10)]),
                ..Default::default()
            },
            ..Default::default()
        }
        .build();

        let outcome = bot.run_cycle().await.unwrap();
        match outcome {
            CycleOutcome::DataUnavailable { timeframe, reason } => {
                assert_eq!(timeframe, Timeframe::M15);
                assert_eq!(reason, "expected 60 candles, got 10");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn candles_for_another_instrument_count_as_unavailable() {
        let (mut bot, executor) = Harness {
            market: FakeMarket {
                foreign: Some(Symbol("ETHUSDT".into())),
                ..Default::default()
            },
            ..Default::default()
        }
        .build();

        let outcome = bot.run_cycle().await.unwrap();
        match outcome {
            CycleOutcome::DataUnavailable { timeframe, reason } => {
                assert_eq!(timeframe, Timeframe::H4);
                assert_eq!(reason, "received ETHUSDT 4h candles");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(executor.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn account_is_read_once_per_cycle() {
        let requests = Arc::new(AtomicUsize::new(0));
        let (mut bot, executor) = Harness {
            account: FakeAccount {
                equity: Some(dec!(10000)),
                requests: requests.clone(),
                ..Default::default()
            },
            ..Default::default()
        }
        .build();

        bot.run_cycle().await.unwrap();
        assert_eq!(requests.load(Ordering::SeqCst), 1);
        assert_eq!(executor.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn missing_account_and_quote_use_default_size() {
        let (mut bot, executor) = Harness {
            account: FakeAccount::default(),
            quote: None,
            ..Default::default()
        }
        .build();

        bot.run_cycle().await.unwrap();
        let seen = executor.seen.lock().unwrap();
        assert_eq!(seen[0].0.size, dec!(0.1));
        assert_eq!(seen[0].1, None);
    }

    #[tokio::test]
    async fn rejection_is_an_outcome_not_an_error() {
        let (mut bot, executor) = Harness {
            executor: Arc::new(RecordingExecutor {
                reject: true,
                ..Default::default()
            }),
            ..Default::default()
        }
        .build();

        let outcome = bot.run_cycle().await.unwrap();
        assert!(matches!(
            outcome,
            CycleOutcome::Ordered {
                outcome: ExecutionOutcome::Rejected { .. },
                ..
            }
        ));
        assert_eq!(executor.calls.load(Ordering::SeqCst), 1);
        assert_eq!(bot.state(), CycleState::Idle);
    }

    #[tokio::test]
    async fn evaluation_leaves_bot_ordering_until_submitted() {
        let (mut bot, executor) = Harness::default().build();

        let Decision::Submit(order) = bot.evaluate().await.unwrap() else {
            panic!("expected a pending order");
        };
        assert_eq!(bot.state(), CycleState::Ordering);
        assert_eq!(order.intent().side, Side::Long);
        assert_eq!(executor.calls.load(Ordering::SeqCst), 0);

        bot.submit(order).await.unwrap();
        assert_eq!(bot.state(), CycleState::Idle);
        assert_eq!(executor.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn abandoned_evaluation_returns_to_idle() {
        let (mut bot, executor) = Harness {
            market: FakeMarket {
                stall: true,
                ..Default::default()
            },
            ..Default::default()
        }
        .build();

        let timed_out = tokio::time::timeout(std::time::Duration::from_millis(20), bot.evaluate()).await;
        assert!(timed_out.is_err());

        assert_eq!(bot.state(), CycleState::Idle);
        assert_eq!(executor.calls.load(Ordering::SeqCst), 0);
    }
}
