// In crates/engine/src/lib.rs

pub mod bot;
pub mod error;
pub mod sources;

use app_config::BotSettings;
use chrono::Utc;
use std::future::Future;
use std::time::Duration;

pub use bot::{Bot, CycleOutcome, CycleState, Decision, PendingOrder, Sources};
pub use error::{Error, Result};
pub use sources::{AccountSource, AccountStatus, MarketDataSource, PaperAccount, QuoteSource};

/// Drives a [`Bot`] on a wall-clock schedule.
pub struct Engine {
    bot: Bot,
    cycle_ms: i64,
    retry_cooldown: Duration,
}

impl Engine {
    pub fn new(bot: Bot, settings: &BotSettings) -> Self {
        Self {
            bot,
            cycle_ms: i64::try_from(settings.cycle_minutes.saturating_mul(60_000)).unwrap_or(i64::MAX),
            retry_cooldown: Duration::from_secs(settings.retry_cooldown_secs),
        }
    }

    /// Runs a single cycle to completion.
    pub async fn run_once(&mut self) -> Result<CycleOutcome> {
        self.bot.run_cycle().await
    }

    /// The main run method.
    ///
    /// Runs a cycle straight away and then one at every cycle boundary. A failed
    /// cycle is logged and retried after the cooldown. Returns once `shutdown`
    /// resolves; an evaluation still in flight is abandoned, an order already
    /// being submitted is allowed to finish.
    pub async fn run(mut self, shutdown: impl Future<Output = ()>) {
        tokio::pin!(shutdown);
        tracing::info!(symbol = %self.bot.symbol(), cycle_ms = self.cycle_ms, "Engine started.");

        loop {
            let evaluated = tokio::select! {
                _ = &mut shutdown => break,
                evaluated = self.bot.evaluate() => evaluated,
            };

            let result = match evaluated {
                Ok(Decision::Submit(order)) => self.bot.submit(order).await,
                Ok(Decision::Done(outcome)) => Ok(outcome),
                Err(e) => Err(e),
            };

            let pause = match result {
                Ok(outcome) => {
                    tracing::info!(?outcome, "Cycle complete.");
                    next_boundary_delay(Utc::now().timestamp_millis(), self.cycle_ms)
                }
                Err(e) => {
                    tracing::error!(error = %e, cooldown_secs = self.retry_cooldown.as_secs(), "Cycle failed. Retrying after cooldown.");
                    self.retry_cooldown
                }
            };

            tokio::select! {
                _ = &mut shutdown => break,
                _ = tokio::time::sleep(pause) => {}
            }
        }

        tracing::info!("Shutdown requested. Engine stopped.");
    }
}

/// Time from `now_ms` until the next multiple of `period_ms` since the epoch.
///
/// A time exactly on a boundary waits a full period.
pub fn next_boundary_delay(now_ms: i64, period_ms: i64) -> Duration {
    if period_ms <= 0 {
        return Duration::ZERO;
    }
    let elapsed = now_ms.rem_euclid(period_ms);
    Duration::from_millis(u64::try_from(period_ms - elapsed).unwrap_or(0))
}
