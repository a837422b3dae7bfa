// In crates/execution/src/lib.rs

use async_trait::async_trait;
use core_types::{ExecutionOutcome, OrderIntent, Quote};

pub mod error;
pub mod live;
pub mod paper;
pub mod types;

// Re-export public types
pub use error::{Error, Result};
pub use live::LiveExecutor;
pub use paper::PaperExecutor;
pub use types::{Portfolio, SharedPortfolio, SimulatedPosition};

/// The universal interface for an execution handler.
///
/// An `Executor` takes a fully computed `OrderIntent` and submits it to a
/// target, which could be a live exchange or a paper portfolio.
///
/// A rejection by the target is an `Ok(ExecutionOutcome::Rejected)`; only
/// failures to reach the target at all are errors.
#[async_trait]
pub trait Executor: Send + Sync {
    /// The name of the executor (e.g., "LiveExecutor", "PaperExecutor").
    fn name(&self) -> &'static str;

    /// Executes a market order. `quote` is the market at decision time, when it
    /// could be read.
    async fn execute(&self, intent: &OrderIntent, quote: Option<&Quote>) -> Result<ExecutionOutcome>;
}
