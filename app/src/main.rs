// In app/src/main.rs

use anyhow::{Context, Result};
use api_client::{ApiClient, BrokerSession};
use app_config::Settings;
use clap::{Parser, Subcommand};
use engine::{AccountSource, Bot, Engine, PaperAccount, Sources};
use execution::{Executor, LiveExecutor, PaperExecutor};
use risk::SinglePositionManager;
use std::str::FromStr;
use std::sync::Arc;
use strategies::WaveTrendFlow;
use tracing_subscriber::prelude::*;

// --- Command-Line Interface Definition ---

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = "A multi-timeframe WaveTrend and flow trading bot.")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Runs the trading loop until Ctrl-C, in live or paper mode.
    Run,

    /// Runs a single trading cycle and exits.
    Once,

    /// Prints the current signal flags without trading.
    Signals,
}

// --- Main Application Entry Point ---

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from a .env file, if it exists.
    dotenvy::dotenv().ok();

    // Parse command-line arguments.
    let cli = Cli::parse();

    let settings = app_config::load_settings().context("Failed to load settings")?;
    init_tracing(&settings.app.log_level)?;

    tracing::info!(
        environment = %settings.app.environment,
        symbol = %settings.bot.symbol,
        live = settings.app.live_trading_enabled,
        "Starting trend bot"
    );

    // The session is released on every path out of here, including errors.
    let client = ApiClient::new(&settings.binance)?;
    let session = BrokerSession::open(client, settings.app.live_trading_enabled)
        .await
        .context("Failed to open broker session")?;

    let result = match cli.command {
        Commands::Run => run(&settings, &session).await,
        Commands::Once => run_once(&settings, &session).await,
        Commands::Signals => print_signals(&settings, &session).await,
    };

    session.close();
    result
}

fn init_tracing(log_level: &str) -> Result<()> {
    let level = tracing::Level::from_str(log_level)
        .with_context(|| format!("Invalid app.log_level '{log_level}'"))?;

    let fmt_layer = tracing_subscriber::fmt::layer().with_filter(
        tracing_subscriber::filter::Targets::new()
            .with_target("hyper", tracing::Level::WARN)
            .with_target("reqwest", tracing::Level::WARN)
            .with_default(level),
    );
    tracing_subscriber::registry().with(fmt_layer).init();
    Ok(())
}

/// Wires the strategy, risk manager, sources and executor into a bot.
///
/// Live mode reads the exchange account and places real orders. Paper mode
/// still reads market data from the exchange but fills against a simulated
/// portfolio.
fn build_bot(settings: &Settings, client: &ApiClient) -> Result<Bot> {
    let strategy = WaveTrendFlow::new(settings.strategy.clone())?;
    let risk_manager = SinglePositionManager::new(&settings.risk)?;

    let account: Arc<dyn AccountSource>;
    let executor: Arc<dyn Executor>;
    if settings.app.live_trading_enabled {
        tracing::warn!("LIVE TRADING IS ENABLED. REAL ORDERS WILL BE PLACED.");
        account = Arc::new(client.clone());
        executor = Arc::new(LiveExecutor::new(client.clone()));
    } else {
        let paper = PaperExecutor::new(&settings.paper)?;
        tracing::info!(initial_cash = settings.paper.initial_cash, "Paper trading. Orders are simulated.");
        account = Arc::new(PaperAccount::new(paper.portfolio()));
        executor = Arc::new(paper);
    }

    let sources = Sources {
        market_data: Arc::new(client.clone()),
        account,
        quotes: Arc::new(client.clone()),
    };

    Ok(Bot::new(
        &settings.bot,
        Box::new(strategy),
        Box::new(risk_manager),
        sources,
        executor,
    ))
}

// --- "Run" Subcommand Logic ---

async fn run(settings: &Settings, session: &BrokerSession) -> Result<()> {
    let bot = build_bot(settings, session.client())?;
    Engine::new(bot, &settings.bot).run(shutdown_signal()).await;
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Ctrl-C received. Shutting down."),
        Err(e) => tracing::error!(error = %e, "Could not listen for Ctrl-C. Shutting down."),
    }
}

// --- "Once" Subcommand Logic ---

async fn run_once(settings: &Settings, session: &BrokerSession) -> Result<()> {
    let bot = build_bot(settings, session.client())?;
    let outcome = Engine::new(bot, &settings.bot).run_once().await?;
    tracing::info!(?outcome, "Cycle finished.");
    Ok(())
}

// --- "Signals" Subcommand Logic ---

async fn print_signals(settings: &Settings, session: &BrokerSession) -> Result<()> {
    let bot = build_bot(settings, session.client())?;
    let snapshot = bot.snapshot().await?;

    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    println!("signal: {:?}", snapshot.evaluate());
    Ok(())
}
