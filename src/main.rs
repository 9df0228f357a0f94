use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;
use tracing_subscriber::prelude::*;

use tradewarden::application::account_cache::AccountDataCache;
use tradewarden::application::logger::StructuredLogger;
use tradewarden::application::market_data::{MarketData, TradingHoursValidator};
use tradewarden::application::order_manager::OrderManager;
use tradewarden::application::retry::{CircuitBreakerHandle, RetryPolicy};
use tradewarden::application::safety_checks::SafetyChecks;
use tradewarden::application::session_health::SessionHealth;
use tradewarden::application::trading_bot::TradingBot;
use tradewarden::domain::config::Config;
use tradewarden::domain::risk::pending::PendingOrderRegistry;
use tradewarden::infrastructure::broker::http_stub::HttpBrokerAdapter;
use tradewarden::infrastructure::persistence::circuit_breaker::FileCircuitBreakerStateRepository;

#[derive(Parser)]
#[command(name = "tradewarden", about = "Automated equity trading platform")]
struct Cli {
    /// Path to a TOML config file. Falls back to `Config::default()` when absent.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Root directory for JSONL logs and circuit-breaker state.
    #[arg(long, global = true, default_value = "logs")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Runs the trading bot's session-health timer until interrupted.
    Run {
        #[arg(long)]
        broker_base_url: String,
    },
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<Config> {
    match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)?;
            Ok(toml::from_str(&raw)?)
        }
        None => Ok(Config::default()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;
    config.risk_management.validate()?;

    match cli.command {
        Command::Run { broker_base_url } => run(config, cli.data_dir, broker_base_url).await,
    }
}

async fn run(config: Config, data_dir: PathBuf, broker_base_url: String) -> anyhow::Result<()> {
    let broker = Arc::new(HttpBrokerAdapter::new(broker_base_url));
    let logger = Arc::new(StructuredLogger::new(data_dir.clone()));
    let retry_policy = RetryPolicy::default();

    let account_cache = Arc::new(AccountDataCache::new(
        broker.clone(),
        logger.clone(),
        retry_policy,
        config.account_cache.volatile_ttl_s,
        config.account_cache.stable_ttl_s,
    ));

    let trading_hours = TradingHoursValidator::new(
        config.trading_window.start_hour_et as u32,
        config.trading_window.end_hour_et as u32,
        &config.trading_window.timezone,
    );
    let market_data = Arc::new(MarketData::new(
        broker.clone(),
        retry_policy,
        config.quote_staleness_threshold_s,
        trading_hours,
        Vec::new(),
    ));

    let breaker_repository = Arc::new(FileCircuitBreakerStateRepository::new(data_dir.join("circuit_breaker.json")));
    let pending = Arc::new(Mutex::new(PendingOrderRegistry::default()));
    let safety_checks = Arc::new(
        SafetyChecks::load(
            config.risk_management,
            trading_hours,
            CircuitBreakerHandle::new(3600, 3),
            breaker_repository,
            pending.clone(),
            logger.clone(),
        )
        .await,
    );

    let order_manager = Arc::new(OrderManager::new(
        broker.clone(),
        retry_policy,
        config.order_management,
        pending,
        account_cache.clone(),
        logger.clone(),
    ));

    let session_health = SessionHealth::new(broker, retry_policy, CircuitBreakerHandle::new(3600, 3), logger.clone());

    let bot = TradingBot::new(
        market_data,
        safety_checks,
        order_manager,
        account_cache,
        session_health,
        logger,
        config.paper_trading,
        config.health_check_interval_s as u64,
        config.config_hash(),
    );

    bot.start().await;
    info!("tradewarden running, press ctrl-c to stop");
    tokio::signal::ctrl_c().await?;
    bot.stop().await;
    Ok(())
}
