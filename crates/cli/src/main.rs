//! Process entry point.
//!
//! Wires the collaborators (exchange, ledger, state store, optional AI
//! provider) that every `BotInstance` shares, loads the bots this
//! process should manage, and drives `BotManager::run` to completion
//! (§4.1): start everything, block until a shutdown signal, then
//! `stop_all` before exiting.
//!
//! REST/webhook/chat-command framing is out of scope here (§1
//! non-goals) — this binary is the process that an external admin
//! surface would be layered on top of, not that surface itself.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use perpbot_bot_orchestrator::manager::Collaborators;
use perpbot_bot_orchestrator::BotManager;
use perpbot_core::config_loader::ConfigLoader;
use perpbot_core::BotConfig;
use perpbot_exchange::{Exchange, GuardedExchange, RestExchangeClient};
use perpbot_ledger::{DummyLedgerStore, LedgerStore, PgLedgerStore};
use perpbot_signals::{AiProvider, HttpAiProvider};
use perpbot_state_store::connect_or_fallback;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "perpbot")]
#[command(about = "Multi-tenant perpetual-futures trading-bot orchestrator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start every bot listed in `--bots` and run until a shutdown signal.
    Run {
        /// Bots manifest (TOML). See `bots.example.toml`.
        #[arg(long, default_value = "config/bots.toml")]
        bots: PathBuf,
        /// Process-level profile overlay, e.g. "testnet".
        #[arg(long)]
        profile: Option<String>,
    },
    /// Parse and validate a bots manifest without starting anything.
    CheckBots {
        #[arg(long, default_value = "config/bots.toml")]
        bots: PathBuf,
    },
}

/// On-disk shape of one entry in the bots manifest. Distinct from
/// `BotConfig` itself: a fresh `bot_id` is minted for every process
/// start rather than pinned in the file, and risk-level defaults are
/// left as `None` unless the manifest overrides them.
#[derive(Debug, Deserialize)]
struct BotSpec {
    bot_name: String,
    symbol: String,
    risk_level: perpbot_core::config::RiskLevel,
    #[serde(default)]
    leverage: Option<u32>,
    #[serde(default)]
    position_size_pct: Option<f64>,
    #[serde(default)]
    take_profit_pct: Option<f64>,
    #[serde(default)]
    stop_loss_pct: Option<f64>,
    #[serde(default)]
    time_cut_minutes: Option<i64>,
    #[serde(default)]
    rsi_oversold: Option<f64>,
    #[serde(default)]
    rsi_overbought: Option<f64>,
    #[serde(default)]
    volume_threshold: Option<f64>,
    #[serde(default)]
    is_testnet: bool,
    #[serde(default)]
    description: Option<String>,
}

impl BotSpec {
    fn into_config(self) -> Result<BotConfig> {
        let mut cfg = BotConfig::new(self.bot_name, self.symbol, self.risk_level)
            .context("invalid bot manifest entry")?;
        cfg.leverage = self.leverage;
        cfg.position_size_pct = self.position_size_pct;
        cfg.take_profit_pct = self.take_profit_pct;
        cfg.stop_loss_pct = self.stop_loss_pct;
        cfg.time_cut_minutes = self.time_cut_minutes;
        cfg.rsi_oversold = self.rsi_oversold;
        cfg.rsi_overbought = self.rsi_overbought;
        cfg.volume_threshold = self.volume_threshold;
        cfg.is_testnet = self.is_testnet;
        cfg.description = self.description;
        cfg.validate()?;
        Ok(cfg)
    }
}

#[derive(Debug, Deserialize)]
struct BotsManifest {
    #[serde(default)]
    bots: Vec<BotSpec>,
}

fn load_bots(path: &PathBuf) -> Result<Vec<BotConfig>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read bots manifest at {}", path.display()))?;
    let manifest: BotsManifest =
        toml::from_str(&raw).with_context(|| format!("failed to parse bots manifest at {}", path.display()))?;
    manifest.bots.into_iter().map(BotSpec::into_config).collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { bots, profile } => run(&bots, profile.as_deref()).await,
        Commands::CheckBots { bots } => {
            let loaded = load_bots(&bots)?;
            for cfg in &loaded {
                tracing::info!(bot_name = %cfg.bot_name, symbol = %cfg.symbol, "manifest entry ok");
            }
            println!("{} bot(s) validated", loaded.len());
            Ok(())
        }
    }
}

async fn run(bots_path: &PathBuf, profile: Option<&str>) -> Result<()> {
    let process = match profile {
        Some(p) => ConfigLoader::load_with_profile(p)?,
        None => ConfigLoader::load()?,
    };

    let exchange: Arc<dyn Exchange> = {
        let raw = RestExchangeClient::new(
            exchange_base_url(process.exchange.is_testnet),
            Duration::from_secs(process.exchange.timeout_secs),
        );
        Arc::new(GuardedExchange::new(raw, 5, Duration::from_secs(60)))
    };

    let ledger: Arc<dyn LedgerStore> = match sqlx::PgPool::connect(&process.ledger.url).await {
        Ok(pool) => Arc::new(PgLedgerStore::new(pool)),
        Err(err) => {
            tracing::warn!(error = %err, "ledger unreachable at startup; trading continues without history");
            Arc::new(DummyLedgerStore)
        }
    };

    let state_store = connect_or_fallback(&process.state_store.url, &process.state_store.key_prefix).await;

    let ai_provider: Option<Arc<dyn AiProvider>> = std::env::var("PERPBOT_AI_ENDPOINT").ok().map(|endpoint| {
        let api_key = std::env::var("PERPBOT_AI_API_KEY").unwrap_or_default();
        Arc::new(HttpAiProvider::new(endpoint, api_key)) as Arc<dyn AiProvider>
    });

    let manager = BotManager::new(Collaborators {
        process: Arc::new(process),
        exchange,
        ledger,
        state_store,
        ai_provider,
    });

    for cfg in load_bots(bots_path)? {
        let name = cfg.bot_name.clone();
        manager.add_bot(cfg).await.with_context(|| format!("failed to register bot {name}"))?;
    }

    manager.start_all().await;
    tracing::info!("all bots started; awaiting shutdown signal");

    tokio::signal::ctrl_c().await.context("failed to listen for shutdown signal")?;
    tracing::info!("shutdown signal received, stopping all bots");

    manager.stop_all().await;
    Ok(())
}

/// The `testnet` flag selects a sandbox endpoint without changing the
/// `Exchange` contract (§6.1); which sandbox a concrete venue exposes
/// is wire-encoding detail out of scope (§1), so this is a placeholder
/// the operator overrides per deployment.
fn exchange_base_url(is_testnet: bool) -> String {
    if is_testnet {
        std::env::var("PERPBOT_EXCHANGE_TESTNET_URL").unwrap_or_else(|_| "https://testnet.exchange.example".into())
    } else {
        std::env::var("PERPBOT_EXCHANGE_URL").unwrap_or_else(|_| "https://exchange.example".into())
    }
}
