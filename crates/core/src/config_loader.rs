use anyhow::Result;
use figment::providers::{Env, Format, Json, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

/// Process-level settings that are *not* part of a single bot's config
/// (those come through the admin surface / `addBot`). Loaded once at
/// startup from a TOML base file, environment overrides, and an
/// optional JSON overlay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessConfig {
    #[serde(default = "default_loop_interval_secs")]
    pub loop_interval_secs: u64,

    pub server: ServerConfig,
    pub state_store: StateStoreConfig,
    pub ledger: LedgerConfig,

    #[serde(default)]
    pub ai: AiConfig,

    #[serde(default)]
    pub exchange: ExchangeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateStoreConfig {
    pub url: String,
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    #[serde(default = "default_ai_model")]
    pub model: String,
    #[serde(default = "default_ai_temperature")]
    pub temperature: f64,
    #[serde(default = "default_ai_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_ai_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            model: default_ai_model(),
            temperature: default_ai_temperature(),
            max_tokens: default_ai_max_tokens(),
            timeout_secs: default_ai_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeConfig {
    #[serde(default = "default_exchange_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub is_testnet: bool,
    #[serde(default)]
    pub use_real_balance: bool,
    #[serde(default = "default_notional_capital")]
    pub fixed_notional_capital: rust_decimal::Decimal,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_exchange_timeout_secs(),
            is_testnet: false,
            use_real_balance: false,
            fixed_notional_capital: default_notional_capital(),
        }
    }
}

const fn default_loop_interval_secs() -> u64 {
    300
}

fn default_key_prefix() -> String {
    "perpbot".to_string()
}

fn default_ai_model() -> String {
    "gpt-4o-mini".to_string()
}

const fn default_ai_temperature() -> f64 {
    0.2
}

const fn default_ai_max_tokens() -> u32 {
    200
}

const fn default_ai_timeout_secs() -> u64 {
    30
}

const fn default_exchange_timeout_secs() -> u64 {
    10
}

fn default_notional_capital() -> rust_decimal::Decimal {
    rust_decimal::Decimal::from(1000)
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads process config by merging a TOML base file, `PERPBOT_`
    /// environment variables, and an optional JSON overlay.
    ///
    /// # Errors
    /// Returns an error if configuration files cannot be read or parsed.
    pub fn load() -> Result<ProcessConfig> {
        let config: ProcessConfig = Figment::new()
            .merge(Toml::file("config/Config.toml"))
            .merge(Env::prefixed("PERPBOT_"))
            .join(Json::file("config/Config.json"))
            .extract()?;
        Ok(config)
    }

    /// Loads process config with a profile-specific TOML overlay
    /// (`config/Config.<profile>.toml`), e.g. for testnet vs mainnet.
    ///
    /// # Errors
    /// Returns an error if configuration files cannot be read or parsed.
    pub fn load_with_profile(profile: &str) -> Result<ProcessConfig> {
        let config: ProcessConfig = Figment::new()
            .merge(Toml::file("config/Config.toml"))
            .merge(Toml::file(format!("config/Config.{profile}.toml")))
            .merge(Env::prefixed("PERPBOT_"))
            .join(Json::file("config/Config.json"))
            .extract()?;
        Ok(config)
    }
}
