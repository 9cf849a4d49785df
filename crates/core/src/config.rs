use crate::error::AppError;
use crate::symbol;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Seeds the numeric defaults for a bot when a config field is left `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

struct RiskDefaults {
    leverage: u32,
    position_size_pct: f64,
    take_profit_pct: f64,
    stop_loss_pct: f64,
    rsi_oversold: f64,
    rsi_overbought: f64,
    volume_threshold: f64,
    time_cut_minutes: i64,
}

impl RiskLevel {
    const fn defaults(self) -> RiskDefaults {
        match self {
            Self::Low => RiskDefaults {
                leverage: 10,
                position_size_pct: 0.03,
                take_profit_pct: 0.003,
                stop_loss_pct: 0.003,
                rsi_oversold: 30.0,
                rsi_overbought: 70.0,
                volume_threshold: 1.0,
                time_cut_minutes: 180,
            },
            Self::Medium => RiskDefaults {
                leverage: 15,
                position_size_pct: 0.05,
                take_profit_pct: 0.004,
                stop_loss_pct: 0.004,
                rsi_oversold: 32.0,
                rsi_overbought: 68.0,
                volume_threshold: 1.2,
                time_cut_minutes: 120,
            },
            Self::High => RiskDefaults {
                leverage: 20,
                position_size_pct: 0.08,
                take_profit_pct: 0.006,
                stop_loss_pct: 0.006,
                rsi_oversold: 35.0,
                rsi_overbought: 65.0,
                volume_threshold: 1.5,
                time_cut_minutes: 90,
            },
        }
    }
}

/// Immutable-per-lifetime bot configuration, revisable via the admin API
/// (a new `BotConfig` replaces the old one; the running instance picks it
/// up at the next tick boundary).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    pub bot_id: Uuid,
    pub bot_name: String,
    pub symbol: String,
    pub risk_level: RiskLevel,

    pub leverage: Option<u32>,
    pub position_size_pct: Option<f64>,
    pub take_profit_pct: Option<f64>,
    pub stop_loss_pct: Option<f64>,
    pub time_cut_minutes: Option<i64>,
    pub rsi_oversold: Option<f64>,
    pub rsi_overbought: Option<f64>,
    pub volume_threshold: Option<f64>,

    #[serde(default)]
    pub is_testnet: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub description: Option<String>,
}

const fn default_true() -> bool {
    true
}

impl BotConfig {
    /// Builds and validates a new bot config.
    ///
    /// Uppercases `symbol`; checks it against the whitelist, checks
    /// `bot_name` length, and checks numeric parameters are within the
    /// documented ranges. A position size above 10% is accepted but
    /// logs a warning rather than being rejected.
    ///
    /// # Errors
    /// Returns `AppError::BadRequest` if any invariant is violated.
    pub fn new(
        bot_name: String,
        symbol: String,
        risk_level: RiskLevel,
    ) -> Result<Self, AppError> {
        let cfg = Self {
            bot_id: Uuid::new_v4(),
            bot_name,
            symbol: symbol.to_uppercase(),
            risk_level,
            leverage: None,
            position_size_pct: None,
            take_profit_pct: None,
            stop_loss_pct: None,
            time_cut_minutes: None,
            rsi_oversold: None,
            rsi_overbought: None,
            volume_threshold: None,
            is_testnet: false,
            is_active: true,
            description: None,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    /// Re-validates this config. Called on construction and on every
    /// admin `update` so an in-place edit can't smuggle in a bad symbol
    /// or an out-of-range leverage.
    ///
    /// # Errors
    /// Returns `AppError::BadRequest` describing the first invariant
    /// violation found.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.bot_name.is_empty() || self.bot_name.chars().count() > 50 {
            return Err(AppError::BadRequest(
                "bot_name must be 1-50 characters".into(),
            ));
        }
        if !symbol::is_whitelisted(&self.symbol) {
            return Err(AppError::BadRequest(format!(
                "symbol {} is not in the trading whitelist",
                self.symbol
            )));
        }
        if let Some(lev) = self.leverage {
            if !(1..=125).contains(&lev) {
                return Err(AppError::BadRequest(
                    "leverage must be between 1 and 125".into(),
                ));
            }
        }
        if let Some(pct) = self.position_size_pct {
            if !(pct > 0.0 && pct <= 1.0) {
                return Err(AppError::BadRequest(
                    "position_size_pct must be in (0, 1]".into(),
                ));
            }
            if pct > 0.1 {
                tracing::warn!(
                    bot_name = %self.bot_name,
                    position_size_pct = pct,
                    "position size exceeds 10% of notional capital"
                );
            }
        }
        if let Some(tp) = self.take_profit_pct {
            if tp <= 0.0 {
                return Err(AppError::BadRequest("take_profit_pct must be > 0".into()));
            }
        }
        if let Some(sl) = self.stop_loss_pct {
            if sl <= 0.0 {
                return Err(AppError::BadRequest("stop_loss_pct must be > 0".into()));
            }
        }
        if let Some(tc) = self.time_cut_minutes {
            if tc <= 0 {
                return Err(AppError::BadRequest("time_cut_minutes must be > 0".into()));
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn effective_leverage(&self) -> u32 {
        self.leverage.unwrap_or(self.risk_level.defaults().leverage)
    }

    #[must_use]
    pub fn effective_position_size_pct(&self) -> f64 {
        self.position_size_pct
            .unwrap_or(self.risk_level.defaults().position_size_pct)
    }

    #[must_use]
    pub fn effective_take_profit_pct(&self) -> f64 {
        self.take_profit_pct
            .unwrap_or(self.risk_level.defaults().take_profit_pct)
    }

    #[must_use]
    pub fn effective_stop_loss_pct(&self) -> f64 {
        self.stop_loss_pct
            .unwrap_or(self.risk_level.defaults().stop_loss_pct)
    }

    #[must_use]
    pub fn effective_time_cut_minutes(&self) -> i64 {
        self.time_cut_minutes
            .unwrap_or(self.risk_level.defaults().time_cut_minutes)
    }

    #[must_use]
    pub fn effective_rsi_oversold(&self) -> f64 {
        self.rsi_oversold
            .unwrap_or(self.risk_level.defaults().rsi_oversold)
    }

    #[must_use]
    pub fn effective_rsi_overbought(&self) -> f64 {
        self.rsi_overbought
            .unwrap_or(self.risk_level.defaults().rsi_overbought)
    }

    #[must_use]
    pub fn effective_volume_threshold(&self) -> f64 {
        self.volume_threshold
            .unwrap_or(self.risk_level.defaults().volume_threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_whitelisted_symbol() {
        let err = BotConfig::new("bot1".into(), "SHIBUSDT".into(), RiskLevel::Low).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn uppercases_symbol() {
        let cfg = BotConfig::new("bot1".into(), "btcusdt".into(), RiskLevel::Low).unwrap();
        assert_eq!(cfg.symbol, "BTCUSDT");
    }

    #[test]
    fn effective_values_fall_back_to_risk_defaults() {
        let cfg = BotConfig::new("bot1".into(), "BTCUSDT".into(), RiskLevel::Medium).unwrap();
        assert_eq!(cfg.effective_leverage(), 15);
        assert!((cfg.effective_position_size_pct() - 0.05).abs() < f64::EPSILON);
        assert!((cfg.effective_take_profit_pct() - 0.004).abs() < f64::EPSILON);
    }

    #[test]
    fn explicit_value_overrides_risk_default() {
        let mut cfg = BotConfig::new("bot1".into(), "BTCUSDT".into(), RiskLevel::Low).unwrap();
        cfg.leverage = Some(42);
        assert_eq!(cfg.effective_leverage(), 42);
    }

    #[test]
    fn oversized_position_is_accepted_with_warning() {
        let mut cfg = BotConfig::new("bot1".into(), "BTCUSDT".into(), RiskLevel::Low).unwrap();
        cfg.position_size_pct = Some(0.25);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn rejects_leverage_out_of_range() {
        let mut cfg = BotConfig::new("bot1".into(), "BTCUSDT".into(), RiskLevel::Low).unwrap();
        cfg.leverage = Some(200);
        assert!(cfg.validate().is_err());
    }
}
