pub mod circuit_breaker;
pub mod config;
pub mod config_loader;
pub mod domain;
pub mod error;
pub mod ledger_types;
pub mod memory;
pub mod retry;
pub mod symbol;
pub mod zones;

pub use circuit_breaker::{CircuitBreaker, CircuitState};
pub use config::{BotConfig, RiskLevel};
pub use config_loader::{ConfigLoader, ProcessConfig};
pub use domain::{
    BotRuntimeState, EnsembleResult, IndividualSignal, Position, Side, Signal, SignalKind,
};
pub use error::AppError;
pub use ledger_types::{ExitReason, TradeLedgerRow, TradeStatus};
pub use memory::MemoryContext;
pub use zones::rsi_zone;
