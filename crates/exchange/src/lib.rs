pub mod client;
pub mod dummy;
pub mod guarded;
pub mod paper;
pub mod rest_client;
pub mod types;

pub use client::Exchange;
pub use dummy::DummyExchange;
pub use guarded::GuardedExchange;
pub use paper::PaperExchange;
pub use rest_client::RestExchangeClient;
pub use types::{
    AccountBalance, ClosePositionResult, ExchangePosition, Kline, OrderResult, Ticker24h,
};
