use crate::types::{AccountBalance, ClosePositionResult, ExchangePosition, Kline, OrderResult, Ticker24h};
use anyhow::Result;
use async_trait::async_trait;
use perpbot_core::domain::OrderSide;
use rust_decimal::Decimal;

/// The exchange adapter contract (§6.1). Every implementation — REST-backed,
/// paper, or dummy — must carry a finite deadline on each call; retries and
/// circuit-breaking live above this trait, in the caller (§5, §7).
#[async_trait]
pub trait Exchange: Send + Sync {
    /// # Errors
    /// Returns an error if the price cannot be fetched.
    async fn get_current_price(&self, symbol: &str) -> Result<Decimal>;

    /// # Errors
    /// Returns an error if candle data cannot be fetched.
    async fn get_klines(&self, symbol: &str, interval: &str, limit: u32) -> Result<Vec<Kline>>;

    /// # Errors
    /// Returns an error if the 24h ticker cannot be fetched.
    async fn get_ticker_24h(&self, symbol: &str) -> Result<Ticker24h>;

    /// # Errors
    /// Returns an error if leverage cannot be set for the symbol.
    async fn set_leverage(&self, symbol: &str, leverage: u32) -> Result<()>;

    /// # Errors
    /// Returns an error if the order cannot be placed.
    async fn create_market_order(
        &self,
        symbol: &str,
        side: OrderSide,
        quantity: Decimal,
    ) -> Result<OrderResult>;

    /// # Errors
    /// Returns an error if the position query fails.
    async fn get_position(&self, symbol: &str) -> Result<Option<ExchangePosition>>;

    /// # Errors
    /// Returns an error if the closing order cannot be placed.
    async fn close_position(&self, symbol: &str) -> Result<Option<ClosePositionResult>>;

    /// # Errors
    /// Returns an error if the balance cannot be fetched.
    async fn get_account_balance(&self) -> Result<AccountBalance>;
}
