use crate::client::Exchange;
use crate::types::{AccountBalance, ClosePositionResult, ExchangePosition, Kline, OrderResult, Ticker24h};
use anyhow::{bail, Result};
use async_trait::async_trait;
use perpbot_core::domain::OrderSide;
use rust_decimal::Decimal;

/// Used when no exchange could be constructed at startup. Unlike
/// `DummyStateStore`/`DummyLedgerStore`, there is no safe silent default
/// for placing real money orders, so every call fails loudly instead of
/// degrading — a bot wired to this adapter can never open a position.
#[derive(Debug, Default, Clone, Copy)]
pub struct DummyExchange;

#[async_trait]
impl Exchange for DummyExchange {
    async fn get_current_price(&self, _symbol: &str) -> Result<Decimal> {
        bail!("no exchange configured")
    }

    async fn get_klines(&self, _symbol: &str, _interval: &str, _limit: u32) -> Result<Vec<Kline>> {
        bail!("no exchange configured")
    }

    async fn get_ticker_24h(&self, _symbol: &str) -> Result<Ticker24h> {
        bail!("no exchange configured")
    }

    async fn set_leverage(&self, _symbol: &str, _leverage: u32) -> Result<()> {
        bail!("no exchange configured")
    }

    async fn create_market_order(
        &self,
        _symbol: &str,
        _side: OrderSide,
        _quantity: Decimal,
    ) -> Result<OrderResult> {
        bail!("no exchange configured")
    }

    async fn get_position(&self, _symbol: &str) -> Result<Option<ExchangePosition>> {
        bail!("no exchange configured")
    }

    async fn close_position(&self, _symbol: &str) -> Result<Option<ClosePositionResult>> {
        bail!("no exchange configured")
    }

    async fn get_account_balance(&self) -> Result<AccountBalance> {
        bail!("no exchange configured")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn every_call_fails() {
        let ex = DummyExchange;
        assert!(ex.get_current_price("BTCUSDT").await.is_err());
        assert!(ex.get_account_balance().await.is_err());
    }
}
