//! Wraps any `Exchange` with retry-with-backoff underneath a circuit
//! breaker (§7, §10): consecutive failures trip the breaker open, and
//! once open, calls fail fast without attempting the network at all.

use crate::client::Exchange;
use crate::types::{AccountBalance, ClosePositionResult, ExchangePosition, Kline, OrderResult, Ticker24h};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use perpbot_core::circuit_breaker::CircuitBreaker;
use perpbot_core::domain::OrderSide;
use perpbot_core::retry::with_backoff;
use rust_decimal::Decimal;
use std::time::Duration;

pub struct GuardedExchange<E: Exchange> {
    inner: E,
    breaker: CircuitBreaker,
}

impl<E: Exchange> GuardedExchange<E> {
    #[must_use]
    pub fn new(inner: E, failure_threshold: u32, reset_timeout: Duration) -> Self {
        Self {
            inner,
            breaker: CircuitBreaker::new(failure_threshold, reset_timeout),
        }
    }

    async fn guarded<F, Fut, T>(&self, operation_name: &str, f: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        if !self.breaker.allow_request() {
            return Err(anyhow!("circuit open for {operation_name}, refusing call"));
        }
        let result = with_backoff(operation_name, || async { f().await.map_err(|e| e.to_string()) }).await;
        match result {
            Ok(value) => {
                self.breaker.record_success();
                Ok(value)
            }
            Err(msg) => {
                self.breaker.record_failure();
                Err(anyhow!(msg))
            }
        }
    }
}

#[async_trait]
impl<E: Exchange> Exchange for GuardedExchange<E> {
    async fn get_current_price(&self, symbol: &str) -> Result<Decimal> {
        self.guarded("get_current_price", || self.inner.get_current_price(symbol))
            .await
    }

    async fn get_klines(&self, symbol: &str, interval: &str, limit: u32) -> Result<Vec<Kline>> {
        self.guarded("get_klines", || self.inner.get_klines(symbol, interval, limit))
            .await
    }

    async fn get_ticker_24h(&self, symbol: &str) -> Result<Ticker24h> {
        self.guarded("get_ticker_24h", || self.inner.get_ticker_24h(symbol))
            .await
    }

    async fn set_leverage(&self, symbol: &str, leverage: u32) -> Result<()> {
        self.guarded("set_leverage", || self.inner.set_leverage(symbol, leverage))
            .await
    }

    async fn create_market_order(
        &self,
        symbol: &str,
        side: OrderSide,
        quantity: Decimal,
    ) -> Result<OrderResult> {
        self.guarded("create_market_order", || {
            self.inner.create_market_order(symbol, side, quantity)
        })
        .await
    }

    async fn get_position(&self, symbol: &str) -> Result<Option<ExchangePosition>> {
        self.guarded("get_position", || self.inner.get_position(symbol)).await
    }

    async fn close_position(&self, symbol: &str) -> Result<Option<ClosePositionResult>> {
        self.guarded("close_position", || self.inner.close_position(symbol))
            .await
    }

    async fn get_account_balance(&self) -> Result<AccountBalance> {
        self.guarded("get_account_balance", || self.inner.get_account_balance())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dummy::DummyExchange;

    #[tokio::test]
    async fn breaker_opens_after_repeated_failures_and_fails_fast() {
        let guarded = GuardedExchange::new(DummyExchange, 1, Duration::from_secs(60));
        assert!(guarded.get_current_price("BTCUSDT").await.is_err());
        assert_eq!(guarded.breaker.state(), perpbot_core::circuit_breaker::CircuitState::Open);
        let err = guarded.get_current_price("BTCUSDT").await.unwrap_err();
        assert!(err.to_string().contains("circuit open"));
    }
}
