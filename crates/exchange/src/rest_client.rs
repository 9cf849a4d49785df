//! Generic REST perpetuals adapter.
//!
//! Wire encoding (endpoint paths, payload shapes) is exchange-specific and
//! explicitly out of scope (§1 non-goals); this client speaks a generic
//! Binance-shaped perpetuals REST surface so the contract in §6.1 is
//! executable against a real sandbox. Swapping venues means swapping this
//! file, not the `Exchange` trait.

use crate::client::Exchange;
use crate::types::{AccountBalance, ClosePositionResult, ExchangePosition, Kline, OrderResult, Ticker24h};
use anyhow::{Context, Result};
use async_trait::async_trait;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use perpbot_core::domain::{OrderSide, Side};
use reqwest::Client;
use rust_decimal::Decimal;
use std::num::NonZeroU32;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

pub struct RestExchangeClient {
    http: Client,
    base_url: String,
    rate_limiter: Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl RestExchangeClient {
    /// Creates a client against `base_url`. `is_testnet` selects a sandbox
    /// base URL at the call site (§6.1: "the testnet flag selects a sandbox
    /// endpoint without changing the contract") — callers pick the URL,
    /// this type doesn't branch on it.
    ///
    /// # Panics
    /// Panics if the rate-limit quota cannot be constructed (never, for a
    /// nonzero constant).
    #[must_use]
    pub fn new(base_url: String, timeout: Duration) -> Self {
        let quota = Quota::per_second(NonZeroU32::new(20).unwrap());
        Self {
            http: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
            base_url,
            rate_limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }

    async fn get(&self, path: &str) -> Result<serde_json::Value> {
        self.rate_limiter.until_ready().await;
        let url = format!("{}{}", self.base_url, path);
        let resp = self.http.get(&url).send().await.context("GET failed")?;
        resp.json().await.context("failed to parse JSON response")
    }

    async fn post(&self, path: &str, body: serde_json::Value) -> Result<serde_json::Value> {
        self.rate_limiter.until_ready().await;
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .context("POST failed")?;
        resp.json().await.context("failed to parse JSON response")
    }

    fn decimal_field(value: &serde_json::Value, field: &str) -> Result<Decimal> {
        let raw = value[field]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("missing or non-string field '{field}'"))?;
        Decimal::from_str(raw).with_context(|| format!("failed to parse decimal field '{field}'"))
    }
}

#[async_trait]
impl Exchange for RestExchangeClient {
    async fn get_current_price(&self, symbol: &str) -> Result<Decimal> {
        let v = self
            .get(&format!("/api/v1/ticker/price?symbol={symbol}"))
            .await?;
        Self::decimal_field(&v, "price")
    }

    async fn get_klines(&self, symbol: &str, interval: &str, limit: u32) -> Result<Vec<Kline>> {
        let v = self
            .get(&format!(
                "/api/v1/klines?symbol={symbol}&interval={interval}&limit={limit}"
            ))
            .await?;
        let rows = v
            .as_array()
            .ok_or_else(|| anyhow::anyhow!("klines response is not an array"))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let open_time_ms = row[0]
                .as_i64()
                .ok_or_else(|| anyhow::anyhow!("missing kline open time"))?;
            out.push(Kline {
                open_time: chrono::DateTime::from_timestamp_millis(open_time_ms)
                    .ok_or_else(|| anyhow::anyhow!("invalid kline timestamp {open_time_ms}"))?,
                open: row[1]
                    .as_str()
                    .and_then(|s| Decimal::from_str(s).ok())
                    .ok_or_else(|| anyhow::anyhow!("bad open"))?,
                high: row[2]
                    .as_str()
                    .and_then(|s| Decimal::from_str(s).ok())
                    .ok_or_else(|| anyhow::anyhow!("bad high"))?,
                low: row[3]
                    .as_str()
                    .and_then(|s| Decimal::from_str(s).ok())
                    .ok_or_else(|| anyhow::anyhow!("bad low"))?,
                close: row[4]
                    .as_str()
                    .and_then(|s| Decimal::from_str(s).ok())
                    .ok_or_else(|| anyhow::anyhow!("bad close"))?,
                volume: row[5]
                    .as_str()
                    .and_then(|s| Decimal::from_str(s).ok())
                    .ok_or_else(|| anyhow::anyhow!("bad volume"))?,
            });
        }
        Ok(out)
    }

    async fn get_ticker_24h(&self, symbol: &str) -> Result<Ticker24h> {
        let v = self
            .get(&format!("/api/v1/ticker/24hr?symbol={symbol}"))
            .await?;
        Ok(Ticker24h {
            high: Self::decimal_field(&v, "highPrice")?,
            low: Self::decimal_field(&v, "lowPrice")?,
            change_pct: v["priceChangePercent"]
                .as_str()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0.0),
            volume: Self::decimal_field(&v, "volume")?,
        })
    }

    async fn set_leverage(&self, symbol: &str, leverage: u32) -> Result<()> {
        self.post(
            "/api/v1/leverage",
            serde_json::json!({ "symbol": symbol, "leverage": leverage }),
        )
        .await?;
        Ok(())
    }

    async fn create_market_order(
        &self,
        symbol: &str,
        side: OrderSide,
        quantity: Decimal,
    ) -> Result<OrderResult> {
        let v = self
            .post(
                "/api/v1/order",
                serde_json::json!({
                    "symbol": symbol,
                    "side": crate::types::side_str(side),
                    "type": "MARKET",
                    "quantity": quantity.to_string(),
                }),
            )
            .await?;
        Ok(OrderResult {
            order_id: v["orderId"]
                .as_str()
                .unwrap_or_default()
                .to_string(),
            filled_qty: v["executedQty"]
                .as_str()
                .and_then(|s| Decimal::from_str(s).ok())
                .unwrap_or(quantity),
        })
    }

    async fn get_position(&self, symbol: &str) -> Result<Option<ExchangePosition>> {
        let v = self
            .get(&format!("/api/v1/position?symbol={symbol}"))
            .await?;
        if v.is_null() {
            return Ok(None);
        }
        let amount = Self::decimal_field(&v, "positionAmt")?;
        if amount.is_zero() {
            return Ok(None);
        }
        Ok(Some(ExchangePosition {
            side: if amount.is_sign_positive() {
                Side::Long
            } else {
                Side::Short
            },
            amount: amount.abs(),
            entry_price: Self::decimal_field(&v, "entryPrice")?,
            leverage: v["leverage"]
                .as_str()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1),
        }))
    }

    async fn close_position(&self, symbol: &str) -> Result<Option<ClosePositionResult>> {
        let Some(position) = self.get_position(symbol).await? else {
            return Ok(None);
        };
        let closing_side = position.side.closing_order_side();
        let order = self
            .create_market_order(symbol, closing_side, position.amount)
            .await?;
        Ok(Some(ClosePositionResult {
            order_id: order.order_id,
        }))
    }

    async fn get_account_balance(&self) -> Result<AccountBalance> {
        let v = self.get("/api/v1/account/balance").await?;
        Ok(AccountBalance {
            available: Self::decimal_field(&v, "availableBalance")?,
            balance: Self::decimal_field(&v, "balance")?,
            unrealized_pnl: Self::decimal_field(&v, "unrealizedPnl")?,
        })
    }
}
