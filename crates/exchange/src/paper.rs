//! Paper-trading exchange: fills every order against the last observed
//! price with fixed slippage and commission, no network calls. Zero API
//! calls means it is impossible to execute a real trade through this type.

use crate::client::Exchange;
use crate::types::{AccountBalance, ClosePositionResult, ExchangePosition, Kline, OrderResult, Ticker24h};
use anyhow::{Context, Result};
use async_trait::async_trait;
use perpbot_core::domain::{OrderSide, Side};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy)]
struct PaperPosition {
    side: Side,
    amount: Decimal,
    entry_price: Decimal,
    leverage: u32,
}

/// Wraps a real market-data source (any `Exchange`) and simulates order
/// execution locally. Candle/price/ticker reads pass straight through;
/// only orders, positions, and balance are faked.
pub struct PaperExchange<M: Exchange> {
    market_data: M,
    slippage_bps: Decimal,
    commission_bps: Decimal,
    starting_balance: Decimal,
    positions: Arc<RwLock<HashMap<String, PaperPosition>>>,
    balance: Arc<RwLock<Decimal>>,
    next_order_id: Arc<RwLock<u64>>,
}

impl<M: Exchange> PaperExchange<M> {
    #[must_use]
    pub fn new(market_data: M, starting_balance: Decimal) -> Self {
        Self {
            market_data,
            slippage_bps: Decimal::from_str("5").unwrap_or(Decimal::ZERO),
            commission_bps: Decimal::from_str("4").unwrap_or(Decimal::ZERO),
            starting_balance,
            positions: Arc::new(RwLock::new(HashMap::new())),
            balance: Arc::new(RwLock::new(starting_balance)),
            next_order_id: Arc::new(RwLock::new(1)),
        }
    }

    fn apply_slippage(&self, price: Decimal, side: OrderSide) -> Decimal {
        let adj = price * self.slippage_bps / Decimal::from(10_000);
        match side {
            OrderSide::Buy => price + adj,
            OrderSide::Sell => price - adj,
        }
    }

    async fn next_id(&self) -> String {
        let mut guard = self.next_order_id.write().await;
        let id = *guard;
        *guard += 1;
        format!("paper-{id}")
    }
}

#[async_trait]
impl<M: Exchange> Exchange for PaperExchange<M> {
    async fn get_current_price(&self, symbol: &str) -> Result<Decimal> {
        self.market_data.get_current_price(symbol).await
    }

    async fn get_klines(&self, symbol: &str, interval: &str, limit: u32) -> Result<Vec<Kline>> {
        self.market_data.get_klines(symbol, interval, limit).await
    }

    async fn get_ticker_24h(&self, symbol: &str) -> Result<Ticker24h> {
        self.market_data.get_ticker_24h(symbol).await
    }

    async fn set_leverage(&self, symbol: &str, leverage: u32) -> Result<()> {
        let mut positions = self.positions.write().await;
        if let Some(p) = positions.get_mut(symbol) {
            p.leverage = leverage;
        }
        Ok(())
    }

    async fn create_market_order(
        &self,
        symbol: &str,
        side: OrderSide,
        quantity: Decimal,
    ) -> Result<OrderResult> {
        let mark = self
            .market_data
            .get_current_price(symbol)
            .await
            .context("paper fill requires a mark price")?;
        let fill_price = self.apply_slippage(mark, side);
        let commission = fill_price * quantity * self.commission_bps / Decimal::from(10_000);

        let mut balance = self.balance.write().await;
        *balance -= commission;

        let mut positions = self.positions.write().await;
        let new_side = match side {
            OrderSide::Buy => Side::Long,
            OrderSide::Sell => Side::Short,
        };
        positions.insert(
            symbol.to_string(),
            PaperPosition {
                side: new_side,
                amount: quantity,
                entry_price: fill_price,
                leverage: positions.get(symbol).map_or(1, |p| p.leverage),
            },
        );

        Ok(OrderResult {
            order_id: self.next_id().await,
            filled_qty: quantity,
        })
    }

    async fn get_position(&self, symbol: &str) -> Result<Option<ExchangePosition>> {
        let positions = self.positions.read().await;
        Ok(positions.get(symbol).map(|p| ExchangePosition {
            side: p.side,
            amount: p.amount,
            entry_price: p.entry_price,
            leverage: p.leverage,
        }))
    }

    async fn close_position(&self, symbol: &str) -> Result<Option<ClosePositionResult>> {
        let existing = {
            let positions = self.positions.read().await;
            positions.get(symbol).copied()
        };
        let Some(position) = existing else {
            return Ok(None);
        };

        let mark = self.market_data.get_current_price(symbol).await?;
        let closing_side = position.side.closing_order_side();
        let fill_price = self.apply_slippage(mark, closing_side);
        let commission = fill_price * position.amount * self.commission_bps / Decimal::from(10_000);

        let pnl = match position.side {
            Side::Long => (fill_price - position.entry_price) * position.amount,
            Side::Short => (position.entry_price - fill_price) * position.amount,
        };

        let mut balance = self.balance.write().await;
        *balance += pnl - commission;

        let mut positions = self.positions.write().await;
        positions.remove(symbol);

        Ok(Some(ClosePositionResult {
            order_id: self.next_id().await,
        }))
    }

    async fn get_account_balance(&self) -> Result<AccountBalance> {
        let balance = *self.balance.read().await;
        let positions = self.positions.read().await;
        let mut unrealized = Decimal::ZERO;
        for (symbol, position) in positions.iter() {
            if let Ok(mark) = self.market_data.get_current_price(symbol).await {
                unrealized += match position.side {
                    Side::Long => (mark - position.entry_price) * position.amount,
                    Side::Short => (position.entry_price - mark) * position.amount,
                };
            }
        }
        Ok(AccountBalance {
            available: balance,
            balance: balance + unrealized,
            unrealized_pnl: unrealized,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedPriceMarket {
        price: Decimal,
    }

    #[async_trait]
    impl Exchange for FixedPriceMarket {
        async fn get_current_price(&self, _symbol: &str) -> Result<Decimal> {
            Ok(self.price)
        }
        async fn get_klines(&self, _symbol: &str, _interval: &str, _limit: u32) -> Result<Vec<Kline>> {
            Ok(vec![])
        }
        async fn get_ticker_24h(&self, _symbol: &str) -> Result<Ticker24h> {
            Ok(Ticker24h {
                high: self.price,
                low: self.price,
                change_pct: 0.0,
                volume: Decimal::ZERO,
            })
        }
        async fn set_leverage(&self, _symbol: &str, _leverage: u32) -> Result<()> {
            Ok(())
        }
        async fn create_market_order(
            &self,
            _symbol: &str,
            _side: OrderSide,
            _quantity: Decimal,
        ) -> Result<OrderResult> {
            unreachable!("market-data-only stub")
        }
        async fn get_position(&self, _symbol: &str) -> Result<Option<ExchangePosition>> {
            Ok(None)
        }
        async fn close_position(&self, _symbol: &str) -> Result<Option<ClosePositionResult>> {
            Ok(None)
        }
        async fn get_account_balance(&self) -> Result<AccountBalance> {
            unreachable!("market-data-only stub")
        }
    }

    #[tokio::test]
    async fn long_entry_then_close_at_higher_price_is_profitable() {
        let market = FixedPriceMarket {
            price: Decimal::from(100),
        };
        let paper = PaperExchange::new(market, Decimal::from(10_000));

        paper
            .create_market_order("BTCUSDT", OrderSide::Buy, Decimal::from(10))
            .await
            .unwrap();

        let position = paper.get_position("BTCUSDT").await.unwrap().unwrap();
        assert_eq!(position.side, Side::Long);

        // Re-wrap market data at a higher price to simulate movement.
        let market2 = FixedPriceMarket {
            price: Decimal::from(110),
        };
        let paper2 = PaperExchange {
            market_data: market2,
            slippage_bps: paper.slippage_bps,
            commission_bps: paper.commission_bps,
            starting_balance: paper.starting_balance,
            positions: paper.positions.clone(),
            balance: paper.balance.clone(),
            next_order_id: paper.next_order_id.clone(),
        };

        let closed = paper2.close_position("BTCUSDT").await.unwrap();
        assert!(closed.is_some());
        assert!(paper2.get_position("BTCUSDT").await.unwrap().is_none());

        let balance = *paper2.balance.read().await;
        assert!(balance > Decimal::from(10_000));
    }
}
