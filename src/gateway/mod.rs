// Exchange-facing collaborators: market data and order execution

pub mod kucoin;
pub mod paper;
pub mod random_walk;

use async_trait::async_trait;

use crate::core::types::{Candle, OrderSide};
use crate::error::TradingResult;

pub use kucoin::KucoinFuturesGateway;
pub use paper::PaperGateway;
pub use random_walk::RandomWalkFeed;

/// Exchange-side view of an order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderState {
    Active,
    Filled,
    /// Cancelled outside the engine; dropped without a mirror
    Cancelled,
}

#[async_trait]
pub trait MarketDataSource: Send + Sync {
    async fn current_price(&self, symbol: &str) -> TradingResult<f64>;

    /// OHLC rows, oldest first
    async fn candles(&self, symbol: &str, granularity_minutes: u32, limit: usize) -> TradingResult<Vec<Candle>>;
}

#[async_trait]
pub trait ExecutionGateway: MarketDataSource {
    /// Place a limit order and return the exchange order id
    async fn place_order(
        &self,
        symbol: &str,
        side: OrderSide,
        price: f64,
        size: f64,
        leverage: u32,
    ) -> TradingResult<String>;

    async fn cancel_order(&self, order_id: &str) -> TradingResult<()>;

    async fn order_status(&self, order_id: &str) -> TradingResult<OrderState>;

    /// Available account equity, when the venue reports one
    async fn account_balance(&self) -> TradingResult<Option<f64>> {
        Ok(None)
    }
}
