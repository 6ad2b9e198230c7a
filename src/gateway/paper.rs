// Paper trading: real or synthetic quotes, locally simulated fills

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::core::types::{Candle, OrderSide};
use crate::error::{TradingError, TradingResult};
use crate::gateway::{ExecutionGateway, MarketDataSource, OrderState};

#[derive(Debug, Clone)]
struct PaperOrder {
    side: OrderSide,
    price: f64,
    state: OrderState,
}

struct PaperState {
    orders: HashMap<String, PaperOrder>,
    rng: StdRng,
    quote: Option<(String, f64, Instant)>,
}

/// Simulated execution over any quote source.
///
/// An order becomes eligible once the market has crossed its limit (buys at
/// or below, sells at or above) and then fills with `fill_probability` on
/// each status query.
pub struct PaperGateway<M> {
    market: M,
    fill_probability: f64,
    quote_ttl: Duration,
    state: Mutex<PaperState>,
}

impl<M: MarketDataSource> PaperGateway<M> {
    pub fn new(market: M, fill_probability: f64, quote_ttl: Duration) -> Self {
        Self {
            market,
            fill_probability: fill_probability.clamp(0.0, 1.0),
            quote_ttl,
            state: Mutex::new(PaperState {
                orders: HashMap::new(),
                rng: StdRng::from_entropy(),
                quote: None,
            }),
        }
    }

    /// Deterministic fill decisions
    pub fn with_seed(self, seed: u64) -> Self {
        self.lock().rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn open_orders(&self) -> usize {
        self.lock()
            .orders
            .values()
            .filter(|o| o.state == OrderState::Active)
            .count()
    }

    fn lock(&self) -> MutexGuard<'_, PaperState> {
        // A poisoned lock only means another task panicked mid-update; the map is still usable
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn quote(&self, symbol: &str) -> TradingResult<f64> {
        let cached = {
            let state = self.lock();
            state
                .quote
                .as_ref()
                .filter(|(cached_symbol, _, at)| cached_symbol == symbol && at.elapsed() < self.quote_ttl)
                .map(|(_, price, _)| *price)
        };
        if let Some(price) = cached {
            return Ok(price);
        }

        let price = self.market.current_price(symbol).await?;
        self.lock().quote = Some((symbol.to_string(), price, Instant::now()));
        Ok(price)
    }
}

#[async_trait]
impl<M: MarketDataSource> MarketDataSource for PaperGateway<M> {
    async fn current_price(&self, symbol: &str) -> TradingResult<f64> {
        self.quote(symbol).await
    }

    async fn candles(&self, symbol: &str, granularity_minutes: u32, limit: usize) -> TradingResult<Vec<Candle>> {
        self.market.candles(symbol, granularity_minutes, limit).await
    }
}

#[async_trait]
impl<M: MarketDataSource> ExecutionGateway for PaperGateway<M> {
    async fn place_order(
        &self,
        symbol: &str,
        side: OrderSide,
        price: f64,
        size: f64,
        _leverage: u32,
    ) -> TradingResult<String> {
        let order_id = format!("paper-{}", uuid::Uuid::new_v4());
        self.lock().orders.insert(
            order_id.clone(),
            PaperOrder { side, price, state: OrderState::Active },
        );
        info!("📝 Paper order {} {} {:.6} {} @ {:.4}", order_id, side, size, symbol, price);
        Ok(order_id)
    }

    async fn cancel_order(&self, order_id: &str) -> TradingResult<()> {
        let mut state = self.lock();
        let order = state
            .orders
            .get_mut(order_id)
            .ok_or_else(|| TradingError::OrderNotFound(order_id.to_string()))?;
        order.state = OrderState::Cancelled;
        Ok(())
    }

    async fn order_status(&self, order_id: &str) -> TradingResult<OrderState> {
        let symbol_price = {
            let state = self.lock();
            let order = state
                .orders
                .get(order_id)
                .ok_or_else(|| TradingError::OrderNotFound(order_id.to_string()))?;
            if order.state != OrderState::Active {
                return Ok(order.state);
            }
            state.quote.as_ref().map(|(symbol, _, _)| symbol.clone())
        };

        // Orders are only placed after a quote was taken, so a symbol is known
        let symbol = symbol_price.ok_or_else(|| TradingError::Internal("no quote taken yet".to_string()))?;
        let price = self.quote(&symbol).await?;

        let mut state = self.lock();
        let PaperState { orders, rng, .. } = &mut *state;
        let order = orders
            .get_mut(order_id)
            .ok_or_else(|| TradingError::OrderNotFound(order_id.to_string()))?;

        let crossed = match order.side {
            OrderSide::Buy => price <= order.price,
            OrderSide::Sell => price >= order.price,
        };
        if crossed && rng.gen::<f64>() < self.fill_probability {
            order.state = OrderState::Filled;
            debug!("🎯 Paper fill {} @ {:.4} (market {:.4})", order_id, order.price, price);
        }
        Ok(order.state)
    }
}
