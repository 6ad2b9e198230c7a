// Active order set for the current grid generation plus a short closed-order history

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use crate::core::types::{GridConfig, Order, OrderRequest, OrderSide, OrderStatus};
use crate::error::TradingResult;
use crate::gateway::ExecutionGateway;

#[derive(Debug, Clone)]
pub struct ClosedOrder {
    pub order: Order,
    pub closed_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct OrderLedger {
    active: Vec<Order>,
    history: Vec<ClosedOrder>,
}

/// Opposite-side order one spread away from a fill, same size
pub fn mirror_of(filled: &Order, spread: f64) -> OrderRequest {
    let price = match filled.side {
        OrderSide::Buy => filled.price + spread,
        OrderSide::Sell => filled.price - spread,
    };
    OrderRequest {
        side: filled.side.opposite(),
        price,
        size: filled.size,
    }
}

impl OrderLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place `request` through the gateway and track it as active.
    ///
    /// Returns `Ok(None)` without touching the gateway when the price falls
    /// outside the grid bounds.
    pub async fn place_order(
        &mut self,
        gateway: &dyn ExecutionGateway,
        grid: &GridConfig,
        request: OrderRequest,
    ) -> TradingResult<Option<Order>> {
        if !grid.contains(request.price) {
            debug!(
                "⏭️  Skipping {} @ {:.4}: outside {:.4} - {:.4}",
                request.side, request.price, grid.lower_bound, grid.upper_bound
            );
            return Ok(None);
        }

        let order_id = gateway
            .place_order(&grid.symbol, request.side, request.price, request.size, grid.leverage)
            .await?;

        let order = Order {
            order_id,
            symbol: grid.symbol.clone(),
            side: request.side,
            size: request.size,
            price: request.price,
            status: OrderStatus::Active,
            created_at: Utc::now(),
            filled_at: None,
        };
        self.active.push(order.clone());
        Ok(Some(order))
    }

    /// Move an order out of the active set as filled
    pub fn mark_filled(&mut self, order_id: &str, at: DateTime<Utc>) -> Option<Order> {
        let mut order = self.take(order_id)?;
        order.status = OrderStatus::Filled;
        order.filled_at = Some(at);
        self.history.push(ClosedOrder { order: order.clone(), closed_at: at });
        Some(order)
    }

    pub fn mark_cancelled(&mut self, order_id: &str) -> Option<Order> {
        let mut order = self.take(order_id)?;
        order.status = OrderStatus::Cancelled;
        self.history.push(ClosedOrder { order: order.clone(), closed_at: Utc::now() });
        Some(order)
    }

    fn take(&mut self, order_id: &str) -> Option<Order> {
        let index = self.active.iter().position(|o| o.order_id == order_id)?;
        Some(self.active.remove(index))
    }

    /// Cancel every active order and clear the set.
    ///
    /// Gateway failures are logged; the set is cleared regardless so the
    /// next generation never merges with the old one. Returns the number of
    /// successful cancellations.
    pub async fn cancel_all(&mut self, gateway: &dyn ExecutionGateway) -> usize {
        let orders = std::mem::take(&mut self.active);
        let total = orders.len();
        let mut cancelled = 0;

        for mut order in orders {
            match gateway.cancel_order(&order.order_id).await {
                Ok(()) => cancelled += 1,
                Err(e) => warn!("⚠️  Failed to cancel {}: {}", order.order_id, e),
            }
            order.status = OrderStatus::Cancelled;
            self.history.push(ClosedOrder { order, closed_at: Utc::now() });
        }

        info!("🗑️  Cancelled {}/{} active orders", cancelled, total);
        cancelled
    }

    /// Replace the active set with persisted orders
    pub fn restore(&mut self, orders: Vec<Order>) {
        self.active = orders.into_iter().filter(|o| o.status == OrderStatus::Active).collect();
    }

    /// Drop closed orders older than `max_age`, returns how many were removed
    pub fn cleanup_history(&mut self, max_age: Duration) -> usize {
        let cutoff = Utc::now() - max_age;
        let before = self.history.len();
        self.history.retain(|c| c.closed_at >= cutoff);
        let removed = before - self.history.len();
        if removed > 0 {
            info!("🧹 Removed {} closed orders from history", removed);
        }
        removed
    }

    pub fn active(&self) -> &[Order] {
        &self.active
    }

    pub fn active_ids(&self) -> Vec<String> {
        self.active.iter().map(|o| o.order_id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn history(&self) -> &[ClosedOrder] {
        &self.history
    }

    pub fn filled_count(&self) -> usize {
        self.history.iter().filter(|c| c.order.status == OrderStatus::Filled).count()
    }

    pub fn cancelled_count(&self) -> usize {
        self.history.iter().filter(|c| c.order.status == OrderStatus::Cancelled).count()
    }

    pub fn count_by_side(&self, side: OrderSide) -> usize {
        self.active.iter().filter(|o| o.side == side).count()
    }
}
