// Common test utilities and helpers
#![allow(dead_code)]

use adaptive_grid_bot::core::{Candle, GridConfig, Order, OrderSide};
use adaptive_grid_bot::error::{TradingError, TradingResult};
use adaptive_grid_bot::gateway::{ExecutionGateway, MarketDataSource, OrderState};
use adaptive_grid_bot::notify::{NotificationDispatcher, Notifier};
use adaptive_grid_bot::storage::{PnlLedger, SnapshotStore};
use adaptive_grid_bot::{Config, GridEngine};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;

#[derive(Debug, Clone, PartialEq)]
pub struct PlacedOrder {
    pub id: String,
    pub side: OrderSide,
    pub price: f64,
    pub size: f64,
}

#[derive(Default)]
struct ScriptState {
    price: f64,
    candles: Vec<Candle>,
    next_id: u64,
    placed: Vec<PlacedOrder>,
    statuses: HashMap<String, OrderState>,
    cancelled: Vec<String>,
    fail_price: bool,
    fail_candles: bool,
    fail_status: bool,
    fail_place: bool,
}

/// In-memory exchange whose prices, candles and fills are set by the test
#[derive(Default)]
pub struct ScriptedGateway {
    state: Mutex<ScriptState>,
}

impl ScriptedGateway {
    pub fn new(price: f64, candles: Vec<Candle>) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(ScriptState { price, candles, ..ScriptState::default() }),
        })
    }

    pub fn set_price(&self, price: f64) {
        self.state.lock().unwrap().price = price;
    }

    pub fn set_candles(&self, candles: Vec<Candle>) {
        self.state.lock().unwrap().candles = candles;
    }

    pub fn fill(&self, order_id: &str) {
        self.state.lock().unwrap().statuses.insert(order_id.to_string(), OrderState::Filled);
    }

    pub fn cancel_externally(&self, order_id: &str) {
        self.state.lock().unwrap().statuses.insert(order_id.to_string(), OrderState::Cancelled);
    }

    pub fn fail_price(&self, fail: bool) {
        self.state.lock().unwrap().fail_price = fail;
    }

    pub fn fail_candles(&self, fail: bool) {
        self.state.lock().unwrap().fail_candles = fail;
    }

    pub fn fail_status(&self, fail: bool) {
        self.state.lock().unwrap().fail_status = fail;
    }

    pub fn fail_place(&self, fail: bool) {
        self.state.lock().unwrap().fail_place = fail;
    }

    pub fn placed(&self) -> Vec<PlacedOrder> {
        self.state.lock().unwrap().placed.clone()
    }

    pub fn cancelled(&self) -> Vec<String> {
        self.state.lock().unwrap().cancelled.clone()
    }
}

#[async_trait]
impl MarketDataSource for ScriptedGateway {
    async fn current_price(&self, _symbol: &str) -> TradingResult<f64> {
        let state = self.state.lock().unwrap();
        if state.fail_price {
            return Err(TradingError::ApiConnection("price feed down".to_string()));
        }
        Ok(state.price)
    }

    async fn candles(&self, _symbol: &str, _granularity: u32, _limit: usize) -> TradingResult<Vec<Candle>> {
        let state = self.state.lock().unwrap();
        if state.fail_candles {
            return Err(TradingError::ApiTimeout("kline query".to_string()));
        }
        Ok(state.candles.clone())
    }
}

#[async_trait]
impl ExecutionGateway for ScriptedGateway {
    async fn place_order(
        &self,
        _symbol: &str,
        side: OrderSide,
        price: f64,
        size: f64,
        _leverage: u32,
    ) -> TradingResult<String> {
        let mut state = self.state.lock().unwrap();
        if state.fail_place {
            return Err(TradingError::OrderRejected("insufficient margin".to_string()));
        }
        state.next_id += 1;
        let id = format!("ord-{}", state.next_id);
        state.placed.push(PlacedOrder { id: id.clone(), side, price, size });
        state.statuses.insert(id.clone(), OrderState::Active);
        Ok(id)
    }

    async fn cancel_order(&self, order_id: &str) -> TradingResult<()> {
        let mut state = self.state.lock().unwrap();
        state.cancelled.push(order_id.to_string());
        state.statuses.insert(order_id.to_string(), OrderState::Cancelled);
        Ok(())
    }

    async fn order_status(&self, order_id: &str) -> TradingResult<OrderState> {
        let state = self.state.lock().unwrap();
        if state.fail_status {
            return Err(TradingError::ApiTimeout(order_id.to_string()));
        }
        state
            .statuses
            .get(order_id)
            .copied()
            .ok_or_else(|| TradingError::OrderNotFound(order_id.to_string()))
    }
}

/// Snapshot store kept in memory so tests can inspect what was persisted
#[derive(Default)]
pub struct MemoryStore {
    orders: Mutex<Vec<Order>>,
    pnl: Mutex<PnlLedger>,
    grid: Mutex<Option<GridConfig>>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn orders(&self) -> Vec<Order> {
        self.orders.lock().unwrap().clone()
    }

    pub fn pnl(&self) -> PnlLedger {
        self.pnl.lock().unwrap().clone()
    }

    pub fn grid(&self) -> Option<GridConfig> {
        self.grid.lock().unwrap().clone()
    }
}

impl SnapshotStore for MemoryStore {
    fn save_orders(&self, orders: &[Order]) -> TradingResult<()> {
        *self.orders.lock().unwrap() = orders.to_vec();
        Ok(())
    }

    fn load_orders(&self) -> TradingResult<Vec<Order>> {
        Ok(self.orders())
    }

    fn save_pnl(&self, ledger: &PnlLedger) -> TradingResult<()> {
        *self.pnl.lock().unwrap() = ledger.clone();
        Ok(())
    }

    fn load_pnl(&self) -> TradingResult<PnlLedger> {
        Ok(self.pnl())
    }

    fn save_grid(&self, grid: &GridConfig) -> TradingResult<()> {
        *self.grid.lock().unwrap() = Some(grid.clone());
        Ok(())
    }

    fn load_grid(&self) -> TradingResult<Option<GridConfig>> {
        Ok(self.grid())
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }

    pub fn count_containing(&self, needle: &str) -> usize {
        self.messages().iter().filter(|m| m.contains(needle)).count()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, text: &str) -> TradingResult<()> {
        self.messages.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

/// `count` identical bars
pub fn flat_candles(high: f64, low: f64, close: f64, count: usize) -> Vec<Candle> {
    (0..count)
        .map(|i| Candle {
            timestamp: 1_700_000_000_000 + i as i64 * 3_600_000,
            open: close,
            high,
            low,
            close,
            volume: 10.0,
        })
        .collect()
}

/// Defaults matching the reference scenario: grid of 10, budget 1000, ATR(14) × 2
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.grid.symbol = "XBTUSDTM".to_string();
    config.grid.grid_size = 10;
    config.grid.budget = 1000.0;
    config.grid.atr_period = 14;
    config.grid.atr_multiplier = 2.0;
    config.grid.adjust_threshold = 0.05;
    config.grid.adjust_interval_minutes = 15;
    config.exchange.candle_limit = 50;
    config.logging.log_to_file = false;
    config
}

pub struct Harness {
    pub engine: GridEngine,
    pub gateway: Arc<ScriptedGateway>,
    pub store: Arc<MemoryStore>,
    pub notifier: Arc<RecordingNotifier>,
    notify_task: JoinHandle<()>,
}

impl Harness {
    pub fn new(config: Config, gateway: Arc<ScriptedGateway>, store: Arc<MemoryStore>) -> Self {
        let notifier = Arc::new(RecordingNotifier::default());
        let (dispatcher, notify_task) = NotificationDispatcher::spawn(notifier.clone());
        let engine = GridEngine::new(config, gateway.clone(), store.clone(), dispatcher);
        Self { engine, gateway, store, notifier, notify_task }
    }

    /// Scenario harness: price 100 with ATR 2
    pub fn scenario() -> Self {
        Self::new(test_config(), ScriptedGateway::new(100.0, flat_candles(101.0, 99.0, 100.0, 50)), MemoryStore::new())
    }

    /// Drop the engine and wait until every queued notification was delivered
    pub async fn finish(self) -> (Arc<RecordingNotifier>, Arc<ScriptedGateway>, Arc<MemoryStore>) {
        drop(self.engine);
        self.notify_task.await.unwrap();
        (self.notifier, self.gateway, self.store)
    }
}

pub fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}
