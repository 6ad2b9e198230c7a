// Grid engine: setup, fill handling, periodic re-centering and the poll loop

use chrono::{NaiveDate, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::{sleep, Instant};
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::core::bounds::{needs_adjustment, BoundsCalculator, GridBounds};
use crate::core::ledger::{mirror_of, OrderLedger};
use crate::core::performance::{PerformanceStats, PerformanceTracker};
use crate::core::risk::{RiskLimits, RiskManager, RiskState, RiskStatus};
use crate::core::types::{EngineState, GridConfig, Order, OrderRequest, OrderSide};
use crate::core::volatility::candle_atr;
use crate::error::{TradingError, TradingResult};
use crate::gateway::{ExecutionGateway, OrderState};
use crate::notify::{messages, NotificationDispatcher};
use crate::storage::{PnlLedger, SnapshotStore};

/// Clonable handle that asks a running engine to leave its poll loop
#[derive(Clone)]
pub struct StopHandle {
    running: Arc<AtomicBool>,
    wake: Arc<Notify>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.wake.notify_one();
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// What happened when an order filled
#[derive(Debug, Clone)]
pub struct FillOutcome {
    pub filled: Order,
    pub mirror: Option<Order>,
    pub profit: f64,
}

/// Placement counts from one ladder build
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LadderSummary {
    pub buys: usize,
    pub sells: usize,
}

/// Single owner of the grid, the active order set and the risk/performance
/// aggregates. Every mutation goes through `&mut self`, so the fill poll and
/// the adjustment check can never interleave.
pub struct GridEngine {
    config: Config,
    gateway: Arc<dyn ExecutionGateway>,
    store: Arc<dyn SnapshotStore>,
    notifier: NotificationDispatcher,
    bounds: BoundsCalculator,
    state: EngineState,
    grid: Option<GridConfig>,
    orders: OrderLedger,
    risk: RiskManager,
    performance: PerformanceTracker,
    pnl: PnlLedger,
    last_adjusted: Option<Instant>,
    current_day: NaiveDate,
    /// Set after a configuration error; only an explicit `setup()` clears it
    setup_blocked: bool,
    /// Grid configured while halted; the ladder is placed once trading resumes
    ladder_pending: bool,
    stop: StopHandle,
}

impl GridEngine {
    pub fn new(
        config: Config,
        gateway: Arc<dyn ExecutionGateway>,
        store: Arc<dyn SnapshotStore>,
        notifier: NotificationDispatcher,
    ) -> Self {
        Self {
            bounds: BoundsCalculator::from_settings(&config.grid),
            risk: RiskManager::new(RiskLimits::from(&config.risk)),
            performance: PerformanceTracker::new(config.engine.zero_profit_policy),
            config,
            gateway,
            store,
            notifier,
            state: EngineState::Uninitialized,
            grid: None,
            orders: OrderLedger::new(),
            pnl: PnlLedger::default(),
            last_adjusted: None,
            current_day: Utc::now().date_naive(),
            setup_blocked: false,
            ladder_pending: false,
            stop: StopHandle {
                running: Arc::new(AtomicBool::new(true)),
                wake: Arc::new(Notify::new()),
            },
        }
    }

    /// Load persisted state and either resume the saved grid or build a new one.
    ///
    /// Only snapshot load errors are returned; a failed setup leaves the
    /// engine `Uninitialized`.
    pub async fn start(&mut self) -> TradingResult<()> {
        self.pnl = self.store.load_pnl()?;
        self.performance = PerformanceTracker::from_ledger(&self.pnl, self.config.engine.zero_profit_policy);
        self.current_day = Utc::now().date_naive();
        let daily_pnl = self.pnl.pnl_on(self.current_day);
        let peak = self.pnl.peak_balance(self.config.initial_balance());
        self.risk.resume_session(self.balance(), daily_pnl, peak);
        info!(
            "📂 Loaded PnL ledger: {} trades, total {:.4} USDT, today {:.4} USDT",
            self.pnl.trade_count(),
            self.pnl.total_pnl,
            daily_pnl
        );
        self.notifier.notify(messages::startup(&self.config));

        let saved_grid = self.store.load_grid()?;
        let saved_orders = self.store.load_orders()?;
        match saved_grid {
            Some(grid) if !saved_orders.is_empty() => {
                self.orders.restore(saved_orders);
                info!(
                    "♻️  Resumed grid {:.4} - {:.4} with {} active orders",
                    grid.lower_bound,
                    grid.upper_bound,
                    self.orders.len()
                );
                self.grid = Some(grid);
                self.state = EngineState::GridActive;
                self.last_adjusted = Some(Instant::now());
                let status = self.risk.check_limits(self.balance());
                self.apply_risk_status(status);
            }
            _ => {
                if let Err(e) = self.setup().await {
                    if !e.is_config_error() {
                        warn!("⚠️  Engine left uninitialized, setup is retried on the next poll");
                    }
                }
            }
        }
        Ok(())
    }

    /// Measure volatility, size the grid and place the initial ladder.
    ///
    /// On failure the engine stays `Uninitialized`. Transient failures are
    /// retried by `tick`; configuration errors wait for the next explicit call.
    pub async fn setup(&mut self) -> TradingResult<()> {
        info!("⚙️  Setting up grid for {}", self.config.grid.symbol);
        match self.try_setup().await {
            Ok(()) => {
                self.setup_blocked = false;
                Ok(())
            }
            Err(e) => {
                error!("❌ Grid setup failed: {}", e);
                self.state = EngineState::Uninitialized;
                self.setup_blocked = e.is_config_error();
                if self.setup_blocked {
                    warn!("⛔ Configuration error, setup is not retried automatically");
                }
                self.notifier.notify(messages::setup_error(&e));
                Err(e)
            }
        }
    }

    async fn try_setup(&mut self) -> TradingResult<()> {
        let price = self.gateway.current_price(&self.config.grid.symbol).await?;
        let atr = match self.measure_volatility().await {
            Ok(atr) => atr,
            Err(e) => {
                warn!("⚠️  Failed to fetch candles: {}", e);
                0.0
            }
        };
        let bounds = self.compute_bounds(price, atr);

        let grid = GridConfig::from_bounds(&self.config.grid, bounds)?;
        self.notifier.notify(messages::grid_configured(&grid, atr, price));
        info!(
            "✅ Grid configured: {:.4} - {:.4}, spread {:.4}, increment {:.6}",
            grid.lower_bound, grid.upper_bound, grid.spread, grid.increment
        );

        self.grid = Some(grid);
        self.last_adjusted = Some(Instant::now());

        let status = self.risk.check_limits(self.balance());
        if status.should_stop_trading {
            self.save_grid();
            self.persist_orders();
            self.ladder_pending = true;
            self.halt(status);
        } else {
            self.build_ladder(price).await;
            self.state = EngineState::GridActive;
        }
        Ok(())
    }

    /// ATR of recent candles; 0.0 when there are too few of them
    async fn measure_volatility(&self) -> TradingResult<f64> {
        let settings = &self.config.grid;
        let candles = self
            .gateway
            .candles(
                &settings.symbol,
                self.config.exchange.candle_granularity_minutes,
                self.config.exchange.candle_limit,
            )
            .await?;
        Ok(candle_atr(&candles, settings.atr_period))
    }

    fn compute_bounds(&self, price: f64, atr: f64) -> GridBounds {
        let bounds = self.bounds.compute_bounds(price, atr);
        if bounds.degraded {
            self.notifier.notify(messages::degraded_mode(price, bounds));
        }
        bounds
    }

    /// Place buys below and sells above `center`, one spread apart.
    ///
    /// Rungs run from 1 to `grid_size / 2` exclusive; anything outside the
    /// bounds is skipped. Gateway failures drop the rung for this generation.
    pub async fn build_ladder(&mut self, center: f64) -> LadderSummary {
        let grid = match &self.grid {
            Some(grid) => grid.clone(),
            None => {
                warn!("⚠️  build_ladder called without a grid");
                return LadderSummary::default();
            }
        };

        let half = grid.grid_size / 2;
        if half <= 1 {
            warn!("⚠️  Grid size {} leaves no rungs between the bounds", grid.grid_size);
        }

        let mut summary = LadderSummary::default();
        for side in [OrderSide::Buy, OrderSide::Sell] {
            for i in 1..half {
                let offset = i as f64 * grid.spread;
                let price = match side {
                    OrderSide::Buy => center - offset,
                    OrderSide::Sell => center + offset,
                };
                let request = OrderRequest { side, price, size: grid.increment };
                if self.place(&grid, request).await.is_some() {
                    match side {
                        OrderSide::Buy => summary.buys += 1,
                        OrderSide::Sell => summary.sells += 1,
                    }
                }
            }
        }

        self.persist_orders();
        self.save_grid();
        info!("📋 Ladder built: {} buys, {} sells", summary.buys, summary.sells);
        self.notifier.notify(messages::orders_created(summary.buys, summary.sells));
        summary
    }

    async fn place(&mut self, grid: &GridConfig, request: OrderRequest) -> Option<Order> {
        match self.orders.place_order(self.gateway.as_ref(), grid, request).await {
            Ok(order) => order,
            Err(e) => {
                warn!("⚠️  Failed to place {} @ {:.4}: {}", request.side, request.price, e);
                None
            }
        }
    }

    /// Query every active order once. Fails only when every query failed.
    pub async fn poll_fills(&mut self) -> TradingResult<usize> {
        let ids = self.orders.active_ids();
        let mut fills = 0;
        let mut failures = 0;
        let mut last_error = None;

        for order_id in &ids {
            match self.gateway.order_status(order_id).await {
                Ok(OrderState::Active) => {}
                Ok(OrderState::Filled) => {
                    if self.on_order_filled(order_id).await.is_some() {
                        fills += 1;
                    }
                }
                Ok(OrderState::Cancelled) => {
                    if self.orders.mark_cancelled(order_id).is_some() {
                        warn!("⚠️  Order {} was cancelled outside the bot", order_id);
                        self.persist_orders();
                    }
                }
                Err(TradingError::OrderNotFound(_)) => {
                    if self.orders.mark_cancelled(order_id).is_some() {
                        warn!("⚠️  Order {} is unknown to the venue, dropped from the grid", order_id);
                        self.persist_orders();
                    }
                }
                Err(e) => {
                    warn!("⚠️  Failed to check order {}: {}", order_id, e);
                    failures += 1;
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) if failures == ids.len() => Err(e),
            _ => Ok(fills),
        }
    }

    /// Retire a filled order, place its mirror when allowed and book the profit
    pub async fn on_order_filled(&mut self, order_id: &str) -> Option<FillOutcome> {
        let grid = self.grid.clone()?;
        let filled = self.orders.mark_filled(order_id, Utc::now())?;
        info!("🎯 Filled: {} {:.6} @ {:.4}", filled.side, filled.size, filled.price);

        let mirror = if self.state == EngineState::Halted {
            info!("🔒 Trading halted, no mirror for {}", filled.order_id);
            None
        } else {
            let request = mirror_of(&filled, grid.spread);
            let mirror = self.place(&grid, request).await;
            if mirror.is_none() {
                info!("🪜 Mirror {} @ {:.4} not placed, rung lost until next rebuild", request.side, request.price);
            }
            mirror
        };
        self.persist_orders();

        let profit = filled.size * grid.spread;
        self.pnl.record(profit, Utc::now());
        if let Err(e) = self.store.save_pnl(&self.pnl) {
            warn!("⚠️  Failed to persist PnL: {}", e);
        }
        self.performance.add_trade(profit);
        let status = self.risk.update_pnl(profit, self.balance());

        self.notifier.notify(messages::order_filled(&filled, mirror.as_ref(), profit));
        self.apply_risk_status(status);

        Some(FillOutcome { filled, mirror, profit })
    }

    fn apply_risk_status(&mut self, status: RiskStatus) {
        match (status.should_stop_trading, self.state) {
            (true, EngineState::GridActive | EngineState::Adjusting) => self.halt(status),
            (false, EngineState::Halted) => {
                info!("🟢 Risk limits back in range, resuming");
                self.state = EngineState::GridActive;
                self.notifier.notify(messages::risk_cleared());
            }
            _ => {}
        }
    }

    fn halt(&mut self, status: RiskStatus) {
        error!("🛑 Risk limits breached, halting order placement");
        self.state = EngineState::Halted;
        self.notifier
            .notify(messages::risk_alert(status, &self.risk.state(), self.risk.limits()));
    }

    pub async fn check_and_adjust(&mut self) -> TradingResult<bool> {
        self.check_and_adjust_at(Instant::now()).await
    }

    /// Re-center the grid when the interval has elapsed and the bounds drifted.
    /// Returns true when the ladder was torn down and rebuilt.
    pub async fn check_and_adjust_at(&mut self, now: Instant) -> TradingResult<bool> {
        if self.state != EngineState::GridActive {
            return Ok(false);
        }
        let interval = Duration::from_secs(self.config.grid.adjust_interval_minutes * 60);
        if let Some(last) = self.last_adjusted {
            if now.saturating_duration_since(last) < interval {
                return Ok(false);
            }
        }
        let current = match &self.grid {
            Some(grid) => grid.clone(),
            None => return Ok(false),
        };

        let price = self.gateway.current_price(&current.symbol).await?;
        let atr = match self.measure_volatility().await {
            Ok(atr) => atr,
            Err(e) => {
                warn!("⚠️  Failed to fetch candles, adjustment skipped this cycle: {}", e);
                return Ok(false);
            }
        };
        let new_bounds = self.bounds.compute_bounds(price, atr);
        self.last_adjusted = Some(now);

        let old_bounds = current.bounds();
        if !needs_adjustment(old_bounds, new_bounds, self.config.grid.adjust_threshold) {
            debug!(
                "📏 Bounds drift within threshold ({:.4} - {:.4})",
                new_bounds.lower, new_bounds.upper
            );
            return Ok(false);
        }

        let mut next = current;
        if let Err(e) = next.rebound(new_bounds) {
            error!("❌ Rejected new bounds, keeping current grid: {}", e);
            return Ok(false);
        }
        if new_bounds.degraded {
            self.notifier.notify(messages::degraded_mode(price, new_bounds));
        }

        info!(
            "🔄 Adjusting grid: {:.4} - {:.4} → {:.4} - {:.4}",
            old_bounds.lower, old_bounds.upper, new_bounds.lower, new_bounds.upper
        );
        self.state = EngineState::Adjusting;
        self.orders.cancel_all(self.gateway.as_ref()).await;
        self.grid = Some(next);
        self.ladder_pending = false;
        self.build_ladder(price).await;
        if self.state == EngineState::Adjusting {
            self.state = EngineState::GridActive;
        }
        self.notifier.notify(messages::grid_adjusted(old_bounds, new_bounds));
        Ok(true)
    }

    /// Day boundary: clear the daily PnL and re-evaluate a halt
    pub fn reset_daily_pnl(&mut self) {
        self.risk.reset_daily_pnl();
        let status = self.risk.check_limits(self.balance());
        self.apply_risk_status(status);
    }

    /// Reset the daily PnL when `today` differs from the last seen UTC day
    pub fn roll_day(&mut self, today: NaiveDate) -> bool {
        if today == self.current_day {
            return false;
        }
        info!("📅 New trading day {}", today);
        self.current_day = today;
        self.reset_daily_pnl();
        true
    }

    /// One poll cycle. An uninitialized engine retries setup instead, unless
    /// the last attempt failed on configuration.
    pub async fn tick(&mut self) -> TradingResult<()> {
        match self.state {
            EngineState::Stopped => return Ok(()),
            EngineState::Uninitialized if self.setup_blocked => {
                debug!("⛔ Setup blocked by a configuration error");
                return Ok(());
            }
            EngineState::Uninitialized => return self.setup().await,
            _ => {}
        }

        if self.ladder_pending && self.state == EngineState::GridActive {
            let price = self.gateway.current_price(&self.config.grid.symbol).await?;
            self.ladder_pending = false;
            info!("🪜 Trading resumed, placing the deferred ladder around {:.4}", price);
            self.build_ladder(price).await;
        }

        // A failed poll must not starve the adjustment check
        let polled = self.poll_fills().await;
        let adjusted = self.check_and_adjust().await;
        self.orders
            .cleanup_history(chrono::Duration::hours(self.config.engine.history_retention_hours));

        let fills = polled?;
        if fills > 0 {
            debug!("🎯 {} fills this tick", fills);
        }
        adjusted.map(|_| ())
    }

    /// Poll until stopped or until `duration` elapses. Resting orders are left in place.
    pub async fn run(&mut self, duration: Option<Duration>) -> TradingResult<()> {
        let started = Instant::now();
        let poll = Duration::from_secs(self.config.engine.poll_interval_secs);
        let backoff = Duration::from_secs(self.config.engine.error_backoff_secs);
        info!("🚀 Grid engine running (poll every {}s)", poll.as_secs());

        while self.stop.is_running() {
            if let Some(limit) = duration {
                if started.elapsed() >= limit {
                    info!("⏰ Session completed after {:.1} hours", limit.as_secs_f64() / 3600.0);
                    break;
                }
            }

            self.roll_day(Utc::now().date_naive());
            let mut pause = match self.tick().await {
                Ok(()) => poll,
                Err(e) if e.is_retryable() => {
                    warn!("⚠️  Transient failure, backing off {}s: {}", backoff.as_secs(), e);
                    backoff
                }
                Err(e) => {
                    error!("❌ Poll cycle failed: {}", e);
                    backoff
                }
            };
            if let Some(limit) = duration {
                pause = pause.min(limit.saturating_sub(started.elapsed()));
            }

            tokio::select! {
                _ = sleep(pause) => {}
                _ = self.stop.wake.notified() => {}
            }
        }

        self.state = EngineState::Stopped;
        info!("🛑 Grid engine stopped with {} resting orders", self.orders.len());
        self.notifier.notify(self.performance.report());
        Ok(())
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Current balance: configured starting balance plus realized grid PnL
    pub fn balance(&self) -> f64 {
        self.config.initial_balance() + self.pnl.total_pnl
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn grid(&self) -> Option<&GridConfig> {
        self.grid.as_ref()
    }

    pub fn active_orders(&self) -> &[Order] {
        self.orders.active()
    }

    pub fn order_ledger(&self) -> &OrderLedger {
        &self.orders
    }

    pub fn stats(&self) -> &PerformanceStats {
        self.performance.stats()
    }

    pub fn risk_state(&self) -> RiskState {
        self.risk.state()
    }

    pub fn pnl(&self) -> &PnlLedger {
        &self.pnl
    }

    fn save_grid(&self) {
        if let Some(grid) = &self.grid {
            if let Err(e) = self.store.save_grid(grid) {
                warn!("⚠️  Failed to persist grid: {}", e);
            }
        }
    }

    fn persist_orders(&self) {
        if let Err(e) = self.store.save_orders(self.orders.active()) {
            warn!("⚠️  Failed to persist orders: {}", e);
        }
    }
}

impl std::fmt::Debug for GridEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GridEngine")
            .field("state", &self.state)
            .field("grid", &self.grid)
            .field("active_orders", &self.orders.len())
            .finish()
    }
}
