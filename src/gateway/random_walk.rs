// Offline quote source: seeded random walk with synthetic candles

use async_trait::async_trait;
use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;

use crate::core::types::Candle;
use crate::error::TradingResult;
use crate::gateway::MarketDataSource;

struct WalkState {
    price: f64,
    rng: StdRng,
}

pub struct RandomWalkFeed {
    /// Maximum relative move per step
    step_pct: f64,
    state: Mutex<WalkState>,
}

impl RandomWalkFeed {
    pub fn new(start_price: f64, step_pct: f64) -> Self {
        Self::with_rng(start_price, step_pct, StdRng::from_entropy())
    }

    pub fn with_seed(start_price: f64, step_pct: f64, seed: u64) -> Self {
        Self::with_rng(start_price, step_pct, StdRng::seed_from_u64(seed))
    }

    fn with_rng(start_price: f64, step_pct: f64, rng: StdRng) -> Self {
        Self {
            step_pct,
            state: Mutex::new(WalkState { price: start_price, rng }),
        }
    }

    fn step(&self, state: &mut WalkState) -> f64 {
        let shock: f64 = state.rng.gen_range(-1.0..=1.0);
        state.price = (state.price * (1.0 + shock * self.step_pct)).max(f64::EPSILON);
        state.price
    }
}

#[async_trait]
impl MarketDataSource for RandomWalkFeed {
    async fn current_price(&self, _symbol: &str) -> TradingResult<f64> {
        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        Ok(self.step(&mut state))
    }

    /// Candles walk backwards from the current price so the newest close
    /// matches the live quote.
    async fn candles(&self, _symbol: &str, granularity_minutes: u32, limit: usize) -> TradingResult<Vec<Candle>> {
        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        let interval_ms = granularity_minutes as i64 * 60_000;
        let now = Utc::now().timestamp_millis();

        let mut close = state.price;
        let mut candles = Vec::with_capacity(limit);
        for i in 0..limit {
            let open = close * (1.0 + state.rng.gen_range(-1.0..=1.0) * self.step_pct * 4.0);
            let wick_up: f64 = state.rng.gen_range(0.0..=1.0) * self.step_pct * 2.0;
            let wick_down: f64 = state.rng.gen_range(0.0..=1.0) * self.step_pct * 2.0;
            candles.push(Candle {
                timestamp: now - interval_ms * (i as i64 + 1),
                open,
                high: open.max(close) * (1.0 + wick_up),
                low: open.min(close) * (1.0 - wick_down),
                close,
                volume: state.rng.gen_range(1.0..100.0),
            });
            close = open;
        }

        candles.reverse();
        Ok(candles)
    }
}
