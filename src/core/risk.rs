// Portfolio-level risk limits: daily loss and drawdown from peak

use serde::Serialize;
use tracing::{info, warn};

use crate::config::RiskConfig;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskLimits {
    pub max_drawdown: f64,
    pub max_daily_loss: f64,
}

impl From<&RiskConfig> for RiskLimits {
    fn from(config: &RiskConfig) -> Self {
        Self {
            max_drawdown: config.max_drawdown,
            max_daily_loss: config.max_daily_loss,
        }
    }
}

impl Default for RiskLimits {
    fn default() -> Self {
        Self { max_drawdown: 0.10, max_daily_loss: 0.05 }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RiskState {
    pub daily_pnl: f64,
    pub session_start_balance: f64,
    /// Never decreases
    pub peak_balance: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RiskStatus {
    pub daily_limit_exceeded: bool,
    pub drawdown_limit_exceeded: bool,
    pub should_stop_trading: bool,
}

/// Advisory risk checks; the engine decides what to do with the result
#[derive(Debug, Clone)]
pub struct RiskManager {
    limits: RiskLimits,
    state: RiskState,
}

impl RiskManager {
    pub fn new(limits: RiskLimits) -> Self {
        Self { limits, state: RiskState::default() }
    }

    /// Capture the balance the daily-loss check is measured against
    pub fn start_session(&mut self, balance: f64) {
        self.state.session_start_balance = balance;
        self.state.peak_balance = self.state.peak_balance.max(balance);
    }

    /// Restart mid-day: keep the day's realized PnL and the historical peak
    pub fn resume_session(&mut self, balance: f64, daily_pnl: f64, peak_balance: f64) {
        self.start_session(balance - daily_pnl);
        self.state.daily_pnl = daily_pnl;
        self.state.peak_balance = self.state.peak_balance.max(peak_balance).max(balance);
    }

    pub fn update_pnl(&mut self, delta: f64, current_balance: f64) -> RiskStatus {
        self.state.daily_pnl += delta;
        if current_balance > self.state.peak_balance {
            self.state.peak_balance = current_balance;
        }
        self.check_limits(current_balance)
    }

    pub fn check_limits(&self, current_balance: f64) -> RiskStatus {
        let mut status = RiskStatus::default();

        if self.state.session_start_balance > 0.0 {
            let daily_pct = self.state.daily_pnl.abs() / self.state.session_start_balance;
            if daily_pct > self.limits.max_daily_loss {
                status.daily_limit_exceeded = true;
                warn!("🚨 Daily PnL limit exceeded: {:.2}%", daily_pct * 100.0);
            }
        }

        if self.state.peak_balance > 0.0 {
            let drawdown = (self.state.peak_balance - current_balance) / self.state.peak_balance;
            if drawdown > self.limits.max_drawdown {
                status.drawdown_limit_exceeded = true;
                warn!("🚨 Maximum drawdown exceeded: {:.2}%", drawdown * 100.0);
            }
        }

        status.should_stop_trading = status.daily_limit_exceeded || status.drawdown_limit_exceeded;
        status
    }

    /// Called by the owner on a day boundary
    pub fn reset_daily_pnl(&mut self) {
        self.state.daily_pnl = 0.0;
        info!("🔄 Daily PnL reset");
    }

    pub fn state(&self) -> RiskState {
        self.state
    }

    pub fn limits(&self) -> RiskLimits {
        self.limits
    }
}
