// Trade outcome statistics: win/loss counts, streaks and profit factor

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::notify::messages;
use crate::storage::PnlLedger;

/// How a trade with exactly zero profit is classified
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZeroProfitPolicy {
    /// Legacy convention: anything not strictly positive is a loss
    #[default]
    CountAsLoss,
    /// Counted as a trade and a breakeven, leaves the streak untouched
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StreakType {
    Win,
    Loss,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PerformanceStats {
    pub trades_count: u64,
    pub win_count: u64,
    pub loss_count: u64,
    pub breakeven_count: u64,
    pub total_profit: f64,
    pub total_loss: f64,
    pub current_streak: u32,
    pub current_streak_type: Option<StreakType>,
    pub max_consecutive_wins: u32,
    pub max_consecutive_losses: u32,
}

impl PerformanceStats {
    pub fn win_rate(&self) -> f64 {
        if self.trades_count == 0 {
            0.0
        } else {
            self.win_count as f64 / self.trades_count as f64 * 100.0
        }
    }

    pub fn average_win(&self) -> f64 {
        if self.win_count == 0 { 0.0 } else { self.total_profit / self.win_count as f64 }
    }

    pub fn average_loss(&self) -> f64 {
        if self.loss_count == 0 { 0.0 } else { self.total_loss / self.loss_count as f64 }
    }

    /// Infinite when nothing has been lost yet
    pub fn profit_factor(&self) -> f64 {
        if self.total_loss > 0.0 {
            self.total_profit / self.total_loss
        } else {
            f64::INFINITY
        }
    }

    pub fn net_pnl(&self) -> f64 {
        self.total_profit - self.total_loss
    }
}

#[derive(Debug, Clone)]
pub struct PerformanceTracker {
    started_at: DateTime<Utc>,
    policy: ZeroProfitPolicy,
    stats: PerformanceStats,
}

impl PerformanceTracker {
    pub fn new(policy: ZeroProfitPolicy) -> Self {
        Self {
            started_at: Utc::now(),
            policy,
            stats: PerformanceStats::default(),
        }
    }

    /// Rebuild statistics by replaying a persisted ledger
    pub fn from_ledger(ledger: &PnlLedger, policy: ZeroProfitPolicy) -> Self {
        let mut tracker = Self::new(policy);
        if let Some(first) = ledger.trades.first() {
            tracker.started_at = first.timestamp;
        }
        for trade in &ledger.trades {
            tracker.add_trade(trade.profit);
        }
        tracker
    }

    pub fn add_trade(&mut self, profit: f64) -> &PerformanceStats {
        self.stats.trades_count += 1;

        if profit > 0.0 {
            self.stats.win_count += 1;
            self.stats.total_profit += profit;
            self.update_streak(StreakType::Win);
        } else if profit == 0.0 && self.policy == ZeroProfitPolicy::Neutral {
            self.stats.breakeven_count += 1;
        } else {
            self.stats.loss_count += 1;
            self.stats.total_loss += profit.abs();
            self.update_streak(StreakType::Loss);
        }

        &self.stats
    }

    fn update_streak(&mut self, kind: StreakType) {
        if self.stats.current_streak_type == Some(kind) {
            self.stats.current_streak += 1;
        } else {
            self.stats.current_streak = 1;
            self.stats.current_streak_type = Some(kind);
        }

        match kind {
            StreakType::Win => {
                self.stats.max_consecutive_wins = self.stats.max_consecutive_wins.max(self.stats.current_streak)
            }
            StreakType::Loss => {
                self.stats.max_consecutive_losses = self.stats.max_consecutive_losses.max(self.stats.current_streak)
            }
        }
    }

    pub fn stats(&self) -> &PerformanceStats {
        &self.stats
    }

    pub fn runtime_hours(&self) -> f64 {
        (Utc::now() - self.started_at).num_seconds() as f64 / 3600.0
    }

    pub fn report(&self) -> String {
        messages::performance_report(&self.stats, self.runtime_hours())
    }
}
