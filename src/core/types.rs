// Common types used across the grid engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::GridSettings;
use crate::core::bounds::{compute_grid_parameters, GridBounds};
use crate::error::TradingResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn opposite(self) -> Self {
        match self {
            OrderSide::Buy => OrderSide::Sell,
            OrderSide::Sell => OrderSide::Buy,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OrderSide::Buy => "buy",
            OrderSide::Sell => "sell",
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Active,
    Filled,
    Cancelled,
}

/// A resting grid order. Binary lifecycle: active, then filled or cancelled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: String,
    pub symbol: String,
    pub side: OrderSide,
    pub size: f64,
    pub price: f64,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub filled_at: Option<DateTime<Utc>>,
}

/// What the engine asks the gateway to place
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderRequest {
    pub side: OrderSide,
    pub price: f64,
    pub size: f64,
}

/// One OHLC row, oldest first in every sequence
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Live grid parameters for the current generation of the ladder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridConfig {
    pub symbol: String,
    pub leverage: u32,
    pub grid_size: u32,
    pub budget: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub spread: f64,
    pub increment: f64,
    pub stop_loss_pct: f64,
    pub take_profit_pct: f64,
    pub atr_period: usize,
}

impl GridConfig {
    /// Build a grid generation from computed bounds. Fails on invalid parameters.
    pub fn from_bounds(settings: &GridSettings, bounds: GridBounds) -> TradingResult<Self> {
        let params = compute_grid_parameters(bounds.lower, bounds.upper, settings.grid_size, settings.budget)?;
        Ok(Self {
            symbol: settings.symbol.clone(),
            leverage: settings.leverage,
            grid_size: settings.grid_size,
            budget: settings.budget,
            lower_bound: bounds.lower,
            upper_bound: bounds.upper,
            spread: params.spread,
            increment: params.increment,
            stop_loss_pct: settings.stop_loss_pct,
            take_profit_pct: settings.take_profit_pct,
            atr_period: settings.atr_period,
        })
    }

    /// Move the grid to new bounds, recomputing spread and increment.
    /// Leaves `self` untouched when the new bounds are invalid.
    pub fn rebound(&mut self, bounds: GridBounds) -> TradingResult<()> {
        let params = compute_grid_parameters(bounds.lower, bounds.upper, self.grid_size, self.budget)?;
        self.lower_bound = bounds.lower;
        self.upper_bound = bounds.upper;
        self.spread = params.spread;
        self.increment = params.increment;
        Ok(())
    }

    pub fn bounds(&self) -> GridBounds {
        GridBounds {
            lower: self.lower_bound,
            upper: self.upper_bound,
            degraded: false,
        }
    }

    /// Inclusive bounds check applied to every order before placement
    pub fn contains(&self, price: f64) -> bool {
        price >= self.lower_bound && price <= self.upper_bound
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EngineState {
    Uninitialized,
    GridActive,
    Adjusting,
    /// Risk limits breached: fills are still tracked, no new orders are placed
    Halted,
    Stopped,
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EngineState::Uninitialized => "uninitialized",
            EngineState::GridActive => "grid-active",
            EngineState::Adjusting => "adjusting",
            EngineState::Halted => "halted",
            EngineState::Stopped => "stopped",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> GridSettings {
        GridSettings {
            grid_size: 10,
            budget: 1000.0,
            ..GridSettings::default()
        }
    }

    #[test]
    fn test_grid_config_from_bounds() {
        let bounds = GridBounds { lower: 96.0, upper: 104.0, degraded: false };
        let grid = GridConfig::from_bounds(&settings(), bounds).unwrap();

        assert!((grid.spread - 0.8).abs() < 1e-12);
        assert!((grid.increment - 50.0 / 96.0).abs() < 1e-12);
        assert!(grid.contains(96.0));
        assert!(grid.contains(104.0));
        assert!(!grid.contains(95.99));
        assert!(!grid.contains(104.01));
    }

    #[test]
    fn test_rebound_keeps_old_values_on_error() {
        let bounds = GridBounds { lower: 96.0, upper: 104.0, degraded: false };
        let mut grid = GridConfig::from_bounds(&settings(), bounds).unwrap();

        let inverted = GridBounds { lower: 110.0, upper: 90.0, degraded: false };
        assert!(grid.rebound(inverted).is_err());
        assert_eq!(grid.lower_bound, 96.0);
        assert_eq!(grid.upper_bound, 104.0);
    }

    #[test]
    fn test_order_serialization_format() {
        let order = Order {
            order_id: "abc".into(),
            symbol: "XBTUSDTM".into(),
            side: OrderSide::Buy,
            size: 0.5,
            price: 99.2,
            status: OrderStatus::Active,
            created_at: Utc::now(),
            filled_at: None,
        };
        let json = serde_json::to_value(&order).unwrap();
        assert_eq!(json["side"], "buy");
        assert_eq!(json["status"], "active");
        assert!(json["created_at"].is_string());
    }

    #[test]
    fn test_side_opposite() {
        assert_eq!(OrderSide::Buy.opposite(), OrderSide::Sell);
        assert_eq!(OrderSide::Sell.opposite(), OrderSide::Buy);
    }
}
