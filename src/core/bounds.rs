// Grid bounds and per-cell sizing from volatility and budget

use tracing::{info, warn};

use crate::config::GridSettings;
use crate::error::{TradingError, TradingResult};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridBounds {
    pub lower: f64,
    pub upper: f64,
    /// True when computed from the fixed fallback band instead of volatility
    pub degraded: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridParameters {
    pub spread: f64,
    /// Quote-currency value allotted to each order
    pub position_size: f64,
    /// Base-asset order size
    pub increment: f64,
}

#[derive(Debug, Clone)]
pub struct BoundsCalculator {
    multiplier: f64,
    fallback_band_pct: f64,
}

impl BoundsCalculator {
    pub fn new(multiplier: f64, fallback_band_pct: f64) -> Self {
        Self { multiplier, fallback_band_pct }
    }

    pub fn from_settings(settings: &GridSettings) -> Self {
        Self::new(settings.atr_multiplier, settings.fallback_band_pct)
    }

    /// `price ± multiplier·volatility`, or a fixed band around price when
    /// volatility is unavailable. The fallback is flagged as degraded.
    pub fn compute_bounds(&self, current_price: f64, volatility: f64) -> GridBounds {
        if volatility > 0.0 && volatility.is_finite() {
            let lower = current_price - self.multiplier * volatility;
            let upper = current_price + self.multiplier * volatility;
            info!("📏 ATR {:.4} → bounds {:.4} - {:.4}", volatility, lower, upper);
            GridBounds { lower, upper, degraded: false }
        } else {
            let lower = current_price * (1.0 - self.fallback_band_pct);
            let upper = current_price * (1.0 + self.fallback_band_pct);
            warn!(
                "⚠️  No volatility data, DEGRADED MODE: fixed ±{:.1}% band {:.4} - {:.4}",
                self.fallback_band_pct * 100.0,
                lower,
                upper
            );
            GridBounds { lower, upper, degraded: true }
        }
    }
}

/// Spread and order size for a grid between `lower` and `upper`.
///
/// Half the slots are buys and half sells, so each order gets
/// `budget / (grid_size · 2)` of quote currency, converted to base units at
/// the lower bound.
pub fn compute_grid_parameters(lower: f64, upper: f64, grid_size: u32, budget: f64) -> TradingResult<GridParameters> {
    if grid_size < 2 || grid_size % 2 != 0 {
        return Err(TradingError::InvalidParameter(
            "grid_size".to_string(),
            format!("must be an even integer >= 2, got {}", grid_size),
        ));
    }
    if !(budget > 0.0) || !budget.is_finite() {
        return Err(TradingError::InvalidParameter(
            "budget".to_string(),
            format!("must be positive, got {}", budget),
        ));
    }
    if !(lower > 0.0) || !(lower < upper) || !upper.is_finite() {
        return Err(TradingError::InvalidParameter(
            "bounds".to_string(),
            format!("need 0 < lower < upper, got {} - {}", lower, upper),
        ));
    }

    let spread = (upper - lower) / grid_size as f64;
    let position_size = budget / (grid_size as f64 * 2.0);
    let increment = position_size / lower;

    if !(spread > 0.0) || !(increment > 0.0) {
        return Err(TradingError::InvalidParameter(
            "grid".to_string(),
            format!("non-positive spread {} or increment {}", spread, increment),
        ));
    }

    info!("⚙️  Grid parameters - spread: {:.4}, increment: {:.6}", spread, increment);
    Ok(GridParameters { spread, position_size, increment })
}

/// True when either bound drifted by more than `threshold` relative to the old one
pub fn needs_adjustment(old: GridBounds, new: GridBounds, threshold: f64) -> bool {
    let lower_diff = (new.lower - old.lower).abs() / old.lower;
    let upper_diff = (new.upper - old.upper).abs() / old.upper;
    lower_diff > threshold || upper_diff > threshold
}
