// Core grid trading logic

pub mod bounds;
pub mod engine;
pub mod ledger;
pub mod performance;
pub mod risk;
pub mod types;
pub mod volatility;

// Re-export commonly used types
pub use bounds::{compute_grid_parameters, needs_adjustment, BoundsCalculator, GridBounds, GridParameters};
pub use engine::{FillOutcome, GridEngine, LadderSummary, StopHandle};
pub use ledger::{mirror_of, OrderLedger};
pub use performance::{PerformanceStats, PerformanceTracker, StreakType, ZeroProfitPolicy};
pub use risk::{RiskLimits, RiskManager, RiskState, RiskStatus};
pub use types::{Candle, EngineState, GridConfig, Order, OrderRequest, OrderSide, OrderStatus};
pub use volatility::{average_true_range, candle_atr};
