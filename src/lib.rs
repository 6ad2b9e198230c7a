// Adaptive Grid Bot Library
//
// ATR-sized grid market making on KuCoin Futures with paper trading,
// risk halts and Telegram notifications

pub mod config;
pub mod core;
pub mod error;   // Unified error handling
pub mod gateway;
pub mod logging;
pub mod notify;
pub mod storage; // JSON snapshots

// Re-export core trading types
pub use core::{
    BoundsCalculator, EngineState, GridBounds, GridConfig, GridEngine, Order, OrderLedger, OrderSide,
    PerformanceTracker, RiskManager, StopHandle,
};

// Re-export error types
pub use error::{TradingError, TradingResult};

// Re-export configuration
pub use config::{Config, LoggingConfig};

// Re-export collaborators
pub use gateway::{ExecutionGateway, KucoinFuturesGateway, MarketDataSource, OrderState, PaperGateway, RandomWalkFeed};
pub use notify::{NotificationDispatcher, Notifier};
pub use storage::{JsonFileStore, PnlLedger, SnapshotStore};
