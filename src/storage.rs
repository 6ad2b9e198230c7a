// JSON snapshot persistence for orders, PnL and the live grid

use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::core::types::{GridConfig, Order};
use crate::error::{TradingError, TradingResult};

const ORDERS_FILE: &str = "orders.json";
const PNL_FILE: &str = "pnl.json";
const GRID_FILE: &str = "grid.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PnlEntry {
    pub timestamp: DateTime<Utc>,
    pub profit: f64,
}

/// Append-only record of realized grid profit
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PnlLedger {
    pub total_pnl: f64,
    pub trades: Vec<PnlEntry>,
}

impl PnlLedger {
    pub fn record(&mut self, profit: f64, timestamp: DateTime<Utc>) {
        self.total_pnl += profit;
        self.trades.push(PnlEntry { timestamp, profit });
    }

    /// The last `n` entries, oldest first
    pub fn recent(&self, n: usize) -> &[PnlEntry] {
        &self.trades[self.trades.len().saturating_sub(n)..]
    }

    pub fn trade_count(&self) -> usize {
        self.trades.len()
    }

    /// Realized PnL of trades booked on the given UTC day
    pub fn pnl_on(&self, day: NaiveDate) -> f64 {
        self.trades
            .iter()
            .filter(|t| t.timestamp.date_naive() == day)
            .map(|t| t.profit)
            .sum()
    }

    /// Highest running balance reached from `initial_balance`
    pub fn peak_balance(&self, initial_balance: f64) -> f64 {
        let mut balance = initial_balance;
        let mut peak = initial_balance;
        for trade in &self.trades {
            balance += trade.profit;
            peak = peak.max(balance);
        }
        peak
    }
}

/// Whole-state snapshots. Loads of missing snapshots return empty state.
pub trait SnapshotStore: Send + Sync {
    fn save_orders(&self, orders: &[Order]) -> TradingResult<()>;
    fn load_orders(&self) -> TradingResult<Vec<Order>>;
    fn save_pnl(&self, ledger: &PnlLedger) -> TradingResult<()>;
    fn load_pnl(&self) -> TradingResult<PnlLedger>;
    fn save_grid(&self, grid: &GridConfig) -> TradingResult<()>;
    fn load_grid(&self) -> TradingResult<Option<GridConfig>>;
}

#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self { dir: dir.as_ref().to_path_buf() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn write<T: Serialize + ?Sized>(&self, file: &str, value: &T) -> TradingResult<()> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| TradingError::DirectoryCreate(format!("{}: {}", self.dir.display(), e)))?;

        let path = self.dir.join(file);
        let tmp = self.dir.join(format!(".{}.tmp", file));
        let json = serde_json::to_string_pretty(value)?;

        fs::write(&tmp, json).map_err(|e| TradingError::FileWrite(format!("{}: {}", tmp.display(), e)))?;
        fs::rename(&tmp, &path).map_err(|e| TradingError::FileWrite(format!("{}: {}", path.display(), e)))?;
        debug!("💾 Saved {}", path.display());
        Ok(())
    }

    fn read<T: DeserializeOwned>(&self, file: &str) -> TradingResult<Option<T>> {
        let path = self.dir.join(file);
        if !path.exists() {
            return Ok(None);
        }
        let content =
            fs::read_to_string(&path).map_err(|e| TradingError::FileRead(format!("{}: {}", path.display(), e)))?;
        let value = serde_json::from_str(&content)
            .map_err(|e| TradingError::Serialization(format!("{}: {}", path.display(), e)))?;
        Ok(Some(value))
    }
}

impl SnapshotStore for JsonFileStore {
    fn save_orders(&self, orders: &[Order]) -> TradingResult<()> {
        self.write(ORDERS_FILE, orders)
    }

    fn load_orders(&self) -> TradingResult<Vec<Order>> {
        Ok(self.read(ORDERS_FILE)?.unwrap_or_default())
    }

    fn save_pnl(&self, ledger: &PnlLedger) -> TradingResult<()> {
        self.write(PNL_FILE, ledger)
    }

    fn load_pnl(&self) -> TradingResult<PnlLedger> {
        Ok(self.read(PNL_FILE)?.unwrap_or_default())
    }

    fn save_grid(&self, grid: &GridConfig) -> TradingResult<()> {
        self.write(GRID_FILE, grid)
    }

    fn load_grid(&self) -> TradingResult<Option<GridConfig>> {
        self.read(GRID_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_snapshots_load_empty() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path().join("nested"));

        assert!(store.load_orders().unwrap().is_empty());
        assert_eq!(store.load_pnl().unwrap(), PnlLedger::default());
        assert!(store.load_grid().unwrap().is_none());
    }

    #[test]
    fn test_pnl_file_layout() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path());

        let mut ledger = PnlLedger::default();
        ledger.record(0.4, Utc::now());
        ledger.record(0.25, Utc::now());
        store.save_pnl(&ledger).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join("pnl.json")).unwrap()).unwrap();
        assert!((raw["total_pnl"].as_f64().unwrap() - 0.65).abs() < 1e-12);
        assert_eq!(raw["trades"].as_array().unwrap().len(), 2);
        assert!(raw["trades"][0]["timestamp"].is_string());

        assert_eq!(store.load_pnl().unwrap(), ledger);
        assert!(!dir.path().join(".pnl.json.tmp").exists());
    }

    #[test]
    fn test_corrupt_snapshot_is_an_error() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("orders.json"), "{not json").unwrap();
        let store = JsonFileStore::new(dir.path());
        assert!(matches!(store.load_orders(), Err(TradingError::Serialization(_))));
    }

    #[test]
    fn test_daily_pnl_and_peak_from_entries() {
        let today = Utc::now();
        let yesterday = today - chrono::Duration::days(1);
        let mut ledger = PnlLedger::default();
        ledger.record(5.0, yesterday);
        ledger.record(-8.0, yesterday);
        ledger.record(0.5, today);
        ledger.record(0.25, today);

        assert!((ledger.pnl_on(today.date_naive()) - 0.75).abs() < 1e-12);
        assert!((ledger.pnl_on(yesterday.date_naive()) + 3.0).abs() < 1e-12);
        assert_eq!(ledger.peak_balance(1000.0), 1005.0);
        assert_eq!(PnlLedger::default().peak_balance(1000.0), 1000.0);
    }

    #[test]
    fn test_recent_entries() {
        let mut ledger = PnlLedger::default();
        for i in 0..5 {
            ledger.record(i as f64, Utc::now());
        }
        let last = ledger.recent(2);
        assert_eq!(last.len(), 2);
        assert_eq!(last[0].profit, 3.0);
        assert_eq!(ledger.recent(10).len(), 5);
    }
}
