// Configuration management for the adaptive grid bot

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

use crate::core::performance::ZeroProfitPolicy;
use crate::error::{TradingError, TradingResult};

const MASK: &str = "***MASKED***";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExchangeConfig {
    pub api_key: String,
    pub api_secret: String,
    pub api_passphrase: String,
    pub rest_url: String,
    /// Paper trading: quotes come from the exchange, fills are simulated locally
    pub sandbox: bool,
    pub candle_granularity_minutes: u32,
    pub candle_limit: usize,
    /// Order prices are rounded to a multiple of this
    pub tick_size: f64,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_secret: String::new(),
            api_passphrase: String::new(),
            rest_url: "https://api-futures.kucoin.com".to_string(),
            sandbox: true,
            candle_granularity_minutes: 60,
            candle_limit: 50,
            tick_size: 0.01,
        }
    }
}

impl ExchangeConfig {
    pub fn has_credentials(&self) -> bool {
        !self.api_key.is_empty() && !self.api_secret.is_empty() && !self.api_passphrase.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifierConfig {
    pub enabled: bool,
    pub telegram_token: String,
    pub telegram_chat_id: String,
    pub api_url: String,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            telegram_token: String::new(),
            telegram_chat_id: String::new(),
            api_url: "https://api.telegram.org".to_string(),
        }
    }
}

impl NotifierConfig {
    pub fn telegram_ready(&self) -> bool {
        self.enabled && !self.telegram_token.is_empty() && !self.telegram_chat_id.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GridSettings {
    pub symbol: String,
    pub leverage: u32,
    pub grid_size: u32,
    pub budget: f64,
    pub stop_loss_pct: f64,
    pub take_profit_pct: f64,
    pub atr_period: usize,
    pub atr_multiplier: f64,
    /// Half-width of the band used when no volatility data is available
    pub fallback_band_pct: f64,
    /// Relative bound drift that triggers a rebuild
    pub adjust_threshold: f64,
    pub adjust_interval_minutes: u64,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            symbol: "XBTUSDTM".to_string(),
            leverage: 10,
            grid_size: 10,
            budget: 1000.0,
            stop_loss_pct: 0.01,
            take_profit_pct: 0.02,
            atr_period: 14,
            atr_multiplier: 2.0,
            fallback_band_pct: 0.05,
            adjust_threshold: 0.05,
            adjust_interval_minutes: 15,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    pub max_drawdown: f64,
    pub max_daily_loss: f64,
    /// Account balance the PnL ledger is added to; defaults to the grid budget
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_balance: Option<f64>,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            max_drawdown: 0.10,
            max_daily_loss: 0.05,
            initial_balance: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub poll_interval_secs: u64,
    pub error_backoff_secs: u64,
    /// Per-poll fill probability for crossed paper orders
    pub fill_probability: f64,
    pub quote_cache_ms: u64,
    pub history_retention_hours: i64,
    pub zero_profit_policy: ZeroProfitPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 10,
            error_backoff_secs: 30,
            fill_probability: 0.10,
            quote_cache_ms: 1000,
            history_retention_hours: 24,
            zero_profit_policy: ZeroProfitPolicy::CountAsLoss,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: "./data".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub log_to_file: bool,
    pub log_directory: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_to_file: true,
            log_directory: "logs".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub exchange: ExchangeConfig,
    pub notifier: NotifierConfig,
    pub grid: GridSettings,
    pub risk: RiskConfig,
    pub engine: EngineConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Load and validate configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> TradingResult<Self> {
        let config = Self::parse_file(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Load the file if present, apply `.env` and process environment overrides, then validate
    pub fn load<P: AsRef<Path>>(path: P) -> TradingResult<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            Self::parse_file(path)?
        } else {
            info!("📁 No config file at {}, using defaults", path.display());
            Self::default()
        };

        dotenvy::dotenv().ok();
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> TradingResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| TradingError::Serialization(e.to_string()))?;

        fs::write(path, content).map_err(|e| TradingError::FileWrite(e.to_string()))?;
        Ok(())
    }

    /// Load configuration from file, or create default if file doesn't exist
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> TradingResult<Self> {
        if path.as_ref().exists() {
            Self::from_file(path)
        } else {
            let config = Self::default();
            config.to_file(&path)?;
            info!("📁 Created default config file: {}", path.as_ref().display());
            Ok(config)
        }
    }

    fn parse_file<P: AsRef<Path>>(path: P) -> TradingResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(TradingError::ConfigNotFound(path.display().to_string()));
        }
        let content = fs::read_to_string(path).map_err(|e| TradingError::FileRead(e.to_string()))?;
        Ok(toml::from_str(&content)?)
    }

    /// Apply overrides using the same variable names as the deployment environment
    pub fn apply_overrides<F>(&mut self, lookup: F) -> TradingResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let text = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = text("KUCOIN_API_KEY") {
            self.exchange.api_key = v;
        }
        if let Some(v) = text("KUCOIN_API_SECRET") {
            self.exchange.api_secret = v;
        }
        if let Some(v) = text("KUCOIN_API_PASSPHRASE") {
            self.exchange.api_passphrase = v;
        }
        if let Some(v) = text("TELEGRAM_TOKEN") {
            self.notifier.telegram_token = v;
        }
        if let Some(v) = text("TELEGRAM_CHAT_ID") {
            self.notifier.telegram_chat_id = v;
        }
        if let Some(v) = text("SYMBOL") {
            self.grid.symbol = v;
        }
        if let Some(v) = text("DATA_DIR") {
            self.storage.data_dir = v;
        }
        if let Some(v) = text("SANDBOX") {
            self.exchange.sandbox = v.trim().eq_ignore_ascii_case("true");
        }
        if let Some(v) = text("LEVERAGE") {
            self.grid.leverage = parse_override("LEVERAGE", &v)?;
        }
        if let Some(v) = text("GRID_SIZE") {
            self.grid.grid_size = parse_override("GRID_SIZE", &v)?;
        }
        if let Some(v) = text("ADJUST_INTERVAL_MIN") {
            self.grid.adjust_interval_minutes = parse_override("ADJUST_INTERVAL_MIN", &v)?;
        }
        if let Some(v) = text("STOP_LOSS") {
            self.grid.stop_loss_pct = parse_override("STOP_LOSS", &v)?;
        }
        if let Some(v) = text("TAKE_PROFIT") {
            self.grid.take_profit_pct = parse_override("TAKE_PROFIT", &v)?;
        }
        if let Some(v) = text("BUDGET") {
            self.grid.budget = parse_override("BUDGET", &v)?;
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> TradingResult<()> {
        let grid = &self.grid;
        let mut errors = Vec::new();

        if grid.symbol.is_empty()
            || !grid.symbol.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == ':')
        {
            errors.push(format!("invalid symbol format: '{}'", grid.symbol));
        }
        check_range(&mut errors, "leverage", grid.leverage as f64, 1.0, 100.0);
        check_range(&mut errors, "grid_size", grid.grid_size as f64, 2.0, 50.0);
        if grid.grid_size % 2 != 0 {
            errors.push(format!("grid_size must be even, got {}", grid.grid_size));
        }
        check_range(&mut errors, "budget", grid.budget, 10.0, 1_000_000.0);
        check_range(&mut errors, "stop_loss_pct", grid.stop_loss_pct, 0.001, 0.1);
        check_range(&mut errors, "take_profit_pct", grid.take_profit_pct, 0.001, 0.2);
        if grid.atr_period == 0 {
            errors.push("atr_period must be at least 1".to_string());
        }
        if !(grid.atr_multiplier > 0.0) {
            errors.push("atr_multiplier must be positive".to_string());
        }
        if !(grid.fallback_band_pct > 0.0 && grid.fallback_band_pct < 1.0) {
            errors.push("fallback_band_pct must be between 0 and 1".to_string());
        }
        if !(grid.adjust_threshold > 0.0 && grid.adjust_threshold < 1.0) {
            errors.push("adjust_threshold must be between 0 and 1".to_string());
        }
        if !(self.risk.max_drawdown > 0.0 && self.risk.max_drawdown <= 1.0) {
            errors.push("max_drawdown must be in (0, 1]".to_string());
        }
        if !(self.risk.max_daily_loss > 0.0 && self.risk.max_daily_loss <= 1.0) {
            errors.push("max_daily_loss must be in (0, 1]".to_string());
        }
        if let Some(balance) = self.risk.initial_balance {
            if !(balance > 0.0) {
                errors.push("initial_balance must be positive".to_string());
            }
        }
        if self.engine.poll_interval_secs == 0 {
            errors.push("poll_interval_secs must be greater than 0".to_string());
        }
        if !(0.0..=1.0).contains(&self.engine.fill_probability) {
            errors.push("fill_probability must be between 0 and 1".to_string());
        }
        if self.exchange.tick_size <= 0.0 || !self.exchange.tick_size.is_finite() {
            errors.push("tick_size must be positive".to_string());
        }
        if self.exchange.candle_limit <= grid.atr_period {
            errors.push(format!(
                "candle_limit ({}) must exceed atr_period ({})",
                self.exchange.candle_limit, grid.atr_period
            ));
        }
        if !self.exchange.sandbox && !self.exchange.has_credentials() {
            errors.push("live trading requires api_key, api_secret and api_passphrase".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(TradingError::ConfigValidation(errors.join("; ")))
        }
    }

    /// Balance the risk manager measures drawdown against
    pub fn initial_balance(&self) -> f64 {
        self.risk.initial_balance.unwrap_or(self.grid.budget)
    }

    /// Copy of the configuration safe to print or log
    pub fn masked(&self) -> Self {
        let mut safe = self.clone();
        for secret in [
            &mut safe.exchange.api_key,
            &mut safe.exchange.api_secret,
            &mut safe.exchange.api_passphrase,
            &mut safe.notifier.telegram_token,
        ] {
            if !secret.is_empty() {
                *secret = MASK.to_string();
            }
        }
        safe
    }
}

fn parse_override<T: std::str::FromStr>(key: &str, value: &str) -> TradingResult<T> {
    value
        .trim()
        .parse::<T>()
        .map_err(|_| TradingError::InvalidParameter(key.to_string(), format!("not a number: {}", value)))
}

fn check_range(errors: &mut Vec<String>, name: &str, value: f64, min: f64, max: f64) {
    if !(min..=max).contains(&value) {
        errors.push(format!("{} out of range: {} (must be between {} and {})", name, value, min, max));
    }
}
