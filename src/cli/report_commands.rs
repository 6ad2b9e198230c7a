// Init, validate, PnL and status commands
use adaptive_grid_bot::core::{PerformanceTracker, StreakType};
use adaptive_grid_bot::gateway::{ExecutionGateway, KucoinFuturesGateway};
use adaptive_grid_bot::notify::messages;
use adaptive_grid_bot::{Config, JsonFileStore, SnapshotStore, TradingError, TradingResult};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

fn print_block(text: &str) {
    for line in messages::plain_text(text).lines() {
        info!("{}", line);
    }
}

pub fn init_config(path: &str, force: bool) -> TradingResult<()> {
    info!("🔧 Initializing workspace...");

    if Path::new(path).exists() && !force {
        warn!("⚠️  {} already exists, use --force to overwrite", path);
        return Ok(());
    }

    let config = Config::default();
    config.to_file(path)?;
    info!("📝 Created {}", path);

    for dir in [&config.storage.data_dir, &config.logging.log_directory] {
        fs::create_dir_all(dir).map_err(|e| TradingError::DirectoryCreate(format!("{}: {}", dir, e)))?;
    }

    info!("✅ Workspace initialized successfully!");
    info!("💡 Next steps:");
    info!("   1. Edit {} or export KUCOIN_API_KEY / TELEGRAM_TOKEN etc.", path);
    info!("   2. Run: grid-bot validate");
    info!("   3. Run: grid-bot run --offline --minutes 5");
    Ok(())
}

pub fn validate_config(config: &Config) -> TradingResult<()> {
    let rendered = toml::to_string_pretty(&config.masked())
        .map_err(|e| TradingError::Serialization(e.to_string()))?;
    info!("✅ Configuration valid");
    for line in rendered.lines() {
        info!("   {}", line);
    }
    if !config.exchange.sandbox {
        warn!("⚠️  sandbox = false: orders will be sent to the live exchange");
    }
    if !config.notifier.telegram_ready() {
        info!("📣 Telegram not configured, notifications go to the log");
    }
    Ok(())
}

pub fn show_pnl(config: &Config, last: usize) -> TradingResult<()> {
    let store = JsonFileStore::new(&config.storage.data_dir);
    let ledger = store.load_pnl()?;
    print_block(&messages::pnl_report(&ledger, last));

    if ledger.trade_count() > 0 {
        let tracker = PerformanceTracker::from_ledger(&ledger, config.engine.zero_profit_policy);
        info!("");
        print_block(&tracker.report());
        if tracker.stats().current_streak_type == Some(StreakType::Loss) {
            warn!("⚠️  Currently on a losing streak of {}", tracker.stats().current_streak);
        }
    }
    Ok(())
}

pub async fn show_status(config: &Config) -> TradingResult<()> {
    let store = JsonFileStore::new(&config.storage.data_dir);
    let grid = store.load_grid()?;
    let orders = store.load_orders()?;
    let ledger = store.load_pnl()?;

    let balance = if !config.exchange.sandbox && config.exchange.has_credentials() {
        match KucoinFuturesGateway::new(&config.exchange)?.account_balance().await {
            Ok(balance) => balance,
            Err(e) => {
                warn!("⚠️  Could not fetch account balance: {}", e);
                None
            }
        }
    } else {
        None
    };

    let state = if grid.is_some() && !orders.is_empty() { "grid persisted" } else { "no active grid" };
    print_block(&messages::status(state, grid.as_ref(), orders.len(), ledger.total_pnl, balance));

    for order in &orders {
        info!(
            "   • {} {} {:.6} @ {:.4} (since {})",
            order.order_id,
            order.side.as_str().to_uppercase(),
            order.size,
            order.price,
            order.created_at.format("%Y-%m-%d %H:%M")
        );
    }
    Ok(())
}
