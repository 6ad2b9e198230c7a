// Run command: wire gateway, store and notifier into the engine
use adaptive_grid_bot::gateway::{ExecutionGateway, KucoinFuturesGateway, PaperGateway, RandomWalkFeed};
use adaptive_grid_bot::notify::{notifier_from_config, NotificationDispatcher};
use adaptive_grid_bot::{Config, GridEngine, JsonFileStore, OrderSide, TradingResult};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Per-step relative move of the offline random walk
const OFFLINE_STEP_PCT: f64 = 0.002;

fn build_gateway(config: &Config, offline: bool, start_price: f64) -> TradingResult<Arc<dyn ExecutionGateway>> {
    let fill_probability = config.engine.fill_probability;
    let quote_ttl = Duration::from_millis(config.engine.quote_cache_ms);

    if offline {
        info!("🧪 OFFLINE mode: random-walk market from {:.2}", start_price);
        let feed = RandomWalkFeed::new(start_price, OFFLINE_STEP_PCT);
        return Ok(Arc::new(PaperGateway::new(feed, fill_probability, quote_ttl)));
    }

    let kucoin = KucoinFuturesGateway::new(&config.exchange)?;
    if config.exchange.sandbox {
        info!("🧪 SANDBOX mode: KuCoin quotes, simulated fills ({:.0}% per check)", fill_probability * 100.0);
        Ok(Arc::new(PaperGateway::new(kucoin, fill_probability, quote_ttl)))
    } else {
        info!("🚀 LIVE TRADING on KuCoin Futures");
        warn!("⚠️  Real money!");
        Ok(Arc::new(kucoin))
    }
}

/// Resolves on Ctrl-C, or SIGTERM on unix
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("⚠️  Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("⚠️  Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

pub async fn run_bot(config: Config, offline: bool, start_price: f64, duration: Option<Duration>) -> TradingResult<()> {
    let gateway = build_gateway(&config, offline, start_price)?;
    let store = Arc::new(JsonFileStore::new(&config.storage.data_dir));
    let (dispatcher, notify_task) = NotificationDispatcher::spawn(notifier_from_config(&config.notifier)?);

    info!("💰 Budget: {:.2} USDT on {}", config.grid.budget, config.grid.symbol);
    info!("📂 Data directory: {}", config.storage.data_dir);
    if let Some(d) = duration {
        info!("⏰ Session length: {:.1} minutes", d.as_secs_f64() / 60.0);
    }

    let mut engine = GridEngine::new(config, gateway, store, dispatcher);

    let stop = engine.stop_handle();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("🛑 Shutdown requested, finishing current cycle...");
        stop.stop();
    });

    engine.start().await?;
    engine.run(duration).await?;

    let ledger = engine.order_ledger();
    info!(
        "📋 Orders left resting on the book: {} buys, {} sells",
        ledger.count_by_side(OrderSide::Buy),
        ledger.count_by_side(OrderSide::Sell)
    );
    info!("💰 Session balance: {:.2} USDT", engine.balance());
    drop(engine);

    // Let queued notifications go out before exiting
    if tokio::time::timeout(Duration::from_secs(10), notify_task).await.is_err() {
        warn!("⚠️  Timed out flushing notifications");
    }
    info!("✅ Grid bot stopped");
    Ok(())
}
