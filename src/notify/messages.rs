// Telegram HTML message formatting

use crate::config::Config;
use crate::core::bounds::GridBounds;
use crate::core::performance::PerformanceStats;
use crate::core::risk::{RiskLimits, RiskState, RiskStatus};
use crate::core::types::{GridConfig, Order};
use crate::error::TradingError;
use crate::storage::PnlLedger;

pub fn startup(config: &Config) -> String {
    let safe = config.masked();
    let mode = if safe.exchange.sandbox { "🧪 SANDBOX" } else { "💰 LIVE" };
    format!(
        "🚀 <b>GRID BOT STARTED</b>\n\n\
         ⚙️ <b>Configuration:</b>\n\
         • Symbol: {}\n\
         • Budget: {} USDT\n\
         • Leverage: {}x\n\
         • Grid size: {}\n\
         • Stop loss: {:.1}%\n\
         • Take profit: {:.1}%\n\
         • ATR adjustment: every {} min\n\
         • Mode: {}",
        safe.grid.symbol,
        safe.grid.budget,
        safe.grid.leverage,
        safe.grid.grid_size,
        safe.grid.stop_loss_pct * 100.0,
        safe.grid.take_profit_pct * 100.0,
        safe.grid.adjust_interval_minutes,
        mode
    )
}

pub fn grid_configured(grid: &GridConfig, atr: f64, price: f64) -> String {
    format!(
        "⚙️ <b>GRID CONFIGURED</b>\n\n\
         📊 ATR: {:.4}\n\
         • Current price: {:.2}\n\n\
         📏 <b>Bounds:</b>\n\
         • Lower: {:.2}\n\
         • Upper: {:.2}\n\
         • Spread: {:.4}\n\
         • Increment: {:.6}",
        atr, price, grid.lower_bound, grid.upper_bound, grid.spread, grid.increment
    )
}

pub fn orders_created(buys: usize, sells: usize) -> String {
    format!(
        "📋 <b>INITIAL ORDERS CREATED</b>\n\n\
         • Total: {}\n\
         • Buys: {}\n\
         • Sells: {}",
        buys + sells,
        buys,
        sells
    )
}

pub fn order_filled(filled: &Order, mirror: Option<&Order>, profit: f64) -> String {
    let mirror_line = match mirror {
        Some(m) => format!("🪞 <b>Mirror:</b> {} {:.6} @ {:.2}", m.side.as_str().to_uppercase(), m.size, m.price),
        None => "🪞 <b>Mirror:</b> none (outside grid bounds or trading halted)".to_string(),
    };
    format!(
        "✅ <b>ORDER FILLED</b>\n\n\
         📋 <b>Filled:</b> {} {:.6} @ {:.2}\n\
         {}\n\n\
         💰 <b>Estimated profit:</b> +{:.4} USDT",
        filled.side.as_str().to_uppercase(),
        filled.size,
        filled.price,
        mirror_line,
        profit
    )
}

pub fn grid_adjusted(old: GridBounds, new: GridBounds) -> String {
    format!(
        "🔄 <b>GRID ADJUSTED</b>\n\n\
         📊 <b>Old bounds:</b> {:.2} - {:.2}\n\
         📊 <b>New bounds:</b> {:.2} - {:.2}\n\n\
         🎯 Adjusted on ATR volatility",
        old.lower, old.upper, new.lower, new.upper
    )
}

pub fn degraded_mode(price: f64, bounds: GridBounds) -> String {
    format!(
        "⚠️ <b>DEGRADED MODE</b>\n\n\
         No volatility data available at {:.2}.\n\
         Using fixed band {:.2} - {:.2}",
        price, bounds.lower, bounds.upper
    )
}

pub fn risk_alert(status: RiskStatus, state: &RiskState, limits: RiskLimits) -> String {
    let mut message = String::from(if status.should_stop_trading {
        "🛑 <b>TRADING HALTED</b>\n\n"
    } else {
        "⚠️ <b>RISK ALERT</b>\n\n"
    });
    if status.daily_limit_exceeded {
        message.push_str("📉 Daily PnL limit exceeded\n");
    }
    if status.drawdown_limit_exceeded {
        message.push_str("📊 Maximum drawdown exceeded\n");
    }
    message.push_str(&format!(
        "\n• Daily PnL: {:.4} USDT (limit {:.1}%)\n• Peak balance: {:.2} USDT (max drawdown {:.1}%)",
        state.daily_pnl,
        limits.max_daily_loss * 100.0,
        state.peak_balance,
        limits.max_drawdown * 100.0
    ));
    message
}

pub fn risk_cleared() -> String {
    "🟢 <b>TRADING RESUMED</b>\n\nRisk limits back within range after the daily reset".to_string()
}

pub fn setup_error(err: &TradingError) -> String {
    format!("❌ <b>Grid setup failed</b>\n\n{}", err.user_message())
}

pub fn pnl_report(ledger: &PnlLedger, last: usize) -> String {
    let mut message = format!(
        "💰 <b>PnL REPORT</b>\n\n\
         📊 Total PnL: {:.4} USDT\n\
         📈 Trades: {}",
        ledger.total_pnl,
        ledger.trade_count()
    );
    let recent = ledger.recent(last);
    if !recent.is_empty() {
        message.push_str(&format!("\n\n🕐 <b>Last {} trades:</b>", recent.len()));
        for entry in recent {
            message.push_str(&format!(
                "\n• {}: {:+.4} USDT",
                entry.timestamp.format("%Y-%m-%d %H:%M"),
                entry.profit
            ));
        }
    }
    message
}

pub fn performance_report(stats: &PerformanceStats, runtime_hours: f64) -> String {
    let streak = match stats.current_streak_type {
        Some(kind) => format!("{} {:?}", stats.current_streak, kind).to_lowercase(),
        None => "N/A".to_string(),
    };
    let profit_factor = if stats.profit_factor().is_infinite() {
        "∞".to_string()
    } else {
        format!("{:.2}", stats.profit_factor())
    };
    format!(
        "📊 <b>PERFORMANCE REPORT</b>\n\n\
         ⏱️ Runtime: {:.1}h\n\
         📈 Trades: {} (🟢{} | 🔴{} | ⚪{})\n\
         🎯 Win rate: {:.1}%\n\n\
         💰 Net PnL: {:.4} USDT\n\
         💹 Profits: +{:.4} USDT\n\
         📉 Losses: -{:.4} USDT\n\n\
         • Average win: +{:.4} USDT\n\
         • Average loss: -{:.4} USDT\n\
         • Profit factor: {}\n\n\
         🔥 Max consecutive wins: {}\n\
         🔥 Max consecutive losses: {}\n\
         🔥 Current streak: {}",
        runtime_hours,
        stats.trades_count,
        stats.win_count,
        stats.loss_count,
        stats.breakeven_count,
        stats.win_rate(),
        stats.net_pnl(),
        stats.total_profit,
        stats.total_loss,
        stats.average_win(),
        stats.average_loss(),
        profit_factor,
        stats.max_consecutive_wins,
        stats.max_consecutive_losses,
        streak
    )
}

pub fn status(
    state: &str,
    grid: Option<&GridConfig>,
    active_orders: usize,
    total_pnl: f64,
    balance: Option<f64>,
) -> String {
    let mut message = format!("🤖 <b>STATUS</b>: {}\n", state);
    match grid {
        Some(g) => message.push_str(&format!(
            "\n📏 Grid {}: {:.2} - {:.2} (spread {:.4})\n",
            g.symbol, g.lower_bound, g.upper_bound, g.spread
        )),
        None => message.push_str("\n📏 No grid configured\n"),
    }
    message.push_str(&format!("📋 Active orders: {}\n💰 Total PnL: {:.4} USDT", active_orders, total_pnl));
    if let Some(balance) = balance {
        message.push_str(&format!("\n🏦 Account equity: {:.2} USDT", balance));
    }
    message
}

/// Drop the HTML markup for console output
pub fn plain_text(html: &str) -> String {
    html.replace("<b>", "").replace("</b>", "")
}
