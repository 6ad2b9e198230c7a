// Adaptive Grid Bot - CLI
// Single entry point for configuring, running and inspecting the grid

use adaptive_grid_bot::logging::init_logging;
use adaptive_grid_bot::{Config, LoggingConfig, TradingError};
use clap::{Parser, Subcommand};
use std::time::Duration;
use tracing::{error, info};

// Load command modules from cli directory
#[path = "../cli/run_commands.rs"]
mod run_commands;
#[path = "../cli/report_commands.rs"]
mod report_commands;

#[derive(Parser)]
#[command(name = "grid-bot")]
#[command(version)]
#[command(about = "Adaptive ATR grid trading bot for KuCoin Futures", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true, default_value = "config.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Load and validate the configuration, print it with secrets masked
    Validate,

    /// Run the grid engine
    Run {
        /// Paper trade on a synthetic random-walk market (no network)
        #[arg(long)]
        offline: bool,

        /// Starting price of the offline market
        #[arg(long, default_value = "100.0")]
        start_price: f64,

        /// Stop after this many minutes
        #[arg(long, conflicts_with = "hours")]
        minutes: Option<f64>,

        /// Stop after this many hours
        #[arg(long)]
        hours: Option<f64>,
    },

    /// Show realized PnL and performance statistics
    Pnl {
        /// Number of recent trades to list
        #[arg(short, long, default_value = "10")]
        last: usize,
    },

    /// Show the persisted grid, active orders and account balance
    Status,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Init runs before a config exists, everything else needs a valid one
    let config = match cli.command {
        Commands::Init { .. } => None,
        _ => Some(Config::load(&cli.config)),
    };

    let logging = match &config {
        Some(Ok(c)) => c.logging.clone(),
        _ => LoggingConfig { log_to_file: false, ..LoggingConfig::default() },
    };
    let _log_guard = init_logging(&logging, cli.verbose)?;

    info!("🚀 Adaptive Grid Bot v{}", env!("CARGO_PKG_VERSION"));
    info!("📁 Config: {}", cli.config);

    let config = match config {
        None => None,
        Some(Ok(config)) => Some(config),
        Some(Err(e)) => exit_with_config_error(e),
    };

    let result = match (cli.command, config) {
        (Commands::Init { force }, _) => report_commands::init_config(&cli.config, force),
        (Commands::Validate, Some(config)) => report_commands::validate_config(&config),
        (Commands::Run { offline, start_price, minutes, hours }, Some(config)) => {
            match session_length(minutes, hours) {
                Ok(duration) => run_commands::run_bot(config, offline, start_price, duration).await,
                Err(e) => Err(e),
            }
        }
        (Commands::Pnl { last }, Some(config)) => report_commands::show_pnl(&config, last),
        (Commands::Status, Some(config)) => report_commands::show_status(&config).await,
        (_, None) => Err(TradingError::Internal("configuration not loaded".to_string())),
    };

    if let Err(e) = result {
        error!("❌ {}", e.user_message());
        std::process::exit(1);
    }
    Ok(())
}

fn session_length(minutes: Option<f64>, hours: Option<f64>) -> Result<Option<Duration>, TradingError> {
    match minutes.map(|m| m * 60.0).or(hours.map(|h| h * 3600.0)) {
        Some(secs) if !(secs.is_finite() && secs > 0.0) => Err(TradingError::InvalidParameter(
            "duration".to_string(),
            "must be a positive number".to_string(),
        )),
        secs => Ok(secs.map(Duration::from_secs_f64)),
    }
}

/// Print a configuration error with a hint and exit
fn exit_with_config_error(e: TradingError) -> ! {
    error!("❌ Configuration Error");
    for line in e.user_message().lines() {
        error!("{}", line);
    }
    if matches!(e, TradingError::ConfigParse(_)) {
        error!("💡 Regenerate a clean file with: grid-bot init --force");
    }
    std::process::exit(1);
}
