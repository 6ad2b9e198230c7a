// Tracing setup: stdout plus an optional daily rolling log file

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

use crate::config::LoggingConfig;
use crate::error::{TradingError, TradingResult};

/// Level precedence: `RUST_LOG`, then `--verbose`, then the config file
pub fn filter_directive(config: &LoggingConfig, verbose: bool) -> String {
    match std::env::var("RUST_LOG") {
        Ok(directive) if !directive.trim().is_empty() => directive,
        _ if verbose => "debug".to_string(),
        _ => config.level.clone(),
    }
}

/// Install the global subscriber. Keep the returned guard alive for the
/// whole process or buffered file lines are lost.
pub fn init_logging(config: &LoggingConfig, verbose: bool) -> TradingResult<Option<WorkerGuard>> {
    let directive = filter_directive(config, verbose);
    let stdout_filter = EnvFilter::try_new(&directive)
        .map_err(|e| TradingError::InvalidParameter("logging.level".to_string(), e.to_string()))?;
    let stdout = fmt::layer().with_target(false).with_filter(stdout_filter);

    if !config.log_to_file {
        tracing_subscriber::registry()
            .with(stdout)
            .try_init()
            .map_err(|e| TradingError::Internal(format!("logging already initialised: {}", e)))?;
        return Ok(None);
    }

    std::fs::create_dir_all(&config.log_directory)
        .map_err(|e| TradingError::DirectoryCreate(format!("{}: {}", config.log_directory, e)))?;
    let appender = RollingFileAppender::new(Rotation::DAILY, &config.log_directory, "bot.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let file_filter = EnvFilter::try_new(&directive)
        .map_err(|e| TradingError::InvalidParameter("logging.level".to_string(), e.to_string()))?;

    tracing_subscriber::registry()
        .with(stdout)
        .with(fmt::layer().with_ansi(false).with_writer(writer).with_filter(file_filter))
        .try_init()
        .map_err(|e| TradingError::Internal(format!("logging already initialised: {}", e)))?;

    Ok(Some(guard))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_filter_precedence() {
        let config = LoggingConfig { level: "warn".to_string(), ..LoggingConfig::default() };

        std::env::remove_var("RUST_LOG");
        assert_eq!(filter_directive(&config, false), "warn");
        assert_eq!(filter_directive(&config, true), "debug");

        std::env::set_var("RUST_LOG", "adaptive_grid_bot=trace");
        assert_eq!(filter_directive(&config, true), "adaptive_grid_bot=trace");
        std::env::remove_var("RUST_LOG");
    }
}
