use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;

/// Initializes structured logging based on configuration, supporting both
/// JSON (production) and pretty (development) formats with configurable
/// level and optional file output.
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let level = parse_log_level(&config.level)?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new(level.to_string()));

    let registry = tracing_subscriber::registry().with(env_filter);

    if config.format == "json" {
        let layer = fmt::layer().json().with_target(true).with_line_number(true).with_file(true);
        if let Some(path) = &config.file_path {
            let file = std::fs::OpenOptions::new().create(true).append(true).open(path)?;
            registry.with(layer.with_writer(std::sync::Arc::new(file))).init();
        } else {
            registry.with(layer).init();
        }
    } else {
        let layer = fmt::layer().pretty().with_target(true).with_file(false);
        if let Some(path) = &config.file_path {
            let file = std::fs::OpenOptions::new().create(true).append(true).open(path)?;
            registry.with(layer.with_writer(std::sync::Arc::new(file))).init();
        } else {
            registry.with(layer).init();
        }
    }

    Ok(())
}

fn parse_log_level(level: &str) -> anyhow::Result<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" | "warning" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        other => Err(anyhow::anyhow!("invalid log level: {other}")),
    }
}
