//! Toolhost entry point.
//!
//! Loads configuration, initializes logging, publishes the first registry
//! snapshot and serves until Ctrl-C.

use anyhow::{Context, Result};
use tracing::{Level, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use toolhost::{Config, HandlerCatalog, ToolServer};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env();
    init_logging(&config.logging.level);
    for warning in &config.warnings {
        warn!("{}", warning);
    }

    info!("Starting {} v{}", config.server.name, config.server.version);
    if config.tools.repo_paths.is_empty() {
        warn!("No tool repositories configured; serving built-in tools only");
    } else {
        info!("Tool repositories: {:?}", config.tools.repo_paths);
    }

    let server = ToolServer::new(config, HandlerCatalog::with_builtins())
        .context("initial tool scan failed")?;

    server.run().await?;

    info!("Server shut down");
    Ok(())
}

/// Install the global subscriber.
///
/// `RUST_LOG` wins when set; otherwise the configured level applies to
/// every target. Output goes to stderr.
fn init_logging(level: &str) {
    let level = match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::default().add_directive(level.into()));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}
