pub mod config;

pub use config::{
    Config, ConfigValidationError, GoogleConfig, HttpConfig, ServerConfig, SyncConfig,
    ValidationResult,
};

use anyhow::Result;

/// Initialize tracing for the process.
///
/// Honors `RUST_LOG`; defaults to `info`.
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))?;

    tracing::debug!("famcal core initialized");
    Ok(())
}
