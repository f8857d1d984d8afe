use flexi_logger::{Logger, LoggerHandle};

use crate::config::LoggingConfig;
use crate::error::SchemePrepError;

/// Starts the global logger at the configured level.
///
/// The returned handle must be kept alive for the life of the process;
/// dropping it flushes and shuts the logger down.
pub fn init(config: &LoggingConfig) -> Result<LoggerHandle, SchemePrepError> {
    let handle = Logger::try_with_str(&config.level)
        .map_err(|e| SchemePrepError::Error(format!("invalid log specification: {}", e)))?
        .start()
        .map_err(|e| SchemePrepError::Error(format!("failed to start logger: {}", e)))?;
    Ok(handle)
}
