//! Tracing subscriber setup.
//!
//! stdout carries the MCP protocol, so every log line goes to stderr.

use crate::config::LogFormat;
use crate::error::{Result, ServerError};
use tracing_subscriber::EnvFilter;

/// Install the global subscriber.
///
/// # Errors
///
/// Returns [`ServerError::Config`] if `directive` is not a valid filter, or if a global
/// subscriber is already installed.
pub fn init(directive: &str, format: LogFormat) -> Result<()> {
    let filter = EnvFilter::try_new(directive)
        .map_err(|e| ServerError::Config(format!("Invalid log filter '{directive}': {e}")))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false);

    let installed = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|e| ServerError::Config(format!("Failed to install logger: {e}")))
}
