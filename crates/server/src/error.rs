//! Error types for the MCP server.

use gaffer_api::GafferError;
use thiserror::Error;

/// Main error type for the server.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Configuration errors (missing credential, bad log filter)
    #[error("Configuration error: {0}")]
    Config(String),

    /// A tool's declared input schema does not compile
    #[error("Invalid input schema for tool '{tool}': {message}")]
    Schema { tool: String, message: String },

    /// Arguments passed schema validation but do not decode into the operation input
    #[error("Invalid arguments: {0}")]
    Arguments(String),

    /// Errors raised by an operation; the message is passed through unchanged
    #[error(transparent)]
    Api(#[from] GafferError),

    /// The MCP session over stdio failed to start or ended abnormally
    #[error("MCP transport error: {0}")]
    Transport(String),
}

/// Result type alias for server operations.
pub type Result<T> = std::result::Result<T, ServerError>;

/// `err` followed by each of its sources, joined with `": "`.
#[must_use]
pub fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(s) = source {
        out.push_str(": ");
        out.push_str(&s.to_string());
        source = s.source();
    }
    out
}
