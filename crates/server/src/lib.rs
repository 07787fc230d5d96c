//! MCP stdio server exposing the Gaffer test-analytics read API as tools.
//!
//! All retry, timeout and credential logic lives in `gaffer-api`; this crate only adapts
//! validated tool arguments into typed operation calls and serializes the results.

pub mod catalog;
pub mod config;
pub mod error;
pub mod handler;
pub mod logging;
pub mod validation;

use crate::catalog::ToolCatalog;
use crate::config::ServerConfig;
use crate::error::{Result, ServerError};
use crate::handler::GafferMcpServer;
use gaffer_api::GafferClient;
use rmcp::ServiceExt as _;
use std::sync::Arc;
use tracing::info;

/// Serve MCP over stdin/stdout until the client disconnects.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or the MCP session fails.
pub async fn serve_stdio(config: ServerConfig) -> Result<()> {
    let client = GafferClient::new(config.transport_config())?;
    let catalog = Arc::new(ToolCatalog::build()?);
    info!(
        api_url = %client.transport().base_url(),
        credential_kind = %client.credential_kind(),
        tools = catalog.len(),
        "starting gaffer-mcp on stdio"
    );

    let server = GafferMcpServer::new(client, catalog);
    let running = server
        .serve(rmcp::transport::stdio())
        .await
        .map_err(|e| ServerError::Transport(e.to_string()))?;
    let reason = running
        .waiting()
        .await
        .map_err(|e| ServerError::Transport(e.to_string()))?;
    info!(reason = ?reason, "MCP session ended");
    Ok(())
}
