//! MCP server handler: `initialize`, `tools/list`, `tools/call`.

use crate::catalog::ToolCatalog;
use crate::error::error_chain;
use crate::validation::validate_tool_arguments;
use gaffer_api::GafferClient;
use rmcp::model::{
    CallToolRequestParam, CallToolResult, Content, ErrorData, Implementation, JsonObject,
    ListToolsResult, PaginatedRequestParam, ServerCapabilities, ServerInfo,
};
use rmcp::service::RequestContext;
use rmcp::{RoleServer, ServerHandler};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

const INSTRUCTIONS: &str = "\
Read-only access to Gaffer test analytics: test health, flaky tests, run history and \
details, coverage and uploaded reports. With a user API key (gaf_...) call list_projects \
first and pass projectId to the per-project tools. With a project upload token, projectId \
may be omitted and the token's project is used.";

#[derive(Clone)]
pub struct GafferMcpServer {
    client: GafferClient,
    catalog: Arc<ToolCatalog>,
}

impl GafferMcpServer {
    #[must_use]
    pub fn new(client: GafferClient, catalog: Arc<ToolCatalog>) -> Self {
        Self { client, catalog }
    }

    /// Dispatch one tool call.
    ///
    /// Unknown tools and arguments that violate the input schema are protocol errors
    /// (`invalid_params`). Failures inside the operation are reported as an `isError` result
    /// carrying the error message.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorData`] for an unknown tool name or invalid arguments.
    pub async fn call(
        &self,
        name: &str,
        arguments: Option<JsonObject>,
    ) -> Result<CallToolResult, ErrorData> {
        let Some(entry) = self.catalog.get(name) else {
            return Err(ErrorData::invalid_params(
                format!("unknown tool: {name}"),
                None,
            ));
        };

        let args = Value::Object(arguments.unwrap_or_default());
        let checked = validate_tool_arguments(entry.input_schema(), entry.validator(), &args);
        if let Err(invalid) = checked {
            debug!(tool = %name, error = %invalid.message, "rejected tool arguments");
            return Err(ErrorData::invalid_params(invalid.message, Some(invalid.data)));
        }

        let started = Instant::now();
        match entry.call(self.client.clone(), args).await {
            Ok(output) => {
                debug!(
                    tool = %name,
                    elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
                    "tool call succeeded"
                );
                Ok(success_result(output))
            }
            Err(e) => {
                error!(tool = %name, error = %error_chain(&e), "tool call failed");
                Ok(CallToolResult::error(vec![Content::text(e.to_string())]))
            }
        }
    }
}

/// `structured_content` plus the same JSON as text, for clients that only render `content`.
fn success_result(output: Value) -> CallToolResult {
    let text = serde_json::to_string_pretty(&output).unwrap_or_else(|_| output.to_string());
    CallToolResult {
        content: vec![Content::text(text)],
        structured_content: Some(output),
        is_error: Some(false),
        meta: None,
    }
}

impl ServerHandler for GafferMcpServer {
    fn get_info(&self) -> ServerInfo {
        let mut server_info = Implementation::default();
        server_info.name = env!("CARGO_PKG_NAME").to_string();
        server_info.version = env!("CARGO_PKG_VERSION").to_string();

        let mut info = ServerInfo::default();
        info.capabilities = ServerCapabilities::builder().enable_tools().build();
        info.server_info = server_info;
        info.instructions = Some(INSTRUCTIONS.to_string());
        info
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, ErrorData> {
        Ok(ListToolsResult::with_all_items(self.catalog.tools()))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, ErrorData> {
        info!(tool = %request.name, "tools/call");
        self.call(&request.name, request.arguments).await
    }
}
