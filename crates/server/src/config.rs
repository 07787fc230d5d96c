//! Command-line and environment configuration.

use crate::error::{Result, ServerError};
use clap::{Parser, ValueEnum};
use gaffer_api::transport::DEFAULT_BASE_URL;
use gaffer_api::{Credential, TransportConfig};
use std::fmt;

const TOOLS_HELP: &str = "\
Tools (any credential):
  get_project_health            Health score, pass rate and trend
  get_test_history              Pass/fail history of one test
  get_flaky_tests               Tests whose outcome flips between runs
  list_test_runs                Recent runs, filterable by commit/branch/status

Tools (user API key, gaf_...):
  list_projects                 Projects the key can read
  get_test_run_details          Individual results of one run
  get_slowest_tests             Tests ranked by p95 duration
  compare_test_metrics          One test before and after a change
  get_coverage_summary          Latest coverage and trend
  get_coverage_for_file         Coverage of matching files
  get_untested_files            Files at or below a coverage percentage
  find_uncovered_failure_areas  Low-coverage files that fail often
  get_failure_clusters          Failures of a run grouped by error
  get_report                    Report files of a run
  get_report_browser_url        Signed link to view a report
  get_upload_status             Upload-session detail or list

Project upload tokens are bound to one project; projectId may be omitted.
User API keys must pass projectId to per-project tools.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Parser)]
#[command(
    name = "gaffer-mcp",
    version,
    about = "MCP server exposing Gaffer test analytics over stdio.",
    after_long_help = TOOLS_HELP
)]
pub struct Cli {
    /// Gaffer credential: a user API key (gaf_...) or a project upload token.
    #[arg(long, env = "GAFFER_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Base URL of the Gaffer API.
    #[arg(long, env = "GAFFER_API_URL", default_value = DEFAULT_BASE_URL)]
    pub api_url: String,

    /// Log filter directive (e.g. `info`, `gaffer_api=debug`). Logs go to stderr.
    #[arg(long, env = "GAFFER_LOG", default_value = "info")]
    pub log_level: String,

    #[arg(long, env = "GAFFER_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl fmt::Debug for Cli {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cli")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_url", &self.api_url)
            .field("log_level", &self.log_level)
            .field("log_format", &self.log_format)
            .finish()
    }
}

/// Validated settings the server runs with.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub api_url: String,
    pub credential: Credential,
}

impl Cli {
    /// # Errors
    ///
    /// Returns [`ServerError::Config`] if no credential is configured or it is blank.
    pub fn server_config(&self) -> Result<ServerConfig> {
        let api_key = self
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                ServerError::Config(
                    "GAFFER_API_KEY is required (pass --api-key or set the environment variable)"
                        .to_string(),
                )
            })?;
        Ok(ServerConfig {
            api_url: self.api_url.trim().to_string(),
            credential: Credential::new(api_key),
        })
    }
}

impl ServerConfig {
    #[must_use]
    pub fn transport_config(&self) -> TransportConfig {
        TransportConfig::new(self.api_url.clone(), self.credential.clone())
    }
}
