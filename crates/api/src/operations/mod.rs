//! Typed read operations.
//!
//! Each operation is a unit struct implementing [`Operation`]: it declares its tool name, the
//! credential kind it needs, and its input/output contracts. [`GafferClient::invoke`] applies
//! the credential check centrally; `run` only validates inputs, resolves the project id, and
//! builds the request.
//!
//! Output types describe the upstream JSON field for field and double as the advertised output
//! schema. Operations return them wrapped in [`Mirrored`]: the body is checked against the type
//! and then passed on as sent, so omitted, `null` and present fields keep their distinction and
//! fields the type does not name survive. Nullable fields are `Option<T>`; fields upstream may
//! omit also carry `#[serde(default)]`.

use crate::client::GafferClient;
use crate::credential::CredentialRequirement;
use crate::error::{GafferError, Result};
use crate::mirrored::Mirrored;
use crate::query::path_segment;
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};

pub mod coverage;
pub mod projects;
pub mod reports;
pub mod runs;
pub mod history;
pub mod uploads;

pub use coverage::{
    FindUncoveredFailureAreas, GetCoverageForFile, GetCoverageSummary, GetUntestedFiles,
};
pub use projects::{GetProjectHealth, ListProjects};
pub use reports::{GetReport, GetReportBrowserUrl};
pub use runs::{CompareTestMetrics, GetFailureClusters, GetTestRunDetails, ListTestRuns};
pub use history::{GetFlakyTests, GetSlowestTests, GetTestHistory};
pub use uploads::GetUploadStatus;

#[async_trait]
pub trait Operation: Send + Sync + 'static {
    /// Stable tool name exposed at the process boundary.
    const NAME: &'static str;
    /// Credential kind this operation may run with.
    const REQUIRES: CredentialRequirement;

    type Input: DeserializeOwned + Send + 'static;
    type Output: DeserializeOwned + JsonSchema + Send + 'static;

    async fn run(client: &GafferClient, input: Self::Input) -> Result<Mirrored<Self::Output>>;
}

/// JSON Schema of `Op::Output` with an object root, as an MCP `outputSchema` requires.
///
/// Fields typed `Option<T>` are neither required nor non-null, and unknown fields are allowed,
/// so every body that passes the typed check also validates against this schema.
#[must_use]
pub fn output_schema<Op: Operation>() -> Map<String, Value> {
    let schema = schemars::schema_for!(Op::Output);
    let mut root = match serde_json::to_value(schema) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    };
    // Untagged enums come out as a bare `anyOf`.
    root.entry("type").or_insert_with(|| json!("object"));
    root
}

pub const DEFAULT_LIMIT: u32 = 20;
pub const DEFAULT_DAYS: u32 = 30;

/// Trim and drop blank strings: whitespace-only input counts as absent.
pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

/// `/projects/{id}{rest}` with the id percent-encoded.
pub(crate) fn project_path(project_id: &str, rest: &str) -> String {
    format!("/projects/{}{rest}", path_segment(project_id))
}

pub(crate) fn required<'a>(value: &'a str, field: &str) -> Result<&'a str> {
    non_blank(Some(value)).ok_or_else(|| GafferError::config(format!("{field} is required")))
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total: u64,
    pub limit: u64,
    pub offset: u64,
    pub has_more: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Period {
    pub days: u32,
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RunCounts {
    pub passed: u64,
    pub failed: u64,
    pub skipped: u64,
    pub total: u64,
}
