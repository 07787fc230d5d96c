//! Tool catalog: one MCP tool per read operation.
//!
//! Each entry carries the advertised [`Tool`], its compiled input-schema validator, and a
//! boxed invoker that decodes arguments into the operation's typed input and hands back the
//! upstream body. Output schemas are generated from each operation's output type.

use crate::error::{Result, ServerError};
use futures::FutureExt as _;
use futures::future::BoxFuture;
use gaffer_api::operations::{
    CompareTestMetrics, FindUncoveredFailureAreas, GetCoverageForFile, GetCoverageSummary,
    GetFailureClusters, GetFlakyTests, GetProjectHealth, GetReport, GetReportBrowserUrl,
    GetSlowestTests, GetTestHistory, GetTestRunDetails, GetUntestedFiles, GetUploadStatus,
    ListProjects, ListTestRuns,
};
use gaffer_api::operations::output_schema;
use gaffer_api::{CredentialRequirement, GafferClient, Operation};
use jsonschema::Validator;
use rmcp::model::{JsonObject, Tool, ToolAnnotations};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;

type Invoke = Box<dyn Fn(GafferClient, Value) -> BoxFuture<'static, Result<Value>> + Send + Sync>;

pub struct ToolEntry {
    tool: Tool,
    requires: CredentialRequirement,
    validator: Validator,
    invoke: Invoke,
}

impl ToolEntry {
    fn new<Op: Operation>(title: &str, description: &str, input_schema: Value) -> Result<Self> {
        let schema_error = |message: String| ServerError::Schema {
            tool: Op::NAME.to_string(),
            message,
        };
        let validator = jsonschema::validator_for(&input_schema)
            .map_err(|e| schema_error(e.to_string()))?;
        let Value::Object(schema_obj) = input_schema else {
            return Err(schema_error("input schema must be an object".to_string()));
        };

        let mut tool = Tool::new(Op::NAME, description.to_string(), Arc::new(schema_obj));
        tool.output_schema = Some(Arc::new(output_schema::<Op>()));
        tool.annotations = Some(read_only_annotations(title));

        Ok(Self {
            tool,
            requires: Op::REQUIRES,
            validator,
            invoke: Box::new(|client: GafferClient, args: Value| {
                invoke::<Op>(client, args).boxed()
            }),
        })
    }

    #[must_use]
    pub fn tool(&self) -> &Tool {
        &self.tool
    }

    #[must_use]
    pub fn requires(&self) -> CredentialRequirement {
        self.requires
    }

    #[must_use]
    pub fn input_schema(&self) -> &JsonObject {
        &self.tool.input_schema
    }

    #[must_use]
    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    /// Run the operation with already-validated arguments.
    pub fn call(&self, client: GafferClient, args: Value) -> BoxFuture<'static, Result<Value>> {
        (self.invoke)(client, args)
    }
}

async fn invoke<Op: Operation>(client: GafferClient, args: Value) -> Result<Value> {
    let input: Op::Input =
        serde_json::from_value(args).map_err(|e| ServerError::Arguments(e.to_string()))?;
    let output = client.invoke::<Op>(input).await?;
    Ok(output.into_body())
}

/// Every tool here is a `GET` against an external service.
fn read_only_annotations(title: &str) -> ToolAnnotations {
    ToolAnnotations {
        title: Some(title.to_string()),
        read_only_hint: Some(true),
        destructive_hint: Some(false),
        idempotent_hint: Some(true),
        open_world_hint: Some(true),
    }
}

pub struct ToolCatalog {
    entries: Vec<ToolEntry>,
    index: HashMap<String, usize>,
}

impl ToolCatalog {
    /// Build the full catalog.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Schema`] if an input schema fails to compile, or
    /// [`ServerError::Config`] on a duplicate tool name.
    pub fn build() -> Result<Self> {
        let entries = vec![
            ToolEntry::new::<ListProjects>(
                "List Projects",
                "List the projects the configured user API key can access, with their \
                 organization. Use this first to find a projectId for the per-project tools. \
                 Requires a user API key (gaf_...).",
                object(
                    json!({
                        "organizationId": string("Only list projects of this organization."),
                        "limit": limit(50, 100),
                    }),
                    &[],
                ),
            )?,
            ToolEntry::new::<GetProjectHealth>(
                "Get Project Health",
                "Health overview of a project over the last N days: health score (0-100), \
                 pass rate, number of test runs, number of flaky tests and the trend compared \
                 to the previous period.",
                object(
                    json!({
                        "projectId": project_id(),
                        "days": days(30),
                    }),
                    &[],
                ),
            )?,
            ToolEntry::new::<GetTestHistory>(
                "Get Test History",
                "Pass/fail history of a specific test across recent runs, newest first. Look \
                 the test up by name, by file path, or both; at least one is required. Each \
                 entry carries the run id, branch, commit, status and duration.",
                object(
                    json!({
                        "projectId": project_id(),
                        "testName": string("Exact test name or a substring of it."),
                        "filePath": string("Test file path or a substring of it."),
                        "limit": limit(20, 100),
                    }),
                    &[],
                ),
            )?,
            ToolEntry::new::<GetFlakyTests>(
                "Get Flaky Tests",
                "Tests whose outcome flips between passing and failing without code changes, \
                 ranked by flakiness score. threshold is the minimum flip rate (0-1) for a \
                 test to count as flaky.",
                object(
                    json!({
                        "projectId": project_id(),
                        "threshold": {
                            "type": "number",
                            "minimum": 0,
                            "maximum": 1,
                            "description": "Minimum flip rate to count as flaky."
                        },
                        "limit": limit(20, 100),
                        "days": days(30),
                    }),
                    &[],
                ),
            )?,
            ToolEntry::new::<ListTestRuns>(
                "List Test Runs",
                "Recent test runs with pass/fail/skip counts. Filter by commit SHA, branch, \
                 or outcome to answer questions like \"did the tests pass on this commit?\".",
                object(
                    json!({
                        "projectId": project_id(),
                        "commitSha": string("Full or abbreviated commit SHA."),
                        "branch": string("Branch name."),
                        "status": {
                            "type": "string",
                            "enum": ["passed", "failed"],
                            "description": "Only runs with this outcome."
                        },
                        "limit": limit(20, 100),
                    }),
                    &[],
                ),
            )?,
            ToolEntry::new::<GetTestRunDetails>(
                "Get Test Run Details",
                "Individual test results of one run: name, status, duration, file and error \
                 message. Paginate with limit and offset; filter by status to see only \
                 failures. Requires a user API key (gaf_...).",
                object(
                    json!({
                        "projectId": project_id(),
                        "testRunId": string("Test run id, as returned by list_test_runs."),
                        "status": {
                            "type": "string",
                            "enum": ["passed", "failed", "skipped"],
                            "description": "Only results with this status."
                        },
                        "limit": limit(100, 500),
                        "offset": {
                            "type": "integer",
                            "minimum": 0,
                            "default": 0,
                            "description": "Results to skip."
                        },
                    }),
                    &["testRunId"],
                ),
            )?,
            ToolEntry::new::<GetSlowestTests>(
                "Get Slowest Tests",
                "Tests ranked by p95 duration over the last N days, with average duration and \
                 run count. Narrow by framework or branch. Requires a user API key (gaf_...).",
                object(
                    json!({
                        "projectId": project_id(),
                        "days": days(30),
                        "limit": limit(20, 100),
                        "framework": string("Test framework, e.g. vitest, jest, playwright."),
                        "branch": string("Branch name."),
                    }),
                    &[],
                ),
            )?,
            ToolEntry::new::<CompareTestMetrics>(
                "Compare Test Metrics",
                "Compare one test's status and duration before and after a change. Provide \
                 both beforeCommit and afterCommit, or both beforeRunId and afterRunId. \
                 Requires a user API key (gaf_...).",
                object(
                    json!({
                        "projectId": project_id(),
                        "testName": string("Exact test name to compare."),
                        "beforeCommit": string("Commit SHA before the change."),
                        "afterCommit": string("Commit SHA after the change."),
                        "beforeRunId": string("Test run id before the change."),
                        "afterRunId": string("Test run id after the change."),
                    }),
                    &["testName"],
                ),
            )?,
            ToolEntry::new::<GetCoverageSummary>(
                "Get Coverage Summary",
                "Latest line, branch and function coverage of a project with the trend over \
                 the last N days and the least covered files. Requires a user API key \
                 (gaf_...).",
                object(
                    json!({
                        "projectId": project_id(),
                        "days": days(30),
                    }),
                    &[],
                ),
            )?,
            ToolEntry::new::<GetCoverageForFile>(
                "Get Coverage For File",
                "Line, branch and function coverage of the files whose path matches filePath \
                 (exact path or substring). Requires a user API key (gaf_...).",
                object(
                    json!({
                        "projectId": project_id(),
                        "filePath": string("File path or a substring of it."),
                    }),
                    &["filePath"],
                ),
            )?,
            ToolEntry::new::<GetUntestedFiles>(
                "Get Untested Files",
                "Files whose line coverage is at or below maxCoverage percent, lowest first. \
                 Requires a user API key (gaf_...).",
                object(
                    json!({
                        "projectId": project_id(),
                        "maxCoverage": percent(
                            10,
                            "Coverage percentage at or below which a file counts as untested.",
                        ),
                        "limit": limit(20, 100),
                    }),
                    &[],
                ),
            )?,
            ToolEntry::new::<FindUncoveredFailureAreas>(
                "Find Uncovered Failure Areas",
                "Files below coverageThreshold percent that also have failing tests in the \
                 last N days, ranked by a risk score. Requires a user API key (gaf_...).",
                object(
                    json!({
                        "projectId": project_id(),
                        "days": days(30),
                        "coverageThreshold": percent(
                            80,
                            "Files below this coverage percentage are considered.",
                        ),
                    }),
                    &[],
                ),
            )?,
            ToolEntry::new::<GetFailureClusters>(
                "Get Failure Clusters",
                "Failures of one test run grouped by similar error message, so a single root \
                 cause shows up as one cluster. Requires a user API key (gaf_...).",
                object(
                    json!({
                        "projectId": project_id(),
                        "testRunId": string("Test run id, as returned by list_test_runs."),
                    }),
                    &["testRunId"],
                ),
            )?,
            ToolEntry::new::<GetReport>(
                "Get Report",
                "Report files uploaded for a test run (HTML reports, JUnit XML, JSON results) \
                 with size, content type and download URL. Requires a user API key (gaf_...).",
                object(
                    json!({
                        "testRunId": string("Test run id, as returned by list_test_runs."),
                    }),
                    &["testRunId"],
                ),
            )?,
            ToolEntry::new::<GetReportBrowserUrl>(
                "Get Report Browser URL",
                "A signed, time-limited URL for viewing a test run's HTML report in a browser. \
                 filename selects the entry file (defaults to index.html). Requires a user API \
                 key (gaf_...).",
                object(
                    json!({
                        "projectId": project_id(),
                        "testRunId": string("Test run id, as returned by list_test_runs."),
                        "filename": string("Entry file within the report."),
                    }),
                    &["testRunId"],
                ),
            )?,
            ToolEntry::new::<GetUploadStatus>(
                "Get Upload Status",
                "Processing status of result uploads. With sessionId: that session plus the \
                 test runs and coverage reports it produced. Without it: recent sessions, \
                 filterable by commitSha or branch. Requires a user API key (gaf_...).",
                object(
                    json!({
                        "projectId": project_id(),
                        "sessionId": string("Upload session id."),
                        "commitSha": string("List mode: only sessions for this commit."),
                        "branch": string("List mode: only sessions for this branch."),
                    }),
                    &[],
                ),
            )?,
        ];

        let mut index = HashMap::new();
        for (i, entry) in entries.iter().enumerate() {
            let name = entry.tool.name.to_string();
            if index.insert(name.clone(), i).is_some() {
                return Err(ServerError::Config(format!("Duplicate tool name '{name}'")));
            }
        }

        Ok(Self { entries, index })
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ToolEntry> {
        self.index.get(name).map(|&i| &self.entries[i])
    }

    #[must_use]
    pub fn tools(&self) -> Vec<Tool> {
        self.entries.iter().map(|e| e.tool.clone()).collect()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| &*e.tool.name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn object(properties: Value, required: &[&str]) -> Value {
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
        "additionalProperties": false,
    })
}

fn string(description: &str) -> Value {
    json!({"type": "string", "description": description})
}

fn project_id() -> Value {
    string(
        "Project id. Required with a user API key; omit with a project upload token to use \
         its bound project.",
    )
}

fn limit(default: u32, maximum: u32) -> Value {
    json!({
        "type": "integer",
        "minimum": 1,
        "maximum": maximum,
        "default": default,
        "description": "Maximum number of items to return.",
    })
}

fn days(default: u32) -> Value {
    json!({
        "type": "integer",
        "minimum": 1,
        "maximum": 365,
        "default": default,
        "description": "Size of the analysis window in days.",
    })
}

fn percent(default: u32, description: &str) -> Value {
    json!({
        "type": "number",
        "minimum": 0,
        "maximum": 100,
        "default": default,
        "description": description,
    })
}
