//! Per-test analytics: history, flakiness and duration.

use super::{DEFAULT_DAYS, DEFAULT_LIMIT, Operation, non_blank, project_path};
use crate::client::GafferClient;
use crate::credential::CredentialRequirement;
use crate::error::{GafferError, Result};
use crate::mirrored::Mirrored;
use crate::query::QueryParams;
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Number;

/// `get_test_history`: pass/fail history of one test, looked up by name or file.
pub struct GetTestHistory;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetTestHistoryInput {
    pub project_id: Option<String>,
    pub test_name: Option<String>,
    pub file_path: Option<String>,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TestHistory {
    pub history: Vec<TestHistoryEntry>,
    pub summary: TestHistorySummary,
}

#[derive(Debug, Clone, PartialEq, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TestHistoryEntry {
    pub test_run_id: String,
    pub created_at: String,
    pub branch: Option<String>,
    pub commit_sha: Option<String>,
    pub status: String,
    pub duration_ms: Option<u64>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TestHistorySummary {
    pub total_runs: u64,
    pub passed_runs: u64,
    pub failed_runs: u64,
    pub pass_rate: Option<Number>,
}

#[async_trait]
impl Operation for GetTestHistory {
    const NAME: &'static str = "get_test_history";
    const REQUIRES: CredentialRequirement = CredentialRequirement::Any;

    type Input = GetTestHistoryInput;
    type Output = TestHistory;

    async fn run(client: &GafferClient, input: Self::Input) -> Result<Mirrored<Self::Output>> {
        let test_name = non_blank(input.test_name.as_deref());
        let file_path = non_blank(input.file_path.as_deref());
        if test_name.is_none() && file_path.is_none() {
            return Err(GafferError::config(
                "At least one of testName or filePath is required",
            ));
        }

        let project_id = client.project_id(input.project_id.as_deref()).await?;
        let query = QueryParams::new()
            .with_opt("testName", test_name)
            .with_opt("filePath", file_path)
            .with("limit", input.limit.unwrap_or(DEFAULT_LIMIT));
        client
            .transport()
            .get_mirrored(&project_path(&project_id, "/test-history"), &query)
            .await
    }
}

/// `get_flaky_tests`: tests whose outcome flips between runs.
pub struct GetFlakyTests;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetFlakyTestsInput {
    pub project_id: Option<String>,
    /// Minimum flip rate (0 to 1). Upstream applies its own default when absent.
    pub threshold: Option<f64>,
    pub limit: Option<u32>,
    pub days: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FlakyTests {
    pub flaky_tests: Vec<FlakyTest>,
    pub summary: FlakySummary,
}

#[derive(Debug, Clone, PartialEq, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FlakyTest {
    pub name: String,
    pub flip_rate: Number,
    pub flip_count: u64,
    pub total_runs: u64,
    pub last_seen: String,
    pub flakiness_score: Number,
}

#[derive(Debug, Clone, PartialEq, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FlakySummary {
    pub threshold: Number,
    pub total_flaky: u64,
    pub period: u32,
}

#[async_trait]
impl Operation for GetFlakyTests {
    const NAME: &'static str = "get_flaky_tests";
    const REQUIRES: CredentialRequirement = CredentialRequirement::Any;

    type Input = GetFlakyTestsInput;
    type Output = FlakyTests;

    async fn run(client: &GafferClient, input: Self::Input) -> Result<Mirrored<Self::Output>> {
        let project_id = client.project_id(input.project_id.as_deref()).await?;
        let query = QueryParams::new()
            .with_opt("threshold", input.threshold)
            .with("limit", input.limit.unwrap_or(DEFAULT_LIMIT))
            .with("days", input.days.unwrap_or(DEFAULT_DAYS));
        client
            .transport()
            .get_mirrored(&project_path(&project_id, "/flaky-tests"), &query)
            .await
    }
}

/// `get_slowest_tests`: tests ranked by p95 duration.
pub struct GetSlowestTests;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetSlowestTestsInput {
    pub project_id: Option<String>,
    pub days: Option<u32>,
    pub limit: Option<u32>,
    pub framework: Option<String>,
    pub branch: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SlowestTests {
    pub slowest_tests: Vec<SlowTest>,
    pub summary: SlowestTestsSummary,
}

#[derive(Debug, Clone, PartialEq, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SlowTest {
    pub name: String,
    pub full_name: String,
    pub file_path: Option<String>,
    pub framework: Option<String>,
    pub avg_duration_ms: Number,
    pub p95_duration_ms: Number,
    pub run_count: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SlowestTestsSummary {
    pub project_id: String,
    pub project_name: String,
    pub period_days: u32,
    pub total_returned: u64,
}

#[async_trait]
impl Operation for GetSlowestTests {
    const NAME: &'static str = "get_slowest_tests";
    const REQUIRES: CredentialRequirement = CredentialRequirement::Primary;

    type Input = GetSlowestTestsInput;
    type Output = SlowestTests;

    async fn run(client: &GafferClient, input: Self::Input) -> Result<Mirrored<Self::Output>> {
        let project_id = client.project_id(input.project_id.as_deref()).await?;
        let query = QueryParams::new()
            .with("days", input.days.unwrap_or(DEFAULT_DAYS))
            .with("limit", input.limit.unwrap_or(DEFAULT_LIMIT))
            .with_opt("framework", non_blank(input.framework.as_deref()))
            .with_opt("branch", non_blank(input.branch.as_deref()));
        client
            .transport()
            .get_mirrored(&project_path(&project_id, "/slowest-tests"), &query)
            .await
    }
}
