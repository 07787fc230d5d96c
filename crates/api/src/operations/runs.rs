//! Test runs: listings, per-run detail, comparisons and failure clustering.

use super::{
    DEFAULT_LIMIT, Operation, Pagination, RunCounts, non_blank, project_path, required,
};
use crate::client::GafferClient;
use crate::credential::CredentialRequirement;
use crate::error::{GafferError, Result};
use crate::mirrored::Mirrored;
use crate::query::{QueryParams, path_segment};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Number;

pub const DEFAULT_DETAILS_LIMIT: u32 = 100;

/// `list_test_runs`: recent runs, filterable by commit, branch and outcome.
pub struct ListTestRuns;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListTestRunsInput {
    pub project_id: Option<String>,
    pub commit_sha: Option<String>,
    pub branch: Option<String>,
    /// `passed` or `failed`.
    pub status: Option<String>,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TestRunList {
    pub test_runs: Vec<TestRunSummary>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, PartialEq, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TestRunSummary {
    pub id: String,
    pub commit_sha: Option<String>,
    pub branch: Option<String>,
    pub passed_count: u64,
    pub failed_count: u64,
    pub skipped_count: u64,
    pub total_count: u64,
    pub created_at: String,
}

#[async_trait]
impl Operation for ListTestRuns {
    const NAME: &'static str = "list_test_runs";
    const REQUIRES: CredentialRequirement = CredentialRequirement::Any;

    type Input = ListTestRunsInput;
    type Output = TestRunList;

    async fn run(client: &GafferClient, input: Self::Input) -> Result<Mirrored<Self::Output>> {
        let project_id = client.project_id(input.project_id.as_deref()).await?;
        let query = QueryParams::new()
            .with_opt("commitSha", non_blank(input.commit_sha.as_deref()))
            .with_opt("branch", non_blank(input.branch.as_deref()))
            .with_opt("status", non_blank(input.status.as_deref()))
            .with("limit", input.limit.unwrap_or(DEFAULT_LIMIT));
        client
            .transport()
            .get_mirrored(&project_path(&project_id, "/test-runs"), &query)
            .await
    }
}

/// `get_test_run_details`: individual test results of one run, paginated.
pub struct GetTestRunDetails;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetTestRunDetailsInput {
    pub project_id: Option<String>,
    pub test_run_id: String,
    /// `passed`, `failed` or `skipped`.
    pub status: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TestRunDetails {
    pub test_run_id: String,
    pub commit_sha: Option<String>,
    pub branch: Option<String>,
    pub framework: Option<String>,
    pub created_at: String,
    pub summary: RunCounts,
    pub tests: Vec<TestResult>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, PartialEq, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    pub name: String,
    pub full_name: String,
    pub status: String,
    pub duration_ms: Option<u64>,
    pub file_path: Option<String>,
    pub error: Option<String>,
}

#[async_trait]
impl Operation for GetTestRunDetails {
    const NAME: &'static str = "get_test_run_details";
    const REQUIRES: CredentialRequirement = CredentialRequirement::Primary;

    type Input = GetTestRunDetailsInput;
    type Output = TestRunDetails;

    async fn run(client: &GafferClient, input: Self::Input) -> Result<Mirrored<Self::Output>> {
        let test_run_id = required(&input.test_run_id, "testRunId")?;
        let project_id = client.project_id(input.project_id.as_deref()).await?;
        let path = project_path(
            &project_id,
            &format!("/test-runs/{}/details", path_segment(test_run_id)),
        );
        let query = QueryParams::new()
            .with_opt("status", non_blank(input.status.as_deref()))
            .with("limit", input.limit.unwrap_or(DEFAULT_DETAILS_LIMIT))
            .with("offset", input.offset.unwrap_or(0));
        client.transport().get_mirrored(&path, &query).await
    }
}

/// `compare_test_metrics`: one test's status and duration before and after a change.
pub struct CompareTestMetrics;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareTestMetricsInput {
    pub project_id: Option<String>,
    pub test_name: String,
    pub before_commit: Option<String>,
    pub after_commit: Option<String>,
    pub before_run_id: Option<String>,
    pub after_run_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TestMetricsComparison {
    pub test_name: String,
    pub before: MetricsSnapshot,
    pub after: MetricsSnapshot,
    pub change: MetricsChange,
}

#[derive(Debug, Clone, PartialEq, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub test_run_id: String,
    pub commit_sha: Option<String>,
    pub branch: Option<String>,
    pub status: String,
    pub duration_ms: Option<Number>,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MetricsChange {
    pub duration_ms: Option<Number>,
    pub percent_change: Option<Number>,
    pub status_changed: bool,
}

/// A complete comparison axis: both sides of a commit pair or of a run pair.
fn comparison_axes<'a>(
    input: &'a CompareTestMetricsInput,
) -> Result<[(&'static str, Option<&'a str>); 4]> {
    let before_commit = non_blank(input.before_commit.as_deref());
    let after_commit = non_blank(input.after_commit.as_deref());
    let before_run = non_blank(input.before_run_id.as_deref());
    let after_run = non_blank(input.after_run_id.as_deref());

    let commits = before_commit.is_some() && after_commit.is_some();
    let runs = before_run.is_some() && after_run.is_some();
    if !commits && !runs {
        return Err(GafferError::config(
            "Provide both beforeCommit and afterCommit, or both beforeRunId and afterRunId",
        ));
    }
    Ok([
        ("beforeCommit", before_commit),
        ("afterCommit", after_commit),
        ("beforeRunId", before_run),
        ("afterRunId", after_run),
    ])
}

#[async_trait]
impl Operation for CompareTestMetrics {
    const NAME: &'static str = "compare_test_metrics";
    const REQUIRES: CredentialRequirement = CredentialRequirement::Primary;

    type Input = CompareTestMetricsInput;
    type Output = TestMetricsComparison;

    async fn run(client: &GafferClient, input: Self::Input) -> Result<Mirrored<Self::Output>> {
        let test_name = required(&input.test_name, "testName")?;
        let axes = comparison_axes(&input)?;

        let project_id = client.project_id(input.project_id.as_deref()).await?;
        let query = axes
            .into_iter()
            .fold(QueryParams::new().with("testName", test_name), |q, (k, v)| {
                q.with_opt(k, v)
            });
        client
            .transport()
            .get_mirrored(&project_path(&project_id, "/test-metrics/compare"), &query)
            .await
    }
}

/// `get_failure_clusters`: failures of one run grouped by error similarity.
pub struct GetFailureClusters;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetFailureClustersInput {
    pub project_id: Option<String>,
    pub test_run_id: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FailureClusters {
    pub clusters: Vec<FailureCluster>,
    pub total_failures: u64,
    pub unclustered_failures: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FailureCluster {
    pub representative_error: String,
    pub count: u64,
    pub similarity: Number,
    pub tests: Vec<ClusteredTest>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClusteredTest {
    pub name: String,
    pub full_name: String,
    pub error_message: String,
    pub file_path: Option<String>,
}

#[async_trait]
impl Operation for GetFailureClusters {
    const NAME: &'static str = "get_failure_clusters";
    const REQUIRES: CredentialRequirement = CredentialRequirement::Primary;

    type Input = GetFailureClustersInput;
    type Output = FailureClusters;

    async fn run(client: &GafferClient, input: Self::Input) -> Result<Mirrored<Self::Output>> {
        let test_run_id = required(&input.test_run_id, "testRunId")?;
        let project_id = client.project_id(input.project_id.as_deref()).await?;
        let path = project_path(
            &project_id,
            &format!("/test-runs/{}/failure-clusters", path_segment(test_run_id)),
        );
        client.transport().get_mirrored(&path, &QueryParams::new()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compare(
        before_commit: Option<&str>,
        after_commit: Option<&str>,
        before_run_id: Option<&str>,
        after_run_id: Option<&str>,
    ) -> CompareTestMetricsInput {
        CompareTestMetricsInput {
            project_id: None,
            test_name: "x".to_string(),
            before_commit: before_commit.map(str::to_string),
            after_commit: after_commit.map(str::to_string),
            before_run_id: before_run_id.map(str::to_string),
            after_run_id: after_run_id.map(str::to_string),
        }
    }

    #[test]
    fn comparison_requires_a_complete_pair() {
        assert!(comparison_axes(&compare(None, None, None, None)).is_err());
        assert!(comparison_axes(&compare(Some("a"), None, None, None)).is_err());
        assert!(comparison_axes(&compare(None, None, None, Some("r2"))).is_err());
        assert!(comparison_axes(&compare(Some("a"), None, Some("r1"), None)).is_err());
        assert!(comparison_axes(&compare(Some("  "), Some("b"), None, None)).is_err());

        comparison_axes(&compare(Some("a"), Some("b"), None, None)).expect("commit pair");
        comparison_axes(&compare(None, None, Some("r1"), Some("r2"))).expect("run pair");
    }

    #[test]
    fn both_pairs_are_forwarded_together() {
        let input = compare(Some("a"), Some("b"), Some("r1"), Some("r2"));
        let axes = comparison_axes(&input).expect("both pairs accepted");
        assert!(axes.iter().all(|(_, v)| v.is_some()));
    }

    #[test]
    fn comparison_error_names_both_axes() {
        let err = comparison_axes(&compare(None, None, None, None)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Provide both beforeCommit and afterCommit, or both beforeRunId and afterRunId"
        );
    }
}
