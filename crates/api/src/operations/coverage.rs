//! Code coverage reads.
//!
//! Every coverage response carries `hasCoverage`; when a project has never uploaded a
//! coverage report the upstream answers with `hasCoverage: false` and an explanatory
//! `message` instead of an error.

use super::{DEFAULT_DAYS, DEFAULT_LIMIT, Operation, project_path, required};
use crate::client::GafferClient;
use crate::credential::CredentialRequirement;
use crate::error::Result;
use crate::mirrored::Mirrored;
use crate::query::QueryParams;
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Number;

pub const DEFAULT_MAX_COVERAGE: f64 = 10.0;
pub const DEFAULT_COVERAGE_THRESHOLD: f64 = 80.0;

#[derive(Debug, Clone, PartialEq, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CoverageMetrics {
    pub lines: Number,
    pub branches: Number,
    pub functions: Number,
}

#[derive(Debug, Clone, PartialEq, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CoverageCount {
    pub covered: u64,
    pub total: u64,
    pub percentage: Number,
}

#[derive(Debug, Clone, PartialEq, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FileCoverage {
    pub path: String,
    pub lines: CoverageCount,
    pub branches: CoverageCount,
    pub functions: CoverageCount,
}

/// `get_coverage_summary`: latest line/branch/function coverage and its trend.
pub struct GetCoverageSummary;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetCoverageSummaryInput {
    pub project_id: Option<String>,
    pub days: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CoverageSummary {
    pub has_coverage: bool,
    pub current: Option<CoverageMetrics>,
    pub trend: Option<CoverageTrend>,
    pub total_reports: u64,
    pub latest_report_date: Option<String>,
    #[serde(default)]
    pub lowest_coverage_files: Option<Vec<FileCoverageBrief>>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CoverageTrend {
    /// `up`, `down` or `stable`.
    pub direction: String,
    pub change: Number,
}

#[derive(Debug, Clone, PartialEq, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FileCoverageBrief {
    pub path: String,
    pub coverage: Number,
}

#[async_trait]
impl Operation for GetCoverageSummary {
    const NAME: &'static str = "get_coverage_summary";
    const REQUIRES: CredentialRequirement = CredentialRequirement::Primary;

    type Input = GetCoverageSummaryInput;
    type Output = CoverageSummary;

    async fn run(client: &GafferClient, input: Self::Input) -> Result<Mirrored<Self::Output>> {
        let project_id = client.project_id(input.project_id.as_deref()).await?;
        let query = QueryParams::new().with("days", input.days.unwrap_or(DEFAULT_DAYS));
        client
            .transport()
            .get_mirrored(&project_path(&project_id, "/coverage/summary"), &query)
            .await
    }
}

/// `get_coverage_for_file`: coverage of files matching a path fragment.
pub struct GetCoverageForFile;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetCoverageForFileInput {
    pub project_id: Option<String>,
    /// Exact path or substring, sent upstream as `path`.
    pub file_path: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FileCoverageList {
    pub has_coverage: bool,
    pub files: Vec<FileCoverage>,
    #[serde(default)]
    pub message: Option<String>,
}

#[async_trait]
impl Operation for GetCoverageForFile {
    const NAME: &'static str = "get_coverage_for_file";
    const REQUIRES: CredentialRequirement = CredentialRequirement::Primary;

    type Input = GetCoverageForFileInput;
    type Output = FileCoverageList;

    async fn run(client: &GafferClient, input: Self::Input) -> Result<Mirrored<Self::Output>> {
        let file_path = required(&input.file_path, "filePath")?;
        let project_id = client.project_id(input.project_id.as_deref()).await?;
        let query = QueryParams::new().with("path", file_path);
        client
            .transport()
            .get_mirrored(&project_path(&project_id, "/coverage/files"), &query)
            .await
    }
}

/// `get_untested_files`: files at or below a coverage percentage.
pub struct GetUntestedFiles;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetUntestedFilesInput {
    pub project_id: Option<String>,
    pub max_coverage: Option<f64>,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UntestedFiles {
    pub has_coverage: bool,
    pub files: Vec<FileCoverage>,
    pub total_count: u64,
    #[serde(default)]
    pub message: Option<String>,
}

#[async_trait]
impl Operation for GetUntestedFiles {
    const NAME: &'static str = "get_untested_files";
    const REQUIRES: CredentialRequirement = CredentialRequirement::Primary;

    type Input = GetUntestedFilesInput;
    type Output = UntestedFiles;

    async fn run(client: &GafferClient, input: Self::Input) -> Result<Mirrored<Self::Output>> {
        let project_id = client.project_id(input.project_id.as_deref()).await?;
        let query = QueryParams::new()
            .with(
                "maxCoverage",
                input.max_coverage.unwrap_or(DEFAULT_MAX_COVERAGE),
            )
            .with("limit", input.limit.unwrap_or(DEFAULT_LIMIT));
        client
            .transport()
            .get_mirrored(&project_path(&project_id, "/coverage/untested-files"), &query)
            .await
    }
}

/// `find_uncovered_failure_areas`: low-coverage files that also fail often.
pub struct FindUncoveredFailureAreas;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindUncoveredFailureAreasInput {
    pub project_id: Option<String>,
    pub days: Option<u32>,
    pub coverage_threshold: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RiskAreas {
    pub has_coverage: bool,
    pub has_test_results: bool,
    pub risk_areas: Vec<RiskArea>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RiskArea {
    pub file_path: String,
    pub coverage: Number,
    pub failure_count: u64,
    pub risk_score: Number,
    pub test_names: Vec<String>,
}

#[async_trait]
impl Operation for FindUncoveredFailureAreas {
    const NAME: &'static str = "find_uncovered_failure_areas";
    const REQUIRES: CredentialRequirement = CredentialRequirement::Primary;

    type Input = FindUncoveredFailureAreasInput;
    type Output = RiskAreas;

    async fn run(client: &GafferClient, input: Self::Input) -> Result<Mirrored<Self::Output>> {
        let project_id = client.project_id(input.project_id.as_deref()).await?;
        let query = QueryParams::new()
            .with("days", input.days.unwrap_or(DEFAULT_DAYS))
            .with(
                "coverageThreshold",
                input.coverage_threshold.unwrap_or(DEFAULT_COVERAGE_THRESHOLD),
            );
        client
            .transport()
            .get_mirrored(&project_path(&project_id, "/coverage/risk-areas"), &query)
            .await
    }
}
