//! Report files of a test run and signed browser links to them.

use super::{Operation, non_blank, project_path, required};
use crate::client::GafferClient;
use crate::credential::CredentialRequirement;
use crate::error::Result;
use crate::mirrored::Mirrored;
use crate::query::{QueryParams, path_segment};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;

/// `get_report`: files uploaded for a test run, with download links.
///
/// Addressed by run id alone; the upstream derives the project from the run.
pub struct GetReport;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetReportInput {
    pub test_run_id: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub test_run_id: String,
    pub project_id: String,
    pub project_name: String,
    pub files: Vec<ReportFile>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReportFile {
    pub filename: String,
    pub size: u64,
    pub content_type: Option<String>,
    pub download_url: String,
}

#[async_trait]
impl Operation for GetReport {
    const NAME: &'static str = "get_report";
    const REQUIRES: CredentialRequirement = CredentialRequirement::Primary;

    type Input = GetReportInput;
    type Output = Report;

    async fn run(client: &GafferClient, input: Self::Input) -> Result<Mirrored<Self::Output>> {
        let test_run_id = required(&input.test_run_id, "testRunId")?;
        let path = format!("/test-runs/{}/report", path_segment(test_run_id));
        client.transport().get_mirrored(&path, &QueryParams::new()).await
    }
}

/// `get_report_browser_url`: a time-limited signed URL to view a report in a browser.
pub struct GetReportBrowserUrl;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetReportBrowserUrlInput {
    pub project_id: Option<String>,
    pub test_run_id: String,
    /// Entry file; the upstream picks `index.html` when absent.
    pub filename: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BrowserUrl {
    pub url: String,
    pub filename: String,
    pub test_run_id: String,
    pub expires_at: String,
}

#[async_trait]
impl Operation for GetReportBrowserUrl {
    const NAME: &'static str = "get_report_browser_url";
    const REQUIRES: CredentialRequirement = CredentialRequirement::Primary;

    type Input = GetReportBrowserUrlInput;
    type Output = BrowserUrl;

    async fn run(client: &GafferClient, input: Self::Input) -> Result<Mirrored<Self::Output>> {
        let test_run_id = required(&input.test_run_id, "testRunId")?;
        let project_id = client.project_id(input.project_id.as_deref()).await?;
        let path = project_path(
            &project_id,
            &format!("/reports/{}/browser-url", path_segment(test_run_id)),
        );
        let query = QueryParams::new().with_opt("filename", non_blank(input.filename.as_deref()));
        client.transport().get_mirrored(&path, &query).await
    }
}
