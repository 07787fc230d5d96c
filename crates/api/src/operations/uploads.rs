//! Upload-session status.
//!
//! Two modes keyed on `sessionId`: with it, the detail of one session and what it produced;
//! without it, a filtered list of sessions.

use super::{Operation, Pagination, RunCounts, non_blank, project_path};
use crate::client::GafferClient;
use crate::credential::CredentialRequirement;
use crate::error::Result;
use crate::mirrored::Mirrored;
use crate::query::{QueryParams, path_segment};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;

/// `get_upload_status`
pub struct GetUploadStatus;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetUploadStatusInput {
    pub project_id: Option<String>,
    pub session_id: Option<String>,
    /// List mode only.
    pub commit_sha: Option<String>,
    /// List mode only.
    pub branch: Option<String>,
}

/// Either shape, without a tag; which one applies is decided by the request, not the body.
#[derive(Debug, Clone, PartialEq, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum UploadStatus {
    Session(UploadSessionDetail),
    Sessions(UploadSessionList),
}

#[derive(Debug, Clone, PartialEq, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadSession {
    pub id: String,
    /// `pending`, `processing`, `completed` or `error`.
    pub processing_status: String,
    pub commit_sha: Option<String>,
    pub branch: Option<String>,
    pub file_count: u64,
    pub total_size: u64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadSessionDetail {
    pub session: UploadSession,
    pub test_runs: Vec<LinkedTestRun>,
    pub coverage_reports: Vec<LinkedCoverageReport>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LinkedTestRun {
    pub id: String,
    pub framework: Option<String>,
    pub summary: RunCounts,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LinkedCoverageReport {
    pub id: String,
    pub format: String,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadSessionList {
    pub sessions: Vec<UploadSession>,
    pub pagination: Pagination,
}

#[async_trait]
impl Operation for GetUploadStatus {
    const NAME: &'static str = "get_upload_status";
    const REQUIRES: CredentialRequirement = CredentialRequirement::Primary;

    type Input = GetUploadStatusInput;
    type Output = UploadStatus;

    async fn run(client: &GafferClient, input: Self::Input) -> Result<Mirrored<Self::Output>> {
        let project_id = client.project_id(input.project_id.as_deref()).await?;
        let transport = client.transport();

        if let Some(session_id) = non_blank(input.session_id.as_deref()) {
            let path = project_path(
                &project_id,
                &format!("/upload-sessions/{}", path_segment(session_id)),
            );
            let detail: Mirrored<UploadSessionDetail> = transport.get_mirrored(&path, &QueryParams::new()).await?;
            return Ok(detail.map(UploadStatus::Session));
        }

        let query = QueryParams::new()
            .with_opt("commitSha", non_blank(input.commit_sha.as_deref()))
            .with_opt("branch", non_blank(input.branch.as_deref()));
        let list: Mirrored<UploadSessionList> = transport
            .get_mirrored(&project_path(&project_id, "/upload-sessions"), &query)
            .await?;
        Ok(list.map(UploadStatus::Sessions))
    }
}
