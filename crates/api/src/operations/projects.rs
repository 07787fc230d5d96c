//! Project listing and project health.

use super::{DEFAULT_DAYS, Operation, Pagination, Period, non_blank, project_path};
use crate::client::GafferClient;
use crate::credential::CredentialRequirement;
use crate::error::Result;
use crate::mirrored::Mirrored;
use crate::query::QueryParams;
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Number;

pub const DEFAULT_PROJECT_LIMIT: u32 = 50;

/// `list_projects`: every project the primary credential can read.
pub struct ListProjects;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListProjectsInput {
    pub organization_id: Option<String>,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProjectList {
    pub projects: Vec<ProjectSummary>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, PartialEq, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummary {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub organization: OrganizationRef,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationRef {
    pub id: String,
    pub name: String,
    pub slug: String,
}

#[async_trait]
impl Operation for ListProjects {
    const NAME: &'static str = "list_projects";
    const REQUIRES: CredentialRequirement = CredentialRequirement::Primary;

    type Input = ListProjectsInput;
    type Output = ProjectList;

    async fn run(client: &GafferClient, input: Self::Input) -> Result<Mirrored<Self::Output>> {
        let query = QueryParams::new()
            .with_opt("organizationId", non_blank(input.organization_id.as_deref()))
            .with("limit", input.limit.unwrap_or(DEFAULT_PROJECT_LIMIT));
        client.transport().get_mirrored("/projects", &query).await
    }
}

/// `get_project_health`: health score, pass rate and trend over a window of days.
pub struct GetProjectHealth;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetProjectHealthInput {
    pub project_id: Option<String>,
    pub days: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProjectHealth {
    pub project_name: String,
    pub health_score: Number,
    pub pass_rate: Option<Number>,
    pub test_run_count: u64,
    pub flaky_test_count: u64,
    pub trend: String,
    pub period: Period,
}

#[async_trait]
impl Operation for GetProjectHealth {
    const NAME: &'static str = "get_project_health";
    const REQUIRES: CredentialRequirement = CredentialRequirement::Any;

    type Input = GetProjectHealthInput;
    type Output = ProjectHealth;

    async fn run(client: &GafferClient, input: Self::Input) -> Result<Mirrored<Self::Output>> {
        let project_id = client.project_id(input.project_id.as_deref()).await?;
        let query = QueryParams::new().with("days", input.days.unwrap_or(DEFAULT_DAYS));
        client
            .transport()
            .get_mirrored(&project_path(&project_id, "/health"), &query)
            .await
    }
}
