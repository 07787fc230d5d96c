//! Credential capability gate and project-identifier resolution.

use crate::credential::{CredentialKind, CredentialRequirement};
use crate::error::{GafferError, Result};
use crate::query::QueryParams;
use crate::transport::Transport;
use serde::Deserialize;
use tokio::sync::OnceCell;
use tracing::{debug, info};

/// Identity endpoint for project-scoped tokens. Never called with a primary credential.
pub const IDENTITY_PATH: &str = "/project";

/// Resolves the effective project id for per-project operations.
///
/// One instance per server session. The resolved id of a scoped credential is memoized for
/// the lifetime of the instance; concurrent first callers share a single in-flight
/// resolution.
pub struct ProjectResolver {
    transport: Transport,
    kind: CredentialKind,
    resolved: OnceCell<String>,
}

#[derive(Debug, Deserialize)]
struct IdentityResponse {
    project: IdentityProject,
}

#[derive(Debug, Deserialize)]
struct IdentityProject {
    id: String,
}

impl ProjectResolver {
    #[must_use]
    pub fn new(transport: Transport) -> Self {
        let kind = transport.credential_kind();
        Self {
            transport,
            kind,
            resolved: OnceCell::new(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> CredentialKind {
        self.kind
    }

    /// Capability gate, checked before any network call.
    ///
    /// # Errors
    ///
    /// Returns [`GafferError::Config`] naming `operation` and the required kind when the
    /// configured credential does not satisfy `requirement`.
    pub fn require(&self, requirement: CredentialRequirement, operation: &str) -> Result<()> {
        match requirement.denial(operation, self.kind) {
            None => Ok(()),
            Some(message) => Err(GafferError::config(message)),
        }
    }

    /// Project id memoized by an earlier resolution, if any.
    #[must_use]
    pub fn cached_project_id(&self) -> Option<&str> {
        self.resolved.get().map(String::as_str)
    }

    /// Effective project id: the explicit one if given, otherwise the scoped credential's bound
    /// project.
    ///
    /// # Errors
    ///
    /// - [`GafferError::Config`] if no id is given and the credential is primary.
    /// - Any transport error from the identity call.
    /// - [`GafferError::Decode`] if the identity response carries no project id.
    pub async fn resolve_project_id(&self, explicit: Option<&str>) -> Result<String> {
        if let Some(id) = explicit.filter(|s| !s.trim().is_empty()) {
            return Ok(id.to_string());
        }

        match self.kind {
            CredentialKind::Primary => Err(GafferError::config(
                "projectId is required for this credential kind (user API keys can access \
                 multiple projects; use list_projects to find one)",
            )),
            CredentialKind::Scoped => {
                let id = self
                    .resolved
                    .get_or_try_init(|| self.fetch_bound_project_id())
                    .await?;
                Ok(id.clone())
            }
        }
    }

    async fn fetch_bound_project_id(&self) -> Result<String> {
        debug!("resolving project bound to scoped credential");
        let identity: IdentityResponse = self
            .transport
            .get(IDENTITY_PATH, &QueryParams::new())
            .await?;
        let id = identity.project.id;
        if id.trim().is_empty() {
            return Err(GafferError::Decode(
                "identity response carries an empty project id".to_string(),
            ));
        }
        info!(project_id = %id, "resolved project for scoped credential");
        Ok(id)
    }
}
