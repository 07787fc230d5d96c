use crate::credential::CredentialKind;
use crate::error::Result;
use crate::mirrored::Mirrored;
use crate::operations::Operation;
use crate::resolver::ProjectResolver;
use crate::transport::{Transport, TransportConfig};
use std::sync::Arc;
use tracing::debug;

/// Entry point for all read operations.
///
/// Cheap to clone; clones share the transport and the resolved-project cache.
#[derive(Clone)]
pub struct GafferClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    transport: Transport,
    resolver: ProjectResolver,
}

impl GafferClient {
    /// # Errors
    ///
    /// Returns a configuration error if the transport settings are invalid.
    pub fn new(config: TransportConfig) -> Result<Self> {
        let transport = Transport::new(config)?;
        Ok(Self::from_transport(transport))
    }

    #[must_use]
    pub fn from_transport(transport: Transport) -> Self {
        let resolver = ProjectResolver::new(transport.clone());
        Self {
            inner: Arc::new(ClientInner {
                transport,
                resolver,
            }),
        }
    }

    #[must_use]
    pub fn credential_kind(&self) -> CredentialKind {
        self.inner.resolver.kind()
    }

    #[must_use]
    pub fn transport(&self) -> &Transport {
        &self.inner.transport
    }

    #[must_use]
    pub fn resolver(&self) -> &ProjectResolver {
        &self.inner.resolver
    }

    /// Run one operation after checking its credential requirement.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the credential kind does not satisfy `Op::REQUIRES`
    /// (no network call is made), otherwise whatever the operation returns.
    pub async fn invoke<Op: Operation>(&self, input: Op::Input) -> Result<Mirrored<Op::Output>> {
        self.inner.resolver.require(Op::REQUIRES, Op::NAME)?;
        debug!(operation = Op::NAME, "invoking operation");
        Op::run(self, input).await
    }

    pub(crate) async fn project_id(&self, explicit: Option<&str>) -> Result<String> {
        self.inner.resolver.resolve_project_id(explicit).await
    }
}
