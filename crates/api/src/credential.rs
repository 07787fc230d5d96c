//! Credential classification and capability requirements.

use std::fmt;
use std::sync::Arc;

/// Raw-value prefix of user API keys.
pub const PRIMARY_PREFIX: &str = "gaf_";

/// Trust level of the configured credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialKind {
    /// User API key: multi-project, broad read access.
    Primary,
    /// Project upload token: bound to exactly one project.
    Scoped,
}

impl CredentialKind {
    /// Classify a raw credential by prefix. No network access.
    #[must_use]
    pub fn classify(raw: &str) -> Self {
        if raw.starts_with(PRIMARY_PREFIX) {
            Self::Primary
        } else {
            Self::Scoped
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Scoped => "scoped",
        }
    }

    fn describe(self) -> &'static str {
        match self {
            Self::Primary => "a user API key (gaf_...)",
            Self::Scoped => "a project upload token",
        }
    }
}

impl fmt::Display for CredentialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which credential kinds an operation accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialRequirement {
    Any,
    Primary,
}

impl CredentialRequirement {
    #[must_use]
    pub fn permits(self, kind: CredentialKind) -> bool {
        match self {
            Self::Any => true,
            Self::Primary => kind == CredentialKind::Primary,
        }
    }

    /// Why `actual` may not run `operation`, or `None` when it may.
    pub(crate) fn denial(self, operation: &str, actual: CredentialKind) -> Option<String> {
        let required = match self {
            Self::Any => return None,
            Self::Primary => CredentialKind::Primary,
        };
        if actual == required {
            return None;
        }
        Some(format!(
            "{operation} requires {} ({required} credential); the configured credential is {}",
            required.describe(),
            actual.describe()
        ))
    }
}

/// The access token supplied at startup.
///
/// Immutable once constructed. `Debug` never prints the secret.
#[derive(Clone)]
pub struct Credential {
    secret: Arc<str>,
    kind: CredentialKind,
}

impl Credential {
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        let raw: String = raw.into();
        let kind = CredentialKind::classify(&raw);
        Self {
            secret: Arc::from(raw),
            kind,
        }
    }

    #[must_use]
    pub fn kind(&self) -> CredentialKind {
        self.kind
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.secret.trim().is_empty()
    }

    pub(crate) fn expose(&self) -> &str {
        &self.secret
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("kind", &self.kind)
            .field("secret", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_by_prefix() {
        assert_eq!(CredentialKind::classify("gaf_abc123"), CredentialKind::Primary);
        assert_eq!(CredentialKind::classify("gfr_xyz"), CredentialKind::Scoped);
        assert_eq!(CredentialKind::classify(""), CredentialKind::Scoped);
        assert_eq!(CredentialKind::classify("gaf"), CredentialKind::Scoped);
        assert_eq!(CredentialKind::classify("GAF_abc"), CredentialKind::Scoped);
        assert_eq!(CredentialKind::classify(" gaf_abc"), CredentialKind::Scoped);
    }

    #[test]
    fn debug_redacts_secret() {
        let c = Credential::new("gaf_supersecret");
        let printed = format!("{c:?}");
        assert!(!printed.contains("supersecret"));
        assert!(printed.contains("Primary"));
    }

    #[test]
    fn requirement_permits() {
        assert!(CredentialRequirement::Any.permits(CredentialKind::Scoped));
        assert!(CredentialRequirement::Any.permits(CredentialKind::Primary));
        assert!(CredentialRequirement::Primary.permits(CredentialKind::Primary));
        assert!(!CredentialRequirement::Primary.permits(CredentialKind::Scoped));
    }

    #[test]
    fn denial_names_operation_and_required_kind() {
        let msg = CredentialRequirement::Primary
            .denial("list_projects", CredentialKind::Scoped)
            .expect("scoped credential is denied");
        assert_eq!(
            msg,
            "list_projects requires a user API key (gaf_...) (primary credential); \
             the configured credential is a project upload token"
        );
    }

    #[test]
    fn permitted_credentials_have_no_denial() {
        for kind in [CredentialKind::Primary, CredentialKind::Scoped] {
            assert_eq!(CredentialRequirement::Any.denial("get_flaky_tests", kind), None);
        }
        assert_eq!(
            CredentialRequirement::Primary.denial("get_report", CredentialKind::Primary),
            None
        );
    }
}
