//! Request execution core.
//!
//! Every operation funnels through [`Transport::execute`], which owns URL construction, the
//! credential header, the per-attempt deadline, and the retry/backoff loop.

use crate::credential::{Credential, CredentialKind};
use crate::error::{GafferError, Result};
use crate::mirrored::Mirrored;
use crate::query::QueryParams;
use reqwest::header::{ACCEPT, HeaderMap, RETRY_AFTER};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://app.gaffer.sh";
pub const API_PREFIX: &str = "/api/v1";
pub const CREDENTIAL_HEADER: &str = "X-API-Key";
pub const USER_AGENT: &str = concat!("gaffer-mcp/", env!("CARGO_PKG_VERSION"));

pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_millis(30_000);
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_millis(1_000);

/// Static transport settings, fixed at construction.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub base_url: String,
    pub credential: Credential,
    /// Wall-clock deadline for a single attempt.
    pub attempt_timeout: Duration,
    /// Retries after the initial attempt.
    pub max_retries: u32,
    /// Delay before the first retry; doubles for each subsequent one.
    pub initial_backoff: Duration,
}

impl TransportConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>, credential: Credential) -> Self {
        Self {
            base_url: base_url.into(),
            credential,
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            initial_backoff: DEFAULT_INITIAL_BACKOFF,
        }
    }
}

#[derive(Clone)]
pub struct Transport {
    inner: Arc<TransportInner>,
}

struct TransportInner {
    base_url: String,
    credential: Credential,
    client: Client,
    attempt_timeout: Duration,
    max_retries: u32,
    initial_backoff: Duration,
}

/// States of the retry loop.
///
/// "Retryable" and "attempts remaining" are independent: a retryable failure on the last
/// attempt lands in `ExhaustedFailed`, not `Backoff`.
#[derive(Debug)]
enum RetryState {
    Attempting { attempt: u32 },
    Backoff { attempt: u32, delay: Duration },
    Succeeded(Value),
    ImmediateFailed(GafferError),
    ExhaustedFailed(GafferError),
}

#[derive(Debug)]
struct AttemptFailure {
    error: GafferError,
    /// Only populated for 429 responses carrying `Retry-After`.
    retry_after: Option<Duration>,
}

impl From<GafferError> for AttemptFailure {
    fn from(error: GafferError) -> Self {
        Self {
            error,
            retry_after: None,
        }
    }
}

impl Transport {
    /// Build a transport from static settings.
    ///
    /// # Errors
    ///
    /// Returns [`GafferError::Config`] if the credential is empty, the base URL does not parse,
    /// or the HTTP client cannot be built.
    pub fn new(config: TransportConfig) -> Result<Self> {
        if config.credential.is_empty() {
            return Err(GafferError::config(
                "API credential is required (set GAFFER_API_KEY)",
            ));
        }

        let base_url = config
            .base_url
            .strip_suffix('/')
            .unwrap_or(&config.base_url)
            .to_string();
        Url::parse(&base_url)
            .map_err(|e| GafferError::config(format!("Invalid API base URL '{base_url}': {e}")))?;

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| GafferError::config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            inner: Arc::new(TransportInner {
                base_url,
                credential: config.credential,
                client,
                attempt_timeout: config.attempt_timeout,
                max_retries: config.max_retries,
                initial_backoff: config.initial_backoff,
            }),
        })
    }

    #[must_use]
    pub fn credential_kind(&self) -> CredentialKind {
        self.inner.credential.kind()
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// Absolute URL for `path` (relative to the API prefix) plus query.
    ///
    /// # Errors
    ///
    /// Returns [`GafferError::Transport`] if the joined URL does not parse. That is a
    /// connection-establishment class failure and is treated as retryable by `execute`.
    pub fn endpoint_url(&self, path: &str, query: &QueryParams) -> Result<Url> {
        let mut path = path.to_string();
        if !path.starts_with('/') {
            path = format!("/{path}");
        }
        let raw = format!("{}{API_PREFIX}{path}", self.inner.base_url);
        let mut url =
            Url::parse(&raw).map_err(|e| GafferError::Transport(format!("Invalid URL: {e}")))?;
        if let Some(q) = query.encode() {
            url.set_query(Some(&q));
        }
        Ok(url)
    }

    /// Issue one authenticated `GET` and return the decoded JSON body, retrying transient
    /// failures.
    ///
    /// # Errors
    ///
    /// Returns the first non-retryable error immediately, or the last observed error once all
    /// attempts are spent.
    pub async fn execute(&self, path: &str, query: &QueryParams) -> Result<Value> {
        let mut state = RetryState::Attempting { attempt: 0 };
        loop {
            state = match state {
                RetryState::Attempting { attempt } => match self.attempt(path, query, attempt).await
                {
                    Ok(body) => RetryState::Succeeded(body),
                    Err(failure) => self.after_failure(path, attempt, failure),
                },
                RetryState::Backoff { attempt, delay } => {
                    tokio::time::sleep(delay).await;
                    RetryState::Attempting {
                        attempt: attempt + 1,
                    }
                }
                RetryState::Succeeded(body) => return Ok(body),
                RetryState::ImmediateFailed(error) => {
                    debug!(path = %path, error = %error, "request failed (not retryable)");
                    return Err(error);
                }
                RetryState::ExhaustedFailed(error) => {
                    debug!(path = %path, error = %error, "request failed (retries exhausted)");
                    return Err(error);
                }
            };
        }
    }

    /// [`execute`](Self::execute) and decode the body into `T`.
    ///
    /// # Errors
    ///
    /// Same as `execute`, plus [`GafferError::Decode`] if the body does not match `T`.
    pub async fn get<T: DeserializeOwned>(&self, path: &str, query: &QueryParams) -> Result<T> {
        let body = self.execute(path, query).await?;
        serde_json::from_value(body).map_err(|e| GafferError::Decode(format!("{path}: {e}")))
    }

    /// Like [`get`](Self::get), but keep the body as sent next to the typed view.
    ///
    /// # Errors
    ///
    /// Same as `get`.
    pub async fn get_mirrored<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &QueryParams,
    ) -> Result<Mirrored<T>> {
        let body = self.execute(path, query).await?;
        Mirrored::decode(body).map_err(|e| GafferError::Decode(format!("{path}: {e}")))
    }

    fn after_failure(&self, path: &str, attempt: u32, failure: AttemptFailure) -> RetryState {
        if !failure.error.is_retryable() {
            return RetryState::ImmediateFailed(failure.error);
        }
        if attempt >= self.inner.max_retries {
            return RetryState::ExhaustedFailed(failure.error);
        }
        let delay = backoff_delay(self.inner.initial_backoff, attempt, failure.retry_after);
        warn!(
            path = %path,
            attempt = attempt + 1,
            status = ?failure.error.status(),
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            error = %failure.error,
            "transient API failure; retrying"
        );
        RetryState::Backoff { attempt, delay }
    }

    async fn attempt(
        &self,
        path: &str,
        query: &QueryParams,
        attempt: u32,
    ) -> std::result::Result<Value, AttemptFailure> {
        let url = self.endpoint_url(path, query)?;
        debug!(url = %redact_url(&url), attempt = attempt + 1, "sending API request");

        let request = self
            .inner
            .client
            .get(url)
            .header(CREDENTIAL_HEADER, self.inner.credential.expose())
            .header(ACCEPT, "application/json");

        let exchange = async {
            let response = request.send().await?;
            let status = response.status();
            let headers = response.headers().clone();
            let bytes = response.bytes().await?;
            Ok::<_, reqwest::Error>((status, headers, bytes))
        };

        let timeout = self.inner.attempt_timeout;
        let (status, headers, bytes) = match tokio::time::timeout(timeout, exchange).await {
            Err(_) => return Err(GafferError::Timeout { timeout }.into()),
            Ok(Err(e)) if e.is_timeout() => return Err(GafferError::Timeout { timeout }.into()),
            Ok(Err(e)) => return Err(GafferError::Transport(sanitize_reqwest_error(&e)).into()),
            Ok(Ok(parts)) => parts,
        };

        if status.is_success() {
            return serde_json::from_slice(&bytes).map_err(|e| {
                AttemptFailure::from(GafferError::Decode(format!(
                    "response body is not valid JSON: {e}"
                )))
            });
        }

        let retry_after = if status == StatusCode::TOO_MANY_REQUESTS {
            parse_retry_after(&headers)
        } else {
            None
        };
        Err(AttemptFailure {
            error: GafferError::from_response(status.as_u16(), &bytes),
            retry_after,
        })
    }
}

/// Delay before retry `retry_index` (0-indexed): `initial × 2^n`, raised to `retry_after`
/// when the server asked for longer.
#[must_use]
pub fn backoff_delay(
    initial: Duration,
    retry_index: u32,
    retry_after: Option<Duration>,
) -> Duration {
    let exponential = initial.saturating_mul(2_u32.saturating_pow(retry_index.min(30)));
    retry_after.map_or(exponential, |ra| exponential.max(ra))
}

/// `Retry-After` in delta-seconds. HTTP-date values are ignored.
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let raw = headers.get(RETRY_AFTER)?.to_str().ok()?.trim();
    if let Ok(secs) = raw.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    raw.parse::<f64>()
        .ok()
        .filter(|s| s.is_finite() && *s >= 0.0)
        .map(Duration::from_secs_f64)
}

fn redact_url(url: &Url) -> String {
    let mut u = url.clone();
    let _ = u.set_username("");
    let _ = u.set_password(None);
    u.set_query(None);
    u.set_fragment(None);
    u.to_string()
}

fn sanitize_reqwest_error(e: &reqwest::Error) -> String {
    let mut msg = e.to_string();
    if let Some(u) = e.url() {
        msg = msg.replace(u.as_str(), &redact_url(u));
    }
    msg
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn transport(base_url: &str) -> Transport {
        Transport::new(TransportConfig::new(base_url, Credential::new("gaf_test")))
            .expect("valid transport config")
    }

    #[test]
    fn exponential_backoff_doubles_from_initial() {
        let initial = Duration::from_millis(1_000);
        assert_eq!(backoff_delay(initial, 0, None), Duration::from_millis(1_000));
        assert_eq!(backoff_delay(initial, 1, None), Duration::from_millis(2_000));
        assert_eq!(backoff_delay(initial, 2, None), Duration::from_millis(4_000));
    }

    #[test]
    fn retry_after_wins_when_longer() {
        let initial = Duration::from_millis(1_000);
        let delay = backoff_delay(initial, 0, Some(Duration::from_secs(10)));
        assert!(delay >= Duration::from_millis(10_000));
    }

    #[test]
    fn exponential_wins_when_retry_after_is_shorter() {
        let initial = Duration::from_millis(1_000);
        let delay = backoff_delay(initial, 2, Some(Duration::from_secs(1)));
        assert_eq!(delay, Duration::from_millis(4_000));
    }

    #[test]
    fn retry_after_parses_seconds_and_ignores_dates() {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("10"));
        assert_eq!(parse_retry_after(&headers), Some(Duration::from_secs(10)));

        headers.insert(RETRY_AFTER, HeaderValue::from_static("1.5"));
        assert_eq!(parse_retry_after(&headers), Some(Duration::from_millis(1_500)));

        headers.insert(
            RETRY_AFTER,
            HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"),
        );
        assert_eq!(parse_retry_after(&headers), None);

        assert_eq!(parse_retry_after(&HeaderMap::new()), None);
    }

    #[test]
    fn base_url_trailing_slash_is_stripped_once() {
        let t = transport("https://api.example.test/");
        assert_eq!(t.base_url(), "https://api.example.test");
        let url = t
            .endpoint_url("/projects/p1/health", &QueryParams::new().with("days", 7))
            .expect("url");
        assert_eq!(
            url.as_str(),
            "https://api.example.test/api/v1/projects/p1/health?days=7"
        );
    }

    #[test]
    fn endpoint_url_without_query_has_no_question_mark() {
        let t = transport("https://api.example.test");
        let url = t.endpoint_url("project", &QueryParams::new()).expect("url");
        assert_eq!(url.as_str(), "https://api.example.test/api/v1/project");
    }

    #[test]
    fn empty_credential_is_a_config_error() {
        let err = Transport::new(TransportConfig::new(
            "https://api.example.test",
            Credential::new("  "),
        ))
        .err()
        .expect("empty credential rejected");
        assert!(matches!(err, GafferError::Config(_)));
    }

    #[test]
    fn invalid_base_url_is_a_config_error() {
        let err = Transport::new(TransportConfig::new("not a url", Credential::new("gaf_x")))
            .err()
            .expect("invalid base url rejected");
        assert!(matches!(err, GafferError::Config(_)));
    }

    #[test]
    fn redact_url_drops_query() {
        let url = Url::parse("https://u:p@api.example.test/api/v1/x?testName=secret#f")
            .expect("url");
        assert_eq!(redact_url(&url), "https://api.example.test/api/v1/x");
    }
}
