//! Upstream response bodies passed through unchanged.
//!
//! A [`Mirrored<T>`] keeps the decoded JSON body exactly as the upstream sent it next to a typed
//! view of the same body. Serializing it writes the original body: an omitted field is not
//! turned into `null` (or the reverse), and fields `T` does not declare are kept. The typed view
//! is for callers that read specific fields; it is reachable through `Deref`.

use serde::de::DeserializeOwned;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::ops::Deref;

#[derive(Debug, Clone, PartialEq)]
pub struct Mirrored<T> {
    body: Value,
    typed: T,
}

impl<T: DeserializeOwned> Mirrored<T> {
    /// Check that `body` has the shape of `T` and keep both.
    ///
    /// # Errors
    ///
    /// Returns the serde error if `body` does not decode as `T`.
    pub fn decode(body: Value) -> serde_json::Result<Self> {
        let typed = T::deserialize(&body)?;
        Ok(Self { body, typed })
    }
}

impl<T> Mirrored<T> {
    #[must_use]
    pub fn typed(&self) -> &T {
        &self.typed
    }

    #[must_use]
    pub fn body(&self) -> &Value {
        &self.body
    }

    #[must_use]
    pub fn into_body(self) -> Value {
        self.body
    }

    /// Rewrap the typed view (for example into an enum variant); the body is untouched.
    #[must_use]
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Mirrored<U> {
        Mirrored {
            body: self.body,
            typed: f(self.typed),
        }
    }
}

impl<T> Deref for Mirrored<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.typed
    }
}

impl<T> Serialize for Mirrored<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.body.serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Entry {
        test_run_id: String,
        branch: Option<String>,
        #[serde(default)]
        message: Option<String>,
    }

    #[test]
    fn serializes_the_body_not_the_typed_view() {
        let body = json!({"testRunId": "r1", "message": null, "retries": 2});
        let entry = Mirrored::<Entry>::decode(body.clone()).expect("decodes");

        assert_eq!(entry.test_run_id, "r1");
        assert_eq!(entry.branch, None);
        let out = serde_json::to_value(&entry).expect("serialize");
        assert_eq!(out, body);
        assert!(out.get("branch").is_none());
        assert_eq!(out["message"], Value::Null);
        assert_eq!(out["retries"], 2);
    }

    #[test]
    fn shape_mismatch_is_rejected() {
        let err = Mirrored::<Entry>::decode(json!({"branch": "main"})).unwrap_err();
        assert!(err.to_string().contains("testRunId"));
    }

    #[test]
    fn map_keeps_the_body() {
        let body = json!({"testRunId": "r1", "branch": "main"});
        let mapped = Mirrored::<Entry>::decode(body.clone())
            .expect("decodes")
            .map(|e| e.branch);
        assert_eq!(mapped.typed().as_deref(), Some("main"));
        assert_eq!(mapped.into_body(), body);
    }
}
