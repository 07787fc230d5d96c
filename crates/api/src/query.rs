//! Query-string and path-segment encoding.

use std::fmt::Display;

/// Ordered query parameters for one request.
///
/// Absent values are never serialized: `with_opt(key, None)` leaves the query untouched rather
/// than emitting an empty or literal `null` value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, key: &str, value: impl Display) -> Self {
        self.pairs.push((key.to_string(), value.to_string()));
        self
    }

    #[must_use]
    pub fn with_opt<V: Display>(self, key: &str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.with(key, v),
            None => self,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Encoded `k=v&k=v` form, or `None` when there is nothing to send.
    #[must_use]
    pub fn encode(&self) -> Option<String> {
        if self.pairs.is_empty() {
            return None;
        }
        let mut query = String::new();
        for (i, (k, v)) in self.pairs.iter().enumerate() {
            if i > 0 {
                query.push('&');
            }
            query.push_str(&encode_component(k));
            query.push('=');
            query.push_str(&encode_component(v));
        }
        Some(query)
    }
}

/// Percent-encode a single path segment (ids taken from user input).
#[must_use]
pub fn path_segment(s: &str) -> String {
    encode_component(s)
}

fn encode_component(s: &str) -> String {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";
    let mut out = String::with_capacity(s.len());
    for &b in s.as_bytes() {
        if is_unreserved(b) {
            out.push(b as char);
        } else {
            out.push('%');
            out.push(HEX[(b >> 4) as usize] as char);
            out.push(HEX[(b & 0x0F) as usize] as char);
        }
    }
    out
}

fn is_unreserved(b: u8) -> bool {
    matches!(b, b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_values_are_omitted() {
        let q = QueryParams::new()
            .with("limit", 20)
            .with_opt("branch", None::<&str>)
            .with_opt("testName", Some("a b&c"));
        assert_eq!(q.encode().as_deref(), Some("limit=20&testName=a%20b%26c"));
        assert_eq!(q.get("branch"), None);
    }

    #[test]
    fn empty_params_encode_to_none() {
        assert_eq!(QueryParams::new().encode(), None);
        assert!(QueryParams::new().with_opt("x", None::<u32>).is_empty());
    }

    #[test]
    fn floats_render_without_trailing_zero() {
        let q = QueryParams::new().with("maxCoverage", 10.0_f64).with("t", 0.25_f64);
        assert_eq!(q.encode().as_deref(), Some("maxCoverage=10&t=0.25"));
    }

    #[test]
    fn path_segment_escapes_separators() {
        assert_eq!(path_segment("run/1?x"), "run%2F1%3Fx");
        assert_eq!(path_segment("abc-123_x.y~z"), "abc-123_x.y~z");
    }
}
