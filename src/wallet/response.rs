//! zingo-cli output parsing
//!
//! zingo-cli mixes banner text, progress lines and JSON on stdout. The first
//! trimmed line that starts with `{` or `[` and parses as JSON is the result.
//! When no line qualifies, the whole (trimmed) output is kept as raw text.

use serde_json::Value;

/// Parsed result of one wallet command
#[derive(Debug, Clone, PartialEq)]
pub enum BackendResponse {
    /// First JSON line found on stdout
    Structured(Value),

    /// No JSON line; the trimmed stdout
    Raw(String),
}

impl BackendResponse {
    /// JSON payload, if any
    pub fn json(&self) -> Option<&Value> {
        match self {
            BackendResponse::Structured(value) => Some(value),
            BackendResponse::Raw(_) => None,
        }
    }

    /// String field of a structured object
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.json()?.get(key)?.as_str()
    }

    /// Unsigned integer field of a structured object
    pub fn u64_field(&self, key: &str) -> Option<u64> {
        self.json()?.get(key)?.as_u64()
    }

    /// Transaction id from a send/shield result
    ///
    /// Accepts `{"txid": "..."}` and `{"txids": ["...", ...]}`.
    pub fn txid(&self) -> Option<String> {
        let value = self.json()?;

        let txid = value
            .get("txid")
            .and_then(Value::as_str)
            .or_else(|| {
                value
                    .get("txids")
                    .and_then(Value::as_array)
                    .and_then(|ids| ids.first())
                    .and_then(Value::as_str)
            })?
            .trim();

        if txid.is_empty() {
            None
        } else {
            Some(txid.to_string())
        }
    }
}

/// Extract the result of a command from zingo-cli stdout
pub fn parse_output(stdout: &str) -> BackendResponse {
    for line in stdout.lines() {
        let line = line.trim();
        if !(line.starts_with('{') || line.starts_with('[')) {
            continue;
        }
        if let Ok(value) = serde_json::from_str::<Value>(line) {
            return BackendResponse::Structured(value);
        }
    }

    BackendResponse::Raw(stdout.trim().to_string())
}
