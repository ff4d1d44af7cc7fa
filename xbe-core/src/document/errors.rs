//! JSON:API error documents.

use serde_json::Value;
use std::fmt;

/// One entry of a JSON:API `errors` array.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiError {
    /// HTTP status as a string, when the server includes it.
    pub status: Option<String>,
    /// Application-specific error code.
    pub code: Option<String>,
    /// Short summary.
    pub title: Option<String>,
    /// Human-readable explanation.
    pub detail: Option<String>,
    /// JSON pointer to the offending request member (`source.pointer`).
    pub pointer: Option<String>,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = self
            .detail
            .as_deref()
            .or(self.title.as_deref())
            .or(self.code.as_deref())
            .unwrap_or("unknown error");
        match &self.pointer {
            Some(pointer) => write!(f, "{} ({})", message, pointer),
            None => f.write_str(message),
        }
    }
}

/// Parse the `errors` array of an error response.
///
/// Returns an empty list when the body is not a JSON:API error document.
pub fn decode_errors(bytes: &[u8]) -> Vec<ApiError> {
    let Ok(value) = serde_json::from_slice::<Value>(bytes) else {
        return Vec::new();
    };
    let Some(Value::Array(items)) = value.get("errors") else {
        return Vec::new();
    };

    items
        .iter()
        .filter(|item| item.is_object())
        .map(|item| ApiError {
            status: scalar(item.get("status")),
            code: scalar(item.get("code")),
            title: scalar(item.get("title")),
            detail: scalar(item.get("detail")),
            pointer: scalar(item.pointer("/source/pointer")),
        })
        .collect()
}

/// Strings pass through; numbers (e.g. `"status": 422`) are rendered.
fn scalar(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
