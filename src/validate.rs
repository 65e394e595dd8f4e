//! Structural validation of the model's raw completion text.
//!
//! The completion must decode as a JSON array of story objects. One repair is
//! tolerated: a model that forgets the array wrapper and returns a bare
//! object gets wrapped into a one-element array. Anything else (prose,
//! fenced code, a bare scalar, truncated JSON) is a fatal
//! [`MalformedResponse`] that carries the raw text verbatim so an operator
//! can see exactly what came back.

use serde_json::Value;
use std::error::Error;
use std::fmt;
use tracing::debug;

/// The completion text did not decode as a story array.
///
/// The raw text is preserved for diagnosis via [`MalformedResponse::raw`].
#[derive(Debug)]
pub struct MalformedResponse {
    raw: String,
    detail: String,
}

impl MalformedResponse {
    /// The completion text exactly as the service returned it.
    pub fn raw(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for MalformedResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "model response is not a JSON story array: {}", self.detail)
    }
}

impl Error for MalformedResponse {}

/// Parse raw completion text into the elements of the story array.
///
/// Leading/trailing whitespace is stripped before parsing. A top-level
/// object is wrapped as a single-element array; a top-level array is taken
/// as-is.
pub fn parse_story_array(raw: &str) -> Result<Vec<Value>, MalformedResponse> {
    let trimmed = raw.trim();
    let value: Value = match serde_json::from_str(trimmed) {
        Ok(value) => value,
        Err(e) => {
            return Err(MalformedResponse {
                raw: raw.to_string(),
                detail: format!("invalid JSON: {e}"),
            });
        }
    };

    match value {
        Value::Array(items) => Ok(items),
        Value::Object(_) => {
            debug!("Top-level object; wrapping as a one-element array");
            Ok(vec![value])
        }
        other => Err(MalformedResponse {
            raw: raw.to_string(),
            detail: format!("top-level JSON is {}, expected an array", json_kind(&other)),
        }),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
