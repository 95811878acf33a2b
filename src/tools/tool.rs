//! Core tool trait and invocation types.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Errors surfaced as protocol-level failures rather than tool output.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Invalid parameters: {0}")]
    InvalidParams(String),
}

/// What a tool call produced. Domain failures are rendered as text with the
/// error flag set, so the MCP client always receives something readable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    pub text: String,
    pub is_error: bool,
}

impl ToolOutput {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: false,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: true,
        }
    }
}

/// A tool that can be invoked over MCP.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique tool name.
    fn name(&self) -> &str;

    /// Human-readable description shown to the calling model.
    fn description(&self) -> &str;

    /// JSON Schema describing the tool's parameters.
    fn parameters_schema(&self) -> Value;

    /// Execute the tool with the given arguments.
    async fn execute(&self, params: Value) -> Result<ToolOutput, ToolError>;
}

// Parameter extraction helpers shared by the tool implementations.

pub(crate) fn require_str<'a>(params: &'a Value, key: &str) -> Result<&'a str, ToolError> {
    params
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ToolError::InvalidParams(format!("'{key}' is required")))
}

pub(crate) fn optional_str<'a>(params: &'a Value, key: &str) -> Option<&'a str> {
    params
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
}

pub(crate) fn require_f64(params: &Value, key: &str) -> Result<f64, ToolError> {
    params
        .get(key)
        .and_then(Value::as_f64)
        .ok_or_else(|| ToolError::InvalidParams(format!("'{key}' must be a number")))
}

pub(crate) fn require_i64(params: &Value, key: &str) -> Result<i64, ToolError> {
    params
        .get(key)
        .and_then(Value::as_i64)
        .ok_or_else(|| ToolError::InvalidParams(format!("'{key}' must be an integer")))
}

pub(crate) fn optional_u32(params: &Value, key: &str) -> Result<Option<u32>, ToolError> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| ToolError::InvalidParams(format!("'{key}' must be a non-negative integer"))),
    }
}

/// Decode a JSON array-of-arrays into string rows. Numbers and booleans are
/// stringified; anything else is rejected.
pub(crate) fn rows_from_value(params: &Value, key: &str) -> Result<Vec<Vec<String>>, ToolError> {
    let Some(raw) = params.get(key) else {
        return Ok(Vec::new());
    };
    if raw.is_null() {
        return Ok(Vec::new());
    }
    let rows = raw
        .as_array()
        .ok_or_else(|| ToolError::InvalidParams(format!("'{key}' must be an array of rows")))?;

    rows.iter()
        .map(|row| {
            let cells = row.as_array().ok_or_else(|| {
                ToolError::InvalidParams(format!("'{key}' rows must be arrays of cells"))
            })?;
            cells
                .iter()
                .map(|cell| match cell {
                    Value::String(s) => Ok(s.clone()),
                    Value::Number(n) => Ok(n.to_string()),
                    Value::Bool(b) => Ok(b.to_string()),
                    Value::Null => Ok(String::new()),
                    _ => Err(ToolError::InvalidParams(format!(
                        "'{key}' cells must be strings, numbers, or booleans"
                    ))),
                })
                .collect()
        })
        .collect()
}
