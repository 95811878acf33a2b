//! JSON-RPC 2.0 message types and MCP method dispatch.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::tools::{ToolError, ToolRegistry};

pub const PROTOCOL_VERSION: &str = "2024-11-05";

pub const PARSE_ERROR: i64 = -32700;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;
pub const INTERNAL_ERROR: i64 = -32603;

/// An incoming JSON-RPC request or notification.
#[derive(Debug, Deserialize)]
pub struct RpcRequest {
    #[allow(dead_code)]
    pub jsonrpc: Option<String>,
    /// Absent for notifications, which get no response.
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

#[derive(Debug, Serialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct RpcResponse {
    pub jsonrpc: &'static str,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl RpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(RpcError {
                code,
                message: message.into(),
            }),
        }
    }
}

/// Handle one request. Returns `None` for notifications.
pub async fn dispatch(registry: &ToolRegistry, request: RpcRequest) -> Option<RpcResponse> {
    let Some(id) = request.id else {
        // Notifications (notifications/initialized and friends) are accepted
        // silently.
        tracing::debug!(method = %request.method, "notification received");
        return None;
    };

    let response = match request.method.as_str() {
        "initialize" => RpcResponse::success(
            id,
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": { "tools": {} },
                "serverInfo": {
                    "name": env!("CARGO_PKG_NAME"),
                    "version": env!("CARGO_PKG_VERSION"),
                },
            }),
        ),
        "ping" => RpcResponse::success(id, json!({})),
        "tools/list" => {
            let tools: Vec<Value> = registry
                .tool_definitions()
                .await
                .into_iter()
                .map(|def| {
                    json!({
                        "name": def.name,
                        "description": def.description,
                        "inputSchema": def.parameters,
                    })
                })
                .collect();
            RpcResponse::success(id, json!({ "tools": tools }))
        }
        "tools/call" => call_tool(registry, id, &request.params).await,
        other => RpcResponse::failure(
            id,
            METHOD_NOT_FOUND,
            format!("Method not found: {other}"),
        ),
    };

    Some(response)
}

async fn call_tool(registry: &ToolRegistry, id: Value, params: &Value) -> RpcResponse {
    let Some(name) = params.get("name").and_then(Value::as_str) else {
        return RpcResponse::failure(id, INVALID_PARAMS, "'name' is required");
    };
    let arguments = params.get("arguments").cloned().unwrap_or(json!({}));

    let Some(tool) = registry.get(name).await else {
        return RpcResponse::failure(id, INVALID_PARAMS, format!("Unknown tool: {name}"));
    };

    tracing::info!(tool = name, "tool call");
    match tool.execute(arguments).await {
        Ok(output) => RpcResponse::success(
            id,
            json!({
                "content": [{ "type": "text", "text": output.text }],
                "isError": output.is_error,
            }),
        ),
        Err(ToolError::InvalidParams(message)) => {
            RpcResponse::failure(id, INVALID_PARAMS, message)
        }
    }
}
