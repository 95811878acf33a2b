//! MCP server over SSE.
//!
//! Clients open `GET /sse`, receive an `endpoint` event naming the POST URL
//! for their session, and then send JSON-RPC requests to
//! `POST /messages?session_id=...`. Responses travel back over the session's
//! SSE stream as `message` events; the POST itself only acknowledges receipt.

pub mod rpc;

use std::collections::HashMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use tokio::sync::{mpsc, oneshot, RwLock};
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use uuid::Uuid;

use crate::error::ServerError;
use crate::tools::ToolRegistry;

/// Shared state for all MCP handlers.
pub struct McpState {
    registry: Arc<ToolRegistry>,
    sessions: RwLock<HashMap<Uuid, mpsc::Sender<String>>>,
    /// Shutdown signal sender.
    pub shutdown_tx: RwLock<Option<oneshot::Sender<()>>>,
}

impl McpState {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            registry,
            sessions: RwLock::new(HashMap::new()),
            shutdown_tx: RwLock::new(None),
        }
    }

    /// Trigger graceful shutdown, if the server is running.
    pub async fn shutdown(&self) {
        if let Some(tx) = self.shutdown_tx.write().await.take() {
            let _ = tx.send(());
        }
    }
}

/// Start the MCP server.
///
/// Returns the actual bound `SocketAddr` (useful when binding to port 0).
pub async fn start_server(
    addr: SocketAddr,
    state: Arc<McpState>,
) -> Result<SocketAddr, ServerError> {
    let listener =
        tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::StartupFailed {
                addr: addr.to_string(),
                reason: format!("Failed to bind: {e}"),
            })?;
    let bound_addr = listener
        .local_addr()
        .map_err(|e| ServerError::StartupFailed {
            addr: addr.to_string(),
            reason: format!("Failed to get local addr: {e}"),
        })?;

    let app = Router::new()
        .route("/sse", get(sse_handler))
        .route("/messages", post(messages_handler))
        .route("/health", get(health_handler))
        .with_state(state.clone());

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    *state.shutdown_tx.write().await = Some(shutdown_tx);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                tracing::info!("MCP server shutting down");
            })
            .await
        {
            tracing::error!("MCP server error: {}", e);
        }
    });

    Ok(bound_addr)
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "server": env!("CARGO_PKG_NAME"),
    }))
}

async fn sse_handler(
    State(state): State<Arc<McpState>>,
) -> Sse<impl futures::Stream<Item = Result<Event, Infallible>> + Send + 'static> {
    let session_id = Uuid::new_v4();
    let (tx, rx) = mpsc::channel::<String>(32);
    state.sessions.write().await.insert(session_id, tx);
    tracing::info!(%session_id, "SSE session opened");

    let endpoint = futures::stream::once(async move {
        Ok(Event::default()
            .event("endpoint")
            .data(format!("/messages?session_id={session_id}")))
    });

    let messages =
        ReceiverStream::new(rx).map(|data| Ok(Event::default().event("message").data(data)));

    Sse::new(endpoint.chain(messages)).keep_alive(
        KeepAlive::new()
            .interval(std::time::Duration::from_secs(15))
            .text(""),
    )
}

#[derive(Deserialize)]
struct SessionQuery {
    session_id: String,
}

async fn messages_handler(
    State(state): State<Arc<McpState>>,
    Query(query): Query<SessionQuery>,
    body: String,
) -> impl IntoResponse {
    let Ok(session_id) = Uuid::parse_str(&query.session_id) else {
        return (StatusCode::BAD_REQUEST, "Invalid session_id".to_string());
    };

    let Some(tx) = state.sessions.read().await.get(&session_id).cloned() else {
        let err = ServerError::UnknownSession(session_id.to_string());
        return (StatusCode::NOT_FOUND, err.to_string());
    };

    let request: rpc::RpcRequest = match serde_json::from_str(&body) {
        Ok(request) => request,
        Err(e) => {
            // No usable request id, so the parse error goes back on the
            // stream with a null id.
            let response = rpc::RpcResponse::failure(
                serde_json::Value::Null,
                rpc::PARSE_ERROR,
                format!("Parse error: {e}"),
            );
            push_response(&state, session_id, &tx, response).await;
            return (StatusCode::ACCEPTED, "Accepted".to_string());
        }
    };

    if let Some(response) = rpc::dispatch(&state.registry, request).await {
        push_response(&state, session_id, &tx, response).await;
    }

    (StatusCode::ACCEPTED, "Accepted".to_string())
}

async fn push_response(
    state: &McpState,
    session_id: Uuid,
    tx: &mpsc::Sender<String>,
    response: rpc::RpcResponse,
) {
    let data = match serde_json::to_string(&response) {
        Ok(data) => data,
        Err(e) => {
            tracing::error!(%session_id, "failed to serialize response: {e}");
            return;
        }
    };

    if tx.send(data).await.is_err() {
        // Client went away; drop the session.
        state.sessions.write().await.remove(&session_id);
        tracing::info!(%session_id, "SSE session closed");
    }
}
