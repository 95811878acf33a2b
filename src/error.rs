//! Error types for deskpilot.
//!
//! Infrastructure errors (`ConfigError`, `AuthError`, `ApiError`, `GeminiError`,
//! `ServerError`) stay close to the subsystem that produced them. `OpError` is
//! the operation-level taxonomy: every tool catches it at the façade boundary
//! and renders it as text for the MCP client, so no structured error crosses
//! the wire.

use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required setting '{key}'. {hint}")]
    MissingRequired { key: String, hint: String },

    #[error("Invalid value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to read configuration: {0}")]
    ParseError(String),
}

/// Authentication and identity errors.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Failed to read client credentials from {path}: {reason}")]
    CredentialsUnreadable { path: String, reason: String },

    #[error("Token cache at {path} is corrupt: {reason}")]
    TokenCacheCorrupt { path: String, reason: String },

    #[error("Failed to write token cache: {0}")]
    TokenCacheWrite(#[from] std::io::Error),

    #[error("OAuth flow failed: {0}")]
    FlowFailed(String),

    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),

    #[error("Unauthorized: only {expected} can use this server (logged in as {actual})")]
    UnauthorizedIdentity { expected: String, actual: String },

    #[error("Cannot verify authorized identity: {0}")]
    IdentityUnverifiable(String),

    #[error("No cached token and no way to run the browser flow: {0}")]
    NotAuthenticated(String),
}

/// Transport and service errors from the Google APIs.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{service} request failed: {reason}")]
    RequestFailed { service: String, reason: String },

    #[error("{service} returned HTTP {status}: {body}")]
    Status {
        service: String,
        status: u16,
        body: String,
    },

    #[error("{service} returned an unexpected response: {reason}")]
    InvalidResponse { service: String, reason: String },
}

/// Errors from the Gemini text-generation collaborator.
///
/// `Parse` is deliberately separate from the transport variants: a response
/// that arrived but did not contain a usable JSON array must be reported
/// distinctly from a request that never succeeded.
#[derive(Debug, Error)]
pub enum GeminiError {
    #[error("Gemini request failed: {0}")]
    Request(String),

    #[error("Gemini returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Gemini response did not contain valid slide data: {reason}")]
    Parse { reason: String, raw: String },
}

/// Operation-level error taxonomy for the tool façade.
#[derive(Debug, Error)]
pub enum OpError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Cannot apply {requested} leave days - only {available} working days left")]
    InsufficientBalance { requested: i64, available: f64 },

    #[error(transparent)]
    Upstream(#[from] ApiError),

    #[error(transparent)]
    Gemini(#[from] GeminiError),

    #[error(transparent)]
    Authorization(#[from] AuthError),
}

/// MCP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Failed to start server on {addr}: {reason}")]
    StartupFailed { addr: String, reason: String },

    #[error("Unknown session: {0}")]
    UnknownSession(String),
}
