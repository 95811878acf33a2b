//! Typed clients for the Google Workspace APIs.
//!
//! Each client wraps one service (Drive, Sheets, Slides) and shares the
//! bearer-token plumbing in [`ApiTransport`]. The Sheets and Slides clients
//! sit behind traits so the row-update engine and slide mapper can be tested
//! against in-memory fakes.

pub mod drive;
pub mod sheets;
pub mod slides;

pub use drive::DriveClient;
pub use sheets::{FormulaWrite, SheetsApi, SheetsClient, ValueRender, ValueWrite};
pub use slides::{
    Page, PageElement, PlaceholderRole, Presentation, SlideRequest, SlidesApi, SlidesClient,
};

use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::auth::GoogleAuth;
use crate::error::ApiError;

/// HTTP transport shared by the Google API clients: injects the bearer token,
/// maps statuses, decodes JSON.
pub(crate) struct ApiTransport {
    http: reqwest::Client,
    auth: Arc<GoogleAuth>,
    service: &'static str,
}

impl ApiTransport {
    pub(crate) fn new(auth: Arc<GoogleAuth>, service: &'static str) -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            http,
            auth,
            service,
        }
    }

    pub(crate) async fn get<R: DeserializeOwned>(&self, url: &str) -> Result<R, ApiError> {
        self.request(reqwest::Method::GET, url, None).await
    }

    pub(crate) async fn post<R: DeserializeOwned>(
        &self,
        url: &str,
        body: serde_json::Value,
    ) -> Result<R, ApiError> {
        self.request(reqwest::Method::POST, url, Some(body)).await
    }

    pub(crate) async fn put<R: DeserializeOwned>(
        &self,
        url: &str,
        body: serde_json::Value,
    ) -> Result<R, ApiError> {
        self.request(reqwest::Method::PUT, url, Some(body)).await
    }

    pub(crate) async fn patch<R: DeserializeOwned>(
        &self,
        url: &str,
        body: serde_json::Value,
    ) -> Result<R, ApiError> {
        self.request(reqwest::Method::PATCH, url, Some(body)).await
    }

    async fn request<R: DeserializeOwned>(
        &self,
        method: reqwest::Method,
        url: &str,
        body: Option<serde_json::Value>,
    ) -> Result<R, ApiError> {
        let token = self
            .auth
            .bearer_token()
            .await
            .map_err(|e| ApiError::RequestFailed {
                service: self.service.to_string(),
                reason: e.to_string(),
            })?;

        tracing::debug!("{} {} {}", self.service, method, url);

        let mut req = self.http.request(method, url).bearer_auth(token);
        if let Some(body) = body {
            req = req.json(&body);
        }

        let response = req.send().await.map_err(|e| ApiError::RequestFailed {
            service: self.service.to_string(),
            reason: e.to_string(),
        })?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(ApiError::Status {
                service: self.service.to_string(),
                status: status.as_u16(),
                body: text,
            });
        }

        serde_json::from_str(&text).map_err(|e| ApiError::InvalidResponse {
            service: self.service.to_string(),
            reason: format!("JSON parse error: {e}"),
        })
    }
}
