//! Google Drive v3 client: folder and document provisioning.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;

use crate::auth::GoogleAuth;
use crate::error::ApiError;
use crate::google::ApiTransport;

const BASE: &str = "https://www.googleapis.com/drive/v3";

pub const MIME_FOLDER: &str = "application/vnd.google-apps.folder";
pub const MIME_SPREADSHEET: &str = "application/vnd.google-apps.spreadsheet";

/// A created or looked-up Drive file.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,
    #[serde(default)]
    pub web_view_link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

pub struct DriveClient {
    api: ApiTransport,
}

impl DriveClient {
    pub fn new(auth: Arc<GoogleAuth>) -> Self {
        Self {
            api: ApiTransport::new(auth, "drive"),
        }
    }

    /// Find an existing folder by name, or create it. Returns the folder id.
    pub async fn find_or_create_folder(&self, name: &str) -> Result<String, ApiError> {
        let escaped = name.replace('\'', "\\'");
        let query = format!("name='{escaped}' and mimeType='{MIME_FOLDER}' and trashed=false");
        let url = format!(
            "{BASE}/files?q={}&fields=files(id)",
            urlencoding::encode(&query)
        );
        let list: FileList = self.api.get(&url).await?;

        if let Some(existing) = list.files.into_iter().next() {
            return Ok(existing.id);
        }

        let created = self.create_folder(name).await?;
        Ok(created.id)
    }

    /// Create a folder at the Drive root.
    pub async fn create_folder(&self, name: &str) -> Result<DriveFile, ApiError> {
        let url = format!("{BASE}/files?fields=id");
        self.api
            .post(
                &url,
                json!({
                    "name": name,
                    "mimeType": MIME_FOLDER,
                }),
            )
            .await
    }

    /// Create a Workspace document of the given MIME type inside a folder.
    pub async fn create_in_folder(
        &self,
        name: &str,
        mime_type: &str,
        folder_id: &str,
    ) -> Result<DriveFile, ApiError> {
        let url = format!("{BASE}/files?fields=id,webViewLink");
        self.api
            .post(
                &url,
                json!({
                    "name": name,
                    "mimeType": mime_type,
                    "parents": [folder_id],
                }),
            )
            .await
    }

    /// Move an existing file into a folder.
    pub async fn move_to_folder(&self, file_id: &str, folder_id: &str) -> Result<(), ApiError> {
        let url = format!("{BASE}/files/{file_id}?addParents={folder_id}&fields=id");
        let _: DriveFile = self.api.patch(&url, json!({})).await?;
        Ok(())
    }

    /// Fetch the browser link for a file.
    pub async fn web_view_link(&self, file_id: &str) -> Result<String, ApiError> {
        let url = format!("{BASE}/files/{file_id}?fields=id,webViewLink");
        let file: DriveFile = self.api.get(&url).await?;
        file.web_view_link.ok_or_else(|| ApiError::InvalidResponse {
            service: "drive".to_string(),
            reason: "missing webViewLink".to_string(),
        })
    }
}
