//! Google Slides v1 client and typed presentation structures.
//!
//! The API's loosely structured page tree is decoded into explicit records so
//! placeholder matching can run as a pure function over them (see the deck
//! module). [`SlidesApi`] is the seam for in-memory fakes.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::auth::GoogleAuth;
use crate::error::ApiError;
use crate::google::ApiTransport;

const BASE: &str = "https://slides.googleapis.com/v1/presentations";

/// Layout used for every content slide deskpilot creates.
pub const LAYOUT_TITLE_AND_BODY: &str = "TITLE_AND_BODY";

/// A presentation as returned by the service.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Presentation {
    pub presentation_id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub slides: Vec<Page>,
}

/// One slide.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub object_id: String,
    #[serde(default)]
    pub page_elements: Vec<PageElement>,
}

/// A child element of a slide (shape, image, ...). Only shapes carry text.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageElement {
    pub object_id: String,
    #[serde(default)]
    pub shape: Option<Shape>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shape {
    #[serde(default)]
    pub shape_type: Option<String>,
    #[serde(default)]
    pub placeholder: Option<Placeholder>,
    #[serde(default)]
    pub text: Option<TextContent>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Placeholder {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextContent {
    #[serde(default)]
    pub text_elements: Vec<TextElement>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextElement {
    #[serde(default)]
    pub text_run: Option<TextRun>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TextRun {
    #[serde(default)]
    pub content: String,
}

/// The semantic slot a text box occupies within a slide layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderRole {
    Title,
    Body,
    Other,
}

impl PlaceholderRole {
    /// Classify a layout placeholder type tag.
    pub fn classify(kind: Option<&str>) -> Self {
        match kind {
            Some("TITLE") | Some("CENTERED_TITLE") => PlaceholderRole::Title,
            Some("BODY") | Some("SUBTITLE") => PlaceholderRole::Body,
            _ => PlaceholderRole::Other,
        }
    }
}

impl PageElement {
    /// The element's placeholder role, `Other` for non-placeholder shapes.
    pub fn role(&self) -> PlaceholderRole {
        PlaceholderRole::classify(
            self.shape
                .as_ref()
                .and_then(|s| s.placeholder.as_ref())
                .and_then(|p| p.kind.as_deref()),
        )
    }

    /// Concatenated text content of the element's runs.
    pub fn text(&self) -> String {
        let Some(shape) = &self.shape else {
            return String::new();
        };
        let Some(text) = &shape.text else {
            return String::new();
        };
        text.text_elements
            .iter()
            .filter_map(|e| e.text_run.as_ref())
            .map(|r| r.content.as_str())
            .collect()
    }
}

/// A typed Slides batch-update request.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SlideRequest {
    #[serde(rename_all = "camelCase")]
    CreateSlide {
        object_id: String,
        slide_layout_reference: LayoutReference,
        #[serde(skip_serializing_if = "Option::is_none")]
        insertion_index: Option<u32>,
    },
    #[serde(rename_all = "camelCase")]
    InsertText {
        object_id: String,
        text: String,
        insertion_index: u32,
    },
    #[serde(rename_all = "camelCase")]
    DeleteObject { object_id: String },
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LayoutReference {
    pub predefined_layout: String,
}

impl SlideRequest {
    pub fn create_slide(object_id: impl Into<String>, insertion_index: Option<u32>) -> Self {
        SlideRequest::CreateSlide {
            object_id: object_id.into(),
            slide_layout_reference: LayoutReference {
                predefined_layout: LAYOUT_TITLE_AND_BODY.to_string(),
            },
            insertion_index,
        }
    }

    pub fn insert_text(object_id: impl Into<String>, text: impl Into<String>) -> Self {
        SlideRequest::InsertText {
            object_id: object_id.into(),
            text: text.into(),
            insertion_index: 0,
        }
    }

    pub fn delete_object(object_id: impl Into<String>) -> Self {
        SlideRequest::DeleteObject {
            object_id: object_id.into(),
        }
    }
}

/// Operations the deck builder needs from a slide-deck backend.
#[async_trait]
pub trait SlidesApi: Send + Sync {
    /// Create a blank presentation (the service seeds it with one scaffold
    /// slide).
    async fn create_presentation(&self, title: &str) -> Result<Presentation, ApiError>;

    /// Fetch the full slide/element structure.
    async fn get_presentation(&self, presentation_id: &str) -> Result<Presentation, ApiError>;

    /// Apply all requests in one batched mutation.
    async fn batch_update(
        &self,
        presentation_id: &str,
        requests: Vec<SlideRequest>,
    ) -> Result<(), ApiError>;
}

pub struct SlidesClient {
    api: ApiTransport,
}

impl SlidesClient {
    pub fn new(auth: Arc<GoogleAuth>) -> Self {
        Self {
            api: ApiTransport::new(auth, "slides"),
        }
    }
}

#[async_trait]
impl SlidesApi for SlidesClient {
    async fn create_presentation(&self, title: &str) -> Result<Presentation, ApiError> {
        self.api.post(BASE, json!({ "title": title })).await
    }

    async fn get_presentation(&self, presentation_id: &str) -> Result<Presentation, ApiError> {
        let url = format!("{BASE}/{presentation_id}");
        self.api.get(&url).await
    }

    async fn batch_update(
        &self,
        presentation_id: &str,
        requests: Vec<SlideRequest>,
    ) -> Result<(), ApiError> {
        if requests.is_empty() {
            return Ok(());
        }
        let url = format!("{BASE}/{presentation_id}:batchUpdate");
        let _: serde_json::Value = self.api.post(&url, json!({ "requests": requests })).await?;
        Ok(())
    }
}
