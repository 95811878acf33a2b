//! Presentation tools.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::deck::{add_slide, build_deck, presentation_info};
use crate::gemini::SlideContent;
use crate::tools::tool::{
    optional_str, optional_u32, require_str, Tool, ToolError, ToolOutput,
};
use crate::tools::{render_err, Services};

pub(crate) const DEFAULT_FOLDER: &str = "AI Presentations";

fn slide_items(params: &Value, key: &str) -> Result<Vec<SlideContent>, ToolError> {
    let raw = params
        .get(key)
        .cloned()
        .ok_or_else(|| ToolError::InvalidParams(format!("'{key}' is required")))?;
    let items: Vec<SlideContent> = serde_json::from_value(raw).map_err(|e| {
        ToolError::InvalidParams(format!(
            "'{key}' must be an array of {{title, body}} objects: {e}"
        ))
    })?;
    if items.is_empty() {
        return Err(ToolError::InvalidParams(format!(
            "'{key}' must contain at least one slide"
        )));
    }
    Ok(items)
}

/// Create a presentation from explicit slide content.
pub struct CreateSlidesTool {
    services: Arc<Services>,
}

impl CreateSlidesTool {
    pub fn new(services: Arc<Services>) -> Self {
        Self { services }
    }
}

#[async_trait]
impl Tool for CreateSlidesTool {
    fn name(&self) -> &str {
        "create_slides"
    }

    fn description(&self) -> &str {
        "Create a Google Slides presentation in a Drive folder with one TITLE_AND_BODY \
         slide per item. Each item fills the slide's title and body placeholders."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "title": {
                    "type": "string",
                    "description": "Presentation title"
                },
                "slides": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "title": { "type": "string" },
                            "body": { "type": "string" }
                        },
                        "required": ["title", "body"]
                    },
                    "description": "Slide content, one object per slide"
                },
                "folder_name": {
                    "type": "string",
                    "description": "Drive folder to place it in (created if missing, default 'AI Presentations')"
                }
            },
            "required": ["title", "slides"]
        })
    }

    async fn execute(&self, params: Value) -> Result<ToolOutput, ToolError> {
        let title = require_str(&params, "title")?;
        let folder_name = optional_str(&params, "folder_name").unwrap_or(DEFAULT_FOLDER);
        let items = slide_items(&params, "slides")?;

        match build_deck(
            &self.services.drive,
            self.services.slides.as_ref(),
            folder_name,
            title,
            &items,
        )
        .await
        {
            Ok(deck) => Ok(ToolOutput::text(format!(
                "✅ Created presentation '{title}' with {} slide(s)\n🔗 {}",
                deck.slide_count, deck.link
            ))),
            Err(e) => Ok(render_err(e)),
        }
    }
}

/// Add one slide to an existing presentation.
pub struct AddSlideTool {
    services: Arc<Services>,
}

impl AddSlideTool {
    pub fn new(services: Arc<Services>) -> Self {
        Self { services }
    }
}

#[async_trait]
impl Tool for AddSlideTool {
    fn name(&self) -> &str {
        "add_slide"
    }

    fn description(&self) -> &str {
        "Add a TITLE_AND_BODY slide to an existing presentation, appended at the end or \
         inserted at a 0-based position."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "presentation_id": {
                    "type": "string",
                    "description": "Id of the presentation to modify"
                },
                "title": {
                    "type": "string",
                    "description": "Slide title"
                },
                "body": {
                    "type": "string",
                    "description": "Slide body text"
                },
                "position": {
                    "type": "integer",
                    "description": "Optional 0-based insertion index (default: append)"
                }
            },
            "required": ["presentation_id", "title", "body"]
        })
    }

    async fn execute(&self, params: Value) -> Result<ToolOutput, ToolError> {
        let presentation_id = require_str(&params, "presentation_id")?;
        let title = require_str(&params, "title")?;
        let body = params
            .get("body")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::InvalidParams("'body' is required".to_string()))?;
        let position = optional_u32(&params, "position")?;

        let content = SlideContent {
            title: title.to_string(),
            body: body.to_string(),
        };

        match add_slide(
            self.services.slides.as_ref(),
            presentation_id,
            &content,
            position,
        )
        .await
        {
            Ok(number) => Ok(ToolOutput::text(format!(
                "✅ Added slide '{title}' as slide {number}"
            ))),
            Err(e) => Ok(render_err(e)),
        }
    }
}

/// Summarize a presentation's structure.
pub struct PresentationInfoTool {
    services: Arc<Services>,
}

impl PresentationInfoTool {
    pub fn new(services: Arc<Services>) -> Self {
        Self { services }
    }
}

#[async_trait]
impl Tool for PresentationInfoTool {
    fn name(&self) -> &str {
        "get_presentation_info"
    }

    fn description(&self) -> &str {
        "List a presentation's title and the title of each slide."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "presentation_id": {
                    "type": "string",
                    "description": "Id of the presentation to inspect"
                }
            },
            "required": ["presentation_id"]
        })
    }

    async fn execute(&self, params: Value) -> Result<ToolOutput, ToolError> {
        let presentation_id = require_str(&params, "presentation_id")?;

        match presentation_info(self.services.slides.as_ref(), presentation_id).await {
            Ok(info) => {
                let mut out = format!(
                    "Presentation: {} ({})\nSlides: {}",
                    info.title,
                    info.presentation_id,
                    info.slides.len()
                );
                for slide in &info.slides {
                    out.push_str(&format!("\n  {}. {}", slide.number, slide.title));
                }
                Ok(ToolOutput::text(out))
            }
            Err(e) => Ok(render_err(e)),
        }
    }
}
