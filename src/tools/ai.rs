//! Gemini-backed presentation tools.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::deck::build_deck;
use crate::tools::slides::DEFAULT_FOLDER;
use crate::tools::tool::{optional_str, optional_u32, require_str, Tool, ToolError, ToolOutput};
use crate::tools::{render_err, Services};

const DEFAULT_SLIDE_COUNT: u32 = 5;
const MAX_SLIDE_COUNT: u32 = 20;

fn slide_count(params: &Value) -> Result<u32, ToolError> {
    let count = optional_u32(params, "num_slides")?.unwrap_or(DEFAULT_SLIDE_COUNT);
    if count == 0 || count > MAX_SLIDE_COUNT {
        return Err(ToolError::InvalidParams(format!(
            "'num_slides' must be between 1 and {MAX_SLIDE_COUNT}"
        )));
    }
    Ok(count)
}

fn gemini_unavailable() -> ToolOutput {
    ToolOutput::error(
        "❌ AI slide generation is unavailable: GEMINI_API_KEY is not configured".to_string(),
    )
}

/// Generate a presentation about a topic.
pub struct GenerateSlidesTool {
    services: Arc<Services>,
}

impl GenerateSlidesTool {
    pub fn new(services: Arc<Services>) -> Self {
        Self { services }
    }
}

#[async_trait]
impl Tool for GenerateSlidesTool {
    fn name(&self) -> &str {
        "generate_slides"
    }

    fn description(&self) -> &str {
        "Generate a Google Slides presentation about a topic. Gemini drafts the slide \
         titles and bullet points, then the deck is built in Drive."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "topic": {
                    "type": "string",
                    "description": "What the presentation should cover"
                },
                "num_slides": {
                    "type": "integer",
                    "description": "How many slides to generate (default 5, max 20)"
                },
                "title": {
                    "type": "string",
                    "description": "Presentation title (default: the topic)"
                },
                "folder_name": {
                    "type": "string",
                    "description": "Drive folder to place it in (default 'AI Presentations')"
                }
            },
            "required": ["topic"]
        })
    }

    async fn execute(&self, params: Value) -> Result<ToolOutput, ToolError> {
        let topic = require_str(&params, "topic")?;
        let count = slide_count(&params)?;
        let title = optional_str(&params, "title").unwrap_or(topic);
        let folder_name = optional_str(&params, "folder_name").unwrap_or(DEFAULT_FOLDER);

        let Some(gemini) = &self.services.gemini else {
            return Ok(gemini_unavailable());
        };

        let items = match gemini.draft_slides(topic, count).await {
            Ok(items) => items,
            Err(e) => return Ok(render_err(e.into())),
        };

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
                "✅ Generated presentation '{title}' with {} slide(s) about '{topic}'\n🔗 {}",
                deck.slide_count, deck.link
            ))),
            Err(e) => Ok(render_err(e)),
        }
    }
}

/// Turn free-form text into a presentation.
pub struct SummarizeToSlidesTool {
    services: Arc<Services>,
}

impl SummarizeToSlidesTool {
    pub fn new(services: Arc<Services>) -> Self {
        Self { services }
    }
}

#[async_trait]
impl Tool for SummarizeToSlidesTool {
    fn name(&self) -> &str {
        "summarize_to_slides"
    }

    fn description(&self) -> &str {
        "Summarize a block of text into a Google Slides presentation. Long input is \
         truncated before summarization."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "text": {
                    "type": "string",
                    "description": "Text to summarize"
                },
                "num_slides": {
                    "type": "integer",
                    "description": "How many slides to produce (default 5, max 20)"
                },
                "title": {
                    "type": "string",
                    "description": "Presentation title (default 'Summary')"
                },
                "folder_name": {
                    "type": "string",
                    "description": "Drive folder to place it in (default 'AI Presentations')"
                }
            },
            "required": ["text"]
        })
    }

    async fn execute(&self, params: Value) -> Result<ToolOutput, ToolError> {
        let text = require_str(&params, "text")?;
        let count = slide_count(&params)?;
        let title = optional_str(&params, "title").unwrap_or("Summary");
        let folder_name = optional_str(&params, "folder_name").unwrap_or(DEFAULT_FOLDER);

        let Some(gemini) = &self.services.gemini else {
            return Ok(gemini_unavailable());
        };

        let items = match gemini.summarize_to_slides(text, count).await {
            Ok(items) => items,
            Err(e) => return Ok(render_err(e.into())),
        };

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
                "✅ Summarized into presentation '{title}' with {} slide(s)\n🔗 {}",
                deck.slide_count, deck.link
            ))),
            Err(e) => Ok(render_err(e)),
        }
    }
}
