//! Gemini text-generation client.
//!
//! Used only to draft slide decks: the model is prompted to emit a JSON array
//! of `{title, body}` objects, which is parsed here into [`SlideContent`]
//! records. Models love wrapping JSON in markdown fences, so the extractor
//! strips them before parsing.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::config::GeminiConfig;
use crate::error::GeminiError;

/// Longest input accepted by the summarization prompt; anything beyond this
/// is truncated before it reaches the model.
const SUMMARIZE_INPUT_LIMIT: usize = 5000;

/// Title and body text for one slide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlideContent {
    pub title: String,
    pub body: String,
}

/// Drafting surface the AI tools depend on. Implemented by [`GeminiClient`]
/// for production and by in-memory fakes in tests.
#[async_trait]
pub trait SlideDrafter: Send + Sync {
    /// Ask the model for a deck outline on `topic`.
    async fn draft_slides(
        &self,
        topic: &str,
        slide_count: u32,
    ) -> Result<Vec<SlideContent>, GeminiError>;

    /// Summarize free-form text into a deck outline.
    async fn summarize_to_slides(
        &self,
        text: &str,
        slide_count: u32,
    ) -> Result<Vec<SlideContent>, GeminiError>;
}

pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    /// Build a client from configuration. `None` when no API key is set; the
    /// AI tools are then unavailable rather than failing at call time.
    pub fn from_config(config: &GeminiConfig) -> Option<Self> {
        let api_key = config.api_key()?.to_string();
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Some(Self {
            http,
            api_key,
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Send a single-turn prompt and return the first candidate's text.
    pub async fn generate(&self, prompt: &str) -> Result<String, GeminiError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });

        debug!(model = %self.model, "sending Gemini request");
        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| GeminiError::Request(e.to_string()))?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(GeminiError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        let parsed: GenerateResponse =
            serde_json::from_str(&text).map_err(|e| GeminiError::Parse {
                reason: format!("malformed response envelope: {e}"),
                raw: text.clone(),
            })?;

        parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or(GeminiError::Parse {
                reason: "response contained no candidates".to_string(),
                raw: text,
            })
    }

}

#[async_trait]
impl SlideDrafter for GeminiClient {
    async fn draft_slides(
        &self,
        topic: &str,
        slide_count: u32,
    ) -> Result<Vec<SlideContent>, GeminiError> {
        let prompt = slides_prompt(topic, slide_count);
        let raw = self.generate(&prompt).await?;
        parse_slide_array(&raw)
    }

    async fn summarize_to_slides(
        &self,
        text: &str,
        slide_count: u32,
    ) -> Result<Vec<SlideContent>, GeminiError> {
        let prompt = summarize_prompt(text, slide_count);
        let raw = self.generate(&prompt).await?;
        parse_slide_array(&raw)
    }
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Content,
}

#[derive(Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

fn slides_prompt(topic: &str, slide_count: u32) -> String {
    format!(
        "Create content for a {slide_count}-slide presentation about: {topic}\n\n\
         Respond with ONLY a JSON array, no other text. Each element must have \
         a \"title\" (short, under 10 words) and a \"body\" (2-4 bullet points \
         separated by newlines, each starting with \"- \").\n\n\
         Example format:\n\
         [{{\"title\": \"Introduction\", \"body\": \"- First point\\n- Second point\"}}]"
    )
}

fn summarize_prompt(text: &str, slide_count: u32) -> String {
    let truncated: String = text.chars().take(SUMMARIZE_INPUT_LIMIT).collect();
    format!(
        "Summarize the following text into a {slide_count}-slide presentation.\n\n\
         Respond with ONLY a JSON array, no other text. Each element must have \
         a \"title\" (short, under 10 words) and a \"body\" (2-4 bullet points \
         separated by newlines, each starting with \"- \").\n\n\
         Example format:\n\
         [{{\"title\": \"Key Findings\", \"body\": \"- First point\\n- Second point\"}}]\n\n\
         Text to summarize:\n{truncated}"
    )
}

/// Strip markdown code fences the model may have wrapped around its JSON.
fn extract_json_payload(raw: &str) -> &str {
    let trimmed = raw.trim();
    let trimmed = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    let trimmed = trimmed.strip_suffix("```").unwrap_or(trimmed);
    trimmed.trim()
}

/// Parse the model's output into slide records.
fn parse_slide_array(raw: &str) -> Result<Vec<SlideContent>, GeminiError> {
    let payload = extract_json_payload(raw);
    let slides: Vec<SlideContent> =
        serde_json::from_str(payload).map_err(|e| GeminiError::Parse {
            reason: format!("expected a JSON array of {{title, body}}: {e}"),
            raw: raw.to_string(),
        })?;
    if slides.is_empty() {
        return Err(GeminiError::Parse {
            reason: "model returned an empty slide array".to_string(),
            raw: raw.to_string(),
        });
    }
    Ok(slides)
}
