//! Slide deck construction.
//!
//! Deck building runs in two mutation round trips: one batch creates every
//! content slide, then after a structure fetch a second batch fills the
//! placeholders and deletes the scaffold slide the service seeded the
//! presentation with. The placeholder mapping itself is a pure function
//! ([`plan_insertions`]) so it can be tested without a live service.

use tracing::info;
use uuid::Uuid;

use crate::error::OpError;
use crate::gemini::SlideContent;
use crate::google::drive::DriveClient;
use crate::google::{PlaceholderRole, Presentation, SlideRequest, SlidesApi};

/// A freshly built presentation.
#[derive(Debug, Clone)]
pub struct CreatedDeck {
    pub presentation_id: String,
    pub link: String,
    pub slide_count: usize,
}

/// One slide in a structural summary.
#[derive(Debug, Clone)]
pub struct SlideSummary {
    /// 1-based position in the deck.
    pub number: usize,
    pub title: String,
}

/// Structural summary of an existing presentation.
#[derive(Debug, Clone)]
pub struct PresentationInfo {
    pub presentation_id: String,
    pub title: String,
    pub slides: Vec<SlideSummary>,
}

/// Browser link for a presentation.
pub fn deck_link(presentation_id: &str) -> String {
    format!("https://docs.google.com/presentation/d/{presentation_id}/edit")
}

/// Map content items onto the slides of a freshly created deck.
///
/// Item `i` targets slide `i + 1`: slide 0 is the scaffold the service
/// seeded, and the content slides were appended after it in order. For each
/// item the first title-role and first body-role placeholder on the target
/// slide receive the text; a slide missing a role silently drops that half of
/// the item. The scaffold delete is appended last so the batch leaves a clean
/// deck behind.
pub fn plan_insertions(presentation: &Presentation, items: &[SlideContent]) -> Vec<SlideRequest> {
    let mut requests = Vec::new();

    for (i, item) in items.iter().enumerate() {
        let Some(slide) = presentation.slides.get(i + 1) else {
            continue;
        };

        let title_box = slide
            .page_elements
            .iter()
            .find(|e| e.role() == PlaceholderRole::Title);
        let body_box = slide
            .page_elements
            .iter()
            .find(|e| e.role() == PlaceholderRole::Body);

        if let Some(element) = title_box {
            requests.push(SlideRequest::insert_text(
                element.object_id.clone(),
                item.title.clone(),
            ));
        }
        if let Some(element) = body_box {
            requests.push(SlideRequest::insert_text(
                element.object_id.clone(),
                item.body.clone(),
            ));
        }
    }

    if let Some(scaffold) = presentation.slides.first() {
        requests.push(SlideRequest::delete_object(scaffold.object_id.clone()));
    }

    requests
}

/// Create a presentation in `folder_name` and populate one slide per item.
pub async fn build_deck(
    drive: &DriveClient,
    slides: &dyn SlidesApi,
    folder_name: &str,
    title: &str,
    items: &[SlideContent],
) -> Result<CreatedDeck, OpError> {
    if items.is_empty() {
        return Err(OpError::InvalidArgument(
            "a presentation needs at least one slide".to_string(),
        ));
    }

    let folder_id = drive.find_or_create_folder(folder_name).await?;
    let created = slides.create_presentation(title).await?;
    let presentation_id = created.presentation_id.clone();
    drive.move_to_folder(&presentation_id, &folder_id).await?;

    let creates: Vec<SlideRequest> = (0..items.len())
        .map(|i| SlideRequest::create_slide(format!("slide_{i}"), None))
        .collect();
    slides.batch_update(&presentation_id, creates).await?;

    let refreshed = slides.get_presentation(&presentation_id).await?;
    let inserts = plan_insertions(&refreshed, items);
    slides.batch_update(&presentation_id, inserts).await?;

    info!(title, slides = items.len(), "presentation created");
    Ok(CreatedDeck {
        link: deck_link(&presentation_id),
        presentation_id,
        slide_count: items.len(),
    })
}

/// Append (or insert at `position`) one slide to an existing presentation.
/// Returns the new slide's 1-based position.
pub async fn add_slide(
    slides: &dyn SlidesApi,
    presentation_id: &str,
    content: &SlideContent,
    position: Option<u32>,
) -> Result<usize, OpError> {
    let object_id = format!("slide_{}", Uuid::new_v4().simple());
    slides
        .batch_update(
            presentation_id,
            vec![SlideRequest::create_slide(object_id.clone(), position)],
        )
        .await?;

    let refreshed = slides.get_presentation(presentation_id).await?;
    let (index, slide) = refreshed
        .slides
        .iter()
        .enumerate()
        .find(|(_, s)| s.object_id == object_id)
        .ok_or_else(|| OpError::NotFound("created slide missing from presentation".to_string()))?;

    let mut requests = Vec::new();
    if let Some(element) = slide
        .page_elements
        .iter()
        .find(|e| e.role() == PlaceholderRole::Title)
    {
        requests.push(SlideRequest::insert_text(
            element.object_id.clone(),
            content.title.clone(),
        ));
    }
    if let Some(element) = slide
        .page_elements
        .iter()
        .find(|e| e.role() == PlaceholderRole::Body)
    {
        requests.push(SlideRequest::insert_text(
            element.object_id.clone(),
            content.body.clone(),
        ));
    }
    slides.batch_update(presentation_id, requests).await?;

    Ok(index + 1)
}

/// Fetch a structural summary: deck title plus each slide's title text.
pub async fn presentation_info(
    slides: &dyn SlidesApi,
    presentation_id: &str,
) -> Result<PresentationInfo, OpError> {
    let presentation = slides.get_presentation(presentation_id).await?;

    let summaries = presentation
        .slides
        .iter()
        .enumerate()
        .map(|(i, slide)| {
            let title = slide
                .page_elements
                .iter()
                .find(|e| e.role() == PlaceholderRole::Title)
                .map(|e| e.text().trim().to_string())
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| "(untitled)".to_string());
            SlideSummary {
                number: i + 1,
                title,
            }
        })
        .collect();

    Ok(PresentationInfo {
        presentation_id: presentation.presentation_id,
        title: presentation.title.unwrap_or_else(|| "Untitled".to_string()),
        slides: summaries,
    })
}
