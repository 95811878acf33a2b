//! Deck operations against an in-memory Slides fake.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;

use deskpilot::auth::GoogleAuth;
use deskpilot::config::GoogleConfig;
use deskpilot::deck::{add_slide, plan_insertions, presentation_info};
use deskpilot::error::{ApiError, GeminiError};
use deskpilot::gemini::{SlideContent, SlideDrafter};
use deskpilot::google::slides::{
    Page, PageElement, Placeholder, Presentation, Shape, TextContent, TextElement, TextRun,
};
use deskpilot::google::{DriveClient, SheetsClient, SlideRequest, SlidesApi};
use deskpilot::tools::ai::GenerateSlidesTool;
use deskpilot::tools::{Services, Tool};

#[derive(Default)]
struct FakeSlides {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    presentations: HashMap<String, Presentation>,
    counter: usize,
    batches: Vec<Vec<SlideRequest>>,
}

fn placeholder(object_id: &str, kind: &str) -> PageElement {
    PageElement {
        object_id: object_id.to_string(),
        shape: Some(Shape {
            shape_type: Some("TEXT_BOX".to_string()),
            placeholder: Some(Placeholder {
                kind: Some(kind.to_string()),
            }),
            text: Some(TextContent {
                text_elements: Vec::new(),
            }),
        }),
    }
}

/// A TITLE_AND_BODY slide the way the service lays it out.
fn layout_slide(object_id: &str) -> Page {
    Page {
        object_id: object_id.to_string(),
        page_elements: vec![
            placeholder(&format!("{object_id}_title"), "TITLE"),
            placeholder(&format!("{object_id}_body"), "BODY"),
        ],
    }
}

impl FakeSlides {
    fn batches(&self) -> Vec<Vec<SlideRequest>> {
        self.inner.lock().unwrap().batches.clone()
    }

    fn creations(&self) -> usize {
        self.inner.lock().unwrap().counter
    }
}

/// A drafter whose model never produces usable JSON.
struct GarbageDrafter;

#[async_trait]
impl SlideDrafter for GarbageDrafter {
    async fn draft_slides(
        &self,
        _topic: &str,
        _slide_count: u32,
    ) -> Result<Vec<SlideContent>, GeminiError> {
        Err(GeminiError::Parse {
            reason: "expected a JSON array of {title, body}".to_string(),
            raw: "Sure! Here are your slides.".to_string(),
        })
    }

    async fn summarize_to_slides(
        &self,
        _text: &str,
        _slide_count: u32,
    ) -> Result<Vec<SlideContent>, GeminiError> {
        Err(GeminiError::Parse {
            reason: "expected a JSON array of {title, body}".to_string(),
            raw: "Sure! Here are your slides.".to_string(),
        })
    }
}

/// Wire a `Services` over the slide fake with real (but never-called) Drive
/// and Sheets clients, backed by throwaway on-disk credentials.
async fn drafting_services(slides: Arc<FakeSlides>) -> Arc<Services> {
    let dir = tempfile::tempdir().expect("tempdir");
    let creds = dir.path().join("client.json");
    std::fs::write(
        &creds,
        r#"{"installed":{"client_id":"id","client_secret":"secret"}}"#,
    )
    .expect("write credentials");

    let auth = Arc::new(
        GoogleAuth::new(GoogleConfig {
            credentials_path: creds,
            token_cache_path: dir.path().join("token.json"),
            authorized_email: None,
            scopes: Vec::new(),
        })
        .await
        .expect("auth"),
    );

    Arc::new(Services {
        drive: Arc::new(DriveClient::new(Arc::clone(&auth))),
        sheets: Arc::new(SheetsClient::new(auth)),
        slides,
        gemini: Some(Arc::new(GarbageDrafter)),
        tab: "Sheet1".to_string(),
    })
}

#[async_trait]
impl SlidesApi for FakeSlides {
    async fn create_presentation(&self, title: &str) -> Result<Presentation, ApiError> {
        let mut inner = self.inner.lock().unwrap();
        inner.counter += 1;
        let id = format!("pres_{}", inner.counter);
        let presentation = Presentation {
            presentation_id: id.clone(),
            title: Some(title.to_string()),
            // The service seeds every new presentation with one slide.
            slides: vec![layout_slide("scaffold")],
        };
        inner.presentations.insert(id.clone(), presentation.clone());
        Ok(presentation)
    }

    async fn get_presentation(&self, presentation_id: &str) -> Result<Presentation, ApiError> {
        self.inner
            .lock()
            .unwrap()
            .presentations
            .get(presentation_id)
            .cloned()
            .ok_or_else(|| ApiError::Status {
                service: "slides".to_string(),
                status: 404,
                body: format!("presentation {presentation_id} not found"),
            })
    }

    async fn batch_update(
        &self,
        presentation_id: &str,
        requests: Vec<SlideRequest>,
    ) -> Result<(), ApiError> {
        let mut inner = self.inner.lock().unwrap();
        inner.batches.push(requests.clone());
        let presentation =
            inner
                .presentations
                .get_mut(presentation_id)
                .ok_or_else(|| ApiError::Status {
                    service: "slides".to_string(),
                    status: 404,
                    body: format!("presentation {presentation_id} not found"),
                })?;

        for request in requests {
            match request {
                SlideRequest::CreateSlide {
                    object_id,
                    insertion_index,
                    ..
                } => {
                    let slide = layout_slide(&object_id);
                    match insertion_index {
                        Some(index) => {
                            let index = (index as usize).min(presentation.slides.len());
                            presentation.slides.insert(index, slide);
                        }
                        None => presentation.slides.push(slide),
                    }
                }
                SlideRequest::InsertText {
                    object_id, text, ..
                } => {
                    let element = presentation
                        .slides
                        .iter_mut()
                        .flat_map(|s| s.page_elements.iter_mut())
                        .find(|e| e.object_id == object_id)
                        .ok_or_else(|| ApiError::Status {
                            service: "slides".to_string(),
                            status: 400,
                            body: format!("object {object_id} not found"),
                        })?;
                    if let Some(shape) = &mut element.shape {
                        let content = shape.text.get_or_insert(TextContent {
                            text_elements: Vec::new(),
                        });
                        content.text_elements.push(TextElement {
                            text_run: Some(TextRun { content: text }),
                        });
                    }
                }
                SlideRequest::DeleteObject { object_id } => {
                    presentation.slides.retain(|s| s.object_id != object_id);
                }
            }
        }
        Ok(())
    }
}

fn item(title: &str, body: &str) -> SlideContent {
    SlideContent {
        title: title.to_string(),
        body: body.to_string(),
    }
}

/// Drive the create/populate sequence the deck builder performs, without the
/// Drive folder step: create, batch-create slides, fetch, plan, apply.
async fn populate(fake: &FakeSlides, title: &str, items: &[SlideContent]) -> String {
    let created = fake.create_presentation(title).await.unwrap();
    let id = created.presentation_id.clone();

    let creates: Vec<SlideRequest> = (0..items.len())
        .map(|i| SlideRequest::create_slide(format!("slide_{i}"), None))
        .collect();
    fake.batch_update(&id, creates).await.unwrap();

    let refreshed = fake.get_presentation(&id).await.unwrap();
    let inserts = plan_insertions(&refreshed, items);
    fake.batch_update(&id, inserts).await.unwrap();

    id
}

#[tokio::test]
async fn populated_deck_has_one_slide_per_item_and_no_scaffold() {
    let fake = FakeSlides::default();
    let items = [item("Intro", "- hello"), item("Detail", "- more"), item("Wrap", "- done")];

    let id = populate(&fake, "Quarterly Review", &items).await;

    let info = presentation_info(&fake, &id).await.unwrap();
    assert_eq!(info.title, "Quarterly Review");
    assert_eq!(info.slides.len(), 3);
    assert_eq!(info.slides[0].title, "Intro");
    assert_eq!(info.slides[1].title, "Detail");
    assert_eq!(info.slides[2].title, "Wrap");

    let presentation = fake.get_presentation(&id).await.unwrap();
    assert!(presentation.slides.iter().all(|s| s.object_id != "scaffold"));
}

#[tokio::test]
async fn slide_texts_land_in_title_and_body_placeholders() {
    let fake = FakeSlides::default();
    let items = [item("One", "- a\n- b")];

    let id = populate(&fake, "Deck", &items).await;
    let presentation = fake.get_presentation(&id).await.unwrap();

    let slide = &presentation.slides[0];
    assert_eq!(slide.object_id, "slide_0");
    assert_eq!(slide.page_elements[0].text(), "One");
    assert_eq!(slide.page_elements[1].text(), "- a\n- b");
}

#[tokio::test]
async fn scaffold_delete_is_the_last_request_of_the_batch() {
    let fake = FakeSlides::default();
    let items = [item("A", "1"), item("B", "2")];

    populate(&fake, "Deck", &items).await;

    let batches = fake.batches();
    let last_batch = batches.last().unwrap();
    assert_eq!(
        last_batch.last().unwrap(),
        &SlideRequest::delete_object("scaffold")
    );
    // Insertions come in item order before the delete.
    assert_eq!(last_batch[0], SlideRequest::insert_text("slide_0_title", "A"));
    assert_eq!(last_batch[2], SlideRequest::insert_text("slide_1_title", "B"));
}

#[tokio::test]
async fn add_slide_appends_by_default() {
    let fake = FakeSlides::default();
    let id = populate(&fake, "Deck", &[item("First", "1")]).await;

    let number = add_slide(&fake, &id, &item("Appended", "- new"), None)
        .await
        .unwrap();

    assert_eq!(number, 2);
    let info = presentation_info(&fake, &id).await.unwrap();
    assert_eq!(info.slides.len(), 2);
    assert_eq!(info.slides[1].title, "Appended");
}

#[tokio::test]
async fn add_slide_honors_position() {
    let fake = FakeSlides::default();
    let id = populate(&fake, "Deck", &[item("First", "1"), item("Second", "2")]).await;

    let number = add_slide(&fake, &id, &item("Inserted", "- mid"), Some(1))
        .await
        .unwrap();

    assert_eq!(number, 2);
    let info = presentation_info(&fake, &id).await.unwrap();
    let titles: Vec<&str> = info.slides.iter().map(|s| s.title.as_str()).collect();
    assert_eq!(titles, ["First", "Inserted", "Second"]);
}

#[tokio::test]
async fn info_reports_untitled_slides() {
    let fake = FakeSlides::default();
    let created = fake.create_presentation("Empty").await.unwrap();

    let info = presentation_info(&fake, &created.presentation_id)
        .await
        .unwrap();

    assert_eq!(info.slides.len(), 1);
    assert_eq!(info.slides[0].title, "(untitled)");
}

#[tokio::test]
async fn missing_presentation_surfaces_upstream_error() {
    let fake = FakeSlides::default();
    let err = presentation_info(&fake, "nope").await.unwrap_err();
    assert!(err.to_string().contains("404"));
}

#[tokio::test]
async fn malformed_generated_text_builds_no_deck() {
    let fake = Arc::new(FakeSlides::default());
    let services = drafting_services(Arc::clone(&fake)).await;
    let tool = GenerateSlidesTool::new(services);

    let output = tool
        .execute(json!({"topic": "Rust ownership"}))
        .await
        .unwrap();

    assert!(output.is_error);
    assert!(output.text.contains("slide data"));
    // Drafting failed, so no presentation was created or mutated.
    assert_eq!(fake.creations(), 0);
    assert!(fake.batches().is_empty());
}
