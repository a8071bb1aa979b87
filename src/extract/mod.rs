//! Turns raw scan content into a best-effort draft.
//!
//! HTML goes through a chain of extractors ordered by reliability:
//! JSON-LD structured data, then recipe-card class heuristics, then a
//! plain-text pass over the page body. Photographed pages go through the
//! text-recognition capability and the same plain-text classifier.

use log::debug;
use scraper::{Html, Selector};

use crate::error::{ExtractError, ExtractWarning};
use crate::model::{RawContent, RawDraft};
use crate::ocr::TextRecognizer;

mod html_class;
mod json_ld;
pub(crate) mod text_blocks;

pub use html_class::HtmlClassExtractor;
pub use json_ld::JsonLdExtractor;

/// Parsed page handed to each HTML extractor in turn
pub struct ParseContext {
    pub url: String,
    pub document: Html,
}

/// One strategy for reading a draft out of an HTML document. Returning
/// `ExtractError::Unrecognized` just means "not my kind of page"; the
/// next extractor in the chain gets its chance.
pub trait HtmlExtractor {
    fn parse(&self, context: &ParseContext) -> Result<RawDraft, ExtractError>;
}

/// Dispatches extraction over the source kind. The text recognizer is
/// optional; without one, image scans fail up front instead of half-way.
pub struct Extractor {
    recognizer: Option<Box<dyn TextRecognizer>>,
}

impl Default for Extractor {
    fn default() -> Self {
        Extractor::new()
    }
}

impl Extractor {
    pub fn new() -> Self {
        Extractor { recognizer: None }
    }

    pub fn with_recognizer(recognizer: Box<dyn TextRecognizer>) -> Self {
        Extractor {
            recognizer: Some(recognizer),
        }
    }

    /// Produce a draft plus warnings for the sections the source did not
    /// yield. Only a source with neither ingredients nor steps is an error.
    pub async fn extract(
        &self,
        content: RawContent,
    ) -> Result<(RawDraft, Vec<ExtractWarning>), ExtractError> {
        match content {
            RawContent::Html { url, body } => extract_html(&url, &body),
            RawContent::Image { bytes } => {
                let recognizer = self.recognizer.as_ref().ok_or_else(|| {
                    ExtractError::Recognizer(
                        "no text-recognition capability is configured".to_string(),
                    )
                })?;
                let text = recognizer.recognize(&bytes).await?;
                finalize(text_blocks::classify(&text))
            }
        }
    }
}

fn extract_html(url: &str, body: &str) -> Result<(RawDraft, Vec<ExtractWarning>), ExtractError> {
    let context = ParseContext {
        url: url.to_string(),
        document: Html::parse_document(body),
    };

    let extractors: Vec<Box<dyn HtmlExtractor>> =
        vec![Box::new(JsonLdExtractor), Box::new(HtmlClassExtractor)];

    for extractor in &extractors {
        if let Ok(mut draft) = extractor.parse(&context) {
            fill_meta_fallbacks(&mut draft, &context.document);
            return finalize(draft);
        }
    }

    // Last resort: classify the page body as plain text
    debug!("No structured extractor matched {}, using body text", url);
    let mut draft = text_blocks::classify(&body_text(&context.document));
    fill_meta_fallbacks(&mut draft, &context.document);
    finalize(draft)
}

/// Backfill title and description from page metadata when the extractor
/// came up empty: og:title, then the first heading, then `<title>`;
/// meta description, then og:description.
fn fill_meta_fallbacks(draft: &mut RawDraft, document: &Html) {
    if draft.title.as_deref().map_or(true, |t| t.trim().is_empty()) {
        draft.title = meta_content(document, "meta[property='og:title']")
            .or_else(|| {
                let selector = Selector::parse("h1, h2").expect("valid selector");
                document
                    .select(&selector)
                    .map(|el| el.text().collect::<Vec<_>>().join(" ").trim().to_string())
                    .find(|text| text.len() > 3)
            })
            .or_else(|| {
                let selector = Selector::parse("title").expect("valid selector");
                document
                    .select(&selector)
                    .next()
                    .map(|el| el.text().collect::<String>().trim().to_string())
                    .filter(|t| !t.is_empty())
            });
    }

    if draft.description.is_none() {
        draft.description = meta_content(document, "meta[name='description']")
            .or_else(|| meta_content(document, "meta[property='og:description']"));
    }
}

fn meta_content(document: &Html, selector_str: &str) -> Option<String> {
    let selector = Selector::parse(selector_str).ok()?;
    document
        .select(&selector)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(|content| content.trim().to_string())
        .filter(|content| !content.is_empty())
}

/// Page body as newline-separated text nodes, the shape the plain-text
/// classifier expects
fn body_text(document: &Html) -> String {
    let selector = Selector::parse("body").expect("valid selector");
    document
        .select(&selector)
        .next()
        .map(|body| {
            body.text()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
                .join("\n")
        })
        .unwrap_or_default()
}

fn finalize(draft: RawDraft) -> Result<(RawDraft, Vec<ExtractWarning>), ExtractError> {
    if draft.ingredient_lines.is_empty() && draft.step_lines.is_empty() {
        return Err(ExtractError::Unrecognized);
    }

    let mut warnings = Vec::new();
    if draft.ingredient_lines.is_empty() {
        warnings.push(ExtractWarning::MissingIngredients);
    }
    if draft.step_lines.is_empty() {
        warnings.push(ExtractWarning::MissingSteps);
    }

    Ok((draft, warnings))
}
