pub mod commit;
pub mod config;
pub mod draft;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod model;
pub mod normalize;
pub mod ocr;
pub mod session;

use log::debug;

pub use crate::commit::{CommitCoordinator, HttpRecipeStore, RecipeStore};
pub use crate::config::ScanConfig;
pub use crate::draft::{DraftField, DraftStore, IngredientPatch};
pub use crate::error::{
    CommitError, ExtractError, ExtractWarning, FetchError, ScanError, Stage, StoreError,
};
pub use crate::extract::Extractor;
pub use crate::fetch::SourceFetcher;
pub use crate::model::{
    IngredientDraftLine, RawContent, RawDraft, RecipeDraft, ScanRequest, StepDraftLine,
};
pub use crate::ocr::{TextRecognizer, VisionRecognizer};
pub use crate::session::{ScanSession, SessionState};

/// Scan a recipe page URL into a normalized, reviewable draft.
///
/// Convenience wrapper over [`SourceFetcher`] and [`Extractor`] with
/// default limits; build a [`ScanSession`] instead when you need the
/// review/commit flow or custom configuration.
pub async fn scan_url(
    url: &str,
    config: &ScanConfig,
) -> Result<(RecipeDraft, Vec<ExtractWarning>), ScanError> {
    let fetcher = SourceFetcher::new(&config.fetch);
    let content = fetcher.fetch(ScanRequest::Url(url.to_string())).await?;

    let (raw, warnings) = Extractor::new().extract(content).await?;
    debug!(
        "Extracted {} ingredient lines and {} step lines from {}",
        raw.ingredient_lines.len(),
        raw.step_lines.len(),
        url
    );

    Ok((DraftStore::load(raw).snapshot(), warnings))
}

/// Scan a photographed recipe page into a normalized, reviewable draft.
///
/// The payload is validated (image MIME type, size ceiling) before the
/// recognizer ever sees it.
pub async fn scan_image(
    bytes: Vec<u8>,
    mime: &str,
    recognizer: Box<dyn TextRecognizer>,
    config: &ScanConfig,
) -> Result<(RecipeDraft, Vec<ExtractWarning>), ScanError> {
    let fetcher = SourceFetcher::new(&config.fetch);
    let content = fetcher
        .fetch(ScanRequest::Image {
            bytes,
            mime: mime.to_string(),
        })
        .await?;

    let (raw, warnings) = Extractor::with_recognizer(recognizer)
        .extract(content)
        .await?;

    Ok((DraftStore::load(raw).snapshot(), warnings))
}
