use serde::{Deserialize, Serialize};

/// Source of a scan, consumed once by the fetcher
#[derive(Debug, Clone)]
pub enum ScanRequest {
    /// Fetch the recipe page at this URL
    Url(String),
    /// Use an uploaded photo of a recipe page
    Image { bytes: Vec<u8>, mime: String },
}

/// Raw content retrieved for a scan request
#[derive(Debug)]
pub enum RawContent {
    Html { url: String, body: String },
    Image { bytes: Vec<u8> },
}

/// Best-effort structured extraction result. Every field is optional;
/// absence is something for the reviewer to fill in, not an error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawDraft {
    pub title: Option<String>,
    pub description: Option<String>,
    /// Preparation time in minutes
    pub prep_time: Option<u32>,
    /// Cooking time in minutes
    pub cook_time: Option<u32>,
    pub servings: Option<u32>,
    /// Free-text ingredient lines, in page order
    pub ingredient_lines: Vec<String>,
    /// Free-text instruction lines, in page order
    pub step_lines: Vec<String>,
}

/// One parsed ingredient line.
///
/// When `unit` is `None` the quantity is a whole number (a count of items);
/// fractional quantities only occur together with a unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngredientDraftLine {
    /// The line as it appeared in the source, kept for the reviewer
    pub raw_text: String,
    pub name: String,
    pub quantity: f64,
    pub unit: Option<String>,
    pub notes: Option<String>,
}

impl Default for IngredientDraftLine {
    fn default() -> Self {
        IngredientDraftLine {
            raw_text: String::new(),
            name: String::new(),
            quantity: 1.0,
            unit: None,
            notes: None,
        }
    }
}

/// One preparation step. `step_number` is always the 1-based position in
/// the draft's step list; it is re-derived after every edit, never set
/// directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepDraftLine {
    pub step_number: u32,
    pub description: String,
}

/// The user-editable draft held between extraction and commit
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecipeDraft {
    pub title: String,
    pub description: Option<String>,
    pub prep_time: Option<u32>,
    pub cook_time: Option<u32>,
    pub servings: Option<u32>,
    pub ingredients: Vec<IngredientDraftLine>,
    pub steps: Vec<StepDraftLine>,
}

/// A shared ingredient record in the backing store. Looked up by name and
/// shared across recipes, so it outlives any one of them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngredientRecord {
    pub id: u64,
    pub name: String,
}
