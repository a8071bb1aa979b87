use std::sync::LazyLock;

use html_escape::decode_html_entities;
use log::debug;
use regex::Regex;
use scraper::Selector;
use serde::Deserialize;
use serde_json::Value;

use super::text_blocks;
use super::{HtmlExtractor, ParseContext};
use crate::error::ExtractError;
use crate::model::RawDraft;

/// Extracts a draft from schema.org Recipe markup embedded as JSON-LD,
/// the most reliable source when a site carries it.
pub struct JsonLdExtractor;

static ISO_DURATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^P(?:(\d+)D)?(?:T(?:(\d+)H)?(?:(\d+)M)?(?:\d+S)?)?$").expect("valid regex")
});

#[derive(Debug, Deserialize)]
struct JsonLdRecipe {
    name: Option<String>,
    description: Option<DescriptionType>,
    #[serde(rename = "recipeIngredient")]
    recipe_ingredient: Option<Vec<String>>,
    #[serde(rename = "recipeInstructions")]
    recipe_instructions: Option<RecipeInstructions>,
    #[serde(rename = "recipeYield")]
    recipe_yield: Option<YieldType>,
    #[serde(rename = "prepTime")]
    prep_time: Option<String>,
    #[serde(rename = "cookTime")]
    cook_time: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TextObject {
    text: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DescriptionType {
    String(String),
    Object(TextObject),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum YieldType {
    Number(u32),
    String(String),
    Multiple(Vec<String>),
}

/// Plain instruction object; `text` is required so this variant cannot
/// shadow HowTo sections in the untagged enum below
#[derive(Debug, Deserialize)]
struct StepObject {
    text: String,
}

#[derive(Debug, Deserialize)]
struct InstructionObject {
    text: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RecipeInstructions {
    String(String),
    Multiple(Vec<String>),
    MultipleObject(Vec<StepObject>),
    HowTo(Vec<HowTo>),
}

#[derive(Debug, Deserialize)]
#[serde(tag = "@type")]
enum HowTo {
    HowToStep(InstructionObject),
    HowToSection(HowToSection),
}

#[derive(Debug, Deserialize)]
struct HowToSection {
    #[serde(rename = "itemListElement")]
    item_list_element: Vec<InstructionObject>,
}

fn decode_html_symbols(text: &str) -> String {
    // Entities show up double-encoded in the wild; one pass is not enough
    decode_html_entities(&decode_html_entities(text)).into_owned()
}

/// "PT1H15M" -> 75. Seconds are ignored; nobody preps to the second.
fn iso_duration_minutes(value: &str) -> Option<u32> {
    let caps = ISO_DURATION_RE.captures(value.trim())?;
    let days: u32 = caps.get(1).map_or(0, |m| m.as_str().parse().unwrap_or(0));
    let hours: u32 = caps.get(2).map_or(0, |m| m.as_str().parse().unwrap_or(0));
    let minutes: u32 = caps.get(3).map_or(0, |m| m.as_str().parse().unwrap_or(0));
    let total = days * 24 * 60 + hours * 60 + minutes;
    if total == 0 {
        None
    } else {
        Some(total)
    }
}

fn instruction_texts(obj: InstructionObject) -> Vec<String> {
    let mut texts = Vec::new();
    if let Some(text) = obj.text {
        texts.push(text);
    }
    if let Some(desc) = obj.description {
        texts.push(desc);
    }
    texts
}

impl From<JsonLdRecipe> for RawDraft {
    fn from(recipe: JsonLdRecipe) -> Self {
        let step_lines: Vec<String> = match recipe.recipe_instructions {
            None => Vec::new(),
            Some(RecipeInstructions::String(text)) => text
                .split('\n')
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(|l| l.to_string())
                .collect(),
            Some(RecipeInstructions::Multiple(lines)) => lines,
            Some(RecipeInstructions::MultipleObject(objects)) => {
                objects.into_iter().map(|obj| obj.text).collect()
            }
            Some(RecipeInstructions::HowTo(sections)) => sections
                .into_iter()
                .flat_map(|section| match section {
                    HowTo::HowToStep(step) => instruction_texts(step),
                    HowTo::HowToSection(section) => section
                        .item_list_element
                        .into_iter()
                        .flat_map(instruction_texts)
                        .collect(),
                })
                .collect(),
        };

        let servings = recipe.recipe_yield.and_then(|y| match y {
            YieldType::Number(n) => Some(n),
            YieldType::String(s) => text_blocks::servings_count(&s),
            YieldType::Multiple(values) => values
                .iter()
                .find_map(|v| text_blocks::servings_count(v)),
        });

        RawDraft {
            title: recipe.name.map(|n| decode_html_symbols(&n)),
            description: recipe.description.map(|d| match d {
                DescriptionType::String(text) => decode_html_symbols(&text),
                DescriptionType::Object(obj) => decode_html_symbols(&obj.text),
            }),
            prep_time: recipe.prep_time.as_deref().and_then(iso_duration_minutes),
            cook_time: recipe.cook_time.as_deref().and_then(iso_duration_minutes),
            servings,
            ingredient_lines: recipe
                .recipe_ingredient
                .unwrap_or_default()
                .into_iter()
                .map(|line| decode_html_symbols(&line))
                .collect(),
            step_lines: step_lines
                .into_iter()
                .map(|line| decode_html_symbols(&line))
                .collect(),
        }
    }
}

/// Clean up JSON-LD payloads that sites routinely mangle
fn sanitize_json(json_str: &str) -> String {
    let mut cleaned = json_str.trim().to_string();

    // Some pages prepend junk before the first object
    if !cleaned.starts_with('{') && !cleaned.starts_with('[') {
        if let Some(start) = cleaned.find('{') {
            cleaned = cleaned[start..].to_string();
        }
    }

    // Trailing commas and stray HTML comments
    cleaned = cleaned.replace(",]", "]").replace(",}", "}");
    cleaned = cleaned.replace("<!--", "").replace("-->", "");

    cleaned
}

/// Pick the Recipe node out of a parsed JSON-LD value: a bare object, a
/// top-level array, or an @graph listing
fn find_recipe_node(json_ld: &Value) -> Option<&Value> {
    let is_recipe = |item: &Value| {
        item.get("recipeInstructions").is_some()
            || item.get("recipeIngredient").is_some()
            || item.get("@type") == Some(&Value::String("Recipe".to_string()))
    };

    if let Some(arr) = json_ld.as_array() {
        return arr.iter().find(|item| is_recipe(item));
    }
    if is_recipe(json_ld) {
        return Some(json_ld);
    }
    if let Some(graph) = json_ld.get("@graph") {
        return graph.as_array()?.iter().find(|item| is_recipe(item));
    }
    None
}

impl HtmlExtractor for JsonLdExtractor {
    fn parse(&self, context: &ParseContext) -> Result<RawDraft, ExtractError> {
        let selector =
            Selector::parse("script[type='application/ld+json']").expect("valid selector");

        // Try each script element until one holds a usable recipe
        for script in context.document.select(&selector) {
            let cleaned_json = sanitize_json(&script.inner_html());
            let Ok(json_ld) = serde_json::from_str::<Value>(&cleaned_json) else {
                continue;
            };

            let Some(node) = find_recipe_node(&json_ld) else {
                continue;
            };

            if let Ok(recipe) = serde_json::from_value::<JsonLdRecipe>(node.clone()) {
                debug!("Found JSON-LD recipe node");
                return Ok(RawDraft::from(recipe));
            }
        }

        Err(ExtractError::Unrecognized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    fn create_html_document(json_ld: &str) -> Html {
        let html = format!(
            r#"
            <!DOCTYPE html>
            <html>
            <head>
                <script type="application/ld+json">
                    {}
                </script>
            </head>
            <body></body>
            </html>
            "#,
            json_ld
        );
        Html::parse_document(&html)
    }

    fn parse(json_ld: &str) -> Result<RawDraft, ExtractError> {
        let context = ParseContext {
            url: "https://example.com/recipe".to_string(),
            document: create_html_document(json_ld),
        };
        JsonLdExtractor.parse(&context)
    }

    #[test]
    fn test_iso_duration_minutes() {
        assert_eq!(iso_duration_minutes("PT30M"), Some(30));
        assert_eq!(iso_duration_minutes("PT1H15M"), Some(75));
        assert_eq!(iso_duration_minutes("PT2H"), Some(120));
        assert_eq!(iso_duration_minutes("P1D"), Some(1440));
        assert_eq!(iso_duration_minutes("PT0M"), None);
        assert_eq!(iso_duration_minutes("garbage"), None);
    }

    #[test]
    fn test_parse_basic_recipe() {
        let draft = parse(
            r#"
            {
                "@context": "https://schema.org/",
                "@type": "Recipe",
                "name": "Chocolate Chip Cookies",
                "description": "Delicious homemade cookies",
                "prepTime": "PT15M",
                "cookTime": "PT12M",
                "recipeYield": "24 cookies",
                "recipeIngredient": ["2 cups flour", "1 cup sugar", "2 cups chocolate chips"],
                "recipeInstructions": "Mix ingredients.\nBake at 350F for 10 minutes."
            }
            "#,
        )
        .unwrap();

        assert_eq!(draft.title.as_deref(), Some("Chocolate Chip Cookies"));
        assert_eq!(draft.description.as_deref(), Some("Delicious homemade cookies"));
        assert_eq!(draft.prep_time, Some(15));
        assert_eq!(draft.cook_time, Some(12));
        assert_eq!(draft.servings, Some(24));
        assert_eq!(draft.ingredient_lines.len(), 3);
        assert_eq!(
            draft.step_lines,
            vec!["Mix ingredients.", "Bake at 350F for 10 minutes."]
        );
    }

    #[test]
    fn test_parse_how_to_steps_in_array_document() {
        let draft = parse(
            r#"
            [
                {
                    "@type": "WebSite",
                    "name": "Recipe Website"
                },
                {
                    "@context": "https://schema.org/",
                    "@type": "Recipe",
                    "name": "Pasta Carbonara",
                    "recipeYield": 4,
                    "recipeIngredient": ["spaghetti", "eggs", "bacon", "cheese"],
                    "recipeInstructions": [
                        {"@type": "HowToStep", "text": "Cook pasta"},
                        {"@type": "HowToStep", "text": "Fry bacon"},
                        {"@type": "HowToStep", "text": "Combine all ingredients"}
                    ]
                }
            ]
            "#,
        )
        .unwrap();

        assert_eq!(draft.title.as_deref(), Some("Pasta Carbonara"));
        assert_eq!(draft.servings, Some(4));
        assert_eq!(
            draft.step_lines,
            vec!["Cook pasta", "Fry bacon", "Combine all ingredients"]
        );
    }

    #[test]
    fn test_parse_graph_document() {
        let draft = parse(
            r#"
            {
                "@context": "https://schema.org/",
                "@graph": [
                    {"@type": "WebPage", "name": "Some page"},
                    {
                        "@type": "Recipe",
                        "name": "Tomato Soup",
                        "recipeIngredient": ["6 tomatoes"],
                        "recipeInstructions": [
                            {"@type": "HowToSection", "itemListElement": [
                                {"@type": "HowToStep", "text": "Roast the tomatoes"},
                                {"@type": "HowToStep", "text": "Blend"}
                            ]}
                        ]
                    }
                ]
            }
            "#,
        )
        .unwrap();

        assert_eq!(draft.title.as_deref(), Some("Tomato Soup"));
        assert_eq!(draft.step_lines, vec!["Roast the tomatoes", "Blend"]);
    }

    #[test]
    fn test_decodes_html_entities() {
        let draft = parse(
            r#"
            {
                "@type": "Recipe",
                "name": "Fish &amp;amp; Chips",
                "recipeIngredient": ["1 kg potatoes"],
                "recipeInstructions": "Fry everything."
            }
            "#,
        )
        .unwrap();

        assert_eq!(draft.title.as_deref(), Some("Fish & Chips"));
    }

    #[test]
    fn test_no_recipe_node_is_unrecognized() {
        let result = parse(r#"{"@type": "WebSite", "name": "Not a recipe"}"#);
        assert!(matches!(result, Err(ExtractError::Unrecognized)));
    }
}
