use std::collections::HashMap;

use log::debug;
use scraper::{Html, Selector};

use super::text_blocks;
use super::{HtmlExtractor, ParseContext};
use crate::error::ExtractError;
use crate::model::RawDraft;

/// Extracts a draft from the CSS classes the common recipe-card plugins
/// (WPRM, Tasty, Create, WP Zoom, ...) stamp on their markup. Used when a
/// page carries no structured data.
pub struct HtmlClassExtractor;

struct ClassMatchers {
    exact: HashMap<&'static str, Vec<&'static str>>,
    fuzzy: HashMap<&'static str, Vec<&'static str>>,
}

impl ClassMatchers {
    fn new() -> Self {
        let mut exact = HashMap::new();
        let mut fuzzy = HashMap::new();

        exact.insert(
            "title",
            vec![
                "wprm-recipe-name",
                "tasty-recipes-title",
                "mv-create-title",
                "recipe-name",
                "recipe-title",
                "recipe-card-title",
                "recipe-header-title",
                "wpzoom-recipe-card-title",
                "recipe-card__title",
            ],
        );

        exact.insert(
            "description",
            vec![
                "wprm-recipe-summary",
                "recipe-summary",
                "recipe-description",
                "mv-create-description",
                "tasty-recipes-description",
                "recipe-card-summary",
                "wpzoom-recipe-summary",
                "recipe-intro",
            ],
        );

        exact.insert(
            "ingredients",
            vec![
                "wprm-recipe-ingredients-container",
                "wprm-recipe-ingredient",
                "tasty-recipes-ingredients",
                "mv-create-ingredients",
                "recipe-ingredients",
                "recipe-ingredient-list",
                "recipe-card-ingredients",
                "wpzoom-recipe-ingredients",
                "structured-ingredients",
            ],
        );

        exact.insert(
            "instructions",
            vec![
                "wprm-recipe-instructions-container",
                "wprm-recipe-instruction",
                "tasty-recipes-instructions",
                "mv-create-instructions",
                "recipe-instructions",
                "recipe-instruction-list",
                "recipe-card-instructions",
                "wpzoom-recipe-instructions",
                "structured-instructions",
                "directions",
                "recipe-directions",
            ],
        );

        exact.insert(
            "prep_time",
            vec![
                "wprm-recipe-prep-time",
                "recipe-prep-time",
                "prep-time",
                "tasty-recipes-prep-time",
                "mv-create-time-prep",
            ],
        );

        exact.insert(
            "cook_time",
            vec![
                "wprm-recipe-cook-time",
                "recipe-cook-time",
                "cook-time",
                "tasty-recipes-cook-time",
                "mv-create-time-active",
            ],
        );

        exact.insert(
            "servings",
            vec![
                "wprm-recipe-servings",
                "recipe-yield",
                "recipe-servings",
                "tasty-recipes-yield",
                "mv-create-yield",
            ],
        );

        // Fuzzy matchers for fallback
        fuzzy.insert("title", vec!["recipe-title", "recipe-name"]);
        fuzzy.insert("ingredients", vec!["ingredient"]);
        fuzzy.insert("instructions", vec!["instruction", "direction", "method"]);
        fuzzy.insert("description", vec!["summary", "description", "intro"]);

        ClassMatchers { exact, fuzzy }
    }

    fn find_by_class(&self, document: &Html, field: &str) -> Option<String> {
        // Exact class names first
        if let Some(classes) = self.exact.get(field) {
            for class_name in classes {
                if let Some(text) = select_text(document, &format!(".{class_name}")) {
                    debug!("Found {} using exact class: {}", field, class_name);
                    return Some(text);
                }
            }
        }

        // Substring class match as fallback, capped so a match on a page
        // wrapper cannot swallow the whole document
        if let Some(patterns) = self.fuzzy.get(field) {
            for pattern in patterns {
                if let Some(text) = select_text(document, &format!("[class*='{pattern}']")) {
                    if text.len() < 5000 {
                        debug!("Found {} using fuzzy class pattern: {}", field, pattern);
                        return Some(text);
                    }
                }
            }
        }

        None
    }

    /// Harvest the list items under a matched container; falls back to
    /// child div/p/span text when the container holds no list
    fn extract_list_items(&self, document: &Html, field: &str) -> Vec<String> {
        let mut items = Vec::new();

        if let Some(classes) = self.exact.get(field) {
            for class_name in classes {
                let Ok(selector) = Selector::parse(&format!(".{class_name}")) else {
                    continue;
                };
                let li_selector = Selector::parse("li").expect("valid selector");

                for container in document.select(&selector) {
                    for li in container.select(&li_selector) {
                        let text = li.text().collect::<Vec<_>>().join(" ").trim().to_string();
                        if !text.is_empty() {
                            items.push(text);
                        }
                    }

                    if items.is_empty() {
                        for child in &["div", "p", "span"] {
                            let child_selector =
                                Selector::parse(child).expect("valid selector");
                            for item in container.select(&child_selector) {
                                let text =
                                    item.text().collect::<Vec<_>>().join(" ").trim().to_string();
                                if text.len() > 5 && text.len() < 500 {
                                    items.push(text);
                                }
                            }
                        }
                    }
                }

                if !items.is_empty() {
                    debug!("Found {} {} using class: {}", items.len(), field, class_name);
                    return items;
                }
            }
        }

        // Substring class match as a last resort, list items only
        if let Some(patterns) = self.fuzzy.get(field) {
            for pattern in patterns {
                let Ok(selector) = Selector::parse(&format!("[class*='{pattern}'] li")) else {
                    continue;
                };
                for li in document.select(&selector) {
                    let text = li.text().collect::<Vec<_>>().join(" ").trim().to_string();
                    if !text.is_empty() && text.len() < 500 {
                        items.push(text);
                    }
                }
                if !items.is_empty() {
                    debug!("Found {} {} using fuzzy pattern: {}", items.len(), field, pattern);
                    return items;
                }
            }
        }

        items
    }
}

fn select_text(document: &Html, selector_str: &str) -> Option<String> {
    let selector = Selector::parse(selector_str).ok()?;
    let text = document
        .select(&selector)
        .map(|el| el.text().collect::<Vec<_>>().join(" "))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

impl HtmlExtractor for HtmlClassExtractor {
    fn parse(&self, context: &ParseContext) -> Result<RawDraft, ExtractError> {
        debug!("Attempting extraction via recipe-card class matchers");

        let matchers = ClassMatchers::new();
        let document = &context.document;

        let ingredient_lines = matchers.extract_list_items(document, "ingredients");
        let step_lines = matchers.extract_list_items(document, "instructions");

        // Without either block there is nothing a reviewer could work with
        if ingredient_lines.is_empty() && step_lines.is_empty() {
            return Err(ExtractError::Unrecognized);
        }

        let draft = RawDraft {
            title: matchers.find_by_class(document, "title"),
            description: matchers.find_by_class(document, "description"),
            prep_time: matchers
                .find_by_class(document, "prep_time")
                .as_deref()
                .and_then(text_blocks::time_minutes),
            cook_time: matchers
                .find_by_class(document, "cook_time")
                .as_deref()
                .and_then(text_blocks::time_minutes),
            servings: matchers
                .find_by_class(document, "servings")
                .as_deref()
                .and_then(text_blocks::servings_count),
            ingredient_lines,
            step_lines,
        };

        debug!(
            "Class matchers found {} ingredient lines, {} step lines",
            draft.ingredient_lines.len(),
            draft.step_lines.len()
        );

        Ok(draft)
    }
}
