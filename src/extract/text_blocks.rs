//! Section classification for plain recipe text: OCR output from a
//! photographed page, or the body text of a page no structured extractor
//! understood. Splits lines into ingredient and instruction blocks and
//! pulls out inline timing/serving facts.

use std::sync::LazyLock;

use regex::Regex;

use crate::model::RawDraft;

static INGREDIENTS_HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:ingredients?\b|what\s+you\s*(?:will)?\s*need\b|you\s*(?:will)?\s*need\b|shopping\s+list\b|for\s+the\s+ingredients\b|ingredient\s+list\b)")
        .expect("valid regex")
});

static INSTRUCTIONS_HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:instructions\b|directions\b|method\b|preparation\b|steps\b|procedure\b|how\s+to\s+(?:make|prepare|cook)\b|cooking\s+instructions\b|to\s+(?:make|prepare|cook)\b)")
        .expect("valid regex")
});

static DESCRIPTION_HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:description\b|about\b|notes\b|introduction\b|chef.s\s+notes\b)")
        .expect("valid regex")
});

static TIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+)\s*(?:hour|hr)s?\s*(?:and\s*)?(\d+)\s*(?:minute|min)s?|(\d+)\s*(?:minute|min)s?|(\d+)\s*(?:hour|hr)s?")
        .expect("valid regex")
});

static SERVINGS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:serve|serving|yield)s?\s*:?\s*(?:\w+\s+)?(\d+)|(\d+)\s*(?:serving|portion)s?")
        .expect("valid regex")
});

static NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+)").expect("valid regex"));

/// Quantity-with-unit, bare fraction, or "pinch of" shapes that mark a
/// line as an ingredient rather than an instruction
static INGREDIENT_SHAPE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\d+\s*(?:cup|tablespoon|teaspoon|tbsp|tsp|oz|ounce|pound|lb|g|gram|kg|ml|liter|litre|l|pint|quart|gallon)s?\b|\d+\s*[/.]\s*\d+|(?:a\s+)?(?:pinch|dash|handful)\b|(?:to\s+)?taste\b")
        .expect("valid regex")
});

static STEP_LEAD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\d+\s*[.)]|^step\s+\d+").expect("valid regex"));

const COOKING_VERBS: &[&str] = &[
    "mix", "stir", "bake", "cook", "add", "pour", "heat", "combine", "chop", "slice", "dice",
    "mince", "grate", "preheat", "simmer", "boil", "whisk", "fold", "knead",
];

/// Parse "1 hour 15 minutes" / "45 min" / "2 hrs" into minutes. A bare
/// number is read as minutes.
pub(crate) fn time_minutes(text: &str) -> Option<u32> {
    if let Some(caps) = TIME_RE.captures(text) {
        if let (Some(hours), Some(minutes)) = (caps.get(1), caps.get(2)) {
            let hours: u32 = hours.as_str().parse().ok()?;
            let minutes: u32 = minutes.as_str().parse().ok()?;
            return Some(hours * 60 + minutes);
        }
        if let Some(minutes) = caps.get(3) {
            return minutes.as_str().parse().ok();
        }
        if let Some(hours) = caps.get(4) {
            return hours.as_str().parse::<u32>().ok().map(|h| h * 60);
        }
    }

    NUMBER_RE
        .captures(text)
        .and_then(|caps| caps[1].parse().ok())
}

/// Parse "Serves 4" / "4 servings" / "Yield: 12" into a count
pub(crate) fn servings_count(text: &str) -> Option<u32> {
    if let Some(caps) = SERVINGS_RE.captures(text) {
        let group = caps.get(1).or_else(|| caps.get(2))?;
        return group.as_str().parse().ok();
    }

    NUMBER_RE
        .captures(text)
        .and_then(|caps| caps[1].parse().ok())
}

pub(crate) fn looks_like_ingredient(line: &str) -> bool {
    INGREDIENT_SHAPE_RE.is_match(line)
}

/// Classify plain recipe text into a raw draft.
///
/// The first line is taken as the title. Explicit section headers
/// ("Ingredients", "Directions", ...) drive the split; inline
/// "Prep time:" / "Cook time:" / "Serves" lines become the timing facts.
/// When no headers are present the split is inferred line by line.
pub(crate) fn classify(text: &str) -> RawDraft {
    let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());

    let mut draft = RawDraft {
        title: lines.next().map(|l| l.to_string()),
        ..Default::default()
    };

    let mut description_lines: Vec<String> = Vec::new();
    let mut unclassified: Vec<String> = Vec::new();

    #[derive(PartialEq)]
    enum Section {
        Unknown,
        Ingredients,
        Instructions,
        Description,
    }
    let mut section = Section::Unknown;

    for line in lines {
        let lower = line.to_ascii_lowercase();

        if INGREDIENTS_HEADER_RE.is_match(line) {
            section = Section::Ingredients;
            continue;
        }
        if INSTRUCTIONS_HEADER_RE.is_match(line) {
            section = Section::Instructions;
            continue;
        }
        if DESCRIPTION_HEADER_RE.is_match(line) {
            section = Section::Description;
            continue;
        }
        if lower.contains("prep time") || lower.contains("preparation time") {
            draft.prep_time = time_minutes(line);
            continue;
        }
        if lower.contains("cook time") || lower.contains("cooking time") {
            draft.cook_time = time_minutes(line);
            continue;
        }
        if lower.contains("servings") || lower.contains("serves") || lower.contains("yield") {
            draft.servings = servings_count(line);
            continue;
        }

        match section {
            Section::Ingredients => draft.ingredient_lines.push(line.to_string()),
            Section::Instructions => draft.step_lines.push(line.to_string()),
            Section::Description => description_lines.push(line.to_string()),
            Section::Unknown => {
                // Early unheaded lines read as description; the rest are
                // kept for inference in case no headers ever show up
                if description_lines.len() < 3 && unclassified.is_empty() {
                    description_lines.push(line.to_string());
                } else {
                    unclassified.push(line.to_string());
                }
            }
        }
    }

    if draft.ingredient_lines.is_empty() && draft.step_lines.is_empty() {
        let mut pool: Vec<String> = description_lines.drain(..).collect();
        pool.extend(unclassified);
        let (ingredients, instructions) = infer_sections(&pool);
        draft.ingredient_lines = ingredients;
        draft.step_lines = instructions;
    }

    if !description_lines.is_empty() {
        draft.description = Some(description_lines.join(" "));
    }

    draft
}

/// Split unheaded lines into ingredients and instructions by shape:
/// quantity patterns mark ingredients, cooking verbs and step markers mark
/// instructions, short lines default to ingredients and long ones to
/// instructions.
fn infer_sections(lines: &[String]) -> (Vec<String>, Vec<String>) {
    let mut ingredients = Vec::new();
    let mut instructions = Vec::new();

    for line in lines {
        let lower = line.to_ascii_lowercase();

        if looks_like_ingredient(line) {
            ingredients.push(line.clone());
        } else if STEP_LEAD_RE.is_match(line)
            || COOKING_VERBS.iter().any(|verb| lower.contains(verb))
        {
            instructions.push(line.clone());
        } else if line.split_whitespace().count() < 8 {
            ingredients.push(line.clone());
        } else {
            instructions.push(line.clone());
        }
    }

    (ingredients, instructions)
}
