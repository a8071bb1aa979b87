use std::sync::LazyLock;

use regex::Regex;

use crate::model::{IngredientDraftLine, StepDraftLine};

/// Leading quantity: a mixed number ("1 1/2"), a simple fraction ("3/4"),
/// or an integer/decimal ("2", "2.5").
static QUANTITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:(\d+)\s+(\d+)\s*/\s*(\d+)|(\d+)\s*/\s*(\d+)|(\d+(?:\.\d+)?))\s*")
        .expect("valid regex")
});

/// "1." / "3)" / "Step 2:" markers at the start of an instruction line
static STEP_MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*(?:step\s+\d+\s*[:.)]?\s*|\d+\s*[.)]\s*)").expect("valid regex"));

static PARENTHETICAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(([^)]*)\)").expect("valid regex"));

/// Fold a unit token to its canonical form, or None if it is not in the
/// vocabulary. Matching is case-insensitive and tolerates a trailing dot.
fn canonical_unit(token: &str) -> Option<&'static str> {
    let token = token.trim_end_matches('.').to_ascii_lowercase();
    let unit = match token.as_str() {
        "g" | "gram" | "grams" => "g",
        "kg" | "kilogram" | "kilograms" | "kilo" | "kilos" => "kg",
        "oz" | "ounce" | "ounces" => "oz",
        "lb" | "lbs" | "pound" | "pounds" => "lb",
        "ml" | "milliliter" | "milliliters" | "millilitre" | "millilitres" => "ml",
        "l" | "liter" | "liters" | "litre" | "litres" => "l",
        "tsp" | "teaspoon" | "teaspoons" => "tsp",
        "tbsp" | "tbs" | "tablespoon" | "tablespoons" => "tbsp",
        "cup" | "cups" => "cup",
        "pint" | "pints" => "pint",
        "quart" | "quarts" => "quart",
        "gallon" | "gallons" => "gallon",
        _ => return None,
    };
    Some(unit)
}

/// Parse one free-text ingredient line into {quantity, unit, name, notes}.
///
/// Best-effort grammar, never an error: a line with no leading quantity
/// (or one the grammar cannot make sense of) degrades to
/// `{quantity: 1, unit: None, name: <the raw line>, notes: None}`.
pub fn normalize_ingredient(raw: &str) -> IngredientDraftLine {
    let raw_text = raw.trim().to_string();

    let degraded = || IngredientDraftLine {
        raw_text: raw_text.clone(),
        name: raw_text.clone(),
        quantity: 1.0,
        unit: None,
        notes: None,
    };

    let Some(caps) = QUANTITY_RE.captures(&raw_text) else {
        return degraded();
    };

    let quantity = if let (Some(whole), Some(num), Some(den)) =
        (caps.get(1), caps.get(2), caps.get(3))
    {
        let den: f64 = den.as_str().parse().unwrap_or(1.0);
        if den == 0.0 {
            return degraded();
        }
        whole.as_str().parse::<f64>().unwrap_or(0.0)
            + num.as_str().parse::<f64>().unwrap_or(0.0) / den
    } else if let (Some(num), Some(den)) = (caps.get(4), caps.get(5)) {
        let den: f64 = den.as_str().parse().unwrap_or(1.0);
        if den == 0.0 {
            return degraded();
        }
        num.as_str().parse::<f64>().unwrap_or(0.0) / den
    } else {
        caps[6].parse().unwrap_or(1.0)
    };

    let mut rest = raw_text[caps.get(0).unwrap().end()..].trim();

    // Optional unit token, then a dangling "of" ("2 cups of flour")
    let mut unit = None;
    if let Some(first_word) = rest.split_whitespace().next() {
        if let Some(canonical) = canonical_unit(first_word) {
            unit = Some(canonical.to_string());
            rest = rest[first_word.len()..].trim_start();
            if let Some(next) = rest.split_whitespace().next() {
                if next.eq_ignore_ascii_case("of") {
                    rest = rest[next.len()..].trim_start();
                }
            }
        }
    }

    let mut name = rest.to_string();
    let mut notes: Vec<String> = Vec::new();

    // Parenthetical clause becomes a note
    if let Some(caps) = PARENTHETICAL_RE.captures(&name) {
        let note = caps[1].trim().to_string();
        if !note.is_empty() {
            notes.push(note);
        }
        name = PARENTHETICAL_RE.replace(&name, "").into_owned();
    }

    // Trailing clause after a comma becomes a note ("butter, softened")
    if let Some(comma) = name.find(',') {
        let clause = name[comma + 1..].trim().to_string();
        if !clause.is_empty() {
            notes.push(clause);
        }
        name.truncate(comma);
    }

    let name = name.trim().trim_matches(|c| ",.:;".contains(c)).trim().to_string();
    if name.is_empty() {
        return degraded();
    }

    // A count of items has no unit and must be a whole number; a fractional
    // parse without a unit is rounded up rather than thrown away.
    let quantity = if unit.is_none() && quantity.fract() != 0.0 {
        quantity.ceil()
    } else {
        quantity
    };

    IngredientDraftLine {
        raw_text,
        name,
        quantity,
        unit,
        notes: if notes.is_empty() {
            None
        } else {
            Some(notes.join(", "))
        },
    }
}

/// Number instruction lines 1..N in input order, dropping blank lines and
/// any "1." / "Step 2" markers the source already carried.
pub fn normalize_steps<I, S>(lines: I) -> Vec<StepDraftLine>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    lines
        .into_iter()
        .filter_map(|line| {
            let stripped = STEP_MARKER_RE.replace(line.as_ref().trim(), "");
            let description = stripped.trim().to_string();
            if description.is_empty() {
                None
            } else {
                Some(description)
            }
        })
        .enumerate()
        .map(|(i, description)| StepDraftLine {
            step_number: i as u32 + 1,
            description,
        })
        .collect()
}
