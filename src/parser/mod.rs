//! Rule-based ingredient extraction.
//!
//! Turns a pasted recipe or a free-form request ("2 tbsp olive oil and 200 g pasta
//! for tonight") into ingredient lines, an urgency class and an optional meal time.

use std::sync::LazyLock;

use chrono::{DateTime, Duration, FixedOffset, Local};
use regex::Regex;

use crate::models::{Ingredient, Urgency};

/// Leading quantity: mixed numbers, fractions, decimals, ranges and vulgar fractions.
static QUANTITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<qty>\d+\s+\d+/\d+|\d+/\d+|\d*\s*[¼½¾⅓⅔⅛⅜⅝⅞]|\d+(?:\.\d+)?(?:\s*[-–]\s*\d+(?:\.\d+)?)?)\s*(?P<rest>.*)$",
    )
    .expect("quantity regex")
});

/// A quantity token anywhere in a fragment, used for free-form requests.
static QUANTITY_ANYWHERE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|\s)(\d|[¼½¾⅓⅔⅛⅜⅝⅞])").expect("quantity search regex")
});

static BULLET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*[•\-*·]\s*").expect("bullet regex"));

static NUMBERED_STEP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+[.)]\s+\D").expect("numbered step regex"));

/// `1.` or `2)` in front of a numbered ingredient line.
static LIST_MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+[.)]\s+").expect("list marker regex"));

static FREEFORM_SPLIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i),|;|\band\b|\bplus\b").expect("split regex"));

static TRAILING_CLAUSE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s+(?:for|by|at|before)\s+.*$").expect("clause regex"));

static PARENTHETICAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\([^)]*\)").expect("parenthetical regex"));

static CLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?P<hour>\d{1,2})(?::(?P<minute>\d{2}))?\s*(?P<meridiem>am|pm)\b")
        .expect("clock regex")
});

static TONIGHT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:tonight|today|asap|now|this evening|for dinner)\b")
        .expect("tonight regex")
});

static SOON_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:tomorrow|this week|soon|weekend|in a few days)\b").expect("soon regex")
});

const FRACTIONS: [(char, &str); 9] = [
    ('½', "1/2"),
    ('¼', "1/4"),
    ('¾', "3/4"),
    ('⅓', "1/3"),
    ('⅔', "2/3"),
    ('⅛', "1/8"),
    ('⅜', "3/8"),
    ('⅝', "5/8"),
    ('⅞', "7/8"),
];

const SECTION_END_HEADERS: [&str; 6] = [
    "directions",
    "instructions",
    "method",
    "steps",
    "preparation",
    "notes",
];

const FILLER_WORDS: [&str; 6] = ["i need", "need", "buy", "get", "grab", "with"];

/// An extracted ingredient line.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedIngredient {
    pub name: String,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    /// Preparation form, e.g. "diced"
    pub form: Option<String>,
}

impl From<ParsedIngredient> for Ingredient {
    fn from(parsed: ParsedIngredient) -> Self {
        Ingredient {
            name: Some(parsed.name),
            quantity: parsed.quantity,
            unit: parsed.unit,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRecipe {
    pub ingredients: Vec<ParsedIngredient>,
    pub urgency: Urgency,
    /// RFC 3339 timestamp, or a bare date for coarse urgencies
    pub meal_time: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    EmptyText,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::EmptyText => write!(f, "text must be a non-empty string"),
        }
    }
}

impl std::error::Error for ParseError {}

/// Parse text relative to the current local time.
pub fn parse(text: &str) -> Result<ParsedRecipe, ParseError> {
    parse_at(text, Local::now().fixed_offset())
}

/// Parse text with an explicit "now" for meal time inference.
pub fn parse_at(text: &str, now: DateTime<FixedOffset>) -> Result<ParsedRecipe, ParseError> {
    if text.trim().is_empty() {
        return Err(ParseError::EmptyText);
    }

    let ingredients = if text.trim().contains('\n') {
        extract_from_lines(text)
    } else {
        extract_from_request(text)
    };
    let urgency = classify_urgency(text);
    let meal_time = infer_meal_time(text, urgency, now);

    Ok(ParsedRecipe {
        ingredients,
        urgency,
        meal_time,
    })
}

/// Whether free text looks like a pasted recipe rather than a request to generate one.
pub fn looks_like_recipe(text: &str) -> bool {
    let lowered = text.to_lowercase();
    text.chars().count() >= 140
        || lowered.matches('\n').count() >= 2
        || [
            "•",
            "- ",
            "* ",
            "ingredients",
            "directions",
            "instructions",
            "1.",
            "2.",
        ]
        .iter()
        .any(|token| lowered.contains(token))
}

/// Parse a single ingredient line such as "2 cup flour" or "• salt".
pub fn parse_ingredient_line(line: &str) -> Option<ParsedIngredient> {
    let body = BULLET_RE.replace(line.trim(), "");
    parse_line(&body, true, false)
}

fn extract_from_lines(text: &str) -> Vec<ParsedIngredient> {
    let has_ingredients_header = text.lines().any(|l| header_of(l) == Some("ingredients"));
    let mut in_section = !has_ingredients_header;
    let mut ingredients = Vec::new();

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        match header_of(line) {
            Some("ingredients") => {
                in_section = true;
                continue;
            }
            Some(_) => break,
            None => {}
        }
        if !in_section || NUMBERED_STEP_RE.is_match(line) {
            continue;
        }

        let numbered = LIST_MARKER_RE.is_match(line);
        let line = LIST_MARKER_RE.replace(line, "");
        let bulleted = numbered || BULLET_RE.is_match(&line);
        let body = BULLET_RE.replace(&line, "");
        let listed = bulleted || has_ingredients_header;
        if let Some(ingredient) = parse_line(&body, listed, false) {
            ingredients.push(ingredient);
        }
    }

    ingredients
}

fn extract_from_request(text: &str) -> Vec<ParsedIngredient> {
    FREEFORM_SPLIT_RE
        .split(text)
        .filter_map(|fragment| {
            let fragment = strip_filler(fragment.trim());
            let start = QUANTITY_ANYWHERE_RE.find(fragment)?.start();
            parse_line(fragment[start..].trim(), false, true)
        })
        .collect()
}

/// Section header name ("ingredients", "directions", ...) for a header line.
fn header_of(line: &str) -> Option<&'static str> {
    let cleaned = line
        .trim()
        .trim_start_matches('#')
        .trim()
        .trim_end_matches(':')
        .trim()
        .to_lowercase();
    if cleaned.len() > 24 {
        return None;
    }
    if cleaned == "ingredients" {
        return Some("ingredients");
    }
    SECTION_END_HEADERS
        .iter()
        .find(|h| cleaned == **h)
        .copied()
}

fn strip_filler(fragment: &str) -> &str {
    let lowered = fragment.to_lowercase();
    for filler in FILLER_WORDS {
        if lowered.starts_with(filler)
            && lowered[filler.len()..].starts_with(char::is_whitespace)
        {
            return fragment[filler.len()..].trim_start();
        }
    }
    fragment
}

/// Parse one ingredient line. Lines without a leading quantity are only kept
/// when `listed` (bullets or an explicit ingredients section).
fn parse_line(line: &str, listed: bool, freeform: bool) -> Option<ParsedIngredient> {
    let line = PARENTHETICAL_RE.replace_all(line.trim(), "");
    let line = line.trim();

    let (quantity, rest) = match QUANTITY_RE.captures(line) {
        Some(caps) => {
            let qty = caps.name("qty").map(|m| m.as_str()).unwrap_or("");
            let rest = caps.name("rest").map(|m| m.as_str()).unwrap_or("");
            (parse_number(qty), rest)
        }
        None if listed => (None, line),
        None => return None,
    };

    let (unit, rest) = split_unit(rest);
    let mut rest = rest.trim().to_string();
    if freeform {
        rest = TRAILING_CLAUSE_RE.replace(&rest, "").into_owned();
    }
    let rest = rest.strip_prefix("of ").unwrap_or(&rest);

    let (name, form) = match rest.split_once(',') {
        Some((name, form)) => (name, Some(form.trim().trim_end_matches('.').to_string())),
        None => (rest, None),
    };
    let name = name.trim().trim_end_matches('.').trim();
    if name.is_empty() || !name.chars().any(char::is_alphabetic) {
        return None;
    }

    Some(ParsedIngredient {
        name: name.to_string(),
        quantity,
        unit,
        form: form.filter(|f| !f.is_empty()),
    })
}

/// Split a known unit word off the front of `rest`.
fn split_unit(rest: &str) -> (Option<String>, &str) {
    let rest = rest.trim_start();
    let word_end = rest
        .find(|c: char| !(c.is_alphabetic() || c == '.'))
        .unwrap_or(rest.len());
    if word_end == 0 {
        return (None, rest);
    }
    match normalize_unit(&rest[..word_end]) {
        Some(unit) => (Some(unit.to_string()), &rest[word_end..]),
        None => (None, rest),
    }
}

/// Canonical unit for a unit word, or `None` when the word is not a unit.
pub fn normalize_unit(word: &str) -> Option<&'static str> {
    let lowered = word.to_lowercase();
    let unit = match lowered.trim_end_matches('.') {
        "tbsp" | "tbs" | "tb" | "tbl" | "tbls" | "tablespoon" | "tablespoons" => "tbsp",
        "tsp" | "teas" | "ts" | "teaspoon" | "teaspoons" => "tsp",
        "cup" | "cups" | "c" => "cup",
        "oz" | "ounce" | "ounces" => "oz",
        "lb" | "lbs" | "pound" | "pounds" => "lb",
        "g" | "gr" | "gram" | "grams" => "g",
        "kg" | "kilogram" | "kilograms" => "kg",
        "mg" => "mg",
        "ml" | "milliliter" | "milliliters" | "millilitre" | "millilitres" => "ml",
        "l" | "liter" | "liters" | "litre" | "litres" => "l",
        "pt" | "pint" | "pints" => "pint",
        "qt" | "quart" | "quarts" => "quart",
        "gal" | "gallon" | "gallons" => "gallon",
        "clove" | "cloves" => "clove",
        "pinch" | "pinches" => "pinch",
        "dash" | "dashes" => "dash",
        "can" | "cans" => "can",
        "pkg" | "package" | "packages" => "package",
        "stick" | "sticks" => "stick",
        "slice" | "slices" => "slice",
        "bunch" | "bunches" => "bunch",
        "head" | "heads" => "head",
        "sprig" | "sprigs" => "sprig",
        "piece" | "pieces" => "piece",
        "handful" | "handfuls" => "handful",
        "dozen" => "dozen",
        _ => return None,
    };
    Some(unit)
}

/// Parse "2", "1.5", "1/2", "1 1/2", "½", "1½" and ranges like "2-3" (first value).
pub fn parse_number(text: &str) -> Option<f64> {
    let mut cleaned = text.trim().to_string();
    for (glyph, ascii) in FRACTIONS {
        cleaned = cleaned.replace(glyph, &format!(" {}", ascii));
    }
    let first = cleaned
        .split(['-', '–'])
        .next()
        .unwrap_or("")
        .trim()
        .to_string();

    let parts: Vec<&str> = first.split_whitespace().collect();
    match parts.as_slice() {
        [single] => parse_simple(single),
        [whole, frac] => Some(whole.parse::<f64>().ok()? + parse_simple(frac)?),
        _ => None,
    }
}

fn parse_simple(text: &str) -> Option<f64> {
    if let Some((num, den)) = text.split_once('/') {
        let den: f64 = den.parse().ok()?;
        if den == 0.0 {
            return None;
        }
        return Some(num.parse::<f64>().ok()? / den);
    }
    text.parse().ok()
}

pub fn classify_urgency(text: &str) -> Urgency {
    if TONIGHT_RE.is_match(text) {
        Urgency::Tonight
    } else if SOON_RE.is_match(text) {
        Urgency::Soon
    } else {
        Urgency::Later
    }
}

fn infer_meal_time(text: &str, urgency: Urgency, now: DateTime<FixedOffset>) -> Option<String> {
    if let Some(caps) = CLOCK_RE.captures(text) {
        let hour: u32 = caps["hour"].parse().ok()?;
        let minute: u32 = caps
            .name("minute")
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0);
        let pm = caps["meridiem"].eq_ignore_ascii_case("pm");
        if (1..=12).contains(&hour) && minute < 60 {
            let hour24 = match (hour, pm) {
                (12, false) => 0,
                (12, true) => 12,
                (h, true) => h + 12,
                (h, false) => h,
            };
            let tomorrow = text.to_lowercase().contains("tomorrow");
            return next_occurrence(now, hour24, minute, tomorrow).map(|t| t.to_rfc3339());
        }
    }

    match urgency {
        Urgency::Tonight => next_occurrence(now, 18, 0, false).map(|t| t.to_rfc3339()),
        Urgency::Soon => Some((now + Duration::days(7)).date_naive().to_string()),
        Urgency::Later => None,
    }
}

/// The next time the wall clock reads `hour:minute`, optionally skipping today.
fn next_occurrence(
    now: DateTime<FixedOffset>,
    hour: u32,
    minute: u32,
    skip_today: bool,
) -> Option<DateTime<FixedOffset>> {
    let mut target = now
        .date_naive()
        .and_hms_opt(hour, minute, 0)?
        .and_local_timezone(*now.offset())
        .single()?;
    if skip_today || target < now {
        target += Duration::days(1);
    }
    Some(target)
}
