use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::models::{Recipe, DEFAULT_SERVINGS};

// ── Constants ────────────────────────────────────────────────────────────────

pub const UNTITLED_RECIPE: &str = "Untitled Recipe";
const RECIPE_TYPE: &str = "Recipe";
const STEP_SEPARATOR: &str = "\n\n";

/// Upper bound on entity-decoding passes. Enough for text that was escaped
/// three times over (`&amp;amp;eacute;`); not a fixpoint guarantee.
pub const DECODE_PASSES: usize = 3;

static LD_JSON_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"script[type="application/ld+json"]"#).unwrap());

static LEADING_INT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*([+-]?\d+)").unwrap());

// ── Discovery ────────────────────────────────────────────────────────────────

/// First schema.org `Recipe` node across all JSON-LD blocks, in document order.
/// Blocks that are not valid JSON are logged and skipped.
pub fn find_recipe_node(document: &Html) -> Option<Value> {
    for (index, script) in document.select(&LD_JSON_SELECTOR).enumerate() {
        let text: String = script.text().collect();
        let value = match serde_json::from_str::<Value>(&text) {
            Ok(value) => value,
            Err(e) => {
                warn!(block = index, "skipping unparsable JSON-LD block: {}", e);
                continue;
            }
        };

        if let Some(node) = recipe_in_block(value) {
            debug!(block = index, "found Recipe node");
            return Some(node);
        }
    }
    None
}

fn recipe_in_block(value: Value) -> Option<Value> {
    let items = match value {
        Value::Object(mut map) => match map.remove("@graph") {
            Some(Value::Array(graph)) => graph,
            Some(graph @ Value::Object(_)) => vec![graph],
            _ => vec![Value::Object(map)],
        },
        Value::Array(items) => items,
        _ => return None,
    };
    items.into_iter().find(is_recipe)
}

fn is_recipe(item: &Value) -> bool {
    match item.get("@type") {
        Some(Value::String(t)) => t == RECIPE_TYPE,
        Some(Value::Array(types)) => types.iter().any(|t| t.as_str() == Some(RECIPE_TYPE)),
        _ => false,
    }
}

// ── Field shapes ─────────────────────────────────────────────────────────────
//
// Publishers use strings, arrays and objects interchangeably for the same
// property. Each property gets its own variant type and one normalizer.

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Ingredients {
    Single(String),
    List(Vec<Value>),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Instructions {
    Text(String),
    Steps(Vec<Step>),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Step {
    Text(String),
    /// Only JSON objects land here; arrays and scalars fall through to `Other`.
    Object(Map<String, Value>),
    Other(Value),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RecipeYield {
    Number(f64),
    Text(String),
    List(Vec<RecipeYield>),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ImageField {
    Url(String),
    List(Vec<ImageField>),
    Object {
        #[serde(default)]
        url: Option<String>,
    },
}

/// The scraped Recipe node, one typed slot per property we read.
/// A property whose shape matches none of its variants is treated as absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecipeSource {
    pub name: Option<String>,
    pub description: Option<String>,
    pub ingredients: Option<Ingredients>,
    pub instructions: Option<Instructions>,
    pub recipe_yield: Option<RecipeYield>,
    pub prep_time: Option<String>,
    pub cook_time: Option<String>,
    pub image: Option<ImageField>,
}

fn field<T: DeserializeOwned>(node: &Value, key: &str) -> Option<T> {
    node.get(key)
        .filter(|v| !v.is_null())
        .and_then(|v| T::deserialize(v).ok())
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.filter(|s| !s.is_empty())
}

impl RecipeSource {
    pub fn from_node(node: &Value) -> Self {
        Self {
            name: non_empty(field(node, "name")),
            description: non_empty(field(node, "description")),
            ingredients: field(node, "recipeIngredient"),
            instructions: field(node, "recipeInstructions"),
            recipe_yield: field(node, "recipeYield"),
            prep_time: field(node, "prepTime"),
            cook_time: field(node, "cookTime"),
            image: field(node, "image"),
        }
    }

    /// The representative image URL, as written in the page (may be relative).
    pub fn image_url(&self) -> Option<String> {
        self.image.as_ref().and_then(image_url)
    }

    /// Normalize into the stored recipe shape. `imageUrl` is left empty; the
    /// importer fills it once the image is stored locally.
    pub fn into_recipe(self, source_url: &str) -> Recipe {
        Recipe {
            title: decode_entities(self.name.as_deref().unwrap_or(UNTITLED_RECIPE)),
            description: self
                .description
                .as_deref()
                .map(decode_entities)
                .unwrap_or_default(),
            ingredients: self.ingredients.map(normalize_ingredients).unwrap_or_default(),
            instructions: self.instructions.map(normalize_instructions).unwrap_or_default(),
            image_url: String::new(),
            servings: self
                .recipe_yield
                .as_ref()
                .and_then(servings_from_yield)
                .unwrap_or(DEFAULT_SERVINGS),
            prep_time: self.prep_time.unwrap_or_default(),
            cook_time: self.cook_time.unwrap_or_default(),
            source_url: source_url.to_string(),
            ..Recipe::default()
        }
    }
}

// ── Normalizers ──────────────────────────────────────────────────────────────

fn normalize_ingredients(ingredients: Ingredients) -> Vec<String> {
    match ingredients {
        Ingredients::Single(text) => vec![decode_entities(&text)],
        Ingredients::List(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(decode_entities)
            .collect(),
    }
}

fn normalize_instructions(instructions: Instructions) -> String {
    match instructions {
        Instructions::Text(text) => decode_entities(&text),
        Instructions::Steps(steps) => steps
            .iter()
            .map(|step| decode_entities(step_text(step)))
            .collect::<Vec<_>>()
            .join(STEP_SEPARATOR),
    }
}

fn step_text(step: &Step) -> &str {
    match step {
        Step::Text(text) => text,
        Step::Object(step) => step
            .get("text")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .or_else(|| step.get("name").and_then(Value::as_str))
            .unwrap_or(""),
        Step::Other(_) => "",
    }
}

/// Servings from any yield-like JSON value (number, numeric text, list).
pub fn servings_from_value(value: &Value) -> Option<u32> {
    RecipeYield::deserialize(value)
        .ok()
        .as_ref()
        .and_then(servings_from_yield)
}

/// Leading integer of the yield; `None` when there is no usable positive count.
fn servings_from_yield(recipe_yield: &RecipeYield) -> Option<u32> {
    match recipe_yield {
        RecipeYield::Number(n) if *n >= 1.0 => Some(n.trunc().min(u32::MAX as f64) as u32),
        RecipeYield::Number(_) => None,
        RecipeYield::Text(text) => LEADING_INT_RE
            .captures(text)
            .and_then(|cap| cap[1].parse::<i64>().ok())
            .filter(|n| *n > 0)
            .and_then(|n| u32::try_from(n).ok()),
        RecipeYield::List(items) => items.first().and_then(servings_from_yield),
    }
}

fn image_url(image: &ImageField) -> Option<String> {
    let url = match image {
        ImageField::Url(url) => Some(url.as_str()),
        ImageField::Object { url } => url.as_deref(),
        ImageField::List(items) => match items.first() {
            Some(ImageField::Url(url)) => Some(url.as_str()),
            Some(ImageField::Object { url }) => url.as_deref(),
            _ => None,
        },
    };
    url.map(str::trim)
        .filter(|u| !u.is_empty())
        .map(str::to_string)
}

// ── Entity decoding ──────────────────────────────────────────────────────────

/// Decode HTML entities (and drop any markup), repeating while the text keeps
/// changing, at most [`DECODE_PASSES`] times.
pub fn decode_entities(input: &str) -> String {
    let mut decoded = input.to_string();
    for _ in 0..DECODE_PASSES {
        let next = decode_once(&decoded);
        if next == decoded {
            break;
        }
        decoded = next;
    }
    decoded
}

fn decode_once(input: &str) -> String {
    let fragment = Html::parse_fragment(&format!("<div>{}</div>", input));
    fragment.root_element().text().collect()
}
