use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::jsonld::servings_from_value;

pub const DEFAULT_SERVINGS: u32 = 4;

fn default_servings() -> u32 {
    DEFAULT_SERVINGS
}

// Stored collections come from a browser front-end and older importers, so a
// field can be `null` or of a looser type. Such values fall back to the field
// default instead of failing the whole collection.

fn loose_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    })
}

fn loose_strings<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect(),
        Value::String(s) => vec![s],
        _ => Vec::new(),
    })
}

fn loose_servings<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(servings_from_value(&value).unwrap_or(DEFAULT_SERVINGS))
}

/// A recipe as persisted in the collection file and returned by the importer.
///
/// Fields the front-end adds on its own (ids, tags, ...) are carried in
/// `extra` so a save/load cycle gives back exactly what was written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    #[serde(default, deserialize_with = "loose_string")]
    pub title: String,
    #[serde(default, deserialize_with = "loose_string")]
    pub description: String,
    #[serde(default, deserialize_with = "loose_strings")]
    pub ingredients: Vec<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub instructions: String,
    #[serde(default, deserialize_with = "loose_string")]
    pub image_url: String,
    #[serde(default = "default_servings", deserialize_with = "loose_servings")]
    pub servings: u32,
    #[serde(default, deserialize_with = "loose_string")]
    pub prep_time: String,
    #[serde(default, deserialize_with = "loose_string")]
    pub cook_time: String,
    #[serde(default, deserialize_with = "loose_string")]
    pub source_url: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Recipe {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            ingredients: Vec::new(),
            instructions: String::new(),
            image_url: String::new(),
            servings: DEFAULT_SERVINGS,
            prep_time: String::new(),
            cook_time: String::new(),
            source_url: String::new(),
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SaveResponse {
    pub success: bool,
    pub count: usize,
}

#[derive(Debug, Deserialize)]
pub struct PathRequest {
    pub path: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameRequest {
    pub old_path: Option<String>,
    pub new_path: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SuccessResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub path: String,
}

#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    pub url: Option<String>,
}
