use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static HEX_COLOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#[0-9A-Fa-f]{3,8}$").expect("valid hex color regex"));

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("response is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("expected a JSON array, got {0}")]
    NotArray(&'static str),
    #[error("element {index} is not a string")]
    NotString { index: usize },
    #[error("element {index} is not a hex color: {value:?}")]
    NotHexColor { index: usize, value: String },
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Structured responses occasionally arrive wrapped in a markdown fence.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

pub fn decode_string_array(text: &str) -> Result<Vec<String>, SchemaError> {
    let value: Value = serde_json::from_str(strip_code_fence(text))?;
    let Value::Array(items) = value else {
        return Err(SchemaError::NotArray(json_kind(&value)));
    };
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::String(text) => Ok(text),
            _ => Err(SchemaError::NotString { index }),
        })
        .collect()
}

pub fn is_hex_color(value: &str) -> bool {
    HEX_COLOR_RE.is_match(value)
}

pub fn decode_hex_palette(text: &str) -> Result<Vec<String>, SchemaError> {
    let colors = decode_string_array(text)?;
    if let Some((index, value)) = colors
        .iter()
        .enumerate()
        .find(|(_, value)| !is_hex_color(value))
    {
        return Err(SchemaError::NotHexColor {
            index,
            value: value.clone(),
        });
    }
    Ok(colors)
}
