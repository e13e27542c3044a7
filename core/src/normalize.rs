//! Reconciles the conversion service's response schemas into one result.
//!
//! # Design
//! Deployments of the service have answered with several body shapes over
//! time, and old and new deployments may still be live at once:
//!
//! | shape  | fields                                                         |
//! |--------|----------------------------------------------------------------|
//! | A      | `before`, `after`, `explanations?`, `combinations?`            |
//! | B      | `text`, `converted_text`                                       |
//! | C      | `result` (legacy, converted text only)                         |
//! | D      | `original`, `converted`, `spell_checked?`, `explanations?`     |
//! | error  | `error?`, `details?` (any status)                              |
//!
//! All compatibility policy lives in [`normalize`]: each semantic slot is
//! resolved from a priority-ordered list of field names, so supporting a new
//! shape means adding a name to a list rather than another branch. The
//! function is pure and total over `serde_json::Value`.

use serde_json::{Map, Value};

use crate::error::{ConversionError, UNKNOWN_SERVER_ERROR};
use crate::types::ConversionResult;

const ORIGINAL_FIELDS: &[&str] = &["before", "text", "original"];
const CONVERTED_FIELDS: &[&str] = &["after", "converted_text", "converted"];
const LEGACY_FIELD: &str = "result";

/// Map a parsed body and its HTTP status to the canonical outcome.
pub fn normalize(body: &Value, status: u16) -> Result<ConversionResult, ConversionError> {
    let fields = body.as_object();

    if let Some(err) = server_error(fields, status) {
        return Err(err);
    }

    let Some(fields) = fields else {
        return Err(ConversionError::invalid_format());
    };

    let (original_text, converted_text) = match (
        first_string(fields, ORIGINAL_FIELDS),
        first_string(fields, CONVERTED_FIELDS),
    ) {
        (Some(original), Some(converted)) => (original.to_string(), converted.to_string()),
        _ => match fields.get(LEGACY_FIELD).and_then(Value::as_str) {
            Some(result) => (String::new(), result.to_string()),
            None => return Err(ConversionError::invalid_format()),
        },
    };

    Ok(ConversionResult {
        original_text,
        converted_text,
        explanations: string_list(fields.get("explanations")),
        combinations: string_list(fields.get("combinations")),
        spell_checked: fields
            .get("spell_checked")
            .and_then(Value::as_str)
            .map(str::to_string),
    })
}

/// A non-2xx status or an `error`/`details` field means the service refused.
fn server_error(fields: Option<&Map<String, Value>>, status: u16) -> Option<ConversionError> {
    let details = fields.and_then(|f| present(f, "details"));
    let error = fields.and_then(|f| present(f, "error"));
    let failed_status = !(200..300).contains(&status);

    if !failed_status && details.is_none() && error.is_none() {
        return None;
    }

    let message = describe_non_empty(details)
        .or_else(|| describe_non_empty(error))
        .unwrap_or_else(|| UNKNOWN_SERVER_ERROR.to_string());
    Some(ConversionError::server_reported(message))
}

/// A field counts as present when it exists and is not `null`.
fn present<'a>(fields: &'a Map<String, Value>, name: &str) -> Option<&'a Value> {
    fields.get(name).filter(|v| !v.is_null())
}

/// An empty message falls through to the next candidate.
fn describe_non_empty(value: Option<&Value>) -> Option<String> {
    value.map(describe).filter(|msg| !msg.is_empty())
}

fn describe(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn first_string<'a>(fields: &'a Map<String, Value>, names: &[&str]) -> Option<&'a str> {
    names
        .iter()
        .find_map(|name| fields.get(*name).and_then(Value::as_str))
}

/// Anything but an array of strings yields an empty list.
fn string_list(value: Option<&Value>) -> Vec<String> {
    let Some(items) = value.and_then(Value::as_array) else {
        return Vec::new();
    };
    items
        .iter()
        .map(|item| item.as_str().map(str::to_string))
        .collect::<Option<Vec<_>>>()
        .unwrap_or_default()
}
