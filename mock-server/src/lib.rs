//! Stand-in for every historical deployment of the conversion service.
//!
//! Each route answers with the body shape one deployment used, so client
//! code can be exercised against all of them over real HTTP. The conversion
//! itself is a toy: lowercasing, vowel merging across word boundaries and a
//! word-final `o` → `u` rewrite, enough to produce non-trivial explanations
//! and combinations.

use axum::{
    body::Bytes,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::net::TcpListener;
use tracing::{info, warn};

/// Shape A: the `/convert` deployment.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConvertResponse {
    pub original: String,
    pub before: String,
    pub after: String,
    pub explanations: Vec<String>,
    pub combinations: Vec<String>,
}

/// Shape B: alternate field names.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConvertV2Response {
    pub text: String,
    pub converted_text: String,
}

/// Shape C: the legacy single-field deployment.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LegacyResponse {
    pub result: String,
}

/// Shape D: the spell-check-capable deployment.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SpellCheckedResponse {
    pub original: String,
    pub spell_checked: Option<String>,
    pub converted: String,
    pub explanations: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// A rejected request, rendered as a 400 with an `error`/`details` body.
#[derive(Debug)]
pub struct BadRequest {
    error: &'static str,
    details: Option<&'static str>,
}

impl BadRequest {
    fn new(error: &'static str, details: &'static str) -> Self {
        Self {
            error,
            details: Some(details),
        }
    }

    /// The legacy deployment only ever sent `error`.
    fn terse(self) -> Self {
        Self {
            details: None,
            ..self
        }
    }
}

impl IntoResponse for BadRequest {
    fn into_response(self) -> Response {
        warn!(error = self.error, "rejecting request");
        let body = ErrorBody {
            error: self.error.to_string(),
            details: self.details.map(str::to_string),
        };
        (StatusCode::BAD_REQUEST, Json(body)).into_response()
    }
}

#[derive(Debug)]
struct Input {
    text: String,
    use_spell_check: bool,
}

fn read_input(body: &[u8]) -> Result<Input, BadRequest> {
    let data: Value = serde_json::from_slice(body)
        .ok()
        .filter(|v: &Value| v.as_object().is_some_and(|o| !o.is_empty()))
        .ok_or_else(|| BadRequest::new("No data provided", "Request must include JSON data"))?;

    let text = match data.get("text") {
        None => {
            return Err(BadRequest::new(
                "No text provided",
                "Request must include \"text\" field",
            ))
        }
        Some(Value::String(text)) => text.clone(),
        Some(_) => return Err(BadRequest::new("Invalid text format", "Text must be a string")),
    };
    let use_spell_check = data
        .get("use_spell_check")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    Ok(Input {
        text,
        use_spell_check,
    })
}

/// Output of the toy converter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Conversion {
    pub before: String,
    pub after: String,
    pub explanations: Vec<String>,
    pub combinations: Vec<String>,
}

fn ends_with_vowel(word: &str) -> bool {
    word.ends_with(['a', 'e', 'o'])
}

pub fn convert_text(text: &str) -> Conversion {
    let words: Vec<String> = text.split_whitespace().map(str::to_lowercase).collect();
    let mut combinations = Vec::new();
    let mut merged: Vec<String> = Vec::with_capacity(words.len());

    let mut iter = words.into_iter().peekable();
    while let Some(word) = iter.next() {
        let joins = ends_with_vowel(&word) && iter.peek().is_some_and(|next| next.starts_with('a'));
        if let Some(next) = iter.next_if(|_| joins) {
            let joined = format!("{}{next}", &word[..word.len() - 1]);
            combinations.push(format!("{word} + {next} → {joined}"));
            merged.push(joined);
        } else {
            merged.push(word);
        }
    }

    let mut explanations = Vec::new();
    for word in &mut merged {
        if word.len() > 1 && word.ends_with('o') {
            let rewritten = format!("{}u", &word[..word.len() - 1]);
            explanations.push(format!("{word}: final o sounds like u → {rewritten}"));
            *word = rewritten;
        }
    }

    Conversion {
        before: text.trim().to_string(),
        after: merged.join(" "),
        explanations,
        combinations,
    }
}

pub fn app() -> Router {
    Router::new()
        .route("/", get(home))
        .route("/convert", post(convert))
        .route("/api/portuguese_converter", post(convert_spell_checked))
        .route("/v2/convert", post(convert_v2))
        .route("/legacy/convert", post(convert_legacy))
        .route("/maintenance", any(maintenance))
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn home() -> Json<Value> {
    Json(serde_json::json!({
        "status": "running",
        "message": "Portuguese Text Converter API is running!",
        "spell_check_available": false
    }))
}

async fn convert(body: Bytes) -> Result<Json<ConvertResponse>, BadRequest> {
    let input = read_input(&body)?;
    info!(chars = input.text.chars().count(), "converting text");
    let conversion = convert_text(&input.text);
    Ok(Json(ConvertResponse {
        original: input.text,
        before: conversion.before,
        after: conversion.after,
        explanations: conversion.explanations,
        combinations: conversion.combinations,
    }))
}

async fn convert_spell_checked(body: Bytes) -> Result<Json<SpellCheckedResponse>, BadRequest> {
    let input = read_input(&body)?;
    if input.use_spell_check {
        return Err(BadRequest::new(
            "Spell check not available",
            "OpenAI API key not configured or spell check disabled",
        ));
    }
    info!(chars = input.text.chars().count(), "converting text");
    let conversion = convert_text(&input.text);
    Ok(Json(SpellCheckedResponse {
        original: input.text,
        spell_checked: None,
        converted: conversion.after,
        explanations: conversion.explanations,
    }))
}

async fn convert_v2(body: Bytes) -> Result<Json<ConvertV2Response>, BadRequest> {
    let input = read_input(&body)?;
    let conversion = convert_text(&input.text);
    Ok(Json(ConvertV2Response {
        text: conversion.before,
        converted_text: conversion.after,
    }))
}

async fn convert_legacy(body: Bytes) -> Result<Json<LegacyResponse>, BadRequest> {
    let input = read_input(&body).map_err(BadRequest::terse)?;
    let conversion = convert_text(&input.text);
    Ok(Json(LegacyResponse {
        result: conversion.after,
    }))
}

/// What a deployment answers while the platform is down: HTML, not JSON.
async fn maintenance() -> impl IntoResponse {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        [(header::CONTENT_TYPE, "text/html")],
        "<html><body>Service temporarily unavailable</body></html>",
    )
}
