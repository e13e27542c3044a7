//! Domain types shared by the client, the normalizer and the controller.
//!
//! # Design
//! `ConversionResult` is the canonical success shape: whichever wire schema
//! the service answered with, the normalizer produces this one struct.
//! `SubmissionState` is the single value the presentation layer observes.

use serde::{Deserialize, Serialize};

use crate::error::ConversionError;

/// Shown by presenters in place of an empty combinations list.
pub const NO_COMBINATIONS_MESSAGE: &str = "No word combinations applied";

/// Request payload sent to the conversion service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionRequest {
    pub text: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub use_spell_check: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl ConversionRequest {
    /// Build a request, rejecting text that is empty once trimmed.
    ///
    /// The text itself is sent untrimmed; only the emptiness check trims.
    pub fn new(text: impl Into<String>) -> Result<Self, ConversionError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(ConversionError::validation("Text must not be empty"));
        }
        Ok(Self {
            text,
            use_spell_check: false,
        })
    }

    pub fn with_spell_check(mut self, enabled: bool) -> Self {
        self.use_spell_check = enabled;
        self
    }
}

/// Canonical successful conversion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionResult {
    pub original_text: String,
    pub converted_text: String,
    pub explanations: Vec<String>,
    pub combinations: Vec<String>,
    /// Text after server-side spell correction, when the deployment did one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spell_checked: Option<String>,
}

/// What the presentation layer renders. Exactly one variant is active.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SubmissionState {
    #[default]
    Idle,
    Loading,
    Success(ConversionResult),
    Failure(ConversionError),
}

impl SubmissionState {
    pub fn is_loading(&self) -> bool {
        matches!(self, SubmissionState::Loading)
    }

    pub fn result(&self) -> Option<&ConversionResult> {
        match self {
            SubmissionState::Success(result) => Some(result),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&ConversionError> {
        match self {
            SubmissionState::Failure(err) => Some(err),
            _ => None,
        }
    }
}
