//! Request validation.
//!
//! Turns raw untyped input into a validated [`AnalysisRequest`] or a
//! [`ValidationError`] enumerating **every** violated field constraint,
//! not just the first. Callers must handle the failure case explicitly;
//! nothing here panics or short-circuits through exceptions.

use base64::Engine;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;

use crate::message::{AnalysisRequest, MessageType};

/// Maximum sender length in characters.
const MAX_SENDER_LEN: usize = 255;
/// Maximum subject length in characters.
const MAX_SUBJECT_LEN: usize = 500;
/// Maximum content length in characters.
const MAX_CONTENT_LEN: usize = 10_000;

lazy_static! {
    /// Email address pattern: something@something.something, no whitespace.
    static ref EMAIL: Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
    /// E.164-like phone pattern: optional `+`, first digit 1-9, up to 15
    /// digits total.
    static ref PHONE: Regex = Regex::new(r"^\+?[1-9]\d{1,14}$").unwrap();
}

/// Untyped inbound request body. Every field is optional so that a
/// missing or mistyped field produces a field error rather than a
/// deserialization failure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawAnalysisRequest {
    pub message_type: Option<String>,
    pub sender: Option<String>,
    pub subject: Option<String>,
    pub content: Option<String>,
    pub audio_data: Option<String>,
}

/// A single violated field constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validation failure carrying all violated constraints.
#[derive(Debug, Clone, thiserror::Error)]
#[error("validation failed: {}", self.details())]
pub struct ValidationError {
    pub errors: Vec<FieldError>,
}

impl ValidationError {
    /// Per-field messages joined for the error envelope's `details` field.
    pub fn details(&self) -> String {
        self.errors
            .iter()
            .map(FieldError::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Trim a field; a trimmed-empty string counts as absent.
fn normalize(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Validate a raw request into an [`AnalysisRequest`].
///
/// Collects every violation before returning, so a caller submitting a
/// bad type AND an oversized subject sees both in one round trip.
pub fn validate(raw: RawAnalysisRequest) -> Result<AnalysisRequest, ValidationError> {
    let mut errors = Vec::new();

    let message_type = match raw.message_type.as_deref().map(str::trim) {
        Some(t) => match MessageType::parse(t) {
            Some(mt) => Some(mt),
            None => {
                errors.push(FieldError {
                    field: "messageType",
                    message: "must be one of email, sms, call".to_string(),
                });
                None
            }
        },
        None => {
            errors.push(FieldError {
                field: "messageType",
                message: "is required".to_string(),
            });
            None
        }
    };

    let sender = match normalize(raw.sender) {
        Some(s) => {
            // Length and pattern are independent constraints; a sender
            // violating both reports both.
            if s.chars().count() > MAX_SENDER_LEN {
                errors.push(FieldError {
                    field: "sender",
                    message: format!("must be less than {MAX_SENDER_LEN} characters"),
                });
            }
            if !EMAIL.is_match(&s) && !PHONE.is_match(&s) {
                errors.push(FieldError {
                    field: "sender",
                    message: "must be a valid email or phone number".to_string(),
                });
            }
            Some(s)
        }
        None => {
            errors.push(FieldError {
                field: "sender",
                message: "is required".to_string(),
            });
            None
        }
    };

    let subject = normalize(raw.subject);
    if let Some(s) = &subject {
        if s.chars().count() > MAX_SUBJECT_LEN {
            errors.push(FieldError {
                field: "subject",
                message: format!("must be less than {MAX_SUBJECT_LEN} characters"),
            });
        }
    }

    let content = normalize(raw.content);
    if let Some(c) = &content {
        if c.chars().count() > MAX_CONTENT_LEN {
            errors.push(FieldError {
                field: "content",
                message: format!("must be less than {MAX_CONTENT_LEN} characters"),
            });
        }
    }

    let audio_data = normalize(raw.audio_data);
    if let Some(a) = &audio_data {
        if base64::engine::general_purpose::STANDARD.decode(a).is_err() {
            errors.push(FieldError {
                field: "audioData",
                message: "must be base64-encoded".to_string(),
            });
        }
    }

    // Cross-field rule: calls may substitute an audio recording for a
    // transcript; email and sms always need content.
    if let Some(mt) = message_type {
        let satisfied = match mt {
            MessageType::Call => content.is_some() || audio_data.is_some(),
            MessageType::Email | MessageType::Sms => content.is_some(),
        };
        if !satisfied {
            errors.push(FieldError {
                field: "content",
                message: "either content or audioData is required".to_string(),
            });
        }
    }

    if !errors.is_empty() {
        return Err(ValidationError { errors });
    }

    // Both unwraps are guarded: a None pushed an error above.
    Ok(AnalysisRequest {
        message_type: message_type.expect("checked"),
        sender: sender.expect("checked"),
        subject,
        content,
        audio_data,
    })
}
