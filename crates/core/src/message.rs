//! Message types accepted by the analysis pipeline.

use serde::{Deserialize, Serialize};

use crate::sanitize;

/// The kind of communication being reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Email,
    Sms,
    Call,
}

impl MessageType {
    /// Parse a raw type string. Returns `None` for anything outside the
    /// accepted set; the validator turns that into a field error.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "email" => Some(Self::Email),
            "sms" => Some(Self::Sms),
            "call" => Some(Self::Call),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Sms => "sms",
            Self::Call => "call",
        }
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated analysis request, constructed per call by
/// [`crate::validate::validate`].
///
/// Field invariants (enforced by the validator):
/// - `sender` is 1-255 chars and matches the email or phone pattern
/// - `subject` and `content` are trimmed; trimmed-empty became `None`
/// - for `Call`, at least one of `content`/`audio_data` is present;
///   for `Email`/`Sms`, `content` is present
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRequest {
    pub message_type: MessageType,
    pub sender: String,
    pub subject: Option<String>,
    pub content: Option<String>,
    /// Base64-encoded audio payload, passed through opaquely to the model.
    pub audio_data: Option<String>,
}

impl AnalysisRequest {
    /// Apply HTML/script-injection sanitization to the text fields.
    ///
    /// The audio payload is untouched: it is base64 and never rendered.
    pub fn sanitized(mut self) -> Self {
        self.sender = sanitize::clean(&self.sender);
        self.subject = self.subject.map(|s| sanitize::clean(&s));
        self.content = self.content.map(|c| sanitize::clean(&c));
        self
    }
}
