//! Classification verdicts and model-reply parsing.
//!
//! The model is asked for JSON-only output but treated as untrusted:
//! the reply is parsed against a strict schema and any deviation routes
//! to a fixed, conservative fallback verdict instead of propagating
//! partially-typed data. Parsing never fails — every transport-successful
//! classification yields a storable verdict.

use serde::{Deserialize, Serialize};

/// Ordinal danger categories for an analyzed message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Safe,
    Suspicious,
    Scam,
    Phishing,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Safe => "safe",
            Self::Suspicious => "suspicious",
            Self::Scam => "scam",
            Self::Phishing => "phishing",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Recommended user actions: models return either free text or a list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Recommendations {
    Text(String),
    List(Vec<String>),
}

impl Default for Recommendations {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

/// The structured verdict for one analyzed message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub risk_level: RiskLevel,
    /// In [0, 1]: 0 = completely safe, 1 = definite scam.
    pub risk_score: f64,
    #[serde(default)]
    pub flagged_reasons: Vec<String>,
    #[serde(default)]
    pub analysis: String,
    #[serde(default)]
    pub recommendations: Recommendations,
}

impl AnalysisResult {
    /// The fixed verdict substituted when the model's reply cannot be
    /// parsed. Conservative by construction: flagged for manual review,
    /// never silently safe.
    pub fn fallback() -> Self {
        Self {
            risk_level: RiskLevel::Suspicious,
            risk_score: 0.5,
            flagged_reasons: vec!["Unable to complete full analysis".to_string()],
            analysis: "AI analysis could not be completed. Manual review recommended.".to_string(),
            recommendations: Recommendations::Text(
                "Review this message carefully before taking any action.".to_string(),
            ),
        }
    }

    /// Parse a model reply into a verdict, substituting [`fallback`]
    /// on any parse or schema failure.
    ///
    /// Models wrap JSON in prose more often than they should, so the
    /// first JSON object is extracted by locating the first `{` through
    /// the last `}`; if the reply has no braces at all it is parsed
    /// whole (the model may have returned a bare value).
    ///
    /// [`fallback`]: AnalysisResult::fallback
    pub fn from_model_reply(reply: &str) -> Self {
        let candidate = extract_json_object(reply).unwrap_or(reply);
        match serde_json::from_str::<AnalysisResult>(candidate) {
            Ok(result) if result.risk_score.is_finite() && (0.0..=1.0).contains(&result.risk_score) => {
                result
            }
            _ => Self::fallback(),
        }
    }
}

/// Slice out the first `{` through the last `}`, inclusive.
fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}
