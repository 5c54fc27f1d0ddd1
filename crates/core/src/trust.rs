//! Trusted-contact override.
//!
//! A per-user allowlist exempts known senders from classification-driven
//! flagging. The override is a hard downgrade to `safe` with one
//! exception: an explicit `scam` verdict from the model is never
//! suppressed by a trust entry. A `phishing` verdict IS downgraded;
//! only `scam` is exempt.

use crate::verdict::{AnalysisResult, RiskLevel};

/// Case-insensitive exact match of the sanitized sender against the
/// user's trusted-contact values.
pub fn is_trusted_sender(sender: &str, contacts: &[String]) -> bool {
    contacts
        .iter()
        .any(|c| c.to_lowercase() == sender.to_lowercase())
}

/// Force-downgrade a verdict for a trusted sender.
///
/// No-op when the model already returned `scam`.
pub fn apply_override(result: &mut AnalysisResult) {
    if result.risk_level == RiskLevel::Scam {
        return;
    }
    result.risk_level = RiskLevel::Safe;
    result.risk_score = 0.0;
    result.flagged_reasons = vec!["Trusted contact".to_string()];
}
