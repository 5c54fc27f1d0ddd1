use serde::{Deserialize, Serialize};

/// One immutable scam-log entry, created exactly once per successful
/// analysis call and never mutated afterwards.
///
/// The risk fields are stored flat for querying alongside the full
/// verdict JSON, mirroring the dashboard's table shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScamLogRecord {
    pub id: String,
    /// The authenticated owner. Backends must scope every read and write
    /// by this identity via the caller's own credentials, never by a
    /// caller-supplied parameter.
    pub user_id: String,
    pub message_type: String,
    pub sender: String,
    pub subject: Option<String>,
    pub content: String,
    pub risk_level: String,
    pub risk_score: f64,
    pub flagged_reasons: Vec<String>,
    /// The full verdict as returned to the caller.
    pub ai_analysis: serde_json::Value,
    /// ISO 8601 / RFC 3339 timestamp string.
    pub created_at: String,
}
