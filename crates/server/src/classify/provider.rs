use async_trait::async_trait;

use phishguard_core::prompt::AnalysisPrompt;

/// Failure modes of a classification call.
///
/// Rate limiting and quota exhaustion are surfaced distinctly so the
/// caller can decide whether to retry; nothing here retries internally.
/// A reply that arrives but cannot be parsed is NOT an error — verdict
/// parsing substitutes the fallback instead (`AnalysisResult::from_model_reply`).
#[derive(Debug, thiserror::Error)]
pub enum ClassificationError {
    /// The provider signalled throttling (HTTP 429).
    #[error("AI rate limit exceeded")]
    RateLimited,
    /// The provider signalled billing/credit exhaustion (HTTP 402).
    #[error("AI credits exhausted")]
    QuotaExhausted,
    /// Any other non-success or malformed response from the provider.
    #[error("AI upstream failure: {0}")]
    Upstream(String),
    /// Local failure before or after the network call.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Sends a prompt (plus optional audio payload) to the classification
/// model and returns the model's raw reply text.
#[async_trait]
pub trait ClassificationProvider: Send + Sync + 'static {
    async fn classify(
        &self,
        prompt: &AnalysisPrompt,
        audio_data: Option<&str>,
    ) -> Result<String, ClassificationError>;
}
