//! The analysis pipeline: validate → sanitize → prompt → classify →
//! trust override → persist.
//!
//! Each run is a request-scoped unit of work with no shared mutable
//! state: every storage call is scoped to the identity on the request's
//! credentials, and nothing is cached between runs. If the transport is
//! severed before the insert completes, the classification is lost and
//! the caller resubmits (at-most-once with an external side effect —
//! the provider may have billed a completion that was never stored).

use std::sync::Arc;

use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use phishguard_core::validate::{self, RawAnalysisRequest, ValidationError};
use phishguard_core::verdict::AnalysisResult;
use phishguard_core::{prompt, trust};
use phishguard_storage::{AuthScope, ScamLogRecord, ScamLogStore, StorageError};

use crate::auth::AuthenticatedUser;
use crate::classify::{ClassificationError, ClassificationProvider};

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Classification(#[from] ClassificationError),
    /// The insert failed after a successful classification. The verdict
    /// is discarded rather than returned un-persisted; the caller
    /// resubmits if they still want a stored record.
    #[error("failed to save analysis: {0}")]
    Persistence(#[source] StorageError),
    #[error("internal error: {0}")]
    Internal(String),
}

/// Orchestrates one analysis call end to end.
pub struct AnalysisPipeline {
    classifier: Arc<dyn ClassificationProvider>,
    store: Arc<dyn ScamLogStore>,
}

impl AnalysisPipeline {
    pub fn new(classifier: Arc<dyn ClassificationProvider>, store: Arc<dyn ScamLogStore>) -> Self {
        Self { classifier, store }
    }

    /// Run the full pipeline for an authenticated caller.
    ///
    /// Validation failures short-circuit before any network call.
    /// Classification failures propagate without a record being written.
    /// An unparsable model reply is not a failure — the fallback verdict
    /// is stored like any other.
    pub async fn run(
        &self,
        user: &AuthenticatedUser,
        raw: RawAnalysisRequest,
    ) -> Result<AnalysisResult, PipelineError> {
        let request = validate::validate(raw)?.sanitized();
        let prompt = prompt::build(&request);

        let audio = if prompt.attach_audio {
            request.audio_data.as_deref()
        } else {
            None
        };
        let reply = self.classifier.classify(&prompt, audio).await?;
        let mut verdict = AnalysisResult::from_model_reply(&reply);

        let scope = AuthScope {
            user_id: user.user_id.clone(),
            bearer_token: user.bearer_token.clone(),
        };

        // A failed allowlist read degrades to "not trusted" rather than
        // failing a classification the user already paid for.
        match self.store.trusted_contacts(&scope).await {
            Ok(contacts) => {
                if trust::is_trusted_sender(&request.sender, &contacts) {
                    log::debug!("trusted sender for user {}; overriding verdict", user.user_id);
                    trust::apply_override(&mut verdict);
                }
            }
            Err(e) => {
                log::warn!(
                    "trusted-contact lookup failed for user {}: {e}",
                    user.user_id
                );
            }
        }

        let record = ScamLogRecord {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user.user_id.clone(),
            message_type: request.message_type.to_string(),
            sender: request.sender.clone(),
            subject: request.subject.clone(),
            content: request.content.clone().unwrap_or_default(),
            risk_level: verdict.risk_level.to_string(),
            risk_score: verdict.risk_score,
            flagged_reasons: verdict.flagged_reasons.clone(),
            ai_analysis: serde_json::to_value(&verdict)
                .map_err(|e| PipelineError::Internal(format!("verdict serialization: {e}")))?,
            created_at: now_rfc3339(),
        };

        self.store
            .insert_scam_log(&scope, record)
            .await
            .map_err(PipelineError::Persistence)?;

        log::info!(
            "analysis stored: user={} type={} risk={}",
            user.user_id,
            request.message_type,
            verdict.risk_level
        );

        Ok(verdict)
    }
}

fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .expect("UTC timestamps always format as RFC 3339")
}
