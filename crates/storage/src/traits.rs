use async_trait::async_trait;

use crate::error::StorageError;
use crate::record::ScamLogRecord;

/// The authenticated identity a storage call runs under.
///
/// `bearer_token` is the caller's own credential; backends that enforce
/// row-level security forward it verbatim so the database — not this
/// process — decides which rows the caller may touch. `user_id` is the
/// verified identity from that token, used by backends without an
/// external policy engine (the in-memory store).
#[derive(Debug, Clone)]
pub struct AuthScope {
    pub user_id: String,
    pub bearer_token: String,
}

/// Storage operations used by the analysis pipeline.
///
/// Every method is scoped to the identity in the [`AuthScope`]: a user
/// can only ever read their own trusted contacts and scam logs, and only
/// ever write records they own.
///
/// Implementations must be `Send + Sync + 'static` to be shared through
/// axum application state and across async task boundaries.
#[async_trait]
pub trait ScamLogStore: Send + Sync + 'static {
    /// Read the caller's trusted-contact values (emails and phone
    /// numbers). Fresh on every call; the pipeline never caches it.
    async fn trusted_contacts(&self, scope: &AuthScope) -> Result<Vec<String>, StorageError>;

    /// Append one immutable scam-log record owned by the caller.
    async fn insert_scam_log(
        &self,
        scope: &AuthScope,
        record: ScamLogRecord,
    ) -> Result<(), StorageError>;

    /// List the caller's scam-log records, newest first.
    ///
    /// `limit` of 0 means no limit.
    async fn list_scam_logs(
        &self,
        scope: &AuthScope,
        limit: usize,
    ) -> Result<Vec<ScamLogRecord>, StorageError>;
}
