//! PostgREST-style HTTP backend.
//!
//! Talks to a managed Postgres REST gateway (Supabase-compatible paths:
//! `/rest/v1/trusted_contacts`, `/rest/v1/scam_logs`). Every request
//! carries the service `apikey` header plus the caller's own bearer
//! token, so the database's row-level security policies — keyed on the
//! authenticated identity — decide which rows are visible or writable.
//! This process never widens a caller's access.
//!
//! `ureq` is synchronous, so each call runs inside `spawn_blocking`.

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::StorageError;
use crate::record::ScamLogRecord;
use crate::traits::{AuthScope, ScamLogStore};

/// Connection settings for the REST backend, resolved once at startup.
#[derive(Debug, Clone)]
pub struct RestStoreConfig {
    /// Base URL of the REST gateway, without trailing slash.
    pub base_url: String,
    /// Service/anon API key sent as the `apikey` header.
    pub api_key: String,
}

/// A `ScamLogStore` backed by a PostgREST gateway.
pub struct RestStore {
    config: RestStoreConfig,
}

/// Row shape of a trusted-contacts select.
#[derive(Deserialize)]
struct TrustedContactRow {
    contact_value: String,
}

impl RestStore {
    pub fn new(config: RestStoreConfig) -> Self {
        Self { config }
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.config.base_url, table)
    }
}

/// Map a ureq failure to a storage error. 401/403 mean the row-level
/// policy rejected the caller's token.
fn map_ureq_error(context: &str, err: ureq::Error) -> StorageError {
    match err {
        ureq::Error::StatusCode(code) if code == 401 || code == 403 => {
            StorageError::Denied(format!("{context}: HTTP {code}"))
        }
        other => StorageError::Backend(format!("{context}: {other}")),
    }
}

#[async_trait]
impl ScamLogStore for RestStore {
    async fn trusted_contacts(&self, scope: &AuthScope) -> Result<Vec<String>, StorageError> {
        let url = format!(
            "{}?select=contact_value&user_id=eq.{}",
            self.table_url("trusted_contacts"),
            scope.user_id
        );
        let api_key = self.config.api_key.clone();
        let bearer = scope.bearer_token.clone();

        let rows: Vec<TrustedContactRow> = tokio::task::spawn_blocking(move || {
            let agent = ureq::Agent::new_with_defaults();
            let response = agent
                .get(&url)
                .header("apikey", &api_key)
                .header("authorization", &format!("Bearer {bearer}"))
                .call()
                .map_err(|e| map_ureq_error("trusted_contacts select", e))?;
            response
                .into_body()
                .read_json()
                .map_err(|e| StorageError::Backend(format!("trusted_contacts decode: {e}")))
        })
        .await
        .map_err(|e| StorageError::Backend(format!("task join error: {e}")))??;

        Ok(rows.into_iter().map(|r| r.contact_value).collect())
    }

    async fn insert_scam_log(
        &self,
        scope: &AuthScope,
        record: ScamLogRecord,
    ) -> Result<(), StorageError> {
        let url = self.table_url("scam_logs");
        let api_key = self.config.api_key.clone();
        let bearer = scope.bearer_token.clone();

        tokio::task::spawn_blocking(move || {
            let agent = ureq::Agent::new_with_defaults();
            agent
                .post(&url)
                .header("apikey", &api_key)
                .header("authorization", &format!("Bearer {bearer}"))
                .header("prefer", "return=minimal")
                .send_json(&record)
                .map_err(|e| map_ureq_error("scam_logs insert", e))?;
            Ok::<_, StorageError>(())
        })
        .await
        .map_err(|e| StorageError::Backend(format!("task join error: {e}")))??;

        Ok(())
    }

    async fn list_scam_logs(
        &self,
        scope: &AuthScope,
        limit: usize,
    ) -> Result<Vec<ScamLogRecord>, StorageError> {
        let mut url = format!(
            "{}?select=*&user_id=eq.{}&order=created_at.desc",
            self.table_url("scam_logs"),
            scope.user_id
        );
        if limit > 0 {
            url.push_str(&format!("&limit={limit}"));
        }
        let api_key = self.config.api_key.clone();
        let bearer = scope.bearer_token.clone();

        let records: Vec<ScamLogRecord> = tokio::task::spawn_blocking(move || {
            let agent = ureq::Agent::new_with_defaults();
            let response = agent
                .get(&url)
                .header("apikey", &api_key)
                .header("authorization", &format!("Bearer {bearer}"))
                .call()
                .map_err(|e| map_ureq_error("scam_logs select", e))?;
            response
                .into_body()
                .read_json()
                .map_err(|e| StorageError::Backend(format!("scam_logs decode: {e}")))
        })
        .await
        .map_err(|e| StorageError::Backend(format!("task join error: {e}")))??;

        Ok(records)
    }
}
