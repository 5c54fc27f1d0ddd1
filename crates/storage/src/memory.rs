//! In-memory backend for tests and local development.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::StorageError;
use crate::record::ScamLogRecord;
use crate::traits::{AuthScope, ScamLogStore};

/// A `ScamLogStore` holding everything in process memory, scoped by
/// `user_id`. The bearer token is ignored: there is no external policy
/// engine, the verified identity on the scope is the policy.
#[derive(Default)]
pub struct MemoryStore {
    trusted: RwLock<HashMap<String, Vec<String>>>,
    logs: RwLock<HashMap<String, Vec<ScamLogRecord>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a trusted contact for a user.
    pub async fn add_trusted_contact(&self, user_id: &str, contact_value: &str) {
        self.trusted
            .write()
            .await
            .entry(user_id.to_string())
            .or_default()
            .push(contact_value.to_string());
    }
}

#[async_trait]
impl ScamLogStore for MemoryStore {
    async fn trusted_contacts(&self, scope: &AuthScope) -> Result<Vec<String>, StorageError> {
        Ok(self
            .trusted
            .read()
            .await
            .get(&scope.user_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn insert_scam_log(
        &self,
        scope: &AuthScope,
        record: ScamLogRecord,
    ) -> Result<(), StorageError> {
        if record.user_id != scope.user_id {
            return Err(StorageError::Denied(format!(
                "record owner {} does not match authenticated user {}",
                record.user_id, scope.user_id
            )));
        }
        self.logs
            .write()
            .await
            .entry(scope.user_id.clone())
            .or_default()
            .push(record);
        Ok(())
    }

    async fn list_scam_logs(
        &self,
        scope: &AuthScope,
        limit: usize,
    ) -> Result<Vec<ScamLogRecord>, StorageError> {
        let logs = self.logs.read().await;
        let mut records = logs.get(&scope.user_id).cloned().unwrap_or_default();
        records.reverse(); // newest first
        if limit > 0 {
            records.truncate(limit);
        }
        Ok(records)
    }
}
