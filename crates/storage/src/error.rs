/// All errors that can be returned by a ScamLogStore implementation.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The backend rejected the caller's credentials — the row-level
    /// access policy refused the read or write.
    #[error("storage access denied: {0}")]
    Denied(String),

    /// A backend-specific storage error (connection, serialization,
    /// unexpected status).
    #[error("storage backend error: {0}")]
    Backend(String),
}
