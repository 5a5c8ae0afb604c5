use effeff_core::GuardError;

/// All errors that can be returned by a [`FormStore`](crate::FormStore)
/// implementation.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// No row matched, e.g. an unknown or unpublished form slug.
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    /// A slug or record identifier failed the guard. Raised before any
    /// network call, or when an identifier read back from the store is
    /// malformed.
    #[error("invalid identifier: {0}")]
    Invalid(#[from] GuardError),

    /// Transport failure: connection refused, DNS, deadline exceeded.
    #[error("store unreachable: {0}")]
    Unreachable(String),

    /// The store answered with a non-success HTTP or statement status.
    #[error("store error ({status}): {message}")]
    Backend { status: String, message: String },

    /// The response did not have the expected shape.
    #[error("failed to decode store response: {0}")]
    Decode(String),

    /// The store accepted the command but produced nothing.
    #[error("internal store error: {0}")]
    Internal(String),
}

impl StorageError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound { .. })
    }
}

/// Errors from an [`ObjectStorage`](crate::ObjectStorage) backend.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("upload of {key} failed: {message}")]
    Failed { key: String, message: String },
}
