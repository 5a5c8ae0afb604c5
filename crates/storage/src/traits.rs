use async_trait::async_trait;

use effeff_core::{Form, FormStats, Submission};

use crate::error::{StorageError, UploadError};

/// The store operations the submission service needs.
///
/// ## Identifier discipline
///
/// Implementations that build text commands must run every slug and record
/// identifier through the guard in `effeff_core::guard` before use,
/// including identifiers that were just read back from the store, and
/// return `StorageError::Invalid` without touching the network when a check
/// fails.
///
/// ## Stats atomicity
///
/// `increment_form_stats` must apply the count and running-mean update as a
/// single atomic step. Callers run it concurrently for the same form and do
/// no locking of their own.
///
/// ## Thread Safety
///
/// Implementations must be `Send + Sync + 'static` to be used in axum
/// application state and from detached tasks.
#[async_trait]
pub trait FormStore: Send + Sync + 'static {
    /// Fetch a published form by slug, with its questions in position order.
    ///
    /// Returns `Err(StorageError::NotFound)` for unknown or unpublished slugs.
    async fn fetch_published_form(&self, slug: &str) -> Result<Form, StorageError>;

    /// Persist a validated submission and return the new record identifier.
    async fn create_submission(&self, submission: &Submission) -> Result<String, StorageError>;

    /// Count one more submission for `form_id` and fold `duration_seconds`
    /// into the running mean.
    async fn increment_form_stats(
        &self,
        form_id: &str,
        duration_seconds: i64,
    ) -> Result<(), StorageError>;

    /// Current aggregate for `form_id`, `None` before its first submission.
    async fn fetch_form_stats(&self, form_id: &str) -> Result<Option<FormStats>, StorageError>;

    /// Liveness probe.
    async fn health(&self) -> Result<(), StorageError>;
}

/// Object storage for uploaded files.
#[async_trait]
pub trait ObjectStorage: Send + Sync + 'static {
    /// Store `body` under `object_key` and return a URL referencing it.
    async fn upload(
        &self,
        object_key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<String, UploadError>;
}
