//! In-process [`FormStore`] and [`ObjectStorage`] used by tests and by the
//! conformance suite.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use effeff_core::{Form, FormStats, RecordId, Slug, Submission};

use crate::error::{StorageError, UploadError};
use crate::traits::{FormStore, ObjectStorage};

#[derive(Default)]
struct Tables {
    /// Keyed by slug.
    forms: BTreeMap<String, Form>,
    submissions: Vec<(String, Submission)>,
    stats: BTreeMap<String, FormStats>,
}

/// Forms are seeded up front with [`MemoryStore::with_form`]; submissions and
/// stats accumulate behind a single lock, so stats updates are atomic.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    next_id: AtomicU64,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_form(mut self, form: Form) -> Self {
        self.tables.get_mut().forms.insert(form.slug.clone(), form);
        self
    }

    /// While set, every operation fails with [`StorageError::Unreachable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub async fn submissions(&self) -> Vec<(String, Submission)> {
        self.tables.lock().await.submissions.clone()
    }

    fn check_available(&self) -> Result<(), StorageError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StorageError::Unreachable("memory store offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl FormStore for MemoryStore {
    async fn fetch_published_form(&self, slug: &str) -> Result<Form, StorageError> {
        let slug = Slug::parse(slug)?;
        self.check_available()?;

        let tables = self.tables.lock().await;
        let mut form = tables
            .forms
            .get(slug.as_str())
            .filter(|f| f.is_published())
            .cloned()
            .ok_or_else(|| StorageError::NotFound {
                entity: "form",
                key: slug.to_string(),
            })?;
        RecordId::parse(&form.id)?;
        form.questions.sort_by_key(|q| q.position);
        Ok(form)
    }

    async fn create_submission(&self, submission: &Submission) -> Result<String, StorageError> {
        RecordId::parse(&submission.form_id)?;
        self.check_available()?;

        let id = format!(
            "submission:m{}",
            self.next_id.fetch_add(1, Ordering::SeqCst) + 1
        );
        let mut stored = submission.clone();
        stored.completed_at = Some(time::OffsetDateTime::now_utc());
        self.tables
            .lock()
            .await
            .submissions
            .push((id.clone(), stored));
        Ok(id)
    }

    async fn increment_form_stats(
        &self,
        form_id: &str,
        duration_seconds: i64,
    ) -> Result<(), StorageError> {
        RecordId::parse(form_id)?;
        self.check_available()?;

        self.tables
            .lock()
            .await
            .stats
            .entry(form_id.to_string())
            .or_insert_with(|| FormStats::new(form_id))
            .record(duration_seconds);
        Ok(())
    }

    async fn fetch_form_stats(&self, form_id: &str) -> Result<Option<FormStats>, StorageError> {
        RecordId::parse(form_id)?;
        self.check_available()?;
        Ok(self.tables.lock().await.stats.get(form_id).cloned())
    }

    async fn health(&self) -> Result<(), StorageError> {
        self.check_available()
    }
}

/// Object storage that keeps uploads in memory and returns `memory://` URLs.
#[derive(Default)]
pub struct MemoryObjectStorage {
    objects: Mutex<BTreeMap<String, (String, Vec<u8>)>>,
    failing: AtomicBool,
}

impl MemoryObjectStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Stored `(content_type, body)` by object key.
    pub async fn objects(&self) -> BTreeMap<String, (String, Vec<u8>)> {
        self.objects.lock().await.clone()
    }
}

#[async_trait]
impl ObjectStorage for MemoryObjectStorage {
    async fn upload(
        &self,
        object_key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<String, UploadError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(UploadError::Failed {
                key: object_key.to_string(),
                message: "object storage offline".to_string(),
            });
        }
        self.objects
            .lock()
            .await
            .insert(object_key.to_string(), (content_type.to_string(), body));
        Ok(format!("memory://{}", object_key))
    }
}
