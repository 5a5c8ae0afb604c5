//! Text command construction.
//!
//! Every builder takes already-guarded inputs ([`Slug`], [`RecordId`]), so a
//! command cannot be produced from an unchecked identifier. Free-form data
//! (answers, metadata) is embedded as serialized JSON literals.

use serde::Serialize;
use serde_json::Value;
use time::format_description::well_known::Rfc3339;
use time::{OffsetDateTime, UtcOffset};

use effeff_core::{RecordId, Slug, Submission, SubmissionMeta};

use crate::error::StorageError;

/// Answer as written to the store. The store's command language drops a
/// field named `value`, so the answer is stored as `answer_value`.
#[derive(Debug, Serialize)]
pub(crate) struct WireAnswer<'a> {
    pub question_id: &'a str,
    pub answer_value: &'a Value,
}

pub(crate) fn select_published_form(slug: &Slug) -> String {
    format!(
        "SELECT * FROM form WHERE slug = '{}' AND status = 'published' LIMIT 1;",
        slug.escaped()
    )
}

pub(crate) fn select_questions(form_id: &RecordId) -> String {
    format!(
        "SELECT * FROM question WHERE form_id = {} ORDER BY position ASC;",
        form_id
    )
}

pub(crate) fn create_submission(
    form_id: &RecordId,
    submission: &Submission,
) -> Result<String, StorageError> {
    let answers: Vec<WireAnswer<'_>> = submission
        .answers
        .iter()
        .map(|a| WireAnswer {
            question_id: &a.question_id,
            answer_value: &a.value,
        })
        .collect();

    let answers_json = to_json_literal(&answers)?;
    let metadata_json = to_json_literal::<SubmissionMeta>(&submission.metadata)?;
    let started_at = store_timestamp(submission.started_at)?;

    Ok(format!(
        "CREATE submission SET form_id = {}, answers = {}, metadata = {}, started_at = d'{}', completed_at = time::now();",
        form_id, answers_json, metadata_json, started_at
    ))
}

/// Upsert-and-increment in one statement. `total_submissions` is bumped
/// first, so the mean is recomputed with the post-increment count.
pub(crate) fn upsert_form_stats(form_id: &RecordId, duration_seconds: i64) -> String {
    format!(
        "UPSERT form_stats SET form_id = {id}, total_submissions += 1, \
         avg_duration = ((avg_duration ?? 0) * (total_submissions - 1) + <float> {d}) / total_submissions, \
         updated_at = time::now() WHERE form_id = {id};",
        id = form_id,
        d = duration_seconds
    )
}

pub(crate) fn select_form_stats(form_id: &RecordId) -> String {
    format!("SELECT * FROM form_stats WHERE form_id = {} LIMIT 1;", form_id)
}

fn to_json_literal<T: Serialize + ?Sized>(value: &T) -> Result<String, StorageError> {
    serde_json::to_string(value)
        .map_err(|e| StorageError::Internal(format!("failed to serialize command data: {}", e)))
}

/// UTC, RFC 3339, whole seconds. Falls back to the current instant.
fn store_timestamp(t: Option<OffsetDateTime>) -> Result<String, StorageError> {
    t.unwrap_or_else(OffsetDateTime::now_utc)
        .to_offset(UtcOffset::UTC)
        .replace_nanosecond(0)
        .map_err(|e| StorageError::Internal(e.to_string()))?
        .format(&Rfc3339)
        .map_err(|e| StorageError::Internal(format!("failed to format timestamp: {}", e)))
}
