//! Submission payload parsing: JSON bodies and multipart forms with uploads.

use std::collections::HashMap;

use axum::body::Body;
use axum::extract::Multipart;
use serde_json::Value;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use effeff_core::validate::file_extension;
use effeff_core::{Answer, Form, QuestionType, SubmissionMeta, SubmissionRequest};
use effeff_storage::ObjectStorage;

use super::submit::SubmitError;
use super::MAX_BODY_SIZE;

const MULTIPART_ERROR: SubmitError = SubmitError::BadInput("Failed to parse multipart form");

/// A file part held until the answers field has been read.
struct FilePart {
    file_name: String,
    content_type: String,
    body: Vec<u8>,
}

pub(crate) async fn read_json(body: Body) -> Result<SubmissionRequest, SubmitError> {
    let bytes = axum::body::to_bytes(body, MAX_BODY_SIZE)
        .await
        .map_err(|_| SubmitError::BadInput("Invalid request body"))?;
    serde_json::from_slice(&bytes).map_err(|_| SubmitError::BadInput("Invalid request body"))
}

/// Read a multipart submission.
///
/// `answers` is a required JSON field; `metadata` (JSON) and `started_at`
/// (RFC 3339) are optional and ignored when malformed. File parts are
/// matched by field name to `file_upload` questions and, when object
/// storage is configured, uploaded; the answer value becomes the returned
/// URL.
pub(crate) async fn read_multipart(
    mut multipart: Multipart,
    form: &Form,
    uploads: Option<&dyn ObjectStorage>,
) -> Result<SubmissionRequest, SubmitError> {
    let mut answers_field = None;
    let mut metadata_field = None;
    let mut started_at_field = None;
    let mut files: HashMap<String, FilePart> = HashMap::new();

    while let Some(field) = multipart.next_field().await.map_err(|_| MULTIPART_ERROR)? {
        let name = field.name().unwrap_or_default().to_string();

        if let Some(file_name) = field.file_name().map(str::to_string) {
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let body = field.bytes().await.map_err(|_| MULTIPART_ERROR)?;
            files.entry(name).or_insert(FilePart {
                file_name,
                content_type,
                body: body.to_vec(),
            });
            continue;
        }

        let text = field.text().await.map_err(|_| MULTIPART_ERROR)?;
        match name.as_str() {
            "answers" => answers_field = Some(text),
            "metadata" => metadata_field = Some(text),
            "started_at" => started_at_field = Some(text),
            _ => {}
        }
    }

    let answers_json = answers_field
        .filter(|s| !s.is_empty())
        .ok_or(SubmitError::BadInput("Missing answers field"))?;
    let answers: Option<Vec<Answer>> = serde_json::from_str(&answers_json)
        .map_err(|_| SubmitError::BadInput("Invalid answers JSON"))?;

    let mut request = SubmissionRequest {
        answers: answers.unwrap_or_default(),
        metadata: metadata_field
            .and_then(|m| serde_json::from_str::<SubmissionMeta>(&m).ok())
            .unwrap_or_default(),
        started_at: started_at_field
            .and_then(|s| OffsetDateTime::parse(s.trim(), &Rfc3339).ok()),
    };

    if let Some(storage) = uploads {
        attach_uploads(&mut request, form, &files, storage).await?;
    } else if !files.is_empty() {
        tracing::debug!(form_id = %form.id, files = files.len(), "uploads disabled, ignoring file parts");
    }

    Ok(request)
}

async fn attach_uploads(
    request: &mut SubmissionRequest,
    form: &Form,
    files: &HashMap<String, FilePart>,
    storage: &dyn ObjectStorage,
) -> Result<(), SubmitError> {
    for answer in request.answers.iter_mut() {
        let Some(question) = form.question(&answer.question_id) else {
            continue;
        };
        if question.question_type != QuestionType::FileUpload {
            continue;
        }
        let Some(file) = files.get(&answer.question_id) else {
            continue;
        };

        let key = object_key(&form.id, &question.id, &file.file_name);
        let url = storage
            .upload(&key, file.body.clone(), &file.content_type)
            .await
            .map_err(|e| {
                tracing::error!(form_id = %form.id, question_id = %question.id, error = %e, "file upload failed");
                SubmitError::Internal("File upload failed")
            })?;
        answer.value = Value::String(url);
    }
    Ok(())
}

/// `forms/<form id>/<question id>/<random token><original extension>`
fn object_key(form_id: &str, question_id: &str, file_name: &str) -> String {
    format!(
        "forms/{}/{}/{:032x}{}",
        form_id,
        question_id,
        rand::random::<u128>(),
        file_extension(file_name)
    )
}
