//! POST /submit/{form_slug}: the submission orchestrator.
//!
//! Slug check, form lookup, payload parsing (with uploads), validation,
//! metadata stamping, persistence, then a detached stats update.

use std::sync::Arc;

use axum::extract::{FromRequest, Multipart, Path, Request, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use effeff_core::{validate, validate_slug, Form, Submission, SubmissionRequest, ValidationErrors};

use super::middleware::{client_ip, remote_addr};
use super::payload::{read_json, read_multipart};
use super::state::AppState;
use super::stats::spawn_stats_update;

/// Request-level failures. Store details never reach the client; they are
/// logged where the error is raised.
#[derive(Debug, thiserror::Error)]
pub(crate) enum SubmitError {
    #[error("{0}")]
    BadInput(&'static str),

    #[error("Form not found or not published")]
    NotFound,

    #[error("Validation failed")]
    ValidationFailed(ValidationErrors),

    #[error("{0}")]
    Internal(&'static str),
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<&'a ValidationErrors>,
}

impl IntoResponse for SubmitError {
    fn into_response(self) -> Response {
        let status = match &self {
            SubmitError::BadInput(_) => StatusCode::BAD_REQUEST,
            SubmitError::NotFound => StatusCode::NOT_FOUND,
            SubmitError::ValidationFailed(_) => StatusCode::UNPROCESSABLE_ENTITY,
            SubmitError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let details = match &self {
            SubmitError::ValidationFailed(errors) => Some(errors),
            _ => None,
        };
        let body = ErrorBody {
            error: self.to_string(),
            details,
        };
        (status, Json(body)).into_response()
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct SubmissionResponse {
    pub success: bool,
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
    pub message: &'static str,
}

pub(crate) async fn handle_submit(
    State(state): State<Arc<AppState>>,
    Path(form_slug): Path<String>,
    request: Request,
) -> Result<(StatusCode, Json<SubmissionResponse>), SubmitError> {
    if validate_slug(&form_slug).is_err() {
        return Err(SubmitError::BadInput("Invalid form slug format"));
    }

    let form = load_form(&state, &form_slug).await?;

    let headers = request.headers().clone();
    let remote = remote_addr(&request);

    let mut submission = if is_multipart(&headers) {
        let multipart = Multipart::from_request(request, &state)
            .await
            .map_err(|_| SubmitError::BadInput("Failed to parse multipart form"))?;
        read_multipart(multipart, &form, state.uploads.as_deref()).await?
    } else {
        read_json(request.into_body()).await?
    };

    let errors = validate(&form, &submission);
    if !errors.is_empty() {
        tracing::debug!(slug = %form_slug, errors = errors.len(), "submission rejected");
        return Err(SubmitError::ValidationFailed(errors));
    }

    stamp_metadata(&mut submission, &headers, client_ip(&headers, remote));
    let duration_seconds = submission.metadata.duration_seconds;
    let submission = Submission::from_request(&form.id, submission);

    let id = state
        .store
        .create_submission(&submission)
        .await
        .map_err(|e| {
            tracing::error!(slug = %form_slug, form_id = %form.id, error = %e, "failed to create submission");
            SubmitError::Internal("Failed to save submission")
        })?;

    tracing::info!(slug = %form_slug, form_id = %form.id, submission_id = %id, "submission saved");
    spawn_stats_update(state.store.clone(), form.id.clone(), duration_seconds);

    Ok((
        StatusCode::CREATED,
        Json(SubmissionResponse {
            success: true,
            id,
            redirect_url: form.settings.redirect_url,
            message: "Submission saved successfully",
        }),
    ))
}

async fn load_form(state: &AppState, slug: &str) -> Result<Form, SubmitError> {
    state.store.fetch_published_form(slug).await.map_err(|e| {
        if e.is_not_found() {
            SubmitError::NotFound
        } else {
            tracing::error!(slug = %slug, error = %e, "failed to fetch form");
            SubmitError::Internal("Failed to load form")
        }
    })
}

fn is_multipart(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("multipart/form-data"))
}

/// Caller address, user agent and referrer come from the request, never
/// from the client payload.
fn stamp_metadata(submission: &mut SubmissionRequest, headers: &HeaderMap, ip: String) {
    let header_text = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string()
    };
    submission.metadata.ip = ip;
    submission.metadata.user_agent = header_text(header::USER_AGENT);
    submission.metadata.referrer = header_text(header::REFERER);
}
