//! [`FormStore`] backed by the document store's text-command HTTP API.

use async_trait::async_trait;
use serde::Deserialize;

use effeff_core::{Form, FormStats, Question, RecordId, Slug, Submission};

use crate::command;
use crate::envelope::first_rows;
use crate::error::StorageError;
use crate::traits::FormStore;
use crate::transport::{HttpTransport, StoreConfig, Transport};

/// Store client. Every identifier is guarded before it is interpolated into
/// a command; a failed check returns [`StorageError::Invalid`] without
/// calling the transport.
pub struct SurrealStore<T: Transport = HttpTransport> {
    transport: T,
}

#[derive(Debug, Deserialize)]
struct CreatedRow {
    id: String,
}

impl SurrealStore<HttpTransport> {
    pub fn connect(config: &StoreConfig) -> Self {
        SurrealStore::with_transport(HttpTransport::new(config))
    }
}

impl<T: Transport> SurrealStore<T> {
    pub fn with_transport(transport: T) -> Self {
        SurrealStore { transport }
    }

    async fn query<R: serde::de::DeserializeOwned>(
        &self,
        command: String,
    ) -> Result<Vec<R>, StorageError> {
        tracing::debug!(
            statement = statement_kind(&command),
            bytes = command.len(),
            "executing store command"
        );
        let body = self.transport.execute(command).await?;
        first_rows(&body)
    }
}

#[async_trait]
impl<T: Transport> FormStore for SurrealStore<T> {
    async fn fetch_published_form(&self, slug: &str) -> Result<Form, StorageError> {
        let slug = Slug::parse(slug)?;

        let mut forms: Vec<Form> = self.query(command::select_published_form(&slug)).await?;
        if forms.is_empty() {
            return Err(StorageError::NotFound {
                entity: "form",
                key: slug.to_string(),
            });
        }
        let mut form = forms.swap_remove(0);

        // The stored id is about to be spliced into the next command.
        let form_id = RecordId::parse(&form.id).map_err(|e| {
            tracing::error!(
                slug = %slug,
                form_id = %form.id,
                "stored form id failed the identifier check, possible tampering"
            );
            StorageError::Invalid(e)
        })?;

        let questions: Vec<Question> = self.query(command::select_questions(&form_id)).await?;
        form.questions = questions;
        Ok(form)
    }

    async fn create_submission(&self, submission: &Submission) -> Result<String, StorageError> {
        let form_id = RecordId::parse(&submission.form_id)?;
        let created: Vec<CreatedRow> = self
            .query(command::create_submission(&form_id, submission)?)
            .await?;

        created
            .into_iter()
            .next()
            .map(|row| row.id)
            .ok_or_else(|| StorageError::Internal("submission not created".to_string()))
    }

    async fn increment_form_stats(
        &self,
        form_id: &str,
        duration_seconds: i64,
    ) -> Result<(), StorageError> {
        let form_id = RecordId::parse(form_id)?;
        let _: Vec<serde_json::Value> = self
            .query(command::upsert_form_stats(&form_id, duration_seconds))
            .await?;
        Ok(())
    }

    async fn fetch_form_stats(&self, form_id: &str) -> Result<Option<FormStats>, StorageError> {
        let form_id = RecordId::parse(form_id)?;
        let rows: Vec<FormStats> = self.query(command::select_form_stats(&form_id)).await?;
        Ok(rows.into_iter().next())
    }

    async fn health(&self) -> Result<(), StorageError> {
        self.transport.ping().await
    }
}

/// Leading keyword and table of a command, for logs. Command bodies carry
/// respondents' answers and are never logged.
fn statement_kind(command: &str) -> String {
    let mut words = command.split_whitespace();
    match (words.next(), words.next()) {
        (Some("SELECT"), _) => command
            .split_whitespace()
            .skip_while(|w| *w != "FROM")
            .nth(1)
            .map(|table| format!("SELECT {}", table))
            .unwrap_or_else(|| "SELECT".to_string()),
        (Some(verb), Some(table)) => format!("{} {}", verb, table),
        (Some(verb), None) => verb.to_string(),
        (None, _) => String::new(),
    }
}
