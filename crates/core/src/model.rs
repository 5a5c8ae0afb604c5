//! Form, question, answer and submission records.
//!
//! Field names follow the store's JSON documents; unknown fields on stored
//! records are ignored and explicit nulls decode as defaults.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

use crate::config::ConfigMap;

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ──────────────────────────────────────────────
// Form
// ──────────────────────────────────────────────

/// Lifecycle status of a form. Only published forms accept submissions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormStatus {
    #[default]
    Draft,
    Published,
    Closed,
    /// Any status this service does not know about.
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notify_email: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub show_progress: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub allow_multiple: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub close_date: Option<String>,
}

/// A form definition as read from the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Form {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub slug: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: FormStatus,
    #[serde(default, deserialize_with = "null_as_default")]
    pub settings: FormSettings,
    #[serde(default, deserialize_with = "null_as_default")]
    pub questions: Vec<Question>,
}

impl Form {
    pub fn question(&self, id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }

    pub fn is_published(&self) -> bool {
        self.status == FormStatus::Published
    }
}

// ──────────────────────────────────────────────
// Question
// ──────────────────────────────────────────────

/// Question type tag.
///
/// Unknown tags round-trip through [`QuestionType::Other`] so a form using a
/// type this service has no rule for still validates (required check only).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum QuestionType {
    Welcome,
    ThankYou,
    Statement,
    Text,
    LongText,
    Email,
    Url,
    Rating,
    MultipleChoice,
    FileUpload,
    Other(String),
}

impl QuestionType {
    pub fn as_str(&self) -> &str {
        match self {
            QuestionType::Welcome => "welcome",
            QuestionType::ThankYou => "thank_you",
            QuestionType::Statement => "statement",
            QuestionType::Text => "text",
            QuestionType::LongText => "long_text",
            QuestionType::Email => "email",
            QuestionType::Url => "url",
            QuestionType::Rating => "rating",
            QuestionType::MultipleChoice => "multiple_choice",
            QuestionType::FileUpload => "file_upload",
            QuestionType::Other(s) => s,
        }
    }

    /// Display-only screens carry no answer and are never validated.
    pub fn is_display_only(&self) -> bool {
        matches!(
            self,
            QuestionType::Welcome | QuestionType::ThankYou | QuestionType::Statement
        )
    }
}

impl From<String> for QuestionType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "welcome" => QuestionType::Welcome,
            "thank_you" => QuestionType::ThankYou,
            "statement" => QuestionType::Statement,
            "text" => QuestionType::Text,
            "long_text" => QuestionType::LongText,
            "email" => QuestionType::Email,
            "url" => QuestionType::Url,
            "rating" => QuestionType::Rating,
            "multiple_choice" => QuestionType::MultipleChoice,
            "file_upload" => QuestionType::FileUpload,
            _ => QuestionType::Other(s),
        }
    }
}

impl From<&str> for QuestionType {
    fn from(s: &str) -> Self {
        QuestionType::from(s.to_string())
    }
}

impl From<QuestionType> for String {
    fn from(t: QuestionType) -> Self {
        match t {
            QuestionType::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceOption {
    pub key: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub form_id: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub position: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub required: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub options: Vec<ChoiceOption>,
    #[serde(default)]
    pub settings: ConfigMap,
    #[serde(default)]
    pub validations: ConfigMap,
}

impl Question {
    /// Minimal question for fixtures and offline tooling.
    pub fn new(id: &str, question_type: impl Into<QuestionType>, title: &str) -> Self {
        Question {
            id: id.to_string(),
            form_id: String::new(),
            question_type: question_type.into(),
            title: title.to_string(),
            position: 0,
            required: false,
            options: Vec::new(),
            settings: ConfigMap::default(),
            validations: ConfigMap::default(),
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn at(mut self, position: i64) -> Self {
        self.position = position;
        self
    }

    pub fn with_options(mut self, keys: &[&str]) -> Self {
        self.options = keys
            .iter()
            .map(|k| ChoiceOption {
                key: k.to_string(),
                label: k.to_string(),
            })
            .collect();
        self
    }

    pub fn with_settings(mut self, settings: ConfigMap) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_validations(mut self, validations: ConfigMap) -> Self {
        self.validations = validations;
        self
    }
}

// ──────────────────────────────────────────────
// Submissions
// ──────────────────────────────────────────────

/// One answer as submitted by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub question_id: String,
    #[serde(default)]
    pub value: Value,
}

impl Answer {
    pub fn new(question_id: &str, value: impl Into<Value>) -> Self {
        Answer {
            question_id: question_id.to_string(),
            value: value.into(),
        }
    }
}

/// Request metadata. `ip`, `user_agent` and `referrer` are overwritten by
/// the server from the request itself; `duration_seconds` comes from the
/// client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubmissionMeta {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ip: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub user_agent: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub referrer: String,
    #[serde(default)]
    pub duration_seconds: i64,
}

/// Inbound payload for `POST /submit/{slug}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubmissionRequest {
    #[serde(default, deserialize_with = "null_as_default")]
    pub answers: Vec<Answer>,
    #[serde(default)]
    pub metadata: SubmissionMeta,
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub started_at: Option<OffsetDateTime>,
}

/// A validated submission ready to persist.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Submission {
    pub form_id: String,
    pub answers: Vec<Answer>,
    pub metadata: SubmissionMeta,
    #[serde(with = "time::serde::rfc3339::option")]
    pub started_at: Option<OffsetDateTime>,
    /// Assigned by the store when the record is created.
    #[serde(with = "time::serde::rfc3339::option")]
    pub completed_at: Option<OffsetDateTime>,
}

impl Submission {
    pub fn from_request(form_id: &str, request: SubmissionRequest) -> Self {
        Submission {
            form_id: form_id.to_string(),
            answers: request.answers,
            metadata: request.metadata,
            started_at: request.started_at,
            completed_at: None,
        }
    }
}

// ──────────────────────────────────────────────
// Stats
// ──────────────────────────────────────────────

/// Per-form aggregate maintained as a running mean.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormStats {
    pub form_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_submissions: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub avg_duration: f64,
}

impl FormStats {
    pub fn new(form_id: &str) -> Self {
        FormStats {
            form_id: form_id.to_string(),
            ..Default::default()
        }
    }

    /// Fold one submission in: `avg' = (avg * (n - 1) + d) / n` with the
    /// post-increment count `n`. The remote store runs the same arithmetic
    /// in a single statement.
    pub fn record(&mut self, duration_seconds: i64) {
        self.total_submissions += 1;
        let n = self.total_submissions as f64;
        self.avg_duration = (self.avg_duration * (n - 1.0) + duration_seconds as f64) / n;
    }
}
