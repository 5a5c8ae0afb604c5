//! Submission validation engine.
//!
//! [`validate`] checks a [`SubmissionRequest`] against the questions of a
//! [`Form`] and returns at most one message per question. An empty map means
//! the submission is acceptable.
//!
//! Rules, in evaluation order for each question:
//!
//! 1. Display-only questions (welcome, thank_you, statement) are skipped.
//! 2. A required question without a non-empty answer gets the required
//!    message and nothing else.
//! 3. An optional question without a non-empty answer is skipped.
//! 4. The type rule runs; the first violation wins.
//!
//! Questions are visited in `position` order so the same input always
//! produces the same map.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::messages;
use crate::model::{Form, Question, QuestionType, SubmissionRequest};

/// Question id to user-facing message.
pub type ValidationErrors = BTreeMap<String, String>;

/// Default rating scale upper bound.
pub const DEFAULT_MAX_RATING: i64 = 5;

/// Upload extensions accepted when a question does not configure its own.
pub const DEFAULT_ALLOWED_EXTENSIONS: &[&str] = &[
    ".pdf", ".doc", ".docx", ".png", ".jpg", ".jpeg", ".gif", ".webp", ".csv", ".xlsx", ".xls",
    ".txt", ".zip",
];

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+\-]+@[a-zA-Z0-9.\-]+\.[a-zA-Z]{2,}$")
        .expect("invalid email pattern")
});

/// Validate `request` against `form`.
pub fn validate(form: &Form, request: &SubmissionRequest) -> ValidationErrors {
    // Later answers for the same question overwrite earlier ones.
    let answers: HashMap<&str, &Value> = request
        .answers
        .iter()
        .map(|a| (a.question_id.as_str(), &a.value))
        .collect();

    let mut questions: Vec<&Question> = form.questions.iter().collect();
    questions.sort_by_key(|q| q.position);

    let mut errors = ValidationErrors::new();

    for question in questions {
        if question.question_type.is_display_only() {
            continue;
        }

        let value = answers
            .get(question.id.as_str())
            .copied()
            .filter(|v| !is_empty_value(v));

        let Some(value) = value else {
            if question.required {
                errors.insert(question.id.clone(), messages::required(&question.title));
            }
            continue;
        };

        if let Some(message) = check_type(question, value) {
            errors.insert(question.id.clone(), message);
        }
    }

    errors
}

/// Null, blank strings and empty arrays count as "no answer".
/// Zero and `false` are answers.
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

fn check_type(question: &Question, value: &Value) -> Option<String> {
    match question.question_type {
        QuestionType::Email => check_email(value),
        QuestionType::Url => check_url(value),
        QuestionType::Rating => check_rating(question, value),
        QuestionType::MultipleChoice => check_choice(question, value),
        QuestionType::Text | QuestionType::LongText => check_max_length(question, value),
        QuestionType::FileUpload => check_file_extension(question, value),
        _ => None,
    }
}

fn check_email(value: &Value) -> Option<String> {
    match value.as_str() {
        Some(s) if EMAIL_PATTERN.is_match(s) => None,
        _ => Some(messages::invalid_email()),
    }
}

fn check_url(value: &Value) -> Option<String> {
    match value.as_str() {
        Some(s) if s.starts_with("http://") || s.starts_with("https://") => None,
        _ => Some(messages::invalid_url()),
    }
}

fn check_rating(question: &Question, value: &Value) -> Option<String> {
    let max = question
        .settings
        .number("max")
        .map(|m| m as i64)
        .unwrap_or(DEFAULT_MAX_RATING);

    match value.as_f64() {
        Some(n) if n >= 1.0 && n <= max as f64 => None,
        _ => Some(messages::rating_out_of_range(max)),
    }
}

fn check_choice(question: &Question, value: &Value) -> Option<String> {
    let keys: HashSet<&str> = question.options.iter().map(|o| o.key.as_str()).collect();

    if question.settings.bool_or("multi_select", false) {
        let Some(items) = value.as_array() else {
            return Some(messages::invalid_option(&value.to_string()));
        };
        // Non-string elements are skipped; the message names the last bad option.
        items
            .iter()
            .filter_map(Value::as_str)
            .filter(|s| !keys.contains(s))
            .last()
            .map(messages::invalid_option)
    } else {
        match value.as_str() {
            Some(s) if keys.contains(s) => None,
            Some(s) => Some(messages::invalid_option(s)),
            None => Some(messages::invalid_option(&value.to_string())),
        }
    }
}

fn check_max_length(question: &Question, value: &Value) -> Option<String> {
    let text = value.as_str()?;
    let max = question.validations.number("max_length")? as i64;
    // Byte length, not characters.
    if text.len() as i64 > max {
        Some(messages::too_long(max))
    } else {
        None
    }
}

fn check_file_extension(question: &Question, value: &Value) -> Option<String> {
    let extension = value
        .as_str()
        .map(|s| file_extension(s).to_lowercase())
        .unwrap_or_default();

    let allowed = match question.settings.string_list("allowed_extensions") {
        Some(custom) => custom.iter().any(|e| e.to_lowercase() == extension),
        None => DEFAULT_ALLOWED_EXTENSIONS.contains(&extension.as_str()),
    };

    if allowed {
        None
    } else {
        Some(messages::file_type_not_allowed(&extension))
    }
}

/// Extension of the last path segment, including the dot. Empty when the
/// segment has no dot.
pub fn file_extension(name: &str) -> &str {
    let segment = name.rsplit('/').next().unwrap_or(name);
    match segment.rfind('.') {
        Some(i) => &segment[i..],
        None => "",
    }
}
