//! effeff-core: form schema model and submission validation engine.
//!
//! Everything in this crate is pure: no I/O, no clock reads outside of the
//! model constructors, no async. The storage and HTTP layers build on it.
//!
//! # Public API
//!
//! - [`validate()`] -- run the validation engine over a submission request
//! - [`Slug`], [`RecordId`], [`escape_text()`] -- the identifier guard that
//!   gates every value before it reaches a store command
//! - [`ConfigMap`] -- untyped question configuration with safe downcasts
//! - Model types: [`Form`], [`Question`], [`QuestionType`], [`Answer`],
//!   [`SubmissionRequest`], [`Submission`], [`FormStats`]

pub mod config;
pub mod guard;
pub mod messages;
pub mod model;
pub mod validate;

// ── Convenience re-exports ───────────────────────────────────────────

pub use config::ConfigMap;
pub use guard::{escape_text, validate_record_id, validate_slug, GuardError, RecordId, Slug};
pub use model::{
    Answer, ChoiceOption, Form, FormSettings, FormStats, FormStatus, Question, QuestionType,
    Submission, SubmissionMeta, SubmissionRequest,
};
pub use validate::{is_empty_value, validate, ValidationErrors};
