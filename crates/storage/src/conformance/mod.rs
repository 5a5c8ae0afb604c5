//! Conformance test suite for `FormStore` implementations.
//!
//! Any backend can run this suite to check the behaviour the submission
//! service relies on:
//!
//! - **Lookup**: only published forms resolve, questions come back in
//!   position order, malformed slugs are rejected
//! - **Submission**: creates return fresh identifiers, malformed form ids are
//!   rejected, stats follow the running mean
//! - **Concurrency**: parallel creates get distinct ids and parallel stats
//!   increments are never lost
//!
//! # Usage
//!
//! Backend crates call [`run_conformance_suite`] with a factory that returns a
//! fresh store seeded with [`fixture_forms`]:
//!
//! ```ignore
//! use effeff_storage::conformance::{fixture_forms, run_conformance_suite};
//!
//! #[tokio::test]
//! async fn staging_conformance() {
//!     let report = run_conformance_suite(|| async {
//!         seed_staging_store(fixture_forms()).await
//!     }).await;
//!     assert!(report.failed == 0, "{report}");
//! }
//! ```

mod concurrent;
mod lookup;
mod submission;

use std::fmt;
use std::future::Future;

use effeff_core::{Answer, Form, FormStatus, Question, Submission, SubmissionRequest};

use crate::FormStore;

/// Slug of the published fixture form.
pub const PUBLISHED_SLUG: &str = "conformance-form";
/// Record id of the published fixture form.
pub const PUBLISHED_ID: &str = "form:conf1";
pub const DRAFT_SLUG: &str = "conformance-draft";
pub const CLOSED_SLUG: &str = "conformance-closed";

/// Result of a single conformance test.
#[derive(Debug, Clone)]
pub struct TestResult {
    /// Test category (e.g. "lookup", "submission").
    pub category: String,
    pub name: String,
    pub passed: bool,
    /// Error message if the test failed.
    pub message: Option<String>,
}

impl TestResult {
    fn from_result(category: &str, name: &str, result: Result<(), String>) -> Self {
        let (passed, message) = match result {
            Ok(()) => (true, None),
            Err(msg) => (false, Some(msg)),
        };
        Self {
            category: category.to_string(),
            name: name.to_string(),
            passed,
            message,
        }
    }
}

/// Aggregated report from a full conformance suite run.
#[derive(Debug, Clone)]
pub struct ConformanceReport {
    pub results: Vec<TestResult>,
    pub passed: usize,
    pub failed: usize,
    pub total: usize,
}

impl fmt::Display for ConformanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Conformance: {}/{} passed ({} failed)",
            self.passed, self.total, self.failed
        )?;
        for r in &self.results {
            if !r.passed {
                writeln!(
                    f,
                    "  FAIL [{}/{}]: {}",
                    r.category,
                    r.name,
                    r.message.as_deref().unwrap_or("(no message)")
                )?;
            }
        }
        Ok(())
    }
}

/// Run the full conformance suite against a store.
///
/// `factory` is called once per test and must return a store seeded with
/// exactly the forms from [`fixture_forms`].
pub async fn run_conformance_suite<S, F, Fut>(factory: F) -> ConformanceReport
where
    S: FormStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.extend(lookup::run_lookup_tests(&factory).await);
    results.extend(submission::run_submission_tests(&factory).await);
    results.extend(concurrent::run_concurrent_tests(&factory).await);

    let passed = results.iter().filter(|r| r.passed).count();
    let total = results.len();

    ConformanceReport {
        results,
        passed,
        failed: total - passed,
        total,
    }
}

/// Seed data: one published form whose questions are stored out of
/// position order, plus a draft and a closed form.
pub fn fixture_forms() -> Vec<Form> {
    let published = Form {
        id: PUBLISHED_ID.to_string(),
        title: "Conformance".to_string(),
        slug: PUBLISHED_SLUG.to_string(),
        status: FormStatus::Published,
        settings: Default::default(),
        questions: vec![
            Question::new("question:c3", "email", "E-Mail").at(2),
            Question::new("question:a1", "welcome", "Hallo").at(0),
            Question::new("question:b2", "text", "Name").required().at(1),
        ],
    };
    let draft = Form {
        id: "form:conf2".to_string(),
        slug: DRAFT_SLUG.to_string(),
        status: FormStatus::Draft,
        questions: Vec::new(),
        ..published.clone()
    };
    let closed = Form {
        id: "form:conf3".to_string(),
        slug: CLOSED_SLUG.to_string(),
        status: FormStatus::Closed,
        questions: Vec::new(),
        ..published.clone()
    };
    vec![published, draft, closed]
}

fn fixture_submission(form_id: &str) -> Submission {
    let mut request = SubmissionRequest::default();
    request.answers.push(Answer::new("question:b2", "Conformance"));
    request.metadata.duration_seconds = 7;
    Submission::from_request(form_id, request)
}
