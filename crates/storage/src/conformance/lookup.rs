use std::future::Future;

use super::{TestResult, CLOSED_SLUG, DRAFT_SLUG, PUBLISHED_ID, PUBLISHED_SLUG};
use crate::{FormStore, StorageError};

pub(super) async fn run_lookup_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: FormStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "lookup",
            "published_form_is_found",
            published_form_is_found(factory().await).await,
        ),
        TestResult::from_result(
            "lookup",
            "questions_in_position_order",
            questions_in_position_order(factory().await).await,
        ),
        TestResult::from_result(
            "lookup",
            "unpublished_forms_are_not_found",
            unpublished_forms_are_not_found(factory().await).await,
        ),
        TestResult::from_result(
            "lookup",
            "unknown_slug_is_not_found",
            unknown_slug_is_not_found(factory().await).await,
        ),
        TestResult::from_result(
            "lookup",
            "malformed_slug_is_rejected",
            malformed_slug_is_rejected(factory().await).await,
        ),
    ]
}

async fn published_form_is_found<S: FormStore>(store: S) -> Result<(), String> {
    let form = store
        .fetch_published_form(PUBLISHED_SLUG)
        .await
        .map_err(|e| format!("fetch: {e}"))?;
    if form.id != PUBLISHED_ID {
        return Err(format!("expected id {PUBLISHED_ID}, got {}", form.id));
    }
    if !form.is_published() {
        return Err(format!("expected published status, got {:?}", form.status));
    }
    Ok(())
}

async fn questions_in_position_order<S: FormStore>(store: S) -> Result<(), String> {
    let form = store
        .fetch_published_form(PUBLISHED_SLUG)
        .await
        .map_err(|e| format!("fetch: {e}"))?;
    let positions: Vec<i64> = form.questions.iter().map(|q| q.position).collect();
    if positions != [0, 1, 2] {
        return Err(format!("expected positions [0, 1, 2], got {positions:?}"));
    }
    Ok(())
}

async fn unpublished_forms_are_not_found<S: FormStore>(store: S) -> Result<(), String> {
    for slug in [DRAFT_SLUG, CLOSED_SLUG] {
        match store.fetch_published_form(slug).await {
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(format!("{slug}: expected NotFound, got {e}")),
            Ok(_) => return Err(format!("{slug}: unpublished form was returned")),
        }
    }
    Ok(())
}

async fn unknown_slug_is_not_found<S: FormStore>(store: S) -> Result<(), String> {
    match store.fetch_published_form("no-such-form").await {
        Err(e) if e.is_not_found() => Ok(()),
        Err(e) => Err(format!("expected NotFound, got {e}")),
        Ok(_) => Err("unknown slug resolved to a form".to_string()),
    }
}

async fn malformed_slug_is_rejected<S: FormStore>(store: S) -> Result<(), String> {
    for slug in ["Bad_Slug", "x", "-leading", "a' OR '1'='1"] {
        match store.fetch_published_form(slug).await {
            Err(StorageError::Invalid(_)) => {}
            Err(e) => return Err(format!("{slug:?}: expected Invalid, got {e}")),
            Ok(_) => return Err(format!("{slug:?}: malformed slug resolved to a form")),
        }
    }
    Ok(())
}
