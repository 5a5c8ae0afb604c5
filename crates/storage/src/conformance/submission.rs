use std::future::Future;

use super::{fixture_submission, TestResult, PUBLISHED_ID};
use crate::{FormStore, StorageError};

pub(super) async fn run_submission_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: FormStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "submission",
            "create_returns_distinct_ids",
            create_returns_distinct_ids(factory().await).await,
        ),
        TestResult::from_result(
            "submission",
            "malformed_form_id_is_rejected",
            malformed_form_id_is_rejected(factory().await).await,
        ),
        TestResult::from_result(
            "submission",
            "stats_follow_running_mean",
            stats_follow_running_mean(factory().await).await,
        ),
    ]
}

async fn create_returns_distinct_ids<S: FormStore>(store: S) -> Result<(), String> {
    let submission = fixture_submission(PUBLISHED_ID);
    let first = store
        .create_submission(&submission)
        .await
        .map_err(|e| format!("first create: {e}"))?;
    let second = store
        .create_submission(&submission)
        .await
        .map_err(|e| format!("second create: {e}"))?;

    if first.is_empty() || second.is_empty() {
        return Err("create returned an empty identifier".to_string());
    }
    if first == second {
        return Err(format!("both creates returned {first}"));
    }
    Ok(())
}

async fn malformed_form_id_is_rejected<S: FormStore>(store: S) -> Result<(), String> {
    for form_id in ["form:abc 123", "table:abc", "form:x; DELETE form"] {
        match store.create_submission(&fixture_submission(form_id)).await {
            Err(StorageError::Invalid(_)) => {}
            Err(e) => return Err(format!("{form_id:?}: expected Invalid, got {e}")),
            Ok(id) => return Err(format!("{form_id:?}: submission created as {id}")),
        }
        match store.increment_form_stats(form_id, 1).await {
            Err(StorageError::Invalid(_)) => {}
            Err(e) => return Err(format!("{form_id:?} stats: expected Invalid, got {e}")),
            Ok(()) => return Err(format!("{form_id:?}: stats updated")),
        }
    }
    Ok(())
}

async fn stats_follow_running_mean<S: FormStore>(store: S) -> Result<(), String> {
    match store.fetch_form_stats(PUBLISHED_ID).await {
        Ok(None) => {}
        Ok(Some(stats)) => return Err(format!("stats exist before any submission: {stats:?}")),
        Err(e) => return Err(format!("initial read: {e}")),
    }
    for d in [10, 20, 30] {
        store
            .increment_form_stats(PUBLISHED_ID, d)
            .await
            .map_err(|e| format!("increment {d}: {e}"))?;
    }
    let stats = store
        .fetch_form_stats(PUBLISHED_ID)
        .await
        .map_err(|e| format!("read: {e}"))?
        .ok_or("no stats after three increments")?;
    if stats.total_submissions != 3 {
        return Err(format!("expected 3 submissions, got {}", stats.total_submissions));
    }
    if (stats.avg_duration - 20.0).abs() > 1e-9 {
        return Err(format!("expected mean 20, got {}", stats.avg_duration));
    }
    Ok(())
}
