use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;

use super::{fixture_submission, TestResult, PUBLISHED_ID};
use crate::{FormStore, StorageError};

/// Number of concurrent tasks to spawn in each test.
const N: usize = 10;

pub(super) async fn run_concurrent_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: FormStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "concurrent",
            "concurrent_creates_get_distinct_ids",
            concurrent_creates_get_distinct_ids(factory().await).await,
        ),
        TestResult::from_result(
            "concurrent",
            "concurrent_stats_increments_are_not_lost",
            concurrent_stats_increments_are_not_lost(factory().await).await,
        ),
    ]
}

async fn concurrent_creates_get_distinct_ids<S: FormStore>(store: S) -> Result<(), String> {
    let store = Arc::new(store);

    let mut handles = Vec::new();
    for _ in 0..N {
        let s = store.clone();
        handles.push(tokio::spawn(async move {
            s.create_submission(&fixture_submission(PUBLISHED_ID)).await
        }));
    }

    let mut ids = BTreeSet::new();
    for handle in handles {
        let id = handle
            .await
            .map_err(|e| format!("task panic: {e}"))?
            .map_err(|e: StorageError| format!("storage error: {e}"))?;
        ids.insert(id);
    }

    if ids.len() != N {
        return Err(format!("expected {N} distinct ids, got {}", ids.len()));
    }
    Ok(())
}

/// Stats increments for one form race each other; every one must land.
async fn concurrent_stats_increments_are_not_lost<S: FormStore>(store: S) -> Result<(), String> {
    let store = Arc::new(store);

    let mut handles = Vec::new();
    for i in 0..N {
        let s = store.clone();
        handles.push(tokio::spawn(async move {
            s.increment_form_stats(PUBLISHED_ID, i as i64).await
        }));
    }

    for handle in handles {
        handle
            .await
            .map_err(|e| format!("task panic: {e}"))?
            .map_err(|e: StorageError| format!("storage error: {e}"))?;
    }

    let stats = store
        .fetch_form_stats(PUBLISHED_ID)
        .await
        .map_err(|e| format!("read: {e}"))?
        .ok_or("no stats after concurrent increments")?;
    if stats.total_submissions != N as u64 {
        return Err(format!(
            "expected {N} submissions, got {} (lost updates)",
            stats.total_submissions
        ));
    }
    // Durations 0..N.
    let expected = (N - 1) as f64 / 2.0;
    if (stats.avg_duration - expected).abs() > 1e-9 {
        return Err(format!("expected mean {expected}, got {}", stats.avg_duration));
    }
    Ok(())
}
