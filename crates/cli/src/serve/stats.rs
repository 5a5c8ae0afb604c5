use std::sync::Arc;

use tokio::task::JoinHandle;

use effeff_storage::FormStore;

/// Fold one accepted submission into the form's stats on a detached task.
///
/// The caller never awaits the handle on the request path; failures are
/// logged and dropped.
pub(crate) fn spawn_stats_update(
    store: Arc<dyn FormStore>,
    form_id: String,
    duration_seconds: i64,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = store.increment_form_stats(&form_id, duration_seconds).await {
            tracing::warn!(form_id = %form_id, error = %e, "failed to update form stats");
        }
    })
}
