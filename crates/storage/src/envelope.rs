//! Response envelope returned by the store's text-command endpoint.
//!
//! The body is a JSON array with one entry per statement:
//! `[{"status": "OK", "time": "...", "result": [...]}]`. Every command this
//! crate sends is a single statement, so only the first entry is read.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::error::StorageError;

#[derive(Debug, Deserialize)]
struct StatementResult {
    #[serde(default)]
    status: String,
    #[serde(default)]
    result: Value,
}

/// Decode the rows of the first statement in `body`.
///
/// A `null` result decodes as no rows. A non-`OK` statement status becomes
/// [`StorageError::Backend`] carrying the store's message.
pub(crate) fn first_rows<T: DeserializeOwned>(body: &str) -> Result<Vec<T>, StorageError> {
    let mut statements: Vec<StatementResult> = serde_json::from_str(body)
        .map_err(|e| StorageError::Decode(format!("response envelope: {}", e)))?;

    if statements.is_empty() {
        return Err(StorageError::Decode("empty response envelope".to_string()));
    }
    let first = statements.swap_remove(0);

    if first.status != "OK" {
        let message = match first.result {
            Value::String(s) => s,
            other => other.to_string(),
        };
        return Err(StorageError::Backend {
            status: first.status,
            message,
        });
    }

    match first.result {
        Value::Null => Ok(Vec::new()),
        rows => serde_json::from_value(rows)
            .map_err(|e| StorageError::Decode(format!("statement rows: {}", e))),
    }
}
