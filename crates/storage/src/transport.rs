//! HTTP transport to the document store.
//!
//! ureq is synchronous, so every call is moved onto the blocking pool.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::StorageError;

/// Sends one text command and returns the raw response body.
///
/// [`SurrealStore`](crate::SurrealStore) is generic over this seam so its
/// command and decoding logic can be driven by a scripted transport in tests.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn execute(&self, command: String) -> Result<String, StorageError>;

    /// Succeeds when the store's health endpoint answers with a 2xx status.
    async fn ping(&self) -> Result<(), StorageError>;
}

/// Connection settings for [`HttpTransport`].
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub base_url: String,
    pub user: String,
    pub pass: String,
    pub namespace: String,
    pub database: String,
    pub timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            base_url: "http://localhost:8000".to_string(),
            user: "root".to_string(),
            pass: "formflow_secret".to_string(),
            namespace: "formflow".to_string(),
            database: "main".to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

/// `POST {base_url}/sql` with namespace, database and basic-auth headers.
#[derive(Clone)]
pub struct HttpTransport {
    agent: ureq::Agent,
    sql_url: String,
    health_url: String,
    namespace: String,
    database: String,
    authorization: String,
}

impl HttpTransport {
    pub fn new(config: &StoreConfig) -> Self {
        let agent_config = ureq::Agent::config_builder()
            .timeout_global(Some(config.timeout))
            .http_status_as_error(false)
            .build();
        let base = config.base_url.trim_end_matches('/');
        let credentials = STANDARD.encode(format!("{}:{}", config.user, config.pass));

        HttpTransport {
            agent: ureq::Agent::new_with_config(agent_config),
            sql_url: format!("{}/sql", base),
            health_url: format!("{}/health", base),
            namespace: config.namespace.clone(),
            database: config.database.clone(),
            authorization: format!("Basic {}", credentials),
        }
    }

    fn execute_blocking(&self, command: &str) -> Result<String, StorageError> {
        let response = self
            .agent
            .post(&self.sql_url)
            .header("Accept", "application/json")
            .header("surreal-ns", &self.namespace)
            .header("surreal-db", &self.database)
            .header("Authorization", &self.authorization)
            .send(command)
            .map_err(|e| StorageError::Unreachable(e.to_string()))?;

        let status = response.status();
        let body = response
            .into_body()
            .read_to_string()
            .map_err(|e| StorageError::Unreachable(format!("error reading response: {}", e)))?;

        if !status.is_success() {
            return Err(StorageError::Backend {
                status: status.as_u16().to_string(),
                message: body,
            });
        }
        Ok(body)
    }

    fn ping_blocking(&self) -> Result<(), StorageError> {
        let response = self
            .agent
            .get(&self.health_url)
            .call()
            .map_err(|e| StorageError::Unreachable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(StorageError::Backend {
                status: status.as_u16().to_string(),
                message: "store unhealthy".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, command: String) -> Result<String, StorageError> {
        let transport = self.clone();
        tokio::task::spawn_blocking(move || transport.execute_blocking(&command))
            .await
            .map_err(|e| StorageError::Internal(format!("task join error: {}", e)))?
    }

    async fn ping(&self) -> Result<(), StorageError> {
        let transport = self.clone();
        tokio::task::spawn_blocking(move || transport.ping_blocking())
            .await
            .map_err(|e| StorageError::Internal(format!("task join error: {}", e)))?
    }
}
