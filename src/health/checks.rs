use super::models::{ComponentHealth, HealthCheckResponse};
use crate::connectors::AppleClientRegistry;
use crate::db::DocumentStore;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use uuid::Uuid;

const CHECK_TIMEOUT: Duration = Duration::from_secs(5);
const SLOW_RESPONSE_THRESHOLD_MS: u64 = 1000;

pub struct HealthChecker {
    store: Arc<dyn DocumentStore>,
    apple: Arc<AppleClientRegistry>,
    probe_connector_id: Option<Uuid>,
    start_time: Instant,
}

impl HealthChecker {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        apple: Arc<AppleClientRegistry>,
        probe_connector_id: Option<Uuid>,
    ) -> Self {
        Self {
            store,
            apple,
            probe_connector_id,
            start_time: Instant::now(),
        }
    }

    pub async fn check_all(&self) -> HealthCheckResponse {
        let version = env!("CARGO_PKG_VERSION").to_string();
        let uptime = self.start_time.elapsed().as_secs();
        let mut response = HealthCheckResponse::new(version, uptime);

        let db_check = timeout(CHECK_TIMEOUT, self.check_database());
        let token_check = async {
            match self.probe_connector_id {
                Some(id) => Some(timeout(CHECK_TIMEOUT, self.check_apple_token(id)).await),
                None => None,
            }
        };

        let (db_result, token_result) = tokio::join!(db_check, token_check);

        let db_health =
            db_result.unwrap_or_else(|_| ComponentHealth::unhealthy("Timeout".to_string()));
        response.add_component("database", db_health);

        if let Some(token_result) = token_result {
            let token_health =
                token_result.unwrap_or_else(|_| ComponentHealth::unhealthy("Timeout".to_string()));
            response.add_component("apple_token", token_health);
        }

        response
    }

    #[tracing::instrument(name = "Check database health", skip(self))]
    async fn check_database(&self) -> ComponentHealth {
        let start = Instant::now();

        match self.store.ping().await {
            Ok(()) => {
                let elapsed = start.elapsed().as_millis() as u64;
                if elapsed > SLOW_RESPONSE_THRESHOLD_MS {
                    ComponentHealth::degraded(
                        "Database responding slowly".to_string(),
                        Some(elapsed),
                    )
                } else {
                    ComponentHealth::healthy(elapsed)
                }
            }
            Err(e) => {
                tracing::error!("Database health check failed: {:?}", e);
                ComponentHealth::unhealthy(format!("Database error: {}", e))
            }
        }
    }

    /// Issues (or reuses) a token for the probe connector, proving the key
    /// material is readable and signs.
    #[tracing::instrument(name = "Check Apple token health", skip(self))]
    async fn check_apple_token(&self, connector_id: Uuid) -> ComponentHealth {
        let start = Instant::now();

        let connector = match self.store.find_connector(connector_id).await {
            Ok(Some(connector)) => connector,
            Ok(None) => {
                return ComponentHealth::degraded(
                    format!("Probe connector {} not found", connector_id),
                    None,
                )
            }
            Err(e) => return ComponentHealth::unhealthy(format!("Database error: {}", e)),
        };

        let client = match self.apple.client_for(&connector).await {
            Ok(client) => client,
            Err(e) => return ComponentHealth::unhealthy(e.to_string()),
        };

        match client.tokens().get_token().await {
            Ok(_) => ComponentHealth::healthy(start.elapsed().as_millis() as u64)
                .with_detail("connector_id", serde_json::json!(connector_id))
                .with_detail("key_id", serde_json::json!(client.config().key_id)),
            Err(e) => {
                tracing::error!("Token issuance failed: {}", e);
                ComponentHealth::unhealthy(e.to_string())
                    .with_detail("connector_id", serde_json::json!(connector_id))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::AppleSettings;
    use crate::connectors::apple::TEST_PRIVATE_KEY;
    use crate::db::InMemoryStore;
    use crate::health::ComponentStatus;
    use crate::models::{Connector, APPLE_CONNECTOR_TYPE};
    use serde_json::json;
    use std::io::Write;

    fn registry() -> Arc<AppleClientRegistry> {
        Arc::new(AppleClientRegistry::new(&AppleSettings::default()).unwrap())
    }

    fn connector_with_key(path: &str) -> Connector {
        Connector::new(
            APPLE_CONNECTOR_TYPE,
            json!({
                "p8FilePath": path,
                "keyId": "KEY123",
                "issuerId": "issuer",
                "bundleId": "com.example.app",
                "appId": "42",
                "apiUrl": "https://api.appstoreconnect.apple.com"
            }),
        )
    }

    #[tokio::test]
    async fn test_without_probe_only_database_is_checked() {
        let checker = HealthChecker::new(Arc::new(InMemoryStore::new()), registry(), None);
        let response = checker.check_all().await;

        assert_eq!(response.status, ComponentStatus::Healthy);
        assert_eq!(response.components.len(), 1);
        assert!(response.components.contains_key("database"));
    }

    #[tokio::test]
    async fn test_probe_signs_with_connector_key() {
        let mut key = tempfile::NamedTempFile::new().unwrap();
        key.write_all(TEST_PRIVATE_KEY.as_bytes()).unwrap();

        let store = Arc::new(InMemoryStore::new());
        let connector = store
            .insert_connector(connector_with_key(&key.path().display().to_string()))
            .await
            .unwrap();

        let checker = HealthChecker::new(store, registry(), Some(connector.id));
        let response = checker.check_all().await;

        assert_eq!(response.components["apple_token"].status, ComponentStatus::Healthy);
        assert_eq!(response.status, ComponentStatus::Healthy);
    }

    #[tokio::test]
    async fn test_unreadable_key_is_unhealthy() {
        let store = Arc::new(InMemoryStore::new());
        let connector = store
            .insert_connector(connector_with_key("/nonexistent/AuthKey.p8"))
            .await
            .unwrap();

        let checker = HealthChecker::new(store, registry(), Some(connector.id));
        let response = checker.check_all().await;

        let token = &response.components["apple_token"];
        assert_eq!(token.status, ComponentStatus::Unhealthy);
        assert!(token.message.as_deref().unwrap().contains("Failed to read private key"));
    }
}
