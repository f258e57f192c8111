use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::configuration::AppleSettings;
use crate::connectors::errors::ConnectorError;
use crate::connectors::review_feed::{FeedError, FeedProvider, ReviewFeed};
use crate::models::{AppleConnectorConfig, ConfigError, Connector};

use super::client::AppleApiClient;
use super::jwt::AppleTokenIssuer;

struct CachedClient {
    client: Arc<AppleApiClient>,
    last_used: Instant,
}

/// Keeps one [`AppleApiClient`] (and with it one token cache) per connector id.
/// A client is rebuilt when the stored connector config changes. Clients idle
/// for longer than a token lifetime are dropped, which also covers deleted
/// connectors.
pub struct AppleClientRegistry {
    settings: AppleSettings,
    http_client: reqwest::Client,
    clients: Mutex<HashMap<Uuid, CachedClient>>,
}

impl AppleClientRegistry {
    pub fn new(settings: &AppleSettings) -> Result<Self, ConnectorError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()?;

        Ok(Self {
            settings: settings.clone(),
            http_client,
            clients: Mutex::new(HashMap::new()),
        })
    }

    pub async fn client_for(
        &self,
        connector: &Connector,
    ) -> Result<Arc<AppleApiClient>, ConfigError> {
        let config = AppleConnectorConfig::try_from(connector)?;
        let mut clients = self.clients.lock().await;
        self.evict_idle(&mut clients, connector.id);

        if let Some(existing) = clients.get_mut(&connector.id) {
            if existing.client.config() == &config {
                existing.last_used = Instant::now();
                return Ok(existing.client.clone());
            }
            tracing::info!(connector_id = %connector.id, "Connector config changed, rebuilding client");
        }

        let issuer = Arc::new(AppleTokenIssuer::new(&config, &self.settings));
        let client = Arc::new(AppleApiClient::new(
            config,
            issuer,
            self.http_client.clone(),
            &self.settings,
        ));
        clients.insert(
            connector.id,
            CachedClient {
                client: client.clone(),
                last_used: Instant::now(),
            },
        );
        Ok(client)
    }

    /// A client idle past one token lifetime holds nothing worth keeping.
    fn evict_idle(&self, clients: &mut HashMap<Uuid, CachedClient>, keep: Uuid) {
        let max_idle = Duration::from_secs(self.settings.token_lifetime_secs.max(0) as u64);
        let before = clients.len();
        clients.retain(|id, cached| *id == keep || cached.last_used.elapsed() < max_idle);
        if clients.len() < before {
            tracing::debug!("Dropped {} idle Apple client(s)", before - clients.len());
        }
    }

    #[cfg(test)]
    async fn cached_ids(&self) -> Vec<Uuid> {
        self.clients.lock().await.keys().copied().collect()
    }
}

#[async_trait]
impl FeedProvider for AppleClientRegistry {
    async fn feed_for(&self, connector: &Connector) -> Result<Arc<dyn ReviewFeed>, FeedError> {
        if !connector.is_apple() {
            return Err(FeedError::Unsupported(connector.connector_type.clone()));
        }
        let client: Arc<dyn ReviewFeed> = self.client_for(connector).await?;
        Ok(client)
    }
}
