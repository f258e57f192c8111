use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A unit whose reviews are ingested.
/// `product_id` is the external, human-facing identifier used by the ingest endpoint,
/// `id` is the storage key.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Product {
    pub id: Uuid,
    pub product_id: String,
    pub name: String,
    pub description: String,
    pub connector_ids: Vec<Uuid>,
    pub notification_channel_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn new(product_id: &str, name: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            product_id: product_id.to_string(),
            name: name.to_string(),
            description: String::new(),
            connector_ids: vec![],
            notification_channel_ids: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    pub fn with_connector(mut self, connector_id: Uuid) -> Self {
        self.connector_ids.push(connector_id);
        self
    }
}
