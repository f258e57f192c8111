//! Services that consume the results of an ingest run: review processing and
//! notifications.

mod client;
pub mod mock;

use std::sync::Arc;

use async_trait::async_trait;

use crate::configuration::DownstreamSettings;
use crate::connectors::errors::ConnectorError;

pub use client::DownstreamClient;

pub const NOTIFY_KIND: &str = "notify";

#[async_trait]
pub trait DownstreamConnector: Send + Sync {
    /// Hand newly stored reviews over for analysis.
    async fn process_reviews(
        &self,
        product_id: &str,
        source_review_ids: &[String],
    ) -> Result<(), ConnectorError>;

    /// Deliver a message to the product's notification channels.
    async fn notify(&self, product_id: &str, kind: &str, message: &str)
        -> Result<(), ConnectorError>;
}

pub fn init(settings: &DownstreamSettings) -> Result<Arc<dyn DownstreamConnector>, ConnectorError> {
    tracing::info!(
        "Initializing downstream connector: processing={}, notification={}",
        settings.process_review_url,
        settings.notification_url
    );
    Ok(Arc::new(DownstreamClient::new(settings)?))
}
