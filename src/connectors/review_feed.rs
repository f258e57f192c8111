use std::sync::Arc;

use async_trait::async_trait;

use crate::connectors::apple::Page;
use crate::connectors::errors::ConnectorError;
use crate::models::{ConfigError, Connector};

/// A source of reviews ordered newest first.
#[async_trait]
pub trait ReviewFeed: Send + Sync {
    /// `cursor` is the `next` link of the previous page, `None` for the first.
    async fn fetch_reviews(&self, cursor: Option<&str>) -> Result<Page, ConnectorError>;
}

#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("Unsupported connector type: {0}")]
    Unsupported(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Resolves a stored connector to a live feed.
#[async_trait]
pub trait FeedProvider: Send + Sync {
    async fn feed_for(&self, connector: &Connector) -> Result<Arc<dyn ReviewFeed>, FeedError>;
}
