//! Document store used by the ingestion pipeline.
//!
//! The pipeline only needs find/insert semantics over three collections
//! (`products`, `connectors`, `reviews`), so the store is a trait. The Postgres
//! implementation backs the running service; the in-memory one backs tests and
//! local runs without a database.

mod memory;
mod postgres;

pub use memory::InMemoryStore;
pub use postgres::PgDocumentStore;

use crate::models::{Connector, NewReview, Product, Review};
use async_trait::async_trait;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// `(source, source_review_id)` already present.
    #[error("duplicate review {review_source}/{source_review_id}")]
    Duplicate {
        review_source: String,
        source_review_id: String,
    },
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("store query failed: {0}")]
    Query(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StoreError::Unavailable(err.to_string())
            }
            other => StoreError::Query(other.to_string()),
        }
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn find_product(&self, product_id: &str) -> Result<Option<Product>, StoreError>;

    async fn list_product_ids(&self) -> Result<Vec<String>, StoreError>;

    async fn insert_product(&self, product: Product) -> Result<Product, StoreError>;

    async fn find_connector(&self, id: Uuid) -> Result<Option<Connector>, StoreError>;

    /// Connectors in the order of `ids`; unknown ids are skipped.
    async fn find_connectors(&self, ids: &[Uuid]) -> Result<Vec<Connector>, StoreError>;

    async fn insert_connector(&self, connector: Connector) -> Result<Connector, StoreError>;

    async fn find_review(
        &self,
        source: &str,
        source_review_id: &str,
    ) -> Result<Option<Review>, StoreError>;

    /// Fails with [`StoreError::Duplicate`] when the `(source, source_review_id)` pair exists.
    async fn insert_review(&self, review: NewReview) -> Result<Review, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}

pub(crate) fn order_by_ids(mut connectors: Vec<Connector>, ids: &[Uuid]) -> Vec<Connector> {
    connectors.sort_by_key(|c| ids.iter().position(|id| *id == c.id).unwrap_or(usize::MAX));
    connectors
}
