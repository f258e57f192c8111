use super::{order_by_ids, DocumentStore, StoreError};
use crate::models::{Connector, NewReview, Product, Review};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct Collections {
    products: Vec<Product>,
    connectors: HashMap<Uuid, Connector>,
    // keyed by (source, source_review_id), mirroring the unique index
    reviews: HashMap<(String, String), Review>,
}

/// Process-local store with the same uniqueness rules as the Postgres schema.
#[derive(Default)]
pub struct InMemoryStore {
    inner: RwLock<Collections>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn review_count(&self) -> usize {
        self.inner.read().await.reviews.len()
    }

    pub async fn reviews_for_product(&self, product_id: &str) -> Vec<Review> {
        let inner = self.inner.read().await;
        let mut reviews: Vec<Review> = inner
            .reviews
            .values()
            .filter(|r| r.product_id == product_id)
            .cloned()
            .collect();
        reviews.sort_by_key(|r| r.created_at);
        reviews
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn find_product(&self, product_id: &str) -> Result<Option<Product>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .products
            .iter()
            .find(|p| p.product_id == product_id)
            .cloned())
    }

    async fn list_product_ids(&self) -> Result<Vec<String>, StoreError> {
        let inner = self.inner.read().await;
        let mut ids: Vec<String> = inner.products.iter().map(|p| p.product_id.clone()).collect();
        ids.sort();
        Ok(ids)
    }

    async fn insert_product(&self, product: Product) -> Result<Product, StoreError> {
        let mut inner = self.inner.write().await;
        if inner
            .products
            .iter()
            .any(|p| p.product_id == product.product_id)
        {
            return Err(StoreError::Query(format!(
                "product {} already exists",
                product.product_id
            )));
        }
        inner.products.push(product.clone());
        Ok(product)
    }

    async fn find_connector(&self, id: Uuid) -> Result<Option<Connector>, StoreError> {
        Ok(self.inner.read().await.connectors.get(&id).cloned())
    }

    async fn find_connectors(&self, ids: &[Uuid]) -> Result<Vec<Connector>, StoreError> {
        let inner = self.inner.read().await;
        let found = ids
            .iter()
            .filter_map(|id| inner.connectors.get(id).cloned())
            .collect();
        Ok(order_by_ids(found, ids))
    }

    async fn insert_connector(&self, connector: Connector) -> Result<Connector, StoreError> {
        let mut inner = self.inner.write().await;
        inner.connectors.insert(connector.id, connector.clone());
        Ok(connector)
    }

    async fn find_review(
        &self,
        source: &str,
        source_review_id: &str,
    ) -> Result<Option<Review>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .reviews
            .get(&(source.to_string(), source_review_id.to_string()))
            .cloned())
    }

    async fn insert_review(&self, review: NewReview) -> Result<Review, StoreError> {
        let mut inner = self.inner.write().await;
        let key = (review.source.clone(), review.source_review_id.clone());
        if inner.reviews.contains_key(&key) {
            return Err(StoreError::Duplicate {
                review_source: key.0,
                source_review_id: key.1,
            });
        }
        let review = review.into_review();
        inner.reviews.insert(key, review.clone());
        Ok(review)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_insert_review_enforces_source_and_id_uniqueness() {
        let store = InMemoryStore::new();
        store
            .insert_review(NewReview::new("apple", "r1", "p1", json!({"id": "r1"})))
            .await
            .unwrap();

        let err = store
            .insert_review(NewReview::new("apple", "r1", "p2", json!({"id": "r1"})))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate { ref review_source, .. } if review_source == "apple"));
        assert_eq!(err.to_string(), "duplicate review apple/r1");

        // same id from another source is a different review
        store
            .insert_review(NewReview::new("google", "r1", "p1", json!({"id": "r1"})))
            .await
            .unwrap();
        assert_eq!(store.review_count().await, 2);
    }

    #[tokio::test]
    async fn test_find_connectors_keeps_requested_order() {
        let store = InMemoryStore::new();
        let a = store
            .insert_connector(Connector::new("apple", json!({})))
            .await
            .unwrap();
        let b = store
            .insert_connector(Connector::new("google", json!({})))
            .await
            .unwrap();

        let found = store
            .find_connectors(&[b.id, Uuid::new_v4(), a.id])
            .await
            .unwrap();
        let ids: Vec<Uuid> = found.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![b.id, a.id]);
    }
}
