use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// A stored review. `(source, source_review_id)` is unique across the store.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Review {
    pub id: Uuid,
    pub source: String,
    pub source_review_id: String,
    pub product_id: String,
    pub raw_review: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewReview {
    pub source: String,
    pub source_review_id: String,
    pub product_id: String,
    pub raw_review: Value,
}

impl NewReview {
    pub fn new(source: &str, source_review_id: &str, product_id: &str, raw_review: Value) -> Self {
        Self {
            source: source.to_string(),
            source_review_id: source_review_id.to_string(),
            product_id: product_id.to_string(),
            raw_review,
        }
    }

    pub fn into_review(self) -> Review {
        let now = Utc::now();
        Review {
            id: Uuid::new_v4(),
            source: self.source,
            source_review_id: self.source_review_id,
            product_id: self.product_id,
            raw_review: self.raw_review,
            created_at: now,
            updated_at: now,
        }
    }
}
