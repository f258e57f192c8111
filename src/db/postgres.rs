use super::{order_by_ids, DocumentStore, StoreError};
use crate::models::{Connector, NewReview, Product, Review};
use async_trait::async_trait;
use sqlx::PgPool;
use tracing::Instrument;
use uuid::Uuid;

pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn find_product(&self, product_id: &str) -> Result<Option<Product>, StoreError> {
        let query_span = tracing::info_span!("Fetch product by external id.", product_id);
        sqlx::query_as::<_, Product>(
            r#"SELECT * FROM products WHERE product_id = $1 LIMIT 1"#,
        )
        .bind(product_id)
        .fetch_optional(&self.pool)
        .instrument(query_span)
        .await
        .map_err(|err| {
            tracing::error!("Failed to execute fetch query: {:?}", err);
            StoreError::from(err)
        })
    }

    async fn list_product_ids(&self) -> Result<Vec<String>, StoreError> {
        let query_span = tracing::info_span!("List product ids.");
        sqlx::query_scalar::<_, String>(r#"SELECT product_id FROM products ORDER BY product_id"#)
            .fetch_all(&self.pool)
            .instrument(query_span)
            .await
            .map_err(StoreError::from)
    }

    async fn insert_product(&self, product: Product) -> Result<Product, StoreError> {
        let query_span = tracing::info_span!("Saving new product into the database");
        sqlx::query(
            r#"
            INSERT INTO products (id, product_id, name, description, connector_ids,
                notification_channel_ids, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(product.id)
        .bind(&product.product_id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(&product.connector_ids)
        .bind(&product.notification_channel_ids)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .instrument(query_span)
        .await
        .map(|_| product)
        .map_err(|err| {
            tracing::error!("Failed to execute query: {:?}", err);
            StoreError::from(err)
        })
    }

    async fn find_connector(&self, id: Uuid) -> Result<Option<Connector>, StoreError> {
        let query_span = tracing::info_span!("Fetch connector by id.", connector_id = %id);
        sqlx::query_as::<_, Connector>(r#"SELECT * FROM connectors WHERE id = $1"#)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(query_span)
            .await
            .map_err(StoreError::from)
    }

    async fn find_connectors(&self, ids: &[Uuid]) -> Result<Vec<Connector>, StoreError> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        let query_span = tracing::info_span!("Fetch connectors by ids.", count = ids.len());
        let connectors = sqlx::query_as::<_, Connector>(
            r#"SELECT * FROM connectors WHERE id = ANY($1)"#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .instrument(query_span)
        .await
        .map_err(StoreError::from)?;

        Ok(order_by_ids(connectors, ids))
    }

    async fn insert_connector(&self, connector: Connector) -> Result<Connector, StoreError> {
        let query_span = tracing::info_span!("Saving new connector into the database");
        sqlx::query(
            r#"
            INSERT INTO connectors (id, connector_type, auth_type, config, status,
                created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(connector.id)
        .bind(&connector.connector_type)
        .bind(&connector.auth_type)
        .bind(&connector.config)
        .bind(&connector.status)
        .bind(connector.created_at)
        .bind(connector.updated_at)
        .execute(&self.pool)
        .instrument(query_span)
        .await
        .map(|_| connector)
        .map_err(StoreError::from)
    }

    async fn find_review(
        &self,
        source: &str,
        source_review_id: &str,
    ) -> Result<Option<Review>, StoreError> {
        let query_span = tracing::debug_span!("Check review existence.", source, source_review_id);
        sqlx::query_as::<_, Review>(
            r#"SELECT * FROM reviews WHERE source = $1 AND source_review_id = $2 LIMIT 1"#,
        )
        .bind(source)
        .bind(source_review_id)
        .fetch_optional(&self.pool)
        .instrument(query_span)
        .await
        .map_err(StoreError::from)
    }

    async fn insert_review(&self, review: NewReview) -> Result<Review, StoreError> {
        let query_span = tracing::info_span!(
            "Saving new review into the database",
            source = %review.source,
            source_review_id = %review.source_review_id
        );
        let review = review.into_review();
        sqlx::query(
            r#"
            INSERT INTO reviews (id, source, source_review_id, product_id, raw_review,
                created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(review.id)
        .bind(&review.source)
        .bind(&review.source_review_id)
        .bind(&review.product_id)
        .bind(&review.raw_review)
        .bind(review.created_at)
        .bind(review.updated_at)
        .execute(&self.pool)
        .instrument(query_span)
        .await
        .map_err(|err| match err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                StoreError::Duplicate {
                    review_source: review.source.clone(),
                    source_review_id: review.source_review_id.clone(),
                }
            }
            other => {
                tracing::error!("Failed to execute query: {:?}", other);
                StoreError::from(other)
            }
        })?;

        Ok(review)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1 as health_check")
            .fetch_one(&self.pool)
            .await
            .map(|_| ())
            .map_err(|err| StoreError::Unavailable(err.to_string()))
    }
}
