use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, FixedOffset};
use futures::future::join_all;
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::connectors::apple::CustomerReview;
use crate::connectors::{ConnectorError, FeedError, FeedProvider, ReviewFeed};
use crate::db::{DocumentStore, StoreError};
use crate::models::{
    Connector, ErrorKind, IngestionErrorEntry, IngestionOutcome, IngestionResult, NewReview,
    PendingAction,
};
use crate::services::SideEffectDispatcher;

pub const APPLE_REVIEW_SOURCE: &str = "apple";

#[derive(Debug, thiserror::Error)]
pub enum IngestionError {
    #[error("Product with ID {product_id} not found.")]
    NotFound {
        product_id: String,
        available_product_ids: Vec<String>,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
    /// The store went away mid-run. `pending` covers the reviews stored before that.
    #[error("Ingestion aborted: {source}")]
    Aborted {
        source: StoreError,
        pending: Vec<PendingAction>,
    },
}

enum Step {
    Continue,
    Stop,
}

/// Why a connector loop ended early.
enum Halt {
    Connector(IngestionErrorEntry),
    Store(StoreError),
}

/// Pulls new reviews for every connector of a product into the store.
///
/// Feeds are read newest first, so the first review that is already stored
/// marks the point where everything older was ingested by a previous run.
pub struct IngestionService {
    store: Arc<dyn DocumentStore>,
    feeds: Arc<dyn FeedProvider>,
    connector_timeout: Duration,
}

impl IngestionService {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        feeds: Arc<dyn FeedProvider>,
        connector_timeout: Duration,
    ) -> Self {
        Self {
            store,
            feeds,
            connector_timeout,
        }
    }

    /// Runs [`ingest`](Self::ingest) on its own task and queues the resulting
    /// side effects from there, so dropping the handle does not cut a run short.
    pub fn spawn_ingest(
        self: &Arc<Self>,
        product_id: String,
        dispatcher: SideEffectDispatcher,
    ) -> JoinHandle<Result<IngestionResult, IngestionError>> {
        let service = Arc::clone(self);
        let run = async move {
            match service.ingest(&product_id).await {
                Ok(outcome) => {
                    dispatcher.enqueue(outcome.pending);
                    Ok(outcome.result)
                }
                Err(err) => {
                    if let IngestionError::Aborted { pending, .. } = &err {
                        dispatcher.enqueue(pending.clone());
                    }
                    Err(err)
                }
            }
        };

        tokio::spawn(run.instrument(tracing::Span::current()))
    }

    /// Only an unknown product or an unreachable store fail the whole run;
    /// everything else is recorded in the result.
    #[tracing::instrument(name = "Ingest product reviews", skip(self))]
    pub async fn ingest(&self, product_id: &str) -> Result<IngestionOutcome, IngestionError> {
        let product_id = product_id.trim();

        let product = match self.store.find_product(product_id).await? {
            Some(product) => product,
            None => {
                let available_product_ids = self.store.list_product_ids().await?;
                return Err(IngestionError::NotFound {
                    product_id: product_id.to_string(),
                    available_product_ids,
                });
            }
        };

        let connectors = self.store.find_connectors(&product.connector_ids).await?;
        tracing::debug!("Running {} connector(s)", connectors.len());

        let runs = connectors
            .iter()
            .map(|connector| self.run_connector(&product.product_id, connector));

        let mut result = IngestionResult::default();
        let mut store_failure = None;
        for (partial, failure) in join_all(runs).await {
            result.merge(partial);
            store_failure = store_failure.or(failure);
        }

        if let Some(source) = store_failure {
            tracing::error!(
                ingested = result.ingested,
                "Store unavailable, aborting ingestion: {}",
                source
            );
            let pending = IngestionOutcome::new(&product.product_id, result)
                .pending
                .into_iter()
                .filter(|action| matches!(action, PendingAction::ProcessReviews { .. }))
                .collect();
            return Err(IngestionError::Aborted { source, pending });
        }

        tracing::info!(
            ingested = result.ingested,
            skipped = result.skipped,
            errors = result.errors.len(),
            "Ingestion finished"
        );

        Ok(IngestionOutcome::new(&product.product_id, result))
    }

    async fn run_connector(
        &self,
        product_id: &str,
        connector: &Connector,
    ) -> (IngestionResult, Option<StoreError>) {
        let mut result = IngestionResult::default();

        let feed = match self.feeds.feed_for(connector).await {
            Ok(feed) => feed,
            Err(err) => {
                let kind = match err {
                    FeedError::Unsupported(_) => ErrorKind::UnsupportedConnectorType,
                    FeedError::Config(_) => ErrorKind::ConfigError,
                };
                tracing::warn!(connector_id = %connector.id, "Skipping connector: {}", err);
                result
                    .errors
                    .push(IngestionErrorEntry::connector(connector.id, kind, err));
                return (result, None);
            }
        };

        let drain = self.drain_feed(product_id, connector, feed.as_ref(), &mut result);
        let outcome = tokio::time::timeout(self.connector_timeout, drain).await;

        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(Halt::Connector(entry))) => {
                tracing::warn!(connector_id = %connector.id, "Connector stopped: {}", entry.error);
                result.errors.push(entry);
            }
            Ok(Err(Halt::Store(err))) => return (result, Some(err)),
            Err(_) => {
                tracing::warn!(connector_id = %connector.id, "Connector timed out");
                result.errors.push(IngestionErrorEntry::connector(
                    connector.id,
                    ErrorKind::Timeout,
                    format!(
                        "Connector did not finish within {}s",
                        self.connector_timeout.as_secs()
                    ),
                ));
            }
        }

        (result, None)
    }

    async fn drain_feed(
        &self,
        product_id: &str,
        connector: &Connector,
        feed: &dyn ReviewFeed,
        result: &mut IngestionResult,
    ) -> Result<(), Halt> {
        let mut cursor: Option<String> = None;
        let mut newest_allowed: Option<DateTime<FixedOffset>> = None;

        loop {
            let page = feed
                .fetch_reviews(cursor.as_deref())
                .await
                .map_err(|err| Halt::Connector(fetch_error(connector, err)))?;

            for item in page.data {
                let step = self
                    .ingest_item(product_id, connector, item, &mut newest_allowed, result)
                    .await?;
                if let Step::Stop = step {
                    return Ok(());
                }
            }

            match page.next {
                Some(next) => cursor = Some(next),
                None => return Ok(()),
            }
        }
    }

    async fn ingest_item(
        &self,
        product_id: &str,
        connector: &Connector,
        item: Value,
        newest_allowed: &mut Option<DateTime<FixedOffset>>,
        result: &mut IngestionResult,
    ) -> Result<Step, Halt> {
        let review = match CustomerReview::from_value(&item) {
            Ok(review) => review,
            Err(err) => {
                result.errors.push(IngestionErrorEntry::connector(
                    connector.id,
                    ErrorKind::TransientItemError,
                    format!("Malformed review item: {}", err),
                ));
                return Ok(Step::Continue);
            }
        };

        if let Some(created_at) = review.created_at() {
            if matches!(newest_allowed, Some(bound) if created_at > *bound) {
                return Err(Halt::Connector(IngestionErrorEntry::connector(
                    connector.id,
                    ErrorKind::UnsortedFeed,
                    format!(
                        "Review {} is newer than the review before it; feed is not sorted by createdDate",
                        review.id
                    ),
                )));
            }
            *newest_allowed = Some(created_at);
        }

        match self.store.find_review(APPLE_REVIEW_SOURCE, &review.id).await {
            Ok(Some(_)) => {
                tracing::debug!(review_id = %review.id, "Reached already ingested review");
                result.skipped += 1;
                return Ok(Step::Stop);
            }
            Ok(None) => {}
            Err(err @ StoreError::Unavailable(_)) => return Err(Halt::Store(err)),
            Err(err) => {
                result
                    .errors
                    .push(IngestionErrorEntry::review(&review.id, err));
                return Ok(Step::Continue);
            }
        }

        let new_review = NewReview::new(APPLE_REVIEW_SOURCE, &review.id, product_id, item);
        match self.store.insert_review(new_review).await {
            Ok(_) => {
                result.record_ingested(&review.id);
                Ok(Step::Continue)
            }
            Err(StoreError::Duplicate { .. }) => {
                tracing::debug!(review_id = %review.id, "Review was stored concurrently");
                result.skipped += 1;
                Ok(Step::Stop)
            }
            Err(err @ StoreError::Unavailable(_)) => Err(Halt::Store(err)),
            Err(err) => {
                tracing::error!(review_id = %review.id, "Failed to store review: {}", err);
                result
                    .errors
                    .push(IngestionErrorEntry::review(&review.id, err));
                Ok(Step::Continue)
            }
        }
    }
}

fn fetch_error(connector: &Connector, err: ConnectorError) -> IngestionErrorEntry {
    let kind = match err {
        ConnectorError::Token(_) | ConnectorError::Unauthorized(_) => ErrorKind::AuthError,
        _ => ErrorKind::FetchError,
    };
    IngestionErrorEntry::connector(connector.id, kind, err)
}
