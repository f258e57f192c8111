use serde::{Deserialize, Serialize};

/// Classification of a recorded ingestion problem.
///
/// A duplicate review is not listed here: it ends a connector's loop and is
/// counted in `skipped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ConfigError,
    AuthError,
    FetchError,
    TransientItemError,
    UnsupportedConnectorType,
    UnsortedFeed,
    Timeout,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestionErrorEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connector_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review_id: Option<String>,
    pub kind: ErrorKind,
    pub error: String,
}

impl IngestionErrorEntry {
    pub fn connector(connector_id: impl ToString, kind: ErrorKind, error: impl ToString) -> Self {
        Self {
            connector_id: Some(connector_id.to_string()),
            review_id: None,
            kind,
            error: error.to_string(),
        }
    }

    pub fn review(review_id: impl ToString, error: impl ToString) -> Self {
        Self {
            connector_id: None,
            review_id: Some(review_id.to_string()),
            kind: ErrorKind::TransientItemError,
            error: error.to_string(),
        }
    }
}

/// Aggregate outcome of one ingest request. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestionResult {
    pub ingested: usize,
    pub skipped: usize,
    pub errors: Vec<IngestionErrorEntry>,
    pub ingested_source_review_ids: Vec<String>,
}

impl IngestionResult {
    pub fn merge(&mut self, other: IngestionResult) {
        self.ingested += other.ingested;
        self.skipped += other.skipped;
        self.errors.extend(other.errors);
        self.ingested_source_review_ids
            .extend(other.ingested_source_review_ids);
    }

    pub fn record_ingested(&mut self, source_review_id: &str) {
        self.ingested += 1;
        self.ingested_source_review_ids
            .push(source_review_id.to_string());
    }
}

/// A side effect to run once the ingest response has been produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PendingAction {
    ProcessReviews {
        product_id: String,
        source_review_ids: Vec<String>,
    },
    NotifyCompletion {
        product_id: String,
        ingested_count: usize,
    },
}

#[derive(Debug, Clone)]
pub struct IngestionOutcome {
    pub result: IngestionResult,
    pub pending: Vec<PendingAction>,
}

impl IngestionOutcome {
    /// Processing is requested only for new reviews; the completion notice is always sent.
    pub fn new(product_id: &str, result: IngestionResult) -> Self {
        let mut pending = Vec::with_capacity(2);
        if !result.ingested_source_review_ids.is_empty() {
            pending.push(PendingAction::ProcessReviews {
                product_id: product_id.to_string(),
                source_review_ids: result.ingested_source_review_ids.clone(),
            });
        }
        pending.push(PendingAction::NotifyCompletion {
            product_id: product_id.to_string(),
            ingested_count: result.ingested,
        });

        Self { result, pending }
    }
}
