use std::sync::Arc;

use tokio::sync::mpsc;

use crate::connectors::downstream::{DownstreamConnector, NOTIFY_KIND};
use crate::models::PendingAction;

/// Plain text summary sent to the notification service after a run.
pub fn completion_message(product_id: &str, ingested_count: usize) -> String {
    if ingested_count > 0 {
        format!(
            "Review ingestion completed for {}: {} new review(s) ingested. \
             Next, each ingested review will go through analysis.",
            product_id, ingested_count
        )
    } else {
        format!(
            "Review ingestion completed for {}: no new reviews were available. \
             The system is working as expected.",
            product_id
        )
    }
}

/// Runs ingest side effects off the request path.
///
/// Actions are executed one at a time in the order they were queued. A failed
/// action is logged and the worker moves on.
#[derive(Clone)]
pub struct SideEffectDispatcher {
    sender: mpsc::UnboundedSender<PendingAction>,
}

impl SideEffectDispatcher {
    /// Starts the worker on the current runtime.
    pub fn spawn(downstream: Arc<dyn DownstreamConnector>) -> Self {
        let (sender, mut receiver) = mpsc::unbounded_channel::<PendingAction>();

        tokio::spawn(async move {
            while let Some(action) = receiver.recv().await {
                execute(downstream.as_ref(), action).await;
            }
            tracing::debug!("Side effect queue closed");
        });

        Self { sender }
    }

    pub fn enqueue(&self, actions: Vec<PendingAction>) {
        for action in actions {
            if let Err(err) = self.sender.send(action) {
                tracing::error!("Side effect worker is gone, dropping {:?}", err.0);
            }
        }
    }
}

#[tracing::instrument(name = "Run ingest side effect", skip(downstream))]
async fn execute(downstream: &dyn DownstreamConnector, action: PendingAction) {
    let outcome = match &action {
        PendingAction::ProcessReviews {
            product_id,
            source_review_ids,
        } => downstream.process_reviews(product_id, source_review_ids).await,
        PendingAction::NotifyCompletion {
            product_id,
            ingested_count,
        } => {
            let message = completion_message(product_id, *ingested_count);
            downstream.notify(product_id, NOTIFY_KIND, &message).await
        }
    };

    if let Err(err) = outcome {
        tracing::error!("Side effect failed: {}", err);
    }
}
