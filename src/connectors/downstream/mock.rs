use std::sync::Mutex;

use async_trait::async_trait;

use super::DownstreamConnector;
use crate::connectors::errors::ConnectorError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownstreamCall {
    ProcessReviews {
        product_id: String,
        source_review_ids: Vec<String>,
    },
    Notify {
        product_id: String,
        kind: String,
        message: String,
    },
}

/// Records every call instead of sending it. With `failing()` each call is
/// recorded and then rejected.
#[derive(Default)]
pub struct RecordingDownstream {
    calls: Mutex<Vec<DownstreamCall>>,
    fail: bool,
}

impl RecordingDownstream {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<DownstreamCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn record(&self, call: DownstreamCall) -> Result<(), ConnectorError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
        if self.fail {
            return Err(ConnectorError::ServiceUnavailable("mock failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl DownstreamConnector for RecordingDownstream {
    async fn process_reviews(
        &self,
        product_id: &str,
        source_review_ids: &[String],
    ) -> Result<(), ConnectorError> {
        self.record(DownstreamCall::ProcessReviews {
            product_id: product_id.to_string(),
            source_review_ids: source_review_ids.to_vec(),
        })
    }

    async fn notify(
        &self,
        product_id: &str,
        kind: &str,
        message: &str,
    ) -> Result<(), ConnectorError> {
        self.record(DownstreamCall::Notify {
            product_id: product_id.to_string(),
            kind: kind.to_string(),
            message: message.to_string(),
        })
    }
}
