use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::Instrument;

use crate::configuration::DownstreamSettings;
use crate::connectors::errors::ConnectorError;

use super::DownstreamConnector;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProcessReviewRequest<'a> {
    product_id: &'a str,
    source_review_ids: &'a [String],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NotifyRequest<'a> {
    product_id: &'a str,
    #[serde(rename = "type")]
    kind: &'a str,
    message: &'a str,
}

/// HTTP client for the processing and notification services
pub struct DownstreamClient {
    process_review_url: String,
    notification_url: String,
    http_client: reqwest::Client,
}

impl DownstreamClient {
    pub fn new(settings: &DownstreamSettings) -> Result<Self, ConnectorError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;

        Ok(Self {
            process_review_url: format!(
                "{}/process-review",
                settings.process_review_url.trim_end_matches('/')
            ),
            notification_url: format!("{}/notify", settings.notification_url.trim_end_matches('/')),
            http_client,
        })
    }

    async fn post<T: Serialize + ?Sized>(&self, url: &str, body: &T) -> Result<(), ConnectorError> {
        let resp = self.http_client.post(url).json(body).send().await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }

        let body = resp.text().await.unwrap_or_default();
        Err(ConnectorError::from_status(status, body))
    }
}

#[async_trait]
impl DownstreamConnector for DownstreamClient {
    async fn process_reviews(
        &self,
        product_id: &str,
        source_review_ids: &[String],
    ) -> Result<(), ConnectorError> {
        let span = tracing::info_span!(
            "downstream_process_reviews",
            product_id = %product_id,
            count = source_review_ids.len()
        );
        let payload = ProcessReviewRequest {
            product_id,
            source_review_ids,
        };
        self.post(&self.process_review_url, &payload)
            .instrument(span)
            .await
    }

    async fn notify(
        &self,
        product_id: &str,
        kind: &str,
        message: &str,
    ) -> Result<(), ConnectorError> {
        let span = tracing::info_span!("downstream_notify", product_id = %product_id, kind = %kind);
        let payload = NotifyRequest {
            product_id,
            kind,
            message,
        };
        self.post(&self.notification_url, &payload)
            .instrument(span)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn settings_for(server: &MockServer) -> DownstreamSettings {
        DownstreamSettings {
            process_review_url: format!("{}/", server.uri()),
            notification_url: server.uri(),
            timeout_secs: 5,
        }
    }

    #[tokio::test]
    async fn test_process_reviews_posts_ids() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/process-review"))
            .and(body_json(json!({
                "productId": "p1",
                "sourceReviewIds": ["r2", "r1"]
            })))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&server)
            .await;

        let client = DownstreamClient::new(&settings_for(&server)).unwrap();
        client
            .process_reviews("p1", &["r2".to_string(), "r1".to_string()])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_notify_reports_rejection() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/notify"))
            .and(body_json(json!({"productId": "p1", "type": "notify", "message": "hi"})))
            .respond_with(ResponseTemplate::new(404).set_body_string("Product not found"))
            .expect(1)
            .mount(&server)
            .await;

        let client = DownstreamClient::new(&settings_for(&server)).unwrap();
        let err = client.notify("p1", "notify", "hi").await.unwrap_err();
        assert!(matches!(err, ConnectorError::NotFound(msg) if msg.contains("Product not found")));
    }
}
