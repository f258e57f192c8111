use std::sync::Arc;

use reqwest::Url;
use serde_json::Value;
use tracing::Instrument;

use crate::configuration::AppleSettings;
use crate::connectors::errors::ConnectorError;
use crate::connectors::review_feed::ReviewFeed;
use crate::models::AppleConnectorConfig;

use super::jwt::TokenIssuer;
use super::token_cache::TokenCache;
use super::types::Page;

pub const REVIEWS_SORT_NEWEST_FIRST: &str = "-createdDate";

/// App Store Connect REST client bound to one connector.
pub struct AppleApiClient {
    config: AppleConnectorConfig,
    http_client: reqwest::Client,
    tokens: TokenCache,
    page_limit: u32,
}

impl AppleApiClient {
    /// `http_client` is shared between connectors; timeouts are set on it.
    pub fn new(
        config: AppleConnectorConfig,
        issuer: Arc<dyn TokenIssuer>,
        http_client: reqwest::Client,
        settings: &AppleSettings,
    ) -> Self {
        Self {
            config,
            http_client,
            tokens: TokenCache::new(issuer, settings.refresh_threshold),
            page_limit: settings.page_limit,
        }
    }

    pub fn config(&self) -> &AppleConnectorConfig {
        &self.config
    }

    pub fn tokens(&self) -> &TokenCache {
        &self.tokens
    }

    pub fn page_limit(&self) -> u32 {
        self.page_limit
    }

    fn endpoint(&self, path: &str, params: &[(&str, String)]) -> Result<Url, ConnectorError> {
        let base = format!("{}{}", self.config.api_url, path);
        Url::parse_with_params(&base, params)
            .map_err(|err| ConnectorError::Internal(format!("Invalid URL {}: {}", base, err)))
    }

    /// GET one page. A 401 drops the cached token so the next request re-signs.
    pub async fn fetch_page(&self, url: &str, data_key: &str) -> Result<Page, ConnectorError> {
        let span = tracing::info_span!("apple_fetch_page", app_id = %self.config.app_id);
        let token = self.tokens.get_token().await?;

        let resp = self
            .http_client
            .get(url)
            .bearer_auth(token)
            .header("Accept", "application/json")
            .send()
            .instrument(span)
            .await?;

        let status = resp.status();
        if !status.is_success() {
            if status == reqwest::StatusCode::UNAUTHORIZED {
                self.tokens.invalidate().await;
            }
            let body = resp.text().await.unwrap_or_default();
            tracing::warn!("App Store Connect returned {} for {}", status, url);
            return Err(ConnectorError::from_status(status, body));
        }

        let body = resp
            .json::<Value>()
            .await
            .map_err(|err| ConnectorError::InvalidResponse(err.to_string()))?;
        Ok(Page::from_body(&body, data_key))
    }

    /// Follow `links.next` from `initial_url` until it is absent, collecting every item.
    pub async fn fetch_all_paginated(
        &self,
        initial_url: &str,
        data_key: &str,
    ) -> Result<Vec<Value>, ConnectorError> {
        let mut items = Vec::new();
        let mut url = initial_url.to_string();

        loop {
            let page = self.fetch_page(&url, data_key).await?;
            items.extend(page.data);

            match page.next {
                Some(next) if next != url => url = next,
                Some(next) => {
                    tracing::warn!("Pagination link points at the current page, stopping: {}", next);
                    break;
                }
                None => break,
            }
        }

        Ok(items)
    }

    /// One page of the app's customer reviews. `cursor` is a previous page's
    /// `links.next` and replaces the query entirely.
    pub async fn fetch_customer_reviews(
        &self,
        params: &[(&str, String)],
        cursor: Option<&str>,
    ) -> Result<Page, ConnectorError> {
        let url = match cursor {
            Some(next) => next.to_string(),
            None => self
                .endpoint(
                    &format!("/v1/apps/{}/customerReviews", self.config.app_id),
                    params,
                )?
                .to_string(),
        };
        self.fetch_page(&url, "data").await
    }

    /// Apps visible to the API key. With `fetch_all` every page is followed.
    pub async fn fetch_all_apps(
        &self,
        params: &[(&str, String)],
        fetch_all: bool,
    ) -> Result<Vec<Value>, ConnectorError> {
        let url = self.endpoint("/v1/apps", params)?;
        if fetch_all {
            self.fetch_all_paginated(url.as_str(), "data").await
        } else {
            Ok(self.fetch_page(url.as_str(), "data").await?.data)
        }
    }
}

#[async_trait::async_trait]
impl ReviewFeed for AppleApiClient {
    async fn fetch_reviews(&self, cursor: Option<&str>) -> Result<Page, ConnectorError> {
        let params = [
            ("limit", self.page_limit.to_string()),
            ("sort", REVIEWS_SORT_NEWEST_FIRST.to_string()),
        ];
        self.fetch_customer_reviews(&params, cursor).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectors::apple::jwt::{Credential, TokenError};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Default)]
    struct StaticIssuer {
        issued: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl TokenIssuer for StaticIssuer {
        async fn issue(&self, now: i64) -> Result<Credential, TokenError> {
            let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(Credential {
                token: format!("test-token-{}", n),
                issued_at: now,
                expires_at: now + 1200,
            })
        }
    }

    fn client_for(server: &MockServer, issuer: Arc<StaticIssuer>) -> AppleApiClient {
        let config = AppleConnectorConfig {
            p8_file_path: "/unused".to_string(),
            key_id: "KEY123".to_string(),
            issuer_id: "issuer".to_string(),
            bundle_id: "com.example.app".to_string(),
            app_id: "42".to_string(),
            api_url: server.uri(),
        };
        AppleApiClient::new(
            config,
            issuer,
            reqwest::Client::new(),
            &AppleSettings::default(),
        )
    }

    #[tokio::test]
    async fn test_fetch_all_paginated_follows_next_links() {
        let server = MockServer::start().await;
        let uri = server.uri();

        Mock::given(method("GET"))
            .and(path("/v1/apps"))
            .and(query_param("cursor", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"id": "b"}],
                "links": {"next": format!("{}/v1/apps?cursor=3", uri)}
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/apps"))
            .and(query_param("cursor", "3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"id": "c"}],
                "links": {}
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/apps"))
            .and(header("Authorization", "Bearer test-token-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"id": "a"}],
                "links": {"next": format!("{}/v1/apps?cursor=2", uri)}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Arc::new(StaticIssuer::default()));
        let apps = client
            .fetch_all_paginated(&format!("{}/v1/apps?limit=1", uri), "data")
            .await
            .unwrap();

        let ids: Vec<_> = apps.iter().map(|a| a["id"].as_str().unwrap()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_customer_reviews_query_is_newest_first() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/apps/42/customerReviews"))
            .and(query_param("sort", "-createdDate"))
            .and(query_param("limit", "100"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Arc::new(StaticIssuer::default()));
        let page = client.fetch_reviews(None).await.unwrap();
        assert!(page.data.is_empty());
        assert!(page.next.is_none());
    }

    #[tokio::test]
    async fn test_unauthorized_invalidates_cached_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/apps"))
            .respond_with(ResponseTemplate::new(401).set_body_string("NOT_AUTHORIZED"))
            .expect(2)
            .mount(&server)
            .await;

        let issuer = Arc::new(StaticIssuer::default());
        let client = client_for(&server, issuer.clone());

        for _ in 0..2 {
            let err = client.fetch_all_apps(&[], false).await.unwrap_err();
            assert!(matches!(err, ConnectorError::Unauthorized(_)));
        }
        assert_eq!(issuer.issued.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_server_error_is_service_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = client_for(&server, Arc::new(StaticIssuer::default()));
        let err = client.fetch_reviews(None).await.unwrap_err();
        assert!(matches!(err, ConnectorError::ServiceUnavailable(_)));
    }
}
