use std::sync::Arc;

use crate::connectors::apple::{CustomerReview, ReviewSummary, REVIEWS_SORT_NEWEST_FIRST};
use crate::connectors::{AppleApiClient, AppleClientRegistry};
use crate::db::DocumentStore;
use crate::helpers::JsonResponse;
use actix_web::{get, web, Error, HttpResponse};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

const MAX_PAGE_LIMIT: u32 = 200;

#[derive(Debug, Deserialize)]
pub struct ReviewsQuery {
    pub limit: Option<u32>,
    pub sort: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AppsQuery {
    pub limit: Option<u32>,
    /// Follow every page; defaults to true.
    pub all: Option<bool>,
}

#[derive(Serialize)]
pub struct ReviewsPreview {
    pub reviews: Vec<ReviewSummary>,
    pub next: Option<String>,
}

#[derive(Serialize)]
pub struct AppsList {
    pub apps: Vec<Value>,
}

async fn resolve_client(
    connector_id: Uuid,
    store: &dyn DocumentStore,
    registry: &AppleClientRegistry,
) -> Result<Arc<AppleApiClient>, HttpResponse> {
    let connector = store
        .find_connector(connector_id)
        .await
        .map_err(|err| {
            tracing::error!("Failed to load connector: {}", err);
            JsonResponse::<()>::build().internal_server_error(&err.to_string())
        })?
        .ok_or_else(|| {
            JsonResponse::<()>::build().not_found(&format!("Connector {} not found", connector_id))
        })?;

    registry
        .client_for(&connector)
        .await
        .map_err(|err| JsonResponse::<()>::build().bad_request(&err.to_string()))
}

#[tracing::instrument(name = "Preview connector reviews", skip(store, registry))]
#[get("/{id}/reviews")]
pub async fn reviews_handler(
    path: web::Path<Uuid>,
    query: web::Query<ReviewsQuery>,
    store: web::Data<Arc<dyn DocumentStore>>,
    registry: web::Data<Arc<AppleClientRegistry>>,
) -> Result<HttpResponse, Error> {
    let client = match resolve_client(path.into_inner(), store.get_ref().as_ref(), &registry).await {
        Ok(client) => client,
        Err(response) => return Ok(response),
    };

    let limit = query
        .limit
        .unwrap_or_else(|| client.page_limit())
        .clamp(1, MAX_PAGE_LIMIT);
    let sort = query
        .sort
        .clone()
        .unwrap_or_else(|| REVIEWS_SORT_NEWEST_FIRST.to_string());
    let params = [("limit", limit.to_string()), ("sort", sort)];

    let page = client.fetch_customer_reviews(&params, None).await?;
    let reviews = page
        .data
        .iter()
        .filter_map(|item| match CustomerReview::from_value(item) {
            Ok(review) => Some(review),
            Err(err) => {
                tracing::warn!("Skipping malformed review item: {}", err);
                None
            }
        })
        .map(ReviewSummary::from)
        .collect();

    Ok(JsonResponse::build()
        .set_result(ReviewsPreview {
            reviews,
            next: page.next,
        })
        .ok())
}

#[tracing::instrument(name = "List connector apps", skip(store, registry))]
#[get("/{id}/apps")]
pub async fn apps_handler(
    path: web::Path<Uuid>,
    query: web::Query<AppsQuery>,
    store: web::Data<Arc<dyn DocumentStore>>,
    registry: web::Data<Arc<AppleClientRegistry>>,
) -> Result<HttpResponse, Error> {
    let client = match resolve_client(path.into_inner(), store.get_ref().as_ref(), &registry).await {
        Ok(client) => client,
        Err(response) => return Ok(response),
    };

    let limit = query
        .limit
        .unwrap_or_else(|| client.page_limit())
        .clamp(1, MAX_PAGE_LIMIT);
    let apps = client
        .fetch_all_apps(&[("limit", limit.to_string())], query.all.unwrap_or(true))
        .await?;

    Ok(JsonResponse::build().set_result(AppsList { apps }).ok())
}
