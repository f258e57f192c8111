use crate::helpers::JsonResponse;
use crate::models::IngestionResult;
use crate::services::{IngestionError, IngestionService, SideEffectDispatcher};
use actix_web::{post, web, HttpResponse};
use std::sync::Arc;

/// Runs one ingest pass for the product and answers with the aggregate result.
/// The pass runs on its own task, so a client that goes away does not stop it;
/// processing and notification requests are queued from that task.
#[tracing::instrument(name = "Ingest reviews", skip(service, dispatcher))]
#[post("/ingest/{product_id}")]
pub async fn ingest_handler(
    path: web::Path<String>,
    service: web::Data<Arc<IngestionService>>,
    dispatcher: web::Data<SideEffectDispatcher>,
) -> HttpResponse {
    let product_id = path.into_inner();
    let run = service
        .get_ref()
        .spawn_ingest(product_id, dispatcher.get_ref().clone());

    let err = match run.await {
        Ok(Ok(result)) => return JsonResponse::build().set_result(result).ok(),
        Ok(Err(err)) => err,
        Err(join_err) => {
            tracing::error!("Ingestion task failed: {}", join_err);
            return JsonResponse::<IngestionResult>::build()
                .internal_server_error("Ingestion task failed");
        }
    };

    let message = err.to_string();
    match err {
        IngestionError::NotFound {
            available_product_ids,
            ..
        } => JsonResponse::<IngestionResult>::build()
            .set_available_product_ids(available_product_ids)
            .not_found(&message),
        IngestionError::Store(_) | IngestionError::Aborted { .. } => {
            tracing::error!("Ingestion failed: {}", message);
            JsonResponse::<IngestionResult>::build().internal_server_error(&message)
        }
    }
}
