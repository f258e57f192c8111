use crate::configuration::Settings;
use crate::connectors::{self, AppleClientRegistry, FeedProvider};
use crate::db::DocumentStore;
use crate::health::HealthChecker;
use crate::routes;
use crate::services::{IngestionService, SideEffectDispatcher};
use actix_cors::Cors;
use actix_web::{dev::Server, web, App, HttpServer};
use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;
use tracing_actix_web::TracingLogger;

fn io_error(err: impl std::fmt::Display) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::Other, err.to_string())
}

pub async fn run(
    listener: TcpListener,
    store: Arc<dyn DocumentStore>,
    settings: Settings,
) -> Result<Server, std::io::Error> {
    let apple_registry = Arc::new(AppleClientRegistry::new(&settings.apple).map_err(io_error)?);
    let feeds: Arc<dyn FeedProvider> = apple_registry.clone();

    // Side effects of an ingest run leave the request path through this queue
    let downstream = connectors::init_downstream(&settings.downstream).map_err(io_error)?;
    let dispatcher = web::Data::new(SideEffectDispatcher::spawn(downstream));

    let ingestion = Arc::new(IngestionService::new(
        store.clone(),
        feeds,
        Duration::from_secs(settings.ingestion.connector_timeout_secs),
    ));
    let ingestion = web::Data::new(ingestion);

    let health_checker = Arc::new(HealthChecker::new(
        store.clone(),
        apple_registry.clone(),
        settings.health.probe_connector_id,
    ));
    let health_checker = web::Data::new(health_checker);

    let store = web::Data::new(store);
    let apple_registry = web::Data::new(apple_registry);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .wrap(Cors::permissive())
            .app_data(health_checker.clone())
            .app_data(ingestion.clone())
            .app_data(dispatcher.clone())
            .app_data(store.clone())
            .app_data(apple_registry.clone())
            .service(web::scope("/health_check").service(routes::health_check))
            .service(
                web::scope("/api")
                    .service(web::scope("/reviews").service(routes::ingest_handler))
                    .service(
                        web::scope("/connectors")
                            .service(routes::connectors::reviews_handler)
                            .service(routes::connectors::apps_handler),
                    ),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
