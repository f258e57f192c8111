use anyhow::Context;
use review_ingestion::configuration::{get_configuration, DatabaseSettings};
use review_ingestion::db::{DocumentStore, InMemoryStore, PgDocumentStore};
use review_ingestion::startup::run;
use review_ingestion::telemetry::{get_subscriber, init_subscriber};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};
use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

async fn connect_store(database: &DatabaseSettings) -> anyhow::Result<Arc<dyn DocumentStore>> {
    if database.in_memory {
        tracing::warn!("Using in-memory document store; data is lost on restart");
        return Ok(Arc::new(InMemoryStore::new()));
    }

    tracing::info!(
        db_host = %database.host,
        db_port = database.port,
        db_name = %database.database_name,
        "Connecting to PostgreSQL"
    );

    let connect_options = PgConnectOptions::new()
        .host(&database.host)
        .port(database.port)
        .username(&database.username)
        .password(&database.password)
        .database(&database.database_name)
        .ssl_mode(PgSslMode::Disable);

    let pg_pool = PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(30))
        .connect_with(connect_options)
        .await
        .context("Failed to connect to database")?;

    sqlx::migrate!("./migrations")
        .run(&pg_pool)
        .await
        .context("Failed to run migrations")?;

    Ok(Arc::new(PgDocumentStore::new(pg_pool)))
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = get_subscriber("review-ingestion".into(), "info".into(), std::io::stdout);
    init_subscriber(subscriber);

    let settings = get_configuration().context("Failed to read configuration")?;
    let store = connect_store(&settings.database).await?;

    let address = format!("{}:{}", settings.app_host, settings.app_port);
    tracing::info!("Start server at {:?}", &address);
    let listener =
        TcpListener::bind(&address).with_context(|| format!("failed to bind to {}", address))?;

    run(listener, store, settings).await?.await?;
    Ok(())
}
