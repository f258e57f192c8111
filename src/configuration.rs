use serde;

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub app_port: u16,
    pub app_host: String,
    #[serde(default)]
    pub apple: AppleSettings,
    #[serde(default)]
    pub downstream: DownstreamSettings,
    #[serde(default)]
    pub ingestion: IngestionSettings,
    #[serde(default)]
    pub health: HealthSettings,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    pub host: String,
    pub port: u16,
    pub database_name: String,
    /// Skip Postgres and keep documents in process memory.
    #[serde(default)]
    pub in_memory: bool,
}

/// App Store Connect access parameters shared by every Apple connector.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct AppleSettings {
    pub audience: String,
    pub token_lifetime_secs: i64,
    /// Fraction of the token lifetime after which a new token is issued.
    pub refresh_threshold: f64,
    pub request_timeout_secs: u64,
    pub page_limit: u32,
}

impl Default for AppleSettings {
    fn default() -> Self {
        Self {
            audience: "appstoreconnect-v1".to_string(),
            token_lifetime_secs: 20 * 60,
            refresh_threshold: 0.8,
            request_timeout_secs: 30,
            page_limit: 100,
        }
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct DownstreamSettings {
    /// Base URL of the review processing service (`/process-review` is appended)
    pub process_review_url: String,
    /// Base URL of the notification service (`/notify` is appended)
    pub notification_url: String,
    pub timeout_secs: u64,
}

impl Default for DownstreamSettings {
    fn default() -> Self {
        Self {
            process_review_url: "http://localhost:3002".to_string(),
            notification_url: "http://localhost:3004".to_string(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct IngestionSettings {
    /// Upper bound for one connector's whole fetch loop.
    pub connector_timeout_secs: u64,
}

impl Default for IngestionSettings {
    fn default() -> Self {
        Self {
            connector_timeout_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct HealthSettings {
    /// Connector whose credentials are probed by the health check.
    #[serde(default)]
    pub probe_connector_id: Option<uuid::Uuid>,
}

impl DatabaseSettings {
    // Connection string: postgresql://<username>:<password>@<host>:<port>/<database_name>
    pub fn connection_string(&self) -> String {
        format!(
            "postgresql://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database_name,
        )
    }

    pub fn connection_string_without_db(&self) -> String {
        format!(
            "postgresql://{}:{}@{}:{}",
            self.username, self.password, self.host, self.port,
        )
    }
}

pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let settings = config::Config::builder()
        .set_default("app_host", "127.0.0.1")?
        .set_default("app_port", 3001)?
        .set_default("database.username", "postgres")?
        .set_default("database.password", "postgres")?
        .set_default("database.host", "127.0.0.1")?
        .set_default("database.port", 5432)?
        .set_default("database.database_name", "repliq")?
        // `configuration.yaml` (or .json/.toml) in the working directory, optional
        .add_source(config::File::with_name("configuration").required(false))
        // APP__APP_PORT=8080, APP__DATABASE__HOST=db, ...
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    settings.try_deserialize()
}
