use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

pub const APPLE_CONNECTOR_TYPE: &str = "apple";

/// One external review source attached to a product.
///
/// `config` is kept as a loose document; typed views are obtained through
/// validating conversions such as [`AppleConnectorConfig::try_from`].
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Connector {
    pub id: Uuid,
    pub connector_type: String,
    pub auth_type: String,
    pub config: Value,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Connector {
    pub fn new(connector_type: &str, config: Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            connector_type: connector_type.to_string(),
            auth_type: "jwt".to_string(),
            config,
            status: "active".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    pub fn is_apple(&self) -> bool {
        self.connector_type == APPLE_CONNECTOR_TYPE
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Connector is not of type apple (got {0})")]
    WrongType(String),
    #[error("Missing required config: {0}")]
    MissingField(&'static str),
}

/// Validated configuration of an App Store Connect connector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppleConnectorConfig {
    pub p8_file_path: String,
    pub key_id: String,
    pub issuer_id: String,
    pub bundle_id: String,
    pub app_id: String,
    pub api_url: String,
}

impl TryFrom<&Connector> for AppleConnectorConfig {
    type Error = ConfigError;

    fn try_from(connector: &Connector) -> Result<Self, Self::Error> {
        if !connector.is_apple() {
            return Err(ConfigError::WrongType(connector.connector_type.clone()));
        }

        let field = |key: &'static str| -> Result<String, ConfigError> {
            connector
                .config
                .get(key)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .ok_or(ConfigError::MissingField(key))
        };

        // field order decides which missing key gets reported first
        Ok(Self {
            p8_file_path: field("p8FilePath")?,
            key_id: field("keyId")?,
            issuer_id: field("issuerId")?,
            bundle_id: field("bundleId")?,
            app_id: field("appId")?,
            api_url: field("apiUrl")?.trim_end_matches('/').to_string(),
        })
    }
}
