use std::fmt;
use std::path::PathBuf;

use async_trait::async_trait;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};

use crate::configuration::AppleSettings;
use crate::models::AppleConnectorConfig;

/// Why a credential could not be produced.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("Missing required config: {0}")]
    Config(&'static str),
    #[error("Failed to read private key {path}: {reason}")]
    KeyRead { path: String, reason: String },
    #[error("Failed to sign token: {0}")]
    Signing(String),
}

/// A signed bearer token and its validity window, in unix seconds.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub token: String,
    pub issued_at: i64,
    pub expires_at: i64,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"<redacted>")
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[async_trait]
pub trait TokenIssuer: Send + Sync {
    /// Produce a credential valid from `now`.
    async fn issue(&self, now: i64) -> Result<Credential, TokenError>;
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AppleClaims {
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
    pub aud: String,
}

/// Signs App Store Connect API tokens with the connector's `.p8` key.
///
/// The key file is read on every issuance, so a rotated key is picked up
/// on the next refresh without restarting.
#[derive(Debug, Clone)]
pub struct AppleTokenIssuer {
    key_path: PathBuf,
    key_id: String,
    issuer_id: String,
    audience: String,
    lifetime_secs: i64,
}

impl AppleTokenIssuer {
    pub fn new(config: &AppleConnectorConfig, settings: &AppleSettings) -> Self {
        Self {
            key_path: PathBuf::from(&config.p8_file_path),
            key_id: config.key_id.clone(),
            issuer_id: config.issuer_id.clone(),
            audience: settings.audience.clone(),
            lifetime_secs: settings.token_lifetime_secs,
        }
    }

    async fn load_key(&self) -> Result<EncodingKey, TokenError> {
        let key_read = |reason: String| TokenError::KeyRead {
            path: self.key_path.display().to_string(),
            reason,
        };

        let pem = tokio::fs::read(&self.key_path)
            .await
            .map_err(|err| key_read(err.to_string()))?;
        EncodingKey::from_ec_pem(&pem).map_err(|err| key_read(err.to_string()))
    }
}

#[async_trait]
impl TokenIssuer for AppleTokenIssuer {
    async fn issue(&self, now: i64) -> Result<Credential, TokenError> {
        if self.key_id.is_empty() {
            return Err(TokenError::Config("keyId"));
        }
        if self.issuer_id.is_empty() {
            return Err(TokenError::Config("issuerId"));
        }
        if self.key_path.as_os_str().is_empty() {
            return Err(TokenError::Config("p8FilePath"));
        }

        let key = self.load_key().await?;

        let mut header = Header::new(Algorithm::ES256);
        header.kid = Some(self.key_id.clone());

        let claims = AppleClaims {
            iss: self.issuer_id.clone(),
            iat: now,
            exp: now + self.lifetime_secs,
            aud: self.audience.clone(),
        };

        let token = encode(&header, &claims, &key)
            .map_err(|err| TokenError::Signing(err.to_string()))?;

        tracing::debug!(
            key_id = %self.key_id,
            expires_at = claims.exp,
            "Issued App Store Connect token"
        );

        Ok(Credential {
            token,
            issued_at: claims.iat,
            expires_at: claims.exp,
        })
    }
}
