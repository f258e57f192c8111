use std::sync::Arc;

use tokio::sync::Mutex;

use super::jwt::{Credential, TokenError, TokenIssuer};

pub const DEFAULT_REFRESH_THRESHOLD: f64 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenPhase {
    /// Nothing issued yet, or invalidated.
    Unset,
    Valid,
    /// Past the refresh point; the next request issues a new token.
    Expiring,
}

/// Per-connector holder of the current credential.
///
/// The lock is held across issuance so concurrent callers wait for the one
/// in-flight refresh instead of each signing their own token.
pub struct TokenCache {
    issuer: Arc<dyn TokenIssuer>,
    threshold: f64,
    current: Mutex<Option<Credential>>,
}

impl TokenCache {
    pub fn new(issuer: Arc<dyn TokenIssuer>, threshold: f64) -> Self {
        let threshold = if threshold.is_finite() && threshold > 0.0 && threshold <= 1.0 {
            threshold
        } else {
            tracing::warn!(threshold, "Invalid token refresh threshold, using default");
            DEFAULT_REFRESH_THRESHOLD
        };

        Self {
            issuer,
            threshold,
            current: Mutex::new(None),
        }
    }

    /// `iat + floor((exp - iat) * threshold)`
    pub fn refresh_point(&self, credential: &Credential) -> i64 {
        let lifetime = (credential.expires_at - credential.issued_at) as f64;
        credential.issued_at + (lifetime * self.threshold).floor() as i64
    }

    pub async fn get_token(&self) -> Result<String, TokenError> {
        self.get_token_at(chrono::Utc::now().timestamp()).await
    }

    /// Returns the cached token while `now` is before its refresh point,
    /// otherwise issues and stores a new one. A failed issuance leaves the
    /// previous state untouched.
    pub async fn get_token_at(&self, now: i64) -> Result<String, TokenError> {
        let mut current = self.current.lock().await;

        if let Some(credential) = current.as_ref() {
            if now < self.refresh_point(credential) {
                return Ok(credential.token.clone());
            }
        }

        let fresh = self.issuer.issue(now).await?;
        tracing::debug!(
            issued_at = fresh.issued_at,
            expires_at = fresh.expires_at,
            "Refreshed API token"
        );

        let token = fresh.token.clone();
        *current = Some(fresh);
        Ok(token)
    }

    pub async fn phase_at(&self, now: i64) -> TokenPhase {
        match self.current.lock().await.as_ref() {
            None => TokenPhase::Unset,
            Some(credential) if now < self.refresh_point(credential) => TokenPhase::Valid,
            Some(_) => TokenPhase::Expiring,
        }
    }

    /// Drop the cached credential so the next call issues a new one.
    pub async fn invalidate(&self) {
        *self.current.lock().await = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct CountingIssuer {
        lifetime: i64,
        issued: AtomicUsize,
        delay: Duration,
    }

    impl CountingIssuer {
        fn new(lifetime: i64) -> Self {
            Self {
                lifetime,
                issued: AtomicUsize::new(0),
                delay: Duration::ZERO,
            }
        }

        fn count(&self) -> usize {
            self.issued.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TokenIssuer for CountingIssuer {
        async fn issue(&self, now: i64) -> Result<Credential, TokenError> {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(Credential {
                token: format!("token-{}", n),
                issued_at: now,
                expires_at: now + self.lifetime,
            })
        }
    }

    struct FailingIssuer;

    #[async_trait]
    impl TokenIssuer for FailingIssuer {
        async fn issue(&self, _now: i64) -> Result<Credential, TokenError> {
            Err(TokenError::Signing("boom".to_string()))
        }
    }

    #[tokio::test]
    async fn test_reuses_token_until_refresh_point() {
        let issuer = Arc::new(CountingIssuer::new(1000));
        let cache = TokenCache::new(issuer.clone(), 0.8);

        assert_eq!(cache.phase_at(0).await, TokenPhase::Unset);
        assert_eq!(cache.get_token_at(0).await.unwrap(), "token-1");
        assert_eq!(cache.get_token_at(799).await.unwrap(), "token-1");
        assert_eq!(cache.phase_at(799).await, TokenPhase::Valid);
        assert_eq!(issuer.count(), 1);

        assert_eq!(cache.phase_at(801).await, TokenPhase::Expiring);
        assert_eq!(cache.get_token_at(801).await.unwrap(), "token-2");
        assert_eq!(issuer.count(), 2);
    }

    #[tokio::test]
    async fn test_refresh_point_itself_triggers_reissue() {
        let issuer = Arc::new(CountingIssuer::new(1000));
        let cache = TokenCache::new(issuer.clone(), 0.8);

        cache.get_token_at(0).await.unwrap();
        assert_eq!(cache.get_token_at(800).await.unwrap(), "token-2");
    }

    #[tokio::test]
    async fn test_invalidate_forces_new_token() {
        let issuer = Arc::new(CountingIssuer::new(1000));
        let cache = TokenCache::new(issuer.clone(), 0.8);

        cache.get_token_at(0).await.unwrap();
        cache.invalidate().await;
        assert_eq!(cache.phase_at(1).await, TokenPhase::Unset);
        assert_eq!(cache.get_token_at(1).await.unwrap(), "token-2");
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_issuance() {
        let issuer = Arc::new(CountingIssuer {
            delay: Duration::from_millis(50),
            ..CountingIssuer::new(1000)
        });
        let cache = Arc::new(TokenCache::new(issuer.clone(), 0.8));

        let calls = (0..8).map(|_| {
            let cache = cache.clone();
            async move { cache.get_token_at(10).await }
        });
        let tokens = futures::future::join_all(calls).await;

        assert!(tokens.iter().all(|t| t.as_deref().unwrap() == "token-1"));
        assert_eq!(issuer.count(), 1);
    }

    #[tokio::test]
    async fn test_failed_issuance_surfaces_error() {
        let cache = TokenCache::new(Arc::new(FailingIssuer), 0.8);
        assert!(matches!(
            cache.get_token_at(0).await,
            Err(TokenError::Signing(_))
        ));
        assert_eq!(cache.phase_at(0).await, TokenPhase::Unset);
    }

    #[test]
    fn test_out_of_range_threshold_falls_back_to_default() {
        let cache = TokenCache::new(Arc::new(FailingIssuer), 1.5);
        let credential = Credential {
            token: String::new(),
            issued_at: 100,
            expires_at: 1100,
        };
        assert_eq!(cache.refresh_point(&credential), 900);
    }
}
