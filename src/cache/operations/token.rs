use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;

use crate::cache::models::token::{CachedToken, IssuedToken};
use crate::error::ProxyError;

/// Source of "now" for expiry checks.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Performs the network round-trip that yields a fresh token.
#[async_trait::async_trait]
pub trait TokenIssuer: Send + Sync {
    async fn issue(&self) -> Result<IssuedToken, ProxyError>;
}

/// Single-slot token cache with time-based invalidation.
///
/// The slot lock is only held to copy the token in or out, never across the
/// refresh. Two requests that miss at the same time both refresh and the last
/// writer wins; that costs one redundant token call and nothing else.
pub struct TokenManager {
    issuer: Arc<dyn TokenIssuer>,
    clock: Arc<dyn Clock>,
    slot: RwLock<Option<CachedToken>>,
}

impl TokenManager {
    pub fn new(issuer: Arc<dyn TokenIssuer>) -> Self {
        Self::with_clock(issuer, Arc::new(SystemClock))
    }

    pub fn with_clock(issuer: Arc<dyn TokenIssuer>, clock: Arc<dyn Clock>) -> Self {
        TokenManager {
            issuer,
            clock,
            slot: RwLock::new(None),
        }
    }

    /// Returns a token that is valid right now, fetching a new one if needed.
    pub async fn acquire_token(&self) -> Result<String, ProxyError> {
        let requested_at = self.clock.now();
        if let Some(value) = self.cached(requested_at) {
            tracing::debug!("Using cached Prokerala token");
            return Ok(value);
        }

        tracing::debug!("No valid cached token, requesting a new one");
        let issued = self.issuer.issue().await?;
        let token = CachedToken::new(issued, requested_at);
        let value = token.value.clone();
        tracing::info!(
            "Cached new Prokerala token, valid for {}s",
            token.expires_at.saturating_duration_since(requested_at).as_secs()
        );

        *self.slot.write().unwrap_or_else(PoisonError::into_inner) = Some(token);
        Ok(value)
    }

    fn cached(&self, now: Instant) -> Option<String> {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .filter(|token| token.is_valid_at(now))
            .map(|token| token.value.clone())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    pub(crate) struct ManualClock(Mutex<Instant>);

    impl ManualClock {
        pub(crate) fn new() -> Self {
            ManualClock(Mutex::new(Instant::now()))
        }

        pub(crate) fn advance(&self, by: Duration) {
            *self.0.lock().unwrap() += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            *self.0.lock().unwrap()
        }
    }

    /// Hands out `token-1`, `token-2`, ... and fails when told to.
    pub(crate) struct FakeIssuer {
        pub(crate) calls: AtomicUsize,
        pub(crate) lifetime: Duration,
        pub(crate) fail_first: bool,
    }

    impl FakeIssuer {
        pub(crate) fn new(lifetime: Duration) -> Self {
            FakeIssuer {
                calls: AtomicUsize::new(0),
                lifetime,
                fail_first: false,
            }
        }

        pub(crate) fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl TokenIssuer for FakeIssuer {
        async fn issue(&self) -> Result<IssuedToken, ProxyError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail_first && n == 1 {
                return Err(ProxyError::UpstreamAuth {
                    reason: "Failed to fetch token from Prokerala",
                    status: Some(401),
                    body: json!({"error": "invalid_client"}),
                });
            }
            Ok(IssuedToken {
                access_token: format!("token-{n}"),
                lifetime: self.lifetime,
            })
        }
    }

    fn manager(issuer: Arc<FakeIssuer>, clock: Arc<ManualClock>) -> TokenManager {
        TokenManager::with_clock(issuer, clock)
    }

    #[tokio::test]
    async fn reuses_token_within_validity_window() {
        let issuer = Arc::new(FakeIssuer::new(Duration::from_secs(3600)));
        let clock = Arc::new(ManualClock::new());
        let tokens = manager(issuer.clone(), clock.clone());

        assert_eq!(tokens.acquire_token().await.unwrap(), "token-1");
        clock.advance(Duration::from_secs(3000));
        assert_eq!(tokens.acquire_token().await.unwrap(), "token-1");
        clock.advance(Duration::from_secs(539));
        assert_eq!(tokens.acquire_token().await.unwrap(), "token-1");
        assert_eq!(issuer.calls(), 1);
    }

    #[tokio::test]
    async fn refreshes_once_after_expiry() {
        let issuer = Arc::new(FakeIssuer::new(Duration::from_secs(3600)));
        let clock = Arc::new(ManualClock::new());
        let tokens = manager(issuer.clone(), clock.clone());

        tokens.acquire_token().await.unwrap();
        clock.advance(Duration::from_secs(3540));
        assert_eq!(tokens.acquire_token().await.unwrap(), "token-2");
        assert_eq!(tokens.acquire_token().await.unwrap(), "token-2");
        assert_eq!(issuer.calls(), 2);
    }

    #[tokio::test]
    async fn short_lived_token_is_not_served_from_cache() {
        let issuer = Arc::new(FakeIssuer::new(Duration::from_secs(45)));
        let clock = Arc::new(ManualClock::new());
        let tokens = manager(issuer.clone(), clock);

        assert_eq!(tokens.acquire_token().await.unwrap(), "token-1");
        assert_eq!(tokens.acquire_token().await.unwrap(), "token-2");
        assert_eq!(issuer.calls(), 2);
    }

    #[tokio::test]
    async fn failed_refresh_is_propagated_and_not_cached() {
        let issuer = Arc::new(FakeIssuer {
            fail_first: true,
            ..FakeIssuer::new(Duration::from_secs(3600))
        });
        let clock = Arc::new(ManualClock::new());
        let tokens = manager(issuer.clone(), clock);

        let err = tokens.acquire_token().await.unwrap_err();
        assert!(matches!(err, ProxyError::UpstreamAuth { status: Some(401), .. }));
        assert_eq!(tokens.acquire_token().await.unwrap(), "token-2");
        assert_eq!(issuer.calls(), 2);
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_slot() {
        let issuer = Arc::new(FakeIssuer::new(Duration::from_secs(3600)));
        let clock = Arc::new(ManualClock::new());
        let tokens = Arc::new(manager(issuer.clone(), clock));
        tokens.acquire_token().await.unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let tokens = tokens.clone();
                tokio::spawn(async move { tokens.acquire_token().await })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), "token-1");
        }
        assert_eq!(issuer.calls(), 1);
    }
}
