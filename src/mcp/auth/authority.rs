//! Session Authority: owns the refresh token and the current bearer token.
//!
//! One instance is created at startup and shared (via `Arc`) by every MCP
//! session and tool call. The access token is refreshed lazily when a caller
//! asks for it inside the buffer window; there is no background timer.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use super::exchange::{TokenExchanger, TokenGrant};
use crate::mcp::error::PlandayError;

/// Tokens are treated as expired this long before their real expiry.
pub const REFRESH_BUFFER_SECS: i64 = 5 * 60;

pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

#[derive(Debug, Clone)]
struct AccessToken {
    token: String,
    expires_at: DateTime<Utc>,
}

impl AccessToken {
    fn issue(grant: TokenGrant, now: DateTime<Utc>) -> Result<Self, PlandayError> {
        let expires_at = TimeDelta::from_std(grant.expires_in)
            .ok()
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .ok_or_else(|| {
                PlandayError::ExchangeFailed("token lifetime out of range".to_string())
            })?;

        Ok(Self {
            token: grant.access_token,
            expires_at,
        })
    }

    fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at - TimeDelta::seconds(REFRESH_BUFFER_SECS)
    }
}

/// Token and expiry live in one `Option` so they can only change together.
#[derive(Debug, Clone)]
struct Session {
    refresh_token: String,
    access: Option<AccessToken>,
}

impl Session {
    fn usable_token(&self, now: DateTime<Utc>) -> Option<&str> {
        self.access
            .as_ref()
            .filter(|access| access.is_fresh_at(now))
            .map(|access| access.token.as_str())
    }
}

/// Returned by a successful `authenticate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthConfirmation {
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionStatus {
    pub authenticated: bool,
    pub token_expires_at: Option<DateTime<Utc>>,
}

pub struct SessionAuthority {
    exchanger: Arc<dyn TokenExchanger>,
    session: RwLock<Option<Session>>,
    // Held for the duration of any exchange so racing callers share one refresh
    refresh_gate: Mutex<()>,
    clock: Clock,
}

impl SessionAuthority {
    pub fn new(exchanger: Arc<dyn TokenExchanger>) -> Self {
        Self::with_clock(exchanger, Arc::new(Utc::now))
    }

    pub fn with_clock(exchanger: Arc<dyn TokenExchanger>, clock: Clock) -> Self {
        Self {
            exchanger,
            session: RwLock::new(None),
            refresh_gate: Mutex::new(()),
            clock,
        }
    }

    /// Exchanges `refresh_token` immediately and, on success, replaces any
    /// existing session with it.
    ///
    /// # Errors
    /// `InvalidCredential` for an empty or garbled token, `ExchangeFailed`
    /// when Planday rejects it. A failed attempt leaves the prior session as is.
    pub async fn authenticate(&self, refresh_token: &str) -> Result<AuthConfirmation, PlandayError> {
        let refresh_token = validate_refresh_token(refresh_token)?;

        let _gate = self.refresh_gate.lock().await;
        let now = (self.clock)();
        let grant = self.exchanger.exchange(refresh_token).await?;
        let access = AccessToken::issue(grant, now)?;
        let confirmation = AuthConfirmation {
            expires_at: access.expires_at,
        };

        *self.session.write().await = Some(Session {
            refresh_token: refresh_token.to_string(),
            access: Some(access),
        });

        info!(expires_at = %confirmation.expires_at, "authenticated with Planday");
        Ok(confirmation)
    }

    /// Returns a bearer token valid for at least the buffer window, refreshing
    /// it first if needed. `None` means the caller must (re-)authenticate.
    pub async fn get_valid_access_token(&self) -> Option<String> {
        if let Some(token) = self.cached_token().await? {
            return Some(token);
        }

        let _gate = self.refresh_gate.lock().await;

        // Another caller may have refreshed while we waited on the gate
        let refresh_token = {
            let guard = self.session.read().await;
            let session = guard.as_ref()?;
            if let Some(token) = session.usable_token((self.clock)()) {
                debug!("access token refreshed by a concurrent caller");
                return Some(token.to_string());
            }
            session.refresh_token.clone()
        };

        let now = (self.clock)();
        let outcome = match self.exchanger.exchange(&refresh_token).await {
            Ok(grant) => AccessToken::issue(grant, now),
            Err(e) => Err(e),
        };

        let mut guard = self.session.write().await;
        // Cleared or replaced while the exchange was in flight
        let session = guard
            .as_mut()
            .filter(|session| session.refresh_token == refresh_token)?;

        match outcome {
            Ok(access) => {
                debug!(expires_at = %access.expires_at, "refreshed Planday access token");
                let token = access.token.clone();
                session.access = Some(access);
                Some(token)
            }
            Err(e) => {
                warn!(error = %e, "access token refresh failed, re-authentication required");
                session.access = None;
                None
            }
        }
    }

    /// Like `get_valid_access_token`, for callers that propagate errors.
    ///
    /// # Errors
    /// `Unauthenticated` when no usable token can be produced.
    pub async fn require_access_token(&self) -> Result<String, PlandayError> {
        self.get_valid_access_token()
            .await
            .ok_or(PlandayError::Unauthenticated)
    }

    pub async fn is_authenticated(&self) -> bool {
        self.session
            .read()
            .await
            .as_ref()
            .is_some_and(|session| !session.refresh_token.is_empty())
    }

    pub async fn status(&self) -> SessionStatus {
        SessionStatus {
            authenticated: self.is_authenticated().await,
            token_expires_at: self
                .session
                .read()
                .await
                .as_ref()
                .and_then(|session| session.access.as_ref())
                .map(|access| access.expires_at),
        }
    }

    pub async fn clear_session(&self) {
        if self.session.write().await.take().is_some() {
            info!("Planday session cleared");
        }
    }

    /// `Some(token)` on a cache hit, `Some(None)` when a refresh is needed,
    /// `None` when there is no session at all.
    async fn cached_token(&self) -> Option<Option<String>> {
        let guard = self.session.read().await;
        let session = guard.as_ref()?;
        Some(session.usable_token((self.clock)()).map(str::to_string))
    }
}

fn validate_refresh_token(refresh_token: &str) -> Result<&str, PlandayError> {
    let trimmed = refresh_token.trim();
    if trimmed.is_empty() {
        return Err(PlandayError::InvalidCredential(
            "refresh token cannot be empty".to_string(),
        ));
    }
    if trimmed
        .chars()
        .any(|c| c.is_whitespace() || c.is_control())
    {
        return Err(PlandayError::InvalidCredential(
            "refresh token contains whitespace or control characters".to_string(),
        ));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::TimeZone;

    use super::*;

    struct FakeExchanger {
        calls: AtomicUsize,
        fail: AtomicBool,
        lifetime: Duration,
        delay: Duration,
    }

    impl FakeExchanger {
        fn with_delay(delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail: AtomicBool::new(false),
                lifetime: Duration::from_secs(3600),
                delay,
            })
        }

        fn new() -> Arc<Self> {
            Self::with_delay(Duration::ZERO)
        }

        fn slow() -> Arc<Self> {
            Self::with_delay(Duration::from_millis(50))
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TokenExchanger for FakeExchanger {
        async fn exchange(&self, refresh_token: &str) -> Result<TokenGrant, PlandayError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.fail.load(Ordering::SeqCst) {
                return Err(PlandayError::ExchangeFailed("invalid_grant".to_string()));
            }
            let access_token = if n == 0 {
                "abc".to_string()
            } else {
                format!("{refresh_token}-access-{n}")
            };
            Ok(TokenGrant {
                access_token,
                expires_in: self.lifetime,
            })
        }
    }

    struct TestClock(std::sync::Mutex<DateTime<Utc>>);

    impl TestClock {
        fn at(now: DateTime<Utc>) -> Arc<Self> {
            Arc::new(Self(std::sync::Mutex::new(now)))
        }

        fn set(&self, now: DateTime<Utc>) {
            *self.0.lock().unwrap() = now;
        }

        fn as_clock(self: &Arc<Self>) -> Clock {
            let clock = Arc::clone(self);
            Arc::new(move || *clock.0.lock().unwrap())
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()
    }

    fn authority(exchanger: &Arc<FakeExchanger>, clock: &Arc<TestClock>) -> SessionAuthority {
        SessionAuthority::with_clock(exchanger.clone(), clock.as_clock())
    }

    #[tokio::test]
    async fn authenticate_then_get_reuses_the_exchanged_token() {
        let exchanger = FakeExchanger::new();
        let clock = TestClock::at(t0());
        let authority = authority(&exchanger, &clock);

        let confirmation = authority.authenticate("refresh-123").await.unwrap();
        assert_eq!(confirmation.expires_at, t0() + TimeDelta::hours(1));

        assert_eq!(authority.get_valid_access_token().await.as_deref(), Some("abc"));
        assert_eq!(exchanger.calls(), 1);
    }

    #[tokio::test]
    async fn token_is_cached_until_the_buffer_window() {
        let exchanger = FakeExchanger::new();
        let clock = TestClock::at(t0());
        let authority = authority(&exchanger, &clock);
        authority.authenticate("refresh-123").await.unwrap();

        clock.set(t0() + TimeDelta::hours(1) - TimeDelta::minutes(6));
        assert_eq!(authority.get_valid_access_token().await.as_deref(), Some("abc"));
        assert_eq!(exchanger.calls(), 1);

        clock.set(t0() + TimeDelta::hours(1) - TimeDelta::minutes(4));
        assert_eq!(
            authority.get_valid_access_token().await.as_deref(),
            Some("refresh-123-access-1")
        );
        assert_eq!(exchanger.calls(), 2);
    }

    #[tokio::test]
    async fn refresh_replaces_token_and_expiry_together() {
        let exchanger = FakeExchanger::new();
        let clock = TestClock::at(t0());
        let authority = authority(&exchanger, &clock);
        authority.authenticate("refresh-123").await.unwrap();

        let refresh_at = t0() + TimeDelta::minutes(55);
        clock.set(refresh_at);
        authority.get_valid_access_token().await.unwrap();

        let status = authority.status().await;
        assert_eq!(status.token_expires_at, Some(refresh_at + TimeDelta::hours(1)));
        assert_eq!(exchanger.calls(), 2);

        // The new token is cached again
        authority.get_valid_access_token().await.unwrap();
        assert_eq!(exchanger.calls(), 2);
    }

    #[tokio::test]
    async fn failed_refresh_discards_stale_token() {
        let exchanger = FakeExchanger::new();
        let clock = TestClock::at(t0());
        let authority = authority(&exchanger, &clock);
        authority.authenticate("refresh-123").await.unwrap();

        exchanger.fail.store(true, Ordering::SeqCst);
        clock.set(t0() + TimeDelta::hours(2));
        assert_eq!(authority.get_valid_access_token().await, None);
        assert_eq!(exchanger.calls(), 2);

        // Each later call makes one attempt of its own, never a retry loop
        assert!(matches!(
            authority.require_access_token().await,
            Err(PlandayError::Unauthenticated)
        ));
        assert_eq!(exchanger.calls(), 3);

        let status = authority.status().await;
        assert!(status.authenticated);
        assert_eq!(status.token_expires_at, None);
    }

    #[tokio::test]
    async fn no_session_means_no_token_and_no_exchange() {
        let exchanger = FakeExchanger::new();
        let authority = authority(&exchanger, &TestClock::at(t0()));

        assert!(!authority.is_authenticated().await);
        assert_eq!(authority.get_valid_access_token().await, None);
        assert_eq!(exchanger.calls(), 0);
    }

    #[tokio::test]
    async fn malformed_credentials_are_rejected_before_exchange() {
        let exchanger = FakeExchanger::new();
        let authority = authority(&exchanger, &TestClock::at(t0()));

        for bad in ["", "   ", "abc def", "abc\u{0}"] {
            assert!(matches!(
                authority.authenticate(bad).await,
                Err(PlandayError::InvalidCredential(_))
            ));
        }
        assert_eq!(exchanger.calls(), 0);
        assert!(!authority.is_authenticated().await);
    }

    #[tokio::test]
    async fn failed_authenticate_keeps_prior_session() {
        let exchanger = FakeExchanger::new();
        let authority = authority(&exchanger, &TestClock::at(t0()));
        authority.authenticate("refresh-123").await.unwrap();

        exchanger.fail.store(true, Ordering::SeqCst);
        assert!(matches!(
            authority.authenticate("other-token").await,
            Err(PlandayError::ExchangeFailed(_))
        ));
        assert_eq!(authority.get_valid_access_token().await.as_deref(), Some("abc"));
    }

    #[tokio::test]
    async fn clear_session_forgets_everything() {
        let exchanger = FakeExchanger::new();
        let authority = authority(&exchanger, &TestClock::at(t0()));
        authority.authenticate("refresh-123").await.unwrap();

        authority.clear_session().await;

        assert!(!authority.is_authenticated().await);
        assert_eq!(authority.get_valid_access_token().await, None);
        assert_eq!(exchanger.calls(), 1);
    }

    #[tokio::test]
    async fn concurrent_refreshes_share_one_exchange() {
        let exchanger = FakeExchanger::slow();
        let clock = TestClock::at(t0());
        let authority = Arc::new(authority(&exchanger, &clock));
        authority.authenticate("refresh-123").await.unwrap();

        clock.set(t0() + TimeDelta::hours(1));
        let tokens = futures::future::join_all(
            (0..8).map(|_| {
                let authority = Arc::clone(&authority);
                async move { authority.get_valid_access_token().await }
            }),
        )
        .await;

        assert_eq!(exchanger.calls(), 2);
        assert!(tokens
            .iter()
            .all(|token| token.as_deref() == Some("refresh-123-access-1")));
    }
}
