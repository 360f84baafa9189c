use std::fmt;
use std::time::{Duration, Instant};

/// Seconds shaved off the issuer-reported lifetime so a token is never sent
/// right as it expires upstream.
pub const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Lifetime assumed when the token endpoint omits `expires_in`.
pub const DEFAULT_LIFETIME: Duration = Duration::from_secs(3600);

/// Longest lifetime trusted from the token endpoint; longer ones are cut to this.
pub const MAX_LIFETIME: Duration = Duration::from_secs(24 * 60 * 60);

/// A token as returned by the token endpoint, before it is cached.
#[derive(Clone, PartialEq)]
pub struct IssuedToken {
    pub access_token: String,
    pub lifetime: Duration,
}

impl fmt::Debug for IssuedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuedToken")
            .field("access_token", &"[censored]")
            .field("lifetime", &self.lifetime)
            .finish()
    }
}

/// The single cached bearer token shared by every proxied request.
#[derive(Clone)]
pub struct CachedToken {
    pub value: String,
    pub expires_at: Instant,
}

impl CachedToken {
    /// `expires_at = issued_at + (lifetime - margin)`, never earlier than
    /// `issued_at`. The lifetime is capped at [`MAX_LIFETIME`].
    pub fn new(issued: IssuedToken, issued_at: Instant) -> Self {
        let valid_for = issued
            .lifetime
            .min(MAX_LIFETIME)
            .saturating_sub(EXPIRY_MARGIN);
        CachedToken {
            value: issued.access_token,
            expires_at: issued_at.checked_add(valid_for).unwrap_or(issued_at),
        }
    }

    pub fn is_valid_at(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

impl fmt::Debug for CachedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedToken")
            .field("value", &"[censored]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
