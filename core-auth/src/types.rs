use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Keys under which the vault persists its fields.
///
/// The set is closed: nothing else is ever written to the secure store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VaultKey {
    AccessToken,
    RefreshToken,
    /// Access token expiry as decimal epoch milliseconds
    TokenExpiry,
    /// PKCE verifier of the outstanding login attempt
    CodeVerifier,
}

impl VaultKey {
    pub const ALL: [VaultKey; 4] = [
        VaultKey::AccessToken,
        VaultKey::RefreshToken,
        VaultKey::TokenExpiry,
        VaultKey::CodeVerifier,
    ];

    /// Storage key string
    pub fn as_str(&self) -> &'static str {
        match self {
            VaultKey::AccessToken => "ACCESS_TOKEN",
            VaultKey::RefreshToken => "REFRESH_TOKEN",
            VaultKey::TokenExpiry => "TOKEN_EXPIRY",
            VaultKey::CodeVerifier => "CODE_VERIFIER",
        }
    }
}

impl fmt::Display for VaultKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// OAuth credential held in the vault.
///
/// Both tokens are always present together; a vault holding only one of them
/// reads as "no credential".
///
/// # Security
///
/// The `Debug` implementation redacts both tokens.
///
/// # Examples
///
/// ```
/// use core_auth::Credential;
///
/// let credential = Credential::issued("access".into(), "refresh".into(), 3600, 1_000);
/// assert_eq!(credential.expires_at_ms, 3_601_000);
/// assert!(!credential.is_expired_at(3_600_999));
/// assert!(credential.is_expired_at(3_601_000));
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub access_token: String,
    pub refresh_token: String,
    /// Epoch milliseconds after which the access token is no longer valid
    pub expires_at_ms: i64,
}

impl Credential {
    /// Build a credential from a token response received at `now_ms`.
    pub fn issued(
        access_token: String,
        refresh_token: String,
        expires_in_secs: i64,
        now_ms: i64,
    ) -> Self {
        Self {
            access_token,
            refresh_token,
            expires_at_ms: expiry_from(expires_in_secs, now_ms),
        }
    }

    /// `true` once `now_ms` reaches the expiry instant (inclusive).
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        now_ms >= self.expires_at_ms
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_at_ms", &self.expires_at_ms)
            .finish()
    }
}

/// Absolute expiry for a token valid `expires_in_secs` from `now_ms`.
pub fn expiry_from(expires_in_secs: i64, now_ms: i64) -> i64 {
    now_ms.saturating_add(expires_in_secs.saturating_mul(1000))
}

/// Result of a successful refresh grant.
#[derive(Clone)]
pub struct RefreshedToken {
    pub access_token: String,
    pub expires_at_ms: i64,
    /// Present only when the provider rotated the refresh token
    pub refresh_token: Option<String>,
}

impl fmt::Debug for RefreshedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshedToken")
            .field("access_token", &"[REDACTED]")
            .field("expires_at_ms", &self.expires_at_ms)
            .field("rotated_refresh_token", &self.refresh_token.is_some())
            .finish()
    }
}

/// In-memory record of the outstanding login attempt.
///
/// The verifier itself lives in the vault under [`VaultKey::CodeVerifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAuthorization {
    pub attempt_id: Uuid,
    pub created_at_ms: i64,
}

/// Authorization URL handed to the host to open in a browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationUrl {
    pub url: String,
    /// Identifies the login attempt this URL belongs to
    pub attempt_id: Uuid,
}

/// How a delivered redirect callback was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallbackOutcome {
    /// Code exchanged and credential stored
    Authenticated,
    /// The URI carried no authorization code (user declined or closed the page)
    Cancelled,
}

/// Login flow state.
///
/// # State Transitions
///
/// ```text
/// Idle -> AwaitingCallback -> Exchanging -> Authenticated
///              |                  |
///              v                  v
///            Idle              Failed
/// ```
///
/// `begin_login` is accepted from every state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum FlowState {
    #[default]
    Idle,
    AwaitingCallback,
    Exchanging,
    Authenticated,
    Failed,
}

impl FlowState {
    /// Returns `true` while a login attempt is outstanding.
    pub fn is_in_progress(&self) -> bool {
        matches!(self, FlowState::AwaitingCallback | FlowState::Exchanging)
    }
}

impl fmt::Display for FlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlowState::Idle => write!(f, "Idle"),
            FlowState::AwaitingCallback => write!(f, "Awaiting Callback..."),
            FlowState::Exchanging => write!(f, "Exchanging Code..."),
            FlowState::Authenticated => write!(f, "Authenticated"),
            FlowState::Failed => write!(f, "Failed"),
        }
    }
}
