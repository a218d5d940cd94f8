//! Authentication session and user identity.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Key in `user_metadata` that records whether onboarding completed.
pub const ONBOARDED_KEY: &str = "onboarded";

/// Authenticated identity as issued by the identity service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    /// Free-form account metadata (carries the `onboarded` flag)
    #[serde(default)]
    pub user_metadata: Map<String, Value>,
    /// Linked identities; an empty list on sign-up means the email is taken
    #[serde(default)]
    pub identities: Option<Vec<Value>>,
}

impl User {
    /// Whether the account metadata marks onboarding as complete.
    ///
    /// A missing or non-boolean flag counts as not onboarded.
    pub fn is_onboarded(&self) -> bool {
        self.user_metadata
            .get(ONBOARDED_KEY)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

/// Live credential bundle for a signed-in user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token expiry (unix seconds)
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: User,
}

impl Session {
    pub fn is_onboarded(&self) -> bool {
        self.user.is_onboarded()
    }

    /// Whether the access token expires within `margin_secs` of `now`.
    pub fn expires_within(&self, now: i64, margin_secs: i64) -> bool {
        self.expires_at
            .map(|exp| exp - now <= margin_secs)
            .unwrap_or(false)
    }
}

/// Kind of session change broadcast by the identity service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
}

/// Session change notification.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthChange {
    pub event: AuthEvent,
    pub session: Option<Session>,
}

/// Result of a sign-up request.
#[derive(Debug, Clone, PartialEq)]
pub struct SignUpOutcome {
    pub user: Option<User>,
}

impl SignUpOutcome {
    /// The service answers a sign-up for an existing address with a user
    /// that has no identities instead of an error.
    pub fn email_in_use(&self) -> bool {
        self.user
            .as_ref()
            .and_then(|u| u.identities.as_ref())
            .map(|ids| ids.is_empty())
            .unwrap_or(false)
    }
}
