// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Supabase Auth (GoTrue) client.
//!
//! Handles:
//! - Password sign-up, sign-in and sign-out
//! - Account metadata updates
//! - Access token refresh when close to expiry, on demand and in the background
//! - Broadcasting session changes to subscribers

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::{AuthChange, AuthEvent, Session, SignUpOutcome, User};
use crate::services::identity::IdentityProvider;
use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Margin before token expiration when we proactively refresh (1 minute).
const TOKEN_REFRESH_MARGIN_SECS: i64 = 60;

/// How often the background task checks the session expiry.
pub const AUTO_REFRESH_INTERVAL: Duration = Duration::from_secs(10);

/// Capacity of the session-change channel.
const CHANGE_CHANNEL_CAPACITY: usize = 16;

/// Current session shared with the data layer (for bearer tokens).
pub type SharedSession = Arc<RwLock<Option<Session>>>;

/// Token grant response from `/token` and `/signup` (auto-confirm projects).
#[derive(Debug, Clone, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    user: User,
}

impl TokenResponse {
    fn into_session(self) -> Session {
        let expires_at = self
            .expires_at
            .or_else(|| self.expires_in.map(|secs| Utc::now().timestamp() + secs));
        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
            user: self.user,
        }
    }
}

/// Error body returned by GoTrue.
#[derive(Debug, Default, Deserialize)]
struct AuthErrorBody {
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl AuthErrorBody {
    fn message(self) -> Option<String> {
        self.msg
            .or(self.message)
            .or(self.error_description)
            .or(self.error)
    }
}

/// Supabase Auth client with an in-memory session.
#[derive(Clone)]
pub struct GoTrueClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    session: SharedSession,
    changes: broadcast::Sender<AuthChange>,
    /// Serializes refreshes so a refresh token is only ever spent once
    refresh_lock: Arc<Mutex<()>>,
}

impl GoTrueClient {
    /// Create a client for the project in `config`.
    pub fn new(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("HTTP client build failed: {}", e)))?;
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);

        Ok(Self {
            http,
            base_url: format!("{}/auth/v1", config.supabase_url),
            api_key: config.supabase_anon_key.clone(),
            session: Arc::new(RwLock::new(None)),
            changes,
            refresh_lock: Arc::new(Mutex::new(())),
        })
    }

    /// Session cell shared with [`crate::db::PostgrestDb`].
    pub fn session_handle(&self) -> SharedSession {
        self.session.clone()
    }

    /// Keep the session fresh in the background, checking every `every`.
    ///
    /// The task runs until aborted through the returned handle.
    pub fn spawn_auto_refresh(&self, every: Duration) -> JoinHandle<()> {
        let client = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(e) = client.get_session().await {
                    tracing::warn!(error = %e, "Background token refresh failed");
                }
            }
        })
    }

    fn current(&self) -> Option<Session> {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Store `session` and tell subscribers.
    fn set_session(&self, session: Option<Session>, event: AuthEvent) {
        *self.session.write().unwrap_or_else(PoisonError::into_inner) = session.clone();
        // No receivers is fine: nobody is listening yet.
        let _ = self.changes.send(AuthChange { event, session });
    }

    /// Exchange the refresh token for a new session.
    async fn refresh(&self, refresh_token: &str) -> Result<Session> {
        let response = self
            .http
            .post(format!("{}/token", self.base_url))
            .query(&[("grant_type", "refresh_token")])
            .header("apikey", &self.api_key)
            .json(&json!({ "refresh_token": refresh_token }))
            .send()
            .await
            .map_err(AppError::from_transport)?;

        let token: TokenResponse = check_response_json(response).await?;
        Ok(token.into_session())
    }

    fn needs_refresh(session: &Session) -> bool {
        session.expires_within(Utc::now().timestamp(), TOKEN_REFRESH_MARGIN_SECS)
    }
}

#[async_trait]
impl IdentityProvider for GoTrueClient {
    async fn get_session(&self) -> Result<Option<Session>> {
        match self.current() {
            Some(session) if !Self::needs_refresh(&session) => return Ok(Some(session)),
            None => return Ok(None),
            Some(_) => {}
        }

        let _guard = self.refresh_lock.lock().await;

        // Re-check: another caller may have refreshed while we waited.
        let session = match self.current() {
            Some(session) if Self::needs_refresh(&session) => session,
            other => return Ok(other),
        };

        tracing::info!(user_id = %session.user.id, "Access token expiring, refreshing");
        match self.refresh(&session.refresh_token).await {
            Ok(fresh) => {
                self.set_session(Some(fresh.clone()), AuthEvent::TokenRefreshed);
                Ok(Some(fresh))
            }
            Err(e @ (AppError::Identity(_) | AppError::BadRequest(_) | AppError::Unauthorized)) => {
                // Refresh token revoked or expired: the session is gone.
                tracing::warn!(error = %e, "Refresh token rejected, signing out locally");
                self.set_session(None, AuthEvent::SignedOut);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthChange> {
        self.changes.subscribe()
    }

    fn start_auto_refresh(&self) -> Option<JoinHandle<()>> {
        Some(self.spawn_auto_refresh(AUTO_REFRESH_INTERVAL))
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: Map<String, Value>,
        redirect_to: &str,
    ) -> Result<SignUpOutcome> {
        let response = self
            .http
            .post(format!("{}/signup", self.base_url))
            .query(&[("redirect_to", redirect_to)])
            .header("apikey", &self.api_key)
            .json(&json!({
                "email": email,
                "password": password,
                "data": metadata,
            }))
            .send()
            .await
            .map_err(AppError::from_transport)?;

        let body: Value = check_response_json(response).await?;

        // Confirmation-required projects answer with the bare user; auto-confirm
        // projects wrap it in a token grant.
        let user = match body.get("user") {
            Some(user) => serde_json::from_value::<User>(user.clone()).ok(),
            None => serde_json::from_value::<User>(body).ok(),
        };
        Ok(SignUpOutcome { user })
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session> {
        let response = self
            .http
            .post(format!("{}/token", self.base_url))
            .query(&[("grant_type", "password")])
            .header("apikey", &self.api_key)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(AppError::from_transport)?;

        let token: TokenResponse = check_response_json(response).await?;
        let session = token.into_session();
        self.set_session(Some(session.clone()), AuthEvent::SignedIn);
        Ok(session)
    }

    async fn sign_out(&self) -> Result<()> {
        let Some(session) = self.current() else {
            return Ok(());
        };

        let response = self
            .http
            .post(format!("{}/logout", self.base_url))
            .header("apikey", &self.api_key)
            .bearer_auth(&session.access_token)
            .send()
            .await
            .map_err(AppError::from_transport)?;

        match check_response(response).await {
            Ok(()) => {}
            Err(AppError::Unauthorized) => {
                // Token already rejected server-side; nothing left to revoke.
                tracing::warn!(
                    user_id = %session.user.id,
                    "Session already invalid, signing out locally"
                );
            }
            Err(e) => return Err(e),
        }
        self.set_session(None, AuthEvent::SignedOut);
        Ok(())
    }

    async fn update_user_metadata(&self, patch: Map<String, Value>) -> Result<User> {
        let token = self
            .get_session()
            .await?
            .map(|s| s.access_token)
            .ok_or(AppError::Unauthorized)?;

        let response = self
            .http
            .put(format!("{}/user", self.base_url))
            .header("apikey", &self.api_key)
            .bearer_auth(&token)
            .json(&json!({ "data": patch }))
            .send()
            .await
            .map_err(AppError::from_transport)?;

        let user: User = check_response_json(response).await?;

        if let Some(mut session) = self.current() {
            session.user = user.clone();
            self.set_session(Some(session), AuthEvent::UserUpdated);
        }
        tracing::debug!(user_id = %user.id, "User metadata updated");
        Ok(user)
    }
}

/// Turn a non-success response into an [`AppError`].
async fn error_from_response(response: reqwest::Response) -> AppError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<AuthErrorBody>(&body)
        .ok()
        .and_then(AuthErrorBody::message)
        .unwrap_or_else(|| format!("HTTP {}", status));

    match status.as_u16() {
        401 | 403 => AppError::Unauthorized,
        400 | 422 => AppError::Identity(message),
        429 => {
            tracing::warn!("Auth rate limit hit (429)");
            AppError::Network(format!("HTTP {}: {}", status, message))
        }
        _ => AppError::Network(format!("HTTP {}: {}", status, message)),
    }
}

/// Check response status and return error if not successful.
async fn check_response(response: reqwest::Response) -> Result<()> {
    if response.status().is_success() {
        return Ok(());
    }
    Err(error_from_response(response).await)
}

/// Check response and parse JSON body.
async fn check_response_json<T: for<'de> Deserialize<'de>>(response: reqwest::Response) -> Result<T> {
    if !response.status().is_success() {
        return Err(error_from_response(response).await);
    }
    response
        .json()
        .await
        .map_err(|e| AppError::Identity(format!("JSON parse error: {}", e)))
}
