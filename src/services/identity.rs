// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Contract the store needs from the remote identity service.

use crate::error::Result;
use crate::models::{AuthChange, Session, SignUpOutcome, User};
use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Remote identity service (sessions, accounts, account metadata).
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Current session, refreshed if it is about to expire.
    async fn get_session(&self) -> Result<Option<Session>>;

    /// Subscribe to session changes. Each call creates a new listener.
    fn subscribe(&self) -> broadcast::Receiver<AuthChange>;

    /// Start keeping the session fresh in the background, if the provider
    /// needs a task for that. The caller owns the returned handle.
    fn start_auto_refresh(&self) -> Option<JoinHandle<()>> {
        None
    }

    /// Register an account. Does not sign the user in.
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: Map<String, Value>,
        redirect_to: &str,
    ) -> Result<SignUpOutcome>;

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session>;

    async fn sign_out(&self) -> Result<()>;

    /// Merge `patch` into the signed-in user's metadata.
    async fn update_user_metadata(&self, patch: Map<String, Value>) -> Result<User>;
}
