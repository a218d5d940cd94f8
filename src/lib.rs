// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Blood-bank client core: session/profile synchronization for the donor app.
//!
//! This crate provides the state the mobile screens render from: the
//! signed-in session and donor profile, the navigation gate that picks the
//! root screen, donation eligibility, and nearest-hospital resolution.

pub mod config;
pub mod db;
pub mod eligibility;
pub mod error;
pub mod gate;
pub mod models;
pub mod notify;
pub mod refresh;
pub mod services;
pub mod store;
pub mod time_utils;
pub mod validation;

use config::Config;
use gate::{NavigationGate, Navigator, RouteGuard};
use notify::Notifier;
use std::sync::Arc;
use store::{Backend, SessionStore, SessionSubscription, StoreError};
use tokio::task::JoinHandle;

/// Top-level lifecycle object: owns the store, the navigation gate task,
/// the session listener and the token refresh task for the life of the
/// process.
pub struct AppState {
    pub config: Config,
    pub store: Arc<SessionStore>,
    pub router: Arc<RouteGuard>,
    gate: JoinHandle<()>,
    subscription: SessionSubscription,
    auto_refresh: Option<JoinHandle<()>>,
}

impl AppState {
    /// Wire the store and gate, then bootstrap the session.
    ///
    /// The gate is running before `prepare()` so it observes the very
    /// first ready state.
    pub async fn start(
        config: Config,
        backend: Backend,
        navigator: Arc<dyn Navigator>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, StoreError> {
        let identity = backend.identity.clone();
        let router = Arc::new(RouteGuard::new(navigator));
        let store = Arc::new(SessionStore::new(&config, backend, router.clone(), notifier));
        let gate = NavigationGate::spawn(store.clone(), router.clone());
        let subscription = store.prepare().await?;
        let auto_refresh = identity.start_auto_refresh();

        Ok(Self {
            config,
            store,
            router,
            gate,
            subscription,
            auto_refresh,
        })
    }

    /// Whether the session listener is still running.
    pub fn is_listening(&self) -> bool {
        self.subscription.is_active()
    }

    /// Whether a background token refresh task is running.
    pub fn is_refreshing(&self) -> bool {
        self.auto_refresh
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Stop background tasks. Only called at process exit.
    pub fn shutdown(self) {
        if let Some(task) = self.auto_refresh {
            task.abort();
        }
        self.gate.abort();
        self.subscription.shutdown();
        tracing::info!("Client core stopped");
    }
}
