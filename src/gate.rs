// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Navigation gate: maps store readiness and session state to a root screen.
//!
//! The decision itself is a pure function of [`StoreState`]. The
//! [`NavigationGate`] task re-runs it whenever `initialized`,
//! `app_is_ready` or `session` change, kicks off profile hydration, and
//! issues the transition through a [`RouteGuard`] so the same target is
//! never navigated to twice in a row.

use crate::models::Session;
use crate::store::{SessionStore, StoreState};
use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinHandle;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Root screens the gate can send the user to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "app/lib/generated/")
)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    SignIn,
    Onboarding,
    Home,
}

impl Route {
    /// Router path for this screen.
    pub fn path(self) -> &'static str {
        match self {
            Route::SignIn => "/(app)/sign-in",
            Route::Onboarding => "/(app)/onboarding",
            Route::Home => "/(app)/(protected)",
        }
    }
}

/// Outcome of one gate evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateDecision {
    /// Start a profile fetch (every pass once the app is ready)
    pub hydrate_profile: bool,
    /// Screen to show; `None` keeps the splash screen up
    pub route: Option<Route>,
}

/// Resolve the root screen for `state`.
///
/// Returns `None` while bootstrap is still running.
pub fn resolve_route(state: &StoreState) -> Option<Route> {
    if !state.initialized || !state.app_is_ready {
        return None;
    }
    Some(match &state.session {
        None => Route::SignIn,
        Some(session) if !session.is_onboarded() => Route::Onboarding,
        Some(_) => Route::Home,
    })
}

pub fn decide(state: &StoreState) -> GateDecision {
    let route = resolve_route(state);
    GateDecision {
        hydrate_profile: route.is_some(),
        route,
    }
}

/// Performs screen transitions (a `router.replace` in the app shell).
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: Route);
}

/// Navigator that only logs transitions (headless runs).
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNavigator;

impl Navigator for LogNavigator {
    fn navigate(&self, route: Route) {
        tracing::info!(path = route.path(), "Navigate");
    }
}

/// Deduplicating wrapper around a [`Navigator`].
///
/// Every root-level transition in the crate goes through one shared guard.
pub struct RouteGuard {
    inner: Arc<dyn Navigator>,
    current: Mutex<Option<Route>>,
}

impl RouteGuard {
    pub fn new(inner: Arc<dyn Navigator>) -> Self {
        Self {
            inner,
            current: Mutex::new(None),
        }
    }

    /// Navigate to `route` unless it is already the current target.
    ///
    /// Returns whether a navigation command was issued.
    pub fn navigate(&self, route: Route) -> bool {
        {
            let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
            if *current == Some(route) {
                tracing::debug!(path = route.path(), "Already on route, skipping");
                return false;
            }
            *current = Some(route);
        }
        self.inner.navigate(route);
        true
    }

    /// The last route navigated to.
    pub fn current(&self) -> Option<Route> {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// The part of the store state the gate reacts to.
#[derive(Debug, Clone, PartialEq)]
struct GateKey {
    initialized: bool,
    app_is_ready: bool,
    session: Option<Session>,
}

impl GateKey {
    fn of(state: &StoreState) -> Self {
        Self {
            initialized: state.initialized,
            app_is_ready: state.app_is_ready,
            session: state.session.clone(),
        }
    }
}

/// Reactive gate task bound to a store.
pub struct NavigationGate {
    store: Arc<SessionStore>,
    router: Arc<RouteGuard>,
}

impl NavigationGate {
    pub fn new(store: Arc<SessionStore>, router: Arc<RouteGuard>) -> Self {
        Self { store, router }
    }

    /// Spawn the gate on the current runtime.
    ///
    /// The task runs until aborted through the returned handle.
    pub fn spawn(store: Arc<SessionStore>, router: Arc<RouteGuard>) -> JoinHandle<()> {
        let gate = Self::new(store, router);
        tokio::spawn(gate.run())
    }

    async fn run(self) {
        let mut changes = self.store.watch();
        let mut last_key: Option<GateKey> = None;

        loop {
            let (key, decision) = {
                let state = changes.borrow_and_update();
                (GateKey::of(&state), decide(&state))
            };

            if last_key.as_ref() != Some(&key) {
                last_key = Some(key);
                self.apply(decision);
            }

            if changes.changed().await.is_err() {
                tracing::debug!("Store dropped, navigation gate stopping");
                break;
            }
        }
    }

    fn apply(&self, decision: GateDecision) {
        if decision.hydrate_profile {
            let store = self.store.clone();
            tokio::spawn(async move {
                match store.get_profile().await {
                    Ok(()) => {}
                    Err(e) if e.is_timeout() => {
                        tracing::info!("Profile hydration timed out, keeping cached profile")
                    }
                    Err(e) => tracing::warn!(error = %e, "Profile hydration failed"),
                }
            });
        }

        match decision.route {
            Some(route) => {
                self.router.navigate(route);
            }
            None => tracing::debug!("Bootstrap pending, staying on splash"),
        }
    }
}
