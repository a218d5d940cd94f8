// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session/profile store: the single source of truth for the signed-in user.
//!
//! State is published through a `tokio::sync::watch` channel. Screens and
//! the navigation gate observe it read-only; every write goes through the
//! operations on [`SessionStore`], so a write is visible to the very next
//! read.
//!
//! Invariants:
//! - `initialized` and `app_is_ready` only ever go from false to true.
//! - [`SessionStore::prepare`] runs at most once, so at most one
//!   session-change listener exists per store.
//! - `profile`, when set, belongs to the user of the current session.

use crate::config::Config;
use crate::db::{BloodRequestRepository, ProfileRepository};
use crate::error::{AppError, Result};
use crate::gate::{Route, RouteGuard};
use crate::models::session::ONBOARDED_KEY;
use crate::models::{
    BloodRequestForm, BloodRequestListing, DonorFilter, Profile, ProfileForm, ProfilePatch,
    RequestFilter, Session, User,
};
use crate::notify::{Notice, Notifier};
use crate::services::IdentityProvider;
use crate::time_utils::format_utc_rfc3339;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use validator::Validate;

/// Remote collaborators the store talks to.
#[derive(Clone)]
pub struct Backend {
    pub identity: Arc<dyn IdentityProvider>,
    pub profiles: Arc<dyn ProfileRepository>,
    pub requests: Arc<dyn BloodRequestRepository>,
}

/// Observable store state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreState {
    pub session: Option<Session>,
    /// Always the user of `session`
    pub user: Option<User>,
    pub profile: Option<Profile>,
    /// Session fetched once and change listener installed
    pub initialized: bool,
    /// Startup settled, including failure paths
    pub app_is_ready: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Store already prepared; refusing to install a second session listener")]
    AlreadyPrepared,
}

/// Handle to the session-change listener installed by `prepare()`.
///
/// The listener lives for the whole process. Dropping the handle detaches
/// it; only [`SessionSubscription::shutdown`] stops it.
#[derive(Debug)]
pub struct SessionSubscription {
    task: JoinHandle<()>,
}

impl SessionSubscription {
    pub fn is_active(&self) -> bool {
        !self.task.is_finished()
    }

    /// Stop listening for session changes. Only called at process shutdown.
    pub fn shutdown(self) {
        self.task.abort();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignUpStatus {
    /// Account created; a confirmation email is on its way
    ConfirmationSent,
    EmailInUse,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignInStatus {
    SignedIn { onboarded: bool },
    Failed,
}

/// Process-wide session/profile store.
pub struct SessionStore {
    identity: Arc<dyn IdentityProvider>,
    profiles: Arc<dyn ProfileRepository>,
    requests: Arc<dyn BloodRequestRepository>,
    router: Arc<RouteGuard>,
    notifier: Arc<dyn Notifier>,
    email_redirect_url: String,
    state: Arc<watch::Sender<StoreState>>,
    prepared: AtomicBool,
}

impl SessionStore {
    pub fn new(
        config: &Config,
        backend: Backend,
        router: Arc<RouteGuard>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let (state, _) = watch::channel(StoreState::default());
        Self {
            identity: backend.identity,
            profiles: backend.profiles,
            requests: backend.requests,
            router,
            notifier,
            email_redirect_url: config.email_redirect_url.clone(),
            state: Arc::new(state),
            prepared: AtomicBool::new(false),
        }
    }

    // ─── Read access ─────────────────────────────────────────────

    /// Copy of the current state.
    pub fn snapshot(&self) -> StoreState {
        self.state.borrow().clone()
    }

    /// Receiver notified on every state change.
    pub fn watch(&self) -> watch::Receiver<StoreState> {
        self.state.subscribe()
    }

    pub fn session(&self) -> Option<Session> {
        self.state.borrow().session.clone()
    }

    pub fn profile(&self) -> Option<Profile> {
        self.state.borrow().profile.clone()
    }

    fn current_user_id(&self) -> Option<String> {
        self.state
            .borrow()
            .session
            .as_ref()
            .map(|s| s.user.id.clone())
    }

    // ─── Lifecycle ───────────────────────────────────────────────

    /// Bootstrap the session and start listening for session changes.
    ///
    /// A failed session fetch is logged and the app continues signed out;
    /// `app_is_ready` is set on every path. A second call returns
    /// [`StoreError::AlreadyPrepared`] without touching anything.
    pub async fn prepare(&self) -> std::result::Result<SessionSubscription, StoreError> {
        if self.prepared.swap(true, Ordering::SeqCst) {
            tracing::warn!("prepare() called twice, ignoring");
            return Err(StoreError::AlreadyPrepared);
        }

        // Listen before fetching so a change racing the fetch is not lost.
        let changes = self.identity.subscribe();

        match self.identity.get_session().await {
            Ok(session) => {
                tracing::info!(signed_in = session.is_some(), "Session bootstrapped");
                apply_session(&self.state, session);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Session bootstrap failed, continuing signed out");
            }
        }

        self.state.send_modify(|s| s.initialized = true);
        let task = tokio::spawn(listen_for_session_changes(changes, self.state.clone()));
        self.state.send_modify(|s| s.app_is_ready = true);

        Ok(SessionSubscription { task })
    }

    // ─── Profile ─────────────────────────────────────────────────

    /// Refresh `profile` from storage for the signed-in user.
    ///
    /// Without a session this is a no-op. On failure the error is returned
    /// and the stored profile is left as it was.
    pub async fn get_profile(&self) -> Result<()> {
        let Some(user_id) = self.current_user_id() else {
            tracing::debug!("No session, skipping profile fetch");
            return Ok(());
        };

        let profile = self
            .profiles
            .select_profile_by_id(&user_id)
            .await
            .inspect_err(|e| tracing::warn!(user_id = %user_id, error = %e, "Profile fetch failed"))?;

        let applied = self.state.send_if_modified(|s| {
            let same_user = s.session.as_ref().map(|x| x.user.id.as_str()) == Some(user_id.as_str());
            if same_user {
                s.profile = profile;
            }
            same_user
        });
        if !applied {
            tracing::debug!(user_id = %user_id, "Session changed during profile fetch, discarding");
        }
        Ok(())
    }

    /// Replace the stored profile with `profile` (usually a row just written).
    pub fn update_profile(&self, profile: Profile) {
        self.state.send_modify(|s| s.profile = Some(profile));
    }

    // ─── Authentication ──────────────────────────────────────────

    /// Register a new account. Never signs the user in.
    pub async fn sign_up(&self, email: &str, password: &str) -> SignUpStatus {
        let mut metadata = Map::new();
        metadata.insert(ONBOARDED_KEY.to_string(), Value::Bool(false));

        match self
            .identity
            .sign_up(email, password, metadata, &self.email_redirect_url)
            .await
        {
            Err(e) => {
                tracing::warn!(error = %e, "Sign-up failed");
                self.notifier.notify(Notice::error(
                    "Unable to Sign Up",
                    "Please try again later!",
                ));
                SignUpStatus::Failed
            }
            Ok(outcome) if outcome.email_in_use() => {
                self.notifier.notify(Notice::error(
                    "Email Already in Use",
                    "Try logging in or use a different email.",
                ));
                SignUpStatus::EmailInUse
            }
            Ok(_) => {
                tracing::info!("Sign-up accepted, awaiting email confirmation");
                self.notifier.notify(Notice::success(
                    "Almost There! Check Your Email",
                    "Please check your inbox for email verification!",
                ));
                SignUpStatus::ConfirmationSent
            }
        }
    }

    /// Sign in; accounts that have not finished onboarding go straight there.
    ///
    /// The session itself arrives through the change listener.
    pub async fn sign_in_with_password(&self, email: &str, password: &str) -> SignInStatus {
        match self.identity.sign_in_with_password(email, password).await {
            Ok(session) => {
                let onboarded = session.is_onboarded();
                tracing::info!(user_id = %session.user.id, onboarded, "Signed in");
                if !onboarded {
                    self.router.navigate(Route::Onboarding);
                }
                SignInStatus::SignedIn { onboarded }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Sign-in failed");
                self.notifier.notify(Notice::error(
                    "Unable to Sign In",
                    "Invalid login credentials",
                ));
                SignInStatus::Failed
            }
        }
    }

    /// Sign out. Failures are returned, never swallowed.
    pub async fn sign_out(&self) -> Result<()> {
        self.identity
            .sign_out()
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Sign-out failed"))?;
        tracing::info!("Signed out");
        Ok(())
    }

    // ─── Domain writes ───────────────────────────────────────────

    /// Save the profile form. The first save completes onboarding.
    pub async fn submit_profile(&self, form: ProfileForm, now: DateTime<Utc>) -> Result<Profile> {
        form.validate()?;
        let user_id = self.current_user_id().ok_or(AppError::Unauthorized)?;
        let first_time = self.profile().is_none();

        let written = match self
            .profiles
            .update_profile(&user_id, &form.into_patch(now))
            .await
        {
            Ok(profile) => profile,
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "Profile save failed");
                self.notifier.notify(Notice::error(
                    "Setup Failed",
                    "Something went wrong. Please try again.",
                ));
                return Err(e);
            }
        };

        if first_time {
            self.notifier.notify(Notice::success(
                "Welcome Aboard! 🎉",
                "Your donor profile is ready to help save lives.",
            ));
            let mut patch = Map::new();
            patch.insert(ONBOARDED_KEY.to_string(), Value::Bool(true));
            if let Err(e) = self.identity.update_user_metadata(patch).await {
                tracing::error!(user_id = %user_id, error = %e, "Failed to mark account onboarded");
            }
        } else {
            self.notifier.notify(Notice::success(
                "Profile Updated",
                "Your profile information has been successfully updated.",
            ));
        }

        self.update_profile(written.clone());
        self.router.navigate(Route::Home);
        Ok(written)
    }

    /// Record a donation made at `now`, enforcing the cooldown.
    pub async fn record_donation(&self, now: DateTime<Utc>) -> Result<Profile> {
        let user_id = self.current_user_id().ok_or(AppError::Unauthorized)?;
        let Some(profile) = self.profile() else {
            self.notifier.notify(Notice::error(
                "Update Failed",
                "Complete your profile before recording a donation.",
            ));
            return Err(AppError::NotFound(format!("Profile for {} not loaded", user_id)));
        };

        let eligibility = profile.eligibility(now);
        if !eligibility.can_donate {
            tracing::info!(
                user_id = %user_id,
                days_remaining = eligibility.days_remaining,
                "Donation refused during cooldown"
            );
            self.notifier.notify(Notice::error(
                "Not Eligible Yet",
                format!(
                    "You can donate again in {} days.",
                    eligibility.days_remaining
                ),
            ));
            return Err(AppError::BadRequest(format!(
                "Next donation possible in {} days",
                eligibility.days_remaining
            )));
        }

        let patch = ProfilePatch::donation(now, profile.donations_count.saturating_add(1));
        let written = match self.profiles.update_profile(&user_id, &patch).await {
            Ok(profile) => profile,
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "Donation write failed");
                self.notifier.notify(Notice::error(
                    "Update Failed",
                    "Something went wrong while recording your donation. Please try again.",
                ));
                return Err(e);
            }
        };

        tracing::info!(
            user_id = %user_id,
            donations_count = written.donations_count,
            at = %format_utc_rfc3339(now),
            "Donation recorded"
        );
        self.update_profile(written.clone());
        self.notifier.notify(Notice::success(
            "Donation Recorded",
            "Thank you! Your donation has been successfully logged.",
        ));
        Ok(written)
    }

    /// Post a blood request on behalf of the signed-in user.
    pub async fn post_blood_request(&self, form: BloodRequestForm, now: DateTime<Utc>) -> Result<()> {
        form.validate()?;
        let user_id = self.current_user_id().ok_or(AppError::Unauthorized)?;
        let request = form.into_request(&user_id, now);

        if let Err(e) = self.requests.insert_blood_request(&request).await {
            tracing::warn!(user_id = %user_id, error = %e, "Blood request insert failed");
            self.notifier.notify(Notice::error(
                "Submission Failed",
                "There was a problem submitting your blood request. Please try again.",
            ));
            return Err(e);
        }

        tracing::info!(user_id = %user_id, blood_group = %request.blood_group, "Blood request posted");
        self.notifier.notify(Notice::success(
            "Request Posted",
            "Your blood request has been successfully submitted.",
        ));
        self.router.navigate(Route::Home);
        Ok(())
    }

    /// Request feed for the home screen, newest first.
    pub async fn list_blood_requests(
        &self,
        filter: &RequestFilter,
    ) -> Result<Vec<BloodRequestListing>> {
        match self.requests.list_blood_requests(filter).await {
            Ok(requests) => {
                tracing::debug!(count = requests.len(), "Blood request feed loaded");
                Ok(requests)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Blood request feed failed");
                self.notifier.notify(Notice::error(
                    "Failed to Fetch Blood Requests",
                    "An error occurred while retrieving blood requests.",
                ));
                Err(e)
            }
        }
    }

    /// Donor directory lookup used by the donors screen.
    pub async fn search_donors(&self, filter: &DonorFilter) -> Result<Vec<Profile>> {
        match self.profiles.search_donors(filter).await {
            Ok(donors) => {
                tracing::debug!(count = donors.len(), "Donor search complete");
                Ok(donors)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Donor search failed");
                self.notifier.notify(Notice::error(
                    "Failed to Fetch Donors",
                    "An error occurred while retrieving donors.",
                ));
                Err(e)
            }
        }
    }
}

/// Set `session` and its derived `user`, dropping a profile that belongs
/// to someone else.
fn apply_session(state: &watch::Sender<StoreState>, session: Option<Session>) {
    state.send_modify(|s| {
        let user = session.as_ref().map(|x| x.user.clone());
        let keeps_profile = match (&s.profile, &user) {
            (Some(profile), Some(user)) => profile.id == user.id,
            _ => false,
        };
        if !keeps_profile {
            s.profile = None;
        }
        s.user = user;
        s.session = session;
    });
}

async fn listen_for_session_changes(
    mut changes: broadcast::Receiver<crate::models::AuthChange>,
    state: Arc<watch::Sender<StoreState>>,
) {
    loop {
        match changes.recv().await {
            Ok(change) => {
                tracing::debug!(event = ?change.event, signed_in = change.session.is_some(), "Session changed");
                apply_session(&state, change.session);
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Session listener lagged");
            }
            Err(broadcast::error::RecvError::Closed) => {
                tracing::info!("Identity service closed session channel");
                break;
            }
        }
    }
}
