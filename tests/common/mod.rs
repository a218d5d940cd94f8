// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use bloodbank_core::config::Config;
use bloodbank_core::db::{BloodRequestRepository, ProfileRepository};
use bloodbank_core::error::{AppError, Result};
use bloodbank_core::gate::{Navigator, Route, RouteGuard};
use bloodbank_core::models::{
    AuthChange, AuthEvent, BloodGroup, BloodRequest, BloodRequestListing, DonorFilter, Facility,
    Poster, Profile, ProfilePatch, RequestFilter, Session, SignUpOutcome, User, Wilaya,
};
use bloodbank_core::notify::{Notice, Notifier};
use bloodbank_core::services::{
    IdentityProvider, LocationProvider, PermissionStatus, SpatialIndex, TileQuery,
};
use bloodbank_core::store::{Backend, SessionStore};
use geo::Point;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

pub const USER_ID: &str = "8c1f2b4e-user";

/// Build a session for [`USER_ID`].
#[allow(dead_code)]
pub fn sample_session(onboarded: bool) -> Session {
    sample_session_for(USER_ID, onboarded)
}

#[allow(dead_code)]
pub fn sample_session_for(user_id: &str, onboarded: bool) -> Session {
    Session {
        access_token: format!("access-{}", user_id),
        refresh_token: format!("refresh-{}", user_id),
        expires_at: None,
        user: User {
            id: user_id.to_string(),
            email: Some("donor@example.com".to_string()),
            user_metadata: json!({ "onboarded": onboarded })
                .as_object()
                .cloned()
                .unwrap(),
            identities: Some(vec![json!({ "provider": "email" })]),
        },
    }
}

#[allow(dead_code)]
pub fn sample_profile(id: &str) -> Profile {
    Profile {
        id: id.to_string(),
        full_name: "Yacine Haddad".to_string(),
        number_phone: "0661234567".to_string(),
        gender: "Male".to_string(),
        blood_group: BloodGroup::APos,
        address: "5 Boulevard Zighout Youcef".to_string(),
        wilaya: Wilaya::Alger,
        donor: true,
        onboarded: true,
        updated_at: None,
        last_donation: None,
        donations_count: 0,
    }
}

/// Poll `cond` until it holds or a second elapses.
#[allow(dead_code)]
pub async fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
    for _ in 0..100 {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    cond()
}

// ─── Identity ────────────────────────────────────────────────────

/// In-memory identity service.
pub struct FakeIdentity {
    changes: broadcast::Sender<AuthChange>,
    pub session: Mutex<Option<Session>>,
    pub fail_get_session: AtomicBool,
    pub fail_sign_in: AtomicBool,
    pub fail_sign_up: AtomicBool,
    pub fail_sign_out: AtomicBool,
    pub email_in_use: AtomicBool,
    pub onboarded_on_sign_in: AtomicBool,
    pub subscribe_calls: AtomicUsize,
    pub metadata_updates: Mutex<Vec<Map<String, Value>>>,
    pub sign_up_metadata: Mutex<Option<Map<String, Value>>>,
    /// Held by the auto-refresh task while it runs.
    pub refresh_alive: Arc<()>,
}

impl Default for FakeIdentity {
    fn default() -> Self {
        let (changes, _) = broadcast::channel(16);
        Self {
            changes,
            session: Mutex::new(None),
            fail_get_session: AtomicBool::new(false),
            fail_sign_in: AtomicBool::new(false),
            fail_sign_up: AtomicBool::new(false),
            fail_sign_out: AtomicBool::new(false),
            email_in_use: AtomicBool::new(false),
            onboarded_on_sign_in: AtomicBool::new(true),
            subscribe_calls: AtomicUsize::new(0),
            metadata_updates: Mutex::new(Vec::new()),
            sign_up_metadata: Mutex::new(None),
            refresh_alive: Arc::new(()),
        }
    }
}

#[allow(dead_code)]
impl FakeIdentity {
    pub fn with_session(session: Session) -> Self {
        let fake = Self::default();
        *fake.session.lock().unwrap() = Some(session);
        fake
    }

    /// Number of live session listeners.
    pub fn receiver_count(&self) -> usize {
        self.changes.receiver_count()
    }

    /// Push a session change to every listener.
    pub fn emit(&self, event: AuthEvent, session: Option<Session>) {
        *self.session.lock().unwrap() = session.clone();
        let _ = self.changes.send(AuthChange { event, session });
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentity {
    async fn get_session(&self) -> Result<Option<Session>> {
        if self.fail_get_session.load(Ordering::SeqCst) {
            return Err(AppError::Network("connection refused".to_string()));
        }
        Ok(self.session.lock().unwrap().clone())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthChange> {
        self.subscribe_calls.fetch_add(1, Ordering::SeqCst);
        self.changes.subscribe()
    }

    fn start_auto_refresh(&self) -> Option<JoinHandle<()>> {
        let alive = self.refresh_alive.clone();
        Some(tokio::spawn(async move {
            let _alive = alive;
            std::future::pending::<()>().await;
        }))
    }

    async fn sign_up(
        &self,
        email: &str,
        _password: &str,
        metadata: Map<String, Value>,
        _redirect_to: &str,
    ) -> Result<SignUpOutcome> {
        if self.fail_sign_up.load(Ordering::SeqCst) {
            return Err(AppError::Identity("Signups not allowed".to_string()));
        }
        *self.sign_up_metadata.lock().unwrap() = Some(metadata.clone());
        let identities = if self.email_in_use.load(Ordering::SeqCst) {
            vec![]
        } else {
            vec![json!({ "provider": "email" })]
        };
        Ok(SignUpOutcome {
            user: Some(User {
                id: "new-user".to_string(),
                email: Some(email.to_string()),
                user_metadata: metadata,
                identities: Some(identities),
            }),
        })
    }

    async fn sign_in_with_password(&self, _email: &str, _password: &str) -> Result<Session> {
        if self.fail_sign_in.load(Ordering::SeqCst) {
            return Err(AppError::Identity("Invalid login credentials".to_string()));
        }
        let session = sample_session(self.onboarded_on_sign_in.load(Ordering::SeqCst));
        self.emit(AuthEvent::SignedIn, Some(session.clone()));
        Ok(session)
    }

    async fn sign_out(&self) -> Result<()> {
        if self.fail_sign_out.load(Ordering::SeqCst) {
            return Err(AppError::Network("connection reset".to_string()));
        }
        self.emit(AuthEvent::SignedOut, None);
        Ok(())
    }

    async fn update_user_metadata(&self, patch: Map<String, Value>) -> Result<User> {
        let mut session = self
            .session
            .lock()
            .unwrap()
            .clone()
            .ok_or(AppError::Unauthorized)?;
        self.metadata_updates.lock().unwrap().push(patch.clone());
        session.user.user_metadata.extend(patch);
        let user = session.user.clone();
        self.emit(AuthEvent::UserUpdated, Some(session));
        Ok(user)
    }
}

// ─── Storage ─────────────────────────────────────────────────────

#[derive(Default)]
pub struct FakeProfiles {
    pub rows: Mutex<HashMap<String, Profile>>,
    pub fail_select: AtomicBool,
    pub fail_update: AtomicBool,
    pub select_calls: AtomicUsize,
}

#[allow(dead_code)]
impl FakeProfiles {
    pub fn insert(&self, profile: Profile) {
        self.rows
            .lock()
            .unwrap()
            .insert(profile.id.clone(), profile);
    }

    pub fn get(&self, id: &str) -> Option<Profile> {
        self.rows.lock().unwrap().get(id).cloned()
    }
}

fn apply_patch(mut profile: Profile, patch: &ProfilePatch) -> Profile {
    if let Some(v) = &patch.full_name {
        profile.full_name = v.clone();
    }
    if let Some(v) = &patch.number_phone {
        profile.number_phone = v.clone();
    }
    if let Some(v) = &patch.gender {
        profile.gender = v.clone();
    }
    if let Some(v) = patch.blood_group {
        profile.blood_group = v;
    }
    if let Some(v) = &patch.address {
        profile.address = v.clone();
    }
    if let Some(v) = patch.wilaya {
        profile.wilaya = v;
    }
    if let Some(v) = patch.donor {
        profile.donor = v;
    }
    if let Some(v) = patch.onboarded {
        profile.onboarded = v;
    }
    if patch.updated_at.is_some() {
        profile.updated_at = patch.updated_at;
    }
    if patch.last_donation.is_some() {
        profile.last_donation = patch.last_donation;
    }
    if let Some(v) = patch.donations_count {
        profile.donations_count = v;
    }
    profile
}

#[async_trait]
impl ProfileRepository for FakeProfiles {
    async fn select_profile_by_id(&self, id: &str) -> Result<Option<Profile>> {
        self.select_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_select.load(Ordering::SeqCst) {
            return Err(AppError::Timeout);
        }
        Ok(self.get(id))
    }

    async fn update_profile(&self, id: &str, patch: &ProfilePatch) -> Result<Profile> {
        if self.fail_update.load(Ordering::SeqCst) {
            return Err(AppError::Database("permission denied for table profiles".to_string()));
        }
        let current = self.get(id).unwrap_or_else(|| {
            let mut blank = sample_profile(id);
            blank.onboarded = false;
            blank
        });
        let written = apply_patch(current, patch);
        self.insert(written.clone());
        Ok(written)
    }

    async fn search_donors(&self, filter: &DonorFilter) -> Result<Vec<Profile>> {
        let rows = self.rows.lock().unwrap();
        let mut donors: Vec<Profile> = rows
            .values()
            .filter(|p| p.donor)
            .filter(|p| filter.wilaya.is_none_or(|w| p.wilaya == w))
            .filter(|p| filter.blood_group.is_none_or(|g| p.blood_group == g))
            .cloned()
            .collect();
        donors.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(donors)
    }
}

#[derive(Default)]
pub struct FakeRequests {
    pub inserted: Mutex<Vec<BloodRequest>>,
    pub fail_insert: AtomicBool,
    pub fail_list: AtomicBool,
}

#[async_trait]
impl BloodRequestRepository for FakeRequests {
    async fn insert_blood_request(&self, request: &BloodRequest) -> Result<()> {
        if self.fail_insert.load(Ordering::SeqCst) {
            return Err(AppError::Database("insert failed".to_string()));
        }
        self.inserted.lock().unwrap().push(request.clone());
        Ok(())
    }

    async fn list_blood_requests(&self, filter: &RequestFilter) -> Result<Vec<BloodRequestListing>> {
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(AppError::Network("connection reset".to_string()));
        }
        let mut rows: Vec<BloodRequest> = self
            .inserted
            .lock()
            .unwrap()
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows
            .into_iter()
            .map(|request| {
                let poster = (request.profile_id == USER_ID).then(|| Poster {
                    full_name: Some("Yacine Haddad".to_string()),
                });
                BloodRequestListing { request, poster }
            })
            .collect())
    }
}

// ─── Shell ───────────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingNavigator {
    pub routes: Mutex<Vec<Route>>,
}

#[allow(dead_code)]
impl RecordingNavigator {
    pub fn routes(&self) -> Vec<Route> {
        self.routes.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, route: Route) {
        self.routes.lock().unwrap().push(route);
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub notices: Mutex<Vec<Notice>>,
}

#[allow(dead_code)]
impl RecordingNotifier {
    pub fn titles(&self) -> Vec<String> {
        self.notices
            .lock()
            .unwrap()
            .iter()
            .map(|n| n.title.clone())
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices.lock().unwrap().push(notice);
    }
}

// ─── Map ─────────────────────────────────────────────────────────

pub struct FakeSpatialIndex {
    pub features: Vec<Facility>,
    pub fail: bool,
    pub queries: Mutex<Vec<TileQuery>>,
}

#[allow(dead_code)]
impl FakeSpatialIndex {
    pub fn returning(features: Vec<Facility>) -> Self {
        Self {
            features,
            fail: false,
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            features: Vec::new(),
            fail: true,
            queries: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl SpatialIndex for FakeSpatialIndex {
    async fn query(&self, query: &TileQuery) -> Result<Vec<Facility>> {
        self.queries.lock().unwrap().push(*query);
        if self.fail {
            return Err(AppError::Network("tilequery unreachable".to_string()));
        }
        Ok(self.features.clone())
    }
}

pub struct FakeLocation {
    pub granted: bool,
    pub position: Point<f64>,
}

#[async_trait]
impl LocationProvider for FakeLocation {
    async fn request_permission(&self) -> Result<PermissionStatus> {
        Ok(if self.granted {
            PermissionStatus::Granted
        } else {
            PermissionStatus::Denied
        })
    }

    async fn current_position(&self) -> Result<Point<f64>> {
        Ok(self.position)
    }
}

#[allow(dead_code)]
pub fn facility(kind: &str, distance: f64, lon: f64, lat: f64) -> Facility {
    Facility {
        id: None,
        name: None,
        kind: kind.to_string(),
        distance,
        location: Point::new(lon, lat),
    }
}

// ─── Wiring ──────────────────────────────────────────────────────

/// Fakes behind a store, kept around so tests can poke at them.
pub struct Harness {
    pub identity: Arc<FakeIdentity>,
    pub profiles: Arc<FakeProfiles>,
    pub requests: Arc<FakeRequests>,
    pub navigator: Arc<RecordingNavigator>,
    pub notifier: Arc<RecordingNotifier>,
}

#[allow(dead_code)]
impl Harness {
    pub fn new(identity: FakeIdentity) -> Self {
        Self {
            identity: Arc::new(identity),
            profiles: Arc::new(FakeProfiles::default()),
            requests: Arc::new(FakeRequests::default()),
            navigator: Arc::new(RecordingNavigator::default()),
            notifier: Arc::new(RecordingNotifier::default()),
        }
    }

    pub fn backend(&self) -> Backend {
        Backend {
            identity: self.identity.clone(),
            profiles: self.profiles.clone(),
            requests: self.requests.clone(),
        }
    }

    pub fn router(&self) -> Arc<RouteGuard> {
        Arc::new(RouteGuard::new(self.navigator.clone()))
    }

    /// A store wired to the fakes, not yet prepared.
    pub fn store(&self) -> Arc<SessionStore> {
        Arc::new(SessionStore::new(
            &Config::default(),
            self.backend(),
            self.router(),
            self.notifier.clone(),
        ))
    }
}
