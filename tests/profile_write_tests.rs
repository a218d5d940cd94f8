// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

mod common;

use bloodbank_core::error::AppError;
use bloodbank_core::gate::Route;
use bloodbank_core::models::{
    BloodGroup, BloodRequestForm, DonorFilter, ProfileForm, RequestFilter, Wilaya,
};
use bloodbank_core::refresh::{FocusScope, RefreshStatus};
use chrono::{Duration, TimeZone, Utc};
use common::{sample_profile, sample_session, wait_until, FakeIdentity, Harness, USER_ID};
use serde_json::Value;
use std::sync::atomic::Ordering;

fn form() -> ProfileForm {
    ProfileForm {
        full_name: "  Yacine Haddad ".to_string(),
        gender: "Male".to_string(),
        number_phone: "+213 661 23 45 67".to_string(),
        blood_group: BloodGroup::ONeg,
        address: "5 Boulevard Zighout Youcef".to_string(),
        wilaya: Wilaya::Constantine,
        donor: true,
    }
}

fn request_form() -> BloodRequestForm {
    BloodRequestForm {
        description: "Urgent: two units needed for surgery tomorrow morning".to_string(),
        number_phone: "0770112233".to_string(),
        blood_group: BloodGroup::BNeg,
        address: "CHU Mustapha Pacha".to_string(),
        wilaya: Wilaya::Alger,
    }
}

#[tokio::test]
async fn test_first_profile_save_completes_onboarding() {
    let h = Harness::new(FakeIdentity::with_session(sample_session(false)));
    let store = h.store();
    let _sub = store.prepare().await.unwrap();
    let now = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();

    let saved = store.submit_profile(form(), now).await.unwrap();

    assert_eq!(saved.full_name, "Yacine Haddad");
    assert_eq!(saved.number_phone, "0661234567");
    assert!(saved.onboarded);
    assert_eq!(saved.updated_at, Some(now));
    assert_eq!(store.profile(), Some(saved));
    assert_eq!(h.notifier.titles(), vec!["Welcome Aboard! 🎉"]);
    assert_eq!(h.navigator.routes(), vec![Route::Home]);

    let updates = h.identity.metadata_updates.lock().unwrap().clone();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0]["onboarded"], Value::Bool(true));
    assert!(wait_until(|| store.session().is_some_and(|s| s.is_onboarded())).await);
}

#[tokio::test]
async fn test_later_profile_save_is_an_update() {
    let h = Harness::new(FakeIdentity::with_session(sample_session(true)));
    h.profiles.insert(sample_profile(USER_ID));
    let store = h.store();
    let _sub = store.prepare().await.unwrap();
    store.get_profile().await.unwrap();

    let mut edit = ProfileForm::from_profile(&store.profile().unwrap());
    edit.address = "Cité 200 Logements".to_string();
    let saved = store.submit_profile(edit, Utc::now()).await.unwrap();

    assert_eq!(saved.address, "Cité 200 Logements");
    assert_eq!(h.notifier.titles(), vec!["Profile Updated"]);
    assert!(h.identity.metadata_updates.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_invalid_profile_form_is_rejected_before_write() {
    let h = Harness::new(FakeIdentity::with_session(sample_session(false)));
    let store = h.store();
    let _sub = store.prepare().await.unwrap();

    let mut bad = form();
    bad.number_phone = "12345".to_string();
    let err = store.submit_profile(bad, Utc::now()).await.unwrap_err();

    assert!(matches!(err, AppError::BadRequest(_)));
    assert!(h.profiles.get(USER_ID).is_none());
    assert_eq!(store.profile(), None);
}

#[tokio::test]
async fn test_profile_save_requires_session() {
    let h = Harness::new(FakeIdentity::default());
    let store = h.store();
    let _sub = store.prepare().await.unwrap();

    let err = store.submit_profile(form(), Utc::now()).await.unwrap_err();
    assert!(matches!(err, AppError::Unauthorized));
}

#[tokio::test]
async fn test_profile_save_failure_notifies() {
    let h = Harness::new(FakeIdentity::with_session(sample_session(false)));
    h.profiles.fail_update.store(true, Ordering::SeqCst);
    let store = h.store();
    let _sub = store.prepare().await.unwrap();

    let err = store.submit_profile(form(), Utc::now()).await.unwrap_err();

    assert!(matches!(err, AppError::Database(_)));
    assert_eq!(h.notifier.titles(), vec!["Setup Failed"]);
    assert!(h.navigator.routes().is_empty());
}

#[tokio::test]
async fn test_record_donation_enforces_cooldown() {
    let h = Harness::new(FakeIdentity::with_session(sample_session(true)));
    h.profiles.insert(sample_profile(USER_ID));
    let store = h.store();
    let _sub = store.prepare().await.unwrap();
    store.get_profile().await.unwrap();
    let first = Utc.with_ymd_and_hms(2026, 1, 10, 8, 30, 0).unwrap();

    let after_first = store.record_donation(first).await.unwrap();
    assert_eq!(after_first.donations_count, 1);
    assert_eq!(after_first.last_donation, Some(first));
    assert_eq!(store.profile(), Some(after_first.clone()));

    let err = store
        .record_donation(first + Duration::days(10))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(ref msg) if msg.contains("110 days")));
    assert_eq!(store.profile(), Some(after_first));
    let refusal = h.notifier.notices.lock().unwrap().last().cloned().unwrap();
    assert_eq!(refusal.title, "Not Eligible Yet");
    assert!(refusal.description.contains("110 days"));

    let second = store
        .record_donation(first + Duration::days(120))
        .await
        .unwrap();
    assert_eq!(second.donations_count, 2);
    assert_eq!(
        h.notifier.titles(),
        vec!["Donation Recorded", "Not Eligible Yet", "Donation Recorded"]
    );
}

#[tokio::test]
async fn test_record_donation_needs_loaded_profile() {
    let h = Harness::new(FakeIdentity::with_session(sample_session(true)));
    let store = h.store();
    let _sub = store.prepare().await.unwrap();

    let err = store.record_donation(Utc::now()).await.unwrap_err();

    assert!(matches!(err, AppError::NotFound(_)));
    assert_eq!(h.notifier.titles(), vec!["Update Failed"]);
}

#[tokio::test]
async fn test_post_blood_request() {
    let h = Harness::new(FakeIdentity::with_session(sample_session(true)));
    let store = h.store();
    let _sub = store.prepare().await.unwrap();
    let now = Utc::now();

    store.post_blood_request(request_form(), now).await.unwrap();

    let inserted = h.requests.inserted.lock().unwrap().clone();
    assert_eq!(inserted.len(), 1);
    assert_eq!(inserted[0].profile_id, USER_ID);
    assert_eq!(inserted[0].created_at, now);
    assert_eq!(inserted[0].blood_group, BloodGroup::BNeg);
    assert_eq!(h.notifier.titles(), vec!["Request Posted"]);
    assert_eq!(h.navigator.routes(), vec![Route::Home]);
}

#[tokio::test]
async fn test_blood_request_description_bounds() {
    let h = Harness::new(FakeIdentity::with_session(sample_session(true)));
    let store = h.store();
    let _sub = store.prepare().await.unwrap();

    let mut short = request_form();
    short.description = "Need O-".to_string();
    let err = store
        .post_blood_request(short, Utc::now())
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::BadRequest(_)));
    assert!(h.requests.inserted.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_padded_input_is_validated_as_stored() {
    let h = Harness::new(FakeIdentity::with_session(sample_session(true)));
    let store = h.store();
    let _sub = store.prepare().await.unwrap();

    let mut padded = request_form();
    padded.description = format!("{:<30}", "Need O-");
    let err = store
        .post_blood_request(padded, Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
    assert!(h.requests.inserted.lock().unwrap().is_empty());

    let mut profile = form();
    profile.full_name = "   Y   ".to_string();
    let err = store
        .submit_profile(profile, Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(ref msg) if msg.contains("full_name")));
    assert!(h.profiles.get(USER_ID).is_none());
}

#[tokio::test]
async fn test_blood_request_feed_through_focus_scope() {
    let h = Harness::new(FakeIdentity::with_session(sample_session(true)));
    let store = h.store();
    let _sub = store.prepare().await.unwrap();
    let morning = Utc.with_ymd_and_hms(2026, 10, 6, 8, 0, 0).unwrap();

    store
        .post_blood_request(request_form(), morning)
        .await
        .unwrap();
    let mut oran = request_form();
    oran.wilaya = Wilaya::Oran;
    store
        .post_blood_request(oran, morning + Duration::hours(1))
        .await
        .unwrap();
    store
        .post_blood_request(request_form(), morning + Duration::hours(2))
        .await
        .unwrap();

    let mut scope = FocusScope::new();
    let mut rx = scope.watch();
    let filter = RequestFilter {
        wilaya: Some(Wilaya::Alger),
        blood_group: Some(BloodGroup::BNeg),
    };
    let feed = store.clone();
    scope.focus(async move { feed.list_blood_requests(&filter).await });

    let refresh = rx
        .wait_for(|r| matches!(r.status, RefreshStatus::Loaded(_)))
        .await
        .unwrap()
        .clone();
    let RefreshStatus::Loaded(requests) = refresh.status else {
        unreachable!();
    };
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].request.created_at, morning + Duration::hours(2));
    assert_eq!(requests[1].request.created_at, morning);
    assert_eq!(requests[0].poster_name(), "Yacine Haddad");
}

#[tokio::test]
async fn test_blood_request_feed_failure_notifies() {
    let h = Harness::new(FakeIdentity::with_session(sample_session(true)));
    h.requests.fail_list.store(true, Ordering::SeqCst);
    let store = h.store();
    let _sub = store.prepare().await.unwrap();

    let err = store
        .list_blood_requests(&RequestFilter::default())
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Network(_)));
    assert_eq!(h.notifier.titles(), vec!["Failed to Fetch Blood Requests"]);
}

#[tokio::test]
async fn test_donor_search_through_focus_scope() {
    let h = Harness::new(FakeIdentity::with_session(sample_session(true)));
    let mut oran = sample_profile("donor-oran");
    oran.wilaya = Wilaya::Oran;
    let mut not_donor = sample_profile("not-donor");
    not_donor.donor = false;
    h.profiles.insert(sample_profile("donor-alger"));
    h.profiles.insert(oran);
    h.profiles.insert(not_donor);
    let store = h.store();
    let _sub = store.prepare().await.unwrap();

    let mut scope = FocusScope::new();
    let mut rx = scope.watch();
    let filter = DonorFilter {
        wilaya: Some(Wilaya::Alger),
        blood_group: None,
    };
    let search = store.clone();
    scope.focus(async move { search.search_donors(&filter).await });

    let refresh = rx
        .wait_for(|r| matches!(r.status, RefreshStatus::Loaded(_)))
        .await
        .unwrap()
        .clone();
    let RefreshStatus::Loaded(donors) = refresh.status else {
        unreachable!();
    };
    assert_eq!(donors.len(), 1);
    assert_eq!(donors[0].id, "donor-alger");
}
