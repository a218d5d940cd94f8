// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Headless driver for the blood-bank client core.
//!
//! Boots the store against the configured Supabase project, optionally signs
//! in with `BLOODBANK_EMAIL`/`BLOODBANK_PASSWORD`, optionally resolves the
//! nearest hospital to `BLOODBANK_LOCATION` (`lon,lat`), then follows
//! session changes until interrupted.

use bloodbank_core::{
    config::Config,
    db::PostgrestDb,
    gate::LogNavigator,
    models::RequestFilter,
    notify::LogNotifier,
    services::{FacilityResolver, FixedLocation, GoTrueClient, MapboxTilequery, Resolution},
    store::{Backend, SignInStatus},
    time_utils::format_display_date,
    AppState,
};
use chrono::Utc;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(
        supabase = %config.supabase_url,
        timeout_secs = config.request_timeout.as_secs(),
        "Starting blood-bank client core"
    );

    let gotrue = Arc::new(GoTrueClient::new(&config)?);
    let db = Arc::new(PostgrestDb::new(&config, gotrue.session_handle())?);
    let backend = Backend {
        identity: gotrue.clone(),
        profiles: db.clone(),
        requests: db,
    };
    let notifier = Arc::new(LogNotifier);

    let app = AppState::start(
        config.clone(),
        backend,
        Arc::new(LogNavigator),
        notifier.clone(),
    )
    .await?;

    if let (Ok(email), Ok(password)) = (
        std::env::var("BLOODBANK_EMAIL"),
        std::env::var("BLOODBANK_PASSWORD"),
    ) {
        if let SignInStatus::SignedIn { onboarded } =
            app.store.sign_in_with_password(&email, &password).await
        {
            tracing::info!(onboarded, "Headless sign-in complete");
            // The session reaches the store through the auth listener.
            app.store.watch().wait_for(|s| s.session.is_some()).await?;
            app.store.get_profile().await?;
            if let Some(profile) = app.store.profile() {
                let eligibility = profile.eligibility(Utc::now());
                tracing::info!(
                    donations = profile.donations_count,
                    last_donation = %profile
                        .effective_last_donation()
                        .map(format_display_date)
                        .unwrap_or_else(|| "never".to_string()),
                    can_donate = eligibility.can_donate,
                    days_remaining = eligibility.days_remaining,
                    "Donor status"
                );
            }
            for listing in app
                .store
                .list_blood_requests(&RequestFilter::default())
                .await?
                .iter()
                .take(5)
            {
                tracing::info!(
                    poster = listing.poster_name(),
                    posted_at = %listing.posted_at(),
                    blood_group = %listing.request.blood_group,
                    wilaya = %listing.request.wilaya,
                    "Open blood request"
                );
            }
        }
    }

    if let Ok(raw) = std::env::var("BLOODBANK_LOCATION") {
        match parse_location(&raw) {
            Some(point) => {
                let mut resolver = FacilityResolver::new(
                    Arc::new(MapboxTilequery::new(&config)?),
                    Arc::new(FixedLocation(point)),
                    notifier,
                );
                resolver.locate().await?;
                if let Resolution::Found(hospital) = resolver.find_nearest().await? {
                    tracing::info!(
                        name = hospital.name.as_deref().unwrap_or("unnamed"),
                        distance_m = hospital.distance,
                        lon = hospital.location.x(),
                        lat = hospital.location.y(),
                        "Nearest hospital"
                    );
                }
            }
            None => tracing::warn!(value = %raw, "BLOODBANK_LOCATION must be `lon,lat`"),
        }
    }

    tokio::signal::ctrl_c().await?;
    app.shutdown();
    Ok(())
}

fn parse_location(raw: &str) -> Option<geo::Point<f64>> {
    let (lon, lat) = raw.split_once(',')?;
    let lon: f64 = lon.trim().parse().ok()?;
    let lat: f64 = lat.trim().parse().ok()?;
    Some(geo::Point::new(lon, lat))
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("bloodbank_core=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
