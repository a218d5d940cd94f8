// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Supabase PostgREST client with typed operations.
//!
//! Provides high-level operations for:
//! - Profiles (select by id, partial update, donor search)
//! - Blood requests (insert)
//!
//! Requests carry the signed-in user's access token so row-level security
//! applies; without a session the anonymous key is used.

use crate::config::Config;
use crate::db::{tables, BloodRequestRepository, ProfileRepository};
use crate::error::{AppError, Result};
use crate::models::{
    BloodGroup, BloodRequest, BloodRequestListing, DonorFilter, Profile, ProfilePatch,
    RequestFilter, Wilaya,
};
use crate::services::gotrue::SharedSession;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::PoisonError;

/// Raw `profiles` row. Columns stay null until onboarding fills them in.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileRow {
    pub id: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub number_phone: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub blood_group: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub wilaya: Option<String>,
    #[serde(default)]
    pub donor: Option<bool>,
    #[serde(default)]
    pub onboarded: Option<bool>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_donation: Option<DateTime<Utc>>,
    #[serde(default)]
    pub donations_count: Option<i64>,
}

impl ProfileRow {
    /// Convert to a [`Profile`], or `None` if onboarding has not filled the row.
    pub fn into_profile(self) -> Option<Profile> {
        let blood_group = match self.blood_group.as_deref().map(str::parse::<BloodGroup>) {
            Some(Ok(group)) => group,
            Some(Err(e)) => {
                tracing::warn!(id = %self.id, error = %e, "Ignoring profile with bad blood group");
                return None;
            }
            None => return None,
        };
        let wilaya = match self.wilaya.as_deref().map(str::parse::<Wilaya>) {
            Some(Ok(wilaya)) => wilaya,
            Some(Err(e)) => {
                tracing::warn!(id = %self.id, error = %e, "Ignoring profile with bad wilaya");
                return None;
            }
            None => return None,
        };

        Some(Profile {
            full_name: self.full_name?,
            number_phone: self.number_phone?,
            gender: self.gender?,
            blood_group,
            address: self.address?,
            wilaya,
            donor: self.donor.unwrap_or(false),
            onboarded: self.onboarded.unwrap_or(true),
            updated_at: self.updated_at,
            last_donation: self.last_donation,
            donations_count: self
                .donations_count
                .and_then(|n| u32::try_from(n).ok())
                .unwrap_or(0),
            id: self.id,
        })
    }
}

/// PostgREST database client.
#[derive(Clone)]
pub struct PostgrestDb {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    session: SharedSession,
}

impl PostgrestDb {
    /// Create a client that authenticates with the session in `session`.
    pub fn new(config: &Config, session: SharedSession) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("HTTP client build failed: {}", e)))?;

        Ok(Self {
            http,
            base_url: format!("{}/rest/v1", config.supabase_url),
            api_key: config.supabase_anon_key.clone(),
            session,
        })
    }

    fn bearer(&self) -> String {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|s| s.access_token.clone())
            .unwrap_or_else(|| self.api_key.clone())
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{}", self.base_url, table)
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, url)
            .header("apikey", &self.api_key)
            .bearer_auth(self.bearer())
    }
}

/// PostgREST equality filter value, e.g. `eq.AB%2B`.
pub fn eq_filter(value: &str) -> String {
    format!("eq.{}", urlencoding::encode(value))
}

/// Query string for the donor directory.
pub fn donor_query(filter: &DonorFilter) -> String {
    let mut query = format!("select=*&donor={}", eq_filter("true"));
    if let Some(wilaya) = filter.wilaya {
        query.push_str(&format!("&wilaya={}", eq_filter(wilaya.as_str())));
    }
    if let Some(group) = filter.blood_group {
        query.push_str(&format!("&blood_group={}", eq_filter(group.as_str())));
    }
    query
}

/// Query string for the request feed: poster name joined, newest first.
pub fn requests_query(filter: &RequestFilter) -> String {
    let mut query = String::from("select=*,profiles(full_name)");
    if let Some(wilaya) = filter.wilaya {
        query.push_str(&format!("&wilaya={}", eq_filter(wilaya.as_str())));
    }
    if let Some(group) = filter.blood_group {
        query.push_str(&format!("&blood_group={}", eq_filter(group.as_str())));
    }
    query.push_str("&order=created_at.desc");
    query
}

#[async_trait]
impl ProfileRepository for PostgrestDb {
    async fn select_profile_by_id(&self, id: &str) -> Result<Option<Profile>> {
        let url = format!(
            "{}?select=*&id={}",
            self.table_url(tables::PROFILES),
            eq_filter(id)
        );
        let response = self
            .request(reqwest::Method::GET, &url)
            .send()
            .await
            .map_err(AppError::from_transport)?;

        let rows: Vec<ProfileRow> = check_response_json(response).await?;
        Ok(rows.into_iter().next().and_then(ProfileRow::into_profile))
    }

    async fn update_profile(&self, id: &str, patch: &ProfilePatch) -> Result<Profile> {
        let url = format!("{}?id={}", self.table_url(tables::PROFILES), eq_filter(id));
        let response = self
            .request(reqwest::Method::PATCH, &url)
            .header("Prefer", "return=representation")
            .json(patch)
            .send()
            .await
            .map_err(AppError::from_transport)?;

        let rows: Vec<ProfileRow> = check_response_json(response).await?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| AppError::NotFound(format!("Profile {} not found", id)))?;
        row.into_profile()
            .ok_or_else(|| AppError::Database(format!("Profile {} is incomplete after update", id)))
    }

    async fn search_donors(&self, filter: &DonorFilter) -> Result<Vec<Profile>> {
        let url = format!("{}?{}", self.table_url(tables::PROFILES), donor_query(filter));
        let response = self
            .request(reqwest::Method::GET, &url)
            .send()
            .await
            .map_err(AppError::from_transport)?;

        let rows: Vec<ProfileRow> = check_response_json(response).await?;
        Ok(rows.into_iter().filter_map(ProfileRow::into_profile).collect())
    }
}

#[async_trait]
impl BloodRequestRepository for PostgrestDb {
    async fn insert_blood_request(&self, request: &BloodRequest) -> Result<()> {
        let response = self
            .request(reqwest::Method::POST, &self.table_url(tables::BLOOD_REQUESTS))
            .header("Prefer", "return=minimal")
            .json(&[request])
            .send()
            .await
            .map_err(AppError::from_transport)?;

        check_response(response).await
    }

    async fn list_blood_requests(
        &self,
        filter: &RequestFilter,
    ) -> Result<Vec<BloodRequestListing>> {
        let url = format!(
            "{}?{}",
            self.table_url(tables::BLOOD_REQUESTS),
            requests_query(filter)
        );
        let response = self
            .request(reqwest::Method::GET, &url)
            .send()
            .await
            .map_err(AppError::from_transport)?;

        check_response_json(response).await
    }
}

async fn error_from_response(response: reqwest::Response) -> AppError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    match status.as_u16() {
        401 | 403 => AppError::Unauthorized,
        404 => AppError::NotFound(body),
        400 | 409 | 422 => AppError::BadRequest(body),
        _ => AppError::Database(format!("HTTP {}: {}", status, body)),
    }
}

async fn check_response(response: reqwest::Response) -> Result<()> {
    if response.status().is_success() {
        return Ok(());
    }
    Err(error_from_response(response).await)
}

async fn check_response_json<T: for<'de> Deserialize<'de>>(response: reqwest::Response) -> Result<T> {
    if !response.status().is_success() {
        return Err(error_from_response(response).await);
    }
    response
        .json()
        .await
        .map_err(|e| AppError::Database(format!("JSON parse error: {}", e)))
}
