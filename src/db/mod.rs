//! Database layer (Supabase PostgREST).

pub mod postgrest;

pub use postgrest::PostgrestDb;

use crate::error::Result;
use crate::models::{
    BloodRequest, BloodRequestListing, DonorFilter, Profile, ProfilePatch, RequestFilter,
};
use async_trait::async_trait;

/// Table names as constants.
pub mod tables {
    pub const PROFILES: &str = "profiles";
    pub const BLOOD_REQUESTS: &str = "blood_requests";
}

/// Profile storage consumed by the store and the donor directory.
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// Fetch the profile for `id`; `None` until onboarding has completed.
    async fn select_profile_by_id(&self, id: &str) -> Result<Option<Profile>>;

    /// Apply `patch` to the row for `id` and return the written row.
    async fn update_profile(&self, id: &str, patch: &ProfilePatch) -> Result<Profile>;

    /// List donors matching `filter`.
    async fn search_donors(&self, filter: &DonorFilter) -> Result<Vec<Profile>>;
}

#[async_trait]
pub trait BloodRequestRepository: Send + Sync {
    async fn insert_blood_request(&self, request: &BloodRequest) -> Result<()>;

    /// Requests matching `filter` with the poster's name, newest first.
    async fn list_blood_requests(
        &self,
        filter: &RequestFilter,
    ) -> Result<Vec<BloodRequestListing>>;
}
