//! Blood request posted by a seeker.

use crate::models::lookup::{BloodGroup, Wilaya};
use crate::time_utils::format_display_datetime;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Row inserted into the `blood_requests` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BloodRequest {
    pub profile_id: String,
    pub created_at: DateTime<Utc>,
    pub blood_group: BloodGroup,
    pub address: String,
    pub wilaya: Wilaya,
    pub description: String,
    pub phone_number: String,
}

/// Fields a user fills in when posting a request.
#[derive(Debug, Clone, PartialEq, Deserialize, Validate)]
pub struct BloodRequestForm {
    #[validate(custom(function = "crate::validation::validate_request_description"))]
    pub description: String,
    #[validate(custom(function = "crate::validation::validate_dz_phone"))]
    pub number_phone: String,
    pub blood_group: BloodGroup,
    #[validate(custom(function = "crate::validation::validate_short_text"))]
    pub address: String,
    pub wilaya: Wilaya,
}

impl BloodRequestForm {
    pub fn into_request(self, profile_id: &str, now: DateTime<Utc>) -> BloodRequest {
        BloodRequest {
            profile_id: profile_id.to_string(),
            created_at: now,
            blood_group: self.blood_group,
            address: self.address.trim().to_string(),
            wilaya: self.wilaya,
            description: self.description.trim().to_string(),
            phone_number: crate::validation::normalize_phone(&self.number_phone),
        }
    }
}

/// Filters for the home screen request feed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestFilter {
    pub wilaya: Option<Wilaya>,
    pub blood_group: Option<BloodGroup>,
}

impl RequestFilter {
    pub fn matches(&self, request: &BloodRequest) -> bool {
        self.wilaya.is_none_or(|w| request.wilaya == w)
            && self.blood_group.is_none_or(|g| request.blood_group == g)
    }
}

/// Embedded `profiles(full_name)` of the poster.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Poster {
    #[serde(default)]
    pub full_name: Option<String>,
}

/// A request as listed in the feed, with the poster's name joined in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BloodRequestListing {
    #[serde(flatten)]
    pub request: BloodRequest,
    #[serde(rename = "profiles", default)]
    pub poster: Option<Poster>,
}

impl BloodRequestListing {
    pub fn poster_name(&self) -> &str {
        self.poster
            .as_ref()
            .and_then(|p| p.full_name.as_deref())
            .unwrap_or("Anonymous")
    }

    /// Posting time as shown on the request card.
    pub fn posted_at(&self) -> String {
        format_display_datetime(self.request.created_at)
    }
}
