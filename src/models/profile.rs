// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Donor profile model, write patches and the submitted profile form.

use crate::eligibility::{self, Eligibility};
use crate::models::lookup::{BloodGroup, Wilaya};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

/// Domain profile, keyed 1:1 by the user id.
///
/// Only exists once onboarding has completed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "app/lib/generated/")
)]
pub struct Profile {
    pub id: String,
    pub full_name: String,
    pub number_phone: String,
    pub gender: String,
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub blood_group: BloodGroup,
    pub address: String,
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub wilaya: Wilaya,
    pub donor: bool,
    pub onboarded: bool,
    #[cfg_attr(feature = "binding-generation", ts(type = "string | null"))]
    pub updated_at: Option<DateTime<Utc>>,
    #[cfg_attr(feature = "binding-generation", ts(type = "string | null"))]
    pub last_donation: Option<DateTime<Utc>>,
    pub donations_count: u32,
}

impl Profile {
    /// Last donation, treating a zero donation count as "never donated".
    pub fn effective_last_donation(&self) -> Option<DateTime<Utc>> {
        if self.donations_count == 0 {
            None
        } else {
            self.last_donation
        }
    }

    /// Donation eligibility for this donor at `now`.
    pub fn eligibility(&self, now: DateTime<Utc>) -> Eligibility {
        eligibility::eligibility(self.effective_last_donation(), now)
    }
}

/// Partial update written to the `profiles` table.
///
/// Unset fields are left untouched by the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProfilePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number_phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blood_group: Option<BloodGroup>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wilaya: Option<Wilaya>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub donor: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub onboarded: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_donation: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub donations_count: Option<u32>,
}

impl ProfilePatch {
    /// Patch recording a donation made at `at`.
    pub fn donation(at: DateTime<Utc>, donations_count: u32) -> Self {
        Self {
            last_donation: Some(at),
            donations_count: Some(donations_count),
            ..Default::default()
        }
    }
}

/// Profile fields a user fills in during onboarding or on the profile screen.
#[derive(Debug, Clone, PartialEq, Deserialize, Validate)]
pub struct ProfileForm {
    #[validate(custom(function = "crate::validation::validate_short_text"))]
    pub full_name: String,
    #[validate(length(min = 2, message = "Please select your gender."))]
    pub gender: String,
    #[validate(custom(function = "crate::validation::validate_dz_phone"))]
    pub number_phone: String,
    pub blood_group: BloodGroup,
    #[validate(custom(function = "crate::validation::validate_short_text"))]
    pub address: String,
    pub wilaya: Wilaya,
    pub donor: bool,
}

impl ProfileForm {
    /// Prefill the form from an existing profile.
    pub fn from_profile(profile: &Profile) -> Self {
        Self {
            full_name: profile.full_name.clone(),
            gender: profile.gender.clone(),
            number_phone: profile.number_phone.clone(),
            blood_group: profile.blood_group,
            address: profile.address.clone(),
            wilaya: profile.wilaya,
            donor: profile.donor,
        }
    }

    /// Build the write patch, stamping `updated_at` and marking the profile onboarded.
    pub fn into_patch(self, now: DateTime<Utc>) -> ProfilePatch {
        ProfilePatch {
            full_name: Some(self.full_name.trim().to_string()),
            number_phone: Some(crate::validation::normalize_phone(&self.number_phone)),
            gender: Some(self.gender),
            blood_group: Some(self.blood_group),
            address: Some(self.address.trim().to_string()),
            wilaya: Some(self.wilaya),
            donor: Some(self.donor),
            onboarded: Some(true),
            updated_at: Some(now),
            ..Default::default()
        }
    }
}

/// Filter for the donor directory. Only donors are ever listed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DonorFilter {
    pub wilaya: Option<Wilaya>,
    pub blood_group: Option<BloodGroup>,
}
