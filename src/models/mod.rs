// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod blood_request;
pub mod facility;
pub mod lookup;
pub mod profile;
pub mod session;

pub use blood_request::{BloodRequest, BloodRequestForm, BloodRequestListing, Poster, RequestFilter};
pub use facility::Facility;
pub use lookup::{BloodGroup, Wilaya};
pub use profile::{DonorFilter, Profile, ProfileForm, ProfilePatch};
pub use session::{AuthChange, AuthEvent, Session, SignUpOutcome, User};
