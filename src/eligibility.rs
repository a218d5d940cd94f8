// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Donation eligibility under the fixed cooldown policy.
//!
//! Elapsed time is measured in whole days, truncated toward zero, not by
//! calendar-day boundaries: a donation at 18:00 becomes eligible again at
//! 18:00 on day 120, never earlier.

use chrono::{DateTime, Utc};
use serde::Serialize;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Minimum interval between two recorded donations.
pub const COOLDOWN_DAYS: i64 = 120;

/// Eligibility summary shown on the achievements screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "app/lib/generated/")
)]
pub struct Eligibility {
    pub can_donate: bool,
    pub days_remaining: u32,
}

/// Whole days elapsed between `last_donation` and `now`.
pub fn whole_days_since(last_donation: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - last_donation).num_days()
}

/// True when the donor never donated or the cooldown has fully elapsed.
pub fn can_donate_again(last_donation: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    match last_donation {
        None => true,
        Some(last) => whole_days_since(last, now) >= COOLDOWN_DAYS,
    }
}

/// Days left in the cooldown; 0 when eligible.
pub fn days_until_next_donation(last_donation: Option<DateTime<Utc>>, now: DateTime<Utc>) -> u32 {
    let elapsed = last_donation.map_or(COOLDOWN_DAYS, |last| whole_days_since(last, now));
    let remaining = (COOLDOWN_DAYS - elapsed).max(0);
    u32::try_from(remaining).unwrap_or(u32::MAX)
}

pub fn eligibility(last_donation: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Eligibility {
    Eligibility {
        can_donate: can_donate_again(last_donation, now),
        days_remaining: days_until_next_donation(last_donation, now),
    }
}
