// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time formatting.

use chrono::{DateTime, SecondsFormat, Utc};

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Format a date for display, e.g. `Oct 16, 2026`.
pub fn format_display_date(date: DateTime<Utc>) -> String {
    date.format("%b %-d, %Y").to_string()
}

/// Format a date and time for display, e.g. `Oct 16, 2026, 09:05 AM`.
pub fn format_display_datetime(date: DateTime<Utc>) -> String {
    date.format("%b %-d, %Y, %I:%M %p").to_string()
}
