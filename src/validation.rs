// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Phone number validation for Algerian (+213) numbers.
//!
//! Users type national numbers such as `0555 12 34 56`; international
//! forms (`+213555123456`, `00213555123456`) are accepted too.

use std::borrow::Cow;
use validator::ValidationError;

/// Strip separators and country/trunk prefixes, leaving the national
/// significant number.
fn national_number(input: &str) -> Option<String> {
    let compact: String = input
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '.' | '(' | ')'))
        .collect();

    let rest = if let Some(rest) = compact.strip_prefix("+213") {
        rest
    } else if let Some(rest) = compact.strip_prefix("00213") {
        rest
    } else {
        compact.as_str()
    };
    let rest = rest.strip_prefix('0').unwrap_or(rest);

    if rest.is_empty() || !rest.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(rest.to_string())
}

/// Whether `input` is a dialable Algerian mobile or landline number.
///
/// Mobiles have 9 national digits starting with 5, 6 or 7; landlines
/// have 8 starting with 2, 3 or 4.
pub fn is_valid_dz_phone(input: &str) -> bool {
    let Some(number) = national_number(input) else {
        return false;
    };
    match number.as_bytes() {
        [b'5' | b'6' | b'7', ..] => number.len() == 9,
        [b'2' | b'3' | b'4', ..] => number.len() == 8,
        _ => false,
    }
}

/// Canonical national form with trunk prefix, e.g. `0555123456`.
///
/// Invalid input is returned trimmed but otherwise unchanged.
pub fn normalize_phone(input: &str) -> String {
    match national_number(input) {
        Some(number) if is_valid_dz_phone(input) => format!("0{}", number),
        _ => input.trim().to_string(),
    }
}

/// `validator` hook for phone fields.
pub fn validate_dz_phone(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("phone_required")
            .with_message(Cow::Borrowed("Mobile number is required")));
    }
    if !is_valid_dz_phone(value) {
        return Err(ValidationError::new("phone_invalid")
            .with_message(Cow::Borrowed("Invalid mobile number")));
    }
    Ok(())
}

/// Length check on the text that will actually be stored (trimmed).
fn trimmed_length(
    value: &str,
    min: usize,
    max: Option<usize>,
    message: &'static str,
) -> Result<(), ValidationError> {
    let len = value.trim().chars().count();
    if len < min || max.is_some_and(|max| len > max) {
        let mut err = ValidationError::new("length").with_message(Cow::Borrowed(message));
        err.add_param(Cow::Borrowed("min"), &min);
        if let Some(max) = max {
            err.add_param(Cow::Borrowed("max"), &max);
        }
        err.add_param(Cow::Borrowed("value"), &value);
        return Err(err);
    }
    Ok(())
}

/// Names, addresses and other short free-text fields: 2+ characters.
pub fn validate_short_text(value: &str) -> Result<(), ValidationError> {
    trimmed_length(value, 2, None, "Please enter at least 2 characters.")
}

/// Blood request descriptions: 10 to 160 characters.
pub fn validate_request_description(value: &str) -> Result<(), ValidationError> {
    trimmed_length(
        value,
        10,
        Some(160),
        "Please enter between 10 and 160 characters.",
    )
}
