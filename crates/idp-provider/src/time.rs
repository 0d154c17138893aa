//! Instant formatting and request validity windows.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::ProviderError;

/// Default instant format: ISO 8601 UTC, six fractional digits, trailing `Z`.
pub const DEFAULT_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

/// Formats an instant with the given chrono format string.
#[must_use]
pub fn format_instant(instant: DateTime<Utc>, format: &str) -> String {
    instant.format(format).to_string()
}

/// Parses an instant as carried in SAML messages.
pub fn parse_instant(value: &str) -> Result<DateTime<Utc>, ProviderError> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| ProviderError::InvalidRequest(format!("failed to parse timestamp: {e}")))
}

/// Checks a request validity window: ok iff `not_before <= now < not_on_or_after`,
/// with either bound optional.
pub fn check_request_window(
    not_before: &str,
    not_on_or_after: &str,
    now: DateTime<Utc>,
) -> Result<(), ProviderError> {
    if !not_before.is_empty() {
        let bound = parse_instant(not_before)?;
        if bound > now {
            return Err(ProviderError::InvalidRequest(
                "before time given by NotBefore".to_string(),
            ));
        }
    }
    if !not_on_or_after.is_empty() {
        let bound = parse_instant(not_on_or_after)?;
        if bound <= now {
            return Err(ProviderError::InvalidRequest(
                "on or after time given by NotOnOrAfter".to_string(),
            ));
        }
    }
    Ok(())
}

/// Formats an instant for `validUntil` metadata attributes.
#[must_use]
pub fn format_valid_until(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Secs, true)
}
