// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time formatting and trip durations.

use chrono::{DateTime, SecondsFormat, Utc};

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Absolute elapsed time between two instants, in milliseconds.
pub fn elapsed_millis(start: DateTime<Utc>, end: DateTime<Utc>) -> u64 {
    end.signed_duration_since(start).num_milliseconds().unsigned_abs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_elapsed_millis_is_absolute() {
        let start = DateTime::from_timestamp(1_704_103_200, 0).unwrap();
        let end = start + Duration::milliseconds(90_500);

        assert_eq!(elapsed_millis(start, end), 90_500);
        assert_eq!(elapsed_millis(end, start), 90_500);
        assert_eq!(elapsed_millis(start, start), 0);
    }

    #[test]
    fn test_format_uses_z_suffix() {
        let date = DateTime::from_timestamp(1_704_103_200, 0).unwrap();
        assert_eq!(format_utc_rfc3339(date), "2024-01-01T10:00:00.000Z");
    }
}
