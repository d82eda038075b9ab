//! Timestamp helpers

use chrono::{DateTime, Utc};

/// Format used for every `generated_at` field
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Current UTC time
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Second-precision UTC timestamp, e.g. `2024-05-01T12:00:00Z`
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_timestamp() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 3, 4).unwrap();
        assert_eq!(format_timestamp(at), "2024-05-01T12:03:04Z");
    }
}
