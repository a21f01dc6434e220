use anyhow::{anyhow, Result};
use chrono::DateTime;

/// RFC 3339 timestamp (as returned by the identity directory) to epoch millis.
pub fn parse_rfc3339_millis(value: &str) -> Result<i64> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.timestamp_millis())
        .map_err(|err| anyhow!("invalid timestamp '{}': {}", value, err))
}
