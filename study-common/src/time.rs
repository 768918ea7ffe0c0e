//! Timestamp utilities
//!
//! Stored timestamps are Unix milliseconds so that last-write-wins comparisons
//! in SQL are plain integer comparisons.

use chrono::{DateTime, TimeZone, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Current UTC time as Unix milliseconds
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Convert stored Unix milliseconds back to a UTC timestamp
///
/// Out-of-range values collapse to the Unix epoch rather than failing a read.
pub fn from_millis(millis: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}
