use chrono::Utc;

/// Milliseconds since the unix epoch, used to stamp node lifecycle events.
pub fn time_millis() -> i64 {
    Utc::now().timestamp_millis()
}
