//! General time utility functions

use chrono;

/// Number of nanoseconds in a second
pub const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Number of seconds in an hour
pub const SECONDS_PER_HOUR: f64 = 3600.0;

/// Number of seconds in a minute
pub const SECONDS_PER_MINUTE: f64 = 60.0;

/// Convert a duration into a number of seconds, or `None` if overflow
pub fn duration_to_seconds(duration: chrono::Duration) -> Option<f64> {
    duration
        .num_nanoseconds()
        .map(|ns| ns as f64 / NANOS_PER_SECOND as f64)
}

/// Convert an hours, minutes, seconds time of day into seconds since midnight.
pub fn hms_to_seconds(hours: u32, minutes: u32, seconds: f64) -> f64 {
    hours as f64 * SECONDS_PER_HOUR + minutes as f64 * SECONDS_PER_MINUTE + seconds
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_hms_to_seconds() {
        assert_eq!(hms_to_seconds(0, 0, 0.0), 0.0);
        assert_eq!(hms_to_seconds(12, 35, 19.0), 45319.0);
        assert!((hms_to_seconds(23, 59, 59.5) - 86399.5).abs() < 1e-9);
    }

    #[test]
    fn test_duration_to_seconds() {
        let d = chrono::Duration::milliseconds(1500);
        assert_eq!(duration_to_seconds(d), Some(1.5));
    }
}
