//! Wall-clock helpers.
//!
//! Every persisted timestamp in the store is integer milliseconds since
//! the Unix epoch.

use chrono::Utc;

/// Current wall time in milliseconds since the Unix epoch.
#[must_use]
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::now_ms;

    #[test]
    fn now_ms_is_monotonic_enough() {
        let a = now_ms();
        let b = now_ms();
        assert!(b >= a);
        // Sanity: after 2020-01-01, before 2100-01-01.
        assert!(a > 1_577_836_800_000);
        assert!(a < 4_102_444_800_000);
    }
}
