//! Timestamps carried by events and recipes.

use chrono::{DateTime, Utc};

/// UTC instant at which an event was observed.
pub type Timestamp = DateTime<Utc>;

/// Return the current UTC time.
#[must_use]
pub fn now() -> Timestamp {
    Utc::now()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_be_monotonic_across_two_calls() {
        let first = now();
        let second = now();
        assert!(second >= first);
    }
}
