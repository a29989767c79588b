use chrono::{DateTime, Utc};

/// Time source for attempt services.
///
/// Attempt timestamps (visit baselines, answer events, summary completion)
/// all flow through a `Clock`, so tests can pin the wall clock to a known
/// instant instead of sleeping.
#[derive(Debug, Clone, Copy, Default)]
pub enum Clock {
    #[default]
    Default,
    Fixed(DateTime<Utc>),
}

impl Clock {
    /// Returns a clock pinned at the given instant.
    #[must_use]
    pub fn fixed(at: DateTime<Utc>) -> Self {
        Self::Fixed(at)
    }

    /// Returns the current time according to the clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::Default => Utc::now(),
            Clock::Fixed(t) => *t,
        }
    }
}

/// Deterministic attempt start instant used across the test suites
/// (2024-03-01T00:00:00Z).
pub const FIXED_TEST_TIMESTAMP: i64 = 1_709_251_200;

/// Returns the deterministic `DateTime<Utc>` behind [`FIXED_TEST_TIMESTAMP`].
///
/// # Panics
///
/// Panics if the fixed timestamp cannot be represented.
#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(FIXED_TEST_TIMESTAMP, 0)
        .expect("fixed timestamp should be valid")
}

/// Returns a `Clock` pinned at [`fixed_now`].
#[must_use]
pub fn fixed_clock() -> Clock {
    Clock::fixed(fixed_now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn fixed_clock_reports_the_pinned_instant() {
        let clock = fixed_clock();
        assert_eq!(clock.now(), fixed_now());
        // Pinned clocks never drift between reads.
        assert_eq!(clock.now(), clock.now());
    }

    #[test]
    fn default_clock_tracks_system_time() {
        let clock = Clock::default();
        let delta = Utc::now() - clock.now();
        assert!(delta < Duration::seconds(5));
    }
}
