//! Wall-clock access for generated ids, timestamps and default dates.

use chrono::{DateTime, SecondsFormat, Utc};

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Milliseconds since the Unix epoch.
    fn now_millis(&self) -> i64 {
        self.now().timestamp_millis()
    }

    /// Current date as `YYYY-MM-DD`.
    fn today(&self) -> String {
        self.now().format("%Y-%m-%d").to_string()
    }

    /// Current instant as an ISO-8601 timestamp with millisecond precision.
    fn now_iso(&self) -> String {
        self.now().to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

/// Clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[cfg(test)]
pub use manual::ManualClock;

#[cfg(test)]
mod manual {
    use std::sync::atomic::{AtomicI64, Ordering};

    use chrono::{DateTime, TimeZone, Utc};

    use super::Clock;

    /// Test clock that only moves when told to.
    #[derive(Debug)]
    pub struct ManualClock {
        millis: AtomicI64,
    }

    impl ManualClock {
        pub fn at_millis(millis: i64) -> Self {
            Self {
                millis: AtomicI64::new(millis),
            }
        }

        pub fn advance_millis(&self, delta: i64) {
            self.millis.fetch_add(delta, Ordering::SeqCst);
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            let millis = self.millis.load(Ordering::SeqCst);
            Utc.timestamp_millis_opt(millis)
                .single()
                .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_formats() {
        // 2024-03-05T10:20:30.123Z
        let clock = ManualClock::at_millis(1_709_634_030_123);

        assert_eq!(clock.now_millis(), 1_709_634_030_123);
        assert_eq!(clock.today(), "2024-03-05");
        assert_eq!(clock.now_iso(), "2024-03-05T10:20:30.123Z");
    }

    #[test]
    fn test_manual_clock_advances() {
        let clock = ManualClock::at_millis(1_000);
        clock.advance_millis(25);
        assert_eq!(clock.now_millis(), 1_025);
    }
}
