//! Daily live-event window used to pause refreshing.

use chrono::{DateTime, NaiveTime, Timelike, Utc};

use super::{Clock, SystemClock};

const SECS_PER_DAY: i64 = 86_400;

/// Answers whether a live competitive event is about to start.
pub trait EventWindow: Send + Sync {
    fn is_event_imminent(&self, within_secs: u64) -> bool;
}

/// An event that starts at the same UTC time every day.
///
/// The window counts as imminent on both sides of the start time, so a
/// refresh is also held back during the first minutes of the event.
#[derive(Debug, Clone)]
pub struct DailyEventWindow<C = SystemClock> {
    start_utc: NaiveTime,
    clock: C,
}

impl DailyEventWindow {
    #[must_use]
    pub fn new(start_utc: NaiveTime) -> Self {
        Self::with_clock(start_utc, SystemClock)
    }
}

impl<C: Clock> DailyEventWindow<C> {
    #[must_use]
    pub fn with_clock(start_utc: NaiveTime, clock: C) -> Self {
        Self { start_utc, clock }
    }

    /// Seconds between `now` and the nearest daily start, wrapping midnight.
    fn seconds_to_start(&self, now: DateTime<Utc>) -> u64 {
        let now_secs = i64::from(now.time().num_seconds_from_midnight());
        let start_secs = i64::from(self.start_utc.num_seconds_from_midnight());
        let forward = (now_secs - start_secs).rem_euclid(SECS_PER_DAY);
        u64::try_from(forward.min(SECS_PER_DAY - forward)).unwrap_or(0)
    }

    #[must_use]
    pub fn is_imminent_at(&self, now: DateTime<Utc>, within_secs: u64) -> bool {
        self.seconds_to_start(now) <= within_secs
    }
}

impl<C: Clock> EventWindow for DailyEventWindow<C> {
    fn is_event_imminent(&self, within_secs: u64) -> bool {
        self.is_imminent_at(self.clock.now(), within_secs)
    }
}
