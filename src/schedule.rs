//! Adaptive poll scheduling.
//!
//! Each feed keeps an exponentially smoothed average of the time between
//! content updates. The next poll is a fraction of that average, stretched
//! for feeds that have gone quiet, clamped to sane bounds and jittered so
//! that feeds added together do not stay in lockstep.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use rand::Rng;

use crate::config::ScheduleConfig;
use crate::feed::Feed;

/// Epoch seconds of 3000-01-01T00:00:00Z, the "never" poll time.
const FAR_FUTURE_SECS: i64 = 32_503_680_000;

/// The instant used to park feeds nobody reads.
pub fn far_future() -> DateTime<Utc> {
    DateTime::from_timestamp(FAR_FUTURE_SECS, 0).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Which rule decides a feed's next poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    /// Not viewed in a long time; polling is suspended.
    Disabled,
    /// No content date yet; poll after the default wait.
    NoHistory,
    /// Poll based on the feed's own update rhythm.
    Adaptive,
}

impl PollState {
    pub fn of(feed: &Feed) -> Self {
        if feed.not_viewed {
            Self::Disabled
        } else if feed.date.is_none() {
            Self::NoHistory
        } else {
            Self::Adaptive
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PollScheduler {
    config: ScheduleConfig,
}

impl PollScheduler {
    pub fn new(config: ScheduleConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScheduleConfig {
        &self.config
    }

    /// Blends the interval since `previous` into the feed's average.
    ///
    /// `count` updates since `previous` are assumed evenly spaced. Nothing
    /// changes without a previous time or with no updates.
    pub fn update_average(
        &self,
        feed: &mut Feed,
        previous: Option<DateTime<Utc>>,
        count: usize,
        now: DateTime<Utc>,
    ) {
        let Some(previous) = previous else {
            return;
        };
        if count < 1 {
            return;
        }

        let interval = elapsed(previous, now).as_secs_f64() / count as f64;
        let weight = self.config.interval_weight;
        let blended = feed.average.as_secs_f64() * (1.0 - weight) + interval * weight;
        feed.average = secs_to_duration(blended);
    }

    /// [`Self::update_average`] measured against the current time.
    pub fn update_average_now(&self, feed: &mut Feed, previous: Option<DateTime<Utc>>, count: usize) {
        self.update_average(feed, previous, count, Utc::now());
    }

    /// Wait before the next poll of an adaptive feed, jitter included.
    ///
    /// Always within `[min - jitter, max + jitter]`.
    pub fn pause<R: Rng + ?Sized>(&self, feed: &Feed, now: DateTime<Utc>, rng: &mut R) -> Duration {
        let c = &self.config;

        let mut pause = secs_to_duration(feed.average.as_secs_f64() * c.update_fraction);
        if pause.is_zero() {
            pause = c.default_wait();
        }

        if let Some(date) = feed.date {
            let since = elapsed(date, now).as_secs_f64();
            if since > pause.as_secs_f64() * c.long_factor {
                pause = secs_to_duration(since / c.long_factor);
            }
        }

        pause = pause.max(c.min()).min(c.max());

        let jitter_nanos = u64::try_from(c.jitter().as_nanos()).unwrap_or(u64::MAX);
        if jitter_nanos > 0 {
            let jitter = Duration::from_nanos(rng.gen_range(0..jitter_nanos));
            pause = if rng.gen_bool(0.5) {
                pause.saturating_add(jitter)
            } else {
                pause.saturating_sub(jitter)
            };
        }
        pause
    }

    /// Sets and returns the feed's next poll time.
    pub fn schedule_next_update<R: Rng + ?Sized>(
        &self,
        feed: &mut Feed,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> DateTime<Utc> {
        let next = match PollState::of(feed) {
            PollState::Disabled => far_future(),
            PollState::NoHistory => add(now, self.config.default_wait()),
            PollState::Adaptive => add(now, self.pause(feed, now, rng)),
        };
        feed.next_update = Some(next);
        next
    }

    /// [`Self::schedule_next_update`] with the current time and thread RNG.
    pub fn schedule_next_update_now(&self, feed: &mut Feed) -> DateTime<Utc> {
        self.schedule_next_update(feed, Utc::now(), &mut rand::thread_rng())
    }

    /// Bookkeeping after a poll that found `new_stories` new stories.
    ///
    /// New content updates the average from the previous content date and
    /// moves the content date to `now`; the feed is then rescheduled.
    pub fn record_poll<R: Rng + ?Sized>(
        &self,
        feed: &mut Feed,
        new_stories: usize,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> DateTime<Utc> {
        if new_stories > 0 {
            self.update_average(feed, feed.date, new_stories, now);
            feed.date = Some(now);
        }
        self.schedule_next_update(feed, now, rng)
    }

    /// Whether a feed last viewed at `last_viewed` should stop being polled.
    ///
    /// A feed with no recorded view is treated as viewed.
    pub fn is_not_viewed(&self, last_viewed: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        last_viewed.is_some_and(|viewed| elapsed(viewed, now) > self.config.not_viewed_after())
    }
}

/// Time from `earlier` to `later`, zero if `earlier` is in the future.
fn elapsed(earlier: DateTime<Utc>, later: DateTime<Utc>) -> Duration {
    (later - earlier).to_std().unwrap_or(Duration::ZERO)
}

fn secs_to_duration(secs: f64) -> Duration {
    if secs.is_nan() || secs <= 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
}

fn add(now: DateTime<Utc>, pause: Duration) -> DateTime<Utc> {
    TimeDelta::from_std(pause)
        .ok()
        .and_then(|delta| now.checked_add_signed(delta))
        .unwrap_or_else(far_future)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn no_jitter() -> PollScheduler {
        PollScheduler::new(ScheduleConfig {
            jitter_secs: 0,
            ..ScheduleConfig::default()
        })
    }

    #[test]
    fn test_update_average_noop_cases() {
        let scheduler = PollScheduler::default();
        let mut feed = Feed::new("u", now());
        feed.average = Duration::from_secs(1000);

        scheduler.update_average(&mut feed, None, 5, now());
        assert_eq!(feed.average, Duration::from_secs(1000));

        scheduler.update_average(&mut feed, Some(now() - TimeDelta::hours(1)), 0, now());
        assert_eq!(feed.average, Duration::from_secs(1000));
    }

    #[test]
    fn test_update_average_blends() {
        let scheduler = PollScheduler::default();
        let mut feed = Feed::new("u", now());
        feed.average = Duration::from_secs(10_000);

        // Two updates over 4000s: interval 2000s.
        scheduler.update_average(&mut feed, Some(now() - TimeDelta::seconds(4000)), 2, now());
        assert_eq!(feed.average, Duration::from_secs(9_200));
    }

    #[test]
    fn test_not_viewed_uses_sentinel() {
        let scheduler = PollScheduler::default();
        let mut feed = Feed::new("u", now());
        feed.not_viewed = true;
        feed.date = Some(now());
        feed.average = Duration::from_secs(60);

        let next = scheduler.schedule_next_update(&mut feed, now(), &mut StdRng::seed_from_u64(1));
        assert_eq!(next, far_future());
        assert_eq!(next, Utc.with_ymd_and_hms(3000, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(feed.next_update, Some(next));
    }

    #[test]
    fn test_no_history_waits_default() {
        let scheduler = PollScheduler::default();
        let mut feed = Feed::new("u", now());
        let next = scheduler.schedule_next_update(&mut feed, now(), &mut StdRng::seed_from_u64(1));
        assert_eq!(next, now() + TimeDelta::hours(3));
    }

    #[test]
    fn test_fraction_of_average() {
        let scheduler = no_jitter();
        let mut feed = Feed::new("u", now());
        feed.date = Some(now() - TimeDelta::hours(1));
        feed.average = Duration::from_secs(4 * 3600);

        let next = scheduler.schedule_next_update(&mut feed, now(), &mut StdRng::seed_from_u64(1));
        assert_eq!(next, now() + TimeDelta::hours(2));
    }

    #[test]
    fn test_zero_average_uses_default() {
        let scheduler = no_jitter();
        let mut feed = Feed::new("u", now());
        feed.date = Some(now());
        let pause = scheduler.pause(&feed, now(), &mut StdRng::seed_from_u64(1));
        assert_eq!(pause, Duration::from_secs(3 * 3600));
    }

    #[test]
    fn test_quiet_feed_backs_off() {
        let scheduler = no_jitter();
        let mut feed = Feed::new("u", now());
        feed.average = Duration::from_secs(3600);
        // Half-hour pause, but nothing new for 100 hours: pause becomes 10h.
        feed.date = Some(now() - TimeDelta::hours(100));
        let pause = scheduler.pause(&feed, now(), &mut StdRng::seed_from_u64(1));
        assert_eq!(pause, Duration::from_secs(10 * 3600));
    }

    #[test]
    fn test_clamped() {
        let scheduler = no_jitter();
        let mut feed = Feed::new("u", now());
        feed.date = Some(now());
        feed.average = Duration::from_secs(60);
        assert_eq!(
            scheduler.pause(&feed, now(), &mut StdRng::seed_from_u64(1)),
            Duration::from_secs(1800)
        );
        feed.average = Duration::from_secs(30 * 86400);
        assert_eq!(
            scheduler.pause(&feed, now(), &mut StdRng::seed_from_u64(1)),
            Duration::from_secs(86400)
        );
    }

    #[test]
    fn test_jitter_bounds() {
        let scheduler = PollScheduler::default();
        let mut feed = Feed::new("u", now());
        feed.date = Some(now());
        feed.average = Duration::from_secs(4 * 3600);
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..200 {
            let pause = scheduler.pause(&feed, now(), &mut rng);
            assert!(pause >= Duration::from_secs(2 * 3600 - 600));
            assert!(pause < Duration::from_secs(2 * 3600 + 600));
        }
    }

    #[test]
    fn test_record_poll() {
        let scheduler = no_jitter();
        let mut feed = Feed::new("u", now());
        feed.date = Some(now() - TimeDelta::seconds(1000));

        scheduler.record_poll(&mut feed, 1, now(), &mut StdRng::seed_from_u64(1));
        assert_eq!(feed.date, Some(now()));
        assert_eq!(feed.average, Duration::from_secs(100));

        let average = feed.average;
        scheduler.record_poll(&mut feed, 0, now() + TimeDelta::hours(1), &mut StdRng::seed_from_u64(1));
        assert_eq!(feed.average, average);
        assert_eq!(feed.date, Some(now()));
        assert!(feed.next_update.is_some());
    }

    #[test]
    fn test_is_not_viewed() {
        let scheduler = PollScheduler::default();
        assert!(!scheduler.is_not_viewed(None, now()));
        assert!(!scheduler.is_not_viewed(Some(now() - TimeDelta::days(10)), now()));
        assert!(scheduler.is_not_viewed(Some(now() - TimeDelta::days(68)), now()));
    }
}
