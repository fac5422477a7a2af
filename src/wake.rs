use chrono::{DateTime, Utc};

/// Infers a suspend/resume from an abnormally long gap between polls.
///
/// Uses wall-clock time: monotonic clocks stop counting while the host is
/// suspended on some platforms, which would hide the gap.
#[derive(Debug, Default, Clone)]
pub struct SleepDetector {
    last_poll: Option<DateTime<Utc>>,
    was_asleep: bool,
}

impl SleepDetector {
    pub fn last_poll(&self) -> Option<DateTime<Utc>> {
        self.last_poll
    }

    pub fn was_asleep(&self) -> bool {
        self.was_asleep
    }

    /// Record a poll at `now`. Returns the gap in seconds when this poll is
    /// the first one after a sleep.
    pub fn observe(&mut self, now: DateTime<Utc>, threshold_secs: u64) -> Option<i64> {
        let previous = self.last_poll.replace(now)?;
        let gap = (now - previous).num_seconds();

        if gap > threshold_secs as i64 {
            if self.was_asleep {
                return None;
            }
            self.was_asleep = true;
            Some(gap)
        } else {
            self.was_asleep = false;
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    fn t0() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn test_first_poll_never_wakes() {
        let mut d = SleepDetector::default();
        assert_eq!(d.observe(t0(), 300), None);
        assert_eq!(d.last_poll(), Some(t0()));
    }

    #[test]
    fn test_gap_over_threshold_wakes_once() {
        let mut d = SleepDetector::default();
        d.observe(t0(), 300);
        let woke = t0() + TimeDelta::seconds(301);
        assert_eq!(d.observe(woke, 300), Some(301));
        assert!(d.was_asleep());
    }

    #[test]
    fn test_gap_under_threshold_is_ignored() {
        let mut d = SleepDetector::default();
        d.observe(t0(), 300);
        assert_eq!(d.observe(t0() + TimeDelta::seconds(299), 300), None);
        assert!(!d.was_asleep());
    }

    #[test]
    fn test_flag_clears_after_normal_tick() {
        let mut d = SleepDetector::default();
        d.observe(t0(), 300);
        let woke = t0() + TimeDelta::seconds(1000);
        assert!(d.observe(woke, 300).is_some());

        let normal = woke + TimeDelta::seconds(2);
        assert_eq!(d.observe(normal, 300), None);
        assert!(!d.was_asleep());

        // A second sleep is reported again.
        let woke_again = normal + TimeDelta::seconds(600);
        assert_eq!(d.observe(woke_again, 300), Some(600));
    }

    #[test]
    fn test_back_to_back_gaps_report_once() {
        let mut d = SleepDetector::default();
        d.observe(t0(), 300);
        let first = t0() + TimeDelta::seconds(400);
        assert!(d.observe(first, 300).is_some());
        let second = first + TimeDelta::seconds(400);
        assert_eq!(d.observe(second, 300), None);
    }
}
