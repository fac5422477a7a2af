use std::time::{Duration, Instant};

use tracing::debug;

/// A named periodic timer driven by the event loop's wake-ups.
///
/// Starting a running slot replaces it, so there is never more than one
/// timer of a kind. Stopping drops it entirely.
#[derive(Debug)]
pub struct TimerSlot {
    name: &'static str,
    running: Option<Running>,
}

#[derive(Debug, Clone, Copy)]
struct Running {
    period: Duration,
    next_due: Instant,
}

impl TimerSlot {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            running: None,
        }
    }

    /// Stop any running timer of this kind, then start a fresh one whose
    /// first fire is one `period` from `now`.
    pub fn start(&mut self, period: Duration, now: Instant) {
        self.stop();
        debug!(timer = self.name, period_ms = period.as_millis() as u64, "timer started");
        self.running = Some(Running {
            period,
            next_due: now + period,
        });
    }

    /// Like [`TimerSlot::start`] but fires on the next check.
    pub fn start_immediately(&mut self, period: Duration, now: Instant) {
        self.start(period, now);
        if let Some(running) = self.running.as_mut() {
            running.next_due = now;
        }
    }

    pub fn stop(&mut self) {
        if self.running.take().is_some() {
            debug!(timer = self.name, "timer stopped");
        }
    }

    pub fn is_active(&self) -> bool {
        self.running.is_some()
    }

    pub fn period(&self) -> Option<Duration> {
        self.running.map(|r| r.period)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.running.map(|r| r.next_due)
    }

    /// Returns `true` and schedules the next fire if the timer is due.
    /// Missed periods are skipped, not replayed.
    pub fn fire_if_due(&mut self, now: Instant) -> bool {
        match self.running.as_mut() {
            Some(running) if now >= running.next_due => {
                running.next_due = now + running.period;
                true
            }
            _ => false,
        }
    }
}

/// Earliest of the given deadlines.
pub fn earliest(deadlines: impl IntoIterator<Item = Option<Instant>>) -> Option<Instant> {
    deadlines.into_iter().flatten().min()
}
