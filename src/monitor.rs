//! The per-tick battery state machine.
//!
//! [`MonitorState::tick`] takes one reading and returns what should happen
//! (notifications, beeps, pulse cadence) without doing any I/O, so the same
//! logic drives the tray and the headless front-end.

use std::time::Duration;

use chrono::{DateTime, Local, Utc};
use tracing::{debug, info};

use crate::alert::{self, BeepPattern, Severity};
use crate::battery::BatteryReading;
use crate::milestone::MilestoneTracker;
use crate::notify::Notification;
use crate::profile::UserProfile;
use crate::tier::Tier;
use crate::wake::SleepDetector;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Notify(Notification),
    Beep(BeepPattern),
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TickOutcome {
    pub effects: Vec<Effect>,
    /// Pulse period wanted after this tick; `None` means a solid icon.
    pub pulse: Option<Duration>,
}

#[cfg(test)]
impl TickOutcome {
    pub fn notifications(&self) -> impl Iterator<Item = &Notification> {
        self.effects.iter().filter_map(|e| match e {
            Effect::Notify(n) => Some(n),
            Effect::Beep(_) => None,
        })
    }

    pub fn beeps(&self) -> impl Iterator<Item = BeepPattern> + '_ {
        self.effects.iter().filter_map(|e| match e {
            Effect::Beep(b) => Some(*b),
            Effect::Notify(_) => None,
        })
    }
}

/// Everything the monitor remembers between ticks.
#[derive(Debug, Default)]
pub struct MonitorState {
    last_reading: Option<BatteryReading>,
    last_seen_percentage: Option<u8>,
    milestones: MilestoneTracker,
    sleep: SleepDetector,
    seeded: bool,
    pulse_active: bool,
}

impl MonitorState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_reading(&self) -> Option<&BatteryReading> {
        self.last_reading.as_ref()
    }

    pub fn last_seen_percentage(&self) -> Option<u8> {
        self.last_seen_percentage
    }

    pub fn last_discharge_milestone(&self) -> Option<u8> {
        self.milestones.last_discharge()
    }

    pub fn last_charging_milestone(&self) -> Option<u8> {
        self.milestones.last_charging()
    }

    pub fn last_poll(&self) -> Option<DateTime<Utc>> {
        self.sleep.last_poll()
    }

    pub fn was_asleep(&self) -> bool {
        self.sleep.was_asleep()
    }

    pub fn pulse_active(&self) -> bool {
        self.pulse_active
    }

    /// Multi-line dump of what the monitor remembers, for the console.
    pub fn summary(&self) -> String {
        let level = |v: Option<u8>| v.map_or_else(|| "none".to_string(), |p| format!("{p}%"));
        let yes_no = |b: bool| if b { "yes" } else { "no" };
        let reading = self
            .last_reading()
            .map_or_else(|| "none".to_string(), |r| format!("{}% ({})", r.percentage, r.state));
        let last_poll = self.last_poll().map_or_else(
            || "never".to_string(),
            |t| t.with_timezone(&Local).format("%H:%M:%S").to_string(),
        );
        format!(
            "Last reading: {reading}, last seen {}\n\
             Last milestones: discharge {}, charging {}\n\
             Pulsing: {}, resumed from sleep: {}, last poll: {last_poll}",
            level(self.last_seen_percentage()),
            level(self.last_discharge_milestone()),
            level(self.last_charging_milestone()),
            yes_no(self.pulse_active()),
            yes_no(self.was_asleep()),
        )
    }

    /// Run one poll tick.
    pub fn tick(&mut self, reading: BatteryReading, now: DateTime<Utc>, profile: &UserProfile) -> TickOutcome {
        let mut outcome = TickOutcome::default();
        let is_charging = reading.is_charging();

        if let Some(gap) = self.sleep.observe(now, profile.sleep_threshold_seconds) {
            info!(gap_secs = gap, percentage = reading.percentage, "resumed from sleep");
            if profile.sleep_notifications_enabled {
                outcome.effects.push(Effect::Notify(wake_notification(&reading, gap)));
            }
        }

        if !reading.has_telemetry() {
            // Nothing to alert on; the icon falls back to a solid 0%.
            self.pulse_active = false;
            self.last_reading = Some(reading);
            return outcome;
        }

        let p = reading.percentage;

        if !self.seeded {
            self.milestones.seed(
                p,
                is_charging,
                &profile.discharge_thresholds,
                &profile.charging_thresholds,
            );
            self.seeded = true;
            debug!(
                percentage = p,
                discharge = ?self.milestones.last_discharge(),
                charging = ?self.milestones.last_charging(),
                "milestones seeded"
            );
        } else if let Some(milestone) = self.milestones.evaluate(
            p,
            is_charging,
            &profile.discharge_thresholds,
            &profile.charging_thresholds,
        ) {
            info!(
                threshold = milestone.threshold,
                percentage = p,
                severity = milestone.severity().label(),
                "milestone reached"
            );
            if profile.play_sound {
                outcome.effects.push(Effect::Beep(milestone.beep()));
            }
            outcome.effects.push(Effect::Notify(Notification::new(
                milestone.title(),
                milestone.message(),
                milestone.severity(),
            )));
        }

        if profile.play_sound {
            if let Some(beep) = alert::drop_beep(self.last_seen_percentage, p, is_charging) {
                outcome.effects.push(Effect::Beep(beep));
            }
        }
        self.last_seen_percentage = Some(p);

        outcome.pulse = alert::pulse_cadence(Tier::from_percentage(p), is_charging);
        self.pulse_active = outcome.pulse.is_some();

        self.last_reading = Some(reading);
        outcome
    }
}

fn wake_notification(reading: &BatteryReading, gap_secs: i64) -> Notification {
    let mut message = if reading.has_telemetry() {
        format!("Battery at {}% ({}).", reading.percentage, reading.state)
    } else {
        "Battery status unavailable.".to_string()
    };
    if let Some(time) = &reading.time_remaining {
        message.push_str(&format!(" {time} remaining."));
    }
    message.push_str(&format!(" Asleep for about {}.", format_gap(gap_secs)));

    let severity = if reading.has_telemetry() {
        Severity::for_level(reading.percentage, reading.is_charging())
    } else {
        Severity::Info
    };
    Notification::new("System Resumed", message, severity)
}

fn format_gap(secs: i64) -> String {
    if secs < 3600 {
        return format!("{} min", (secs / 60).max(1));
    }
    let h = secs / 3600;
    let m = (secs % 3600) / 60;
    format!("{}h {}m", h, m)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battery::ChargeState;
    use chrono::TimeDelta;

    struct Clock(DateTime<Utc>);

    impl Clock {
        fn new() -> Self {
            Clock(DateTime::from_timestamp(1_700_000_000, 0).unwrap())
        }

        fn advance(&mut self, secs: i64) -> DateTime<Utc> {
            self.0 += TimeDelta::seconds(secs);
            self.0
        }
    }

    fn discharging(p: i64) -> BatteryReading {
        BatteryReading::new(ChargeState::Discharging, p, None)
    }

    fn charging(p: i64) -> BatteryReading {
        BatteryReading::new(ChargeState::Charging, p, None)
    }

    fn run(monitor: &mut MonitorState, clock: &mut Clock, reading: BatteryReading) -> TickOutcome {
        monitor.tick(reading, clock.advance(2), &UserProfile::default())
    }

    fn titles(outcome: &TickOutcome) -> Vec<String> {
        outcome.notifications().map(|n| n.title.clone()).collect()
    }

    #[test]
    fn test_first_tick_seeds_without_notifying() {
        let mut m = MonitorState::new();
        let mut clock = Clock::new();
        let out = run(&mut m, &mut clock, discharging(55));
        assert!(titles(&out).is_empty());
        assert_eq!(m.last_discharge_milestone(), Some(60));

        assert!(titles(&run(&mut m, &mut clock, discharging(52))).is_empty());
        let out = run(&mut m, &mut clock, discharging(49));
        assert_eq!(titles(&out), vec!["Battery Level"]);
        assert_eq!(m.last_discharge_milestone(), Some(50));
    }

    #[test]
    fn test_milestone_fires_exactly_once_at_crossing() {
        let mut m = MonitorState::new();
        let mut clock = Clock::new();
        run(&mut m, &mut clock, discharging(85));
        assert_eq!(m.last_discharge_milestone(), Some(90));

        assert!(titles(&run(&mut m, &mut clock, discharging(81))).is_empty());
        assert_eq!(titles(&run(&mut m, &mut clock, discharging(79))).len(), 1);
        assert!(titles(&run(&mut m, &mut clock, discharging(78))).is_empty());
        assert!(titles(&run(&mut m, &mut clock, discharging(80))).is_empty());
        assert!(titles(&run(&mut m, &mut clock, discharging(79))).is_empty());
    }

    #[test]
    fn test_critical_milestone_triple_beeps() {
        let mut m = MonitorState::new();
        let mut clock = Clock::new();
        run(&mut m, &mut clock, discharging(15));
        let out = run(&mut m, &mut clock, discharging(10));

        let n: Vec<_> = out.notifications().collect();
        assert_eq!(n.len(), 1);
        assert_eq!(n[0].severity, Severity::Critical);
        // Milestone beep, then the drop beep for entering a lower red level.
        assert_eq!(out.beeps().collect::<Vec<_>>(), vec![BeepPattern::TRIPLE, BeepPattern::DOUBLE]);
    }

    #[test]
    fn test_charging_milestone_refires_next_session() {
        let mut m = MonitorState::new();
        let mut clock = Clock::new();
        run(&mut m, &mut clock, charging(45));
        assert_eq!(titles(&run(&mut m, &mut clock, charging(50))), vec!["Battery Charging"]);

        assert!(titles(&run(&mut m, &mut clock, discharging(49))).is_empty());
        assert_eq!(m.last_charging_milestone(), None);
        assert!(titles(&run(&mut m, &mut clock, discharging(48))).is_empty());

        assert!(titles(&run(&mut m, &mut clock, charging(49))).is_empty());
        assert_eq!(m.last_discharge_milestone(), None);
        let out = run(&mut m, &mut clock, charging(50));
        assert_eq!(titles(&out), vec!["Battery Charging"]);
        assert_eq!(m.last_charging_milestone(), Some(50));
    }

    #[test]
    fn test_drop_beeps_follow_tier() {
        let cases = [(31, 29, Some(BeepPattern::DOUBLE)), (55, 44, Some(BeepPattern::SINGLE)), (80, 76, None)];
        for (from, to, expected) in cases {
            let mut m = MonitorState::new();
            let mut clock = Clock::new();
            run(&mut m, &mut clock, discharging(from));
            // Seed past every threshold so only the drop beep can sound.
            let profile = UserProfile {
                discharge_thresholds: vec![100],
                ..UserProfile::default()
            };
            let out = m.tick(discharging(to), clock.advance(2), &profile);
            assert_eq!(out.beeps().next(), expected, "{from}% -> {to}%");
            assert_eq!(m.last_seen_percentage(), Some(to as u8));
        }
    }

    #[test]
    fn test_sound_disabled_emits_no_beeps() {
        let profile = UserProfile {
            play_sound: false,
            ..UserProfile::default()
        };
        let mut m = MonitorState::new();
        let mut clock = Clock::new();
        m.tick(discharging(31), clock.advance(2), &profile);
        let out = m.tick(discharging(29), clock.advance(2), &profile);
        assert_eq!(out.beeps().count(), 0);
        assert_eq!(out.notifications().count(), 1);
    }

    #[test]
    fn test_pulse_cadence_by_tier_and_charging() {
        let mut m = MonitorState::new();
        let mut clock = Clock::new();
        assert_eq!(run(&mut m, &mut clock, discharging(80)).pulse, None);
        assert_eq!(run(&mut m, &mut clock, discharging(45)).pulse, Some(Duration::from_millis(600)));
        assert!(m.pulse_active());
        assert_eq!(run(&mut m, &mut clock, discharging(25)).pulse, Some(Duration::from_millis(300)));
        assert_eq!(run(&mut m, &mut clock, charging(25)).pulse, None);
        assert!(!m.pulse_active());
        let full = BatteryReading::new(ChargeState::Full, 25, None);
        assert_eq!(run(&mut m, &mut clock, full).pulse, None);
    }

    #[test]
    fn test_wake_notification_once_per_gap() {
        let profile = UserProfile::default();
        let mut m = MonitorState::new();
        let mut clock = Clock::new();
        m.tick(discharging(60), clock.advance(0), &profile);

        let out = m.tick(discharging(58), clock.advance(301), &profile);
        let n: Vec<_> = out.notifications().collect();
        assert_eq!(n.len(), 1);
        assert_eq!(n[0].title, "System Resumed");
        assert_eq!(n[0].severity, Severity::Info);
        assert!(m.was_asleep());

        let out = m.tick(discharging(58), clock.advance(2), &profile);
        assert_eq!(out.notifications().count(), 0);
        assert!(!m.was_asleep());
    }

    #[test]
    fn test_gap_below_threshold_is_quiet() {
        let profile = UserProfile::default();
        let mut m = MonitorState::new();
        let mut clock = Clock::new();
        m.tick(discharging(60), clock.advance(0), &profile);
        let out = m.tick(discharging(60), clock.advance(299), &profile);
        assert_eq!(out.notifications().count(), 0);
    }

    #[test]
    fn test_wake_severity_follows_level() {
        let profile = UserProfile::default();
        let mut m = MonitorState::new();
        let mut clock = Clock::new();
        m.tick(discharging(12), clock.advance(0), &profile);
        let out = m.tick(discharging(9), clock.advance(1000), &profile);
        let wake = out.notifications().find(|n| n.title == "System Resumed").unwrap();
        assert_eq!(wake.severity, Severity::Critical);
        assert!(wake.message.contains("9%"));
    }

    #[test]
    fn test_sleep_notifications_can_be_disabled() {
        let profile = UserProfile {
            sleep_notifications_enabled: false,
            ..UserProfile::default()
        };
        let mut m = MonitorState::new();
        let mut clock = Clock::new();
        m.tick(discharging(60), clock.advance(0), &profile);
        let out = m.tick(discharging(60), clock.advance(1000), &profile);
        assert_eq!(out.notifications().count(), 0);
        assert!(m.was_asleep());
    }

    #[test]
    fn test_unavailable_reading_raises_no_alerts() {
        let mut m = MonitorState::new();
        let mut clock = Clock::new();
        for _ in 0..3 {
            let out = run(&mut m, &mut clock, BatteryReading::unavailable());
            assert!(out.effects.is_empty());
            assert_eq!(out.pulse, None);
        }
        assert_eq!(m.last_reading(), Some(&BatteryReading::unavailable()));
        assert_eq!(m.last_seen_percentage(), None);
        assert!(m.last_poll().is_some());

        // First real reading still seeds instead of firing.
        let out = run(&mut m, &mut clock, discharging(35));
        assert!(titles(&out).is_empty());
        assert_eq!(m.last_discharge_milestone(), Some(40));
    }

    #[test]
    fn test_summary_reports_remembered_state() {
        let mut m = MonitorState::new();
        assert!(m.summary().contains("Last reading: none, last seen none"));
        assert!(m.summary().contains("last poll: never"));

        let mut clock = Clock::new();
        run(&mut m, &mut clock, discharging(55));
        run(&mut m, &mut clock, discharging(25));
        let summary = m.summary();
        assert!(summary.contains("Last reading: 25% (Discharging), last seen 25%"), "{summary}");
        assert!(summary.contains("Last milestones: discharge 50%, charging none"), "{summary}");
        assert!(summary.contains("Pulsing: yes, resumed from sleep: no"), "{summary}");
        assert!(!summary.contains("never"));
    }

    #[test]
    fn test_format_gap() {
        assert_eq!(format_gap(301), "5 min");
        assert_eq!(format_gap(20), "1 min");
        assert_eq!(format_gap(3 * 3600 + 120), "3h 2m");
    }
}
