//! Once-per-crossing milestone detection.
//!
//! Each direction remembers the last threshold it fired for. Discharge
//! milestones only move down and charging milestones only move up, so jitter
//! around a threshold never repeats a notification. Switching direction
//! clears the other side and re-seeds the new one from the current level, so
//! the next session fires again without replaying levels already passed.

use crate::alert::{BeepPattern, Severity};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Discharge,
    Charging,
}

/// A threshold crossing worth telling the user about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Milestone {
    pub direction: Direction,
    pub threshold: u8,
    pub percentage: u8,
}

impl Milestone {
    pub fn severity(&self) -> Severity {
        match self.direction {
            Direction::Charging => Severity::Info,
            Direction::Discharge => match self.threshold {
                0..=10 => Severity::Critical,
                11..=30 => Severity::Warning,
                _ => Severity::Info,
            },
        }
    }

    pub fn beep(&self) -> BeepPattern {
        match self.direction {
            Direction::Charging => BeepPattern::SINGLE,
            Direction::Discharge => match self.threshold {
                0..=10 => BeepPattern::TRIPLE,
                11..=20 => BeepPattern::DOUBLE,
                _ => BeepPattern::SINGLE,
            },
        }
    }

    pub fn title(&self) -> &'static str {
        match (self.direction, self.severity()) {
            (Direction::Charging, _) if self.threshold >= 100 => "Battery Fully Charged",
            (Direction::Charging, _) => "Battery Charging",
            (Direction::Discharge, Severity::Critical) => "Battery Critical",
            (Direction::Discharge, Severity::Warning) => "Battery Low",
            (Direction::Discharge, Severity::Info) => "Battery Level",
        }
    }

    pub fn message(&self) -> String {
        match (self.direction, self.severity()) {
            (Direction::Charging, _) if self.threshold >= 100 => {
                "Battery is fully charged. You can unplug the charger.".to_string()
            }
            (Direction::Charging, _) => {
                format!("Battery charged to {}% (passed {}%).", self.percentage, self.threshold)
            }
            (Direction::Discharge, Severity::Critical) => format!(
                "Battery critically low at {}%. Plug in the charger now.",
                self.percentage
            ),
            (Direction::Discharge, Severity::Warning) => format!(
                "Battery low at {}%. Consider plugging in the charger.",
                self.percentage
            ),
            (Direction::Discharge, Severity::Info) => {
                format!("Battery down to {}% (passed {}%).", self.percentage, self.threshold)
            }
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MilestoneTracker {
    last_discharge: Option<u8>,
    last_charging: Option<u8>,
    direction: Option<Direction>,
}

impl MilestoneTracker {
    pub fn last_discharge(&self) -> Option<u8> {
        self.last_discharge
    }

    pub fn last_charging(&self) -> Option<u8> {
        self.last_charging
    }

    /// First-tick seeding: mark levels already passed as fired without
    /// notifying. `discharge` must be sorted descending, `charging` ascending.
    pub fn seed(&mut self, percentage: u8, is_charging: bool, discharge: &[u8], charging: &[u8]) {
        if is_charging {
            self.last_discharge = None;
            self.last_charging = charging.iter().copied().filter(|&m| m <= percentage).max();
            self.direction = Some(Direction::Charging);
        } else {
            self.last_charging = None;
            self.last_discharge = discharge.iter().copied().filter(|&m| m >= percentage).min();
            self.direction = Some(Direction::Discharge);
        }
    }

    /// Evaluate one tick. At most one milestone fires, for the current
    /// direction only. `discharge` must be sorted descending, `charging`
    /// ascending; the first match wins. A tick that changes direction only
    /// re-seeds and never fires.
    pub fn evaluate(
        &mut self,
        percentage: u8,
        is_charging: bool,
        discharge: &[u8],
        charging: &[u8],
    ) -> Option<Milestone> {
        let direction = if is_charging {
            Direction::Charging
        } else {
            Direction::Discharge
        };
        if self.direction != Some(direction) {
            self.seed(percentage, is_charging, discharge, charging);
            return None;
        }

        if is_charging {
            let hit = charging.iter().copied().find(|&m| {
                percentage >= m && self.last_charging.is_none_or(|last| last < m)
            })?;
            self.last_charging = Some(hit);
            Some(Milestone {
                direction: Direction::Charging,
                threshold: hit,
                percentage,
            })
        } else {
            let hit = discharge.iter().copied().find(|&m| {
                percentage <= m && self.last_discharge.is_none_or(|last| last > m)
            })?;
            self.last_discharge = Some(hit);
            Some(Milestone {
                direction: Direction::Discharge,
                threshold: hit,
                percentage,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DISCHARGE: &[u8] = &[90, 80, 70, 60, 50, 40, 30, 20, 10];
    const CHARGING: &[u8] = &[25, 50, 75, 90, 100];

    fn fired(tracker: &mut MilestoneTracker, p: u8, charging: bool) -> Option<u8> {
        tracker
            .evaluate(p, charging, DISCHARGE, CHARGING)
            .map(|m| m.threshold)
    }

    #[test]
    fn test_fires_once_per_crossing_while_discharging() {
        let mut t = MilestoneTracker::default();
        t.seed(92, false, DISCHARGE, CHARGING);
        assert_eq!(t.last_discharge(), None);

        assert_eq!(fired(&mut t, 92, false), None);
        assert_eq!(fired(&mut t, 89, false), Some(90));
        assert_eq!(fired(&mut t, 81, false), None);
        assert_eq!(fired(&mut t, 79, false), Some(80));
        assert_eq!(fired(&mut t, 78, false), None);
        assert_eq!(fired(&mut t, 80, false), None);
        assert_eq!(fired(&mut t, 79, false), None);
    }

    #[test]
    fn test_startup_seeding_skips_passed_levels() {
        let mut t = MilestoneTracker::default();
        t.seed(55, false, DISCHARGE, CHARGING);
        assert_eq!(t.last_discharge(), Some(60));

        assert_eq!(fired(&mut t, 55, false), None);
        assert_eq!(fired(&mut t, 51, false), None);
        assert_eq!(fired(&mut t, 49, false), Some(50));
    }

    #[test]
    fn test_seeding_exactly_on_threshold() {
        let mut t = MilestoneTracker::default();
        t.seed(50, false, DISCHARGE, CHARGING);
        assert_eq!(t.last_discharge(), Some(50));
        assert_eq!(fired(&mut t, 50, false), None);
    }

    #[test]
    fn test_seeding_while_charging() {
        let mut t = MilestoneTracker::default();
        t.seed(55, true, DISCHARGE, CHARGING);
        assert_eq!(t.last_charging(), Some(50));
        assert_eq!(t.last_discharge(), None);
        assert_eq!(fired(&mut t, 60, true), None);
        assert_eq!(fired(&mut t, 75, true), Some(75));
    }

    #[test]
    fn test_discharge_milestone_only_decreases() {
        let mut t = MilestoneTracker::default();
        t.seed(95, false, DISCHARGE, CHARGING);
        let mut last = None;
        for p in (0..=95u8).rev() {
            fired(&mut t, p, false);
            if let (Some(prev), Some(now)) = (last, t.last_discharge()) {
                assert!(now <= prev);
            }
            last = t.last_discharge();
        }
        assert_eq!(t.last_discharge(), Some(10));
    }

    #[test]
    fn test_charging_session_refires_after_discharge() {
        let mut t = MilestoneTracker::default();
        t.seed(40, true, DISCHARGE, CHARGING);
        assert_eq!(fired(&mut t, 50, true), Some(50));
        assert_eq!(t.last_charging(), Some(50));

        // Unplugged: charging side resets.
        assert_eq!(fired(&mut t, 49, false), None);
        assert_eq!(t.last_charging(), None);

        // Plugged back in: discharge side resets, 50% fires again.
        assert_eq!(fired(&mut t, 49, true), None);
        assert_eq!(t.last_discharge(), None);
        assert_eq!(fired(&mut t, 50, true), Some(50));
    }

    #[test]
    fn test_unplugging_does_not_replay_passed_levels() {
        let mut t = MilestoneTracker::default();
        t.seed(45, true, DISCHARGE, CHARGING);
        assert_eq!(fired(&mut t, 49, true), None);

        assert_eq!(fired(&mut t, 49, false), None);
        assert_eq!(t.last_discharge(), Some(50));
        for p in (41..=48).rev() {
            assert_eq!(fired(&mut t, p, false), None, "{p}%");
        }
        assert_eq!(fired(&mut t, 40, false), Some(40));
    }

    #[test]
    fn test_plugging_in_does_not_replay_passed_levels() {
        let mut t = MilestoneTracker::default();
        t.seed(80, false, DISCHARGE, CHARGING);

        assert_eq!(fired(&mut t, 80, true), None);
        assert_eq!(t.last_charging(), Some(75));
        assert_eq!(fired(&mut t, 81, true), None);
        assert_eq!(fired(&mut t, 89, true), None);
        assert_eq!(fired(&mut t, 90, true), Some(90));
    }

    #[test]
    fn test_one_milestone_per_tick_after_big_drop() {
        let mut t = MilestoneTracker::default();
        t.seed(95, false, DISCHARGE, CHARGING);
        assert_eq!(fired(&mut t, 45, false), Some(90));
        assert_eq!(fired(&mut t, 45, false), Some(80));
    }

    #[test]
    fn test_severity_and_beeps() {
        let m = |threshold, direction| Milestone {
            direction,
            threshold,
            percentage: threshold,
        };
        assert_eq!(m(10, Direction::Discharge).severity(), Severity::Critical);
        assert_eq!(m(10, Direction::Discharge).beep(), BeepPattern::TRIPLE);
        assert_eq!(m(20, Direction::Discharge).severity(), Severity::Warning);
        assert_eq!(m(20, Direction::Discharge).beep(), BeepPattern::DOUBLE);
        assert_eq!(m(30, Direction::Discharge).severity(), Severity::Warning);
        assert_eq!(m(30, Direction::Discharge).beep(), BeepPattern::SINGLE);
        assert_eq!(m(50, Direction::Discharge).severity(), Severity::Info);
        assert_eq!(m(100, Direction::Charging).severity(), Severity::Info);
        assert_eq!(m(100, Direction::Charging).title(), "Battery Fully Charged");
        assert_eq!(m(75, Direction::Charging).beep(), BeepPattern::SINGLE);
    }
}
