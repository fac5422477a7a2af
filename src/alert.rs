//! Alert policy: notification severity, beep patterns and the low-battery
//! pulse animation.

use std::time::Duration;

use crate::tier::Tier;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl Severity {
    pub fn label(self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        }
    }

    /// Severity for a reading at `percentage`: only a discharging battery can
    /// be warning or critical.
    pub fn for_level(percentage: u8, is_charging: bool) -> Self {
        match percentage {
            _ if is_charging => Severity::Info,
            0..=10 => Severity::Critical,
            11..=20 => Severity::Warning,
            _ => Severity::Info,
        }
    }
}

/// Number of short beeps to play back to back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BeepPattern {
    pub count: u8,
}

impl BeepPattern {
    pub const SINGLE: BeepPattern = BeepPattern { count: 1 };
    pub const DOUBLE: BeepPattern = BeepPattern { count: 2 };
    pub const TRIPLE: BeepPattern = BeepPattern { count: 3 };
}

/// Beep for a drop of at least one point since the previous tick. Double in
/// the red tier, single in orange, silent otherwise.
pub fn drop_beep(last_seen: Option<u8>, percentage: u8, is_charging: bool) -> Option<BeepPattern> {
    if is_charging {
        return None;
    }
    let dropped = last_seen.is_some_and(|last| last.saturating_sub(percentage) >= 1);
    if !dropped {
        return None;
    }
    match Tier::from_percentage(percentage) {
        Tier::Red => Some(BeepPattern::DOUBLE),
        Tier::Orange => Some(BeepPattern::SINGLE),
        Tier::Yellow | Tier::Green => None,
    }
}

/// Pulse period for the tray icon, or `None` when it should stay solid.
pub fn pulse_cadence(tier: Tier, is_charging: bool) -> Option<Duration> {
    if is_charging {
        return None;
    }
    match tier {
        Tier::Red => Some(Duration::from_millis(300)),
        Tier::Orange => Some(Duration::from_millis(600)),
        Tier::Yellow | Tier::Green => None,
    }
}

const OPACITY_MIN: i8 = 3;
const OPACITY_MAX: i8 = 10;
const OPACITY_STEP: i8 = 3;

/// Icon opacity oscillating between 0.3 and 1.0. Kept in tenths so repeated
/// steps never drift.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PulseAnimation {
    tenths: i8,
    step: i8,
}

impl Default for PulseAnimation {
    fn default() -> Self {
        Self {
            tenths: OPACITY_MAX,
            step: -OPACITY_STEP,
        }
    }
}

impl PulseAnimation {
    pub fn opacity(&self) -> f32 {
        f32::from(self.tenths) / 10.0
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Advance one pulse step. Returns `true` on the step that reaches full
    /// opacity and turns back to fading out, which is when the pulse beeps.
    pub fn step(&mut self) -> bool {
        self.tenths += self.step;
        if self.tenths <= OPACITY_MIN {
            self.tenths = OPACITY_MIN;
            self.step = OPACITY_STEP;
            false
        } else if self.tenths >= OPACITY_MAX {
            self.tenths = OPACITY_MAX;
            self.step = -OPACITY_STEP;
            true
        } else {
            false
        }
    }
}
