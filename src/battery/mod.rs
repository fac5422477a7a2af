//! Battery readings and the normalizer that turns raw platform output into
//! them.
//!
//! Each supported output format lives behind [`ReadingParser`]. The
//! normalizer picks a parser by sniffing the text, so the monitor never sees
//! raw command output, only [`BatteryReading`] values.

mod acpi;
mod command;
mod pmset;
mod powershell;
mod source;
mod sysfs;

pub use source::{BatteryProvider, BatterySource};

use std::fmt;

use tracing::debug;

use crate::error::MonitorError;

/// Charge state as reported by the OS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChargeState {
    Charging,
    Discharging,
    Full,
    Unknown,
}

impl ChargeState {
    /// Case-insensitive state matching. "discharging" contains "charging",
    /// so it must be checked first.
    pub fn from_text(text: &str) -> Self {
        let lower = text.to_ascii_lowercase();
        if lower.contains("discharging") {
            ChargeState::Discharging
        } else if lower.contains("not charging") {
            // Plugged in and holding charge.
            ChargeState::Full
        } else if lower.contains("charging") {
            ChargeState::Charging
        } else if lower.contains("charged") || lower.contains("full") {
            ChargeState::Full
        } else {
            ChargeState::Unknown
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ChargeState::Charging => "Charging",
            ChargeState::Discharging => "Discharging",
            ChargeState::Full => "Full",
            ChargeState::Unknown => "Unknown",
        }
    }

    /// Charging or full counts as being on external power.
    pub fn is_charging(self) -> bool {
        matches!(self, ChargeState::Charging | ChargeState::Full)
    }
}

impl fmt::Display for ChargeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One canonical battery sample, produced once per poll tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatteryReading {
    pub state: ChargeState,
    /// Always within 0..=100.
    pub percentage: u8,
    /// Remaining time as `H:MM` / `HH:MM`, when the OS provides one.
    pub time_remaining: Option<String>,
}

impl BatteryReading {
    pub fn new(state: ChargeState, percentage: i64, time_remaining: Option<String>) -> Self {
        Self {
            state,
            percentage: percentage.clamp(0, 100) as u8,
            time_remaining,
        }
    }

    /// Fallback reading for query and parse failures.
    pub fn unavailable() -> Self {
        Self {
            state: ChargeState::Unknown,
            percentage: 0,
            time_remaining: None,
        }
    }

    pub fn is_charging(&self) -> bool {
        self.state.is_charging()
    }

    /// False only for the fallback shape, i.e. when no telemetry came back.
    pub fn has_telemetry(&self) -> bool {
        *self != Self::unavailable()
    }
}

/// A parse strategy for one family of battery command output.
pub trait ReadingParser {
    fn name(&self) -> &'static str;

    /// Cheap structural check used to pick a strategy.
    fn sniff(&self, raw: &str) -> bool;

    fn parse(&self, raw: &str) -> Result<BatteryReading, MonitorError>;
}

/// Most specific formats first: sysfs keys and pmset's `;` fields would
/// otherwise be mistaken for the looser comma formats.
const PARSERS: &[&dyn ReadingParser] = &[
    &sysfs::UeventParser,
    &pmset::PmsetParser,
    &powershell::CsvParser,
    &acpi::AcpiParser,
];

/// Parse raw output with the first parser whose sniff matches.
pub fn parse(raw: &str) -> Result<BatteryReading, MonitorError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(MonitorError::Parse("empty output".into()));
    }
    let parser = PARSERS
        .iter()
        .find(|p| p.sniff(raw))
        .ok_or_else(|| MonitorError::Parse(truncate(raw)))?;
    debug!(parser = parser.name(), "parsing battery output");
    parser.parse(raw)
}

/// Fail-soft normalization: anything unparseable becomes
/// [`BatteryReading::unavailable`].
pub fn normalize(raw: &str) -> BatteryReading {
    match parse(raw) {
        Ok(reading) => reading,
        Err(e) => {
            debug!(error = %e, "battery output not recognized");
            BatteryReading::unavailable()
        }
    }
}

/// Parse a percentage such as `"85%"`, `" 85 "` or `"120"` (clamped).
pub(crate) fn parse_percentage(text: &str) -> Option<i64> {
    text.trim()
        .trim_end_matches('%')
        .trim()
        .parse::<i64>()
        .ok()
}

/// Find a clock-shaped token (`2:05`, `02:15:30`) and return it as `H:MM`.
/// A zero duration counts as no estimate.
pub(crate) fn clock_token(text: &str) -> Option<String> {
    text.split(|c: char| c.is_whitespace() || c == ';' || c == ',')
        .find_map(|token| {
            let parts: Vec<&str> = token.split(':').collect();
            if !(2..=3).contains(&parts.len()) {
                return None;
            }
            if !parts
                .iter()
                .all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()))
            {
                return None;
            }
            if parts[1].len() != 2 {
                return None;
            }
            if parts.iter().all(|p| p.chars().all(|c| c == '0')) {
                return None;
            }
            Some(format!("{}:{}", parts[0], parts[1]))
        })
}

fn truncate(raw: &str) -> String {
    raw.chars().take(80).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discharging_is_not_charging() {
        assert_eq!(ChargeState::from_text("Discharging"), ChargeState::Discharging);
        assert_eq!(ChargeState::from_text("DISCHARGING"), ChargeState::Discharging);
        assert_eq!(ChargeState::from_text("charging"), ChargeState::Charging);
        assert_eq!(ChargeState::from_text("Not charging"), ChargeState::Full);
        assert_eq!(ChargeState::from_text("charged"), ChargeState::Full);
        assert_eq!(ChargeState::from_text("Full"), ChargeState::Full);
        assert_eq!(ChargeState::from_text("weird"), ChargeState::Unknown);
    }

    #[test]
    fn test_is_charging_covers_full() {
        assert!(ChargeState::Charging.is_charging());
        assert!(ChargeState::Full.is_charging());
        assert!(!ChargeState::Discharging.is_charging());
        assert!(!ChargeState::Unknown.is_charging());
    }

    #[test]
    fn test_percentage_is_clamped() {
        assert_eq!(BatteryReading::new(ChargeState::Full, 140, None).percentage, 100);
        assert_eq!(BatteryReading::new(ChargeState::Unknown, -3, None).percentage, 0);
    }

    #[test]
    fn test_malformed_input_normalizes_to_unknown() {
        assert_eq!(normalize(""), BatteryReading::unavailable());
        assert_eq!(normalize("   \n"), BatteryReading::unavailable());
        assert_eq!(normalize("Discharging, 85%, 01:00"), BatteryReading::unavailable());
        assert_eq!(normalize("No support for device type: power_supply"), BatteryReading::unavailable());
    }

    #[test]
    fn test_normalize_picks_format_by_sniffing() {
        let acpi = normalize("Battery 0: Discharging, 85%, 02:15:30 remaining");
        assert_eq!(acpi.state, ChargeState::Discharging);
        assert_eq!(acpi.percentage, 85);

        let pmset = normalize(
            "Now drawing from 'Battery Power'\n -InternalBattery-0 (id=4653155)\t62%; discharging; 3:45 remaining present: true",
        );
        assert_eq!(pmset.percentage, 62);
        assert_eq!(pmset.time_remaining.as_deref(), Some("3:45"));

        let csv = normalize("40,Charging,");
        assert_eq!(csv.state, ChargeState::Charging);
        assert_eq!(csv.percentage, 40);
    }

    #[test]
    fn test_has_telemetry() {
        assert!(!BatteryReading::unavailable().has_telemetry());
        assert!(BatteryReading::new(ChargeState::Unknown, 97, None).has_telemetry());
        assert!(BatteryReading::new(ChargeState::Discharging, 0, None).has_telemetry());
    }

    #[test]
    fn test_clock_token() {
        assert_eq!(clock_token("02:15:30 remaining").as_deref(), Some("02:15"));
        assert_eq!(clock_token("3:45 remaining").as_deref(), Some("3:45"));
        assert_eq!(clock_token("0:00 remaining"), None);
        assert_eq!(clock_token("(no estimate)"), None);
        assert_eq!(clock_token("rate information unavailable"), None);
    }
}
