use std::fs;
use std::path::PathBuf;

use super::{BatteryProvider, BatteryReading, ChargeState, ReadingParser, parse_percentage};
use crate::error::MonitorError;

const POWER_SUPPLY_ROOT: &str = "/sys/class/power_supply";

/// Kernel `uevent` key/value dump of a battery:
/// ```text
/// POWER_SUPPLY_STATUS=Discharging
/// POWER_SUPPLY_CAPACITY=85
/// POWER_SUPPLY_ENERGY_NOW=41000000
/// POWER_SUPPLY_POWER_NOW=9500000
/// ```
pub struct UeventParser;

impl ReadingParser for UeventParser {
    fn name(&self) -> &'static str {
        "sysfs"
    }

    fn sniff(&self, raw: &str) -> bool {
        raw.contains("POWER_SUPPLY_")
    }

    fn parse(&self, raw: &str) -> Result<BatteryReading, MonitorError> {
        let number = |key: &str| field(raw, key).and_then(|v| v.parse::<f64>().ok());

        let percentage = field(raw, "POWER_SUPPLY_CAPACITY")
            .and_then(parse_percentage)
            .ok_or_else(|| MonitorError::Parse("uevent without POWER_SUPPLY_CAPACITY".into()))?;
        let state = field(raw, "POWER_SUPPLY_STATUS").map_or(ChargeState::Unknown, ChargeState::from_text);

        // Energy counters are in µWh/µW; charge counters in µAh/µA.
        let (now, full, rate) = match (number("POWER_SUPPLY_ENERGY_NOW"), number("POWER_SUPPLY_POWER_NOW")) {
            (Some(now), Some(rate)) => (now, number("POWER_SUPPLY_ENERGY_FULL"), rate),
            _ => (
                number("POWER_SUPPLY_CHARGE_NOW").unwrap_or(0.0),
                number("POWER_SUPPLY_CHARGE_FULL"),
                number("POWER_SUPPLY_CURRENT_NOW").unwrap_or(0.0),
            ),
        };
        let hours = match state {
            ChargeState::Discharging => Some(now / rate),
            ChargeState::Charging => full.map(|full| (full - now) / rate),
            _ => None,
        };
        let time = hours
            .filter(|h| h.is_finite() && *h > 0.0)
            .map(format_hours);

        Ok(BatteryReading::new(state, percentage, time))
    }
}

fn field<'a>(raw: &'a str, key: &str) -> Option<&'a str> {
    raw.lines()
        .filter_map(|l| l.trim().split_once('='))
        .find(|(k, _)| *k == key)
        .map(|(_, v)| v.trim())
}

fn format_hours(hours: f64) -> String {
    let minutes = (hours * 60.0).round() as u64;
    format!("{}:{:02}", minutes / 60, minutes % 60)
}

/// Reads the first `BAT*` entry under the power-supply class directory.
pub struct SysfsProvider {
    pub root: PathBuf,
}

impl Default for SysfsProvider {
    fn default() -> Self {
        Self {
            root: PathBuf::from(POWER_SUPPLY_ROOT),
        }
    }
}

impl BatteryProvider for SysfsProvider {
    fn name(&self) -> &str {
        "sysfs"
    }

    fn query(&self) -> Result<String, MonitorError> {
        let mut batteries: Vec<PathBuf> = fs::read_dir(&self.root)?
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().starts_with("BAT"))
            .map(|e| e.path())
            .collect();
        batteries.sort();

        let battery = batteries
            .first()
            .ok_or_else(|| MonitorError::Command(format!("no battery under {}", self.root.display())))?;
        Ok(fs::read_to_string(battery.join("uevent"))?)
    }
}
