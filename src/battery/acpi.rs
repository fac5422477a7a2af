use std::time::Duration;

use super::{BatteryProvider, BatteryReading, ChargeState, ReadingParser, clock_token, command, parse_percentage};
use crate::error::MonitorError;

/// `acpi -b` output, one line per battery:
/// `Battery 0: Discharging, 85%, 02:15:30 remaining`
pub struct AcpiParser;

impl ReadingParser for AcpiParser {
    fn name(&self) -> &'static str {
        "acpi"
    }

    fn sniff(&self, raw: &str) -> bool {
        raw.contains("Battery") && raw.contains(',')
    }

    fn parse(&self, raw: &str) -> Result<BatteryReading, MonitorError> {
        raw.lines()
            .filter(|l| l.contains("Battery"))
            .find_map(parse_line)
            .ok_or_else(|| MonitorError::Parse(format!("no battery line in acpi output: {raw}")))
    }
}

fn parse_line(line: &str) -> Option<BatteryReading> {
    let (_, rest) = line.split_once(':')?;
    let mut fields = rest.split(',');
    let state = ChargeState::from_text(fields.next()?.trim());
    let percentage = parse_percentage(fields.next()?)?;

    let time = match state {
        ChargeState::Full | ChargeState::Unknown => None,
        _ => fields.next().and_then(clock_token),
    };

    Some(BatteryReading::new(state, percentage, time))
}

pub struct AcpiProvider {
    pub timeout: Duration,
}

impl BatteryProvider for AcpiProvider {
    fn name(&self) -> &str {
        "acpi"
    }

    fn query(&self) -> Result<String, MonitorError> {
        command::run("acpi", &["-b"], self.timeout)
    }
}
