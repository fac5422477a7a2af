use std::time::Duration;

use super::{BatteryProvider, BatteryReading, ChargeState, ReadingParser, clock_token, command, parse_percentage};
use crate::error::MonitorError;

/// `pmset -g batt` output:
/// ```text
/// Now drawing from 'Battery Power'
///  -InternalBattery-0 (id=4653155)	85%; discharging; 3:45 remaining present: true
/// ```
pub struct PmsetParser;

impl ReadingParser for PmsetParser {
    fn name(&self) -> &'static str {
        "pmset"
    }

    fn sniff(&self, raw: &str) -> bool {
        raw.contains('%') && raw.contains(';')
    }

    fn parse(&self, raw: &str) -> Result<BatteryReading, MonitorError> {
        raw.lines()
            .filter(|l| l.contains("Battery") && l.contains('%'))
            .find_map(parse_line)
            .ok_or_else(|| MonitorError::Parse(format!("no battery line in pmset output: {raw}")))
    }
}

fn parse_line(line: &str) -> Option<BatteryReading> {
    // Fields after the tab: "85%; discharging; 3:45 remaining present: true"
    let body = line.split_once('\t').map_or(line, |(_, b)| b);
    let (head, rest) = body.split_once(';').unwrap_or((body, ""));

    let percentage = head
        .split_whitespace()
        .find(|t| t.ends_with('%'))
        .and_then(parse_percentage)?;
    let state = ChargeState::from_text(rest);
    let time = rest
        .split(';')
        .find(|f| f.contains("remaining"))
        .and_then(clock_token);

    Some(BatteryReading::new(state, percentage, time))
}

pub struct PmsetProvider {
    pub timeout: Duration,
}

impl BatteryProvider for PmsetProvider {
    fn name(&self) -> &str {
        "pmset"
    }

    fn query(&self) -> Result<String, MonitorError> {
        command::run("pmset", &["-g", "batt"], self.timeout)
    }
}
