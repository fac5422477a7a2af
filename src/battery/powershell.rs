use std::time::Duration;

use super::{BatteryProvider, BatteryReading, ChargeState, ReadingParser, clock_token, command, parse_percentage};
use crate::error::MonitorError;

/// Maps `Win32_Battery.BatteryStatus` to a state name and prints
/// `percentage,state,HH:MM`. 71582788 is WMI's "unknown run time" marker.
const QUERY: &str = r#"
Get-CimInstance -ClassName Win32_Battery | Select-Object -First 1 | ForEach-Object {
    $status = switch ($_.BatteryStatus) {
        1 { "Discharging" }
        2 { "Full" }
        3 { "Full" }
        4 { "Discharging" }
        5 { "Discharging" }
        6 { "Charging" }
        7 { "Charging" }
        8 { "Charging" }
        9 { "Charging" }
        default { "Unknown" }
    }
    $time = ""
    if ($_.EstimatedRunTime -and $_.EstimatedRunTime -ne 71582788 -and $status -eq "Discharging") {
        $time = "{0:D2}:{1:D2}" -f [math]::Floor($_.EstimatedRunTime / 60), ($_.EstimatedRunTime % 60)
    }
    Write-Output "$($_.EstimatedChargeRemaining),$status,$time"
}
"#;

/// PowerShell CSV line: `85,Discharging,02:15`.
pub struct CsvParser;

impl ReadingParser for CsvParser {
    fn name(&self) -> &'static str {
        "powershell"
    }

    fn sniff(&self, raw: &str) -> bool {
        raw.starts_with(|c: char| c.is_ascii_digit()) && raw.contains(',')
    }

    fn parse(&self, raw: &str) -> Result<BatteryReading, MonitorError> {
        let line = raw.lines().next().unwrap_or_default();
        let mut fields = line.split(',');

        let percentage = fields
            .next()
            .and_then(parse_percentage)
            .ok_or_else(|| MonitorError::Parse(format!("bad percentage in: {line}")))?;
        let state = fields
            .next()
            .map_or(ChargeState::Unknown, ChargeState::from_text);
        let time = fields.next().and_then(clock_token);

        Ok(BatteryReading::new(state, percentage, time))
    }
}

pub struct PowerShellProvider {
    pub timeout: Duration,
}

impl BatteryProvider for PowerShellProvider {
    fn name(&self) -> &str {
        "powershell"
    }

    fn query(&self) -> Result<String, MonitorError> {
        command::run(
            "powershell",
            &["-NoProfile", "-NonInteractive", "-Command", QUERY],
            self.timeout,
        )
    }
}
