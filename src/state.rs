use chrono::{DateTime, Local, Utc};

use crate::battery::{BatteryReading, ChargeState};
use crate::notify::Notification;

/// The most recent notification shown to the user.
pub struct AlertRecord {
    pub title: String,
    pub at: DateTime<Utc>,
}

/// What the tray menu and tooltip display.
pub struct TrayState {
    pub reading: BatteryReading,
    pub updated_at: Option<DateTime<Utc>>,
    pub last_alert: Option<AlertRecord>,
    pub notifications_enabled: bool,
}

impl TrayState {
    pub fn new(notifications_enabled: bool) -> Self {
        Self {
            reading: BatteryReading::unavailable(),
            updated_at: None,
            last_alert: None,
            notifications_enabled,
        }
    }

    pub fn set_reading(&mut self, reading: BatteryReading, at: DateTime<Utc>) {
        self.reading = reading;
        self.updated_at = Some(at);
    }

    pub fn record_alert(&mut self, notification: &Notification, at: DateTime<Utc>) {
        self.last_alert = Some(AlertRecord {
            title: notification.title.clone(),
            at,
        });
    }

    pub fn status_text(&self) -> String {
        if !self.reading.has_telemetry() {
            return "Battery: unavailable".into();
        }
        format!("Battery: {}% ({})", self.reading.percentage, self.reading.state)
    }

    pub fn time_text(&self) -> String {
        match (&self.reading.time_remaining, self.reading.state) {
            (Some(t), ChargeState::Charging) => format!("Until full: {}", t),
            (Some(t), _) => format!("Remaining: {}", t),
            (None, ChargeState::Full) => "Fully charged".into(),
            (None, _) => "Remaining: unknown".into(),
        }
    }

    pub fn last_alert_text(&self, now: DateTime<Utc>) -> String {
        match &self.last_alert {
            Some(alert) => format!(
                "Last alert: {} ({})",
                alert.title,
                format_relative((now - alert.at).num_seconds())
            ),
            None => "Last alert: (none)".into(),
        }
    }

    pub fn tooltip(&self) -> String {
        let mut tip = format!("BattMon\n{}\n{}", self.status_text(), self.time_text());
        if let Some(at) = self.updated_at {
            tip.push_str(&format!("\nUpdated {}", at.with_timezone(&Local).format("%H:%M:%S")));
        }
        tip
    }
}

/// Format an elapsed number of seconds as a human-readable relative time.
pub fn format_relative(secs: i64) -> String {
    if secs < 5 {
        return "just now".into();
    }
    if secs < 60 {
        return format!("{}s ago", secs);
    }
    if secs < 3600 {
        return format!("{}m ago", secs / 60);
    }
    format!("{}h ago", secs / 3600)
}
