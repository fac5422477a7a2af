//! Best-effort notification delivery.
//!
//! The in-process toast (log line plus the "Last alert" line) always gets
//! the notification.
//! OS sinks are then tried in order until one succeeds; a failure is logged
//! and the next sink is tried. Nothing here ever returns an error to the
//! caller.

use std::process::Command;

use crossbeam_channel::Sender;
use tracing::{debug, info, warn};

use crate::alert::Severity;
use crate::error::MonitorError;
use crate::platform::{Os, PlatformInfo};

const APP_NAME: &str = "BattMon";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub message: String,
    pub severity: Severity,
}

impl Notification {
    pub fn new(title: impl Into<String>, message: impl Into<String>, severity: Severity) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            severity,
        }
    }
}

/// One way of showing a notification to the user.
pub trait NotificationSink {
    fn name(&self) -> &str;

    fn send(&self, notification: &Notification, timeout_ms: u32) -> Result<(), MonitorError>;
}

/// The in-process toast: every notification is logged, then queued for the
/// front-end's "Last alert" line.
pub struct ChannelToast {
    tx: Sender<Notification>,
}

impl ChannelToast {
    pub fn new(tx: Sender<Notification>) -> Self {
        Self { tx }
    }
}

impl NotificationSink for ChannelToast {
    fn name(&self) -> &str {
        "toast"
    }

    fn send(&self, n: &Notification, _timeout_ms: u32) -> Result<(), MonitorError> {
        match n.severity {
            Severity::Critical | Severity::Warning => {
                warn!(severity = n.severity.label(), title = %n.title, "{}", n.message)
            }
            Severity::Info => info!(severity = n.severity.label(), title = %n.title, "{}", n.message),
        }
        self.tx
            .send(n.clone())
            .map_err(|_| MonitorError::Notify("toast channel closed".into()))
    }
}

/// `display notification` through osascript, which needs no entitlements.
pub struct OsaScriptSink;

impl NotificationSink for OsaScriptSink {
    fn name(&self) -> &str {
        "osascript"
    }

    fn send(&self, n: &Notification, _timeout_ms: u32) -> Result<(), MonitorError> {
        // Strip quotes so the AppleScript string literals stay intact.
        let clean = |s: &str| s.replace('"', "'").replace('\\', "");
        let script = format!(
            "display notification \"{}\" with title \"{}\" subtitle \"{}\"",
            clean(&n.message),
            clean(APP_NAME),
            clean(&n.title),
        );

        let output = Command::new("osascript").args(["-e", &script]).output()?;
        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(MonitorError::Notify(format!("osascript failed: {stderr}")))
        }
    }
}

/// Freedesktop notifications on Linux, toasts on Windows.
#[cfg(not(target_os = "macos"))]
pub struct NotifyRustSink;

#[cfg(not(target_os = "macos"))]
impl NotificationSink for NotifyRustSink {
    fn name(&self) -> &str {
        "notify-rust"
    }

    fn send(&self, n: &Notification, timeout_ms: u32) -> Result<(), MonitorError> {
        let mut notification = notify_rust::Notification::new();
        notification
            .appname(APP_NAME)
            .summary(&n.title)
            .body(&n.message)
            .timeout(notify_rust::Timeout::Milliseconds(timeout_ms));

        #[cfg(all(unix, not(target_os = "macos")))]
        notification.urgency(match n.severity {
            Severity::Info => notify_rust::Urgency::Low,
            Severity::Warning => notify_rust::Urgency::Normal,
            Severity::Critical => notify_rust::Urgency::Critical,
        });

        notification
            .show()
            .map(|_| ())
            .map_err(|e| MonitorError::Notify(e.to_string()))
    }
}

/// `notify-send` fallback for desktops without a D-Bus session we can reach.
#[cfg(not(target_os = "macos"))]
pub struct NotifySendSink;

#[cfg(not(target_os = "macos"))]
impl NotificationSink for NotifySendSink {
    fn name(&self) -> &str {
        "notify-send"
    }

    fn send(&self, n: &Notification, timeout_ms: u32) -> Result<(), MonitorError> {
        let urgency = match n.severity {
            Severity::Critical => "critical",
            Severity::Warning => "normal",
            Severity::Info => "low",
        };
        let timeout = timeout_ms.to_string();
        let status = Command::new("notify-send")
            .args([
                "--app-name",
                APP_NAME,
                "--urgency",
                urgency,
                "--expire-time",
                &timeout,
                &n.title,
                &n.message,
            ])
            .status()?;
        if status.success() {
            Ok(())
        } else {
            Err(MonitorError::Notify(format!("notify-send exited with {status}")))
        }
    }
}

/// OS sinks for this platform, most capable first.
pub fn os_sinks(platform: &PlatformInfo) -> Vec<Box<dyn NotificationSink>> {
    match platform.os {
        Os::MacOs => vec![Box::new(OsaScriptSink)],
        #[cfg(not(target_os = "macos"))]
        Os::Linux => vec![Box::new(NotifyRustSink), Box::new(NotifySendSink)],
        #[cfg(not(target_os = "macos"))]
        Os::Windows => vec![Box::new(NotifyRustSink)],
        _ => Vec::new(),
    }
}

pub struct Dispatcher {
    toast: Box<dyn NotificationSink>,
    os_sinks: Vec<Box<dyn NotificationSink>>,
    enabled: bool,
    timeout_ms: u32,
}

impl Dispatcher {
    pub fn new(
        toast: Box<dyn NotificationSink>,
        os_sinks: Vec<Box<dyn NotificationSink>>,
        enabled: bool,
        timeout_ms: u32,
    ) -> Self {
        Self {
            toast,
            os_sinks,
            enabled,
            timeout_ms,
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn set_timeout_ms(&mut self, timeout_ms: u32) {
        self.timeout_ms = timeout_ms;
    }

    /// Deliver `notification` as well as possible. Never fails.
    pub fn dispatch(&self, notification: &Notification) {
        if !self.enabled {
            debug!(title = %notification.title, "notifications disabled, dropped");
            return;
        }

        if let Err(e) = self.toast.send(notification, self.timeout_ms) {
            warn!(sink = self.toast.name(), error = %e, "toast failed");
        }

        for sink in &self.os_sinks {
            match sink.send(notification, self.timeout_ms) {
                Ok(()) => {
                    debug!(sink = sink.name(), title = %notification.title, "notification sent");
                    return;
                }
                Err(e) => warn!(sink = sink.name(), error = %e, "notification sink failed"),
            }
        }
    }
}
