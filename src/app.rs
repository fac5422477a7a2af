//! Runtime shared by the tray and headless front-ends.
//!
//! [`App`] owns the profile, the battery source, the monitor state and both
//! timers. Front-ends only decide when to call [`App::on_timers`] and what to
//! redraw afterwards.

use std::path::Path;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use crossbeam_channel::{Receiver, unbounded};
use tracing::{info, warn};

use crate::alert::{BeepPattern, PulseAnimation};
use crate::battery::{BatteryReading, BatterySource};
use crate::error::MonitorError;
use crate::monitor::{Effect, MonitorState};
use crate::notify::{self, ChannelToast, Dispatcher, Notification, NotificationSink};
use crate::platform::PlatformInfo;
use crate::profile::{self, UserProfile};
use crate::sound::Sound;
use crate::state::TrayState;
use crate::tier::Tier;
use crate::timer::{self, TimerSlot};

pub const POLL_INTERVAL: Duration = Duration::from_millis(2000);

/// Percentage change that is worth a status log line on its own.
const STATUS_LOG_STEP: u8 = 5;

/// What a front-end should redraw after [`App::on_timers`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Refresh {
    pub status: bool,
    pub icon: bool,
}

pub struct App {
    platform: PlatformInfo,
    profile: UserProfile,
    source: BatterySource,
    monitor: MonitorState,
    dispatcher: Dispatcher,
    sound: Sound,
    poll_timer: TimerSlot,
    pulse_timer: TimerSlot,
    pulse: PulseAnimation,
    view: TrayState,
    toasts: Receiver<Notification>,
    last_logged: Option<BatteryReading>,
}

impl App {
    /// Load the profile and wire up the OS-specific pieces for this host.
    pub fn new(platform: PlatformInfo) -> Self {
        let profile = profile::load(&platform.profile_path);
        let source = BatterySource::for_platform(&platform);
        let os_sinks = notify::os_sinks(&platform);
        Self::with_parts(platform, profile, source, os_sinks)
    }

    pub fn with_parts(
        platform: PlatformInfo,
        profile: UserProfile,
        source: BatterySource,
        os_sinks: Vec<Box<dyn NotificationSink>>,
    ) -> Self {
        let (tx, toasts) = unbounded();
        let dispatcher = Dispatcher::new(
            Box::new(ChannelToast::new(tx)),
            os_sinks,
            profile.notifications_enabled,
            profile.notification_timeout_ms,
        );

        info!(
            os = platform.os.label(),
            providers = ?source.provider_names(),
            profile = %platform.profile_path.display(),
            "battery monitor ready"
        );

        let mut poll_timer = TimerSlot::new("poll");
        poll_timer.start_immediately(POLL_INTERVAL, Instant::now());

        Self {
            sound: Sound::new(&platform),
            view: TrayState::new(profile.notifications_enabled),
            platform,
            profile,
            source,
            monitor: MonitorState::new(),
            dispatcher,
            poll_timer,
            pulse_timer: TimerSlot::new("pulse"),
            pulse: PulseAnimation::default(),
            toasts,
            last_logged: None,
        }
    }

    pub fn view(&self) -> &TrayState {
        &self.view
    }

    pub fn monitor(&self) -> &MonitorState {
        &self.monitor
    }

    pub fn profile(&self) -> &UserProfile {
        &self.profile
    }

    pub fn profile_path(&self) -> &Path {
        &self.platform.profile_path
    }

    /// Opacity the icon should be drawn with right now.
    pub fn icon_opacity(&self) -> f32 {
        if self.pulse_timer.is_active() {
            self.pulse.opacity()
        } else {
            1.0
        }
    }

    /// When the next timer is due; front-ends sleep until then.
    pub fn next_deadline(&self) -> Option<Instant> {
        timer::earliest([self.poll_timer.deadline(), self.pulse_timer.deadline()])
    }

    /// Fire whichever timers are due at `now`.
    pub fn on_timers(&mut self, now: Instant) -> Refresh {
        let mut refresh = Refresh::default();

        if self.poll_timer.fire_if_due(now) {
            self.poll(now, Utc::now());
            refresh.status = true;
            refresh.icon = true;
        }

        if self.pulse_timer.fire_if_due(now) {
            if self.pulse.step() && self.profile.play_sound {
                self.sound.play(BeepPattern::SINGLE);
            }
            refresh.icon = true;
        }

        refresh
    }

    /// One poll tick: read the battery, run the monitor and apply its effects.
    pub fn poll(&mut self, now: Instant, wall: DateTime<Utc>) {
        let reading = self.source.read();
        self.log_status(&reading);

        let outcome = self.monitor.tick(reading.clone(), wall, &self.profile);
        for effect in &outcome.effects {
            match effect {
                Effect::Notify(n) => self.dispatcher.dispatch(n),
                Effect::Beep(pattern) => {
                    self.sound.play(*pattern);
                }
            }
        }
        self.apply_pulse(outcome.pulse, now);

        for toast in self.toasts.try_iter() {
            self.view.record_alert(&toast, wall);
        }
        self.view.set_reading(reading, wall);
    }

    /// Start, replace or stop the pulse timer to match `cadence`.
    fn apply_pulse(&mut self, cadence: Option<Duration>, now: Instant) {
        match cadence {
            Some(period) if self.pulse_timer.period() == Some(period) => {}
            Some(period) => {
                self.pulse.reset();
                self.pulse_timer.start(period, now);
            }
            None if self.pulse_timer.is_active() => {
                self.pulse_timer.stop();
                self.pulse.reset();
            }
            None => {}
        }
    }

    fn log_status(&mut self, reading: &BatteryReading) {
        if !status_changed(self.last_logged.as_ref(), reading) {
            return;
        }
        info!(
            percentage = reading.percentage,
            state = %reading.state,
            time = reading.time_remaining.as_deref().unwrap_or("-"),
            tier = %Tier::from_percentage(reading.percentage),
            "battery status"
        );
        self.last_logged = Some(reading.clone());
    }

    pub fn set_notifications_enabled(&mut self, enabled: bool) {
        info!(enabled, "notifications toggled");
        self.profile.notifications_enabled = enabled;
        self.dispatcher.set_enabled(enabled);
        self.view.notifications_enabled = enabled;
        self.save_profile();
    }

    /// Re-read the profile from disk, keeping the monitor's history.
    pub fn reload_profile(&mut self) {
        self.profile = profile::load(&self.platform.profile_path);
        self.dispatcher.set_enabled(self.profile.notifications_enabled);
        self.dispatcher.set_timeout_ms(self.profile.notification_timeout_ms);
        self.view.notifications_enabled = self.profile.notifications_enabled;
    }

    /// Make sure the profile exists on disk so it can be opened for editing.
    pub fn ensure_profile_file(&self) -> Result<&Path, MonitorError> {
        let path = self.platform.profile_path.as_path();
        if !path.exists() {
            self.profile.save(path)?;
        }
        Ok(path)
    }

    pub fn save_profile(&self) {
        if let Err(e) = self.profile.save(&self.platform.profile_path) {
            warn!(path = %self.platform.profile_path.display(), error = %e, "failed to save profile");
        }
    }

    /// Stop the timers and persist the profile.
    pub fn shutdown(&mut self) {
        self.poll_timer.stop();
        self.pulse_timer.stop();
        self.save_profile();
        info!("battery monitor stopped");
    }
}

/// A status line is logged when the state changes or the level moves by
/// at least [`STATUS_LOG_STEP`] points.
fn status_changed(previous: Option<&BatteryReading>, next: &BatteryReading) -> bool {
    match previous {
        None => true,
        Some(prev) => {
            prev.state != next.state || prev.percentage.abs_diff(next.percentage) >= STATUS_LOG_STEP
        }
    }
}
