use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fs;
use std::io::Write;
use std::path::Path;
use tracing::{info, warn};

use crate::error::MonitorError;

pub const PROFILE_VERSION: &str = env!("CARGO_PKG_VERSION");

const TIMEOUT_RANGE_MS: (u32, u32) = (1_000, 30_000);
const SLEEP_RANGE_SECS: (u64, u64) = (60, 3_600);

/// User preferences persisted as a single JSON object.
/// Missing keys take their defaults; unknown keys are ignored. Numbers of
/// the wrong size or sign load and are repaired by [`UserProfile::normalized`]
/// instead of rejecting the whole file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct UserProfile {
    #[serde(
        default = "default_discharge",
        alias = "milestone_thresholds",
        deserialize_with = "lenient_thresholds"
    )]
    pub discharge_thresholds: Vec<u8>,
    #[serde(
        default = "default_charging",
        alias = "charging_milestones",
        deserialize_with = "lenient_thresholds"
    )]
    pub charging_thresholds: Vec<u8>,
    #[serde(default = "default_true")]
    pub notifications_enabled: bool,
    #[serde(default = "default_true")]
    pub play_sound: bool,
    #[serde(
        default = "default_timeout",
        alias = "notification_timeout",
        deserialize_with = "lenient_timeout"
    )]
    pub notification_timeout_ms: u32,
    #[serde(
        default = "default_sleep_threshold",
        alias = "sleep_threshold",
        deserialize_with = "lenient_sleep_threshold"
    )]
    pub sleep_threshold_seconds: u64,
    #[serde(default = "default_true")]
    pub sleep_notifications_enabled: bool,
    #[serde(default = "default_version")]
    pub version: String,
}

fn default_discharge() -> Vec<u8> {
    vec![90, 80, 70, 60, 50, 40, 30, 20, 10]
}

fn default_charging() -> Vec<u8> {
    vec![25, 50, 75, 90, 100]
}

fn default_true() -> bool {
    true
}

fn default_timeout() -> u32 {
    5_000
}

fn default_sleep_threshold() -> u64 {
    300
}

fn default_version() -> String {
    PROFILE_VERSION.into()
}

/// Floats round, integers beyond `i64` saturate, anything else is `None`.
fn whole_number(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_u64().map(|_| i64::MAX))
            .or_else(|| n.as_f64().map(|f| f.round() as i64)),
        _ => None,
    }
}

fn lenient_thresholds<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
    let values = Vec::<Value>::deserialize(deserializer)?;
    let mut kept = Vec::with_capacity(values.len());
    for value in &values {
        match whole_number(value).and_then(|n| u8::try_from(n).ok()).filter(|n| *n <= 100) {
            Some(n) => kept.push(n),
            None => warn!(value = %value, "dropping threshold outside 0-100"),
        }
    }
    Ok(kept)
}

fn lenient_timeout<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(match whole_number(&value) {
        Some(n) => u32::try_from(n.max(0)).unwrap_or(u32::MAX),
        None => {
            warn!(value = %value, "notification timeout is not a number, using default");
            default_timeout()
        }
    })
}

fn lenient_sleep_threshold<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(match whole_number(&value) {
        Some(n) => u64::try_from(n).unwrap_or(0),
        None => {
            warn!(value = %value, "sleep threshold is not a number, using default");
            default_sleep_threshold()
        }
    })
}

impl Default for UserProfile {
    fn default() -> Self {
        Self {
            discharge_thresholds: default_discharge(),
            charging_thresholds: default_charging(),
            notifications_enabled: true,
            play_sound: true,
            notification_timeout_ms: default_timeout(),
            sleep_threshold_seconds: default_sleep_threshold(),
            sleep_notifications_enabled: true,
            version: default_version(),
        }
    }
}

/// Keep values in 0..=100, drop duplicates, sort ascending.
fn clean_thresholds(values: &[u8]) -> Vec<u8> {
    let mut cleaned: Vec<u8> = values.iter().copied().filter(|v| *v <= 100).collect();
    cleaned.sort_unstable();
    cleaned.dedup();
    cleaned
}

impl UserProfile {
    /// Problems that [`UserProfile::normalized`] would have to repair.
    pub fn validate(&self) -> Result<(), MonitorError> {
        let mut errors = Vec::new();
        if clean_thresholds(&self.discharge_thresholds).is_empty() {
            errors.push("discharge thresholds need at least one value in 0-100".to_string());
        }
        if clean_thresholds(&self.charging_thresholds).is_empty() {
            errors.push("charging thresholds need at least one value in 0-100".to_string());
        }
        let (lo, hi) = TIMEOUT_RANGE_MS;
        if !(lo..=hi).contains(&self.notification_timeout_ms) {
            errors.push(format!("notification timeout must be {lo}-{hi} ms"));
        }
        let (lo, hi) = SLEEP_RANGE_SECS;
        if !(lo..=hi).contains(&self.sleep_threshold_seconds) {
            errors.push(format!("sleep threshold must be {lo}-{hi} seconds"));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(MonitorError::Validation(errors))
        }
    }

    /// Canonical form: discharge thresholds descending, charging ascending,
    /// ranges clamped, empty lists replaced by defaults.
    pub fn normalized(mut self) -> Self {
        let mut discharge = clean_thresholds(&self.discharge_thresholds);
        if discharge.is_empty() {
            discharge = default_discharge();
        }
        discharge.sort_unstable_by(|a, b| b.cmp(a));
        self.discharge_thresholds = discharge;

        let charging = clean_thresholds(&self.charging_thresholds);
        self.charging_thresholds = if charging.is_empty() {
            default_charging()
        } else {
            charging
        };

        self.notification_timeout_ms = self
            .notification_timeout_ms
            .clamp(TIMEOUT_RANGE_MS.0, TIMEOUT_RANGE_MS.1);
        self.sleep_threshold_seconds = self
            .sleep_threshold_seconds
            .clamp(SLEEP_RANGE_SECS.0, SLEEP_RANGE_SECS.1);
        self
    }

    pub fn from_json(content: &str) -> Result<Self, MonitorError> {
        let profile: UserProfile = serde_json::from_str(content)?;
        if let Err(e) = profile.validate() {
            warn!(error = %e, "profile values repaired");
        }
        Ok(profile.normalized())
    }

    /// Write the whole profile with 2-space indentation, replacing the old
    /// file in one rename.
    pub fn save(&self, path: &Path) -> Result<(), MonitorError> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }

        let mut profile = self.clone();
        profile.version = default_version();
        let json = serde_json::to_string_pretty(&profile)?;

        let tmp = path.with_extension("json.tmp");
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(json.as_bytes())?;
            file.write_all(b"\n")?;
            file.sync_all()?;
        }
        fs::rename(&tmp, path)?;

        info!(path = %path.display(), "profile saved");
        Ok(())
    }
}

/// Load the profile at `path`. A missing, unreadable or corrupt file yields
/// the defaults; the file on disk is left alone until the next save.
pub fn load(path: &Path) -> UserProfile {
    if !path.exists() {
        info!(path = %path.display(), "no profile found, using defaults");
        return UserProfile::default();
    }

    match fs::read_to_string(path) {
        Ok(content) => match UserProfile::from_json(&content) {
            Ok(profile) => {
                info!(
                    path = %path.display(),
                    discharge = ?profile.discharge_thresholds,
                    charging = ?profile.charging_thresholds,
                    "loaded profile"
                );
                profile
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to parse profile, using defaults");
                UserProfile::default()
            }
        },
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read profile, using defaults");
            UserProfile::default()
        }
    }
}
