use std::cell::Cell;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::acpi::AcpiProvider;
use super::pmset::PmsetProvider;
use super::powershell::PowerShellProvider;
use super::sysfs::SysfsProvider;
use super::{BatteryReading, parse};
use crate::error::MonitorError;
use crate::platform::{Os, PlatformInfo};

const QUERY_TIMEOUT: Duration = Duration::from_secs(3);

/// A raw battery query mechanism (command or file).
pub trait BatteryProvider {
    fn name(&self) -> &str;

    fn query(&self) -> Result<String, MonitorError>;
}

/// Ordered list of providers for this host. The first provider whose output
/// parses wins.
pub struct BatterySource {
    providers: Vec<Box<dyn BatteryProvider>>,
    failing: Cell<bool>,
}

impl BatterySource {
    pub fn for_platform(platform: &PlatformInfo) -> Self {
        let providers: Vec<Box<dyn BatteryProvider>> = match platform.os {
            Os::Linux => vec![
                Box::new(AcpiProvider { timeout: QUERY_TIMEOUT }),
                Box::new(SysfsProvider::default()),
            ],
            Os::MacOs => vec![Box::new(PmsetProvider { timeout: QUERY_TIMEOUT })],
            Os::Windows => vec![Box::new(PowerShellProvider { timeout: QUERY_TIMEOUT })],
            Os::Other => Vec::new(),
        };
        Self::with_providers(providers)
    }

    pub fn with_providers(providers: Vec<Box<dyn BatteryProvider>>) -> Self {
        Self {
            providers,
            failing: Cell::new(false),
        }
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Query providers in order. Never fails: total loss of telemetry yields
    /// [`BatteryReading::unavailable`].
    pub fn read(&self) -> BatteryReading {
        let mut last_error = None;

        for provider in &self.providers {
            let result = provider.query().and_then(|raw| parse(&raw));
            match result {
                Ok(reading) => {
                    if self.failing.replace(false) {
                        info!(provider = provider.name(), "battery telemetry recovered");
                    }
                    return reading;
                }
                Err(e) => {
                    debug!(provider = provider.name(), error = %e, "battery provider failed");
                    last_error = Some(e);
                }
            }
        }

        // Warn once per outage, not every tick.
        if !self.failing.replace(true) {
            match last_error {
                Some(e) => warn!(error = %e, "no battery telemetry, reporting Unknown"),
                None => warn!("no battery provider for this platform, reporting Unknown"),
            }
        }
        BatteryReading::unavailable()
    }
}
