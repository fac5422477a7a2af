use std::path::PathBuf;

/// Operating systems with a known battery query and notification path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Os {
    Linux,
    MacOs,
    Windows,
    Other,
}

impl Os {
    pub fn current() -> Self {
        match std::env::consts::OS {
            "linux" => Os::Linux,
            "macos" => Os::MacOs,
            "windows" => Os::Windows,
            _ => Os::Other,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Os::Linux => "Linux",
            Os::MacOs => "macOS",
            Os::Windows => "Windows",
            Os::Other => std::env::consts::OS,
        }
    }
}

/// Facts about the host, detected once at startup and passed to the
/// components that need them.
#[derive(Debug, Clone)]
pub struct PlatformInfo {
    pub os: Os,
    pub profile_path: PathBuf,
}

impl PlatformInfo {
    /// Profile path search order:
    ///   1. BATTMON_PROFILE env var
    ///   2. %APPDATA%\BattMon\profile.json on Windows,
    ///      <config dir>/battmon/profile.json elsewhere
    ///   3. ./battmon-profile.json
    pub fn detect() -> Self {
        let os = Os::current();
        let profile_path = std::env::var("BATTMON_PROFILE")
            .ok()
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from)
            .or_else(|| default_profile_path(os))
            .unwrap_or_else(|| PathBuf::from("battmon-profile.json"));

        Self { os, profile_path }
    }

    #[cfg(test)]
    pub fn for_tests(os: Os, profile_path: PathBuf) -> Self {
        Self { os, profile_path }
    }
}

fn default_profile_path(os: Os) -> Option<PathBuf> {
    let dir_name = if os == Os::Windows { "BattMon" } else { "battmon" };
    dirs::config_dir().map(|d| d.join(dir_name).join("profile.json"))
}
