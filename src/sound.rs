use std::io::Write;
use std::process::{Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::debug;

use crate::alert::BeepPattern;
use crate::platform::{Os, PlatformInfo};

const BEEP_GAP: Duration = Duration::from_millis(150);

type BeepCommand = (&'static str, &'static [&'static str]);

const LINUX_BEEPS: &[BeepCommand] = &[
    ("play", &["-q", "-n", "synth", "0.2", "sine", "1000"]),
    ("paplay", &["/usr/share/sounds/freedesktop/stereo/bell.oga"]),
];
const MACOS_BEEPS: &[BeepCommand] = &[("afplay", &["/System/Library/Sounds/Tink.aiff"])];
const WINDOWS_BEEPS: &[BeepCommand] = &[(
    "powershell",
    &["-NoProfile", "-NonInteractive", "-Command", "[console]::beep(1000,200)"],
)];

/// Plays beep patterns through whatever the host has available. Playback
/// happens on a short-lived thread so a triple beep never stalls a tick.
#[derive(Debug, Clone)]
pub struct Sound {
    os: Os,
}

impl Sound {
    pub fn new(platform: &PlatformInfo) -> Self {
        Self { os: platform.os }
    }

    /// Start playing `pattern`. Returns the playback thread, or `None` when
    /// there is nothing to play or the thread could not be spawned.
    pub fn play(&self, pattern: BeepPattern) -> Option<JoinHandle<()>> {
        if pattern.count == 0 {
            return None;
        }
        let os = self.os;
        let spawned = thread::Builder::new()
            .name("battmon-beep".into())
            .spawn(move || {
                for i in 0..pattern.count {
                    if i > 0 {
                        thread::sleep(BEEP_GAP);
                    }
                    beep(os);
                }
            });
        match spawned {
            Ok(handle) => Some(handle),
            Err(e) => {
                debug!(error = %e, "could not spawn beep thread");
                None
            }
        }
    }
}

/// Tone commands to try on `os`, in order.
fn beep_commands(os: Os) -> &'static [BeepCommand] {
    match os {
        Os::Linux => LINUX_BEEPS,
        Os::MacOs => MACOS_BEEPS,
        Os::Windows => WINDOWS_BEEPS,
        Os::Other => &[],
    }
}

/// One 0.2s tone at 1 kHz, falling back to the terminal bell.
fn beep(os: Os) {
    for &(program, args) in beep_commands(os) {
        let played = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .is_ok_and(|s| s.success());
        if played {
            return;
        }
        debug!(program, "beep command unavailable");
    }

    let mut stderr = std::io::stderr();
    let _ = stderr.write_all(b"\x07");
    let _ = stderr.flush();
}
