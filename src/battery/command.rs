use std::io::Read;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::MonitorError;

const POLL_STEP: Duration = Duration::from_millis(20);

/// Run a battery query command, killing it if it outlives `timeout`.
/// Battery tools print a few lines, so reading stdout after exit cannot
/// fill the pipe.
pub fn run(program: &str, args: &[&str], timeout: Duration) -> Result<String, MonitorError> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| MonitorError::Command(format!("{program}: {e}")))?;

    let deadline = Instant::now() + timeout;
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            return Err(MonitorError::Timeout(format!(
                "{program} did not finish within {}ms",
                timeout.as_millis()
            )));
        }
        thread::sleep(POLL_STEP);
    };

    let mut out = Vec::new();
    if let Some(mut stdout) = child.stdout.take() {
        stdout.read_to_end(&mut out)?;
    }
    if !status.success() {
        return Err(MonitorError::Command(format!("{program} exited with {status}")));
    }

    let text = String::from_utf8_lossy(&out).into_owned();
    debug!(program, bytes = text.len(), "battery query finished");
    Ok(text)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_missing_program_is_command_error() {
        let err = run("battmon-no-such-tool", &[], Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, MonitorError::Command(_)));
    }

    #[test]
    fn test_captures_stdout() {
        let out = run("sh", &["-c", "echo 'Battery 0: Full, 100%'"], Duration::from_secs(5)).unwrap();
        assert_eq!(out.trim(), "Battery 0: Full, 100%");
    }

    #[test]
    fn test_non_zero_exit_is_error() {
        assert!(run("sh", &["-c", "exit 3"], Duration::from_secs(5)).is_err());
    }

    #[test]
    fn test_slow_command_times_out() {
        let err = run("sleep", &["5"], Duration::from_millis(100)).unwrap_err();
        assert!(matches!(err, MonitorError::Timeout(_)));
    }
}
