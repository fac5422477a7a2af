use std::fmt;

#[derive(Debug)]
pub enum MonitorError {
    Command(String),
    Timeout(String),
    Parse(String),
    Notify(String),
    Validation(Vec<String>),
    Io(std::io::Error),
    Json(serde_json::Error),
}

impl fmt::Display for MonitorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Command(msg) => write!(f, "Command failed: {msg}"),
            Self::Timeout(msg) => write!(f, "Timed out: {msg}"),
            Self::Parse(msg) => write!(f, "Unrecognized battery output: {msg}"),
            Self::Notify(msg) => write!(f, "Notification failed: {msg}"),
            Self::Validation(errors) => write!(f, "Invalid profile: {}", errors.join("; ")),
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Json(e) => write!(f, "JSON error: {e}"),
        }
    }
}

impl std::error::Error for MonitorError {}

impl From<std::io::Error> for MonitorError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for MonitorError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}
