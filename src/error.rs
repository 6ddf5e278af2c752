//! A dedicated error for everything that can go wrong building, sending or
//! parsing DNS messages.
use std::io;
use std::str;

#[derive(Debug)]
pub enum DnsSdError {
    Io(io::Error),
    FromUtf8(std::string::FromUtf8Error),
    Utf8(str::Utf8Error),
    LoggerError(log::SetLoggerError),
    /// malformed wire data: truncated record, name too long, pointer loop, etc.
    Protocol(String),
}

impl DnsSdError {
    pub fn protocol(s: impl Into<String>) -> Self {
        DnsSdError::Protocol(s.into())
    }
}

impl std::fmt::Display for DnsSdError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DnsSdError::Io(e) => write!(f, "I/O error: {}", e),
            DnsSdError::FromUtf8(e) => write!(f, "invalid UTF8: {}", e),
            DnsSdError::Utf8(e) => write!(f, "invalid UTF8: {}", e),
            DnsSdError::LoggerError(e) => write!(f, "logger error: {}", e),
            DnsSdError::Protocol(s) => write!(f, "protocol error: {}", s),
        }
    }
}

impl std::error::Error for DnsSdError {}

/// A specific custom `Result` for all functions in this crate.
pub type Result<T> = std::result::Result<T, DnsSdError>;

impl From<io::Error> for DnsSdError {
    fn from(err: io::Error) -> Self {
        DnsSdError::Io(err)
    }
}

impl From<String> for DnsSdError {
    fn from(err: String) -> Self {
        DnsSdError::Protocol(err)
    }
}

impl From<std::string::FromUtf8Error> for DnsSdError {
    fn from(err: std::string::FromUtf8Error) -> Self {
        DnsSdError::FromUtf8(err)
    }
}

impl From<str::Utf8Error> for DnsSdError {
    fn from(err: str::Utf8Error) -> Self {
        DnsSdError::Utf8(err)
    }
}

impl From<log::SetLoggerError> for DnsSdError {
    fn from(err: log::SetLoggerError) -> Self {
        DnsSdError::LoggerError(err)
    }
}
