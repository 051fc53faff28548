//! Error types for portsweep.
//!
//! Uses `thiserror` for ergonomic error definitions. Validation errors
//! (`CliError`, `ConfigError`, and the type-level `PortError`/`TargetError`)
//! stop an invocation before any packet is sent. `ScanError` never leaves
//! the task that produced it; it is folded into a [`ProbeErrorKind`] on the
//! task's result.

use crate::types::{PortError, TargetError};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Failure of a single connect attempt.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("connection timed out")]
    Timeout,

    #[error("connection refused")]
    ConnectionRefused,

    #[error("DNS resolution failed: {0}")]
    Resolution(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ScanError {
    /// Map an OS-level connect error onto the taxonomy the scanner reports.
    pub fn from_connect(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::ConnectionRefused => Self::ConnectionRefused,
            std::io::ErrorKind::TimedOut => Self::Timeout,
            _ => Self::Io(err),
        }
    }

    pub fn kind(&self) -> ProbeErrorKind {
        match self {
            Self::Timeout => ProbeErrorKind::Timeout,
            Self::ConnectionRefused => ProbeErrorKind::ConnectionRefused,
            Self::Resolution(_) => ProbeErrorKind::ResolutionFailure,
            Self::Io(_) => ProbeErrorKind::Other,
        }
    }
}

/// Why a port was reported closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeErrorKind {
    Timeout,
    ConnectionRefused,
    ResolutionFailure,
    Other,
}

impl fmt::Display for ProbeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "timeout"),
            Self::ConnectionRefused => write!(f, "refused"),
            Self::ResolutionFailure => write!(f, "unresolved"),
            Self::Other => write!(f, "error"),
        }
    }
}

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not determine configuration directory")]
    DirectoryNotFound,

    #[error("failed to read {path}: {reason}")]
    ReadFailed { path: PathBuf, reason: String },

    #[error("invalid settings file: {0}")]
    InvalidFormat(String),

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while validating a command line, before scanning starts.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("invalid target: {0}")]
    InvalidTarget(#[from] TargetError),

    #[error("invalid ports: {0}")]
    InvalidPort(#[from] PortError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("target set has {count} hosts, more than the limit of {limit} (raise --max-hosts)")]
    TooManyHosts { count: u128, limit: u64 },

    #[error("output file must end with .json or .csv: {0}")]
    UnsupportedOutput(PathBuf),
}

pub type CliResult<T> = Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_connect_error_classification() {
        let refused = io::Error::from(io::ErrorKind::ConnectionRefused);
        assert_eq!(
            ScanError::from_connect(refused).kind(),
            ProbeErrorKind::ConnectionRefused
        );

        let timed_out = io::Error::from(io::ErrorKind::TimedOut);
        assert_eq!(ScanError::from_connect(timed_out).kind(), ProbeErrorKind::Timeout);

        let other = io::Error::new(io::ErrorKind::Other, "too many open files");
        assert_eq!(ScanError::from_connect(other).kind(), ProbeErrorKind::Other);
    }

    #[test]
    fn test_resolution_kind() {
        let err = ScanError::Resolution("no record".into());
        assert_eq!(err.kind(), ProbeErrorKind::ResolutionFailure);
        assert_eq!(err.to_string(), "DNS resolution failed: no record");
    }

    #[test]
    fn test_cli_error_wraps_port_error() {
        let err: CliError = PortError::Empty.into();
        assert_eq!(err.to_string(), "invalid ports: empty port specification");
    }
}
