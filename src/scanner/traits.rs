//! Prober trait abstraction.
//!
//! Defines the interface between the dispatcher and whatever performs a
//! single connect attempt, plus the result and configuration types that
//! cross that boundary.

use crate::banner::DEFAULT_MAX_BANNER_BYTES;
use crate::error::{ConfigError, ConfigResult, ProbeErrorKind};
use crate::scanner::plan::ScanTask;
use crate::types::{Port, Target};
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::Semaphore;

/// Outcome of one scan task.
///
/// A closed port never carries a banner; the constructors are the only way
/// to build one, which keeps that invariant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanResult {
    pub target: Target,
    pub port: Port,
    pub open: bool,
    pub banner: Option<String>,
    pub error: Option<ProbeErrorKind>,
}

impl ScanResult {
    /// A port that accepted the connection.
    pub fn open(task: &ScanTask, banner: Option<String>) -> Self {
        Self {
            target: task.target.clone(),
            port: task.port,
            open: true,
            banner: banner.filter(|b| !b.is_empty()),
            error: None,
        }
    }

    /// A port that did not accept the connection.
    pub fn closed(task: &ScanTask, error: ProbeErrorKind) -> Self {
        Self {
            target: task.target.clone(),
            port: task.port,
            open: false,
            banner: None,
            error: Some(error),
        }
    }

    /// Banner text, empty when none was captured.
    pub fn banner_str(&self) -> &str {
        self.banner.as_deref().unwrap_or("")
    }
}

/// Configuration for the TCP connect prober.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanConfig {
    /// Maximum simultaneous connect attempts.
    pub concurrency: usize,
    /// Per-attempt deadline covering resolution and connect.
    pub timeout: Duration,
    /// Whether to read a greeting from open ports.
    pub grab_banners: bool,
    /// How long to wait for a greeting once connected.
    pub banner_timeout: Duration,
    /// Maximum greeting bytes read.
    pub banner_max_bytes: usize,
}

impl ScanConfig {
    /// Largest accepted concurrency ceiling.
    pub const MAX_CONCURRENCY: usize = Semaphore::MAX_PERMITS;
    /// Longest accepted per-attempt timeout.
    pub const MAX_TIMEOUT: Duration = Duration::from_secs(3600);
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            concurrency: 500,
            timeout: Duration::from_secs(1),
            grab_banners: false,
            banner_timeout: Duration::from_millis(500),
            banner_max_bytes: DEFAULT_MAX_BANNER_BYTES,
        }
    }
}

impl ScanConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the concurrency ceiling.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Set the per-attempt timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Enable banner grabbing.
    pub fn with_banners(mut self) -> Self {
        self.grab_banners = true;
        self
    }

    pub fn with_banner_timeout(mut self, timeout: Duration) -> Self {
        self.banner_timeout = timeout;
        self
    }

    pub fn with_banner_max_bytes(mut self, bytes: usize) -> Self {
        self.banner_max_bytes = bytes;
        self
    }

    /// The banner read never outlasts the connect timeout.
    pub fn effective_banner_timeout(&self) -> Duration {
        self.banner_timeout.min(self.timeout)
    }

    /// Reject values the scanner cannot run with.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                field: "concurrency",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.concurrency > Self::MAX_CONCURRENCY {
            return Err(ConfigError::InvalidValue {
                field: "concurrency",
                reason: format!("must be at most {}", Self::MAX_CONCURRENCY),
            });
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "timeout",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.timeout > Self::MAX_TIMEOUT {
            return Err(ConfigError::InvalidValue {
                field: "timeout",
                reason: format!("must be at most {}s", Self::MAX_TIMEOUT.as_secs()),
            });
        }
        if self.grab_banners && self.banner_max_bytes == 0 {
            return Err(ConfigError::InvalidValue {
                field: "banner-bytes",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Trait for whatever performs one connect attempt.
///
/// Implementations must turn every failure into a closed [`ScanResult`];
/// nothing a probe does may abort the scan.
#[async_trait]
pub trait Prober: Send + Sync {
    /// Probe a single (target, port) pair.
    async fn probe(&self, task: &ScanTask) -> ScanResult;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task() -> ScanTask {
        ScanTask::new(Target::hostname("db.local"), Port::new(5432).unwrap())
    }

    #[test]
    fn test_closed_result_has_no_banner() {
        let result = ScanResult::closed(&task(), ProbeErrorKind::Timeout);
        assert!(!result.open);
        assert_eq!(result.banner_str(), "");
        assert_eq!(result.error, Some(ProbeErrorKind::Timeout));
    }

    #[test]
    fn test_empty_banner_normalised() {
        let result = ScanResult::open(&task(), Some(String::new()));
        assert!(result.open);
        assert_eq!(result.banner, None);
    }

    #[test]
    fn test_config_validation() {
        assert!(ScanConfig::new().validate().is_ok());
        assert!(ScanConfig::new().with_concurrency(0).validate().is_err());
        assert!(ScanConfig::new()
            .with_concurrency(ScanConfig::MAX_CONCURRENCY)
            .validate()
            .is_ok());
        assert!(matches!(
            ScanConfig::new().with_concurrency(usize::MAX).validate(),
            Err(ConfigError::InvalidValue { field: "concurrency", .. })
        ));
        assert!(matches!(
            ScanConfig::new()
                .with_timeout(Duration::from_secs(1u64 << 60))
                .validate(),
            Err(ConfigError::InvalidValue { field: "timeout", .. })
        ));
        assert!(ScanConfig::new()
            .with_timeout(Duration::ZERO)
            .validate()
            .is_err());
        assert!(ScanConfig::new()
            .with_banners()
            .with_banner_max_bytes(0)
            .validate()
            .is_err());
    }

    #[test]
    fn test_banner_timeout_capped_by_connect_timeout() {
        let config = ScanConfig::new()
            .with_timeout(Duration::from_millis(200))
            .with_banner_timeout(Duration::from_secs(2));
        assert_eq!(config.effective_banner_timeout(), Duration::from_millis(200));
    }
}
