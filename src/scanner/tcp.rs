//! TCP Connect prober implementation.
//!
//! Performs standard TCP connect scans using the operating system's
//! socket API. An open port is one that completes the handshake within
//! the per-attempt timeout; nothing beyond the handshake is sent.

use crate::banner::grab_banner;
use crate::error::ScanError;
use crate::scanner::plan::ScanTask;
use crate::scanner::resolver::HostResolver;
use crate::scanner::traits::{Prober, ScanConfig, ScanResult};
use crate::types::{Port, Target};
use async_trait::async_trait;
use std::net::{IpAddr, SocketAddr};
use std::sync::OnceLock;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::{timeout_at, Instant};

/// TCP Connect prober.
///
/// Uses standard socket connect() calls to determine port status and does
/// not require elevated privileges. Hostname targets are resolved on first
/// use; the resolver is only built if a hostname is actually probed.
#[derive(Debug)]
pub struct TcpConnectScanner {
    config: ScanConfig,
    resolver: OnceLock<HostResolver>,
}

impl TcpConnectScanner {
    pub fn new(config: ScanConfig) -> Self {
        Self {
            config,
            resolver: OnceLock::new(),
        }
    }

    /// Use a specific resolver instead of the system one.
    pub fn with_resolver(config: ScanConfig, resolver: HostResolver) -> Self {
        Self {
            config,
            resolver: OnceLock::from(resolver),
        }
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Turn a target into candidate addresses. Running out of time here is
    /// a resolution failure, not a connect timeout: the name never resolved.
    async fn resolve(&self, target: &Target, deadline: Instant) -> Result<Vec<IpAddr>, ScanError> {
        match target {
            Target::Ip(ip) => Ok(vec![*ip]),
            Target::Hostname(name) => {
                let resolver = self.resolver.get_or_init(HostResolver::from_system);
                timeout_at(deadline, resolver.lookup(name))
                    .await
                    .map_err(|_| ScanError::Resolution(format!("timed out resolving '{}'", name)))?
            }
        }
    }

    /// Try each address in turn until one accepts or the deadline passes.
    async fn attempt_connect(
        &self,
        addrs: &[IpAddr],
        port: Port,
        deadline: Instant,
    ) -> Result<TcpStream, ScanError> {
        let mut last_error = None;

        for &ip in addrs {
            let addr = SocketAddr::new(ip, port.as_u16());
            match timeout_at(deadline, TcpStream::connect(addr)).await {
                Ok(Ok(stream)) => return Ok(stream),
                Ok(Err(e)) => last_error = Some(ScanError::from_connect(e)),
                Err(_) => return Err(ScanError::Timeout),
            }
        }

        Err(last_error.unwrap_or_else(|| ScanError::Resolution("no addresses to try".into())))
    }
}

/// `now + timeout`, saturating at a far-future instant instead of
/// overflowing.
fn attempt_deadline(now: Instant, timeout: Duration) -> Instant {
    now.checked_add(timeout)
        .unwrap_or_else(|| now + ScanConfig::MAX_TIMEOUT)
}

#[async_trait]
impl Prober for TcpConnectScanner {
    async fn probe(&self, task: &ScanTask) -> ScanResult {
        let deadline = attempt_deadline(Instant::now(), self.config.timeout);

        let connected = match self.resolve(&task.target, deadline).await {
            Ok(addrs) => self.attempt_connect(&addrs, task.port, deadline).await,
            Err(e) => Err(e),
        };

        match connected {
            Ok(mut stream) => {
                let banner = if self.config.grab_banners {
                    grab_banner(
                        &mut stream,
                        self.config.banner_max_bytes,
                        self.config.effective_banner_timeout(),
                    )
                    .await
                } else {
                    None
                };
                // Dropping the stream closes the socket before the slot is released.
                drop(stream);

                tracing::debug!(task = %task, banner = banner.is_some(), "open");
                ScanResult::open(task, banner)
            }
            Err(e) => {
                tracing::debug!(task = %task, error = %e, "closed");
                ScanResult::closed(task, e.kind())
            }
        }
    }
}
