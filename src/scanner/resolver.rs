//! Lazy hostname resolution.
//!
//! One resolver is shared by every attempt in a scan, so a hostname probed
//! on many ports is looked up once and then served from the cache.

use crate::error::ScanError;
use std::net::IpAddr;
use trust_dns_resolver::config::{ResolverConfig, ResolverOpts};
use trust_dns_resolver::TokioAsyncResolver;

/// DNS resolver used by the connect prober.
#[derive(Clone)]
pub struct HostResolver {
    inner: TokioAsyncResolver,
}

impl HostResolver {
    /// Build from the system resolver configuration, falling back to the
    /// library defaults when it cannot be read.
    pub fn from_system() -> Self {
        let inner = TokioAsyncResolver::tokio_from_system_conf().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "system resolver config unavailable, using defaults");
            TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default())
        });
        Self { inner }
    }

    /// Resolve `hostname` to every address it has, in the order returned.
    pub async fn lookup(&self, hostname: &str) -> Result<Vec<IpAddr>, ScanError> {
        let response = self
            .inner
            .lookup_ip(hostname)
            .await
            .map_err(|e| ScanError::Resolution(format!("{}: {}", hostname, e)))?;

        let ips: Vec<IpAddr> = response.iter().collect();
        if ips.is_empty() {
            return Err(ScanError::Resolution(format!(
                "no addresses found for '{}'",
                hostname
            )));
        }
        Ok(ips)
    }
}

impl std::fmt::Debug for HostResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostResolver").finish_non_exhaustive()
    }
}
