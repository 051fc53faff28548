//! Target specification types with CIDR and hostname support.
//!
//! Provides target parsing and expansion supporting:
//! - Single IP addresses (IPv4 and IPv6)
//! - CIDR notation (192.168.1.0/24)
//! - Hostnames (example.com), left unresolved until connect time

use ipnetwork::{IpNetwork, Ipv4Network, Ipv6Network};
use std::collections::HashSet;
use std::fmt;
use std::ops::RangeInclusive;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;
use std::sync::Arc;

/// A single host to scan.
///
/// Hostnames are carried unresolved; the connector resolves them lazily so
/// a lookup failure only affects that host's tasks.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Target {
    Ip(IpAddr),
    Hostname(Arc<str>),
}

impl Target {
    pub fn hostname(name: &str) -> Self {
        Self::Hostname(Arc::from(name))
    }

    pub fn as_ip(&self) -> Option<IpAddr> {
        match self {
            Self::Ip(ip) => Some(*ip),
            Self::Hostname(_) => None,
        }
    }
}

impl From<IpAddr> for Target {
    fn from(ip: IpAddr) -> Self {
        Self::Ip(ip)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ip(ip) => write!(f, "{}", ip),
            Self::Hostname(name) => write!(f, "{}", name),
        }
    }
}

/// Error type for target parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TargetError {
    #[error("empty target specification")]
    Empty,
    #[error("invalid CIDR notation: {0}")]
    InvalidCidr(String),
    #[error("{count} hosts exceeds the limit of {limit}")]
    TooManyHosts { count: u128, limit: u64 },
    #[error("not enough memory to hold {0} hosts")]
    TooLarge(u128),
}

/// Default ceiling on how many hosts an expansion may produce.
pub const DEFAULT_HOST_LIMIT: u64 = 65_536;

/// A parsed target specification that expands to one or more targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetSpec {
    /// A single IP address.
    Single(IpAddr),
    /// A CIDR network range.
    Cidr(IpNetwork),
    /// A hostname to be resolved at connect time.
    Hostname(String),
}

impl TargetSpec {
    /// Parse a target specification from a string.
    ///
    /// Only malformed CIDR notation is rejected. Anything that is neither an
    /// IP literal nor contains a `/` is taken as a hostname, however unlikely
    /// it is to resolve.
    pub fn parse(s: &str) -> Result<Self, TargetError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(TargetError::Empty);
        }

        if let Ok(ip) = s.parse::<IpAddr>() {
            return Ok(Self::Single(ip));
        }

        if s.contains('/') {
            let network: IpNetwork = s
                .parse()
                .map_err(|_| TargetError::InvalidCidr(s.to_string()))?;
            return Ok(Self::Cidr(network));
        }

        Ok(Self::Hostname(s.to_string()))
    }

    /// Number of targets [`TargetSpec::expand`] will produce, saturating at
    /// `u128::MAX` for the very largest IPv6 blocks.
    pub fn host_count(&self) -> u128 {
        match self {
            Self::Single(_) | Self::Hostname(_) => 1,
            Self::Cidr(IpNetwork::V4(net)) => {
                let (start, end) = v4_host_bounds(net);
                u128::from(end - start) + 1
            }
            Self::Cidr(IpNetwork::V6(net)) => {
                let (start, end) = v6_host_bounds(net);
                (end - start).saturating_add(1)
            }
        }
    }

    /// Expand into the ordered list of targets covered, refusing blocks of
    /// more than `limit` hosts before allocating anything.
    ///
    /// CIDR blocks yield their usable hosts in ascending order: the network
    /// and broadcast addresses are skipped for IPv4 prefixes up to /30, the
    /// subnet-router anycast address for IPv6 prefixes up to /126. Smaller
    /// blocks (/31, /32, /127, /128) yield every address they contain.
    pub fn expand(&self, limit: u64) -> Result<Vec<Target>, TargetError> {
        let count = self.host_count();
        check_limit(count, limit)?;
        let mut targets = allocate(count)?;
        targets.extend(self.hosts());
        Ok(targets)
    }

    /// Lazily yield every target covered, in the same order as
    /// [`TargetSpec::expand`]. Never allocates, whatever the block size.
    pub fn hosts(&self) -> Hosts {
        let range = match self {
            Self::Single(ip) => HostRange::One(Some(Target::Ip(*ip))),
            Self::Hostname(name) => HostRange::One(Some(Target::hostname(name))),
            Self::Cidr(IpNetwork::V4(net)) => {
                let (start, end) = v4_host_bounds(net);
                HostRange::V4(start..=end)
            }
            Self::Cidr(IpNetwork::V6(net)) => {
                let (start, end) = v6_host_bounds(net);
                HostRange::V6(start..=end)
            }
        };
        Hosts(range)
    }
}

/// Iterator returned by [`TargetSpec::hosts`].
#[derive(Debug, Clone)]
pub struct Hosts(HostRange);

#[derive(Debug, Clone)]
enum HostRange {
    One(Option<Target>),
    V4(RangeInclusive<u32>),
    V6(RangeInclusive<u128>),
}

impl Iterator for Hosts {
    type Item = Target;

    fn next(&mut self) -> Option<Target> {
        match &mut self.0 {
            HostRange::One(target) => target.take(),
            HostRange::V4(range) => range
                .next()
                .map(|n| Target::Ip(IpAddr::V4(Ipv4Addr::from(n)))),
            HostRange::V6(range) => range
                .next()
                .map(|n| Target::Ip(IpAddr::V6(Ipv6Addr::from(n)))),
        }
    }
}

fn v4_host_bounds(net: &Ipv4Network) -> (u32, u32) {
    let prefix = u32::from(net.prefix());
    let mask = u32::MAX.checked_shl(32 - prefix).unwrap_or(0);
    let first = u32::from(net.ip()) & mask;
    let last = first | !mask;
    if prefix <= 30 {
        (first + 1, last - 1)
    } else {
        (first, last)
    }
}

fn v6_host_bounds(net: &Ipv6Network) -> (u128, u128) {
    let prefix = u32::from(net.prefix());
    let mask = u128::MAX.checked_shl(128 - prefix).unwrap_or(0);
    let first = u128::from(net.ip()) & mask;
    let last = first | !mask;
    if prefix <= 126 {
        (first + 1, last)
    } else {
        (first, last)
    }
}

impl FromStr for TargetSpec {
    type Err = TargetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for TargetSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single(ip) => write!(f, "{}", ip),
            Self::Cidr(network) => write!(f, "{}", network),
            Self::Hostname(hostname) => write!(f, "{}", hostname),
        }
    }
}

fn check_limit(count: u128, limit: u64) -> Result<(), TargetError> {
    if count > u128::from(limit) {
        return Err(TargetError::TooManyHosts { count, limit });
    }
    Ok(())
}

/// Reserve room for `count` targets up front, failing instead of aborting
/// when that much memory is not available.
fn allocate(count: u128) -> Result<Vec<Target>, TargetError> {
    let mut targets = Vec::new();
    usize::try_from(count)
        .ok()
        .and_then(|n| targets.try_reserve_exact(n).ok())
        .ok_or(TargetError::TooLarge(count))?;
    Ok(targets)
}

/// Expand several parsed specs into one target list, keeping the first
/// occurrence of any target that appears more than once.
///
/// `limit` applies to the combined host count, before de-duplication.
pub fn expand_all(specs: &[TargetSpec], limit: u64) -> Result<Vec<Target>, TargetError> {
    let count = specs
        .iter()
        .fold(0u128, |acc, spec| acc.saturating_add(spec.host_count()));
    check_limit(count, limit)?;

    let mut targets = allocate(count)?;
    let mut seen = HashSet::new();
    targets.extend(
        specs
            .iter()
            .flat_map(TargetSpec::hosts)
            .filter(|target| seen.insert(target.clone())),
    );
    Ok(targets)
}

/// Parse and expand a single target string, up to [`DEFAULT_HOST_LIMIT`]
/// hosts.
pub fn expand_targets(spec: &str) -> Result<Vec<Target>, TargetError> {
    TargetSpec::parse(spec)?.expand(DEFAULT_HOST_LIMIT)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ips(targets: &[Target]) -> Vec<String> {
        targets.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_parse_ipv4() {
        let spec = TargetSpec::parse("192.168.1.1").unwrap();
        assert!(matches!(spec, TargetSpec::Single(IpAddr::V4(_))));
    }

    #[test]
    fn test_parse_ipv6() {
        let spec = TargetSpec::parse("::1").unwrap();
        assert!(matches!(spec, TargetSpec::Single(IpAddr::V6(_))));
    }

    #[test]
    fn test_parse_hostname_is_never_rejected() {
        assert!(matches!(
            TargetSpec::parse("example.com").unwrap(),
            TargetSpec::Hostname(_)
        ));
        assert!(matches!(
            TargetSpec::parse("-not_really.a..host").unwrap(),
            TargetSpec::Hostname(_)
        ));
    }

    #[test]
    fn test_malformed_cidr_rejected() {
        assert!(matches!(
            TargetSpec::parse("10.0.0.0/33"),
            Err(TargetError::InvalidCidr(_))
        ));
        assert!(matches!(
            TargetSpec::parse("10.0.0.0/abc"),
            Err(TargetError::InvalidCidr(_))
        ));
        assert!(matches!(
            TargetSpec::parse("example.com/24"),
            Err(TargetError::InvalidCidr(_))
        ));
        assert_eq!(TargetSpec::parse("   "), Err(TargetError::Empty));
    }

    #[test]
    fn test_slash_30_has_two_hosts() {
        let targets = expand_targets("10.0.0.0/30").unwrap();
        assert_eq!(ips(&targets), vec!["10.0.0.1", "10.0.0.2"]);
    }

    #[test]
    fn test_small_prefixes_keep_all_addresses() {
        assert_eq!(ips(&expand_targets("10.0.0.7/32").unwrap()), vec!["10.0.0.7"]);
        assert_eq!(
            ips(&expand_targets("10.0.0.6/31").unwrap()),
            vec!["10.0.0.6", "10.0.0.7"]
        );
        assert_eq!(ips(&expand_targets("2001:db8::1/128").unwrap()), vec!["2001:db8::1"]);
    }

    #[test]
    fn test_host_bits_are_normalised() {
        assert_eq!(
            ips(&expand_targets("10.0.0.5/30").unwrap()),
            vec!["10.0.0.5", "10.0.0.6"]
        );
    }

    #[test]
    fn test_slash_24_count_and_containment() {
        let spec = TargetSpec::parse("192.168.7.0/24").unwrap();
        let targets = spec.expand(DEFAULT_HOST_LIMIT).unwrap();
        assert_eq!(targets.len(), 254);
        assert_eq!(spec.host_count(), 254);

        let net: Ipv4Network = "192.168.7.0/24".parse().unwrap();
        for target in &targets {
            match target.as_ip() {
                Some(IpAddr::V4(ip)) => assert!(net.contains(ip)),
                other => panic!("unexpected target {:?}", other),
            }
        }
        assert_eq!(targets.first().map(ToString::to_string).unwrap(), "192.168.7.1");
        assert_eq!(targets.last().map(ToString::to_string).unwrap(), "192.168.7.254");
    }

    #[test]
    fn test_ipv6_block_skips_anycast_only() {
        let targets = expand_targets("2001:db8::/126").unwrap();
        assert_eq!(ips(&targets), vec!["2001:db8::1", "2001:db8::2", "2001:db8::3"]);
    }

    #[test]
    fn test_host_count_of_huge_block_saturates() {
        let spec = TargetSpec::parse("::/0").unwrap();
        assert_eq!(spec.host_count(), u128::MAX);
        let spec = TargetSpec::parse("0.0.0.0/0").unwrap();
        assert_eq!(spec.host_count(), (1u128 << 32) - 2);
    }

    #[test]
    fn test_expand_all_dedups_in_order() {
        let specs: Vec<TargetSpec> = ["10.0.0.2", "10.0.0.0/30", "db.local", "db.local"]
            .iter()
            .map(|s| s.parse().unwrap())
            .collect();
        assert_eq!(
            ips(&expand_all(&specs, DEFAULT_HOST_LIMIT).unwrap()),
            vec!["10.0.0.2", "10.0.0.1", "db.local"]
        );
    }

    #[test]
    fn test_large_blocks_refused_before_allocating() {
        assert_eq!(
            expand_targets("2001:db8::/64"),
            Err(TargetError::TooManyHosts {
                count: (1u128 << 64) - 1,
                limit: DEFAULT_HOST_LIMIT,
            })
        );
        assert!(matches!(
            TargetSpec::parse("::/0").unwrap().expand(u64::MAX),
            Err(TargetError::TooManyHosts { .. })
        ));

        // Without a useful limit the allocation itself is refused.
        assert!(matches!(
            TargetSpec::parse("2001:db8::/64").unwrap().expand(u64::MAX),
            Err(TargetError::TooLarge(_))
        ));

        let spec = TargetSpec::parse("10.0.0.0/24").unwrap();
        assert!(spec.expand(253).is_err());
        assert_eq!(spec.expand(254).unwrap().len(), 254);
    }

    #[test]
    fn test_hosts_iterates_huge_block_lazily() {
        let spec = TargetSpec::parse("2001:db8::/64").unwrap();
        let first: Vec<String> = spec.hosts().take(2).map(|t| t.to_string()).collect();
        assert_eq!(first, vec!["2001:db8::1", "2001:db8::2"]);

        let single = TargetSpec::parse("db.local").unwrap();
        assert_eq!(single.hosts().count(), 1);
    }

    #[test]
    fn test_expand_all_limit_is_combined() {
        let specs: Vec<TargetSpec> = ["10.0.0.0/30", "10.0.1.0/30"]
            .iter()
            .map(|s| s.parse().unwrap())
            .collect();
        assert_eq!(
            expand_all(&specs, 3),
            Err(TargetError::TooManyHosts { count: 4, limit: 3 })
        );
        assert_eq!(expand_all(&specs, 4).unwrap().len(), 4);
    }
}
