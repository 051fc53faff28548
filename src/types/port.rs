//! Port types with validation and parsing.
//!
//! The `Port` newtype ensures values are always valid port numbers (1-65535).
//! `PortRange` and `PortSpec` handle comma/range port specifications.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// A validated network port number (1-65535).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Port(u16);

impl Port {
    /// Minimum valid port number.
    pub const MIN: u16 = 1;
    /// Maximum valid port number.
    pub const MAX: u16 = 65535;

    /// Create a new Port from a u16, returning None if invalid.
    #[inline]
    pub const fn new(port: u16) -> Option<Self> {
        if port >= Self::MIN {
            Some(Self(port))
        } else {
            None
        }
    }

    /// Get the raw port number.
    #[inline]
    pub const fn as_u16(self) -> u16 {
        self.0
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Port> for u16 {
    fn from(port: Port) -> Self {
        port.0
    }
}

/// Error type for port parsing and validation.
///
/// Every variant except `Empty` carries the token that failed so the
/// user can see exactly which part of the list was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    #[error("empty port specification")]
    Empty,
    #[error("invalid port token '{token}'")]
    InvalidFormat { token: String },
    #[error("port {value} in '{token}' is out of valid range (1-65535)")]
    OutOfRange { token: String, value: u64 },
    #[error("invalid port range '{token}': start ({start}) > end ({end})")]
    InvalidRange { token: String, start: u16, end: u16 },
}

/// A range of ports (inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortRange {
    start: Port,
    end: Port,
}

impl PortRange {
    /// Create a range containing a single port.
    pub const fn single(port: Port) -> Self {
        Self {
            start: port,
            end: port,
        }
    }

    /// Number of ports in this range.
    pub const fn len(&self) -> usize {
        (self.end.0 - self.start.0) as usize + 1
    }

    pub const fn is_empty(&self) -> bool {
        false
    }

    /// Iterate over all ports in this range.
    pub fn iter(&self) -> impl Iterator<Item = Port> {
        (self.start.0..=self.end.0).map(Port)
    }

    fn parse_token(token: &str) -> Result<Self, PortError> {
        match token.split_once('-') {
            Some((start, end)) => {
                let start = parse_bound(token, start)?;
                let end = parse_bound(token, end)?;
                if start > end {
                    return Err(PortError::InvalidRange {
                        token: token.to_string(),
                        start: start.0,
                        end: end.0,
                    });
                }
                Ok(Self { start, end })
            }
            None => parse_bound(token, token).map(Self::single),
        }
    }
}

/// Parse one side of a token. Values are read wider than `u16` so that
/// "70000" reports as out of range rather than as garbage.
fn parse_bound(token: &str, raw: &str) -> Result<Port, PortError> {
    let value: u64 = raw.trim().parse().map_err(|_| PortError::InvalidFormat {
        token: token.to_string(),
    })?;

    u16::try_from(value)
        .ok()
        .and_then(Port::new)
        .ok_or_else(|| PortError::OutOfRange {
            token: token.to_string(),
            value,
        })
}

impl fmt::Display for PortRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

/// A complete port specification made of one or more ranges.
///
/// Supports formats like:
/// - Single port: "80"
/// - Comma-separated: "80,443,8080"
/// - Range: "1-1000"
/// - Mixed: "22,80,443,8000-9000"
///
/// Overlapping tokens are allowed; [`PortSpec::to_ports`] de-duplicates.
#[derive(Debug, Clone, Default)]
pub struct PortSpec {
    ranges: Vec<PortRange>,
}

impl PortSpec {
    /// All ports as an ascending, de-duplicated vector.
    pub fn to_ports(&self) -> Vec<Port> {
        self.ranges
            .iter()
            .flat_map(|r| r.iter())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Number of unique ports.
    pub fn count(&self) -> usize {
        self.to_ports().len()
    }

    pub fn ranges(&self) -> &[PortRange] {
        &self.ranges
    }
}

impl FromStr for PortSpec {
    type Err = PortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ranges = s
            .split(',')
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(PortRange::parse_token)
            .collect::<Result<Vec<_>, _>>()?;

        if ranges.is_empty() {
            return Err(PortError::Empty);
        }

        Ok(Self { ranges })
    }
}

impl fmt::Display for PortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.ranges.iter().map(|r| r.to_string()).collect();
        write!(f, "{}", parts.join(","))
    }
}

/// Parse a port specification straight into its ascending port set.
pub fn parse_ports(spec: &str) -> Result<Vec<Port>, PortError> {
    spec.parse::<PortSpec>().map(|spec| spec.to_ports())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(ports: &[Port]) -> Vec<u16> {
        ports.iter().map(|p| p.as_u16()).collect()
    }

    #[test]
    fn test_port_validation() {
        assert!(Port::new(0).is_none());
        assert!(Port::new(1).is_some());
        assert!(Port::new(65535).is_some());
    }

    #[test]
    fn test_parse_single_and_list() {
        assert_eq!(raw(&parse_ports("80").unwrap()), vec![80]);
        assert_eq!(raw(&parse_ports("443, 80 ,8080").unwrap()), vec![80, 443, 8080]);
    }

    #[test]
    fn test_parse_inclusive_range() {
        let ports = parse_ports("1000-1010").unwrap();
        assert_eq!(ports.len(), 11);
        assert_eq!(ports.first().map(|p| p.as_u16()), Some(1000));
        assert_eq!(ports.last().map(|p| p.as_u16()), Some(1010));
    }

    #[test]
    fn test_overlapping_tokens_dedup() {
        assert_eq!(
            raw(&parse_ports("22,20-25").unwrap()),
            vec![20, 21, 22, 23, 24, 25]
        );
        assert_eq!(raw(&parse_ports("80,80,443,80").unwrap()), vec![80, 443]);
    }

    #[test]
    fn test_zero_in_range_rejected() {
        let err = parse_ports("0-10").unwrap_err();
        assert_eq!(
            err,
            PortError::OutOfRange {
                token: "0-10".to_string(),
                value: 0
            }
        );
    }

    #[test]
    fn test_too_large_rejected() {
        let err = parse_ports("22,70000").unwrap_err();
        assert!(matches!(err, PortError::OutOfRange { ref token, value: 70000 } if token == "70000"));
    }

    #[test]
    fn test_reversed_range_rejected() {
        assert!(matches!(
            parse_ports("100-50"),
            Err(PortError::InvalidRange { start: 100, end: 50, .. })
        ));
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(matches!(parse_ports("abc"), Err(PortError::InvalidFormat { .. })));
        assert!(matches!(parse_ports("1-2-3"), Err(PortError::InvalidFormat { .. })));
        assert!(matches!(parse_ports("-5"), Err(PortError::InvalidFormat { .. })));
    }

    #[test]
    fn test_empty_rejected() {
        assert_eq!(parse_ports(""), Err(PortError::Empty));
        assert_eq!(parse_ports(" , ,"), Err(PortError::Empty));
    }

    #[test]
    fn test_empty_tokens_skipped() {
        assert_eq!(raw(&parse_ports("80,,443,").unwrap()), vec![80, 443]);
    }

    #[test]
    fn test_spec_display() {
        let spec: PortSpec = "22,80-82".parse().unwrap();
        assert_eq!(spec.to_string(), "22,80-82");
        assert_eq!(spec.count(), 4);
    }
}
