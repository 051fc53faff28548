//! Core type definitions using newtype patterns for type safety.
//!
//! Ports and targets are validated once, up front, so nothing past this
//! point has to worry about a port of 0 or a half-parsed CIDR block.

mod port;
mod target;

pub use port::{parse_ports, Port, PortError, PortRange, PortSpec};
pub use target::{
    expand_all, expand_targets, Hosts, Target, TargetError, TargetSpec, DEFAULT_HOST_LIMIT,
};
