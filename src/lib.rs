//! # portsweep - A Concurrent TCP Port Scanner
//!
//! portsweep checks which TCP ports accept connections on a set of hosts.
//! Targets are single addresses, hostnames, or CIDR blocks; ports are
//! comma-separated numbers and ranges.
//!
//! ## Features
//!
//! - **Bounded Concurrency**: A fixed number of connect attempts in flight
//! - **Per-Attempt Deadlines**: Resolution and connect share one timeout
//! - **Banner Grabbing**: Optional single read of a service greeting
//! - **Streaming Results**: Open ports reported as found, hosts summarised
//!   as soon as their last port finishes
//! - **Multiple Output Formats**: Console table, JSON, and CSV
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use portsweep::scanner::{run_scan, ConcurrencyGate, ScanConfig, TcpConnectScanner, WorkPlan};
//! use portsweep::types::{expand_targets, parse_ports};
//! use std::sync::Arc;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let plan = WorkPlan::new(expand_targets("192.168.1.0/30")?, parse_ports("22,80,443")?);
//! let config = ScanConfig::new().with_concurrency(64);
//! let gate = ConcurrencyGate::new(config.concurrency);
//!
//! let report = run_scan(plan, Arc::new(TcpConnectScanner::new(config)), gate).await;
//! for host in &report.hosts {
//!     println!("{}: {} open / {} checked", host.target, host.open_count(), host.checked());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`types`] - Target and port parsing and expansion
//! - [`scanner`] - Work plan, connector, aggregator and scan driver
//! - [`banner`] - Greeting capture and decoding
//! - [`config`] - Settings file handling
//! - [`error`] - Error types
//! - [`output`] - Console, JSON and CSV reporters
//! - [`cli`] - Command line front end

pub mod banner;
pub mod cli;
pub mod config;
pub mod error;
pub mod output;
pub mod scanner;
pub mod types;

// Re-export commonly used types
pub use error::{CliError, ProbeErrorKind, ScanError};
pub use scanner::{
    run_scan, start_scan, HostSummary, Prober, ScanConfig, ScanEvent, ScanReport, ScanResult,
};
pub use types::{Port, PortSpec, Target, TargetSpec};
