//! Command line interface.
//!
//! `portsweep <TARGET>... -p <PORTS>` scans every target on every port.
//! Settings from the config file fill in anything not given on the
//! command line.

mod scan;

pub use scan::ScanCommand;

use crate::config::AppSettings;
use crate::error::{ConfigError, ConfigResult};
use clap::{ArgAction, Parser};
use std::path::PathBuf;

/// portsweep - A concurrent TCP connect port scanner.
///
/// Targets may be IP addresses, hostnames, or CIDR blocks. Open ports are
/// printed as they are found and every host gets a summary once all of its
/// ports have been checked.
#[derive(Parser, Debug)]
#[command(name = "portsweep")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "A fast, concurrent TCP port scanner", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub scan: ScanCommand,

    /// Increase verbosity (-v shows a progress bar, -vv adds debug logs)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Path to a settings file (defaults to the XDG config directory)
    #[arg(long, value_name = "PATH", env = "PORTSWEEP_CONFIG")]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// Load settings and run the scan.
    pub async fn run(&self) -> anyhow::Result<()> {
        let settings = self.load_settings()?;
        self.scan
            .execute(&settings, self.verbose > 0, self.quiet)
            .await
    }

    /// An explicit `--config` must exist; the default location is optional.
    fn load_settings(&self) -> ConfigResult<AppSettings> {
        if let Some(path) = &self.config {
            return AppSettings::load_from(path);
        }
        match AppSettings::load() {
            Err(ConfigError::DirectoryNotFound) => {
                tracing::debug!("no config directory on this platform, using defaults");
                Ok(AppSettings::default())
            }
            other => other,
        }
    }
}
