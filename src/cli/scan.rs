//! The scan command.
//!
//! Everything the user typed is validated before the first connection goes
//! out; once the scan starts, per-attempt failures only ever show up as
//! closed results.

use crate::config::AppSettings;
use crate::error::{CliError, CliResult, ConfigError};
use crate::output::{self, ConsoleReporter, OutputFormat};
use crate::scanner::{start_scan, ConcurrencyGate, ScanConfig, ScanReport, TcpConnectScanner, WorkPlan};
use crate::types::{expand_all, parse_ports, TargetError, TargetSpec};
use anyhow::Context;
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Scan targets for open TCP ports.
#[derive(Args, Debug)]
pub struct ScanCommand {
    /// Targets to scan (IP, hostname, or CIDR notation)
    ///
    /// Examples:
    ///   192.168.1.1        Single IP address
    ///   example.com        Hostname
    ///   192.168.1.0/24     CIDR range
    #[arg(value_name = "TARGET", required = true, num_args = 1..)]
    pub targets: Vec<String>,

    /// Ports to scan (e.g., "80", "80,443", "1-1000", "22,80,443,8000-9000")
    #[arg(short, long)]
    pub ports: String,

    /// Maximum number of simultaneous connect attempts [default: 500]
    #[arg(short = 'c', long)]
    pub concurrency: Option<usize>,

    /// Per-attempt timeout in seconds, covering resolution and connect [default: 1]
    #[arg(short = 't', long, value_name = "SECS")]
    pub timeout: Option<f64>,

    /// Read a greeting from open ports
    #[arg(short = 'b', long)]
    pub banner: bool,

    /// How long to wait for a greeting, in milliseconds [default: 500]
    #[arg(long, value_name = "MS")]
    pub banner_timeout: Option<u64>,

    /// Maximum greeting bytes to read [default: 1024]
    #[arg(long, value_name = "BYTES")]
    pub banner_bytes: Option<usize>,

    /// Save results to a .json or .csv file
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Refuse target sets larger than this many hosts [default: 65536]
    #[arg(long, value_name = "N")]
    pub max_hosts: Option<u64>,

    /// Show closed ports in the final table
    #[arg(long)]
    pub show_closed: bool,
}

impl ScanCommand {
    /// Connector settings: command line first, then the settings file.
    pub fn scan_config(&self, settings: &AppSettings) -> CliResult<ScanConfig> {
        let secs = self.timeout.unwrap_or(settings.timeout_secs);
        let timeout = Duration::try_from_secs_f64(secs).map_err(|_| ConfigError::InvalidValue {
            field: "timeout",
            reason: format!("{} is not a valid number of seconds", secs),
        })?;

        let mut config = ScanConfig::new()
            .with_concurrency(self.concurrency.unwrap_or(settings.concurrency))
            .with_timeout(timeout)
            .with_banner_timeout(Duration::from_millis(
                self.banner_timeout.unwrap_or(settings.banner_timeout_ms),
            ))
            .with_banner_max_bytes(self.banner_bytes.unwrap_or(settings.banner_max_bytes));
        if self.banner || settings.banner {
            config = config.with_banners();
        }

        config.validate()?;
        Ok(config)
    }

    /// Parse ports and targets into a work plan.
    ///
    /// The host count is checked before any CIDR block is expanded, so an
    /// oversized block fails fast instead of allocating. The ceiling is
    /// `--max-hosts`, then the settings file.
    pub fn plan(&self, settings: &AppSettings) -> CliResult<WorkPlan> {
        let ports = parse_ports(&self.ports)?;

        let specs = self
            .targets
            .iter()
            .map(|t| TargetSpec::parse(t))
            .collect::<Result<Vec<_>, _>>()?;

        let limit = self.max_hosts.unwrap_or(settings.max_hosts);
        let targets = expand_all(&specs, limit).map_err(|e| match e {
            TargetError::TooManyHosts { count, limit } => CliError::TooManyHosts { count, limit },
            other => CliError::InvalidTarget(other),
        })?;

        Ok(WorkPlan::new(targets, ports))
    }

    /// Where to save results, if anywhere.
    pub fn output_target(&self) -> CliResult<Option<(PathBuf, OutputFormat)>> {
        self.output
            .as_ref()
            .map(|path| Ok((path.clone(), OutputFormat::from_path(path)?)))
            .transpose()
    }

    /// Run the scan, printing as it goes. Ctrl-C stops dispatching new
    /// attempts; whatever finished is still printed and saved.
    pub async fn execute(
        &self,
        settings: &AppSettings,
        verbose: bool,
        quiet: bool,
    ) -> anyhow::Result<()> {
        let config = self.scan_config(settings)?;
        let plan = self.plan(settings)?;
        let output_target = self.output_target()?;

        tracing::debug!(?config, tasks = plan.len(), "scan validated");

        let reporter = ConsoleReporter::new(plan.len() as u64, verbose, quiet, self.show_closed);
        reporter.scan_header(
            plan.targets().len(),
            plan.ports().len(),
            config.concurrency,
            config.timeout,
        );

        let gate = ConcurrencyGate::new(config.concurrency);
        let scanner = Arc::new(TcpConnectScanner::new(config));
        let mut handle = start_scan(plan, scanner, gate);
        let canceller = handle.cancel_handle();
        let mut report = ScanReport::new(handle.started_at());

        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);
        let mut interrupted = false;

        loop {
            tokio::select! {
                event = handle.next_event() => match event {
                    Some(event) => {
                        reporter.on_event(&event);
                        report.record(event);
                    }
                    None => break,
                },
                signal = &mut ctrl_c, if !interrupted => {
                    interrupted = true;
                    match signal {
                        Ok(()) => {
                            output::print_warning("interrupted, waiting for in-flight attempts");
                            canceller.cancel();
                        }
                        Err(e) => tracing::warn!(error = %e, "could not listen for Ctrl-C"),
                    }
                }
            }
        }

        reporter.finish(&report).context("failed to print results")?;

        if let Some((path, format)) = output_target {
            output::write_report(&path, format, &report)
                .with_context(|| format!("failed to write {}", path.display()))?;
            if !quiet {
                output::print_success(&format!(
                    "Saved {} results to {}",
                    format,
                    path.display()
                ));
            }
        }

        Ok(())
    }
}
