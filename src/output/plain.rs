//! Plain text console output.
//!
//! Prints open ports as they are found, a line per finished host, and a
//! final table. All of it is driven by the scan's event stream.

use crate::scanner::{HostSummary, ScanEvent, ScanReport, ScanResult};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::time::Duration;

const RULE: &str = "───────────────────────────────────────────────────────────────";

/// Console subscriber for a running scan.
pub struct ConsoleReporter {
    progress: Option<ProgressBar>,
    quiet: bool,
    show_closed: bool,
}

impl ConsoleReporter {
    /// `total_tasks` sizes the progress bar, which is only shown when
    /// `verbose` is set.
    pub fn new(total_tasks: u64, verbose: bool, quiet: bool, show_closed: bool) -> Self {
        let progress = (verbose && !quiet).then(|| {
            let pb = ProgressBar::new(total_tasks);
            if let Ok(bar_style) = ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
            ) {
                pb.set_style(bar_style.progress_chars("=>-"));
            }
            pb
        });

        Self {
            progress,
            quiet,
            show_closed,
        }
    }

    /// Announce the scan before the first attempt goes out.
    pub fn scan_header(&self, hosts: usize, ports: usize, concurrency: usize, timeout: Duration) {
        if self.quiet {
            return;
        }
        self.line(String::new());
        self.line(format!(
            "{} {} v{}",
            style("Starting").cyan(),
            style("portsweep").cyan().bold(),
            env!("CARGO_PKG_VERSION")
        ));
        self.line(format!(
            "{} Scanning {} host(s), {} port(s) each",
            style("•").dim(),
            style(hosts).white().bold(),
            style(ports).white().bold()
        ));
        self.line(format!(
            "{} Concurrency {}, timeout {:.2}s",
            style("•").dim(),
            concurrency,
            timeout.as_secs_f64()
        ));
        self.line(String::new());
    }

    pub fn on_event(&self, event: &ScanEvent) {
        match event {
            ScanEvent::Result(result) => {
                if let Some(pb) = &self.progress {
                    pb.inc(1);
                }
                if result.open && !self.quiet {
                    self.line(format_open_line(result));
                }
            }
            ScanEvent::HostFinished(summary) => {
                if !self.quiet {
                    self.line(format_host_finished(summary));
                }
            }
            ScanEvent::Finished(_) => {
                if let Some(pb) = &self.progress {
                    pb.finish_and_clear();
                }
            }
        }
    }

    /// Print the final per-host table.
    pub fn finish(&self, report: &ScanReport) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        let stdout = io::stdout();
        let mut out = stdout.lock();
        write_summary(&mut out, report, self.show_closed)
    }

    fn line(&self, message: String) {
        match &self.progress {
            Some(pb) => pb.println(message),
            None => println!("{}", message),
        }
    }
}

/// `[host] OPEN  - port | banner`
pub fn format_open_line(result: &ScanResult) -> String {
    let mut line = format!(
        "[{}] {}  - {}",
        result.target,
        style("OPEN").green().bold(),
        result.port
    );
    if let Some(banner) = &result.banner {
        line.push_str(&format!("  | {}", style(truncate_string(banner, 60)).dim()));
    }
    line
}

/// `Finished host: X open / N checked`
pub fn format_host_finished(summary: &HostSummary) -> String {
    format!(
        "{} {}: {} open / {} checked",
        style("Finished").cyan(),
        style(&summary.target).bold(),
        style(summary.open_count()).green().bold(),
        summary.checked()
    )
}

/// Write the end-of-scan table.
pub fn write_summary<W: Write>(out: &mut W, report: &ScanReport, show_closed: bool) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", style(RULE).cyan())?;
    writeln!(out, "                    {} Scan Results", style("portsweep").cyan().bold())?;
    writeln!(out, "{}", style(RULE).cyan())?;
    writeln!(
        out,
        "  {} {}",
        style("Started:").bold(),
        report.started_at.format("%Y-%m-%d %H:%M:%S UTC")
    )?;

    if let Some(stats) = &report.stats {
        writeln!(
            out,
            "  {} {} of {} ports checked in {:.2}s, {} open",
            style("Statistics:").bold(),
            stats.results,
            stats.tasks,
            stats.elapsed.as_secs_f64(),
            style(stats.open).green().bold()
        )?;
        if stats.cancelled {
            writeln!(
                out,
                "  {} scan interrupted, {} of {} hosts completed",
                style("Warning:").yellow().bold(),
                stats.hosts_completed,
                stats.hosts
            )?;
        }
    }

    for host in &report.hosts {
        let rows: Vec<&ScanResult> = host
            .results
            .iter()
            .filter(|r| r.open || show_closed)
            .collect();

        writeln!(out)?;
        writeln!(
            out,
            "  {} {}  ({} open / {} checked)",
            style("Host:").bold(),
            style(&host.target).white().bold(),
            host.open_count(),
            host.checked()
        )?;

        if rows.is_empty() {
            writeln!(out, "  {}", style("No open ports.").dim())?;
            continue;
        }

        writeln!(out, "  {}", style(RULE).dim())?;
        writeln!(
            out,
            "  {:>6}  {:^12}  {}",
            style("PORT").bold(),
            style("STATE").bold(),
            style("BANNER").bold()
        )?;
        for result in rows {
            let state = match (result.open, result.error) {
                (true, _) => style("open".to_string()).green().bold(),
                (false, Some(kind)) => style(format!("closed ({})", kind)).red(),
                (false, None) => style("closed".to_string()).red(),
            };
            writeln!(
                out,
                "  {:>6}  {:^12}  {}",
                result.port,
                state,
                style(truncate_string(result.banner_str(), 40)).dim()
            )?;
        }
        writeln!(out, "  {}", style(RULE).dim())?;
    }

    writeln!(out)?;
    Ok(())
}

/// Print an error message.
pub fn print_error(msg: &str) {
    eprintln!("{} {}", style("Error:").red().bold(), msg);
}

/// Print a warning message.
pub fn print_warning(msg: &str) {
    eprintln!("{} {}", style("Warning:").yellow().bold(), msg);
}

/// Print a success message.
pub fn print_success(msg: &str) {
    println!("{} {}", style("✓").green().bold(), msg);
}

/// Truncate to at most `max_chars` characters, adding an ellipsis if cut.
fn truncate_string(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProbeErrorKind;
    use crate::scanner::{ScanStats, ScanTask};
    use crate::types::{Port, Target};
    use chrono::Utc;

    fn summary() -> HostSummary {
        let target = Target::Ip("192.168.1.10".parse().unwrap());
        let ssh = ScanTask::new(target.clone(), Port::new(22).unwrap());
        let http = ScanTask::new(target.clone(), Port::new(80).unwrap());
        HostSummary {
            target,
            index: 0,
            results: vec![
                ScanResult::open(&ssh, Some("SSH-2.0-OpenSSH_9.6".to_string())),
                ScanResult::closed(&http, ProbeErrorKind::ConnectionRefused),
            ],
        }
    }

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("hello", 10), "hello");
        assert_eq!(truncate_string("hello world", 8), "hello...");
        assert_eq!(truncate_string("héllo wörld", 8), "héllo...");
    }

    #[test]
    fn test_open_line() {
        let line = console::strip_ansi_codes(&format_open_line(&summary().results[0])).to_string();
        assert_eq!(line, "[192.168.1.10] OPEN  - 22  | SSH-2.0-OpenSSH_9.6");
    }

    #[test]
    fn test_host_finished_line() {
        let line = console::strip_ansi_codes(&format_host_finished(&summary())).to_string();
        assert_eq!(line, "Finished 192.168.1.10: 1 open / 2 checked");
    }

    #[test]
    fn test_summary_table() {
        let mut report = ScanReport::new(Utc::now());
        report.push(summary());
        report.stats = Some(ScanStats {
            tasks: 2,
            results: 2,
            open: 1,
            hosts: 1,
            hosts_completed: 1,
            cancelled: false,
            elapsed: Duration::from_millis(1500),
            peak_in_flight: 2,
        });

        let mut buf = Vec::new();
        write_summary(&mut buf, &report, false).unwrap();
        let text = console::strip_ansi_codes(&String::from_utf8(buf).unwrap()).to_string();
        assert!(text.contains("2 of 2 ports checked in 1.50s, 1 open"));
        assert!(text.contains("SSH-2.0-OpenSSH_9.6"));
        assert!(!text.contains("closed (refused)"));

        let mut buf = Vec::new();
        write_summary(&mut buf, &report, true).unwrap();
        let text = console::strip_ansi_codes(&String::from_utf8(buf).unwrap()).to_string();
        assert!(text.contains("closed (refused)"));
    }
}
