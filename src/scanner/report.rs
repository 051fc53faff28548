//! Whole-scan results, assembled from the event stream.

use crate::scanner::aggregator::HostSummary;
use crate::scanner::traits::ScanResult;
use crate::scanner::ScanEvent;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Totals reported when a scan's event stream closes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanStats {
    /// Tasks in the plan.
    pub tasks: usize,
    /// Results received; equals `tasks` unless the scan was cancelled.
    pub results: usize,
    pub open: usize,
    pub hosts: usize,
    pub hosts_completed: usize,
    /// Cancellation stopped dispatch before every task went out.
    pub cancelled: bool,
    pub elapsed: Duration,
    /// Highest number of simultaneous attempts seen by the gate.
    pub peak_in_flight: usize,
}

/// Every finished host of a scan, in target order.
#[derive(Debug, Clone)]
pub struct ScanReport {
    pub started_at: DateTime<Utc>,
    pub hosts: Vec<HostSummary>,
    pub stats: Option<ScanStats>,
}

impl ScanReport {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            hosts: Vec::new(),
            stats: None,
        }
    }

    /// Add a finished host, keeping hosts in target order.
    pub fn push(&mut self, summary: HostSummary) {
        let at = self.hosts.partition_point(|h| h.index < summary.index);
        self.hosts.insert(at, summary);
    }

    /// Fold one event into the report. Per-result events are ignored; the
    /// host summaries already carry them.
    pub fn record(&mut self, event: ScanEvent) {
        match event {
            ScanEvent::Result(_) => {}
            ScanEvent::HostFinished(summary) => self.push(summary),
            ScanEvent::Finished(stats) => self.stats = Some(stats),
        }
    }

    pub fn cancelled(&self) -> bool {
        self.stats.as_ref().is_some_and(|s| s.cancelled)
    }

    pub fn open_count(&self) -> usize {
        self.hosts.iter().map(HostSummary::open_count).sum()
    }

    /// All results, host order then port order.
    pub fn results(&self) -> impl Iterator<Item = &ScanResult> {
        self.hosts.iter().flat_map(|h| h.results.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProbeErrorKind;
    use crate::scanner::plan::ScanTask;
    use crate::types::{Port, Target};

    fn summary(index: usize, name: &str, open: bool) -> HostSummary {
        let task = ScanTask::new(Target::hostname(name), Port::new(22).unwrap());
        let result = if open {
            ScanResult::open(&task, None)
        } else {
            ScanResult::closed(&task, ProbeErrorKind::Timeout)
        };
        HostSummary {
            target: task.target.clone(),
            index,
            results: vec![result],
        }
    }

    #[test]
    fn test_hosts_kept_in_target_order() {
        let mut report = ScanReport::new(Utc::now());
        report.push(summary(2, "c", true));
        report.push(summary(0, "a", false));
        report.push(summary(1, "b", true));

        let names: Vec<String> = report.hosts.iter().map(|h| h.target.to_string()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert_eq!(report.open_count(), 2);
        assert_eq!(report.results().count(), 3);
        assert!(!report.cancelled());
    }
}
