//! Result aggregation.
//!
//! Folds the connector's out-of-order result stream into per-host
//! summaries. Each incoming result costs a couple of hash lookups and a
//! slot write; a host's summary is handed back the moment its last result
//! arrives, already in port order.

use crate::scanner::plan::WorkPlan;
use crate::scanner::traits::ScanResult;
use crate::types::{Port, Target};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// Where a host is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HostPhase {
    /// Tasks issued, no results yet.
    Pending,
    /// Some but not all results received.
    InProgress,
    /// Every result received and the summary emitted. Terminal.
    Complete,
}

impl fmt::Display for HostPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::InProgress => write!(f, "in progress"),
            Self::Complete => write!(f, "complete"),
        }
    }
}

/// Finalised results for one host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostSummary {
    pub target: Target,
    /// Position of this host in the expanded target list.
    pub index: usize,
    /// One result per port, in port order.
    pub results: Vec<ScanResult>,
}

impl HostSummary {
    pub fn open_count(&self) -> usize {
        self.results.iter().filter(|r| r.open).count()
    }

    pub fn checked(&self) -> usize {
        self.results.len()
    }

    pub fn open_results(&self) -> impl Iterator<Item = &ScanResult> {
        self.results.iter().filter(|r| r.open)
    }
}

/// Why a result could not be recorded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AggregateError {
    #[error("result for unknown target {0}")]
    UnknownTarget(Target),
    #[error("result for unplanned port {port} on {target}")]
    UnknownPort { target: Target, port: Port },
    #[error("duplicate result for {target}:{port}")]
    Duplicate { target: Target, port: Port },
    #[error("result for {0} after its summary was emitted")]
    AlreadyComplete(Target),
}

#[derive(Debug)]
struct HostProgress {
    phase: HostPhase,
    received: usize,
    open: usize,
    // Allocated on the first result and handed off on completion, so only
    // in-progress hosts hold result storage.
    slots: Vec<Option<ScanResult>>,
}

/// Per-host bookkeeping for a single scan.
///
/// Not shared: exactly one task owns the aggregator and feeds it results.
#[derive(Debug)]
pub struct ResultAggregator {
    targets: Vec<Target>,
    target_index: HashMap<Target, usize>,
    port_index: HashMap<Port, usize>,
    hosts: Vec<HostProgress>,
    received: usize,
    open: usize,
    completed: usize,
}

impl ResultAggregator {
    pub fn new(plan: &WorkPlan) -> Self {
        let targets = plan.targets().to_vec();
        let target_index = targets
            .iter()
            .enumerate()
            .map(|(i, t)| (t.clone(), i))
            .collect();
        let port_index = plan
            .ports()
            .iter()
            .enumerate()
            .map(|(i, &p)| (p, i))
            .collect();
        let hosts = targets
            .iter()
            .map(|_| HostProgress {
                phase: HostPhase::Pending,
                received: 0,
                open: 0,
                slots: Vec::new(),
            })
            .collect();

        Self {
            targets,
            target_index,
            port_index,
            hosts,
            received: 0,
            open: 0,
            completed: 0,
        }
    }

    fn ports_per_host(&self) -> usize {
        self.port_index.len()
    }

    /// Record one result. Returns the host's summary when this was the
    /// last result it was waiting for.
    pub fn record(&mut self, result: ScanResult) -> Result<Option<HostSummary>, AggregateError> {
        let total = self.ports_per_host();
        let index = *self
            .target_index
            .get(&result.target)
            .ok_or_else(|| AggregateError::UnknownTarget(result.target.clone()))?;
        let slot = *self
            .port_index
            .get(&result.port)
            .ok_or_else(|| AggregateError::UnknownPort {
                target: result.target.clone(),
                port: result.port,
            })?;

        let host = &mut self.hosts[index];
        match host.phase {
            HostPhase::Complete => return Err(AggregateError::AlreadyComplete(result.target)),
            HostPhase::Pending => {
                host.slots = vec![None; total];
                host.phase = HostPhase::InProgress;
            }
            HostPhase::InProgress => {}
        }

        if host.slots[slot].is_some() {
            return Err(AggregateError::Duplicate {
                target: result.target,
                port: result.port,
            });
        }

        let open = result.open;
        host.slots[slot] = Some(result);
        host.received += 1;
        self.received += 1;
        if open {
            host.open += 1;
            self.open += 1;
        }

        if host.received < total {
            return Ok(None);
        }

        host.phase = HostPhase::Complete;
        self.completed += 1;
        let results = std::mem::take(&mut host.slots)
            .into_iter()
            .flatten()
            .collect();

        Ok(Some(HostSummary {
            target: self.targets[index].clone(),
            index,
            results,
        }))
    }

    /// Current phase of `target`, if it is part of this scan.
    pub fn phase(&self, target: &Target) -> Option<HostPhase> {
        self.target_index
            .get(target)
            .map(|&i| self.hosts[i].phase)
    }

    /// (open, received) counts for `target` so far.
    pub fn progress(&self, target: &Target) -> Option<(usize, usize)> {
        self.target_index
            .get(target)
            .map(|&i| (self.hosts[i].open, self.hosts[i].received))
    }

    pub fn received(&self) -> usize {
        self.received
    }

    pub fn open(&self) -> usize {
        self.open
    }

    pub fn completed_hosts(&self) -> usize {
        self.completed
    }

    /// Targets that have not reached `Complete`, in target order.
    pub fn incomplete_hosts(&self) -> impl Iterator<Item = &Target> {
        self.targets
            .iter()
            .zip(&self.hosts)
            .filter(|(_, h)| h.phase != HostPhase::Complete)
            .map(|(t, _)| t)
    }
}
