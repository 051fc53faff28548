//! Work unit generation.
//!
//! A [`WorkPlan`] is the cross product of expanded targets and parsed
//! ports. Tasks come out grouped by target so per-host progress stays
//! contiguous.

use crate::types::{Port, Target};
use std::collections::HashSet;
use std::fmt;

/// One (target, port) pair: the unit of concurrent work.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScanTask {
    pub target: Target,
    pub port: Port,
}

impl ScanTask {
    pub fn new(target: Target, port: Port) -> Self {
        Self { target, port }
    }
}

impl fmt::Display for ScanTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.target {
            Target::Ip(std::net::IpAddr::V6(ip)) => write!(f, "[{}]:{}", ip, self.port),
            target => write!(f, "{}:{}", target, self.port),
        }
    }
}

/// The full set of tasks for one scan.
#[derive(Debug, Clone)]
pub struct WorkPlan {
    targets: Vec<Target>,
    ports: Vec<Port>,
}

impl WorkPlan {
    /// Build a plan. Duplicate targets or ports are dropped, keeping the
    /// first occurrence, so no (target, port) pair is ever issued twice.
    pub fn new(targets: Vec<Target>, ports: Vec<Port>) -> Self {
        Self {
            targets: dedup(targets),
            ports: dedup(ports),
        }
    }

    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    pub fn ports(&self) -> &[Port] {
        &self.ports
    }

    /// Total number of tasks.
    pub fn len(&self) -> usize {
        self.targets.len() * self.ports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every task, all ports of the first target before the second.
    pub fn tasks(&self) -> impl Iterator<Item = ScanTask> + '_ {
        self.targets.iter().flat_map(move |target| {
            self.ports
                .iter()
                .map(move |&port| ScanTask::new(target.clone(), port))
        })
    }
}

fn dedup<T: Clone + Eq + std::hash::Hash>(items: Vec<T>) -> Vec<T> {
    let mut seen = HashSet::with_capacity(items.len());
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{expand_targets, parse_ports};

    #[test]
    fn test_cross_product_size_and_uniqueness() {
        let targets = expand_targets("10.0.0.0/29").unwrap();
        let ports = parse_ports("22,80,440-445").unwrap();
        let plan = WorkPlan::new(targets, ports);

        assert_eq!(plan.len(), 6 * 8);
        let tasks: Vec<ScanTask> = plan.tasks().collect();
        assert_eq!(tasks.len(), plan.len());
        let unique: HashSet<&ScanTask> = tasks.iter().collect();
        assert_eq!(unique.len(), tasks.len());
    }

    #[test]
    fn test_tasks_grouped_by_target() {
        let plan = WorkPlan::new(
            expand_targets("10.0.0.0/30").unwrap(),
            parse_ports("1-3").unwrap(),
        );
        let order: Vec<String> = plan.tasks().map(|t| t.to_string()).collect();
        assert_eq!(
            order,
            vec![
                "10.0.0.1:1", "10.0.0.1:2", "10.0.0.1:3", "10.0.0.2:1", "10.0.0.2:2",
                "10.0.0.2:3",
            ]
        );
    }

    #[test]
    fn test_duplicate_inputs_collapse() {
        let target = Target::hostname("example.com");
        let port = Port::new(443).unwrap();
        let plan = WorkPlan::new(vec![target.clone(), target], vec![port, port]);
        assert_eq!(plan.len(), 1);
    }

    #[test]
    fn test_ipv6_task_display() {
        let task = ScanTask::new(
            Target::Ip("::1".parse().unwrap()),
            Port::new(22).unwrap(),
        );
        assert_eq!(task.to_string(), "[::1]:22");
    }
}
