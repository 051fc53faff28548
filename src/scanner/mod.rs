//! Scanner module - the concurrent scanning engine.
//!
//! A scan runs as two tokio tasks plus one task per connect attempt:
//!
//! - the dispatcher walks the [`WorkPlan`], takes a slot from the
//!   [`ConcurrencyGate`] for each task and spawns the attempt;
//! - each attempt runs the [`Prober`], gives its slot back and sends its
//!   [`ScanResult`] to the aggregator;
//! - the aggregator owns the [`ResultAggregator`] and forwards
//!   [`ScanEvent`]s to the [`ScanHandle`] over an unbounded channel, so a
//!   slow consumer never holds up the scan.

pub mod aggregator;
pub mod gate;
pub mod plan;
pub mod report;
pub mod resolver;
pub mod tcp;
pub mod traits;

pub use aggregator::{AggregateError, HostPhase, HostSummary, ResultAggregator};
pub use gate::{ConcurrencyGate, GatePermit};
pub use plan::{ScanTask, WorkPlan};
pub use report::{ScanReport, ScanStats};
pub use resolver::HostResolver;
pub use tcp::TcpConnectScanner;
pub use traits::{Prober, ScanConfig, ScanResult};

use crate::error::ProbeErrorKind;
use chrono::{DateTime, Utc};
use futures::{FutureExt, Stream};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, oneshot, watch};

/// Something the scan wants its consumer to know.
#[derive(Debug, Clone)]
pub enum ScanEvent {
    /// One task finished. Arrives in completion order.
    Result(ScanResult),
    /// Every task for a host finished; results are in port order.
    HostFinished(HostSummary),
    /// The scan is over. Always the last event.
    Finished(ScanStats),
}

/// Requests cooperative cancellation of a running scan.
///
/// No new attempts are dispatched after cancellation; attempts already in
/// flight run to completion and still report their results.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    sender: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.sender.borrow()
    }
}

/// Consumer side of a running scan.
#[derive(Debug)]
pub struct ScanHandle {
    events: mpsc::UnboundedReceiver<ScanEvent>,
    cancel: CancelHandle,
    started_at: DateTime<Utc>,
}

impl ScanHandle {
    /// Next event, or `None` once `Finished` has been delivered.
    pub async fn next_event(&mut self) -> Option<ScanEvent> {
        self.events.recv().await
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// The remaining events as a stream.
    pub fn into_stream(self) -> impl Stream<Item = ScanEvent> {
        futures::stream::unfold(self, |mut handle| async move {
            handle.next_event().await.map(|event| (event, handle))
        })
    }

    /// Drain the remaining events into a report.
    pub async fn collect(mut self) -> ScanReport {
        let mut report = ScanReport::new(self.started_at);
        while let Some(event) = self.next_event().await {
            report.record(event);
        }
        report
    }
}

/// Start scanning `plan` in the background.
///
/// Must be called from within a tokio runtime.
pub fn start_scan<P>(plan: WorkPlan, prober: Arc<P>, gate: ConcurrencyGate) -> ScanHandle
where
    P: Prober + ?Sized + 'static,
{
    let (result_tx, result_rx) = mpsc::channel(gate.capacity());
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let (cancel_tx, cancel_rx) = watch::channel(false);
    let (stopped_tx, stopped_rx) = oneshot::channel();

    tracing::info!(
        hosts = plan.targets().len(),
        ports = plan.ports().len(),
        tasks = plan.len(),
        concurrency = gate.capacity(),
        "starting scan"
    );

    let aggregator = ResultAggregator::new(&plan);
    let collector = Collector {
        tasks: plan.len(),
        hosts: plan.targets().len(),
        gate: gate.clone(),
        stopped_early: stopped_rx,
        started: Instant::now(),
    };

    tokio::spawn(collector.run(aggregator, result_rx, event_tx));
    tokio::spawn(async move {
        let stopped_early = dispatch(plan, prober, gate, result_tx, cancel_rx).await;
        let _ = stopped_tx.send(stopped_early);
    });

    ScanHandle {
        events: event_rx,
        cancel: CancelHandle {
            sender: Arc::new(cancel_tx),
        },
        started_at: Utc::now(),
    }
}

/// Run `plan` to completion and return the assembled report.
pub async fn run_scan<P>(plan: WorkPlan, prober: Arc<P>, gate: ConcurrencyGate) -> ScanReport
where
    P: Prober + ?Sized + 'static,
{
    start_scan(plan, prober, gate).collect().await
}

/// Resolves once cancellation is requested. Never resolves if every
/// sender is gone, since nobody is left to ask.
async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    let sender_gone = cancel.wait_for(|&c| c).await.is_err();
    if sender_gone {
        std::future::pending::<()>().await;
    }
}

/// Returns true when cancellation stopped dispatch before every task went
/// out.
async fn dispatch<P>(
    plan: WorkPlan,
    prober: Arc<P>,
    gate: ConcurrencyGate,
    results: mpsc::Sender<ScanResult>,
    mut cancel: watch::Receiver<bool>,
) -> bool
where
    P: Prober + ?Sized + 'static,
{
    let mut dispatched = 0usize;

    for task in plan.tasks() {
        let permit = tokio::select! {
            biased;
            _ = cancelled(&mut cancel) => {
                tracing::info!(dispatched, remaining = plan.len() - dispatched, "scan cancelled");
                return true;
            }
            permit = gate.acquire() => match permit {
                Ok(permit) => permit,
                Err(e) => {
                    tracing::warn!(error = %e, "concurrency gate closed, stopping dispatch");
                    break;
                }
            },
        };

        dispatched += 1;
        let prober = Arc::clone(&prober);
        let results = results.clone();

        tokio::spawn(async move {
            let result = match AssertUnwindSafe(prober.probe(&task)).catch_unwind().await {
                Ok(result) => result,
                Err(_) => {
                    tracing::warn!(task = %task, "probe panicked, recording as failed");
                    ScanResult::closed(&task, ProbeErrorKind::Other)
                }
            };
            drop(permit);

            if results.send(result).await.is_err() {
                tracing::warn!(task = %task, "aggregator gone, result dropped");
            }
        });
    }

    dispatched < plan.len()
}

struct Collector {
    tasks: usize,
    hosts: usize,
    gate: ConcurrencyGate,
    // Resolves once dispatch is over: true if it stopped before the last task.
    stopped_early: oneshot::Receiver<bool>,
    started: Instant,
}

impl Collector {
    /// Drain results until every attempt's sender is gone, then close the
    /// stream with a `Finished` event.
    async fn run(
        self,
        mut aggregator: ResultAggregator,
        mut results: mpsc::Receiver<ScanResult>,
        events: mpsc::UnboundedSender<ScanEvent>,
    ) {
        while let Some(result) = results.recv().await {
            let finished = aggregator.record(result.clone());
            let _ = events.send(ScanEvent::Result(result));

            match finished {
                Ok(Some(summary)) => {
                    tracing::debug!(
                        host = %summary.target,
                        open = summary.open_count(),
                        checked = summary.checked(),
                        "host finished"
                    );
                    let _ = events.send(ScanEvent::HostFinished(summary));
                }
                Ok(None) => {}
                Err(e) => tracing::warn!(error = %e, "ignoring result"),
            }
        }

        let cancelled = self.stopped_early.await.unwrap_or(false);
        for host in aggregator.incomplete_hosts() {
            tracing::info!(host = %host, "host not completed");
        }

        let stats = ScanStats {
            tasks: self.tasks,
            results: aggregator.received(),
            open: aggregator.open(),
            hosts: self.hosts,
            hosts_completed: aggregator.completed_hosts(),
            cancelled,
            elapsed: self.started.elapsed(),
            peak_in_flight: self.gate.peak(),
        };
        tracing::info!(
            results = stats.results,
            open = stats.open,
            elapsed_ms = stats.elapsed.as_millis() as u64,
            cancelled,
            "scan finished"
        );
        let _ = events.send(ScanEvent::Finished(stats));
    }
}
