use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::{mpsc, watch};
use tokio::time::timeout;
use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;

use crate::pipeline::{Pipeline, PipelineError, ProcessOutcome};

// Producer side of the alert queue. Cheap to clone, never blocks, so it can be
// called from the file watcher's callback thread.
#[derive(Clone)]
pub struct AlertQueue {
    tx: mpsc::UnboundedSender<PathBuf>,
}

impl AlertQueue {
    // returns false only once the worker is gone
    pub fn enqueue(&self, path: PathBuf) -> bool {
        match self.tx.send(path) {
            Ok(()) => true,
            Err(e) => {
                warn!(file = %e.0.display(), "Worker stopped, alert not queued");
                false
            }
        }
    }
}

// unbounded FIFO between watcher and worker
pub fn alert_queue() -> (AlertQueue, mpsc::UnboundedReceiver<PathBuf>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (AlertQueue { tx }, rx)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub processed: u64, // dequeued and run
    pub reported: u64,  // report file written
    pub empty: u64,     // no candidates, no report
    pub skipped: u64,   // alert file not loaded
    pub failed: u64,    // write error or panic
}

// single consumer - alerts are processed one at a time in arrival order
pub struct Worker {
    rx: mpsc::UnboundedReceiver<PathBuf>,
    pipeline: Pipeline,
    queue_wait: Duration,
    stats: WorkerStats,
}

impl Worker {
    pub fn new(
        rx: mpsc::UnboundedReceiver<PathBuf>,
        pipeline: Pipeline,
        queue_wait: Duration,
    ) -> Self {
        Self {
            rx,
            pipeline,
            queue_wait: queue_wait.max(Duration::from_millis(1)),
            stats: WorkerStats::default(),
        }
    }

    /// Run until `shutdown` flips to true (or its sender is dropped) or the
    /// queue closes. The stop signal is checked only between alerts.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> WorkerStats {
        info!("Background worker started");

        loop {
            if *shutdown.borrow() {
                break;
            }

            let received = tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
                received = timeout(self.queue_wait, self.rx.recv()) => received,
            };

            match received {
                // nothing queued, wait again
                Err(_elapsed) => continue,
                Ok(None) => {
                    info!("Alert queue closed");
                    break;
                }
                Ok(Some(path)) => self.handle(path).await,
            }
        }

        let pending = self.rx.len();
        if pending > 0 {
            warn!(pending, "Worker stopped with alerts still queued");
        }
        info!(
            processed = self.stats.processed,
            reported = self.stats.reported,
            empty = self.stats.empty,
            skipped = self.stats.skipped,
            failed = self.stats.failed,
            "Background worker stopped"
        );
        self.stats
    }

    async fn handle(&mut self, path: PathBuf) {
        let span = info_span!("alert", job_id = %Uuid::new_v4(), file = %path.display());
        self.stats.processed += 1;

        let outcome = AssertUnwindSafe(self.pipeline.process(&path).instrument(span.clone()))
            .catch_unwind()
            .await;

        let _enter = span.enter();
        match outcome {
            Ok(Ok(ProcessOutcome::Reported { path: report, records })) => {
                self.stats.reported += 1;
                info!(report = %report.display(), records, "Completed processing alert");
            }
            Ok(Ok(ProcessOutcome::NoCandidates)) => {
                self.stats.empty += 1;
                info!("Completed processing alert, nothing to report");
            }
            Ok(Err(PipelineError::Load(e))) => {
                self.stats.skipped += 1;
                warn!(error = %e, "Skipping alert");
            }
            Ok(Err(e)) => {
                self.stats.failed += 1;
                error!(error = %e, "Alert processing failed");
            }
            Err(_) => {
                self.stats.failed += 1;
                error!("Alert processing panicked");
            }
        }
    }
}
