//! Bounded-concurrency batch scheduling.
//!
//! [`BatchScheduler`] feeds jobs to a [`JobRunner`] on a rayon pool with
//! exactly `parallel` threads, handing every result to a [`ReportSink`] as
//! soon as it is produced.
//!
//! In [`Scheduling::Waves`] mode the job list is cut into consecutive batches
//! of `parallel` jobs. Each batch runs inside a `rayon::scope`, which only
//! returns after every job of the batch has finished and been recorded, so
//! batch K+1 never overlaps batch K. [`Scheduling::Streaming`] drops the
//! barrier and lets the pool pick up the next job as soon as a thread frees up.
//!
//! A [`WorkerScope`] wraps every worker thread of the pool, which is how the
//! impersonation of a run reaches the threads that do the copying.

use crate::error::{Error, Result};
use crate::job::{JobResult, JobRunner, TransferJob};
use crate::options::Scheduling;
use crate::report::ReportSink;
use rayon::prelude::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Callback invoked with `(completed, total)` after each recorded result
pub type ProgressCallback = Box<dyn Fn(u64, u64) + Send + Sync>;

/// Per-thread setup for the worker pool.
///
/// [`enter`](WorkerScope::enter) runs on each worker before it picks up any
/// job; [`exit`](WorkerScope::exit) runs on each worker once the batch is
/// finished.
pub trait WorkerScope: Send + Sync {
    /// Called on a worker thread when it starts
    fn enter(&self);
    /// Called on every worker thread after the last job
    fn exit(&self);
}

/// Totals for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferStats {
    /// Jobs processed
    pub total: usize,
    /// Jobs whose copy succeeded
    pub succeeded: usize,
    /// Jobs that failed
    pub failed: usize,
    /// Bytes written across all successful jobs
    pub bytes_copied: u64,
    /// Results the report sink could not record
    pub report_errors: usize,
    /// Wall time of the batch
    pub duration: Duration,
}

#[derive(Default)]
struct Counters {
    completed: AtomicU64,
    succeeded: AtomicUsize,
    failed: AtomicUsize,
    bytes: AtomicU64,
    report_errors: AtomicUsize,
}

/// Runs a job list with bounded concurrency.
pub struct BatchScheduler {
    parallel: usize,
    scheduling: Scheduling,
    progress: Option<ProgressCallback>,
    worker_scope: Option<Arc<dyn WorkerScope>>,
}

impl std::fmt::Debug for BatchScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchScheduler")
            .field("parallel", &self.parallel)
            .field("scheduling", &self.scheduling)
            .field("progress", &self.progress.is_some())
            .field("worker_scope", &self.worker_scope.is_some())
            .finish()
    }
}

impl BatchScheduler {
    /// Create a scheduler running at most `parallel` jobs at once.
    ///
    /// A `parallel` of 0 is treated as 1.
    #[must_use]
    pub fn new(parallel: usize, scheduling: Scheduling) -> Self {
        Self {
            parallel: parallel.max(1),
            scheduling,
            progress: None,
            worker_scope: None,
        }
    }

    /// Set a progress callback.
    #[must_use]
    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    /// Wrap every worker thread in `scope`.
    #[must_use]
    pub fn with_worker_scope(mut self, scope: Arc<dyn WorkerScope>) -> Self {
        self.worker_scope = Some(scope);
        self
    }

    /// Concurrency cap
    #[must_use]
    pub fn parallel(&self) -> usize {
        self.parallel
    }

    /// Run every job and record every result.
    ///
    /// Individual job failures and report write failures never abort the
    /// batch; they are counted in the returned [`TransferStats`].
    ///
    /// # Errors
    ///
    /// Only fails if the worker pool cannot be created.
    pub fn run_all<R, S>(
        &self,
        jobs: &[TransferJob],
        runner: &R,
        sink: &S,
    ) -> Result<TransferStats>
    where
        R: JobRunner + ?Sized,
        S: ReportSink + ?Sized,
    {
        let start = Instant::now();
        let total = jobs.len() as u64;
        let counters = Counters::default();

        let mut builder = rayon::ThreadPoolBuilder::new()
            .num_threads(self.parallel)
            .thread_name(|i| format!("bulkxfer-worker-{i}"));
        if let Some(scope) = &self.worker_scope {
            let scope = Arc::clone(scope);
            builder = builder.start_handler(move |_| scope.enter());
        }
        let pool = builder.build().map_err(|source| Error::ThreadPool {
            threads: self.parallel,
            source,
        })?;
        if self.worker_scope.is_some() {
            // returns once every worker has started, and so has entered the scope
            pool.broadcast(|_| ());
        }

        let process = |job: &TransferJob| {
            let result = runner.run(job);
            self.record(&result, sink, &counters, total);
        };
        let process = &process;

        match self.scheduling {
            Scheduling::Waves => {
                for (wave, batch) in jobs.chunks(self.parallel).enumerate() {
                    tracing::info!(wave, jobs = batch.len(), "starting wave");
                    pool.scope(|s| {
                        for job in batch {
                            s.spawn(move |_| process(job));
                        }
                    });
                }
            }
            Scheduling::Streaming => {
                tracing::info!(jobs = jobs.len(), "starting streaming run");
                pool.install(|| jobs.par_iter().for_each(process));
            }
        }

        if let Some(scope) = &self.worker_scope {
            pool.broadcast(|_| scope.exit());
        }

        let stats = TransferStats {
            total: jobs.len(),
            succeeded: counters.succeeded.load(Ordering::Relaxed),
            failed: counters.failed.load(Ordering::Relaxed),
            bytes_copied: counters.bytes.load(Ordering::Relaxed),
            report_errors: counters.report_errors.load(Ordering::Relaxed),
            duration: start.elapsed(),
        };
        tracing::info!(
            total = stats.total,
            succeeded = stats.succeeded,
            failed = stats.failed,
            bytes = stats.bytes_copied,
            "batch finished"
        );
        Ok(stats)
    }

    fn record<S>(&self, result: &JobResult, sink: &S, counters: &Counters, total: u64)
    where
        S: ReportSink + ?Sized,
    {
        if result.is_success() {
            counters.succeeded.fetch_add(1, Ordering::Relaxed);
            counters.bytes.fetch_add(result.bytes(), Ordering::Relaxed);
        } else {
            counters.failed.fetch_add(1, Ordering::Relaxed);
        }

        if let Err(e) = sink.record(result) {
            counters.report_errors.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(row = result.row_index, error = %e, "failed to write report row");
        }

        let done = counters.completed.fetch_add(1, Ordering::Relaxed) + 1;
        if let Some(ref callback) = self.progress {
            callback(done, total);
        }
    }
}
