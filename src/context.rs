//! Everything a run needs, held in one place.

use crate::batch::{BatchScheduler, TransferStats};
use crate::error::Result;
use crate::impersonate::ImpersonationGuard;
use crate::job::{JobRunner, TransferJob};
use crate::report::ReportSink;
use std::sync::Arc;

/// The runner, the scheduler and the impersonation scope of one run.
///
/// Consumed by [`execute`](RunContext::execute). The scheduler's workers
/// impersonate the guard's account for the whole batch; the guard itself is
/// dropped when the batch returns, whether it succeeded or not.
#[derive(Debug)]
pub struct RunContext<R: JobRunner> {
    runner: R,
    scheduler: BatchScheduler,
    guard: Option<ImpersonationGuard>,
}

impl<R: JobRunner> RunContext<R> {
    /// Assemble a context. `guard` is the impersonation to hold for the run.
    pub fn new(runner: R, scheduler: BatchScheduler, guard: Option<ImpersonationGuard>) -> Self {
        let scheduler = match &guard {
            Some(guard) => scheduler.with_worker_scope(Arc::new(guard.worker_scope())),
            None => scheduler,
        };
        Self {
            runner,
            scheduler,
            guard,
        }
    }

    /// Account being impersonated, if any
    #[must_use]
    pub fn impersonating(&self) -> Option<&str> {
        self.guard.as_ref().map(ImpersonationGuard::user)
    }

    /// Run every job, then release the impersonation.
    ///
    /// # Errors
    ///
    /// Propagates scheduler errors (worker pool creation).
    pub fn execute<S: ReportSink + ?Sized>(
        self,
        jobs: &[TransferJob],
        sink: &S,
    ) -> Result<TransferStats> {
        let Self {
            runner,
            scheduler,
            guard,
        } = self;
        let stats = scheduler.run_all(jobs, &runner, sink);
        drop(guard);
        stats
    }
}
