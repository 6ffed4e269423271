// 全文書の逐次処理: 1文書の失敗は他の文書に影響しない

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info, warn};

use crate::cancel::CancellationSource;
use crate::error::InkScrubError;
use crate::pipeline::job_runner::{DocumentJob, JobRunner, JobStatus, restore_job};
use crate::render::PageSource;
use crate::render::rasterizer::Rasterizer;
use crate::session::SessionStore;
use crate::tuning::resolver::TuningResolver;

/// Running flag shared by everything that may start a batch.
#[derive(Debug, Clone, Default)]
pub struct BatchGate {
    running: Arc<AtomicBool>,
}

/// Releases the gate when dropped.
#[derive(Debug)]
pub struct BatchGuard {
    running: Arc<AtomicBool>,
}

impl BatchGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the gate.
    ///
    /// # Errors
    /// Returns `InkScrubError::BatchError` if a batch is already running.
    pub fn try_begin(&self) -> crate::error::Result<BatchGuard> {
        self.running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| InkScrubError::batch("a batch is already running"))?;
        Ok(BatchGuard {
            running: Arc::clone(&self.running),
        })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl Drop for BatchGuard {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

/// One document handed to [`Orchestrator::process_all`].
pub struct BatchDocument<'a> {
    pub name: String,
    pub source: &'a dyn PageSource,
    /// Working scale for every page of this document.
    pub scale: f32,
}

/// Ordered jobs of the current (or last) batch.
#[derive(Debug, Clone, Default)]
pub struct BatchRun {
    pub jobs: Vec<DocumentJob>,
}

impl BatchRun {
    pub fn job(&self, id: &str) -> Option<&DocumentJob> {
        self.jobs.iter().find(|j| j.id == id)
    }

    pub fn summary(&self) -> BatchSummary {
        let mut summary = BatchSummary::default();
        for job in &self.jobs {
            match job.status {
                JobStatus::Done => summary.done += 1,
                JobStatus::Failed => summary.failed += 1,
                JobStatus::Cancelled => summary.cancelled += 1,
                JobStatus::Pending | JobStatus::Processing => {}
            }
        }
        summary
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub done: usize,
    pub failed: usize,
    pub cancelled: usize,
}

impl BatchSummary {
    pub fn all_done(&self) -> bool {
        self.failed == 0 && self.cancelled == 0
    }
}

/// Thread-safe handle for observing and cancelling a batch from elsewhere.
#[derive(Debug, Clone)]
pub struct OrchestratorHandle {
    gate: BatchGate,
    jobs: CancellationSource,
    render: CancellationSource,
}

impl OrchestratorHandle {
    /// Cancel the batch: the current page's result is discarded and every
    /// remaining document ends `cancelled`.
    pub fn cancel(&self) {
        self.jobs.cancel();
        self.render.cancel();
    }

    pub fn is_running(&self) -> bool {
        self.gate.is_running()
    }
}

/// Runs the cleaning pipeline over a work set of documents.
pub struct Orchestrator {
    rasterizer: Rasterizer,
    resolver: TuningResolver,
    store: Option<Box<dyn SessionStore>>,
    gate: BatchGate,
    jobs: CancellationSource,
    resume: bool,
    current: Option<BatchRun>,
}

impl Orchestrator {
    pub fn new(resolver: TuningResolver) -> Self {
        Self {
            rasterizer: Rasterizer::new(),
            resolver,
            store: None,
            gate: BatchGate::new(),
            jobs: CancellationSource::new(),
            resume: false,
            current: None,
        }
    }

    #[must_use]
    pub fn with_store(mut self, store: Box<dyn SessionStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Share a running flag with other orchestrators.
    #[must_use]
    pub fn with_gate(mut self, gate: BatchGate) -> Self {
        self.gate = gate;
        self
    }

    /// Pick up jobs found in the session store instead of starting over.
    #[must_use]
    pub fn resume_from_store(mut self, resume: bool) -> Self {
        self.resume = resume;
        self
    }

    pub fn handle(&self) -> OrchestratorHandle {
        OrchestratorHandle {
            gate: self.gate.clone(),
            jobs: self.jobs.clone(),
            render: self.rasterizer.cancellation(),
        }
    }

    pub fn cancel(&self) {
        self.handle().cancel();
    }

    pub fn is_running(&self) -> bool {
        self.gate.is_running()
    }

    pub fn store(&self) -> Option<&dyn SessionStore> {
        self.store.as_deref()
    }

    pub fn batch(&self) -> Option<&BatchRun> {
        self.current.as_ref()
    }

    /// Process every document in order, one at a time.
    ///
    /// Each job reaches a terminal state before the next starts; a failed
    /// document does not stop the rest.
    ///
    /// # Errors
    /// Returns `InkScrubError::BatchError` if a batch is already running.
    pub fn process_all(
        &mut self,
        documents: &[BatchDocument<'_>],
    ) -> crate::error::Result<BatchSummary> {
        let _guard = self.gate.try_begin()?;
        let token = self.jobs.issue();
        info!(documents = documents.len(), "batch started");

        let mut run = BatchRun::default();
        for document in documents {
            let mut job = self.initial_job(document);
            info!(job = %job.name, id = %job.id, "processing document");

            let mut runner = JobRunner {
                rasterizer: &mut self.rasterizer,
                resolver: &self.resolver,
                store: self.store.as_deref(),
                scale: document.scale,
            };
            if token.is_cancelled() {
                job.cancelled = true;
                job.status = JobStatus::Cancelled;
            } else if job.status == JobStatus::Done {
                debug!(job = %job.name, "restored job already done");
            } else if self.resume && !job.pages.is_empty() {
                runner.resume(&mut job, document.source, &token);
            } else {
                runner.run(&mut job, document.source, &token);
            }

            match job.status {
                JobStatus::Failed => warn!(
                    job = %job.name,
                    error = job.error.as_deref().unwrap_or(""),
                    "document failed"
                ),
                status => info!(job = %job.name, ?status, "document finished"),
            }
            run.jobs.push(job);
        }

        let summary = run.summary();
        info!(
            done = summary.done,
            failed = summary.failed,
            cancelled = summary.cancelled,
            "batch finished"
        );
        self.current = Some(run);
        Ok(summary)
    }

    fn initial_job(&self, document: &BatchDocument<'_>) -> DocumentJob {
        let fresh = DocumentJob::for_source(document.source, document.name.clone());
        if !self.resume {
            return fresh;
        }
        let Some(store) = self.store.as_deref() else {
            return fresh;
        };
        match restore_job(store, &fresh.id, document.scale) {
            Ok(Some(mut job)) => {
                job.name = fresh.name;
                job
            }
            Ok(None) => fresh,
            Err(e) => {
                warn!(job = %fresh.name, error = %e, "could not restore job, starting over");
                fresh
            }
        }
    }

    /// Drop the current batch, the render cache and everything persisted.
    ///
    /// # Errors
    /// Returns `InkScrubError::BatchError` while a batch is running.
    pub fn reset(&mut self) -> crate::error::Result<()> {
        if self.gate.is_running() {
            return Err(InkScrubError::batch("cannot reset while a batch is running"));
        }
        self.current = None;
        self.rasterizer.invalidate();
        if let Some(store) = self.store.as_deref()
            && let Err(e) = store.clear()
        {
            warn!(error = %e, "failed to clear the session store");
        }
        Ok(())
    }
}
