pub mod job_runner;
pub mod orchestrator;
pub mod page_processor;

pub use job_runner::{DocumentJob, JobStatus, PageResult, PageStatus, assemble, stored_document};
pub use orchestrator::{BatchDocument, BatchGate, BatchRun, BatchSummary, Orchestrator};
