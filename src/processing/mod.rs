//! Job consumption: queue, deduplication, and the worker pool

mod queue;
mod worker;

pub use queue::{JobQueue, SubmitOutcome};
pub use worker::{IngestWorker, PipelineContext};
