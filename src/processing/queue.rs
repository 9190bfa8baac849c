//! In-process job queue with doc-id deduplication and redelivery
//!
//! Stands in for the durable queue collaborator: at most one in-flight job per
//! document id, and redelivery with exponential backoff after a thrown error,
//! up to a bounded attempt count.

use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::config::ProcessingConfig;
use crate::error::{Error, Result};
use crate::types::IngestJob;

/// Result of a submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The job was enqueued
    Enqueued,
    /// A job for this doc id is already in flight; nothing was enqueued
    Duplicate,
}

/// Job queue shared between the submission boundary and the worker pool
pub struct JobQueue {
    sender: mpsc::Sender<IngestJob>,
    /// Delivery attempt per in-flight doc id
    in_flight: DashMap<Uuid, u32>,
    max_attempts: u32,
    backoff: Duration,
}

impl JobQueue {
    /// Create the queue and the receiver handed to the worker pool
    pub fn new(config: &ProcessingConfig) -> (Arc<Self>, mpsc::Receiver<IngestJob>) {
        let (sender, receiver) = mpsc::channel(1000);
        let queue = Arc::new(Self {
            sender,
            in_flight: DashMap::new(),
            max_attempts: config.max_delivery_attempts.max(1),
            backoff: Duration::from_secs(config.retry_backoff_secs),
        });
        (queue, receiver)
    }

    /// Submit a job, deduplicating by doc id
    pub async fn submit(&self, job: IngestJob) -> Result<SubmitOutcome> {
        let doc_id = job.doc_id;

        let is_new = match self.in_flight.entry(doc_id) {
            dashmap::mapref::entry::Entry::Occupied(_) => false,
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                vacant.insert(1);
                true
            }
        };
        if !is_new {
            tracing::info!(%doc_id, "Job already in flight, submission deduplicated");
            return Ok(SubmitOutcome::Duplicate);
        }

        if let Err(e) = self.sender.send(job).await {
            self.in_flight.remove(&doc_id);
            return Err(Error::Queue(format!("failed to enqueue job: {}", e)));
        }
        Ok(SubmitOutcome::Enqueued)
    }

    /// Clear the in-flight entry once a job reached a terminal outcome
    pub fn settle(&self, doc_id: Uuid) {
        self.in_flight.remove(&doc_id);
    }

    /// Whether a job for this doc id is currently in flight
    pub fn is_in_flight(&self, doc_id: Uuid) -> bool {
        self.in_flight.contains_key(&doc_id)
    }

    /// Number of in-flight jobs
    pub fn len(&self) -> usize {
        self.in_flight.len()
    }

    pub fn is_empty(&self) -> bool {
        self.in_flight.is_empty()
    }

    /// Redeliver a job whose processing threw, honouring the backoff policy.
    ///
    /// Gives up (and settles) once `max_delivery_attempts` deliveries have
    /// happened; the terminal FAILED status has already been persisted by the
    /// worker at that point.
    pub fn redeliver(self: &Arc<Self>, job: IngestJob) {
        let doc_id = job.doc_id;
        let attempt = self.in_flight.get(&doc_id).map(|a| *a).unwrap_or(1);

        if attempt >= self.max_attempts {
            tracing::error!(
                %doc_id,
                attempts = attempt,
                "Giving up on job after max delivery attempts"
            );
            self.settle(doc_id);
            return;
        }

        self.in_flight.insert(doc_id, attempt + 1);
        let delay = self.backoff * 2u32.saturating_pow(attempt - 1);
        tracing::warn!(
            %doc_id,
            attempt = attempt + 1,
            delay_secs = delay.as_secs(),
            "Scheduling job redelivery"
        );

        let queue = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if queue.sender.send(job).await.is_err() {
                tracing::error!(%doc_id, "Worker pool is gone, dropping redelivery");
                queue.settle(doc_id);
            }
        });
    }
}
