// src/worker.rs
//
// Single-worker job queue.
//
// Producers (the webhook handler) push jobs through a cheap `JobQueue` handle;
// one long-lived `Worker` task pops them in FIFO order and runs each to
// completion before looking at the next. That single consumer is the only
// thing serializing access to the ledger: the store itself has no locking.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::jobs::messages;
use crate::jobs::models::{normalize_pool, Job, JobOutcome};
use crate::jobs::packager;
use crate::ledger::{LedgerError, RecordPool};
use crate::notifier::{DynNotifier, NotifierError};

#[derive(Debug, Error)]
pub enum JobError {
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("notifier error: {0}")]
    Notifier(#[from] NotifierError),
}

#[derive(Debug, Error)]
#[error("job queue is closed")]
pub struct QueueClosed;

#[derive(Debug, Default)]
struct QueueState {
    pending: AtomicUsize,
    busy: AtomicBool,
}

impl QueueState {
    /// Decrement `pending`, saturating at zero.
    fn job_left(&self) {
        let _ = self
            .pending
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| Some(n.saturating_sub(1)));
    }
}

/// Point-in-time view of the queue, for health reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueStats {
    pub pending: usize,
    pub busy: bool,
}

/// Producer handle. Cloned into every request handler; never blocks.
#[derive(Clone)]
pub struct JobQueue {
    tx: mpsc::UnboundedSender<Job>,
    state: Arc<QueueState>,
}

impl JobQueue {
    /// Append `job` to the tail of the queue.
    pub fn enqueue(&self, job: Job) -> Result<(), QueueClosed> {
        // Counted before sending so `pending` cannot underflow when the worker dequeues.
        self.state.pending.fetch_add(1, Ordering::SeqCst);
        if let Err(mpsc::error::SendError(job)) = self.tx.send(job) {
            self.state.job_left();
            warn!("Dropping job {}: worker is gone", job.id);
            return Err(QueueClosed);
        }
        Ok(())
    }

    pub fn stats(&self) -> QueueStats {
        QueueStats {
            pending: self.state.pending.load(Ordering::SeqCst),
            busy: self.state.busy.load(Ordering::SeqCst),
        }
    }
}

/// Everything a job needs to run.
#[derive(Clone)]
pub struct WorkerDeps {
    pub pool: RecordPool,
    pub notifier: DynNotifier,
    /// Pause between two document uploads.
    pub delivery_delay: Duration,
}

/// Consumer side: owns the receiving end of the queue.
pub struct Worker {
    rx: mpsc::UnboundedReceiver<Job>,
    state: Arc<QueueState>,
    deps: WorkerDeps,
}

/// Build the queue handle and its worker. Call once at startup.
pub fn job_queue(deps: WorkerDeps) -> (JobQueue, Worker) {
    let (tx, rx) = mpsc::unbounded_channel();
    let state = Arc::new(QueueState::default());

    (
        JobQueue {
            tx,
            state: state.clone(),
        },
        Worker { rx, state, deps },
    )
}

impl Worker {
    /// Drain the queue until `shutdown` fires or every producer is dropped.
    ///
    /// A job that has been dequeued always runs to completion. Jobs still
    /// queued at shutdown are dropped; the queue is not persisted.
    pub async fn run(mut self, shutdown: CancellationToken) {
        info!("Worker started");

        loop {
            let job = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                job = self.rx.recv() => match job {
                    Some(job) => job,
                    None => break,
                },
            };

            self.state.job_left();
            self.state.busy.store(true, Ordering::SeqCst);
            run_job(&self.deps, &job).await;
            self.state.busy.store(false, Ordering::SeqCst);
        }

        self.rx.close();
        let mut dropped = 0usize;
        while let Ok(job) = self.rx.try_recv() {
            dropped += 1;
            self.state.job_left();
            warn!(
                "Dropping queued job {} ({} x{} for user {}) on shutdown",
                job.id, job.category, job.quantity, job.requester_identity
            );
        }
        if dropped > 0 {
            warn!("Worker stopped with {} queued jobs dropped", dropped);
        } else {
            info!("Worker stopped, queue empty");
        }
    }
}

/// Process one job and swallow its error. The caller moves on regardless.
pub async fn run_job(deps: &WorkerDeps, job: &Job) -> Option<JobOutcome> {
    info!(
        "Processing job {}: {} x{} for user {} in chat {}",
        job.id, job.category, job.quantity, job.requester_identity, job.requester_channel
    );

    match process_job(deps, job).await {
        Ok(outcome) => {
            match &outcome {
                JobOutcome::Delivered {
                    delivered,
                    documents,
                    remaining,
                } => info!(
                    "Job {} done: {} records in {} files, {} left in {}",
                    job.id, delivered, documents, remaining, job.category
                ),
                JobOutcome::InsufficientStock {
                    available,
                    requested,
                } => info!(
                    "Job {} skipped: {} of {} requested available",
                    job.id, available, requested
                ),
            }
            Some(outcome)
        }
        Err(err) => {
            error!("Error while processing job {}: {:?}", job.id, err);

            if let Err(e) = deps
                .notifier
                .send_text(job.requester_channel, messages::FAILED)
                .await
            {
                error!("Failed to report failure of job {}: {:?}", job.id, e);
            }
            None
        }
    }
}

/// Take `quantity` records, deliver them privately, write back the rest.
///
/// The pool is only rewritten after every document went out; a failure
/// before that leaves it untouched, a failure after it does not roll back.
pub async fn process_job(deps: &WorkerDeps, job: &Job) -> Result<JobOutcome, JobError> {
    let category = job.category;
    let label = category.display_label();

    deps.notifier
        .send_text(job.requester_channel, messages::PICKED_UP)
        .await?;

    // Reach the private chat before touching the pool: if the user never
    // started the bot this fails here and no records are consumed.
    deps.notifier
        .send_text(job.requester_identity, messages::DELIVERY_STARTING)
        .await?;

    let raw = deps.pool.fetch_column(category).await?;
    let records = normalize_pool(&raw);

    if records.len() < job.quantity {
        warn!(
            "Job {}: insufficient stock for {} (available={}, requested={})",
            job.id,
            category,
            records.len(),
            job.quantity
        );
        deps.notifier
            .send_text(job.requester_channel, messages::INSUFFICIENT_STOCK)
            .await?;

        return Ok(JobOutcome::InsufficientStock {
            available: records.len(),
            requested: job.quantity,
        });
    }

    let (allocated, remainder) = records.split_at(job.quantity);
    let documents = packager::package(allocated, label);

    for (index, document) in documents.iter().enumerate() {
        if index > 0 && !deps.delivery_delay.is_zero() {
            sleep(deps.delivery_delay).await;
        }

        deps.notifier
            .send_document(
                job.requester_identity,
                document.bytes(),
                &document.filename,
                document.content_type,
            )
            .await?;
        info!(
            "Job {}: delivered {} ({}/{})",
            job.id,
            document.filename,
            index + 1,
            documents.len()
        );
    }

    deps.pool.replace_column(category, remainder).await?;

    deps.notifier
        .send_text(job.requester_identity, messages::COMPLETED)
        .await?;

    Ok(JobOutcome::Delivered {
        delivered: allocated.len(),
        documents: documents.len(),
        remaining: remainder.len(),
    })
}
