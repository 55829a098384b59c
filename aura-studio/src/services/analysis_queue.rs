//! In-memory analysis job queue
//!
//! One worker task drains an unbounded FIFO channel, so analyses run strictly
//! one at a time in trigger order. Jobs are not persisted; anything still
//! queued when the process exits is failed by
//! [`crate::db::analyses::cleanup_stale_analyses`] on the next start.

use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::analysis::run_job;
use super::feedback::FeedbackProvider;

/// Work item handed to the worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisJob {
    pub analysis_id: String,
    pub post_id: String,
}

/// Returned when the worker has stopped
#[derive(Debug, thiserror::Error)]
#[error("Analysis worker is not running")]
pub struct QueueClosed;

/// Handle for enqueuing analysis jobs
#[derive(Clone)]
pub struct AnalysisQueue {
    tx: mpsc::UnboundedSender<AnalysisJob>,
}

impl AnalysisQueue {
    /// Spawn the worker task
    ///
    /// The worker exits once every queue handle is dropped.
    pub fn start(db: SqlitePool, provider: Arc<dyn FeedbackProvider>) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<AnalysisJob>();

        let handle = tokio::spawn(async move {
            tracing::info!(provider = provider.name(), "Analysis worker started");

            while let Some(job) = rx.recv().await {
                tracing::debug!(analysis_id = %job.analysis_id, post_id = %job.post_id, "Dequeued analysis job");
                run_job(&db, provider.as_ref(), &job).await;
            }

            tracing::info!("Analysis worker stopped");
        });

        (Self { tx }, handle)
    }

    /// Add a job; never blocks
    pub fn enqueue(&self, job: AnalysisJob) -> Result<(), QueueClosed> {
        self.tx.send(job).map_err(|_| QueueClosed)
    }
}
