//! Worker loops that drain the job queue.
//!
//! Each worker holds one job at a time and drives it to a terminal state;
//! with several workers, unrelated jobs proceed in parallel with no
//! coordination beyond the queue's at-most-one delivery.  Workers shut
//! down when the channel closes (every producer dropped) and the backlog
//! is drained.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{error, info};

use store::{ExecutionStatus, JobStatus, Store};

use crate::models::Job;
use crate::runner::ExecutionRunner;

/// Spawn `count` worker tasks over a shared queue consumer.
pub fn spawn_workers(
    count: usize,
    consumer: queue::Consumer<Job>,
    runner: Arc<ExecutionRunner>,
    store: Arc<dyn Store>,
) -> Vec<JoinHandle<()>> {
    (0..count)
        .map(|worker_id| {
            let consumer = consumer.clone();
            let runner = Arc::clone(&runner);
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                worker_loop(worker_id, consumer, runner, store).await;
            })
        })
        .collect()
}

async fn worker_loop(
    worker_id: usize,
    consumer: queue::Consumer<Job>,
    runner: Arc<ExecutionRunner>,
    store: Arc<dyn Store>,
) {
    info!(worker_id, "worker started");

    while let Some(job) = consumer.recv().await {
        info!(worker_id, execution_id = %job.execution_id, "job dequeued");

        if let Err(err) = store.update_job_status(job.id, JobStatus::Processing).await {
            error!(worker_id, job_id = %job.id, "could not mark job processing: {err}");
        }

        let journal_status = match runner.run(&job).await {
            Ok(ExecutionStatus::Completed) => JobStatus::Completed,
            Ok(_) => JobStatus::Failed,
            Err(err) => {
                error!(worker_id, execution_id = %job.execution_id, "run aborted: {err}");
                JobStatus::Failed
            }
        };

        if let Err(err) = store.update_job_status(job.id, journal_status).await {
            error!(worker_id, job_id = %job.id, "could not close out job: {err}");
        }
    }

    info!(worker_id, "worker shutting down");
}
