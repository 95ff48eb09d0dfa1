#![allow(clippy::missing_docs_in_private_items, clippy::result_large_err)]

pub mod fetcher;
pub mod ingestor;
pub mod pipeline;

pub use pipeline::ImportPipeline;

use std::sync::Arc;

use common::error::AppError;
use tokio::{
    sync::{mpsc, Mutex},
    task::JoinHandle,
};
use tracing::{error, info};

/// Cloneable handle for queueing job ids onto the worker pool.
#[derive(Clone)]
pub struct ImportDispatcher {
    tx: mpsc::Sender<String>,
}

impl ImportDispatcher {
    /// Queue a job for execution. Applies backpressure when the queue is
    /// full and errors once the pool has shut down.
    pub async fn dispatch(&self, job_id: String) -> Result<(), AppError> {
        self.tx.send(job_id).await.map_err(|_| {
            AppError::InternalError("import worker pool is not running".to_string())
        })
    }
}

/// Fixed-size pool of workers pulling job ids off a bounded queue.
pub struct ImportWorkerPool {
    tx: mpsc::Sender<String>,
    handles: Vec<JoinHandle<()>>,
}

impl ImportWorkerPool {
    pub fn start(pipeline: Arc<ImportPipeline>, workers: usize, queue_depth: usize) -> Self {
        let (tx, rx) = mpsc::channel::<String>(queue_depth.max(1));
        let rx = Arc::new(Mutex::new(rx));

        let mut handles = Vec::with_capacity(workers.max(1));
        for i in 0..workers.max(1) {
            let worker_id = format!("import-worker-{i}");
            let rx = rx.clone();
            let pipeline = pipeline.clone();

            handles.push(tokio::spawn(async move {
                loop {
                    // Hold the lock only while receiving so other workers
                    // stay free to pick up jobs during a long import.
                    let next = { rx.lock().await.recv().await };
                    let Some(job_id) = next else {
                        break;
                    };

                    info!(%worker_id, %job_id, "picked up import job");
                    match pipeline.run_job(&job_id).await {
                        Ok(job) => {
                            info!(
                                %worker_id,
                                %job_id,
                                status = job.status.as_str(),
                                "import job finished"
                            );
                        }
                        Err(err) => {
                            error!(%worker_id, %job_id, error = %err, "import job could not be executed");
                        }
                    }
                }
                info!(%worker_id, "import worker stopped");
            }));
        }

        Self { tx, handles }
    }

    pub fn dispatcher(&self) -> ImportDispatcher {
        ImportDispatcher {
            tx: self.tx.clone(),
        }
    }

    /// Drain queued jobs and wait for the workers to exit. Every
    /// [`ImportDispatcher`] must be dropped first; the queue only closes
    /// once the last sender is gone.
    pub async fn shutdown(self) {
        drop(self.tx);
        for handle in self.handles {
            if let Err(err) = handle.await {
                error!(error = %err, "import worker panicked");
            }
        }
    }
}
