use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Sender};
use std::thread::{self, JoinHandle};

use crate::catalog::CatalogStore;
use crate::domain::Resource;
use crate::error::SyncError;
use crate::http::ResourceClient;
use crate::pipeline::{SyncOptions, SyncOutcome, SyncPipeline};
use crate::tiles::TileClient;

#[derive(Debug, Clone)]
pub struct SyncJob {
    pub dataset_id: String,
    pub resources: Option<Vec<Resource>>,
    pub options: SyncOptions,
}

pub struct SyncQueue {
    sender: Option<Sender<SyncJob>>,
    worker: Option<JoinHandle<()>>,
    cancelled: Arc<AtomicBool>,
}

impl SyncQueue {
    pub fn start<C, R, T>(pipeline: Arc<SyncPipeline<C, R, T>>) -> Result<Self, SyncError>
    where
        C: CatalogStore + 'static,
        R: ResourceClient + 'static,
        T: TileClient + 'static,
    {
        let (sender, receiver) = mpsc::channel::<SyncJob>();
        let cancelled = pipeline.cancellation_flag();
        let worker = thread::Builder::new()
            .name("natcap-sync-queue".to_string())
            .spawn(move || {
                for job in receiver {
                    if pipeline.is_cancelled() {
                        tracing::debug!(dataset = %job.dataset_id, "dropping queued job, cancelled");
                        continue;
                    }
                    match run_job(&pipeline, &job) {
                        Ok(outcome) => {
                            tracing::debug!(dataset = %job.dataset_id, ?outcome, "job finished")
                        }
                        Err(error) => {
                            tracing::error!(dataset = %job.dataset_id, error = %error, "job failed")
                        }
                    }
                }
            })
            .map_err(|err| SyncError::WorkerPool(err.to_string()))?;

        Ok(Self {
            sender: Some(sender),
            worker: Some(worker),
            cancelled,
        })
    }

    pub fn submit(
        &self,
        dataset_id: impl Into<String>,
        resources: Vec<Resource>,
    ) -> Result<(), SyncError> {
        self.submit_job(SyncJob {
            dataset_id: dataset_id.into(),
            resources: Some(resources),
            options: SyncOptions::default(),
        })
    }

    pub fn submit_job(&self, job: SyncJob) -> Result<(), SyncError> {
        let sender = self.sender.as_ref().ok_or(SyncError::QueueClosed)?;
        sender.send(job).map_err(|_| SyncError::QueueClosed)
    }

    pub fn shutdown(mut self) {
        self.close();
    }

    /// Like `shutdown`, but in-flight and queued jobs discard their results.
    pub fn abort(mut self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.close();
    }

    fn close(&mut self) {
        self.sender.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::error!("sync queue worker panicked");
            }
        }
    }
}

impl Drop for SyncQueue {
    fn drop(&mut self) {
        self.close();
    }
}

fn run_job<C, R, T>(
    pipeline: &SyncPipeline<C, R, T>,
    job: &SyncJob,
) -> Result<SyncOutcome, SyncError>
where
    C: CatalogStore,
    R: ResourceClient,
    T: TileClient,
{
    let dataset = pipeline.catalog().get_dataset(&job.dataset_id)?;
    let resources = job.resources.as_deref().unwrap_or(&dataset.resources);
    pipeline.update_dataset(&dataset, resources, job.options)
}
