//! Bounded execution of uploads.
//!
//! Each job runs on its own tokio task but only proceeds once it holds a
//! permit from a shared semaphore, so at most `pool_size` uploads talk to the
//! drive at once. Jobs beyond that wait for a permit in submission order.

use camdrive_core::models::UploadedFile;
use camdrive_core::AppError;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

use super::types::UploadJob;

/// Completion handle for a submitted job; resolves exactly once.
pub struct UploadHandle<T = UploadedFile> {
    inner: JoinHandle<Result<T, AppError>>,
}

impl<T> Future for UploadHandle<T> {
    type Output = Result<T, AppError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.inner).poll(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(e)) if e.is_cancelled() => Poll::Ready(Err(AppError::UploadFailed(
                "upload task was cancelled".to_string(),
            ))),
            Poll::Ready(Err(e)) => {
                tracing::error!(error = %e, "Upload task panicked");
                Poll::Ready(Err(AppError::UploadFailed(
                    "upload task terminated unexpectedly".to_string(),
                )))
            }
        }
    }
}

#[derive(Clone)]
pub struct UploadExecutor {
    semaphore: Arc<Semaphore>,
    pool_size: usize,
    call_timeout: Duration,
}

impl UploadExecutor {
    pub fn new(pool_size: usize, call_timeout: Duration) -> Self {
        let pool_size = pool_size.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(pool_size)),
            pool_size,
            call_timeout,
        }
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Permits currently free
    pub fn available_workers(&self) -> usize {
        self.semaphore.available_permits()
    }

    pub fn call_timeout(&self) -> Duration {
        self.call_timeout
    }

    /// Run `work` on the pool once a worker is free.
    ///
    /// The permit is held until `work` completes, so every remote call inside
    /// it counts against the pool. `work` bounds its own remote calls.
    pub fn spawn<T, F>(&self, work: F) -> UploadHandle<T>
    where
        T: Send + 'static,
        F: Future<Output = Result<T, AppError>> + Send + 'static,
    {
        let semaphore = self.semaphore.clone();

        let inner = tokio::spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .map_err(|_| AppError::UploadFailed("upload pool is shut down".to_string()))?;
            work.await
        });

        UploadHandle { inner }
    }

    /// Upload the job's content and metadata.
    pub fn submit(&self, job: UploadJob) -> UploadHandle {
        self.spawn(run_upload(job, self.call_timeout))
    }
}

/// Write one file, bounded by `call_timeout`. Callers already hold a permit.
pub(super) async fn run_upload(job: UploadJob, call_timeout: Duration) -> Result<UploadedFile, AppError> {
    let UploadJob {
        client,
        metadata,
        content_type,
        content,
    } = job;
    let start = Instant::now();
    let size = content.len();

    let uploaded = tokio::time::timeout(call_timeout, client.create_file(&metadata, &content_type, content))
        .await
        .map_err(|_| {
            AppError::UploadFailed(format!("upload timed out after {}s", call_timeout.as_secs()))
        })?
        .map_err(|e| AppError::UploadFailed(e.to_string()))?;

    tracing::debug!(
        file_id = %uploaded.id,
        size_bytes = size,
        duration_ms = start.elapsed().as_secs_f64() * 1000.0,
        "Upload job finished"
    );
    Ok(uploaded)
}
