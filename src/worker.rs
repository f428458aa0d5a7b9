//! Single synthesis worker that owns the model and drains a job queue.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::config::JobInput;
use crate::error::{TtsError, TtsResult};
use crate::pipeline::{ChunkedPipeline, SynthesisResponse};
use crate::tts::{ModelHandle, SpeechSynthesizer};

struct JobRequest {
    input: JobInput,
    reply: oneshot::Sender<TtsResult<SynthesisResponse>>,
}

/// Submits jobs to the synthesis worker. Cheap to clone.
#[derive(Clone)]
pub struct WorkerHandle {
    tx: mpsc::Sender<JobRequest>,
}

impl WorkerHandle {
    /// Queue a job and wait for its result.
    ///
    /// # Errors
    /// Returns [`TtsError::WorkerUnavailable`] if the worker has stopped,
    /// otherwise whatever the pipeline reports for this job.
    pub async fn submit(&self, input: JobInput) -> TtsResult<SynthesisResponse> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(JobRequest { input, reply }).await.map_err(|_| TtsError::WorkerUnavailable)?;
        rx.await.map_err(|_| TtsError::WorkerUnavailable)?
    }
}

/// Spawn the synthesis worker.
///
/// Jobs run one at a time, each on the blocking thread pool. The worker stops
/// when `cancel` fires or every [`WorkerHandle`] is dropped, and releases the
/// model on the way out.
///
/// # Arguments
/// * `pipeline` - Shared pipeline components
/// * `model` - Loaded model; the worker becomes its owner
/// * `cancel` - Stops the worker and cancels the running job between chunks
/// * `queue_size` - Jobs that may wait before `submit` applies backpressure
///
/// # Returns
/// The submission handle and the worker task.
pub fn spawn_synthesis_worker<E>(pipeline: Arc<ChunkedPipeline>, model: ModelHandle<E>, cancel: CancellationToken, queue_size: usize) -> (WorkerHandle, JoinHandle<()>)
where
    E: SpeechSynthesizer + 'static,
{
    let (tx, mut rx) = mpsc::channel::<JobRequest>(queue_size.max(1));

    let task = tokio::spawn(async move {
        info!("🚀 Synthesis worker started");

        loop {
            let job = tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Synthesis worker shutting down");
                    break;
                }
                job = rx.recv() => match job {
                    Some(job) => job,
                    None => {
                        debug!("All job handles dropped");
                        break;
                    }
                },
            };

            let JobRequest { input, reply } = job;
            let (pipeline, model, job_cancel) = (pipeline.clone(), model.clone(), cancel.clone());

            let result = match tokio::task::spawn_blocking(move || pipeline.run(&input, &model, &job_cancel)).await {
                Ok(result) => result,
                Err(e) => {
                    error!("Synthesis job panicked: {}", e);
                    Err(TtsError::WorkerUnavailable)
                }
            };

            if reply.send(result).is_err() {
                debug!("Job submitter went away before the result was ready");
            }
        }

        model.release();
    });

    (WorkerHandle { tx }, task)
}
