//! Job-oriented operations over the Replicate API.

use std::path::Path;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::ReplicateError;
use crate::retry::{retry_transient, RetryConfig};
use crate::transport::{ApiTransport, HttpTransport};
use crate::types::{InferenceInput, InferenceOptions, Job, JobKind, TrainingInput};

/// Base URL of the hosted Replicate API.
pub const REPLICATE_API_URL: &str = "https://api.replicate.com/v1";

/// Default poll interval while waiting on a training job.
const TRAINING_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Default poll interval while waiting on a prediction.
const PREDICTION_POLL_INTERVAL: Duration = Duration::from_secs(2);

// ---------------------------------------------------------------------------
// Poll configuration
// ---------------------------------------------------------------------------

/// How to wait for a job to reach a terminal state.
///
/// `max_wait: None` waits indefinitely, since training jobs are
/// open-ended. Callers that need a deadline set
/// `max_wait`, and every wait can be aborted via the [`CancellationToken`]
/// passed to [`ReplicateClient::poll_until_terminal`].
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Sleep between status fetches.
    pub interval: Duration,
    /// Optional upper bound on the total wait.
    pub max_wait: Option<Duration>,
}

impl PollConfig {
    /// Defaults for training jobs: 30 s interval, no deadline.
    pub fn training() -> Self {
        Self {
            interval: TRAINING_POLL_INTERVAL,
            max_wait: None,
        }
    }

    /// Defaults for predictions: 2 s interval, no deadline.
    pub fn prediction() -> Self {
        Self {
            interval: PREDICTION_POLL_INTERVAL,
            max_wait: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Client for Replicate's asynchronous job endpoints.
///
/// Every operation opens its own request and tracks only its own job id;
/// the client is `Send + Sync` and callers share one instance behind an
/// `Arc`, running independent jobs on separate tasks for concurrency.
pub struct ReplicateClient<T: ApiTransport = HttpTransport> {
    transport: T,
    retry: RetryConfig,
}

impl ReplicateClient<HttpTransport> {
    /// Build a client against the hosted Replicate API.
    pub fn new(api_token: &str) -> Result<Self, ReplicateError> {
        Ok(Self::with_transport(HttpTransport::new(
            REPLICATE_API_URL,
            api_token,
        )?))
    }
}

impl<T: ApiTransport> ReplicateClient<T> {
    /// Build a client over an arbitrary transport.
    pub fn with_transport(transport: T) -> Self {
        Self {
            transport,
            retry: RetryConfig::default(),
        }
    }

    /// Override the retry policy for the submission paths.
    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Upload a zipped dataset, returning the reference URL the training
    /// endpoint consumes.
    ///
    /// Not retried: the upload is not idempotent-safe, so re-uploading
    /// after a failure is the caller's decision.
    pub async fn upload_archive(&self, archive: &Path) -> Result<String, ReplicateError> {
        if !archive.exists() {
            return Err(ReplicateError::ArchiveNotFound(archive.to_path_buf()));
        }

        let response = self.transport.upload_file("/files", archive).await?;
        let url = response
            .get("upload_url")
            .and_then(|u| u.as_str())
            .ok_or_else(|| {
                ReplicateError::InvalidResponse("upload response missing upload_url".into())
            })?;

        tracing::info!(archive = %archive.display(), "Dataset archive uploaded");
        Ok(url.to_string())
    }

    /// Submit a training job. Returns the initial handle without polling.
    pub async fn start_training(
        &self,
        model_owner: &str,
        model_name: &str,
        input: &TrainingInput,
    ) -> Result<Job, ReplicateError> {
        let payload = serde_json::json!({
            "model": format!("{model_owner}/{model_name}"),
            "input": input,
        });

        let job = parse_job(self.transport.post_json("/trainings", &payload).await?)?;
        tracing::info!(job_id = %job.id, status = ?job.status, "Training job submitted");
        Ok(job)
    }

    /// Fetch the current state of a job. A single read, no polling.
    pub async fn get_job(&self, kind: JobKind, job_id: &str) -> Result<Job, ReplicateError> {
        let path = format!("/{}/{}", kind.path_segment(), job_id);
        parse_job(self.transport.get_json(&path).await?)
    }

    /// Re-fetch a job's status until it reaches a terminal state.
    ///
    /// Sleeps `config.interval` between fetches. Transient transport
    /// failures on a status fetch are retried with the same bounded policy
    /// as submissions; an application-level error aborts the wait
    /// immediately. Returns `TimedOut` once `config.max_wait` elapses and
    /// `Cancelled` when the token fires mid-wait.
    pub async fn poll_until_terminal(
        &self,
        kind: JobKind,
        job_id: &str,
        config: &PollConfig,
        cancel: &CancellationToken,
    ) -> Result<Job, ReplicateError> {
        let started = tokio::time::Instant::now();

        loop {
            let job = retry_transient(&self.retry, "job status fetch", || {
                self.get_job(kind, job_id)
            })
            .await?;

            if job.is_terminal() {
                tracing::info!(job_id, status = ?job.status, "Job reached terminal state");
                return Ok(job);
            }

            tracing::debug!(job_id, status = ?job.status, "Job still running");

            if let Some(max_wait) = config.max_wait {
                if started.elapsed() + config.interval >= max_wait {
                    return Err(ReplicateError::TimedOut {
                        job_id: job_id.to_string(),
                        waited: started.elapsed(),
                    });
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => {
                    return Err(ReplicateError::Cancelled {
                        job_id: job_id.to_string(),
                    });
                }
                _ = tokio::time::sleep(config.interval) => {}
            }
        }
    }

    /// Submit an inference job and wait for its result.
    ///
    /// The submission POST is wrapped in bounded retry for transient
    /// transport failures; application-level rejections surface
    /// immediately. If the immediate response is already terminal no
    /// polling occurs; otherwise the job is polled at the prediction
    /// interval until terminal.
    pub async fn run_inference(
        &self,
        version: &str,
        prompt: &str,
        options: &InferenceOptions,
        cancel: &CancellationToken,
    ) -> Result<Job, ReplicateError> {
        let payload = serde_json::json!({
            "version": version,
            "input": InferenceInput::new(prompt, options),
        });

        let response = retry_transient(&self.retry, "prediction submit", || {
            self.transport.post_json("/predictions", &payload)
        })
        .await?;
        let job = parse_job(response)?;

        if job.is_terminal() {
            return Ok(job);
        }

        self.poll_until_terminal(JobKind::Prediction, &job.id, &PollConfig::prediction(), cancel)
            .await
    }
}

/// Parse a job envelope out of a JSON response body.
fn parse_job(value: serde_json::Value) -> Result<Job, ReplicateError> {
    serde_json::from_value(value).map_err(|e| ReplicateError::InvalidResponse(e.to_string()))
}
