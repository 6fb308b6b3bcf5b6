//! The training flow: archive, upload, submit, wait, persist.

use std::path::PathBuf;

use tokio_util::sync::CancellationToken;

use littleme_core::error::CoreError;
use littleme_core::version_file;
use littleme_replicate::{
    ApiTransport, Job, JobKind, JobStatus, PollConfig, ReplicateClient, ReplicateError,
    TrainingInput,
};

use crate::archive;

/// Failures of a training run.
#[derive(Debug, thiserror::Error)]
pub enum TrainError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Replicate(#[from] ReplicateError),

    /// The job reached a terminal state other than `succeeded`.
    #[error("training job {id} ended {status:?}: {message}")]
    Failed {
        id: String,
        status: JobStatus,
        message: String,
    },

    /// The job succeeded but its output carried no version id.
    #[error("training job {0} succeeded without a version in its output")]
    MissingVersion(String),
}

/// Everything a training run needs, assembled from CLI arguments.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub dataset_dir: PathBuf,
    pub archive_path: PathBuf,
    pub model_owner: String,
    pub model_name: String,
    pub max_train_steps: u32,
    pub resolution: String,
    pub output_json: PathBuf,
    pub poll: PollConfig,
}

/// Execute a full training run, returning the new model version id.
///
/// The version id is also persisted to `config.output_json` as
/// `{ "lora_version": "<id>" }` before returning.
pub async fn run<T: ApiTransport>(
    client: &ReplicateClient<T>,
    config: &RunConfig,
    cancel: &CancellationToken,
) -> Result<String, TrainError> {
    if let Some(parent) = config.archive_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|source| CoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
    }

    let archive_path = archive::zip_dataset(&config.dataset_dir, &config.archive_path)?;
    let dataset_url = client.upload_archive(&archive_path).await?;

    let input = TrainingInput {
        input_images: dataset_url,
        resolution: Some(config.resolution.clone()),
        max_train_steps: Some(config.max_train_steps),
        seed: None,
    };
    let job = client
        .start_training(&config.model_owner, &config.model_name, &input)
        .await?;
    tracing::info!(job_id = %job.id, "Training started");

    let final_state = if job.is_terminal() {
        job
    } else {
        client
            .poll_until_terminal(JobKind::Training, &job.id, &config.poll, cancel)
            .await?
    };

    let version = require_version(&final_state)?;
    version_file::write(&config.output_json, version).map_err(TrainError::Core)?;
    tracing::info!(
        job_id = %final_state.id,
        version,
        output = %config.output_json.display(),
        "LoRA version persisted",
    );

    Ok(version.to_string())
}

/// Extract the version id from a succeeded job, or explain why not.
fn require_version(job: &Job) -> Result<&str, TrainError> {
    if job.status != JobStatus::Succeeded {
        return Err(TrainError::Failed {
            id: job.id.clone(),
            status: job.status,
            message: job
                .error
                .clone()
                .unwrap_or_else(|| "no error details".to_string()),
        });
    }
    job.output_version()
        .ok_or_else(|| TrainError::MissingVersion(job.id.clone()))
}
