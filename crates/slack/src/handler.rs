//! Prompt handling: run inference and reply into the thread.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use littleme_replicate::{InferenceOptions, JobStatus, ReplicateClient, ReplicateError};

use crate::reply::{ImageAttachment, SlackClient};

/// Aspect ratio used for every generated photo.
const ASPECT_RATIO: &str = "3:4";

/// Failures while producing an image for a prompt.
///
/// These never escape [`Generator::generate_and_reply`]; they exist so
/// the error reply can carry a useful message.
#[derive(Debug, thiserror::Error)]
enum GenerateError {
    #[error(transparent)]
    Replicate(#[from] ReplicateError),

    #[error("the model returned no image URLs")]
    NoOutput,

    #[error("generation {status:?}: {message}")]
    JobFailed { status: JobStatus, message: String },
}

/// Turns prompts into image replies.
///
/// Owns shared handles to the Replicate and Slack clients; cheap to clone
/// into per-prompt tasks.
#[derive(Clone)]
pub struct Generator {
    replicate: Arc<ReplicateClient>,
    slack: Arc<SlackClient>,
    lora_version: String,
}

impl Generator {
    pub fn new(
        replicate: Arc<ReplicateClient>,
        slack: Arc<SlackClient>,
        lora_version: String,
    ) -> Self {
        Self {
            replicate,
            slack,
            lora_version,
        }
    }

    /// Generate an image for `prompt` and post the result into
    /// `channel`/`thread_ts`.
    ///
    /// All failures are converted into a plain-text error reply; nothing
    /// propagates to the spawning task. Each failure is logged exactly
    /// once, here.
    pub async fn generate_and_reply(
        &self,
        channel: &str,
        thread_ts: Option<&str>,
        prompt: &str,
        cancel: &CancellationToken,
    ) {
        tracing::info!(channel, prompt, "Generating image");

        match self.generate(prompt, cancel).await {
            Ok(image_url) => {
                tracing::info!(channel, %image_url, "Generation succeeded");
                let attachment = ImageAttachment {
                    image_url: image_url.clone(),
                    title: prompt.to_string(),
                };
                let text = format!("Here is your imaginative childhood photo:\n{image_url}");
                self.reply(channel, thread_ts, &text, Some(&attachment))
                    .await;
            }
            Err(e) => {
                tracing::error!(channel, prompt, error = %e, "Generation failed");
                let text = format!("Generation failed: {e}");
                self.reply(channel, thread_ts, &text, None).await;
            }
        }
    }

    /// Run inference and extract the first output URL.
    async fn generate(
        &self,
        prompt: &str,
        cancel: &CancellationToken,
    ) -> Result<String, GenerateError> {
        let options = InferenceOptions {
            num_outputs: Some(1),
            aspect_ratio: Some(ASPECT_RATIO.to_string()),
            ..Default::default()
        };

        let job = self
            .replicate
            .run_inference(&self.lora_version, prompt, &options, cancel)
            .await?;

        match job.status {
            JobStatus::Succeeded => job
                .output_urls()
                .into_iter()
                .next()
                .ok_or(GenerateError::NoOutput),
            status => Err(GenerateError::JobFailed {
                status,
                message: job.error.unwrap_or_else(|| "no error details".to_string()),
            }),
        }
    }

    /// Post a reply, logging (but not propagating) delivery failures.
    async fn reply(
        &self,
        channel: &str,
        thread_ts: Option<&str>,
        text: &str,
        attachment: Option<&ImageAttachment>,
    ) {
        if let Err(e) = self
            .slack
            .post_message(channel, thread_ts, text, attachment)
            .await
        {
            tracing::error!(channel, error = %e, "Failed to post reply to Slack");
        }
    }
}
