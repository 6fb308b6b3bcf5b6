//! Job types and request payloads for the Replicate API.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Job status
// ---------------------------------------------------------------------------

/// Lifecycle states a remote job moves through.
///
/// The label set is fixed by the Replicate API contract. A job is terminal
/// once it reaches `succeeded`, `failed`, or `canceled`; no further
/// transitions occur from those states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Starting,
    Processing,
    Succeeded,
    Failed,
    Canceled,
}

impl JobStatus {
    /// Whether no further status transition can occur.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Succeeded | JobStatus::Failed | JobStatus::Canceled
        )
    }
}

// ---------------------------------------------------------------------------
// Job kind
// ---------------------------------------------------------------------------

/// The two families of asynchronous jobs the API tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    /// LoRA fine-tuning (`/trainings`).
    Training,
    /// Image inference (`/predictions`).
    Prediction,
}

impl JobKind {
    /// URL path segment for this job family.
    pub fn path_segment(self) -> &'static str {
        match self {
            JobKind::Training => "trainings",
            JobKind::Prediction => "predictions",
        }
    }
}

// ---------------------------------------------------------------------------
// Job handle
// ---------------------------------------------------------------------------

/// A remote job as last observed: identifier, status, and (once terminal)
/// its output.
///
/// Handles are created by a submission call and replaced wholesale by
/// polling re-fetches; the client never mutates one locally and holds no
/// job state across process restarts.
#[derive(Debug, Clone, Deserialize)]
pub struct Job {
    /// Server-assigned job identifier.
    pub id: String,
    /// Last observed status.
    pub status: JobStatus,
    /// Job output, present once succeeded. A version string object for
    /// trainings, a sequence of image URLs for predictions.
    #[serde(default)]
    pub output: Option<serde_json::Value>,
    /// Remote error description, present on failed jobs.
    #[serde(default)]
    pub error: Option<String>,
}

impl Job {
    /// Whether this handle's status is terminal.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Trained model version id from a succeeded training job.
    pub fn output_version(&self) -> Option<&str> {
        self.output.as_ref()?.get("version")?.as_str()
    }

    /// Image URLs from a succeeded prediction job.
    pub fn output_urls(&self) -> Vec<String> {
        match self.output.as_ref().and_then(|v| v.as_array()) {
            Some(urls) => urls
                .iter()
                .filter_map(|u| u.as_str().map(String::from))
                .collect(),
            None => Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Request payloads
// ---------------------------------------------------------------------------

/// Input mapping for a training job.
///
/// Absent optional fields are omitted from the wire payload rather than
/// serialized as `null`; the API misinterprets explicit nulls for optional
/// fields.
#[derive(Debug, Clone, Serialize)]
pub struct TrainingInput {
    /// Upload URL of the zipped dataset.
    pub input_images: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_train_steps: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
}

/// Optional knobs for an inference request. All fields are omitted from
/// the wire payload when unset.
#[derive(Debug, Clone, Default)]
pub struct InferenceOptions {
    pub negative_prompt: Option<String>,
    pub num_outputs: Option<u32>,
    pub guidance: Option<f64>,
    pub seed: Option<i64>,
    pub aspect_ratio: Option<String>,
}

/// Wire shape of a prediction's `input` mapping: the prompt plus whichever
/// options are set.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct InferenceInput<'a> {
    pub prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub negative_prompt: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_outputs: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guidance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<&'a str>,
}

impl<'a> InferenceInput<'a> {
    pub fn new(prompt: &'a str, options: &'a InferenceOptions) -> Self {
        Self {
            prompt,
            negative_prompt: options.negative_prompt.as_deref(),
            num_outputs: options.num_outputs,
            guidance: options.guidance,
            seed: options.seed,
            aspect_ratio: options.aspect_ratio.as_deref(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
