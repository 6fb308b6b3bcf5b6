//! Error taxonomy for the Replicate client.

use std::path::PathBuf;
use std::time::Duration;

/// Errors surfaced by the Replicate client.
#[derive(Debug, thiserror::Error)]
pub enum ReplicateError {
    /// Replicate returned a non-2xx status code. Never retried.
    #[error("Replicate API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The HTTP request itself failed (connection refused, DNS, timeout).
    /// Retried on the submission path, re-raised once attempts are
    /// exhausted.
    #[error("HTTP request failed: {0}")]
    Transport(String),

    /// The local archive to upload does not exist.
    #[error("Archive not found: {}", .0.display())]
    ArchiveNotFound(PathBuf),

    /// The local archive exists but could not be opened or read. Local
    /// I/O, so never treated as transient.
    #[error("Failed to read archive {}: {source}", path.display())]
    ArchiveUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A 2xx response body did not match the expected envelope.
    #[error("Unexpected response payload: {0}")]
    InvalidResponse(String),

    /// The optional poll deadline elapsed before the job became terminal.
    #[error("Job {job_id} still running after {}s", waited.as_secs())]
    TimedOut {
        job_id: String,
        waited: Duration,
    },

    /// The wait was aborted via the caller's cancellation token.
    #[error("Wait for job {job_id} was cancelled")]
    Cancelled { job_id: String },
}

impl ReplicateError {
    /// Whether retrying the same request may plausibly succeed.
    ///
    /// Only network-transport failures qualify; application-level
    /// rejections (`Api`) and everything local are final.
    pub fn is_transient(&self) -> bool {
        matches!(self, ReplicateError::Transport(_))
    }
}
