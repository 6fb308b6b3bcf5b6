//! Domain error type shared across the workspace.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// The caller handed us a path that is missing or not a directory.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A local file that must exist does not.
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Reading or writing a local file failed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A JSON document on disk could not be parsed or produced.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}
