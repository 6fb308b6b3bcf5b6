//! The persisted LoRA version file.
//!
//! The one piece of durable state this system produces: after a successful
//! training run the trainer writes `{ "lora_version": "<id>" }` to a small
//! JSON file, which operators then feed to the bot via
//! `REPLICATE_LORA_VERSION`.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// On-disk shape of the version file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoraVersion {
    /// Model version id returned by a successful training job.
    pub lora_version: String,
}

/// Write the version file, creating parent directories as needed.
pub fn write(path: &Path, version: &str) -> Result<(), CoreError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|source| CoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
    }

    let doc = LoraVersion {
        lora_version: version.to_string(),
    };
    let json = serde_json::to_string_pretty(&doc)?;
    std::fs::write(path, json).map_err(|source| CoreError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Read a previously written version file.
pub fn read(path: &Path) -> Result<LoraVersion, CoreError> {
    let contents = std::fs::read_to_string(path).map_err(|source| match source.kind() {
        std::io::ErrorKind::NotFound => CoreError::NotFound(path.to_path_buf()),
        _ => CoreError::Io {
            path: path.to_path_buf(),
            source,
        },
    })?;
    Ok(serde_json::from_str(&contents)?)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
