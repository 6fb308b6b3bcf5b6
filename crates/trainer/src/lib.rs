//! LoRA training pipeline: zip a dataset, upload it, launch a training
//! job, wait for completion, and persist the resulting model version id.

pub mod archive;
pub mod run;

pub use run::{run, RunConfig, TrainError};
