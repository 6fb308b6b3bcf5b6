//! Client for the Replicate job API.
//!
//! Wraps the asynchronous job endpoints (dataset upload, LoRA training,
//! image inference) behind job-oriented operations: submit, fetch status,
//! poll to a terminal state. Transient network failures on the submission
//! path are retried with exponential backoff; application-level rejections
//! surface immediately with status and body.
//!
//! The HTTP layer sits behind the [`ApiTransport`] trait so the client
//! logic (payload composition, polling, retry) is testable against a
//! scripted transport.

pub mod client;
pub mod error;
pub mod retry;
pub mod transport;
pub mod types;

pub use client::{PollConfig, ReplicateClient, REPLICATE_API_URL};
pub use error::ReplicateError;
pub use transport::{ApiTransport, HttpTransport};
pub use types::{InferenceOptions, Job, JobKind, JobStatus, TrainingInput};
