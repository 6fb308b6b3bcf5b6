//! Shared domain types for the littleme platform.
//!
//! This crate has no async or network dependencies. It holds the error
//! type, environment configuration, and the persisted LoRA version file
//! shared by the bot and the trainer.

pub mod config;
pub mod error;
pub mod version_file;
